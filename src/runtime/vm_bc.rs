use tracing::{debug, trace};

use crate::bytecode::Op;
use crate::bytecode::artifact::Artifact;
use crate::bytecode::stack_check::check_artifact;
use crate::error::InternalError;
use crate::lang::value::{EvalError, apply_int};
use crate::runtime::console::{Console, parse_int_input};
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone)]
pub struct VmBcConfig {
    pub max_steps: Option<usize>,
    /// Per stack.
    pub max_stack_size: usize,
}

impl Default for VmBcConfig {
    fn default() -> Self {
        VmBcConfig {
            max_steps: None,
            max_stack_size: 10_000,
        }
    }
}

/// Stack machine for bytecode artifacts.
///
/// Two operand stacks (int and str) plus flat variable arrays sized from
/// the artifact header. Jump operands are absolute code offsets.
pub struct VmBc {
    int_stack: Vec<i32>,
    str_stack: Vec<String>,
    ints: Vec<i32>,
    strs: Vec<String>,
    // Safety limits
    config: VmBcConfig,
    steps: usize,
}

impl Default for VmBc {
    fn default() -> Self {
        Self::new()
    }
}

impl VmBc {
    pub fn new() -> Self {
        Self::with_config(VmBcConfig::default())
    }

    pub fn with_config(config: VmBcConfig) -> Self {
        Self {
            int_stack: Vec::new(),
            str_stack: Vec::new(),
            ints: Vec::new(),
            strs: Vec::new(),
            config,
            steps: 0,
        }
    }

    /// Integer variables after the last run.
    pub fn ints(&self) -> &[i32] {
        &self.ints
    }

    pub fn strs(&self) -> &[String] {
        &self.strs
    }

    pub fn reset_execution_state(&mut self) {
        self.steps = 0;
        self.int_stack.clear();
        self.str_stack.clear();
    }

    /// Verifies `artifact` with the stack checker, then runs it from offset 0
    /// until `end`.
    pub fn run_artifact(
        &mut self,
        artifact: &Artifact,
        console: &mut dyn Console,
    ) -> Result<(), RuntimeError> {
        self.reset_execution_state();
        check_artifact(artifact).map_err(|e| RuntimeError::Internal(InternalError::from(e)))?;

        self.ints = vec![0; artifact.int_slots as usize];
        self.strs = vec![String::new(); artifact.str_slots as usize];

        self.exec(artifact, console)?;
        debug!(steps = self.steps, "bytecode vm halted");
        Ok(())
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::StepLimit(max));
            }
        }

        let max = self.config.max_stack_size;
        if self.int_stack.len() > max || self.str_stack.len() > max {
            return Err(RuntimeError::StackOverflow(max));
        }

        Ok(())
    }

    fn exec(&mut self, artifact: &Artifact, console: &mut dyn Console) -> Result<(), RuntimeError> {
        let code = &artifact.code;
        let mut ip: usize = 0;

        loop {
            self.check_limits()?;

            let at = ip;
            let byte = *code
                .get(ip)
                .ok_or_else(|| RuntimeError::internal(format!("ip {} ran past the code", ip)))?;
            let op = Op::from_byte(byte).ok_or_else(|| {
                RuntimeError::internal(format!("unknown opcode {} at {:04}", byte, ip))
            })?;
            let arg = if op.has_arg() {
                match code.get(ip + 1..ip + 3) {
                    Some(&[lo, hi]) => u16::from_le_bytes([lo, hi]) as usize,
                    _ => {
                        return Err(RuntimeError::internal(format!(
                            "{} at {:04} is missing its operand",
                            op, ip
                        )));
                    }
                }
            } else {
                0
            };
            ip += op.width();

            trace!(at, %op, arg, ints = self.int_stack.len(), strs = self.str_stack.len(), "exec");

            match op {
                Op::End => return Ok(()),

                // Arithmetic: second-popped <op> first-popped
                Op::AddInt | Op::SubInt | Op::MulInt | Op::DivInt | Op::EqInt => {
                    let b = self.pop_int()?;
                    let a = self.pop_int()?;
                    let operation = op
                        .operation()
                        .ok_or_else(|| RuntimeError::internal(format!("{} has no operation", op)))?;
                    let result = apply_int(operation, a, b).map_err(|e| match e {
                        EvalError::DivisionByZero => RuntimeError::DivisionByZero { at },
                        EvalError::Mismatch => {
                            RuntimeError::internal(format!("{} is not an integer operation", op))
                        }
                    })?;
                    self.int_stack.push(result);
                }
                Op::CatStr => {
                    let b = self.pop_str()?;
                    let mut a = self.pop_str()?;
                    a.push_str(&b);
                    self.str_stack.push(a);
                }
                Op::EqStr => {
                    let b = self.pop_str()?;
                    let a = self.pop_str()?;
                    self.int_stack.push((a == b) as i32);
                }

                // I/O
                Op::PrintInt => {
                    let n = self.pop_int()?;
                    console.write_str(&n.to_string())?;
                }
                Op::PrintStr => {
                    let s = self.pop_str()?;
                    console.write_str(&s)?;
                }
                Op::Println => console.write_str("\n")?,
                Op::InputInt => {
                    let line = console.read_line()?.ok_or(RuntimeError::InputExhausted)?;
                    *slot_mut(&mut self.ints, arg)? = parse_int_input(&line);
                }
                Op::InputStr => {
                    let line = console.read_line()?.ok_or(RuntimeError::InputExhausted)?;
                    *slot_mut(&mut self.strs, arg)? = line;
                }

                // Loads and stores
                Op::LoadConstInt => {
                    let value = *slot(&artifact.int_pool, arg)?;
                    self.int_stack.push(value);
                }
                Op::LoadInt => {
                    let value = *slot(&self.ints, arg)?;
                    self.int_stack.push(value);
                }
                Op::SaveInt => {
                    let value = self.pop_int()?;
                    *slot_mut(&mut self.ints, arg)? = value;
                }
                Op::LoadConstStr => {
                    let value = slot(&artifact.str_pool, arg)?.clone();
                    self.str_stack.push(value);
                }
                Op::LoadStr => {
                    let value = slot(&self.strs, arg)?.clone();
                    self.str_stack.push(value);
                }
                Op::SaveStr => {
                    let value = self.pop_str()?;
                    *slot_mut(&mut self.strs, arg)? = value;
                }

                // Jump instructions
                Op::Jmp => ip = arg,
                Op::Jmpz => {
                    if self.pop_int()? == 0 {
                        ip = arg;
                    }
                }
            }
        }
    }

    // Stack operations

    fn pop_int(&mut self) -> Result<i32, RuntimeError> {
        self.int_stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("int stack underflow"))
    }

    fn pop_str(&mut self) -> Result<String, RuntimeError> {
        self.str_stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("str stack underflow"))
    }
}

fn slot<T>(values: &[T], index: usize) -> Result<&T, RuntimeError> {
    values
        .get(index)
        .ok_or_else(|| RuntimeError::internal(format!("slot {} out of range", index)))
}

fn slot_mut<T>(values: &mut [T], index: usize) -> Result<&mut T, RuntimeError> {
    values
        .get_mut(index)
        .ok_or_else(|| RuntimeError::internal(format!("slot {} out of range", index)))
}

/// Runs `artifact` against `console`.
pub fn run_bytecode(
    artifact: &Artifact,
    console: &mut dyn Console,
    config: VmBcConfig,
) -> Result<(), RuntimeError> {
    VmBc::with_config(config).run_artifact(artifact, console)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::console::BufferConsole;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn artifact(code: Vec<u8>) -> Artifact {
        Artifact {
            int_slots: 2,
            str_slots: 1,
            int_pool: vec![10, 3, 0],
            str_pool: vec!["ab".to_string(), "cd".to_string()],
            code,
        }
    }

    /// Run code with scripted input and return (output, vm)
    fn run_code(code: Vec<u8>, input: &str) -> Result<(String, VmBc), RuntimeError> {
        let mut vm = VmBc::new();
        let mut console = BufferConsole::with_input(input);
        vm.run_artifact(&artifact(code), &mut console)?;
        Ok((console.into_output(), vm))
    }

    fn assert_output(code: Vec<u8>, expected: &str) {
        let (output, _) = run_code(code, "").expect("execution should succeed");
        assert_eq!(output, expected);
    }

    /// Assert execution produces an error containing the given substring
    fn assert_error(code: Vec<u8>, error_contains: &str) {
        match run_code(code, "") {
            Ok((output, _)) => panic!(
                "expected error containing '{}', got output: {:?}",
                error_contains, output
            ),
            Err(e) => assert!(
                e.to_string().contains(error_contains),
                "expected error containing '{}', got: {}",
                error_contains,
                e
            ),
        }
    }

    #[test]
    fn test_print_constant() {
        assert_output(vec![12, 0, 0, 8, 10, 0], "10\n");
    }

    #[test]
    fn test_subtraction_operand_order() {
        // 10 - 3
        assert_output(vec![12, 0, 0, 12, 1, 0, 2, 8, 0], "7");
    }

    #[test]
    fn test_division_truncates() {
        // 10 / 3
        assert_output(vec![12, 0, 0, 12, 1, 0, 4, 8, 0], "3");
    }

    #[test]
    fn test_division_by_zero() {
        assert_error(vec![12, 0, 0, 12, 2, 0, 4, 8, 0], "division by zero at 6");
    }

    #[test]
    fn test_equality_pushes_flag() {
        assert_output(vec![12, 0, 0, 12, 0, 0, 5, 8, 12, 0, 0, 12, 1, 0, 5, 8, 0], "10");
    }

    #[test]
    fn test_string_ops() {
        // "ab" + "cd"
        assert_output(vec![16, 0, 0, 16, 1, 0, 6, 9, 0], "abcd");
        // "ab" = "ab", "ab" = "cd"
        assert_output(
            vec![16, 0, 0, 16, 0, 0, 7, 8, 16, 0, 0, 16, 1, 0, 7, 8, 0],
            "10",
        );
    }

    #[test]
    fn test_variables_start_zeroed_and_store() {
        let (output, vm) = run_code(vec![13, 1, 0, 8, 17, 0, 0, 9, 12, 1, 0, 15, 0, 0, 0], "").unwrap();
        assert_eq!(output, "0");
        assert_eq!(vm.ints(), &[3, 0]);
        assert_eq!(vm.strs(), &[String::new()]);
    }

    #[test]
    fn test_input_reads_into_slots() {
        // input_int 0; input_str 0; load_str 0; print_str; load_int 0; print_int; end
        let code = vec![14, 0, 0, 18, 0, 0, 17, 0, 0, 9, 13, 0, 0, 8, 0];
        let (output, vm) = run_code(code, " 42abc\nhello\r\n").unwrap();
        assert_eq!(output, "hello42");
        assert_eq!(vm.ints()[0], 42);
    }

    #[test]
    fn test_input_exhausted() {
        assert_error(vec![14, 0, 0, 0], "input exhausted");
    }

    #[test]
    fn test_conditional_jump() {
        // 0: lci 2; 3: jmpz 11; 6: lci 0; 9: print_int; 10: end; 11: lci 1; 14: print_int; 15: end
        let code = vec![12, 2, 0, 21, 11, 0, 12, 0, 0, 8, 0, 12, 1, 0, 8, 0];
        assert_output(code, "3");
    }

    #[test]
    fn test_backward_jump_loop_hits_step_limit() {
        let config = VmBcConfig {
            max_steps: Some(50),
            ..VmBcConfig::default()
        };
        let mut vm = VmBc::with_config(config);
        let mut console = BufferConsole::new();
        let err = vm
            .run_artifact(&artifact(vec![10, 20, 0, 0]), &mut console)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::StepLimit(50)));
        assert_eq!(console.output().len(), 25);
    }

    #[test]
    fn test_malformed_code_is_rejected_before_running() {
        // print first, then an unknown opcode: nothing may be printed
        let mut console = BufferConsole::new();
        let err = VmBc::new()
            .run_artifact(&artifact(vec![10, 99, 0]), &mut console)
            .unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("unknown opcode 99"));
        assert_eq!(console.output(), "");
    }

    #[test]
    fn test_stack_underflow_is_internal() {
        assert_error(vec![1, 0], "stack underflow");
    }
}
