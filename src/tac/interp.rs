use std::collections::HashMap;

use tracing::{debug, trace};

use crate::lang::types::ValueType;
use crate::lang::value::{EvalError, Value, apply};
use crate::runtime::console::{Console, parse_int_input};
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm_bc::VmBcConfig;
use crate::tac::instr::{Instr, Label, LibFunc, Operand, TacProgram};

/// Executes a TAC program directly, without going through bytecode.
///
/// Variables and temporaries live in one map keyed by operand; unset ones
/// read as the zero value of their type.
pub struct TacInterpreter<'p> {
    program: &'p TacProgram,
    labels: HashMap<&'p Label, usize>,
    values: HashMap<Operand, Value>,
    config: VmBcConfig,
    steps: usize,
}

impl<'p> TacInterpreter<'p> {
    pub fn new(program: &'p TacProgram) -> Self {
        Self::with_config(program, VmBcConfig::default())
    }

    pub fn with_config(program: &'p TacProgram, config: VmBcConfig) -> Self {
        let labels = program
            .instrs
            .iter()
            .enumerate()
            .filter_map(|(i, instr)| match instr {
                Instr::Label(label) => Some((label, i)),
                _ => None,
            })
            .collect();

        TacInterpreter {
            program,
            labels,
            values: HashMap::new(),
            config,
            steps: 0,
        }
    }

    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), RuntimeError> {
        let program = self.program;
        let instrs = &program.instrs;
        let mut pc = 0;

        while let Some(instr) = instrs.get(pc) {
            self.tick()?;
            trace!(pc, %instr, "tac");
            pc += 1;

            match instr {
                Instr::Binary { op, dest, lhs, rhs } => {
                    let lhs = self.read(lhs)?;
                    let rhs = self.read(rhs)?;
                    let result = apply(*op, &lhs, &rhs).map_err(|e| match e {
                        EvalError::DivisionByZero => RuntimeError::DivisionByZero { at: pc - 1 },
                        EvalError::Mismatch => RuntimeError::internal(format!(
                            "operand types do not match {} at {}",
                            op.name(),
                            pc - 1
                        )),
                    })?;
                    self.write(dest, result)?;
                }
                Instr::Copy { dest, src } => {
                    let value = self.read(src)?;
                    self.write(dest, value)?;
                }
                Instr::Call { dest, func, args } => {
                    self.call(console, *func, dest.as_ref(), args)?;
                }
                Instr::Label(_) => {}
                Instr::Jump(label) => pc = self.target(label)?,
                Instr::JumpIfZero { label, cond } => {
                    if self.read(cond)? == Value::Int(0) {
                        pc = self.target(label)?;
                    }
                }
                Instr::End => break,
            }
        }

        debug!(steps = self.steps, "tac interpreter halted");
        Ok(())
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        match self.config.max_steps {
            Some(max) if self.steps > max => Err(RuntimeError::StepLimit(max)),
            _ => Ok(()),
        }
    }

    fn target(&self, label: &Label) -> Result<usize, RuntimeError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| RuntimeError::internal(format!("undefined label {}", label)))
    }

    fn read(&self, operand: &Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Const { index, .. } => {
                let value = match operand.ty() {
                    ValueType::Int => {
                        self.program.int_const(*index).map(Value::Int)
                    }
                    ValueType::Str => {
                        self.program.str_const(*index).map(|s| Value::Str(s.to_string()))
                    }
                };
                value.ok_or_else(|| {
                    RuntimeError::internal(format!("constant {} out of range", operand))
                })
            }
            _ => Ok(self
                .values
                .get(operand)
                .cloned()
                .unwrap_or_else(|| Value::zero(operand.ty()))),
        }
    }

    fn write(&mut self, dest: &Operand, value: Value) -> Result<(), RuntimeError> {
        if dest.is_const() || dest.ty() != value.ty() {
            return Err(RuntimeError::internal(format!(
                "cannot store {} value into {}",
                value.ty(),
                dest
            )));
        }
        self.values.insert(*dest, value);
        Ok(())
    }

    fn call(
        &mut self,
        console: &mut dyn Console,
        func: LibFunc,
        dest: Option<&Operand>,
        args: &[Operand],
    ) -> Result<(), RuntimeError> {
        if args.len() != func.params().len() {
            return Err(RuntimeError::internal(format!(
                "{} expects {} arguments, got {}",
                func.name(),
                func.params().len(),
                args.len()
            )));
        }

        match func {
            LibFunc::PrintInt | LibFunc::PrintStr => {
                let value = self.read(&args[0])?;
                console.write_str(&value.to_string())?;
            }
            LibFunc::PrintNewline => console.write_str("\n")?,
            LibFunc::InputInt | LibFunc::InputStr => {
                let line = console.read_line()?.ok_or(RuntimeError::InputExhausted)?;
                let value = match func {
                    LibFunc::InputInt => Value::Int(parse_int_input(&line)),
                    _ => Value::Str(line),
                };
                let dest = dest.ok_or_else(|| {
                    RuntimeError::internal(format!("{} has no destination", func.name()))
                })?;
                self.write(dest, value)?;
            }
        }
        Ok(())
    }
}

/// Runs `program` to completion against `console`.
pub fn run_tac(
    program: &TacProgram,
    console: &mut dyn Console,
    config: VmBcConfig,
) -> Result<(), RuntimeError> {
    TacInterpreter::with_config(program, config).run(console)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_program;
    use crate::runtime::console::BufferConsole;
    use crate::tac::lower::lower_program;

    fn run_source(source: &str, input: &str) -> Result<String, RuntimeError> {
        let program = parse_program(source).expect("program should parse");
        let tac = lower_program(&program).expect("lowering should succeed");
        let mut console = BufferConsole::with_input(input);
        run_tac(&tac, &mut console, VmBcConfig::default())?;
        Ok(console.into_output())
    }

    #[test]
    fn test_arithmetic_and_print() {
        let out = run_source("10 DIM I AS INTEGER\n20 I = 1 + 2\n30 PRINT I\n40 END\n", "");
        assert_eq!(out.unwrap(), "3\n");
    }

    #[test]
    fn test_print_list_has_no_separator() {
        let out = run_source("10 PRINT \"a\"; 1; \"b\"\n", "");
        assert_eq!(out.unwrap(), "a1b\n");
    }

    #[test]
    fn test_string_concat_and_compare() {
        let source = "10 DIM S AS STRING\n20 S = \"a\" + \"b\"\n30 IF S = \"ab\" THEN PRINT S\n40 IF S = \"x\" THEN PRINT \"no\"\n";
        assert_eq!(run_source(source, "").unwrap(), "ab\n");
    }

    #[test]
    fn test_goto_loop_counts_down() {
        let source = "\
10 DIM N AS INTEGER
20 N = 3
30 PRINT N
40 N = N - 1
50 IF N = 0 THEN END
60 GOTO 30
";
        assert_eq!(run_source(source, "").unwrap(), "3\n2\n1\n");
    }

    #[test]
    fn test_input_reads_typed_values() {
        let source = "\
10 DIM N AS INTEGER
20 DIM S AS STRING
30 INPUT \"n? \"; N
40 INPUT \"s? \"; S
50 PRINT S; N * 2
";
        assert_eq!(run_source(source, "21\nhey\n").unwrap(), "n? s? hey42\n");
    }

    #[test]
    fn test_input_exhausted() {
        let source = "10 DIM N AS INTEGER\n20 INPUT \"\"; N\n";
        let err = run_source(source, "").unwrap_err();
        assert!(matches!(err, RuntimeError::InputExhausted));
    }

    #[test]
    fn test_division_by_zero() {
        let source = "10 DIM N AS INTEGER\n20 N = 1 / N\n";
        let err = run_source(source, "").unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    }

    #[test]
    fn test_step_limit_stops_infinite_loop() {
        let program = parse_program("10 GOTO 10\n").unwrap();
        let tac = lower_program(&program).unwrap();
        let mut console = BufferConsole::new();
        let config = VmBcConfig {
            max_steps: Some(100),
            ..VmBcConfig::default()
        };
        let err = run_tac(&tac, &mut console, config).unwrap_err();
        assert!(matches!(err, RuntimeError::StepLimit(100)));
    }

    #[test]
    fn test_end_stops_before_later_lines() {
        let out = run_source("10 PRINT 1\n20 END\n30 PRINT 2\n", "");
        assert_eq!(out.unwrap(), "1\n");
    }
}
