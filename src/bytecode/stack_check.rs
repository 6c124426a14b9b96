use std::collections::HashSet;

use crate::bytecode::Op;
use crate::bytecode::artifact::Artifact;
use crate::bytecode::op::{DecodeError, Instruction, decode};
use crate::error::InternalError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackCheckError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for StackCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stack-check error at {:04}: {}", self.offset, self.message)
    }
}

impl std::error::Error for StackCheckError {}

impl StackCheckError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl From<StackCheckError> for InternalError {
    fn from(err: StackCheckError) -> Self {
        InternalError::new(err.to_string())
    }
}

/// Stack effect of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Effect {
    int_pops: usize,
    int_pushes: usize,
    str_pops: usize,
    str_pushes: usize,
}

const fn fx(int_pops: usize, int_pushes: usize, str_pops: usize, str_pushes: usize) -> Effect {
    Effect {
        int_pops,
        int_pushes,
        str_pops,
        str_pushes,
    }
}

fn effect(op: Op) -> Effect {
    use Op::*;
    match op {
        End | Println | Jmp => fx(0, 0, 0, 0),

        AddInt | SubInt | MulInt | DivInt | EqInt => fx(2, 1, 0, 0),
        CatStr => fx(0, 0, 2, 1),
        EqStr => fx(0, 1, 2, 0),

        PrintInt | SaveInt | Jmpz => fx(1, 0, 0, 0),
        PrintStr | SaveStr => fx(0, 0, 1, 0),

        LoadConstInt | LoadInt => fx(0, 1, 0, 0),
        LoadConstStr | LoadStr => fx(0, 0, 0, 1),

        // read straight into a variable
        InputInt | InputStr => fx(0, 0, 0, 0),
    }
}

/// Verifies an artifact before it runs.
///
/// Checks that every byte decodes, every operand is in range for its pool,
/// variable array or code, and that neither stack underflows. Basic blocks
/// must begin and end with both stacks empty: at every jump target, after
/// every jump and at `end`. That makes a single linear pass sufficient.
///
/// Returns the decoded instructions.
pub fn check_artifact(artifact: &Artifact) -> Result<Vec<Instruction>, StackCheckError> {
    let instrs = decode(&artifact.code).map_err(|e| {
        let offset = match e {
            DecodeError::UnknownOpcode { offset, .. }
            | DecodeError::MissingOperand { offset, .. } => offset,
        };
        StackCheckError::new(offset, e.to_string())
    })?;

    let boundaries: HashSet<usize> = instrs.iter().map(|i| i.offset).collect();
    let mut targets = HashSet::new();
    for instr in &instrs {
        check_operand(artifact, &boundaries, instr)?;
        if instr.op.is_jump() {
            targets.extend(instr.arg.map(usize::from));
        }
    }

    let (mut ints, mut strs) = (0usize, 0usize);
    for instr in &instrs {
        if targets.contains(&instr.offset) && (ints, strs) != (0, 0) {
            return Err(StackCheckError::new(
                instr.offset,
                format!("jump target reached with {} int and {} str values on the stacks", ints, strs),
            ));
        }

        let e = effect(instr.op);
        if ints < e.int_pops || strs < e.str_pops {
            return Err(StackCheckError::new(
                instr.offset,
                format!(
                    "stack underflow in {}: needs {} int / {} str, have {} / {}",
                    instr.op, e.int_pops, e.str_pops, ints, strs
                ),
            ));
        }
        ints = ints - e.int_pops + e.int_pushes;
        strs = strs - e.str_pops + e.str_pushes;

        if (instr.op.is_jump() || instr.op == Op::End) && (ints, strs) != (0, 0) {
            return Err(StackCheckError::new(
                instr.offset,
                format!("{} leaves {} int and {} str values on the stacks", instr.op, ints, strs),
            ));
        }
    }

    match instrs.last() {
        Some(last) if matches!(last.op, Op::End | Op::Jmp) => Ok(instrs),
        Some(last) => Err(StackCheckError::new(
            last.offset,
            "code runs off the end without end or jmp",
        )),
        None => Err(StackCheckError::new(0, "empty code")),
    }
}

fn check_operand(
    artifact: &Artifact,
    boundaries: &HashSet<usize>,
    instr: &Instruction,
) -> Result<(), StackCheckError> {
    let Some(arg) = instr.arg else {
        return Ok(());
    };
    let arg = arg as usize;

    let (limit, what) = match instr.op {
        Op::LoadConstInt => (artifact.int_pool.len(), "integer constant"),
        Op::LoadConstStr => (artifact.str_pool.len(), "string constant"),
        Op::LoadInt | Op::InputInt | Op::SaveInt => (artifact.int_slots as usize, "int slot"),
        Op::LoadStr | Op::InputStr | Op::SaveStr => (artifact.str_slots as usize, "str slot"),
        Op::Jmp | Op::Jmpz => {
            if boundaries.contains(&arg) {
                return Ok(());
            }
            return Err(StackCheckError::new(
                instr.offset,
                format!("jump target {:04} is not an instruction boundary", arg),
            ));
        }
        _ => return Ok(()),
    };

    if arg < limit {
        Ok(())
    } else {
        Err(StackCheckError::new(
            instr.offset,
            format!("{} {} out of range (have {})", what, arg, limit),
        ))
    }
}
