use std::collections::HashMap;

use tracing::debug;

use crate::{
    bytecode::{Op, artifact::Artifact, compile_error::CompileError},
    lang::types::ValueType,
    tac::{Instr, Label, LibFunc, Operand, TacProgram},
};

/// A jump operand waiting for its label's offset.
#[derive(Debug)]
struct Fixup {
    /// Offset of the operand's first byte.
    at: usize,
    label: Label,
}

/// TAC -> bytecode.
///
/// Pass 1 emits code, recording label offsets and every jump operand that
/// needs one. Pass 2 back-patches those operands with absolute offsets.
/// Temporaries get variable slots after the declared ones.
pub struct Compiler {
    /// Output instruction stream
    code: Vec<u8>,

    /// Label -> code offset, filled in pass 1
    labels: HashMap<Label, u16>,

    fixups: Vec<Fixup>,

    /// Slots handed to temporaries, keyed by (type, id)
    temp_slots: HashMap<(ValueType, u32), u16>,
    int_slots: u16,
    str_slots: u16,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
            temp_slots: HashMap::new(),
            int_slots: 0,
            str_slots: 0,
        }
    }

    pub fn compile_program(mut self, tac: &TacProgram) -> Result<Artifact, CompileError> {
        self.int_slots = tac.storage.int_slots;
        self.str_slots = tac.storage.str_slots;

        for instr in &tac.instrs {
            self.compile_instr(instr)?;
        }
        self.resolve_labels()?;

        if self.code.len() > u16::MAX as usize {
            return Err(CompileError::too_large("code length"));
        }

        debug!(
            bytes = self.code.len(),
            labels = self.labels.len(),
            temporaries = self.temp_slots.len(),
            "compiled bytecode"
        );

        Ok(Artifact {
            int_slots: self.int_slots,
            str_slots: self.str_slots,
            int_pool: tac.storage.int_pool.clone(),
            str_pool: tac.storage.str_pool.clone(),
            code: self.code,
        })
    }

    fn compile_instr(&mut self, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::Binary { op, dest, lhs, rhs } => {
                self.push(lhs)?;
                self.push(rhs)?;
                self.emit(Op::for_operation(*op));
                self.save(dest)?;
            }
            Instr::Copy { dest, src } => {
                self.push(src)?;
                self.save(dest)?;
            }
            Instr::Call { dest, func, args } => self.call(*func, dest.as_ref(), args)?,
            Instr::Label(label) => {
                let offset = self.offset()?;
                if self.labels.insert(label.clone(), offset).is_some() {
                    return Err(CompileError::internal(format!(
                        "label {} defined twice",
                        label
                    )));
                }
            }
            Instr::Jump(label) => self.emit_jump(Op::Jmp, label),
            Instr::JumpIfZero { label, cond } => {
                self.push(cond)?;
                self.emit_jump(Op::Jmpz, label);
            }
            Instr::End => self.emit(Op::End),
        }
        Ok(())
    }

    fn call(
        &mut self,
        func: LibFunc,
        dest: Option<&Operand>,
        args: &[Operand],
    ) -> Result<(), CompileError> {
        match (func, dest, args) {
            (LibFunc::PrintInt | LibFunc::PrintStr, None, [arg]) => {
                self.push(arg)?;
                self.emit(Op::print(arg.ty()));
            }
            (LibFunc::PrintNewline, None, []) => self.emit(Op::Println),
            (LibFunc::InputInt | LibFunc::InputStr, Some(dest), []) => {
                let slot = self.slot(dest)?;
                self.emit_arg(Op::input(dest.ty()), slot);
            }
            _ => {
                return Err(CompileError::internal(format!(
                    "malformed call to {} with {} arguments",
                    func.name(),
                    args.len()
                )));
            }
        }
        Ok(())
    }

    /// Loads `operand` onto the stack of its type.
    fn push(&mut self, operand: &Operand) -> Result<(), CompileError> {
        match operand {
            Operand::Const { ty, index } => self.emit_arg(Op::load_const(*ty), *index),
            _ => {
                let slot = self.slot(operand)?;
                self.emit_arg(Op::load(operand.ty()), slot);
            }
        }
        Ok(())
    }

    /// Pops the top of the stack of `dest`'s type into it.
    fn save(&mut self, dest: &Operand) -> Result<(), CompileError> {
        let slot = self.slot(dest)?;
        self.emit_arg(Op::save(dest.ty()), slot);
        Ok(())
    }

    /// Variable slot of a variable or temporary.
    fn slot(&mut self, operand: &Operand) -> Result<u16, CompileError> {
        match *operand {
            Operand::Var { slot, .. } => Ok(slot),
            Operand::Temp { ty, id } => {
                if let Some(slot) = self.temp_slots.get(&(ty, id)) {
                    return Ok(*slot);
                }
                let counter = match ty {
                    ValueType::Int => &mut self.int_slots,
                    ValueType::Str => &mut self.str_slots,
                };
                let slot = *counter;
                *counter = counter
                    .checked_add(1)
                    .ok_or_else(|| CompileError::too_large("variable slot count"))?;
                self.temp_slots.insert((ty, id), slot);
                Ok(slot)
            }
            Operand::Const { .. } => Err(CompileError::internal(format!(
                "constant {} used as a variable",
                operand
            ))),
        }
    }

    fn offset(&self) -> Result<u16, CompileError> {
        u16::try_from(self.code.len()).map_err(|_| CompileError::too_large("code length"))
    }

    fn emit(&mut self, op: Op) {
        self.code.push(op.byte());
    }

    fn emit_arg(&mut self, op: Op, arg: u16) {
        self.code.push(op.byte());
        self.code.extend_from_slice(&arg.to_le_bytes());
    }

    fn emit_jump(&mut self, op: Op, label: &Label) {
        self.code.push(op.byte());
        self.fixups.push(Fixup {
            at: self.code.len(),
            label: label.clone(),
        });
        // placeholder, patched in resolve_labels
        self.code.extend_from_slice(&[0, 0]);
    }

    fn resolve_labels(&mut self) -> Result<(), CompileError> {
        for fixup in &self.fixups {
            let target = self.labels.get(&fixup.label).ok_or_else(|| {
                CompileError::internal(format!("undefined label {}", fixup.label))
            })?;
            self.code[fixup.at..fixup.at + 2].copy_from_slice(&target.to_le_bytes());
        }
        Ok(())
    }
}

/// Compiles a TAC program into a bytecode artifact.
pub fn compile_tac(tac: &TacProgram) -> Result<Artifact, CompileError> {
    Compiler::new().compile_program(tac)
}
