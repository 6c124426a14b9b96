use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::asm::AsmError;
use crate::asm::emitter::{Alu, AsmConfig, Assembler, Loc, Reg, assembler_for};
use crate::error::InternalError;
use crate::lang::node::Operation;
use crate::lang::program::Storage;
use crate::lang::types::ValueType;
use crate::tac::instr::{Instr, Label, LibFunc, Operand, TacProgram};

/// External runtime library.
const RUNTIME_PROCS: [&str; 6] = [
    "print_int",
    "print_str",
    "input_int",
    "input_str",
    "concat_str",
    "eq_str",
];

const EMPTY_STR: &str = "str_empty";
const NEWLINE_STR: &str = "str_newline";
const EXIT: &str = "exit";

/// Checks the TAC before any text is emitted.
///
/// Variables and constants must lie inside the declared storage, a
/// temporary must be written before it is read, operand types must match
/// what each instruction expects, and every jump must name a label that
/// exists exactly once. Returns the temporaries that need a data word.
pub fn check_usage(program: &TacProgram) -> Result<BTreeSet<Operand>, InternalError> {
    let storage = &program.storage;
    let mut temps = BTreeSet::new();

    let mut labels = HashSet::new();
    for instr in &program.instrs {
        if let Instr::Label(label) = instr {
            if !labels.insert(label) {
                return Err(InternalError::new(format!("label {} defined twice", label)));
            }
        }
    }

    let read = |operand: &Operand, temps: &BTreeSet<Operand>| -> Result<(), InternalError> {
        let defined = match *operand {
            Operand::Var { ty, slot } => slot < slot_count(storage, ty),
            Operand::Const { ty, index } => match ty {
                ValueType::Int => (index as usize) < storage.int_pool.len(),
                ValueType::Str => (index as usize) < storage.str_pool.len(),
            },
            Operand::Temp { .. } => temps.contains(operand),
        };
        if defined {
            Ok(())
        } else {
            Err(InternalError::new(format!("{} used before it is defined", operand)))
        }
    };
    let check_type = |operand: &Operand, ty: ValueType| -> Result<(), InternalError> {
        if operand.ty() == ty {
            Ok(())
        } else {
            Err(InternalError::new(format!(
                "{} has type {}, expected {}",
                operand,
                operand.ty(),
                ty
            )))
        }
    };
    let jump = |label: &Label| -> Result<(), InternalError> {
        if labels.contains(label) {
            Ok(())
        } else {
            Err(InternalError::new(format!("jump to undefined label {}", label)))
        }
    };

    for instr in &program.instrs {
        let dest = match instr {
            Instr::Binary { op, dest, lhs, rhs } => {
                for operand in [lhs, rhs] {
                    read(operand, &temps)?;
                    check_type(operand, op.operand_type())?;
                }
                check_type(dest, op.result_type())?;
                Some(dest)
            }
            Instr::Copy { dest, src } => {
                read(src, &temps)?;
                check_type(src, dest.ty())?;
                Some(dest)
            }
            Instr::Call { dest, func, args } => {
                if args.len() != func.params().len() || dest.map(|d| d.ty()) != func.result() {
                    return Err(InternalError::new(format!("malformed call to {}", func.name())));
                }
                for (arg, ty) in args.iter().zip(func.params()) {
                    read(arg, &temps)?;
                    check_type(arg, *ty)?;
                }
                dest.as_ref()
            }
            Instr::JumpIfZero { label, cond } => {
                read(cond, &temps)?;
                check_type(cond, ValueType::Int)?;
                jump(label)?;
                None
            }
            Instr::Jump(label) => {
                jump(label)?;
                None
            }
            Instr::Label(_) | Instr::End => None,
        };

        if let Some(dest) = dest {
            match dest {
                Operand::Const { .. } => {
                    return Err(InternalError::new(format!("write to constant {}", dest)));
                }
                Operand::Var { .. } => read(dest, &temps)?,
                Operand::Temp { .. } => {
                    temps.insert(*dest);
                }
            }
        }
    }

    Ok(temps)
}

fn slot_count(storage: &Storage, ty: ValueType) -> u16 {
    match ty {
        ValueType::Int => storage.int_slots,
        ValueType::Str => storage.str_slots,
    }
}

/// TAC -> 32-bit x86 assembly.
///
/// All values live in static data words: integers directly, strings as
/// pointers to nul-terminated bytes. String slots start out pointing at a
/// shared empty literal. `end` jumps to a common exit that returns 0 from
/// `main`.
pub struct AsmCodegen<'c> {
    asm: Box<dyn Assembler>,
    config: &'c AsmConfig,
    /// Numbers the labels of guarded divisions.
    divisions: u32,
}

impl<'c> AsmCodegen<'c> {
    pub fn new(config: &'c AsmConfig) -> Self {
        AsmCodegen {
            asm: assembler_for(config.syntax),
            config,
            divisions: 0,
        }
    }

    pub fn compile(mut self, program: &TacProgram) -> Result<String, AsmError> {
        let temps = check_usage(program)?;

        self.emit_rodata(program)?;
        self.emit_data(program, &temps)?;
        self.emit_text(program)?;

        let text = self.asm.finish();
        debug!(
            instrs = program.instrs.len(),
            lines = text.lines().count(),
            syntax = ?self.config.syntax,
            "generated assembly"
        );
        Ok(text)
    }

    fn emit_rodata(&mut self, program: &TacProgram) -> Result<(), AsmError> {
        self.asm.rodata()?;
        for (index, value) in program.storage.str_pool.iter().enumerate() {
            let name = self.symbol(&Operand::Const {
                ty: ValueType::Str,
                index: index as u16,
            });
            let mut bytes = value.as_bytes().to_vec();
            bytes.push(0);
            self.asm.label(&name)?;
            self.asm.bytes(&bytes)?;
        }
        let empty = self.asm.local(EMPTY_STR);
        self.asm.label(&empty)?;
        self.asm.bytes(&[0])?;
        let newline = self.asm.local(NEWLINE_STR);
        self.asm.label(&newline)?;
        self.asm.bytes(b"\n\0")?;
        Ok(())
    }

    fn emit_data(&mut self, program: &TacProgram, temps: &BTreeSet<Operand>) -> Result<(), AsmError> {
        self.asm.data()?;
        let storage = &program.storage;
        let vars = (0..storage.int_slots)
            .map(|slot| Operand::Var {
                ty: ValueType::Int,
                slot,
            })
            .chain((0..storage.str_slots).map(|slot| Operand::Var {
                ty: ValueType::Str,
                slot,
            }));
        for operand in vars.chain(temps.iter().copied()) {
            let initial = match operand.ty() {
                ValueType::Int => Loc::Imm(0),
                ValueType::Str => Loc::Addr(self.asm.local(EMPTY_STR)),
            };
            let name = self.symbol(&operand);
            self.asm.label(&name)?;
            self.asm.word(&initial)?;
        }
        Ok(())
    }

    fn emit_text(&mut self, program: &TacProgram) -> Result<(), AsmError> {
        self.asm.text()?;
        for name in RUNTIME_PROCS {
            let name = self.config.c_symbol(name);
            self.asm.extern_proc(&name)?;
        }
        let main = self.config.c_symbol("main");
        self.asm.global(&main)?;
        self.asm.label(&main)?;
        self.asm.push(&Loc::Reg(Reg::Ebp))?;
        self.asm.mov(&Loc::Reg(Reg::Ebp), &Loc::Reg(Reg::Esp))?;

        for instr in &program.instrs {
            self.emit_instr(program, instr)?;
        }

        let exit = self.asm.local(EXIT);
        self.asm.label(&exit)?;
        self.asm.mov(&Loc::Reg(Reg::Eax), &Loc::Imm(0))?;
        self.asm.mov(&Loc::Reg(Reg::Esp), &Loc::Reg(Reg::Ebp))?;
        self.asm.pop(Reg::Ebp)?;
        self.asm.ret()?;
        Ok(())
    }

    fn emit_instr(&mut self, program: &TacProgram, instr: &Instr) -> Result<(), AsmError> {
        if !matches!(instr, Instr::Label(_)) {
            self.asm.comment(instr.to_string().trim())?;
        }
        match instr {
            Instr::Binary { op, dest, lhs, rhs } => {
                self.emit_binary(program, *op, dest, lhs, rhs)?;
            }
            Instr::Copy { dest, src } => {
                let src = self.loc(program, src)?;
                self.asm.mov(&Loc::Reg(Reg::Eax), &src)?;
                self.store_eax(dest)?;
            }
            Instr::Call { dest, func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.loc(program, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match func {
                    LibFunc::PrintNewline => {
                        let newline = Loc::Addr(self.asm.local(NEWLINE_STR));
                        self.call(LibFunc::PrintStr.name(), &[newline])?;
                    }
                    _ => self.call(func.name(), &args)?,
                }
                if let Some(dest) = dest {
                    self.store_eax(dest)?;
                }
            }
            Instr::Label(label) => {
                let name = self.label(label);
                self.asm.label(&name)?;
            }
            Instr::Jump(label) => {
                let name = self.label(label);
                self.asm.jmp(&name)?;
            }
            Instr::JumpIfZero { label, cond } => {
                let cond = self.loc(program, cond)?;
                let name = self.label(label);
                self.asm.mov(&Loc::Reg(Reg::Eax), &cond)?;
                self.asm.alu(Alu::Cmp, Reg::Eax, &Loc::Imm(0))?;
                self.asm.jz(&name)?;
            }
            Instr::End => {
                let exit = self.asm.local(EXIT);
                self.asm.jmp(&exit)?;
            }
        }
        Ok(())
    }

    fn emit_binary(
        &mut self,
        program: &TacProgram,
        op: Operation,
        dest: &Operand,
        lhs: &Operand,
        rhs: &Operand,
    ) -> Result<(), AsmError> {
        let lhs = self.loc(program, lhs)?;
        let rhs = self.loc(program, rhs)?;
        let eax = Loc::Reg(Reg::Eax);
        match op {
            Operation::AddInt | Operation::SubInt | Operation::MulInt => {
                let alu = match op {
                    Operation::AddInt => Alu::Add,
                    Operation::SubInt => Alu::Sub,
                    _ => Alu::Imul,
                };
                self.asm.mov(&eax, &lhs)?;
                self.asm.alu(alu, Reg::Eax, &rhs)?;
            }
            Operation::DivInt => {
                self.asm.mov(&eax, &lhs)?;
                self.emit_div(&rhs)?;
            }
            Operation::EqInt => {
                self.asm.mov(&eax, &lhs)?;
                self.asm.alu(Alu::Cmp, Reg::Eax, &rhs)?;
                self.asm.sete(Reg::Al)?;
                self.asm.movzx(Reg::Eax, Reg::Al)?;
            }
            Operation::CatStr => self.call("concat_str", &[lhs, rhs])?,
            Operation::EqStr => self.call("eq_str", &[lhs, rhs])?,
        }
        self.store_eax(dest)
    }

    /// `eax / rhs` into `eax`. A divisor of -1 negates instead, so
    /// `i32::MIN / -1` wraps like the interpreters rather than trapping.
    fn emit_div(&mut self, rhs: &Loc) -> Result<(), AsmError> {
        let ecx = Loc::Reg(Reg::Ecx);
        match rhs {
            Loc::Imm(-1) => self.asm.neg(Reg::Eax)?,
            Loc::Imm(_) => {
                self.asm.cdq()?;
                self.asm.mov(&ecx, rhs)?;
                self.asm.idiv(Reg::Ecx)?;
            }
            _ => {
                self.divisions += 1;
                let divide = self.asm.local(&format!("div{}", self.divisions));
                let done = self.asm.local(&format!("div{}_done", self.divisions));
                self.asm.mov(&ecx, rhs)?;
                self.asm.alu(Alu::Cmp, Reg::Ecx, &Loc::Imm(-1))?;
                self.asm.jnz(&divide)?;
                self.asm.neg(Reg::Eax)?;
                self.asm.jmp(&done)?;
                self.asm.label(&divide)?;
                self.asm.cdq()?;
                self.asm.idiv(Reg::Ecx)?;
                self.asm.label(&done)?;
            }
        }
        Ok(())
    }

    /// cdecl call: arguments pushed right to left, caller pops them.
    fn call(&mut self, name: &str, args: &[Loc]) -> Result<(), AsmError> {
        for arg in args.iter().rev() {
            self.asm.push(arg)?;
        }
        let name = self.config.c_symbol(name);
        self.asm.call(&name)?;
        if !args.is_empty() {
            self.asm.alu(Alu::Add, Reg::Esp, &Loc::Imm(4 * args.len() as i32))?;
        }
        Ok(())
    }

    fn store_eax(&mut self, dest: &Operand) -> Result<(), AsmError> {
        let name = self.symbol(dest);
        self.asm.mov(&Loc::Mem(name), &Loc::Reg(Reg::Eax))?;
        Ok(())
    }

    /// Where an operand's 32-bit value comes from: integer constants are
    /// immediates, string constants the address of their bytes, everything
    /// else a data word.
    fn loc(&self, program: &TacProgram, operand: &Operand) -> Result<Loc, InternalError> {
        match *operand {
            Operand::Const {
                ty: ValueType::Int,
                index,
            } => program
                .int_const(index)
                .map(Loc::Imm)
                .ok_or_else(|| InternalError::new(format!("no integer constant {}", index))),
            Operand::Const {
                ty: ValueType::Str, ..
            } => Ok(Loc::Addr(self.symbol(operand))),
            _ => Ok(Loc::Mem(self.symbol(operand))),
        }
    }

    fn symbol(&self, operand: &Operand) -> String {
        self.asm.local(&operand.to_string())
    }

    fn label(&self, label: &Label) -> String {
        self.asm.local(&label.to_string())
    }
}

/// Compile a lowered program to assembly text.
pub fn compile_to_asm(program: &TacProgram, config: &AsmConfig) -> Result<String, AsmError> {
    AsmCodegen::new(config).compile(program)
}
