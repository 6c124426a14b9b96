use serde::{Deserialize, Serialize};

use crate::lang::node::Operation;
use crate::lang::program::Storage;
use crate::lang::types::ValueType;

/// A TAC operand: a typed named storage location.
///
/// Display gives the symbolic name (`var_int_0`, `const_str_1`, `tmp3`).
/// Names derived from different slots, pool indices or temporary ids never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operand {
    /// Declared variable.
    Var { ty: ValueType, slot: u16 },
    /// Constant pool entry.
    Const { ty: ValueType, index: u16 },
    /// Compiler temporary, numbered from 1 across the whole program.
    Temp { ty: ValueType, id: u32 },
}

impl Operand {
    pub fn ty(&self) -> ValueType {
        match self {
            Operand::Var { ty, .. } | Operand::Const { ty, .. } | Operand::Temp { ty, .. } => *ty,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Operand::Const { .. })
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Var { ty, slot } => write!(f, "var_{}_{}", ty, slot),
            Operand::Const { ty, index } => write!(f, "const_{}_{}", ty, index),
            Operand::Temp { id, .. } => write!(f, "tmp{}", id),
        }
    }
}

/// Symbolic jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// Start of the statement for a BASIC line number.
    Line(u32),
    /// Fall-through point after a guarded IF statement.
    EndIf(u32),
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Line(n) => write!(f, "line{}", n),
            Label::EndIf(n) => write!(f, "endif{}", n),
        }
    }
}

/// Runtime-library entry points reachable from TAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibFunc {
    PrintInt,
    PrintStr,
    /// Writes `\n`.
    PrintNewline,
    InputInt,
    InputStr,
}

impl LibFunc {
    pub fn name(self) -> &'static str {
        match self {
            LibFunc::PrintInt => "print_int",
            LibFunc::PrintStr => "print_str",
            LibFunc::PrintNewline => "println",
            LibFunc::InputInt => "input_int",
            LibFunc::InputStr => "input_str",
        }
    }

    pub fn print(ty: ValueType) -> Self {
        match ty {
            ValueType::Int => LibFunc::PrintInt,
            ValueType::Str => LibFunc::PrintStr,
        }
    }

    pub fn input(ty: ValueType) -> Self {
        match ty {
            ValueType::Int => LibFunc::InputInt,
            ValueType::Str => LibFunc::InputStr,
        }
    }

    /// Argument types, in order.
    pub fn params(self) -> &'static [ValueType] {
        match self {
            LibFunc::PrintInt => &[ValueType::Int],
            LibFunc::PrintStr => &[ValueType::Str],
            LibFunc::PrintNewline | LibFunc::InputInt | LibFunc::InputStr => &[],
        }
    }

    pub fn result(self) -> Option<ValueType> {
        match self {
            LibFunc::InputInt => Some(ValueType::Int),
            LibFunc::InputStr => Some(ValueType::Str),
            _ => None,
        }
    }
}

/// Three-address instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// `dest = lhs <op> rhs`
    Binary {
        op: Operation,
        dest: Operand,
        lhs: Operand,
        rhs: Operand,
    },
    /// `dest = src`
    Copy { dest: Operand, src: Operand },
    /// `[dest =] func(args...)`
    Call {
        dest: Option<Operand>,
        func: LibFunc,
        args: Vec<Operand>,
    },
    Label(Label),
    Jump(Label),
    /// Jump when `cond` is zero.
    JumpIfZero { label: Label, cond: Operand },
    End,
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::Binary { op, dest, lhs, rhs } => {
                write!(f, "    {} = {} {}, {}", dest, op.name(), lhs, rhs)
            }
            Instr::Copy { dest, src } => write!(f, "    {} = {}", dest, src),
            Instr::Call { dest, func, args } => {
                write!(f, "    ")?;
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                write!(f, "call {}/{}", func.name(), args.len())?;
                for (i, arg) in args.iter().enumerate() {
                    write!(f, "{}{}", if i == 0 { " " } else { ", " }, arg)?;
                }
                Ok(())
            }
            Instr::Label(label) => write!(f, "{}:", label),
            Instr::Jump(label) => write!(f, "    jump {}", label),
            Instr::JumpIfZero { label, cond } => write!(f, "    jmpz {}, {}", cond, label),
            Instr::End => write!(f, "    end"),
        }
    }
}

/// A lowered program: the flat instruction list plus the storage it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacProgram {
    pub instrs: Vec<Instr>,
    pub storage: Storage,
}

impl TacProgram {
    /// Integer pool entry at `index`, if in range.
    pub fn int_const(&self, index: u16) -> Option<i32> {
        self.storage.int_pool.get(index as usize).copied()
    }

    pub fn str_const(&self, index: u16) -> Option<&str> {
        self.storage.str_pool.get(index as usize).map(String::as_str)
    }
}

impl std::fmt::Display for TacProgram {
    /// Human-readable listing: constants first, then the code.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.storage.int_pool.iter().enumerate() {
            writeln!(f, "; const_int_{} = {}", i, value)?;
        }
        for (i, value) in self.storage.str_pool.iter().enumerate() {
            writeln!(f, "; const_str_{} = {:?}", i, value)?;
        }
        for instr in &self.instrs {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_names() {
        let var = Operand::Var {
            ty: ValueType::Int,
            slot: 3,
        };
        let cst = Operand::Const {
            ty: ValueType::Str,
            index: 1,
        };
        let tmp = Operand::Temp {
            ty: ValueType::Int,
            id: 7,
        };
        assert_eq!(var.to_string(), "var_int_3");
        assert_eq!(cst.to_string(), "const_str_1");
        assert_eq!(tmp.to_string(), "tmp7");
        assert!(cst.is_const());
        assert_eq!(tmp.ty(), ValueType::Int);
    }

    #[test]
    fn test_instruction_listing() {
        let a = Operand::Var {
            ty: ValueType::Int,
            slot: 0,
        };
        let one = Operand::Const {
            ty: ValueType::Int,
            index: 0,
        };
        let add = Instr::Binary {
            op: Operation::AddInt,
            dest: a,
            lhs: a,
            rhs: one,
        };
        assert_eq!(add.to_string(), "    var_int_0 = add_int var_int_0, const_int_0");

        let call = Instr::Call {
            dest: None,
            func: LibFunc::PrintInt,
            args: vec![a],
        };
        assert_eq!(call.to_string(), "    call print_int/1 var_int_0");

        let read = Instr::Call {
            dest: Some(a),
            func: LibFunc::InputInt,
            args: vec![],
        };
        assert_eq!(read.to_string(), "    var_int_0 = call input_int/0");

        assert_eq!(Instr::Label(Label::Line(30)).to_string(), "line30:");
        assert_eq!(
            Instr::JumpIfZero {
                label: Label::EndIf(1),
                cond: a
            }
            .to_string(),
            "    jmpz var_int_0, endif1"
        );
    }
}
