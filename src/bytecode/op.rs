use crate::lang::node::Operation;
use crate::lang::types::ValueType;

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// Opcodes numerically above this take a 16-bit little-endian operand.
pub const HAS_ARG_THRESHOLD: u8 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    End = 0,

    // int stack ( a b -- r )
    AddInt = 1,
    SubInt = 2,
    MulInt = 3,
    DivInt = 4,
    EqInt = 5,

    // str stack ( a b -- r ); eq_str pushes onto the int stack
    CatStr = 6,
    EqStr = 7,

    // I/O
    PrintInt = 8,
    PrintStr = 9,
    Println = 10,

    // ==========================================================================
    // Operand-carrying instructions (opcode > HAS_ARG_THRESHOLD)
    // ==========================================================================
    /// Push int pool entry.
    LoadConstInt = 12,
    /// Push int variable.
    LoadInt = 13,
    /// Read a line, store its atoi value into an int variable.
    InputInt = 14,
    /// Pop into int variable.
    SaveInt = 15,
    LoadConstStr = 16,
    LoadStr = 17,
    InputStr = 18,
    SaveStr = 19,

    /// Absolute jump to a code offset.
    Jmp = 20,
    /// Pop an int; jump when it is zero.
    Jmpz = 21,
}

/// Byte value, mnemonic. The one place opcodes are named.
const TABLE: [(Op, &str); 21] = [
    (Op::End, "end"),
    (Op::AddInt, "add_int"),
    (Op::SubInt, "sub_int"),
    (Op::MulInt, "mul_int"),
    (Op::DivInt, "div_int"),
    (Op::EqInt, "eq_int"),
    (Op::CatStr, "cat_str"),
    (Op::EqStr, "eq_str"),
    (Op::PrintInt, "print_int"),
    (Op::PrintStr, "print_str"),
    (Op::Println, "println"),
    (Op::LoadConstInt, "load_const_int"),
    (Op::LoadInt, "load_int"),
    (Op::InputInt, "input_int"),
    (Op::SaveInt, "save_int"),
    (Op::LoadConstStr, "load_const_str"),
    (Op::LoadStr, "load_str"),
    (Op::InputStr, "input_str"),
    (Op::SaveStr, "save_str"),
    (Op::Jmp, "jmp"),
    (Op::Jmpz, "jmpz"),
];

impl Op {
    pub const ALL: [Op; 21] = {
        let mut all = [Op::End; 21];
        let mut i = 0;
        while i < TABLE.len() {
            all[i] = TABLE[i].0;
            i += 1;
        }
        all
    };

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.byte() == byte)
    }

    pub fn mnemonic(self) -> &'static str {
        TABLE
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, name)| *name)
            .unwrap_or("?")
    }

    pub fn has_arg(self) -> bool {
        self.byte() > HAS_ARG_THRESHOLD
    }

    /// Encoded size in bytes, operand included.
    pub fn width(self) -> usize {
        if self.has_arg() { 3 } else { 1 }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Op::Jmp | Op::Jmpz)
    }

    /// Opcode implementing a type-resolved binary operation.
    pub fn for_operation(operation: Operation) -> Op {
        match operation {
            Operation::AddInt => Op::AddInt,
            Operation::SubInt => Op::SubInt,
            Operation::MulInt => Op::MulInt,
            Operation::DivInt => Op::DivInt,
            Operation::EqInt => Op::EqInt,
            Operation::EqStr => Op::EqStr,
            Operation::CatStr => Op::CatStr,
        }
    }

    pub fn operation(self) -> Option<Operation> {
        Some(match self {
            Op::AddInt => Operation::AddInt,
            Op::SubInt => Operation::SubInt,
            Op::MulInt => Operation::MulInt,
            Op::DivInt => Operation::DivInt,
            Op::EqInt => Operation::EqInt,
            Op::EqStr => Operation::EqStr,
            Op::CatStr => Operation::CatStr,
            _ => return None,
        })
    }

    pub fn load_const(ty: ValueType) -> Op {
        match ty {
            ValueType::Int => Op::LoadConstInt,
            ValueType::Str => Op::LoadConstStr,
        }
    }

    pub fn load(ty: ValueType) -> Op {
        match ty {
            ValueType::Int => Op::LoadInt,
            ValueType::Str => Op::LoadStr,
        }
    }

    pub fn save(ty: ValueType) -> Op {
        match ty {
            ValueType::Int => Op::SaveInt,
            ValueType::Str => Op::SaveStr,
        }
    }

    pub fn print(ty: ValueType) -> Op {
        match ty {
            ValueType::Int => Op::PrintInt,
            ValueType::Str => Op::PrintStr,
        }
    }

    pub fn input(ty: ValueType) -> Op {
        match ty {
            ValueType::Int => Op::InputInt,
            ValueType::Str => Op::InputStr,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub op: Op,
    pub arg: Option<u16>,
}

impl Instruction {
    pub fn next_offset(&self) -> usize {
        self.offset + self.op.width()
    }
}

/// Why a byte stream is not a sequence of instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnknownOpcode { offset: usize, byte: u8 },
    MissingOperand { offset: usize, op: Op },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownOpcode { offset, byte } => {
                write!(f, "unknown opcode {} at {:04}", byte, offset)
            }
            DecodeError::MissingOperand { offset, op } => {
                write!(f, "{} at {:04} is missing its operand", op, offset)
            }
        }
    }
}

/// Splits `code` into instructions.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let byte = code[offset];
        let op = Op::from_byte(byte).ok_or(DecodeError::UnknownOpcode { offset, byte })?;
        let arg = if op.has_arg() {
            match code.get(offset + 1..offset + 3) {
                Some(&[lo, hi]) => Some(u16::from_le_bytes([lo, hi])),
                _ => return Err(DecodeError::MissingOperand { offset, op }),
            }
        } else {
            None
        };
        let instr = Instruction { offset, op, arg };
        offset = instr.next_offset();
        out.push(instr);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_bidirectional() {
        for op in Op::ALL {
            assert_eq!(Op::from_byte(op.byte()), Some(op));
            assert_ne!(op.mnemonic(), "?");
        }
    }

    #[test]
    fn test_fixed_numbering() {
        assert_eq!(Op::End.byte(), 0);
        assert_eq!(Op::Println.byte(), 10);
        assert_eq!(Op::LoadConstInt.byte(), 12);
        assert_eq!(Op::Jmpz.byte(), 21);
    }

    #[test]
    fn test_threshold_is_not_an_opcode() {
        assert_eq!(Op::from_byte(HAS_ARG_THRESHOLD), None);
        assert_eq!(Op::from_byte(22), None);
        assert_eq!(Op::from_byte(255), None);
    }

    #[test]
    fn test_operand_widths() {
        assert!(!Op::Println.has_arg());
        assert_eq!(Op::AddInt.width(), 1);
        assert!(Op::LoadConstInt.has_arg());
        assert_eq!(Op::Jmp.width(), 3);
    }

    #[test]
    fn test_operation_mapping_round_trips() {
        for op in Op::ALL {
            if let Some(operation) = op.operation() {
                assert_eq!(Op::for_operation(operation), op);
                assert_eq!(operation.name(), op.mnemonic());
            }
        }
    }

    #[test]
    fn test_decode() {
        let code = [12, 5, 0, 8, 20, 0, 1, 0];
        let decoded = decode(&code).unwrap();
        assert_eq!(
            decoded,
            vec![
                Instruction {
                    offset: 0,
                    op: Op::LoadConstInt,
                    arg: Some(5)
                },
                Instruction {
                    offset: 3,
                    op: Op::PrintInt,
                    arg: None
                },
                Instruction {
                    offset: 4,
                    op: Op::Jmp,
                    arg: Some(256)
                },
                Instruction {
                    offset: 7,
                    op: Op::End,
                    arg: None
                },
            ]
        );
        assert_eq!(decoded[2].next_offset(), 7);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode(&[8, 11]),
            Err(DecodeError::UnknownOpcode { offset: 1, byte: 11 })
        );
        assert_eq!(
            decode(&[13, 0]),
            Err(DecodeError::MissingOperand {
                offset: 0,
                op: Op::LoadInt
            })
        );
    }
}
