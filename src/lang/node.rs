use serde::{Deserialize, Serialize};

use super::types::ValueType;

/// Surface operator as written in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
}

impl BinOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "*" => Some(BinOp::Mul),
            "/" => Some(BinOp::Div),
            "=" => Some(BinOp::Eq),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "=",
        }
    }

    /// Binding strength; higher binds tighter. `(` is handled separately
    /// by the parser as a grouping marker.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Eq => 1,
            BinOp::Add | BinOp::Sub => 2,
            BinOp::Mul | BinOp::Div => 3,
        }
    }
}

/// Type-resolved binary operation.
///
/// Every legal `(left type, operator, right type)` triple maps to exactly one
/// `Operation`; anything else is a type error at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    EqInt,
    EqStr,
    CatStr,
}

impl Operation {
    /// Look up the typing table.
    pub fn resolve(lhs: ValueType, op: BinOp, rhs: ValueType) -> Option<Self> {
        use ValueType::*;
        match (lhs, op, rhs) {
            (Int, BinOp::Add, Int) => Some(Operation::AddInt),
            (Int, BinOp::Sub, Int) => Some(Operation::SubInt),
            (Int, BinOp::Mul, Int) => Some(Operation::MulInt),
            (Int, BinOp::Div, Int) => Some(Operation::DivInt),
            (Str, BinOp::Add, Str) => Some(Operation::CatStr),
            (Int, BinOp::Eq, Int) => Some(Operation::EqInt),
            (Str, BinOp::Eq, Str) => Some(Operation::EqStr),
            _ => None,
        }
    }

    /// Type both operands must have.
    pub fn operand_type(self) -> ValueType {
        match self {
            Operation::EqStr | Operation::CatStr => ValueType::Str,
            _ => ValueType::Int,
        }
    }

    pub fn result_type(self) -> ValueType {
        match self {
            Operation::CatStr => ValueType::Str,
            _ => ValueType::Int,
        }
    }

    /// Canonical lowercase name, shared by the TAC listing and the opcode table.
    pub fn name(self) -> &'static str {
        match self {
            Operation::AddInt => "add_int",
            Operation::SubInt => "sub_int",
            Operation::MulInt => "mul_int",
            Operation::DivInt => "div_int",
            Operation::EqInt => "eq_int",
            Operation::EqStr => "eq_str",
            Operation::CatStr => "cat_str",
        }
    }
}

/// Expression node. Every node knows its statically resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: Operation,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Variable reference by type-local slot.
    Var { ty: ValueType, slot: u16 },
    /// Constant reference by index into the type's pool.
    Const { ty: ValueType, index: u16 },
}

impl Expr {
    pub fn ty(&self) -> ValueType {
        match self {
            Expr::Binary { op, .. } => op.result_type(),
            Expr::Var { ty, .. } | Expr::Const { ty, .. } => *ty,
        }
    }
}

/// Statement node, one per source line (DIM lines produce none).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `INPUT prompt ; X`: print the prompt, then read a line into `X`.
    Input {
        prompt: Expr,
        ty: ValueType,
        slot: u16,
    },
    /// `LET X = expr` (the `LET` is optional).
    Assign {
        ty: ValueType,
        slot: u16,
        value: Expr,
    },
    /// `IF cond THEN stmt`. There is no ELSE.
    If { cond: Expr, then: Box<Stmt> },
    /// `GOTO n`.
    Goto(u32),
    /// `PRINT a ; b ; ...` followed by a newline.
    Print(Vec<Expr>),
    End,
}

impl Stmt {
    /// Line number this statement jumps to, looking through `IF ... THEN`.
    pub fn goto_target(&self) -> Option<u32> {
        match self {
            Stmt::Goto(line) => Some(*line),
            Stmt::If { then, .. } => then.goto_target(),
            _ => None,
        }
    }

    /// Whether this statement can stop the program, looking through `IF ... THEN`.
    pub fn may_end(&self) -> bool {
        match self {
            Stmt::End => true,
            Stmt::If { then, .. } => then.may_end(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_end_may_end() {
        let guarded = Stmt::If {
            cond: Expr::Const {
                ty: ValueType::Int,
                index: 0,
            },
            then: Box::new(Stmt::End),
        };
        assert!(guarded.may_end());
        assert!(Stmt::End.may_end());
        assert!(!Stmt::Goto(10).may_end());
        assert!(!Stmt::Print(vec![]).may_end());
    }

    #[test]
    fn test_typing_table_accepts_legal_triples() {
        use ValueType::*;
        assert_eq!(
            Operation::resolve(Int, BinOp::Add, Int),
            Some(Operation::AddInt)
        );
        assert_eq!(
            Operation::resolve(Str, BinOp::Add, Str),
            Some(Operation::CatStr)
        );
        assert_eq!(
            Operation::resolve(Str, BinOp::Eq, Str),
            Some(Operation::EqStr)
        );
        assert_eq!(Operation::EqStr.result_type(), Int);
        assert_eq!(Operation::CatStr.result_type(), Str);
    }

    #[test]
    fn test_typing_table_rejects_mixed_and_string_arithmetic() {
        use ValueType::*;
        assert_eq!(Operation::resolve(Int, BinOp::Add, Str), None);
        assert_eq!(Operation::resolve(Str, BinOp::Sub, Str), None);
        assert_eq!(Operation::resolve(Str, BinOp::Eq, Int), None);
        assert_eq!(Operation::resolve(Str, BinOp::Mul, Str), None);
    }

    #[test]
    fn test_precedence_order() {
        assert!(BinOp::Mul.precedence() > BinOp::Add.precedence());
        assert_eq!(BinOp::Mul.precedence(), BinOp::Div.precedence());
        assert!(BinOp::Sub.precedence() > BinOp::Eq.precedence());
    }

    #[test]
    fn test_goto_target_through_if() {
        let stmt = Stmt::If {
            cond: Expr::Const {
                ty: ValueType::Int,
                index: 0,
            },
            then: Box::new(Stmt::Goto(100)),
        };
        assert_eq!(stmt.goto_target(), Some(100));
        assert_eq!(Stmt::End.goto_target(), None);
    }
}
