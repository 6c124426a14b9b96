use super::node::Operation;
use super::types::ValueType;

/// Runtime value held by the TAC interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Str(String),
}

impl Value {
    /// Initial value of a variable of type `ty`.
    pub fn zero(ty: ValueType) -> Self {
        match ty {
            ValueType::Int => Value::Int(0),
            ValueType::Str => Value::Str(String::new()),
        }
    }

    pub fn ty(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Str(_) => ValueType::Str,
        }
    }
}

impl std::fmt::Display for Value {
    /// Formats the value the way PRINT writes it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Why an operation produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    DivisionByZero,
    /// Operand types don't match the operation.
    Mismatch,
}

/// Integer semantics shared by every execution path: wrapping `+ - *`,
/// truncating `/`, and `=` yielding 1 or 0.
pub fn apply_int(op: Operation, lhs: i32, rhs: i32) -> Result<i32, EvalError> {
    match op {
        Operation::AddInt => Ok(lhs.wrapping_add(rhs)),
        Operation::SubInt => Ok(lhs.wrapping_sub(rhs)),
        Operation::MulInt => Ok(lhs.wrapping_mul(rhs)),
        Operation::DivInt => {
            if rhs == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(lhs.wrapping_div(rhs))
            }
        }
        Operation::EqInt => Ok((lhs == rhs) as i32),
        Operation::EqStr | Operation::CatStr => Err(EvalError::Mismatch),
    }
}

pub fn apply(op: Operation, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (Operation::CatStr, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Operation::EqStr, Value::Str(a), Value::Str(b)) => Ok(Value::Int((a == b) as i32)),
        (_, Value::Int(a), Value::Int(b)) => apply_int(op, *a, *b).map(Value::Int),
        _ => Err(EvalError::Mismatch),
    }
}
