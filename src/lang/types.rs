use serde::{Deserialize, Serialize};

/// The two primitive value types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    /// 32-bit signed integer (`DIM X AS INTEGER`).
    Int,
    /// Byte string (`DIM S AS STRING`).
    Str,
}

impl ValueType {
    /// Short name used in symbolic operand names (`var_int_0`, `const_str_2`).
    pub fn short_name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Str => "str",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
