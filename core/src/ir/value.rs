use serde::{Deserialize, Serialize};

/// Literal operands known while lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    Undefined,
    /// A primitive type referenced by name, e.g. `u8`.
    Type(String),
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Void => write!(f, "{{}}"),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::Float(x) => write!(f, "{:?}", x),
            ConstValue::Str(s) => write!(f, "{:?}", s),
            ConstValue::Null => write!(f, "null"),
            ConstValue::Undefined => write!(f, "undefined"),
            ConstValue::Type(name) => write!(f, "{}", name),
        }
    }
}
