//! Attribute types

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of attribute types a schema slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttType {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Boolean
    Bool,
}

impl AttType {
    /// Returns the name used by the expression language literal syntax
    pub fn as_str(&self) -> &'static str {
        match self {
            AttType::Int => "int",
            AttType::Double => "double",
            AttType::String => "string",
            AttType::Bool => "bool",
        }
    }

    /// Parses a literal type prefix (`int`, `double`, `string`, `bool`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(AttType::Int),
            "double" => Some(AttType::Double),
            "string" => Some(AttType::String),
            "bool" => Some(AttType::Bool),
            _ => None,
        }
    }

    /// Returns true for int and double
    pub fn is_numeric(&self) -> bool {
        matches!(self, AttType::Int | AttType::Double)
    }

    /// Returns true if a value of type `from` may be stored in a slot of this type.
    ///
    /// Int widens into double; everything else must match exactly.
    pub fn accepts(&self, from: AttType) -> bool {
        *self == from || (*self == AttType::Double && from == AttType::Int)
    }

    /// Returns true if values of the two types can be ordered against each other
    pub fn comparable_with(&self, other: AttType) -> bool {
        (self.is_numeric() && other.is_numeric()) || self == &other
    }
}

impl fmt::Display for AttType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for ty in [AttType::Int, AttType::Double, AttType::String, AttType::Bool] {
            assert_eq!(AttType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(AttType::from_name("float"), None);
    }

    #[test]
    fn test_widening() {
        assert!(AttType::Double.accepts(AttType::Int));
        assert!(!AttType::Int.accepts(AttType::Double));
        assert!(!AttType::String.accepts(AttType::Bool));
    }

    #[test]
    fn test_comparable() {
        assert!(AttType::Int.comparable_with(AttType::Double));
        assert!(AttType::String.comparable_with(AttType::String));
        assert!(!AttType::String.comparable_with(AttType::Int));
    }
}
