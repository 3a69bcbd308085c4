//! Polymorphic attribute values
//!
//! Values expose the operations the operators rely on: boolean coercion for predicates,
//! hashing for grouping, total ordering for sorting and join comparison, and arithmetic
//! for running aggregates.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::errors::{RecordError, RecordResult};
use super::types::AttType;

/// A single attribute value
#[derive(Debug, Clone)]
pub enum AttValue {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
}

impl AttValue {
    /// Returns the type of this value
    pub fn att_type(&self) -> AttType {
        match self {
            AttValue::Int(_) => AttType::Int,
            AttValue::Double(_) => AttType::Double,
            AttValue::String(_) => AttType::String,
            AttValue::Bool(_) => AttType::Bool,
        }
    }

    /// The value a fresh record slot of type `ty` starts with
    pub fn default_for(ty: AttType) -> Self {
        match ty {
            AttType::Int => AttValue::Int(0),
            AttType::Double => AttValue::Double(0.0),
            AttType::String => AttValue::String(String::new()),
            AttType::Bool => AttValue::Bool(false),
        }
    }

    /// Parses the body of a typed literal such as the `12` in `int[12]`
    pub fn parse_literal(ty: AttType, text: &str) -> RecordResult<Self> {
        let invalid = || RecordError::InvalidLiteral {
            ty,
            text: text.to_string(),
        };
        match ty {
            AttType::Int => text.trim().parse().map(AttValue::Int).map_err(|_| invalid()),
            AttType::Double => text
                .trim()
                .parse()
                .map(AttValue::Double)
                .map_err(|_| invalid()),
            AttType::String => Ok(AttValue::String(text.to_string())),
            AttType::Bool => match text.trim() {
                "true" => Ok(AttValue::Bool(true)),
                "false" => Ok(AttValue::Bool(false)),
                _ => Err(invalid()),
            },
        }
    }

    /// Boolean coercion used by selection predicates
    pub fn to_bool(&self) -> bool {
        match self {
            AttValue::Bool(b) => *b,
            AttValue::Int(i) => *i != 0,
            AttValue::Double(d) => *d != 0.0,
            AttValue::String(s) => !s.is_empty(),
        }
    }

    /// Deterministic 64-bit hash of this value
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttValue::Int(i) => Some(*i as f64),
            AttValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Converts the value for storage in a slot of type `ty`.
    ///
    /// Only int -> double widening is performed.
    pub fn coerce_to(self, ty: AttType, att: &str) -> RecordResult<Self> {
        match (ty, self) {
            (AttType::Double, AttValue::Int(i)) => Ok(AttValue::Double(i as f64)),
            (ty, value) if value.att_type() == ty => Ok(value),
            (ty, value) => Err(RecordError::TypeMismatch {
                att: att.to_string(),
                expected: ty,
                found: value.att_type(),
            }),
        }
    }

    /// Total order across all values.
    ///
    /// Numbers compare numerically regardless of int/double, strings lexicographically,
    /// booleans false < true. Across categories: bool < number < string.
    pub fn total_cmp(&self, other: &AttValue) -> Ordering {
        fn rank(v: &AttValue) -> u8 {
            match v {
                AttValue::Bool(_) => 0,
                AttValue::Int(_) | AttValue::Double(_) => 1,
                AttValue::String(_) => 2,
            }
        }

        match (self, other) {
            (AttValue::Int(a), AttValue::Int(b)) => a.cmp(b),
            (AttValue::String(a), AttValue::String(b)) => a.cmp(b),
            (AttValue::Bool(a), AttValue::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }

    /// `+`: numeric addition or string concatenation
    pub fn add(&self, other: &AttValue) -> RecordResult<AttValue> {
        match (self, other) {
            (AttValue::String(a), AttValue::String(b)) => Ok(AttValue::String(format!("{}{}", a, b))),
            _ => self.arith(other, "+", i64::wrapping_add, |a, b| a + b),
        }
    }

    /// `-`
    pub fn sub(&self, other: &AttValue) -> RecordResult<AttValue> {
        self.arith(other, "-", i64::wrapping_sub, |a, b| a - b)
    }

    /// `*`
    pub fn mul(&self, other: &AttValue) -> RecordResult<AttValue> {
        self.arith(other, "*", i64::wrapping_mul, |a, b| a * b)
    }

    /// `/`: always produces a double
    pub fn div(&self, other: &AttValue) -> RecordResult<AttValue> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => Ok(AttValue::Double(a / b)),
            _ => Err(self.unsupported("/", other)),
        }
    }

    /// Unary minus
    pub fn negate(&self) -> RecordResult<AttValue> {
        match self {
            AttValue::Int(i) => Ok(AttValue::Int(i.wrapping_neg())),
            AttValue::Double(d) => Ok(AttValue::Double(-d)),
            _ => Err(self.unsupported("-", self)),
        }
    }

    fn arith(
        &self,
        other: &AttValue,
        op: &'static str,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> RecordResult<AttValue> {
        match (self, other) {
            (AttValue::Int(a), AttValue::Int(b)) => Ok(AttValue::Int(int_op(*a, *b))),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(AttValue::Double(float_op(a, b))),
                _ => Err(self.unsupported(op, other)),
            },
        }
    }

    fn unsupported(&self, op: &'static str, other: &AttValue) -> RecordError {
        RecordError::UnsupportedOperands {
            op,
            left: self.att_type(),
            right: other.att_type(),
        }
    }
}

// Equality is type-exact; doubles compare by bit pattern so that Eq and Hash agree.
impl PartialEq for AttValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttValue::Int(a), AttValue::Int(b)) => a == b,
            (AttValue::Double(a), AttValue::Double(b)) => a.to_bits() == b.to_bits(),
            (AttValue::String(a), AttValue::String(b)) => a == b,
            (AttValue::Bool(a), AttValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttValue {}

impl Hash for AttValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AttValue::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            AttValue::Double(d) => {
                1u8.hash(state);
                d.to_bits().hash(state);
            }
            AttValue::String(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            AttValue::Bool(b) => {
                3u8.hash(state);
                b.hash(state);
            }
        }
    }
}

/// Formats the value in expression literal syntax, e.g. `int[5]`
impl fmt::Display for AttValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttValue::Int(i) => write!(f, "int[{}]", i),
            AttValue::Double(d) => write!(f, "double[{}]", d),
            AttValue::String(s) => write!(f, "string[{}]", s),
            AttValue::Bool(b) => write!(f, "bool[{}]", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert_eq!(AttValue::parse_literal(AttType::Int, "42").unwrap(), AttValue::Int(42));
        assert_eq!(
            AttValue::parse_literal(AttType::Double, "1.5").unwrap(),
            AttValue::Double(1.5)
        );
        assert_eq!(
            AttValue::parse_literal(AttType::String, "eng dept").unwrap(),
            AttValue::String("eng dept".into())
        );
        assert_eq!(
            AttValue::parse_literal(AttType::Bool, "true").unwrap(),
            AttValue::Bool(true)
        );
        assert!(AttValue::parse_literal(AttType::Int, "x1").is_err());
        assert!(AttValue::parse_literal(AttType::Bool, "yes").is_err());
    }

    #[test]
    fn test_to_bool() {
        assert!(AttValue::Bool(true).to_bool());
        assert!(!AttValue::Int(0).to_bool());
        assert!(AttValue::Double(0.5).to_bool());
        assert!(!AttValue::String(String::new()).to_bool());
    }

    #[test]
    fn test_arithmetic_types() {
        let a = AttValue::Int(7);
        let b = AttValue::Int(2);
        assert_eq!(a.add(&b).unwrap(), AttValue::Int(9));
        assert_eq!(a.mul(&b).unwrap(), AttValue::Int(14));
        assert_eq!(a.div(&b).unwrap(), AttValue::Double(3.5));
        assert_eq!(a.add(&AttValue::Double(0.5)).unwrap(), AttValue::Double(7.5));
        assert_eq!(
            AttValue::String("ab".into()).add(&AttValue::String("cd".into())).unwrap(),
            AttValue::String("abcd".into())
        );
        assert!(AttValue::Bool(true).add(&a).is_err());
    }

    #[test]
    fn test_total_order() {
        assert_eq!(AttValue::Int(1).total_cmp(&AttValue::Double(1.0)), Ordering::Equal);
        assert_eq!(AttValue::Int(1).total_cmp(&AttValue::Double(1.5)), Ordering::Less);
        assert_eq!(
            AttValue::String("b".into()).total_cmp(&AttValue::String("a".into())),
            Ordering::Greater
        );
        assert_eq!(AttValue::Bool(true).total_cmp(&AttValue::Int(0)), Ordering::Less);
    }

    #[test]
    fn test_equality_is_type_exact() {
        assert_ne!(AttValue::Int(1), AttValue::Double(1.0));
        assert_eq!(AttValue::Double(2.5), AttValue::Double(2.5));
        assert_eq!(AttValue::Int(3).hash_value(), AttValue::Int(3).hash_value());
    }

    #[test]
    fn test_coerce_widens_int() {
        let v = AttValue::Int(4).coerce_to(AttType::Double, "avg").unwrap();
        assert_eq!(v, AttValue::Double(4.0));
        assert!(AttValue::Double(4.0).coerce_to(AttType::Int, "n").is_err());
    }

    #[test]
    fn test_display_is_literal_syntax() {
        assert_eq!(AttValue::Int(5).to_string(), "int[5]");
        assert_eq!(AttValue::String("x".into()).to_string(), "string[x]");
    }
}
