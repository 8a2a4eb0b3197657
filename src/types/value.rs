use crate::common::Result;
use crate::errdata;
use crate::types::Document;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

/// A document value. Mirrors the subset of BSON types the shell can express.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    /// The position of the value's type in the cross-type sort order.
    fn bracket(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Document(_) => 3,
            Value::Array(_) => 4,
            Value::Boolean(_) => 5,
        }
    }

    /// Returns true if both values belong to the same comparison bracket,
    /// e.g. an integer and a float.
    pub fn same_bracket(&self, other: &Value) -> bool {
        self.bracket() == other.bracket()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "long",
            Value::Float(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Document(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Returns the value as a float, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a non-negative integer, accepting integral floats.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(i) => usize::try_from(*i).ok(),
            Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Interprets a projection or sort flag: numbers are true unless zero.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Adds two values. Integer overflow promotes to a float.
    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        use Value::*;
        Ok(match (self, other) {
            (Integer(lhs), Integer(rhs)) => match lhs.checked_add(*rhs) {
                Some(v) => Integer(v),
                None => Float(*lhs as f64 + *rhs as f64),
            },
            (Integer(lhs), Float(rhs)) => Float(*lhs as f64 + rhs),
            (Float(lhs), Integer(rhs)) => Float(lhs + *rhs as f64),
            (Float(lhs), Float(rhs)) => Float(lhs + rhs),
            (Null, Integer(_) | Float(_) | Null) | (Integer(_) | Float(_), Null) => Null,
            (lhs, rhs) => return errdata!("can't add {lhs} and {rhs}"),
        })
    }

    pub fn checked_sub(&self, other: &Value) -> Result<Value> {
        use Value::*;
        Ok(match (self, other) {
            (Integer(lhs), Integer(rhs)) => match lhs.checked_sub(*rhs) {
                Some(v) => Integer(v),
                None => Float(*lhs as f64 - *rhs as f64),
            },
            (Integer(lhs), Float(rhs)) => Float(*lhs as f64 - rhs),
            (Float(lhs), Integer(rhs)) => Float(lhs - *rhs as f64),
            (Float(lhs), Float(rhs)) => Float(lhs - rhs),
            (Null, Integer(_) | Float(_) | Null) | (Integer(_) | Float(_), Null) => Null,
            (lhs, rhs) => return errdata!("can't subtract {rhs} from {lhs}"),
        })
    }

    pub fn checked_mul(&self, other: &Value) -> Result<Value> {
        use Value::*;
        Ok(match (self, other) {
            (Integer(lhs), Integer(rhs)) => match lhs.checked_mul(*rhs) {
                Some(v) => Integer(v),
                None => Float(*lhs as f64 * *rhs as f64),
            },
            (Integer(lhs), Float(rhs)) => Float(*lhs as f64 * rhs),
            (Float(lhs), Integer(rhs)) => Float(lhs * *rhs as f64),
            (Float(lhs), Float(rhs)) => Float(lhs * rhs),
            (Null, Integer(_) | Float(_) | Null) | (Integer(_) | Float(_), Null) => Null,
            (lhs, rhs) => return errdata!("can't multiply {lhs} and {rhs}"),
        })
    }

    /// Divides two values. Integer division stays an integer only when exact.
    pub fn checked_div(&self, other: &Value) -> Result<Value> {
        use Value::*;
        if let (Null, Integer(_) | Float(_) | Null) | (Integer(_) | Float(_), Null) = (self, other) {
            return Ok(Null);
        }
        if matches!(other, Integer(0)) || matches!(other, Float(f) if *f == 0.0) {
            return errdata!("can't divide {self} by zero");
        }
        Ok(match (self, other) {
            (Integer(lhs), Integer(rhs)) => match lhs.checked_rem(*rhs) {
                Some(0) => Integer(lhs / rhs),
                _ => Float(*lhs as f64 / *rhs as f64),
            },
            (Integer(lhs), Float(rhs)) => Float(*lhs as f64 / rhs),
            (Float(lhs), Integer(rhs)) => Float(lhs / *rhs as f64),
            (Float(lhs), Float(rhs)) => Float(lhs / rhs),
            (lhs, rhs) => return errdata!("can't divide {lhs} by {rhs}"),
        })
    }
}

/// 2^63, the first float above i64::MAX.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Compares two numbers exactly, without rounding integers to floats. NaN
/// sorts below every other number and equals itself.
fn cmp_numbers(lhs: &Value, rhs: &Value) -> Ordering {
    use Value::*;
    match (lhs, rhs) {
        (Integer(a), Integer(b)) => a.cmp(b),
        (Integer(a), Float(b)) => cmp_integer_float(*a, *b),
        (Float(a), Integer(b)) => cmp_integer_float(*b, *a).reverse(),
        (Float(a), Float(b)) => match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        },
        (a, b) => a.bracket().cmp(&b.bracket()),
    }
}

fn cmp_integer_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Greater;
    }
    if f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    // The truncated float is exactly representable as an i64 in this range.
    let whole = f.trunc();
    i.cmp(&(whole as i64))
        .then_with(|| 0.0.partial_cmp(&(f - whole)).unwrap_or(Ordering::Equal))
}

// for use in sorting and grouping
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Integer(_) | Float(_), Integer(_) | Float(_)) => cmp_numbers(self, other),
            (String(a), String(b)) => a.cmp(b),
            (Document(a), Document(b)) => a.cmp(b),
            (Array(a), Array(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (a, b) => a.bracket().cmp(&b.bracket()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bracket().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            // Integral floats hash like the equal integer.
            Value::Integer(i) => i.hash(state),
            Value::Float(f) if f.is_nan() => 0u8.hash(state),
            Value::Float(f) if f.fract() == 0.0 && *f >= -I64_BOUND && *f < I64_BOUND => {
                (*f as i64).hash(state)
            }
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(values) => values.hash(state),
            Value::Document(doc) => doc.hash(state),
        }
    }
}

/// Formats the value the way the shell prints it.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => b.fmt(f),
            Self::Integer(integer) => integer.fmt(f),
            Self::Float(float) if float.is_nan() => f.write_str("NaN"),
            Self::Float(float) if float.is_infinite() => {
                f.write_str(if *float > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Float(float) => float.fmt(f),
            Self::String(string) => write!(f, "'{}'", string.escape_debug()),
            Self::Array(values) if values.is_empty() => f.write_str("[]"),
            Self::Array(values) => {
                f.write_str("[ ")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    value.fmt(f)?;
                }
                f.write_str(" ]")
            }
            Self::Document(doc) => doc.fmt(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Value::Document(doc) => {
                let mut map = serializer.serialize_map(Some(doc.len()))?;
                for (key, value) in doc.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_arithmetic() -> Result<()> {
        assert_eq!(Value::from(10).checked_mul(&Value::from(5))?, Value::Integer(50));
        assert_eq!(Value::from(2.5).checked_add(&Value::from(1))?, Value::Float(3.5));
        assert_eq!(Value::from(7).checked_sub(&Value::Null)?, Value::Null);
        assert_eq!(Value::from(9).checked_div(&Value::from(3))?, Value::Integer(3));
        assert_eq!(Value::from(7).checked_div(&Value::from(2))?, Value::Float(3.5));
        Ok(())
    }

    #[test]
    fn test_overflow_promotes_to_float() {
        let result = Value::from(i64::MAX).checked_mul(&Value::from(2)).unwrap();
        assert!(matches!(result, Value::Float(f) if f > i64::MAX as f64));
    }

    #[test]
    fn test_invalid_arithmetic() {
        assert!(Value::from("Apple").checked_mul(&Value::from(2)).is_err());
        assert!(Value::from(1).checked_div(&Value::from(0)).is_err());
        assert!(Value::from(1.0).checked_div(&Value::from(0.0)).is_err());
    }

    #[test]
    fn test_cross_type_order() {
        let mut values = vec![
            Value::from(true),
            Value::Array(vec![]),
            Value::from(doc! { "a" => 1 }),
            Value::from("z"),
            Value::from(2.5),
            Value::from(1),
            Value::Null,
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::from(1),
                Value::from(2.5),
                Value::from("z"),
                Value::from(doc! { "a" => 1 }),
                Value::Array(vec![]),
                Value::from(true),
            ]
        );
    }

    #[test]
    fn test_numeric_equality() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let hash = |v: &Value| {
            let mut hasher = DefaultHasher::new();
            v.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(Value::from(5), Value::from(5.0));
        assert_eq!(hash(&Value::from(5)), hash(&Value::from(5.0)));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Float(f64::NAN) < Value::from(i64::MIN));

        // 2^53 + 1 has no exact double, so it must not equal the double 2^53.
        let above = Value::from((1i64 << 53) + 1);
        let double = Value::from(9_007_199_254_740_992.0);
        let long = Value::from(1i64 << 53);
        assert_ne!(above, double);
        assert!(above > double);
        assert_eq!(double, long);
        assert_eq!(hash(&double), hash(&long));
        assert!(Value::from(2.5) > Value::from(2) && Value::from(2.5) < Value::from(3));
        assert!(Value::from(-2.5) < Value::from(-2) && Value::from(-2.5) > Value::from(-3));
        assert!(Value::from(i64::MAX) < Value::from(9_223_372_036_854_775_808.0));
        assert!(Value::from(i64::MIN) == Value::from(-9_223_372_036_854_775_808.0));
        assert!(Value::from(i64::MAX) < Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_display() {
        let value = Value::from(vec![Value::from("Apple"), Value::Null, Value::from(1.5)]);
        assert_eq!(value.to_string(), "[ 'Apple', null, 1.5 ]");
        assert_eq!(Value::from(10.0).to_string(), "10");
        assert_eq!(Value::from(-0.25).to_string(), "-0.25");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Float(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_serialize_json() -> Result<()> {
        let value = Value::from(doc! { "_id" => Value::Null, "total" => 145, "tags" => vec![Value::from("a")] });
        assert_eq!(
            serde_json::to_string(&value)?,
            r#"{"_id":null,"total":145,"tags":["a"]}"#
        );
        Ok(())
    }
}
