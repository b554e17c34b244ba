//! Literal operands
//!
//! Values held by match expression leaves. Literals follow the document
//! model's total order: different canonical types compare by type rank,
//! numbers compare by numeric value regardless of representation.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Number, Value};

use super::errors::{ParseError, ParseResult};

/// A literal operand
///
/// `==` is structural. Use [`Literal::equivalent`] for query semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Sorts below every other value
    MinKey,
    /// Sorts above every other value
    MaxKey,
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Literal>),
    /// Embedded document, field order preserved
    Object(Vec<(String, Literal)>),
    Regex { pattern: String, flags: String },
}

impl Literal {
    /// Rank of this literal's type in the cross-type total order
    pub fn canonical_type(&self) -> i32 {
        match self {
            Literal::MinKey => -1,
            Literal::Null => 5,
            Literal::Int(_) | Literal::Double(_) => 10,
            Literal::String(_) => 15,
            Literal::Object(_) => 20,
            Literal::Array(_) => 25,
            Literal::Bool(_) => 40,
            Literal::Regex { .. } => 50,
            Literal::MaxKey => 127,
        }
    }

    /// Total order over literals.
    ///
    /// NaN equals NaN and sorts below every other number.
    pub fn compare(&self, other: &Literal) -> Ordering {
        let by_type = self.canonical_type().cmp(&other.canonical_type());
        if by_type != Ordering::Equal {
            return by_type;
        }

        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a.cmp(b),
            (Literal::Double(a), Literal::Double(b)) => compare_doubles(*a, *b),
            (Literal::Int(a), Literal::Double(b)) => compare_int_double(*a, *b),
            (Literal::Double(a), Literal::Int(b)) => compare_int_double(*b, *a).reverse(),
            (Literal::Bool(a), Literal::Bool(b)) => a.cmp(b),
            (Literal::String(a), Literal::String(b)) => a.cmp(b),
            (Literal::Array(a), Literal::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Literal::Object(a), Literal::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = va
                        .canonical_type()
                        .cmp(&vb.canonical_type())
                        .then_with(|| ka.cmp(kb))
                        .then_with(|| va.compare(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (
                Literal::Regex { pattern: pa, flags: fa },
                Literal::Regex { pattern: pb, flags: fb },
            ) => pa.cmp(pb).then_with(|| fa.cmp(fb)),
            // MinKey, MaxKey, Null: one value per type
            _ => Ordering::Equal,
        }
    }

    /// Value equivalence used by node equivalence
    pub fn equivalent(&self, other: &Literal) -> bool {
        self.compare(other) == Ordering::Equal
    }

    pub fn is_min_key(&self) -> bool {
        matches!(self, Literal::MinKey)
    }

    pub fn is_max_key(&self) -> bool {
        matches!(self, Literal::MaxKey)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Literal::Double(d) if d.is_nan())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Literal::Array(_))
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Literal::Regex { .. })
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Literal::Int(_) | Literal::Double(_))
    }

    /// Integral value, if this is a number with no fractional part
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Double(d) if d.fract() == 0.0 && d.is_finite() => {
                if *d >= i64::MIN as f64 && *d < i64::MAX as f64 {
                    Some(*d as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a JSON value, honouring the extended JSON wrappers
    /// `$minKey`, `$maxKey`, `$numberDouble`, `$numberLong`, `$numberInt`,
    /// `$regex`/`$options` and `$regularExpression`.
    pub fn from_json(value: &Value) -> ParseResult<Literal> {
        match value {
            Value::Null => Ok(Literal::Null),
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Number(n) => Ok(Self::from_number(n)),
            Value::String(s) => Ok(Literal::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Literal::from_json)
                .collect::<ParseResult<Vec<_>>>()
                .map(Literal::Array),
            Value::Object(map) => {
                if let Some(literal) = Self::from_extended_json(map)? {
                    return Ok(literal);
                }
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Literal::from_json(v)?)))
                    .collect::<ParseResult<Vec<_>>>()
                    .map(Literal::Object)
            }
        }
    }

    fn from_number(n: &Number) -> Literal {
        match n.as_i64() {
            Some(i) => Literal::Int(i),
            None => Literal::Double(n.as_f64().unwrap_or(f64::NAN)),
        }
    }

    /// Returns `Ok(None)` when the object is an ordinary document
    fn from_extended_json(map: &Map<String, Value>) -> ParseResult<Option<Literal>> {
        if map.len() == 1 {
            let (key, payload) = match map.iter().next() {
                Some(entry) => entry,
                None => return Ok(None),
            };
            let literal = match key.as_str() {
                "$minKey" => Literal::MinKey,
                "$maxKey" => Literal::MaxKey,
                "$numberDouble" => {
                    let text = payload
                        .as_str()
                        .ok_or_else(|| ParseError::BadExtendedJson(key.clone()))?;
                    Literal::Double(parse_double(text).ok_or_else(|| {
                        ParseError::BadExtendedJson(key.clone())
                    })?)
                }
                "$numberLong" | "$numberInt" => {
                    let text = payload
                        .as_str()
                        .ok_or_else(|| ParseError::BadExtendedJson(key.clone()))?;
                    Literal::Int(
                        text.parse::<i64>()
                            .map_err(|_| ParseError::BadExtendedJson(key.clone()))?,
                    )
                }
                "$regularExpression" => {
                    let pattern = payload.get("pattern").and_then(Value::as_str);
                    let flags = payload.get("options").and_then(Value::as_str).unwrap_or("");
                    match pattern {
                        Some(pattern) => Literal::Regex {
                            pattern: pattern.to_string(),
                            flags: flags.to_string(),
                        },
                        None => return Err(ParseError::BadExtendedJson(key.clone())),
                    }
                }
                "$regex" => match payload.as_str() {
                    Some(pattern) => Literal::Regex {
                        pattern: pattern.to_string(),
                        flags: String::new(),
                    },
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
            return Ok(Some(literal));
        }

        if map.len() == 2 && map.contains_key("$regex") && map.contains_key("$options") {
            if let (Some(pattern), Some(flags)) = (
                map.get("$regex").and_then(Value::as_str),
                map.get("$options").and_then(Value::as_str),
            ) {
                return Ok(Some(Literal::Regex {
                    pattern: pattern.to_string(),
                    flags: flags.to_string(),
                }));
            }
        }

        Ok(None)
    }

    /// Renders this literal as (extended) JSON
    pub fn to_json(&self) -> Value {
        match self {
            Literal::MinKey => json!({ "$minKey": 1 }),
            Literal::MaxKey => json!({ "$maxKey": 1 }),
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Number((*i).into()),
            Literal::Double(d) => match Number::from_f64(*d) {
                Some(n) => Value::Number(n),
                None => json!({ "$numberDouble": format_double(*d) }),
            },
            Literal::String(s) => Value::String(s.clone()),
            Literal::Array(items) => Value::Array(items.iter().map(Literal::to_json).collect()),
            Literal::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Literal::Regex { pattern, flags } => json!({ "$regex": pattern, "$options": flags }),
        }
    }
}

fn compare_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a double. Casting the integer to
/// `f64` rounds above 2^53 and breaks transitivity.
fn compare_int_double(i: i64, d: f64) -> Ordering {
    // 2^63, exactly representable
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    if d.is_nan() {
        return Ordering::Greater;
    }
    if d >= I64_BOUND {
        return Ordering::Less;
    }
    if d < -I64_BOUND {
        return Ordering::Greater;
    }

    let whole = d.trunc();
    // In [-2^63, 2^63), so the cast is exact
    i.cmp(&(whole as i64)).then_with(|| {
        let fraction = d - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn parse_double(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse::<f64>().ok(),
    }
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d == f64::INFINITY {
        "Infinity".to_string()
    } else if d == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        d.to_string()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::MinKey => write!(f, "MinKey"),
            Literal::MaxKey => write!(f, "MaxKey"),
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{}", format_double(*d)),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Literal::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                write!(f, "}}")
            }
            Literal::Regex { pattern, flags } => write!(f, "/{}/{}", pattern, flags),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Double(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<Vec<Literal>> for Literal {
    fn from(v: Vec<Literal>) -> Self {
        Literal::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_type_order() {
        assert_eq!(Literal::MinKey.compare(&Literal::Null), Ordering::Less);
        assert_eq!(Literal::Null.compare(&Literal::Int(0)), Ordering::Less);
        assert_eq!(Literal::Int(99).compare(&"a".into()), Ordering::Less);
        assert_eq!(
            Literal::Bool(false).compare(&Literal::Array(vec![])),
            Ordering::Greater
        );
        assert_eq!(Literal::MaxKey.compare(&Literal::Bool(true)), Ordering::Greater);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(Literal::Int(1).equivalent(&Literal::Double(1.0)));
        assert_eq!(Literal::Int(2).compare(&Literal::Double(1.5)), Ordering::Greater);
        assert!(!Literal::Int(1).equivalent(&Literal::Int(2)));
    }

    #[test]
    fn test_int_double_compare_exact_above_2_53() {
        let two_53 = 1_i64 << 53;
        let a = Literal::Int(two_53);
        let b = Literal::Double(two_53 as f64);
        let c = Literal::Int(two_53 + 1);

        assert!(a.equivalent(&b));
        assert!(!b.equivalent(&c));
        assert!(!a.equivalent(&c));
        assert_eq!(b.compare(&c), Ordering::Less);
        assert_eq!(c.compare(&b), Ordering::Greater);
    }

    #[test]
    fn test_int_double_fraction_and_range() {
        assert_eq!(Literal::Int(2).compare(&Literal::Double(2.5)), Ordering::Less);
        assert_eq!(Literal::Int(-2).compare(&Literal::Double(-2.5)), Ordering::Greater);
        assert_eq!(Literal::Double(-0.5).compare(&Literal::Int(0)), Ordering::Less);
        assert_eq!(
            Literal::Int(i64::MAX).compare(&Literal::Double(9.3e18)),
            Ordering::Less
        );
        assert_eq!(
            Literal::Int(i64::MIN).compare(&Literal::Double(i64::MIN as f64)),
            Ordering::Equal
        );
        assert_eq!(
            Literal::Int(i64::MIN).compare(&Literal::Double(f64::NEG_INFINITY)),
            Ordering::Greater
        );
        assert_eq!(
            Literal::Int(i64::MAX).compare(&Literal::Double(f64::INFINITY)),
            Ordering::Less
        );
        assert_eq!(
            Literal::Int(i64::MIN).compare(&Literal::Double(f64::NAN)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_nan_equals_nan() {
        let nan = Literal::Double(f64::NAN);
        assert!(nan.equivalent(&Literal::Double(f64::NAN)));
        assert_eq!(nan.compare(&Literal::Double(f64::NEG_INFINITY)), Ordering::Less);
        assert!(nan.is_nan());
        assert!(!Literal::Double(1.0).is_nan());
    }

    #[test]
    fn test_array_compare_elementwise() {
        let a = Literal::Array(vec![1.into(), 2.into()]);
        let b = Literal::Array(vec![1.into(), 3.into()]);
        let c = Literal::Array(vec![1.into()]);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(c.compare(&a), Ordering::Less);
        assert!(a.equivalent(&a.clone()));
    }

    #[test]
    fn test_from_plain_json() {
        let lit = Literal::from_json(&json!({"x": [1, "two", null]})).unwrap();
        match lit {
            Literal::Object(fields) => {
                assert_eq!(fields[0].0, "x");
                assert!(fields[0].1.is_array());
            }
            other => panic!("expected object, got {:?}", other),
        }
        assert!(matches!(Literal::from_json(&json!(1.5)).unwrap(), Literal::Double(_)));
        assert!(matches!(Literal::from_json(&json!(7)).unwrap(), Literal::Int(7)));
    }

    #[test]
    fn test_from_extended_json() {
        assert!(Literal::from_json(&json!({"$minKey": 1})).unwrap().is_min_key());
        assert!(Literal::from_json(&json!({"$maxKey": 1})).unwrap().is_max_key());
        assert!(Literal::from_json(&json!({"$numberDouble": "NaN"}))
            .unwrap()
            .is_nan());
        assert!(matches!(
            Literal::from_json(&json!({"$numberLong": "42"})).unwrap(),
            Literal::Int(42)
        ));
        let regex = Literal::from_json(&json!({"$regex": "^a", "$options": "i"})).unwrap();
        assert!(regex.is_regex());
        assert_eq!(regex.to_string(), "/^a/i");
    }

    #[test]
    fn test_bad_extended_json() {
        let err = Literal::from_json(&json!({"$numberLong": "abc"})).unwrap_err();
        assert_eq!(err, ParseError::BadExtendedJson("$numberLong".into()));
    }

    #[test]
    fn test_to_json_round_trips_special_values() {
        let nan = Literal::Double(f64::NAN).to_json();
        assert_eq!(nan, json!({"$numberDouble": "NaN"}));
        assert!(Literal::from_json(&nan).unwrap().is_nan());
        assert_eq!(Literal::MinKey.to_json(), json!({"$minKey": 1}));
    }

    #[test]
    fn test_display() {
        let lit = Literal::Array(vec![1.into(), "a".into(), Literal::Null]);
        assert_eq!(lit.to_string(), "[1,\"a\",null]");
        let obj = Literal::Object(vec![("k".into(), 2.into())]);
        assert_eq!(obj.to_string(), "{k:2}");
    }
}
