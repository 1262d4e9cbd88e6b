//! Tags, their types and the dynamic values they hold.
//!
//! Two numeric store laws live here because every instruction family picks
//! one of them: [`TagType::store_copy`] clamps into the destination domain,
//! [`TagType::store_calc`] wraps modularly to the destination bit width.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{LadderError, Result};

/// The closed set of PLC data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagType {
    Bool,
    Int,
    Dint,
    Real,
    Word,
    Char,
}

impl Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagType::Bool => "BOOL",
            TagType::Int => "INT",
            TagType::Dint => "DINT",
            TagType::Real => "REAL",
            TagType::Word => "WORD",
            TagType::Char => "CHAR",
        };
        write!(f, "{}", name)
    }
}

/// Dynamic value stored in tags, memory and literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Char(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Bool(false)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(x) => write!(f, "{}", x),
            Value::Char(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Char(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Char(value)
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Real(x) => *x != 0.0,
            Value::Char(s) => !s.is_empty(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Char(_))
    }

    /// Numeric view of the value; `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Real(x) => Some(*x),
            Value::Char(_) => None,
        }
    }

    /// Integer view of the value, truncating reals toward zero.
    /// `None` for text and non-finite reals.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            Value::Real(x) if x.is_finite() => Some(x.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Char(s) => Some(s),
            _ => None,
        }
    }
}

/// True for the values a CHAR cell can hold: blank, or one ASCII character.
pub fn is_char_value(text: &str) -> bool {
    text.is_empty() || (text.len() == 1 && text.is_ascii())
}

fn round_real(x: f64) -> f64 {
    (x as f32) as f64
}

fn wrap_to(value: i64, bits: u32, signed: bool) -> i64 {
    let modulus = 1i128 << bits;
    let wrapped = (value as i128).rem_euclid(modulus);
    if signed && wrapped >= modulus / 2 {
        (wrapped - modulus) as i64
    } else {
        wrapped as i64
    }
}

fn wrap_real_to(value: f64, bits: u32, signed: bool) -> i64 {
    let modulus = (1u64 << bits) as f64;
    let wrapped = value.trunc().rem_euclid(modulus) as i64;
    if signed && wrapped >= (1i64 << (bits - 1)) {
        wrapped - (1i64 << bits)
    } else {
        wrapped
    }
}

impl TagType {
    pub fn default_value(self) -> Value {
        match self {
            TagType::Bool => Value::Bool(false),
            TagType::Int | TagType::Dint | TagType::Word => Value::Int(0),
            TagType::Real => Value::Real(0.0),
            TagType::Char => Value::Char(String::new()),
        }
    }

    pub fn default_retentive(self) -> bool {
        !matches!(self, TagType::Bool)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TagType::Int | TagType::Dint | TagType::Real | TagType::Word
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, TagType::Int | TagType::Dint | TagType::Word)
    }

    /// Width used by pack/unpack instructions.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            TagType::Int | TagType::Word => Some(16),
            TagType::Dint | TagType::Real => Some(32),
            _ => None,
        }
    }

    /// Inclusive integer domain of the integral types.
    pub fn bounds(self) -> Option<(i64, i64)> {
        match self {
            TagType::Int => Some((i16::MIN as i64, i16::MAX as i64)),
            TagType::Dint => Some((i32::MIN as i64, i32::MAX as i64)),
            TagType::Word => Some((0, u16::MAX as i64)),
            TagType::Bool => Some((0, 1)),
            _ => None,
        }
    }

    /// Copy law: clamp into the destination domain.
    ///
    /// Non-finite reals store as zero. `None` means the value cannot be
    /// represented at all (text into a number, a number or a long string
    /// into a CHAR) and the caller must raise the out-of-range fault.
    pub fn store_copy(self, value: &Value) -> Option<Value> {
        match self {
            TagType::Bool => match value {
                Value::Char(_) => None,
                v => Some(Value::Bool(v.is_truthy())),
            },
            TagType::Int | TagType::Dint | TagType::Word => {
                let (lo, hi) = self.bounds()?;
                let raw = match value {
                    Value::Bool(b) => *b as i64,
                    Value::Int(i) => *i,
                    Value::Real(x) if !x.is_finite() => 0,
                    Value::Real(x) => {
                        let t = x.trunc();
                        if t < lo as f64 {
                            lo
                        } else if t > hi as f64 {
                            hi
                        } else {
                            t as i64
                        }
                    }
                    Value::Char(_) => return None,
                };
                Some(Value::Int(raw.clamp(lo, hi)))
            }
            TagType::Real => {
                let x = value.as_f64()?;
                if !x.is_finite() {
                    return Some(Value::Real(0.0));
                }
                let limit = f32::MAX as f64;
                Some(Value::Real(round_real(x.clamp(-limit, limit))))
            }
            TagType::Char => match value {
                Value::Char(s) if is_char_value(s) => Some(value.clone()),
                _ => None,
            },
        }
    }

    /// Calc law: wrap modularly to the destination bit width.
    ///
    /// `hex` forces an unsigned 16-bit wrap whatever the destination. `None`
    /// means the value is not finite (or not numeric) and the caller stores
    /// zero and raises the division-error fault.
    pub fn store_calc(self, value: &Value, hex: bool) -> Option<Value> {
        let stored = match value {
            Value::Char(_) => return None,
            Value::Real(x) if !x.is_finite() => return None,
            Value::Bool(_) | Value::Int(_) if hex => {
                let w = wrap_to(value.as_i64()?, 16, false);
                self.hex_result(w)
            }
            Value::Real(x) if hex => self.hex_result(wrap_real_to(*x, 16, false)),
            Value::Bool(_) | Value::Int(_) => {
                let i = value.as_i64()?;
                match self {
                    TagType::Bool => Value::Bool(i != 0),
                    TagType::Int => Value::Int(wrap_to(i, 16, true)),
                    TagType::Dint => Value::Int(wrap_to(i, 32, true)),
                    TagType::Word => Value::Int(wrap_to(i, 16, false)),
                    TagType::Real => Value::Real(round_real(i as f64)),
                    TagType::Char => return None,
                }
            }
            Value::Real(x) => match self {
                TagType::Bool => Value::Bool(*x != 0.0),
                TagType::Int => Value::Int(wrap_real_to(*x, 16, true)),
                TagType::Dint => Value::Int(wrap_real_to(*x, 32, true)),
                TagType::Word => Value::Int(wrap_real_to(*x, 16, false)),
                TagType::Real => {
                    let r = round_real(*x);
                    if !r.is_finite() {
                        return None;
                    }
                    Value::Real(r)
                }
                TagType::Char => return None,
            },
        };
        Some(stored)
    }

    fn hex_result(self, unsigned: i64) -> Value {
        match self {
            TagType::Int => Value::Int(unsigned as u16 as i16 as i64),
            TagType::Real => Value::Real(unsigned as f64),
            TagType::Bool => Value::Bool(unsigned != 0),
            _ => Value::Int(unsigned),
        }
    }
}

/// A named, typed memory cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub tag_type: TagType,
    pub default: Value,
    pub retentive: bool,
}

impl Tag {
    pub fn new<S: Into<String>>(name: S, tag_type: TagType) -> Self {
        Tag {
            name: name.into(),
            tag_type,
            default: tag_type.default_value(),
            retentive: tag_type.default_retentive(),
        }
    }

    pub fn bool<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Bool)
    }

    pub fn int<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Int)
    }

    pub fn dint<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Dint)
    }

    pub fn real<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Real)
    }

    pub fn word<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Word)
    }

    pub fn char<S: Into<String>>(name: S) -> Self {
        Tag::new(name, TagType::Char)
    }

    /// Replaces the declared default. The value must belong to the tag's domain.
    pub fn with_default<V: Into<Value>>(mut self, value: V) -> Result<Self> {
        let value = value.into();
        match self.tag_type.store_copy(&value) {
            Some(stored) if stored == value || self.tag_type == TagType::Real => {
                self.default = stored;
                Ok(self)
            }
            _ => Err(LadderError::invalid(format!(
                "default {} does not fit {} tag '{}'",
                value, self.tag_type, self.name
            ))),
        }
    }

    pub fn retentive(mut self, retentive: bool) -> Self {
        self.retentive = retentive;
        self
    }

    /// Fails with [`LadderError::TagType`] unless the tag has one of `allowed` types.
    pub fn expect_type(&self, allowed: &[TagType], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.tag_type) {
            Ok(())
        } else {
            Err(LadderError::TagType {
                tag: self.name.clone(),
                expected,
                found: self.tag_type,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_clamps_into_int() {
        assert_eq!(
            TagType::Int.store_copy(&Value::Int(70000)),
            Some(Value::Int(32767))
        );
        assert_eq!(
            TagType::Int.store_copy(&Value::Int(-70000)),
            Some(Value::Int(-32768))
        );
        assert_eq!(
            TagType::Word.store_copy(&Value::Int(-5)),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn copy_non_finite_stores_zero() {
        assert_eq!(
            TagType::Dint.store_copy(&Value::Real(f64::NAN)),
            Some(Value::Int(0))
        );
        assert_eq!(
            TagType::Real.store_copy(&Value::Real(f64::INFINITY)),
            Some(Value::Real(0.0))
        );
    }

    #[test]
    fn copy_into_char_accepts_blank_or_single_ascii() {
        assert!(TagType::Char.store_copy(&Value::from("")).is_some());
        assert!(TagType::Char.store_copy(&Value::from("A")).is_some());
        assert!(TagType::Char.store_copy(&Value::from("AB")).is_none());
        assert!(TagType::Char.store_copy(&Value::from("é")).is_none());
        assert!(TagType::Char.store_copy(&Value::Int(65)).is_none());
    }

    #[test]
    fn calc_wraps_by_destination() {
        assert_eq!(
            TagType::Int.store_calc(&Value::Int(60000), false),
            Some(Value::Int(-5536))
        );
        assert_eq!(
            TagType::Word.store_calc(&Value::Int(-1), false),
            Some(Value::Int(65535))
        );
        assert_eq!(
            TagType::Dint.store_calc(&Value::Int(i32::MAX as i64 + 1), false),
            Some(Value::Int(i32::MIN as i64))
        );
        assert_eq!(
            TagType::Int.store_calc(&Value::Real(32768.9), false),
            Some(Value::Int(-32768))
        );
    }

    #[test]
    fn calc_hex_mode_is_unsigned_16_bit() {
        assert_eq!(
            TagType::Dint.store_calc(&Value::Int(0x1_0005), true),
            Some(Value::Int(5))
        );
        assert_eq!(
            TagType::Dint.store_calc(&Value::Int(-1), true),
            Some(Value::Int(0xFFFF))
        );
    }

    #[test]
    fn calc_rejects_non_finite() {
        assert_eq!(TagType::Int.store_calc(&Value::Real(f64::NAN), false), None);
    }

    #[test]
    fn default_must_fit_domain() {
        assert!(Tag::int("X").with_default(40000).is_err());
        let tag = Tag::int("X").with_default(12).unwrap();
        assert_eq!(tag.default, Value::Int(12));
        assert!(!Tag::bool("B").retentive);
        assert!(Tag::dint("D").retentive);
    }
}
