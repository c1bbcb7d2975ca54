//! Numbers the server transports as JSON strings (`"filled_qty": "10"`).
//!
//! [`NumericString`] decodes such a string into a concrete numeric type and
//! encodes it back to the plain decimal form the API expects: no exponent,
//! no thousands separators, `.` as the only decimal mark.

use crate::domain::errors::{AlpacaError, Result};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

/// Numeric types that can travel as strings.
pub trait NumericValue: Copy + PartialEq + fmt::Display + FromStr {
    const TYPE_NAME: &'static str;
}

impl NumericValue for f64 {
    const TYPE_NAME: &'static str = "f64";
}

impl NumericValue for f32 {
    const TYPE_NAME: &'static str = "f32";
}

impl NumericValue for i32 {
    const TYPE_NAME: &'static str = "i32";
}

impl NumericValue for i64 {
    const TYPE_NAME: &'static str = "i64";
}

impl NumericValue for u32 {
    const TYPE_NAME: &'static str = "u32";
}

impl NumericValue for u64 {
    const TYPE_NAME: &'static str = "u64";
}

impl NumericValue for Decimal {
    const TYPE_NAME: &'static str = "Decimal";
}

/// Parse `raw` as `T`, failing with [`AlpacaError::MalformedNumber`].
pub fn decode<T: NumericValue>(raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| AlpacaError::MalformedNumber {
        value: raw.to_string(),
        target: T::TYPE_NAME,
    })
}

/// Canonical string form of `value`.
///
/// Rust's `Display` for floats never switches to scientific notation and
/// prints the shortest representation that parses back to the same value.
pub fn encode<T: NumericValue>(value: T) -> String {
    value.to_string()
}

// serde_json flattens custom errors into strings, so the last malformed
// number seen while decoding on this thread is kept here for the pipeline.
thread_local! {
    static LAST_MALFORMED: RefCell<Option<(String, &'static str)>> = const { RefCell::new(None) };
}

pub(crate) fn reset_malformed() {
    LAST_MALFORMED.with(|slot| slot.borrow_mut().take());
}

pub(crate) fn take_malformed() -> Option<AlpacaError> {
    LAST_MALFORMED
        .with(|slot| slot.borrow_mut().take())
        .map(|(value, target)| AlpacaError::MalformedNumber { value, target })
}

fn record_malformed(value: &str, target: &'static str) {
    LAST_MALFORMED.with(|slot| *slot.borrow_mut() = Some((value.to_string(), target)));
}

/// A numeric value carried as a JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericString<T: NumericValue> {
    pub value: T,
}

impl<T: NumericValue> NumericString<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: NumericValue> From<T> for NumericString<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: NumericValue> fmt::Display for NumericString<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self.value))
    }
}

impl<T: NumericValue> FromStr for NumericString<T> {
    type Err = AlpacaError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s).map(Self::new)
    }
}

impl<T: NumericValue> Serialize for NumericString<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(self.value))
    }
}

impl<'de, T: NumericValue> Deserialize<'de> for NumericString<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NumericVisitor<T>(std::marker::PhantomData<T>);

        impl<T: NumericValue> Visitor<'_> for NumericVisitor<T> {
            type Value = NumericString<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a string holding a {}", T::TYPE_NAME)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                match v.parse::<T>() {
                    Ok(value) => Ok(NumericString::new(value)),
                    Err(_) => {
                        record_malformed(v, T::TYPE_NAME);
                        Err(E::custom(format!(
                            "malformed number {:?} for {}",
                            v,
                            T::TYPE_NAME
                        )))
                    }
                }
            }
        }

        deserializer.deserialize_str(NumericVisitor(std::marker::PhantomData))
    }
}
