//! Typed, tolerant field access over a weakly-typed JSON object.
//!
//! Three flavours per semantic type:
//!
//! - `x(key) -> Option<T>`: nullable. Missing, `null` and mismatched JSON
//!   types all read as `None`.
//! - `x_or(key, default) -> T`: non-nullable with a default.
//! - `x_req(key) -> Result<T, FieldError>`: mandatory. Absence or a type
//!   mismatch is a [`FieldError`]; decode functions propagate it with `?`
//!   and the decoder turns it into a malformed passthrough event.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ErrorCode;

/// A mandatory field could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum FieldError {
    /// The field is absent or `null`.
    #[error("mandatory field `{field}` is missing")]
    Missing { field: String },
    /// The field is present with an incompatible JSON type.
    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
}

impl FieldError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::Missing {
            field: field.to_string(),
        }
    }

    pub(crate) fn wrong_type(field: &str, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.to_string(),
            expected,
        }
    }

    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field } | Self::WrongType { field, .. } => field,
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Missing { .. } => ErrorCode::MissingMandatoryField,
            Self::WrongType { .. } => ErrorCode::WrongFieldType,
        }
    }
}

/// Borrowed view over a JSON object with typed getters.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wrap an object map.
    #[must_use]
    pub const fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Raw value passthrough. `null` reads as absent.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// True when the key is present and not `null`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// The underlying map.
    #[must_use]
    pub const fn map(&self) -> &'a Map<String, Value> {
        self.map
    }

    fn required<T>(
        &self,
        key: &str,
        expected: &'static str,
        read: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, FieldError> {
        let value = self.value(key).ok_or_else(|| FieldError::missing(key))?;
        read(value).ok_or_else(|| FieldError::wrong_type(key, expected))
    }

    // -- strings ------------------------------------------------------------

    /// String field.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.value(key).and_then(Value::as_str)
    }

    /// Mandatory string field.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not a string.
    pub fn str_req(&self, key: &str) -> Result<&'a str, FieldError> {
        self.required(key, "a string", Value::as_str)
    }

    /// Owned string field.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<String> {
        self.str(key).map(str::to_string)
    }

    /// Mandatory owned string field.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not a string.
    pub fn string_req(&self, key: &str) -> Result<String, FieldError> {
        self.str_req(key).map(str::to_string)
    }

    /// String field where an empty (or all-blank) value counts as absent.
    #[must_use]
    pub fn non_empty_str(&self, key: &str) -> Option<&'a str> {
        self.str(key).filter(|s| !s.trim().is_empty())
    }

    /// Array of strings; non-string elements are skipped.
    #[must_use]
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.value(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    // -- integers -----------------------------------------------------------

    /// Signed 64-bit integer. Integral floats (`3.0`) are accepted.
    #[must_use]
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(as_i64)
    }

    /// Signed 64-bit integer with a default.
    #[must_use]
    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.i64(key).unwrap_or(default)
    }

    /// Mandatory signed 64-bit integer.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not an integer.
    pub fn i64_req(&self, key: &str) -> Result<i64, FieldError> {
        self.required(key, "an integer", as_i64)
    }

    /// Signed 32-bit integer. Out-of-range values read as absent.
    #[must_use]
    pub fn i32(&self, key: &str) -> Option<i32> {
        self.i64(key).and_then(|v| i32::try_from(v).ok())
    }

    /// Signed 32-bit integer with a default.
    #[must_use]
    pub fn i32_or(&self, key: &str, default: i32) -> i32 {
        self.i32(key).unwrap_or(default)
    }

    /// Mandatory signed 32-bit integer.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent, not an integer, or out of range.
    pub fn i32_req(&self, key: &str) -> Result<i32, FieldError> {
        self.required(key, "a 32-bit integer", |v| {
            as_i64(v).and_then(|n| i32::try_from(n).ok())
        })
    }

    /// Unsigned 64-bit integer.
    #[must_use]
    pub fn u64(&self, key: &str) -> Option<u64> {
        self.value(key).and_then(Value::as_u64)
    }

    /// Unsigned 64-bit integer with a default.
    #[must_use]
    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.u64(key).unwrap_or(default)
    }

    /// Mandatory unsigned 64-bit integer.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not an unsigned integer.
    pub fn u64_req(&self, key: &str) -> Result<u64, FieldError> {
        self.required(key, "an unsigned integer", Value::as_u64)
    }

    // -- floats -------------------------------------------------------------

    /// Double-precision float (integers are widened).
    #[must_use]
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(Value::as_f64)
    }

    /// Double-precision float with a default.
    #[must_use]
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.f64(key).unwrap_or(default)
    }

    /// Mandatory double-precision float.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not a number.
    pub fn f64_req(&self, key: &str) -> Result<f64, FieldError> {
        self.required(key, "a number", Value::as_f64)
    }

    // -- booleans -----------------------------------------------------------

    /// Boolean. Older journals sometimes wrote `0`/`1`; both are accepted.
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(as_bool)
    }

    /// Boolean with a default.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.bool(key).unwrap_or(default)
    }

    /// Mandatory boolean.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when absent or not a boolean.
    pub fn bool_req(&self, key: &str) -> Result<bool, FieldError> {
        self.required(key, "a boolean", as_bool)
    }

    // -- nested -------------------------------------------------------------

    /// Nested object view.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Self> {
        self.value(key).and_then(Value::as_object).map(Self::new)
    }

    /// Array of sub-objects, each decoded by `decode`.
    ///
    /// Returns `None` when the key is missing or not an array. Elements that
    /// are not objects or fail to decode are skipped.
    pub fn objects<T>(
        &self,
        key: &str,
        mut decode: impl FnMut(Self) -> Result<T, FieldError>,
    ) -> Option<Vec<T>> {
        let items = self.value(key).and_then(Value::as_array)?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Some(obj) = item.as_object() else {
                debug!(key, index, "skipping non-object array element");
                continue;
            };
            match decode(Self::new(obj)) {
                Ok(decoded) => out.push(decoded),
                Err(error) => debug!(key, index, %error, "skipping undecodable array element"),
            }
        }
        Some(out)
    }

    /// Mandatory array of sub-objects.
    ///
    /// # Errors
    ///
    /// [`FieldError`] when the key is absent or not an array.
    pub fn objects_req<T>(
        &self,
        key: &str,
        decode: impl FnMut(Self) -> Result<T, FieldError>,
    ) -> Result<Vec<T>, FieldError> {
        match self.value(key) {
            None => Err(FieldError::missing(key)),
            Some(v) if !v.is_array() => Err(FieldError::wrong_type(key, "an array")),
            Some(_) => Ok(self.objects(key, decode).unwrap_or_default()),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn as_i64(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}
