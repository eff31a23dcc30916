//! Scalar values carried in an event's `extra` map.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single scalar read off the triggering entity.
///
/// `Null` records that the accessor exists but had no value, so the key is
/// still present in the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum Scalar {
    /// No value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number. Must be finite; the event builder rejects
    /// NaN and infinities.
    Float(f64),
    /// Text.
    Text(String),
}

impl Scalar {
    /// Whether this is [`Scalar::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_variant() {
        let values: Vec<Scalar> =
            serde_json::from_str(r#"[null, true, 5, 2.5, "five"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Int(5),
                Scalar::Float(2.5),
                Scalar::Text("five".to_owned()),
            ]
        );
    }

    #[test]
    fn whole_floats_stay_floats() {
        let json = serde_json::to_string(&Scalar::Float(5.0)).unwrap();
        let back: Scalar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Scalar::Float(5.0));
    }

    #[test]
    fn option_conversion() {
        assert!(Scalar::from(None::<i64>).is_null());
        assert_eq!(Scalar::from(Some(3_i64)), Scalar::Int(3));
    }
}
