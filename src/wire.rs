//! Wire-safe float serialization
//!
//! JSON has no token for NaN or infinity. Every float that leaves the engine
//! is routed through these serializers so that a degenerate computation can
//! never produce an unparseable response body:
//!
//! - finite values are written as numbers
//! - NaN is written as `null`
//! - infinities are written as the strings `"Infinity"` / `"-Infinity"`
//!
//! Use with `#[serde(serialize_with = "crate::wire::float")]` and friends.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A float wrapped for safe serialization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finite(pub f64);

impl Serialize for Finite {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.0;
        if value.is_nan() {
            serializer.serialize_none()
        } else if value == f64::INFINITY {
            serializer.serialize_str("Infinity")
        } else if value == f64::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(value)
        }
    }
}

/// Serialize a single `f64`
pub fn float<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Finite(*value).serialize(serializer)
}

/// Serialize an `Option<f64>`; `None` becomes `null`
pub fn optional_float<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => Finite(*v).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Serialize a `key -> f64` map
pub fn float_map<S>(map: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (k, v) in map {
        out.serialize_entry(k, &Finite(*v))?;
    }
    out.end()
}

/// Serialize a `key -> key -> f64` map
pub fn nested_float_map<S>(
    map: &BTreeMap<String, BTreeMap<String, f64>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    struct Inner<'a>(&'a BTreeMap<String, f64>);

    impl Serialize for Inner<'_> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            float_map(self.0, serializer)
        }
    }

    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (k, v) in map {
        out.serialize_entry(k, &Inner(v))?;
    }
    out.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Sample {
        #[serde(serialize_with = "float")]
        a: f64,
        #[serde(serialize_with = "optional_float")]
        b: Option<f64>,
        #[serde(serialize_with = "nested_float_map")]
        d: BTreeMap<String, BTreeMap<String, f64>>,
    }

    #[test]
    fn test_finite_values_pass_through() {
        let value = serde_json::to_value(Finite(1.25)).unwrap();
        assert_eq!(value, json!(1.25));
    }

    #[test]
    fn test_nan_becomes_null() {
        let value = serde_json::to_value(Finite(f64::NAN)).unwrap();
        assert_eq!(value, serde_json::Value::Null);
    }

    #[test]
    fn test_infinities_become_strings() {
        assert_eq!(
            serde_json::to_value(Finite(f64::INFINITY)).unwrap(),
            json!("Infinity")
        );
        assert_eq!(
            serde_json::to_value(Finite(f64::NEG_INFINITY)).unwrap(),
            json!("-Infinity")
        );
    }

    #[test]
    fn test_struct_with_non_finite_fields_serializes() {
        let mut inner = BTreeMap::new();
        inner.insert("y".to_string(), f64::NAN);
        let mut d = BTreeMap::new();
        d.insert("x".to_string(), inner);

        let sample = Sample {
            a: f64::INFINITY,
            b: Some(f64::NAN),
            d,
        };

        let text = serde_json::to_string(&sample).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!({
                "a": "Infinity",
                "b": null,
                "d": {"x": {"y": null}}
            })
        );
    }
}
