//! Decoded argument and result values.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WireError};
use crate::kind::CodecKind;

/// A decoded argument list or result, tagged with its layout.
///
/// `Opaque(None)` is "no value": it encodes to the empty buffer and is what
/// an empty opaque buffer decodes to.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// A JSON value, or no value at all.
    Opaque(Option<Value>),
    /// Signed 32-bit integers.
    Int32(Vec<i32>),
    /// 64-bit floats.
    Float64(Vec<f64>),
}

impl Values {
    /// Build an opaque argument list from anything serializable.
    ///
    /// Tuples and slices serialize to JSON arrays, which is what a
    /// computation expects to receive as positional arguments.
    pub fn opaque<T: Serialize + ?Sized>(args: &T) -> Result<Self> {
        serde_json::to_value(args)
            .map(|value| Values::Opaque(Some(value)))
            .map_err(|e| WireError::serialization(CodecKind::Opaque, e.to_string()))
    }

    /// The "no value" opaque result.
    pub fn none() -> Self {
        Values::Opaque(None)
    }

    /// The layout these values belong to.
    pub fn kind(&self) -> CodecKind {
        match self {
            Values::Opaque(_) => CodecKind::Opaque,
            Values::Int32(_) => CodecKind::Int32Vector,
            Values::Float64(_) => CodecKind::Float64Vector,
        }
    }

    /// Number of positional elements.
    ///
    /// Opaque values count the items of a JSON array, 1 for any other
    /// value and 0 for "no value".
    pub fn len(&self) -> usize {
        match self {
            Values::Opaque(None) => 0,
            Values::Opaque(Some(Value::Array(items))) => items.len(),
            Values::Opaque(Some(_)) => 1,
            Values::Int32(v) => v.len(),
            Values::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int32(&self) -> Option<&[i32]> {
        match self {
            Values::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<&[f64]> {
        match self {
            Values::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<Option<&Value>> {
        match self {
            Values::Opaque(v) => Some(v.as_ref()),
            _ => None,
        }
    }
}

impl From<Vec<i32>> for Values {
    fn from(v: Vec<i32>) -> Self {
        Values::Int32(v)
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self {
        Values::Float64(v)
    }
}

impl From<Value> for Values {
    fn from(v: Value) -> Self {
        Values::Opaque(Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn opaque_from_tuple_is_an_array() {
        let values = Values::opaque(&(2, "x", false)).unwrap();
        assert_eq!(values, Values::Opaque(Some(json!([2, "x", false]))));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn kinds() {
        assert_eq!(Values::none().kind(), CodecKind::Opaque);
        assert_eq!(Values::from(vec![1]).kind(), CodecKind::Int32Vector);
        assert_eq!(Values::from(vec![1.0]).kind(), CodecKind::Float64Vector);
    }

    #[test]
    fn lengths() {
        assert!(Values::none().is_empty());
        assert_eq!(Values::from(json!("scalar")).len(), 1);
        assert_eq!(Values::from(vec![1.0, 2.0]).len(), 2);
    }

    #[test]
    fn accessors() {
        let ints = Values::from(vec![4, 5]);
        assert_eq!(ints.as_int32(), Some(&[4, 5][..]));
        assert!(ints.as_float64().is_none());
        assert!(ints.as_opaque().is_none());
        assert_eq!(Values::none().as_opaque(), Some(None));
    }
}
