//! Raw wire values
//!
//! One tokenized reply value, as produced by the codec.

use bytes::Bytes;

/// An already-tokenized wire value
///
/// Immutable once produced; aggregates own their children in wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Simple string (`+OK`)
    Simple(String),

    /// Error reply (`-ERR ...`)
    Error(String),

    /// Integer (`:42`)
    Integer(i64),

    /// Bulk string (`$3\r\nfoo`)
    Bulk(Bytes),

    /// Null bulk, null array, or RESP3 null
    Null,

    /// Array of values
    Array(Vec<RawValue>),

    /// RESP3 map, pairs in wire order
    Map(Vec<(RawValue, RawValue)>),

    /// RESP3 boolean
    Boolean(bool),

    /// RESP3 double
    Double(f64),
}

impl RawValue {
    /// Name of the wire type, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Simple(_) => "simple string",
            RawValue::Error(_) => "error",
            RawValue::Integer(_) => "integer",
            RawValue::Bulk(_) => "bulk string",
            RawValue::Null => "null",
            RawValue::Array(_) => "array",
            RawValue::Map(_) => "map",
            RawValue::Boolean(_) => "boolean",
            RawValue::Double(_) => "double",
        }
    }

    /// Bulk string from anything byte-like
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        RawValue::Bulk(data.into())
    }

    /// Array of bulk strings, handy for building replies by hand
    pub fn bulk_array<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        RawValue::Array(items.into_iter().map(RawValue::bulk).collect())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RawValue::Error(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, RawValue::Array(_) | RawValue::Map(_))
    }
}
