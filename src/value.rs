//! The closed set of property values a column or list element can hold
//! (spec §9: "a closed tagged variant at the leaves").

use crate::types::TypeId;

/// A calendar interval, stored as months/days/microseconds (16 bytes, little
/// endian) — the same width budget as [`crate::types::TypeId::Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn to_bytes(self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.months.to_le_bytes());
        buf[4..8].copy_from_slice(&self.days.to_le_bytes());
        buf[8..16].copy_from_slice(&self.micros.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            months: i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            days: i32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            micros: i64::from_le_bytes(bytes[8..16].try_into().unwrap()),
        }
    }
}

/// A single parsed CSV token, already coerced to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Int64(i64),
    Double(f64),
    Bool(bool),
    Date(i32),
    Timestamp(i64),
    Interval(Interval),
    Str(String),
    List(Vec<PropValue>),
}

impl PropValue {
    pub fn type_id(&self) -> TypeId {
        match self {
            PropValue::Int64(_) => TypeId::Int64,
            PropValue::Double(_) => TypeId::Double,
            PropValue::Bool(_) => TypeId::Bool,
            PropValue::Date(_) => TypeId::Date,
            PropValue::Timestamp(_) => TypeId::Timestamp,
            PropValue::Interval(_) => TypeId::Interval,
            PropValue::Str(_) => TypeId::String,
            PropValue::List(_) => TypeId::List,
        }
    }

    /// Encodes a fixed-width scalar's bytes (not meaningful for `Str`/`List`,
    /// which are routed through the overflow file instead).
    pub fn scalar_bytes(&self) -> Option<Vec<u8>> {
        Some(match self {
            PropValue::Int64(v) => v.to_le_bytes().to_vec(),
            PropValue::Double(v) => v.to_le_bytes().to_vec(),
            PropValue::Bool(v) => vec![*v as u8],
            PropValue::Date(v) => v.to_le_bytes().to_vec(),
            PropValue::Timestamp(v) => v.to_le_bytes().to_vec(),
            PropValue::Interval(v) => v.to_bytes().to_vec(),
            PropValue::Str(_) | PropValue::List(_) => return None,
        })
    }
}
