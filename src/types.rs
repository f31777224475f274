//! Shared identifiers and scalar type tags used across the builder.

use serde::{Deserialize, Serialize};

/// Fixed page size for every paged on-disk structure (spec §3, §6).
pub const PAGE_SIZE: usize = 4096;

/// Dense, zero-based identifier for a node or rel label.
pub type LabelId = u16;

/// Dense, zero-based offset of a node within its label's namespace.
pub type NodeOffset = u64;

/// Dense id of a structured or unstructured property within its owning label.
pub type PropId = u32;

/// Direction of traversal for a relationship label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Fwd,
    Bwd,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Fwd, Direction::Bwd];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Fwd => Direction::Bwd,
            Direction::Bwd => Direction::Fwd,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Direction::Fwd => 0,
            Direction::Bwd => 1,
        }
    }
}

/// The type of a node's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdType {
    Int64,
    String,
}

/// Relationship multiplicity, as declared in the dataset descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    OneOne,
    OneMany,
    ManyOne,
    ManyMany,
}

impl Multiplicity {
    /// Whether a given direction carries at most one neighbor per source node.
    pub fn is_single(self, direction: Direction) -> bool {
        use Direction::*;
        use Multiplicity::*;
        match (self, direction) {
            (OneOne, _) => true,
            (OneMany, Fwd) => false,
            (OneMany, Bwd) => true,
            (ManyOne, Fwd) => true,
            (ManyOne, Bwd) => false,
            (ManyMany, _) => false,
        }
    }
}

/// Closed set of property value types (spec §9: "a closed tagged variant at
/// the leaves"). The discriminant doubles as the on-disk `typeId` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeId {
    Int64 = 0,
    Double = 1,
    Bool = 2,
    Date = 3,
    Timestamp = 4,
    Interval = 5,
    String = 6,
    List = 7,
}

impl TypeId {
    /// Fixed width of a scalar element in a column, excluding the null-mask
    /// tail and excluding `String`/`List` which are routed through overflow.
    pub fn fixed_width(self) -> usize {
        match self {
            TypeId::Int64 => 8,
            TypeId::Double => 8,
            TypeId::Bool => 1,
            TypeId::Date => 4,
            TypeId::Timestamp => 8,
            TypeId::Interval => 16,
            TypeId::String => 16, // InlineString
            TypeId::List => 16,   // InlineString-shaped list handle
        }
    }

    pub fn from_name(name: &str) -> Option<TypeId> {
        Some(match name.to_ascii_uppercase().as_str() {
            "INT64" => TypeId::Int64,
            "DOUBLE" => TypeId::Double,
            "BOOL" | "BOOLEAN" => TypeId::Bool,
            "DATE" => TypeId::Date,
            "TIMESTAMP" => TypeId::Timestamp,
            "INTERVAL" => TypeId::Interval,
            "STRING" => TypeId::String,
            _ if name.to_ascii_uppercase().starts_with("LIST") => TypeId::List,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}
