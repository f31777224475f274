//! Dataset catalog: label/property definitions and `catalog.bin` /
//! `graph.bin` serialization (spec §3, SPEC_FULL §F.4-5, §H).

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::types::{IdType, LabelId, Multiplicity, PropId, TypeId};

const CATALOG_MAGIC: &[u8; 8] = b"CGCATLG1";
const STATS_MAGIC: &[u8; 8] = b"CGSTATS1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    pub id: PropId,
    pub name: String,
    pub type_id: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLabel {
    pub id: LabelId,
    pub name: String,
    pub id_type: IdType,
    pub structured_props: Vec<PropertyDef>,
    pub unstructured_props: Vec<String>,
}

impl NodeLabel {
    pub fn primary_key_type(&self) -> IdType {
        self.id_type
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelLabel {
    pub id: LabelId,
    pub name: String,
    pub multiplicity: Multiplicity,
    pub src_labels: Vec<LabelId>,
    pub dst_labels: Vec<LabelId>,
    pub props: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub node_labels: Vec<NodeLabel>,
    pub rel_labels: Vec<RelLabel>,
}

impl Catalog {
    pub fn node_label(&self, id: LabelId) -> &NodeLabel {
        &self.node_labels[id as usize]
    }

    pub fn rel_label(&self, id: LabelId) -> &RelLabel {
        &self.rel_labels[id as usize]
    }

    pub fn node_label_by_name(&self, name: &str) -> Option<&NodeLabel> {
        self.node_labels.iter().find(|l| l.name == name)
    }

    fn write_str(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    fn read_str(cursor: &mut &[u8]) -> Result<String> {
        let len = read_u16(cursor)? as usize;
        if cursor.len() < len {
            return Err(LoadError::Internal("truncated catalog string".into()));
        }
        let (s, rest) = cursor.split_at(len);
        *cursor = rest;
        String::from_utf8(s.to_vec()).map_err(|e| LoadError::Internal(e.to_string()))
    }

    fn write_prop(buf: &mut Vec<u8>, p: &PropertyDef) {
        buf.extend_from_slice(&(p.id as u16).to_le_bytes());
        Self::write_str(buf, &p.name);
        buf.push(p.type_id);
    }

    fn read_prop(cursor: &mut &[u8]) -> Result<PropertyDef> {
        let id = read_u16(cursor)? as PropId;
        let name = Self::read_str(cursor)?;
        let type_id = read_u8(cursor)?;
        Ok(PropertyDef { id, name, type_id })
    }

    /// Serializes this catalog to `catalog.bin`'s exact byte layout
    /// (SPEC_FULL §H). Deterministic for a fixed descriptor.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(CATALOG_MAGIC);
        buf.extend_from_slice(&(self.node_labels.len() as u32).to_le_bytes());
        for n in &self.node_labels {
            buf.extend_from_slice(&n.id.to_le_bytes());
            Self::write_str(&mut buf, &n.name);
            buf.push(match n.id_type {
                IdType::Int64 => 0,
                IdType::String => 1,
            });
            buf.extend_from_slice(&(n.structured_props.len() as u16).to_le_bytes());
            for p in &n.structured_props {
                Self::write_prop(&mut buf, p);
            }
            buf.extend_from_slice(&(n.unstructured_props.len() as u16).to_le_bytes());
            for name in &n.unstructured_props {
                Self::write_str(&mut buf, name);
            }
        }
        buf.extend_from_slice(&(self.rel_labels.len() as u32).to_le_bytes());
        for r in &self.rel_labels {
            buf.extend_from_slice(&r.id.to_le_bytes());
            Self::write_str(&mut buf, &r.name);
            buf.push(match r.multiplicity {
                Multiplicity::OneOne => 0,
                Multiplicity::OneMany => 1,
                Multiplicity::ManyOne => 2,
                Multiplicity::ManyMany => 3,
            });
            buf.extend_from_slice(&(r.src_labels.len() as u16).to_le_bytes());
            for l in &r.src_labels {
                buf.extend_from_slice(&l.to_le_bytes());
            }
            buf.extend_from_slice(&(r.dst_labels.len() as u16).to_le_bytes());
            for l in &r.dst_labels {
                buf.extend_from_slice(&l.to_le_bytes());
            }
            buf.extend_from_slice(&(r.props.len() as u16).to_le_bytes());
            for p in &r.props {
                Self::write_prop(&mut buf, p);
            }
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let magic = read_magic(&mut cursor)?;
        if &magic != CATALOG_MAGIC {
            return Err(LoadError::Internal("bad catalog.bin magic".into()));
        }
        let num_node_labels = read_u32(&mut cursor)?;
        let mut node_labels = Vec::with_capacity(num_node_labels as usize);
        for _ in 0..num_node_labels {
            let id = read_u16(&mut cursor)?;
            let name = Self::read_str(&mut cursor)?;
            let id_type = match read_u8(&mut cursor)? {
                0 => IdType::Int64,
                1 => IdType::String,
                other => return Err(LoadError::Internal(format!("bad idType tag {other}"))),
            };
            let num_structured = read_u16(&mut cursor)?;
            let mut structured_props = Vec::with_capacity(num_structured as usize);
            for _ in 0..num_structured {
                structured_props.push(Self::read_prop(&mut cursor)?);
            }
            let num_unstructured = read_u16(&mut cursor)?;
            let mut unstructured_props = Vec::with_capacity(num_unstructured as usize);
            for _ in 0..num_unstructured {
                unstructured_props.push(Self::read_str(&mut cursor)?);
            }
            node_labels.push(NodeLabel {
                id,
                name,
                id_type,
                structured_props,
                unstructured_props,
            });
        }
        let num_rel_labels = read_u32(&mut cursor)?;
        let mut rel_labels = Vec::with_capacity(num_rel_labels as usize);
        for _ in 0..num_rel_labels {
            let id = read_u16(&mut cursor)?;
            let name = Self::read_str(&mut cursor)?;
            let multiplicity = match read_u8(&mut cursor)? {
                0 => Multiplicity::OneOne,
                1 => Multiplicity::OneMany,
                2 => Multiplicity::ManyOne,
                3 => Multiplicity::ManyMany,
                other => return Err(LoadError::Internal(format!("bad multiplicity tag {other}"))),
            };
            let num_src = read_u16(&mut cursor)?;
            let mut src_labels = Vec::with_capacity(num_src as usize);
            for _ in 0..num_src {
                src_labels.push(read_u16(&mut cursor)?);
            }
            let num_dst = read_u16(&mut cursor)?;
            let mut dst_labels = Vec::with_capacity(num_dst as usize);
            for _ in 0..num_dst {
                dst_labels.push(read_u16(&mut cursor)?);
            }
            let num_props = read_u16(&mut cursor)?;
            let mut props = Vec::with_capacity(num_props as usize);
            for _ in 0..num_props {
                props.push(Self::read_prop(&mut cursor)?);
            }
            rel_labels.push(RelLabel {
                id,
                name,
                multiplicity,
                src_labels,
                dst_labels,
                props,
            });
        }
        Ok(Catalog {
            node_labels,
            rel_labels,
        })
    }

    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        f.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn read_from(path: &std::path::Path) -> Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

/// `graph.bin`: node-label counts and per-direction, per-bound-label rel
/// counts (SPEC_FULL §F.5, §H).
#[derive(Debug, Default, Clone)]
pub struct GraphStats {
    pub node_counts: Vec<(LabelId, u64)>,
    /// rel label -> direction (0=FWD,1=BWD) -> bound label -> count
    pub rel_counts: Vec<(LabelId, [HashMap<LabelId, u64>; 2])>,
}

impl GraphStats {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(STATS_MAGIC);
        buf.extend_from_slice(&(self.node_counts.len() as u32).to_le_bytes());
        for (label, count) in &self.node_counts {
            buf.extend_from_slice(&label.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
        }
        buf.extend_from_slice(&(self.rel_counts.len() as u32).to_le_bytes());
        for (label, dirs) in &self.rel_counts {
            buf.extend_from_slice(&label.to_le_bytes());
            for dir in dirs {
                let mut entries: Vec<(&LabelId, &u64)> = dir.iter().collect();
                entries.sort_by_key(|(l, _)| **l);
                buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
                for (bound, count) in entries {
                    buf.extend_from_slice(&bound.to_le_bytes());
                    buf.extend_from_slice(&count.to_le_bytes());
                }
            }
        }
        buf
    }

    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        f.write_all(&self.to_bytes())?;
        Ok(())
    }
}

fn read_magic(cursor: &mut &[u8]) -> Result<[u8; 8]> {
    if cursor.len() < 8 {
        return Err(LoadError::Internal("truncated magic".into()));
    }
    let (m, rest) = cursor.split_at(8);
    *cursor = rest;
    Ok(m.try_into().unwrap())
}

fn read_u8(cursor: &mut &[u8]) -> Result<u8> {
    if cursor.is_empty() {
        return Err(LoadError::Internal("truncated u8".into()));
    }
    let v = cursor[0];
    *cursor = &cursor[1..];
    Ok(v)
}

fn read_u16(cursor: &mut &[u8]) -> Result<u16> {
    if cursor.len() < 2 {
        return Err(LoadError::Internal("truncated u16".into()));
    }
    let (b, rest) = cursor.split_at(2);
    *cursor = rest;
    Ok(u16::from_le_bytes(b.try_into().unwrap()))
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32> {
    if cursor.len() < 4 {
        return Err(LoadError::Internal("truncated u32".into()));
    }
    let (b, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_le_bytes(b.try_into().unwrap()))
}

/// The JSON dataset descriptor (spec §6); parsing is in scope only as an
/// ambient concern — its detailed validation is not part of the core's test
/// surface, but it supplies the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_sep")]
    pub separator: char,
    #[serde(default = "default_quote")]
    pub quote: char,
    #[serde(default = "default_escape")]
    pub escape: char,
    #[serde(default = "default_list_begin")]
    pub list_begin: char,
    #[serde(default = "default_list_end")]
    pub list_end: char,
}

fn default_sep() -> char {
    ','
}
fn default_quote() -> char {
    '"'
}
fn default_escape() -> char {
    '\\'
}
fn default_list_begin() -> char {
    '['
}
fn default_list_end() -> char {
    ']'
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: default_sep(),
            quote: default_quote(),
            escape: default_escape(),
            list_begin: default_list_begin(),
            list_end: default_list_end(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeFileDescription {
    pub filename: String,
    pub label: String,
    #[serde(rename = "IDType")]
    pub id_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelFileDescription {
    pub filename: String,
    pub label: String,
    pub multiplicity: String,
    #[serde(rename = "srcNodeLabels")]
    pub src_node_labels: Vec<String>,
    #[serde(rename = "dstNodeLabels")]
    pub dst_node_labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDescriptor {
    #[serde(default)]
    pub csv_options: CsvOptions,
    #[serde(rename = "nodeFileDescriptions")]
    pub node_file_descriptions: Vec<NodeFileDescription>,
    #[serde(rename = "relFileDescriptions")]
    pub rel_file_descriptions: Vec<RelFileDescription>,
}

impl DatasetDescriptor {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn multiplicity(s: &str) -> Result<Multiplicity> {
        Ok(match s {
            "ONE_ONE" => Multiplicity::OneOne,
            "ONE_MANY" => Multiplicity::OneMany,
            "MANY_ONE" => Multiplicity::ManyOne,
            "MANY_MANY" => Multiplicity::ManyMany,
            other => return Err(LoadError::Schema(format!("unknown multiplicity {other}"))),
        })
    }

    pub fn id_type(s: &str) -> Result<IdType> {
        Ok(match s {
            "INT64" => IdType::Int64,
            "STRING" => IdType::String,
            other => return Err(LoadError::Schema(format!("unknown ID type {other}"))),
        })
    }
}

pub fn type_id_tag(t: TypeId) -> u8 {
    t.tag()
}
