//! Component H: node builder (spec §4.H), one instance per node label.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use parking_lot::Mutex;

use crate::build::column::Column;
use crate::build::FailTracker;
use crate::catalog::{CsvOptions, NodeLabel, PropertyDef};
use crate::csvblock::{self, CsvBlock};
use crate::error::{ErrorLocation, LoadError, Result};
use crate::index::{KeyValue, PrimaryKeyIndex};
use crate::lists::{self, ListPageMetadata, ListSizer};
use crate::pager::overflow::{OverflowFile, PageByteCursor};
use crate::pager::PagedFile;
use crate::parse;
use crate::progress::ProgressSink;
use crate::threadpool::BlockPool;
use crate::types::{IdType, PropId, TypeId};

pub const UNSTR_PROP_HEADER_LEN: usize = 5; // propertyKeyId: u32 + dataTypeId: u8

pub struct NodeBuildOutput {
    pub label: NodeLabel,
    pub num_nodes: u64,
    pub columns: HashMap<PropId, Column>,
    pub index: PrimaryKeyIndex,
    pub pk_overflow: OverflowFile,
    pub unstr_list: PagedFile,
    pub unstr_overflow: OverflowFile,
    pub unstr_headers: Vec<u32>,
    pub unstr_meta: ListPageMetadata,
}

/// Runs all six steps of spec §4.H for one node label's CSV file.
pub fn build_node_label(
    mut label: NodeLabel,
    csv_path: &Path,
    csv_opts: &CsvOptions,
    pool: &dyn BlockPool,
    progress: &dyn ProgressSink,
) -> Result<NodeBuildOutput> {
    let contents = csvblock::read_file(csv_path)?;
    let blocks = csvblock::plan_blocks(&contents, crate::config::DEFAULT_BLOCK_SIZE_BYTES);
    let file_name = csv_path.to_string_lossy().to_string();
    let reader_builder = csvblock::reader_builder(csv_opts)?;

    // Step 1: count lines, discover unstructured property names.
    progress.begin_phase("node:count", blocks.len() as u64);
    let per_block_sets: Vec<Mutex<BTreeSet<String>>> =
        blocks.iter().map(|_| Mutex::new(BTreeSet::new())).collect();
    let per_block_counts: Vec<Mutex<u64>> = blocks.iter().map(|_| Mutex::new(0)).collect();
    let tracker = FailTracker::default();

    pool.run_indexed(blocks.len(), &|i| {
        let block = &blocks[i];
        let mut count = 0u64;
        let mut keys = BTreeSet::new();
        for (line_idx, line) in csvblock::block_lines(&contents, block).enumerate() {
            count += 1;
            let loc = ErrorLocation::new(&file_name, block.index, line_idx);
            let record = match csvblock::tokenize_line(line, &reader_builder, &loc) {
                Ok(r) => r,
                Err(e) => {
                    tracker.record(e);
                    continue;
                }
            };
            for tok in record.iter().skip(1 + label.structured_props.len()) {
                if let Some((key, _rest)) = tok.split_once(':') {
                    keys.insert(key.to_string());
                }
            }
        }
        *per_block_counts[i].lock() = count;
        *per_block_sets[i].lock() = keys;
        progress.advance(1);
    });
    progress.end_phase();
    tracker.check()?;

    let num_nodes: u64 = per_block_counts.iter().map(|c| *c.lock()).sum();
    let mut unstructured: BTreeSet<String> = BTreeSet::new();
    for s in &per_block_sets {
        unstructured.extend(s.lock().iter().cloned());
    }
    label.unstructured_props = unstructured.into_iter().collect();

    // Step 2: initialize storage.
    let mut columns: HashMap<PropId, Column> = HashMap::new();
    for p in &label.structured_props {
        let type_id = type_id_from_tag(p.type_id)?;
        columns.insert(p.id, Column::new(type_id, num_nodes));
    }
    let unstr_sizer = ListSizer::new(num_nodes as usize);
    let unstr_list = PagedFile::new(1, false, 0);
    let unstr_overflow = OverflowFile::new();
    let index = PrimaryKeyIndex::bulk_reserve(label.id_type, num_nodes);
    let pk_overflow = OverflowFile::new();

    // Step 3: populate columns, size unstructured lists.
    progress.begin_phase("node:populate-columns", blocks.len() as u64);
    let block_starts = cumulative_starts(&per_block_counts);
    pool.run_indexed(blocks.len(), &|i| {
        if tracker.failed() {
            return;
        }
        if let Err(e) = populate_block(
            &contents,
            &blocks[i],
            block_starts[i],
            &label,
            &reader_builder,
            &columns,
            &index,
            &unstr_sizer,
            &file_name,
        ) {
            tracker.record(e);
        }
        progress.advance(1);
    });
    progress.end_phase();
    tracker.check()?;

    // Step 4: build unstructured list headers & metadata (4.F + 4.G).
    let unstr_epp = unstr_list.elements_per_page();
    let sizes = unstr_sizer.snapshot();
    let unstr_headers = lists::build_headers(&sizes, unstr_epp);
    let unstr_meta = lists::build_page_metadata(&sizes, &unstr_headers, unstr_epp);
    unstr_list.ensure_pages(unstr_meta.num_pages.max(1) as usize);
    unstr_sizer.reset_to_zero();
    for (i, &s) in sizes.iter().enumerate() {
        unstr_sizer.increment(i as u64, s);
    }

    // Step 5: populate unstructured lists.
    progress.begin_phase("node:populate-unstr", blocks.len() as u64);
    pool.run_indexed(blocks.len(), &|i| {
        if tracker.failed() {
            return;
        }
        if let Err(e) = populate_unstr_block(
            &contents,
            &blocks[i],
            block_starts[i],
            &label,
            &reader_builder,
            &unstr_sizer,
            &unstr_headers,
            &unstr_meta,
            &unstr_list,
            &unstr_overflow,
            &file_name,
        ) {
            tracker.record(e);
        }
        progress.advance(1);
    });
    progress.end_phase();
    tracker.into_result()?;

    Ok(NodeBuildOutput {
        label,
        num_nodes,
        columns,
        index,
        pk_overflow,
        unstr_list,
        unstr_overflow,
        unstr_headers,
        unstr_meta,
    })
}

impl NodeBuildOutput {
    /// Flushes every file named by spec §6 for one node label: structured
    /// property columns, the primary-key index, and the unstructured list.
    pub fn flush(&self, out_dir: &Path) -> Result<()> {
        for prop in &self.label.structured_props {
            let stem = format!("n-{}-{}", self.label.name, prop.name);
            self.columns[&prop.id].flush(out_dir, &stem)?;
        }

        let pki_path = out_dir.join(format!("n-{}.pki", self.label.name));
        let entries = self.index.flush_entries(&self.pk_overflow);
        let mut buf = Vec::with_capacity(entries.len() * 24);
        for (key, offset) in &entries {
            buf.extend_from_slice(&key.to_bytes());
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        std::fs::write(&pki_path, buf)?;
        if self.label.id_type == IdType::String {
            self.pk_overflow
                .flush(&out_dir.join(format!("n-{}.pki.ovf", self.label.name)))?;
        }

        let unstr_stem = format!("n-{}.unstr.lists", self.label.name);
        self.unstr_list.flush(&out_dir.join(&unstr_stem))?;
        self.unstr_overflow
            .flush(&out_dir.join(format!("{unstr_stem}.ovf")))?;
        lists::write_headers(&out_dir.join(format!("{unstr_stem}.headers")), &self.unstr_headers)?;
        lists::write_metadata(&out_dir.join(format!("{unstr_stem}.metadata")), &self.unstr_meta)?;
        Ok(())
    }
}

fn cumulative_starts(counts: &[Mutex<u64>]) -> Vec<u64> {
    let mut out = Vec::with_capacity(counts.len());
    let mut running = 0u64;
    for c in counts {
        out.push(running);
        running += *c.lock();
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn populate_block(
    contents: &[u8],
    block: &CsvBlock,
    block_start_offset: u64,
    label: &NodeLabel,
    reader_builder: &csv::ReaderBuilder,
    columns: &HashMap<PropId, Column>,
    index: &PrimaryKeyIndex,
    unstr_sizer: &ListSizer,
    file_name: &str,
) -> Result<()> {
    let mut cursor = PageByteCursor::default();
    for (line_idx, line) in csvblock::block_lines(contents, block).enumerate() {
        let loc = ErrorLocation::new(file_name, block.index, line_idx);
        let offset = block_start_offset + line_idx as u64;
        let record = csvblock::tokenize_line(line, reader_builder, &loc)?;
        let mut tokens = record.iter();

        let id_tok = tokens
            .next()
            .ok_or_else(|| LoadError::parse(loc.clone(), "missing ID field"))?;
        let key = match label.id_type {
            IdType::Int64 => KeyValue::Int64(
                id_tok
                    .parse()
                    .map_err(|e| LoadError::parse(loc.clone(), format!("bad ID '{id_tok}': {e}")))?,
            ),
            IdType::String => KeyValue::Str(id_tok.to_string()),
        };
        if !index.append(key, offset) {
            return Err(LoadError::constraint(loc, "duplicate primary key"));
        }

        for prop in &label.structured_props {
            let tok = tokens.next().unwrap_or("");
            let type_id = type_id_from_tag(prop.type_id)?;
            let col = &columns[&prop.id];
            match parse::parse_scalar(tok, type_id, &loc)? {
                Some(v) => col.write(offset, &v, &mut cursor)?,
                None => col.write_null(offset),
            }
        }

        for tok in tokens {
            let mut parts = tok.splitn(3, ':');
            let _key = parts.next();
            let type_name = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            if value.is_empty() {
                continue;
            }
            let type_id = TypeId::from_name(type_name)
                .ok_or_else(|| LoadError::parse(loc.clone(), format!("unknown unstructured type '{type_name}'")))?;
            unstr_sizer.increment(offset, (UNSTR_PROP_HEADER_LEN + type_id.fixed_width()) as u64);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn populate_unstr_block(
    contents: &[u8],
    block: &CsvBlock,
    block_start_offset: u64,
    label: &NodeLabel,
    reader_builder: &csv::ReaderBuilder,
    unstr_sizer: &ListSizer,
    headers: &[u32],
    meta: &ListPageMetadata,
    unstr_list: &PagedFile,
    unstr_overflow: &OverflowFile,
    file_name: &str,
) -> Result<()> {
    for (line_idx, line) in csvblock::block_lines(contents, block).enumerate() {
        let loc = ErrorLocation::new(file_name, block.index, line_idx);
        let offset = block_start_offset + line_idx as u64;
        let record = csvblock::tokenize_line(line, reader_builder, &loc)?;

        for tok in record.iter().skip(1 + label.structured_props.len()) {
            let mut parts = tok.splitn(3, ':');
            let key = parts.next().unwrap_or("");
            let type_name = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            if value.is_empty() {
                continue;
            }
            let type_id = TypeId::from_name(type_name)
                .ok_or_else(|| LoadError::parse(loc.clone(), format!("unknown unstructured type '{type_name}'")))?;
            let payload_len = UNSTR_PROP_HEADER_LEN + type_id.fixed_width();
            let reserved_end = unstr_sizer.decrement(offset, payload_len as u64);
            let pos = reserved_end - payload_len as u64;

            let prop_id = label
                .unstructured_props
                .iter()
                .position(|k| k == key)
                .ok_or_else(|| LoadError::Internal(format!("unstructured key '{key}' not discovered in pass 1")))?
                as u32;

            let mut record = Vec::with_capacity(payload_len);
            record.extend_from_slice(&prop_id.to_le_bytes());
            record.push(type_id.tag());
            let value_bytes = match parse::parse_scalar(value, type_id, &loc)? {
                Some(v) => match &v {
                    crate::value::PropValue::Str(s) => {
                        let inline = unstr_overflow.append_string(s.as_bytes())?;
                        inline.to_bytes().to_vec()
                    }
                    other => {
                        let mut buf = vec![0u8; type_id.fixed_width()];
                        if let Some(scalar) = other.scalar_bytes() {
                            buf[..scalar.len()].copy_from_slice(&scalar);
                        }
                        buf
                    }
                },
                None => vec![0u8; type_id.fixed_width()],
            };
            record.extend_from_slice(&value_bytes);

            write_bytes_into_list(unstr_list, headers[offset as usize], pos, offset, meta, &record);
        }
    }
    Ok(())
}

fn write_bytes_into_list(
    list: &PagedFile,
    header: u32,
    pos: u64,
    node_offset: u64,
    meta: &ListPageMetadata,
    record: &[u8],
) {
    let epp = list.elements_per_page();
    let mut remaining = record;
    let mut cursor_pos = pos;
    while !remaining.is_empty() {
        let (page, byte_off) = lists::locate(header, cursor_pos, node_offset, epp, 1, meta);
        let space = epp - byte_off;
        let take = remaining.len().min(space);
        list.write(page as usize, byte_off, &remaining[..take]);
        remaining = &remaining[take..];
        cursor_pos += take as u64;
    }
}

fn type_id_from_tag(tag: u8) -> Result<TypeId> {
    Ok(match tag {
        0 => TypeId::Int64,
        1 => TypeId::Double,
        2 => TypeId::Bool,
        3 => TypeId::Date,
        4 => TypeId::Timestamp,
        5 => TypeId::Interval,
        6 => TypeId::String,
        7 => TypeId::List,
        other => return Err(LoadError::Internal(format!("bad type tag {other}"))),
    })
}

pub fn property_def(id: PropId, name: &str, type_id: TypeId) -> PropertyDef {
    PropertyDef {
        id,
        name: name.to_string(),
        type_id: type_id.tag(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CsvOptions;
    use crate::threadpool::ScopedThreadPool;
    use crate::progress::NoopProgress;
    use std::io::Write;

    #[test]
    fn minimal_node_label_builds_columns_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ID:INT64,value:DOUBLE").unwrap();
        write!(f, "10,1.5\n20,2.5\n30,3.5").unwrap();
        drop(f);

        let label = NodeLabel {
            id: 0,
            name: "Person".into(),
            id_type: IdType::Int64,
            structured_props: vec![property_def(0, "value", TypeId::Double)],
            unstructured_props: vec![],
        };

        let pool = ScopedThreadPool::new(2);
        let progress = NoopProgress;
        let out = build_node_label(label, &path, &CsvOptions::default(), &pool, &progress).unwrap();

        assert_eq!(out.num_nodes, 3);
        assert_eq!(out.index.lookup(&KeyValue::Int64(10)), Some(0));
        assert_eq!(out.index.lookup(&KeyValue::Int64(20)), Some(1));
        assert_eq!(out.index.lookup(&KeyValue::Int64(30)), Some(2));
        assert_eq!(out.index.lookup(&KeyValue::Int64(40)), None);

        let col = &out.columns[&0];
        let mut buf = [0u8; 8];
        col.pages.read_element(0, &mut buf);
        assert_eq!(f64::from_le_bytes(buf), 1.5);
        col.pages.read_element(2, &mut buf);
        assert_eq!(f64::from_le_bytes(buf), 3.5);
    }

    #[test]
    fn quoted_field_containing_separator_is_not_mis_tokenized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ID:INT64,value:STRING").unwrap();
        write!(f, "10,\"a,b,c\"\n20,plain").unwrap();
        drop(f);

        let label = NodeLabel {
            id: 0,
            name: "Person".into(),
            id_type: IdType::Int64,
            structured_props: vec![property_def(0, "value", TypeId::String)],
            unstructured_props: vec![],
        };
        let pool = ScopedThreadPool::new(1);
        let progress = NoopProgress;
        let out = build_node_label(label, &path, &CsvOptions::default(), &pool, &progress).unwrap();

        assert_eq!(out.num_nodes, 2);
        let col = &out.columns[&0];
        let mut buf = [0u8; 16];
        col.pages.read_element(0, &mut buf);
        let inline = crate::pager::overflow::InlineString::from_bytes(&buf);
        assert_eq!(inline.len, 5); // "a,b,c" as one field, not split on its commas
    }

    #[test]
    fn duplicate_primary_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ID:INT64").unwrap();
        write!(f, "10\n10").unwrap();
        drop(f);

        let label = NodeLabel {
            id: 0,
            name: "Person".into(),
            id_type: IdType::Int64,
            structured_props: vec![],
            unstructured_props: vec![],
        };
        let pool = ScopedThreadPool::new(1);
        let progress = NoopProgress;
        let result = build_node_label(label, &path, &CsvOptions::default(), &pool, &progress);
        assert!(matches!(result, Err(LoadError::Constraint { .. })));
    }
}
