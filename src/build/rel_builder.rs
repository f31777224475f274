//! Component I: rel builder (spec §4.I), one instance per relationship
//! label. Runs pass 1 (adj columns + list sizing + single-multiplicity
//! property writes), builds headers/metadata between passes, runs pass 2
//! (adj lists + property lists via the same reversed position), then
//! flushes.
//!
//! The S0..S7 state machine from spec §4.I is realized here as ordinary
//! sequential control flow rather than an explicit state enum: single-
//! multiplicity sides simply skip the list-building steps, which is the
//! same "skip to flush" shortcut the state machine describes.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::build::column::Column;
use crate::build::node_builder::NodeBuildOutput;
use crate::build::FailTracker;
use crate::catalog::{CsvOptions, RelLabel};
use crate::compression::CompressionScheme;
use crate::csvblock::{self, CsvBlock};
use crate::error::{ErrorLocation, LoadError, Result};
use crate::index::KeyValue;
use crate::lists::{self, ListPageMetadata, ListSizer};
use crate::pager::overflow::{InlineString, ListHandle, OverflowFile, PageByteCursor};
use crate::pager::PagedFile;
use crate::parse;
use crate::progress::ProgressSink;
use crate::threadpool::BlockPool;
use crate::types::{Direction, IdType, LabelId, TypeId};
use crate::value::PropValue;

enum AdjSide {
    Single {
        column: PagedFile,
    },
    Multi {
        sizer: ListSizer,
        headers: Mutex<Vec<u32>>,
        meta: Mutex<ListPageMetadata>,
        pages: PagedFile,
    },
}

enum PropSide {
    Single {
        column: Column,
    },
    Multi {
        type_id: TypeId,
        headers: Mutex<Vec<u32>>,
        meta: Mutex<ListPageMetadata>,
        pages: PagedFile,
        overflow: Option<OverflowFile>,
    },
}

pub struct RelBuildOutput {
    pub label: RelLabel,
    pub fwd_scheme: CompressionScheme,
    pub bwd_scheme: CompressionScheme,
    adj: HashMap<(usize, LabelId), AdjSide>,
    props: HashMap<(usize, LabelId, u32), PropSide>,
    pub rel_counts: [HashMap<LabelId, u64>; 2],
}

fn owning_labels(label: &RelLabel, dir: Direction) -> &[LabelId] {
    match dir {
        Direction::Fwd => &label.src_labels,
        Direction::Bwd => &label.dst_labels,
    }
}

fn opposite_labels(label: &RelLabel, dir: Direction) -> &[LabelId] {
    owning_labels(label, dir.opposite())
}

/// Builds one relationship label end to end. `label.props` must already
/// carry the implicit `_id` property as its last entry (the orchestrator
/// appends it when assembling the catalog).
pub fn build_rel_label(
    label: RelLabel,
    csv_path: &Path,
    csv_opts: &CsvOptions,
    nodes_by_id: &HashMap<LabelId, &NodeBuildOutput>,
    nodes_by_name: &HashMap<String, LabelId>,
    pool: &dyn BlockPool,
    progress: &dyn ProgressSink,
) -> Result<RelBuildOutput> {
    let total_num_labels = nodes_by_id.len();
    let max_offset = |l: LabelId| -> u64 { nodes_by_id[&l].num_nodes.saturating_sub(1) };

    let fwd_scheme = CompressionScheme::choose(opposite_labels(&label, Direction::Fwd), max_offset, total_num_labels)?;
    let bwd_scheme = CompressionScheme::choose(opposite_labels(&label, Direction::Bwd), max_offset, total_num_labels)?;
    let scheme_for = |dir: Direction| if dir == Direction::Fwd { fwd_scheme } else { bwd_scheme };

    let mut adj: HashMap<(usize, LabelId), AdjSide> = HashMap::new();
    let mut props: HashMap<(usize, LabelId, u32), PropSide> = HashMap::new();

    for dir in Direction::ALL {
        for &owner in owning_labels(&label, dir) {
            let num_nodes = nodes_by_id[&owner].num_nodes;
            let single = label.multiplicity.is_single(dir);
            if single {
                let record_size = scheme_for(dir).record_size();
                let column = PagedFile::new(record_size, true, 0);
                column.ensure_pages(
                    (num_nodes as usize)
                        .div_ceil(column.elements_per_page().max(1))
                        .max(1),
                );
                adj.insert((dir.index(), owner), AdjSide::Single { column });
                for p in &label.props {
                    let type_id = type_id_from_tag(p.type_id)?;
                    props.insert(
                        (dir.index(), owner, p.id),
                        PropSide::Single {
                            column: Column::new(type_id, num_nodes),
                        },
                    );
                }
            } else {
                adj.insert(
                    (dir.index(), owner),
                    AdjSide::Multi {
                        sizer: ListSizer::new(num_nodes as usize),
                        headers: Mutex::new(Vec::new()),
                        meta: Mutex::new(ListPageMetadata::default()),
                        pages: PagedFile::new(scheme_for(dir).record_size(), false, 0),
                    },
                );
                for p in &label.props {
                    let type_id = type_id_from_tag(p.type_id)?;
                    let overflow = matches!(type_id, TypeId::String | TypeId::List).then(OverflowFile::new);
                    props.insert(
                        (dir.index(), owner, p.id),
                        PropSide::Multi {
                            type_id,
                            headers: Mutex::new(Vec::new()),
                            meta: Mutex::new(ListPageMetadata::default()),
                            pages: PagedFile::new(type_id.fixed_width(), false, 0),
                            overflow,
                        },
                    );
                }
            }
        }
    }

    let contents = csvblock::read_file(csv_path)?;
    let reader_builder = csvblock::reader_builder(csv_opts)?;
    let blocks = csvblock::plan_blocks(&contents, crate::config::DEFAULT_BLOCK_SIZE_BYTES);
    let block_line_counts: Vec<u64> = blocks
        .iter()
        .map(|b| csvblock::block_lines(&contents, b).count() as u64)
        .collect();
    let mut block_starts = Vec::with_capacity(blocks.len());
    {
        let mut running = 0u64;
        for c in &block_line_counts {
            block_starts.push(running);
            running += c;
        }
    }
    let file_name = csv_path.to_string_lossy().to_string();
    let tracker = FailTracker::default();
    let rel_counts_mutex: [Mutex<HashMap<LabelId, u64>>; 2] = Default::default();

    // Pass 1: resolve endpoints, populate single-multiplicity adjacency +
    // properties, size multi-multiplicity lists.
    progress.begin_phase("rel:pass1", blocks.len() as u64);
    pool.run_indexed(blocks.len(), &|i| {
        if tracker.failed() {
            return;
        }
        if let Err(e) = pass1_block(
            &contents,
            &blocks[i],
            block_starts[i],
            &label,
            csv_opts,
            &reader_builder,
            nodes_by_id,
            nodes_by_name,
            &adj,
            &props,
            &scheme_for,
            &rel_counts_mutex,
            &file_name,
        ) {
            tracker.record(e);
        }
        progress.advance(1);
    });
    progress.end_phase();
    tracker.check()?;

    // Between passes: build list headers + metadata for every multi-
    // multiplicity side, and for every property list riding along with it.
    for dir in Direction::ALL {
        for &owner in owning_labels(&label, dir) {
            if label.multiplicity.is_single(dir) {
                continue;
            }
            let AdjSide::Multi { sizer, headers, meta, pages } = adj.get(&(dir.index(), owner)).unwrap() else {
                unreachable!()
            };
            let sizes = sizer.snapshot();
            let record_size = scheme_for(dir).record_size();
            let adj_epp = (4096 / record_size.max(1)).max(1);
            let built_headers = lists::build_headers(&sizes, adj_epp);
            let built_meta = lists::build_page_metadata(&sizes, &built_headers, adj_epp);
            pages.ensure_pages(built_meta.num_pages.max(1) as usize);
            *headers.lock() = built_headers;
            *meta.lock() = built_meta;

            sizer.reset_to_zero();
            for (i, &s) in sizes.iter().enumerate() {
                sizer.increment(i as u64, s);
            }

            for p in &label.props {
                let Some(PropSide::Multi { type_id, headers, meta, pages, .. }) = props.get(&(dir.index(), owner, p.id)) else {
                    continue;
                };
                let prop_epp = (4096 / type_id.fixed_width().max(1)).max(1);
                let prop_headers = lists::build_headers(&sizes, prop_epp);
                let prop_meta = lists::build_page_metadata(&sizes, &prop_headers, prop_epp);
                pages.ensure_pages(prop_meta.num_pages.max(1) as usize);
                *headers.lock() = prop_headers;
                *meta.lock() = prop_meta;
            }
        }
    }

    // Pass 2: reverse-position writes for every multi-multiplicity side.
    progress.begin_phase("rel:pass2", blocks.len() as u64);
    pool.run_indexed(blocks.len(), &|i| {
        if tracker.failed() {
            return;
        }
        if let Err(e) = pass2_block(
            &contents,
            &blocks[i],
            block_starts[i],
            &label,
            csv_opts,
            &reader_builder,
            nodes_by_id,
            nodes_by_name,
            &adj,
            &props,
            &scheme_for,
            &file_name,
        ) {
            tracker.record(e);
        }
        progress.advance(1);
    });
    progress.end_phase();
    tracker.into_result()?;

    // Overflow re-sort (spec §4.I last paragraph): the pass-2 overflow file
    // holds strings/lists in whatever order the parallel writers produced
    // them in; walk source node offsets in buckets of 256 and re-copy each
    // element's payload into a fresh, node-order overflow file.
    progress.begin_phase("rel:overflow-resort", props.len() as u64);
    for (&(_dir_idx, owner, _prop_id), side) in props.iter_mut() {
        if let PropSide::Multi {
            type_id,
            headers,
            meta,
            pages,
            overflow: Some(overflow),
        } = side
        {
            let num_nodes = nodes_by_id[&owner].num_nodes;
            let ordered = resort_overflow(num_nodes, *type_id, &headers.lock(), &meta.lock(), pages, overflow)?;
            *overflow = ordered;
        }
        progress.advance(1);
    }
    progress.end_phase();

    let rel_counts = [rel_counts_mutex[0].lock().clone(), rel_counts_mutex[1].lock().clone()];

    Ok(RelBuildOutput {
        label,
        fwd_scheme,
        bwd_scheme,
        adj,
        props,
        rel_counts,
    })
}

/// Re-copies every variable-length element referenced by a property list's
/// pages from `old` into a freshly ordered overflow file, in node-offset
/// order, updating each element's pointer in place (spec §4.I).
///
/// List-typed rel properties hold `LIST<STRING>` values (the only child type
/// a CSV list literal is parsed into, see [`parse::parse_list`]'s callers),
/// so each 16-byte slot in a list's flat body is itself an `InlineString`
/// whose overflow pointer must be relocated, mirroring
/// [`OverflowFile::copy_list`]'s own recursion, before the body is re-copied.
fn resort_overflow(
    num_nodes: u64,
    type_id: TypeId,
    headers: &[u32],
    meta: &ListPageMetadata,
    pages: &PagedFile,
    old: &OverflowFile,
) -> Result<OverflowFile> {
    const BUCKET: u64 = 256;
    let ordered = OverflowFile::new();
    let mut cursor = PageByteCursor::default();
    let epp = pages.elements_per_page();
    let bpe = pages.bytes_per_element();

    let mut bucket_start = 0u64;
    while bucket_start < num_nodes {
        let bucket_end = (bucket_start + BUCKET).min(num_nodes);
        for node in bucket_start..bucket_end {
            let header = headers[node as usize];
            let size = match lists::ListHeader::decode(header) {
                lists::ListHeader::Small { size, .. } => size as u64,
                lists::ListHeader::Large { idx } => meta.large_lists_pages_map[idx as usize][0],
            };
            for pos in 0..size {
                let (page, off) = lists::locate(header, pos, node, epp, bpe, meta);
                let mut buf = vec![0u8; bpe];
                pages.read_element_raw(page as usize, off, &mut buf);
                let rewritten = match type_id {
                    TypeId::String => {
                        let inline = InlineString::from_bytes(&buf);
                        inline.overflow_ptr().map(|ptr| -> Result<Vec<u8>> {
                            let raw = old.read(ptr, inline.len as usize);
                            Ok(ordered.copy_string(&raw, &mut cursor)?.to_bytes().to_vec())
                        })
                    }
                    TypeId::List => {
                        let handle = ListHandle::from_bytes(&buf);
                        Some((|| -> Result<Vec<u8>> {
                            let body = old.read(handle.overflow_ptr, handle.count as usize * 16);
                            let mut rewritten = Vec::with_capacity(body.len());
                            for chunk in body.chunks_exact(16) {
                                let elem = InlineString::from_bytes(chunk);
                                let relocated = match elem.overflow_ptr() {
                                    Some(ptr) => {
                                        let raw = old.read(ptr, elem.len as usize);
                                        ordered.copy_string(&raw, &mut cursor)?
                                    }
                                    None => elem,
                                };
                                rewritten.extend_from_slice(&relocated.to_bytes());
                            }
                            let new_ptr = ordered.copy_raw(&rewritten, &mut cursor)?;
                            Ok(ListHandle {
                                count: handle.count,
                                overflow_ptr: new_ptr,
                            }
                            .to_bytes()
                            .to_vec())
                        })())
                    }
                    _ => None,
                };
                if let Some(bytes) = rewritten {
                    pages.write(page as usize, off, &bytes?);
                }
            }
        }
        bucket_start = bucket_end;
    }
    Ok(ordered)
}

struct Endpoint {
    label: LabelId,
    offset: u64,
}

fn resolve_endpoint(
    label_tok: &str,
    id_tok: &str,
    nodes_by_name: &HashMap<String, LabelId>,
    nodes_by_id: &HashMap<LabelId, &NodeBuildOutput>,
    loc: &ErrorLocation,
) -> Result<Endpoint> {
    let label = *nodes_by_name
        .get(label_tok)
        .ok_or_else(|| LoadError::Schema(format!("unknown node label '{label_tok}'")))?;
    let node = nodes_by_id[&label];
    let key = match node.label.id_type {
        IdType::Int64 => KeyValue::Int64(
            id_tok
                .parse()
                .map_err(|e| LoadError::parse(loc.clone(), format!("bad endpoint id '{id_tok}': {e}")))?,
        ),
        IdType::String => KeyValue::Str(id_tok.to_string()),
    };
    let offset = node
        .index
        .lookup(&key)
        .ok_or_else(|| LoadError::constraint(loc.clone(), format!("unknown rel endpoint key '{id_tok}'")))?;
    Ok(Endpoint { label, offset })
}

#[allow(clippy::too_many_arguments)]
fn pass1_block(
    contents: &[u8],
    block: &CsvBlock,
    block_start_offset: u64,
    label: &RelLabel,
    csv_opts: &CsvOptions,
    reader_builder: &csv::ReaderBuilder,
    nodes_by_id: &HashMap<LabelId, &NodeBuildOutput>,
    nodes_by_name: &HashMap<String, LabelId>,
    adj: &HashMap<(usize, LabelId), AdjSide>,
    props: &HashMap<(usize, LabelId, u32), PropSide>,
    scheme_for: &dyn Fn(Direction) -> CompressionScheme,
    rel_counts: &[Mutex<HashMap<LabelId, u64>>; 2],
    file_name: &str,
) -> Result<()> {
    let mut cursor = PageByteCursor::default();
    for (line_idx, line) in csvblock::block_lines(contents, block).enumerate() {
        let loc = ErrorLocation::new(file_name, block.index, line_idx);
        let rel_id = block_start_offset + line_idx as u64;
        let record = csvblock::tokenize_line(line, reader_builder, &loc)?;
        let (src_id_tok, src_label_tok, dst_id_tok, dst_label_tok) =
            (record.get(0).unwrap_or(""), record.get(1).unwrap_or(""), record.get(2).unwrap_or(""), record.get(3).unwrap_or(""));
        let remaining_tokens: Vec<&str> = record.iter().skip(4).collect();

        let src = resolve_endpoint(src_label_tok, src_id_tok, nodes_by_name, nodes_by_id, &loc)?;
        let dst = resolve_endpoint(dst_label_tok, dst_id_tok, nodes_by_name, nodes_by_id, &loc)?;

        {
            let mut g = rel_counts[Direction::Fwd.index()].lock();
            *g.entry(dst.label).or_insert(0) += 1;
            let mut g = rel_counts[Direction::Bwd.index()].lock();
            *g.entry(src.label).or_insert(0) += 1;
        }

        for dir in Direction::ALL {
            let (owner_end, neighbor_end) = if dir == Direction::Fwd { (&src, &dst) } else { (&dst, &src) };

            if !label.multiplicity.is_single(dir) {
                if let Some(AdjSide::Multi { sizer, .. }) = adj.get(&(dir.index(), owner_end.label)) {
                    sizer.increment(owner_end.offset, 1);
                }
                continue;
            }

            let Some(AdjSide::Single { column }) = adj.get(&(dir.index(), owner_end.label)) else {
                continue;
            };
            if !column.is_null(owner_end.offset) {
                return Err(LoadError::constraint(
                    loc.clone(),
                    "direction declared single-multiplicity but source node has more than one edge",
                ));
            }
            let scheme = scheme_for(dir);
            let mut buf = vec![0u8; scheme.record_size()];
            scheme.encode(neighbor_end.label, neighbor_end.offset, &mut buf)?;
            column.write_element(owner_end.offset, &buf);
            column.set_null(
                owner_end.offset as usize / column.elements_per_page(),
                owner_end.offset as usize % column.elements_per_page(),
                false,
            );

            for (idx, p) in label.props.iter().enumerate() {
                let Some(PropSide::Single { column }) = props.get(&(dir.index(), owner_end.label, p.id)) else {
                    continue;
                };
                if p.name == "_id" {
                    column.write(owner_end.offset, &PropValue::Int64(rel_id as i64), &mut cursor)?;
                    continue;
                }
                let tok = remaining_tokens.get(idx).copied().unwrap_or("");
                let type_id = type_id_from_tag(p.type_id)?;
                match parse_prop_value(tok, type_id, csv_opts, &loc)? {
                    Some(v) => column.write(owner_end.offset, &v, &mut cursor)?,
                    None => column.write_null(owner_end.offset),
                }
            }
        }
    }
    Ok(())
}

/// Parses one property token, routing `LIST<...>` tokens through
/// [`parse::parse_list`] (list elements are always `STRING`, the only child
/// type a list literal is parsed into) and everything else through
/// [`parse::parse_scalar`].
fn parse_prop_value(tok: &str, type_id: TypeId, csv_opts: &CsvOptions, loc: &ErrorLocation) -> Result<Option<PropValue>> {
    if type_id == TypeId::List {
        if tok.is_empty() {
            return Ok(None);
        }
        return Ok(Some(parse::parse_list(
            tok,
            csv_opts.list_begin,
            csv_opts.list_end,
            TypeId::String,
            loc,
        )?));
    }
    parse::parse_scalar(tok, type_id, loc)
}

#[allow(clippy::too_many_arguments)]
fn pass2_block(
    contents: &[u8],
    block: &CsvBlock,
    block_start_offset: u64,
    label: &RelLabel,
    csv_opts: &CsvOptions,
    reader_builder: &csv::ReaderBuilder,
    nodes_by_id: &HashMap<LabelId, &NodeBuildOutput>,
    nodes_by_name: &HashMap<String, LabelId>,
    adj: &HashMap<(usize, LabelId), AdjSide>,
    props: &HashMap<(usize, LabelId, u32), PropSide>,
    scheme_for: &dyn Fn(Direction) -> CompressionScheme,
    file_name: &str,
) -> Result<()> {
    let mut cursors: HashMap<(usize, LabelId, u32), PageByteCursor> = HashMap::new();
    for (line_idx, line) in csvblock::block_lines(contents, block).enumerate() {
        let loc = ErrorLocation::new(file_name, block.index, line_idx);
        let rel_id = block_start_offset + line_idx as u64;
        let record = csvblock::tokenize_line(line, reader_builder, &loc)?;
        let (src_id_tok, src_label_tok, dst_id_tok, dst_label_tok) =
            (record.get(0).unwrap_or(""), record.get(1).unwrap_or(""), record.get(2).unwrap_or(""), record.get(3).unwrap_or(""));
        let remaining_tokens: Vec<&str> = record.iter().skip(4).collect();

        let src = resolve_endpoint(src_label_tok, src_id_tok, nodes_by_name, nodes_by_id, &loc)?;
        let dst = resolve_endpoint(dst_label_tok, dst_id_tok, nodes_by_name, nodes_by_id, &loc)?;

        for dir in Direction::ALL {
            if label.multiplicity.is_single(dir) {
                continue;
            }
            let (owner_end, neighbor_end) = if dir == Direction::Fwd { (&src, &dst) } else { (&dst, &src) };
            let Some(AdjSide::Multi { sizer, headers, meta, pages }) = adj.get(&(dir.index(), owner_end.label)) else {
                continue;
            };
            let reserved = sizer.decrement(owner_end.offset, 1) - 1;
            let scheme = scheme_for(dir);
            let record_size = scheme.record_size();
            let epp = (4096 / record_size.max(1)).max(1);
            let (page, off) = {
                let headers = headers.lock();
                let meta = meta.lock();
                lists::locate(headers[owner_end.offset as usize], reserved, owner_end.offset, epp, record_size, &meta)
            };
            let mut buf = vec![0u8; record_size];
            scheme.encode(neighbor_end.label, neighbor_end.offset, &mut buf)?;
            pages.write(page as usize, off, &buf);

            for (idx, p) in label.props.iter().enumerate() {
                let Some(PropSide::Multi { type_id, headers: ph, meta: pm, pages: pp, overflow }) =
                    props.get(&(dir.index(), owner_end.label, p.id))
                else {
                    continue;
                };
                let pepp = (4096 / type_id.fixed_width().max(1)).max(1);
                let (ppage, poff) = {
                    let ph = ph.lock();
                    let pm = pm.lock();
                    lists::locate(ph[owner_end.offset as usize], reserved, owner_end.offset, pepp, type_id.fixed_width(), &pm)
                };

                let bytes = if p.name == "_id" {
                    (rel_id as i64).to_le_bytes().to_vec()
                } else {
                    let tok = remaining_tokens.get(idx).copied().unwrap_or("");
                    match parse_prop_value(tok, *type_id, csv_opts, &loc)? {
                        Some(PropValue::Str(s)) => {
                            let cursor = cursors.entry((dir.index(), owner_end.label, p.id)).or_default();
                            overflow
                                .as_ref()
                                .expect("string property must own an overflow file")
                                .copy_string(s.as_bytes(), cursor)?
                                .to_bytes()
                                .to_vec()
                        }
                        Some(PropValue::List(items)) => {
                            let cursor = cursors.entry((dir.index(), owner_end.label, p.id)).or_default();
                            overflow
                                .as_ref()
                                .expect("list property must own an overflow file")
                                .copy_list(&items, cursor)?
                                .to_bytes()
                                .to_vec()
                        }
                        Some(v) => {
                            let mut buf = vec![0u8; type_id.fixed_width()];
                            if let Some(scalar) = v.scalar_bytes() {
                                buf[..scalar.len()].copy_from_slice(&scalar);
                            }
                            buf
                        }
                        None => vec![0u8; type_id.fixed_width()],
                    }
                };
                pp.write(ppage as usize, poff, &bytes);
            }
        }
    }
    Ok(())
}

impl RelBuildOutput {
    pub fn flush(&self, out_dir: &Path, node_name: impl Fn(LabelId) -> String) -> Result<()> {
        for dir in Direction::ALL {
            let dir_tag = if dir == Direction::Fwd { "fwd" } else { "bwd" };
            for &owner in owning_labels(&self.label, dir) {
                let stem = format!("e-{}-{}-{}", self.label.name, node_name(owner), dir_tag);
                match self.adj.get(&(dir.index(), owner)) {
                    Some(AdjSide::Single { column }) => column.flush(&out_dir.join(format!("{stem}.col")))?,
                    Some(AdjSide::Multi { pages, headers, meta, .. }) => {
                        pages.flush(&out_dir.join(format!("{stem}.lists")))?;
                        lists::write_headers(&out_dir.join(format!("{stem}.lists.headers")), &headers.lock())?;
                        lists::write_metadata(&out_dir.join(format!("{stem}.lists.metadata")), &meta.lock())?;
                    }
                    None => {}
                }
                for p in &self.label.props {
                    let pstem = format!("{stem}-{}", p.name);
                    match self.props.get(&(dir.index(), owner, p.id)) {
                        Some(PropSide::Single { column }) => column.flush(out_dir, &pstem)?,
                        Some(PropSide::Multi { pages, headers, meta, overflow, .. }) => {
                            pages.flush(&out_dir.join(format!("{pstem}.lists")))?;
                            lists::write_headers(&out_dir.join(format!("{pstem}.lists.headers")), &headers.lock())?;
                            lists::write_metadata(&out_dir.join(format!("{pstem}.lists.metadata")), &meta.lock())?;
                            if let Some(ovf) = overflow {
                                ovf.flush(&out_dir.join(format!("{pstem}.lists.ovf")))?;
                            }
                        }
                        None => {}
                    }
                }
            }
        }
        Ok(())
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
