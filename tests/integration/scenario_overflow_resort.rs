//! Scenario 4 (spec §8): variable-length property resort. Pass 2 writes
//! strings to the overflow file in whatever order parallel workers finish
//! in; after the resort step the property list's pointers must resolve,
//! through the *final* flushed overflow file, to the right string for each
//! node in node order.

use std::collections::HashMap;
use std::io::Write;

use colgraph::build::node_builder::{self, NodeBuildOutput};
use colgraph::build::rel_builder;
use colgraph::catalog::{CsvOptions, NodeLabel, PropertyDef, RelLabel};
use colgraph::lists::{locate, ListHeader, ListPageMetadata};
use colgraph::pager::overflow::{InlineString, ListHandle};
use colgraph::progress::NoopProgress;
use colgraph::threadpool::ScopedThreadPool;
use colgraph::types::{IdType, LabelId, Multiplicity, TypeId};

fn read_u32_list(cursor: &mut &[u8]) -> Vec<u64> {
    let len = u32::from_le_bytes(cursor[0..4].try_into().unwrap()) as usize;
    *cursor = &cursor[4..];
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(u32::from_le_bytes(cursor[0..4].try_into().unwrap()) as u64);
        *cursor = &cursor[4..];
    }
    out
}

fn parse_metadata(bytes: &[u8]) -> ListPageMetadata {
    let mut cursor = bytes;
    let num_chunks = u64::from_le_bytes(cursor[0..8].try_into().unwrap()) as usize;
    cursor = &cursor[8..];
    let mut chunks_pages_map = Vec::with_capacity(num_chunks);
    for _ in 0..num_chunks {
        chunks_pages_map.push(read_u32_list(&mut cursor));
    }
    let num_large = u64::from_le_bytes(cursor[0..8].try_into().unwrap()) as usize;
    cursor = &cursor[8..];
    let mut large_lists_pages_map = Vec::with_capacity(num_large);
    for _ in 0..num_large {
        large_lists_pages_map.push(read_u32_list(&mut cursor));
    }
    let num_pages = u64::from_le_bytes(cursor[0..8].try_into().unwrap());
    ListPageMetadata {
        chunks_pages_map,
        large_lists_pages_map,
        num_pages,
    }
}

fn build_node(dir: &std::path::Path, name: &str, ids: &[i64]) -> NodeBuildOutput {
    let path = dir.join(format!("{name}.csv"));
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "ID:INT64").unwrap();
    let body = ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
    write!(f, "{body}").unwrap();
    drop(f);

    let label = NodeLabel {
        id: 0,
        name: name.to_string(),
        id_type: IdType::Int64,
        structured_props: vec![],
        unstructured_props: vec![],
    };
    let pool = ScopedThreadPool::new(2);
    node_builder::build_node_label(label, &path, &CsvOptions::default(), &pool, &NoopProgress).unwrap()
}

#[test]
fn resorted_overflow_resolves_to_node_order_strings() {
    let dir = tempfile::tempdir().unwrap();
    let s = build_node(dir.path(), "s", &[0, 1]);
    let t = build_node(dir.path(), "t", &[0]);

    let rel_path = dir.path().join("r.csv");
    let long = |s: &str| format!("{s}-padded-past-twelve-bytes");
    let alpha = long("alpha");
    let beta = long("beta");
    let gamma = long("gamma");
    let mut f = std::fs::File::create(&rel_path).unwrap();
    writeln!(f, "START_ID,START_ID_LABEL,END_ID,END_ID_LABEL,name:STRING").unwrap();
    write!(
        f,
        "0,s,0,t,{alpha}\n1,s,0,t,{beta}\n0,s,0,t,{gamma}"
    )
    .unwrap();
    drop(f);

    let id_prop = PropertyDef {
        id: 0,
        name: "_id".into(),
        type_id: TypeId::Int64.tag(),
    };
    let name_prop = PropertyDef {
        id: 1,
        name: "name".into(),
        type_id: TypeId::String.tag(),
    };
    let rel_label = RelLabel {
        id: 0,
        name: "R".into(),
        multiplicity: Multiplicity::ManyMany,
        src_labels: vec![0],
        dst_labels: vec![1],
        props: vec![name_prop, id_prop],
    };

    let mut nodes_by_id: HashMap<LabelId, &NodeBuildOutput> = HashMap::new();
    nodes_by_id.insert(0, &s);
    nodes_by_id.insert(1, &t);
    let mut nodes_by_name = HashMap::new();
    nodes_by_name.insert("s".to_string(), 0u16);
    nodes_by_name.insert("t".to_string(), 1u16);

    let pool = ScopedThreadPool::new(4);
    let out = rel_builder::build_rel_label(
        rel_label,
        &rel_path,
        &CsvOptions::default(),
        &nodes_by_id,
        &nodes_by_name,
        &pool,
        &NoopProgress,
    )
    .unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    out.flush(&out_dir, |id| if id == 0 { "s".to_string() } else { "t".to_string() }).unwrap();

    let headers = std::fs::read(out_dir.join("e-R-s-fwd-name.lists.headers")).unwrap();
    let header_at = |i: usize| u32::from_le_bytes(headers[i * 4..i * 4 + 4].try_into().unwrap());
    let meta = parse_metadata(&std::fs::read(out_dir.join("e-R-s-fwd-name.lists.metadata")).unwrap());
    let pages = std::fs::read(out_dir.join("e-R-s-fwd-name.lists")).unwrap();
    let overflow = std::fs::read(out_dir.join("e-R-s-fwd-name.lists.ovf")).unwrap();

    let epp = 4096 / 16;
    let read_string_at = |node: u64, pos: u64| -> String {
        let header = header_at(node as usize);
        let size = match ListHeader::decode(header) {
            ListHeader::Small { size, .. } => size as u64,
            ListHeader::Large { idx } => meta.large_lists_pages_map[idx as usize][0],
        };
        assert!(pos < size);
        let (page, off) = locate(header, pos, node, epp, 16, &meta);
        let elem_start = page as usize * 4096 + off;
        let inline = InlineString::from_bytes(&pages[elem_start..elem_start + 16]);
        let ptr = inline.overflow_ptr().expect("string exceeds inline threshold");
        let start = ptr.page_idx() as usize * 4096 + ptr.offset_in_page() as usize;
        String::from_utf8(overflow[start..start + inline.len as usize].to_vec()).unwrap()
    };

    // Reverse-position ordering (spec §8 property 6): storage order is the
    // CSV-order edges for each node, reversed.
    assert_eq!(read_string_at(0, 0), gamma);
    assert_eq!(read_string_at(0, 1), alpha);
    assert_eq!(read_string_at(1, 0), beta);
}

/// A `LIST<STRING>` rel property nests an `InlineString` inside each 16-byte
/// slot of its own overflow body; the resort step must relocate those nested
/// pointers too, not just the outer `ListHandle`'s.
#[test]
fn resorted_overflow_relocates_nested_list_string_pointers() {
    let dir = tempfile::tempdir().unwrap();
    let s = build_node(dir.path(), "s", &[0, 1]);
    let t = build_node(dir.path(), "t", &[0]);

    let rel_path = dir.path().join("r.csv");
    let long = |s: &str| format!("{s}-padded-past-twelve-bytes");
    let alpha = long("alpha");
    let beta = long("beta");
    let gamma = long("gamma");
    let mut f = std::fs::File::create(&rel_path).unwrap();
    writeln!(f, "START_ID,START_ID_LABEL,END_ID,END_ID_LABEL,tags:LIST<STRING>").unwrap();
    write!(
        f,
        "0,s,0,t,\"[{alpha},{gamma}]\"\n1,s,0,t,\"[{beta}]\"\n0,s,0,t,\"[{gamma},{alpha}]\""
    )
    .unwrap();
    drop(f);

    let id_prop = PropertyDef {
        id: 0,
        name: "_id".into(),
        type_id: TypeId::Int64.tag(),
    };
    let tags_prop = PropertyDef {
        id: 1,
        name: "tags".into(),
        type_id: TypeId::List.tag(),
    };
    let rel_label = RelLabel {
        id: 0,
        name: "R".into(),
        multiplicity: Multiplicity::ManyMany,
        src_labels: vec![0],
        dst_labels: vec![1],
        props: vec![tags_prop, id_prop],
    };

    let mut nodes_by_id: HashMap<LabelId, &NodeBuildOutput> = HashMap::new();
    nodes_by_id.insert(0, &s);
    nodes_by_id.insert(1, &t);
    let mut nodes_by_name = HashMap::new();
    nodes_by_name.insert("s".to_string(), 0u16);
    nodes_by_name.insert("t".to_string(), 1u16);

    let pool = ScopedThreadPool::new(4);
    let out = rel_builder::build_rel_label(
        rel_label,
        &rel_path,
        &CsvOptions::default(),
        &nodes_by_id,
        &nodes_by_name,
        &pool,
        &NoopProgress,
    )
    .unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    out.flush(&out_dir, |id| if id == 0 { "s".to_string() } else { "t".to_string() }).unwrap();

    let headers = std::fs::read(out_dir.join("e-R-s-fwd-tags.lists.headers")).unwrap();
    let header_at = |i: usize| u32::from_le_bytes(headers[i * 4..i * 4 + 4].try_into().unwrap());
    let meta = parse_metadata(&std::fs::read(out_dir.join("e-R-s-fwd-tags.lists.metadata")).unwrap());
    let pages = std::fs::read(out_dir.join("e-R-s-fwd-tags.lists")).unwrap();
    let overflow = std::fs::read(out_dir.join("e-R-s-fwd-tags.lists.ovf")).unwrap();

    let epp = 4096 / 16;
    let read_at = |ptr_page: usize, ptr_off: usize, len: usize| -> String {
        String::from_utf8(overflow[ptr_page * 4096 + ptr_off..ptr_page * 4096 + ptr_off + len].to_vec()).unwrap()
    };
    let read_list_at = |node: u64, pos: u64| -> Vec<String> {
        let header = header_at(node as usize);
        let size = match ListHeader::decode(header) {
            ListHeader::Small { size, .. } => size as u64,
            ListHeader::Large { idx } => meta.large_lists_pages_map[idx as usize][0],
        };
        assert!(pos < size);
        let (page, off) = locate(header, pos, node, epp, 16, &meta);
        let elem_start = page as usize * 4096 + off;
        let handle = ListHandle::from_bytes(&pages[elem_start..elem_start + 16]);
        let body_start = handle.overflow_ptr.page_idx() as usize * 4096 + handle.overflow_ptr.offset_in_page() as usize;
        (0..handle.count as usize)
            .map(|i| {
                let inline = InlineString::from_bytes(&overflow[body_start + i * 16..body_start + i * 16 + 16]);
                let ptr = inline.overflow_ptr().expect("string exceeds inline threshold");
                read_at(ptr.page_idx() as usize, ptr.offset_in_page() as usize, inline.len as usize)
            })
            .collect()
    };

    // Reverse-position ordering, same as the plain-string scenario.
    assert_eq!(read_list_at(0, 0), vec![gamma.clone(), alpha.clone()]);
    assert_eq!(read_list_at(0, 1), vec![alpha, gamma]);
    assert_eq!(read_list_at(1, 0), vec![beta]);
}
