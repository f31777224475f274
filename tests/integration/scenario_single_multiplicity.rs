//! Scenario 2 (spec §8): single-multiplicity rel, MANY_ONE.
//!
//! A (offsets 0,1,2) --R(MANY_ONE)--> B (offsets 0,1,2,3). FWD (A-owned) is
//! single; BWD (B-owned) is multi.

use std::io::Write;

use colgraph::config::LoadConfig;
use colgraph::progress::NoopProgress;

#[test]
fn many_one_rel_single_fwd_multi_bwd() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    std::fs::write(
        input.path().join("metadata.json"),
        r#"{
            "nodeFileDescriptions": [
                {"filename": "a.csv", "label": "A", "IDType": "INT64"},
                {"filename": "b.csv", "label": "B", "IDType": "INT64"}
            ],
            "relFileDescriptions": [
                {"filename": "r.csv", "label": "R", "multiplicity": "MANY_ONE",
                 "srcNodeLabels": ["A"], "dstNodeLabels": ["B"]}
            ]
        }"#,
    )
    .unwrap();

    let mut f = std::fs::File::create(input.path().join("a.csv")).unwrap();
    writeln!(f, "ID:INT64").unwrap();
    write!(f, "0\n1\n2").unwrap();
    drop(f);

    let mut f = std::fs::File::create(input.path().join("b.csv")).unwrap();
    writeln!(f, "ID:INT64").unwrap();
    write!(f, "0\n1\n2\n3").unwrap();
    drop(f);

    let mut f = std::fs::File::create(input.path().join("r.csv")).unwrap();
    writeln!(f, "START_ID,START_ID_LABEL,END_ID,END_ID_LABEL").unwrap();
    write!(f, "0,A,2,B\n1,A,0,B\n2,A,3,B").unwrap();
    drop(f);

    let out_dir = output.path().join("out");
    let config = LoadConfig::default();
    let result = colgraph::build::run(input.path(), &out_dir, &config, &NoopProgress).unwrap();
    assert_eq!(result.catalog.rel_labels.len(), 1);

    // FWD adjacency (owner A) is single: one 2-byte little-endian offset per A.
    let fwd = std::fs::read(out_dir.join("e-R-A-fwd.col")).unwrap();
    let off_at = |i: usize| u16::from_le_bytes(fwd[i * 2..i * 2 + 2].try_into().unwrap());
    assert_eq!(off_at(0), 2);
    assert_eq!(off_at(1), 0);
    assert_eq!(off_at(2), 3);

    // BWD adjacency (owner B) is multi: list sizes [1,0,1,1].
    let bwd_headers = std::fs::read(out_dir.join("e-R-B-bwd.lists.headers")).unwrap();
    let header_at = |i: usize| u32::from_le_bytes(bwd_headers[i * 4..i * 4 + 4].try_into().unwrap());
    let decode_small_size = |h: u32| h & ((1 << 11) - 1);
    assert_eq!(decode_small_size(header_at(0)), 1);
    assert_eq!(decode_small_size(header_at(1)), 0);
    assert_eq!(decode_small_size(header_at(2)), 1);
    assert_eq!(decode_small_size(header_at(3)), 1);
}
