//! End-to-end catalog persistence: a catalog written by a real build reads
//! back byte-identically via `catalog.bin` (spec §8 property 10, flush
//! idempotence, exercised through the filesystem rather than just `to_bytes`).

use std::io::Write;

use colgraph::catalog::Catalog;
use colgraph::config::LoadConfig;
use colgraph::progress::NoopProgress;
use colgraph::types::{IdType, Multiplicity};

#[test]
fn catalog_written_by_a_real_build_reads_back_identically() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    std::fs::write(
        input.path().join("metadata.json"),
        r#"{
            "nodeFileDescriptions": [
                {"filename": "person.csv", "label": "Person", "IDType": "INT64"}
            ],
            "relFileDescriptions": [
                {"filename": "knows.csv", "label": "Knows", "multiplicity": "MANY_MANY",
                 "srcNodeLabels": ["Person"], "dstNodeLabels": ["Person"]}
            ]
        }"#,
    )
    .unwrap();
    let mut f = std::fs::File::create(input.path().join("person.csv")).unwrap();
    writeln!(f, "ID:INT64,age:INT64").unwrap();
    write!(f, "0,30\n1,25\n2,40").unwrap();
    drop(f);
    let mut f = std::fs::File::create(input.path().join("knows.csv")).unwrap();
    writeln!(f, "START_ID,START_ID_LABEL,END_ID,END_ID_LABEL").unwrap();
    write!(f, "0,Person,1,Person\n1,Person,2,Person").unwrap();
    drop(f);

    let out_dir = output.path().join("out");
    let config = LoadConfig::default();
    let result = colgraph::build::run(input.path(), &out_dir, &config, &NoopProgress).unwrap();

    let reread = Catalog::read_from(&out_dir.join("catalog.bin")).unwrap();
    assert_eq!(reread.to_bytes(), result.catalog.to_bytes());

    let person = reread.node_label_by_name("Person").unwrap();
    assert_eq!(person.id_type, IdType::Int64);
    assert_eq!(person.structured_props.len(), 1);
    assert_eq!(person.structured_props[0].name, "age");

    let knows = &reread.rel_labels[0];
    assert_eq!(knows.multiplicity, Multiplicity::ManyMany);
    assert_eq!(knows.props.last().unwrap().name, "_id");

    // Re-flushing the same build must be byte-identical (flush idempotence).
    let out_dir2 = output.path().join("out2");
    let result2 = colgraph::build::run(input.path(), &out_dir2, &config, &NoopProgress).unwrap();
    assert_eq!(result.catalog.to_bytes(), result2.catalog.to_bytes());
    assert_eq!(
        std::fs::read(out_dir.join("n-Person-age.col")).unwrap(),
        std::fs::read(out_dir2.join("n-Person-age.col")).unwrap()
    );
}
