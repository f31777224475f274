//! Scenario 1 (spec §8): minimal node label, integer key.

use std::io::Write;

use colgraph::config::LoadConfig;
use colgraph::progress::NoopProgress;

#[test]
fn minimal_node_label_lays_out_column_and_index() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    std::fs::write(
        input.path().join("metadata.json"),
        r#"{
            "nodeFileDescriptions": [
                {"filename": "person.csv", "label": "Person", "IDType": "INT64"}
            ],
            "relFileDescriptions": []
        }"#,
    )
    .unwrap();
    let mut f = std::fs::File::create(input.path().join("person.csv")).unwrap();
    writeln!(f, "ID:INT64,value:DOUBLE").unwrap();
    write!(f, "10,1.5\n20,2.5\n30,3.5").unwrap();
    drop(f);

    let out_dir = output.path().join("out");
    let config = LoadConfig::default();
    let result = colgraph::build::run(input.path(), &out_dir, &config, &NoopProgress).unwrap();

    let person = result.catalog.node_label_by_name("Person").unwrap();
    assert_eq!(person.structured_props.len(), 1);

    let bytes = std::fs::read(out_dir.join("n-Person-value.col")).unwrap();
    let value_at = |i: usize| f64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
    assert_eq!(value_at(0), 1.5);
    assert_eq!(value_at(1), 2.5);
    assert_eq!(value_at(2), 3.5);

    assert!(std::fs::metadata(out_dir.join("n-Person.pki")).unwrap().len() > 0);
    assert!(out_dir.join("graph.bin").exists());
}
