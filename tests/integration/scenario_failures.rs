//! Scenarios 5 and 6 (spec §8): fatal errors surfaced through the
//! orchestrator tear down the output directory and report the right
//! `LoadError` variant.

use std::io::Write;

use colgraph::config::LoadConfig;
use colgraph::error::LoadError;
use colgraph::progress::NoopProgress;

fn write_dataset(dir: &std::path::Path, person_body: &str, knows_body: Option<&str>) {
    let rel_descriptions = if knows_body.is_some() {
        r#"[{"filename": "knows.csv", "label": "Knows", "multiplicity": "MANY_MANY",
             "srcNodeLabels": ["Person"], "dstNodeLabels": ["Person"]}]"#
    } else {
        "[]"
    };
    std::fs::write(
        dir.join("metadata.json"),
        format!(
            r#"{{
                "nodeFileDescriptions": [
                    {{"filename": "person.csv", "label": "Person", "IDType": "INT64"}}
                ],
                "relFileDescriptions": {rel_descriptions}
            }}"#
        ),
    )
    .unwrap();

    let mut f = std::fs::File::create(dir.join("person.csv")).unwrap();
    writeln!(f, "ID:INT64").unwrap();
    write!(f, "{person_body}").unwrap();
    drop(f);

    if let Some(body) = knows_body {
        let mut f = std::fs::File::create(dir.join("knows.csv")).unwrap();
        writeln!(f, "START_ID,START_ID_LABEL,END_ID,END_ID_LABEL").unwrap();
        write!(f, "{body}").unwrap();
        drop(f);
    }
}

#[test]
fn scenario5_duplicate_primary_key_tears_down_output() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_dataset(input.path(), "10\n10", None);

    let out_dir = output.path().join("out");
    let config = LoadConfig::default();
    let result = colgraph::build::run(input.path(), &out_dir, &config, &NoopProgress);
    assert!(matches!(result, Err(LoadError::Constraint { .. })));
    assert!(!out_dir.exists());
}

#[test]
fn scenario6_unknown_rel_endpoint_tears_down_output() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_dataset(input.path(), "0\n1\n2", Some("99,Person,0,Person"));

    let out_dir = output.path().join("out");
    let config = LoadConfig::default();
    let result = colgraph::build::run(input.path(), &out_dir, &config, &NoopProgress);
    assert!(matches!(result, Err(LoadError::Constraint { .. })));
    assert!(!out_dir.exists());
}
