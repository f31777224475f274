//! Component J: orchestrator (spec §4.J, §5, §7).
//!
//! Reads the dataset descriptor, counts CSV blocks, runs every node builder
//! (H) then every rel builder (I), and writes the catalog/stats files. On
//! any fatal error the output directory is torn down and the first error is
//! surfaced (spec §7 propagation).

use std::collections::HashMap;
use std::path::Path;

use crate::build::node_builder::{self, NodeBuildOutput};
use crate::build::rel_builder::{self, RelBuildOutput};
use crate::catalog::{
    Catalog, CsvOptions, DatasetDescriptor, NodeLabel, PropertyDef, RelLabel,
};
use crate::config::LoadConfig;
use crate::csvblock;
use crate::error::{LoadError, Result};
use crate::progress::ProgressSink;
use crate::threadpool::ScopedThreadPool;
use crate::types::{LabelId, TypeId};

pub struct RunOutput {
    pub catalog: Catalog,
}

/// Runs a full build from `input_dir`'s descriptor into `output_dir`,
/// creating `output_dir` fresh and removing it again on any fatal error
/// (spec §7: "orchestrator... deletes the partial output directory").
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    config: &LoadConfig,
    progress: &dyn ProgressSink,
) -> Result<RunOutput> {
    match run_inner(input_dir, output_dir, config, progress) {
        Ok(out) => Ok(out),
        Err(e) => {
            let _ = std::fs::remove_dir_all(output_dir);
            Err(e)
        }
    }
}

fn run_inner(
    input_dir: &Path,
    output_dir: &Path,
    config: &LoadConfig,
    progress: &dyn ProgressSink,
) -> Result<RunOutput> {
    let descriptor = DatasetDescriptor::load(&input_dir.join("metadata.json"))?;
    std::fs::create_dir_all(output_dir)?;
    let pool = ScopedThreadPool::new(config.threads);

    // Assign dense label ids in descriptor order (spec §3: labels are
    // immutable once created at descriptor-read time).
    let mut nodes_by_name: HashMap<String, LabelId> = HashMap::new();
    let mut node_labels = Vec::with_capacity(descriptor.node_file_descriptions.len());
    for (i, nfd) in descriptor.node_file_descriptions.iter().enumerate() {
        let id_type = DatasetDescriptor::id_type(&nfd.id_type)?;
        let csv_path = input_dir.join(&nfd.filename);
        let header = read_header_line(&csv_path)?;
        let structured_props = parse_node_header(&header, &descriptor.csv_options)?;
        nodes_by_name.insert(nfd.label.clone(), i as LabelId);
        node_labels.push((
            NodeLabel {
                id: i as LabelId,
                name: nfd.label.clone(),
                id_type,
                structured_props,
                unstructured_props: Vec::new(),
            },
            csv_path,
        ));
    }

    let mut node_outputs: HashMap<LabelId, NodeBuildOutput> = HashMap::new();
    for (label, csv_path) in node_labels {
        tracing::info!(label = %label.name, "building node label");
        let out = node_builder::build_node_label(label, &csv_path, &descriptor.csv_options, &pool, progress)?;
        out.flush(output_dir)?;
        node_outputs.insert(out.label.id, out);
    }

    let mut rel_labels = Vec::with_capacity(descriptor.rel_file_descriptions.len());
    for (i, rfd) in descriptor.rel_file_descriptions.iter().enumerate() {
        let multiplicity = DatasetDescriptor::multiplicity(&rfd.multiplicity)?;
        let csv_path = input_dir.join(&rfd.filename);
        let header = read_header_line(&csv_path)?;
        let mut props = parse_rel_header(&header, &descriptor.csv_options)?;
        props.push(PropertyDef {
            id: props.len() as u32,
            name: "_id".to_string(),
            type_id: TypeId::Int64.tag(),
        });
        let src_labels = resolve_labels(&rfd.src_node_labels, &nodes_by_name)?;
        let dst_labels = resolve_labels(&rfd.dst_node_labels, &nodes_by_name)?;
        rel_labels.push((
            RelLabel {
                id: i as LabelId,
                name: rfd.label.clone(),
                multiplicity,
                src_labels,
                dst_labels,
                props,
            },
            csv_path,
        ));
    }

    let nodes_by_id: HashMap<LabelId, &NodeBuildOutput> =
        node_outputs.iter().map(|(&id, out)| (id, out)).collect();

    let mut rel_outputs: Vec<RelBuildOutput> = Vec::with_capacity(rel_labels.len());
    for (label, csv_path) in rel_labels {
        tracing::info!(label = %label.name, "building rel label");
        let out = rel_builder::build_rel_label(
            label,
            &csv_path,
            &descriptor.csv_options,
            &nodes_by_id,
            &nodes_by_name,
            &pool,
            progress,
        )?;
        let node_name = |id: LabelId| nodes_by_id[&id].label.name.clone();
        out.flush(output_dir, node_name)?;
        rel_outputs.push(out);
    }

    let mut node_counts: Vec<(LabelId, u64)> =
        nodes_by_id.iter().map(|(&id, out)| (id, out.num_nodes)).collect();
    node_counts.sort_by_key(|(id, _)| *id);
    let rel_counts: Vec<(LabelId, [HashMap<LabelId, u64>; 2])> = rel_outputs
        .iter()
        .map(|o| (o.label.id, o.rel_counts.clone()))
        .collect();

    let catalog = Catalog {
        node_labels: {
            let mut v: Vec<NodeLabel> = node_outputs.into_values().map(|o| o.label).collect();
            v.sort_by_key(|l| l.id);
            v
        },
        rel_labels: rel_outputs.iter().map(|o| o.label.clone()).collect(),
    };
    catalog.write_to(&output_dir.join("catalog.bin"))?;

    let stats = crate::catalog::GraphStats {
        node_counts,
        rel_counts,
    };
    stats.write_to(&output_dir.join("graph.bin"))?;

    Ok(RunOutput { catalog })
}

fn resolve_labels(names: &[String], nodes_by_name: &HashMap<String, LabelId>) -> Result<Vec<LabelId>> {
    names
        .iter()
        .map(|n| {
            nodes_by_name
                .get(n)
                .copied()
                .ok_or_else(|| LoadError::Schema(format!("unknown node label '{n}' in rel descriptor")))
        })
        .collect()
}

fn read_header_line(csv_path: &Path) -> Result<String> {
    let contents = csvblock::read_file(csv_path)?;
    let text = std::str::from_utf8(&contents).map_err(|e| LoadError::Schema(e.to_string()))?;
    Ok(text.lines().next().unwrap_or("").to_string())
}

/// Parses a node CSV header (`ID:TYPE,name:TYPE,...`) into structured
/// property definitions, validating the mandatory `ID` column (spec §6, §7
/// SchemaError).
fn parse_node_header(header: &str, csv_opts: &CsvOptions) -> Result<Vec<PropertyDef>> {
    let mut cols = header.split(csv_opts.separator);
    let id_col = cols
        .next()
        .ok_or_else(|| LoadError::Schema("node file missing ID column".to_string()))?;
    if !id_col.starts_with("ID") {
        return Err(LoadError::Schema(format!(
            "node file header must start with ID column, got '{id_col}'"
        )));
    }
    let mut props = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (i, col) in cols.enumerate() {
        let (name, type_name) = col
            .split_once(':')
            .ok_or_else(|| LoadError::Schema(format!("malformed property header '{col}'")))?;
        if name == "ID" {
            return Err(LoadError::Schema("ID column may only appear once".to_string()));
        }
        if !seen.insert(name.to_string()) {
            return Err(LoadError::Schema(format!("duplicate property name '{name}'")));
        }
        let type_id = TypeId::from_name(type_name)
            .ok_or_else(|| LoadError::Schema(format!("unknown property type '{type_name}' for '{name}'")))?;
        props.push(PropertyDef {
            id: i as u32,
            name: name.to_string(),
            type_id: type_id.tag(),
        });
    }
    Ok(props)
}

/// Parses a rel CSV header (`START_ID,START_ID_LABEL,END_ID,END_ID_LABEL,
/// name:TYPE,...`) into property definitions, validating the four mandatory
/// endpoint columns (spec §6, §7 SchemaError).
fn parse_rel_header(header: &str, csv_opts: &CsvOptions) -> Result<Vec<PropertyDef>> {
    let mut cols = header.split(csv_opts.separator);
    let expected = ["START_ID", "START_ID_LABEL", "END_ID", "END_ID_LABEL"];
    for want in expected {
        let got = cols
            .next()
            .ok_or_else(|| LoadError::Schema(format!("rel file missing '{want}' column")))?;
        if got != want {
            return Err(LoadError::Schema(format!(
                "rel file header expected '{want}', got '{got}'"
            )));
        }
    }
    let mut props = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (i, col) in cols.enumerate() {
        let (name, type_name) = col
            .split_once(':')
            .ok_or_else(|| LoadError::Schema(format!("malformed property header '{col}'")))?;
        if name == "START_ID" || name == "END_ID" {
            return Err(LoadError::Schema(format!(
                "'{name}' is a reserved endpoint column, not a property"
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(LoadError::Schema(format!("duplicate property name '{name}'")));
        }
        let type_id = TypeId::from_name(type_name)
            .ok_or_else(|| LoadError::Schema(format!("unknown property type '{type_name}' for '{name}'")))?;
        props.push(PropertyDef {
            id: i as u32,
            name: name.to_string(),
            type_id: type_id.tag(),
        });
    }
    Ok(props)
}
