//! vispipe - Main Entry Point
//!
//! Loads a saved pipeline, starts every scene and prints the resulting tree.
//!
//! ```text
//! vispipe <pipeline.vispipe.json> [config.toml]
//! vispipe --demo [out.vispipe.json]
//! ```

use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vispipe::{
    config::PipelineConfig,
    dataset::{AttributeRole, MemoryDataset, MemoryDatasetReader},
    persistence::{PipelineFile, RestoreContext},
    pipeline::{ComponentFactory, NodeId, OpaqueComponent, Pipeline},
};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match args.get(1) {
        Some(path) if args.first().map(String::as_str) != Some("--demo") => {
            PipelineConfig::load(path).with_context(|| format!("loading config {}", path))?
        }
        _ => PipelineConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut pipeline = Pipeline::new();
    let scenes = match args.first().map(String::as_str) {
        Some("--demo") => {
            let scene = build_demo(&mut pipeline)?;
            if let Some(out) = args.get(1) {
                let file = PipelineFile::capture("demo", &pipeline, &config.persistence)?;
                file.save(PathBuf::from(out), &config.persistence)?;
            }
            vec![scene]
        }
        Some(path) => {
            let file = PipelineFile::load(path).with_context(|| format!("loading pipeline {}", path))?;
            tracing::info!(
                "Loaded pipeline '{}' ({} nodes, saved {})",
                file.name,
                file.node_count(),
                file.saved_at
            );
            let reader = MemoryDatasetReader;
            let components = ComponentFactory::new();
            file.restore_into(&mut pipeline, &RestoreContext::new(&reader, &components))?
        }
        None => bail!("usage: vispipe <pipeline.vispipe.json> [config.toml] | vispipe --demo [out.vispipe.json]"),
    };

    for &scene in &scenes {
        let report = pipeline.start(scene)?;
        if !report.is_clean() {
            tracing::warn!("{} node(s) failed to start", report.failures.len());
        }
    }

    for &scene in &scenes {
        print!("{}", pipeline.render_tree(scene));
        for node in pipeline.iter().filter(|n| n.scene() == Some(scene)) {
            for output in node.outputs() {
                println!(
                    "  {} -> {} ({} point, {} cell arrays)",
                    node.name(),
                    output.type_name,
                    output.point_arrays.len(),
                    output.cell_arrays.len()
                );
            }
        }
    }
    Ok(())
}

fn build_demo(pipeline: &mut Pipeline) -> anyhow::Result<NodeId> {
    let scene = pipeline.create_scene("Demo scene");
    let data = MemoryDataset::new("UnstructuredGrid")
        .with_array(AttributeRole::Point, "temperature", 1, vec![280.0, 285.5, 291.0])
        .with_array(AttributeRole::Point, "pressure", 1, vec![1.01, 0.98, 1.02])
        .with_array(AttributeRole::Point, "velocity", 3, vec![0.0; 9]);
    let source = pipeline.create_data_source(Some(Box::new(data)))?;
    pipeline.add_child(scene, source)?;

    let clip = pipeline.create_filter("Clip", Box::new(OpaqueComponent::new("Clip", serde_json::json!({}))));
    pipeline.add_child(source, clip)?;
    let outline = pipeline.create_module("Outline", Box::new(OpaqueComponent::new("Outline", serde_json::Value::Null)));
    pipeline.add_child(clip, outline)?;
    Ok(scene)
}
