//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command. All of
//! them build the same pipeline: the `--stage` arguments in order, followed
//! by the fd sink.

/// Module containing the implementation of the `render` command.
pub mod render;

/// Module containing the implementation of the `probe` command.
pub mod probe;

/// Module containing the implementation of the `capture` command.
/// This command streams raw frames and optionally writes them to disk.
pub mod capture;

use crate::cli::StageArgs;
use anyhow::{Context, Result};
use gstframes_core::{FdSink, GenericStage, Pipeline, PipelineConfig};

/// Builds the pipeline described by `stages` and binds an fd sink to it.
pub fn build_sink(config: PipelineConfig, stages: &StageArgs) -> Result<FdSink> {
    let binary = config.gst_bin.display().to_string();
    let pipeline = Pipeline::from_config(config)
        .with_context(|| format!("'{binary}' is not usable as a gst-launch binary"))?;

    let pipeline = stages
        .stages
        .iter()
        .filter(|description| !description.trim().is_empty())
        .map(|description| GenericStage::parse(description))
        .fold(pipeline, |pipeline, stage| pipeline.add(stage));

    Ok(pipeline.add_sink(FdSink::new()))
}
