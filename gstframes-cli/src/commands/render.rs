// gstframes-cli/src/commands/render.rs
//
// Prints the command line a pipeline would be launched with.

use crate::cli::RenderArgs;
use crate::commands::build_sink;
use anyhow::Result;
use gstframes_core::{PipelineConfig, Sink};

pub fn run_render(config: PipelineConfig, args: RenderArgs) -> Result<()> {
    let sink = build_sink(config, &args.stages)?;
    let cmd = sink.command()?;
    println!("{cmd}");
    Ok(())
}
