// gstframes-cli/src/config.rs
//
// Turns the global command-line options into a core PipelineConfig.

use crate::cli::GlobalArgs;
use anyhow::{Context, Result, bail};
use gstframes_core::PipelineConfig;
use std::time::Duration;

/// Loads the configuration file if one was given and applies the flags on top.
pub fn pipeline_config(args: &GlobalArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(gst_bin) = &args.gst_bin {
        config.gst_bin = gst_bin.clone();
    }
    if let Some(stage) = &args.trigger_stage {
        config.trigger_stage = stage.clone();
    }
    if let Some(seconds) = args.caps_timeout {
        if !seconds.is_finite() || seconds <= 0.0 {
            bail!("--caps-timeout must be a positive number of seconds, got {seconds}");
        }
        config.caps_timeout = Some(Duration::from_secs_f64(seconds));
    }

    config.validate()?;
    log::debug!("Pipeline configuration: {:?}", config);
    Ok(config)
}
