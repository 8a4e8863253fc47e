//! Configuration structures and constants for the gstframes-core library.
//!
//! This module provides the settings that control how a pipeline is invoked:
//! which binary runs it, how stages are joined, which descriptor carries raw
//! frames and which stage's caps mark the start of streaming.

mod builder;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use builder::PipelineConfigBuilder;

// Default constants

/// Default pipeline binary, resolved through `PATH`.
pub const DEFAULT_GST_BIN: &str = "gst-launch-1.0";

/// Leading flag that makes gst-launch print negotiated caps on stdout.
pub const DEFAULT_VERBOSE_FLAG: &str = "-v";

/// Token placed between consecutive stages.
pub const DEFAULT_SEPARATOR: &str = "!";

/// Descriptor the child writes raw frames to. Must match the `fd=` property
/// of the sink element in the chain.
pub const DEFAULT_SIDE_CHANNEL_FD: i32 = 3;

/// Stage whose caps mark the transition to streaming. This is the caps
/// filter placed right before the frame sink.
pub const DEFAULT_TRIGGER_STAGE: &str = "GstCapsFilter";

/// Settings for launching a pipeline.
///
/// All fields have defaults that match a stock `gst-launch-1.0` install, so
/// `PipelineConfig::default()` is usable as-is. The builder provides a fluent
/// way to override individual values.
///
/// # Examples
///
/// ```rust
/// use gstframes_core::config::PipelineConfigBuilder;
/// use std::time::Duration;
///
/// let config = PipelineConfigBuilder::new()
///     .gst_bin("/usr/bin/gst-launch-1.0")
///     .global_arg("--no-fault")
///     .caps_timeout(Duration::from_secs(10))
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binary that runs the pipeline description
    pub gst_bin: PathBuf,

    /// Flag emitted before everything else so the trace output contains caps
    pub verbose_flag: String,

    /// Extra arguments placed after the verbose flag and before the stages
    pub global_args: Vec<String>,

    /// Token emitted between consecutive stages
    pub separator: String,

    /// Child-side descriptor number of the raw frame side channel
    pub side_channel_fd: i32,

    /// Stage name whose complete caps start the frame reader
    pub trigger_stage: String,

    /// Upper bound on waiting for the trigger caps. `None` waits until the
    /// subprocess closes its stdout.
    #[serde(with = "optional_secs")]
    pub caps_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gst_bin: PathBuf::from(DEFAULT_GST_BIN),
            verbose_flag: DEFAULT_VERBOSE_FLAG.to_string(),
            global_args: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            side_channel_fd: DEFAULT_SIDE_CHANNEL_FD,
            trigger_stage: DEFAULT_TRIGGER_STAGE.to_string(),
            caps_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Checks the settings for values that can never produce a working run.
    pub fn validate(&self) -> CoreResult<()> {
        if self.gst_bin.as_os_str().is_empty() {
            return Err(CoreError::Config("pipeline binary path is empty".to_string()));
        }
        if self.separator.trim().is_empty() {
            return Err(CoreError::Config("stage separator is empty".to_string()));
        }
        if self.side_channel_fd <= 2 {
            return Err(CoreError::Config(format!(
                "side channel descriptor {} collides with stdio",
                self.side_channel_fd
            )));
        }
        if self.trigger_stage.trim().is_empty() {
            return Err(CoreError::Config("trigger stage name is empty".to_string()));
        }
        Ok(())
    }

    /// Loads a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }
}

/// Serializes `Option<Duration>` as fractional seconds.
mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.filter(|s| s.is_finite() && *s >= 0.0).map(Duration::from_secs_f64))
    }
}
