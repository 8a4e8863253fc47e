// ============================================================================
// gstframes-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for PipelineConfig
//
// This module implements the builder pattern for the PipelineConfig structure,
// providing a fluent API for creating and configuring PipelineConfig instances.
// Every field starts from the defaults in the parent module.

// ---- Standard library imports ----
use std::path::PathBuf;
use std::time::Duration;

// ---- Internal crate imports ----
use super::PipelineConfig;

/// Builder for creating PipelineConfig instances.
///
/// # Examples
///
/// ```rust
/// use gstframes_core::config::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::new()
///     .gst_bin("gst-launch-1.0")
///     .trigger_stage("GstCapsFilter")
///     .side_channel_fd(3)
///     .build();
/// assert_eq!(config.side_channel_fd, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a new PipelineConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline binary.
    ///
    /// # Arguments
    ///
    /// * `gst_bin` - Path or name of the gst-launch executable
    ///
    /// # Returns
    ///
    /// * Self for method chaining
    pub fn gst_bin(mut self, gst_bin: impl Into<PathBuf>) -> Self {
        self.config.gst_bin = gst_bin.into();
        self
    }

    /// Sets the leading verbosity flag.
    pub fn verbose_flag(mut self, flag: &str) -> Self {
        self.config.verbose_flag = flag.to_string();
        self
    }

    /// Appends one global argument. Global arguments keep their order and
    /// follow the verbosity flag.
    pub fn global_arg(mut self, arg: &str) -> Self {
        self.config.global_args.push(arg.to_string());
        self
    }

    /// Replaces all global arguments.
    pub fn global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.global_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the stage separator token.
    pub fn separator(mut self, separator: &str) -> Self {
        self.config.separator = separator.to_string();
        self
    }

    /// Sets the child-side descriptor number of the frame side channel.
    pub fn side_channel_fd(mut self, fd: i32) -> Self {
        self.config.side_channel_fd = fd;
        self
    }

    /// Sets the stage whose caps start the frame reader.
    pub fn trigger_stage(mut self, stage: &str) -> Self {
        self.config.trigger_stage = stage.to_string();
        self
    }

    /// Bounds how long a start call waits for the trigger caps.
    pub fn caps_timeout(mut self, timeout: Duration) -> Self {
        self.config.caps_timeout = Some(timeout);
        self
    }

    /// Builds the PipelineConfig instance.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
