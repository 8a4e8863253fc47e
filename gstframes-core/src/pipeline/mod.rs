// ============================================================================
// gstframes-core/src/pipeline/mod.rs
// ============================================================================
//
// PIPELINE BUILDER: Ordered Element Chain and Command Rendering
//
// This module assembles an ordered list of stages into the argument list of a
// gst-launch invocation. Building is pure; the only side effect is the
// preflight check that the pipeline binary can be executed at all.
//
// KEY COMPONENTS:
// - Pipeline: owns the configuration and the ordered stage list
// - PipelineCommand: binary path plus flattened argument list
// - RenderPipeline: capability handed to sinks so they can render on demand
//
// DESIGN:
// Attaching a sink consumes the builder. The finished pipeline is frozen
// behind an Arc and handed to the sink as a `dyn RenderPipeline`, so the sink
// can render its invocation without owning or mutating the builder.

mod stage;

pub use stage::{GenericStage, Stage, queue};

use stage::{element_factory, instance_stem, numbered_instance};

use crate::config::PipelineConfig;
use crate::error::CoreResult;
use crate::external::check_dependency;
use crate::sink::Sink;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

/// A rendered invocation: binary plus arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PipelineCommand {
    /// Name of the binary for log and error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Converts into a `std::process::Command` with the arguments applied.
    /// Stdio is left at the std defaults.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for PipelineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Renders the invocation of a finished pipeline.
pub trait RenderPipeline: Send + Sync {
    fn render(&self) -> PipelineCommand;
    fn config(&self) -> &PipelineConfig;

    /// Instance name of the last element of `element_type` in the chain, if
    /// it can be told from the description.
    fn element_instance(&self, _element_type: &str) -> Option<String> {
        None
    }
}

/// Builder for a gst-launch element chain.
///
/// # Examples
///
/// ```rust,no_run
/// use gstframes_core::{FdSink, Pipeline};
///
/// let sink = Pipeline::new()
///     .unwrap()
///     .add_tokens(["videotestsrc", "num-buffers=100"])
///     .add_tokens(["videoconvert"])
///     .add_tokens(["video/x-raw,format=BGR,width=320,height=240"])
///     .add_sink(FdSink::new());
/// let session = sink.start().unwrap();
/// println!("streaming {}", session.caps());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Creates a pipeline around the default `gst-launch-1.0` binary.
    pub fn new() -> CoreResult<Self> {
        Self::from_config(PipelineConfig::default())
    }

    /// Creates a pipeline around the given binary with otherwise default settings.
    pub fn with_binary(gst_bin: impl Into<PathBuf>) -> CoreResult<Self> {
        Self::from_config(PipelineConfig {
            gst_bin: gst_bin.into(),
            ..PipelineConfig::default()
        })
    }

    /// Creates a pipeline from explicit settings.
    ///
    /// Fails if the configuration is invalid or if running the binary with
    /// `--version` does not succeed.
    pub fn from_config(config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;
        check_dependency(&config.gst_bin)?;
        Ok(Self {
            config,
            stages: Vec::new(),
        })
    }

    /// Appends a stage.
    #[must_use]
    pub fn add(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Appends a stage given as tokens.
    #[must_use]
    pub fn add_tokens<I, S>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(GenericStage::new(tokens))
    }

    /// Appends the sink's stage, freezes the pipeline and binds it to the sink.
    pub fn add_sink<S: Sink>(mut self, mut sink: S) -> S {
        let tokens = sink.stage_tokens(&self.config);
        self.stages.push(Box::new(GenericStage::new(tokens)));
        log::debug!("Pipeline bound to sink: {}", self);
        sink.bind(Arc::new(self));
        sink
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Flattens the chain into the invocation.
    ///
    /// Arguments are the verbosity flag, the global arguments, then every
    /// stage's tokens in order with the separator between consecutive stages.
    pub fn render(&self) -> PipelineCommand {
        let mut args = Vec::with_capacity(self.config.global_args.len() + self.stages.len() * 3);
        if !self.config.verbose_flag.is_empty() {
            args.push(self.config.verbose_flag.clone());
        }
        args.extend(self.config.global_args.iter().cloned());

        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                args.push(self.config.separator.clone());
            }
            args.extend(stage.tokens());
        }

        PipelineCommand {
            program: self.config.gst_bin.clone(),
            args,
        }
    }

    /// Name gst-launch gives the last element of `element_type` in the chain.
    ///
    /// Unnamed elements are numbered per type in chain order, so with two caps
    /// strings the last `GstCapsFilter` is `capsfilter1`. A `name=` property
    /// overrides the number but still uses one up. Returns `None` when no
    /// stage creates an element of that type.
    pub fn element_instance(&self, element_type: &str) -> Option<String> {
        let stem = instance_stem(element_type);
        let tokens: Vec<String> = self.stages.iter().flat_map(|s| s.tokens()).collect();

        let mut last = None;
        let elements = tokens
            .split(|t| *t == self.config.separator)
            .filter(|element| element_factory(element) == Some(stem.as_str()));
        for (index, element) in elements.enumerate() {
            let named = element.iter().find_map(|t| t.strip_prefix("name="));
            last = Some(match named {
                Some(name) => name.to_string(),
                None => numbered_instance(&stem, index),
            });
        }
        last
    }
}

impl RenderPipeline for Pipeline {
    fn render(&self) -> PipelineCommand {
        Pipeline::render(self)
    }

    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn element_instance(&self, element_type: &str) -> Option<String> {
        Pipeline::element_instance(self, element_type)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = format!(" {} ", self.config.separator);
        let described: Vec<String> = self.stages.iter().map(|s| s.tokens().join(" ")).collect();
        f.write_str(&described.join(&separator))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stages", &self.to_string())
            .finish()
    }
}
