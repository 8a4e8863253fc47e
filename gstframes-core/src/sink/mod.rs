// ============================================================================
// gstframes-core/src/sink/mod.rs
// ============================================================================
//
// SINKS: Terminal Stages That Launch the Pipeline
//
// A sink is the last stage of a chain. Attaching it to a Pipeline freezes the
// chain and hands the sink a render capability; from then on the sink alone
// decides how the subprocess is launched and what happens to its output.
//
// KEY COMPONENTS:
// - Sink: trait implemented by every terminal stage
// - CommonSink: sinks that produce no frames (display, network, files)
// - FdSink: raw frame extraction over a side-channel descriptor
// - PipelineHandle: control over a pipeline launched by CommonSink

mod fd_sink;

pub use fd_sink::{CancelHandle, FdSink, FrameSession};

use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult, command_failed_error};
use crate::external::{PipelineProcess, PipelineSpawner, ProcessSpawner};
use crate::pipeline::{PipelineCommand, RenderPipeline};
use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

/// Terminal stage of a pipeline.
pub trait Sink: Send {
    /// Tokens of the sink element, computed from the owning pipeline's settings.
    fn stage_tokens(&self, config: &PipelineConfig) -> Vec<String>;

    /// Receives the frozen pipeline. Called once by [`crate::Pipeline::add_sink`].
    fn bind(&mut self, pipeline: Arc<dyn RenderPipeline>);

    /// The pipeline this sink is attached to, if any.
    fn pipeline(&self) -> Option<&Arc<dyn RenderPipeline>>;

    fn spawner(&self) -> &dyn PipelineSpawner;

    /// Renders the invocation of the attached pipeline.
    fn command(&self) -> CoreResult<PipelineCommand> {
        self.pipeline()
            .map(|pipeline| pipeline.render())
            .ok_or(CoreError::NotBound)
    }

    /// Launches the pipeline with inherited stdio and blocks until it exits.
    ///
    /// A non-zero exit is reported as [`CoreError::CommandFailed`].
    fn run(&self) -> CoreResult<ExitStatus> {
        let cmd = self.command()?;
        let mut process = self.spawner().spawn_inherited(&cmd)?;
        let status = process.wait()?;
        if !status.success() {
            return Err(command_failed_error(
                &cmd.program_name(),
                status,
                "pipeline exited unsuccessfully",
            ));
        }
        log::debug!("Pipeline finished: {}", status);
        Ok(status)
    }
}

/// A sink element that produces no frames for the caller, e.g.
/// `autovideosink` or `filesink location=out.raw`.
pub struct CommonSink {
    tokens: Vec<String>,
    pipeline: Option<Arc<dyn RenderPipeline>>,
    spawner: Arc<dyn PipelineSpawner>,
}

impl CommonSink {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            pipeline: None,
            spawner: Arc::new(ProcessSpawner),
        }
    }

    /// Replaces the process spawner.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn PipelineSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Launches the pipeline with inherited stdio and returns immediately.
    pub fn start(&self) -> CoreResult<PipelineHandle> {
        let cmd = self.command()?;
        let process = self.spawner.spawn_inherited(&cmd)?;
        Ok(PipelineHandle {
            process,
            program: cmd.program_name(),
        })
    }
}

impl Sink for CommonSink {
    fn stage_tokens(&self, _config: &PipelineConfig) -> Vec<String> {
        self.tokens.clone()
    }

    fn bind(&mut self, pipeline: Arc<dyn RenderPipeline>) {
        self.pipeline = Some(pipeline);
    }

    fn pipeline(&self) -> Option<&Arc<dyn RenderPipeline>> {
        self.pipeline.as_ref()
    }

    fn spawner(&self) -> &dyn PipelineSpawner {
        self.spawner.as_ref()
    }
}

impl fmt::Debug for CommonSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonSink")
            .field("tokens", &self.tokens)
            .field("bound", &self.pipeline.is_some())
            .finish()
    }
}

/// A pipeline launched by [`CommonSink::start`].
///
/// Dropping the handle does not stop the subprocess.
pub struct PipelineHandle {
    process: Box<dyn PipelineProcess>,
    program: String,
}

impl PipelineHandle {
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    pub fn kill(&mut self) -> CoreResult<()> {
        log::debug!("Stopping '{}'", self.program);
        self.process.kill()
    }

    pub fn try_wait(&mut self) -> CoreResult<Option<ExitStatus>> {
        self.process.try_wait()
    }

    pub fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.process.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::MockSpawner;
    use crate::pipeline::Pipeline;

    #[test]
    fn test_common_sink_renders_its_own_tokens() {
        let sink = Pipeline::with_binary("true")
            .unwrap()
            .add_tokens(["videotestsrc"])
            .add_sink(CommonSink::new(["fakesink", "sync=false"]));
        let cmd = sink.command().unwrap();
        assert_eq!(cmd.args, vec!["-v", "videotestsrc", "!", "fakesink", "sync=false"]);
    }

    #[test]
    fn test_unbound_sink_cannot_start() {
        let sink = CommonSink::new(["fakesink"]);
        assert!(matches!(sink.command(), Err(CoreError::NotBound)));
        assert!(matches!(sink.run(), Err(CoreError::NotBound)));
    }

    #[test]
    fn test_run_reports_failure_status() {
        let spawner = MockSpawner::new().with_exit_code(1);
        let sink = Pipeline::with_binary("true")
            .unwrap()
            .add_tokens(["videotestsrc"])
            .add_sink(CommonSink::new(["fakesink"]).with_spawner(Arc::new(spawner.clone())));

        let err = sink.run().unwrap_err();
        assert!(matches!(err, CoreError::CommandFailed { ref command, .. } if command == "true"));
        assert_eq!(spawner.get_received_calls().len(), 1);
    }

    #[test]
    fn test_start_and_kill_handle() {
        let spawner = MockSpawner::new();
        let sink = Pipeline::with_binary("true")
            .unwrap()
            .add_tokens(["videotestsrc"])
            .add_sink(CommonSink::new(["fakesink"]).with_spawner(Arc::new(spawner.clone())));

        let mut handle = sink.start().unwrap();
        handle.kill().unwrap();
        assert!(spawner.was_killed());
        assert!(!handle.wait().unwrap().success());
    }

    #[test]
    fn test_run_real_subprocess() {
        // `true` ignores its arguments and exits 0.
        let sink = Pipeline::with_binary("true")
            .unwrap()
            .add_tokens(["videotestsrc"])
            .add_sink(CommonSink::new(["fakesink"]));
        assert!(sink.run().unwrap().success());
    }
}
