// ============================================================================
// gstframes-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the Pipeline Subprocess
//
// This module encapsulates everything that touches the gst-launch binary as
// an operating system process: the preflight check, spawning with a captured
// stdout and a dedicated side-channel descriptor, and process control. The
// rest of the crate only sees the traits defined here.
//
// KEY COMPONENTS:
// - check_dependency: preflight `--version` invocation
// - PipelineProcess: a running (or finished) pipeline subprocess
// - PipelineSpawner: creates PipelineProcess instances
// - ProcessSpawner: real implementation on top of std::process
// - mocks: scripted spawner for unit tests
//
// DESIGN PHILOSOPHY:
// Sinks receive the spawner as a trait object so tests can replace the real
// subprocess with scripted stdout text and scripted side-channel bytes.

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::pipeline::PipelineCommand;

// ---- Standard library imports ----
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// std::process based spawner with the raw frame side channel
mod process;

/// Scripted spawner used by tests
#[cfg(test)]
pub mod mocks;

pub use process::{ChildProcess, ProcessSpawner};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that the pipeline binary can be executed.
///
/// Runs `<binary> --version` with its output discarded and requires a
/// successful exit. This is the only validation performed before a pipeline
/// is built.
///
/// # Returns
///
/// * `Ok(())` - The binary ran and exited successfully
/// * `Err(CoreError::DependencyNotFound)` - The binary does not exist
/// * `Err(CoreError::CommandStart)` - The binary exists but could not be started
/// * `Err(CoreError::DependencyCheckFailed)` - The binary exited unsuccessfully
pub fn check_dependency(binary: &Path) -> CoreResult<()> {
    let name = binary.to_string_lossy();

    let status = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => {
            log::debug!("Found dependency: {}", name);
            Ok(())
        }
        Ok(status) => {
            log::warn!("Dependency '{}' exited with {} on --version", name, status);
            Err(CoreError::DependencyCheckFailed {
                command: name.into_owned(),
                reason: format!("`--version` exited with {status}"),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", name);
            Err(CoreError::DependencyNotFound(name.into_owned()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", name, e);
            Err(CoreError::CommandStart(name.into_owned(), e))
        }
    }
}

// ============================================================================
// PROCESS ABSTRACTION
// ============================================================================

/// A pipeline subprocess.
pub trait PipelineProcess: Send {
    /// OS process id, if the process has one.
    fn id(&self) -> Option<u32>;

    /// Terminates the process. Killing a process that already exited is not
    /// an error.
    fn kill(&mut self) -> CoreResult<()>;

    /// Returns the exit status if the process has exited.
    fn try_wait(&mut self) -> CoreResult<Option<ExitStatus>>;

    /// Blocks until the process exits.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// A freshly spawned pipeline with its output streams.
pub struct SpawnedPipeline {
    pub process: Box<dyn PipelineProcess>,
    /// Verbose trace output of the pipeline
    pub stdout: Box<dyn Read + Send>,
    /// Raw frame bytes written by the sink element
    pub side_channel: Box<dyn Read + Send>,
}

/// Creates pipeline subprocesses.
pub trait PipelineSpawner: Send + Sync {
    /// Spawns with stdout captured, stderr passed through and a pipe mapped
    /// onto `side_channel_fd` in the child.
    fn spawn_capturing(
        &self,
        cmd: &PipelineCommand,
        side_channel_fd: i32,
    ) -> CoreResult<SpawnedPipeline>;

    /// Spawns with all standard streams inherited from the caller.
    fn spawn_inherited(&self, cmd: &PipelineCommand) -> CoreResult<Box<dyn PipelineProcess>>;
}
