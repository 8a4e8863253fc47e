// gstframes-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests only; integration tests run generated scripts.

use super::{PipelineProcess, PipelineSpawner, SpawnedPipeline};
use crate::error::{CoreError, CoreResult};
use crate::pipeline::PipelineCommand;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt; // For ExitStatus::from_raw
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// SIGKILL, reported as the termination signal of a killed mock process.
const KILL_SIGNAL: i32 = 9;

/// Kill flag shared between a mock process and its streams.
#[derive(Debug, Default)]
struct KillSwitch {
    killed: Mutex<bool>,
    cond: Condvar,
}

impl KillSwitch {
    fn kill(&self) {
        *self.killed.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    fn is_killed(&self) -> bool {
        *self.killed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_killed(&self) {
        let mut killed = self.killed.lock().unwrap_or_else(PoisonError::into_inner);
        while !*killed {
            killed = self.cond.wait(killed).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Serves scripted bytes in bounded chunks.
struct ScriptedReader {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
    served: Option<Arc<AtomicUsize>>,
    trailing_error: Option<io::ErrorKind>,
    hold_open: bool,
    switch: Arc<KillSwitch>,
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // A killed producer delivers nothing more.
        if self.switch.is_killed() {
            return Ok(0);
        }
        if self.pos < self.data.len() {
            let n = buf
                .len()
                .min(self.chunk_size)
                .min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            if let Some(served) = &self.served {
                served.fetch_add(n, Ordering::SeqCst);
            }
            return Ok(n);
        }
        if let Some(kind) = self.trailing_error.take() {
            return Err(io::Error::new(kind, "scripted side channel failure"));
        }
        if self.hold_open {
            self.switch.wait_killed();
        }
        Ok(0)
    }
}

/// Mock implementation of PipelineProcess.
pub struct MockProcess {
    switch: Arc<KillSwitch>,
    exit_code: i32,
}

impl MockProcess {
    fn status(&self) -> ExitStatus {
        if self.switch.is_killed() {
            ExitStatus::from_raw(KILL_SIGNAL)
        } else {
            ExitStatus::from_raw(self.exit_code << 8)
        }
    }
}

impl PipelineProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.switch.kill();
        Ok(())
    }

    fn try_wait(&mut self) -> CoreResult<Option<ExitStatus>> {
        Ok(Some(self.status()))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.status())
    }
}

/// Mock implementation of PipelineSpawner.
///
/// Every spawn serves the same script: `stdout` as trace output and
/// `side_channel` as raw bytes, at most `chunk_size` bytes per read.
#[derive(Clone)]
pub struct MockSpawner {
    stdout: String,
    side_channel: Vec<u8>,
    chunk_size: usize,
    side_channel_error: Option<io::ErrorKind>,
    hold_stdout_open: bool,
    hold_side_channel_open: bool,
    exit_code: i32,
    spawn_error: Option<io::ErrorKind>,
    bytes_served: Arc<AtomicUsize>,
    received_calls: Arc<Mutex<Vec<PipelineCommand>>>,
    switch: Arc<KillSwitch>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self {
            stdout: String::new(),
            side_channel: Vec::new(),
            chunk_size: usize::MAX,
            side_channel_error: None,
            hold_stdout_open: false,
            hold_side_channel_open: false,
            exit_code: 0,
            spawn_error: None,
            bytes_served: Arc::new(AtomicUsize::new(0)),
            received_calls: Arc::new(Mutex::new(Vec::new())),
            switch: Arc::new(KillSwitch::default()),
        }
    }
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace output, one caps line per `\n`.
    pub fn with_stdout(mut self, text: impl Into<String>) -> Self {
        self.stdout = text.into();
        self
    }

    pub fn with_side_channel(mut self, bytes: Vec<u8>) -> Self {
        self.side_channel = bytes;
        self
    }

    /// Maximum bytes returned by a single side-channel read.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fails the side-channel read that follows the scripted bytes.
    pub fn with_side_channel_error(mut self, kind: io::ErrorKind) -> Self {
        self.side_channel_error = Some(kind);
        self
    }

    /// Keeps stdout open after the script until the process is killed.
    pub fn hold_stdout_open(mut self) -> Self {
        self.hold_stdout_open = true;
        self
    }

    /// Keeps the side channel open after the script until the process is killed.
    pub fn hold_side_channel_open(mut self) -> Self {
        self.hold_side_channel_open = true;
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Makes every spawn fail.
    pub fn with_spawn_error(mut self, kind: io::ErrorKind) -> Self {
        self.spawn_error = Some(kind);
        self
    }

    /// Side-channel bytes handed out so far.
    pub fn bytes_served(&self) -> usize {
        self.bytes_served.load(Ordering::SeqCst)
    }

    pub fn was_killed(&self) -> bool {
        self.switch.is_killed()
    }

    pub fn get_received_calls(&self) -> Vec<PipelineCommand> {
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, cmd: &PipelineCommand) -> CoreResult<()> {
        log::debug!("MockSpawner received command: {}", cmd);
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cmd.clone());
        match self.spawn_error {
            Some(kind) => Err(CoreError::CommandStart(
                cmd.program_name(),
                io::Error::new(kind, "scripted spawn failure"),
            )),
            None => Ok(()),
        }
    }

    fn process(&self) -> MockProcess {
        MockProcess {
            switch: Arc::clone(&self.switch),
            exit_code: self.exit_code,
        }
    }
}

impl PipelineSpawner for MockSpawner {
    fn spawn_capturing(
        &self,
        cmd: &PipelineCommand,
        _side_channel_fd: i32,
    ) -> CoreResult<SpawnedPipeline> {
        self.record(cmd)?;
        let stdout = ScriptedReader {
            data: self.stdout.clone().into_bytes(),
            pos: 0,
            chunk_size: usize::MAX,
            served: None,
            trailing_error: None,
            hold_open: self.hold_stdout_open,
            switch: Arc::clone(&self.switch),
        };
        let side_channel = ScriptedReader {
            data: self.side_channel.clone(),
            pos: 0,
            chunk_size: self.chunk_size,
            served: Some(Arc::clone(&self.bytes_served)),
            trailing_error: self.side_channel_error,
            hold_open: self.hold_side_channel_open,
            switch: Arc::clone(&self.switch),
        };
        Ok(SpawnedPipeline {
            process: Box::new(self.process()),
            stdout: Box::new(stdout),
            side_channel: Box::new(side_channel),
        })
    }

    fn spawn_inherited(&self, cmd: &PipelineCommand) -> CoreResult<Box<dyn PipelineProcess>> {
        self.record(cmd)?;
        Ok(Box::new(self.process()))
    }
}
