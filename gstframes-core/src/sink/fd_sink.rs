// ============================================================================
// gstframes-core/src/sink/fd_sink.rs
// ============================================================================
//
// FD SINK: Caps Discovery and Raw Frame Extraction
//
// Launching an FdSink pipeline moves through these phases:
//
//   Idle -> Launched -> AwaitingCaps -> Streaming -> Closed | Failed
//
// 1. The subprocess is spawned with stdout captured and the side channel
//    mapped onto the configured descriptor.
// 2. A scanner thread feeds every stdout line to the caps parser. The first
//    complete record of the trigger stage is handed to `start` over a
//    one-slot channel. The scanner keeps draining stdout until it closes.
// 3. `start` sizes frames from that record and spawns the reader thread,
//    which assembles exactly `frame_size` bytes per frame from however many
//    reads it takes and hands each frame over a rendezvous channel. The
//    reader therefore never runs more than one frame ahead of the consumer.

use crate::caps::{Caps, CapsTable};
use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult, caps_discovery_error};
use crate::external::{PipelineProcess, PipelineSpawner, ProcessSpawner, SpawnedPipeline};
use crate::pipeline::RenderPipeline;
use crate::sink::Sink;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type SharedProcess = Arc<Mutex<Box<dyn PipelineProcess>>>;

fn lock_process(process: &SharedProcess) -> MutexGuard<'_, Box<dyn PipelineProcess>> {
    process.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sink that streams raw frames out of the pipeline through a dedicated
/// file descriptor.
///
/// The rendered element is `fdsink fd=<n>` where `n` is the side-channel
/// descriptor of the owning pipeline's configuration.
pub struct FdSink {
    trigger_stage: Option<String>,
    pipeline: Option<Arc<dyn RenderPipeline>>,
    spawner: Arc<dyn PipelineSpawner>,
}

impl Default for FdSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FdSink {
    pub fn new() -> Self {
        Self {
            trigger_stage: None,
            pipeline: None,
            spawner: Arc::new(ProcessSpawner),
        }
    }

    /// Overrides the trigger stage of the pipeline configuration.
    #[must_use]
    pub fn with_trigger_stage(mut self, stage: impl Into<String>) -> Self {
        self.trigger_stage = Some(stage.into());
        self
    }

    /// Replaces the process spawner.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn PipelineSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Stage whose caps start streaming, once bound.
    pub fn trigger_stage(&self) -> Option<&str> {
        self.trigger_stage
            .as_deref()
            .or_else(|| self.pipeline.as_ref().map(|p| p.config().trigger_stage.as_str()))
    }

    /// Launches the pipeline and blocks until the trigger stage's caps are
    /// known.
    ///
    /// On success the frame reader is already running and the returned
    /// session yields frames of the discovered size. Every failure kills and
    /// reaps the subprocess before returning.
    pub fn start(&self) -> CoreResult<FrameSession> {
        let pipeline = self.pipeline.as_ref().ok_or(CoreError::NotBound)?;
        let config: &PipelineConfig = pipeline.config();
        let trigger = self
            .trigger_stage
            .clone()
            .unwrap_or_else(|| config.trigger_stage.clone());

        let target = Trigger::resolve(&trigger, &**pipeline);
        log::debug!("Waiting for caps of {}", target);

        let cmd = pipeline.render();
        let program = cmd.program_name();
        let SpawnedPipeline {
            process,
            stdout,
            side_channel,
        } = self.spawner.spawn_capturing(&cmd, config.side_channel_fd)?;
        let process: SharedProcess = Arc::new(Mutex::new(process));

        // Launched -> AwaitingCaps
        let table = CapsTable::new();
        let (caps_tx, caps_rx) = bounded(1);
        let scanner = {
            let table = table.clone();
            thread::Builder::new()
                .name("gstframes-scanner".to_string())
                .spawn(move || scan_trace(stdout, &table, &target, &caps_tx))
        };
        let scanner = match scanner {
            Ok(handle) => handle,
            Err(e) => {
                abort(&process, Vec::new());
                return Err(CoreError::Io(e));
            }
        };

        let caps = match wait_for_caps(&caps_rx, config.caps_timeout) {
            Ok(caps) => caps,
            Err(wait) => {
                let status = abort(&process, vec![scanner]);
                return Err(match wait {
                    RecvTimeoutError::Timeout => {
                        log::error!("Timed out waiting for caps of '{}'", trigger);
                        CoreError::CapsDiscoveryTimeout {
                            stage: trigger,
                            seconds: config.caps_timeout.map_or(0.0, |t| t.as_secs_f64()),
                        }
                    }
                    RecvTimeoutError::Disconnected => {
                        let exit = status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
                        log::error!("'{}' closed its output before caps of '{}' were known", program, trigger);
                        caps_discovery_error(
                            &trigger,
                            format!("pipeline output closed before caps were complete (exit: {exit})"),
                        )
                    }
                });
            }
        };
        log::debug!("Trigger caps discovered: {}", caps);

        // AwaitingCaps -> Streaming. Nothing is read from the side channel
        // unless the geometry is usable.
        let sizes = caps
            .frame_size()
            .and_then(|size| caps.channels().map(|channels| (size, channels)));
        let (frame_size, channels) = match sizes {
            Ok(sizes) => sizes,
            Err(e) => {
                log::error!("Cannot stream {}: {}", caps, e);
                abort(&process, vec![scanner]);
                return Err(e);
            }
        };

        let (frame_tx, frame_rx) = bounded(0);
        let reader = thread::Builder::new()
            .name("gstframes-reader".to_string())
            .spawn(move || read_frames(side_channel, frame_size, &frame_tx));
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                abort(&process, vec![scanner]);
                return Err(CoreError::Io(e));
            }
        };

        log::debug!("Streaming {} byte frames from {}", frame_size, caps);
        Ok(FrameSession {
            caps,
            frame_size,
            channels,
            table,
            frames: Some(frame_rx),
            process,
            cancelled: Arc::new(AtomicBool::new(false)),
            delivered: 0,
            workers: vec![scanner, reader],
            finished: false,
        })
    }
}

impl Sink for FdSink {
    fn stage_tokens(&self, config: &PipelineConfig) -> Vec<String> {
        vec!["fdsink".to_string(), format!("fd={}", config.side_channel_fd)]
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

impl fmt::Debug for FdSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdSink")
            .field("trigger_stage", &self.trigger_stage())
            .field("bound", &self.pipeline.is_some())
            .finish()
    }
}

/// The stage whose first complete caps record starts streaming.
///
/// The configured trigger is either an instance name (`capsfilter1`, or the
/// value of a `name=` property) or an element type (`GstCapsFilter`). A type
/// is pinned to the instance gst-launch gives its last element in the chain,
/// the one nearest the frame sink. When the chain does not tell, any
/// instance of the type matches.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Trigger {
    stage: String,
    instance: Option<String>,
}

impl Trigger {
    fn resolve(stage: &str, pipeline: &dyn RenderPipeline) -> Self {
        Self {
            stage: stage.to_string(),
            instance: pipeline.element_instance(stage),
        }
    }

    fn matches(&self, caps: &Caps) -> bool {
        match &self.instance {
            Some(instance) => caps.instance == *instance,
            None => caps.name == self.stage || caps.instance == self.stage,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{} ({})", self.stage, instance),
            None => f.write_str(&self.stage),
        }
    }
}

/// Kills and reaps the subprocess, then joins the given workers.
fn abort(process: &SharedProcess, workers: Vec<JoinHandle<()>>) -> Option<ExitStatus> {
    let status = {
        let mut process = lock_process(process);
        if let Err(e) = process.kill() {
            log::warn!("Failed to kill pipeline: {}", e);
        }
        process.wait().ok()
    };
    for worker in workers {
        let _ = worker.join();
    }
    status
}

fn wait_for_caps(
    caps_rx: &Receiver<Caps>,
    timeout: Option<Duration>,
) -> Result<Caps, RecvTimeoutError> {
    match timeout {
        Some(timeout) => caps_rx.recv_timeout(timeout),
        None => caps_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

/// Feeds the pipeline's stdout to the caps table until it closes.
fn scan_trace(stdout: Box<dyn Read + Send>, table: &CapsTable, trigger: &Trigger, caps_tx: &Sender<Caps>) {
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    let mut published = false;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Stopped reading pipeline output: {}", e);
                break;
            }
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end();
        log::trace!("{}", text);

        if let Some(caps) = table.ingest(text) {
            log::debug!("Caps discovered: {}", caps);
            if !published && trigger.matches(&caps) && caps.is_complete() {
                published = true;
                // One-slot channel; never blocks.
                let _ = caps_tx.send(caps);
            }
        }
    }
    log::debug!("Pipeline output closed");
}

/// Assembles fixed-size frames from the side channel.
fn read_frames(
    mut source: Box<dyn Read + Send>,
    frame_size: usize,
    frame_tx: &Sender<CoreResult<Vec<u8>>>,
) {
    let mut frames = 0u64;
    loop {
        let mut frame = vec![0u8; frame_size];
        let mut filled = 0;

        while filled < frame_size {
            match source.read(&mut frame[filled..]) {
                Ok(0) => {
                    if filled > 0 {
                        log::warn!(
                            "Side channel closed mid-frame; discarding {} of {} bytes",
                            filled,
                            frame_size
                        );
                    }
                    log::debug!("Side channel closed after {} frames", frames);
                    return;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::error!("Side channel read failed: {}", e);
                    let _ = frame_tx.send(Err(CoreError::SideChannelRead {
                        bytes_read: filled,
                        source: e,
                    }));
                    return;
                }
            }
        }

        if frame_tx.send(Ok(frame)).is_err() {
            log::debug!("Frame receiver dropped after {} frames", frames);
            return;
        }
        frames += 1;
    }
}

/// A running pipeline whose trigger caps are known.
///
/// Frames are pulled with [`FrameSession::next_frame`] or handed to a
/// callback with [`FrameSession::for_each_frame`]. Dropping the session kills
/// and reaps the subprocess; [`FrameSession::close`] does the same and also
/// joins the worker threads.
pub struct FrameSession {
    caps: Caps,
    frame_size: usize,
    channels: usize,
    table: CapsTable,
    frames: Option<Receiver<CoreResult<Vec<u8>>>>,
    process: SharedProcess,
    cancelled: Arc<AtomicBool>,
    delivered: u64,
    workers: Vec<JoinHandle<()>>,
    finished: bool,
}

impl FrameSession {
    /// The trigger stage's caps this session streams with.
    pub fn caps(&self) -> &Caps {
        &self.caps
    }

    /// Size in bytes of every frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Bytes per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Caps of every stage seen so far, complete or not, keyed by instance
    /// name.
    pub fn caps_snapshot(&self) -> HashMap<String, Caps> {
        self.table.snapshot()
    }

    /// Number of frames handed out so far.
    pub fn frames_delivered(&self) -> u64 {
        self.delivered
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
            process: Arc::clone(&self.process),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks for the next frame.
    ///
    /// Returns `Ok(None)` once the side channel has closed or the session was
    /// cancelled, and the read error if the side channel failed.
    pub fn next_frame(&mut self) -> CoreResult<Option<Vec<u8>>> {
        if self.is_cancelled() {
            return Ok(None);
        }
        let received = match &self.frames {
            Some(frames) => frames.recv(),
            None => return Ok(None),
        };
        match received {
            Ok(Ok(frame)) if !self.is_cancelled() => {
                self.delivered += 1;
                Ok(Some(frame))
            }
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => {
                self.frames = None;
                Err(e)
            }
            Err(_) => {
                self.frames = None;
                Ok(None)
            }
        }
    }

    /// Kills and reaps the subprocess and joins the worker threads.
    ///
    /// Returns the exit status of the subprocess, which reflects the kill
    /// unless it had already exited.
    pub fn close(mut self) -> CoreResult<ExitStatus> {
        let status = self.shutdown();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        status
    }

    fn shutdown(&mut self) -> CoreResult<ExitStatus> {
        self.finished = true;
        // Unblocks a reader waiting to hand over a frame.
        self.frames = None;
        let mut process = lock_process(&self.process);
        process.kill()?;
        let status = process.wait()?;
        log::debug!("Pipeline stopped: {}", status);
        Ok(status)
    }
}

impl Drop for FrameSession {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.shutdown() {
                log::warn!("Failed to stop pipeline: {}", e);
            }
        }
    }
}

impl fmt::Debug for FrameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSession")
            .field("caps", &self.caps)
            .field("frame_size", &self.frame_size)
            .field("frames_delivered", &self.frames_delivered())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels a [`FrameSession`] from another thread.
///
/// Cancelling kills the subprocess; the session observes it at its next
/// receive, and a read in progress ends with the closed side channel.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    process: SharedProcess,
}

impl CancelHandle {
    pub fn cancel(&self) -> CoreResult<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        log::debug!("Cancelling pipeline");
        lock_process(&self.process).kill()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
