//! Consumer loop over a running [`FrameSession`].
//!
//! The loop runs on the caller's thread. Each frame is lent to the callback
//! as a [`FrameView`] and released when the callback returns; the extraction
//! thread allocates a fresh buffer for the next frame.

use crate::error::{CoreError, CoreResult};
use crate::sink::{FdSink, FrameSession};
use std::ops::ControlFlow;

/// One frame lent to a consumer callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Exactly `width * height * channels` bytes of packed pixels
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel
    pub channels: usize,
    /// Zero-based position of the frame in the stream
    pub index: u64,
}

impl FrameView<'_> {
    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels
    }

    /// The bytes of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.stride();
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }
}

/// How a consumer loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The side channel closed.
    EndOfStream,
    /// The callback returned `ControlFlow::Break`.
    Stopped,
    /// The session was cancelled through a [`crate::CancelHandle`].
    Cancelled,
}

impl FrameSession {
    /// Hands every frame to `callback` until the stream ends, the callback
    /// breaks, or an error occurs.
    ///
    /// An error returned by the callback ends the loop as
    /// [`CoreError::Consumer`]; a side-channel failure ends it as
    /// [`CoreError::SideChannelRead`].
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use gstframes_core::{FdSink, Pipeline};
    /// use std::ops::ControlFlow;
    ///
    /// let sink = Pipeline::new()
    ///     .unwrap()
    ///     .add_tokens(["videotestsrc"])
    ///     .add_tokens(["videoconvert"])
    ///     .add_tokens(["video/x-raw,format=RGB,width=64,height=48"])
    ///     .add_sink(FdSink::new());
    /// let mut session = sink.start().unwrap();
    /// let end = session
    ///     .for_each_frame(|frame| {
    ///         println!("frame {} ({} bytes)", frame.index, frame.data.len());
    ///         Ok(if frame.index == 9 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) })
    ///     })
    ///     .unwrap();
    /// println!("{end:?}");
    /// ```
    pub fn for_each_frame<F>(&mut self, mut callback: F) -> CoreResult<StreamEnd>
    where
        F: FnMut(FrameView<'_>) -> anyhow::Result<ControlFlow<()>>,
    {
        let width = self.caps().width;
        let height = self.caps().height;
        let channels = self.channels();

        loop {
            let index = self.frames_delivered();
            let Some(frame) = self.next_frame()? else {
                return Ok(if self.is_cancelled() {
                    StreamEnd::Cancelled
                } else {
                    StreamEnd::EndOfStream
                });
            };

            let view = FrameView {
                data: &frame,
                width,
                height,
                channels,
                index,
            };
            match callback(view).map_err(CoreError::Consumer)? {
                ControlFlow::Continue(()) => {}
                ControlFlow::Break(()) => {
                    log::debug!("Consumer stopped after {} frames", index + 1);
                    return Ok(StreamEnd::Stopped);
                }
            }
        }
    }
}

/// Starts `sink`, runs the consumer loop and closes the pipeline.
///
/// The pipeline is closed whichever way the loop ends; the loop's outcome is
/// returned.
pub fn produce_frames<F>(sink: &FdSink, callback: F) -> CoreResult<StreamEnd>
where
    F: FnMut(FrameView<'_>) -> anyhow::Result<ControlFlow<()>>,
{
    let mut session = sink.start()?;
    let outcome = session.for_each_frame(callback);
    let frames = session.frames_delivered();
    match session.close() {
        Ok(status) => log::debug!("Pipeline closed after {} frames: {}", frames, status),
        Err(e) => log::warn!("Failed to close pipeline after {} frames: {}", frames, e),
    }
    outcome
}
