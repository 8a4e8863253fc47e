//! Core library for extracting raw video frames from a gst-launch pipeline.
//!
//! This crate builds a gst-launch element chain, runs it as a subprocess,
//! recovers the negotiated caps from the verbose trace output and reads
//! fixed-size raw frames from a dedicated file descriptor.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use gstframes_core::{FdSink, Pipeline, StreamEnd, produce_frames};
//! use std::ops::ControlFlow;
//!
//! let sink = Pipeline::new()
//!     .unwrap()
//!     .add_tokens(["videotestsrc", "num-buffers=50"])
//!     .add_tokens(["videoconvert"])
//!     .add_tokens(["video/x-raw,format=BGR,width=320,height=240"])
//!     .add_sink(FdSink::new());
//!
//! let end = produce_frames(&sink, |frame| {
//!     assert_eq!(frame.data.len(), 320 * 240 * 3);
//!     Ok(ControlFlow::Continue(()))
//! })
//! .unwrap();
//! assert_eq!(end, StreamEnd::EndOfStream);
//! ```

pub mod caps;
pub mod config;
pub mod consumer;
pub mod error;
pub mod external;
pub mod pipeline;
pub mod sink;

// Re-exports for public API
pub use caps::{Caps, CapsTable, Framerate, PixelFormat, parse_caps_line};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use consumer::{FrameView, StreamEnd, produce_frames};
pub use error::{CoreError, CoreResult};
pub use external::{PipelineSpawner, ProcessSpawner, check_dependency};
pub use pipeline::{GenericStage, Pipeline, PipelineCommand, RenderPipeline, Stage, queue};
pub use sink::{CancelHandle, CommonSink, FdSink, FrameSession, PipelineHandle, Sink};
