// gstframes-cli/src/lib.rs
//
// Library portion of the gstframes CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod output;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{CaptureArgs, Cli, Commands, GlobalArgs, ProbeArgs, RenderArgs};
pub use commands::capture::run_capture;
pub use commands::probe::run_probe;
pub use commands::render::run_render;
