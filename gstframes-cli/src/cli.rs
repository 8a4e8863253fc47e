// gstframes-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "gstframes: Raw frame extraction from gst-launch pipelines",
    long_about = "Builds gst-launch pipelines ending in an fd sink, discovers the negotiated caps and extracts raw frames via gstframes-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Optional: JSON pipeline configuration file; flags override its values
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional: gst-launch binary to run (defaults to gst-launch-1.0 on PATH)
    #[arg(long, global = true, value_name = "PATH", env = "GSTFRAMES_GST_BIN")]
    pub gst_bin: Option<PathBuf>,

    /// Optional: Stage whose caps start frame extraction (default: GstCapsFilter)
    #[arg(long, global = true, value_name = "STAGE")]
    pub trigger_stage: Option<String>,

    /// Optional: Give up if caps are not discovered within this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub caps_timeout: Option<f64>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Optional: Also write the log to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints the gst-launch command line for the given stages
    Render(RenderArgs),
    /// Starts the pipeline and prints the discovered caps
    Probe(ProbeArgs),
    /// Starts the pipeline and captures raw frames
    Capture(CaptureArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    /// Pipeline stage, e.g. "videotestsrc num-buffers=10". Repeat in order;
    /// the fd sink is appended automatically.
    #[arg(short = 's', long = "stage", required = true, value_name = "STAGE")]
    pub stages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub stages: StageArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub stages: StageArgs,

    /// Print the caps as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also print the caps of every other stage seen so far
    #[arg(long, default_value_t = false)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub stages: StageArgs,

    /// Optional: Stop after this many frames
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub frames: Option<u64>,

    /// Optional: Directory to write frame_NNNNNN.raw files into
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}
