// ============================================================================
// gstframes-cli/src/commands/capture.rs
// ============================================================================
//
// CAPTURE COMMAND: Stream Raw Frames Out of a Pipeline
//
// Starts the pipeline, waits for the trigger caps and consumes frames until
// the stream ends or the requested number of frames has been captured. Each
// frame can be written to its own file in an output directory.

use crate::cli::CaptureArgs;
use crate::commands::build_sink;
use crate::output::{format_bytes, format_duration, print_heading, print_info, print_success};
use crate::progress::{caps_spinner, frame_counter};
use anyhow::{Context, Result};
use gstframes_core::{PipelineConfig, StreamEnd};
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

/// File name of the frame at `index` inside the output directory.
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index:06}.raw")
}

pub fn run_capture(config: PipelineConfig, args: CaptureArgs) -> Result<()> {
    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
    }

    let sink = build_sink(config, &args.stages)?;
    let trigger = sink.trigger_stage().unwrap_or_default().to_string();
    let start_time = Instant::now();

    let spinner = caps_spinner(&trigger);
    let started = sink.start();
    spinner.finish_and_clear();
    let mut session = started.with_context(|| format!("Failed to discover caps of {trigger}"))?;
    log::info!("Streaming {}", session.caps());

    if args.frames == Some(0) {
        session.close()?;
        print_summary(0, 0, StreamEnd::Stopped, start_time, args.output.as_deref());
        return Ok(());
    }

    let counter = frame_counter(args.frames);
    let mut bytes = 0u64;
    let outcome = session.for_each_frame(|frame| {
        if let Some(dir) = &args.output {
            let path = dir.join(frame_file_name(frame.index));
            fs::write(&path, frame.data)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
        }
        bytes += frame.data.len() as u64;
        counter.inc(1);

        let captured = frame.index + 1;
        Ok(match args.frames {
            Some(limit) if captured >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        })
    });
    counter.finish_and_clear();

    let frames = session.frames_delivered();
    match session.close() {
        Ok(status) => log::debug!("Capture pipeline stopped: {}", status),
        Err(e) => log::warn!("Failed to stop capture pipeline: {}", e),
    }
    let end = outcome.context("Frame capture failed")?;

    print_summary(frames, bytes, end, start_time, args.output.as_deref());
    Ok(())
}

fn print_summary(frames: u64, bytes: u64, end: StreamEnd, start_time: Instant, output: Option<&Path>) {
    print_heading("Capture Summary");
    print_info("Frames", frames);
    print_info("Bytes", format_bytes(bytes));
    print_info("Elapsed", format_duration(start_time.elapsed()));
    if let Some(dir) = output {
        print_info("Output", dir.display());
    }
    match end {
        StreamEnd::EndOfStream => print_success("Stream ended"),
        StreamEnd::Stopped => print_success("Frame limit reached"),
        StreamEnd::Cancelled => print_success("Capture cancelled"),
    }
}
