// gstframes-cli/src/commands/probe.rs
//
// Starts a pipeline, reports the caps negotiated by the trigger stage and
// shuts the pipeline down again without reading any frames.

use crate::cli::ProbeArgs;
use crate::commands::build_sink;
use crate::output::{print_caps, print_heading, print_section};
use crate::progress::caps_spinner;
use anyhow::{Context, Result};
use gstframes_core::{Caps, PipelineConfig};
use std::collections::BTreeMap;

pub fn run_probe(config: PipelineConfig, args: ProbeArgs) -> Result<()> {
    let sink = build_sink(config, &args.stages)?;
    let trigger = sink.trigger_stage().unwrap_or_default().to_string();

    let spinner = caps_spinner(&trigger);
    let started = sink.start();
    spinner.finish_and_clear();
    let session = started.with_context(|| format!("Failed to discover caps of {trigger}"))?;

    let caps = session.caps().clone();
    let others: BTreeMap<String, Caps> = session
        .caps_snapshot()
        .into_iter()
        .filter(|(key, _)| key != caps.key())
        .collect();

    let status = session.close()?;
    log::debug!("Probe pipeline stopped: {}", status);

    if args.json {
        let json = if args.all {
            serde_json::json!({ "trigger": caps, "stages": others })
        } else {
            serde_json::to_value(&caps)?
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    print_heading(&format!("Caps of {}", caps.name));
    print_caps(&caps);
    if args.all {
        for (key, other) in &others {
            print_section(key);
            print_caps(other);
        }
    }
    Ok(())
}
