// gstframes-cli/src/main.rs
//
// Entry point of the gstframes command-line tool.
//
// Responsibilities:
// - Parsing arguments and installing the logger.
// - Building the core pipeline configuration from the global flags.
// - Dispatching to the command implementations.
// - Reporting errors and setting the process exit code.

use clap::Parser;
use gstframes_cli::config::pipeline_config;
use gstframes_cli::logging::init_logging;
use gstframes_cli::output::print_error;
use gstframes_cli::{Cli, Commands, run_capture, run_probe, run_render};
use std::process;

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.global.verbose, cli.global.log_file.as_deref())?;
    let config = pipeline_config(&cli.global)?;

    match cli.command {
        Commands::Render(args) => run_render(config, args),
        Commands::Probe(args) => run_probe(config, args),
        Commands::Capture(args) => run_capture(config, args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::debug!("Command failed: {:?}", e);
        print_error(&format!("{:#}", e));
        process::exit(1);
    }
}
