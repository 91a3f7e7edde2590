// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

mod capture;
mod channels;
mod error;
mod metrics;
mod probe;
mod sensors;
mod utils;

use clap::{Parser, Subcommand};
use error::result_to_exit_code;
use std::{path::PathBuf, process::ExitCode};
use vpcam::platform::BoardPaths;

/// vpcam CLI - MIPI camera discovery, channel planning and capture tool
#[derive(Parser)]
#[command(name = "vpcam")]
#[command(version)]
#[command(about = "vpcam CLI - MIPI camera discovery, channel planning and capture tool")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (use RUST_LOG=debug for more)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Prefix for the device tree, sysfs and /dev (defaults to $VPCAM_ROOT or /)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Board configuration file (defaults to <root>/etc/board_config.json)
    #[arg(long, global = true, value_name = "FILE")]
    board_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn board_paths(&self) -> BoardPaths {
        let paths = match &self.root {
            Some(root) => BoardPaths::with_root(root),
            None => BoardPaths::from_env(),
        };
        match &self.board_config {
            Some(file) => paths.with_board_config(file),
            None => paths,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the sensor profiles in the compiled catalog
    Sensors(sensors::Args),

    /// Probe a camera interface and print the resolved sensor
    Probe(probe::Args),

    /// Plan VSE channel assignments without touching hardware
    Channels(channels::Args),

    /// Open the camera and read frames from every output
    Capture(capture::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.quiet);

    let paths = cli.board_paths();
    let result = match cli.command {
        Commands::Sensors(args) => sensors::execute(args, cli.json),
        Commands::Probe(args) => probe::execute(args, paths, cli.json),
        Commands::Channels(args) => channels::execute(args, cli.json),
        Commands::Capture(args) => capture::execute(args, paths, cli.json),
    };

    result_to_exit_code(result)
}

/// Initialize env_logger based on verbosity flags
fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default();

    let env = if quiet {
        env.default_filter_or("error")
    } else if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("Logging initialized");
}
