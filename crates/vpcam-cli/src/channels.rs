// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! VSE channel planning dry run.

use crate::{error::CliError, utils};
use clap::Args as ClapArgs;
use serde::Serialize;
use vpcam::channel::{allocate_outputs, Assignment};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Source (sensor) resolution in WxH format
    #[arg(short, long, value_name = "WxH")]
    source: String,

    /// Requested output resolution in WxH format, repeat for more outputs (0x0 = source)
    #[arg(short, long = "output", value_name = "WxH", required = true)]
    outputs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChannelPlan {
    output: usize,
    channel: String,
    width: u32,
    height: u32,
}

impl ChannelPlan {
    fn new(output: usize, assignment: &Assignment) -> Self {
        ChannelPlan {
            output,
            channel: assignment.channel.to_string(),
            width: assignment.size.width,
            height: assignment.size.height,
        }
    }
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing channels command: {:?}", args);

    let source = utils::parse_resolution(&args.source)?;
    if source.is_zero() {
        return Err(CliError::InvalidArgs(
            "source resolution must not be 0x0".to_string(),
        ));
    }
    let outputs = utils::parse_outputs(&args.outputs)?;

    let plan: Vec<ChannelPlan> = allocate_outputs(source, &outputs)?
        .iter()
        .enumerate()
        .map(|(index, assignment)| ChannelPlan::new(index, assignment))
        .collect();

    if json {
        return utils::print_json(&plan);
    }

    for entry in &plan {
        println!(
            "output {}: {} -> {}x{} on {}",
            entry.output, source, entry.width, entry.height, entry.channel
        );
    }

    Ok(())
}
