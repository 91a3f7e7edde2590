// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Sensor discovery on the board's camera slots.

use crate::{error::CliError, sensors::SensorInfo, utils};
use clap::Args as ClapArgs;
use serde::Serialize;
use vpcam::{
    board::BoardConfig,
    platform::BoardPaths,
    probe::{AddressScan, ResolvedSensor, SensorProber, SensorRequest},
};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera slot of the board configuration (default: first slot with a sensor)
    #[arg(short, long)]
    interface: Option<u32>,

    /// Required sensor resolution in WxH format
    #[arg(short, long, value_name = "WxH")]
    size: Option<String>,

    /// Required sensor frame rate
    #[arg(short = 'F', long)]
    fps: Option<u32>,

    /// Try every candidate I2C address instead of stopping at the first miss
    #[arg(long)]
    exhaustive: bool,

    /// List every verified profile instead of the selected one
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Serialize)]
struct ProbeResult {
    slot: usize,
    mipi_host: u32,
    i2c_bus: u32,
    i2c_addr: String,
    mipi_rx: u32,
    mclk_configured: bool,
    sensor: SensorInfo,
}

impl ProbeResult {
    fn new(slot: usize, sensor: &ResolvedSensor) -> Self {
        ProbeResult {
            slot,
            mipi_host: sensor.interface,
            i2c_bus: sensor.i2c_bus,
            i2c_addr: format!("0x{:02x}", sensor.i2c_addr),
            mipi_rx: sensor.mipi_rx,
            mclk_configured: sensor.mclk_configured,
            sensor: SensorInfo::from(&sensor.profile),
        }
    }
}

fn sensor_request(args: &Args) -> Result<SensorRequest, CliError> {
    let mut request = SensorRequest::default();
    if let Some(size) = &args.size {
        let size = utils::parse_resolution(size)?;
        request = request.with_size(size.width, size.height);
    }
    if let Some(fps) = args.fps {
        request = request.with_fps(fps);
    }
    Ok(request)
}

/// Slots to probe: the requested one, or every enabled slot in order.
fn slots(board: &BoardConfig, interface: Option<u32>) -> Result<Vec<usize>, CliError> {
    match interface {
        Some(index) => match board.slot(index as usize) {
            Some(_) => Ok(vec![index as usize]),
            None => Err(CliError::InvalidArgs(format!(
                "board {} has no camera slot {}",
                board.board_id, index
            ))),
        },
        None => Ok((0..board.cameras.len()).collect()),
    }
}

pub fn execute(args: Args, paths: BoardPaths, json: bool) -> Result<(), CliError> {
    log::debug!("Executing probe command: {:?}", args);

    let request = sensor_request(&args)?;
    let board = BoardConfig::load(&paths)?;
    log::debug!("Board {}: {} camera slots", board.board_id, board.cameras.len());

    let scan = if args.exhaustive {
        AddressScan::Exhaustive
    } else {
        AddressScan::FailFast
    };
    let mut prober = SensorProber::new(paths).with_address_scan(scan);

    let mut results = Vec::new();
    let mut last_error = None;
    for slot in slots(&board, args.interface)? {
        let Some(camera) = board.slot(slot) else {
            continue;
        };
        let found = if args.all {
            prober.scan(camera.mipi_host)
        } else {
            prober.probe(camera.mipi_host, &request).map(|sensor| vec![sensor])
        };
        match found {
            Ok(sensors) => {
                results.extend(sensors.iter().map(|sensor| ProbeResult::new(slot, sensor)));
                if !args.all {
                    break;
                }
            }
            Err(err) => {
                log::debug!("camera slot {}: {}", slot, err);
                last_error = Some(err);
            }
        }
    }

    if results.is_empty() {
        return Err(match (args.interface, last_error) {
            (Some(_), Some(err)) => err.into(),
            _ => vpcam::Error::SensorNotFound { interface: None }.into(),
        });
    }

    if json {
        return utils::print_json(&results);
    }

    for result in &results {
        println!(
            "slot {} mipi host {}: {} {}x{}@{} {} {}-lane on i2c-{} {} (rx {}{})",
            result.slot,
            result.mipi_host,
            result.sensor.name,
            result.sensor.width,
            result.sensor.height,
            result.sensor.fps,
            result.sensor.data_type,
            result.sensor.lanes,
            result.i2c_bus,
            result.i2c_addr,
            result.mipi_rx,
            if result.mclk_configured { ", mclk" } else { "" }
        );
    }

    Ok(())
}
