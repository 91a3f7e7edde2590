// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Sensor catalog listing.

use crate::{error::CliError, utils};
use clap::Args as ClapArgs;
use serde::Serialize;
use vpcam::catalog::{self, SensorProfile};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Only list sensors large enough for a VSE input limit of WxH
    #[arg(long, value_name = "WxH")]
    vse_limit: Option<String>,

    /// Only list profiles of this driver (e.g. imx219)
    #[arg(long)]
    driver: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SensorInfo {
    pub name: &'static str,
    pub driver: &'static str,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub data_type: String,
    pub lanes: u32,
    pub i2c_addrs: Vec<String>,
    pub chip_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdc_bin: Option<&'static str>,
}

impl From<&SensorProfile> for SensorInfo {
    fn from(profile: &SensorProfile) -> Self {
        SensorInfo {
            name: profile.name,
            driver: profile.driver(),
            width: profile.width,
            height: profile.height,
            fps: profile.fps,
            data_type: profile.data_type.to_string(),
            lanes: profile.mipi.lanes,
            i2c_addrs: profile
                .candidate_addresses()
                .into_iter()
                .map(|addr| format!("0x{:02x}", addr))
                .collect(),
            chip_id: format!("0x{:04x}@0x{:04x}", profile.chip_id, profile.chip_id_reg),
            gdc_bin: profile.gdc_bin,
        }
    }
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing sensors command: {:?}", args);

    let profiles = match &args.vse_limit {
        Some(limit) => {
            let limit = utils::parse_resolution(limit)?;
            catalog::list_sensors_vse_limit(limit.width, limit.height)
        }
        None => catalog::list_sensors(),
    };

    let sensors: Vec<SensorInfo> = profiles
        .into_iter()
        .filter(|profile| {
            args.driver
                .as_deref()
                .map_or(true, |driver| profile.driver() == driver)
        })
        .map(SensorInfo::from)
        .collect();

    if json {
        return utils::print_json(&sensors);
    }

    println!(
        "{:<28} {:>11} {:>4} {:<6} {:>5}  I2C",
        "NAME", "SIZE", "FPS", "FORMAT", "LANES"
    );
    for sensor in &sensors {
        println!(
            "{:<28} {:>11} {:>4} {:<6} {:>5}  {}",
            sensor.name,
            format!("{}x{}", sensor.width, sensor.height),
            sensor.fps,
            sensor.data_type,
            sensor.lanes,
            sensor.i2c_addrs.join(",")
        );
    }
    println!("\n{} sensor profiles", sensors.len());

    Ok(())
}
