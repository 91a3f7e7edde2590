// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use vpcam::camera::Size;

/// Parse a frame size in format "WxH" or "W*H"
///
/// `0x0` is accepted and means "same as the source".
pub fn parse_resolution(s: &str) -> Result<Size, CliError> {
    let (width_str, height_str) = s
        .split_once('x')
        .or_else(|| s.split_once('*'))
        .ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "Invalid resolution format (expected WxH or W*H): {}",
                s
            ))
        })?;

    let width = width_str
        .trim()
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid width in resolution: {}", s)))?;
    let height = height_str
        .trim()
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid height in resolution: {}", s)))?;

    if (width == 0) != (height == 0) {
        return Err(CliError::InvalidArgs(format!(
            "Resolution must be 0x0 or have both dimensions positive: {}",
            s
        )));
    }

    Ok(Size::new(width, height))
}

/// Parse every entry of a repeated `--output` flag
pub fn parse_outputs(outputs: &[String]) -> Result<Vec<Size>, CliError> {
    outputs.iter().map(|s| parse_resolution(s)).collect()
}

/// Install signal handler for graceful shutdown on Ctrl+C
///
/// Returns an Arc<AtomicBool> that will be set to true when SIGINT is received.
/// Check this flag periodically in your main loop to exit gracefully.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>, CliError> {
    let term = Arc::new(AtomicBool::new(false));

    flag::register(SIGINT, Arc::clone(&term))
        .map_err(|e| CliError::General(format!("Failed to register signal handler: {}", e)))?;

    log::debug!("Installed SIGINT handler");
    Ok(term)
}

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::General(format!("Failed to output JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}
