// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments
    InvalidArgs(String),
    /// No sensor found, or the board description is missing
    CameraNotFound(String),
    /// Vendor libraries missing or the hardware cannot do what was asked
    HardwareUnavailable(String),
    /// Interface or VSE channels already taken
    Busy(String),
    /// No frame arrived in time
    Timeout(String),
    /// Any other vpcam failure
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::CameraNotFound(msg) => write!(f, "Camera not found: {}", msg),
            CliError::HardwareUnavailable(msg) => write!(f, "Hardware unavailable: {}", msg),
            CliError::Busy(msg) => write!(f, "Busy: {}", msg),
            CliError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            CliError::InvalidArgs(_) => 2,
            CliError::CameraNotFound(_) => 3,
            CliError::HardwareUnavailable(_) => 4,
            CliError::Busy(_) => 5,
            CliError::Timeout(_) => 6,
            CliError::General(_) => 1,
        }
    }
}

/// Map vpcam::Error to CliError with appropriate exit codes
impl From<vpcam::Error> for CliError {
    fn from(err: vpcam::Error) -> Self {
        use vpcam::Error;

        match err {
            Error::InvalidArgument(_) => CliError::InvalidArgs(err.to_string()),

            Error::SensorNotFound { .. } => CliError::CameraNotFound(err.to_string()),

            Error::LibraryNotLoaded(_) | Error::Unsupported(_) => {
                CliError::HardwareUnavailable(err.to_string())
            }

            Error::InterfaceBusy(_) | Error::NoChannel { .. } | Error::FrameOutstanding => {
                CliError::Busy(err.to_string())
            }

            Error::Timeout { .. } => CliError::Timeout(err.to_string()),

            // A missing board file or device node means there is no camera
            // to talk to
            Error::Io(ref io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    CliError::CameraNotFound(err.to_string())
                }
                std::io::ErrorKind::TimedOut => CliError::Timeout(err.to_string()),
                _ => CliError::General(err.to_string()),
            },

            Error::Json(_) | Error::Stage { .. } | Error::InvalidState { .. } => {
                CliError::General(err.to_string())
            }
        }
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}
