// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! vpcam Library for Rust
//!
//! Board-support layer for MIPI camera pipelines on vnode based vision
//! processors. The library discovers which image sensor is attached to a
//! MIPI/I2C interface, resolves it against a compiled catalog of sensor
//! profiles, allocates the hardware VSE scaling channels to the requested
//! outputs and drives the sensor → VIN → ISP → VSE → GDC/OSD pipeline
//! through its lifecycle.
//!
//! # Quick Start
//!
//! ## Opening a Camera
//!
//! ```no_run
//! use vpcam::camera::{create_camera, Size};
//!
//! let camera = create_camera()
//!     .with_interface(0)
//!     .with_output(Size::new(1920, 1080))
//!     .with_output(Size::new(640, 480))
//!     .open()?;
//!
//! let frame = camera.get_frame(vpcam::frame::FrameSource::Vse(1), 2000)?;
//! println!("frame {} {}x{}", frame.frame_id(), frame.width(), frame.height());
//! frame.release()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Probing Without Opening
//!
//! ```no_run
//! use vpcam::{platform::BoardPaths, probe::{SensorProber, SensorRequest}};
//!
//! let mut prober = SensorProber::new(BoardPaths::default());
//! let sensor = prober.probe(0, &SensorRequest::default())?;
//! println!("found {} at 0x{:02x}", sensor.profile.name, sensor.i2c_addr);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - Chip-ID based sensor discovery with GPIO power sequencing
//! - Deterministic selection when several catalog profiles verify
//! - Greedy VSE channel allocation for multi-output requests
//! - Pipeline lifecycle with full rollback on partial initialisation
//! - Memory-to-memory scaling through the VSE alone
//!
//! # Support
//!
//! - Repository: <https://github.com/EdgeFirstAI/vpcam>
//! - Professional support: support@au-zone.com

use std::{error, fmt, io};
use vpcam_sys as ffi;

use crate::{pipeline::PipelineState, stage::StageKind};

/// Error type for vpcam library operations
#[derive(Debug)]
pub enum Error {
    /// The vendor libraries could not be loaded at runtime, or a required
    /// symbol is missing from them
    LibraryNotLoaded(ffi::libloading::Error),

    /// I/O error from the platform tree, sysfs, I2C device or dump files
    Io(io::Error),

    /// Board configuration file could not be parsed
    Json(serde_json::Error),

    /// No catalog sensor verified on the interface, or none matched the
    /// requested size and frame rate
    SensorNotFound { interface: Option<u32> },

    /// The MIPI host behind the interface is already streaming
    InterfaceBusy(u32),

    /// No free VSE channel can serve output `index`
    NoChannel {
        index: usize,
        width: u32,
        height: u32,
    },

    /// A hardware node rejected an operation
    Stage {
        kind: StageKind,
        op: &'static str,
        status: i32,
    },

    /// No frame became ready within the timeout
    Timeout { timeout_ms: u32 },

    /// A frame is already held on this stage and channel
    FrameOutstanding,

    /// The pipeline cannot perform `op` from its current state
    InvalidState {
        op: &'static str,
        state: PipelineState,
    },

    /// Caller supplied an argument outside the supported range
    InvalidArgument(String),

    /// The hardware cannot perform the requested operation
    Unsupported(String),
}

impl Error {
    /// Status code reported at the pipeline-open boundary.
    ///
    /// Every failure collapses to `-1`; callers must treat any non-zero
    /// value as "do not use the context".
    pub fn exit_code(&self) -> i32 {
        -1
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::LibraryNotLoaded(err) => {
                write!(f, "vendor hardware library could not be loaded: {}", err)
            }
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "board configuration error: {}", err),
            Error::SensorNotFound {
                interface: Some(interface),
            } => write!(
                f,
                "no camera sensor found on interface {}, check connection or interface index",
                interface
            ),
            Error::SensorNotFound { interface: None } => write!(
                f,
                "no camera sensor found, check connection or interface index"
            ),
            Error::InterfaceBusy(interface) => {
                write!(f, "interface {} is already in use", interface)
            }
            Error::NoChannel {
                index,
                width,
                height,
            } => write!(
                f,
                "no VSE channel available for output {} ({}x{})",
                index, width, height
            ),
            Error::Stage { kind, op, status } => {
                write!(f, "{} {} failed with status {}", kind, op, status)
            }
            Error::Timeout { timeout_ms } => {
                write!(f, "no frame ready after {} ms", timeout_ms)
            }
            Error::FrameOutstanding => {
                write!(f, "previous frame on this channel has not been released")
            }
            Error::InvalidState { op, state } => {
                write!(f, "cannot {} a pipeline in state {}", op, state)
            }
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::LibraryNotLoaded(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ffi::libloading::Error> for Error {
    fn from(err: ffi::libloading::Error) -> Self {
        Error::LibraryNotLoaded(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

/// The catalog module holds the compiled list of supported sensor profiles.
pub mod catalog;

/// The platform module reads the device tree and MIPI host sysfs nodes.
pub mod platform;

/// The board module parses the JSON board configuration.
pub mod board;

/// The i2c module provides register reads over `/dev/i2c-N`.
pub mod i2c;

/// The chip_id module verifies a sensor identity over I2C.
pub mod chip_id;

/// The gpio module drives the sensor power sequence through sysfs GPIO.
pub mod gpio;

/// The probe module discovers which catalog sensor sits on an interface.
pub mod probe;

/// The select module picks one sensor among several verified matches.
pub mod select;

/// The channel module assigns VSE hardware channels to output sizes.
pub mod channel;

/// The vnode module describes the hardware node service used by stages.
pub mod vnode;

/// The hbn module implements the vnode service over the vendor libraries.
pub mod hbn;

/// The stage module provides one implementation per pipeline stage kind.
pub mod stage;

/// The osd module manages overlay regions attached to VSE channels.
pub mod osd;

/// The pipeline module owns stage handles and the lifecycle state machine.
pub mod pipeline;

/// The frame module provides frame exchange with hardware nodes.
pub mod frame;

/// The camera module provides the camera and VSE open entry points.
pub mod camera;
