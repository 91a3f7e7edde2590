// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Frame capture from every VSE output of an opened camera.

use crate::{
    error::CliError,
    metrics::{FrameMetrics, MetricsCollector},
    utils,
};
use clap::Args as ClapArgs;
use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Instant,
};
use vpcam::{
    camera::{create_camera, Camera},
    channel::Assignment,
    frame::{FrameSource, VSE_FRAME_TIMEOUT_MS},
    platform::BoardPaths,
    Error,
};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera slot of the board configuration (default: first slot with a sensor)
    #[arg(short, long)]
    interface: Option<u32>,

    /// Output resolution in WxH format, repeat for more outputs (default: sensor size)
    #[arg(short, long = "output", value_name = "WxH")]
    outputs: Vec<String>,

    /// Required sensor resolution in WxH format
    #[arg(short, long, value_name = "WxH")]
    size: Option<String>,

    /// Required sensor frame rate
    #[arg(short = 'F', long)]
    fps: Option<u32>,

    /// Frames to read from each output (0=until Ctrl+C)
    #[arg(short = 'n', long, default_value = "100")]
    count: u64,

    /// Buffers per VSE output channel
    #[arg(long)]
    buffers: Option<u32>,

    /// Route the ISP output through the GDC
    #[arg(long)]
    gdc: bool,

    /// Write the first frame of every output as NV12 into this directory
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,
}

pub fn execute(args: Args, paths: BoardPaths, json: bool) -> Result<(), CliError> {
    log::debug!("Executing capture command: {:?}", args);

    let mut request = create_camera().with_paths(paths).with_gdc(args.gdc);
    if let Some(interface) = args.interface {
        request = request.with_interface(interface);
    }
    for output in utils::parse_outputs(&args.outputs)? {
        request = request.with_output(output);
    }
    if let Some(size) = &args.size {
        let size = utils::parse_resolution(size)?;
        request = request.with_sensor_size(size.width, size.height);
    }
    if let Some(fps) = args.fps {
        request = request.with_fps(fps);
    }
    if let Some(buffers) = args.buffers {
        request = request.with_buffers(buffers);
    }
    if let Some(dir) = &args.dump {
        std::fs::create_dir_all(dir).map_err(|e| {
            CliError::InvalidArgs(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }

    let term = utils::install_signal_handler()?;
    let camera = request.open()?;
    log::info!("Opened {}", camera);

    let max_frames = if args.count == 0 {
        u64::MAX
    } else {
        args.count
    };
    log::info!(
        "Capturing {} frames per output (Ctrl+C to stop)...",
        if max_frames == u64::MAX {
            "unlimited".to_string()
        } else {
            max_frames.to_string()
        }
    );

    let dump = args.dump.as_deref();
    let results: Vec<Result<FrameMetrics, CliError>> = thread::scope(|scope| {
        let workers: Vec<_> = camera
            .outputs()
            .iter()
            .map(|assignment| {
                let camera = &camera;
                let term = term.as_ref();
                scope.spawn(move || capture_output(camera, *assignment, max_frames, dump, term))
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| match worker.join() {
                Ok(result) => result.map_err(CliError::from),
                Err(_) => Err(CliError::General("capture thread panicked".to_string())),
            })
            .collect()
    });

    if term.load(Ordering::Relaxed) {
        log::info!("Received Ctrl+C, stopping...");
    }
    camera.close()?;

    let metrics = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    if json {
        utils::print_json(&metrics)?;
    } else {
        for output in &metrics {
            output.print_text();
        }
    }

    Ok(())
}

/// Read frames from one output until `max_frames` or Ctrl+C.
fn capture_output(
    camera: &Camera,
    assignment: Assignment,
    max_frames: u64,
    dump: Option<&Path>,
    term: &AtomicBool,
) -> Result<FrameMetrics, Error> {
    let source = FrameSource::Vse(assignment.channel.index());
    let mut metrics = MetricsCollector::new(
        source.to_string(),
        assignment.size.width,
        assignment.size.height,
    );

    while metrics.frames() < max_frames && !term.load(Ordering::Relaxed) {
        let wait = Instant::now();
        let frame = match camera.get_frame(source, VSE_FRAME_TIMEOUT_MS) {
            Ok(frame) => frame,
            Err(Error::Timeout { timeout_ms }) => {
                log::warn!("{}: no frame after {} ms", source, timeout_ms);
                metrics.record_timeout();
                continue;
            }
            Err(err) => return Err(err),
        };
        let waited = wait.elapsed();

        if metrics.frames() == 0 {
            if let Some(dir) = dump {
                let path = dir.join(format!(
                    "{}_{}x{}_{}.nv12",
                    source,
                    frame.width(),
                    frame.height(),
                    frame.frame_id()
                ));
                frame.dump_nv12(&path)?;
                log::info!("{}: wrote {}", source, path.display());
            }
        }

        let bytes: u64 = frame.planes().iter().map(|plane| plane.size as u64).sum();
        if frame.lost_frames() > 0 {
            log::debug!("{}: {} frames lost before {}", source, frame.lost_frames(), frame);
        }
        metrics.record_frame(waited, bytes, frame.lost_frames());
        frame.release()?;

        if metrics.frames() % 30 == 0 {
            log::debug!("{}: {} frames", source, metrics.frames());
        }
    }

    Ok(metrics.finalize())
}
