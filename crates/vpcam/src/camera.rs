// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Camera and VSE sessions.
//!
//! [`create_camera`] builds a request for a live sensor pipeline: the
//! sensor on the chosen (or first available) interface is probed and
//! resolved, the requested outputs are assigned VSE channels, and the
//! sensor → VIN → ISP → (GDC) → VSE → (OSD) pipeline is initialised and
//! started. [`create_vse`] builds a memory-to-memory session where the
//! caller feeds NV12 frames into the VSE with [`Camera::send_frame`].
//!
//! Any failure while opening releases everything acquired so far.

pub use crate::channel::{Rect, Size};

use crate::{
    board::BoardConfig,
    channel::{allocate_outputs, Assignment, VseChannel},
    frame::{FrameSource, ImageFrame},
    hbn::HbnApi,
    osd::OsdStage,
    pipeline::{PipelineContext, PipelineState},
    platform::BoardPaths,
    probe::{AddressScan, ResolvedSensor, SensorProber, SensorRequest},
    stage::{
        stage_error, GdcStage, IspStage, SensorStage, Stage, StageKind, VinStage, VseStage,
        DEFAULT_BUFFER_COUNT,
    },
    vnode::{RawImage, VnodeApi, VseConfig, VseOutput},
    Error,
};
use log::{debug, info, warn};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// Parameters of a live camera session.
#[derive(Clone)]
pub struct CameraRequest {
    interface: Option<u32>,
    outputs: Vec<Size>,
    sensor: SensorRequest,
    buffers: u32,
    gdc: bool,
    osd: Vec<Rect>,
    paths: BoardPaths,
    address_scan: AddressScan,
    api: Option<Arc<dyn VnodeApi>>,
}

impl Default for CameraRequest {
    fn default() -> Self {
        CameraRequest {
            interface: None,
            outputs: Vec::new(),
            sensor: SensorRequest::default(),
            buffers: DEFAULT_BUFFER_COUNT,
            gdc: false,
            osd: Vec::new(),
            paths: BoardPaths::from_env(),
            address_scan: AddressScan::default(),
            api: None,
        }
    }
}

pub fn create_camera() -> CameraRequest {
    CameraRequest::default()
}

impl CameraRequest {
    /// Board camera slot to open. Without one, every enabled slot is tried
    /// in order.
    pub fn with_interface(self, interface: u32) -> CameraRequest {
        CameraRequest {
            interface: Some(interface),
            ..self
        }
    }

    /// Add an output. `0×0` means the sensor size.
    pub fn with_output(self, size: Size) -> CameraRequest {
        let mut outputs = self.outputs;
        outputs.push(size);
        CameraRequest { outputs, ..self }
    }

    /// Only accept a sensor mode of this size.
    pub fn with_sensor_size(self, width: u32, height: u32) -> CameraRequest {
        CameraRequest {
            sensor: self.sensor.with_size(width, height),
            ..self
        }
    }

    /// Only accept a sensor mode at this frame rate.
    pub fn with_fps(self, fps: u32) -> CameraRequest {
        CameraRequest {
            sensor: self.sensor.with_fps(fps),
            ..self
        }
    }

    /// Buffers in each VSE output pool.
    pub fn with_buffers(self, buffers: u32) -> CameraRequest {
        CameraRequest { buffers, ..self }
    }

    /// Insert lens distortion correction between ISP and VSE.
    pub fn with_gdc(self, gdc: bool) -> CameraRequest {
        CameraRequest { gdc, ..self }
    }

    /// Add an overlay region on the next free VSE channel index.
    pub fn with_osd(self, region: Rect) -> CameraRequest {
        let mut osd = self.osd;
        osd.push(region);
        CameraRequest { osd, ..self }
    }

    pub fn with_paths(self, paths: BoardPaths) -> CameraRequest {
        CameraRequest { paths, ..self }
    }

    pub fn with_address_scan(self, address_scan: AddressScan) -> CameraRequest {
        CameraRequest {
            address_scan,
            ..self
        }
    }

    /// Drive the hardware through `api` instead of the vendor libraries.
    pub fn with_api(self, api: Arc<dyn VnodeApi>) -> CameraRequest {
        CameraRequest {
            api: Some(api),
            ..self
        }
    }

    pub fn outputs(&self) -> &[Size] {
        &self.outputs
    }

    /// Probe the sensor and open the pipeline.
    pub fn open(self) -> Result<Camera, Error> {
        let mut prober =
            SensorProber::new(self.paths.clone()).with_address_scan(self.address_scan);
        let sensor = self.resolve(&mut prober)?;
        self.open_with_sensor(sensor)
    }

    fn resolve(&self, prober: &mut SensorProber) -> Result<ResolvedSensor, Error> {
        let board = BoardConfig::load(&self.paths)?;

        if let Some(index) = self.interface {
            let slot = board.slot(index as usize).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "board {} has no camera slot {}",
                    board.board_id, index
                ))
            })?;
            return prober.probe(slot.mipi_host, &self.sensor);
        }

        for (index, slot) in board.cameras.iter().enumerate() {
            match prober.probe(slot.mipi_host, &self.sensor) {
                Ok(sensor) => {
                    info!("camera slot {}: {}", index, sensor.profile.name);
                    return Ok(sensor);
                }
                Err(err @ Error::SensorNotFound { .. }) | Err(err @ Error::InterfaceBusy(_)) => {
                    debug!("camera slot {}: {}", index, err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::SensorNotFound { interface: None })
    }

    /// Open the pipeline for an already resolved sensor.
    pub fn open_with_sensor(self, sensor: ResolvedSensor) -> Result<Camera, Error> {
        let source = Size::new(sensor.profile.width, sensor.profile.height);
        let outputs = if self.outputs.is_empty() {
            vec![Size::new(0, 0)]
        } else {
            self.outputs.clone()
        };
        let assignments = allocate_outputs(source, &outputs)?;

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(SensorStage::new(sensor)),
            Box::new(VinStage::from_sensor(&sensor, DEFAULT_BUFFER_COUNT)),
            Box::new(IspStage::from_sensor(&sensor, DEFAULT_BUFFER_COUNT)),
        ];
        if self.gdc {
            let gdc = GdcStage::from_sensor(&sensor, DEFAULT_BUFFER_COUNT).ok_or_else(|| {
                Error::Unsupported(format!(
                    "sensor {} has no distortion correction table",
                    sensor.profile.name
                ))
            })?;
            stages.push(Box::new(gdc));
        }
        stages.push(Box::new(VseStage::from_assignments(
            source,
            &assignments,
            self.buffers,
        )));
        if !self.osd.is_empty() {
            stages.push(Box::new(OsdStage::new(&self.osd)?));
        }

        let api = match self.api {
            Some(api) => api,
            None => Arc::new(HbnApi::new()?),
        };
        let pipeline = launch(api, stages)?;

        for assignment in &assignments {
            info!(
                "{}: {} -> {} on {}",
                sensor.profile.name, source, assignment.size, assignment.channel
            );
        }

        Ok(Camera {
            pipeline,
            sensor: Some(sensor),
            source,
            assignments,
            input: None,
        })
    }
}

impl fmt::Debug for CameraRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CameraRequest")
            .field("interface", &self.interface)
            .field("outputs", &self.outputs)
            .field("sensor", &self.sensor)
            .field("buffers", &self.buffers)
            .field("gdc", &self.gdc)
            .field("osd", &self.osd)
            .field("paths", &self.paths)
            .field("address_scan", &self.address_scan)
            .finish()
    }
}

/// Initialise and start `stages`, releasing them again if either fails.
fn launch(api: Arc<dyn VnodeApi>, stages: Vec<Box<dyn Stage>>) -> Result<PipelineContext, Error> {
    let mut pipeline = PipelineContext::new(api, stages);
    pipeline.init()?;
    if let Err(err) = pipeline.start() {
        if let Err(deinit) = pipeline.deinit() {
            warn!("teardown after failed start: {}", deinit);
        }
        return Err(err);
    }
    Ok(pipeline)
}

/// How a VSE-only session maps its input onto each output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Scale the whole input.
    #[default]
    Scale,
    /// Scale a crop of the input; crop `i` applies to output `i`. A
    /// missing or `0×0` crop selects the whole input.
    ScaleCrop(Vec<Rect>),
}

/// Parameters of a memory-to-memory VSE session.
#[derive(Clone)]
pub struct VseRequest {
    source: Size,
    outputs: Vec<Size>,
    mode: ScaleMode,
    rotation: u32,
    buffers: u32,
    osd: Vec<Rect>,
    api: Option<Arc<dyn VnodeApi>>,
}

/// Start a VSE-only session for NV12 input of `source` size.
pub fn create_vse(source: Size) -> VseRequest {
    VseRequest {
        source,
        outputs: Vec::new(),
        mode: ScaleMode::default(),
        rotation: 0,
        buffers: DEFAULT_BUFFER_COUNT,
        osd: Vec::new(),
        api: None,
    }
}

impl VseRequest {
    /// Add an output. `0×0` means the crop size, or the input size.
    pub fn with_output(self, size: Size) -> VseRequest {
        let mut outputs = self.outputs;
        outputs.push(size);
        VseRequest { outputs, ..self }
    }

    pub fn with_mode(self, mode: ScaleMode) -> VseRequest {
        VseRequest { mode, ..self }
    }

    /// Rotation in degrees. The VSE cannot rotate; any non-zero value
    /// fails at open.
    pub fn with_rotation(self, rotation: u32) -> VseRequest {
        VseRequest { rotation, ..self }
    }

    pub fn with_buffers(self, buffers: u32) -> VseRequest {
        VseRequest { buffers, ..self }
    }

    pub fn with_osd(self, region: Rect) -> VseRequest {
        let mut osd = self.osd;
        osd.push(region);
        VseRequest { osd, ..self }
    }

    pub fn with_api(self, api: Arc<dyn VnodeApi>) -> VseRequest {
        VseRequest {
            api: Some(api),
            ..self
        }
    }

    /// Region of the input scaled into output `index`.
    fn roi(&self, index: usize) -> Result<Rect, Error> {
        let full = Rect::full(self.source);
        let crop = match &self.mode {
            ScaleMode::Scale => return Ok(full),
            ScaleMode::ScaleCrop(crops) => crops.get(index).copied().unwrap_or(full),
        };
        if crop.width == 0 || crop.height == 0 {
            return Ok(full);
        }
        let right = crop.x.checked_add(crop.width);
        let bottom = crop.y.checked_add(crop.height);
        if right.map_or(true, |r| r > self.source.width)
            || bottom.map_or(true, |b| b > self.source.height)
        {
            return Err(Error::InvalidArgument(format!(
                "crop {}x{}+{}+{} exceeds the {} input",
                crop.width, crop.height, crop.x, crop.y, self.source
            )));
        }
        Ok(crop)
    }

    /// Channel assignments and VSE outputs for every requested output.
    fn plan(&self) -> Result<(Vec<Assignment>, Vec<VseOutput>), Error> {
        let requested = if self.outputs.is_empty() {
            vec![Size::new(0, 0)]
        } else {
            self.outputs.clone()
        };

        let mut rois = Vec::with_capacity(requested.len());
        let mut targets = Vec::with_capacity(requested.len());
        for (index, output) in requested.iter().enumerate() {
            let roi = self.roi(index)?;
            targets.push(if output.is_zero() { roi.size() } else { *output });
            rois.push(roi);
        }

        let assignments = allocate_outputs(self.source, &targets)?;
        let outputs = assignments
            .iter()
            .zip(rois)
            .map(|(assignment, roi)| VseOutput {
                channel: assignment.channel,
                roi,
                target: assignment.size,
            })
            .collect();
        Ok((assignments, outputs))
    }

    pub fn open(self) -> Result<Camera, Error> {
        if self.rotation != 0 {
            return Err(Error::Unsupported(format!(
                "VSE cannot rotate ({} degrees requested)",
                self.rotation
            )));
        }
        if self.source.is_zero() {
            return Err(Error::InvalidArgument("VSE input has no size".to_string()));
        }

        let (assignments, outputs) = self.plan()?;
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(VseStage::new(VseConfig {
            input: self.source,
            outputs,
            buffers: self.buffers,
        }))];
        if !self.osd.is_empty() {
            stages.push(Box::new(OsdStage::new(&self.osd)?));
        }

        let api = match self.api {
            Some(api) => api,
            None => Arc::new(HbnApi::new()?),
        };
        let mut pipeline = launch(api, stages)?;

        let input = match pipeline.api().alloc_image(self.source) {
            Ok(image) => image,
            Err(status) => {
                let err = stage_error(StageKind::Vse, "allocate input", status);
                if let Err(deinit) = pipeline.deinit() {
                    warn!("teardown after failed allocation: {}", deinit);
                }
                return Err(err);
            }
        };

        Ok(Camera {
            pipeline,
            sensor: None,
            source: self.source,
            assignments,
            input: Some(Mutex::new(InputBuffer(input))),
        })
    }
}

impl fmt::Debug for VseRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VseRequest")
            .field("source", &self.source)
            .field("outputs", &self.outputs)
            .field("mode", &self.mode)
            .field("rotation", &self.rotation)
            .field("buffers", &self.buffers)
            .field("osd", &self.osd)
            .finish()
    }
}

/// VSE input image of a memory-to-memory session.
struct InputBuffer(RawImage);

// SAFETY: the plane mappings belong to the allocator, not to a thread, and
// every access goes through the session's mutex.
unsafe impl Send for InputBuffer {}

/// An open camera or VSE session.
pub struct Camera {
    pipeline: PipelineContext,
    sensor: Option<ResolvedSensor>,
    source: Size,
    assignments: Vec<Assignment>,
    input: Option<Mutex<InputBuffer>>,
}

impl Camera {
    /// Resolved sensor, `None` for a VSE-only session.
    pub fn sensor(&self) -> Option<&ResolvedSensor> {
        self.sensor.as_ref()
    }

    /// Size of the frames entering the VSE.
    pub fn source_size(&self) -> Size {
        self.source
    }

    /// Output sizes and the channels serving them, in request order.
    pub fn outputs(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Channel producing `width`×`height`, `None` when no output has that
    /// size. `0×0` means the source size; a single zero dimension is
    /// rejected.
    pub fn channel_for_size(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Option<VseChannel>, Error> {
        let size = match (width, height) {
            (0, 0) => self.source,
            (0, _) | (_, 0) => {
                return Err(Error::InvalidArgument(format!(
                    "output size {}x{} has a single zero dimension",
                    width, height
                )));
            }
            _ => Size::new(width, height),
        };
        Ok(self
            .assignments
            .iter()
            .find(|assignment| assignment.size == size)
            .map(|assignment| assignment.channel))
    }

    /// Wait up to `timeout_ms` for the next frame from `source`.
    pub fn get_frame(&self, source: FrameSource, timeout_ms: u32) -> Result<ImageFrame<'_>, Error> {
        self.pipeline.get_frame(source, timeout_ms)
    }

    /// Feed one NV12 frame to a VSE-only session. `planes` holds the Y
    /// plane followed by the interleaved UV plane.
    pub fn send_frame(&self, planes: &[&[u8]]) -> Result<(), Error> {
        let input = self.input.as_ref().ok_or_else(|| {
            Error::Unsupported("frames can only be sent to a VSE-only session".to_string())
        })?;
        let mut input = input.lock().unwrap_or_else(PoisonError::into_inner);
        let image = &mut input.0;

        if planes.len() > image.planes.len() {
            return Err(Error::InvalidArgument(format!(
                "{} planes given, the input has {}",
                planes.len(),
                image.planes.len()
            )));
        }
        for (index, (src, dst)) in planes.iter().zip(&image.planes).enumerate() {
            if dst.data.is_null() || src.len() > dst.size {
                return Err(Error::InvalidArgument(format!(
                    "plane {} holds {} bytes, the input takes {}",
                    index,
                    src.len(),
                    dst.size
                )));
            }
            // SAFETY: `dst` is a live CPU mapping of at least `dst.size`
            // bytes, guarded by the input mutex.
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dst.data, src.len()) };
        }

        self.pipeline.send_frame(FrameSource::Vse(0), image)
    }

    /// Upload pixels to overlay region `index`; one byte per pixel.
    pub fn set_osd_bitmap(&mut self, index: usize, bitmap: &[u8]) -> Result<(), Error> {
        self.pipeline.set_osd_bitmap(index, bitmap)
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        let result = self.pipeline.deinit();
        if let Some(input) = self.input.take() {
            let mut input = input.into_inner().unwrap_or_else(PoisonError::into_inner);
            self.pipeline.api().free_image(&mut input.0);
        }
        result
    }

    /// Stop the pipeline and release every handle.
    pub fn close(mut self) -> Result<(), Error> {
        self.shutdown()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("camera teardown: {}", err);
        }
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Camera")
            .field("sensor", &self.sensor.map(|sensor| sensor.profile.name))
            .field("source", &self.source)
            .field("outputs", &self.assignments)
            .field("state", &self.pipeline.state())
            .finish()
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.sensor {
            Some(sensor) => write!(f, "{} on interface {}", sensor.profile, sensor.interface)?,
            None => write!(f, "VSE {}", self.source)?,
        }
        for assignment in &self.assignments {
            write!(f, " {}:{}", assignment.channel, assignment.size)?;
        }
        Ok(())
    }
}
