// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Pipeline stages.
//!
//! Each stage owns the handles of one hardware block and knows how to
//! bring them up and release them again. The pipeline holds the stages as
//! `Box<dyn Stage>` in source-to-sink order and drives them through
//! [`crate::pipeline::PipelineContext`].
//!
//! A stage whose `init` fails releases whatever it acquired itself before
//! returning; the pipeline only rolls back stages that completed `init`.

use crate::{
    channel::{Assignment, Rect, Size},
    osd::OsdStage,
    probe::ResolvedSensor,
    vnode::{
        BufferInfo, CameraHandle, GdcConfig, IspConfig, NodeConfig, NodeHandle, Status, VinConfig,
        VnodeApi, VseConfig, VseOutput,
    },
    Error,
};
use log::{debug, error};
use std::{fmt, fs, path::PathBuf, ptr};

/// Buffers requested from each node's pool unless the caller says otherwise.
pub const DEFAULT_BUFFER_COUNT: u32 = 3;

/// Hardware block a stage drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Sensor,
    Vin,
    Isp,
    Vse,
    Gdc,
    Osd,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StageKind::Sensor => write!(f, "sensor"),
            StageKind::Vin => write!(f, "VIN"),
            StageKind::Isp => write!(f, "ISP"),
            StageKind::Vse => write!(f, "VSE"),
            StageKind::Gdc => write!(f, "GDC"),
            StageKind::Osd => write!(f, "OSD"),
        }
    }
}

/// Handles one stage publishes for the stages initialised after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageLinks {
    /// Sensor driver instance, attached to the VIN node.
    pub camera: Option<CameraHandle>,
    /// VSE node, target of the OSD regions.
    pub vse: Option<NodeHandle>,
}

/// One hardware stage of a pipeline.
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Acquire and configure the stage's handles.
    fn init(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error>;

    /// Begin streaming. Nodes bound into the flow are started with it, so
    /// the default does nothing.
    fn start(&mut self, _api: &dyn VnodeApi) -> Result<(), Error> {
        Ok(())
    }

    fn stop(&mut self, _api: &dyn VnodeApi) -> Result<(), Error> {
        Ok(())
    }

    /// Release every handle held. Calling it again, or on a stage that
    /// never initialised, does nothing.
    fn deinit(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error>;

    /// Node producing this stage's frames, while initialised.
    fn frame_node(&self) -> Option<NodeHandle> {
        None
    }

    fn as_osd_mut(&mut self) -> Option<&mut OsdStage> {
        None
    }
}

/// Map a vendor status to a stage error, logging it.
pub(crate) fn stage_error(kind: StageKind, op: &'static str, status: Status) -> Error {
    error!("{} {} failed with status {}", kind, op, status);
    Error::Stage { kind, op, status }
}

/// Open a node of `kind` and push `config`, closing it again on failure.
fn open_node(
    api: &dyn VnodeApi,
    kind: StageKind,
    config: &NodeConfig,
) -> Result<NodeHandle, Error> {
    let node = api
        .open(config.kind())
        .map_err(|status| stage_error(kind, "open", status))?;
    if let Err(status) = api.configure(node, config) {
        api.close(node);
        return Err(stage_error(kind, "configure", status));
    }
    debug!("{} node {} configured", kind, node);
    Ok(node)
}

fn sensor_size(sensor: &ResolvedSensor) -> Size {
    Size::new(sensor.profile.width, sensor.profile.height)
}

/// Sensor driver instance.
#[derive(Debug)]
pub struct SensorStage {
    sensor: ResolvedSensor,
    camera: Option<CameraHandle>,
}

impl SensorStage {
    pub fn new(sensor: ResolvedSensor) -> Self {
        SensorStage {
            sensor,
            camera: None,
        }
    }

    pub fn sensor(&self) -> &ResolvedSensor {
        &self.sensor
    }
}

impl Stage for SensorStage {
    fn kind(&self) -> StageKind {
        StageKind::Sensor
    }

    fn init(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        let camera = api
            .create_camera(&self.sensor)
            .map_err(|status| stage_error(StageKind::Sensor, "create", status))?;
        self.camera = Some(camera);
        links.camera = Some(camera);
        Ok(())
    }

    fn deinit(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        links.camera = None;
        match self.camera.take() {
            Some(camera) => api
                .destroy_camera(camera)
                .map_err(|status| stage_error(StageKind::Sensor, "destroy", status)),
            None => Ok(()),
        }
    }
}

/// MIPI capture node. Attaches the sensor published by [`SensorStage`].
#[derive(Debug)]
pub struct VinStage {
    config: VinConfig,
    node: Option<NodeHandle>,
    camera: Option<CameraHandle>,
}

impl VinStage {
    pub fn new(config: VinConfig) -> Self {
        VinStage {
            config,
            node: None,
            camera: None,
        }
    }

    pub fn from_sensor(sensor: &ResolvedSensor, buffers: u32) -> Self {
        let profile = &sensor.profile;
        VinStage::new(VinConfig {
            mipi_rx: sensor.mipi_rx,
            vc_index: profile.vin.vc_index,
            ipi_channel: profile.vin.ipi_channel,
            isp_flyby: profile.vin.isp_flyby,
            hdr: profile.vin.hdr,
            mclk_freq: profile.vin.mclk_freq,
            size: sensor_size(sensor),
            data_type: profile.data_type,
            write_stride: profile.write_stride(),
            buffers,
        })
    }

    pub fn config(&self) -> &VinConfig {
        &self.config
    }
}

impl Stage for VinStage {
    fn kind(&self) -> StageKind {
        StageKind::Vin
    }

    fn init(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        let node = open_node(api, StageKind::Vin, &NodeConfig::Vin(self.config))?;
        if let Some(camera) = links.camera {
            if let Err(status) = api.attach_camera(camera, node) {
                api.close(node);
                return Err(stage_error(StageKind::Vin, "attach sensor", status));
            }
            self.camera = Some(camera);
        }
        self.node = Some(node);
        Ok(())
    }

    fn deinit(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        let mut result = Ok(());
        if let Some(camera) = self.camera.take() {
            if let Err(status) = api.detach_camera(camera) {
                result = Err(stage_error(StageKind::Vin, "detach sensor", status));
            }
        }
        if let Some(node) = self.node.take() {
            api.close(node);
        }
        result
    }

    fn frame_node(&self) -> Option<NodeHandle> {
        self.node
    }
}

/// Image signal processor. Output is NV12 at the sensor size.
#[derive(Debug)]
pub struct IspStage {
    config: IspConfig,
    node: Option<NodeHandle>,
}

impl IspStage {
    pub fn new(config: IspConfig) -> Self {
        IspStage { config, node: None }
    }

    pub fn from_sensor(sensor: &ResolvedSensor, buffers: u32) -> Self {
        let profile = &sensor.profile;
        let size = sensor_size(sensor);
        IspStage::new(IspConfig {
            input_mode: profile.isp.input_mode,
            sensor_mode: profile.isp.sensor_mode.code(),
            crop: Rect::full(size),
            size,
            bit_width: profile.isp.bit_width,
            buffers,
        })
    }

    pub fn config(&self) -> &IspConfig {
        &self.config
    }
}

impl Stage for IspStage {
    fn kind(&self) -> StageKind {
        StageKind::Isp
    }

    fn init(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        self.node = Some(open_node(api, StageKind::Isp, &NodeConfig::Isp(self.config))?);
        Ok(())
    }

    fn deinit(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        if let Some(node) = self.node.take() {
            api.close(node);
        }
        Ok(())
    }

    fn frame_node(&self) -> Option<NodeHandle> {
        self.node
    }
}

/// Video scaling engine with one enabled output per assignment.
#[derive(Debug)]
pub struct VseStage {
    config: VseConfig,
    node: Option<NodeHandle>,
}

impl VseStage {
    pub fn new(config: VseConfig) -> Self {
        VseStage { config, node: None }
    }

    /// Scale the whole of `input` into every assigned output.
    pub fn from_assignments(input: Size, assignments: &[Assignment], buffers: u32) -> Self {
        let outputs = assignments
            .iter()
            .map(|assignment| VseOutput {
                channel: assignment.channel,
                roi: Rect::full(input),
                target: assignment.size,
            })
            .collect();
        VseStage::new(VseConfig {
            input,
            outputs,
            buffers,
        })
    }

    pub fn config(&self) -> &VseConfig {
        &self.config
    }
}

impl Stage for VseStage {
    fn kind(&self) -> StageKind {
        StageKind::Vse
    }

    fn init(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        let node = open_node(api, StageKind::Vse, &NodeConfig::Vse(self.config.clone()))?;
        self.node = Some(node);
        links.vse = Some(node);
        Ok(())
    }

    fn deinit(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        links.vse = None;
        if let Some(node) = self.node.take() {
            api.close(node);
        }
        Ok(())
    }

    fn frame_node(&self) -> Option<NodeHandle> {
        self.node
    }
}

/// Lens distortion correction driven by a per-sensor binary table.
#[derive(Debug)]
pub struct GdcStage {
    binary_path: PathBuf,
    size: Size,
    buffers: u32,
    node: Option<NodeHandle>,
    binary: Option<BufferInfo>,
}

impl GdcStage {
    pub fn new<P: Into<PathBuf>>(binary_path: P, size: Size, buffers: u32) -> Self {
        GdcStage {
            binary_path: binary_path.into(),
            size,
            buffers,
            node: None,
            binary: None,
        }
    }

    /// GDC stage for `sensor`, if its profile names a correction table.
    pub fn from_sensor(sensor: &ResolvedSensor, buffers: u32) -> Option<Self> {
        sensor
            .profile
            .gdc_bin
            .map(|path| GdcStage::new(path, sensor_size(sensor), buffers))
    }

    /// Copy the table into a DMA buffer the node can read.
    fn load_binary(&self, api: &dyn VnodeApi) -> Result<BufferInfo, Error> {
        let bytes = fs::read(&self.binary_path).map_err(|err| {
            error!("GDC binary {}: {}", self.binary_path.display(), err);
            Error::Io(err)
        })?;
        if bytes.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "GDC binary {} is empty",
                self.binary_path.display()
            )));
        }

        let buffer = api
            .alloc_buffer(bytes.len())
            .map_err(|status| stage_error(StageKind::Gdc, "allocate", status))?;
        if buffer.virt == 0 || buffer.size < bytes.len() as u64 {
            api.free_buffer(&buffer);
            return Err(stage_error(StageKind::Gdc, "map", -libc::ENOMEM));
        }
        // SAFETY: the allocator mapped at least `bytes.len()` bytes at `virt`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.virt as *mut u8, bytes.len());
        }
        debug!(
            "GDC binary {} loaded ({} bytes)",
            self.binary_path.display(),
            bytes.len()
        );
        Ok(BufferInfo {
            size: bytes.len() as u64,
            ..buffer
        })
    }
}

impl Stage for GdcStage {
    fn kind(&self) -> StageKind {
        StageKind::Gdc
    }

    fn init(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        let binary = self.load_binary(api)?;
        let config = NodeConfig::Gdc(GdcConfig {
            binary,
            input: self.size,
            output: self.size,
            buffers: self.buffers,
        });
        match open_node(api, StageKind::Gdc, &config) {
            Ok(node) => {
                self.node = Some(node);
                self.binary = Some(binary);
                Ok(())
            }
            Err(err) => {
                api.free_buffer(&binary);
                Err(err)
            }
        }
    }

    fn deinit(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        if let Some(node) = self.node.take() {
            api.close(node);
        }
        if let Some(binary) = self.binary.take() {
            api.free_buffer(&binary);
        }
        Ok(())
    }

    fn frame_node(&self) -> Option<NodeHandle> {
        self.node
    }
}
