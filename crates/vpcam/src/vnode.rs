// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Hardware node service.
//!
//! [`VnodeApi`] is the narrow interface the pipeline drives: open and
//! configure nodes, bind them into a flow, exchange frames and manage
//! overlay regions and DMA buffers. [`crate::hbn::HbnApi`] implements it
//! on top of the vendor libraries; tests substitute an in-memory double.
//!
//! Every method reports failure as the vendor status code. The stage
//! layer turns those into [`crate::Error::Stage`] with the stage kind and
//! operation attached.

use crate::{
    catalog::{HdrMode, MipiDataType},
    channel::{Rect, Size, VseChannel},
    probe::ResolvedSensor,
};
use std::{any::Any, fmt};

/// Vendor status code returned by a failed call.
pub type Status = i32;

/// Status of a frame wait that ran out of time (`-ETIMEDOUT`).
pub const STATUS_TIMEOUT: Status = vpcam_sys::HBN_STATUS_GETFRAME_TIMEOUT;

pub type NodeHandle = i64;
pub type FlowHandle = i64;
pub type CameraHandle = i64;
pub type RegionHandle = i32;

/// Hardware node types the pipeline opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Vin,
    Isp,
    Vse,
    Gdc,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeKind::Vin => write!(f, "vin"),
            NodeKind::Isp => write!(f, "isp"),
            NodeKind::Vse => write!(f, "vse"),
            NodeKind::Gdc => write!(f, "gdc"),
        }
    }
}

/// Capture parameters of the VIN node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VinConfig {
    pub mipi_rx: u32,
    pub vc_index: u32,
    pub ipi_channel: u32,
    pub isp_flyby: bool,
    pub hdr: HdrMode,
    pub mclk_freq: u32,
    pub size: Size,
    pub data_type: MipiDataType,
    pub write_stride: u32,
    pub buffers: u32,
}

/// Input mode and geometry of the ISP node. Output is always NV12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspConfig {
    pub input_mode: u32,
    pub sensor_mode: u32,
    pub crop: Rect,
    pub size: Size,
    pub bit_width: u32,
    pub buffers: u32,
}

/// One enabled VSE output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VseOutput {
    pub channel: VseChannel,
    pub roi: Rect,
    pub target: Size,
}

/// NV12 input size and enabled output channels of the VSE node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VseConfig {
    pub input: Size,
    pub outputs: Vec<VseOutput>,
    pub buffers: u32,
}

/// Lens correction table and geometry of the GDC node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdcConfig {
    pub binary: BufferInfo,
    pub input: Size,
    pub output: Size,
    pub buffers: u32,
}

/// Static configuration pushed into a node after opening it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeConfig {
    Vin(VinConfig),
    Isp(IspConfig),
    Vse(VseConfig),
    Gdc(GdcConfig),
}

impl NodeConfig {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Vin(_) => NodeKind::Vin,
            NodeConfig::Isp(_) => NodeKind::Isp,
            NodeConfig::Vse(_) => NodeKind::Vse,
            NodeConfig::Gdc(_) => NodeKind::Gdc,
        }
    }
}

/// Contiguous DMA buffer owned by the memory allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub fd: i32,
    pub share_id: i32,
    pub phys: u64,
    pub size: u64,
    pub virt: usize,
}

/// One plane of an image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plane {
    /// CPU mapping of the plane, null when unmapped.
    pub data: *mut u8,
    pub phys: u64,
    pub size: usize,
    pub fd: i32,
}

/// Image buffer cycled between the caller and a node.
///
/// `vendor` carries the backend's own descriptor so the buffer can be
/// handed back unchanged on release.
#[derive(Debug, Default)]
pub struct RawImage {
    pub frame_id: u32,
    /// Hardware capture timestamp.
    pub timestamp: u64,
    /// System timestamp in nanoseconds.
    pub sys_timestamp: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub vstride: u32,
    pub planes: Vec<Plane>,
    pub vendor: Option<Box<dyn Any>>,
}

/// The hardware node service.
pub trait VnodeApi: Send + Sync {
    /// Create the sensor driver instance for `sensor`.
    fn create_camera(&self, sensor: &ResolvedSensor) -> Result<CameraHandle, Status>;
    fn attach_camera(&self, camera: CameraHandle, vin: NodeHandle) -> Result<(), Status>;
    fn detach_camera(&self, camera: CameraHandle) -> Result<(), Status>;
    fn destroy_camera(&self, camera: CameraHandle) -> Result<(), Status>;

    fn open(&self, kind: NodeKind) -> Result<NodeHandle, Status>;
    /// Push attributes, channel attributes and buffer pools.
    fn configure(&self, node: NodeHandle, config: &NodeConfig) -> Result<(), Status>;
    fn close(&self, node: NodeHandle);

    fn create_flow(&self) -> Result<FlowHandle, Status>;
    fn add_to_flow(&self, flow: FlowHandle, node: NodeHandle) -> Result<(), Status>;
    fn bind(
        &self,
        flow: FlowHandle,
        src: NodeHandle,
        src_channel: u32,
        dst: NodeHandle,
        dst_channel: u32,
    ) -> Result<(), Status>;
    fn start_flow(&self, flow: FlowHandle) -> Result<(), Status>;
    fn stop_flow(&self, flow: FlowHandle) -> Result<(), Status>;
    fn destroy_flow(&self, flow: FlowHandle);

    /// Create overlay region `region` of `size` pixels.
    fn create_region(&self, region: RegionHandle, size: Size) -> Result<(), Status>;
    fn attach_region(
        &self,
        region: RegionHandle,
        node: NodeHandle,
        channel: u32,
        x: u32,
        y: u32,
    ) -> Result<(), Status>;
    fn set_region_bitmap(
        &self,
        region: RegionHandle,
        size: Size,
        bitmap: &mut [u8],
    ) -> Result<(), Status>;
    fn detach_region(&self, region: RegionHandle, node: NodeHandle, channel: u32)
        -> Result<(), Status>;
    fn destroy_region(&self, region: RegionHandle) -> Result<(), Status>;

    /// Wait up to `timeout_ms` for a frame on output `channel`.
    fn get_frame(
        &self,
        node: NodeHandle,
        channel: u32,
        timeout_ms: u32,
    ) -> Result<RawImage, Status>;
    fn release_frame(
        &self,
        node: NodeHandle,
        channel: u32,
        image: &mut RawImage,
    ) -> Result<(), Status>;
    fn send_frame(&self, node: NodeHandle, channel: u32, image: &mut RawImage)
        -> Result<(), Status>;

    /// Allocate a CPU-mapped NV12 image usable as node input.
    fn alloc_image(&self, size: Size) -> Result<RawImage, Status>;
    fn free_image(&self, image: &mut RawImage);
    /// Allocate a contiguous buffer of `len` bytes.
    fn alloc_buffer(&self, len: usize) -> Result<BufferInfo, Status>;
    fn free_buffer(&self, buffer: &BufferInfo);
}
