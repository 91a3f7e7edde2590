// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{
    catalog::HdrMode,
    channel::Size,
    probe::ResolvedSensor,
    vnode::{
        BufferInfo, CameraHandle, FlowHandle, NodeConfig, NodeHandle, NodeKind, Plane, RawImage,
        RegionHandle, Status, VnodeApi,
    },
    Error,
};
use log::{debug, warn};
use std::{
    any::Any,
    io,
    os::raw::{c_char, c_int, c_void},
};
use vpcam_sys as ffi;

/// Buffer flags of every node output pool.
const OUTPUT_BUFFER_FLAGS: i64 = ffi::HB_MEM_USAGE_CPU_READ_OFTEN
    | ffi::HB_MEM_USAGE_CPU_WRITE_OFTEN
    | ffi::HB_MEM_USAGE_CACHED
    | ffi::HB_MEM_USAGE_GRAPHIC_CONTIGUOUS_BUF;

/// Buffer flags of images fed into a node from the CPU.
const INPUT_BUFFER_FLAGS: i64 = ffi::HB_MEM_USAGE_MAP_INITIALIZED
    | ffi::HB_MEM_USAGE_PRIV_HEAP_2_RESERVERD
    | ffi::HB_MEM_USAGE_CPU_READ_OFTEN
    | ffi::HB_MEM_USAGE_CPU_WRITE_OFTEN
    | ffi::HB_MEM_USAGE_CACHED
    | ffi::HB_MEM_USAGE_GRAPHIC_CONTIGUOUS_BUF;

/// `vin_attr_ex_mask` bit enabling the external sensor clock.
const VIN_ATTR_EX_MCLK: u64 = 0x80;

/// Status for a release or send of a buffer this backend did not hand out.
const STATUS_FOREIGN_BUFFER: Status = -libc::EINVAL;

fn check(status: c_int) -> Result<(), Status> {
    if status == 0 {
        Ok(())
    } else {
        Err(status)
    }
}

fn copy_name(dst: &mut [c_char], src: &str) {
    let len = src.len().min(dst.len().saturating_sub(1));
    for (d, s) in dst.iter_mut().zip(src.bytes().take(len)) {
        *d = s as c_char;
    }
    dst[len] = 0;
}

fn attr_ptr<T>(attr: &mut T) -> *mut c_void {
    attr as *mut T as *mut c_void
}

fn buffer_pool(buffers: u32) -> ffi::hbn_buf_alloc_attr_t {
    ffi::hbn_buf_alloc_attr_t {
        flags: OUTPUT_BUFFER_FLAGS,
        buffers_num: buffers,
        is_contig: 1,
    }
}

fn rect(rect: crate::channel::Rect) -> ffi::common_rect_t {
    ffi::common_rect_t {
        x: rect.x,
        y: rect.y,
        w: rect.width,
        h: rect.height,
    }
}

fn raw_image(image: Box<ffi::hbn_vnode_image_t>) -> RawImage {
    let buffer = &image.buffer;
    let count = (buffer.plane_cnt.max(0) as usize).min(ffi::MAX_GRAPHIC_BUF_COMP);
    let planes = (0..count)
        .map(|i| Plane {
            data: buffer.virt_addr[i],
            phys: buffer.phys_addr[i],
            size: buffer.size[i] as usize,
            fd: buffer.fd[i],
        })
        .collect();

    RawImage {
        frame_id: image.info.frame_id,
        timestamp: image.info.timestamps,
        sys_timestamp: image.info.sys_timestamps,
        width: buffer.width.max(0) as u32,
        height: buffer.height.max(0) as u32,
        stride: buffer.stride.max(0) as u32,
        vstride: buffer.vstride.max(0) as u32,
        planes,
        vendor: Some(image as Box<dyn Any>),
    }
}

fn vendor_image(image: &mut RawImage) -> Result<&mut ffi::hbn_vnode_image_t, Status> {
    image
        .vendor
        .as_mut()
        .and_then(|vendor| vendor.downcast_mut::<ffi::hbn_vnode_image_t>())
        .ok_or(STATUS_FOREIGN_BUFFER)
}

/// [`VnodeApi`] over the vendor `libhbn_api`, `libcam` and `libhbmem`
/// libraries.
pub struct HbnApi {
    lib: &'static ffi::HbnLibrary,
}

impl std::fmt::Debug for HbnApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HbnApi").finish_non_exhaustive()
    }
}

impl HbnApi {
    /// Load the vendor libraries and open the memory allocator.
    pub fn new() -> Result<Self, Error> {
        let lib = ffi::init()?;
        let status = unsafe { (lib.hb_mem_module_open)() };
        if status != 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("hb_mem_module_open failed with status {}", status),
            )));
        }
        Ok(HbnApi { lib })
    }

    fn configure_vin(
        &self,
        node: NodeHandle,
        config: &crate::vnode::VinConfig,
    ) -> Result<(), Status> {
        let hdr_mode = match config.hdr {
            HdrMode::None => ffi::NOT_HDR,
            HdrMode::Dol2 => ffi::DOL_2,
        };
        let mut attr = ffi::vin_node_attr_t {
            cim_attr: ffi::cim_attr_t {
                mipi_rx: config.mipi_rx,
                vc_index: config.vc_index,
                ipi_channel: config.ipi_channel,
                cim_isp_flyby: u32::from(config.isp_flyby),
                func: ffi::cim_func_desc_t {
                    enable_frame_id: 1,
                    set_init_frame_id: 0,
                    hdr_mode,
                    time_stamp_en: 0,
                },
            },
        };
        let mut ichn = ffi::vin_ichn_attr_t {
            width: config.size.width,
            height: config.size.height,
            format: config.data_type.code(),
        };
        let mut ochn = ffi::vin_ochn_attr_t {
            ddr_en: 1,
            ochn_attr_type: ffi::VIN_BASIC_ATTR,
            vin_basic_attr: ffi::vin_basic_attr_t {
                format: config.data_type.code(),
                wstride: config.write_stride,
            },
        };
        let mut pool = buffer_pool(config.buffers);

        unsafe {
            check((self.lib.hbn_vnode_set_attr)(node, attr_ptr(&mut attr)))?;
            check((self.lib.hbn_vnode_set_ichn_attr)(node, 0, attr_ptr(&mut ichn)))?;
            check((self.lib.hbn_vnode_set_ochn_attr)(node, 0, attr_ptr(&mut ochn)))?;
            if config.mclk_freq != 0 {
                let mut ex = ffi::vin_attr_ex_t {
                    vin_attr_ex_mask: VIN_ATTR_EX_MCLK,
                    mclk_ex_attr: ffi::vin_mclk_ex_attr_t {
                        mclk_freq: config.mclk_freq,
                    },
                };
                check((self.lib.hbn_vnode_set_attr_ex)(node, attr_ptr(&mut ex)))?;
            }
            check((self.lib.hbn_vnode_set_ochn_buf_attr)(node, 0, &mut pool))
        }
    }

    fn configure_isp(
        &self,
        node: NodeHandle,
        config: &crate::vnode::IspConfig,
    ) -> Result<(), Status> {
        let mut attr = ffi::isp_attr_t {
            input_mode: config.input_mode,
            sensor_mode: config.sensor_mode,
            crop: rect(config.crop),
        };
        let mut ichn = ffi::isp_ichn_attr_t {
            width: config.size.width,
            height: config.size.height,
            fmt: ffi::FRM_FMT_RAW,
            bit_width: config.bit_width,
        };
        let mut ochn = ffi::isp_ochn_attr_t {
            ddr_en: 1,
            fmt: ffi::FRM_FMT_NV12,
            bit_width: 8,
        };
        let mut pool = buffer_pool(config.buffers);

        unsafe {
            check((self.lib.hbn_vnode_set_attr)(node, attr_ptr(&mut attr)))?;
            check((self.lib.hbn_vnode_set_ichn_attr)(node, 0, attr_ptr(&mut ichn)))?;
            check((self.lib.hbn_vnode_set_ochn_attr)(node, 0, attr_ptr(&mut ochn)))?;
            check((self.lib.hbn_vnode_set_ochn_buf_attr)(node, 0, &mut pool))
        }
    }

    fn configure_vse(
        &self,
        node: NodeHandle,
        config: &crate::vnode::VseConfig,
    ) -> Result<(), Status> {
        let mut attr = ffi::vse_attr_t::default();
        let mut ichn = ffi::vse_ichn_attr_t {
            width: config.input.width,
            height: config.input.height,
            fmt: ffi::FRM_FMT_NV12,
            bit_width: 8,
        };
        let mut pool = buffer_pool(config.buffers);

        unsafe {
            check((self.lib.hbn_vnode_set_attr)(node, attr_ptr(&mut attr)))?;
            check((self.lib.hbn_vnode_set_ichn_attr)(node, 0, attr_ptr(&mut ichn)))?;
            for output in &config.outputs {
                let mut ochn = ffi::vse_ochn_attr_t {
                    chn_en: 1,
                    roi: rect(output.roi),
                    target_w: output.target.width,
                    target_h: output.target.height,
                    fmt: ffi::FRM_FMT_NV12,
                    bit_width: 8,
                    fps: ffi::frame_rate_t::default(),
                };
                let channel = output.channel.index();
                check((self.lib.hbn_vnode_set_ochn_attr)(
                    node,
                    channel,
                    attr_ptr(&mut ochn),
                ))?;
                check((self.lib.hbn_vnode_set_ochn_buf_attr)(node, channel, &mut pool))?;
            }
        }
        Ok(())
    }

    fn configure_gdc(
        &self,
        node: NodeHandle,
        config: &crate::vnode::GdcConfig,
    ) -> Result<(), Status> {
        let mut attr = ffi::gdc_attr_t {
            config_addr: config.binary.phys,
            config_size: config.binary.size as u32,
            binary_ion_id: config.binary.share_id as u32,
            binary_offset: 0,
            total_size: config.binary.size as u32,
            div_width: 0,
            div_height: 0,
        };
        let mut ichn = ffi::gdc_ichn_attr_t {
            input_width: config.input.width,
            input_height: config.input.height,
            input_stride: config.input.width,
        };
        let mut ochn = ffi::gdc_ochn_attr_t {
            output_width: config.output.width,
            output_height: config.output.height,
            output_stride: config.output.width,
        };
        let mut pool = buffer_pool(config.buffers);

        unsafe {
            check((self.lib.hbn_vnode_set_attr)(node, attr_ptr(&mut attr)))?;
            check((self.lib.hbn_vnode_set_ichn_attr)(node, 0, attr_ptr(&mut ichn)))?;
            check((self.lib.hbn_vnode_set_ochn_attr)(node, 0, attr_ptr(&mut ochn)))?;
            check((self.lib.hbn_vnode_set_ochn_buf_attr)(node, 0, &mut pool))
        }
    }
}

impl Drop for HbnApi {
    fn drop(&mut self) {
        let status = unsafe { (self.lib.hb_mem_module_close)() };
        if status != 0 {
            warn!("hb_mem_module_close failed with status {}", status);
        }
    }
}

impl VnodeApi for HbnApi {
    fn create_camera(&self, sensor: &ResolvedSensor) -> Result<CameraHandle, Status> {
        let profile = &sensor.profile;
        let mut mipi = ffi::mipi_config_t {
            rx_enable: 1,
            rx_attr: ffi::mipi_rx_attr_t {
                phy: 0,
                lane: profile.mipi.lanes,
                datatype: profile.data_type.code(),
                fps: profile.fps,
                mclk: profile.mipi.mclk,
                mipiclk: profile.mipi.mipiclk,
                width: profile.width,
                height: profile.height,
                linelenth: profile.mipi.line_length,
                framelenth: profile.mipi.frame_length,
                settle: profile.mipi.settle,
                channel_num: profile.mipi.channel_num,
                ..Default::default()
            },
            rx_ex_mask: profile.mipi.rx_ex_mask,
            rx_attr_ex: ffi::mipi_rx_attr_ex_t {
                stop_check_instart: 1,
            },
        };

        let mut config = ffi::camera_config_t {
            addr: u32::from(sensor.i2c_addr),
            sensor_mode: profile.sensor_mode.code(),
            fps: profile.fps as f32,
            width: profile.width,
            height: profile.height,
            format: profile.data_type.code(),
            gpio_enable_bit: u32::from(profile.gpio_enable),
            gpio_level_bit: u32::from(profile.gpio_level),
            bus_select: sensor.i2c_bus,
            extra_mode: profile.extra_mode,
            config_index: profile.config_index,
            mipi_cfg: &mut mipi,
            ..Default::default()
        };
        copy_name(&mut config.name, profile.driver());
        if let Some(calibration) = profile.calibration {
            copy_name(&mut config.calib_lname, calibration);
        }

        let mut camera: CameraHandle = 0;
        // The driver copies both configs; `mipi` only has to outlive the call.
        check(unsafe { (self.lib.hbn_camera_create)(&mut config, &mut camera) })?;
        debug!("camera {} created for {}", camera, profile.name);
        Ok(camera)
    }

    fn attach_camera(&self, camera: CameraHandle, vin: NodeHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_camera_attach_to_vin)(camera, vin) })
    }

    fn detach_camera(&self, camera: CameraHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_camera_detach_from_vin)(camera) })
    }

    fn destroy_camera(&self, camera: CameraHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_camera_destroy)(camera) })
    }

    fn open(&self, kind: NodeKind) -> Result<NodeHandle, Status> {
        let node_type = match kind {
            NodeKind::Vin => ffi::HB_VIN,
            NodeKind::Isp => ffi::HB_ISP,
            NodeKind::Vse => ffi::HB_VSE,
            NodeKind::Gdc => ffi::HB_GDC,
        };
        let mut node: NodeHandle = 0;
        check(unsafe { (self.lib.hbn_vnode_open)(node_type, 0, ffi::AUTO_ALLOC_ID, &mut node) })?;
        Ok(node)
    }

    fn configure(&self, node: NodeHandle, config: &NodeConfig) -> Result<(), Status> {
        match config {
            NodeConfig::Vin(vin) => self.configure_vin(node, vin),
            NodeConfig::Isp(isp) => self.configure_isp(node, isp),
            NodeConfig::Vse(vse) => self.configure_vse(node, vse),
            NodeConfig::Gdc(gdc) => self.configure_gdc(node, gdc),
        }
    }

    fn close(&self, node: NodeHandle) {
        unsafe { (self.lib.hbn_vnode_close)(node) }
    }

    fn create_flow(&self) -> Result<FlowHandle, Status> {
        let mut flow: FlowHandle = 0;
        check(unsafe { (self.lib.hbn_vflow_create)(&mut flow) })?;
        Ok(flow)
    }

    fn add_to_flow(&self, flow: FlowHandle, node: NodeHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_vflow_add_vnode)(flow, node) })
    }

    fn bind(
        &self,
        flow: FlowHandle,
        src: NodeHandle,
        src_channel: u32,
        dst: NodeHandle,
        dst_channel: u32,
    ) -> Result<(), Status> {
        check(unsafe {
            (self.lib.hbn_vflow_bind_vnode)(flow, src, src_channel, dst, dst_channel)
        })
    }

    fn start_flow(&self, flow: FlowHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_vflow_start)(flow) })
    }

    fn stop_flow(&self, flow: FlowHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_vflow_stop)(flow) })
    }

    fn destroy_flow(&self, flow: FlowHandle) {
        unsafe { (self.lib.hbn_vflow_destroy)(flow) }
    }

    fn create_region(&self, region: RegionHandle, size: Size) -> Result<(), Status> {
        let attr = ffi::hbn_rgn_attr_t {
            type_: ffi::OVERLAY_RGN,
            color: ffi::FONT_COLOR_ORANGE,
            alpha: 0,
            overlay_attr: ffi::hbn_rgn_overlay_t {
                size: ffi::hbn_rgn_size_t {
                    width: size.width,
                    height: size.height,
                },
                pixel_fmt: ffi::PIXEL_FORMAT_VGA_8,
            },
        };
        check(unsafe { (self.lib.hbn_rgn_create)(region, &attr) })
    }

    fn attach_region(
        &self,
        region: RegionHandle,
        node: NodeHandle,
        channel: u32,
        x: u32,
        y: u32,
    ) -> Result<(), Status> {
        let attr = ffi::hbn_rgn_chn_attr_t {
            show: true,
            invert_en: false,
            display_level: 0,
            point: ffi::hbn_rgn_point_t { x, y },
        };
        check(unsafe { (self.lib.hbn_rgn_attach_to_chn)(region, node, channel as c_int, &attr) })
    }

    fn set_region_bitmap(
        &self,
        region: RegionHandle,
        size: Size,
        bitmap: &mut [u8],
    ) -> Result<(), Status> {
        let bitmap = ffi::hbn_rgn_bitmap_t {
            pixel_fmt: ffi::PIXEL_FORMAT_VGA_8,
            size: ffi::hbn_rgn_size_t {
                width: size.width,
                height: size.height,
            },
            paddr: bitmap.as_mut_ptr() as *mut c_void,
        };
        check(unsafe { (self.lib.hbn_rgn_setbitmap)(region, &bitmap) })
    }

    fn detach_region(
        &self,
        region: RegionHandle,
        node: NodeHandle,
        channel: u32,
    ) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_rgn_detach_from_chn)(region, node, channel as c_int) })
    }

    fn destroy_region(&self, region: RegionHandle) -> Result<(), Status> {
        check(unsafe { (self.lib.hbn_rgn_destroy)(region) })
    }

    fn get_frame(
        &self,
        node: NodeHandle,
        channel: u32,
        timeout_ms: u32,
    ) -> Result<RawImage, Status> {
        let mut image = Box::<ffi::hbn_vnode_image_t>::default();
        check(unsafe { (self.lib.hbn_vnode_getframe)(node, channel, timeout_ms, &mut *image) })?;
        Ok(raw_image(image))
    }

    fn release_frame(
        &self,
        node: NodeHandle,
        channel: u32,
        image: &mut RawImage,
    ) -> Result<(), Status> {
        let vendor = vendor_image(image)?;
        check(unsafe { (self.lib.hbn_vnode_releaseframe)(node, channel, vendor) })?;
        image.vendor = None;
        image.planes.clear();
        Ok(())
    }

    fn send_frame(
        &self,
        node: NodeHandle,
        channel: u32,
        image: &mut RawImage,
    ) -> Result<(), Status> {
        let vendor = vendor_image(image)?;
        check(unsafe { (self.lib.hbn_vnode_sendframe)(node, channel, vendor) })
    }

    fn alloc_image(&self, size: Size) -> Result<RawImage, Status> {
        let mut image = Box::<ffi::hbn_vnode_image_t>::default();
        check(unsafe {
            (self.lib.hb_mem_alloc_graph_buf)(
                size.width as c_int,
                size.height as c_int,
                ffi::MEM_PIX_FMT_NV12,
                INPUT_BUFFER_FLAGS,
                size.width as c_int,
                size.height as c_int,
                &mut image.buffer,
            )
        })?;
        Ok(raw_image(image))
    }

    fn free_image(&self, image: &mut RawImage) {
        if let Ok(vendor) = vendor_image(image) {
            let fd = vendor.buffer.fd[0];
            let status = unsafe { (self.lib.hb_mem_free_buf)(fd) };
            if status != 0 {
                warn!("hb_mem_free_buf({}) failed with status {}", fd, status);
            }
        }
        image.vendor = None;
        image.planes.clear();
    }

    fn alloc_buffer(&self, len: usize) -> Result<BufferInfo, Status> {
        let mut buf = ffi::hb_mem_common_buf_t::default();
        check(unsafe { (self.lib.hb_mem_alloc_com_buf)(len as u64, OUTPUT_BUFFER_FLAGS, &mut buf) })?;
        Ok(BufferInfo {
            fd: buf.fd,
            share_id: buf.share_id,
            phys: buf.phys_addr,
            size: buf.size,
            virt: buf.virt_addr as usize,
        })
    }

    fn free_buffer(&self, buffer: &BufferInfo) {
        let status = unsafe { (self.lib.hb_mem_free_buf)(buffer.fd) };
        if status != 0 {
            warn!("hb_mem_free_buf({}) failed with status {}", buffer.fd, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_name_truncates() {
        let mut name = [1 as c_char; 8];
        copy_name(&mut name, "imx219-long-name");
        assert_eq!(name[7], 0);
        assert_eq!(name[0], b'i' as c_char);

        let mut short = [1 as c_char; 8];
        copy_name(&mut short, "os");
        assert_eq!(&short[..3], &[b'o' as c_char, b's' as c_char, 0]);
    }

    #[test]
    fn test_raw_image_planes() {
        let mut image = Box::<ffi::hbn_vnode_image_t>::default();
        image.info.frame_id = 42;
        image.buffer.plane_cnt = 2;
        image.buffer.width = 1920;
        image.buffer.height = 1080;
        image.buffer.size = [1920 * 1080, 1920 * 540, 0];
        image.buffer.fd = [5, 6, 0];

        let mut raw = raw_image(image);
        assert_eq!(raw.frame_id, 42);
        assert_eq!(raw.planes.len(), 2);
        assert_eq!(raw.planes[1].size, 1920 * 540);
        assert_eq!(raw.planes[1].fd, 6);
        assert!(vendor_image(&mut raw).is_ok());
    }

    #[test]
    fn test_foreign_buffer_rejected() {
        let mut raw = RawImage::default();
        assert_eq!(vendor_image(&mut raw).unwrap_err(), STATUS_FOREIGN_BUFFER);
    }

    #[ignore = "test requires the vendor hardware libraries (run with --include-ignored to enable)"]
    #[test]
    fn test_open_close_vse() {
        let api = HbnApi::new().unwrap();
        let node = api.open(NodeKind::Vse).unwrap();
        api.close(node);
    }
}
