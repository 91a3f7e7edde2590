// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

// Hand-maintained subset of hbn_api.h, hb_camera_interface.h, hb_rgn.h,
// vse_cfg.h and hb_mem_mgr.h. Only the types and entry points used by
// vpcam are mirrored here; keep field order identical to the vendor headers.

use std::os::raw::{c_char, c_int, c_void};

pub type hbn_vnode_handle_t = i64;
pub type hbn_vflow_handle_t = i64;
pub type camera_handle_t = i64;
pub type hbn_rgn_handle_t = i32;

pub type hb_vnode_type_t = u32;
pub const HB_VIN: hb_vnode_type_t = 0;
pub const HB_ISP: hb_vnode_type_t = 1;
pub const HB_VSE: hb_vnode_type_t = 2;
pub const HB_GDC: hb_vnode_type_t = 4;

pub const AUTO_ALLOC_ID: c_int = -1;

pub const FRM_FMT_RAW: u32 = 0;
pub const FRM_FMT_NV12: u32 = 1;

pub const NOT_HDR: u32 = 0;
pub const DOL_2: u32 = 1;

pub const VIN_BASIC_ATTR: u32 = 1;

pub const OVERLAY_RGN: u32 = 0;
pub const PIXEL_FORMAT_VGA_8: u32 = 0;
pub const FONT_COLOR_ORANGE: u32 = 3;

pub const MEM_PIX_FMT_NV12: c_int = 9;

pub const HB_MEM_USAGE_CPU_READ_OFTEN: i64 = 0x3;
pub const HB_MEM_USAGE_CPU_WRITE_OFTEN: i64 = 0x30;
pub const HB_MEM_USAGE_CACHED: i64 = 0x200;
pub const HB_MEM_USAGE_MAP_INITIALIZED: i64 = 0x1000;
pub const HB_MEM_USAGE_GRAPHIC_CONTIGUOUS_BUF: i64 = 0x100000;
pub const HB_MEM_USAGE_PRIV_HEAP_2_RESERVERD: i64 = 0x2000000;

pub const MAX_GRAPHIC_BUF_COMP: usize = 3;

/// `hbn_vnode_getframe` returns `-ETIMEDOUT` when no buffer became ready.
pub const HBN_STATUS_GETFRAME_TIMEOUT: c_int = -110;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct timeval {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct hb_mem_graphic_buf_t {
    pub fd: [c_int; MAX_GRAPHIC_BUF_COMP],
    pub plane_cnt: c_int,
    pub format: c_int,
    pub width: c_int,
    pub height: c_int,
    pub stride: c_int,
    pub vstride: c_int,
    pub is_contig: c_int,
    pub share_id: [c_int; MAX_GRAPHIC_BUF_COMP],
    pub flags: i64,
    pub size: [u64; MAX_GRAPHIC_BUF_COMP],
    pub virt_addr: [*mut u8; MAX_GRAPHIC_BUF_COMP],
    pub phys_addr: [u64; MAX_GRAPHIC_BUF_COMP],
    pub offset: [u64; MAX_GRAPHIC_BUF_COMP],
}

impl Default for hb_mem_graphic_buf_t {
    fn default() -> Self {
        hb_mem_graphic_buf_t {
            fd: [0; MAX_GRAPHIC_BUF_COMP],
            plane_cnt: 0,
            format: 0,
            width: 0,
            height: 0,
            stride: 0,
            vstride: 0,
            is_contig: 0,
            share_id: [0; MAX_GRAPHIC_BUF_COMP],
            flags: 0,
            size: [0; MAX_GRAPHIC_BUF_COMP],
            virt_addr: [std::ptr::null_mut(); MAX_GRAPHIC_BUF_COMP],
            phys_addr: [0; MAX_GRAPHIC_BUF_COMP],
            offset: [0; MAX_GRAPHIC_BUF_COMP],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct hb_mem_common_buf_t {
    pub fd: c_int,
    pub share_id: c_int,
    pub flags: i64,
    pub size: u64,
    pub virt_addr: *mut u8,
    pub phys_addr: u64,
    pub offset: u64,
}

impl Default for hb_mem_common_buf_t {
    fn default() -> Self {
        hb_mem_common_buf_t {
            fd: 0,
            share_id: 0,
            flags: 0,
            size: 0,
            virt_addr: std::ptr::null_mut(),
            phys_addr: 0,
            offset: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_frame_info_t {
    pub frame_id: u32,
    pub timestamps: u64,
    pub tv: timeval,
    pub trig_tv: timeval,
    pub frame_done: u32,
    pub bufferindex: c_int,
    pub sys_timestamps: u64,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct hbn_vnode_image_t {
    pub info: hbn_frame_info_t,
    pub buffer: hb_mem_graphic_buf_t,
    pub metadata: *mut c_void,
}

impl Default for hbn_vnode_image_t {
    fn default() -> Self {
        hbn_vnode_image_t {
            info: hbn_frame_info_t::default(),
            buffer: hb_mem_graphic_buf_t::default(),
            metadata: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_buf_alloc_attr_t {
    pub flags: i64,
    pub buffers_num: u32,
    pub is_contig: u32,
}

// Camera (sensor) configuration

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct mipi_rx_attr_t {
    pub phy: u32,
    pub lane: u32,
    pub datatype: u32,
    pub fps: u32,
    pub mclk: u32,
    pub mipiclk: u32,
    pub width: u32,
    pub height: u32,
    pub linelenth: u32,
    pub framelenth: u32,
    pub settle: u32,
    pub ppi_pg: u32,
    pub hsaTime: u32,
    pub hbpTime: u32,
    pub hsdTime: u32,
    pub channel_num: u32,
    pub channel_sel: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct mipi_rx_attr_ex_t {
    pub stop_check_instart: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct mipi_config_t {
    pub rx_enable: u32,
    pub rx_attr: mipi_rx_attr_t,
    pub rx_ex_mask: u64,
    pub rx_attr_ex: mipi_rx_attr_ex_t,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct camera_config_t {
    pub name: [c_char; 128],
    pub addr: u32,
    pub isp_addr: u32,
    pub eeprom_addr: u32,
    pub serial_addr: u32,
    pub sensor_mode: u32,
    pub sensor_clk: u32,
    pub gpio_enable_bit: u32,
    pub gpio_level_bit: u32,
    pub bus_select: u32,
    pub bus_timeout: u32,
    pub fps: f32,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub flags: u32,
    pub extra_mode: u32,
    pub config_index: u32,
    pub ts_compensate: u32,
    pub mipi_cfg: *mut mipi_config_t,
    pub calib_lname: [c_char; 128],
    pub sensor_param: *mut c_char,
    pub iparam_mode: u32,
    pub end_flag: u32,
}

impl Default for camera_config_t {
    fn default() -> Self {
        camera_config_t {
            name: [0; 128],
            addr: 0,
            isp_addr: 0,
            eeprom_addr: 0,
            serial_addr: 0,
            sensor_mode: 0,
            sensor_clk: 0,
            gpio_enable_bit: 0,
            gpio_level_bit: 0,
            bus_select: 0,
            bus_timeout: 0,
            fps: 0.0,
            width: 0,
            height: 0,
            format: 0,
            flags: 0,
            extra_mode: 0,
            config_index: 0,
            ts_compensate: 0,
            mipi_cfg: std::ptr::null_mut(),
            calib_lname: [0; 128],
            sensor_param: std::ptr::null_mut(),
            iparam_mode: 0,
            end_flag: 0,
        }
    }
}

// VIN

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct cim_func_desc_t {
    pub enable_frame_id: u32,
    pub set_init_frame_id: u32,
    pub hdr_mode: u32,
    pub time_stamp_en: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct cim_attr_t {
    pub mipi_rx: u32,
    pub vc_index: u32,
    pub ipi_channel: u32,
    pub cim_isp_flyby: u32,
    pub func: cim_func_desc_t,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_node_attr_t {
    pub cim_attr: cim_attr_t,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_ichn_attr_t {
    pub width: u32,
    pub height: u32,
    pub format: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_basic_attr_t {
    pub format: u32,
    pub wstride: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_ochn_attr_t {
    pub ddr_en: u32,
    pub ochn_attr_type: u32,
    pub vin_basic_attr: vin_basic_attr_t,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_mclk_ex_attr_t {
    pub mclk_freq: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vin_attr_ex_t {
    pub vin_attr_ex_mask: u64,
    pub mclk_ex_attr: vin_mclk_ex_attr_t,
}

// ISP

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct common_rect_t {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct isp_attr_t {
    pub input_mode: u32,
    pub sensor_mode: u32,
    pub crop: common_rect_t,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct isp_ichn_attr_t {
    pub width: u32,
    pub height: u32,
    pub fmt: u32,
    pub bit_width: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct isp_ochn_attr_t {
    pub ddr_en: u32,
    pub fmt: u32,
    pub bit_width: u32,
}

// VSE

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vse_attr_t {
    pub reserved: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vse_ichn_attr_t {
    pub width: u32,
    pub height: u32,
    pub fmt: u32,
    pub bit_width: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct frame_rate_t {
    pub src: u32,
    pub dst: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct vse_ochn_attr_t {
    pub chn_en: u32,
    pub roi: common_rect_t,
    pub target_w: u32,
    pub target_h: u32,
    pub fmt: u32,
    pub bit_width: u32,
    pub fps: frame_rate_t,
}

// GDC

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct gdc_attr_t {
    pub config_addr: u64,
    pub config_size: u32,
    pub binary_ion_id: u32,
    pub binary_offset: u64,
    pub total_size: u32,
    pub div_width: u32,
    pub div_height: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct gdc_ichn_attr_t {
    pub input_width: u32,
    pub input_height: u32,
    pub input_stride: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct gdc_ochn_attr_t {
    pub output_width: u32,
    pub output_height: u32,
    pub output_stride: u32,
}

// Regions (OSD)

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_rgn_size_t {
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_rgn_point_t {
    pub x: u32,
    pub y: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_rgn_overlay_t {
    pub size: hbn_rgn_size_t,
    pub pixel_fmt: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_rgn_attr_t {
    pub type_: u32,
    pub color: u32,
    pub alpha: u32,
    pub overlay_attr: hbn_rgn_overlay_t,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct hbn_rgn_chn_attr_t {
    pub show: bool,
    pub invert_en: bool,
    pub display_level: u32,
    pub point: hbn_rgn_point_t,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct hbn_rgn_bitmap_t {
    pub pixel_fmt: u32,
    pub size: hbn_rgn_size_t,
    pub paddr: *mut c_void,
}

/// Function table for the vendor hardware libraries.
///
/// The vnode, vflow and region entry points live in `libhbn_api.so`, the
/// sensor entry points in `libcam.so` and the graphic buffer allocator in
/// `libhbmem.so`. All three are opened together; a missing symbol fails
/// the whole load.
pub struct HbnLibrary {
    __hbn: ::libloading::Library,
    __cam: ::libloading::Library,
    __mem: ::libloading::Library,
    pub hbn_vnode_open: unsafe extern "C" fn(
        type_: hb_vnode_type_t,
        hw_id: u32,
        ctx_id: c_int,
        vnode_fd: *mut hbn_vnode_handle_t,
    ) -> c_int,
    pub hbn_vnode_set_attr:
        unsafe extern "C" fn(vnode_fd: hbn_vnode_handle_t, attr: *mut c_void) -> c_int,
    pub hbn_vnode_set_attr_ex:
        unsafe extern "C" fn(vnode_fd: hbn_vnode_handle_t, attr: *mut c_void) -> c_int,
    pub hbn_vnode_set_ichn_attr: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ichn_id: u32,
        attr: *mut c_void,
    ) -> c_int,
    pub hbn_vnode_set_ochn_attr: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ochn_id: u32,
        attr: *mut c_void,
    ) -> c_int,
    pub hbn_vnode_set_ochn_buf_attr: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ochn_id: u32,
        attr: *mut hbn_buf_alloc_attr_t,
    ) -> c_int,
    pub hbn_vnode_start: unsafe extern "C" fn(vnode_fd: hbn_vnode_handle_t) -> c_int,
    pub hbn_vnode_stop: unsafe extern "C" fn(vnode_fd: hbn_vnode_handle_t) -> c_int,
    pub hbn_vnode_close: unsafe extern "C" fn(vnode_fd: hbn_vnode_handle_t),
    pub hbn_vnode_sendframe: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ichn_id: u32,
        image: *mut hbn_vnode_image_t,
    ) -> c_int,
    pub hbn_vnode_getframe: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ochn_id: u32,
        millisecond_timeout: u32,
        image: *mut hbn_vnode_image_t,
    ) -> c_int,
    pub hbn_vnode_releaseframe: unsafe extern "C" fn(
        vnode_fd: hbn_vnode_handle_t,
        ochn_id: u32,
        image: *mut hbn_vnode_image_t,
    ) -> c_int,
    pub hbn_vflow_create: unsafe extern "C" fn(vflow_fd: *mut hbn_vflow_handle_t) -> c_int,
    pub hbn_vflow_add_vnode:
        unsafe extern "C" fn(vflow_fd: hbn_vflow_handle_t, vnode_fd: hbn_vnode_handle_t) -> c_int,
    pub hbn_vflow_bind_vnode: unsafe extern "C" fn(
        vflow_fd: hbn_vflow_handle_t,
        src_vnode_fd: hbn_vnode_handle_t,
        src_ochn_id: u32,
        dst_vnode_fd: hbn_vnode_handle_t,
        dst_ichn_id: u32,
    ) -> c_int,
    pub hbn_vflow_start: unsafe extern "C" fn(vflow_fd: hbn_vflow_handle_t) -> c_int,
    pub hbn_vflow_stop: unsafe extern "C" fn(vflow_fd: hbn_vflow_handle_t) -> c_int,
    pub hbn_vflow_destroy: unsafe extern "C" fn(vflow_fd: hbn_vflow_handle_t),
    pub hbn_rgn_create:
        unsafe extern "C" fn(handle: hbn_rgn_handle_t, attr: *const hbn_rgn_attr_t) -> c_int,
    pub hbn_rgn_destroy: unsafe extern "C" fn(handle: hbn_rgn_handle_t) -> c_int,
    pub hbn_rgn_attach_to_chn: unsafe extern "C" fn(
        handle: hbn_rgn_handle_t,
        vnode_fd: hbn_vnode_handle_t,
        chn_id: c_int,
        attr: *const hbn_rgn_chn_attr_t,
    ) -> c_int,
    pub hbn_rgn_detach_from_chn: unsafe extern "C" fn(
        handle: hbn_rgn_handle_t,
        vnode_fd: hbn_vnode_handle_t,
        chn_id: c_int,
    ) -> c_int,
    pub hbn_rgn_setbitmap:
        unsafe extern "C" fn(handle: hbn_rgn_handle_t, bitmap: *const hbn_rgn_bitmap_t) -> c_int,
    pub hbn_camera_create: unsafe extern "C" fn(
        camera_config: *mut camera_config_t,
        cam_fd: *mut camera_handle_t,
    ) -> c_int,
    pub hbn_camera_attach_to_vin:
        unsafe extern "C" fn(cam_fd: camera_handle_t, vin_fd: hbn_vnode_handle_t) -> c_int,
    pub hbn_camera_detach_from_vin: unsafe extern "C" fn(cam_fd: camera_handle_t) -> c_int,
    pub hbn_camera_destroy: unsafe extern "C" fn(cam_fd: camera_handle_t) -> c_int,
    pub hb_mem_module_open: unsafe extern "C" fn() -> c_int,
    pub hb_mem_module_close: unsafe extern "C" fn() -> c_int,
    pub hb_mem_alloc_graph_buf: unsafe extern "C" fn(
        w: c_int,
        h: c_int,
        format: c_int,
        flags: i64,
        stride: c_int,
        vstride: c_int,
        graphic_buf: *mut hb_mem_graphic_buf_t,
    ) -> c_int,
    pub hb_mem_alloc_com_buf:
        unsafe extern "C" fn(size: u64, flags: i64, buf: *mut hb_mem_common_buf_t) -> c_int,
    pub hb_mem_free_buf: unsafe extern "C" fn(fd: c_int) -> c_int,
}

impl HbnLibrary {
    /// Opens the three vendor libraries and resolves every entry point.
    ///
    /// # Safety
    ///
    /// Loading a shared library runs its initialisers; the caller must trust
    /// the libraries found at the given paths.
    pub unsafe fn new<P>(hbn: P, cam: P, mem: P) -> Result<Self, ::libloading::Error>
    where
        P: AsRef<::std::ffi::OsStr>,
    {
        let __hbn = ::libloading::Library::new(hbn)?;
        let __cam = ::libloading::Library::new(cam)?;
        let __mem = ::libloading::Library::new(mem)?;

        let hbn_vnode_open = *__hbn.get(b"hbn_vnode_open\0")?;
        let hbn_vnode_set_attr = *__hbn.get(b"hbn_vnode_set_attr\0")?;
        let hbn_vnode_set_attr_ex = *__hbn.get(b"hbn_vnode_set_attr_ex\0")?;
        let hbn_vnode_set_ichn_attr = *__hbn.get(b"hbn_vnode_set_ichn_attr\0")?;
        let hbn_vnode_set_ochn_attr = *__hbn.get(b"hbn_vnode_set_ochn_attr\0")?;
        let hbn_vnode_set_ochn_buf_attr = *__hbn.get(b"hbn_vnode_set_ochn_buf_attr\0")?;
        let hbn_vnode_start = *__hbn.get(b"hbn_vnode_start\0")?;
        let hbn_vnode_stop = *__hbn.get(b"hbn_vnode_stop\0")?;
        let hbn_vnode_close = *__hbn.get(b"hbn_vnode_close\0")?;
        let hbn_vnode_sendframe = *__hbn.get(b"hbn_vnode_sendframe\0")?;
        let hbn_vnode_getframe = *__hbn.get(b"hbn_vnode_getframe\0")?;
        let hbn_vnode_releaseframe = *__hbn.get(b"hbn_vnode_releaseframe\0")?;
        let hbn_vflow_create = *__hbn.get(b"hbn_vflow_create\0")?;
        let hbn_vflow_add_vnode = *__hbn.get(b"hbn_vflow_add_vnode\0")?;
        let hbn_vflow_bind_vnode = *__hbn.get(b"hbn_vflow_bind_vnode\0")?;
        let hbn_vflow_start = *__hbn.get(b"hbn_vflow_start\0")?;
        let hbn_vflow_stop = *__hbn.get(b"hbn_vflow_stop\0")?;
        let hbn_vflow_destroy = *__hbn.get(b"hbn_vflow_destroy\0")?;
        let hbn_rgn_create = *__hbn.get(b"hbn_rgn_create\0")?;
        let hbn_rgn_destroy = *__hbn.get(b"hbn_rgn_destroy\0")?;
        let hbn_rgn_attach_to_chn = *__hbn.get(b"hbn_rgn_attach_to_chn\0")?;
        let hbn_rgn_detach_from_chn = *__hbn.get(b"hbn_rgn_detach_from_chn\0")?;
        let hbn_rgn_setbitmap = *__hbn.get(b"hbn_rgn_setbitmap\0")?;
        let hbn_camera_create = *__cam.get(b"hbn_camera_create\0")?;
        let hbn_camera_attach_to_vin = *__cam.get(b"hbn_camera_attach_to_vin\0")?;
        let hbn_camera_detach_from_vin = *__cam.get(b"hbn_camera_detach_from_vin\0")?;
        let hbn_camera_destroy = *__cam.get(b"hbn_camera_destroy\0")?;
        let hb_mem_module_open = *__mem.get(b"hb_mem_module_open\0")?;
        let hb_mem_module_close = *__mem.get(b"hb_mem_module_close\0")?;
        let hb_mem_alloc_graph_buf = *__mem.get(b"hb_mem_alloc_graph_buf\0")?;
        let hb_mem_alloc_com_buf = *__mem.get(b"hb_mem_alloc_com_buf\0")?;
        let hb_mem_free_buf = *__mem.get(b"hb_mem_free_buf\0")?;

        Ok(HbnLibrary {
            __hbn,
            __cam,
            __mem,
            hbn_vnode_open,
            hbn_vnode_set_attr,
            hbn_vnode_set_attr_ex,
            hbn_vnode_set_ichn_attr,
            hbn_vnode_set_ochn_attr,
            hbn_vnode_set_ochn_buf_attr,
            hbn_vnode_start,
            hbn_vnode_stop,
            hbn_vnode_close,
            hbn_vnode_sendframe,
            hbn_vnode_getframe,
            hbn_vnode_releaseframe,
            hbn_vflow_create,
            hbn_vflow_add_vnode,
            hbn_vflow_bind_vnode,
            hbn_vflow_start,
            hbn_vflow_stop,
            hbn_vflow_destroy,
            hbn_rgn_create,
            hbn_rgn_destroy,
            hbn_rgn_attach_to_chn,
            hbn_rgn_detach_from_chn,
            hbn_rgn_setbitmap,
            hbn_camera_create,
            hbn_camera_attach_to_vin,
            hbn_camera_detach_from_vin,
            hbn_camera_destroy,
            hb_mem_module_open,
            hb_mem_module_close,
            hb_mem_alloc_graph_buf,
            hb_mem_alloc_com_buf,
            hb_mem_free_buf,
        })
    }
}
