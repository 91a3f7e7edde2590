// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Compiled catalog of supported sensor profiles.
//!
//! Each [`SensorProfile`] describes one sensor, resolution and lane
//! combination: how to recognise it over I2C, how to power it and the
//! MIPI/VIN/ISP parameters handed verbatim to the hardware nodes. The
//! catalog is read-only; probing returns a resolved copy rather than
//! writing back into it.

use std::fmt;

/// Number of slots in a profile's candidate I2C address array.
pub const MAX_I2C_ADDRS: usize = 8;

/// MIPI CSI-2 data type of the sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipiDataType {
    Raw10,
    Raw12,
    Yuv422,
}

impl MipiDataType {
    /// CSI-2 data type identifier.
    pub const fn code(self) -> u32 {
        match self {
            MipiDataType::Raw10 => 0x2B,
            MipiDataType::Raw12 => 0x2C,
            MipiDataType::Yuv422 => 0x1E,
        }
    }

    /// Bits per pixel of the raw stream fed to the ISP.
    pub const fn bit_width(self) -> u32 {
        match self {
            MipiDataType::Raw10 => 10,
            MipiDataType::Raw12 => 12,
            MipiDataType::Yuv422 => 8,
        }
    }
}

impl fmt::Display for MipiDataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MipiDataType::Raw10 => write!(f, "RAW10"),
            MipiDataType::Raw12 => write!(f, "RAW12"),
            MipiDataType::Yuv422 => write!(f, "YUV422"),
        }
    }
}

/// Sensor driver operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    Normal,
    Dol2,
    Pwl,
    Slave,
}

impl SensorMode {
    pub const fn code(self) -> u32 {
        match self {
            SensorMode::Normal => 1,
            SensorMode::Dol2 => 2,
            SensorMode::Pwl => 5,
            SensorMode::Slave => 6,
        }
    }
}

/// HDR mode programmed into the VIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrMode {
    None,
    Dol2,
}

/// MIPI receiver timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipiTiming {
    pub lanes: u32,
    /// Sensor master clock in MHz.
    pub mclk: u32,
    /// Link rate in Mbps per lane.
    pub mipiclk: u32,
    pub line_length: u32,
    pub frame_length: u32,
    pub settle: u32,
    pub channel_num: u32,
    pub rx_ex_mask: u64,
}

/// VIN routing and capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VinGeometry {
    /// Default MIPI RX index; replaced by the interface's routed PHY once
    /// the sensor is resolved.
    pub mipi_rx: u32,
    pub vc_index: u32,
    pub ipi_channel: u32,
    pub isp_flyby: bool,
    pub hdr: HdrMode,
    /// External clock frequency in Hz.
    pub mclk_freq: u32,
}

/// ISP stage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IspSensorMode {
    Normal,
    Dol2,
}

impl IspSensorMode {
    pub const fn code(self) -> u32 {
        match self {
            IspSensorMode::Normal => 1,
            IspSensorMode::Dol2 => 2,
        }
    }
}

/// ISP input configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspGeometry {
    /// 0 online, 1 memory-to-memory, 2 fly-by.
    pub input_mode: u32,
    pub sensor_mode: IspSensorMode,
    /// Bits per pixel of the raw input.
    pub bit_width: u32,
}

/// One supported sensor, resolution and lane combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorProfile {
    pub name: &'static str,
    /// Source configuration the timing tables were taken from.
    pub config: &'static str,
    pub chip_id_reg: u16,
    pub chip_id: u16,
    /// Zero terminated list of I2C addresses to probe.
    pub i2c_addrs: [u8; MAX_I2C_ADDRS],
    /// Canonical I2C address of the sensor.
    pub i2c_addr: u8,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub data_type: MipiDataType,
    pub sensor_mode: SensorMode,
    pub extra_mode: u32,
    pub config_index: u32,
    /// Bit k set: line k of the interface's `gpio_oth` set powers the sensor.
    pub gpio_enable: u8,
    /// Bit k set: line k is active low.
    pub gpio_level: u8,
    pub mipi: MipiTiming,
    pub vin: VinGeometry,
    pub isp: IspGeometry,
    pub calibration: Option<&'static str>,
    pub gdc_bin: Option<&'static str>,
}

impl SensorProfile {
    /// Addresses to probe: every non-zero entry of the address list, in
    /// order, followed by the canonical address when the list lacks it.
    pub fn candidate_addresses(&self) -> Vec<u8> {
        let mut addrs: Vec<u8> = self
            .i2c_addrs
            .iter()
            .copied()
            .take_while(|addr| *addr != 0)
            .collect();
        if !addrs.contains(&self.i2c_addr) {
            addrs.push(self.i2c_addr);
        }
        addrs
    }

    /// Pixel count of one frame.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Line stride of the VIN output in bytes. Every supported format is
    /// stored two bytes per pixel.
    pub fn write_stride(&self) -> u32 {
        self.width * 2
    }

    /// Sensor driver name, the profile name up to the first `-` or `_`.
    pub fn driver(&self) -> &'static str {
        let name = self.name;
        match name.find(|c| c == '-' || c == '_') {
            Some(end) => &name[..end],
            None => name,
        }
    }

    /// True when the chip id needs a 16-bit register read.
    pub fn chip_id_is_16bit(&self) -> bool {
        self.chip_id >> 8 != 0
    }
}

impl fmt::Display for SensorProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}x{}@{} {} {}-lane",
            self.name, self.width, self.height, self.fps, self.data_type, self.mipi.lanes
        )
    }
}

const fn addrs(list: &[u8]) -> [u8; MAX_I2C_ADDRS] {
    let mut out = [0u8; MAX_I2C_ADDRS];
    let mut i = 0;
    while i < list.len() && i < MAX_I2C_ADDRS {
        out[i] = list[i];
        i += 1;
    }
    out
}

const MCLK_24M: u32 = 24_000_000;
const MCLK_27M: u32 = 27_000_000;

const fn vin(mipi_rx: u32, ipi_channel: u32, isp_flyby: bool, hdr: HdrMode, mclk_freq: u32) -> VinGeometry {
    VinGeometry {
        mipi_rx,
        vc_index: 0,
        ipi_channel,
        isp_flyby,
        hdr,
        mclk_freq,
    }
}

const fn isp(input_mode: u32, bit_width: u32) -> IspGeometry {
    IspGeometry {
        input_mode,
        sensor_mode: IspSensorMode::Normal,
        bit_width,
    }
}

const AR0233: SensorProfile = SensorProfile {
    name: "ar0233-30fps",
    config: "linear_1920x1080_raw12_30fps_2lane",
    chip_id_reg: 0x3107,
    chip_id: 0xcb34,
    i2c_addrs: addrs(&[0x11]),
    i2c_addr: 0x11,
    width: 1920,
    height: 1080,
    fps: 30,
    data_type: MipiDataType::Raw12,
    sensor_mode: SensorMode::Pwl,
    extra_mode: 7,
    config_index: 0,
    gpio_enable: 0x07,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 24,
        mipiclk: 2400,
        line_length: 4440,
        frame_length: 3003,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 12),
    calibration: None,
    gdc_bin: None,
};

/// Sensors whose chip id is unreadable over the deserialiser link use the
/// 16-bit wildcard so they can still be force-selected.
const AR0233_VC0: SensorProfile = SensorProfile {
    name: "ar0233-30fps-vc0",
    config: "linear_1920x1080_raw12_30fps_2lane_vc0",
    chip_id: 0xa55a,
    mipi: MipiTiming {
        channel_num: 2,
        ..AR0233.mipi
    },
    ..AR0233
};

const AR0820STD: SensorProfile = SensorProfile {
    name: "ar0820std-30fps",
    config: "linear_3840x2160_yuv422_30fps_4lane",
    chip_id_reg: 0x3107,
    chip_id: 0xcb34,
    i2c_addrs: addrs(&[0x11]),
    i2c_addr: 0x10,
    width: 3840,
    height: 2160,
    fps: 30,
    data_type: MipiDataType::Yuv422,
    sensor_mode: SensorMode::Pwl,
    extra_mode: 5,
    config_index: 512,
    gpio_enable: 0x07,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 4,
        mclk: 24,
        mipiclk: 4000,
        line_length: 4440,
        frame_length: 3003,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 8),
    calibration: None,
    gdc_bin: None,
};

const IMX219: SensorProfile = SensorProfile {
    name: "imx219-1632x1232-30fps",
    config: "linear_1632x1232_raw10_30fps_2lane",
    chip_id_reg: 0x0000,
    chip_id: 0x0219,
    i2c_addrs: addrs(&[0x10]),
    i2c_addr: 0x10,
    width: 1632,
    height: 1232,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 24,
        mipiclk: 688,
        line_length: 3448,
        frame_length: 1332,
        settle: 30,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(2, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: Some("/usr/hobot/bin/imx219_tuning_1632x1232.json"),
    gdc_bin: None,
};

const IMX415: SensorProfile = SensorProfile {
    name: "imx415-60fps-4lane",
    config: "linear_3840x2160_raw10_60fps_4lane",
    chip_id_reg: 0x4001,
    chip_id: 0x03,
    i2c_addrs: addrs(&[0x1a]),
    i2c_addr: 0x1a,
    width: 3840,
    height: 2160,
    fps: 60,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 1,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 4,
        mclk: 24,
        mipiclk: 8000,
        line_length: 4400,
        frame_length: 2700,
        settle: 15,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(0, 1, false, HdrMode::None, MCLK_24M),
    isp: isp(2, 10),
    calibration: None,
    gdc_bin: None,
};

const IMX477: SensorProfile = SensorProfile {
    name: "imx477-1920x1080-50fps",
    config: "linear_1920x1080_raw12_50fps_2lane",
    chip_id_reg: 0x0016,
    chip_id: 0x0477,
    i2c_addrs: addrs(&[0x1a]),
    i2c_addr: 0x1a,
    width: 1920,
    height: 1080,
    fps: 50,
    data_type: MipiDataType::Raw12,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 24,
        mipiclk: 2250,
        line_length: 2976,
        frame_length: 1313,
        settle: 30,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(2, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 12),
    calibration: Some("/usr/hobot/bin/imx477_1920x1080_tuning.json"),
    gdc_bin: None,
};

const IMX586: SensorProfile = SensorProfile {
    name: "imx586-30fps-4lane",
    config: "linear_3840x2160_raw10_30fps_4lane",
    chip_id_reg: 0x0016,
    chip_id: 0x0586,
    i2c_addrs: addrs(&[0x1a]),
    i2c_addr: 0x1a,
    width: 3840,
    height: 2160,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 4,
        mclk: 24,
        mipiclk: 4500,
        line_length: 8976,
        frame_length: 3064,
        settle: 30,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: None,
    gdc_bin: None,
};

const OS08C10: SensorProfile = SensorProfile {
    name: "os08c10-30fps-2lane",
    config: "linear_3840x2160_raw10_30fps_2lane",
    chip_id_reg: 0x300a,
    chip_id: 0x53,
    i2c_addrs: addrs(&[0x21]),
    i2c_addr: 0x21,
    width: 3840,
    height: 2160,
    fps: 30,
    data_type: MipiDataType::Raw12,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 1,
        mipiclk: 1701,
        line_length: 4860,
        frame_length: 2314,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_27M),
    isp: isp(1, 10),
    calibration: None,
    gdc_bin: None,
};

const OV50H40: SensorProfile = SensorProfile {
    name: "ov50h40-30fps-4lane",
    config: "linear_4096x3072_raw10_30fps_4lane",
    chip_id_reg: 0x3035,
    chip_id: 0x6c,
    i2c_addrs: addrs(&[0x21]),
    i2c_addr: 0x21,
    width: 4096,
    height: 3072,
    fps: 1,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 4,
        mclk: 1,
        mipiclk: 5995,
        line_length: 9216,
        frame_length: 4337,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: None,
    gdc_bin: None,
};

const OV5647: SensorProfile = SensorProfile {
    name: "ov5647-1280x960-30fps",
    config: "linear_1280x960_raw10_30fps_2lane",
    chip_id_reg: 0x300a,
    chip_id: 0x5647,
    i2c_addrs: addrs(&[]),
    i2c_addr: 0x36,
    width: 1280,
    height: 960,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 24,
        mipiclk: 1000,
        line_length: 1896,
        frame_length: 1435,
        settle: 30,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(2, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: Some("/usr/hobot/bin/ov5647_1280x960_tuning.json"),
    gdc_bin: None,
};

const OV9782: SensorProfile = SensorProfile {
    name: "ov9782-200fps-2lane",
    config: "linear_640x360_raw10_200fps_2lane",
    chip_id_reg: 0x300a,
    chip_id: 0x9281,
    i2c_addrs: addrs(&[0x60]),
    i2c_addr: 0x60,
    width: 640,
    height: 360,
    fps: 200,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 1,
        mipiclk: 1728,
        line_length: 728,
        frame_length: 545,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0x40,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: Some("/usr/hobot/lib/sensor/ov9782_640x360_tuning.json"),
    gdc_bin: None,
};

const OX05B1S: SensorProfile = SensorProfile {
    name: "ox05b1s_2lane",
    config: "linear_2592x1944_raw10_10fps_2lane",
    chip_id_reg: 0x300a,
    chip_id: 0x0058,
    i2c_addrs: addrs(&[0x36]),
    i2c_addr: 0x36,
    width: 2592,
    height: 1944,
    fps: 10,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Slave,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 1,
        mipiclk: 2208,
        line_length: 752,
        frame_length: 2128,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, false, HdrMode::None, MCLK_24M),
    isp: isp(2, 10),
    calibration: None,
    gdc_bin: None,
};

const SC035HGS: SensorProfile = SensorProfile {
    name: "sc035hgs-vc0",
    config: "linear_640x480_raw10_30fps_2lane_vc0",
    chip_id_reg: 0x3107,
    chip_id: 0x0035,
    i2c_addrs: addrs(&[]),
    i2c_addr: 0x30,
    width: 640,
    height: 480,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 1,
        mipiclk: 600,
        line_length: 1600,
        frame_length: 1250,
        settle: 20,
        channel_num: 2,
        rx_ex_mask: 0,
    },
    vin: vin(0, 2, true, HdrMode::None, MCLK_24M),
    isp: isp(1, 10),
    calibration: None,
    gdc_bin: None,
};

const SC230AI_DOL2: SensorProfile = SensorProfile {
    name: "sc230ai-dol2-30fps",
    config: "dol2_1920x1080_raw10_30fps_2lane",
    chip_id_reg: 0x3107,
    chip_id: 0xcb34,
    i2c_addrs: addrs(&[0x30, 0x32]),
    i2c_addr: 0x30,
    width: 1920,
    height: 1080,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Dol2,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x01,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 2,
        mclk: 24,
        mipiclk: 1000,
        line_length: 2400,
        frame_length: 2350,
        settle: 22,
        channel_num: 2,
        rx_ex_mask: 0x40,
    },
    vin: vin(0, 2, true, HdrMode::Dol2, MCLK_24M),
    isp: IspGeometry {
        input_mode: 1,
        sensor_mode: IspSensorMode::Dol2,
        bit_width: 10,
    },
    calibration: Some("sc230ai_hdr_tuning.json"),
    gdc_bin: None,
};

const SC230AI: SensorProfile = SensorProfile {
    name: "sc230ai-30fps",
    config: "linear_1920x1080_raw10_30fps_1lane",
    chip_id_reg: 0x3107,
    chip_id: 0xcb34,
    i2c_addrs: addrs(&[0x30, 0x32]),
    i2c_addr: 0x30,
    width: 1920,
    height: 1080,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x07,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 1,
        mclk: 24,
        mipiclk: 810,
        line_length: 2149,
        frame_length: 2250,
        settle: 22,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, false, HdrMode::None, MCLK_24M),
    isp: isp(2, 10),
    calibration: None,
    gdc_bin: None,
};

const SC850SL: SensorProfile = SensorProfile {
    name: "sc850sl-30fps",
    config: "linear_3840x2160_raw10_30fps_4lane",
    chip_id_reg: 0x3107,
    chip_id: 0x9d1e,
    i2c_addrs: addrs(&[0x30]),
    i2c_addr: 0x30,
    width: 3840,
    height: 2160,
    fps: 30,
    data_type: MipiDataType::Raw10,
    sensor_mode: SensorMode::Normal,
    extra_mode: 0,
    config_index: 0,
    gpio_enable: 0x07,
    gpio_level: 0x00,
    mipi: MipiTiming {
        lanes: 4,
        mclk: 24,
        mipiclk: 2880,
        line_length: 4266,
        frame_length: 2250,
        settle: 0,
        channel_num: 1,
        rx_ex_mask: 0,
    },
    vin: vin(0, 1, true, HdrMode::None, MCLK_27M),
    isp: isp(2, 10),
    calibration: None,
    gdc_bin: None,
};

static CATALOG: [SensorProfile; 16] = [
    IMX219,
    IMX477,
    OV5647,
    IMX415,
    IMX586,
    OS08C10,
    OV50H40,
    OV9782,
    OX05B1S,
    SC035HGS,
    SC230AI_DOL2,
    SC230AI,
    SC850SL,
    AR0233,
    AR0233_VC0,
    AR0820STD,
];

/// Every supported profile, in probe order.
pub fn catalog() -> &'static [SensorProfile] {
    &CATALOG
}

/// Profiles listed for operators, in probe order.
pub fn list_sensors() -> Vec<&'static SensorProfile> {
    CATALOG.iter().collect()
}

/// Profiles usable with a VSE whose input limit is `width`×`height`.
///
/// Profiles smaller than a quarter of the limit are skipped.
pub fn list_sensors_vse_limit(width: u32, height: u32) -> Vec<&'static SensorProfile> {
    let min_area = u64::from(width) * u64::from(height) / 4;
    CATALOG
        .iter()
        .filter(|profile| profile.area() >= min_area)
        .collect()
}

/// Look up a profile by name.
pub fn find(name: &str) -> Option<&'static SensorProfile> {
    CATALOG.iter().find(|profile| profile.name == name)
}
