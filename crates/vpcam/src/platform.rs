// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Platform description: device tree nodes for each camera interface and
//! the MIPI host status and clock files under `/sys/class/vps`.
//!
//! Properties are read fresh on every call; nothing here is cached since
//! the board description can change at runtime through overlays.

use log::{debug, warn};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

/// Number of MIPI hosts on the SoC.
pub const MIPI_HOST_COUNT: u32 = 4;

/// External sensor clock written to the MIPI host before probing.
pub const SENSOR_CLOCK_HZ: u32 = 24_000_000;

const MIPI_HOST_NODES: [&str; MIPI_HOST_COUNT as usize] =
    ["3d060000", "3d070000", "3d080000", "3d090000"];

const NOT_INITED: &str = "not inited";

/// Filesystem locations touched by the board support layer.
///
/// The defaults match a running board. [`BoardPaths::with_root`] moves
/// every location under a prefix, which is how tests and chroot setups
/// point the library at a synthetic tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPaths {
    /// Camera subtree of the device tree (`/proc/device-tree/soc/cam`)
    pub camera_tree: PathBuf,

    /// MIPI host status and parameters (`/sys/class/vps`)
    pub vps: PathBuf,

    /// Sysfs GPIO class (`/sys/class/gpio`)
    pub gpio: PathBuf,

    /// SoC information (`/sys/class/socinfo`)
    pub socinfo: PathBuf,

    /// Directory holding the `i2c-N` character devices (`/dev`)
    pub dev: PathBuf,

    /// JSON board configuration (`/etc/board_config.json`)
    pub board_config: PathBuf,
}

impl Default for BoardPaths {
    fn default() -> Self {
        BoardPaths::with_root("/")
    }
}

impl BoardPaths {
    /// All locations relative to `root` instead of `/`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        BoardPaths {
            camera_tree: root.join("proc/device-tree/soc/cam"),
            vps: root.join("sys/class/vps"),
            gpio: root.join("sys/class/gpio"),
            socinfo: root.join("sys/class/socinfo"),
            dev: root.join("dev"),
            board_config: root.join("etc/board_config.json"),
        }
    }

    /// Defaults, relocated under `VPCAM_ROOT` when that variable is set.
    pub fn from_env() -> Self {
        match env::var_os("VPCAM_ROOT") {
            Some(root) if !root.is_empty() => BoardPaths::with_root(root),
            _ => BoardPaths::default(),
        }
    }

    pub fn with_board_config<P: Into<PathBuf>>(self, board_config: P) -> Self {
        BoardPaths {
            board_config: board_config.into(),
            ..self
        }
    }

    /// Device tree node of camera connector `index`.
    pub fn vcon_node(&self, index: u32) -> PathBuf {
        self.camera_tree.join(format!("vcon@{}", index))
    }

    /// Device tree node of MIPI host `index`, if the SoC has one.
    pub fn mipi_host_node(&self, index: u32) -> Option<PathBuf> {
        MIPI_HOST_NODES
            .get(index as usize)
            .map(|suffix| self.camera_tree.join(format!("mipi_host@{}", suffix)))
    }

    /// Sysfs directory of MIPI host `index`.
    pub fn mipi_host_sysfs(&self, index: u32) -> PathBuf {
        self.vps.join(format!("mipi_host{}", index))
    }

    /// Character device of I2C bus `bus`.
    pub fn i2c_device(&self, bus: u32) -> PathBuf {
        self.dev.join(format!("i2c-{}", bus))
    }
}

/// Properties of one camera connector (`vcon@N`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VconProperties {
    pub device_path: PathBuf,
    pub compatible: String,
    pub status: String,
    pub pinctrl_names: String,
    pub kind: u32,
    /// I2C bus the sensor sits on.
    pub bus: u32,
    pub rx_phy: Vec<u32>,
    pub pinctrl_0: Vec<u32>,
    /// Board GPIO lines for sensor power, reset and power-down.
    pub gpio_oth: [u32; 8],
}

impl VconProperties {
    /// Read `vcon@index`. A missing node yields disabled defaults.
    pub fn read(paths: &BoardPaths, index: u32) -> VconProperties {
        let device_path = paths.vcon_node(index);
        let mut props = VconProperties {
            device_path: device_path.clone(),
            ..Default::default()
        };

        if !device_path.is_dir() {
            warn!("camera connector node {} not found", device_path.display());
            return props;
        }

        props.compatible = read_string(&device_path.join("compatible"));
        props.status = read_string(&device_path.join("status"));
        props.pinctrl_names = read_string(&device_path.join("pinctrl-names"));
        props.kind = read_cells(&device_path.join("type"))
            .first()
            .copied()
            .unwrap_or(0);
        props.bus = read_cells(&device_path.join("bus"))
            .first()
            .copied()
            .unwrap_or(0);
        props.rx_phy = read_cells(&device_path.join("rx_phy"));
        props.pinctrl_0 = read_cells(&device_path.join("pinctrl-0"));
        for (slot, line) in props
            .gpio_oth
            .iter_mut()
            .zip(read_cells(&device_path.join("gpio_oth")))
        {
            *slot = line;
        }

        props
    }

    /// Device tree status is `okay`. Only the first character is checked,
    /// so `ok` is accepted too.
    pub fn enabled(&self) -> bool {
        self.status.starts_with('o')
    }

    /// PHY the connector is routed to (`rx_phy[1]`).
    pub fn routed_phy(&self) -> u32 {
        self.rx_phy.get(1).copied().unwrap_or(0)
    }
}

/// Properties of one MIPI host node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MipiProperties {
    pub device_path: PathBuf,
    pub status: String,
    pub pinctrl_names: String,
    pub pinctrl_0: Vec<u32>,
    pub pinctrl_1: Vec<u32>,
    pub snrclk_idx: Vec<u32>,
}

impl MipiProperties {
    /// Read the MIPI host node for `index`. A missing node yields defaults.
    pub fn read(paths: &BoardPaths, index: u32) -> MipiProperties {
        let device_path = match paths.mipi_host_node(index) {
            Some(path) => path,
            None => {
                warn!(
                    "mipi host {} exceeds the {} hosts of this SoC",
                    index, MIPI_HOST_COUNT
                );
                return MipiProperties::default();
            }
        };

        let mut props = MipiProperties {
            device_path: device_path.clone(),
            ..Default::default()
        };

        if !device_path.is_dir() {
            warn!("mipi host node {} not found", device_path.display());
            return props;
        }

        props.status = read_string(&device_path.join("status"));
        props.pinctrl_names = read_string(&device_path.join("pinctrl-names"));
        props.pinctrl_0 = read_cells(&device_path.join("pinctrl-0"));
        props.pinctrl_1 = read_cells(&device_path.join("pinctrl-1"));
        props.snrclk_idx = read_cells(&device_path.join("snrclk-idx"));
        props
    }

    /// The host drives the sensor clock itself when it has a pin control
    /// entry for it.
    pub fn mclk_configured(&self) -> bool {
        !self.pinctrl_names.is_empty()
    }
}

/// True when MIPI host `index` is already streaming.
///
/// The host is free only when the first line of its `status/cfg` file is
/// exactly `not inited`; a missing or unreadable file counts as busy.
pub fn interface_in_use(paths: &BoardPaths, index: u32) -> bool {
    let path = paths.mipi_host_sysfs(index).join("status/cfg");
    match fs::read_to_string(&path) {
        Ok(contents) => contents.lines().next() != Some(NOT_INITED),
        Err(err) => {
            warn!("failed to read {}: {}", path.display(), err);
            true
        }
    }
}

/// Program and enable the external sensor clock of MIPI host `index`.
pub fn enable_sensor_clock(paths: &BoardPaths, index: u32, frequency: u32) -> io::Result<()> {
    let param = paths.mipi_host_sysfs(index).join("param");
    fs::write(param.join("snrclk_freq"), frequency.to_string())?;
    fs::write(param.join("snrclk_en"), "1")?;
    debug!("mipi host {} sensor clock {} Hz enabled", index, frequency);
    Ok(())
}

/// Board identifier from `socinfo/board_id`, whitespace trimmed.
pub fn board_id(paths: &BoardPaths) -> io::Result<String> {
    let id = fs::read_to_string(paths.socinfo.join("board_id"))?;
    Ok(id.trim().to_string())
}

/// NUL terminated device tree string; empty when the property is absent.
fn read_string(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
        }
        Err(_) => String::new(),
    }
}

/// Big-endian 32-bit cells; empty when the property is absent.
fn read_cells(path: &Path) -> Vec<u32> {
    match fs::read(path) {
        Ok(bytes) => bytes
            .chunks_exact(4)
            .map(|cell| u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cells(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn write_vcon(root: &Path, index: u32) -> PathBuf {
        let paths = BoardPaths::with_root(root);
        let node = paths.vcon_node(index);
        fs::create_dir_all(&node).unwrap();
        fs::write(node.join("compatible"), b"hobot,vin-vcon\0").unwrap();
        fs::write(node.join("status"), b"okay\0").unwrap();
        fs::write(node.join("bus"), cells(&[6])).unwrap();
        fs::write(node.join("rx_phy"), cells(&[0, 2])).unwrap();
        fs::write(node.join("gpio_oth"), cells(&[381, 0, 0, 0, 0, 0, 0, 0])).unwrap();
        node
    }

    #[test]
    fn test_read_vcon() {
        let dir = TempDir::new().unwrap();
        write_vcon(dir.path(), 1);
        let paths = BoardPaths::with_root(dir.path());

        let props = VconProperties::read(&paths, 1);
        assert!(props.enabled());
        assert_eq!(props.compatible, "hobot,vin-vcon");
        assert_eq!(props.bus, 6);
        assert_eq!(props.routed_phy(), 2);
        assert_eq!(props.gpio_oth[0], 381);
        assert_eq!(props.gpio_oth[1], 0);
    }

    #[test]
    fn test_missing_vcon_is_disabled() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        let props = VconProperties::read(&paths, 3);
        assert!(!props.enabled());
        assert_eq!(props.routed_phy(), 0);
    }

    #[test]
    fn test_mclk_configured() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        let node = paths.mipi_host_node(0).unwrap();
        fs::create_dir_all(&node).unwrap();
        fs::write(node.join("pinctrl-names"), b"default\0").unwrap();
        assert!(MipiProperties::read(&paths, 0).mclk_configured());
        assert!(!MipiProperties::read(&paths, 1).mclk_configured());
        assert!(!MipiProperties::read(&paths, 7).mclk_configured());
    }

    #[test]
    fn test_interface_in_use() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());

        // Missing status file counts as busy.
        assert!(interface_in_use(&paths, 0));

        let status = paths.mipi_host_sysfs(0).join("status");
        fs::create_dir_all(&status).unwrap();
        fs::write(status.join("cfg"), "not inited\n").unwrap();
        assert!(!interface_in_use(&paths, 0));

        fs::write(status.join("cfg"), "mipi host0 cfg:\n lane: 2\n").unwrap();
        assert!(interface_in_use(&paths, 0));
    }

    #[test]
    fn test_enable_sensor_clock() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        let param = paths.mipi_host_sysfs(2).join("param");
        fs::create_dir_all(&param).unwrap();

        enable_sensor_clock(&paths, 2, SENSOR_CLOCK_HZ).unwrap();
        assert_eq!(
            fs::read_to_string(param.join("snrclk_freq")).unwrap(),
            "24000000"
        );
        assert_eq!(fs::read_to_string(param.join("snrclk_en")).unwrap(), "1");
    }

    #[test]
    fn test_board_id_trimmed() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        fs::create_dir_all(&paths.socinfo).unwrap();
        fs::write(paths.socinfo.join("board_id"), "  0x0301 \n").unwrap();
        assert_eq!(board_id(&paths).unwrap(), "0x0301");
    }

    #[test]
    fn test_with_root_layout() {
        let paths = BoardPaths::with_root("/tmp/board");
        assert_eq!(
            paths.vcon_node(0),
            PathBuf::from("/tmp/board/proc/device-tree/soc/cam/vcon@0")
        );
        assert_eq!(
            paths.mipi_host_node(3).unwrap(),
            PathBuf::from("/tmp/board/proc/device-tree/soc/cam/mipi_host@3d090000")
        );
        assert_eq!(paths.i2c_device(6), PathBuf::from("/tmp/board/dev/i2c-6"));
        assert_eq!(BoardPaths::default().gpio, PathBuf::from("/sys/class/gpio"));
    }
}
