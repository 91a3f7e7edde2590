// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::platform::BoardPaths;
use std::{
    fs::OpenOptions,
    io,
    os::unix::io::AsRawFd,
    path::PathBuf,
};

/// I2C_RDWR ioctl number from linux/i2c-dev.h
const I2C_RDWR: libc::c_ulong = 0x0707;

/// Read flag of an i2c_msg
const I2C_M_RD: u16 = 0x0001;

/// struct i2c_msg from linux/i2c.h
#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

/// struct i2c_rdwr_ioctl_data from linux/i2c-dev.h
#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

/// Width of the register value to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    Bits8,
    Bits16,
}

impl RegisterWidth {
    pub fn mask(self) -> u16 {
        match self {
            RegisterWidth::Bits8 => 0x00ff,
            RegisterWidth::Bits16 => 0xffff,
        }
    }
}

/// Register reads on a sensor behind an I2C bus.
///
/// Implementations must perform the 16-bit register address write and the
/// value read as one combined transfer.
pub trait I2cBus {
    fn read_register(
        &self,
        bus: u32,
        address: u8,
        register: u16,
        width: RegisterWidth,
    ) -> io::Result<u16>;
}

/// I2C through the Linux `/dev/i2c-N` character devices.
#[derive(Debug, Clone)]
pub struct LinuxI2c {
    dev: PathBuf,
}

impl LinuxI2c {
    pub fn new(paths: &BoardPaths) -> Self {
        LinuxI2c {
            dev: paths.dev.clone(),
        }
    }
}

impl Default for LinuxI2c {
    fn default() -> Self {
        LinuxI2c::new(&BoardPaths::default())
    }
}

impl I2cBus for LinuxI2c {
    fn read_register(
        &self,
        bus: u32,
        address: u8,
        register: u16,
        width: RegisterWidth,
    ) -> io::Result<u16> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.dev.join(format!("i2c-{}", bus)))?;

        let mut send = register.to_be_bytes();
        // Two bytes are read regardless of width; only the first is used
        // for 8-bit registers.
        let mut recv = [0u8; 2];

        let mut msgs = [
            I2cMsg {
                addr: u16::from(address),
                flags: 0,
                len: send.len() as u16,
                buf: send.as_mut_ptr(),
            },
            I2cMsg {
                addr: u16::from(address),
                flags: I2C_M_RD,
                len: recv.len() as u16,
                buf: recv.as_mut_ptr(),
            },
        ];
        let mut data = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // SAFETY: msgs and both buffers outlive the ioctl, and the lengths
        // match the buffers they describe.
        let result = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                I2C_RDWR as _,
                &mut data as *mut I2cRdwrIoctlData,
            )
        };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(match width {
            RegisterWidth::Bits8 => u16::from(recv[0]),
            RegisterWidth::Bits16 => u16::from_be_bytes(recv),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_bus() {
        let dir = TempDir::new().unwrap();
        let i2c = LinuxI2c::new(&BoardPaths::with_root(dir.path()));
        let err = i2c
            .read_register(6, 0x10, 0x0000, RegisterWidth::Bits16)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_width_mask() {
        assert_eq!(RegisterWidth::Bits8.mask(), 0xff);
        assert_eq!(RegisterWidth::Bits16.mask(), 0xffff);
    }

    #[ignore = "test requires a sensor on i2c bus 6 (run with --include-ignored to enable)"]
    #[test]
    fn test_read_imx219_chip_id() {
        let i2c = LinuxI2c::default();
        let id = i2c
            .read_register(6, 0x10, 0x0000, RegisterWidth::Bits16)
            .unwrap();
        assert_eq!(id, 0x0219);
    }
}
