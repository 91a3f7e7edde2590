// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{
    catalog::SensorProfile,
    i2c::{I2cBus, RegisterWidth},
};
use log::debug;

/// 8-bit chip id meaning "unreadable, trust the profile".
pub const WILDCARD_8BIT: u16 = 0x005a;

/// 16-bit chip id meaning "unreadable, trust the profile".
pub const WILDCARD_16BIT: u16 = 0xa55a;

/// Outcome of one chip id read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipIdCheck {
    /// The sensor answered with the expected id, or the profile uses a
    /// wildcard id and the sensor answered at all.
    Verified,
    /// The sensor answered with another id.
    Mismatch(u16),
    /// Nothing answered at the address.
    NoResponse,
}

impl ChipIdCheck {
    pub fn verified(self) -> bool {
        self == ChipIdCheck::Verified
    }
}

/// Read the chip id register of `profile` at `address` on `bus`.
///
/// Profiles whose expected id fits in one byte use an 8-bit read, others a
/// 16-bit read; the comparison is masked to the same width. I/O errors are
/// reported as [`ChipIdCheck::NoResponse`] since probing speculatively
/// touches addresses where nothing is fitted.
pub fn read_chip_id<B: I2cBus + ?Sized>(
    i2c: &B,
    bus: u32,
    address: u8,
    profile: &SensorProfile,
) -> ChipIdCheck {
    let (width, wildcard) = if profile.chip_id_is_16bit() {
        (RegisterWidth::Bits16, WILDCARD_16BIT)
    } else {
        (RegisterWidth::Bits8, WILDCARD_8BIT)
    };

    let value = match i2c.read_register(bus, address, profile.chip_id_reg, width) {
        Ok(value) => value & width.mask(),
        Err(err) => {
            debug!(
                "{}: no response at i2c-{} 0x{:02x}: {}",
                profile.name, bus, address, err
            );
            return ChipIdCheck::NoResponse;
        }
    };

    let expected = profile.chip_id & width.mask();
    if profile.chip_id == wildcard || value == expected {
        ChipIdCheck::Verified
    } else {
        debug!(
            "{}: expected chip id 0x{:04x}, read 0x{:04x} at i2c-{} 0x{:02x}",
            profile.name, expected, value, bus, address
        );
        ChipIdCheck::Mismatch(value)
    }
}
