// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Sensor discovery on a camera interface.
//!
//! [`SensorProber::probe`] walks the catalog for one interface: it powers
//! each profile's GPIO lines, reads the chip id at the profile's candidate
//! addresses, collects every profile that verified and hands them to
//! [`select`](crate::select::select) for the final pick. The result is a
//! [`ResolvedSensor`], a copy of the winning profile carrying the address
//! that answered and the PHY the interface is routed to.

use crate::{
    catalog::{self, SensorProfile},
    chip_id::{read_chip_id, ChipIdCheck},
    gpio::{GpioBackend, Level, PowerSequencer, PowerTiming, SysfsGpio},
    i2c::{I2cBus, LinuxI2c},
    platform::{self, BoardPaths, MipiProperties, VconProperties},
    select, Error,
};
use log::{debug, info, warn};

pub use crate::select::SensorRequest;

/// Most verified profiles kept per probe.
pub const MAX_MATCHES: usize = 10;

/// How far to go through a profile's candidate addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressScan {
    /// Give up on a profile after the first address that does not verify.
    #[default]
    FailFast,
    /// Try every candidate address before giving up on a profile.
    Exhaustive,
}

/// A catalog profile bound to the interface it was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSensor {
    /// Copy of the catalog entry with `i2c_addr` and `vin.mipi_rx`
    /// replaced by the probed values.
    pub profile: SensorProfile,
    pub interface: u32,
    pub i2c_bus: u32,
    pub i2c_addr: u8,
    pub mipi_rx: u32,
    /// The MIPI host supplies the sensor clock.
    pub mclk_configured: bool,
}

impl AsRef<SensorProfile> for ResolvedSensor {
    fn as_ref(&self) -> &SensorProfile {
        &self.profile
    }
}

/// Discovers which catalog sensor is attached to an interface.
///
/// The prober owns the power sequencer, so the "last line sequenced"
/// shortcut is scoped to one prober. Probing from several threads needs
/// one prober per thread or external locking.
#[derive(Debug)]
pub struct SensorProber<B = LinuxI2c, G = SysfsGpio> {
    paths: BoardPaths,
    i2c: B,
    power: PowerSequencer<G>,
    catalog: Vec<SensorProfile>,
    scan: AddressScan,
}

impl SensorProber<LinuxI2c, SysfsGpio> {
    /// Prober using `/dev/i2c-N` and sysfs GPIO under `paths`.
    pub fn new(paths: BoardPaths) -> Self {
        let i2c = LinuxI2c::new(&paths);
        let gpio = SysfsGpio::new(&paths);
        SensorProber::with_backends(paths, i2c, gpio, PowerTiming::default())
    }
}

impl<B: I2cBus, G: GpioBackend> SensorProber<B, G> {
    pub fn with_backends(paths: BoardPaths, i2c: B, gpio: G, timing: PowerTiming) -> Self {
        SensorProber {
            paths,
            i2c,
            power: PowerSequencer::new(gpio, timing),
            catalog: catalog::catalog().to_vec(),
            scan: AddressScan::default(),
        }
    }

    pub fn with_address_scan(self, scan: AddressScan) -> Self {
        SensorProber { scan, ..self }
    }

    /// Probe against `profiles` instead of the compiled catalog.
    pub fn with_catalog(self, profiles: Vec<SensorProfile>) -> Self {
        SensorProber {
            catalog: profiles,
            ..self
        }
    }

    pub fn paths(&self) -> &BoardPaths {
        &self.paths
    }

    pub fn power(&self) -> &PowerSequencer<G> {
        &self.power
    }

    /// Resolve `interface` to one sensor honouring `request`.
    pub fn probe(
        &mut self,
        interface: u32,
        request: &SensorRequest,
    ) -> Result<ResolvedSensor, Error> {
        let found = self.scan(interface)?;
        match select::select(&found, request) {
            Some(sensor) => Ok(*sensor),
            None => {
                debug!(
                    "{} sensors on interface {}, none matching {:?}",
                    found.len(),
                    interface,
                    request
                );
                Err(Error::SensorNotFound {
                    interface: Some(interface),
                })
            }
        }
    }

    /// Every catalog profile verifying on `interface`, in catalog order,
    /// up to [`MAX_MATCHES`].
    pub fn scan(&mut self, interface: u32) -> Result<Vec<ResolvedSensor>, Error> {
        if platform::interface_in_use(&self.paths, interface) {
            warn!(
                "mipi host {} is already in use, please use another camera interface",
                interface
            );
            return Err(Error::InterfaceBusy(interface));
        }

        let mclk_configured = MipiProperties::read(&self.paths, interface).mclk_configured();
        let vcon = VconProperties::read(&self.paths, interface);

        if mclk_configured {
            if let Err(err) =
                platform::enable_sensor_clock(&self.paths, interface, platform::SENSOR_CLOCK_HZ)
            {
                warn!("failed to enable sensor clock on mipi host {}: {}", interface, err);
            }
        } else {
            debug!("mipi host {} sensor clock is not configured", interface);
        }

        debug!(
            "searching camera sensor on {} i2c bus {} mipi rx phy {}",
            vcon.device_path.display(),
            vcon.bus,
            vcon.routed_phy()
        );

        if !vcon.enabled() {
            debug!("{} is disabled", vcon.device_path.display());
            return Err(Error::SensorNotFound {
                interface: Some(interface),
            });
        }

        let mut found = Vec::new();
        for index in 0..self.catalog.len() {
            let profile = self.catalog[index];
            self.power_up(&vcon, &profile);

            let Some(address) = self.verify(&vcon, &profile) else {
                continue;
            };

            info!(
                "found sensor {} on mipi rx {} i2c-{} 0x{:02x} ({})",
                profile.name,
                vcon.routed_phy(),
                vcon.bus,
                address,
                profile.config
            );

            let mut resolved = profile;
            resolved.i2c_addr = address;
            resolved.vin.mipi_rx = vcon.routed_phy();
            found.push(ResolvedSensor {
                profile: resolved,
                interface,
                i2c_bus: vcon.bus,
                i2c_addr: address,
                mipi_rx: vcon.routed_phy(),
                mclk_configured,
            });

            if found.len() == MAX_MATCHES {
                break;
            }
        }

        if found.is_empty() {
            return Err(Error::SensorNotFound {
                interface: Some(interface),
            });
        }
        Ok(found)
    }

    /// Sequence every `gpio_oth` line the profile's enable mask selects.
    fn power_up(&mut self, vcon: &VconProperties, profile: &SensorProfile) {
        for (bit, line) in vcon.gpio_oth.iter().copied().enumerate() {
            if line == 0 || profile.gpio_enable & (1 << bit) == 0 {
                continue;
            }
            let active = if profile.gpio_level & (1 << bit) != 0 {
                Level::Low
            } else {
                Level::High
            };
            if let Err(err) = self.power.apply(line, active) {
                warn!("{}: power sequence on gpio {} failed: {}", profile.name, line, err);
            }
        }
    }

    /// Address at which the profile's chip id verified.
    fn verify(&self, vcon: &VconProperties, profile: &SensorProfile) -> Option<u8> {
        for address in profile.candidate_addresses() {
            match read_chip_id(&self.i2c, vcon.bus, address, profile) {
                ChipIdCheck::Verified => return Some(address),
                _ if self.scan == AddressScan::FailFast => return None,
                _ => continue,
            }
        }
        None
    }
}
