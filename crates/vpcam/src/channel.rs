// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! VSE output channel allocation.
//!
//! The VSE has six output channels with fixed size classes: DS0 scales
//! down from anything up to 4096×3076, DS1 and DS2 down to 1080p, DS3 and
//! DS4 down to 720p and DS5 is the only upscaler. Outputs are assigned
//! greedily in request order; a request that finds no free channel fails
//! the whole pass even when another order would have fit.

use crate::Error;
use log::{debug, error};
use std::fmt;

/// Largest frame any VSE channel accepts.
pub const MAX_VSE_WIDTH: u32 = 4096;
pub const MAX_VSE_HEIGHT: u32 = 3076;

/// Number of VSE output channels.
pub const VSE_CHANNEL_COUNT: usize = 6;

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }

    /// `0×0` stands for "the source size" in output lists.
    pub fn is_zero(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Both dimensions are no larger than `other`'s.
    pub fn fits_within(&self, other: Size) -> bool {
        self.width <= other.width && self.height <= other.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Region of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a frame of `size`.
    pub const fn full(size: Size) -> Self {
        Rect::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// One VSE output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VseChannel {
    Ds0,
    Ds1,
    Ds2,
    Ds3,
    Ds4,
    Ds5,
}

impl VseChannel {
    pub const ALL: [VseChannel; VSE_CHANNEL_COUNT] = [
        VseChannel::Ds0,
        VseChannel::Ds1,
        VseChannel::Ds2,
        VseChannel::Ds3,
        VseChannel::Ds4,
        VseChannel::Ds5,
    ];

    /// Hardware output channel number.
    pub const fn index(self) -> u32 {
        match self {
            VseChannel::Ds0 => 0,
            VseChannel::Ds1 => 1,
            VseChannel::Ds2 => 2,
            VseChannel::Ds3 => 3,
            VseChannel::Ds4 => 4,
            VseChannel::Ds5 => 5,
        }
    }

    pub fn from_index(index: u32) -> Option<VseChannel> {
        VseChannel::ALL.get(index as usize).copied()
    }

    /// Largest output the channel produces.
    pub const fn limit(self) -> Size {
        match self {
            VseChannel::Ds0 | VseChannel::Ds5 => Size::new(MAX_VSE_WIDTH, MAX_VSE_HEIGHT),
            VseChannel::Ds1 | VseChannel::Ds2 => Size::new(1920, 1080),
            VseChannel::Ds3 | VseChannel::Ds4 => Size::new(1280, 720),
        }
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for VseChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DS{}", self.index())
    }
}

/// Channels committed so far in one allocation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelOccupancy(u8);

impl ChannelOccupancy {
    pub fn new() -> Self {
        ChannelOccupancy(0)
    }

    pub fn is_free(&self, channel: VseChannel) -> bool {
        self.0 & channel.bit() == 0
    }

    pub fn commit(&mut self, channel: VseChannel) {
        self.0 |= channel.bit();
    }

    /// Committed channels in channel order.
    pub fn iter(&self) -> impl Iterator<Item = VseChannel> + '_ {
        VseChannel::ALL
            .into_iter()
            .filter(move |channel| !self.is_free(*channel))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Pick a free channel able to scale `src` to `dst`.
pub fn select_channel(occupancy: ChannelOccupancy, src: Size, dst: Size) -> Option<VseChannel> {
    let max = Size::new(MAX_VSE_WIDTH, MAX_VSE_HEIGHT);

    if dst.fits_within(src) && occupancy.is_free(VseChannel::Ds0) && dst.fits_within(max) {
        return Some(VseChannel::Ds0);
    }

    if dst.width <= src.width || dst.height <= src.height {
        let downscaler = [
            VseChannel::Ds1,
            VseChannel::Ds2,
            VseChannel::Ds3,
            VseChannel::Ds4,
        ]
        .into_iter()
        .find(|channel| dst.fits_within(channel.limit()) && occupancy.is_free(*channel));
        if downscaler.is_some() {
            return downscaler;
        }
    }

    if dst.width >= src.width
        && dst.height >= src.height
        && occupancy.is_free(VseChannel::Ds5)
        && dst.fits_within(max)
    {
        return Some(VseChannel::Ds5);
    }

    None
}

/// Output bound to a VSE channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub channel: VseChannel,
    pub size: Size,
}

/// Assign a channel to every output, in order.
///
/// `0×0` outputs are resolved to `src`. The first output without a free
/// channel fails the whole pass with [`Error::NoChannel`].
pub fn allocate_outputs(src: Size, outputs: &[Size]) -> Result<Vec<Assignment>, Error> {
    let mut occupancy = ChannelOccupancy::new();
    let mut assignments = Vec::with_capacity(outputs.len());

    for (index, output) in outputs.iter().enumerate() {
        let size = if output.is_zero() { src } else { *output };
        let channel = select_channel(occupancy, src, size).ok_or_else(|| {
            error!("no VSE channel for output {} ({}) from {}", index, size, src);
            Error::NoChannel {
                index,
                width: size.width,
                height: size.height,
            }
        })?;
        occupancy.commit(channel);
        debug!("VSE {}: {} -> {}", channel, src, size);
        assignments.push(Assignment { channel, size });
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    const UHD: Size = Size::new(3840, 2160);
    const FHD: Size = Size::new(1920, 1080);
    const HD: Size = Size::new(1280, 720);

    fn channels(assignments: &[Assignment]) -> Vec<VseChannel> {
        assignments.iter().map(|a| a.channel).collect()
    }

    #[test]
    fn test_uhd_then_two_fhd() {
        let assigned = allocate_outputs(UHD, &[UHD, FHD, FHD]).unwrap();
        assert_eq!(
            channels(&assigned),
            vec![VseChannel::Ds0, VseChannel::Ds1, VseChannel::Ds2]
        );
    }

    #[test]
    fn test_fourth_fhd_has_no_channel() {
        // DS0 takes the first 1080p output, DS1 and DS2 the next two.
        let err = allocate_outputs(UHD, &[FHD, FHD, FHD, FHD]).unwrap_err();
        match err {
            Error::NoChannel {
                index,
                width,
                height,
            } => assert_eq!((index, width, height), (3, 1920, 1080)),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_three_fhd_from_fhd_source() {
        let assigned = allocate_outputs(FHD, &[FHD, FHD, FHD]).unwrap();
        assert_eq!(
            channels(&assigned),
            vec![VseChannel::Ds0, VseChannel::Ds1, VseChannel::Ds2]
        );
    }

    #[test]
    fn test_all_downscalers_then_exhausted() {
        let assigned = allocate_outputs(UHD, &[UHD, FHD, FHD, HD, HD]).unwrap();
        assert_eq!(channels(&assigned), VseChannel::ALL[..5].to_vec());

        let err = allocate_outputs(UHD, &[UHD, FHD, FHD, HD, HD, HD]).unwrap_err();
        assert!(matches!(err, Error::NoChannel { index: 5, .. }));
    }

    #[test]
    fn test_zero_means_source() {
        let assigned = allocate_outputs(FHD, &[Size::default(), HD]).unwrap();
        assert_eq!(assigned[0].size, FHD);
        assert_eq!(assigned[0].channel, VseChannel::Ds0);
        assert_eq!(assigned[1].channel, VseChannel::Ds1);
    }

    #[test]
    fn test_upscale_uses_ds5() {
        let occupancy = ChannelOccupancy::new();
        assert_eq!(select_channel(occupancy, HD, FHD), Some(VseChannel::Ds5));

        let mut taken = ChannelOccupancy::new();
        taken.commit(VseChannel::Ds5);
        assert_eq!(select_channel(taken, HD, FHD), None);
    }

    #[test]
    fn test_oversized_output_rejected() {
        let occupancy = ChannelOccupancy::new();
        assert_eq!(select_channel(occupancy, FHD, Size::new(4608, 3076)), None);
        assert_eq!(
            select_channel(occupancy, Size::new(4096, 3076), Size::new(4096, 3076)),
            Some(VseChannel::Ds0)
        );
    }

    #[test]
    fn test_mixed_scale_needs_a_small_class() {
        let occupancy = ChannelOccupancy::new();
        // Narrower but taller than the source: only a downscaler that fits
        // the output can serve it.
        assert_eq!(
            select_channel(occupancy, FHD, Size::new(1280, 1440)),
            None
        );
        assert_eq!(
            select_channel(occupancy, Size::new(640, 1080), Size::new(1280, 720)),
            Some(VseChannel::Ds1)
        );
    }

    #[test]
    fn test_occupancy_iter() {
        let mut occupancy = ChannelOccupancy::new();
        occupancy.commit(VseChannel::Ds3);
        occupancy.commit(VseChannel::Ds0);
        assert!(!occupancy.is_free(VseChannel::Ds0));
        assert!(occupancy.is_free(VseChannel::Ds1));
        assert_eq!(
            occupancy.iter().collect::<Vec<_>>(),
            vec![VseChannel::Ds0, VseChannel::Ds3]
        );
        assert_eq!(occupancy.bits(), 0b1001);
    }

    #[test]
    fn test_channel_index_round_trip() {
        for channel in VseChannel::ALL {
            assert_eq!(VseChannel::from_index(channel.index()), Some(channel));
        }
        assert_eq!(VseChannel::from_index(6), None);
        assert_eq!(VseChannel::Ds4.to_string(), "DS4");
    }

    #[test]
    fn test_random_requests_never_double_assign() {
        let mut rng = rand::rng();
        let sizes = [UHD, FHD, HD, Size::new(640, 480), Size::new(4096, 3072)];

        for _ in 0..500 {
            let src = sizes[rng.random_range(0..sizes.len())];
            let count = rng.random_range(1..=7);
            let outputs: Vec<Size> = (0..count)
                .map(|_| sizes[rng.random_range(0..sizes.len())])
                .collect();

            match allocate_outputs(src, &outputs) {
                Ok(assigned) => {
                    let unique: HashSet<_> = assigned.iter().map(|a| a.channel).collect();
                    assert_eq!(unique.len(), assigned.len());
                    for a in &assigned {
                        assert!(a.size.fits_within(a.channel.limit()));
                    }
                }
                Err(Error::NoChannel { index, .. }) => assert!(index < outputs.len()),
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
    }
}
