// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Frame exchange with hardware nodes.
//!
//! [`FrameExchange::get_frame`] blocks until a node produces a buffer on
//! one output and lends it to the caller as an [`ImageFrame`]. The buffer
//! goes back to the node's pool when the frame is released, either through
//! [`ImageFrame::release`] or when it is dropped.
//!
//! At most one frame per source and channel can be held at a time. Waits
//! on different channels do not block each other, so one thread per
//! output is the expected consumer layout.

use crate::{
    stage::{stage_error, StageKind},
    vnode::{NodeHandle, Plane, RawImage, VnodeApi, STATUS_TIMEOUT},
    Error,
};
use log::{debug, warn};
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::Write,
    path::Path,
    slice,
    sync::{Mutex, MutexGuard, PoisonError},
};
use unix_ts::Timestamp;

/// Default wait for a VSE output frame.
pub const VSE_FRAME_TIMEOUT_MS: u32 = 2000;

/// Stage output a frame is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSource {
    /// Raw sensor data from the VIN.
    Raw,
    /// NV12 output of the ISP.
    Isp,
    /// NV12 output of a VSE channel.
    Vse(u32),
    /// Corrected output of the GDC.
    Gdc,
}

impl FrameSource {
    pub fn stage(self) -> StageKind {
        match self {
            FrameSource::Raw => StageKind::Vin,
            FrameSource::Isp => StageKind::Isp,
            FrameSource::Vse(_) => StageKind::Vse,
            FrameSource::Gdc => StageKind::Gdc,
        }
    }

    /// Node output channel the frame is read from.
    pub fn channel(self) -> u32 {
        match self {
            FrameSource::Vse(channel) => channel,
            _ => 0,
        }
    }
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameSource::Raw => write!(f, "raw"),
            FrameSource::Isp => write!(f, "isp"),
            FrameSource::Vse(channel) => write!(f, "vse{}", channel),
            FrameSource::Gdc => write!(f, "gdc"),
        }
    }
}

/// Frames missed between two consecutively observed sequence ids.
///
/// The first frame on a channel reports none, as does a sequence id that
/// does not move forward.
pub fn lost_frames(last: Option<u32>, current: u32) -> u32 {
    match last {
        Some(last) => current.saturating_sub(last).saturating_sub(1),
        None => 0,
    }
}

#[derive(Debug, Default)]
struct Slot {
    outstanding: bool,
    last_frame_id: Option<u32>,
}

/// Outstanding-frame and sequence bookkeeping for every source.
#[derive(Debug, Default)]
pub struct FrameExchange {
    slots: Mutex<HashMap<FrameSource, Slot>>,
}

impl FrameExchange {
    pub fn new() -> Self {
        FrameExchange::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<FrameSource, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, source: FrameSource) -> Result<(), Error> {
        let mut slots = self.slots();
        let slot = slots.entry(source).or_default();
        if slot.outstanding {
            return Err(Error::FrameOutstanding);
        }
        slot.outstanding = true;
        Ok(())
    }

    fn unclaim(&self, source: FrameSource) {
        if let Some(slot) = self.slots().get_mut(&source) {
            slot.outstanding = false;
        }
    }

    fn observe(&self, source: FrameSource, frame_id: u32) -> u32 {
        let mut slots = self.slots();
        let slot = slots.entry(source).or_default();
        let lost = lost_frames(slot.last_frame_id, frame_id);
        slot.last_frame_id = Some(frame_id);
        lost
    }

    /// Forget the sequence history, keeping outstanding frames claimed.
    pub fn reset_sequence(&self) {
        for slot in self.slots().values_mut() {
            slot.last_frame_id = None;
        }
    }

    /// Wait up to `timeout_ms` for the next frame from `node`.
    pub fn get_frame<'a>(
        &'a self,
        api: &'a dyn VnodeApi,
        node: NodeHandle,
        source: FrameSource,
        timeout_ms: u32,
    ) -> Result<ImageFrame<'a>, Error> {
        self.claim(source)?;

        match api.get_frame(node, source.channel(), timeout_ms) {
            Ok(raw) => {
                let lost = self.observe(source, raw.frame_id);
                if lost > 0 {
                    debug!("{}: lost {} frames before {}", source, lost, raw.frame_id);
                }
                Ok(ImageFrame {
                    exchange: self,
                    api,
                    node,
                    source,
                    raw,
                    lost,
                    released: false,
                })
            }
            Err(status) => {
                self.unclaim(source);
                if status == STATUS_TIMEOUT {
                    debug!("{}: no frame after {} ms", source, timeout_ms);
                    Err(Error::Timeout { timeout_ms })
                } else {
                    Err(stage_error(source.stage(), "get frame", status))
                }
            }
        }
    }
}

/// A frame lent by a hardware node.
pub struct ImageFrame<'a> {
    exchange: &'a FrameExchange,
    api: &'a dyn VnodeApi,
    node: NodeHandle,
    source: FrameSource,
    raw: RawImage,
    lost: u32,
    released: bool,
}

impl ImageFrame<'_> {
    pub fn source(&self) -> FrameSource {
        self.source
    }

    pub fn frame_id(&self) -> u32 {
        self.raw.frame_id
    }

    pub fn width(&self) -> u32 {
        self.raw.width
    }

    pub fn height(&self) -> u32 {
        self.raw.height
    }

    pub fn stride(&self) -> u32 {
        self.raw.stride
    }

    pub fn vstride(&self) -> u32 {
        self.raw.vstride
    }

    /// Frames missed on this channel since the previous one was taken.
    pub fn lost_frames(&self) -> u32 {
        self.lost
    }

    /// Capture timestamp in hardware ticks.
    pub fn hw_timestamp(&self) -> u64 {
        self.raw.timestamp
    }

    /// System time at which the frame was captured.
    pub fn timestamp(&self) -> Timestamp {
        let ns = self.raw.sys_timestamp;
        Timestamp::new((ns / 1_000_000_000) as i64, (ns % 1_000_000_000) as u32)
    }

    pub fn planes(&self) -> &[Plane] {
        &self.raw.planes
    }

    /// CPU view of plane `index`, if the plane is mapped.
    pub fn plane_data(&self, index: usize) -> Option<&[u8]> {
        let plane = self.raw.planes.get(index)?;
        if plane.data.is_null() || plane.size == 0 {
            return None;
        }
        // SAFETY: the node keeps the mapping alive until the frame is
        // released, which needs `self` by value or drop.
        Some(unsafe { slice::from_raw_parts(plane.data, plane.size) })
    }

    /// Hand the buffer back to the node, reporting any failure.
    pub fn release(mut self) -> Result<(), Error> {
        self.release_buffer()
    }

    fn release_buffer(&mut self) -> Result<(), Error> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let result = self
            .api
            .release_frame(self.node, self.source.channel(), &mut self.raw)
            .map_err(|status| stage_error(self.source.stage(), "release frame", status));
        self.exchange.unclaim(self.source);
        result
    }

    /// Write the Y plane followed by the interleaved UV plane.
    pub fn dump_nv12<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let luma = self.plane_data(0).ok_or_else(|| unmapped(0))?;
        let chroma = self.plane_data(1).ok_or_else(|| unmapped(1))?;
        let mut file = File::create(path)?;
        file.write_all(luma)?;
        file.write_all(chroma)?;
        Ok(())
    }

    /// Write the first plane only, for raw and single-plane formats.
    pub fn dump_1plane<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let data = self.plane_data(0).ok_or_else(|| unmapped(0))?;
        File::create(path)?.write_all(data)?;
        Ok(())
    }
}

fn unmapped(index: usize) -> Error {
    Error::InvalidArgument(format!("frame plane {} is not mapped", index))
}

impl Drop for ImageFrame<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release_buffer() {
            warn!("{}: frame {} release: {}", self.source, self.raw.frame_id, err);
        }
    }
}

impl fmt::Debug for ImageFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ImageFrame")
            .field("source", &self.source)
            .field("frame_id", &self.raw.frame_id)
            .field("width", &self.raw.width)
            .field("height", &self.raw.height)
            .field("lost", &self.lost)
            .finish()
    }
}

impl fmt::Display for ImageFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} frame {} {}x{} stride {} lost {}",
            self.source,
            self.raw.frame_id,
            self.raw.width,
            self.raw.height,
            self.raw.stride,
            self.lost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::{tests::RecordingApi, NodeKind};

    #[test]
    fn test_lost_frames() {
        assert_eq!(lost_frames(None, 10), 0);
        assert_eq!(lost_frames(Some(10), 11), 0);
        assert_eq!(lost_frames(Some(11), 14), 2);
        assert_eq!(lost_frames(Some(14), 14), 0);
        assert_eq!(lost_frames(Some(20), 3), 0);
    }

    #[test]
    fn test_sequence_gap() {
        let api = RecordingApi::new().with_frame_ids(&[10, 11, 14]);
        let vse = api.open(NodeKind::Vse).unwrap();
        let exchange = FrameExchange::new();

        let mut lost = Vec::new();
        for _ in 0..3 {
            let frame = exchange
                .get_frame(&api, vse, FrameSource::Vse(1), VSE_FRAME_TIMEOUT_MS)
                .unwrap();
            lost.push(frame.lost_frames());
            frame.release().unwrap();
        }
        assert_eq!(lost, vec![0, 0, 2]);
        assert_eq!(api.count("release_frame vse ch1"), 3);
    }

    #[test]
    fn test_one_outstanding_per_channel() {
        let api = RecordingApi::new().with_frame_ids(&[1, 2, 3]);
        let vse = api.open(NodeKind::Vse).unwrap();
        let exchange = FrameExchange::new();

        let held = exchange
            .get_frame(&api, vse, FrameSource::Vse(0), 100)
            .unwrap();
        assert!(matches!(
            exchange.get_frame(&api, vse, FrameSource::Vse(0), 100),
            Err(Error::FrameOutstanding)
        ));

        // Another channel is independent.
        let other = exchange
            .get_frame(&api, vse, FrameSource::Vse(1), 100)
            .unwrap();
        assert_eq!(other.frame_id(), 2);

        drop(held);
        assert_eq!(api.count("release_frame vse ch0"), 1);
        let next = exchange
            .get_frame(&api, vse, FrameSource::Vse(0), 100)
            .unwrap();
        assert_eq!(next.frame_id(), 3);
    }

    #[test]
    fn test_timeout_leaves_channel_free() {
        let api = RecordingApi::new();
        let isp = api.open(NodeKind::Isp).unwrap();
        let exchange = FrameExchange::new();

        assert!(matches!(
            exchange.get_frame(&api, isp, FrameSource::Isp, 50),
            Err(Error::Timeout { timeout_ms: 50 })
        ));
        assert!(matches!(
            exchange.get_frame(&api, isp, FrameSource::Isp, 50),
            Err(Error::Timeout { .. })
        ));
        assert_eq!(api.count("release_frame"), 0);
    }

    #[test]
    fn test_get_failure_is_stage_error() {
        let api = RecordingApi::failing("get_frame vin ch0");
        let vin = api.open(NodeKind::Vin).unwrap();
        let exchange = FrameExchange::new();
        assert!(matches!(
            exchange.get_frame(&api, vin, FrameSource::Raw, 50),
            Err(Error::Stage {
                kind: StageKind::Vin,
                op: "get frame",
                ..
            })
        ));
    }

    #[test]
    fn test_release_failure_reported() {
        let api = RecordingApi::failing("release_frame gdc ch0").with_frame_ids(&[5, 6]);
        let gdc = api.open(NodeKind::Gdc).unwrap();
        let exchange = FrameExchange::new();

        let frame = exchange.get_frame(&api, gdc, FrameSource::Gdc, 50).unwrap();
        assert!(frame.release().is_err());
        // The slot is free again even though the node refused the buffer.
        assert!(exchange.get_frame(&api, gdc, FrameSource::Gdc, 50).is_ok());
    }

    #[test]
    fn test_frame_accessors() {
        let api = RecordingApi::new().with_frame_ids(&[30]);
        let vse = api.open(NodeKind::Vse).unwrap();
        let exchange = FrameExchange::new();
        let frame = exchange
            .get_frame(&api, vse, FrameSource::Vse(2), 100)
            .unwrap();

        assert_eq!((frame.width(), frame.height()), (64, 32));
        assert_eq!(frame.stride(), 64);
        assert_eq!(frame.planes().len(), 2);
        assert_eq!(frame.plane_data(0).unwrap().len(), 64 * 32);
        assert_eq!(frame.plane_data(1).unwrap().len(), 64 * 16);
        assert!(frame.plane_data(2).is_none());
        assert_eq!(frame.timestamp(), Timestamp::new(1_700_000_000, 30));
        assert_eq!(frame.to_string(), "vse2 frame 30 64x32 stride 64 lost 0");
    }

    #[test]
    fn test_dump_nv12() {
        let dir = tempfile::tempdir().unwrap();
        let api = RecordingApi::new().with_frame_ids(&[1]);
        let vse = api.open(NodeKind::Vse).unwrap();
        let exchange = FrameExchange::new();
        let frame = exchange
            .get_frame(&api, vse, FrameSource::Vse(0), 100)
            .unwrap();

        let nv12 = dir.path().join("frame.nv12");
        frame.dump_nv12(&nv12).unwrap();
        assert_eq!(std::fs::read(&nv12).unwrap().len(), 64 * 32 * 3 / 2);

        let y = dir.path().join("frame.y");
        frame.dump_1plane(&y).unwrap();
        assert!(std::fs::read(&y).unwrap().iter().all(|b| *b == 0x80));
    }

    #[test]
    fn test_reset_sequence() {
        let api = RecordingApi::new().with_frame_ids(&[10, 20]);
        let vse = api.open(NodeKind::Vse).unwrap();
        let exchange = FrameExchange::new();
        exchange
            .get_frame(&api, vse, FrameSource::Vse(0), 100)
            .unwrap()
            .release()
            .unwrap();
        exchange.reset_sequence();
        let frame = exchange
            .get_frame(&api, vse, FrameSource::Vse(0), 100)
            .unwrap();
        assert_eq!(frame.lost_frames(), 0);
    }
}
