// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{
    channel::{Rect, Size},
    stage::{stage_error, Stage, StageKind, StageLinks},
    vnode::{NodeHandle, RegionHandle, VnodeApi},
    Error,
};
use log::{debug, warn};

/// Most overlay regions one pipeline carries.
pub const MAX_REGIONS: usize = 4;

/// Initial value of every bitmap byte.
pub const BITMAP_FILL: u8 = 0x0F;

#[derive(Debug)]
struct Region {
    rect: Rect,
    bitmap: Vec<u8>,
    created: bool,
    attached: bool,
}

impl Region {
    fn handle(index: usize) -> RegionHandle {
        index as RegionHandle
    }
}

/// Overlay regions attached to the VSE.
///
/// Region `i` is drawn on VSE output channel `i` at the rectangle's
/// origin. Regions are detached and destroyed before the VSE closes, which
/// the pipeline guarantees by deinitialising stages in reverse order.
#[derive(Debug)]
pub struct OsdStage {
    regions: Vec<Region>,
    vse: Option<NodeHandle>,
}

impl OsdStage {
    pub fn new(regions: &[Rect]) -> Result<Self, Error> {
        if regions.len() > MAX_REGIONS {
            return Err(Error::InvalidArgument(format!(
                "{} OSD regions requested, at most {} supported",
                regions.len(),
                MAX_REGIONS
            )));
        }
        if let Some(rect) = regions.iter().find(|rect| rect.size().is_zero()) {
            return Err(Error::InvalidArgument(format!(
                "OSD region at ({}, {}) has no area",
                rect.x, rect.y
            )));
        }

        Ok(OsdStage {
            regions: regions
                .iter()
                .map(|rect| Region {
                    rect: *rect,
                    bitmap: Vec::new(),
                    created: false,
                    attached: false,
                })
                .collect(),
            vse: None,
        })
    }

    pub fn regions(&self) -> impl Iterator<Item = Rect> + '_ {
        self.regions.iter().map(|region| region.rect)
    }

    /// Replace the pixels of region `index`. `bitmap` holds one byte per
    /// pixel of the region.
    pub fn set_bitmap(
        &mut self,
        api: &dyn VnodeApi,
        index: usize,
        bitmap: &[u8],
    ) -> Result<(), Error> {
        let region = self.regions.get_mut(index).ok_or_else(|| {
            Error::InvalidArgument(format!("no OSD region {}", index))
        })?;
        if !region.created {
            return Err(Error::InvalidArgument(format!(
                "OSD region {} is not initialised",
                index
            )));
        }
        if bitmap.len() != region.bitmap.len() {
            return Err(Error::InvalidArgument(format!(
                "OSD region {} needs {} bytes, got {}",
                index,
                region.bitmap.len(),
                bitmap.len()
            )));
        }

        region.bitmap.copy_from_slice(bitmap);
        api.set_region_bitmap(Region::handle(index), region.rect.size(), &mut region.bitmap)
            .map_err(|status| stage_error(StageKind::Osd, "set bitmap", status))
    }

    fn create(
        region: &mut Region,
        index: usize,
        api: &dyn VnodeApi,
        vse: NodeHandle,
    ) -> Result<(), Error> {
        let handle = Region::handle(index);
        let size: Size = region.rect.size();
        api.create_region(handle, size)
            .map_err(|status| stage_error(StageKind::Osd, "create region", status))?;
        region.created = true;
        region.bitmap = vec![BITMAP_FILL; size.area() as usize];

        api.attach_region(handle, vse, index as u32, region.rect.x, region.rect.y)
            .map_err(|status| stage_error(StageKind::Osd, "attach region", status))?;
        region.attached = true;
        debug!("OSD region {} attached at {:?}", index, region.rect);
        Ok(())
    }

    fn release(&mut self, api: &dyn VnodeApi) -> Result<(), Error> {
        let mut result = Ok(());
        for (index, region) in self.regions.iter_mut().enumerate().rev() {
            let handle = Region::handle(index);
            if region.attached {
                if let Some(vse) = self.vse {
                    if let Err(status) = api.detach_region(handle, vse, index as u32) {
                        result = result.and(Err(stage_error(
                            StageKind::Osd,
                            "detach region",
                            status,
                        )));
                    }
                }
                region.attached = false;
            }
            if region.created {
                if let Err(status) = api.destroy_region(handle) {
                    result = result.and(Err(stage_error(
                        StageKind::Osd,
                        "destroy region",
                        status,
                    )));
                }
                region.created = false;
            }
            region.bitmap = Vec::new();
        }
        self.vse = None;
        result
    }
}

impl Stage for OsdStage {
    fn kind(&self) -> StageKind {
        StageKind::Osd
    }

    fn init(&mut self, api: &dyn VnodeApi, links: &mut StageLinks) -> Result<(), Error> {
        let vse = links.vse.ok_or_else(|| {
            Error::InvalidArgument("OSD regions need an initialised VSE stage".to_string())
        })?;
        self.vse = Some(vse);

        for index in 0..self.regions.len() {
            if let Err(err) = OsdStage::create(&mut self.regions[index], index, api, vse) {
                if let Err(release) = self.release(api) {
                    warn!("OSD release during rollback failed: {}", release);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn deinit(&mut self, api: &dyn VnodeApi, _links: &mut StageLinks) -> Result<(), Error> {
        self.release(api)
    }

    fn as_osd_mut(&mut self) -> Option<&mut OsdStage> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::tests::RecordingApi;

    fn links() -> StageLinks {
        StageLinks {
            camera: None,
            vse: Some(7),
        }
    }

    #[test]
    fn test_regions_attach_to_matching_channel() {
        let api = RecordingApi::new();
        let mut osd =
            OsdStage::new(&[Rect::new(0, 0, 16, 8), Rect::new(32, 32, 8, 8)]).unwrap();
        osd.init(&api, &mut links()).unwrap();
        osd.deinit(&api, &mut links()).unwrap();

        assert_eq!(
            api.calls(),
            vec![
                "create_region 0",
                "attach_region 0 node7 ch0",
                "create_region 1",
                "attach_region 1 node7 ch1",
                "detach_region 1",
                "destroy_region 1",
                "detach_region 0",
                "destroy_region 0",
            ]
        );
    }

    #[test]
    fn test_too_many_regions() {
        let rects = [Rect::new(0, 0, 4, 4); MAX_REGIONS + 1];
        assert!(matches!(
            OsdStage::new(&rects),
            Err(Error::InvalidArgument(_))
        ));
        assert!(OsdStage::new(&rects[..MAX_REGIONS]).is_ok());
    }

    #[test]
    fn test_needs_vse() {
        let api = RecordingApi::new();
        let mut osd = OsdStage::new(&[Rect::new(0, 0, 4, 4)]).unwrap();
        assert!(osd.init(&api, &mut StageLinks::default()).is_err());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_bitmap_filled_and_replaced() {
        let api = RecordingApi::new();
        let mut osd = OsdStage::new(&[Rect::new(0, 0, 4, 2)]).unwrap();
        osd.init(&api, &mut links()).unwrap();
        assert_eq!(osd.regions[0].bitmap, vec![BITMAP_FILL; 8]);

        osd.set_bitmap(&api, 0, &[1; 8]).unwrap();
        assert_eq!(osd.regions[0].bitmap, vec![1; 8]);
        assert_eq!(api.count("set_region_bitmap 0"), 1);

        assert!(osd.set_bitmap(&api, 0, &[1; 7]).is_err());
        assert!(osd.set_bitmap(&api, 1, &[1; 8]).is_err());
    }

    #[test]
    fn test_attach_failure_destroys_created_regions() {
        let api = RecordingApi::failing("attach_region 1 node7 ch1");
        let mut osd =
            OsdStage::new(&[Rect::new(0, 0, 4, 4), Rect::new(8, 8, 4, 4)]).unwrap();
        assert!(osd.init(&api, &mut links()).is_err());

        assert_eq!(api.count("create_region"), api.count("destroy_region"));
        assert_eq!(api.count("detach_region"), 1);

        // Already released.
        osd.deinit(&api, &mut links()).unwrap();
        assert_eq!(api.count("destroy_region"), 2);
    }

    #[test]
    fn test_rollback_release_failure_keeps_first_error() {
        let api = RecordingApi::failing("create_region 2").and_failing("destroy_region 1");
        let mut osd = OsdStage::new(&[
            Rect::new(0, 0, 4, 4),
            Rect::new(8, 8, 4, 4),
            Rect::new(16, 16, 4, 4),
        ])
        .unwrap();

        let err = osd.init(&api, &mut links()).unwrap_err();
        assert!(err.to_string().contains("create region"), "{}", err);

        // Region 0 is still torn down after region 1 fails to go away.
        assert_eq!(api.count("detach_region"), 2);
        assert_eq!(api.count("destroy_region"), 2);
        assert!(api.calls().contains(&"destroy_region 0".to_string()));
    }
}
