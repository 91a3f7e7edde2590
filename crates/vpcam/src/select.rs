// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::catalog::SensorProfile;
use log::info;

/// Caller constraints on the sensor mode; `None` leaves a dimension open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

impl SensorRequest {
    pub fn with_size(self, width: u32, height: u32) -> SensorRequest {
        SensorRequest {
            width: Some(width),
            height: Some(height),
            fps: self.fps,
        }
    }

    pub fn with_fps(self, fps: u32) -> SensorRequest {
        SensorRequest {
            width: self.width,
            height: self.height,
            fps: Some(fps),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.fps.is_none()
    }

    /// Every constrained dimension equals the profile's.
    pub fn matches(&self, profile: &SensorProfile) -> bool {
        self.width.map_or(true, |w| w == profile.width)
            && self.height.map_or(true, |h| h == profile.height)
            && self.fps.map_or(true, |fps| fps == profile.fps)
    }
}

impl AsRef<SensorProfile> for SensorProfile {
    fn as_ref(&self) -> &SensorProfile {
        self
    }
}

/// Pick one of the verified `candidates` for `request`.
///
/// Candidates failing the request are dropped. Among the rest the largest
/// frame wins, then the higher frame rate, then the earlier candidate.
pub fn select<'a, T: AsRef<SensorProfile>>(
    candidates: &'a [T],
    request: &SensorRequest,
) -> Option<&'a T> {
    let mut filtered = candidates
        .iter()
        .filter(|candidate| request.matches(candidate.as_ref()));

    let mut best = filtered.next()?;
    let mut count = 1;
    for candidate in filtered {
        count += 1;
        let (profile, current) = (candidate.as_ref(), best.as_ref());
        if profile.area() > current.area()
            || (profile.area() == current.area() && profile.fps > current.fps)
        {
            best = candidate;
        }
    }

    if count > 1 {
        let profile = best.as_ref();
        info!(
            "Auto-selected sensor: {} (Resolution: {}x{}@{}fps) out of {} matches",
            profile.name, profile.width, profile.height, profile.fps, count
        );
    }

    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, catalog};
    use rand::seq::SliceRandom;

    fn profile(name: &str) -> SensorProfile {
        *catalog::find(name).unwrap()
    }

    #[test]
    fn test_single_match() {
        let candidates = [profile("imx219-1632x1232-30fps")];
        let picked = select(&candidates, &SensorRequest::default()).unwrap();
        assert_eq!(picked.name, "imx219-1632x1232-30fps");
    }

    #[test]
    fn test_larger_resolution_wins() {
        let candidates = [profile("sc230ai-30fps"), profile("sc850sl-30fps")];
        let picked = select(&candidates, &SensorRequest::default()).unwrap();
        assert_eq!((picked.width, picked.height), (3840, 2160));
    }

    #[test]
    fn test_higher_fps_breaks_tie() {
        let candidates = [profile("imx586-30fps-4lane"), profile("imx415-60fps-4lane")];
        let picked = select(&candidates, &SensorRequest::default()).unwrap();
        assert_eq!(picked.fps, 60);
    }

    #[test]
    fn test_full_tie_keeps_first() {
        let candidates = [profile("sc230ai-dol2-30fps"), profile("sc230ai-30fps")];
        let picked = select(&candidates, &SensorRequest::default()).unwrap();
        assert_eq!(picked.name, "sc230ai-dol2-30fps");
    }

    #[test]
    fn test_filter_then_pick() {
        let candidates = [profile("sc230ai-30fps"), profile("sc850sl-30fps")];
        let request = SensorRequest::default().with_size(1920, 1080);
        let picked = select(&candidates, &request).unwrap();
        assert_eq!(picked.name, "sc230ai-30fps");

        let request = SensorRequest::default().with_fps(60);
        assert!(select(&candidates, &request).is_none());
    }

    #[test]
    fn test_empty() {
        let candidates: [SensorProfile; 0] = [];
        assert!(select(&candidates, &SensorRequest::default()).is_none());
    }

    #[test]
    fn test_random_subsets_satisfy_constraints() {
        let mut rng = rand::rng();
        let all: Vec<SensorProfile> = catalog().to_vec();

        for _ in 0..200 {
            let mut subset = all.clone();
            subset.shuffle(&mut rng);
            subset.truncate(5);

            let reference = subset[0];
            let requests = [
                SensorRequest::default(),
                SensorRequest {
                    width: Some(reference.width),
                    ..Default::default()
                },
                SensorRequest {
                    height: Some(reference.height),
                    fps: Some(reference.fps),
                    ..Default::default()
                },
            ];

            for request in requests {
                let picked = select(&subset, &request).unwrap();
                assert!(request.matches(picked));
                for other in subset.iter().filter(|p| request.matches(p)) {
                    assert!(
                        picked.area() > other.area()
                            || (picked.area() == other.area() && picked.fps >= other.fps)
                    );
                }
            }
        }
    }
}
