// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Pipeline lifecycle.
//!
//! A [`PipelineContext`] owns every stage handle of one camera or VSE
//! session and moves them through
//! `Unconfigured → Initialized → Running → Stopped → Deinitialized`.
//!
//! `init` is all or nothing: when a stage fails, every stage initialised
//! before it is released again and the context stays `Unconfigured`.
//! `start` and `stop` report failures but still change state, so a failed
//! stop never blocks teardown. `deinit` releases every handle exactly once
//! and is a no-op when repeated.
//!
//! Control operations take `&mut self` and must be serialised by the
//! caller. Frame exchange takes `&self` and may run on one thread per
//! output.

use crate::{
    frame::{FrameExchange, FrameSource, ImageFrame},
    stage::{stage_error, Stage, StageKind, StageLinks},
    vnode::{FlowHandle, NodeHandle, RawImage, VnodeApi},
    Error,
};
use log::{debug, error, info, warn};
use std::{fmt, sync::Arc};

/// Lifecycle state of a [`PipelineContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unconfigured,
    Initialized,
    Running,
    Stopped,
    Deinitialized,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineState::Unconfigured => write!(f, "unconfigured"),
            PipelineState::Initialized => write!(f, "initialized"),
            PipelineState::Running => write!(f, "running"),
            PipelineState::Stopped => write!(f, "stopped"),
            PipelineState::Deinitialized => write!(f, "deinitialized"),
        }
    }
}

/// Stage handles and lifecycle of one session.
pub struct PipelineContext {
    api: Arc<dyn VnodeApi>,
    /// Source to sink.
    stages: Vec<Box<dyn Stage>>,
    links: StageLinks,
    flow: Option<FlowHandle>,
    state: PipelineState,
    frames: FrameExchange,
}

impl PipelineContext {
    /// Context over `stages`, listed from source to sink.
    pub fn new(api: Arc<dyn VnodeApi>, stages: Vec<Box<dyn Stage>>) -> Self {
        PipelineContext {
            api,
            stages,
            links: StageLinks::default(),
            flow: None,
            state: PipelineState::Unconfigured,
            frames: FrameExchange::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn api(&self) -> &dyn VnodeApi {
        self.api.as_ref()
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind()).collect()
    }

    fn invalid(&self, op: &'static str) -> Error {
        Error::InvalidState {
            op,
            state: self.state,
        }
    }

    /// Initialise every stage in order, then bind their nodes into a flow.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state != PipelineState::Unconfigured {
            return Err(self.invalid("init"));
        }

        for index in 0..self.stages.len() {
            let kind = self.stages[index].kind();
            if let Err(err) = self.stages[index].init(self.api.as_ref(), &mut self.links) {
                error!("{} stage init failed, rolling back: {}", kind, err);
                self.rollback(index);
                return Err(err);
            }
            debug!("{} stage initialised", kind);
        }

        match self.build_flow() {
            Ok(flow) => self.flow = Some(flow),
            Err(err) => {
                error!("flow setup failed, rolling back: {}", err);
                self.rollback(self.stages.len());
                return Err(err);
            }
        }

        self.state = PipelineState::Initialized;
        info!("pipeline initialised: {:?}", self.stage_kinds());
        Ok(())
    }

    /// Deinitialise the first `count` stages in reverse order.
    fn rollback(&mut self, count: usize) {
        for stage in self.stages[..count].iter_mut().rev() {
            if let Err(err) = stage.deinit(self.api.as_ref(), &mut self.links) {
                warn!("{} stage rollback: {}", stage.kind(), err);
            }
        }
        self.links = StageLinks::default();
    }

    fn build_flow(&self) -> Result<FlowHandle, Error> {
        let api = self.api.as_ref();
        let flow = api
            .create_flow()
            .map_err(|status| stage_error(StageKind::Vse, "create flow", status))?;

        let nodes: Vec<(StageKind, NodeHandle)> = self
            .stages
            .iter()
            .filter_map(|stage| stage.frame_node().map(|node| (stage.kind(), node)))
            .collect();

        let result = nodes
            .iter()
            .try_for_each(|(kind, node)| {
                api.add_to_flow(flow, *node)
                    .map_err(|status| stage_error(*kind, "add to flow", status))
            })
            .and_then(|_| {
                nodes.windows(2).try_for_each(|pair| {
                    let ((src_kind, src), (dst_kind, dst)) = (pair[0], pair[1]);
                    debug!("bind {} -> {}", src_kind, dst_kind);
                    api.bind(flow, src, 0, dst, 0)
                        .map_err(|status| stage_error(dst_kind, "bind", status))
                })
            });

        match result {
            Ok(()) => Ok(flow),
            Err(err) => {
                api.destroy_flow(flow);
                Err(err)
            }
        }
    }

    /// Start the stages sink first, then the flow.
    ///
    /// The context is `Running` afterwards even if a stage failed; the
    /// first failure is returned.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.state {
            PipelineState::Initialized | PipelineState::Stopped => {}
            _ => return Err(self.invalid("start")),
        }

        let api = self.api.as_ref();
        let mut result = Ok(());
        for stage in self.stages.iter_mut().rev() {
            if let Err(err) = stage.start(api) {
                error!("{} stage start: {}", stage.kind(), err);
                result = result.and(Err(err));
            }
        }
        if let Some(flow) = self.flow {
            if let Err(status) = api.start_flow(flow) {
                result = result.and(Err(stage_error(StageKind::Vse, "start flow", status)));
            }
        }

        self.state = PipelineState::Running;
        result
    }

    /// Stop the flow, then the stages source first.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state != PipelineState::Running {
            return Err(self.invalid("stop"));
        }

        let api = self.api.as_ref();
        let mut result = Ok(());
        if let Some(flow) = self.flow {
            if let Err(status) = api.stop_flow(flow) {
                result = result.and(Err(stage_error(StageKind::Vse, "stop flow", status)));
            }
        }
        for stage in self.stages.iter_mut() {
            if let Err(err) = stage.stop(api) {
                error!("{} stage stop: {}", stage.kind(), err);
                result = result.and(Err(err));
            }
        }

        self.state = PipelineState::Stopped;
        self.frames.reset_sequence();
        result
    }

    /// Release every handle, stopping first if still running.
    ///
    /// Repeated calls, and calls on a context that never initialised, do
    /// nothing.
    pub fn deinit(&mut self) -> Result<(), Error> {
        match self.state {
            PipelineState::Deinitialized => return Ok(()),
            PipelineState::Unconfigured => {
                self.state = PipelineState::Deinitialized;
                return Ok(());
            }
            PipelineState::Running => {
                if let Err(err) = self.stop() {
                    warn!("stop before deinit: {}", err);
                }
            }
            PipelineState::Initialized | PipelineState::Stopped => {}
        }

        let api = self.api.as_ref();
        if let Some(flow) = self.flow.take() {
            api.destroy_flow(flow);
        }

        let mut result = Ok(());
        for stage in self.stages.iter_mut().rev() {
            if let Err(err) = stage.deinit(api, &mut self.links) {
                result = result.and(Err(err));
            }
        }
        self.links = StageLinks::default();

        self.state = PipelineState::Deinitialized;
        info!("pipeline deinitialised");
        result
    }

    fn node_for(&self, source: FrameSource) -> Option<NodeHandle> {
        let kind = source.stage();
        self.stages
            .iter()
            .find(|stage| stage.kind() == kind)
            .and_then(|stage| stage.frame_node())
    }

    /// Wait up to `timeout_ms` for the next frame from `source`.
    pub fn get_frame(&self, source: FrameSource, timeout_ms: u32) -> Result<ImageFrame<'_>, Error> {
        if self.state != PipelineState::Running {
            return Err(self.invalid("get a frame from"));
        }
        let node = self.node_for(source).ok_or_else(|| {
            Error::InvalidArgument(format!("pipeline has no {} output", source))
        })?;
        self.frames
            .get_frame(self.api.as_ref(), node, source, timeout_ms)
    }

    /// Feed `image` to the input of the stage behind `source`.
    pub fn send_frame(&self, source: FrameSource, image: &mut RawImage) -> Result<(), Error> {
        if self.state != PipelineState::Running {
            return Err(self.invalid("send a frame to"));
        }
        let node = self.node_for(source).ok_or_else(|| {
            Error::InvalidArgument(format!("pipeline has no {} input", source))
        })?;
        self.api
            .send_frame(node, source.channel(), image)
            .map_err(|status| stage_error(source.stage(), "send frame", status))
    }

    /// Upload pixels to OSD region `index`.
    pub fn set_osd_bitmap(&mut self, index: usize, bitmap: &[u8]) -> Result<(), Error> {
        match self.state {
            PipelineState::Initialized | PipelineState::Running | PipelineState::Stopped => {}
            _ => return Err(self.invalid("draw on")),
        }
        let api = self.api.as_ref();
        let osd = self
            .stages
            .iter_mut()
            .find_map(|stage| stage.as_osd_mut())
            .ok_or_else(|| Error::Unsupported("pipeline has no OSD stage".to_string()))?;
        osd.set_bitmap(api, index, bitmap)
    }
}

impl Drop for PipelineContext {
    fn drop(&mut self) {
        if let Err(err) = self.deinit() {
            warn!("pipeline teardown: {}", err);
        }
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("stages", &self.stage_kinds())
            .field("flow", &self.flow)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog,
        channel::{Rect, Size},
        osd::OsdStage,
        probe::ResolvedSensor,
        stage::{IspStage, SensorStage, VinStage, VseStage},
        vnode::tests::RecordingApi,
    };

    fn sensor() -> ResolvedSensor {
        ResolvedSensor {
            profile: *catalog::find("sc230ai-30fps").unwrap(),
            interface: 0,
            i2c_bus: 6,
            i2c_addr: 0x30,
            mipi_rx: 0,
            mclk_configured: true,
        }
    }

    fn camera_stages(osd: bool) -> Vec<Box<dyn Stage>> {
        let sensor = sensor();
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(SensorStage::new(sensor)),
            Box::new(VinStage::from_sensor(&sensor, 3)),
            Box::new(IspStage::from_sensor(&sensor, 3)),
            Box::new(VseStage::from_assignments(Size::new(1920, 1080), &[], 3)),
        ];
        if osd {
            stages.push(Box::new(OsdStage::new(&[Rect::new(0, 0, 8, 8)]).unwrap()));
        }
        stages
    }

    fn context(api: &Arc<RecordingApi>, osd: bool) -> PipelineContext {
        PipelineContext::new(api.clone(), camera_stages(osd))
    }

    #[test]
    fn test_lifecycle_order() {
        let api = Arc::new(RecordingApi::new());
        let mut ctx = context(&api, true);

        ctx.init().unwrap();
        assert_eq!(ctx.state(), PipelineState::Initialized);
        ctx.start().unwrap();
        assert_eq!(ctx.state(), PipelineState::Running);
        ctx.stop().unwrap();
        ctx.deinit().unwrap();
        assert_eq!(ctx.state(), PipelineState::Deinitialized);

        assert_eq!(
            api.calls(),
            vec![
                "create_camera",
                "open vin",
                "configure vin",
                "attach_camera vin",
                "open isp",
                "configure isp",
                "open vse",
                "configure vse",
                "create_region 0",
                "attach_region 0 vse ch0",
                "create_flow",
                "add_to_flow vin",
                "add_to_flow isp",
                "add_to_flow vse",
                "bind vin->isp",
                "bind isp->vse",
                "start_flow",
                "stop_flow",
                "destroy_flow",
                "detach_region 0",
                "destroy_region 0",
                "close vse",
                "close isp",
                "detach_camera",
                "close vin",
                "destroy_camera",
            ]
        );
    }

    #[test]
    fn test_rollback_when_vse_fails() {
        let api = Arc::new(RecordingApi::failing("configure vse"));
        let mut ctx = context(&api, false);

        assert!(matches!(
            ctx.init(),
            Err(Error::Stage {
                kind: StageKind::Vse,
                op: "configure",
                ..
            })
        ));
        assert_eq!(ctx.state(), PipelineState::Unconfigured);
        assert_eq!(api.count("open "), 3);
        assert_eq!(api.count("close "), 3);
        assert_eq!(api.count("create_camera"), api.count("destroy_camera"));
        assert_eq!(api.count("create_flow"), 0);
    }

    #[test]
    fn test_rollback_when_flow_bind_fails() {
        let api = Arc::new(RecordingApi::failing("bind isp->vse"));
        let mut ctx = context(&api, true);

        assert!(ctx.init().is_err());
        assert_eq!(api.count("destroy_flow"), 1);
        assert_eq!(api.count("open "), api.count("close "));
        assert_eq!(api.count("create_region"), api.count("destroy_region"));
    }

    #[test]
    fn test_start_stop_drive_only_the_flow() {
        let api = Arc::new(RecordingApi::new());
        let mut ctx = context(&api, true);
        ctx.init().unwrap();
        let configured = api.calls().len();

        ctx.start().unwrap();
        ctx.stop().unwrap();
        assert_eq!(
            api.calls()[configured..].to_vec(),
            vec!["start_flow", "stop_flow"]
        );
        assert_eq!(ctx.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_deinit_twice() {
        let api = Arc::new(RecordingApi::new());
        let mut ctx = context(&api, false);
        ctx.init().unwrap();
        ctx.start().unwrap();

        // Running: deinit stops first.
        ctx.deinit().unwrap();
        ctx.deinit().unwrap();
        drop(ctx);

        assert_eq!(api.count("stop_flow"), 1);
        assert_eq!(api.count("close "), 3);
        assert_eq!(api.count("destroy_camera"), 1);
    }

    #[test]
    fn test_drop_releases() {
        let api = Arc::new(RecordingApi::new());
        {
            let mut ctx = context(&api, false);
            ctx.init().unwrap();
        }
        assert_eq!(api.count("open "), api.count("close "));
        assert_eq!(api.count("destroy_flow"), 1);
    }

    #[test]
    fn test_invalid_transitions() {
        let api = Arc::new(RecordingApi::new());
        let mut ctx = context(&api, false);

        assert!(matches!(
            ctx.start(),
            Err(Error::InvalidState {
                state: PipelineState::Unconfigured,
                ..
            })
        ));
        assert!(ctx.stop().is_err());
        assert!(ctx.get_frame(FrameSource::Vse(0), 10).is_err());

        ctx.init().unwrap();
        assert!(ctx.init().is_err());
        ctx.deinit().unwrap();
        assert!(matches!(
            ctx.start(),
            Err(Error::InvalidState {
                state: PipelineState::Deinitialized,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_start_still_runs() {
        let api = Arc::new(RecordingApi::failing("start_flow"));
        let mut ctx = context(&api, false);
        ctx.init().unwrap();
        assert!(ctx.start().is_err());
        assert_eq!(ctx.state(), PipelineState::Running);
    }

    #[test]
    fn test_failed_stop_does_not_block_deinit() {
        let api = Arc::new(RecordingApi::failing("stop_flow"));
        let mut ctx = context(&api, false);
        ctx.init().unwrap();
        ctx.start().unwrap();
        assert!(ctx.stop().is_err());
        assert_eq!(ctx.state(), PipelineState::Stopped);
        ctx.deinit().unwrap();
        assert_eq!(api.count("open "), api.count("close "));
    }

    #[test]
    fn test_frames_from_running_pipeline() {
        let api = Arc::new(RecordingApi::new().with_frame_ids(&[1, 2]));
        let mut ctx = context(&api, false);
        ctx.init().unwrap();
        ctx.start().unwrap();

        let frame = ctx.get_frame(FrameSource::Isp, 100).unwrap();
        assert_eq!(frame.frame_id(), 1);
        frame.release().unwrap();
        assert!(matches!(
            ctx.get_frame(FrameSource::Gdc, 100),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_osd_bitmap() {
        let api = Arc::new(RecordingApi::new());
        let mut ctx = context(&api, true);
        assert!(ctx.set_osd_bitmap(0, &[0; 64]).is_err());
        ctx.init().unwrap();
        ctx.set_osd_bitmap(0, &[0; 64]).unwrap();
        assert_eq!(api.count("set_region_bitmap 0"), 1);

        let mut plain = context(&api, false);
        plain.init().unwrap();
        assert!(matches!(
            plain.set_osd_bitmap(0, &[0; 64]),
            Err(Error::Unsupported(_))
        ));
    }
}
