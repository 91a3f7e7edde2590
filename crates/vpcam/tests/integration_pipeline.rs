// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
//
// vpcam Pipeline Tests
//
// TESTING LAYERS:
//
// Layer 1 (No hardware required):
//   - Pipeline lifecycle against a counting vnode stub: rollback on a
//     failed VSE init, idempotent teardown, frame sequence gaps
//   - Camera open against a synthetic board tree in a temporary directory
//
// Layer 3 (Hardware Integration - Requires an RDK X5 class board):
//   - test_open_first_camera: probe and stream from the first camera slot
//
// REQUIREMENTS for Layer 3 tests (marked with #[ignore]):
//   - A supported MIPI sensor on camera slot 0
//   - libhbn_api.so and libcam.so installed
//
// RUN LAYER 1:
//   cargo test --test integration_pipeline
//
// RUN LAYER 3 (on hardware):
//   cargo test --test integration_pipeline -- --ignored --nocapture

use serial_test::serial;
use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::Path,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tempfile::TempDir;
use vpcam::{
    camera::{create_camera, create_vse, Size},
    catalog,
    frame::FrameSource,
    pipeline::{PipelineContext, PipelineState},
    platform::BoardPaths,
    probe::ResolvedSensor,
    stage::{IspStage, SensorStage, Stage, VinStage, VseStage},
    vnode::{
        BufferInfo, CameraHandle, FlowHandle, NodeConfig, NodeHandle, NodeKind, Plane, RawImage,
        RegionHandle, Status, VnodeApi, STATUS_TIMEOUT,
    },
    Error,
};

/// Vnode stub counting acquisitions and releases of every handle kind.
#[derive(Default)]
struct CountingApi {
    opens: AtomicUsize,
    closes: AtomicUsize,
    cameras: AtomicUsize,
    camera_destroys: AtomicUsize,
    flows: AtomicUsize,
    flow_destroys: AtomicUsize,
    next: AtomicI64,
    kinds: Mutex<HashMap<NodeHandle, NodeKind>>,
    frame_ids: Mutex<VecDeque<u32>>,
    fail_configure: Option<NodeKind>,
}

impl CountingApi {
    fn failing_configure(kind: NodeKind) -> Self {
        CountingApi {
            fail_configure: Some(kind),
            ..Default::default()
        }
    }

    fn with_frames(ids: &[u32]) -> Self {
        let api = CountingApi::default();
        api.frame_ids.lock().unwrap().extend(ids.iter().copied());
        api
    }

    fn handle(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn balanced(&self) -> bool {
        self.opens.load(Ordering::SeqCst) == self.closes.load(Ordering::SeqCst)
            && self.cameras.load(Ordering::SeqCst) == self.camera_destroys.load(Ordering::SeqCst)
            && self.flows.load(Ordering::SeqCst) == self.flow_destroys.load(Ordering::SeqCst)
    }
}

impl VnodeApi for CountingApi {
    fn create_camera(&self, _sensor: &ResolvedSensor) -> Result<CameraHandle, Status> {
        self.cameras.fetch_add(1, Ordering::SeqCst);
        Ok(self.handle())
    }

    fn attach_camera(&self, _camera: CameraHandle, _vin: NodeHandle) -> Result<(), Status> {
        Ok(())
    }

    fn detach_camera(&self, _camera: CameraHandle) -> Result<(), Status> {
        Ok(())
    }

    fn destroy_camera(&self, _camera: CameraHandle) -> Result<(), Status> {
        self.camera_destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn open(&self, kind: NodeKind) -> Result<NodeHandle, Status> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let node = self.handle();
        self.kinds.lock().unwrap().insert(node, kind);
        Ok(node)
    }

    fn configure(&self, _node: NodeHandle, config: &NodeConfig) -> Result<(), Status> {
        if self.fail_configure == Some(config.kind()) {
            return Err(-22);
        }
        Ok(())
    }

    fn close(&self, node: NodeHandle) {
        assert!(self.kinds.lock().unwrap().remove(&node).is_some(), "double close");
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn create_flow(&self) -> Result<FlowHandle, Status> {
        self.flows.fetch_add(1, Ordering::SeqCst);
        Ok(self.handle())
    }

    fn add_to_flow(&self, _flow: FlowHandle, _node: NodeHandle) -> Result<(), Status> {
        Ok(())
    }

    fn bind(
        &self,
        _flow: FlowHandle,
        _src: NodeHandle,
        _src_channel: u32,
        _dst: NodeHandle,
        _dst_channel: u32,
    ) -> Result<(), Status> {
        Ok(())
    }

    fn start_flow(&self, _flow: FlowHandle) -> Result<(), Status> {
        Ok(())
    }

    fn stop_flow(&self, _flow: FlowHandle) -> Result<(), Status> {
        Ok(())
    }

    fn destroy_flow(&self, _flow: FlowHandle) {
        self.flow_destroys.fetch_add(1, Ordering::SeqCst);
    }

    fn create_region(&self, _region: RegionHandle, _size: Size) -> Result<(), Status> {
        Ok(())
    }

    fn attach_region(
        &self,
        _region: RegionHandle,
        _node: NodeHandle,
        _channel: u32,
        _x: u32,
        _y: u32,
    ) -> Result<(), Status> {
        Ok(())
    }

    fn set_region_bitmap(
        &self,
        _region: RegionHandle,
        _size: Size,
        _bitmap: &mut [u8],
    ) -> Result<(), Status> {
        Ok(())
    }

    fn detach_region(
        &self,
        _region: RegionHandle,
        _node: NodeHandle,
        _channel: u32,
    ) -> Result<(), Status> {
        Ok(())
    }

    fn destroy_region(&self, _region: RegionHandle) -> Result<(), Status> {
        Ok(())
    }

    fn get_frame(
        &self,
        _node: NodeHandle,
        _channel: u32,
        _timeout_ms: u32,
    ) -> Result<RawImage, Status> {
        let frame_id = self
            .frame_ids
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(STATUS_TIMEOUT)?;
        Ok(RawImage {
            frame_id,
            width: 1920,
            height: 1080,
            stride: 1920,
            vstride: 1080,
            ..Default::default()
        })
    }

    fn release_frame(
        &self,
        _node: NodeHandle,
        _channel: u32,
        _image: &mut RawImage,
    ) -> Result<(), Status> {
        Ok(())
    }

    fn send_frame(
        &self,
        _node: NodeHandle,
        _channel: u32,
        _image: &mut RawImage,
    ) -> Result<(), Status> {
        Ok(())
    }

    fn alloc_image(&self, size: Size) -> Result<RawImage, Status> {
        Ok(RawImage {
            width: size.width,
            height: size.height,
            planes: vec![Plane {
                data: std::ptr::null_mut(),
                phys: 0,
                size: 0,
                fd: -1,
            }],
            ..Default::default()
        })
    }

    fn free_image(&self, image: &mut RawImage) {
        image.planes.clear();
    }

    fn alloc_buffer(&self, _len: usize) -> Result<BufferInfo, Status> {
        Err(-12)
    }

    fn free_buffer(&self, _buffer: &BufferInfo) {}
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sc230ai() -> ResolvedSensor {
    ResolvedSensor {
        profile: *catalog::find("sc230ai-30fps").unwrap(),
        interface: 0,
        i2c_bus: 6,
        i2c_addr: 0x30,
        mipi_rx: 0,
        mclk_configured: true,
    }
}

fn stages(sensor: &ResolvedSensor) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SensorStage::new(*sensor)),
        Box::new(VinStage::from_sensor(sensor, 3)),
        Box::new(IspStage::from_sensor(sensor, 3)),
        Box::new(VseStage::from_assignments(Size::new(1920, 1080), &[], 3)),
    ]
}

#[test]
fn test_vse_init_failure_releases_vin_and_isp() {
    init_logging();
    let api = Arc::new(CountingApi::failing_configure(NodeKind::Vse));
    let mut ctx = PipelineContext::new(api.clone(), stages(&sc230ai()));

    let err = ctx.init().unwrap_err();
    assert!(matches!(err, Error::Stage { .. }), "{}", err);
    assert_eq!(err.exit_code(), -1);
    assert_eq!(ctx.state(), PipelineState::Unconfigured);
    assert_eq!(api.opens.load(Ordering::SeqCst), 3);
    assert!(api.balanced());
}

#[test]
fn test_deinit_twice_releases_once() {
    let api = Arc::new(CountingApi::default());
    let mut ctx = PipelineContext::new(api.clone(), stages(&sc230ai()));
    ctx.init().unwrap();
    ctx.start().unwrap();
    ctx.stop().unwrap();

    ctx.deinit().unwrap();
    ctx.deinit().unwrap();
    drop(ctx);

    assert_eq!(api.closes.load(Ordering::SeqCst), 3);
    assert!(api.balanced());
}

#[test]
fn test_frame_sequence_gap() {
    init_logging();
    let api = Arc::new(CountingApi::with_frames(&[10, 11, 14]));
    let camera = create_camera()
        .with_output(Size::new(1920, 1080))
        .with_api(api.clone())
        .open_with_sensor(sc230ai())
        .unwrap();

    let lost: Vec<u32> = (0..3)
        .map(|_| {
            let frame = camera.get_frame(FrameSource::Vse(0), 2000).unwrap();
            frame.lost_frames()
        })
        .collect();
    assert_eq!(lost, vec![0, 0, 2]);

    assert!(matches!(
        camera.get_frame(FrameSource::Vse(0), 2000),
        Err(Error::Timeout { timeout_ms: 2000 })
    ));

    camera.close().unwrap();
    assert!(api.balanced());
}

#[test]
fn test_channels_consumed_concurrently() {
    let api = Arc::new(CountingApi::with_frames(&[1, 2, 3, 4, 5, 6, 7, 8]));
    let camera = create_camera()
        .with_output(Size::new(0, 0))
        .with_output(Size::new(1280, 720))
        .with_api(api)
        .open_with_sensor(sc230ai())
        .unwrap();

    let taken: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = camera
            .outputs()
            .iter()
            .map(|assignment| {
                let camera = &camera;
                let source = FrameSource::Vse(assignment.channel.index());
                scope.spawn(move || {
                    let mut count = 0;
                    while let Ok(frame) = camera.get_frame(source, 10) {
                        frame.release().unwrap();
                        count += 1;
                    }
                    count
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).sum()
    });
    assert_eq!(taken, 8);
}

#[test]
fn test_vse_session_lifecycle() {
    let api = Arc::new(CountingApi::default());
    let session = create_vse(Size::new(1920, 1080))
        .with_output(Size::new(640, 360))
        .with_api(api.clone())
        .open()
        .unwrap();
    assert!(session.sensor().is_none());
    assert_eq!(api.opens.load(Ordering::SeqCst), 1);
    assert_eq!(api.cameras.load(Ordering::SeqCst), 0);
    drop(session);
    assert!(api.balanced());
}

fn cells(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Two camera slots: slot 0 on a disabled connector, slot 1 on a busy host.
fn board(root: &Path) -> BoardPaths {
    let paths = BoardPaths::with_root(root);
    fs::create_dir_all(&paths.socinfo).unwrap();
    fs::write(paths.socinfo.join("board_id"), "0x0301\n").unwrap();
    fs::create_dir_all(paths.board_config.parent().unwrap()).unwrap();
    fs::write(
        &paths.board_config,
        r#"{ "board_0x0301": { "cameras": [
            { "i2c_bus": 6, "mipi_host": 0 },
            { "i2c_bus": 4, "mipi_host": 1 }
        ] } }"#,
    )
    .unwrap();

    for (index, status, cfg) in [(0, "disabled", "not inited\n"), (1, "okay", "cfg: 1\n")] {
        let vcon = paths.vcon_node(index);
        fs::create_dir_all(&vcon).unwrap();
        fs::write(vcon.join("status"), format!("{}\0", status)).unwrap();
        fs::write(vcon.join("bus"), cells(&[6])).unwrap();
        fs::write(vcon.join("rx_phy"), cells(&[0, index])).unwrap();

        let host = paths.mipi_host_sysfs(index);
        fs::create_dir_all(host.join("status")).unwrap();
        fs::create_dir_all(host.join("param")).unwrap();
        fs::write(host.join("status/cfg"), cfg).unwrap();
    }
    paths
}

#[test]
fn test_open_without_sensor_reports_not_found() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let api = Arc::new(CountingApi::default());
    let err = create_camera()
        .with_paths(board(dir.path()))
        .with_api(api.clone())
        .open()
        .unwrap_err();

    assert!(matches!(err, Error::SensorNotFound { interface: None }));
    assert!(err.to_string().contains("check connection"));
    assert_eq!(api.opens.load(Ordering::SeqCst), 0);
}

#[test]
fn test_open_busy_slot() {
    let dir = TempDir::new().unwrap();
    let err = create_camera()
        .with_paths(board(dir.path()))
        .with_interface(1)
        .with_api(Arc::new(CountingApi::default()))
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::InterfaceBusy(1)));
}

#[test]
fn test_open_unknown_slot() {
    let dir = TempDir::new().unwrap();
    let err = create_camera()
        .with_paths(board(dir.path()))
        .with_interface(3)
        .with_api(Arc::new(CountingApi::default()))
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_open_without_board_config() {
    let dir = TempDir::new().unwrap();
    let err = create_camera()
        .with_paths(BoardPaths::with_root(dir.path()))
        .with_api(Arc::new(CountingApi::default()))
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
#[serial]
#[ignore = "test requires a camera on slot 0 and the vendor libraries (run with --include-ignored to enable)"]
fn test_open_first_camera() {
    init_logging();
    let camera = create_camera()
        .with_interface(0)
        .with_output(Size::new(0, 0))
        .with_output(Size::new(640, 480))
        .open()
        .unwrap();
    println!("{}", camera);

    let channel = camera.channel_for_size(640, 480).unwrap().unwrap();
    for _ in 0..10 {
        let frame = camera
            .get_frame(FrameSource::Vse(channel.index()), 2000)
            .unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 480));
        println!("{}", frame);
        frame.release().unwrap();
    }
    camera.close().unwrap();
}
