//! Mock 驱动（无硬件依赖）
//!
//! `MockCoreSdk` 按脚本返回数据，并记录收到的每一次调用，供上层测试断言。
//! 克隆共享同一份内部状态：测试保留一份克隆，另一份交给聚合器。
//!
//! 回调由测试通过 `fire_*` 方法在任意线程上主动触发，模拟驱动线程的推送。

use crate::{CoreSdk, StreamCallback, call};
use manus_protocol::{
    CalibrationResult, ConnectionType, CoordinateSystemVuh, ErgonomicsStream,
    GestureLandscapeData, HAPTIC_MOTOR_COUNT, HandMotion, LandscapeData, LogSeverity, ManusHost,
    NodeInfo, RawDeviceData, RawDeviceDataInfo, RawSkeletonInfo, SdkError, SdkReturnCode,
    SkeletonNode, SkeletonStreamInfo,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// 脚本化的单只手套骨骼
#[derive(Debug, Clone, Default)]
pub struct MockSkeleton {
    pub glove_id: u32,
    pub publish_time: u64,
    pub nodes: Vec<SkeletonNode>,
}

#[derive(Default)]
struct MockState {
    // 脚本数据
    hosts: Vec<ManusHost>,
    pending_connect_failures: u32,
    skeletons: Vec<MockSkeleton>,
    node_infos: HashMap<u32, Vec<NodeInfo>>,
    raw_devices: Vec<RawDeviceData>,
    gestures: Vec<GestureLandscapeData>,
    hand_motion: HandMotion,
    calibration_result: CalibrationResult,

    // 故障注入
    failures: HashMap<&'static str, SdkReturnCode>,
    index_failures: HashMap<(&'static str, u32), SdkReturnCode>,

    // 调用记录
    calls: Vec<&'static str>,
    connection: Option<ConnectionType>,
    connected_host: Option<ManusHost>,
    coordinate_system: Option<(CoordinateSystemVuh, bool)>,
    vibrations: Vec<(u32, [f32; HAPTIC_MOTOR_COUNT])>,
    calibrations: Vec<(u32, Vec<u8>)>,
    shut_down: bool,
}

#[derive(Default)]
struct MockInner {
    state: Mutex<MockState>,
    log_callback: Mutex<Option<Arc<dyn StreamCallback>>>,
    stream_callback: Mutex<Option<Arc<dyn StreamCallback>>>,
}

/// 脚本化的进程内驱动
#[derive(Clone, Default)]
pub struct MockCoreSdk {
    inner: Arc<MockInner>,
}

impl MockCoreSdk {
    /// 创建一个带单个本地主机、校准总是成功的 Mock 驱动
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_hosts(vec![ManusHost::with_address("localhost", "127.0.0.1")]);
        mock.set_calibration_result(CalibrationResult::Success);
        mock
    }

    // ------------------------------------------------------------------
    // 脚本
    // ------------------------------------------------------------------

    pub fn set_hosts(&self, hosts: Vec<ManusHost>) {
        self.inner.state.lock().hosts = hosts;
    }

    /// 前 `count` 次连接返回 `NotConnected`
    pub fn set_connect_failures(&self, count: u32) {
        self.inner.state.lock().pending_connect_failures = count;
    }

    /// 替换当前骨骼数据（下一次 `fire_raw_skeleton` 时可拉取）
    pub fn set_skeletons(&self, skeletons: Vec<MockSkeleton>) {
        self.inner.state.lock().skeletons = skeletons;
    }

    pub fn set_node_info(&self, glove_id: u32, nodes: Vec<NodeInfo>) {
        self.inner.state.lock().node_infos.insert(glove_id, nodes);
    }

    pub fn set_raw_devices(&self, devices: Vec<RawDeviceData>) {
        self.inner.state.lock().raw_devices = devices;
    }

    pub fn set_gestures(&self, gestures: Vec<GestureLandscapeData>) {
        self.inner.state.lock().gestures = gestures;
    }

    pub fn set_calibration_result(&self, result: CalibrationResult) {
        self.inner.state.lock().calibration_result = result;
    }

    /// 让某个入口函数始终失败
    pub fn fail(&self, call: &'static str, code: SdkReturnCode) {
        self.inner.state.lock().failures.insert(call, code);
    }

    /// 让某个入口函数在指定下标（或手套 ID）上失败
    pub fn fail_at(&self, call: &'static str, index: u32, code: SdkReturnCode) {
        self.inner.state.lock().index_failures.insert((call, index), code);
    }

    pub fn clear_failures(&self) {
        let mut state = self.inner.state.lock();
        state.failures.clear();
        state.index_failures.clear();
    }

    // ------------------------------------------------------------------
    // 触发回调（模拟驱动线程）
    // ------------------------------------------------------------------

    /// 触发原始骨骼回调，返回是否有已注册的回调
    pub fn fire_raw_skeleton(&self) -> bool {
        let info = {
            let state = self.inner.state.lock();
            SkeletonStreamInfo {
                publish_time: Default::default(),
                skeletons_count: state.skeletons.len() as u32,
            }
        };
        self.with_stream_callback(|cb| cb.on_raw_skeleton(info))
    }

    pub fn fire_raw_device_data(&self) -> bool {
        let info = {
            let state = self.inner.state.lock();
            RawDeviceDataInfo {
                publish_time: Default::default(),
                raw_device_data_count: state.raw_devices.len() as u32,
            }
        };
        self.with_stream_callback(|cb| cb.on_raw_device_data(info))
    }

    pub fn fire_ergonomics(&self, stream: &ErgonomicsStream) -> bool {
        self.with_stream_callback(|cb| cb.on_ergonomics(stream))
    }

    pub fn fire_landscape(&self, landscape: &LandscapeData) -> bool {
        self.with_stream_callback(|cb| cb.on_landscape(landscape))
    }

    pub fn fire_log(&self, severity: LogSeverity, message: &str) -> bool {
        let callback = self.inner.log_callback.lock().clone();
        match callback {
            Some(cb) => {
                cb.on_log(severity, message);
                true
            },
            None => false,
        }
    }

    // 回调在锁外执行，回调内部可以安全地再调用 Mock
    fn with_stream_callback(&self, f: impl FnOnce(&dyn StreamCallback)) -> bool {
        let callback = self.inner.stream_callback.lock().clone();
        match callback {
            Some(cb) => {
                f(cb.as_ref());
                true
            },
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // 调用记录
    // ------------------------------------------------------------------

    /// 按顺序记录的入口函数名
    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.state.lock().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.inner.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn connection(&self) -> Option<ConnectionType> {
        self.inner.state.lock().connection
    }

    pub fn connected_host(&self) -> Option<ManusHost> {
        self.inner.state.lock().connected_host
    }

    pub fn coordinate_system(&self) -> Option<(CoordinateSystemVuh, bool)> {
        self.inner.state.lock().coordinate_system
    }

    pub fn vibrations(&self) -> Vec<(u32, [f32; HAPTIC_MOTOR_COUNT])> {
        self.inner.state.lock().vibrations.clone()
    }

    pub fn calibrations(&self) -> Vec<(u32, Vec<u8>)> {
        self.inner.state.lock().calibrations.clone()
    }

    pub fn current_hand_motion(&self) -> HandMotion {
        self.inner.state.lock().hand_motion
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().shut_down
    }

    pub fn has_stream_callback(&self) -> bool {
        self.inner.stream_callback.lock().is_some()
    }

    // 记录调用并检查注入的故障
    fn enter(
        &self,
        state: &mut MockState,
        call: &'static str,
        index: Option<u32>,
    ) -> Result<(), SdkError> {
        trace!("mock call {}", call);
        state.calls.push(call);
        if let Some(code) = index.and_then(|i| state.index_failures.get(&(call, i)).copied()) {
            return Err(SdkError::new(call, code));
        }
        if let Some(code) = state.failures.get(call).copied() {
            return Err(SdkError::new(call, code));
        }
        Ok(())
    }
}

fn size_check(call: &'static str, expected: usize, actual: usize) -> Result<(), SdkError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SdkError::new(call, SdkReturnCode::ArgumentSizeMismatch))
    }
}

impl CoreSdk for MockCoreSdk {
    fn initialize(&self, connection: ConnectionType) -> Result<(), SdkError> {
        let name = match connection {
            ConnectionType::Integrated => call::INITIALIZE_INTEGRATED,
            _ => call::INITIALIZE_CORE,
        };
        let mut state = self.inner.state.lock();
        self.enter(&mut state, name, None)?;
        state.connection = Some(connection);
        state.shut_down = false;
        Ok(())
    }

    fn shut_down(&self) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::SHUT_DOWN, None)?;
        state.shut_down = true;
        state.connected_host = None;
        Ok(())
    }

    fn look_for_hosts(&self, _wait_seconds: u32, _loopback_only: bool) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::LOOK_FOR_HOSTS, None)
    }

    fn number_of_available_hosts(&self) -> Result<u32, SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_NUMBER_OF_AVAILABLE_HOSTS, None)?;
        Ok(state.hosts.len() as u32)
    }

    fn available_hosts(&self, hosts: &mut [ManusHost]) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_AVAILABLE_HOSTS, None)?;
        size_check(call::GET_AVAILABLE_HOSTS, state.hosts.len(), hosts.len())?;
        hosts.copy_from_slice(&state.hosts);
        Ok(())
    }

    fn connect_to_host(&self, host: &ManusHost) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::CONNECT_TO_HOST, None)?;
        if state.pending_connect_failures > 0 {
            state.pending_connect_failures -= 1;
            return Err(SdkError::new(call::CONNECT_TO_HOST, SdkReturnCode::NotConnected));
        }
        state.connected_host = Some(*host);
        Ok(())
    }

    fn register_log_callback(&self, callback: Arc<dyn StreamCallback>) -> Result<(), SdkError> {
        {
            let mut state = self.inner.state.lock();
            self.enter(&mut state, call::REGISTER_LOG_CALLBACK, None)?;
        }
        *self.inner.log_callback.lock() = Some(callback);
        Ok(())
    }

    fn register_stream_callbacks(
        &self,
        callback: Arc<dyn StreamCallback>,
    ) -> Result<(), SdkError> {
        {
            let mut state = self.inner.state.lock();
            self.enter(&mut state, call::REGISTER_STREAM_CALLBACKS, None)?;
        }
        *self.inner.stream_callback.lock() = Some(callback);
        Ok(())
    }

    fn unregister_callbacks(&self) -> Result<(), SdkError> {
        {
            let mut state = self.inner.state.lock();
            self.enter(&mut state, call::UNREGISTER_CALLBACKS, None)?;
        }
        *self.inner.log_callback.lock() = None;
        *self.inner.stream_callback.lock() = None;
        Ok(())
    }

    fn initialize_coordinate_system(
        &self,
        coordinate_system: CoordinateSystemVuh,
        world_space: bool,
    ) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::INITIALIZE_COORDINATE_SYSTEM, None)?;
        state.coordinate_system = Some((coordinate_system, world_space));
        Ok(())
    }

    fn raw_skeleton_info(&self, index: u32) -> Result<RawSkeletonInfo, SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_RAW_SKELETON_INFO, Some(index))?;
        let skeleton = state
            .skeletons
            .get(index as usize)
            .ok_or(SdkError::new(call::GET_RAW_SKELETON_INFO, SdkReturnCode::InvalidId))?;
        Ok(RawSkeletonInfo {
            glove_id: skeleton.glove_id,
            nodes_count: skeleton.nodes.len() as u32,
            publish_time: manus_protocol::ManusTimestamp { time: skeleton.publish_time },
        })
    }

    fn raw_skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_RAW_SKELETON_DATA, Some(index))?;
        let skeleton = state
            .skeletons
            .get(index as usize)
            .ok_or(SdkError::new(call::GET_RAW_SKELETON_DATA, SdkReturnCode::InvalidId))?;
        size_check(call::GET_RAW_SKELETON_DATA, skeleton.nodes.len(), nodes.len())?;
        nodes.copy_from_slice(&skeleton.nodes);
        Ok(())
    }

    fn raw_skeleton_node_info(
        &self,
        glove_id: u32,
        nodes: &mut [NodeInfo],
    ) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_RAW_SKELETON_NODE_INFO, Some(glove_id))?;
        let infos = state
            .node_infos
            .get(&glove_id)
            .ok_or(SdkError::new(call::GET_RAW_SKELETON_NODE_INFO, SdkReturnCode::InvalidId))?;
        size_check(call::GET_RAW_SKELETON_NODE_INFO, infos.len(), nodes.len())?;
        nodes.copy_from_slice(infos);
        Ok(())
    }

    fn raw_device_data(&self, index: u32) -> Result<RawDeviceData, SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_RAW_DEVICE_DATA, Some(index))?;
        state
            .raw_devices
            .get(index as usize)
            .copied()
            .ok_or(SdkError::new(call::GET_RAW_DEVICE_DATA, SdkReturnCode::InvalidId))
    }

    fn hand_motion(&self) -> Result<HandMotion, SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_HAND_MOTION, None)?;
        Ok(state.hand_motion)
    }

    fn set_hand_motion(&self, motion: HandMotion) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::SET_HAND_MOTION, None)?;
        state.hand_motion = motion;
        Ok(())
    }

    fn vibrate_fingers(
        &self,
        glove_id: u32,
        powers: &[f32; HAPTIC_MOTOR_COUNT],
    ) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::VIBRATE_FINGERS, Some(glove_id))?;
        state.vibrations.push((glove_id, *powers));
        Ok(())
    }

    fn set_glove_calibration(
        &self,
        glove_id: u32,
        data: &[u8],
    ) -> Result<CalibrationResult, SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::SET_GLOVE_CALIBRATION, Some(glove_id))?;
        state.calibrations.push((glove_id, data.to_vec()));
        Ok(state.calibration_result)
    }

    fn gesture_landscape_data(
        &self,
        gestures: &mut [GestureLandscapeData],
    ) -> Result<(), SdkError> {
        let mut state = self.inner.state.lock();
        self.enter(&mut state, call::GET_GESTURE_LANDSCAPE_DATA, None)?;
        size_check(call::GET_GESTURE_LANDSCAPE_DATA, state.gestures.len(), gestures.len())?;
        gestures.copy_from_slice(&state.gestures);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingCallback {
        skeletons: AtomicU32,
        landscapes: AtomicU32,
    }

    impl StreamCallback for CountingCallback {
        fn on_raw_skeleton(&self, info: SkeletonStreamInfo) {
            self.skeletons.fetch_add(info.skeletons_count, Ordering::Relaxed);
        }
        fn on_raw_device_data(&self, _info: RawDeviceDataInfo) {}
        fn on_ergonomics(&self, _stream: &ErgonomicsStream) {}
        fn on_landscape(&self, _landscape: &LandscapeData) {
            self.landscapes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_two_phase_size_mismatch() {
        let mock = MockCoreSdk::new();
        mock.set_skeletons(vec![MockSkeleton {
            glove_id: 7,
            publish_time: 1,
            nodes: vec![SkeletonNode::default(); 3],
        }]);

        let info = mock.raw_skeleton_info(0).unwrap();
        assert_eq!(info.glove_id, 7);
        assert_eq!(info.nodes_count, 3);

        let mut exact = vec![SkeletonNode::default(); 3];
        assert!(mock.raw_skeleton_data(0, &mut exact).is_ok());

        let mut short = vec![SkeletonNode::default(); 2];
        let err = mock.raw_skeleton_data(0, &mut short).unwrap_err();
        assert_eq!(err.code, SdkReturnCode::ArgumentSizeMismatch);

        let err = mock.raw_skeleton_info(5).unwrap_err();
        assert_eq!(err.code, SdkReturnCode::InvalidId);
    }

    #[test]
    fn test_failure_injection() {
        let mock = MockCoreSdk::new();
        mock.fail(call::SHUT_DOWN, SdkReturnCode::SdkIsTerminating);
        let err = mock.shut_down().unwrap_err();
        assert_eq!(err.call, call::SHUT_DOWN);
        assert!(err.is_terminal());

        mock.fail_at(call::VIBRATE_FINGERS, 3, SdkReturnCode::InvalidId);
        assert!(mock.vibrate_fingers(3, &[0.0; 5]).is_err());
        assert!(mock.vibrate_fingers(4, &[0.5; 5]).is_ok());
        assert_eq!(mock.vibrations(), vec![(4, [0.5; 5])]);

        mock.clear_failures();
        assert!(mock.shut_down().is_ok());
        assert!(mock.is_shut_down());
    }

    #[test]
    fn test_connect_failures_then_success() {
        let mock = MockCoreSdk::new();
        mock.set_connect_failures(2);
        let host = ManusHost::with_address("core", "10.0.0.2");
        assert_eq!(mock.connect_to_host(&host).unwrap_err().code, SdkReturnCode::NotConnected);
        assert_eq!(mock.connect_to_host(&host).unwrap_err().code, SdkReturnCode::NotConnected);
        assert!(mock.connect_to_host(&host).is_ok());
        assert_eq!(mock.connected_host().map(|h| h.ip()), Some("10.0.0.2".to_string()));
        assert_eq!(mock.call_count(call::CONNECT_TO_HOST), 3);
    }

    #[test]
    fn test_callbacks_stop_after_unregister() {
        let mock = MockCoreSdk::new();
        let callback = Arc::new(CountingCallback::default());
        mock.register_stream_callbacks(callback.clone()).unwrap();
        mock.set_skeletons(vec![MockSkeleton::default(), MockSkeleton::default()]);

        assert!(mock.fire_raw_skeleton());
        assert!(mock.fire_landscape(&LandscapeData::default()));
        assert_eq!(callback.skeletons.load(Ordering::Relaxed), 2);
        assert_eq!(callback.landscapes.load(Ordering::Relaxed), 1);

        mock.unregister_callbacks().unwrap();
        assert!(!mock.has_stream_callback());
        assert!(!mock.fire_raw_skeleton());
        assert_eq!(callback.skeletons.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockCoreSdk::new();
        let handle = mock.clone();
        mock.set_hand_motion(HandMotion::Imu).unwrap();
        assert_eq!(handle.current_hand_motion(), HandMotion::Imu);
        assert_eq!(handle.hand_motion().unwrap(), HandMotion::Imu);
    }
}
