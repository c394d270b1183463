//! # Manus Link
//!
//! Manus Core SDK 调用抽象层。
//!
//! 驱动本身（主机发现、握手、坐标协商）不在本 crate 的范围内，
//! 这里只定义调用契约：
//!
//! - [`CoreSdk`]: 所有驱动入口函数（两阶段：先取数量/信息，再按数量拉取）
//! - [`StreamCallback`]: 驱动在自己的线程上触发的回调
//! - `MockCoreSdk`（`mock` feature）：脚本化的进程内驱动，用于测试

use manus_protocol::{
    CalibrationResult, ConnectionType, CoordinateSystemVuh, ErgonomicsStream,
    GestureLandscapeData, HandMotion, LandscapeData, LogSeverity, ManusHost, NodeInfo,
    RawDeviceData, RawDeviceDataInfo, RawSkeletonInfo, SdkError, SkeletonNode,
    SkeletonStreamInfo, HAPTIC_MOTOR_COUNT,
};
use std::sync::Arc;

pub use manus_protocol;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockCoreSdk;

/// SDK 入口函数名（用于错误信息与调用记录）
pub mod call {
    pub const INITIALIZE_INTEGRATED: &str = "CoreSdk_InitializeIntegrated";
    pub const INITIALIZE_CORE: &str = "CoreSdk_InitializeCore";
    pub const SHUT_DOWN: &str = "CoreSdk_ShutDown";
    pub const LOOK_FOR_HOSTS: &str = "CoreSdk_LookForHosts";
    pub const GET_NUMBER_OF_AVAILABLE_HOSTS: &str = "CoreSdk_GetNumberOfAvailableHostsFound";
    pub const GET_AVAILABLE_HOSTS: &str = "CoreSdk_GetAvailableHostsFound";
    pub const CONNECT_TO_HOST: &str = "CoreSdk_ConnectToHost";
    pub const REGISTER_LOG_CALLBACK: &str = "CoreSdk_RegisterCallbackForOnLog";
    pub const REGISTER_STREAM_CALLBACKS: &str = "CoreSdk_RegisterStreamCallbacks";
    pub const UNREGISTER_CALLBACKS: &str = "CoreSdk_UnregisterCallbacks";
    pub const INITIALIZE_COORDINATE_SYSTEM: &str = "CoreSdk_InitializeCoordinateSystemWithVUH";
    pub const GET_RAW_SKELETON_INFO: &str = "CoreSdk_GetRawSkeletonInfo";
    pub const GET_RAW_SKELETON_DATA: &str = "CoreSdk_GetRawSkeletonData";
    pub const GET_RAW_SKELETON_NODE_INFO: &str = "CoreSdk_GetRawSkeletonNodeInfoArray";
    pub const GET_RAW_DEVICE_DATA: &str = "CoreSdk_GetRawDeviceData";
    pub const GET_HAND_MOTION: &str = "CoreSdk_GetHandMotion";
    pub const SET_HAND_MOTION: &str = "CoreSdk_SetHandMotion";
    pub const VIBRATE_FINGERS: &str = "CoreSdk_VibrateFingersForGlove";
    pub const SET_GLOVE_CALIBRATION: &str = "CoreSdk_SetGloveCalibration";
    pub const GET_GESTURE_LANDSCAPE_DATA: &str = "CoreSdk_GetGestureLandscapeData";
}

/// 驱动回调 Trait
///
/// 所有方法都在驱动自己的线程上调用，可能与任何读操作并发。
///
/// # 性能要求
///
/// - **非阻塞**: 实现只应做转发（推荐 `crossbeam_channel::Sender::try_send`）
/// - **禁止回调驱动**: 在回调中调用 [`CoreSdk`] 可能与驱动内部锁死锁
pub trait StreamCallback: Send + Sync {
    /// 驱动日志
    fn on_log(&self, severity: LogSeverity, message: &str) {
        let _ = (severity, message);
    }

    /// 原始骨骼数据就绪（只带数量，数据需按下标拉取）
    fn on_raw_skeleton(&self, info: SkeletonStreamInfo);

    /// 原始设备数据就绪（只带数量）
    fn on_raw_device_data(&self, info: RawDeviceDataInfo);

    /// 人体工学数据推送（完整载荷）
    fn on_ergonomics(&self, stream: &ErgonomicsStream);

    /// 拓扑变化（完整替换对象）
    fn on_landscape(&self, landscape: &LandscapeData);
}

/// Manus Core SDK 调用契约
///
/// 所有方法都接收 `&self`：驱动内部自行同步，允许采集线程与消费线程并发调用。
///
/// # 两阶段拉取
///
/// 批量数据先通过信息/数量调用得到 N，再传入调用方分配的、长度恰好为 N 的缓冲区。
/// 驱动不会调整缓冲区大小；长度不符时返回 `ArgumentSizeMismatch`。
pub trait CoreSdk: Send + Sync {
    // ---- 生命周期 ----

    /// 初始化驱动（集成模式或 Core 模式，由连接方式决定）
    fn initialize(&self, connection: ConnectionType) -> Result<(), SdkError>;

    fn shut_down(&self) -> Result<(), SdkError>;

    // ---- 连接 ----

    /// 搜索主机（阻塞最多 `wait_seconds` 秒）
    fn look_for_hosts(&self, wait_seconds: u32, loopback_only: bool) -> Result<(), SdkError>;

    fn number_of_available_hosts(&self) -> Result<u32, SdkError>;

    /// 拉取主机数组（`hosts.len()` 必须等于主机数量）
    fn available_hosts(&self, hosts: &mut [ManusHost]) -> Result<(), SdkError>;

    fn connect_to_host(&self, host: &ManusHost) -> Result<(), SdkError>;

    // ---- 回调 ----

    fn register_log_callback(&self, callback: Arc<dyn StreamCallback>) -> Result<(), SdkError>;

    /// 注册骨骼 / 原始设备 / 人体工学 / 拓扑回调
    fn register_stream_callbacks(&self, callback: Arc<dyn StreamCallback>)
    -> Result<(), SdkError>;

    /// 注销全部回调（返回后驱动不再调用任何回调）
    fn unregister_callbacks(&self) -> Result<(), SdkError>;

    fn initialize_coordinate_system(
        &self,
        coordinate_system: CoordinateSystemVuh,
        world_space: bool,
    ) -> Result<(), SdkError>;

    // ---- 流数据拉取 ----

    fn raw_skeleton_info(&self, index: u32) -> Result<RawSkeletonInfo, SdkError>;

    /// 拉取第 `index` 个骨骼的节点（`nodes.len()` 必须等于 `nodes_count`）
    fn raw_skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> Result<(), SdkError>;

    /// 拉取手套的节点拓扑（`nodes.len()` 必须等于该手套的节点数）
    fn raw_skeleton_node_info(&self, glove_id: u32, nodes: &mut [NodeInfo])
    -> Result<(), SdkError>;

    fn raw_device_data(&self, index: u32) -> Result<RawDeviceData, SdkError>;

    // ---- 控制 ----

    fn hand_motion(&self) -> Result<HandMotion, SdkError>;

    fn set_hand_motion(&self, motion: HandMotion) -> Result<(), SdkError>;

    /// 振动（恰好 5 个强度，取值 [0, 1]）
    fn vibrate_fingers(
        &self,
        glove_id: u32,
        powers: &[f32; HAPTIC_MOTOR_COUNT],
    ) -> Result<(), SdkError>;

    /// 上传校准数据
    ///
    /// 外层 `Result` 是传输层结果，`Ok` 内是语义结果。
    fn set_glove_calibration(
        &self,
        glove_id: u32,
        data: &[u8],
    ) -> Result<CalibrationResult, SdkError>;

    /// 拉取手势表（`gestures.len()` 必须等于拓扑中的 `gesture_count`）
    fn gesture_landscape_data(&self, gestures: &mut [GestureLandscapeData])
    -> Result<(), SdkError>;
}
