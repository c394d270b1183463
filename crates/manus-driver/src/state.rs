//! 状态结构定义
//!
//! 采集线程是唯一的写者，消费线程随时读取。
//!
//! - 三个遥测分类（骨骼、原始传感器、人体工学）各自一把锁，互不嵌套
//! - 拓扑使用双缓冲：采集写 `pending`，读操作开始时提交到 `committed`（ArcSwap 无锁读取）
//! - 节点拓扑按手套 ID 惰性缓存，手套离开拓扑后失效
//!
//! 每个临界区只做一次 map 读取或替换，不会在持锁期间调用驱动。

use crate::metrics::IngestMetrics;
use arc_swap::ArcSwapOption;
use manus_protocol::{
    ChainType, FingerJointType, GloveLandscapeData, LandscapeData, LicenseInfo, NodeInfo, Side,
    ERGONOMICS_DATA_SIZE,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// 遥测帧
// ============================================================================

/// 骨骼节点（位置 + 四元数 `[w, x, y, z]`）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Node {
    pub id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// 单只手套的骨骼帧（整体替换，不做部分合并）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseFrame {
    pub device_id: u32,
    /// 驱动发布时间
    pub publish_time: u64,
    /// 节点（保持驱动给出的顺序）
    pub nodes: Vec<Node>,
}

impl PoseFrame {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// 原始传感器（位置 + 四元数）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSensor {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSensorFrame {
    pub device_id: u32,
    pub sensor_count: u32,
    /// 手套整体朝向
    pub orientation: [f32; 4],
    pub sensors: Vec<RawSensor>,
}

/// 人体工学帧（40 项，0-19 左手，20-39 右手）
#[derive(Debug, Clone, PartialEq)]
pub struct ErgonomicsFrame {
    pub device_id: u32,
    pub values: [f32; ERGONOMICS_DATA_SIZE],
}

// ============================================================================
// 拓扑
// ============================================================================

/// 拓扑中的设备（手套）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Device {
    pub id: u32,
    pub side: Side,
    pub has_haptics: bool,
    pub family_type: i32,
    pub battery_percentage: i32,
    pub dongle_id: u32,
    pub excluded: bool,
}

impl From<&GloveLandscapeData> for Device {
    fn from(glove: &GloveLandscapeData) -> Self {
        Self {
            id: glove.id,
            side: glove.side,
            has_haptics: glove.is_haptics,
            family_type: glove.family_type,
            battery_percentage: glove.battery_percentage,
            dongle_id: glove.dongle_id,
            excluded: glove.excluded,
        }
    }
}

/// 已提交的拓扑快照
///
/// 每次推送都是一个完整的替换对象，读者不会看到两次推送混合的字段。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Landscape {
    /// 推送序号（单调递增，从 1 开始）
    pub generation: u64,
    pub devices: Vec<Device>,
    pub dongle_count: u32,
    pub gesture_count: u32,
    pub license: LicenseInfo,
    pub playback_mode: bool,
}

impl Landscape {
    pub fn from_data(generation: u64, data: &LandscapeData) -> Self {
        Self {
            generation,
            devices: data.gloves.iter().map(Device::from).collect(),
            dongle_count: data.dongle_count,
            gesture_count: data.gesture_count,
            license: data.license,
            playback_mode: data.playback_mode,
        }
    }

    pub fn device(&self, id: u32) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.device(id).is_some()
    }
}

/// 手势表条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    pub id: u32,
    pub name: String,
}

/// 节点拓扑条目（每次连接内静态）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub node_id: u32,
    pub parent_id: u32,
    pub chain_type: ChainType,
    pub side: Side,
    pub joint_type: FingerJointType,
}

impl From<&NodeInfo> for HierarchyEntry {
    fn from(info: &NodeInfo) -> Self {
        Self {
            node_id: info.node_id,
            parent_id: info.parent_id,
            chain_type: info.chain(),
            side: info.side(),
            joint_type: info.joint(),
        }
    }
}

// ============================================================================
// 遥测存储
// ============================================================================

struct FrameSlots<T> {
    frames: HashMap<u32, Arc<T>>,
    /// 关闭后丢弃所有写入（拆除期间驱动仍可能回调）
    closed: bool,
}

/// 单个分类的帧存储（一把锁）
pub struct FrameMap<T> {
    inner: Mutex<FrameSlots<T>>,
}

impl<T> Default for FrameMap<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(FrameSlots {
                frames: HashMap::new(),
                closed: false,
            }),
        }
    }
}

impl<T> FrameMap<T> {
    /// 获取不可变句柄
    pub fn get(&self, device_id: u32) -> Option<Arc<T>> {
        self.inner.lock().frames.get(&device_id).cloned()
    }

    /// 整体替换（帧在锁外构建好再传入）
    ///
    /// 存储已关闭时返回 `false`。
    pub fn put(&self, device_id: u32, frame: T) -> bool {
        let frame = Arc::new(frame);
        let mut slots = self.inner.lock();
        if slots.closed {
            return false;
        }
        slots.frames.insert(device_id, frame);
        true
    }

    /// 已存储的设备 ID（升序）
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.inner.lock().frames.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空并拒绝后续写入
    pub fn close(&self) {
        let mut slots = self.inner.lock();
        slots.closed = true;
        slots.frames.clear();
    }
}

/// 遥测存储（三个独立加锁的分类）
#[derive(Default)]
pub struct TelemetryStore {
    pub pose: FrameMap<PoseFrame>,
    pub raw_sensor: FrameMap<RawSensorFrame>,
    pub ergonomics: FrameMap<ErgonomicsFrame>,
}

impl TelemetryStore {
    pub fn close(&self) {
        self.pose.close();
        self.raw_sensor.close();
        self.ergonomics.close();
    }
}

// ============================================================================
// 拓扑缓存（双缓冲）
// ============================================================================

#[derive(Default)]
struct PendingLandscape {
    landscape: Option<Landscape>,
    generation: u64,
    closed: bool,
}

/// 拓扑缓存
///
/// - `pending`: 采集写入（只保留最新一个，Last Write Wins）
/// - `committed`: 消费读取（ArcSwap，提交后无锁读取）
///
/// 提交在 `pending` 锁内完成交换，两个并发的提交不会把新拓扑回退成旧拓扑。
#[derive(Default)]
pub struct LandscapeCache {
    pending: Mutex<PendingLandscape>,
    committed: ArcSwapOption<Landscape>,
}

impl LandscapeCache {
    /// 暂存一个新推送的拓扑（覆盖尚未提交的旧拓扑）
    ///
    /// 返回分配的推送序号；缓存已关闭时返回 `None`。
    pub fn stage(&self, data: &LandscapeData) -> Option<u64> {
        // 锁外转换，锁内只做序号分配和替换
        let mut landscape = Landscape::from_data(0, data);
        let mut pending = self.pending.lock();
        if pending.closed {
            return None;
        }
        pending.generation += 1;
        landscape.generation = pending.generation;
        pending.landscape = Some(landscape);
        Some(pending.generation)
    }

    /// 把 `pending` 提交到 `committed`
    ///
    /// 返回本次新安装的拓扑（没有待提交的拓扑时返回 `None`）。
    pub fn commit(&self) -> Option<Arc<Landscape>> {
        let mut pending = self.pending.lock();
        let landscape = Arc::new(pending.landscape.take()?);
        self.committed.store(Some(landscape.clone()));
        Some(landscape)
    }

    /// 当前已提交的拓扑（不触发提交）
    pub fn current(&self) -> Option<Arc<Landscape>> {
        self.committed.load_full()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().landscape.is_some()
    }

    /// 清空并拒绝后续推送
    pub fn close(&self) {
        let mut pending = self.pending.lock();
        pending.closed = true;
        pending.landscape = None;
        self.committed.store(None);
    }
}

// ============================================================================
// 节点拓扑缓存
// ============================================================================

#[derive(Default)]
struct HierarchySlots {
    entries: HashMap<u32, Arc<Vec<HierarchyEntry>>>,
    /// 最近一次淘汰所依据的拓扑代数
    roster_generation: u64,
    closed: bool,
}

/// 按手套 ID 缓存的节点拓扑
///
/// 写入带上拉取前确认成员资格时的拓扑代数：拉取期间若有更新的拓扑完成了淘汰，
/// 结果只返回给调用者，不进入缓存。
#[derive(Default)]
pub struct HierarchyCache {
    inner: Mutex<HierarchySlots>,
}

impl HierarchyCache {
    pub fn get(&self, device_id: u32) -> Option<Arc<Vec<HierarchyEntry>>> {
        self.inner.lock().entries.get(&device_id).cloned()
    }

    /// 缓存一次成功拉取的结果，返回缓存中的值
    ///
    /// - 已有缓存时保留旧值（并发拉取只有第一个生效）
    /// - `generation` 早于最近一次淘汰的拓扑时不缓存
    pub fn insert(
        &self,
        device_id: u32,
        generation: u64,
        entries: Vec<HierarchyEntry>,
    ) -> Arc<Vec<HierarchyEntry>> {
        let entries = Arc::new(entries);
        let mut slots = self.inner.lock();
        if slots.closed || generation < slots.roster_generation {
            return entries;
        }
        slots.entries.entry(device_id).or_insert(entries).clone()
    }

    /// 移除不在拓扑中的手套，返回移除数量
    ///
    /// 比已处理过的拓扑更旧的拓扑被忽略。
    pub fn retain_roster(&self, landscape: &Landscape) -> usize {
        let mut slots = self.inner.lock();
        if landscape.generation < slots.roster_generation {
            return 0;
        }
        slots.roster_generation = landscape.generation;
        let before = slots.entries.len();
        slots.entries.retain(|id, _| landscape.contains(*id));
        before - slots.entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn close(&self) {
        let mut slots = self.inner.lock();
        slots.closed = true;
        slots.entries.clear();
    }
}

// ============================================================================
// 校准状态
// ============================================================================

/// 单侧校准状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SideCalibration {
    pub loaded: bool,
    /// 配置的校准文件路径（加载成功后更新为实际使用的路径）
    pub path: Option<PathBuf>,
}

/// 左右手校准状态（只由校准加载器修改）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalibrationState {
    pub left: SideCalibration,
    pub right: SideCalibration,
}

impl CalibrationState {
    pub fn with_paths(left: Option<PathBuf>, right: Option<PathBuf>) -> Self {
        Self {
            left: SideCalibration { loaded: false, path: left },
            right: SideCalibration { loaded: false, path: right },
        }
    }

    /// `Center` / `Invalid` 没有校准
    pub fn side(&self, side: Side) -> Option<&SideCalibration> {
        match side {
            Side::Left => Some(&self.left),
            Side::Right => Some(&self.right),
            Side::Center | Side::Invalid => None,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> Option<&mut SideCalibration> {
        match side {
            Side::Left => Some(&mut self.left),
            Side::Right => Some(&mut self.right),
            Side::Center | Side::Invalid => None,
        }
    }
}

// ============================================================================
// 共享上下文
// ============================================================================

/// 聚合器共享状态上下文
///
/// 采集线程、驱动回调线程和消费线程共享同一个 `Arc<AggregatorContext>`。
pub struct AggregatorContext {
    pub telemetry: TelemetryStore,
    pub landscape: LandscapeCache,
    pub hierarchy: HierarchyCache,
    pub calibration: Mutex<CalibrationState>,
    pub metrics: IngestMetrics,
}

impl AggregatorContext {
    pub fn new(calibration: CalibrationState) -> Self {
        Self {
            telemetry: TelemetryStore::default(),
            landscape: LandscapeCache::default(),
            hierarchy: HierarchyCache::default(),
            calibration: Mutex::new(calibration),
            metrics: IngestMetrics::new(),
        }
    }

    /// 提交待定拓扑并返回当前拓扑
    ///
    /// 每个读操作开始时调用。新拓扑安装后，在拓扑锁外清理已离开的手套的节点拓扑缓存。
    pub fn commit_landscape(&self) -> Option<Arc<Landscape>> {
        if let Some(installed) = self.landscape.commit() {
            let evicted = self.hierarchy.retain_roster(&installed);
            if evicted > 0 {
                tracing::debug!(
                    "Landscape generation {} evicted {} hierarchy entries",
                    installed.generation,
                    evicted
                );
            }
            return Some(installed);
        }
        self.landscape.current()
    }

    /// 清空所有存储，之后的写入被忽略
    pub fn close(&self) {
        self.telemetry.close();
        self.landscape.close();
        self.hierarchy.close();
    }
}

impl Default for AggregatorContext {
    fn default() -> Self {
        Self::new(CalibrationState::default())
    }
}
