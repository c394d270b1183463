//! 流数据结构
//!
//! 驱动回调只携带摘要（数量 + 发布时间），具体数据需要按下标拉取。

use crate::enums::ERGONOMICS_DATA_SIZE;

/// 每只手套原始设备数据中的传感器槽位数
pub const MAX_RAW_SENSORS: usize = 5;

/// 一次人体工学推送中最多携带的条目数
pub const MAX_ERGONOMICS_ENTRIES: usize = 32;

/// 振动电机数量（每根手指一个）
pub const HAPTIC_MOTOR_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct ManusVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ManusVec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// 四元数（w 在前）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct ManusQuaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ManusQuaternion {
    pub const IDENTITY: Self = Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// `[w, x, y, z]`
    pub fn to_array(self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl Default for ManusQuaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct ManusTransform {
    pub position: ManusVec3,
    pub rotation: ManusQuaternion,
    pub scale: ManusVec3,
}

impl Default for ManusTransform {
    fn default() -> Self {
        Self {
            position: ManusVec3::default(),
            rotation: ManusQuaternion::IDENTITY,
            scale: ManusVec3::new(1.0, 1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct ManusTimestamp {
    pub time: u64,
}

// ============================================================================
// 骨骼
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct SkeletonNode {
    pub id: u32,
    pub transform: ManusTransform,
}

/// 单只手套原始骨骼的信息（拉取节点数组前调用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct RawSkeletonInfo {
    pub glove_id: u32,
    pub nodes_count: u32,
    pub publish_time: ManusTimestamp,
}

/// 骨骼流回调摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct SkeletonStreamInfo {
    pub publish_time: ManusTimestamp,
    pub skeletons_count: u32,
}

/// 骨骼节点拓扑信息（原始数值，解析见 [`NodeInfo::chain`] 等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct NodeInfo {
    pub node_id: u32,
    pub parent_id: u32,
    pub chain_type: i32,
    pub side: i32,
    pub finger_joint_type: i32,
}

impl NodeInfo {
    pub fn chain(&self) -> crate::ChainType {
        crate::ChainType::from(self.chain_type)
    }

    pub fn side(&self) -> crate::Side {
        crate::Side::from(self.side)
    }

    pub fn joint(&self) -> crate::FingerJointType {
        crate::FingerJointType::from(self.finger_joint_type)
    }
}

// ============================================================================
// 原始设备数据
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct RawDeviceData {
    pub id: u32,
    /// 有效传感器数量（`sensor_data` 中前 `sensor_count` 项有效）
    pub sensor_count: u32,
    pub sensor_data: [ManusTransform; MAX_RAW_SENSORS],
    /// 手套整体朝向
    pub rotation: ManusQuaternion,
}

impl RawDeviceData {
    /// 有效的传感器变换（截断到数组容量）
    pub fn sensors(&self) -> &[ManusTransform] {
        let n = (self.sensor_count as usize).min(MAX_RAW_SENSORS);
        &self.sensor_data[..n]
    }
}

/// 原始设备数据流回调摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct RawDeviceDataInfo {
    pub publish_time: ManusTimestamp,
    pub raw_device_data_count: u32,
}

// ============================================================================
// 人体工学
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct ErgonomicsData {
    pub id: u32,
    /// `id` 是用户 ID 而不是手套 ID（聚合时跳过）
    pub is_user_id: bool,
    pub data: [f32; ERGONOMICS_DATA_SIZE],
}

// 长度超过 32 的数组没有 Default 实现
impl Default for ErgonomicsData {
    fn default() -> Self {
        Self { id: 0, is_user_id: false, data: [0.0; ERGONOMICS_DATA_SIZE] }
    }
}

/// 人体工学数据推送（完整载荷随回调一起到达）
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct ErgonomicsStream {
    pub publish_time: ManusTimestamp,
    pub data: [ErgonomicsData; MAX_ERGONOMICS_ENTRIES],
    pub data_count: u32,
}

impl Default for ErgonomicsStream {
    fn default() -> Self {
        Self {
            publish_time: ManusTimestamp::default(),
            data: [ErgonomicsData::default(); MAX_ERGONOMICS_ENTRIES],
            data_count: 0,
        }
    }
}

impl ErgonomicsStream {
    /// 有效条目（截断到数组容量）
    pub fn entries(&self) -> &[ErgonomicsData] {
        let n = (self.data_count as usize).min(MAX_ERGONOMICS_ENTRIES);
        &self.data[..n]
    }

    /// 追加一个条目，容量已满时返回 `false`
    pub fn push(&mut self, entry: ErgonomicsData) -> bool {
        let n = self.data_count as usize;
        if n >= MAX_ERGONOMICS_ENTRIES {
            return false;
        }
        self.data[n] = entry;
        self.data_count += 1;
        true
    }
}
