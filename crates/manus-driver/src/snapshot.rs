//! 快照组装（读侧）
//!
//! 消费者唯一的数据接口。每次调用都重新构建一个自有的 [`GloveSnapshot`]，
//! 不与存储共享任何可变数据。
//!
//! 各分类分别在自己的临界区内读取，结果是最终一致的拼接：
//! 每个分类内部是原子的，分类之间不保证属于同一时刻。

use crate::error::DriverError;
use crate::state::*;
use manus_link::CoreSdk;
use manus_protocol::{ChainType, ErgonomicsDataType, FingerJointType, NodeInfo, Side};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 节点拓扑注解
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAnnotation {
    pub parent_id: u32,
    pub chain_type: ChainType,
    pub side: Side,
    pub joint_type: FingerJointType,
}

impl NodeAnnotation {
    /// 骨骼链显示名（例如 `"Index"`）
    pub fn chain_name(&self) -> &'static str {
        self.chain_type.as_str()
    }

    /// 关节显示名（例如 `"PIP"`）
    pub fn joint_name(&self) -> &'static str {
        self.joint_type.as_str()
    }
}

impl From<&HierarchyEntry> for NodeAnnotation {
    fn from(entry: &HierarchyEntry) -> Self {
        Self {
            parent_id: entry.parent_id,
            chain_type: entry.chain_type,
            side: entry.side,
            joint_type: entry.joint_type,
        }
    }
}

/// 带注解的节点
///
/// 节点拓扑拉取失败时 `annotation` 为 `None`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedNode {
    pub id: u32,
    pub position: [f32; 3],
    /// `[w, x, y, z]`
    pub rotation: [f32; 4],
    pub annotation: Option<NodeAnnotation>,
}

/// 单项人体工学数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErgonomicsValue {
    pub kind: ErgonomicsDataType,
    /// 与侧无关的显示名（例如 `"IndexSpread"`）
    pub name: &'static str,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSensorSnapshot {
    pub sensor_count: u32,
    pub orientation: [f32; 4],
    pub sensors: Vec<RawSensor>,
}

/// 单只手套的组装快照
#[derive(Debug, Clone, PartialEq)]
pub struct GloveSnapshot {
    pub device_id: u32,
    pub side: Side,
    pub publish_time: u64,
    /// 恒等于 `nodes.len()`
    pub node_count: usize,
    pub nodes: Vec<AnnotatedNode>,
    /// 本侧的 20 项（没有人体工学数据时为空）
    pub ergonomics: Vec<ErgonomicsValue>,
    /// 仅当存在且 `sensor_count > 0` 时包含
    pub raw_sensor: Option<RawSensorSnapshot>,
}

impl GloveSnapshot {
    pub fn is_annotated(&self) -> bool {
        self.nodes.iter().all(|n| n.annotation.is_some())
    }

    pub fn ergonomics_value(&self, kind: ErgonomicsDataType) -> Option<f32> {
        self.ergonomics.iter().find(|e| e.kind == kind).map(|e| e.value)
    }
}

/// 获取手套的节点拓扑（惰性，按手套 ID 缓存）
///
/// 只为当前拓扑中的手套拉取和缓存。拉取期间手套离开时，结果照常返回但不缓存。
///
/// # 错误
/// - `DriverError::UnknownDevice`: 手套不在当前拓扑中
/// - `DriverError::NoPoseDataYet`: 还没有节点数大于 0 的骨骼帧
/// - `DriverError::Sdk`: 拉取失败（不缓存，下次重试）
pub fn get_hierarchy(
    sdk: &dyn CoreSdk,
    ctx: &AggregatorContext,
    device_id: u32,
) -> Result<Arc<Vec<HierarchyEntry>>, DriverError> {
    let landscape = ctx
        .commit_landscape()
        .filter(|landscape| landscape.contains(device_id))
        .ok_or(DriverError::UnknownDevice(device_id))?;

    if let Some(cached) = ctx.hierarchy.get(device_id) {
        return Ok(cached);
    }

    let node_count = ctx
        .telemetry
        .pose
        .get(device_id)
        .map(|frame| frame.node_count())
        .filter(|&count| count > 0)
        .ok_or(DriverError::NoPoseDataYet(device_id))?;

    // 锁外调用驱动
    let mut buffer = vec![NodeInfo::default(); node_count];
    sdk.raw_skeleton_node_info(device_id, &mut buffer)?;

    let entries = buffer.iter().map(HierarchyEntry::from).collect();
    Ok(ctx.hierarchy.insert(device_id, landscape.generation, entries))
}

/// 组装快照
///
/// 1. 提交拓扑；手套不在拓扑中 ⇒ `None`
/// 2. 没有骨骼帧或节点数为 0 ⇒ `None`
/// 3. 节点拓扑（惰性）；失败时节点不带注解
/// 4. 人体工学按手套所在侧过滤
/// 5. 原始传感器仅在 `sensor_count > 0` 时包含
pub fn assemble(sdk: &dyn CoreSdk, ctx: &AggregatorContext, device_id: u32) -> Option<GloveSnapshot> {
    let landscape = ctx.commit_landscape()?;
    let side = landscape.device(device_id)?.side;

    let pose = ctx.telemetry.pose.get(device_id)?;
    if pose.nodes.is_empty() {
        return None;
    }

    let annotations: HashMap<u32, NodeAnnotation> = match get_hierarchy(sdk, ctx, device_id) {
        Ok(entries) => entries.iter().map(|e| (e.node_id, NodeAnnotation::from(e))).collect(),
        Err(e) => {
            debug!("Hierarchy unavailable for glove {}: {}", device_id, e);
            HashMap::new()
        },
    };

    let nodes: Vec<AnnotatedNode> = pose
        .nodes
        .iter()
        .map(|node| AnnotatedNode {
            id: node.id,
            position: node.position,
            rotation: node.rotation,
            annotation: annotations.get(&node.id).copied(),
        })
        .collect();

    let ergonomics: Vec<ErgonomicsValue> = ctx
        .telemetry
        .ergonomics
        .get(device_id)
        .map(|frame| {
            ErgonomicsDataType::for_side(side)
                .map(|kind| ErgonomicsValue {
                    kind,
                    name: kind.as_str(),
                    value: frame.values[kind.index()],
                })
                .collect()
        })
        .unwrap_or_default();

    let raw_sensor = ctx
        .telemetry
        .raw_sensor
        .get(device_id)
        .filter(|frame| frame.sensor_count > 0)
        .map(|frame| RawSensorSnapshot {
            sensor_count: frame.sensor_count,
            orientation: frame.orientation,
            sensors: frame.sensors.clone(),
        });

    Some(GloveSnapshot {
        device_id,
        side,
        publish_time: pose.publish_time,
        node_count: nodes.len(),
        nodes,
        ergonomics,
        raw_sensor,
    })
}
