//! 测试辅助函数
//!
//! 提供快速搭建 Mock 驱动与聚合器的工具函数。

#![allow(dead_code)]

use manus_driver::{Aggregator, AggregatorConfig};
use manus_link::MockCoreSdk;
use manus_link::mock::MockSkeleton;
use manus_protocol::{
    ChainType, FingerJointType, GloveLandscapeData, LandscapeData, ManusQuaternion,
    ManusTransform, ManusVec3, NodeInfo, Side, SkeletonNode,
};
use std::time::{Duration, Instant};

/// 测试用配置：重试间隔和接收超时都很短
pub fn fast_config() -> AggregatorConfig {
    let mut config = AggregatorConfig::default();
    config.connect.retry_interval_ms = 1;
    config.pipeline.receive_timeout_ms = 5;
    config.pipeline.join_timeout_ms = 1000;
    config
}

/// 创建 Mock 驱动并构造聚合器，返回测试持有的 Mock 克隆
pub fn setup() -> (MockCoreSdk, Aggregator) {
    let sdk = MockCoreSdk::new();
    let aggregator = Aggregator::new(sdk.clone(), fast_config()).expect("aggregator");
    (sdk, aggregator)
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub const WAIT: Duration = Duration::from_secs(2);

pub fn glove(id: u32, side: Side, is_haptics: bool) -> GloveLandscapeData {
    GloveLandscapeData { id, side, is_haptics, ..Default::default() }
}

/// 一左一右两只手套，左手带振动
pub fn pair_landscape() -> LandscapeData {
    LandscapeData {
        gloves: vec![glove(1, Side::Left, true), glove(2, Side::Right, false)],
        ..Default::default()
    }
}

/// 节点 `i` 的位置为 `(i, base, 0)`，便于识别来源
pub fn skeleton(glove_id: u32, nodes: u32, base: f32, publish_time: u64) -> MockSkeleton {
    MockSkeleton {
        glove_id,
        publish_time,
        nodes: (0..nodes)
            .map(|id| SkeletonNode {
                id,
                transform: ManusTransform {
                    position: ManusVec3::new(id as f32, base, 0.0),
                    rotation: ManusQuaternion::IDENTITY,
                    ..Default::default()
                },
            })
            .collect(),
    }
}

/// 节点 0 为手腕，其余为食指关节
pub fn node_info(nodes: u32, side: Side) -> Vec<NodeInfo> {
    (0..nodes)
        .map(|id| NodeInfo {
            node_id: id,
            parent_id: id.saturating_sub(1),
            chain_type: if id == 0 {
                ChainType::Hand.into()
            } else {
                ChainType::FingerIndex.into()
            },
            side: side.into(),
            finger_joint_type: if id == 0 {
                FingerJointType::Invalid.into()
            } else {
                FingerJointType::Proximal.into()
            },
        })
        .collect()
}
