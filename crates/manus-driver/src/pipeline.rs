//! Pipeline 采集循环模块
//!
//! 驱动回调只把摘要放进有界队列（见 [`crate::hooks`]），
//! 后台采集线程从队列取出通知，执行两阶段拉取并整体替换存储中的帧。
//!
//! # 两阶段拉取
//!
//! 1. 通知携带数量 N
//! 2. 对 `0..N` 逐个拉取；单条失败记录日志并跳过，
//!    驱动不可用 / 正在关闭时放弃本轮剩余拉取
//! 3. 在锁外构建完整的帧，再获取一次分类锁整体替换

use crate::state::*;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use manus_link::CoreSdk;
use manus_protocol::{
    ErgonomicsStream, RawDeviceDataInfo, SdkError, SkeletonNode, SkeletonStreamInfo,
};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use manus_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     queue_capacity: 16,
///     ..Default::default()
/// };
/// assert_eq!(config.receive_timeout_ms, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 通知队列容量（满时丢弃新通知并计数）
    pub queue_capacity: usize,
    /// 采集线程等待通知的超时（毫秒），超时后检查运行标志
    pub receive_timeout_ms: u64,
    /// 拆除时等待采集线程退出的上限（毫秒）
    pub join_timeout_ms: u64,
    /// 把驱动日志转发到 `tracing`（target `manus_sdk`）
    pub forward_sdk_logs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            receive_timeout_ms: 50,
            join_timeout_ms: 2000,
            forward_sdk_logs: true,
        }
    }
}

impl PipelineConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::DriverError> {
        if self.queue_capacity == 0 {
            return Err(crate::DriverError::InvalidConfig(
                "pipeline.queue_capacity must be at least 1".into(),
            ));
        }
        if self.receive_timeout_ms == 0 {
            return Err(crate::DriverError::InvalidConfig(
                "pipeline.receive_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// 驱动回调转交给采集线程的通知
#[derive(Debug, Clone)]
pub enum Notification {
    RawSkeleton(SkeletonStreamInfo),
    RawDeviceData(RawDeviceDataInfo),
    /// 人体工学载荷随回调一起到达，直接转交
    Ergonomics(Box<ErgonomicsStream>),
}

/// 一轮拉取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOutcome {
    /// 写入存储的帧数
    pub stored: u32,
    /// 失败并跳过的条目数
    pub failed: u32,
    /// 因驱动离开而放弃了剩余条目
    pub aborted: bool,
}

impl PassOutcome {
    fn record(&self, ctx: &AggregatorContext) {
        ctx.metrics.fetch_failures.fetch_add(self.failed as u64, Ordering::Relaxed);
        if self.aborted {
            ctx.metrics.aborted_passes.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// 对单次拉取结果分类
///
/// - `Continue(Some)`: 成功
/// - `Continue(None)`: 失败，跳过该条目
/// - `Break`: 驱动不可用或正在关闭，放弃本轮
fn classify<T>(
    result: Result<T, SdkError>,
    index: u32,
    outcome: &mut PassOutcome,
) -> ControlFlow<(), Option<T>> {
    match result {
        Ok(value) => ControlFlow::Continue(Some(value)),
        Err(e) if e.is_terminal() => {
            debug!("Driver leaving ({}), aborting pass at index {}", e, index);
            outcome.aborted = true;
            ControlFlow::Break(())
        },
        Err(e) => {
            warn!("Skipping index {}: {}", index, e);
            outcome.failed += 1;
            ControlFlow::Continue(None)
        },
    }
}

/// 拉取全部骨骼并写入存储
pub fn pull_raw_skeletons(
    sdk: &dyn CoreSdk,
    ctx: &AggregatorContext,
    info: SkeletonStreamInfo,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    for index in 0..info.skeletons_count {
        let skeleton = match classify(sdk.raw_skeleton_info(index), index, &mut outcome) {
            ControlFlow::Break(()) => break,
            ControlFlow::Continue(None) => continue,
            ControlFlow::Continue(Some(skeleton)) => skeleton,
        };
        // 空骨骼无法确定拓扑，保留上一帧
        if skeleton.nodes_count == 0 {
            trace!("Skipping empty skeleton for glove {} at index {}", skeleton.glove_id, index);
            continue;
        }

        let mut buffer = vec![SkeletonNode::default(); skeleton.nodes_count as usize];
        match classify(sdk.raw_skeleton_data(index, &mut buffer), index, &mut outcome) {
            ControlFlow::Break(()) => break,
            ControlFlow::Continue(None) => continue,
            ControlFlow::Continue(Some(())) => {},
        }

        let frame = PoseFrame {
            device_id: skeleton.glove_id,
            publish_time: skeleton.publish_time.time,
            nodes: buffer
                .iter()
                .map(|node| Node {
                    id: node.id,
                    position: node.transform.position.to_array(),
                    rotation: node.transform.rotation.to_array(),
                })
                .collect(),
        };
        if ctx.telemetry.pose.put(skeleton.glove_id, frame) {
            outcome.stored += 1;
        }
    }

    ctx.metrics.pose_frames.fetch_add(outcome.stored as u64, Ordering::Relaxed);
    outcome.record(ctx);
    outcome
}

/// 拉取全部原始设备数据并写入存储
pub fn pull_raw_device_data(
    sdk: &dyn CoreSdk,
    ctx: &AggregatorContext,
    info: RawDeviceDataInfo,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    for index in 0..info.raw_device_data_count {
        let raw = match classify(sdk.raw_device_data(index), index, &mut outcome) {
            ControlFlow::Break(()) => break,
            ControlFlow::Continue(None) => continue,
            ControlFlow::Continue(Some(raw)) => raw,
        };

        let frame = RawSensorFrame {
            device_id: raw.id,
            sensor_count: raw.sensor_count,
            orientation: raw.rotation.to_array(),
            sensors: raw
                .sensors()
                .iter()
                .map(|t| RawSensor {
                    position: t.position.to_array(),
                    rotation: t.rotation.to_array(),
                })
                .collect(),
        };
        if ctx.telemetry.raw_sensor.put(raw.id, frame) {
            outcome.stored += 1;
        }
    }

    ctx.metrics.raw_sensor_frames.fetch_add(outcome.stored as u64, Ordering::Relaxed);
    outcome.record(ctx);
    outcome
}

/// 写入人体工学数据（跳过用户 ID 条目）
pub fn store_ergonomics(ctx: &AggregatorContext, stream: &ErgonomicsStream) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    for entry in stream.entries() {
        if entry.is_user_id {
            trace!("Skipping ergonomics entry for user {}", entry.id);
            continue;
        }
        let frame = ErgonomicsFrame {
            device_id: entry.id,
            values: entry.data,
        };
        if ctx.telemetry.ergonomics.put(entry.id, frame) {
            outcome.stored += 1;
        }
    }

    ctx.metrics.ergonomics_frames.fetch_add(outcome.stored as u64, Ordering::Relaxed);
    outcome
}

/// 处理一条通知
pub fn dispatch(sdk: &dyn CoreSdk, ctx: &AggregatorContext, notification: Notification) {
    let outcome = match notification {
        Notification::RawSkeleton(info) => pull_raw_skeletons(sdk, ctx, info),
        Notification::RawDeviceData(info) => pull_raw_device_data(sdk, ctx, info),
        Notification::Ergonomics(stream) => store_ergonomics(ctx, &stream),
    };
    trace!("Pass finished: {:?}", outcome);
}

/// 采集线程主循环
///
/// # 参数
/// - `sdk`: 驱动（与消费线程共享）
/// - `rx`: 通知队列接收端
/// - `ctx`: 共享状态上下文
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（拆除时置为 false）
pub fn ingest_loop(
    sdk: Arc<dyn CoreSdk>,
    rx: Receiver<Notification>,
    ctx: Arc<AggregatorContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Ingestion thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set ingestion thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let timeout = config.receive_timeout();

    loop {
        // Acquire: 看到 false 时必须同时看到拆除线程之前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Ingestion thread: is_running flag is false, exiting");
            break;
        }

        match rx.recv_timeout(timeout) {
            Ok(notification) => dispatch(sdk.as_ref(), &ctx, notification),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                trace!("Ingestion thread: notification channel closed, exiting");
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manus_link::call;
    use manus_link::mock::{MockCoreSdk, MockSkeleton};
    use manus_protocol::{ErgonomicsData, RawDeviceData, SdkReturnCode};

    fn skeleton(glove_id: u32, nodes: usize) -> MockSkeleton {
        MockSkeleton {
            glove_id,
            publish_time: 100,
            nodes: (0..nodes as u32).map(|id| SkeletonNode { id, ..Default::default() }).collect(),
        }
    }

    fn skeleton_info(count: u32) -> SkeletonStreamInfo {
        SkeletonStreamInfo { skeletons_count: count, ..Default::default() }
    }

    #[test]
    fn test_pull_raw_skeletons() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        sdk.set_skeletons(vec![skeleton(1, 3), skeleton(2, 5)]);

        let outcome = pull_raw_skeletons(&sdk, &ctx, skeleton_info(2));
        assert_eq!(outcome, PassOutcome { stored: 2, failed: 0, aborted: false });
        assert_eq!(ctx.telemetry.pose.get(1).unwrap().node_count(), 3);
        assert_eq!(ctx.telemetry.pose.get(2).unwrap().node_count(), 5);
        assert_eq!(ctx.telemetry.pose.get(2).unwrap().publish_time, 100);
        assert_eq!(ctx.metrics.snapshot().pose_frames, 2);
    }

    #[test]
    fn test_empty_skeleton_skipped() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        let previous = PoseFrame { device_id: 1, nodes: vec![Node::default(); 4], ..Default::default() };
        ctx.telemetry.pose.put(1, previous);
        sdk.set_skeletons(vec![skeleton(1, 0), skeleton(2, 2)]);

        let outcome = pull_raw_skeletons(&sdk, &ctx, skeleton_info(2));
        assert_eq!(outcome, PassOutcome { stored: 1, failed: 0, aborted: false });
        // 上一帧保持不变
        assert_eq!(ctx.telemetry.pose.get(1).unwrap().node_count(), 4);
        assert_eq!(ctx.telemetry.pose.get(2).unwrap().node_count(), 2);
        assert_eq!(sdk.call_count(call::GET_RAW_SKELETON_DATA), 1);
        assert_eq!(ctx.metrics.snapshot().pose_frames, 1);
    }

    #[test]
    fn test_failed_index_skipped() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        sdk.set_skeletons(vec![skeleton(1, 3), skeleton(2, 5), skeleton(3, 1)]);
        sdk.fail_at(call::GET_RAW_SKELETON_DATA, 1, SdkReturnCode::InternalError);

        let outcome = pull_raw_skeletons(&sdk, &ctx, skeleton_info(3));
        assert_eq!(outcome, PassOutcome { stored: 2, failed: 1, aborted: false });
        assert!(ctx.telemetry.pose.get(2).is_none());
        assert!(ctx.telemetry.pose.get(3).is_some());
        assert_eq!(ctx.metrics.snapshot().fetch_failures, 1);
    }

    #[test]
    fn test_terminal_code_aborts_pass() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        sdk.set_skeletons(vec![skeleton(1, 3), skeleton(2, 5), skeleton(3, 1)]);
        sdk.fail_at(call::GET_RAW_SKELETON_INFO, 1, SdkReturnCode::SdkIsTerminating);

        let outcome = pull_raw_skeletons(&sdk, &ctx, skeleton_info(3));
        assert!(outcome.aborted);
        assert_eq!(outcome.stored, 1);
        assert!(ctx.telemetry.pose.get(3).is_none());
        // 放弃后不再拉取后续下标
        assert_eq!(sdk.call_count(call::GET_RAW_SKELETON_INFO), 2);
        assert_eq!(ctx.metrics.snapshot().aborted_passes, 1);
    }

    #[test]
    fn test_pull_raw_device_data() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        sdk.set_raw_devices(vec![
            RawDeviceData { id: 7, sensor_count: 2, ..Default::default() },
            RawDeviceData { id: 8, sensor_count: 0, ..Default::default() },
        ]);
        sdk.fail_at(call::GET_RAW_DEVICE_DATA, 1, SdkReturnCode::SdkNotAvailable);

        let info = RawDeviceDataInfo { raw_device_data_count: 2, ..Default::default() };
        let outcome = pull_raw_device_data(&sdk, &ctx, info);
        assert!(outcome.aborted);
        let frame = ctx.telemetry.raw_sensor.get(7).unwrap();
        assert_eq!(frame.sensor_count, 2);
        assert_eq!(frame.sensors.len(), 2);
        assert_eq!(frame.orientation, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ergonomics_skips_user_ids() {
        let ctx = AggregatorContext::default();
        let mut stream = ErgonomicsStream::default();
        stream.push(ErgonomicsData { id: 4, is_user_id: false, data: [0.25; 40] });
        stream.push(ErgonomicsData { id: 99, is_user_id: true, ..Default::default() });

        let outcome = store_ergonomics(&ctx, &stream);
        assert_eq!(outcome.stored, 1);
        assert_eq!(ctx.telemetry.ergonomics.get(4).unwrap().values[39], 0.25);
        assert!(ctx.telemetry.ergonomics.get(99).is_none());
    }

    #[test]
    fn test_closed_store_drops_writes() {
        let sdk = MockCoreSdk::new();
        let ctx = AggregatorContext::default();
        sdk.set_skeletons(vec![skeleton(1, 3)]);
        ctx.close();

        let outcome = pull_raw_skeletons(&sdk, &ctx, skeleton_info(1));
        assert_eq!(outcome.stored, 0);
        assert!(ctx.telemetry.pose.ids().is_empty());
    }

    #[test]
    fn test_ingest_loop_exits_on_disconnect() {
        let sdk: Arc<dyn CoreSdk> = Arc::new(MockCoreSdk::new());
        let ctx = Arc::new(AggregatorContext::default());
        let (tx, rx) = crossbeam_channel::bounded(4);
        let is_running = Arc::new(AtomicBool::new(true));

        let mut stream = ErgonomicsStream::default();
        stream.push(ErgonomicsData { id: 2, ..Default::default() });
        tx.send(Notification::Ergonomics(Box::new(stream))).unwrap();
        drop(tx);

        let ctx_clone = ctx.clone();
        let handle = std::thread::spawn(move || {
            ingest_loop(sdk, rx, ctx_clone, PipelineConfig::default(), is_running);
        });
        handle.join().unwrap();
        assert!(ctx.telemetry.ergonomics.get(2).is_some());
    }
}
