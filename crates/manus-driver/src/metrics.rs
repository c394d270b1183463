//! 采集指标模块
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 采集链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use manus_driver::IngestMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = IngestMetrics::new();
/// metrics.pose_frames.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.pose_frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// 写入的骨骼帧数
    pub pose_frames: AtomicU64,

    /// 写入的原始传感器帧数
    pub raw_sensor_frames: AtomicU64,

    /// 写入的人体工学帧数（不含用户 ID 条目）
    pub ergonomics_frames: AtomicU64,

    /// 暂存的拓扑推送次数
    pub landscape_pushes: AtomicU64,

    /// 单条拉取失败次数（已记录日志并跳过）
    pub fetch_failures: AtomicU64,

    /// 因驱动不可用/正在关闭而放弃的拉取轮次
    pub aborted_passes: AtomicU64,

    /// 队列已满而丢弃的通知
    ///
    /// 同一分类的下一条通知会覆盖被丢弃的那条，偶尔增长是正常的。
    /// 持续快速增长说明采集线程跟不上驱动的推送频率。
    pub dropped_notifications: AtomicU64,

    /// 收到的驱动日志行数
    pub sdk_log_lines: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pose_frames: self.pose_frames.load(Ordering::Relaxed),
            raw_sensor_frames: self.raw_sensor_frames.load(Ordering::Relaxed),
            ergonomics_frames: self.ergonomics_frames.load(Ordering::Relaxed),
            landscape_pushes: self.landscape_pushes.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            aborted_passes: self.aborted_passes.load(Ordering::Relaxed),
            dropped_notifications: self.dropped_notifications.load(Ordering::Relaxed),
            sdk_log_lines: self.sdk_log_lines.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.pose_frames.store(0, Ordering::Relaxed);
        self.raw_sensor_frames.store(0, Ordering::Relaxed);
        self.ergonomics_frames.store(0, Ordering::Relaxed);
        self.landscape_pushes.store(0, Ordering::Relaxed);
        self.fetch_failures.store(0, Ordering::Relaxed);
        self.aborted_passes.store(0, Ordering::Relaxed);
        self.dropped_notifications.store(0, Ordering::Relaxed);
        self.sdk_log_lines.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub pose_frames: u64,
    pub raw_sensor_frames: u64,
    pub ergonomics_frames: u64,
    pub landscape_pushes: u64,
    pub fetch_failures: u64,
    pub aborted_passes: u64,
    pub dropped_notifications: u64,
    pub sdk_log_lines: u64,
}

impl MetricsSnapshot {
    /// 写入的遥测帧总数（三个分类之和）
    pub fn total_frames(&self) -> u64 {
        self.pose_frames + self.raw_sensor_frames + self.ergonomics_frames
    }
}
