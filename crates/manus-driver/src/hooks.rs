//! 驱动回调转发
//!
//! 驱动在自己的线程上调用回调，这里只做非阻塞转发：
//!
//! - 骨骼 / 原始设备 / 人体工学：`try_send` 到有界队列，由采集线程拉取
//! - 拓扑：已经是完整的自有对象，直接写入拓扑缓存的 `pending` 槽位（Last Write Wins）
//! - 日志：转发到 `tracing`（target `manus_sdk`）
//!
//! 队列满时丢弃通知并计数；同一分类的下一条通知会带来最新的数量，不会丢失最新状态。
//! 拆除后仍到达的回调：队列已断开、缓存已关闭，全部被安静地忽略。

use crate::pipeline::Notification;
use crate::state::AggregatorContext;
use crossbeam_channel::{Sender, TrySendError};
use manus_link::StreamCallback;
use manus_protocol::{
    ErgonomicsStream, LandscapeData, LogSeverity, RawDeviceDataInfo, SkeletonStreamInfo,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

/// 注册给驱动的回调实现
pub struct NotificationForwarder {
    tx: Sender<Notification>,
    ctx: Arc<AggregatorContext>,
    forward_logs: bool,
}

impl NotificationForwarder {
    pub fn new(tx: Sender<Notification>, ctx: Arc<AggregatorContext>, forward_logs: bool) -> Self {
        Self { tx, ctx, forward_logs }
    }

    fn forward(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {},
            Err(TrySendError::Full(dropped)) => {
                let total =
                    self.ctx.metrics.dropped_notifications.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("Notification queue full, dropped {:?} (total {})", dropped, total);
            },
            Err(TrySendError::Disconnected(_)) => {
                trace!("Notification after ingestion stopped, ignored");
            },
        }
    }
}

impl StreamCallback for NotificationForwarder {
    fn on_log(&self, severity: LogSeverity, message: &str) {
        self.ctx.metrics.sdk_log_lines.fetch_add(1, Ordering::Relaxed);
        if !self.forward_logs {
            return;
        }
        let message = message.trim_end();
        match severity {
            LogSeverity::Debug => debug!(target: "manus_sdk", "{}", message),
            LogSeverity::Info => info!(target: "manus_sdk", "{}", message),
            LogSeverity::Warn => warn!(target: "manus_sdk", "{}", message),
            LogSeverity::Error => error!(target: "manus_sdk", "{}", message),
        }
    }

    fn on_raw_skeleton(&self, info: SkeletonStreamInfo) {
        self.forward(Notification::RawSkeleton(info));
    }

    fn on_raw_device_data(&self, info: RawDeviceDataInfo) {
        self.forward(Notification::RawDeviceData(info));
    }

    fn on_ergonomics(&self, stream: &ErgonomicsStream) {
        self.forward(Notification::Ergonomics(Box::new(*stream)));
    }

    fn on_landscape(&self, landscape: &LandscapeData) {
        if let Some(generation) = self.ctx.landscape.stage(landscape) {
            self.ctx.metrics.landscape_pushes.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Landscape generation {} staged ({} gloves)",
                generation,
                landscape.gloves.len()
            );
        }
    }
}
