//! 驱动层模块
//!
//! 本模块提供 Manus 手套遥测的聚合与状态同步功能，包括：
//! - 驱动回调转发（回调线程只做非阻塞投递）
//! - 采集线程：按通知两阶段拉取骨骼 / 原始传感器数据
//! - 状态同步（每只手套最新一帧，拓扑 ArcSwap 无锁读取）
//! - 节点拓扑惰性缓存、振动与校准命令
//!
//! # 使用场景
//!
//! 驱动由 [`manus_link::CoreSdk`] 抽象；测试和离线开发可以使用
//! `manus_link::MockCoreSdk`（`mock` feature）。

mod aggregator;
mod builder;
pub mod calibration;
pub mod config;
mod error;
pub mod haptics;
pub mod hooks;
mod logging;
pub mod metrics;
pub mod pipeline;
mod singleton;
pub mod snapshot;
pub mod state;

pub use aggregator::Aggregator;
pub use builder::AggregatorBuilder;
pub use config::{AggregatorConfig, CalibrationConfig, ConnectConfig, CoordinateSystemConfig};
pub use error::DriverError;
pub use hooks::NotificationForwarder;
pub use logging::init_logging;
pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use pipeline::{Notification, PassOutcome, PipelineConfig, ingest_loop};
pub use singleton::InstanceGuard;
pub use snapshot::{AnnotatedNode, ErgonomicsValue, GloveSnapshot, NodeAnnotation, RawSensorSnapshot};
pub use state::*;

pub use manus_link;
pub use manus_protocol;
