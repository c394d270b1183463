//! Builder 模式实现
//!
//! 提供链式构造 `Aggregator` 实例的便捷方式。

use crate::aggregator::Aggregator;
use crate::config::{AggregatorConfig, CoordinateSystemConfig};
use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use manus_link::CoreSdk;
use manus_protocol::{ConnectionType, HandMotion, Side};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Aggregator Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use manus_driver::AggregatorBuilder;
/// use manus_link::MockCoreSdk;
/// use manus_protocol::{HandMotion, Side};
///
/// let aggregator = AggregatorBuilder::new()
///     .host_ip("192.168.1.20")
///     .hand_motion(HandMotion::Imu)
///     .calibration_file(Side::Left, "left.mcal")
///     .build(MockCoreSdk::new())
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct AggregatorBuilder {
    config: AggregatorConfig,
}

impl AggregatorBuilder {
    /// 创建新的 Builder（全部使用默认配置）
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有配置开始（例如从 TOML 文件加载的配置）
    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置连接方式（默认 Integrated）
    pub fn connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.config.connect.connection_type = connection_type;
        self
    }

    /// 优先连接的主机 IP（不含端口）
    ///
    /// 找不到匹配的主机时回退到第一个主机。
    pub fn host_ip(mut self, ip: impl Into<String>) -> Self {
        self.config.connect.host_ip = Some(ip.into());
        self
    }

    /// 主机搜索参数
    pub fn look_for_hosts(mut self, wait_seconds: u32, loopback_only: bool) -> Self {
        self.config.connect.look_for_hosts_seconds = wait_seconds;
        self.config.connect.loopback_only = loopback_only;
        self
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.config.connect.retry = retry;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.connect.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// 最大连接尝试次数（默认无限）
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.connect.max_attempts = Some(max_attempts);
        self
    }

    pub fn coordinate_system(mut self, coordinate_system: CoordinateSystemConfig) -> Self {
        self.config.coordinate_system = coordinate_system;
        self
    }

    pub fn world_space(mut self, world_space: bool) -> Self {
        self.config.coordinate_system.world_space = world_space;
        self
    }

    pub fn hand_motion(mut self, hand_motion: HandMotion) -> Self {
        self.config.hand_motion = hand_motion;
        self
    }

    /// 为一侧配置校准文件
    ///
    /// 只接受 `Left` / `Right`，其他值会被忽略。
    pub fn calibration_file(mut self, side: Side, path: impl Into<PathBuf>) -> Self {
        match side {
            Side::Left => self.config.calibration.left = Some(path.into()),
            Side::Right => self.config.calibration.right = Some(path.into()),
            other => warn!("Calibration file ignored for side {:?}", other),
        }
        self
    }

    /// 设置 Pipeline 配置（可选）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// 构建 Aggregator 实例
    ///
    /// 初始化驱动、启动采集线程并连接 Manus Core。
    ///
    /// # Errors
    /// 见 [`Aggregator::new`]。
    pub fn build(self, sdk: impl CoreSdk + 'static) -> Result<Aggregator, DriverError> {
        Aggregator::new(sdk, self.config)
    }
}
