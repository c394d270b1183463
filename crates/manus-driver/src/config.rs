//! 聚合器配置
//!
//! 所有字段都有默认值，TOML 中只需写出要覆盖的部分：
//!
//! ```toml
//! hand_motion = "Imu"
//!
//! [connect]
//! host_ip = "192.168.1.20"
//! max_attempts = 10
//!
//! [calibration]
//! left = "/opt/manus/left.mcal"
//! ```

use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use manus_protocol::{AxisPolarity, AxisView, ConnectionType, CoordinateSystemVuh, HandMotion, Side};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 聚合器完整配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub connect: ConnectConfig,
    pub coordinate_system: CoordinateSystemConfig,
    /// 连接成功后设置的手部运动模式
    pub hand_motion: HandMotion,
    pub calibration: CalibrationConfig,
    pub pipeline: PipelineConfig,
}

impl AggregatorConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// 校验配置（构造期错误，不会重试）
    pub fn validate(&self) -> Result<(), DriverError> {
        self.connect.validate()?;
        self.coordinate_system.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// 连接配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub connection_type: ConnectionType,
    /// 优先连接的主机 IP（不含端口）；未匹配时连接第一个主机
    pub host_ip: Option<String>,
    /// 主机搜索等待时间（秒）
    pub look_for_hosts_seconds: u32,
    /// 只搜索本机回环地址
    pub loopback_only: bool,
    /// `NotConnected` 时是否重试
    pub retry: bool,
    /// 重试间隔（毫秒）
    pub retry_interval_ms: u64,
    /// 最大尝试次数（`None` 表示不限）
    pub max_attempts: Option<u32>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connection_type: ConnectionType::Integrated,
            host_ip: None,
            look_for_hosts_seconds: 5,
            loopback_only: false,
            retry: true,
            retry_interval_ms: 1000,
            max_attempts: None,
        }
    }
}

impl ConnectConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.connection_type == ConnectionType::Invalid {
            return Err(DriverError::InvalidConfig("connection_type must not be Invalid".into()));
        }
        if self.max_attempts == Some(0) {
            return Err(DriverError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// 坐标系配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateSystemConfig {
    pub view: AxisView,
    pub up: AxisPolarity,
    pub handedness: Side,
    pub unit_scale: f32,
    /// 世界坐标（否则为手套局部坐标）
    pub world_space: bool,
}

impl Default for CoordinateSystemConfig {
    fn default() -> Self {
        Self {
            view: AxisView::XFromViewer,
            up: AxisPolarity::PositiveZ,
            handedness: Side::Right,
            unit_scale: 1.0,
            world_space: true,
        }
    }
}

impl CoordinateSystemConfig {
    pub fn to_vuh(&self) -> CoordinateSystemVuh {
        CoordinateSystemVuh::new(self.view, self.up, self.handedness, self.unit_scale)
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.view == AxisView::Invalid || self.up == AxisPolarity::Invalid {
            return Err(DriverError::InvalidConfig("coordinate axes must not be Invalid".into()));
        }
        if !matches!(self.handedness, Side::Left | Side::Right) {
            return Err(DriverError::InvalidConfig(format!(
                "handedness must be Left or Right, got {:?}",
                self.handedness
            )));
        }
        if !self.unit_scale.is_finite() || self.unit_scale <= 0.0 {
            return Err(DriverError::InvalidConfig(format!(
                "unit_scale must be positive, got {}",
                self.unit_scale
            )));
        }
        Ok(())
    }
}

/// 校准文件配置（内容对本库是不透明字节）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub left: Option<PathBuf>,
    pub right: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.connect.connection_type, ConnectionType::Integrated);
        assert_eq!(config.connect.look_for_hosts_seconds, 5);
        assert!(!config.connect.loopback_only);
        assert_eq!(config.connect.retry_interval(), Duration::from_secs(1));
        assert_eq!(config.connect.max_attempts, None);
        assert_eq!(config.hand_motion, HandMotion::NoMotion);
        assert!(config.coordinate_system.world_space);
        assert_eq!(config.coordinate_system.to_vuh(), CoordinateSystemVuh::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AggregatorConfig::from_toml_str(
            r#"
            hand_motion = "Imu"

            [connect]
            host_ip = "192.168.1.20"
            max_attempts = 3

            [calibration]
            left = "/tmp/left.mcal"

            [pipeline]
            queue_capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.hand_motion, HandMotion::Imu);
        assert_eq!(config.connect.host_ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(config.connect.max_attempts, Some(3));
        assert_eq!(config.connect.look_for_hosts_seconds, 5);
        assert_eq!(config.calibration.left, Some(PathBuf::from("/tmp/left.mcal")));
        assert_eq!(config.calibration.right, None);
        assert_eq!(config.pipeline.queue_capacity, 8);
        assert_eq!(config.pipeline.receive_timeout_ms, PipelineConfig::default().receive_timeout_ms);
    }

    #[test]
    fn test_invalid_connection_type_rejected() {
        let err = AggregatorConfig::from_toml_str(
            r#"
            [connect]
            connection_type = "Invalid"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AggregatorConfig::default();
        config.coordinate_system.unit_scale = 0.0;
        assert!(matches!(config.validate(), Err(DriverError::InvalidConfig(_))));

        let mut config = AggregatorConfig::default();
        config.coordinate_system.handedness = Side::Center;
        assert!(config.validate().is_err());

        let mut config = AggregatorConfig::default();
        config.connect.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let err = AggregatorConfig::from_toml_str("connect = 5").unwrap_err();
        assert!(matches!(err, DriverError::ConfigParse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manus.toml");
        std::fs::write(&path, "[coordinate_system]\nworld_space = false\n").unwrap();
        let config = AggregatorConfig::from_file(&path).unwrap();
        assert!(!config.coordinate_system.world_space);

        let missing = AggregatorConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, DriverError::Io(_)));
    }
}
