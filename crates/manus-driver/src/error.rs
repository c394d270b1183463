//! 驱动层错误类型定义

use manus_protocol::SdkError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// SDK 调用失败（携带调用名与返回码）
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// 进程内已有一个存活的聚合器
    #[error("Aggregator already initialized in this process")]
    AlreadyInitialized,

    /// 构造参数错误（不会重试）
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 连接失败（重试被禁用或次数用尽）
    #[error("Failed to connect to Manus Core after {attempts} attempt(s): {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: SdkError,
    },

    /// 未发现任何主机
    #[error("No Manus Core host found")]
    NoHostFound,

    /// 手套不在当前拓扑中
    #[error("Glove {0} is not in the current landscape")]
    UnknownDevice(u32),

    /// 尚未收到骨骼数据，无法确定节点数量
    #[error("No pose data yet for glove {0}")]
    NoPoseDataYet(u32),

    /// 采集线程启动失败
    #[error("Ingestion thread error: {0}")]
    IngestThread(String),

    /// 文件读取错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析错误
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}

impl DriverError {
    /// 底层 SDK 返回码（如果有）
    pub fn sdk_code(&self) -> Option<manus_protocol::SdkReturnCode> {
        match self {
            Self::Sdk(e) | Self::ConnectFailed { source: e, .. } => Some(e.code),
            _ => None,
        }
    }
}
