//! # Manus Protocol
//!
//! Manus Core SDK 数据结构定义（无驱动依赖）
//!
//! ## 模块
//!
//! - `enums`: SDK 枚举（返回码、侧、骨骼链、关节类型等）
//! - `stream`: 流数据结构（骨骼、原始传感器、人体工学）
//! - `landscape`: 拓扑结构（手套名册、许可、主机、手势）
//!
//! ## 内存布局
//!
//! 所有与驱动交换的定长结构均为 `#[repr(C)]`，字段顺序与 SDK 头文件一致，
//! 可直接作为调用方分配的缓冲区传给驱动（两阶段：先取数量，再按数量取数据）。

pub mod enums;
pub mod landscape;
pub mod stream;

// 重新导出常用类型
pub use enums::*;
pub use landscape::*;
pub use stream::*;

use thiserror::Error;

/// SDK 调用失败
///
/// 携带失败调用的函数名和传输层返回码。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{call} failed: {code:?} ({})", .code.as_i32())]
pub struct SdkError {
    /// 失败的 SDK 函数名（例如 `CoreSdk_ConnectToHost`）
    pub call: &'static str,
    pub code: SdkReturnCode,
}

impl SdkError {
    pub fn new(call: &'static str, code: SdkReturnCode) -> Self {
        Self { call, code }
    }

    /// 驱动正在离开（见 [`SdkReturnCode::is_terminal`]）
    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_display() {
        let err = SdkError::new("CoreSdk_ConnectToHost", SdkReturnCode::NotConnected);
        assert_eq!(err.to_string(), "CoreSdk_ConnectToHost failed: NotConnected (11)");
        assert!(!err.is_terminal());
        assert!(SdkError::new("CoreSdk_ShutDown", SdkReturnCode::SdkIsTerminating).is_terminal());
    }
}
