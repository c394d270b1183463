//! 单例守卫
//!
//! 驱动是进程级资源，同一时间只允许一个聚合器存活。
//! 守卫在接触驱动之前获取，聚合器拆除完成后释放。

use crate::error::DriverError;
use std::sync::atomic::{AtomicBool, Ordering};

static INSTANCE_LIVE: AtomicBool = AtomicBool::new(false);

/// 进程级单例守卫（RAII）
///
/// Drop 时自动释放，即使构造中途失败也不会残留。
#[derive(Debug)]
pub struct InstanceGuard {
    _private: (),
}

impl InstanceGuard {
    /// 尝试获取守卫
    ///
    /// # 错误
    /// - `DriverError::AlreadyInitialized`: 已有一个守卫存活
    pub fn acquire() -> Result<Self, DriverError> {
        INSTANCE_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _private: () })
            .map_err(|_| DriverError::AlreadyInitialized)
    }

    /// 当前是否有守卫存活
    pub fn is_held() -> bool {
        INSTANCE_LIVE.load(Ordering::Acquire)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        INSTANCE_LIVE.store(false, Ordering::Release);
    }
}
