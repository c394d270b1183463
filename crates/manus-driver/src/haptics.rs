//! 振动命令网关
//!
//! 命令先对照已提交的拓扑校验：手套不存在或不带振动时静默忽略。

use crate::state::{AggregatorContext, Landscape};
use manus_link::CoreSdk;
use manus_protocol::HAPTIC_MOTOR_COUNT;
use tracing::{debug, warn};

/// 把任意长度的强度规整为 5 个 [0, 1] 内的值
///
/// 不足补 0，多余丢弃，NaN 视为 0。
pub fn clamp_powers(powers: &[f32]) -> [f32; HAPTIC_MOTOR_COUNT] {
    let mut clamped = [0.0; HAPTIC_MOTOR_COUNT];
    for (slot, &power) in clamped.iter_mut().zip(powers) {
        *slot = if power.is_nan() { 0.0 } else { power.clamp(0.0, 1.0) };
    }
    clamped
}

/// 发送振动命令
///
/// 返回命令是否被驱动接受；无效目标和驱动失败都只记录日志。
pub fn vibrate(sdk: &dyn CoreSdk, ctx: &AggregatorContext, device_id: u32, powers: &[f32]) -> bool {
    let Some(landscape) = ctx.commit_landscape() else {
        debug!("Vibrate ignored for glove {}: no landscape yet", device_id);
        return false;
    };
    match landscape.device(device_id) {
        Some(device) if device.has_haptics => {},
        Some(_) => {
            debug!("Vibrate ignored for glove {}: no haptics", device_id);
            return false;
        },
        None => {
            debug!("Vibrate ignored for unknown glove {}", device_id);
            return false;
        },
    }

    let clamped = clamp_powers(powers);
    match sdk.vibrate_fingers(device_id, &clamped) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to vibrate glove {}: {}", device_id, e);
            false
        },
    }
}

/// 拆除时的兜底：所有带振动的手套归零
pub fn stop_all(sdk: &dyn CoreSdk, landscape: &Landscape) {
    let zero = [0.0; HAPTIC_MOTOR_COUNT];
    for device in landscape.devices.iter().filter(|d| d.has_haptics) {
        if let Err(e) = sdk.vibrate_fingers(device.id, &zero) {
            warn!("Failed to stop haptics on glove {}: {}", device.id, e);
        }
    }
}
