//! 校准加载器
//!
//! 校准文件内容对本库是不透明字节，原样上传给驱动。
//! 两层结果：传输层返回码失败 / 语义结果非 `Success`，都只记录日志并返回 `false`。

use crate::state::AggregatorContext;
use manus_link::CoreSdk;
use manus_protocol::Side;
use std::path::Path;
use tracing::{error, info, warn};

/// 为一只手套加载校准文件
///
/// 只有语义结果为 `Success` 时才把该侧标记为已加载，并记录使用的路径。
pub fn load_calibration(
    sdk: &dyn CoreSdk,
    ctx: &AggregatorContext,
    device_id: u32,
    side: Side,
    path: &Path,
) -> bool {
    if !matches!(side, Side::Left | Side::Right) {
        warn!("Calibration for glove {} skipped: side {:?} has no calibration", device_id, side);
        return false;
    }

    // 文件读取在任何锁之外
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Calibration file {} unreadable: {}", path.display(), e);
            return false;
        },
    };

    let result = match sdk.set_glove_calibration(device_id, &data) {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to upload calibration for glove {}: {}", device_id, e);
            return false;
        },
    };

    if !result.is_success() {
        warn!(
            "Calibration for glove {} ({}) rejected: {:?}",
            device_id,
            side.as_str(),
            result
        );
        return false;
    }

    if let Some(state) = ctx.calibration.lock().side_mut(side) {
        state.loaded = true;
        state.path = Some(path.to_path_buf());
    }
    info!(
        "Calibration loaded for glove {} ({}) from {}",
        device_id,
        side.as_str(),
        path.display()
    );
    true
}

/// 为拓扑中所有尚未加载校准的一侧加载已配置的校准文件
///
/// 幂等：已加载的一侧不会再次上传。返回本次新加载的侧数。
pub fn load_all_pending(sdk: &dyn CoreSdk, ctx: &AggregatorContext) -> usize {
    let Some(landscape) = ctx.commit_landscape() else {
        warn!("No landscape available, calibration deferred");
        return 0;
    };

    let mut loaded = 0;
    for device in &landscape.devices {
        if !matches!(device.side, Side::Left | Side::Right) {
            continue;
        }

        // 只拷贝出需要的字段，锁不跨越驱动调用
        let pending = {
            let state = ctx.calibration.lock();
            state.side(device.side).filter(|s| !s.loaded).map(|s| s.path.clone())
        };

        match pending {
            None => {},
            Some(None) => {
                warn!(
                    "No calibration file configured for {} glove {}",
                    device.side.as_str(),
                    device.id
                );
            },
            Some(Some(path)) => {
                if load_calibration(sdk, ctx, device.id, device.side, &path) {
                    loaded += 1;
                }
            },
        }
    }
    loaded
}
