//! 拓扑（Landscape）结构
//!
//! 驱动在手套连接/断开、许可变化时推送完整的拓扑对象。
//! 这里的 `LandscapeData` 是已经从 C 结构转换出来的自有版本，
//! 只保留聚合器关心的字段。

use crate::enums::{AxisPolarity, AxisView, Side};

/// 主机名缓冲区长度
pub const MAX_HOST_NAME_LENGTH: usize = 256;
/// IP 地址缓冲区长度
pub const MAX_IP_ADDRESS_LENGTH: usize = 40;
/// 版本字符串缓冲区长度
pub const MAX_VERSION_STRING_LENGTH: usize = 16;
/// 手势名缓冲区长度
pub const MAX_GESTURE_NAME_LENGTH: usize = 64;

/// 坐标系定义（视线轴 / 向上轴 / 手性 / 单位缩放）
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CoordinateSystemVuh {
    pub view: i32,
    pub up: i32,
    pub handedness: i32,
    pub unit_scale: f32,
}

impl CoordinateSystemVuh {
    pub fn new(view: AxisView, up: AxisPolarity, handedness: Side, unit_scale: f32) -> Self {
        Self {
            view: view.into(),
            up: up.into(),
            handedness: handedness.into(),
            unit_scale,
        }
    }

    pub fn view(&self) -> AxisView {
        AxisView::from(self.view)
    }

    pub fn up(&self) -> AxisPolarity {
        AxisPolarity::from(self.up)
    }

    pub fn handedness(&self) -> Side {
        Side::from(self.handedness)
    }
}

impl Default for CoordinateSystemVuh {
    /// X 轴背离观察者、Z 轴向上、右手系、米制
    fn default() -> Self {
        Self::new(AxisView::XFromViewer, AxisPolarity::PositiveZ, Side::Right, 1.0)
    }
}

/// 读取以 NUL 结尾的定长字符缓冲区
///
/// 非 UTF-8 内容按损失转换处理。
fn c_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// 写入定长字符缓冲区（截断并保证 NUL 结尾）
fn write_c_str(buf: &mut [u8], value: &str) {
    buf.fill(0);
    let n = value.len().min(buf.len().saturating_sub(1));
    buf[..n].copy_from_slice(&value.as_bytes()[..n]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ManusVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub label: [u8; MAX_VERSION_STRING_LENGTH],
    pub sha: [u8; MAX_VERSION_STRING_LENGTH],
    pub tag: [u8; MAX_VERSION_STRING_LENGTH],
}

impl Default for ManusVersion {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            label: [0; MAX_VERSION_STRING_LENGTH],
            sha: [0; MAX_VERSION_STRING_LENGTH],
            tag: [0; MAX_VERSION_STRING_LENGTH],
        }
    }
}

/// 可连接的 Manus Core 主机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ManusHost {
    pub host_name: [u8; MAX_HOST_NAME_LENGTH],
    pub ip_address: [u8; MAX_IP_ADDRESS_LENGTH],
    pub manus_core_version: ManusVersion,
}

impl Default for ManusHost {
    fn default() -> Self {
        Self {
            host_name: [0; MAX_HOST_NAME_LENGTH],
            ip_address: [0; MAX_IP_ADDRESS_LENGTH],
            manus_core_version: ManusVersion::default(),
        }
    }
}

impl ManusHost {
    pub fn with_address(host_name: &str, ip_address: &str) -> Self {
        let mut host = Self::default();
        write_c_str(&mut host.host_name, host_name);
        write_c_str(&mut host.ip_address, ip_address);
        host
    }

    pub fn host_name(&self) -> String {
        c_str(&self.host_name)
    }

    /// 完整地址（可能带 `:port`）
    pub fn ip_address(&self) -> String {
        c_str(&self.ip_address)
    }

    /// 不含端口的 IP
    pub fn ip(&self) -> String {
        let address = self.ip_address();
        match address.split_once(':') {
            Some((ip, _port)) => ip.to_string(),
            None => address,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GestureLandscapeData {
    pub id: u32,
    pub name: [u8; MAX_GESTURE_NAME_LENGTH],
}

impl Default for GestureLandscapeData {
    fn default() -> Self {
        Self { id: 0, name: [0; MAX_GESTURE_NAME_LENGTH] }
    }
}

impl GestureLandscapeData {
    pub fn with_name(id: u32, name: &str) -> Self {
        let mut gesture = Self { id, ..Default::default() };
        write_c_str(&mut gesture.name, name);
        gesture
    }

    pub fn name(&self) -> String {
        c_str(&self.name)
    }
}

// ============================================================================
// 自有拓扑对象
// ============================================================================

/// 拓扑中的一只手套
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GloveLandscapeData {
    pub id: u32,
    pub side: Side,
    pub family_type: i32,
    pub is_haptics: bool,
    pub battery_percentage: i32,
    pub dongle_id: u32,
    /// 被用户在 Core 中排除
    pub excluded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LicenseInfo {
    pub max_glove_pairs: u32,
    pub sdk: bool,
    pub integrated: bool,
    pub raw: bool,
}

/// 驱动推送的完整拓扑
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LandscapeData {
    pub dongle_count: u32,
    pub gloves: Vec<GloveLandscapeData>,
    pub license: LicenseInfo,
    pub playback_mode: bool,
    pub gesture_count: u32,
}

impl LandscapeData {
    pub fn glove(&self, id: u32) -> Option<&GloveLandscapeData> {
        self.gloves.iter().find(|g| g.id == id)
    }
}
