//! SDK 枚举定义
//!
//! 与 Manus Core SDK 头文件中的 C 枚举一一对应（数值必须保持一致）。
//! 未知的数值映射到各枚举的 `#[default]` 变体，不会 panic。

use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

// ============================================================================
// SDK 返回码
// ============================================================================

/// SDK 调用返回码（每个驱动调用都会返回）
///
/// 未知数值映射为 [`SdkReturnCode::Error`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum SdkReturnCode {
    Success = 0,
    #[default]
    Error = 1,
    InvalidArgument = 2,
    ArgumentSizeMismatch = 3,
    UnsupportedStringSizeEncountered = 4,
    /// 驱动不可用（正在卸载或尚未初始化）
    SdkNotAvailable = 5,
    HostFinderNotAvailable = 6,
    DataNotAvailable = 7,
    MemoryError = 8,
    InternalError = 9,
    FunctionCalledAtWrongTime = 10,
    NotConnected = 11,
    ConnectionTimeout = 12,
    InvalidId = 13,
    NullPointer = 14,
    InvalidSequence = 15,
    NoCoordinateSystemSet = 16,
    /// 驱动正在关闭
    SdkIsTerminating = 17,
    StubNullPointer = 18,
    SkeletonNotLoaded = 19,
    FunctionNotAvailable = 20,
}

impl SdkReturnCode {
    /// 获取原始数值
    pub fn as_i32(self) -> i32 {
        self.into()
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// 驱动正在离开（不可用或正在关闭）
    ///
    /// 采集循环遇到此类返回码时应放弃本轮剩余的拉取，而不是逐条重试。
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::SdkNotAvailable | Self::SdkIsTerminating)
    }

    /// 将原始返回码转换为 `Result`
    ///
    /// # 参数
    /// - `call`: 发起调用的 SDK 函数名（用于错误信息）
    pub fn check(self, call: &'static str) -> Result<(), crate::SdkError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(crate::SdkError::new(call, self))
        }
    }
}

/// 手套校准上传的语义结果
///
/// 与传输层返回码（[`SdkReturnCode`]）相互独立：调用本身成功后才有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum CalibrationResult {
    #[default]
    Error = 0,
    Success = 1,
    VersionError = 2,
    WrongSideError = 3,
    GloveNotFoundError = 4,
    UserServiceError = 5,
    DeserializationError = 6,
}

impl CalibrationResult {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// 驱动日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum LogSeverity {
    #[default]
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

// ============================================================================
// 连接与坐标系
// ============================================================================

/// 连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum ConnectionType {
    Invalid = 0,
    /// 集成模式（SDK 内置 Core，默认）
    #[default]
    Integrated = 1,
    Local = 2,
    Remote = 3,
}

/// 视线方向轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum AxisView {
    #[default]
    Invalid = 0,
    ZFromViewer = 1,
    YFromViewer = 2,
    XFromViewer = 3,
    XToViewer = 4,
    YToViewer = 5,
    ZToViewer = 6,
}

/// 向上轴极性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum AxisPolarity {
    #[default]
    Invalid = 0,
    NegativeZ = 1,
    NegativeY = 2,
    NegativeX = 3,
    PositiveX = 4,
    PositiveY = 5,
    PositiveZ = 6,
}

/// 手部运动模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum HandMotion {
    #[default]
    NoMotion = 0,
    Imu = 1,
    Tracker = 2,
    TrackerRotationOnly = 3,
    Auto = 4,
}

// ============================================================================
// 手套拓扑
// ============================================================================

/// 手套/节点所在的侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Side {
    #[default]
    Invalid = 0,
    Left = 1,
    Right = 2,
    Center = 3,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Center => "Center",
            Self::Invalid => "Invalid",
        }
    }
}

/// 骨骼链类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ChainType {
    #[default]
    Invalid = 0,
    Arm = 1,
    Leg = 2,
    Neck = 3,
    Spine = 4,
    FingerThumb = 5,
    FingerIndex = 6,
    FingerMiddle = 7,
    FingerRing = 8,
    FingerPinky = 9,
    Pelvis = 10,
    Head = 11,
    Shoulder = 12,
    Hand = 13,
    Foot = 14,
    Toe = 15,
}

impl ChainType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Arm => "Arm",
            Self::Leg => "Leg",
            Self::Neck => "Neck",
            Self::Spine => "Spine",
            Self::FingerThumb => "Thumb",
            Self::FingerIndex => "Index",
            Self::FingerMiddle => "Middle",
            Self::FingerRing => "Ring",
            Self::FingerPinky => "Pinky",
            Self::Pelvis => "Pelvis",
            Self::Head => "Head",
            Self::Shoulder => "Shoulder",
            Self::Hand => "Hand",
            Self::Foot => "Foot",
            Self::Toe => "Toe",
        }
    }
}

/// 手指关节类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum FingerJointType {
    #[default]
    Invalid = 0,
    Metacarpal = 1,
    Proximal = 2,
    Intermediate = 3,
    Distal = 4,
    Tip = 5,
}

impl FingerJointType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Metacarpal => "MCP",
            Self::Proximal => "PIP",
            Self::Intermediate => "IP",
            Self::Distal => "DIP",
            Self::Tip => "TIP",
        }
    }
}

// ============================================================================
// 人体工学数据
// ============================================================================

/// 人体工学数据类型（40 项，前 20 项为左手，后 20 项为右手）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ErgonomicsDataType {
    LeftFingerThumbMcpSpread = 0,
    LeftFingerThumbMcpStretch = 1,
    LeftFingerThumbPipStretch = 2,
    LeftFingerThumbDipStretch = 3,
    LeftFingerIndexMcpSpread = 4,
    LeftFingerIndexMcpStretch = 5,
    LeftFingerIndexPipStretch = 6,
    LeftFingerIndexDipStretch = 7,
    LeftFingerMiddleMcpSpread = 8,
    LeftFingerMiddleMcpStretch = 9,
    LeftFingerMiddlePipStretch = 10,
    LeftFingerMiddleDipStretch = 11,
    LeftFingerRingMcpSpread = 12,
    LeftFingerRingMcpStretch = 13,
    LeftFingerRingPipStretch = 14,
    LeftFingerRingDipStretch = 15,
    LeftFingerPinkyMcpSpread = 16,
    LeftFingerPinkyMcpStretch = 17,
    LeftFingerPinkyPipStretch = 18,
    LeftFingerPinkyDipStretch = 19,
    RightFingerThumbMcpSpread = 20,
    RightFingerThumbMcpStretch = 21,
    RightFingerThumbPipStretch = 22,
    RightFingerThumbDipStretch = 23,
    RightFingerIndexMcpSpread = 24,
    RightFingerIndexMcpStretch = 25,
    RightFingerIndexPipStretch = 26,
    RightFingerIndexDipStretch = 27,
    RightFingerMiddleMcpSpread = 28,
    RightFingerMiddleMcpStretch = 29,
    RightFingerMiddlePipStretch = 30,
    RightFingerMiddleDipStretch = 31,
    RightFingerRingMcpSpread = 32,
    RightFingerRingMcpStretch = 33,
    RightFingerRingPipStretch = 34,
    RightFingerRingDipStretch = 35,
    RightFingerPinkyMcpSpread = 36,
    RightFingerPinkyMcpStretch = 37,
    RightFingerPinkyPipStretch = 38,
    RightFingerPinkyDipStretch = 39,
}

/// 每侧的人体工学数据项数量
pub const ERGONOMICS_PER_SIDE: usize = 20;

/// 人体工学数据总项数（`ErgonomicsDataType_MAX_SIZE`）
pub const ERGONOMICS_DATA_SIZE: usize = 2 * ERGONOMICS_PER_SIDE;

// 与侧无关的显示名称（左右手共用）
const ERGONOMICS_NAMES: [&str; ERGONOMICS_PER_SIDE] = [
    "ThumbMCPSpread",
    "ThumbMCPStretch",
    "ThumbPIPStretch",
    "ThumbDIPStretch",
    "IndexSpread",
    "IndexMCPStretch",
    "IndexPIPStretch",
    "IndexDIPStretch",
    "MiddleSpread",
    "MiddleMCPStretch",
    "MiddlePIPStretch",
    "MiddleDIPStretch",
    "RingSpread",
    "RingMCPStretch",
    "RingPIPStretch",
    "RingDIPStretch",
    "PinkySpread",
    "PinkyMCPStretch",
    "PinkyPIPStretch",
    "PinkyDIPStretch",
];

impl ErgonomicsDataType {
    /// 从数组下标转换（越界返回 `None`）
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(|raw| Self::try_from(raw).ok())
    }

    /// 在 40 项数组中的下标
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }

    /// 该数据项所属的侧（0-19 左手，20-39 右手）
    pub fn side(self) -> Side {
        if self.index() < ERGONOMICS_PER_SIDE {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// 与侧无关的显示名称
    pub fn as_str(self) -> &'static str {
        ERGONOMICS_NAMES[self.index() % ERGONOMICS_PER_SIDE]
    }

    /// 某一侧的全部 20 个数据类型（按下标升序）
    ///
    /// `Center` / `Invalid` 没有对应的人体工学数据，返回空迭代器。
    pub fn for_side(side: Side) -> impl Iterator<Item = Self> {
        let range = match side {
            Side::Left => 0..ERGONOMICS_PER_SIDE,
            Side::Right => ERGONOMICS_PER_SIDE..ERGONOMICS_DATA_SIZE,
            Side::Center | Side::Invalid => 0..0,
        };
        range.filter_map(Self::from_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_from_raw() {
        assert_eq!(SdkReturnCode::from(0), SdkReturnCode::Success);
        assert_eq!(SdkReturnCode::from(5), SdkReturnCode::SdkNotAvailable);
        assert_eq!(SdkReturnCode::from(17), SdkReturnCode::SdkIsTerminating);
        // 未知数值映射为 Error
        assert_eq!(SdkReturnCode::from(999), SdkReturnCode::Error);
        assert_eq!(SdkReturnCode::NotConnected.as_i32(), 11);
    }

    #[test]
    fn test_return_code_terminal() {
        assert!(SdkReturnCode::SdkNotAvailable.is_terminal());
        assert!(SdkReturnCode::SdkIsTerminating.is_terminal());
        assert!(!SdkReturnCode::DataNotAvailable.is_terminal());
        assert!(!SdkReturnCode::Success.is_terminal());
    }

    #[test]
    fn test_return_code_check() {
        assert!(SdkReturnCode::Success.check("CoreSdk_ShutDown").is_ok());
        let err = SdkReturnCode::InvalidId.check("CoreSdk_GetRawDeviceData").unwrap_err();
        assert_eq!(err.code, SdkReturnCode::InvalidId);
        assert_eq!(err.call, "CoreSdk_GetRawDeviceData");
    }

    #[test]
    fn test_calibration_result_from_raw() {
        assert_eq!(CalibrationResult::from(1), CalibrationResult::Success);
        assert_eq!(CalibrationResult::from(6), CalibrationResult::DeserializationError);
        assert_eq!(CalibrationResult::from(42), CalibrationResult::Error);
        assert!(!CalibrationResult::WrongSideError.is_success());
    }

    #[test]
    fn test_name_tables() {
        assert_eq!(Side::Left.as_str(), "Left");
        assert_eq!(Side::from(7), Side::Invalid);
        assert_eq!(ChainType::FingerThumb.as_str(), "Thumb");
        assert_eq!(ChainType::from(99).as_str(), "Invalid");
        assert_eq!(FingerJointType::Metacarpal.as_str(), "MCP");
        assert_eq!(FingerJointType::Tip.as_str(), "TIP");
    }

    #[test]
    fn test_ergonomics_side_split() {
        let left: Vec<_> = ErgonomicsDataType::for_side(Side::Left).collect();
        let right: Vec<_> = ErgonomicsDataType::for_side(Side::Right).collect();
        assert_eq!(left.len(), ERGONOMICS_PER_SIDE);
        assert_eq!(right.len(), ERGONOMICS_PER_SIDE);
        assert!(left.iter().all(|t| t.side() == Side::Left && t.index() < 20));
        assert!(right.iter().all(|t| t.side() == Side::Right && t.index() >= 20));
        assert_eq!(ErgonomicsDataType::for_side(Side::Center).count(), 0);
    }

    #[test]
    fn test_ergonomics_names_are_side_agnostic() {
        let left = ErgonomicsDataType::LeftFingerIndexMcpSpread;
        let right = ErgonomicsDataType::RightFingerIndexMcpSpread;
        assert_eq!(left.as_str(), "IndexSpread");
        assert_eq!(left.as_str(), right.as_str());
        assert_eq!(ErgonomicsDataType::from_index(40), None);
        assert_eq!(
            ErgonomicsDataType::from_index(39),
            Some(ErgonomicsDataType::RightFingerPinkyDipStretch)
        );
    }
}
