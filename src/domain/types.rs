// ==========================================
// 内容排期系统 - 领域类型定义
// ==========================================
// 职责: 素材类型、排期周期、平台、未填充原因等枚举
// 序列化格式: snake_case (与前端/存储一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 素材ID
pub type MediaId = String;

/// 渠道ID
pub type ChannelId = String;

/// 排期规则ID
pub type ScheduleId = String;

// ==========================================
// 素材类型 (Media Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image, // 图片
    Video, // 视频
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("未知素材类型: {}", other)),
        }
    }
}

// ==========================================
// 排期周期 (Cadence Kind)
// ==========================================
// 封闭集合: 每个变体对应一个展开函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceKind {
    Daily,   // 每日
    Weekly,  // 每周
    Monthly, // 每月
}

impl fmt::Display for CadenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CadenceKind::Daily => write!(f, "daily"),
            CadenceKind::Weekly => write!(f, "weekly"),
            CadenceKind::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for CadenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(CadenceKind::Daily),
            "weekly" => Ok(CadenceKind::Weekly),
            "monthly" => Ok(CadenceKind::Monthly),
            other => Err(format!("未知排期周期: {}", other)),
        }
    }
}

// ==========================================
// 平台类型 (Platform)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    Reddit,
    Fansly,
    Bluesky,
    Other,
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformType::Reddit => write!(f, "reddit"),
            PlatformType::Fansly => write!(f, "fansly"),
            PlatformType::Bluesky => write!(f, "bluesky"),
            PlatformType::Other => write!(f, "other"),
        }
    }
}

impl PlatformType {
    /// 从字符串解析平台（未知值归入 Other）
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "reddit" => PlatformType::Reddit,
            "fansly" => PlatformType::Fansly,
            "bluesky" => PlatformType::Bluesky,
            _ => PlatformType::Other,
        }
    }
}

// ==========================================
// 未填充原因 (Unfilled Reason)
// ==========================================
// 红线: 每个未填充时段必须输出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfilledReason {
    NoEligibleMedia,       // 无可用素材
    NoSlotsGenerated,      // 排期规则在区间内未生成任何时段
    ManualOverridePending, // 等待人工拖拽指定
}

impl fmt::Display for UnfilledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnfilledReason::NoEligibleMedia => write!(f, "no_eligible_media"),
            UnfilledReason::NoSlotsGenerated => write!(f, "no_slots_generated"),
            UnfilledReason::ManualOverridePending => write!(f, "manual_override_pending"),
        }
    }
}

// ==========================================
// 分配来源 (Assignment Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    Greedy, // 贪心自动分配
    Manual, // 人工拖拽指定
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentSource::Greedy => write!(f, "greedy"),
            AssignmentSource::Manual => write!(f, "manual"),
        }
    }
}

impl AssignmentSource {
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "manual" => AssignmentSource::Manual,
            _ => AssignmentSource::Greedy,
        }
    }
}
