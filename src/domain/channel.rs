// ==========================================
// 内容排期系统 - 渠道与排期规则领域模型
// ==========================================
// 职责: 渠道、周期性排期规则、发帖历史
// 说明: ChannelSchedule 保留用户录入的原始形态，
//       由 RecurrenceRule::compile 在加载时校验
// ==========================================

use crate::domain::filter::FilterExpression;
use crate::domain::types::{ChannelId, MediaId, PlatformType, ScheduleId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Channel - 发帖渠道
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub platform: PlatformType,

    /// 渠道级素材准入（如子版块内容规则），None 表示不限
    #[serde(default)]
    pub eligible_media_filter: Option<FilterExpression>,

    /// 重发冷却（小时）：同一素材在该渠道上次发帖后此窗口内不可复用
    #[serde(default)]
    pub repost_cooldown_hours: i64,
}

// ==========================================
// ChannelSchedule - 周期性排期规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSchedule {
    pub id: ScheduleId,
    pub channel_id: ChannelId,

    /// 周期: daily / weekly / monthly
    pub cadence: String,

    /// 每周期期望发帖数
    pub posts_per_timeframe: i32,

    /// 偏好星期（仅 weekly），如 "Mon" / "Wednesday"
    #[serde(default)]
    pub preferred_days: Vec<String>,

    /// 偏好时刻（HH:MM）
    #[serde(default)]
    pub preferred_times: Vec<String>,

    /// 规则级素材筛选，None 表示不限
    #[serde(default)]
    pub media_filters: Option<FilterExpression>,
}

// ==========================================
// PostingHistoryEntry - 发帖历史（外部只读事实）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingHistoryEntry {
    pub media_id: MediaId,
    pub channel_id: ChannelId,
    pub posted_at: NaiveDateTime,
}
