// ==========================================
// 内容排期系统 - 发帖时段与分配结果
// ==========================================
// 职责: 单次运行内生成的时段、填充/未填充记录、汇总结果
// 红线: 时段不由引擎持久化，仅交给草稿创建方
// ==========================================

use crate::domain::types::{AssignmentSource, ChannelId, MediaId, ScheduleId, UnfilledReason};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ==========================================
// Slot - 发帖时段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub schedule_id: ScheduleId,
    pub channel_id: ChannelId,
    pub timestamp: NaiveDateTime,
}

impl Slot {
    pub fn new(schedule_id: &str, channel_id: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            schedule_id: schedule_id.to_string(),
            channel_id: channel_id.to_string(),
            timestamp,
        }
    }

    /// 时间顺序比较（同一时刻按渠道、规则ID排序，保证确定性）
    pub fn chronological_cmp(&self, other: &Slot) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.channel_id.cmp(&other.channel_id))
            .then_with(|| self.schedule_id.cmp(&other.schedule_id))
    }

    /// 是否与给定的 (规则, 时刻) 对应
    pub fn is_keyed(&self, key: &SlotKey) -> bool {
        self.schedule_id == key.schedule_id && self.timestamp == key.timestamp
    }
}

// ==========================================
// SlotKey - 时段标识（规则ID + 时刻）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub schedule_id: ScheduleId,
    pub timestamp: NaiveDateTime,
}

// ==========================================
// FilledSlot - 已填充时段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledSlot {
    pub slot: Slot,
    pub media_id: MediaId,
    pub source: AssignmentSource,
}

// ==========================================
// UnfilledSlot - 未填充时段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfilledSlot {
    pub schedule_id: ScheduleId,
    pub channel_id: ChannelId,
    pub date: NaiveDateTime,
    pub reason: UnfilledReason,
    /// 可解释明细，如 "FILTER_REJECTED=3, COOLDOWN=1, ALREADY_ASSIGNED=1"
    pub detail: Option<String>,
}

impl UnfilledSlot {
    pub fn from_slot(slot: &Slot, reason: UnfilledReason, detail: Option<String>) -> Self {
        Self {
            schedule_id: slot.schedule_id.clone(),
            channel_id: slot.channel_id.clone(),
            date: slot.timestamp,
            reason,
            detail,
        }
    }
}

// ==========================================
// ScheduleWarning - 排期规则配置告警
// ==========================================
// 配置错误的规则被跳过，不中断整个运行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWarning {
    pub schedule_id: ScheduleId,
    pub channel_id: ChannelId,
    pub message: String,
}

// ==========================================
// AssignmentResult - 分配汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub filled: Vec<FilledSlot>,
    pub unfilled: Vec<UnfilledSlot>,
}

impl AssignmentResult {
    pub fn filled_count(&self) -> usize {
        self.filled.len()
    }

    /// 查找某时段分配到的素材
    pub fn media_for(&self, slot: &Slot) -> Option<&MediaId> {
        self.filled
            .iter()
            .find(|f| &f.slot == slot)
            .map(|f| &f.media_id)
    }

    /// 按原因统计未填充数量
    pub fn unfilled_with(&self, reason: UnfilledReason) -> usize {
        self.unfilled.iter().filter(|u| u.reason == reason).count()
    }
}
