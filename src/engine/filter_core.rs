// ==========================================
// 内容排期系统 - 素材筛选求值 纯函数库
// ==========================================
// 职责: 对单个素材求值筛选表达式（组间 OR，组内 AND）
// 红线: 无状态、无副作用、无 I/O 操作、不记录日志
// ==========================================

use crate::domain::filter::{FilterExpression, FilterItem};
use crate::domain::media::MediaItem;

// ==========================================
// PostingLookup - 发帖历史查询接口
// ==========================================
// 用途: 求值 channelHistory 条件
pub trait PostingLookup {
    /// 素材是否曾发到该渠道
    fn has_posted(&self, media_id: &str, channel_id: &str) -> bool;
}

/// 无历史（所有素材视为从未发过）
pub struct NoPostingHistory;

impl PostingLookup for NoPostingHistory {
    fn has_posted(&self, _media_id: &str, _channel_id: &str) -> bool {
        false
    }
}

// ==========================================
// FilterEvaluator - 纯函数工具类
// ==========================================
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// 判定素材是否满足筛选表达式
    ///
    /// # 规则
    /// 1. 空表达式（无组）→ 匹配全部
    /// 2. 空组（无条件）→ 跳过，不参与 OR
    /// 3. 任一非空组内全部条件满足 → 匹配
    pub fn matches(media: &MediaItem, expr: &FilterExpression) -> bool {
        Self::matches_with(media, expr, &NoPostingHistory)
    }

    /// 带发帖历史的求值
    pub fn matches_with(
        media: &MediaItem,
        expr: &FilterExpression,
        lookup: &dyn PostingLookup,
    ) -> bool {
        if expr.is_empty() {
            return true;
        }

        expr.groups
            .iter()
            .filter(|group| !group.is_empty())
            .any(|group| {
                group
                    .items
                    .iter()
                    .all(|item| Self::item_satisfied(media, item, lookup))
            })
    }

    /// 可选表达式求值（None 视为匹配全部）
    pub fn matches_optional(
        media: &MediaItem,
        expr: Option<&FilterExpression>,
        lookup: &dyn PostingLookup,
    ) -> bool {
        match expr {
            Some(expr) => Self::matches_with(media, expr, lookup),
            None => true,
        }
    }

    /// 单条件求值
    ///
    /// 未识别的条件视为满足（宽松策略，告警由调用方记录）
    pub fn item_satisfied(media: &MediaItem, item: &FilterItem, lookup: &dyn PostingLookup) -> bool {
        match item {
            FilterItem::Tag { id } => media.has_tag(id),
            FilterItem::ExcludedTag { id } => !media.has_tag(id),
            FilterItem::MediaType { value } => media.kind == *value,
            FilterItem::TextSearch { value } => Self::text_matches(media, value),
            FilterItem::DimensionValue { dimension, value } => media
                .values_in(dimension)
                .any(|v| v.loosely_equals(value)),
            FilterItem::NumericRange { dimension, min, max } => media
                .values_in(dimension)
                .filter_map(|v| v.as_numeric())
                .any(|v| min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi)),
            FilterItem::ChannelHistory { channel_id, posted } => {
                lookup.has_posted(&media.id, channel_id) == *posted
            }
            FilterItem::Unknown => true,
        }
    }

    /// 文本检索: 忽略大小写的子串匹配（名称、路径、说明）
    fn text_matches(media: &MediaItem, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        media
            .searchable_fields()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
