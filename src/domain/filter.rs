// ==========================================
// 内容排期系统 - 素材筛选表达式
// ==========================================
// 结构: 组间 OR，组内 AND（列表的列表 + 带标签变体）
// 说明: 保持可序列化、可比对，便于持久化与前端编辑
// ==========================================

use crate::domain::media::TagValue;
use crate::domain::types::MediaKind;
use serde::{Deserialize, Serialize};

// ==========================================
// FilterItem - 筛选条件（带标签变体）
// ==========================================
// 序列化: {"type": "tag", "id": "..."}
// 未识别的 type 反序列化为 Unknown（向前兼容）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterItem {
    /// 素材必须带有该标签
    Tag { id: String },

    /// 素材不得带有该标签
    ExcludedTag { id: String },

    /// 素材类型精确匹配
    MediaType { value: MediaKind },

    /// 文本检索（忽略大小写的子串匹配）
    TextSearch { value: String },

    /// 维度取值匹配
    DimensionValue { dimension: String, value: TagValue },

    /// 数值维度区间（闭区间，缺省端不限）
    NumericRange {
        dimension: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },

    /// 渠道发帖历史：是否已发到该渠道
    ChannelHistory {
        #[serde(rename = "channelId")]
        channel_id: String,
        posted: bool,
    },

    /// 未识别的条件类型
    #[serde(other)]
    Unknown,
}

// ==========================================
// FilterGroup - 条件组（组内 AND）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterGroup {
    pub items: Vec<FilterItem>,
}

impl FilterGroup {
    pub fn new(items: Vec<FilterItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ==========================================
// FilterExpression - 筛选表达式（组间 OR）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression {
    pub groups: Vec<FilterGroup>,
}

impl FilterExpression {
    /// 空表达式（匹配全部素材）
    pub fn match_all() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn new(groups: Vec<FilterGroup>) -> Self {
        Self { groups }
    }

    /// 单组表达式
    pub fn all_of(items: Vec<FilterItem>) -> Self {
        Self {
            groups: vec![FilterGroup::new(items)],
        }
    }

    /// 单条件表达式
    pub fn single(item: FilterItem) -> Self {
        Self::all_of(vec![item])
    }

    /// 追加一个 OR 分支
    pub fn or(mut self, items: Vec<FilterItem>) -> Self {
        self.groups.push(FilterGroup::new(items));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 是否包含未识别的条件类型（调用方据此记录告警）
    pub fn has_unknown_items(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .any(|item| matches!(item, FilterItem::Unknown))
    }

    /// 是否含有空组（空组被跳过，常见于配置残缺）
    pub fn has_empty_groups(&self) -> bool {
        self.groups.iter().any(FilterGroup::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_list_of_lists() {
        let raw = r#"[
            [{"type": "tag", "id": "vip"}, {"type": "mediaType", "value": "image"}],
            [{"type": "textSearch", "value": "beach"}]
        ]"#;
        let expr: FilterExpression = serde_json::from_str(raw).unwrap();

        assert_eq!(expr.groups.len(), 2);
        assert_eq!(
            expr.groups[0].items[0],
            FilterItem::Tag { id: "vip".to_string() }
        );
        assert_eq!(
            expr.groups[0].items[1],
            FilterItem::MediaType { value: MediaKind::Image }
        );
        assert!(!expr.has_unknown_items());
    }

    #[test]
    fn test_unknown_item_type_is_preserved_as_unknown() {
        let raw = r#"[[{"type": "aiScore", "threshold": 0.7}]]"#;
        let expr: FilterExpression = serde_json::from_str(raw).unwrap();

        assert_eq!(expr.groups[0].items[0], FilterItem::Unknown);
        assert!(expr.has_unknown_items());
    }

    #[test]
    fn test_channel_history_field_names() {
        let raw = r#"[[{"type": "channelHistory", "channelId": "C1", "posted": false}]]"#;
        let expr: FilterExpression = serde_json::from_str(raw).unwrap();

        assert_eq!(
            expr.groups[0].items[0],
            FilterItem::ChannelHistory {
                channel_id: "C1".to_string(),
                posted: false,
            }
        );
    }

    #[test]
    fn test_serialize_roundtrip_shape() {
        let expr = FilterExpression::single(FilterItem::Tag { id: "vip".to_string() });
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, r#"[[{"type":"tag","id":"vip"}]]"#);
    }
}
