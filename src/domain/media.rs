// ==========================================
// 内容排期系统 - 素材领域模型
// ==========================================
// 职责: 素材库条目与标签分配
// 红线: 引擎只读素材，不修改素材
// ==========================================

use crate::domain::types::{MediaId, MediaKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// TagValue - 标签取值
// ==========================================
// 维度类型: 分类 / 布尔 / 数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Boolean(bool),
    Numeric(f64),
    Categorical(String),
}

impl TagValue {
    /// 数值型取值（非数值返回 None）
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            TagValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// 宽松相等：分类值忽略大小写比较
    pub fn loosely_equals(&self, other: &TagValue) -> bool {
        match (self, other) {
            (TagValue::Categorical(a), TagValue::Categorical(b)) => a.eq_ignore_ascii_case(b),
            (TagValue::Boolean(a), TagValue::Boolean(b)) => a == b,
            (TagValue::Numeric(a), TagValue::Numeric(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        }
    }

    /// 存储用的类型标识
    pub fn kind_str(&self) -> &'static str {
        match self {
            TagValue::Boolean(_) => "boolean",
            TagValue::Numeric(_) => "numeric",
            TagValue::Categorical(_) => "categorical",
        }
    }
}

// ==========================================
// TagAssignment - 标签分配 (维度 → 取值)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignment {
    pub tag_id: String,    // 标签ID
    pub dimension: String, // 维度名称
    pub value: TagValue,   // 取值
}

// ==========================================
// MediaItem - 素材
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: MediaId,
    pub kind: MediaKind,
    #[serde(default)]
    pub tags: Vec<TagAssignment>,

    // ===== 可检索文本 =====
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub caption: Option<String>,

    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl MediaItem {
    /// 是否带有指定标签
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.tag_id == tag_id)
    }

    /// 某维度下的所有取值
    pub fn values_in<'a>(&'a self, dimension: &'a str) -> impl Iterator<Item = &'a TagValue> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.dimension.eq_ignore_ascii_case(dimension))
            .map(|t| &t.value)
    }

    /// 可检索文本字段（名称、路径、说明）
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [Some(self.name.as_str()), Some(self.path.as_str()), self.caption.as_deref()]
            .into_iter()
            .flatten()
    }
}
