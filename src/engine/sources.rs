// ==========================================
// 内容排期系统 - 外部协作方接口
// ==========================================
// 职责: 定义编排器依赖的数据来源与草稿创建接口（不包含实现）
// 实现者: repository 层 SQLite 仓储；测试中的内存桩
// 红线: 引擎只通过这些接口做 I/O
// ==========================================

use crate::domain::channel::{Channel, ChannelSchedule, PostingHistoryEntry};
use crate::domain::filter::FilterExpression;
use crate::domain::media::MediaItem;
use crate::domain::slot::{FilledSlot, Slot};
use crate::domain::types::{AssignmentSource, ChannelId, MediaId};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// 数据源错误（由编排器转换为 EngineError::Source）
pub type SourceResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 草稿ID（由草稿创建方生成）
pub type DraftId = String;

// ==========================================
// LibraryProvider - 素材库
// ==========================================
#[async_trait]
pub trait LibraryProvider: Send + Sync {
    /// 加载素材库快照
    ///
    /// prefilter 为粗筛条件，实现方可忽略；引擎会再次精确求值
    async fn load_library(&self, prefilter: Option<&FilterExpression>) -> SourceResult<Vec<MediaItem>>;
}

// ==========================================
// ScheduleStore - 渠道与排期规则
// ==========================================
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// 按ID加载渠道（不存在的ID被忽略）
    async fn load_channels(&self, ids: &[ChannelId]) -> SourceResult<Vec<Channel>>;

    /// 加载渠道下的全部排期规则
    async fn load_schedules(&self, channel_ids: &[ChannelId]) -> SourceResult<Vec<ChannelSchedule>>;

    /// 全部渠道ID（定时任务使用）
    async fn list_channel_ids(&self) -> SourceResult<Vec<ChannelId>>;
}

// ==========================================
// HistoryStore - 发帖历史
// ==========================================
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 加载 since 之后的发帖历史
    async fn load_history(
        &self,
        channel_ids: &[ChannelId],
        since: NaiveDateTime,
    ) -> SourceResult<Vec<PostingHistoryEntry>>;
}

// ==========================================
// DraftSink - 草稿创建
// ==========================================

/// 草稿创建请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub slot: Slot,
    pub media_id: MediaId,
    pub source: AssignmentSource,
}

/// 草稿创建失败（按时段记录，不中断其他时段）
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("草稿被拒绝: {0}")]
    Rejected(String),

    #[error("草稿存储失败: {0}")]
    Storage(String),
}

#[async_trait]
pub trait DraftSink: Send + Sync {
    async fn create_draft(&self, request: DraftRequest) -> Result<DraftId, DraftError>;

    /// from 起（含）已存在的草稿
    ///
    /// 区间内的草稿时段不再分配；全部草稿的素材视为本次运行已占用；默认无
    async fn existing_drafts(
        &self,
        _channel_ids: &[ChannelId],
        _from: NaiveDateTime,
    ) -> SourceResult<Vec<FilledSlot>> {
        Ok(Vec::new())
    }
}

// ==========================================
// PipelineSources - 协作方集合
// ==========================================
#[derive(Clone)]
pub struct PipelineSources {
    pub library: Arc<dyn LibraryProvider>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub history: Arc<dyn HistoryStore>,
    pub drafts: Arc<dyn DraftSink>,
}

impl PipelineSources {
    pub fn new(
        library: Arc<dyn LibraryProvider>,
        schedules: Arc<dyn ScheduleStore>,
        history: Arc<dyn HistoryStore>,
        drafts: Arc<dyn DraftSink>,
    ) -> Self {
        Self {
            library,
            schedules,
            history,
            drafts,
        }
    }
}
