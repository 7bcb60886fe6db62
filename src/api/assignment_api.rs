// ==========================================
// 内容排期系统 - 分配 API
// ==========================================
// 职责:
// - 按日期区间对所选渠道执行分配，返回汇总（camelCase JSON）
// - 人工拖拽指定单个时段的素材
// - 定时任务入口：全部渠道 × [今天, 今天 + 排期天数)
// 说明: 调用边界做输入校验（快速失败），引擎内部的可恢复情况作为数据返回
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::EngineConfigReader;
use crate::domain::filter::FilterExpression;
use crate::domain::slot::{ScheduleWarning, Slot, SlotKey, UnfilledSlot};
use crate::domain::types::{AssignmentSource, ChannelId, MediaId};
use crate::engine::orchestrator::{DraftFailure, PipelineOrchestrator, RunReport, RunRequest};
use crate::engine::sources::{DraftId, PipelineSources};

// ==========================================
// 请求 / 响应
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAssignmentRequest {
    pub channel_ids: Vec<ChannelId>,
    /// YYYY-MM-DD（含）
    pub from_date: String,
    /// YYYY-MM-DD（含）
    pub to_date: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub library_filter: Option<FilterExpression>,
    #[serde(default)]
    pub pending_overrides: Vec<SlotKey>,
}

/// 单个时段的分配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub schedule_id: String,
    pub channel_id: ChannelId,
    pub date: NaiveDateTime,
    pub media_id: MediaId,
    pub source: AssignmentSource,
    pub draft_id: Option<DraftId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAssignmentResponse {
    /// 创建成功的草稿数（dry run 时等于填充数）
    pub created: usize,
    pub filled: usize,
    pub failed: usize,
    /// 运行前已有草稿、本次跳过的时段数
    pub already_drafted: usize,
    pub unfilled: Vec<UnfilledSlot>,
    pub warnings: Vec<ScheduleWarning>,
    pub assignments: Vec<AssignmentView>,
    pub failures: Vec<DraftFailure>,
    pub dry_run: bool,
}

impl From<RunReport> for RunAssignmentResponse {
    fn from(report: RunReport) -> Self {
        let created = report.created();
        let assignments = report
            .result
            .filled
            .iter()
            .map(|f| AssignmentView {
                schedule_id: f.slot.schedule_id.clone(),
                channel_id: f.slot.channel_id.clone(),
                date: f.slot.timestamp,
                media_id: f.media_id.clone(),
                source: f.source,
                draft_id: report
                    .drafts
                    .iter()
                    .find(|d| d.slot == f.slot)
                    .map(|d| d.draft_id.clone()),
            })
            .collect();

        Self {
            created,
            filled: report.result.filled_count(),
            failed: report.failures.len(),
            already_drafted: report.already_drafted.len(),
            unfilled: report.result.unfilled,
            warnings: report.warnings,
            assignments,
            failures: report.failures,
            dry_run: report.dry_run,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignRequest {
    pub slot: Slot,
    pub media_id: MediaId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignResponse {
    pub draft_id: DraftId,
    pub slot: Slot,
    pub media_id: MediaId,
}

// ==========================================
// AssignmentApi
// ==========================================
pub struct AssignmentApi<C>
where
    C: EngineConfigReader,
{
    config: Arc<C>,
    sources: PipelineSources,
    orchestrator: PipelineOrchestrator<C>,
}

impl<C> AssignmentApi<C>
where
    C: EngineConfigReader,
{
    pub fn new(config: Arc<C>, sources: PipelineSources) -> Self {
        Self {
            orchestrator: PipelineOrchestrator::new(config.clone(), sources.clone()),
            config,
            sources,
        }
    }

    fn parse_date(value: &str, field: &str) -> ApiResult<NaiveDate> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::InvalidInput(format!("{}格式错误（应为 YYYY-MM-DD）: {}", field, raw))
        })
    }

    fn normalize_ids(ids: &[ChannelId]) -> ApiResult<Vec<ChannelId>> {
        let mut out: Vec<ChannelId> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.trim();
            if id.is_empty() {
                return Err(ApiError::InvalidInput("渠道ID不能为空".to_string()));
            }
            if !out.iter().any(|x| x == id) {
                out.push(id.to_string());
            }
        }
        if out.is_empty() {
            return Err(ApiError::InvalidInput("渠道列表不能为空".to_string()));
        }
        Ok(out)
    }

    /// 日期区间 [from_date, to_date] 转换为半开时间区间
    fn to_range(from_date: NaiveDate, to_date: NaiveDate) -> ApiResult<(NaiveDateTime, NaiveDateTime)> {
        if from_date > to_date {
            return Err(ApiError::InvalidInput(format!(
                "起始日期{}晚于结束日期{}",
                from_date, to_date
            )));
        }
        let next_day = to_date
            .succ_opt()
            .ok_or_else(|| ApiError::InvalidInput(format!("结束日期超出可表示范围: {}", to_date)))?;
        let from = from_date.and_time(chrono::NaiveTime::MIN);
        let to = next_day.and_time(chrono::NaiveTime::MIN);
        Ok((from, to))
    }

    /// 定时任务区间的最后一天: today + (horizon - 1) 天
    fn horizon_last_day(today: NaiveDate, horizon: i64) -> ApiResult<NaiveDate> {
        TimeDelta::try_days(horizon.max(1) - 1)
            .and_then(|span| today.checked_add_signed(span))
            .ok_or_else(|| ApiError::InvalidInput(format!("排期天数超出可表示范围: {}", horizon)))
    }

    /// 执行分配
    #[instrument(skip(self, request), fields(
        channels = request.channel_ids.len(),
        from_date = %request.from_date,
        to_date = %request.to_date,
        dry_run = request.dry_run
    ))]
    pub async fn run_assignment(&self, request: RunAssignmentRequest) -> ApiResult<RunAssignmentResponse> {
        let channel_ids = Self::normalize_ids(&request.channel_ids)?;
        let from_date = Self::parse_date(&request.from_date, "起始日期")?;
        let to_date = Self::parse_date(&request.to_date, "结束日期")?;
        let (from, to) = Self::to_range(from_date, to_date)?;

        let report = self
            .orchestrator
            .run_assignment(RunRequest {
                channel_ids,
                from,
                to,
                dry_run: request.dry_run,
                library_filter: request.library_filter,
                pending_overrides: request.pending_overrides,
            })
            .await?;

        Ok(report.into())
    }

    /// 人工拖拽指定
    pub async fn manual_assign(&self, request: ManualAssignRequest) -> ApiResult<ManualAssignResponse> {
        if request.slot.schedule_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("规则ID不能为空".to_string()));
        }
        if request.slot.channel_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("渠道ID不能为空".to_string()));
        }
        if request.media_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("素材ID不能为空".to_string()));
        }

        let created = self
            .orchestrator
            .manual_assign(request.slot, &request.media_id)
            .await?;

        Ok(ManualAssignResponse {
            draft_id: created.draft_id,
            slot: created.slot,
            media_id: created.media_id,
        })
    }

    /// 定时任务: 全部渠道，从 today 起排期 planning_horizon_days 天
    pub async fn run_scheduled(&self, today: NaiveDate, dry_run: bool) -> ApiResult<RunAssignmentResponse> {
        let horizon = self
            .config
            .get_planning_horizon_days()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取排期天数失败: {}", e)))?;

        let channel_ids = self
            .sources
            .schedules
            .list_channel_ids()
            .await
            .map_err(|e| ApiError::SourceError(format!("channels: {}", e)))?;

        if channel_ids.is_empty() {
            info!("无渠道，跳过本轮分配");
            return Ok(RunAssignmentResponse {
                dry_run,
                ..RunAssignmentResponse::default()
            });
        }

        let last_day = Self::horizon_last_day(today, horizon)?;
        self.run_assignment(RunAssignmentRequest {
            channel_ids,
            from_date: today.format("%Y-%m-%d").to_string(),
            to_date: last_day.format("%Y-%m-%d").to_string(),
            dry_run,
            library_filter: None,
            pending_overrides: vec![],
        })
        .await
    }

    /// 重跑间隔（定时任务使用）
    ///
    /// 分钟数换算秒溢出时取可表示的最大间隔
    pub async fn rerun_interval(&self) -> ApiResult<std::time::Duration> {
        let minutes = self
            .config
            .get_rerun_interval_minutes()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取重跑间隔失败: {}", e)))?;
        let secs = minutes.max(1).checked_mul(60).unwrap_or(u64::MAX);
        Ok(std::time::Duration::from_secs(secs))
    }
}
