// ==========================================
// 内容排期系统 - 流水线编排器
// ==========================================
// 用途: 协调 周期展开 → 素材准入 → 贪心分配 → 草稿创建
// 说明: 决策阶段纯同步，全部完成后才开始草稿创建（唯一的 I/O）
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::channel::{Channel, ChannelSchedule, PostingHistoryEntry};
use crate::domain::filter::FilterExpression;
use crate::domain::media::MediaItem;
use crate::domain::slot::{
    AssignmentResult, FilledSlot, ScheduleWarning, Slot, SlotKey, UnfilledSlot,
};
use crate::domain::types::{ChannelId, MediaId, UnfilledReason};
use crate::engine::assignment::AssignmentEngine;
use crate::engine::eligibility::{EligibilityOutcome, EligibilityResolver};
use crate::engine::eligibility_core::PostingHistoryIndex;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::filter_core::FilterEvaluator;
use crate::engine::recurrence::{RecurrenceExpander, RecurrenceRule};
use crate::engine::sources::{DraftId, DraftRequest, PipelineSources};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 纯规划（无 I/O）
// ==========================================

/// 规划输入（一次运行的不可变快照）
#[derive(Debug, Clone, Copy)]
pub struct PlanningInput<'a> {
    pub channels: &'a [Channel],
    pub schedules: &'a [ChannelSchedule],
    pub library: &'a [MediaItem],
    pub history: &'a [PostingHistoryEntry],
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub default_time: NaiveTime,
    pub pending_overrides: &'a HashSet<SlotKey>,
    /// 已有草稿（区间内的时段不再分配，素材均视为已占用）
    pub existing_drafts: &'a [FilledSlot],
}

/// 规划输出
#[derive(Debug, Clone, Default)]
pub struct PlanningOutcome {
    pub result: AssignmentResult,
    pub warnings: Vec<ScheduleWarning>,
    pub slots_generated: usize,
    /// 本次展开的时段中已有草稿的部分
    pub already_drafted: Vec<FilledSlot>,
}

/// 执行规划
///
/// # 规则
/// 1. 只处理所选渠道下的规则；无规则的渠道不产生任何记录
/// 2. 编译失败的规则跳过并记录告警
/// 3. 编译成功但区间内无时段的规则记为 no_slots_generated
/// 4. 已有草稿的时段不再分配，草稿素材视为已占用
/// 5. 全部渠道的时段合并为一个时间序列后统一分配
pub fn plan_assignment(input: PlanningInput<'_>) -> PlanningOutcome {
    let channels_by_id: HashMap<&str, &Channel> =
        input.channels.iter().map(|c| (c.id.as_str(), c)).collect();
    let schedules_by_id: HashMap<&str, &ChannelSchedule> =
        input.schedules.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut outcome = PlanningOutcome::default();
    let mut slots: Vec<Slot> = Vec::new();
    let mut empty_schedules: Vec<UnfilledSlot> = Vec::new();

    // ==========================================
    // 步骤1: 编译并展开规则
    // ==========================================
    for schedule in input.schedules {
        let channel = match channels_by_id.get(schedule.channel_id.as_str()) {
            Some(c) => *c,
            None => {
                debug!(schedule_id = %schedule.id, channel_id = %schedule.channel_id, "规则所属渠道未选中，跳过");
                continue;
            }
        };

        let rule = match RecurrenceRule::compile(schedule, input.default_time) {
            Ok(rule) => rule,
            Err(e) => {
                warn!(schedule_id = %schedule.id, channel_id = %schedule.channel_id, error = %e, "排期规则配置错误，已跳过");
                outcome.warnings.push(ScheduleWarning {
                    schedule_id: schedule.id.clone(),
                    channel_id: schedule.channel_id.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        warn_on_unknown_items(&schedule.id, &channel.id, schedule.media_filters.as_ref());

        let before = slots.len();
        slots.extend(
            RecurrenceExpander::expand(&rule, input.from, input.to)
                .map(|ts| Slot::new(&schedule.id, &schedule.channel_id, ts)),
        );
        let generated = slots.len() - before;

        debug!(schedule_id = %schedule.id, cadence = %rule.cadence, generated, "规则展开完成");

        if generated == 0 {
            empty_schedules.push(UnfilledSlot {
                schedule_id: schedule.id.clone(),
                channel_id: schedule.channel_id.clone(),
                date: input.from,
                reason: UnfilledReason::NoSlotsGenerated,
                detail: Some(format!(
                    "cadence={}, posts_per_timeframe={}",
                    rule.cadence, rule.posts_per_timeframe
                )),
            });
        }
    }

    for channel in input.channels {
        warn_on_unknown_items(&channel.id, &channel.id, channel.eligible_media_filter.as_ref());
    }

    outcome.slots_generated = slots.len();

    let drafted: HashMap<(&str, NaiveDateTime), &FilledSlot> = input
        .existing_drafts
        .iter()
        .map(|d| ((d.slot.schedule_id.as_str(), d.slot.timestamp), d))
        .collect();
    let seeded: HashSet<MediaId> = input
        .existing_drafts
        .iter()
        .map(|d| d.media_id.clone())
        .collect();

    let mut open_slots = Vec::with_capacity(slots.len());
    for slot in slots {
        match drafted.get(&(slot.schedule_id.as_str(), slot.timestamp)) {
            Some(draft) => outcome.already_drafted.push((*draft).clone()),
            None => open_slots.push(slot),
        }
    }
    if !outcome.already_drafted.is_empty() {
        debug!(already_drafted = outcome.already_drafted.len(), "跳过已有草稿的时段");
    }

    // ==========================================
    // 步骤2: 准入 + 分配
    // ==========================================
    let index = PostingHistoryIndex::build(input.history);
    let mut resolver = EligibilityResolver::new(input.library, &index);
    let engine = AssignmentEngine::new();

    let mut result = engine.assign_seeded(
        open_slots,
        &index,
        input.pending_overrides,
        seeded,
        |slot, assigned| {
            let schedule = schedules_by_id.get(slot.schedule_id.as_str());
            let channel = channels_by_id.get(slot.channel_id.as_str());
            match (schedule, channel) {
                (Some(schedule), Some(channel)) => {
                    resolver.eligible_media(slot, schedule, channel, assigned)
                }
                _ => EligibilityOutcome::default(),
            }
        },
    );

    result.unfilled.extend(empty_schedules);
    outcome.result = result;
    outcome
}

fn warn_on_unknown_items(owner_id: &str, channel_id: &str, expr: Option<&FilterExpression>) {
    if let Some(expr) = expr {
        if expr.has_unknown_items() {
            warn!(owner_id, channel_id, "筛选条件含未识别类型，按满足处理");
        }
        if expr.has_empty_groups() {
            debug!(owner_id, channel_id, "筛选条件含空组，已忽略");
        }
    }
}

/// 历史加载起点: from 往前 lookback_hours 小时
///
/// 超出可表示范围时取最早时刻（加载全部历史）
fn history_since(from: NaiveDateTime, lookback_hours: i64) -> NaiveDateTime {
    TimeDelta::try_hours(lookback_hours.max(0))
        .and_then(|lookback| from.checked_sub_signed(lookback))
        .unwrap_or(NaiveDateTime::MIN)
}

// ==========================================
// 运行请求与报告
// ==========================================

/// 一次分配运行的请求
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub channel_ids: Vec<ChannelId>,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    /// 只规划不创建草稿
    pub dry_run: bool,
    /// 素材库整体筛选（在规则/渠道筛选之前）
    pub library_filter: Option<FilterExpression>,
    /// 等待人工拖拽确认的时段
    pub pending_overrides: Vec<SlotKey>,
}

/// 已创建草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDraft {
    pub draft_id: DraftId,
    pub slot: Slot,
    pub media_id: MediaId,
}

/// 草稿创建失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftFailure {
    pub slot: Slot,
    pub media_id: MediaId,
    pub message: String,
}

/// 运行报告
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub result: AssignmentResult,
    pub warnings: Vec<ScheduleWarning>,
    pub drafts: Vec<CreatedDraft>,
    pub failures: Vec<DraftFailure>,
    /// 运行前已有草稿、本次跳过的时段
    pub already_drafted: Vec<FilledSlot>,
    pub dry_run: bool,
}

impl RunReport {
    /// 创建成功的草稿数（dry run 时等于填充数）
    pub fn created(&self) -> usize {
        if self.dry_run {
            self.result.filled_count()
        } else {
            self.drafts.len()
        }
    }
}

// ==========================================
// PipelineOrchestrator - 流水线编排器
// ==========================================
pub struct PipelineOrchestrator<C>
where
    C: EngineConfigReader,
{
    config: Arc<C>,
    sources: PipelineSources,
    engine: AssignmentEngine,
}

impl<C> PipelineOrchestrator<C>
where
    C: EngineConfigReader,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - config: 配置读取器
    /// - sources: 外部协作方集合
    pub fn new(config: Arc<C>, sources: PipelineSources) -> Self {
        Self {
            config,
            sources,
            engine: AssignmentEngine::new(),
        }
    }

    /// 执行一次分配运行
    ///
    /// # 流程
    /// 1. 加载渠道、规则、历史、素材库快照
    /// 2. 纯规划（展开 + 准入 + 分配）
    /// 3. 非 dry run 时并发创建草稿，单个失败不影响其他时段
    #[instrument(skip(self, request), fields(
        channels_count = request.channel_ids.len(),
        from = %request.from,
        to = %request.to,
        dry_run = request.dry_run
    ))]
    pub async fn run_assignment(&self, request: RunRequest) -> EngineResult<RunReport> {
        if request.from > request.to {
            return Err(EngineError::InvalidRange {
                from: request.from,
                to: request.to,
            });
        }
        if request.channel_ids.is_empty() {
            return Err(EngineError::MissingArgument("channel_ids".to_string()));
        }

        info!("开始执行分配流程");

        // ==========================================
        // 步骤1: 加载快照
        // ==========================================
        debug!("步骤1: 加载渠道、规则、历史与素材库");

        let default_time = self
            .config
            .get_default_post_time()
            .await
            .map_err(|e| EngineError::from_source("config", e))?;
        let lookback_hours = self
            .config
            .get_history_lookback_hours()
            .await
            .map_err(|e| EngineError::from_source("config", e))?;

        let channels = self
            .sources
            .schedules
            .load_channels(&request.channel_ids)
            .await
            .map_err(|e| EngineError::from_source("channels", e))?;
        let loaded_ids: Vec<ChannelId> = channels.iter().map(|c| c.id.clone()).collect();

        let schedules = self
            .sources
            .schedules
            .load_schedules(&loaded_ids)
            .await
            .map_err(|e| EngineError::from_source("schedules", e))?;

        let longest_cooldown = channels
            .iter()
            .map(|c| c.repost_cooldown_hours)
            .max()
            .unwrap_or(0);
        let since = history_since(request.from, lookback_hours.max(longest_cooldown));

        let history = self
            .sources
            .history
            .load_history(&loaded_ids, since)
            .await
            .map_err(|e| EngineError::from_source("history", e))?;

        let mut library = self
            .sources
            .library
            .load_library(request.library_filter.as_ref())
            .await
            .map_err(|e| EngineError::from_source("library", e))?;

        if let Some(filter) = request.library_filter.as_ref() {
            let index = PostingHistoryIndex::build(&history);
            library.retain(|media| FilterEvaluator::matches_with(media, filter, &index));
        }

        let existing_drafts = self
            .sources
            .drafts
            .existing_drafts(&loaded_ids, request.from)
            .await
            .map_err(|e| EngineError::from_source("drafts", e))?;

        info!(
            channels_count = channels.len(),
            schedules_count = schedules.len(),
            history_count = history.len(),
            library_count = library.len(),
            existing_drafts = existing_drafts.len(),
            "快照加载完成"
        );

        // ==========================================
        // 步骤2: 纯规划
        // ==========================================
        debug!("步骤2: 执行规划");

        let pending: HashSet<SlotKey> = request.pending_overrides.iter().cloned().collect();
        let planned = plan_assignment(PlanningInput {
            channels: &channels,
            schedules: &schedules,
            library: &library,
            history: &history,
            from: request.from,
            to: request.to,
            default_time,
            pending_overrides: &pending,
            existing_drafts: &existing_drafts,
        });

        info!(
            slots_generated = planned.slots_generated,
            already_drafted = planned.already_drafted.len(),
            filled = planned.result.filled_count(),
            unfilled = planned.result.unfilled.len(),
            warnings = planned.warnings.len(),
            "规划完成"
        );

        let mut report = RunReport {
            result: planned.result,
            warnings: planned.warnings,
            already_drafted: planned.already_drafted,
            dry_run: request.dry_run,
            ..RunReport::default()
        };

        if request.dry_run {
            info!("dry run，跳过草稿创建");
            return Ok(report);
        }

        // ==========================================
        // 步骤3: 并发创建草稿
        // ==========================================
        let concurrency = self
            .config
            .get_draft_concurrency()
            .await
            .map_err(|e| EngineError::from_source("config", e))?;
        debug!(concurrency, "步骤3: 创建草稿");

        let (drafts, failures) = self.create_drafts(&report.result.filled, concurrency).await;
        report.drafts = drafts;
        report.failures = failures;

        info!(
            created = report.drafts.len(),
            failed = report.failures.len(),
            "分配流程完成"
        );

        Ok(report)
    }

    /// 人工指定素材并创建草稿
    ///
    /// 不做筛选、冷却、重复检查
    #[instrument(skip(self, slot), fields(
        schedule_id = %slot.schedule_id,
        channel_id = %slot.channel_id,
        timestamp = %slot.timestamp
    ))]
    pub async fn manual_assign(&self, slot: Slot, media_id: &str) -> EngineResult<CreatedDraft> {
        let media_id = media_id.trim();
        if media_id.is_empty() {
            return Err(EngineError::MissingArgument("media_id".to_string()));
        }

        let filled = self.engine.manual_override(slot, media_id);
        let draft_id = self
            .sources
            .drafts
            .create_draft(DraftRequest {
                slot: filled.slot.clone(),
                media_id: filled.media_id.clone(),
                source: filled.source,
            })
            .await?;

        info!(draft_id = %draft_id, media_id = %filled.media_id, "人工指定草稿已创建");

        Ok(CreatedDraft {
            draft_id,
            slot: filled.slot,
            media_id: filled.media_id,
        })
    }

    async fn create_drafts(
        &self,
        filled: &[FilledSlot],
        concurrency: usize,
    ) -> (Vec<CreatedDraft>, Vec<DraftFailure>) {
        let sink = &self.sources.drafts;

        let outcomes: Vec<Result<CreatedDraft, DraftFailure>> = stream::iter(filled.iter().cloned())
            .map(|f| async move {
                let request = DraftRequest {
                    slot: f.slot.clone(),
                    media_id: f.media_id.clone(),
                    source: f.source,
                };
                match sink.create_draft(request).await {
                    Ok(draft_id) => Ok(CreatedDraft {
                        draft_id,
                        slot: f.slot,
                        media_id: f.media_id,
                    }),
                    Err(e) => {
                        warn!(
                            schedule_id = %f.slot.schedule_id,
                            channel_id = %f.slot.channel_id,
                            media_id = %f.media_id,
                            error = %e,
                            "草稿创建失败"
                        );
                        Err(DraftFailure {
                            slot: f.slot,
                            media_id: f.media_id,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut drafts = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(d) => drafts.push(d),
                Err(f) => failures.push(f),
            }
        }
        drafts.sort_by(|a, b| a.slot.chronological_cmp(&b.slot));
        failures.sort_by(|a, b| a.slot.chronological_cmp(&b.slot));
        (drafts, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticEngineConfig;
    use crate::domain::filter::FilterItem;
    use crate::domain::media::{TagAssignment, TagValue};
    use crate::domain::types::{AssignmentSource, MediaKind, PlatformType};
    use crate::engine::sources::{
        DraftError, DraftSink, HistoryStore, LibraryProvider, ScheduleStore, SourceResult,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    // ==========================================
    // 测试桩
    // ==========================================

    #[derive(Default)]
    struct MemoryStore {
        channels: Vec<Channel>,
        schedules: Vec<ChannelSchedule>,
        history: Vec<PostingHistoryEntry>,
        library: Vec<MediaItem>,
        drafts: Mutex<Vec<DraftRequest>>,
        existing: Vec<FilledSlot>,
        reject_media: Option<MediaId>,
    }

    #[async_trait]
    impl LibraryProvider for MemoryStore {
        async fn load_library(&self, _prefilter: Option<&FilterExpression>) -> SourceResult<Vec<MediaItem>> {
            Ok(self.library.clone())
        }
    }

    #[async_trait]
    impl ScheduleStore for MemoryStore {
        async fn load_channels(&self, ids: &[ChannelId]) -> SourceResult<Vec<Channel>> {
            Ok(self.channels.iter().filter(|c| ids.contains(&c.id)).cloned().collect())
        }

        async fn load_schedules(&self, channel_ids: &[ChannelId]) -> SourceResult<Vec<ChannelSchedule>> {
            Ok(self
                .schedules
                .iter()
                .filter(|s| channel_ids.contains(&s.channel_id))
                .cloned()
                .collect())
        }

        async fn list_channel_ids(&self) -> SourceResult<Vec<ChannelId>> {
            Ok(self.channels.iter().map(|c| c.id.clone()).collect())
        }
    }

    #[async_trait]
    impl HistoryStore for MemoryStore {
        async fn load_history(
            &self,
            _channel_ids: &[ChannelId],
            since: NaiveDateTime,
        ) -> SourceResult<Vec<PostingHistoryEntry>> {
            Ok(self.history.iter().filter(|h| h.posted_at >= since).cloned().collect())
        }
    }

    #[async_trait]
    impl DraftSink for MemoryStore {
        async fn create_draft(&self, request: DraftRequest) -> Result<DraftId, DraftError> {
            if self.reject_media.as_ref() == Some(&request.media_id) {
                return Err(DraftError::Rejected(format!("media {} blocked", request.media_id)));
            }
            let mut drafts = self.drafts.lock().unwrap();
            drafts.push(request);
            Ok(format!("D{}", drafts.len()))
        }

        async fn existing_drafts(
            &self,
            channel_ids: &[ChannelId],
            from: NaiveDateTime,
        ) -> SourceResult<Vec<FilledSlot>> {
            Ok(self
                .existing
                .iter()
                .filter(|d| channel_ids.contains(&d.slot.channel_id))
                .filter(|d| d.slot.timestamp >= from)
                .cloned()
                .collect())
        }
    }

    fn orchestrator(store: Arc<MemoryStore>) -> PipelineOrchestrator<StaticEngineConfig> {
        let sources = PipelineSources::new(store.clone(), store.clone(), store.clone(), store);
        PipelineOrchestrator::new(Arc::new(StaticEngineConfig::default()), sources)
    }

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn image(id: &str, tags: &[&str]) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            kind: MediaKind::Image,
            tags: tags
                .iter()
                .map(|t| TagAssignment {
                    tag_id: t.to_string(),
                    dimension: "tier".to_string(),
                    value: TagValue::Categorical(t.to_string()),
                })
                .collect(),
            name: id.to_string(),
            path: format!("/library/{}.jpg", id),
            caption: None,
            created_at: day(1),
            modified_at: day(1),
        }
    }

    fn channel(id: &str, cooldown: i64) -> Channel {
        Channel {
            id: id.to_string(),
            name: id.to_string(),
            platform: PlatformType::Bluesky,
            eligible_media_filter: None,
            repost_cooldown_hours: cooldown,
        }
    }

    fn schedule(id: &str, channel_id: &str, cadence: &str, posts: i32) -> ChannelSchedule {
        ChannelSchedule {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            cadence: cadence.to_string(),
            posts_per_timeframe: posts,
            preferred_days: vec![],
            preferred_times: vec![],
            media_filters: None,
        }
    }

    fn request(from: NaiveDateTime, to: NaiveDateTime, dry_run: bool) -> RunRequest {
        RunRequest {
            channel_ids: vec!["C1".to_string()],
            from,
            to,
            dry_run,
            ..RunRequest::default()
        }
    }

    // ==========================================
    // 测试 1: 场景 A（每日 3 天，5 张图）
    // ==========================================

    #[tokio::test]
    async fn test_daily_three_days_fills_three_slots() {
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 0)],
            schedules: vec![schedule("S1", "C1", "daily", 1)],
            library: (1..=5).map(|i| image(&format!("M{}", i), &[])).collect(),
            ..MemoryStore::default()
        });
        let orch = orchestrator(store.clone());

        let report = orch.run_assignment(request(day(1), day(4), false)).await.unwrap();

        assert_eq!(report.result.filled_count(), 3);
        assert!(report.result.unfilled.is_empty());
        assert_eq!(report.created(), 3);
        assert!(report.failures.is_empty());
        let used: HashSet<&MediaId> = report.result.filled.iter().map(|f| &f.media_id).collect();
        assert_eq!(used.len(), 3);
        assert_eq!(store.drafts.lock().unwrap().len(), 3);
        // 默认时刻 12:00
        assert_eq!(report.result.filled[0].slot.timestamp, day(1) + TimeDelta::hours(12));
    }

    // ==========================================
    // 测试 2: dry run 幂等
    // ==========================================

    #[tokio::test]
    async fn test_dry_run_is_idempotent_and_creates_nothing() {
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 24)],
            schedules: vec![schedule("S1", "C1", "daily", 1), schedule("S2", "C1", "weekly", 3)],
            library: (1..=4).map(|i| image(&format!("M{}", i), &[])).collect(),
            ..MemoryStore::default()
        });
        let orch = orchestrator(store.clone());

        let first = orch.run_assignment(request(day(1), day(8), true)).await.unwrap();
        let second = orch.run_assignment(request(day(1), day(8), true)).await.unwrap();

        assert_eq!(first.result, second.result);
        assert_eq!(first.created(), first.result.filled_count());
        assert!(store.drafts.lock().unwrap().is_empty());
    }

    // ==========================================
    // 测试 3: 单个草稿失败不影响其他时段
    // ==========================================

    #[tokio::test]
    async fn test_draft_failure_is_recorded_per_slot() {
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 0)],
            schedules: vec![schedule("S1", "C1", "daily", 1)],
            library: vec![image("M1", &[]), image("M2", &[]), image("M3", &[])],
            reject_media: Some("M2".to_string()),
            ..MemoryStore::default()
        });
        let orch = orchestrator(store);

        let report = orch.run_assignment(request(day(1), day(4), false)).await.unwrap();

        assert_eq!(report.result.filled_count(), 3);
        assert_eq!(report.drafts.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].media_id, "M2");
        assert!(report.failures[0].message.contains("blocked"));
    }

    // ==========================================
    // 测试 4: 调用契约
    // ==========================================

    #[tokio::test]
    async fn test_invalid_range_and_empty_channels_fail_fast() {
        let orch = orchestrator(Arc::new(MemoryStore::default()));

        let reversed = orch.run_assignment(request(day(5), day(1), true)).await;
        assert!(matches!(reversed, Err(EngineError::InvalidRange { .. })));

        let mut empty = request(day(1), day(2), true);
        empty.channel_ids.clear();
        let missing = orch.run_assignment(empty).await;
        assert!(matches!(missing, Err(EngineError::MissingArgument(_))));
    }

    // ==========================================
    // 测试 5: 场景 D（人工指定绕过筛选）
    // ==========================================

    #[tokio::test]
    async fn test_manual_assign_bypasses_filters() {
        let mut filtered = schedule("S1", "C1", "daily", 1);
        filtered.media_filters = Some(FilterExpression::single(FilterItem::Tag { id: "vip".into() }));
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 48)],
            schedules: vec![filtered],
            library: vec![image("M2", &[])],
            ..MemoryStore::default()
        });
        let orch = orchestrator(store.clone());
        let slot = Slot::new("S1", "C1", day(2) + TimeDelta::hours(12));

        let created = orch.manual_assign(slot.clone(), "M2").await.unwrap();

        assert_eq!(created.slot, slot);
        assert_eq!(created.media_id, "M2");
        let drafts = store.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].source, AssignmentSource::Manual);
    }

    #[tokio::test]
    async fn test_manual_assign_propagates_draft_error() {
        let store = Arc::new(MemoryStore {
            reject_media: Some("M9".to_string()),
            ..MemoryStore::default()
        });
        let orch = orchestrator(store);

        let result = orch.manual_assign(Slot::new("S1", "C1", day(1)), "M9").await;
        assert!(matches!(result, Err(EngineError::Draft(DraftError::Rejected(_)))));

        let blank = orch.manual_assign(Slot::new("S1", "C1", day(1)), "  ").await;
        assert!(matches!(blank, Err(EngineError::MissingArgument(_))));
    }

    // ==========================================
    // 测试 6: 纯规划
    // ==========================================

    #[test]
    fn test_plan_reports_warnings_and_empty_schedules() {
        let channels = vec![channel("C1", 0), channel("C2", 0)];
        let schedules = vec![
            schedule("S-bad", "C1", "hourly", 1),
            schedule("S-zero", "C1", "daily", 0),
            schedule("S-ok", "C2", "daily", 1),
        ];
        let library = vec![image("M1", &[])];
        let pending = HashSet::new();

        let outcome = plan_assignment(PlanningInput {
            channels: &channels,
            schedules: &schedules,
            library: &library,
            history: &[],
            from: day(1),
            to: day(2),
            default_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            pending_overrides: &pending,
            existing_drafts: &[],
        });

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].schedule_id, "S-bad");
        assert_eq!(outcome.slots_generated, 1);
        assert_eq!(outcome.result.filled_count(), 1);
        assert_eq!(outcome.result.unfilled_with(UnfilledReason::NoSlotsGenerated), 1);
        assert_eq!(outcome.result.unfilled[0].schedule_id, "S-zero");
    }

    #[test]
    fn test_cross_channel_contention_resolved_chronologically() {
        // 场景 B 的跨渠道版本：唯一 vip 素材被最早的时段拿走
        let channels = vec![channel("C1", 0), channel("C2", 0)];
        let mut s1 = schedule("S1", "C1", "daily", 1);
        s1.preferred_times = vec!["18:00".into()];
        let mut s2 = schedule("S2", "C2", "daily", 1);
        s2.preferred_times = vec!["09:00".into()];
        let vip = Some(FilterExpression::single(FilterItem::Tag { id: "vip".into() }));
        s1.media_filters = vip.clone();
        s2.media_filters = vip;
        let schedules = vec![s1, s2];
        let library = vec![image("VIP", &["vip"]), image("M1", &[])];
        let pending = HashSet::new();

        let outcome = plan_assignment(PlanningInput {
            channels: &channels,
            schedules: &schedules,
            library: &library,
            history: &[],
            from: day(1),
            to: day(2),
            default_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            pending_overrides: &pending,
            existing_drafts: &[],
        });

        assert_eq!(outcome.result.filled_count(), 1);
        assert_eq!(outcome.result.filled[0].slot.channel_id, "C2");
        assert_eq!(outcome.result.unfilled[0].channel_id, "C1");
        assert_eq!(
            outcome.result.unfilled[0].detail.as_deref(),
            Some("FILTER_REJECTED=1, COOLDOWN=0, ALREADY_ASSIGNED=1")
        );
    }
    // ==========================================
    // 测试 7: 超大时长配置不会溢出
    // ==========================================

    #[test]
    fn test_history_since_saturates() {
        assert_eq!(history_since(day(2), 24), day(1));
        assert_eq!(history_since(day(2), -5), day(2));
        assert_eq!(history_since(day(2), i64::MAX), NaiveDateTime::MIN);
        assert_eq!(history_since(day(2), 10_000_000_000), NaiveDateTime::MIN);
    }

    #[test]
    fn test_plan_with_unbounded_cooldown_keeps_posted_media_out() {
        let channels = vec![channel("C1", i64::MAX)];
        let schedules = vec![schedule("S1", "C1", "daily", 1)];
        let library = vec![image("M1", &[]), image("M2", &[])];
        let history = vec![PostingHistoryEntry {
            media_id: "M1".to_string(),
            channel_id: "C1".to_string(),
            posted_at: day(1),
        }];
        let pending = HashSet::new();

        let outcome = plan_assignment(PlanningInput {
            channels: &channels,
            schedules: &schedules,
            library: &library,
            history: &history,
            from: day(2),
            to: day(4),
            default_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            pending_overrides: &pending,
            existing_drafts: &[],
        });

        assert_eq!(outcome.result.filled_count(), 1);
        assert_eq!(outcome.result.filled[0].media_id, "M2");
        assert_eq!(
            outcome.result.unfilled[0].detail.as_deref(),
            Some("FILTER_REJECTED=0, COOLDOWN=1, ALREADY_ASSIGNED=1")
        );
    }

    #[tokio::test]
    async fn test_run_with_huge_cooldown_does_not_panic() {
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 10_000_000_000)],
            schedules: vec![schedule("S1", "C1", "daily", 1)],
            library: vec![image("M1", &[])],
            ..MemoryStore::default()
        });
        let orch = orchestrator(store);

        let report = orch.run_assignment(request(day(1), day(3), true)).await.unwrap();

        // 无历史时冷却不生效；素材单次运行只用一次
        assert_eq!(report.result.filled_count(), 1);
        assert_eq!(report.result.unfilled_with(UnfilledReason::NoEligibleMedia), 1);
    }

    // ==========================================
    // 测试 8: 已有草稿的时段
    // ==========================================

    #[test]
    fn test_existing_drafts_skip_slots_and_reserve_media() {
        let channels = vec![channel("C1", 0)];
        let schedules = vec![schedule("S1", "C1", "daily", 1)];
        let library = vec![image("M1", &[]), image("M2", &[]), image("M3", &[])];
        let pending = HashSet::new();
        let existing = vec![
            FilledSlot {
                slot: Slot::new("S1", "C1", day(1) + TimeDelta::hours(12)),
                media_id: "M1".to_string(),
                source: AssignmentSource::Manual,
            },
            // 区间之后的草稿同样占用素材
            FilledSlot {
                slot: Slot::new("S1", "C1", day(5) + TimeDelta::hours(12)),
                media_id: "M2".to_string(),
                source: AssignmentSource::Greedy,
            },
        ];

        let outcome = plan_assignment(PlanningInput {
            channels: &channels,
            schedules: &schedules,
            library: &library,
            history: &[],
            from: day(1),
            to: day(3),
            default_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            pending_overrides: &pending,
            existing_drafts: &existing,
        });

        assert_eq!(outcome.slots_generated, 2);
        assert_eq!(outcome.already_drafted, existing[..1].to_vec());
        assert_eq!(outcome.result.filled_count(), 1);
        assert_eq!(outcome.result.filled[0].slot.timestamp, day(2) + TimeDelta::hours(12));
        assert_eq!(outcome.result.filled[0].media_id, "M3");
        assert!(outcome.result.unfilled.is_empty());
    }
    #[tokio::test]
    async fn test_rerun_skips_slots_with_existing_drafts() {
        let drafted = FilledSlot {
            slot: Slot::new("S1", "C1", day(1) + TimeDelta::hours(12)),
            media_id: "M1".to_string(),
            source: AssignmentSource::Greedy,
        };
        let store = Arc::new(MemoryStore {
            channels: vec![channel("C1", 0)],
            schedules: vec![schedule("S1", "C1", "daily", 1)],
            library: vec![image("M1", &[]), image("M2", &[])],
            existing: vec![drafted.clone()],
            ..MemoryStore::default()
        });
        let orch = orchestrator(store.clone());

        let report = orch.run_assignment(request(day(1), day(3), false)).await.unwrap();

        assert_eq!(report.already_drafted, vec![drafted]);
        assert_eq!(report.result.filled_count(), 1);
        assert_eq!(report.result.filled[0].media_id, "M2");
        assert!(report.failures.is_empty());
        assert_eq!(store.drafts.lock().unwrap().len(), 1);
    }
}
