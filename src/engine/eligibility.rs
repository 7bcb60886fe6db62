// ==========================================
// 内容排期系统 - 素材准入引擎
// ==========================================
// 职责: 规则筛选 ∧ 渠道筛选 + 重发冷却 + 本次运行已分配排除
// 输入: 时段 + 规则 + 渠道 + 素材库 + 历史索引 + 已分配集合
// 输出: 可用素材集合 + 各规则排除计数（用于未填充原因说明）
// 红线: 不写库，空集合不是错误
// ==========================================

use crate::domain::channel::{Channel, ChannelSchedule};
use crate::domain::media::MediaItem;
use crate::domain::slot::Slot;
use crate::domain::types::{ChannelId, MediaId, ScheduleId};
use crate::engine::eligibility_core::{EligibilityCore, PostingHistoryIndex};
use crate::engine::filter_core::FilterEvaluator;
use std::collections::{BTreeSet, HashMap, HashSet};

// ==========================================
// EligibilityOutcome - 准入结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityOutcome {
    /// 可用素材（集合语义，BTreeSet 保证遍历确定）
    pub eligible: BTreeSet<MediaId>,
    /// 被规则/渠道筛选排除的数量
    pub rejected_by_filter: usize,
    /// 处于重发冷却的数量
    pub in_cooldown: usize,
    /// 本次运行已被其他时段占用的数量
    pub already_assigned: usize,
}

impl EligibilityOutcome {
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }

    /// 排除明细（写入未填充记录）
    pub fn detail(&self) -> String {
        format!(
            "FILTER_REJECTED={}, COOLDOWN={}, ALREADY_ASSIGNED={}",
            self.rejected_by_filter, self.in_cooldown, self.already_assigned
        )
    }
}

// ==========================================
// EligibilityResolver - 素材准入引擎
// ==========================================
// 筛选结果与时段无关，按 (规则, 渠道) 缓存
pub struct EligibilityResolver<'a> {
    library: &'a [MediaItem],
    history: &'a PostingHistoryIndex,
    filter_cache: HashMap<(ScheduleId, ChannelId), Vec<usize>>,
}

impl<'a> EligibilityResolver<'a> {
    /// 创建新的 EligibilityResolver 实例
    ///
    /// # 参数
    /// - library: 本次运行的素材库快照
    /// - history: 发帖历史索引
    pub fn new(library: &'a [MediaItem], history: &'a PostingHistoryIndex) -> Self {
        Self {
            library,
            history,
            filter_cache: HashMap::new(),
        }
    }

    /// 计算时段的可用素材
    ///
    /// # 规则
    /// 1. schedule.media_filters 与 channel.eligible_media_filter 同时满足（缺省视为不限）
    /// 2. 排除本次运行已分配的素材（跨规则、跨渠道）
    /// 3. 排除该渠道冷却窗口内发过的素材（冷却按渠道计算）
    pub fn eligible_media(
        &mut self,
        slot: &Slot,
        schedule: &ChannelSchedule,
        channel: &Channel,
        already_assigned: &HashSet<MediaId>,
    ) -> EligibilityOutcome {
        let library = self.library;
        let history = self.history;

        let passing = self
            .filter_cache
            .entry((schedule.id.clone(), channel.id.clone()))
            .or_insert_with(|| Self::filter_pass(library, history, schedule, channel));

        let mut outcome = EligibilityOutcome {
            rejected_by_filter: library.len() - passing.len(),
            ..EligibilityOutcome::default()
        };

        for &idx in passing.iter() {
            let media = &library[idx];

            if already_assigned.contains(&media.id) {
                outcome.already_assigned += 1;
                continue;
            }

            let last_posted = history.last_posted(&slot.channel_id, &media.id);
            if EligibilityCore::in_cooldown(last_posted, slot.timestamp, channel.repost_cooldown_hours) {
                outcome.in_cooldown += 1;
                continue;
            }

            outcome.eligible.insert(media.id.clone());
        }

        outcome
    }

    /// 单次计算（不复用缓存）
    pub fn eligible_media_once(
        slot: &Slot,
        schedule: &ChannelSchedule,
        channel: &Channel,
        library: &[MediaItem],
        history: &PostingHistoryIndex,
        already_assigned: &HashSet<MediaId>,
    ) -> EligibilityOutcome {
        EligibilityResolver::new(library, history).eligible_media(
            slot,
            schedule,
            channel,
            already_assigned,
        )
    }

    /// 规则筛选 ∧ 渠道筛选，返回素材库下标
    fn filter_pass(
        library: &[MediaItem],
        history: &PostingHistoryIndex,
        schedule: &ChannelSchedule,
        channel: &Channel,
    ) -> Vec<usize> {
        library
            .iter()
            .enumerate()
            .filter(|(_, media)| {
                FilterEvaluator::matches_optional(media, schedule.media_filters.as_ref(), history)
                    && FilterEvaluator::matches_optional(
                        media,
                        channel.eligible_media_filter.as_ref(),
                        history,
                    )
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}
