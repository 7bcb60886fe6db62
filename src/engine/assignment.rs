// ==========================================
// 内容排期系统 - 素材分配引擎
// ==========================================
// 职责: 按时间顺序贪心分配素材到时段
// 输入: 时段列表 + 准入函数 + 发帖历史索引 + 待人工确认时段
// 输出: AssignmentResult（填充 + 未填充及原因）
// 红线: 单次运行内素材不重复；不回溯已做出的分配
// ==========================================

use crate::domain::slot::{AssignmentResult, FilledSlot, Slot, SlotKey, UnfilledSlot};
use crate::domain::types::{AssignmentSource, MediaId, UnfilledReason};
use crate::engine::eligibility::EligibilityOutcome;
use crate::engine::eligibility_core::{EligibilityCore, PostingHistoryIndex};
use std::collections::HashSet;
use tracing::{debug, instrument};

// ==========================================
// AssignmentEngine - 素材分配引擎
// ==========================================
pub struct AssignmentEngine {
    // 无状态引擎
}

impl AssignmentEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 贪心分配
    ///
    /// 规则：
    /// 1) 时段按时间排序（同一时刻按渠道、规则ID），早的先选
    /// 2) 待人工确认的时段跳过，记为 manual_override_pending
    /// 3) 无可用素材 → no_eligible_media（附排除明细）
    /// 4) 有可用素材 → 选该渠道最久未用的一个，加入已分配集合
    ///
    /// # 参数
    /// - `slots`: 本次运行的全部时段（顺序无要求）
    /// - `history`: 发帖历史索引（用于最久未用排序）
    /// - `pending_overrides`: 等待人工拖拽确认的时段
    /// - `eligible_for`: 准入函数（时段, 已分配集合）→ 准入结果
    #[instrument(skip(self, slots, history, pending_overrides, eligible_for), fields(
        slots_count = slots.len(),
        pending_count = pending_overrides.len()
    ))]
    pub fn assign<F>(
        &self,
        slots: Vec<Slot>,
        history: &PostingHistoryIndex,
        pending_overrides: &HashSet<SlotKey>,
        eligible_for: F,
    ) -> AssignmentResult
    where
        F: FnMut(&Slot, &HashSet<MediaId>) -> EligibilityOutcome,
    {
        self.assign_seeded(slots, history, pending_overrides, HashSet::new(), eligible_for)
    }

    /// 贪心分配（带预占素材）
    ///
    /// `seeded` 中的素材从一开始就视为已分配（如区间内已有草稿的素材）
    pub fn assign_seeded<F>(
        &self,
        mut slots: Vec<Slot>,
        history: &PostingHistoryIndex,
        pending_overrides: &HashSet<SlotKey>,
        seeded: HashSet<MediaId>,
        mut eligible_for: F,
    ) -> AssignmentResult
    where
        F: FnMut(&Slot, &HashSet<MediaId>) -> EligibilityOutcome,
    {
        slots.sort_by(Slot::chronological_cmp);

        let mut result = AssignmentResult::default();
        let mut already_assigned = seeded;

        for slot in slots {
            if pending_overrides.iter().any(|key| slot.is_keyed(key)) {
                result.unfilled.push(UnfilledSlot::from_slot(
                    &slot,
                    UnfilledReason::ManualOverridePending,
                    None,
                ));
                continue;
            }

            let outcome = eligible_for(&slot, &already_assigned);

            let chosen = outcome
                .eligible
                .iter()
                .min_by(|a, b| {
                    let ka = EligibilityCore::lru_key(history.last_posted(&slot.channel_id, a), a);
                    let kb = EligibilityCore::lru_key(history.last_posted(&slot.channel_id, b), b);
                    ka.cmp(&kb)
                })
                .cloned();

            match chosen {
                Some(media_id) => {
                    debug!(
                        schedule_id = %slot.schedule_id,
                        channel_id = %slot.channel_id,
                        timestamp = %slot.timestamp,
                        media_id = %media_id,
                        candidates = outcome.eligible.len(),
                        "时段已填充"
                    );
                    already_assigned.insert(media_id.clone());
                    result.filled.push(FilledSlot {
                        slot,
                        media_id,
                        source: AssignmentSource::Greedy,
                    });
                }
                None => {
                    debug!(
                        schedule_id = %slot.schedule_id,
                        channel_id = %slot.channel_id,
                        timestamp = %slot.timestamp,
                        detail = %outcome.detail(),
                        "时段无可用素材"
                    );
                    result.unfilled.push(UnfilledSlot::from_slot(
                        &slot,
                        UnfilledReason::NoEligibleMedia,
                        Some(outcome.detail()),
                    ));
                }
            }
        }

        result
    }

    /// 人工指定（拖拽）
    ///
    /// 不做筛选、冷却、重复检查，信任调用方
    pub fn manual_override(&self, slot: Slot, media_id: &str) -> FilledSlot {
        FilledSlot {
            slot,
            media_id: media_id.to_string(),
            source: AssignmentSource::Manual,
        }
    }
}

impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::new()
    }
}
