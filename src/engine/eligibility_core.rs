// ==========================================
// 内容排期系统 - Eligibility Core 纯函数库
// ==========================================
// 职责: 发帖历史索引、重发冷却判定、最久未用排序键
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::channel::PostingHistoryEntry;
use crate::domain::types::{ChannelId, MediaId};
use crate::engine::filter_core::PostingLookup;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashMap;

// ==========================================
// PostingHistoryIndex - 发帖历史索引
// ==========================================
// 渠道 → 素材 → 最近一次发帖时间
#[derive(Debug, Clone, Default)]
pub struct PostingHistoryIndex {
    last_post: HashMap<ChannelId, HashMap<MediaId, NaiveDateTime>>,
    entry_count: usize,
}

impl PostingHistoryIndex {
    /// 从历史记录构建索引（同一渠道同一素材只保留最近一次）
    pub fn build(entries: &[PostingHistoryEntry]) -> Self {
        let mut last_post: HashMap<ChannelId, HashMap<MediaId, NaiveDateTime>> = HashMap::new();

        for entry in entries {
            let per_channel = last_post.entry(entry.channel_id.clone()).or_default();
            per_channel
                .entry(entry.media_id.clone())
                .and_modify(|ts| {
                    if entry.posted_at > *ts {
                        *ts = entry.posted_at;
                    }
                })
                .or_insert(entry.posted_at);
        }

        Self {
            last_post,
            entry_count: entries.len(),
        }
    }

    /// 素材在该渠道最近一次发帖时间
    pub fn last_posted(&self, channel_id: &str, media_id: &str) -> Option<NaiveDateTime> {
        self.last_post
            .get(channel_id)
            .and_then(|per_channel| per_channel.get(media_id))
            .copied()
    }

    /// 原始历史条数
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}

impl PostingLookup for PostingHistoryIndex {
    fn has_posted(&self, media_id: &str, channel_id: &str) -> bool {
        self.last_posted(channel_id, media_id).is_some()
    }
}

// ==========================================
// EligibilityCore - 纯函数工具类
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    /// 判定是否处于重发冷却
    ///
    /// # 规则
    /// - cooldown_hours <= 0 → 不冷却
    /// - 无历史 → 不冷却
    /// - |slot - last_posted| < cooldown_hours → 冷却中（恰好相隔 H 小时可用）
    /// - cooldown_hours 超出可表示的时长 → 始终冷却
    pub fn in_cooldown(
        last_posted: Option<NaiveDateTime>,
        slot_timestamp: NaiveDateTime,
        cooldown_hours: i64,
    ) -> bool {
        if cooldown_hours <= 0 {
            return false;
        }
        match last_posted {
            Some(last) => {
                let gap = if slot_timestamp >= last {
                    slot_timestamp - last
                } else {
                    last - slot_timestamp
                };
                match TimeDelta::try_hours(cooldown_hours) {
                    Some(window) => gap < window,
                    None => true,
                }
            }
            None => false,
        }
    }

    /// 最久未用排序键
    ///
    /// # 规则
    /// - 无历史最优先（None < Some）
    /// - 其次最近发帖时间越早越优先
    /// - 最后按素材ID排序，保证确定性
    pub fn lru_key<'a>(
        last_posted: Option<NaiveDateTime>,
        media_id: &'a str,
    ) -> (Option<NaiveDateTime>, &'a str) {
        (last_posted, media_id)
    }
}
