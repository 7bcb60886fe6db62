// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use content_pipeline::domain::channel::{Channel, ChannelSchedule, PostingHistoryEntry};
use content_pipeline::domain::filter::FilterExpression;
use content_pipeline::domain::media::{MediaItem, TagAssignment, TagValue};
use content_pipeline::domain::types::{MediaKind, PlatformType};

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

// ==========================================
// MediaItem 构建器
// ==========================================

pub struct MediaBuilder {
    id: String,
    kind: MediaKind,
    tags: Vec<TagAssignment>,
    caption: Option<String>,
}

impl MediaBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: MediaKind::Image,
            tags: Vec::new(),
            caption: None,
        }
    }

    pub fn video(mut self) -> Self {
        self.kind = MediaKind::Video;
        self
    }

    pub fn tag(mut self, tag_id: &str, dimension: &str, value: &str) -> Self {
        self.tags.push(TagAssignment {
            tag_id: tag_id.to_string(),
            dimension: dimension.to_string(),
            value: TagValue::Categorical(value.to_string()),
        });
        self
    }

    pub fn numeric(mut self, tag_id: &str, dimension: &str, value: f64) -> Self {
        self.tags.push(TagAssignment {
            tag_id: tag_id.to_string(),
            dimension: dimension.to_string(),
            value: TagValue::Numeric(value),
        });
        self
    }

    pub fn caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn build(self) -> MediaItem {
        MediaItem {
            name: format!("{}.jpg", self.id),
            path: format!("/library/{}.jpg", self.id),
            id: self.id,
            kind: self.kind,
            tags: self.tags,
            caption: self.caption,
            created_at: epoch(),
            modified_at: epoch(),
        }
    }
}

// ==========================================
// Channel 构建器
// ==========================================

pub struct ChannelBuilder {
    id: String,
    cooldown_hours: i64,
    filter: Option<FilterExpression>,
}

impl ChannelBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            cooldown_hours: 0,
            filter: None,
        }
    }

    pub fn cooldown(mut self, hours: i64) -> Self {
        self.cooldown_hours = hours;
        self
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> Channel {
        Channel {
            name: format!("r/{}", self.id.to_lowercase()),
            id: self.id,
            platform: PlatformType::Reddit,
            eligible_media_filter: self.filter,
            repost_cooldown_hours: self.cooldown_hours,
        }
    }
}

// ==========================================
// ChannelSchedule 构建器
// ==========================================

pub struct ScheduleBuilder {
    id: String,
    channel_id: String,
    cadence: String,
    posts_per_timeframe: i32,
    preferred_days: Vec<String>,
    preferred_times: Vec<String>,
    media_filters: Option<FilterExpression>,
}

impl ScheduleBuilder {
    pub fn daily(id: &str, channel_id: &str) -> Self {
        Self {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            cadence: "daily".to_string(),
            posts_per_timeframe: 1,
            preferred_days: Vec::new(),
            preferred_times: Vec::new(),
            media_filters: None,
        }
    }

    pub fn cadence(mut self, cadence: &str) -> Self {
        self.cadence = cadence.to_string();
        self
    }

    pub fn posts(mut self, n: i32) -> Self {
        self.posts_per_timeframe = n;
        self
    }

    pub fn days(mut self, days: &[&str]) -> Self {
        self.preferred_days = days.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn times(mut self, times: &[&str]) -> Self {
        self.preferred_times = times.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.media_filters = Some(filter);
        self
    }

    pub fn build(self) -> ChannelSchedule {
        ChannelSchedule {
            id: self.id,
            channel_id: self.channel_id,
            cadence: self.cadence,
            posts_per_timeframe: self.posts_per_timeframe,
            preferred_days: self.preferred_days,
            preferred_times: self.preferred_times,
            media_filters: self.media_filters,
        }
    }
}

/// 发帖历史条目
pub fn posted(media_id: &str, channel_id: &str, posted_at: NaiveDateTime) -> PostingHistoryEntry {
    PostingHistoryEntry {
        media_id: media_id.to_string(),
        channel_id: channel_id.to_string(),
        posted_at,
    }
}
