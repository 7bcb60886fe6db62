// ==========================================
// 内容排期系统 - 周期展开引擎
// ==========================================
// 职责: 排期规则 + 时间区间 → 有序发帖时刻序列
// 输入: ChannelSchedule（用户原始配置）
// 输出: 惰性、有限、单次遍历的时刻迭代器
// 红线: 纯计算，不查询素材与历史
// ==========================================

use crate::domain::channel::ChannelSchedule;
use crate::domain::types::{CadenceKind, ChannelId, ScheduleId};
use crate::engine::error::ScheduleConfigError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::VecDeque;

/// 每周最多发帖日数
const DAYS_PER_WEEK: i64 = 7;

// ==========================================
// RecurrenceRule - 已校验的周期规则
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub schedule_id: ScheduleId,
    pub channel_id: ChannelId,
    pub cadence: CadenceKind,
    pub posts_per_timeframe: i32,
    /// 偏好星期（仅 weekly 使用，周一起排序去重）
    pub weekdays: Vec<Weekday>,
    /// 发帖时刻（升序去重；monthly 仅保留第一个偏好时刻）
    pub times: Vec<NaiveTime>,
}

impl RecurrenceRule {
    /// 校验并编译排期规则
    ///
    /// # 规则
    /// 1. cadence 必须为 daily / weekly / monthly
    /// 2. posts_per_timeframe 不能为负（为 0 时合法，但不生成时段）
    /// 3. 偏好时刻必须为 HH:MM；未配置时使用默认时刻
    /// 4. weekly 的偏好星期必须可解析
    ///
    /// # 返回
    /// - Ok(RecurrenceRule)
    /// - Err(ScheduleConfigError): 配置错误，调用方跳过该规则并记录告警
    pub fn compile(
        schedule: &ChannelSchedule,
        default_time: NaiveTime,
    ) -> Result<Self, ScheduleConfigError> {
        let cadence: CadenceKind = schedule
            .cadence
            .parse()
            .map_err(|_| ScheduleConfigError::UnknownCadence(schedule.cadence.clone()))?;

        if schedule.posts_per_timeframe < 0 {
            return Err(ScheduleConfigError::NegativePostsPerTimeframe(
                schedule.posts_per_timeframe,
            ));
        }

        let mut times = schedule
            .preferred_times
            .iter()
            .map(|raw| parse_time_of_day(raw))
            .collect::<Result<Vec<_>, _>>()?;

        if times.is_empty() {
            times.push(default_time);
        }

        if cadence == CadenceKind::Monthly {
            // 月度规则只使用第一个偏好时刻（按配置顺序）
            times.truncate(1);
        } else {
            times.sort();
            times.dedup();
        }

        let mut weekdays = Vec::new();
        if cadence == CadenceKind::Weekly {
            for raw in &schedule.preferred_days {
                let day: Weekday = raw
                    .trim()
                    .parse()
                    .map_err(|_| ScheduleConfigError::InvalidWeekday(raw.clone()))?;
                weekdays.push(day);
            }
            weekdays.sort_by_key(|d| d.num_days_from_monday());
            weekdays.dedup();
        }

        Ok(Self {
            schedule_id: schedule.id.clone(),
            channel_id: schedule.channel_id.clone(),
            cadence,
            posts_per_timeframe: schedule.posts_per_timeframe,
            weekdays,
            times,
        })
    }
}

/// 解析 HH:MM（兼容 HH:MM:SS）
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ScheduleConfigError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ScheduleConfigError::InvalidTime(raw.to_string()))
}

// ==========================================
// RecurrenceExpander - 周期展开引擎
// ==========================================
pub struct RecurrenceExpander;

impl RecurrenceExpander {
    /// 展开规则为 [from, to) 内的发帖时刻
    ///
    /// # 规则
    /// - daily: 每天每个偏好时刻
    /// - weekly: 每个偏好星期的每个偏好时刻；无偏好星期时从区间起点
    ///   按 7 天均分 posts_per_timeframe 个发帖日
    /// - monthly: 每自然月 posts_per_timeframe 个时段，按当月天数均分
    /// - from > to 或 posts_per_timeframe <= 0 → 空序列
    pub fn expand(rule: &RecurrenceRule, from: NaiveDateTime, to: NaiveDateTime) -> SlotTimes<'_> {
        SlotTimes::new(rule, from, to)
    }

    /// 编译并展开（便捷入口）
    pub fn expand_schedule(
        schedule: &ChannelSchedule,
        default_time: NaiveTime,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, ScheduleConfigError> {
        let rule = RecurrenceRule::compile(schedule, default_time)?;
        Ok(Self::expand(&rule, from, to).collect())
    }
}

// ==========================================
// SlotTimes - 惰性时刻迭代器（逐日推进）
// ==========================================
pub struct SlotTimes<'a> {
    rule: &'a RecurrenceRule,
    from: NaiveDateTime,
    to: NaiveDateTime,
    anchor: NaiveDate,
    cursor: Option<NaiveDate>,
    last_day: NaiveDate,
    pending: VecDeque<NaiveDateTime>,
    spread_offsets: Vec<i64>,
    month_cache: Option<(i32, u32, Vec<u32>)>,
}

impl<'a> SlotTimes<'a> {
    fn new(rule: &'a RecurrenceRule, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        let exhausted = from >= to || rule.posts_per_timeframe <= 0;

        let spread_offsets = if rule.cadence == CadenceKind::Weekly && rule.weekdays.is_empty() {
            even_spread(rule.posts_per_timeframe, DAYS_PER_WEEK)
        } else {
            Vec::new()
        };

        Self {
            rule,
            from,
            to,
            anchor: from.date(),
            cursor: if exhausted { None } else { Some(from.date()) },
            last_day: to.date(),
            pending: VecDeque::new(),
            spread_offsets,
            month_cache: None,
        }
    }

    fn occurs_on(&mut self, day: NaiveDate) -> bool {
        match self.rule.cadence {
            CadenceKind::Daily => true,
            CadenceKind::Weekly => {
                if self.rule.weekdays.is_empty() {
                    let offset = (day - self.anchor).num_days().rem_euclid(DAYS_PER_WEEK);
                    self.spread_offsets.contains(&offset)
                } else {
                    self.rule.weekdays.contains(&day.weekday())
                }
            }
            CadenceKind::Monthly => self.month_days(day).contains(&day.day()),
        }
    }

    /// 当月发帖日（按年月缓存）
    fn month_days(&mut self, day: NaiveDate) -> &[u32] {
        let key = (day.year(), day.month());
        let stale = !matches!(&self.month_cache, Some((y, m, _)) if (*y, *m) == key);
        if stale {
            let total = days_in_month(day.year(), day.month());
            let days = even_spread(self.rule.posts_per_timeframe, total as i64)
                .into_iter()
                .map(|offset| offset as u32 + 1)
                .collect();
            self.month_cache = Some((key.0, key.1, days));
        }
        match &self.month_cache {
            Some((_, _, days)) => days,
            None => &[],
        }
    }
}

impl Iterator for SlotTimes<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<NaiveDateTime> {
        loop {
            if let Some(ts) = self.pending.pop_front() {
                return Some(ts);
            }

            let day = self.cursor?;
            self.cursor = if day < self.last_day { day.succ_opt() } else { None };

            if self.occurs_on(day) {
                for time in &self.rule.times {
                    let ts = day.and_time(*time);
                    if ts >= self.from && ts < self.to {
                        self.pending.push_back(ts);
                    }
                }
            }
        }
    }
}

/// 在 span 天内均分 n 个偏移（floor(i * span / n)），超过 span 时截断
fn even_spread(n: i32, span: i64) -> Vec<i64> {
    if n <= 0 || span <= 0 {
        return Vec::new();
    }
    let n = (n as i64).min(span);
    let mut offsets: Vec<i64> = (0..n).map(|i| i * span / n).collect();
    offsets.dedup();
    offsets
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(cadence: &str, posts: i32, days: &[&str], times: &[&str]) -> ChannelSchedule {
        ChannelSchedule {
            id: "S1".to_string(),
            channel_id: "C1".to_string(),
            cadence: cadence.to_string(),
            posts_per_timeframe: posts,
            preferred_days: days.iter().map(|d| d.to_string()).collect(),
            preferred_times: times.iter().map(|t| t.to_string()).collect(),
            media_filters: None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn expand(s: &ChannelSchedule, from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
        RecurrenceExpander::expand_schedule(s, noon(), from, to).unwrap()
    }

    // ==========================================
    // 测试 1: daily
    // ==========================================

    #[test]
    fn test_daily_without_times_uses_default() {
        let s = schedule("daily", 1, &[], &[]);
        let slots = expand(&s, at(2026, 3, 2, 0, 0), at(2026, 3, 5, 0, 0));

        assert_eq!(
            slots,
            vec![at(2026, 3, 2, 12, 0), at(2026, 3, 3, 12, 0), at(2026, 3, 4, 12, 0)]
        );
    }

    #[test]
    fn test_daily_multiple_times_are_ordered() {
        let s = schedule("daily", 1, &[], &["18:30", "09:00"]);
        let slots = expand(&s, at(2026, 3, 2, 0, 0), at(2026, 3, 4, 0, 0));

        assert_eq!(
            slots,
            vec![
                at(2026, 3, 2, 9, 0),
                at(2026, 3, 2, 18, 30),
                at(2026, 3, 3, 9, 0),
                at(2026, 3, 3, 18, 30),
            ]
        );
    }

    #[test]
    fn test_boundaries_inclusive_from_exclusive_to() {
        let s = schedule("daily", 1, &[], &["09:00", "12:00"]);
        // 起点 12:00 包含，当天 09:00 在区间外；终点 12:00 不包含
        let slots = expand(&s, at(2026, 3, 2, 12, 0), at(2026, 3, 3, 12, 0));

        assert_eq!(slots, vec![at(2026, 3, 2, 12, 0), at(2026, 3, 3, 9, 0)]);
    }

    // ==========================================
    // 测试 2: weekly
    // ==========================================

    #[test]
    fn test_weekly_preferred_days() {
        // 2026-03-02 是周一
        let s = schedule("weekly", 2, &["Mon", "wednesday"], &[]);
        let slots = expand(&s, at(2026, 3, 2, 0, 0), at(2026, 3, 16, 0, 0));

        assert_eq!(
            slots,
            vec![
                at(2026, 3, 2, 12, 0),
                at(2026, 3, 4, 12, 0),
                at(2026, 3, 9, 12, 0),
                at(2026, 3, 11, 12, 0),
            ]
        );
    }

    #[test]
    fn test_weekly_without_days_spreads_from_range_start() {
        // 2026-03-05 是周四，3 帖/周 → 偏移 0,2,4 → 周四、周六、周一
        let s = schedule("weekly", 3, &[], &["10:00"]);
        let slots = expand(&s, at(2026, 3, 5, 0, 0), at(2026, 3, 12, 0, 0));

        assert_eq!(
            slots,
            vec![at(2026, 3, 5, 10, 0), at(2026, 3, 7, 10, 0), at(2026, 3, 9, 10, 0)]
        );
    }

    #[test]
    fn test_weekly_spread_is_capped_at_seven_days() {
        let s = schedule("weekly", 10, &[], &["10:00"]);
        let slots = expand(&s, at(2026, 3, 2, 0, 0), at(2026, 3, 9, 0, 0));
        assert_eq!(slots.len(), 7);
    }

    // ==========================================
    // 测试 3: monthly
    // ==========================================

    #[test]
    fn test_monthly_spacing_and_first_time() {
        // 2026 年 2 月 28 天，2 帖 → 1 日、15 日；只用第一个偏好时刻
        let s = schedule("monthly", 2, &[], &["20:00", "08:00"]);
        let slots = expand(&s, at(2026, 2, 1, 0, 0), at(2026, 4, 1, 0, 0));

        assert_eq!(
            slots,
            vec![
                at(2026, 2, 1, 20, 0),
                at(2026, 2, 15, 20, 0),
                at(2026, 3, 1, 20, 0),
                at(2026, 3, 16, 20, 0),
            ]
        );
    }

    #[test]
    fn test_monthly_partial_range_filters_out_of_range_days() {
        let s = schedule("monthly", 2, &[], &[]);
        let slots = expand(&s, at(2026, 3, 10, 0, 0), at(2026, 3, 31, 0, 0));
        assert_eq!(slots, vec![at(2026, 3, 16, 12, 0)]);
    }

    // ==========================================
    // 测试 4: 边界与配置错误
    // ==========================================

    #[test]
    fn test_from_after_to_is_empty() {
        let s = schedule("daily", 1, &[], &[]);
        assert!(expand(&s, at(2026, 3, 5, 0, 0), at(2026, 3, 1, 0, 0)).is_empty());
    }

    #[test]
    fn test_non_positive_posts_is_empty() {
        for cadence in ["daily", "weekly", "monthly"] {
            let s = schedule(cadence, 0, &["Mon"], &["09:00"]);
            assert!(expand(&s, at(2026, 3, 1, 0, 0), at(2026, 4, 1, 0, 0)).is_empty());
        }
    }

    #[test]
    fn test_compile_rejects_bad_config() {
        let bad_cadence = schedule("hourly", 1, &[], &[]);
        assert_eq!(
            RecurrenceRule::compile(&bad_cadence, noon()),
            Err(ScheduleConfigError::UnknownCadence("hourly".to_string()))
        );

        let negative = schedule("daily", -1, &[], &[]);
        assert_eq!(
            RecurrenceRule::compile(&negative, noon()),
            Err(ScheduleConfigError::NegativePostsPerTimeframe(-1))
        );

        let bad_time = schedule("daily", 1, &[], &["25:99"]);
        assert_eq!(
            RecurrenceRule::compile(&bad_time, noon()),
            Err(ScheduleConfigError::InvalidTime("25:99".to_string()))
        );

        let bad_day = schedule("weekly", 1, &["Funday"], &[]);
        assert_eq!(
            RecurrenceRule::compile(&bad_day, noon()),
            Err(ScheduleConfigError::InvalidWeekday("Funday".to_string()))
        );
    }

    #[test]
    fn test_iterator_is_lazy() {
        let s = schedule("daily", 1, &[], &[]);
        let rule = RecurrenceRule::compile(&s, noon()).unwrap();
        let mut iter = RecurrenceExpander::expand(&rule, at(2026, 1, 1, 0, 0), at(2126, 1, 1, 0, 0));

        assert_eq!(iter.next(), Some(at(2026, 1, 1, 12, 0)));
        assert_eq!(iter.next(), Some(at(2026, 1, 2, 12, 0)));
    }
}
