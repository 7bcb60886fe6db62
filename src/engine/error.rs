// ==========================================
// 内容排期系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 可恢复情况（无可用素材、单条规则配置错误、草稿创建失败）
//       作为数据写入结果，不走错误通道
// ==========================================

use crate::engine::sources::DraftError;
use chrono::NaiveDateTime;
use thiserror::Error;

/// 排期规则配置错误（加载时检测，规则被跳过）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleConfigError {
    #[error("未知排期周期: {0}")]
    UnknownCadence(String),

    #[error("每周期发帖数不能为负: {0}")]
    NegativePostsPerTimeframe(i32),

    #[error("无法解析的时刻: {0} (期望 HH:MM)")]
    InvalidTime(String),

    #[error("无法解析的星期: {0}")]
    InvalidWeekday(String),
}

/// 引擎层错误
#[derive(Error, Debug)]
pub enum EngineError {
    /// 调用契约违反: 区间起点晚于终点
    #[error("无效时间区间: from={from} > to={to}")]
    InvalidRange {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },

    /// 调用契约违反: 必填参数为空
    #[error("缺少必填参数: {0}")]
    MissingArgument(String),

    /// 外部数据源加载失败
    #[error("数据源加载失败 ({source_name}): {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// 人工指定后的草稿创建失败（批量运行中按时段记录，不走此分支）
    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl EngineError {
    pub fn from_source(source_name: &str, err: impl std::fmt::Display) -> Self {
        EngineError::Source {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
