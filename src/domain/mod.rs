// ==========================================
// 内容排期系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod channel;
pub mod filter;
pub mod media;
pub mod slot;
pub mod types;

// 重导出核心类型
pub use channel::{Channel, ChannelSchedule, PostingHistoryEntry};
pub use filter::{FilterExpression, FilterGroup, FilterItem};
pub use media::{MediaItem, TagAssignment, TagValue};
pub use slot::{
    AssignmentResult, FilledSlot, ScheduleWarning, Slot, SlotKey, UnfilledSlot,
};
pub use types::{
    AssignmentSource, CadenceKind, ChannelId, MediaId, MediaKind, PlatformType, ScheduleId,
    UnfilledReason,
};
