// ==========================================
// 内容排期系统 - 引擎层
// ==========================================
// 职责: 筛选求值、周期展开、素材准入、贪心分配、流水线编排
// 红线: Engine 不拼 SQL，外部 I/O 只经过 sources 中的接口
// ==========================================

pub mod assignment;
pub mod eligibility;
pub mod eligibility_core;
pub mod error;
pub mod filter_core;
pub mod orchestrator;
pub mod recurrence;
pub mod sources;

// 重导出核心引擎
pub use assignment::AssignmentEngine;
pub use eligibility::{EligibilityOutcome, EligibilityResolver};
pub use eligibility_core::{EligibilityCore, PostingHistoryIndex};
pub use error::{EngineError, EngineResult, ScheduleConfigError};
pub use filter_core::{FilterEvaluator, NoPostingHistory, PostingLookup};
pub use orchestrator::{
    plan_assignment, CreatedDraft, DraftFailure, PipelineOrchestrator, PlanningInput,
    PlanningOutcome, RunReport, RunRequest,
};
pub use recurrence::{parse_time_of_day, RecurrenceExpander, RecurrenceRule, SlotTimes};
pub use sources::{
    DraftError, DraftId, DraftRequest, DraftSink, HistoryStore, LibraryProvider, PipelineSources,
    ScheduleStore, SourceResult,
};
