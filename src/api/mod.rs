// ==========================================
// 内容排期系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供宿主进程/前端调用
// ==========================================

pub mod assignment_api;
pub mod error;

// 重导出核心类型
pub use assignment_api::{
    AssignmentApi, AssignmentView, ManualAssignRequest, ManualAssignResponse,
    RunAssignmentRequest, RunAssignmentResponse,
};
pub use error::{ApiError, ApiResult};
