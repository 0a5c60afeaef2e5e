// ==========================================
// 宪兵纪律案卷导入系统 - API 层
// ==========================================
// 职责: 提供异步业务接口,供 CLI 或其他前端调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{DisciplineImporter, ImportApi, ImportApiResponse};
