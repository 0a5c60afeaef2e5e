// ==========================================
// 宪兵纪律案卷导入系统 - 应用层
// ==========================================
// 职责: 数据库路径解析与 API 实例装配
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
