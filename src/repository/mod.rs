// ==========================================
// 宪兵纪律案卷导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod dimension_repo;
pub mod discipline_repo;
pub mod error;

// 重导出核心仓储
pub use dimension_repo::DimensionRepository;
pub use discipline_repo::{DisciplineRepository, TableCounts};
pub use error::{RepositoryError, RepositoryResult};
