// ==========================================
// 宪兵纪律案卷导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 人员名册与纪律案卷的表格导入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 异步门面
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    CommitMode, Dimension, ImportMode, ImportOutcome, ImportProgress, ImportTotals,
};
pub use importer::{ImportError, ImportOrchestrator, ImportResult};
pub use api::{DisciplineImporter, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "宪兵纪律案卷导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
