// ==========================================
// 宪兵纪律案卷导入系统 - 领域模型层
// ==========================================
// 职责: 定义维度、人员/案卷/处分实体与导入过程类型
// 红线: 不含数据访问逻辑
// ==========================================

pub mod dimension;
pub mod discipline;
pub mod import;

// 重导出核心类型
pub use dimension::{normalize_label, Dimension, ResolvedKeys};
pub use discipline::{CaseRecord, Dossier, DossierView, Gendarme, RowIds, Sanction};
pub use import::{
    CommitMode, ImportBatch, ImportMode, ImportOutcome, ImportProgress, ImportState,
    ImportTotals, RowErrorKind, RowFailure,
};
