// ==========================================
// 宪兵纪律案卷导入系统 - 导入层
// ==========================================
// 职责: 表格文件 → 维度表 + 人员/案卷/处分
// 支持: Excel, CSV
// 流程: 列校验 → 去重 → 转换 → 维度解析 → 组装 → 落库
// ==========================================

// 模块声明
pub mod column_validator;
pub mod dimension_registry;
pub mod error;
pub mod field_transformer;
pub mod file_parser;
pub mod loader;
pub mod orchestrator;
pub mod progress;
pub mod record_builder;

// 重导出核心类型
pub use column_validator::{ColumnValidator, HeaderMap};
pub use dimension_registry::DimensionRegistry;
pub use error::{ImportError, ImportResult, RowError, TransformWarning, ValidationError};
pub use field_transformer::{CaseRow, FieldTransformer, RosterRow, Transformed};
pub use file_parser::{CellValue, CsvParser, ExcelParser, FileParser, ParsedSheet, UniversalFileParser};
pub use loader::{BatchScope, Loader, RowScope};
pub use orchestrator::ImportOrchestrator;
pub use progress::{ChannelProgress, NoProgress, ProgressSink};
pub use record_builder::{RecordBuilder, SanctionPlan};
