// ==========================================
// 宪兵纪律案卷导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::import::CommitMode;
use crate::importer::error::ImportResult;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 所有方法在配置缺失时返回默认值，仅在配置值格式错误时返回 Err
pub trait ImportConfigReader {
    /// 数字字段无法解析时的静默默认值
    ///
    /// # 默认值
    /// - 0
    fn get_numeric_default(&self) -> ImportResult<i64>;

    /// 视为"待处理"的案卷状态列表
    ///
    /// # 默认值
    /// - ["EN ATTENTE", "EN COURS"]
    fn get_pending_statuses(&self) -> ImportResult<Vec<String>>;

    /// 视为"已处分"的案卷状态
    ///
    /// # 默认值
    /// - SANCTIONNE
    fn get_sanctioned_status(&self) -> ImportResult<String>;

    /// 待处理案卷强制使用的处分类型占位标签
    ///
    /// # 默认值
    /// - EN ATTENTE
    fn get_pending_sanction_label(&self) -> ImportResult<String>;

    /// 严重处分标记（仅此类型保留决定书号/命令号）
    ///
    /// # 默认值
    /// - RADIATION
    fn get_severe_sanction_marker(&self) -> ImportResult<String>;

    /// 数据行之前的表头行数（用于换算 1-based 源文件行号）
    ///
    /// # 默认值
    /// - 1
    fn get_header_rows(&self) -> ImportResult<usize>;

    /// 工作单元边界
    ///
    /// # 默认值
    /// - per_row
    fn get_commit_mode(&self) -> ImportResult<CommitMode>;

    /// 名册导入合成案卷编号所用年份
    ///
    /// # 默认值
    /// - None（取当前年份）
    fn get_roster_reference_year(&self) -> ImportResult<Option<i32>>;
}
