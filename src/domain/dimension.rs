// ==========================================
// 宪兵纪律案卷导入系统 - 维度定义
// ==========================================
// 职责: 十个独立维度表（标签 → 代理键）
// 红线: 维度行只增不改，id 一经分配不可变
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// Dimension - 维度枚举
// ==========================================
// 每个维度对应一张 (id, label) 表，表名为静态常量，可安全拼接进 SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Grade,
    FaultType,
    Category,
    CaseStatus,
    Unit,
    Legion,
    Subdivision,
    Region,
    MaritalStatus,
    SanctionType,
}

impl Dimension {
    /// 全部维度（建表顺序）
    pub const ALL: [Dimension; 10] = [
        Dimension::Grade,
        Dimension::FaultType,
        Dimension::Category,
        Dimension::CaseStatus,
        Dimension::Unit,
        Dimension::Legion,
        Dimension::Subdivision,
        Dimension::Region,
        Dimension::MaritalStatus,
        Dimension::SanctionType,
    ];

    /// 维度表名
    pub fn table_name(self) -> &'static str {
        match self {
            Dimension::Grade => "grade",
            Dimension::FaultType => "fault_type",
            Dimension::Category => "category",
            Dimension::CaseStatus => "case_status",
            Dimension::Unit => "unit",
            Dimension::Legion => "legion",
            Dimension::Subdivision => "subdivision",
            Dimension::Region => "region",
            Dimension::MaritalStatus => "marital_status",
            Dimension::SanctionType => "sanction_type",
        }
    }

    /// 案卷表中引用该维度的外键列
    pub fn foreign_key_column(self) -> &'static str {
        match self {
            Dimension::Grade => "grade_id",
            Dimension::FaultType => "fault_type_id",
            Dimension::Category => "category_id",
            Dimension::CaseStatus => "case_status_id",
            Dimension::Unit => "unit_id",
            Dimension::Legion => "legion_id",
            Dimension::Subdivision => "subdivision_id",
            Dimension::Region => "region_id",
            Dimension::MaritalStatus => "marital_status_id",
            Dimension::SanctionType => "sanction_type_id",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.table_name() == wanted)
            .ok_or_else(|| format!("未知维度: {}", s))
    }
}

/// 标签标准化：去首尾空白，内部连续空白折叠为单个空格（保留大小写）
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ==========================================
// ResolvedKeys - 单行已解析的代理键
// ==========================================
// None 表示源单元格为空，外键落库为 NULL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedKeys {
    pub grade_id: Option<i64>,
    pub fault_type_id: Option<i64>,
    pub category_id: Option<i64>,
    pub case_status_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub legion_id: Option<i64>,
    pub subdivision_id: Option<i64>,
    pub region_id: Option<i64>,
    pub marital_status_id: Option<i64>,
    pub sanction_type_id: Option<i64>,
}

impl ResolvedKeys {
    /// 按维度写入代理键
    pub fn set(&mut self, dimension: Dimension, id: Option<i64>) {
        let slot = match dimension {
            Dimension::Grade => &mut self.grade_id,
            Dimension::FaultType => &mut self.fault_type_id,
            Dimension::Category => &mut self.category_id,
            Dimension::CaseStatus => &mut self.case_status_id,
            Dimension::Unit => &mut self.unit_id,
            Dimension::Legion => &mut self.legion_id,
            Dimension::Subdivision => &mut self.subdivision_id,
            Dimension::Region => &mut self.region_id,
            Dimension::MaritalStatus => &mut self.marital_status_id,
            Dimension::SanctionType => &mut self.sanction_type_id,
        };
        *slot = id;
    }

    /// 按维度读取代理键
    pub fn get(&self, dimension: Dimension) -> Option<i64> {
        match dimension {
            Dimension::Grade => self.grade_id,
            Dimension::FaultType => self.fault_type_id,
            Dimension::Category => self.category_id,
            Dimension::CaseStatus => self.case_status_id,
            Dimension::Unit => self.unit_id,
            Dimension::Legion => self.legion_id,
            Dimension::Subdivision => self.subdivision_id,
            Dimension::Region => self.region_id,
            Dimension::MaritalStatus => self.marital_status_id,
            Dimension::SanctionType => self.sanction_type_id,
        }
    }
}
