// ==========================================
// 宪兵纪律案卷导入系统 - 人员与案卷领域模型
// ==========================================
// 实体: Gendarme（人员，自然键 matricule）
//       Dossier（案卷事实）/ Sanction（处分事实）
// 用途: 导入层写入，报表层只读
// ==========================================

use crate::domain::dimension::ResolvedKeys;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Gendarme - 人员实体
// ==========================================
// 红线: 同一 matricule 再次出现时整行覆盖（不做字段合并）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gendarme {
    pub matricule: String,                     // 服役编号（自然键）
    pub full_name: Option<String>,             // 姓名
    pub sex: Option<String>,                   // 性别
    pub birth_date: Option<NaiveDate>,         // 出生日期
    pub birth_place: Option<String>,           // 出生地（仅名册导入）
    pub age: i64,                              // 年龄
    pub service_entry_date: Option<NaiveDate>, // 入伍日期
    pub years_of_service: i64,                 // 服役年限
    pub children_count: i64,                   // 子女数
}

// ==========================================
// Dossier - 案卷事实
// ==========================================
// 红线: 所有维度外键必须在写入前解析完毕
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub reference: String,                    // 案卷编号（业务键）
    pub source_dossier_id: Option<String>,    // ID DOSSIER
    pub punishment_year: i64,                 // ANNEE DE PUNITION
    pub order_sequence: Option<i64>,          // N° ORDRE
    pub year_sequence: Option<i64>,           // N° ANNEE
    pub registration_date: Option<NaiveDate>, // DATE ENR
    pub incident_date: Option<NaiveDate>,     // DATE DES FAITS
    pub incident_year: i64,                   // ANNEE DES FAITS
    pub description: Option<String>,          // LIBELLE
    pub matricule: String,                    // 人员外键（自然键）
    pub keys: ResolvedKeys,                   // 维度外键
}

// ==========================================
// Sanction - 处分事实
// ==========================================
// 与所属案卷同一工作单元内创建，无独立生命周期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sanction {
    pub sanction_type_id: Option<i64>,
    pub rate: Option<i64>,                 // TAUX (JAR)
    pub decision_number: Option<String>,   // N° DECISION（仅严重处分）
    pub order_number: Option<String>,      // N° ARRETE（仅严重处分）
    pub radiation_year: Option<i64>,       // ANNEE RADIATION（仅严重处分）
    pub statute_reference: Option<String>, // REFERENCE DU STATUT
    pub committee: Option<String>,         // COMITE
}

// ==========================================
// CaseRecord - 单行组装结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub person: Gendarme,
    pub dossier: Dossier,
    pub sanction: Sanction,
}

/// 单行落库后生成的代理键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIds {
    pub sanction_id: i64,
    pub dossier_id: i64,
}

/// 已落库案卷的只读视图（查询用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierView {
    pub dossier_id: i64,
    pub reference: String,
    pub matricule: String,
    pub case_status: Option<String>,
    pub sanction_type: Option<String>,
    pub unit: Option<String>,
    pub rate: Option<i64>,
    pub decision_number: Option<String>,
    pub order_number: Option<String>,
}
