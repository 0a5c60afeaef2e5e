// ==========================================
// 宪兵纪律案卷导入系统 - 列校验器
// ==========================================
// 职责: 在处理任何数据行之前校验表头是否覆盖必需列
// 输出: 通过 → HeaderMap（列名 → 列下标），失败 → ValidationError（列出全部缺失列）
// 副作用: 无
// ==========================================

use crate::domain::dimension::normalize_label;
use crate::domain::import::ImportMode;
use crate::importer::error::ValidationError;
use std::collections::HashMap;

/// 案卷导入必需列
pub mod case_columns {
    pub const REFERENCE: &str = "REFERENCE";
    pub const PUNISHMENT_YEAR: &str = "ANNEE DE PUNITION";
    pub const ORDER_SEQUENCE: &str = "N° ORDRE";
    pub const YEAR_SEQUENCE: &str = "N° ANNEE";
    pub const SOURCE_DOSSIER_ID: &str = "ID DOSSIER";
    pub const REGISTRATION_DATE: &str = "DATE ENR";
    pub const MATRICULE: &str = "MLE";
    pub const FULL_NAME: &str = "NOM ET PRENOMS";
    pub const GRADE: &str = "GRADE";
    pub const SEX: &str = "SEXE";
    pub const BIRTH_DATE: &str = "DATE DE NAISSANCE";
    pub const AGE: &str = "AGE";
    pub const UNIT: &str = "UNITE";
    pub const LEGION: &str = "LEGIONS";
    pub const SUBDIVISION: &str = "SUBDIV";
    pub const REGION: &str = "REGIONS";
    pub const SERVICE_ENTRY_DATE: &str = "DATE D'ENTREE GIE";
    pub const YEARS_OF_SERVICE: &str = "ANNEE DE SERVICE";
    pub const MARITAL_STATUS: &str = "SITUATION MATRIMONIALE";
    pub const CHILDREN_COUNT: &str = "NB ENF";
    pub const FAULT: &str = "FAUTE COMMISE";
    pub const INCIDENT_DATE: &str = "DATE DES FAITS";
    pub const DESCRIPTION: &str = "LIBELLE";
    pub const CATEGORY: &str = "N° CAT";
    pub const SANCTION_TYPE: &str = "TYPE SANCTION";
    pub const STATUTE_REFERENCE: &str = "REFERENCE DU STATUT";
    pub const DECISION_NUMBER: &str = "N° DECISION";
    pub const ORDER_NUMBER: &str = "N° ARRETE";
    pub const RATE: &str = "TAUX (JAR)";
    pub const INCIDENT_YEAR: &str = "ANNEE DES FAITS";
    pub const RADIATION_YEAR: &str = "ANNEE RADIATION";
    pub const COMMITTEE: &str = "COMITE";
    pub const CASE_STATUS: &str = "STATUT DOSSIER";

    pub const REQUIRED: &[&str] = &[
        REFERENCE,
        PUNISHMENT_YEAR,
        ORDER_SEQUENCE,
        YEAR_SEQUENCE,
        SOURCE_DOSSIER_ID,
        REGISTRATION_DATE,
        MATRICULE,
        FULL_NAME,
        GRADE,
        SEX,
        BIRTH_DATE,
        AGE,
        UNIT,
        LEGION,
        SUBDIVISION,
        REGION,
        SERVICE_ENTRY_DATE,
        YEARS_OF_SERVICE,
        MARITAL_STATUS,
        CHILDREN_COUNT,
        FAULT,
        INCIDENT_DATE,
        DESCRIPTION,
        CATEGORY,
        SANCTION_TYPE,
        STATUTE_REFERENCE,
        DECISION_NUMBER,
        ORDER_NUMBER,
        RATE,
        INCIDENT_YEAR,
        RADIATION_YEAR,
        COMMITTEE,
        CASE_STATUS,
    ];
}

/// 名册导入必需列
pub mod roster_columns {
    pub const MATRICULE: &str = "MATRICULE";
    pub const LAST_NAME: &str = "NOM";
    pub const FIRST_NAMES: &str = "PRENOMS";
    pub const BIRTH_DATE: &str = "DATE DE NAISSANCE";
    pub const BIRTH_PLACE: &str = "LIEU DE NAISSANCE";
    pub const SERVICE_ENTRY_DATE: &str = "DATE ENTREE GIE";
    pub const SEX: &str = "SEXE";

    pub const REQUIRED: &[&str] = &[
        MATRICULE,
        LAST_NAME,
        FIRST_NAMES,
        BIRTH_DATE,
        BIRTH_PLACE,
        SERVICE_ENTRY_DATE,
        SEX,
    ];
}

// ==========================================
// HeaderMap - 列名 → 列下标
// ==========================================
// 校验通过后构建一次，逐行转换时按固定列名取值
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn from_headers(headers: &[String]) -> Self {
        let mut columns = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            // 重复列名取第一次出现
            columns.entry(normalize_label(header)).or_insert(idx);
        }
        Self { columns }
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

// ==========================================
// ColumnValidator
// ==========================================
pub struct ColumnValidator;

impl ColumnValidator {
    pub fn required_columns(mode: ImportMode) -> &'static [&'static str] {
        match mode {
            ImportMode::Case => case_columns::REQUIRED,
            ImportMode::Roster => roster_columns::REQUIRED,
        }
    }

    /// 校验表头；缺失列按契约顺序全部列出
    pub fn validate(&self, mode: ImportMode, headers: &[String]) -> Result<HeaderMap, ValidationError> {
        let map = HeaderMap::from_headers(headers);
        let missing: Vec<String> = Self::required_columns(mode)
            .iter()
            .filter(|column| !map.contains(column))
            .map(|column| column.to_string())
            .collect();

        if missing.is_empty() {
            Ok(map)
        } else {
            Err(ValidationError { mode, missing })
        }
    }
}
