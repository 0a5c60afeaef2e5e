// ==========================================
// 宪兵纪律案卷导入系统 - 记录组装器
// ==========================================
// 职责: 已转换行 + 已解析代理键 → Person / Case / Sanction 三份载荷
// 规则:
// - 待定状态: 处分类型强制为占位值，决定号/令号/时长/除名年份清空
// - 已处分状态: 处分类型与时长必须存在
// - 其他状态: 处分专属字段全部清空
// - 决定号/令号/除名年份仅在处分类型为严重处分标记时保留
// - 名册导入无案卷编号，按 "{序号}/{年份}" 合成
// ==========================================

use crate::config::ImportConfig;
use crate::domain::dimension::{normalize_label, ResolvedKeys};
use crate::domain::discipline::{CaseRecord, Dossier, Gendarme, Sanction};
use crate::importer::error::RowError;
use crate::importer::field_transformer::{CaseRow, RosterRow};
use chrono::{Datelike, NaiveDate};

/// 状态比较键：空白规范化 + 大写 + 去重音
pub fn status_key(raw: &str) -> String {
    normalize_label(raw)
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'À' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Î' | 'Ï' => 'I',
            'Ô' | 'Ö' => 'O',
            'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// 案卷状态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Sanctioned,
    Other,
}

/// 业务规则处理后的处分字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanctionPlan {
    pub sanction_type: Option<String>,
    pub rate: Option<i64>,
    pub decision_number: Option<String>,
    pub order_number: Option<String>,
    pub radiation_year: Option<i64>,
}

// ==========================================
// RecordBuilder
// ==========================================
pub struct RecordBuilder {
    pending_statuses: Vec<String>,
    sanctioned_status: String,
    pending_sanction_label: String,
    severe_marker: String,
    numeric_default: i64,
}

impl RecordBuilder {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            pending_statuses: config.pending_statuses.iter().map(|s| status_key(s)).collect(),
            sanctioned_status: status_key(&config.sanctioned_status),
            pending_sanction_label: normalize_label(&config.pending_sanction_label),
            severe_marker: status_key(&config.severe_sanction_marker),
            numeric_default: config.numeric_default,
        }
    }

    pub fn classify_status(&self, status: Option<&str>) -> StatusClass {
        let Some(key) = status.map(status_key).filter(|k| !k.is_empty()) else {
            return StatusClass::Other;
        };
        if self.pending_statuses.contains(&key) {
            StatusClass::Pending
        } else if key == self.sanctioned_status {
            StatusClass::Sanctioned
        } else {
            StatusClass::Other
        }
    }

    fn is_severe(&self, sanction_type: Option<&str>) -> bool {
        sanction_type.is_some_and(|t| status_key(t) == self.severe_marker)
    }

    /// 按案卷状态决定处分字段；须在维度解析之前调用，
    /// 被清空的处分类型不会生成维度行
    pub fn plan_sanction(&self, row: &CaseRow) -> Result<SanctionPlan, RowError> {
        let status = row.case_status.as_deref();
        let mut plan = match self.classify_status(status) {
            StatusClass::Pending => SanctionPlan {
                sanction_type: Some(self.pending_sanction_label.clone()),
                ..SanctionPlan::default()
            },
            StatusClass::Sanctioned => {
                let status = status.unwrap_or_default().to_string();
                let sanction_type = row
                    .sanction_type
                    .clone()
                    .ok_or_else(|| RowError::MissingSanctionType {
                        status: status.clone(),
                    })?;
                let rate = row
                    .rate
                    .ok_or(RowError::MissingSanctionDuration { status })?;
                SanctionPlan {
                    sanction_type: Some(sanction_type),
                    rate: Some(rate),
                    decision_number: row.decision_number.clone(),
                    order_number: row.order_number.clone(),
                    radiation_year: row.radiation_year,
                }
            }
            StatusClass::Other => SanctionPlan::default(),
        };

        if !self.is_severe(plan.sanction_type.as_deref()) {
            plan.decision_number = None;
            plan.order_number = None;
            plan.radiation_year = None;
        }
        Ok(plan)
    }

    /// 组装案卷导入的三份载荷
    pub fn build_case(
        &self,
        row: &CaseRow,
        plan: SanctionPlan,
        keys: ResolvedKeys,
    ) -> Result<CaseRecord, RowError> {
        let matricule = row.matricule.clone().ok_or(RowError::MissingPersonKey)?;
        let reference = case_reference(row).ok_or(RowError::MissingCaseReference)?;

        let person = Gendarme {
            matricule: matricule.clone(),
            full_name: row.full_name.clone(),
            sex: row.sex.clone(),
            birth_date: row.birth_date,
            birth_place: None,
            age: row.age,
            service_entry_date: row.service_entry_date,
            years_of_service: row.years_of_service,
            children_count: row.children_count,
        };

        let sanction = Sanction {
            sanction_type_id: keys.sanction_type_id,
            rate: plan.rate,
            decision_number: plan.decision_number,
            order_number: plan.order_number,
            radiation_year: plan.radiation_year,
            statute_reference: row.statute_reference.clone(),
            committee: row.committee.clone(),
        };

        let dossier = Dossier {
            reference,
            source_dossier_id: row.source_dossier_id.clone(),
            punishment_year: row.punishment_year,
            order_sequence: row.order_sequence,
            year_sequence: row.year_sequence,
            registration_date: row.registration_date,
            incident_date: row.incident_date,
            incident_year: row.incident_year,
            description: row.description.clone(),
            matricule,
            keys,
        };

        Ok(CaseRecord {
            person,
            dossier,
            sanction,
        })
    }

    /// 组装名册导入的载荷；sequence 为去重后 1-based 序号
    pub fn build_roster(
        &self,
        row: &RosterRow,
        sequence: usize,
        year: i32,
        today: NaiveDate,
    ) -> Result<CaseRecord, RowError> {
        let matricule = row.matricule.clone().ok_or(RowError::MissingPersonKey)?;

        let full_name = match (row.last_name.as_deref(), row.first_names.as_deref()) {
            (Some(last), Some(first)) => Some(format!("{} {}", last, first)),
            (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
            (None, None) => None,
        };

        let person = Gendarme {
            matricule: matricule.clone(),
            full_name,
            sex: row.sex.clone(),
            birth_date: row.birth_date,
            birth_place: row.birth_place.clone(),
            age: self.years_until(row.birth_date, today),
            service_entry_date: row.service_entry_date,
            years_of_service: self.years_until(row.service_entry_date, today),
            children_count: self.numeric_default,
        };

        let dossier = Dossier {
            reference: format!("{}/{}", sequence, year),
            source_dossier_id: None,
            punishment_year: i64::from(year),
            order_sequence: i64::try_from(sequence).ok(),
            year_sequence: Some(i64::from(year)),
            registration_date: None,
            incident_date: None,
            incident_year: self.numeric_default,
            description: None,
            matricule,
            keys: ResolvedKeys::default(),
        };

        let sanction = Sanction {
            sanction_type_id: None,
            rate: None,
            decision_number: None,
            order_number: None,
            radiation_year: None,
            statute_reference: None,
            committee: None,
        };

        Ok(CaseRecord {
            person,
            dossier,
            sanction,
        })
    }

    /// 整年数；日期缺失或在未来时取默认值
    fn years_until(&self, from: Option<NaiveDate>, today: NaiveDate) -> i64 {
        match from {
            Some(date) if date <= today => {
                let mut years = today.year() - date.year();
                if (today.month(), today.day()) < (date.month(), date.day()) {
                    years -= 1;
                }
                i64::from(years)
            }
            _ => self.numeric_default,
        }
    }
}

/// 显式编号优先，否则由 "N° ORDRE/N° ANNEE" 合成
fn case_reference(row: &CaseRow) -> Option<String> {
    row.reference.clone().or_else(|| match (row.order_sequence, row.year_sequence) {
        (Some(seq), Some(year)) => Some(format!("{}/{}", seq, year)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> RecordBuilder {
        RecordBuilder::new(&ImportConfig::default())
    }

    fn row(status: &str, sanction_type: Option<&str>, rate: Option<i64>) -> CaseRow {
        CaseRow {
            reference: Some("12/2023".to_string()),
            matricule: Some("M001".to_string()),
            case_status: Some(status.to_string()),
            sanction_type: sanction_type.map(str::to_string),
            rate,
            decision_number: Some("D-45".to_string()),
            order_number: Some("A-12".to_string()),
            radiation_year: Some(2023),
            ..CaseRow::default()
        }
    }

    #[test]
    fn test_status_key_folds_case_and_accents() {
        assert_eq!(status_key(" sanctionné "), "SANCTIONNE");
        assert_eq!(status_key("En   attente"), "EN ATTENTE");
    }

    #[test]
    fn test_pending_forces_placeholder_and_clears() {
        let plan = builder()
            .plan_sanction(&row("EN COURS", Some("BLAME"), Some(10)))
            .unwrap();
        assert_eq!(plan.sanction_type.as_deref(), Some("EN ATTENTE"));
        assert_eq!(plan.rate, None);
        assert_eq!(plan.decision_number, None);
        assert_eq!(plan.order_number, None);
    }

    #[test]
    fn test_sanctioned_requires_type_and_rate() {
        let err = builder()
            .plan_sanction(&row("SANCTIONNE", None, Some(10)))
            .unwrap_err();
        assert!(matches!(err, RowError::MissingSanctionType { .. }));

        let err = builder()
            .plan_sanction(&row("Sanctionné", Some("BLAME"), None))
            .unwrap_err();
        assert!(matches!(err, RowError::MissingSanctionDuration { .. }));
    }

    #[test]
    fn test_decision_kept_only_for_severe_marker() {
        let plan = builder()
            .plan_sanction(&row("SANCTIONNE", Some("BLAME"), Some(10)))
            .unwrap();
        assert_eq!(plan.rate, Some(10));
        assert_eq!(plan.decision_number, None);
        assert_eq!(plan.radiation_year, None);

        let plan = builder()
            .plan_sanction(&row("SANCTIONNE", Some("Radiation"), Some(0)))
            .unwrap();
        assert_eq!(plan.decision_number.as_deref(), Some("D-45"));
        assert_eq!(plan.order_number.as_deref(), Some("A-12"));
        assert_eq!(plan.radiation_year, Some(2023));
    }

    #[test]
    fn test_other_status_clears_sanction_fields() {
        let plan = builder()
            .plan_sanction(&row("CLASSE SANS SUITE", Some("RADIATION"), Some(3)))
            .unwrap();
        assert_eq!(plan, SanctionPlan::default());
    }

    #[test]
    fn test_build_case_requires_matricule_and_reference() {
        let b = builder();
        let mut r = row("CLASSE", None, None);
        r.matricule = None;
        let err = b
            .build_case(&r, SanctionPlan::default(), ResolvedKeys::default())
            .unwrap_err();
        assert!(matches!(err, RowError::MissingPersonKey));

        let mut r = row("CLASSE", None, None);
        r.reference = None;
        r.order_sequence = Some(7);
        r.year_sequence = Some(2022);
        let record = b
            .build_case(&r, SanctionPlan::default(), ResolvedKeys::default())
            .unwrap();
        assert_eq!(record.dossier.reference, "7/2022");

        r.year_sequence = None;
        let err = b
            .build_case(&r, SanctionPlan::default(), ResolvedKeys::default())
            .unwrap_err();
        assert!(matches!(err, RowError::MissingCaseReference));
    }

    #[test]
    fn test_build_case_wires_sanction_type_key() {
        let keys = ResolvedKeys {
            sanction_type_id: Some(4),
            unit_id: Some(9),
            ..ResolvedKeys::default()
        };
        let r = row("SANCTIONNE", Some("BLAME"), Some(10));
        let plan = builder().plan_sanction(&r).unwrap();
        let record = builder().build_case(&r, plan, keys).unwrap();
        assert_eq!(record.sanction.sanction_type_id, Some(4));
        assert_eq!(record.sanction.rate, Some(10));
        assert_eq!(record.dossier.keys.unit_id, Some(9));
        assert_eq!(record.person.matricule, "M001");
    }

    #[test]
    fn test_build_roster_synthesizes_reference_and_ages() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let roster = RosterRow {
            matricule: Some("M123".to_string()),
            last_name: Some("KOUASSI".to_string()),
            first_names: Some("JEAN PAUL".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1980, 6, 2),
            birth_place: Some("BOUAKE".to_string()),
            service_entry_date: NaiveDate::from_ymd_opt(2004, 1, 15),
            sex: Some("M".to_string()),
        };
        let record = builder().build_roster(&roster, 3, 2024, today).unwrap();
        assert_eq!(record.dossier.reference, "3/2024");
        assert_eq!(record.person.full_name.as_deref(), Some("KOUASSI JEAN PAUL"));
        assert_eq!(record.person.age, 43);
        assert_eq!(record.person.years_of_service, 20);
        assert_eq!(record.sanction.sanction_type_id, None);
    }
}
