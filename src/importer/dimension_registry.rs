// ==========================================
// 宪兵纪律案卷导入系统 - 维度注册表
// ==========================================
// 职责: 标签 → 代理键（查找或创建），十个维度相互独立
// 匹配: 空白规范化后按大小写敏感精确匹配
// 缓存: 已提交的 (维度, 标签) → id；行内新建的 id 先暂存，
//       行提交后并入缓存，行回滚后丢弃
// ==========================================

use crate::domain::dimension::{normalize_label, Dimension, ResolvedKeys};
use crate::importer::error::RowError;
use crate::importer::field_transformer::CaseRow;
use crate::repository::dimension_repo::DimensionRepository;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

type LabelKey = (Dimension, String);

#[derive(Debug, Default)]
pub struct DimensionRegistry {
    cache: HashMap<LabelKey, i64>,
    staged: HashMap<LabelKey, i64>,
    published: usize,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找或创建；同一标签重复调用返回同一 id
    pub fn resolve(
        &mut self,
        conn: &Connection,
        dimension: Dimension,
        label: &str,
    ) -> Result<i64, RowError> {
        let label = normalize_label(label);
        let key = (dimension, label);

        if let Some(id) = self.cache.get(&key).or_else(|| self.staged.get(&key)) {
            return Ok(*id);
        }

        let failure = |source| RowError::DimensionResolution {
            dimension,
            label: key.1.clone(),
            source,
        };

        let id = match DimensionRepository::find_id(conn, dimension, &key.1).map_err(failure)? {
            Some(id) => id,
            None => {
                let id =
                    DimensionRepository::insert_label(conn, dimension, &key.1).map_err(failure)?;
                debug!(dimension = %dimension, label = %key.1, id, "新建维度行");
                id
            }
        };

        // 统一暂存，行结束时再决定是否并入缓存
        self.staged.insert(key, id);
        Ok(id)
    }

    /// 空标签 → None（外键置空，不建维度行）
    pub fn resolve_optional(
        &mut self,
        conn: &Connection,
        dimension: Dimension,
        label: Option<&str>,
    ) -> Result<Option<i64>, RowError> {
        match label.map(normalize_label) {
            Some(label) if !label.is_empty() => self.resolve(conn, dimension, &label).map(Some),
            _ => Ok(None),
        }
    }

    /// 解析案卷行引用的全部维度；sanction_type 取业务规则处理后的值
    pub fn resolve_case_keys(
        &mut self,
        conn: &Connection,
        row: &CaseRow,
        sanction_type: Option<&str>,
    ) -> Result<ResolvedKeys, RowError> {
        let labels: [(Dimension, Option<&str>); 10] = [
            (Dimension::Grade, row.grade.as_deref()),
            (Dimension::FaultType, row.fault.as_deref()),
            (Dimension::Category, row.category.as_deref()),
            (Dimension::CaseStatus, row.case_status.as_deref()),
            (Dimension::Unit, row.unit.as_deref()),
            (Dimension::Legion, row.legion.as_deref()),
            (Dimension::Subdivision, row.subdivision.as_deref()),
            (Dimension::Region, row.region.as_deref()),
            (Dimension::MaritalStatus, row.marital_status.as_deref()),
            (Dimension::SanctionType, sanction_type),
        ];

        let mut keys = ResolvedKeys::default();
        for (dimension, label) in labels {
            keys.set(dimension, self.resolve_optional(conn, dimension, label)?);
        }
        Ok(keys)
    }

    /// 行提交成功：暂存 id 并入缓存
    pub fn commit_staged(&mut self) {
        self.published += self
            .staged
            .keys()
            .filter(|key| !self.cache.contains_key(*key))
            .count();
        self.cache.extend(self.staged.drain());
    }

    /// 行回滚：丢弃暂存 id
    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// 本次导入缓存的不同标签数
    pub fn cached_labels(&self) -> usize {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_resolve_is_idempotent() {
        let conn = open_in_memory().unwrap();
        let mut registry = DimensionRegistry::new();

        let a = registry.resolve(&conn, Dimension::Unit, "BDE COCODY").unwrap();
        registry.commit_staged();
        let b = registry.resolve(&conn, Dimension::Unit, "  BDE   COCODY ").unwrap();
        assert_eq!(a, b);
        assert_eq!(DimensionRepository::count(&conn, Dimension::Unit).unwrap(), 1);
    }

    #[test]
    fn test_existing_row_found_by_fresh_registry() {
        let conn = open_in_memory().unwrap();
        let id = DimensionRepository::insert_label(&conn, Dimension::Grade, "SERGENT").unwrap();

        let mut registry = DimensionRegistry::new();
        assert_eq!(registry.resolve(&conn, Dimension::Grade, "SERGENT").unwrap(), id);
        assert_eq!(DimensionRepository::count(&conn, Dimension::Grade).unwrap(), 1);
    }

    #[test]
    fn test_match_is_case_sensitive_and_dimensions_independent() {
        let conn = open_in_memory().unwrap();
        let mut registry = DimensionRegistry::new();

        let upper = registry.resolve(&conn, Dimension::Region, "ABIDJAN").unwrap();
        let lower = registry.resolve(&conn, Dimension::Region, "Abidjan").unwrap();
        assert_ne!(upper, lower);

        registry.resolve(&conn, Dimension::Legion, "ABIDJAN").unwrap();
        assert_eq!(DimensionRepository::count(&conn, Dimension::Region).unwrap(), 2);
        assert_eq!(DimensionRepository::count(&conn, Dimension::Legion).unwrap(), 1);
    }

    #[test]
    fn test_empty_label_resolves_to_none() {
        let conn = open_in_memory().unwrap();
        let mut registry = DimensionRegistry::new();

        assert_eq!(registry.resolve_optional(&conn, Dimension::Unit, Some("   ")).unwrap(), None);
        assert_eq!(registry.resolve_optional(&conn, Dimension::Unit, None).unwrap(), None);
        assert_eq!(DimensionRepository::count(&conn, Dimension::Unit).unwrap(), 0);
    }

    #[test]
    fn test_discarded_stage_not_cached_after_rollback() {
        let mut conn = open_in_memory().unwrap();
        let mut registry = DimensionRegistry::new();

        {
            let tx = conn.transaction().unwrap();
            registry.resolve(&tx, Dimension::Unit, "BDE COCODY").unwrap();
            tx.rollback().unwrap();
        }
        registry.discard_staged();

        // 回滚后重新解析会重新建行，而不是返回失效的缓存 id
        let id = registry.resolve(&conn, Dimension::Unit, "BDE COCODY").unwrap();
        registry.commit_staged();
        assert_eq!(
            DimensionRepository::find_id(&conn, Dimension::Unit, "BDE COCODY").unwrap(),
            Some(id)
        );
        assert_eq!(registry.cached_labels(), 1);
    }

    #[test]
    fn test_resolve_case_keys_fills_every_referenced_dimension() {
        let conn = open_in_memory().unwrap();
        let mut registry = DimensionRegistry::new();
        let row = CaseRow {
            grade: Some("ADJUDANT".to_string()),
            unit: Some("BDE COCODY".to_string()),
            case_status: Some("SANCTIONNE".to_string()),
            sanction_type: Some("IGNORED".to_string()),
            ..CaseRow::default()
        };

        let keys = registry
            .resolve_case_keys(&conn, &row, Some("BLAME"))
            .unwrap();
        assert!(keys.grade_id.is_some());
        assert!(keys.unit_id.is_some());
        assert!(keys.case_status_id.is_some());
        assert!(keys.sanction_type_id.is_some());
        assert_eq!(keys.legion_id, None);
        assert_eq!(
            DimensionRepository::find_id(&conn, Dimension::SanctionType, "IGNORED").unwrap(),
            None
        );
    }
}
