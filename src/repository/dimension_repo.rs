// ==========================================
// 宪兵纪律案卷导入系统 - 维度表 Repository
// ==========================================
// 职责: 十个维度表的 (id, label) 读写
// 红线: Repository 不含业务规则；只增不改不删
// 约束: 表名来自 Dimension::table_name（静态常量），标签一律参数化
// ==========================================

use crate::domain::dimension::Dimension;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};

pub struct DimensionRepository;

impl DimensionRepository {
    /// 按标签精确查找代理键
    pub fn find_id(
        conn: &Connection,
        dimension: Dimension,
        label: &str,
    ) -> RepositoryResult<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE label = ?1", dimension.table_name());
        let id = conn
            .query_row(&sql, params![label], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(id)
    }

    /// 插入新标签并返回新分配的代理键
    pub fn insert_label(
        conn: &Connection,
        dimension: Dimension,
        label: &str,
    ) -> RepositoryResult<i64> {
        let sql = format!("INSERT INTO {} (label) VALUES (?1)", dimension.table_name());
        conn.execute(&sql, params![label])?;
        Ok(conn.last_insert_rowid())
    }

    /// 列出某维度全部 (id, label)，按 id 升序
    pub fn list(conn: &Connection, dimension: Dimension) -> RepositoryResult<Vec<(i64, String)>> {
        let sql = format!("SELECT id, label FROM {} ORDER BY id", dimension.table_name());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 统计某维度行数
    pub fn count(conn: &Connection, dimension: Dimension) -> RepositoryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", dimension.table_name());
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::repository::error::RepositoryError;

    #[test]
    fn test_insert_then_find() {
        let conn = open_in_memory().unwrap();
        let id = DimensionRepository::insert_label(&conn, Dimension::Unit, "BDE COCODY").unwrap();
        assert_eq!(
            DimensionRepository::find_id(&conn, Dimension::Unit, "BDE COCODY").unwrap(),
            Some(id)
        );
        // 大小写敏感
        assert_eq!(
            DimensionRepository::find_id(&conn, Dimension::Unit, "bde cocody").unwrap(),
            None
        );
        // 维度之间相互独立
        assert_eq!(
            DimensionRepository::find_id(&conn, Dimension::Legion, "BDE COCODY").unwrap(),
            None
        );
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let conn = open_in_memory().unwrap();
        DimensionRepository::insert_label(&conn, Dimension::Grade, "SERGENT").unwrap();
        let err = DimensionRepository::insert_label(&conn, Dimension::Grade, "SERGENT").unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_list_and_count() {
        let conn = open_in_memory().unwrap();
        DimensionRepository::insert_label(&conn, Dimension::Region, "ABIDJAN").unwrap();
        DimensionRepository::insert_label(&conn, Dimension::Region, "BOUAKE").unwrap();
        let rows = DimensionRepository::list(&conn, Dimension::Region).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, "ABIDJAN");
        assert_eq!(DimensionRepository::count(&conn, Dimension::Region).unwrap(), 2);
    }
}
