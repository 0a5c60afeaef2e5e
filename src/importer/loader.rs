// ==========================================
// 宪兵纪律案卷导入系统 - 装载器
// ==========================================
// 职责: 单行载荷落库 (人员 upsert → 处分 insert → 案卷 insert)
// 工作单元:
// - per_row: 每行一个事务，成功即持久化
// - batch:   整批一个事务，每行一个 SAVEPOINT，失败行回滚到保存点
// 红线: 单行失败只回滚本行，绝不中止批次
// ==========================================

use crate::domain::discipline::{CaseRecord, RowIds};
use crate::domain::import::CommitMode;
use crate::importer::error::RowError;
use crate::repository::discipline_repo::DisciplineRepository;
use rusqlite::{Connection, Savepoint, Transaction};

// ==========================================
// BatchScope - 批次级工作单元
// ==========================================
pub enum BatchScope<'c> {
    PerRow(&'c mut Connection),
    Batch(Transaction<'c>),
}

impl<'c> BatchScope<'c> {
    pub fn begin(conn: &'c mut Connection, mode: CommitMode) -> rusqlite::Result<Self> {
        match mode {
            CommitMode::PerRow => Ok(BatchScope::PerRow(conn)),
            CommitMode::Batch => Ok(BatchScope::Batch(conn.transaction()?)),
        }
    }

    /// 开启单行工作单元
    pub fn begin_row(&mut self) -> rusqlite::Result<RowScope<'_>> {
        match self {
            BatchScope::PerRow(conn) => Ok(RowScope::Transaction(conn.transaction()?)),
            BatchScope::Batch(tx) => Ok(RowScope::Savepoint(tx.savepoint()?)),
        }
    }

    /// 批次级读写（诊断记录等）所用连接
    pub fn conn(&self) -> &Connection {
        match self {
            BatchScope::PerRow(conn) => &**conn,
            BatchScope::Batch(tx) => &**tx,
        }
    }

    /// batch 模式在此一次性提交
    pub fn finish(self) -> rusqlite::Result<()> {
        match self {
            BatchScope::PerRow(_) => Ok(()),
            BatchScope::Batch(tx) => tx.commit(),
        }
    }
}

// ==========================================
// RowScope - 单行工作单元
// ==========================================
pub enum RowScope<'a> {
    Transaction(Transaction<'a>),
    Savepoint(Savepoint<'a>),
}

impl RowScope<'_> {
    pub fn conn(&self) -> &Connection {
        match self {
            RowScope::Transaction(tx) => &**tx,
            RowScope::Savepoint(sp) => &**sp,
        }
    }

    pub fn commit(self) -> rusqlite::Result<()> {
        match self {
            RowScope::Transaction(tx) => tx.commit(),
            RowScope::Savepoint(sp) => sp.commit(),
        }
    }

    /// 回滚本行；保存点回滚后随即释放
    pub fn rollback(self) -> rusqlite::Result<()> {
        match self {
            RowScope::Transaction(tx) => tx.rollback(),
            RowScope::Savepoint(mut sp) => {
                sp.rollback()?;
                sp.commit()
            }
        }
    }
}

// ==========================================
// Loader
// ==========================================
pub struct Loader {
    batch_id: Option<String>,
}

impl Loader {
    pub fn new(batch_id: Option<String>) -> Self {
        Self { batch_id }
    }

    /// 单行落库；调用方负责提交或回滚所在工作单元
    pub fn load_row(&self, conn: &Connection, record: &CaseRecord) -> Result<RowIds, RowError> {
        DisciplineRepository::upsert_gendarme_tx(conn, &record.person)?;
        let sanction_id = DisciplineRepository::insert_sanction_tx(conn, &record.sanction)?;
        let dossier_id = DisciplineRepository::insert_dossier_tx(
            conn,
            &record.dossier,
            sanction_id,
            self.batch_id.as_deref(),
        )?;
        Ok(RowIds {
            sanction_id,
            dossier_id,
        })
    }
}
