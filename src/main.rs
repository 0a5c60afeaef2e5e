// ==========================================
// 宪兵纪律案卷导入系统 - 命令行入口
// ==========================================
// 用法:
//   gendarmerie-discipline import dossiers.xlsx --mode case
//   gendarmerie-discipline import effectifs.csv --mode roster --commit-mode batch
//   gendarmerie-discipline config import/numeric_default -1
//   gendarmerie-discipline stats --batches 5
// 结果以 JSON 输出到 stdout，日志与进度输出到 stderr
// ==========================================

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gendarmerie_discipline::app::{get_default_db_path, AppState};
use gendarmerie_discipline::domain::import::{CommitMode, ImportMode, ImportProgress};
use gendarmerie_discipline::{logging, DisciplineImporter, APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "gendarmerie-discipline", version, about = "宪兵人员名册与纪律案卷导入工具")]
struct Cli {
    /// SQLite 数据库路径（默认: $GENDARMERIE_DISCIPLINE_DB_PATH 或用户数据目录）
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<String>,

    /// 输出 debug 级别日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 导入一个表格文件（.csv / .xlsx / .xls / .ods）
    Import {
        /// 待导入文件
        file: PathBuf,

        /// 导入模式: case（纪律案卷）| roster（人员名册）
        #[arg(long, default_value = "case")]
        mode: ImportMode,

        /// 提交模式: per_row | batch（默认取配置）
        #[arg(long)]
        commit_mode: Option<CommitMode>,

        /// 不显示逐行进度
        #[arg(long)]
        quiet: bool,
    },

    /// 读取或覆写导入配置（config_kv，scope=global）
    Config {
        /// 配置键，例如 import/commit_mode；省略则列出全部
        key: Option<String>,

        /// 新值；省略则只读取
        value: Option<String>,
    },

    /// 查看各表行数与最近导入批次
    Stats {
        /// 显示最近几个批次
        #[arg(long, default_value_t = 5)]
        batches: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_with_default(if cli.verbose { "debug" } else { "info" });
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    match cli.command {
        Command::Import {
            file,
            mode,
            commit_mode,
            quiet,
        } => run_import(&state, file, mode, commit_mode, quiet).await,
        Command::Config { key, value } => run_config(&state, key, value),
        Command::Stats { batches } => run_stats(&state, batches),
    }
}

async fn run_import(
    state: &AppState,
    file: PathBuf,
    mode: ImportMode,
    commit_mode: Option<CommitMode>,
    quiet: bool,
) -> Result<()> {
    let file_path = file
        .to_str()
        .with_context(|| format!("文件路径不是有效的 UTF-8: {}", file.display()))?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ImportProgress>();
    let printer = tokio::spawn(async move {
        let mut stderr = std::io::stderr();
        while let Some(p) = rx.recv().await {
            if !quiet {
                let done = p.success_count + p.error_count;
                let _ = write!(
                    stderr,
                    "\r进度 {}/{}  成功 {}  失败 {}",
                    done, p.total_rows, p.success_count, p.error_count
                );
            }
        }
        if !quiet {
            let _ = writeln!(stderr);
        }
    });

    let result = state
        .import_api
        .import_file(file_path, mode, commit_mode, Some(tx))
        .await;
    // 发送端随导入任务结束而关闭，等待进度输出收尾
    printer.await.context("进度输出任务异常退出")?;

    let response = result.with_context(|| format!("导入失败: {}", file.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("序列化导入结果失败")?
    );

    if !response.outcome.success {
        bail!("{}", response.outcome.message);
    }
    Ok(())
}

fn run_config(state: &AppState, key: Option<String>, value: Option<String>) -> Result<()> {
    let manager = &state.config_manager;
    let report = match (key, value) {
        (None, _) => serde_json::to_value(manager.get_all_global()?)?,
        (Some(key), None) => {
            let value = manager.get_global_config_value(&key)?;
            let mut map = serde_json::Map::new();
            map.insert(key, serde_json::json!(value));
            serde_json::Value::Object(map)
        }
        (Some(key), Some(value)) => {
            // 先校验后落库，非法值不会覆盖已有配置
            let config = manager
                .set_import_config_value(&key, &value)
                .with_context(|| format!("配置 {} = {} 无法生效", key, value))?;
            serde_json::to_value(config)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_stats(state: &AppState, batches: usize) -> Result<()> {
    let counts = state
        .import_api
        .table_counts()
        .context("读取表行数失败")?;
    let recent = state
        .import_api
        .recent_batches(batches)
        .context("读取导入批次失败")?;

    let report = serde_json::json!({
        "tables": counts,
        "recent_batches": recent,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("序列化统计结果失败")?
    );
    Ok(())
}
