// ==========================================
// 清单项目桥接系统 - 落库 Repository 实现
// ==========================================
// 职责: 实现迁移产物持久化(使用 rusqlite)
// 红线: Repository 不含业务规则,只做数据写入
// ==========================================

use crate::domain::process::{Parameter, ParameterSet, Process};
use crate::domain::types::ExchangeKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::target_repo::TargetWriteRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};
use tracing::info;

// ==========================================
// TargetWriteRepositoryImpl
// ==========================================
pub struct TargetWriteRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    project_db_name: String,
}

impl TargetWriteRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 目标数据库文件路径
    /// - project_db_name: 项目库名(写入 process.database_name)
    pub fn new(db_path: &str, project_db_name: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            project_db_name: project_db_name.to_string(),
        })
    }

    /// 从已有连接创建(测试用)
    pub fn from_connection(conn: Arc<Mutex<Connection>>, project_db_name: &str) -> Self {
        Self {
            conn,
            project_db_name: project_db_name.to_string(),
        }
    }

    /// 在事务中写入单个过程及其交换流
    fn write_process_tx(
        tx: &Transaction,
        project_db_name: &str,
        process: &Process,
    ) -> RepositoryResult<()> {
        let code = process
            .code
            .as_deref()
            .ok_or_else(|| RepositoryError::MissingProcessCode(process.name.clone()))?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO process (
                code, database_name, name, reference_product, unit, production_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                code,
                project_db_name,
                process.name,
                process.reference_product,
                process.unit,
                process.production_amount,
            ],
        )?;

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO exchange (
                process_code, name, amount, kind, unit, formula, original_amount,
                input_db, input_code, output_db, output_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )?;

        for exchange in &process.exchanges {
            let link = exchange.link.as_ref().ok_or_else(|| {
                RepositoryError::UnlinkedExchange {
                    process: process.name.clone(),
                    exchange: exchange.name.clone(),
                }
            })?;

            let kind = match &exchange.kind {
                ExchangeKind::Technosphere => "technosphere",
                ExchangeKind::Biosphere { .. } => "biosphere",
                ExchangeKind::Production { .. } => "production",
            };

            stmt.execute(params![
                code,
                exchange.name,
                exchange.amount,
                kind,
                exchange.unit,
                exchange.formula,
                exchange.original_amount,
                link.input.0,
                link.input.1,
                link.output.0,
                link.output.1,
            ])?;
        }

        Ok(())
    }

    /// 在事务中写入过程级参数(含 `<slug>_1` 锚点参数)
    fn write_activity_parameters_tx(
        tx: &Transaction,
        process: &Process,
    ) -> RepositoryResult<()> {
        if process.parameters.is_empty() {
            return Ok(());
        }

        let code = process
            .code
            .as_deref()
            .ok_or_else(|| RepositoryError::MissingProcessCode(process.name.clone()))?;

        let mut stmt = tx.prepare(
            r#"
            INSERT OR REPLACE INTO activity_parameter (process_code, name, amount, formula)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;

        // 锚点参数: 与源导出工具的参数分组约定一致
        let anchor = format!("{}_1", parameter_group_slug(&process.name));
        stmt.execute(params![code, anchor, 1.0, Option::<String>::None])?;

        for param in &process.parameters {
            stmt.execute(params![code, param.name, param.amount, param.formula])?;
        }

        Ok(())
    }

    /// 在事务中写入全局参数
    fn write_project_parameters_tx(
        tx: &Transaction,
        global_parameters: &ParameterSet,
    ) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT OR REPLACE INTO project_parameter (name, amount, formula, comment)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;

        let mut params_sorted: Vec<&Parameter> = global_parameters.iter().collect();
        params_sorted.sort_by(|a, b| a.name.cmp(&b.name));

        for param in params_sorted {
            stmt.execute(params![param.name, param.amount, param.formula, param.comment])?;
        }

        Ok(())
    }
}

/// 参数分组名: 名称去数字、连字符转下划线、按空白重组
fn parameter_group_slug(name: &str) -> String {
    let no_hyphen = name.replace('-', "_");
    let no_digits: String = no_hyphen.chars().filter(|c| !c.is_ascii_digit()).collect();
    no_digits.split_whitespace().collect::<Vec<_>>().join("_")
}

#[async_trait]
impl TargetWriteRepository for TargetWriteRepositoryImpl {
    async fn initialize_schema(&self) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS process (
                code TEXT PRIMARY KEY,
                database_name TEXT NOT NULL,
                name TEXT NOT NULL,
                reference_product TEXT,
                unit TEXT,
                production_amount REAL
            );

            CREATE TABLE IF NOT EXISTS exchange (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                process_code TEXT NOT NULL REFERENCES process(code),
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                unit TEXT,
                formula TEXT,
                original_amount REAL,
                input_db TEXT NOT NULL,
                input_code TEXT NOT NULL,
                output_db TEXT NOT NULL,
                output_code TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS project_parameter (
                name TEXT PRIMARY KEY,
                amount REAL NOT NULL,
                formula TEXT,
                comment TEXT
            );

            CREATE TABLE IF NOT EXISTS activity_parameter (
                process_code TEXT NOT NULL REFERENCES process(code),
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                formula TEXT,
                PRIMARY KEY (process_code, name)
            );
            "#,
        )?;

        Ok(())
    }

    async fn write_project(
        &self,
        processes: &[Process],
        global_parameters: &ParameterSet,
    ) -> RepositoryResult<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for process in processes {
            Self::write_process_tx(&tx, &self.project_db_name, process)?;
            Self::write_activity_parameters_tx(&tx, process)?;
            count += 1;
        }

        Self::write_project_parameters_tx(&tx, global_parameters)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(count = count, "项目落库完成");
        Ok(count)
    }
}
