// ==========================================
// 清单项目桥接系统 - 基本流 Repository 实现
// ==========================================
// 职责: 实现参考基本流列表查询(使用 rusqlite)
// 红线: 只读,不得修改参考数据库
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::ElementaryFlow;
use crate::repository::biosphere_repo::BiosphereRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// BiosphereRepositoryImpl
// ==========================================
pub struct BiosphereRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl BiosphereRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 参考数据库文件路径(与活动表同库)
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建(测试用)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn map_flow(row: &Row<'_>) -> rusqlite::Result<ElementaryFlow> {
        Ok(ElementaryFlow {
            code: row.get(0)?,
            name: row.get(1)?,
            compartment: row.get(2)?,
            subcompartment: row.get(3)?,
        })
    }
}

#[async_trait]
impl BiosphereRepository for BiosphereRepositoryImpl {
    async fn find_flow(
        &self,
        name: &str,
        compartment: &str,
        subcompartment: Option<&str>,
    ) -> RepositoryResult<Option<ElementaryFlow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // IS 比较使 NULL 子舱室可以直接参与等值查找
        let mut stmt = conn.prepare(
            "SELECT code, name, compartment, subcompartment FROM elementary_flow
             WHERE name = ?1 AND compartment = ?2 AND subcompartment IS ?3
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(params![name, compartment, subcompartment], Self::map_flow)?;

        match rows.next() {
            Some(flow) => Ok(Some(flow?)),
            None => Ok(None),
        }
    }

    async fn search_flows(&self, query: &str) -> RepositoryResult<Vec<ElementaryFlow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT code, name, compartment, subcompartment FROM elementary_flow
             WHERE name LIKE '%' || ?1 || '%'",
        )?;
        let flows = stmt
            .query_map(params![query], Self::map_flow)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(flows)
    }

    async fn find_by_categories(
        &self,
        compartment: &str,
        subcompartment: Option<&str>,
    ) -> RepositoryResult<Vec<ElementaryFlow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT code, name, compartment, subcompartment FROM elementary_flow
             WHERE compartment = ?1 AND subcompartment IS ?2",
        )?;
        let flows = stmt
            .query_map(params![compartment, subcompartment], Self::map_flow)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(flows)
    }
}
