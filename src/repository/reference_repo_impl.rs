// ==========================================
// 清单项目桥接系统 - 参考活动 Repository 实现
// ==========================================
// 职责: 实现参考数据库活动查询(使用 rusqlite)
// 红线: 只读,不得修改参考数据库
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::ReferenceActivity;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reference_repo::ReferenceRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ReferenceRepositoryImpl
// ==========================================
pub struct ReferenceRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 参考数据库文件路径
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

    fn map_activity(row: &Row<'_>) -> rusqlite::Result<ReferenceActivity> {
        Ok(ReferenceActivity {
            code: row.get(0)?,
            name: row.get(1)?,
            reference_product: row.get(2)?,
            location: row.get(3)?,
            unit: row.get(4)?,
        })
    }
}

#[async_trait]
impl ReferenceRepository for ReferenceRepositoryImpl {
    async fn all_activities(&self) -> RepositoryResult<Vec<ReferenceActivity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT code, name, reference_product, location, unit FROM activity",
        )?;
        let activities = stmt
            .query_map([], Self::map_activity)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(activities)
    }

    async fn search_activities(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> RepositoryResult<Vec<ReferenceActivity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // SQLite 的 LIKE 对 ASCII 默认不区分大小写
        let activities = match location {
            Some(loc) => {
                let mut stmt = conn.prepare(
                    "SELECT code, name, reference_product, location, unit FROM activity
                     WHERE (name LIKE '%' || ?1 || '%' OR reference_product LIKE '%' || ?1 || '%')
                       AND location = ?2",
                )?;
                stmt.query_map(params![query, loc], Self::map_activity)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT code, name, reference_product, location, unit FROM activity
                     WHERE name LIKE '%' || ?1 || '%' OR reference_product LIKE '%' || ?1 || '%'",
                )?;
                stmt.query_map(params![query], Self::map_activity)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(activities)
    }

    async fn find_by_exact(
        &self,
        name: &str,
        reference_product: &str,
        location: &str,
    ) -> RepositoryResult<Option<ReferenceActivity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT code, name, reference_product, location, unit FROM activity
             WHERE lower(name) = lower(?1)
               AND lower(reference_product) = lower(?2)
               AND location = ?3
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(
            params![name, reference_product, location],
            Self::map_activity,
        )?;

        match rows.next() {
            Some(activity) => Ok(Some(activity?)),
            None => Ok(None),
        }
    }
}
