// ==========================================
// 清单项目桥接系统 - 基本流 Repository Trait
// ==========================================
// 职责: 定义参考基本流列表查询接口(不包含实现)
// 红线: Repository 不含匹配规则,只做查询
// ==========================================

use crate::domain::reference::ElementaryFlow;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// BiosphereRepository Trait
// ==========================================
// 用途: 生物圈匹配的查询能力
// 实现者: BiosphereRepositoryImpl(使用 rusqlite)
#[async_trait]
pub trait BiosphereRepository: Send + Sync {
    /// 按 (名称, 舱室, 子舱室) 等值查找基本流
    ///
    /// # 参数
    /// - name: 精确名称
    /// - compartment: 参考舱室代码
    /// - subcompartment: 参考子舱室代码(None = 单段类别)
    async fn find_flow(
        &self,
        name: &str,
        compartment: &str,
        subcompartment: Option<&str>,
    ) -> RepositoryResult<Option<ElementaryFlow>>;

    /// 按名称模糊检索基本流(不区分大小写的包含匹配)
    async fn search_flows(&self, query: &str) -> RepositoryResult<Vec<ElementaryFlow>>;

    /// 按类别检索基本流(忽略名称)
    async fn find_by_categories(
        &self,
        compartment: &str,
        subcompartment: Option<&str>,
    ) -> RepositoryResult<Vec<ElementaryFlow>>;
}
