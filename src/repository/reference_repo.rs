// ==========================================
// 清单项目桥接系统 - 参考活动 Repository Trait
// ==========================================
// 职责: 定义参考数据库活动查询接口(不包含实现)
// 红线: Repository 不含匹配规则,只做查询
// ==========================================

use crate::domain::reference::ReferenceActivity;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ReferenceRepository Trait
// ==========================================
// 用途: 技术圈匹配的查询能力
// 实现者: ReferenceRepositoryImpl(使用 rusqlite)
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// 遍历全部活动记录
    ///
    /// # 返回
    /// - Ok(Vec<ReferenceActivity>): 全表记录(有界,数千至数万条)
    async fn all_activities(&self) -> RepositoryResult<Vec<ReferenceActivity>>;

    /// 按名称/参考产品模糊检索活动
    ///
    /// # 参数
    /// - query: 检索词(对 name 与 reference_product 做不区分大小写的包含匹配)
    /// - location: 可选位置过滤(精确匹配)
    ///
    /// # 返回
    /// - Ok(Vec<ReferenceActivity>): 候选记录
    async fn search_activities(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> RepositoryResult<Vec<ReferenceActivity>>;

    /// 按 (名称, 参考产品, 位置) 等值查找
    ///
    /// # 参数
    /// - name / reference_product: 不区分大小写的等值比较
    /// - location: 精确匹配
    ///
    /// # 返回
    /// - Ok(Some): 唯一命中(多条命中时取首条)
    /// - Ok(None): 无命中
    async fn find_by_exact(
        &self,
        name: &str,
        reference_product: &str,
        location: &str,
    ) -> RepositoryResult<Option<ReferenceActivity>>;
}
