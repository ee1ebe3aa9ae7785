// ==========================================
// 清单项目桥接系统 - 落库 Repository Trait
// ==========================================
// 职责: 定义迁移产物的持久化接口(不包含实现)
// 红线: 只接受完全解析的项目,未链接交换流直接报错
// ==========================================

use crate::domain::process::{ParameterSet, Process};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// TargetWriteRepository Trait
// ==========================================
// 用途: 转换管线末端的持久化能力
// 实现者: TargetWriteRepositoryImpl(使用 rusqlite)
#[async_trait]
pub trait TargetWriteRepository: Send + Sync {
    /// 建表(幂等)
    async fn initialize_schema(&self) -> RepositoryResult<()>;

    /// 写入完整项目(事务化)
    ///
    /// # 参数
    /// - processes: 已编码、已解析的过程列表
    /// - global_parameters: 项目全局参数
    ///
    /// # 返回
    /// - Ok(usize): 成功写入的过程数
    /// - Err: 存在未链接交换流/缺编码过程时整个事务回滚
    ///
    /// # 说明
    /// - 交换流以 (input, output) 编码边形式写入
    /// - 每个过程额外写入一个 `<slug>_1` 锚点参数(数值 1),
    ///   与源导出工具的参数分组约定保持一致
    async fn write_project(
        &self,
        processes: &[Process],
        global_parameters: &ParameterSet,
    ) -> RepositoryResult<usize>;
}
