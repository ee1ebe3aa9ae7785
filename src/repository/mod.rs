// ==========================================
// 清单项目桥接系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含匹配/分解规则
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod biosphere_repo;
pub mod biosphere_repo_impl;
pub mod error;
pub mod reference_repo;
pub mod reference_repo_impl;
pub mod target_repo;
pub mod target_repo_impl;

// 重导出核心仓储
pub use biosphere_repo::BiosphereRepository;
pub use biosphere_repo_impl::BiosphereRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use reference_repo::ReferenceRepository;
pub use reference_repo_impl::ReferenceRepositoryImpl;
pub use target_repo::TargetWriteRepository;
pub use target_repo_impl::TargetWriteRepositoryImpl;
