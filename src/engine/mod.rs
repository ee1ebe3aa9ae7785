// ==========================================
// 清单项目桥接系统 - 引擎层
// ==========================================
// 职责: 记录解析与过程分解的全部业务规则
// 红线: Engine 不拼 SQL,数据库访问一律经 Repository
// ==========================================

pub mod allocation_resolver;
pub mod biosphere_matcher;
pub mod decomposer;
pub mod error;
pub mod orchestrator;
pub mod pruner;
pub mod technosphere_matcher;

// 重导出核心引擎
pub use allocation_resolver::AllocationResolver;
pub use biosphere_matcher::{BiosphereMatcher, BiosphereOutcome};
pub use decomposer::{DecomposeOutcome, MultiOutputDecomposer};
pub use error::{EngineError, EngineResult};
pub use orchestrator::ConversionPipeline;
pub use pruner::{ExchangePruner, PruneOutcome, MAX_PRUNE_PASSES};
pub use technosphere_matcher::{
    classify, MatchDecision, MatchRule, RuleInput, SearchPlan, TechnosphereMatcher,
    TechnosphereOutcome,
};
