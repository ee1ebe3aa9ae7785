// ==========================================
// 清单项目桥接系统 - 引擎层错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================
// 分级:
// - 致命(立即终止): 分配参数缺失 / 文本分配残留 / 改写分支检索无果 / 舱室码缺失
// - 可恢复(进诊断桶): 无规则命中 / 生物圈完全未命中 —— 不走本错误类型
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 分配解析错误 =====
    #[error("分配参数不存在 (过程 {process}, 参数 {parameter})")]
    UnresolvedAllocationParameter { process: String, parameter: String },

    #[error("分配解析后仍残留文本分配 (过程 {process}),属解析器缺陷或不支持的项目形态")]
    TextualAllocationRemains { process: String },

    #[error("联产产出流缺少分配系数 (过程 {process}, 产出 {product})")]
    MissingAllocation { process: String, product: String },

    // ===== 匹配错误 =====
    #[error(
        "改写分支 {rule} 检索无果 (名称 {name}, 参考产品 {reference_product}, 位置 {location}),\
         规则表存在缺口,需人工确认"
    )]
    ReferenceRecordMissing {
        rule: &'static str,
        name: String,
        reference_product: String,
        location: String,
    },

    #[error("舱室码表缺少条目: {segment}")]
    UnknownCategory { segment: String },

    // ===== 传播错误 =====
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
