// ==========================================
// 清单项目桥接系统 - 诊断记录与转换报告
// ==========================================
// 职责: 承载四类诊断清单与最终转换汇总
// 红线: 诊断清单是显式返回值,不放全局可变状态
// ==========================================

use crate::domain::types::CategoryPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// UnresolvedProcessRef - 未解析过程引用
// ==========================================
// 用途: obsolete / system / only-in-source 三个分流桶的条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedProcessRef {
    pub name: String,       // 交换流完整名称
    pub origin: String,     // 来源过程显示名称
    pub amount: f64,        // 交换流数量
}

// ==========================================
// CreatedBiosphereFlow - 源工具自建基本流
// ==========================================
// 用途: 生物圈匹配完全失败时的人工对账条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedBiosphereFlow {
    pub name: String,                  // 流名称(已归一化)
    pub categories: CategoryPath,      // 源类别路径
    pub origin: String,                // 来源过程显示名称
    pub amount: f64,                   // 交换流数量
}

// ==========================================
// PruneWarning - 残留未链接交换流警告
// ==========================================
// 说明: 限定轮次清理后仍未清空属已知不完备行为,只告警不终止
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneWarning {
    pub process_index: usize,      // 过程在项目中的下标
    pub process_name: String,      // 过程显示名称
    pub exchange_name: String,     // 残留交换流名称
}

// ==========================================
// ConversionSummary - 转换汇总统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub total_processes: usize,        // 分解后过程总数
    pub decomposed_processes: usize,   // 由联产分解产生的过程数
    pub linked_technosphere: usize,    // 成功链接的技术圈流数
    pub linked_biosphere: usize,       // 成功链接的生物圈流数
    pub pruned_exchanges: usize,       // 被清理的未链接交换流数
    pub written_processes: usize,      // 落库过程数
}

// ==========================================
// ConversionReport - 转换报告
// ==========================================
// 用途: 管线唯一产出物,四个诊断桶 + 清理警告 + 汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub summary: ConversionSummary,

    // ===== 四个诊断桶(需人工对账) =====
    pub obsolete_processes: Vec<UnresolvedProcessRef>,      // 已废弃过程引用
    pub system_processes: Vec<UnresolvedProcessRef>,        // 系统聚合过程引用
    pub only_in_source: Vec<UnresolvedProcessRef>,          // 仅存在于源工具的过程引用
    pub created_biosphere_flows: Vec<CreatedBiosphereFlow>, // 源工具自建基本流

    // ===== 清理阶段残留警告 =====
    pub prune_warnings: Vec<PruneWarning>,

    // ===== 审计 =====
    pub completed_at: DateTime<Utc>,   // 转换完成时间
    pub elapsed_ms: u64,               // 耗时(毫秒)
}

impl ConversionReport {
    pub fn new() -> Self {
        Self {
            summary: ConversionSummary::default(),
            obsolete_processes: Vec::new(),
            system_processes: Vec::new(),
            only_in_source: Vec::new(),
            created_biosphere_flows: Vec::new(),
            prune_warnings: Vec::new(),
            completed_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// 诊断桶条目总数
    pub fn diagnostic_count(&self) -> usize {
        self.obsolete_processes.len()
            + self.system_processes.len()
            + self.only_in_source.len()
            + self.created_biosphere_flows.len()
    }

    /// 是否需要人工对账
    pub fn needs_manual_reconciliation(&self) -> bool {
        self.diagnostic_count() > 0 || !self.prune_warnings.is_empty()
    }
}

impl Default for ConversionReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_count() {
        let mut report = ConversionReport::new();
        assert_eq!(report.diagnostic_count(), 0);
        assert!(!report.needs_manual_reconciliation());

        report.obsolete_processes.push(UnresolvedProcessRef {
            name: "某废弃过程".into(),
            origin: "来源过程".into(),
            amount: 1.0,
        });
        assert_eq!(report.diagnostic_count(), 1);
        assert!(report.needs_manual_reconciliation());
    }
}
