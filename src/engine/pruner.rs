// ==========================================
// 清单项目桥接系统 - 未链接交换流清理器
// ==========================================
// 职责: 限定轮次内移除所有未链接交换流,随后校验扫描
// 背景: 未链接交换流会阻断落库;源设计以限定轮次 + 告警收尾,
//       残留属已知不完备行为,这里保留告警语义而不升级为错误
// ==========================================

use crate::domain::diagnostics::PruneWarning;
use crate::domain::process::Process;
use tracing::{info, warn};

/// 清理轮次上限
pub const MAX_PRUNE_PASSES: usize = 10;

// ==========================================
// PruneOutcome - 清理结果
// ==========================================
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub removed: usize,                  // 被移除的未链接交换流数
    pub warnings: Vec<PruneWarning>,     // 校验扫描发现的残留
}

// ==========================================
// ExchangePruner - 未链接交换流清理器
// ==========================================
pub struct ExchangePruner;

impl ExchangePruner {
    /// 执行限定轮次清理与校验扫描
    ///
    /// # 参数
    /// - processes: 全部过程(原位重建交换流列表)
    ///
    /// # 返回
    /// - PruneOutcome: 移除计数 + 残留警告(两次运行结果确定一致)
    ///
    /// # 说明
    /// - 每轮采用整表重建(retain),不做迭代中删除
    /// - 轮次预算保持 10 轮,即使首轮已清空也跑满,行为与源设计对齐
    pub fn prune(&self, processes: &mut [Process]) -> PruneOutcome {
        let mut outcome = PruneOutcome::default();

        // === 限定轮次清理 ===
        for pass in 0..MAX_PRUNE_PASSES {
            let mut removed_this_pass = 0;
            for process in processes.iter_mut() {
                let before = process.exchanges.len();
                process.exchanges.retain(|e| e.is_resolved());
                removed_this_pass += before - process.exchanges.len();
            }
            if removed_this_pass > 0 {
                info!(
                    pass = pass + 1,
                    removed = removed_this_pass,
                    "清理未链接交换流"
                );
            }
            outcome.removed += removed_this_pass;
        }

        // === 校验扫描: 残留即告警 ===
        for (i, process) in processes.iter().enumerate() {
            for exchange in &process.exchanges {
                if !exchange.is_resolved() {
                    warn!(
                        process_index = i,
                        process = %process.name,
                        exchange = %exchange.name,
                        "清理后仍存在未链接交换流"
                    );
                    outcome.warnings.push(PruneWarning {
                        process_index: i,
                        process_name: process.name.clone(),
                        exchange_name: exchange.name.clone(),
                    });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::{Exchange, ExchangeLink};
    use crate::domain::types::ExchangeKind;

    fn linked_exchange(name: &str) -> Exchange {
        let mut exchange = Exchange::new(name, 1.0, ExchangeKind::Technosphere);
        exchange.link = Some(ExchangeLink {
            input: ("db".to_string(), "c1".to_string()),
            output: ("db".to_string(), "p1".to_string()),
        });
        exchange
    }

    fn unlinked_exchange(name: &str) -> Exchange {
        Exchange::new(name, 1.0, ExchangeKind::Technosphere)
    }

    #[test]
    fn test_prune_removes_unlinked_keeps_linked() {
        let mut process = Process::new("过程");
        process.exchanges.push(linked_exchange("已链接"));
        process.exchanges.push(unlinked_exchange("未链接甲"));
        process.exchanges.push(linked_exchange("也已链接"));
        process.exchanges.push(unlinked_exchange("未链接乙"));
        let mut processes = vec![process];

        let outcome = ExchangePruner.prune(&mut processes);

        assert_eq!(outcome.removed, 2);
        assert!(outcome.warnings.is_empty());
        assert_eq!(processes[0].exchanges.len(), 2);
        assert!(processes[0].exchanges.iter().all(|e| e.is_resolved()));
    }

    #[test]
    fn test_prune_adjacent_unlinked_all_removed() {
        // 相邻未链接交换流是迭代中删除的经典翻车场景
        let mut process = Process::new("过程");
        for i in 0..5 {
            process.exchanges.push(unlinked_exchange(&format!("未链接{}", i)));
        }
        let mut processes = vec![process];

        let outcome = ExchangePruner.prune(&mut processes);

        assert_eq!(outcome.removed, 5);
        assert!(processes[0].exchanges.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_prune_deterministic_across_runs() {
        let build = || {
            let mut process = Process::new("过程");
            process.exchanges.push(linked_exchange("已链接"));
            process.exchanges.push(unlinked_exchange("未链接"));
            vec![process]
        };

        let mut first = build();
        let mut second = build();
        let outcome_first = ExchangePruner.prune(&mut first);
        let outcome_second = ExchangePruner.prune(&mut second);

        assert_eq!(outcome_first.removed, outcome_second.removed);
        assert_eq!(outcome_first.warnings, outcome_second.warnings);
        assert_eq!(first[0].exchanges.len(), second[0].exchanges.len());
    }

    #[test]
    fn test_prune_empty_project() {
        let mut processes: Vec<Process> = Vec::new();
        let outcome = ExchangePruner.prune(&mut processes);
        assert_eq!(outcome.removed, 0);
        assert!(outcome.warnings.is_empty());
    }
}
