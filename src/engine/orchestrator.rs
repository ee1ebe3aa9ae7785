// ==========================================
// 清单项目桥接系统 - 转换管线编排器
// ==========================================
// 职责: 串联全部阶段,从导出文件到落库 + 转换报告
// 流程: 预清洗/解析 → 分配解析 → 多产出分解 → 技术圈匹配
//       → 生物圈匹配 → 清理 → 原始数量快照 → 落库
// 红线: 严格顺序执行,后一阶段依赖前一阶段完全结束
// ==========================================

use crate::config::concordance::ConcordanceTables;
use crate::config::conversion_config::ConversionConfig;
use crate::domain::diagnostics::ConversionReport;
use crate::domain::process::Process;
use crate::engine::allocation_resolver::AllocationResolver;
use crate::engine::biosphere_matcher::BiosphereMatcher;
use crate::engine::decomposer::MultiOutputDecomposer;
use crate::engine::error::EngineResult;
use crate::engine::pruner::ExchangePruner;
use crate::engine::technosphere_matcher::TechnosphereMatcher;
use crate::importer::project_parser::ProjectParser;
use crate::repository::biosphere_repo::BiosphereRepository;
use crate::repository::reference_repo::ReferenceRepository;
use crate::repository::target_repo::TargetWriteRepository;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// ConversionPipeline - 转换管线编排器
// ==========================================
pub struct ConversionPipeline<R, B, T>
where
    R: ReferenceRepository,
    B: BiosphereRepository,
    T: TargetWriteRepository,
{
    reference_repo: R,
    biosphere_repo: B,
    target_repo: T,
    config: ConversionConfig,
    tables: ConcordanceTables,
}

impl<R, B, T> ConversionPipeline<R, B, T>
where
    R: ReferenceRepository,
    B: BiosphereRepository,
    T: TargetWriteRepository,
{
    /// 创建转换管线
    ///
    /// # 参数
    /// - reference_repo: 参考活动仓储(只读)
    /// - biosphere_repo: 基本流仓储(只读)
    /// - target_repo: 落库仓储
    /// - config: 转换配置
    /// - tables: 名称对照表
    pub fn new(
        reference_repo: R,
        biosphere_repo: B,
        target_repo: T,
        config: ConversionConfig,
        tables: ConcordanceTables,
    ) -> Self {
        Self {
            reference_repo,
            biosphere_repo,
            target_repo,
            config,
            tables,
        }
    }

    /// 执行一次完整转换
    ///
    /// # 参数
    /// - file_path: 源导出文件路径
    ///
    /// # 返回
    /// - Ok(ConversionReport): 诊断桶 + 汇总统计
    /// - Err: 任一致命错误(格式/分配/规则表缺口/数据库)
    #[instrument(skip(self, file_path))]
    pub async fn convert<P: AsRef<Path>>(&self, file_path: P) -> EngineResult<ConversionReport> {
        let start_time = Instant::now();
        let file_path = file_path.as_ref();
        info!(file = %file_path.display(), "开始转换导出项目");

        // === 步骤 1: 预清洗 + 解析 ===
        debug!("步骤 1: 预清洗与解析");
        let parser = ProjectParser::new(self.config.delimiter_byte());
        let parsed = parser.parse_file(file_path)?;
        info!(
            processes = parsed.processes.len(),
            global_parameters = parsed.global_parameters.len(),
            "解析完成"
        );

        // === 步骤 2: 分配参数解析 ===
        debug!("步骤 2: 分配参数解析");
        let mut processes = parsed.processes;
        let resolver = AllocationResolver;
        let substituted = resolver.resolve(&mut processes, &parsed.global_parameters)?;
        resolver.verify_no_textual(&processes)?;
        info!(substituted = substituted, "分配参数解析完成");

        // === 步骤 3: 多产出分解 + 编码分配 ===
        debug!("步骤 3: 多产出分解");
        let decomposed = MultiOutputDecomposer.decompose(processes)?;
        let mut processes = decomposed.processes;

        // === 步骤 4: 技术圈匹配 ===
        debug!("步骤 4: 技术圈匹配");
        let technosphere = TechnosphereMatcher::new(
            &self.reference_repo,
            &self.tables,
            &self.config.reference_db_name,
            &self.config.project_db_name,
        )
        .run(&mut processes)
        .await?;

        // === 步骤 5: 生物圈匹配 ===
        debug!("步骤 5: 生物圈匹配");
        let biosphere = BiosphereMatcher::new(
            &self.biosphere_repo,
            &self.tables,
            &self.config.biosphere_db_name,
            &self.config.reference_db_name,
        )
        .run(&mut processes)
        .await?;

        // === 步骤 6: 清理未链接交换流 ===
        debug!("步骤 6: 清理未链接交换流");
        let pruned = ExchangePruner.prune(&mut processes);

        // === 步骤 7: 公式交换流记录原始数量 ===
        debug!("步骤 7: 原始数量快照");
        record_original_amounts(&mut processes);

        // === 步骤 8: 落库 ===
        debug!("步骤 8: 落库");
        self.target_repo.initialize_schema().await?;
        let written = self
            .target_repo
            .write_project(&processes, &parsed.global_parameters)
            .await?;

        // === 步骤 9: 构造转换报告 ===
        let mut report = ConversionReport::new();
        report.summary.total_processes = processes.len();
        report.summary.decomposed_processes = decomposed.decomposed;
        report.summary.linked_technosphere = technosphere.linked;
        report.summary.linked_biosphere = biosphere.linked;
        report.summary.pruned_exchanges = pruned.removed;
        report.summary.written_processes = written;
        report.obsolete_processes = technosphere.obsolete;
        report.system_processes = technosphere.system;
        report.only_in_source = technosphere.only_in_source;
        report.created_biosphere_flows = biosphere.created;
        report.prune_warnings = pruned.warnings;
        report.completed_at = Utc::now();
        report.elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            total = report.summary.total_processes,
            written = report.summary.written_processes,
            linked_technosphere = report.summary.linked_technosphere,
            linked_biosphere = report.summary.linked_biosphere,
            pruned = report.summary.pruned_exchanges,
            elapsed_ms = report.elapsed_ms,
            "转换完成"
        );

        if report.needs_manual_reconciliation() {
            warn!(
                obsolete = report.obsolete_processes.len(),
                system = report.system_processes.len(),
                only_in_source = report.only_in_source.len(),
                created_biosphere = report.created_biosphere_flows.len(),
                prune_warnings = report.prune_warnings.len(),
                "存在需人工对账的诊断条目"
            );
        }

        Ok(report)
    }
}

/// 公式交换流在落库前记录当前数量,保证参数化项目可重算
fn record_original_amounts(processes: &mut [Process]) {
    for process in processes.iter_mut() {
        for exchange in process.exchanges.iter_mut() {
            if exchange.formula.is_some() {
                exchange.original_amount = Some(exchange.amount);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::Exchange;
    use crate::domain::types::ExchangeKind;

    #[test]
    fn test_record_original_amounts_only_for_formula_exchanges() {
        let mut process = Process::new("过程");
        let mut with_formula = Exchange::new("参数化输入", 4.2, ExchangeKind::Technosphere);
        with_formula.formula = Some("2*rate".to_string());
        process.exchanges.push(with_formula);
        process
            .exchanges
            .push(Exchange::new("普通输入", 1.0, ExchangeKind::Technosphere));
        let mut processes = vec![process];

        record_original_amounts(&mut processes);

        assert_eq!(processes[0].exchanges[0].original_amount, Some(4.2));
        assert_eq!(processes[0].exchanges[1].original_amount, None);
    }
}
