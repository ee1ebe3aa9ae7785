// ==========================================
// 清单项目桥接系统 - 命令行主入口
// ==========================================
// 用法: lci-bridge <导出文件.csv> <配置文件.json>
// ==========================================

use lci_bridge::config::{ConcordanceTables, ConversionConfig};
use lci_bridge::engine::ConversionPipeline;
use lci_bridge::repository::{
    BiosphereRepositoryImpl, ReferenceRepositoryImpl, TargetWriteRepositoryImpl,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    lci_bridge::logging::init();

    info!("==================================================");
    info!("{}", lci_bridge::APP_NAME);
    info!("系统版本: {}", lci_bridge::VERSION);
    info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        error!("用法: lci-bridge <导出文件.csv> <配置文件.json>");
        std::process::exit(2);
    }
    let export_file = PathBuf::from(&args[1]);
    let config_file = PathBuf::from(&args[2]);

    if let Err(e) = run(&export_file, &config_file).await {
        error!(error = %e, "转换失败");
        std::process::exit(1);
    }
}

async fn run(export_file: &PathBuf, config_file: &PathBuf) -> anyhow::Result<()> {
    // === 加载配置与对照表 ===
    let config = ConversionConfig::from_file(config_file)?;
    info!(
        reference_db = %config.reference_db_path.display(),
        target_db = %config.target_db_path.display(),
        "配置加载完成"
    );
    let tables = ConcordanceTables::load(&config.data_dir)?;

    // === 构建仓储 ===
    let reference_db_path = config.reference_db_path.display().to_string();
    let reference_repo = ReferenceRepositoryImpl::new(&reference_db_path)?;
    let biosphere_repo = BiosphereRepositoryImpl::new(&reference_db_path)?;
    let target_repo = TargetWriteRepositoryImpl::new(
        &config.target_db_path.display().to_string(),
        &config.project_db_name,
    )?;

    // === 执行转换 ===
    let pipeline = ConversionPipeline::new(
        reference_repo,
        biosphere_repo,
        target_repo,
        config,
        tables,
    );
    let report = pipeline.convert(export_file).await?;

    // === 输出诊断桶供人工对账 ===
    info!(
        total = report.summary.total_processes,
        written = report.summary.written_processes,
        elapsed_ms = report.elapsed_ms,
        "转换成功"
    );

    for entry in &report.obsolete_processes {
        warn!(name = %entry.name, origin = %entry.origin, amount = entry.amount, "已废弃过程引用");
    }
    for entry in &report.system_processes {
        warn!(name = %entry.name, origin = %entry.origin, amount = entry.amount, "系统聚合过程引用");
    }
    for entry in &report.only_in_source {
        warn!(name = %entry.name, origin = %entry.origin, amount = entry.amount, "仅存在于源工具的过程引用");
    }
    for entry in &report.created_biosphere_flows {
        warn!(
            name = %entry.name,
            compartment = %entry.categories.compartment,
            origin = %entry.origin,
            amount = entry.amount,
            "源工具自建基本流"
        );
    }

    if report.needs_manual_reconciliation() {
        warn!(
            diagnostics = report.diagnostic_count(),
            "以上条目需在目标数据库中人工重连"
        );
    } else {
        info!("全部交换流已解析,无需人工对账");
    }

    Ok(())
}
