// ==========================================
// 清单项目桥接系统 - 多产出分解器
// ==========================================
// 职责: K 条产出流的联产过程 → K 个单产出过程
// 规则: 非产出流按 分配/100 缩放;过程级参数原样继承(不缩放)
// 红线: 编码在分解完成后统一分配,分解出的兄弟过程必须拿到不同身份
// ==========================================

use crate::domain::process::{Exchange, Process};
use crate::domain::types::{Allocation, ExchangeKind};
use crate::engine::error::{EngineError, EngineResult};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// DecomposeOutcome - 分解结果
// ==========================================
#[derive(Debug)]
pub struct DecomposeOutcome {
    pub processes: Vec<Process>,   // 全部过程(原单产出 + 分解产物,均已编码)
    pub decomposed: usize,         // 由联产分解产生的过程数
    pub repaired: usize,           // 补造产出流的过程数
}

// ==========================================
// MultiOutputDecomposer - 多产出分解器
// ==========================================
pub struct MultiOutputDecomposer;

impl MultiOutputDecomposer {
    /// 分解全部联产过程并统一分配编码
    ///
    /// # 参数
    /// - processes: 项目全部过程(取得所有权)
    ///
    /// # 返回
    /// - Ok(DecomposeOutcome): 分解后过程集
    /// - Err: 联产产出流缺少数值分配系数
    ///
    /// # 流程
    /// 1. 联产过程逐条产出流拆分,原过程移出活动集
    /// 2. 为每个过程分配全新 UUID hex 编码
    /// 3. 元数据修复: 无产出流的过程按自身元数据补造一条
    pub fn decompose(&self, processes: Vec<Process>) -> EngineResult<DecomposeOutcome> {
        let mut result: Vec<Process> = Vec::with_capacity(processes.len());
        let mut decomposed = 0;

        // === 步骤 1: 拆分联产过程 ===
        for process in processes {
            if !process.is_multi_output() {
                result.push(process);
                continue;
            }

            let productions: Vec<Exchange> =
                process.production_exchanges().cloned().collect();
            debug!(
                process = %process.name,
                outputs = productions.len(),
                "拆分联产过程"
            );

            for production in &productions {
                result.push(split_single_output(&process, production)?);
                decomposed += 1;
            }
            // 原联产过程到此移出活动集(不再入 result)
        }

        // === 步骤 2: 统一分配编码 ===
        for process in result.iter_mut() {
            process.code = Some(Uuid::new_v4().simple().to_string());
        }

        // === 步骤 3: 元数据修复 ===
        let mut repaired = 0;
        for process in result.iter_mut() {
            repair_metadata(process);
            if process.production_count() == 0 {
                synthesize_production(process);
                repaired += 1;
            }
        }

        info!(
            total = result.len(),
            decomposed = decomposed,
            repaired = repaired,
            "多产出分解完成"
        );

        Ok(DecomposeOutcome {
            processes: result,
            decomposed,
            repaired,
        })
    }
}

/// 按一条产出流切出单产出过程
fn split_single_output(original: &Process, production: &Exchange) -> EngineResult<Process> {
    let share = match production.allocation() {
        Some(Allocation::Numeric(value)) => *value / 100.0,
        Some(Allocation::ParameterRef(_)) => {
            // 分配解析阶段应已消除文本分配
            return Err(EngineError::TextualAllocationRemains {
                process: original.name.clone(),
            });
        }
        None => {
            return Err(EngineError::MissingAllocation {
                process: original.name.clone(),
                product: production.name.clone(),
            });
        }
    };

    // 非产出流深拷贝并按分配缩放
    let mut exchanges: Vec<Exchange> = original
        .exchanges
        .iter()
        .filter(|e| !e.kind.is_production())
        .cloned()
        .map(|mut e| {
            e.amount *= share;
            e
        })
        .collect();

    // 新的唯一产出流 = 原第 K 条产出
    exchanges.push(production.clone());

    Ok(Process {
        name: production.name.clone(),
        reference_product: Some(production.name.clone()),
        unit: production.unit.clone(),
        production_amount: Some(production.amount),
        exchanges,
        // 参数原样继承,不做缩放
        parameters: original.parameters.clone(),
        code: None,
    })
}

/// 用唯一产出流补全缺失的显示元数据
fn repair_metadata(process: &mut Process) {
    let production = match process.production_exchanges().next().cloned() {
        Some(production) if process.production_count() == 1 => production,
        _ => return,
    };

    if process.name.is_empty() {
        process.name = production.name.clone();
    }
    if process.reference_product.is_none() {
        process.reference_product = Some(production.name.clone());
    }
    if process.production_amount.is_none() {
        process.production_amount = Some(production.amount);
    }
    if process.unit.is_none() {
        process.unit = production.unit.clone();
    }
}

/// 为隐式定义产出的过程补造产出流
fn synthesize_production(process: &mut Process) {
    warn!(process = %process.name, "过程无产出流,按元数据补造");

    let amount = process.production_amount.unwrap_or(1.0);
    let mut production = Exchange::new(
        process.name.clone(),
        amount,
        ExchangeKind::Production { allocation: None },
    );
    production.unit = process.unit.clone();
    process.exchanges.push(production);

    if process.reference_product.is_none() {
        process.reference_product = Some(process.name.clone());
    }
    if process.production_amount.is_none() {
        process.production_amount = Some(amount);
    }
}
