// ==========================================
// 清单项目桥接系统 - 分配参数解析器
// ==========================================
// 职责: 文本形式的分配系数 → 数值
// 查找顺序: 过程级参数 → 项目全局参数(均不区分大小写)
// 红线: 解析失败是致命错误,下游分配计算会静默算错数量
// ==========================================

use crate::domain::process::{Parameter, ParameterSet, Process};
use crate::domain::types::Allocation;
use crate::engine::error::{EngineError, EngineResult};
use tracing::{debug, info};

// ==========================================
// AllocationResolver - 分配参数解析器
// ==========================================
pub struct AllocationResolver;

impl AllocationResolver {
    /// 将全部文本分配系数替换为参数数值
    ///
    /// # 参数
    /// - processes: 项目全部过程(原位修改)
    /// - globals: 项目全局参数
    ///
    /// # 返回
    /// - Ok(usize): 完成替换的分配系数个数
    /// - Err: 参数在两个作用域中均不存在
    pub fn resolve(
        &self,
        processes: &mut [Process],
        globals: &ParameterSet,
    ) -> EngineResult<usize> {
        let mut substituted = 0;

        for process in processes.iter_mut() {
            // parameters 与 exchanges 为不相交字段,可同时借用
            let Process {
                name,
                parameters,
                exchanges,
                ..
            } = process;

            for exchange in exchanges.iter_mut() {
                let param_name = match exchange.allocation() {
                    Some(Allocation::ParameterRef(param_name)) => param_name.clone(),
                    _ => continue,
                };

                let value = lookup_parameter(parameters, globals, &param_name)
                    .map(|p| p.amount)
                    .ok_or_else(|| EngineError::UnresolvedAllocationParameter {
                        process: name.clone(),
                        parameter: param_name.clone(),
                    })?;

                debug!(
                    process = %name,
                    parameter = %param_name,
                    value = value,
                    "文本分配系数替换为数值"
                );
                exchange.set_allocation(Allocation::Numeric(value));
                substituted += 1;
            }
        }

        info!(substituted = substituted, "分配参数解析完成");
        Ok(substituted)
    }

    /// 后置校验: 重扫全部过程,确认无文本分配残留
    ///
    /// # 说明
    /// - 残留意味着解析器缺陷或不支持的项目形态,按致命断言处理
    pub fn verify_no_textual(&self, processes: &[Process]) -> EngineResult<()> {
        for process in processes {
            let has_textual = process
                .exchanges
                .iter()
                .any(|e| e.allocation().map(Allocation::is_textual).unwrap_or(false));

            if has_textual {
                return Err(EngineError::TextualAllocationRemains {
                    process: process.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// 参数查找: 过程级优先,全局兜底(均不区分大小写)
fn lookup_parameter<'a>(
    activity_parameters: &'a [Parameter],
    globals: &'a ParameterSet,
    name: &str,
) -> Option<&'a Parameter> {
    activity_parameters
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .or_else(|| globals.get(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::Exchange;
    use crate::domain::types::ExchangeKind;

    fn process_with_textual_allocation(param_name: &str) -> Process {
        let mut process = Process::new("联产过程");
        process.exchanges.push(Exchange::new(
            "产品A",
            1.0,
            ExchangeKind::Production {
                allocation: Some(Allocation::ParameterRef(param_name.to_string())),
            },
        ));
        process
    }

    #[test]
    fn test_resolve_from_activity_parameter() {
        let mut process = process_with_textual_allocation("alloc_a");
        process.parameters.push(Parameter::new("alloc_a", 60.0));
        let mut processes = vec![process];

        let resolver = AllocationResolver;
        let count = resolver
            .resolve(&mut processes, &ParameterSet::new())
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            processes[0].exchanges[0]
                .allocation()
                .and_then(|a| a.as_numeric()),
            Some(60.0)
        );
        // 后置校验应通过
        resolver.verify_no_textual(&processes).unwrap();
    }

    #[test]
    fn test_resolve_falls_back_to_global_parameter() {
        let mut globals = ParameterSet::new();
        globals.insert(Parameter::new("Global_Alloc", 25.0));
        let mut processes = vec![process_with_textual_allocation("global_alloc")];

        let resolver = AllocationResolver;
        resolver.resolve(&mut processes, &globals).unwrap();

        assert_eq!(
            processes[0].exchanges[0]
                .allocation()
                .and_then(|a| a.as_numeric()),
            Some(25.0)
        );
    }

    #[test]
    fn test_activity_parameter_shadows_global() {
        let mut globals = ParameterSet::new();
        globals.insert(Parameter::new("alloc_a", 99.0));
        let mut process = process_with_textual_allocation("alloc_a");
        process.parameters.push(Parameter::new("alloc_a", 60.0));
        let mut processes = vec![process];

        AllocationResolver.resolve(&mut processes, &globals).unwrap();

        assert_eq!(
            processes[0].exchanges[0]
                .allocation()
                .and_then(|a| a.as_numeric()),
            Some(60.0)
        );
    }

    #[test]
    fn test_unresolvable_parameter_is_fatal() {
        let mut processes = vec![process_with_textual_allocation("missing_param")];

        let result = AllocationResolver.resolve(&mut processes, &ParameterSet::new());
        assert!(matches!(
            result,
            Err(EngineError::UnresolvedAllocationParameter { .. })
        ));
    }

    #[test]
    fn test_verify_detects_residual_textual_allocation() {
        let processes = vec![process_with_textual_allocation("alloc_a")];
        let result = AllocationResolver.verify_no_textual(&processes);
        assert!(matches!(
            result,
            Err(EngineError::TextualAllocationRemains { .. })
        ));
    }

    #[test]
    fn test_numeric_allocation_untouched() {
        let mut process = Process::new("单产出过程");
        process.exchanges.push(Exchange::new(
            "产品",
            1.0,
            ExchangeKind::Production {
                allocation: Some(Allocation::Numeric(100.0)),
            },
        ));
        let mut processes = vec![process];

        let count = AllocationResolver
            .resolve(&mut processes, &ParameterSet::new())
            .unwrap();
        assert_eq!(count, 0);
    }
}
