// ==========================================
// 清单项目桥接系统 - 技术圈参考匹配器
// ==========================================
// 依据: ecoinvent 3 活动命名规范
// ==========================================
// 职责: 复合交换流名称 → 参考数据库活动编码
// 结构: 有序规则表(判定 + 改写 + 检索策略),首条命中即生效
// 红线: 已命中规则的改写分支检索无果是致命错误,属规则表缺口
// ==========================================

use crate::config::concordance::ConcordanceTables;
use crate::domain::diagnostics::UnresolvedProcessRef;
use crate::domain::process::{ExchangeLink, Process};
use crate::domain::reference::ReferenceActivity;
use crate::engine::error::{EngineError, EngineResult};
use crate::importer::name_parser::{
    has_composite_delimiter, parse_composite_name, ParsedExchangeName,
};
use crate::repository::reference_repo::ReferenceRepository;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 系统聚合过程的标记子串
const SYSTEM_MARKER: &str = "Cut-off, S";

/// 仅存在于源工具、参考数据库无对应记录的参考产品
const SOURCE_ONLY_PRODUCTS: [&str; 2] = [
    "Diesel, burned in diesel-electric generating set",
    "Sulfidic tailing, off-site",
];

/// 回收处理标记(仅存在于源工具)
const RECYCLING_MARKER: &str = "recycling of";

/// 裸连接词过程名
const CONNECTOR_NAMES: [&str; 3] = ["market for", "market group for", "treatment of"];

/// 泛型市场后缀
const GENERIC_MARKET_SUFFIX: &str = " to generic market for";

/// 拼写修正: 源工具写法 → 参考数据库写法
const GRAVEL_QUARRY_CORRECTED: &str = "gravel and sand quarry operation";

// ==========================================
// 规则表类型
// ==========================================

/// 规则判定的输入视图
pub struct RuleInput<'a> {
    pub raw_name: &'a str,                  // 交换流完整名称
    pub parsed: &'a ParsedExchangeName,     // 三段解析结果
    pub tables: &'a ConcordanceTables,      // 对照表
}

/// 分流目标桶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticBucket {
    Obsolete,       // 已废弃过程
    System,         // 系统聚合过程
    OnlyInSource,   // 仅存在于源工具
}

/// 候选过滤判定(作用于位置过滤检索的结果)
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateTest {
    /// 候选名称与改写名不区分大小写等值
    NameEqualsIgnoreCase(String),
    /// 候选名称包含子串
    NameContains(String),
    /// 候选名称等值 + 候选参考产品与源参考产品等值(不区分大小写)
    NameEqualsWithProduct { name: String },
    /// 候选名称去 production 压缩后与源参考产品压缩形式等值
    SqueezedNameEqualsProduct,
}

/// 兜底全表扫描策略
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackScan {
    /// (名称, 参考产品, 位置) 等值查找
    Exact { name: String },
    /// 压缩等值 + 候选名称含 production + 位置等值
    SqueezedContainsProduction,
    /// 候选参考产品等值 + 压缩等值 + 位置等值
    SqueezedWithProduct,
}

/// 检索计划: 规则改写的产物
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub rule: &'static str,                 // 规则标识(错误报告用)
    pub display_name: String,               // 改写后的检索名(错误报告用)
    pub filtered: Option<CandidateTest>,    // 先行的位置过滤检索(可缺省)
    pub fallback: Option<FallbackScan>,     // 兜底全表扫描(可缺省)
}

/// 规则裁决
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    Route(DiagnosticBucket),   // 分流进诊断桶,不尝试链接
    Search(SearchPlan),        // 按计划检索参考数据库
    NoRule,                    // 无规则命中,保持未解析
}

/// 匹配规则: (判定, 裁决) 二元组,按声明顺序求值
pub struct MatchRule {
    pub id: &'static str,
    pub applies: fn(&RuleInput) -> bool,
    pub decide: fn(&RuleInput) -> MatchDecision,
}

/// 规则表(声明顺序即优先级)
static RULES: [MatchRule; 15] = [
    MatchRule { id: "obsolete-list", applies: is_obsolete, decide: route_obsolete },
    MatchRule { id: "system-marker", applies: is_system, decide: route_system },
    MatchRule { id: "source-only", applies: is_source_only, decide: route_only_in_source },
    MatchRule { id: "bare-connector", applies: is_bare_connector, decide: plan_bare_connector },
    MatchRule { id: "treatment-of-comma", applies: is_treatment_comma, decide: plan_treatment_comma },
    MatchRule { id: "transport-diesel", applies: is_transport_diesel, decide: plan_transport_diesel },
    MatchRule { id: "construction", applies: is_construction, decide: plan_construction },
    MatchRule { id: "quarry-operation", applies: is_quarry, decide: plan_quarry },
    MatchRule { id: "processing", applies: is_processing, decide: plan_processing },
    MatchRule { id: "gravel-quarry-spelling", applies: is_gravel_quarry, decide: plan_gravel_quarry },
    MatchRule { id: "ambiguous-tokens", applies: is_ambiguous, decide: plan_ambiguous },
    MatchRule { id: "no-production-token", applies: lacks_production_token, decide: plan_plain_name },
    MatchRule { id: "production-equals", applies: is_production_exact, decide: plan_production_equals },
    MatchRule { id: "production-prefix", applies: is_production_prefix, decide: plan_production_prefix },
    MatchRule { id: "production-substring", applies: has_production_token, decide: plan_plain_name },
];

/// 按规则表裁决一条交换流名称(首条命中即生效)
pub fn classify(input: &RuleInput) -> MatchDecision {
    for rule in &RULES {
        if (rule.applies)(input) {
            return (rule.decide)(input);
        }
    }
    MatchDecision::NoRule
}

// ===== 判定函数 =====

fn is_obsolete(input: &RuleInput) -> bool {
    input.tables.is_obsolete(input.raw_name)
}

fn is_system(input: &RuleInput) -> bool {
    input.raw_name.contains(SYSTEM_MARKER)
}

fn is_source_only(input: &RuleInput) -> bool {
    SOURCE_ONLY_PRODUCTS.contains(&input.parsed.reference_product.as_str())
        || input.parsed.process_name.contains(RECYCLING_MARKER)
}

fn is_bare_connector(input: &RuleInput) -> bool {
    let name = input.parsed.process_name.as_str();
    CONNECTOR_NAMES.contains(&name) || name.ends_with(GENERIC_MARKET_SUFFIX)
}

fn is_treatment_comma(input: &RuleInput) -> bool {
    input.parsed.process_name.contains("treatment of,")
}

fn is_transport_diesel(input: &RuleInput) -> bool {
    // "ransport" 同时覆盖 Transport/transport 两种写法
    input.parsed.process_name == "diesel" && input.parsed.reference_product.contains("ransport")
}

fn is_construction(input: &RuleInput) -> bool {
    input.parsed.process_name == "construction"
}

fn is_quarry(input: &RuleInput) -> bool {
    input.parsed.process_name == "quarry operation"
}

fn is_processing(input: &RuleInput) -> bool {
    input.parsed.process_name == "processing"
}

fn is_gravel_quarry(input: &RuleInput) -> bool {
    input.parsed.process_name == "gravel and quarry operation"
}

fn is_ambiguous(input: &RuleInput) -> bool {
    let name = &input.parsed.process_name;
    let product = &input.parsed.reference_product;
    name.contains(" in ")
        || name.contains(" as ")
        || product.contains(" or ")
        || product.contains(" from ")
}

fn lacks_production_token(input: &RuleInput) -> bool {
    !input.parsed.process_name.contains("production")
}

fn is_production_exact(input: &RuleInput) -> bool {
    input.parsed.process_name == "production"
}

fn is_production_prefix(input: &RuleInput) -> bool {
    input.parsed.process_name.starts_with("production")
        && input.parsed.process_name != "production"
}

fn has_production_token(input: &RuleInput) -> bool {
    input.parsed.process_name.contains("production")
}

// ===== 裁决函数 =====

fn route_obsolete(_input: &RuleInput) -> MatchDecision {
    MatchDecision::Route(DiagnosticBucket::Obsolete)
}

fn route_system(_input: &RuleInput) -> MatchDecision {
    MatchDecision::Route(DiagnosticBucket::System)
}

fn route_only_in_source(_input: &RuleInput) -> MatchDecision {
    MatchDecision::Route(DiagnosticBucket::OnlyInSource)
}

/// 裸连接词: 重组为 "<连接词> <参考产品>" 后两步检索
fn plan_bare_connector(input: &RuleInput) -> MatchDecision {
    let name = format!(
        "{} {}",
        input.parsed.process_name, input.parsed.reference_product
    );
    MatchDecision::Search(SearchPlan {
        rule: "bare-connector",
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// "treatment of," 逗号变体: 参考产品插入首个逗号前
fn plan_treatment_comma(input: &RuleInput) -> MatchDecision {
    let mut segments = input.parsed.process_name.splitn(3, ',');
    let head = segments.next().unwrap_or("");
    let second = segments.next().unwrap_or("");
    let name = format!("{} {},{}", head, input.parsed.reference_product, second);
    MatchDecision::Search(SearchPlan {
        rule: "treatment-of-comma",
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// 运输柴油变体: "<参考产品>, diesel"
fn plan_transport_diesel(input: &RuleInput) -> MatchDecision {
    let name = format!(
        "{}, {}",
        input.parsed.reference_product, input.parsed.process_name
    );
    MatchDecision::Search(SearchPlan {
        rule: "transport-diesel",
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// "construction": 位置过滤检索内做包含匹配,无兜底
fn plan_construction(input: &RuleInput) -> MatchDecision {
    MatchDecision::Search(SearchPlan {
        rule: "construction",
        display_name: input.parsed.process_name.clone(),
        filtered: Some(CandidateTest::NameContains(
            input.parsed.process_name.clone(),
        )),
        fallback: None,
    })
}

/// "quarry operation": 前置参考产品后两步检索
fn plan_quarry(input: &RuleInput) -> MatchDecision {
    let name = format!(
        "{} {}",
        input.parsed.reference_product, input.parsed.process_name
    );
    MatchDecision::Search(SearchPlan {
        rule: "quarry-operation",
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// "processing": 检索名直接取参考产品,只做等值扫描
fn plan_processing(input: &RuleInput) -> MatchDecision {
    let name = input.parsed.reference_product.clone();
    MatchDecision::Search(SearchPlan {
        rule: "processing",
        display_name: name.clone(),
        filtered: None,
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// 拼写修正: "gravel and quarry operation" → 参考写法,无兜底
fn plan_gravel_quarry(_input: &RuleInput) -> MatchDecision {
    MatchDecision::Search(SearchPlan {
        rule: "gravel-quarry-spelling",
        display_name: GRAVEL_QUARRY_CORRECTED.to_string(),
        filtered: Some(CandidateTest::NameEqualsWithProduct {
            name: GRAVEL_QUARRY_CORRECTED.to_string(),
        }),
        fallback: None,
    })
}

/// 歧义名称: 位置过滤检索不可靠,直接等值扫描
fn plan_ambiguous(input: &RuleInput) -> MatchDecision {
    let name = input.parsed.process_name.clone();
    MatchDecision::Search(SearchPlan {
        rule: "ambiguous-tokens",
        display_name: name.clone(),
        filtered: None,
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// 常规名称(不含/包含 production 子串): 原名两步检索
fn plan_plain_name(input: &RuleInput) -> MatchDecision {
    let name = input.parsed.process_name.clone();
    MatchDecision::Search(SearchPlan {
        rule: if name.contains("production") {
            "production-substring"
        } else {
            "no-production-token"
        },
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// 过程名恰为 "production": 去 production 压缩比较
fn plan_production_equals(input: &RuleInput) -> MatchDecision {
    if !input.parsed.reference_product.contains("production") {
        MatchDecision::Search(SearchPlan {
            rule: "production-equals",
            display_name: input.parsed.reference_product.clone(),
            filtered: Some(CandidateTest::SqueezedNameEqualsProduct),
            fallback: Some(FallbackScan::SqueezedContainsProduction),
        })
    } else {
        MatchDecision::Search(SearchPlan {
            rule: "production-equals",
            display_name: input.parsed.reference_product.clone(),
            filtered: None,
            fallback: Some(FallbackScan::SqueezedWithProduct),
        })
    }
}

/// "production..." 前缀: 前置参考产品后两步检索
fn plan_production_prefix(input: &RuleInput) -> MatchDecision {
    let name = format!(
        "{} {}",
        input.parsed.reference_product, input.parsed.process_name
    );
    MatchDecision::Search(SearchPlan {
        rule: "production-prefix",
        display_name: name.clone(),
        filtered: Some(CandidateTest::NameEqualsIgnoreCase(name.clone())),
        fallback: Some(FallbackScan::Exact { name }),
    })
}

/// 去 production 压缩形式(小写、去空格)
fn squeeze(value: &str) -> String {
    value.replace("production", "").to_lowercase().replace(' ', "")
}

// ==========================================
// TechnosphereOutcome - 匹配结果统计
// ==========================================
#[derive(Debug, Default)]
pub struct TechnosphereOutcome {
    pub linked: usize,                            // 成功链接的交换流数
    pub obsolete: Vec<UnresolvedProcessRef>,      // 已废弃过程桶
    pub system: Vec<UnresolvedProcessRef>,        // 系统聚合过程桶
    pub only_in_source: Vec<UnresolvedProcessRef>, // 仅存在于源工具桶
    pub unmatched: usize,                         // 无规则命中数(保持未解析)
}

// ==========================================
// TechnosphereMatcher - 技术圈参考匹配器
// ==========================================
pub struct TechnosphereMatcher<'a, R>
where
    R: ReferenceRepository,
{
    repo: &'a R,
    tables: &'a ConcordanceTables,
    reference_db_name: String,
    project_db_name: String,
}

impl<'a, R> TechnosphereMatcher<'a, R>
where
    R: ReferenceRepository,
{
    /// 创建匹配器
    ///
    /// # 参数
    /// - repo: 参考活动仓储
    /// - tables: 对照表
    /// - reference_db_name / project_db_name: 链接元组使用的库名
    pub fn new(
        repo: &'a R,
        tables: &'a ConcordanceTables,
        reference_db_name: &str,
        project_db_name: &str,
    ) -> Self {
        Self {
            repo,
            tables,
            reference_db_name: reference_db_name.to_string(),
            project_db_name: project_db_name.to_string(),
        }
    }

    /// 对全部过程的技术圈/产出流执行匹配
    ///
    /// # 参数
    /// - processes: 已编码的过程列表(原位写入链接)
    ///
    /// # 返回
    /// - Ok(TechnosphereOutcome): 链接统计 + 三个诊断桶
    /// - Err: 名称语法错误 / 已命中分支检索无果
    pub async fn run(&self, processes: &mut [Process]) -> EngineResult<TechnosphereOutcome> {
        // 项目内过程名 → 编码(自引用直接链接,不进规则表)
        let sibling_codes: HashMap<String, String> = processes
            .iter()
            .filter_map(|p| p.code.clone().map(|code| (p.name.clone(), code)))
            .collect();

        let mut outcome = TechnosphereOutcome::default();

        for i in 0..processes.len() {
            let owner_code = match processes[i].code.clone() {
                Some(code) => code,
                None => {
                    warn!(process = %processes[i].name, "过程缺少编码,跳过匹配");
                    continue;
                }
            };
            let owner_name = processes[i].name.clone();

            for j in 0..processes[i].exchanges.len() {
                let (name, amount, eligible, resolved) = {
                    let exchange = &processes[i].exchanges[j];
                    (
                        exchange.name.clone(),
                        exchange.amount,
                        exchange.kind.is_technosphere() || exchange.kind.is_production(),
                        exchange.is_resolved(),
                    )
                };
                if resolved || !eligible {
                    continue;
                }

                // 自引用: 直接链接到项目内兄弟过程的编码
                if let Some(code) = sibling_codes.get(&name) {
                    processes[i].exchanges[j].link = Some(ExchangeLink {
                        input: (self.project_db_name.clone(), code.clone()),
                        output: (self.reference_db_name.clone(), owner_code.clone()),
                    });
                    outcome.linked += 1;
                    continue;
                }

                // 非复合名不进匹配器
                if !has_composite_delimiter(&name) {
                    continue;
                }

                let parsed = parse_composite_name(&name)?;
                let input = RuleInput {
                    raw_name: &name,
                    parsed: &parsed,
                    tables: self.tables,
                };

                match classify(&input) {
                    MatchDecision::Route(bucket) => {
                        let entry = UnresolvedProcessRef {
                            name: name.clone(),
                            origin: owner_name.clone(),
                            amount,
                        };
                        match bucket {
                            DiagnosticBucket::Obsolete => outcome.obsolete.push(entry),
                            DiagnosticBucket::System => outcome.system.push(entry),
                            DiagnosticBucket::OnlyInSource => {
                                outcome.only_in_source.push(entry)
                            }
                        }
                        debug!(name = %name, bucket = ?bucket, "交换流分流进诊断桶");
                    }
                    MatchDecision::Search(plan) => {
                        let activity = self.execute_plan(&plan, &parsed).await?;
                        processes[i].exchanges[j].link = Some(ExchangeLink {
                            input: (self.reference_db_name.clone(), activity.code.clone()),
                            output: (self.reference_db_name.clone(), owner_code.clone()),
                        });
                        outcome.linked += 1;
                    }
                    MatchDecision::NoRule => {
                        warn!(
                            process_index = i,
                            exchange_index = j,
                            name = %parsed.process_name,
                            reference_product = %parsed.reference_product,
                            location = %parsed.location,
                            "无规则命中,交换流保持未解析"
                        );
                        outcome.unmatched += 1;
                    }
                }
            }
        }

        info!(
            linked = outcome.linked,
            obsolete = outcome.obsolete.len(),
            system = outcome.system.len(),
            only_in_source = outcome.only_in_source.len(),
            unmatched = outcome.unmatched,
            "技术圈匹配完成"
        );

        Ok(outcome)
    }

    /// 执行检索计划: 位置过滤检索 → 兜底全表扫描
    async fn execute_plan(
        &self,
        plan: &SearchPlan,
        parsed: &ParsedExchangeName,
    ) -> EngineResult<ReferenceActivity> {
        if let Some(test) = &plan.filtered {
            let candidates = self
                .repo
                .search_activities(&parsed.reference_product, Some(&parsed.location))
                .await?;
            if let Some(hit) = candidates
                .into_iter()
                .find(|c| candidate_matches(test, c, parsed))
            {
                return Ok(hit);
            }
        }

        if let Some(scan) = &plan.fallback {
            match scan {
                FallbackScan::Exact { name } => {
                    if let Some(hit) = self
                        .repo
                        .find_by_exact(name, &parsed.reference_product, &parsed.location)
                        .await?
                    {
                        return Ok(hit);
                    }
                }
                FallbackScan::SqueezedContainsProduction => {
                    let target = squeeze(&parsed.reference_product);
                    let hit = self.repo.all_activities().await?.into_iter().find(|c| {
                        squeeze(&c.name) == target
                            && c.name.to_lowercase().contains("production")
                            && c.location == parsed.location
                    });
                    if let Some(hit) = hit {
                        return Ok(hit);
                    }
                }
                FallbackScan::SqueezedWithProduct => {
                    let target = squeeze(&parsed.reference_product);
                    let hit = self.repo.all_activities().await?.into_iter().find(|c| {
                        c.reference_product
                            .eq_ignore_ascii_case(&parsed.reference_product)
                            && c.location == parsed.location
                            && squeeze(&c.name) == target
                    });
                    if let Some(hit) = hit {
                        return Ok(hit);
                    }
                }
            }
        }

        Err(EngineError::ReferenceRecordMissing {
            rule: plan.rule,
            name: plan.display_name.clone(),
            reference_product: parsed.reference_product.clone(),
            location: parsed.location.clone(),
        })
    }
}

/// 候选过滤判定
fn candidate_matches(
    test: &CandidateTest,
    candidate: &ReferenceActivity,
    parsed: &ParsedExchangeName,
) -> bool {
    match test {
        CandidateTest::NameEqualsIgnoreCase(name) => candidate.name.eq_ignore_ascii_case(name),
        CandidateTest::NameContains(fragment) => candidate.name.contains(fragment),
        CandidateTest::NameEqualsWithProduct { name } => {
            candidate.name.eq_ignore_ascii_case(name)
                && candidate
                    .reference_product
                    .eq_ignore_ascii_case(&parsed.reference_product)
        }
        CandidateTest::SqueezedNameEqualsProduct => {
            squeeze(&candidate.name) == squeeze(&parsed.reference_product)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::Exchange;
    use crate::domain::types::{Allocation, ExchangeKind};
    use crate::repository::reference_repo_impl::ReferenceRepositoryImpl;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn tables() -> ConcordanceTables {
        ConcordanceTables {
            obsolete: ["Cement, obsolete {GLO}| legacy cement production".to_string()]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    fn classify_parts(raw_name: &str, tables: &ConcordanceTables) -> MatchDecision {
        let parsed = parse_composite_name(raw_name).unwrap();
        classify(&RuleInput {
            raw_name,
            parsed: &parsed,
            tables,
        })
    }

    // ===== 规则表裁决测试(纯函数) =====

    #[test]
    fn test_classify_obsolete_first() {
        let tables = tables();
        let decision =
            classify_parts("Cement, obsolete {GLO}| legacy cement production", &tables);
        assert_eq!(decision, MatchDecision::Route(DiagnosticBucket::Obsolete));
    }

    #[test]
    fn test_classify_system_marker() {
        let tables = tables();
        let decision = classify_parts(
            "Electricity {DE}| market for electricity | Cut-off, S",
            &tables,
        );
        assert_eq!(decision, MatchDecision::Route(DiagnosticBucket::System));
    }

    #[test]
    fn test_classify_source_only_products() {
        let tables = tables();
        let decision = classify_parts(
            "Sulfidic tailing, off-site {GLO}| treatment of sulfidic tailing",
            &tables,
        );
        assert_eq!(
            decision,
            MatchDecision::Route(DiagnosticBucket::OnlyInSource)
        );

        let decision =
            classify_parts("Aluminium scrap {RER}| recycling of aluminium", &tables);
        assert_eq!(
            decision,
            MatchDecision::Route(DiagnosticBucket::OnlyInSource)
        );
    }

    #[test]
    fn test_classify_bare_connector_rewrites_name() {
        let tables = tables();
        let decision = classify_parts(
            "Electricity, low voltage {RER}| market for",
            &tables,
        );
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "bare-connector");
                assert_eq!(plan.display_name, "market for Electricity, low voltage");
                assert!(plan.fallback.is_some());
            }
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_three_segment_name_ignores_unit_suffix() {
        // 完整导出格式带 "| Cut-off, U" 后缀,规则判定只看中段过程名
        let tables = tables();
        let decision = classify_parts(
            "Electricity, low voltage {RER}| market for | Cut-off, U",
            &tables,
        );
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "bare-connector");
                assert_eq!(plan.display_name, "market for Electricity, low voltage");
            }
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_generic_market_suffix_as_connector() {
        let tables = tables();
        let decision = classify_parts(
            "Waste paper {RER}| waste paper to generic market for",
            &tables,
        );
        match decision {
            MatchDecision::Search(plan) => assert_eq!(plan.rule, "bare-connector"),
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_treatment_comma_inserts_product() {
        let tables = tables();
        let decision = classify_parts(
            "Residue {CH}| treatment of, municipal incineration",
            &tables,
        );
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "treatment-of-comma");
                assert_eq!(
                    plan.display_name,
                    "treatment of Residue, municipal incineration"
                );
            }
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_processing_scans_exact_only() {
        let tables = tables();
        let decision = classify_parts("Stone wool {CH}| processing", &tables);
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "processing");
                assert!(plan.filtered.is_none());
                assert_eq!(
                    plan.fallback,
                    Some(FallbackScan::Exact {
                        name: "Stone wool".to_string()
                    })
                );
            }
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_ambiguous_skips_filtered_search() {
        let tables = tables();
        // " in " 在过程名内
        let decision = classify_parts(
            "Diesel {CH}| diesel burned in building machine",
            &tables,
        );
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "ambiguous-tokens");
                assert!(plan.filtered.is_none());
            }
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_classify_production_branches() {
        let tables = tables();

        // 名称不含 production
        let decision = classify_parts("Gravel {CH}| gravel crushing", &tables);
        match decision {
            MatchDecision::Search(plan) => assert_eq!(plan.rule, "no-production-token"),
            other => panic!("应产生检索计划: {:?}", other),
        }

        // 名称恰为 production
        let decision = classify_parts("Zinc {GLO}| production", &tables);
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "production-equals");
                assert_eq!(plan.filtered, Some(CandidateTest::SqueezedNameEqualsProduct));
            }
            other => panic!("应产生检索计划: {:?}", other),
        }

        // production 前缀
        let decision = classify_parts("Zinc {GLO}| production of primary", &tables);
        match decision {
            MatchDecision::Search(plan) => {
                assert_eq!(plan.rule, "production-prefix");
                assert_eq!(plan.display_name, "Zinc production of primary");
            }
            other => panic!("应产生检索计划: {:?}", other),
        }

        // production 子串
        let decision = classify_parts("Steel {RER}| steel production, converter", &tables);
        match decision {
            MatchDecision::Search(plan) => assert_eq!(plan.rule, "production-substring"),
            other => panic!("应产生检索计划: {:?}", other),
        }
    }

    #[test]
    fn test_squeeze_removes_production_and_spaces() {
        assert_eq!(squeeze("zinc production"), "zinc");
        assert_eq!(squeeze("Zinc"), "zinc");
        assert_eq!(squeeze("steel production, converter"), "steel,converter");
    }

    // ===== 检索执行测试(内存 SQLite) =====

    fn seeded_repo() -> ReferenceRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE activity (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                reference_product TEXT NOT NULL,
                location TEXT NOT NULL,
                unit TEXT
            );
            INSERT INTO activity VALUES
                ('c1', 'market for electricity, low voltage', 'electricity, low voltage', 'RER', 'kWh'),
                ('c2', 'steel production, converter, low-alloyed', 'steel, low-alloyed', 'RER', 'kg'),
                ('c3', 'zinc production', 'zinc', 'GLO', 'kg'),
                ('c4', 'building construction, multi-storey', 'building, multi-storey', 'CH', 'm3');
            "#,
        )
        .unwrap();
        ReferenceRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn coded_process(name: &str, code: &str, exchange_name: &str) -> Process {
        let mut process = Process::new(name);
        process.code = Some(code.to_string());
        process.reference_product = Some(name.to_string());
        process.exchanges.push(Exchange::new(
            name,
            1.0,
            ExchangeKind::Production {
                allocation: Some(Allocation::Numeric(100.0)),
            },
        ));
        process
            .exchanges
            .push(Exchange::new(exchange_name, 2.0, ExchangeKind::Technosphere));
        process
    }

    #[tokio::test]
    async fn test_run_links_connector_exchange() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut processes = vec![coded_process(
            "主过程",
            "p1",
            "Electricity, low voltage {RER}| market for",
        )];

        let outcome = matcher.run(&mut processes).await.unwrap();

        // 产出流自引用 + 连接词技术圈流
        assert_eq!(outcome.linked, 1 + 1);
        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        let link = tech.link.as_ref().unwrap();
        assert_eq!(link.input, ("ecoinvent".to_string(), "c1".to_string()));
        assert_eq!(link.output, ("ecoinvent".to_string(), "p1".to_string()));
    }

    #[tokio::test]
    async fn test_run_three_segment_name_links() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut processes = vec![coded_process(
            "主过程",
            "p1",
            "Electricity, low voltage {RER}| market for | Cut-off, U",
        )];

        matcher.run(&mut processes).await.unwrap();

        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        assert_eq!(tech.link.as_ref().unwrap().input.1, "c1".to_string());
    }

    #[tokio::test]
    async fn test_run_production_substring_match() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut processes = vec![coded_process(
            "主过程",
            "p1",
            "Steel, low-alloyed {RER}| steel production, converter, low-alloyed",
        )];

        matcher.run(&mut processes).await.unwrap();

        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        assert_eq!(
            tech.link.as_ref().unwrap().input.1,
            "c2".to_string()
        );
    }

    #[tokio::test]
    async fn test_run_production_equals_squeezed_match() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut processes = vec![coded_process("主过程", "p1", "Zinc {GLO}| production")];

        matcher.run(&mut processes).await.unwrap();

        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        assert_eq!(tech.link.as_ref().unwrap().input.1, "c3".to_string());
    }

    #[tokio::test]
    async fn test_run_routes_obsolete_without_link() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut processes = vec![coded_process(
            "来源过程",
            "p1",
            "Cement, obsolete {GLO}| legacy cement production",
        )];

        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.obsolete.len(), 1);
        assert_eq!(
            outcome.obsolete[0].name,
            "Cement, obsolete {GLO}| legacy cement production"
        );
        assert_eq!(outcome.obsolete[0].origin, "来源过程");
        assert_eq!(outcome.obsolete[0].amount, 2.0);
        // 分流的交换流不得携带链接
        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        assert!(tech.link.is_none());
    }

    #[tokio::test]
    async fn test_run_self_reference_links_to_sibling() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let mut sibling = Process::new("兄弟过程");
        sibling.code = Some("p2".to_string());
        let mut processes = vec![coded_process("主过程", "p1", "兄弟过程"), sibling];

        matcher.run(&mut processes).await.unwrap();

        let tech = processes[0]
            .exchanges
            .iter()
            .find(|e| e.kind.is_technosphere())
            .unwrap();
        let link = tech.link.as_ref().unwrap();
        assert_eq!(link.input, ("project".to_string(), "p2".to_string()));
        assert_eq!(link.output, ("ecoinvent".to_string(), "p1".to_string()));
    }

    #[tokio::test]
    async fn test_run_missing_reference_record_is_fatal() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        // 命中 bare-connector 规则但参考数据库无此记录
        let mut processes = vec![coded_process(
            "主过程",
            "p1",
            "Nonexistent product {RER}| market for",
        )];

        let result = matcher.run(&mut processes).await;
        assert!(matches!(
            result,
            Err(EngineError::ReferenceRecordMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_idempotent_match() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = TechnosphereMatcher::new(&repo, &tables, "ecoinvent", "project");

        let exchange_name = "Electricity, low voltage {RER}| market for";
        let mut first = vec![coded_process("主过程", "p1", exchange_name)];
        let mut second = vec![coded_process("主过程", "p1", exchange_name)];

        matcher.run(&mut first).await.unwrap();
        matcher.run(&mut second).await.unwrap();

        let code_of = |ps: &Vec<Process>| {
            ps[0].exchanges
                .iter()
                .find(|e| e.kind.is_technosphere())
                .and_then(|e| e.link.as_ref())
                .map(|l| l.input.1.clone())
        };
        assert_eq!(code_of(&first), code_of(&second));
        assert!(code_of(&first).is_some());
    }

    #[test]
    fn test_classify_is_total_over_parseable_names() {
        // production 子串二分(含/不含)使规则 12-15 构成兜底,
        // 任何可解析名称都应得到 Route 或 Search 裁决
        let tables = tables();
        let samples = [
            "Gravel {CH}| gravel crushing",
            "Zinc {GLO}| production",
            "Zinc {GLO}| production of primary",
            "Steel {RER}| steel production, converter",
            "Stone wool {CH}| processing",
            "Diesel {CH}| diesel burned in building machine",
        ];
        for raw in samples {
            assert_ne!(classify_parts(raw, &tables), MatchDecision::NoRule, "{raw}");
        }
    }
}
