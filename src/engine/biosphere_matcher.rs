// ==========================================
// 清单项目桥接系统 - 生物圈基本流匹配器
// ==========================================
// 依据: IMPACT World+ 团队整理的基本流更名对照
// ==========================================
// 职责: 基本流 (名称, 类别路径) → 参考基本流编码
// 顺序: 水流归一化 → 国家后缀剥离 → 直接查找 → 更名表重试 → 诊断桶
// 红线: 舱室码表缺条目是致命错误;完全未命中是可恢复分流
// ==========================================

use crate::config::concordance::ConcordanceTables;
use crate::domain::diagnostics::CreatedBiosphereFlow;
use crate::domain::process::{ExchangeLink, Process};
use crate::domain::reference::ElementaryFlow;
use crate::domain::types::{CategoryPath, ExchangeKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::biosphere_repo::BiosphereRepository;
use tracing::{debug, info};

/// 区域化水流前缀
const WATER_PREFIX: &str = "Water, ";

/// 资源类水流的规范名称
const WATER_RESOURCE_CANONICAL: &str = "Water, unspecified natural origin";

/// 排放类水流的规范名称
const WATER_EMISSION_CANONICAL: &str = "Water";

// ==========================================
// BiosphereOutcome - 匹配结果统计
// ==========================================
#[derive(Debug, Default)]
pub struct BiosphereOutcome {
    pub linked: usize,                         // 成功链接的生物圈流数
    pub created: Vec<CreatedBiosphereFlow>,    // 源工具自建基本流桶
}

// ==========================================
// BiosphereMatcher - 生物圈基本流匹配器
// ==========================================
pub struct BiosphereMatcher<'a, B>
where
    B: BiosphereRepository,
{
    repo: &'a B,
    tables: &'a ConcordanceTables,
    biosphere_db_name: String,
    reference_db_name: String,
}

impl<'a, B> BiosphereMatcher<'a, B>
where
    B: BiosphereRepository,
{
    /// 创建匹配器
    ///
    /// # 参数
    /// - repo: 基本流仓储
    /// - tables: 对照表
    /// - biosphere_db_name / reference_db_name: 链接元组使用的库名
    pub fn new(
        repo: &'a B,
        tables: &'a ConcordanceTables,
        biosphere_db_name: &str,
        reference_db_name: &str,
    ) -> Self {
        Self {
            repo,
            tables,
            biosphere_db_name: biosphere_db_name.to_string(),
            reference_db_name: reference_db_name.to_string(),
        }
    }

    /// 对全部过程的生物圈流执行匹配
    ///
    /// # 参数
    /// - processes: 已编码的过程列表(原位写入链接)
    ///
    /// # 返回
    /// - Ok(BiosphereOutcome): 链接统计 + 自建流诊断桶
    /// - Err: 舱室码表缺少条目
    pub async fn run(&self, processes: &mut [Process]) -> EngineResult<BiosphereOutcome> {
        let mut outcome = BiosphereOutcome::default();

        for i in 0..processes.len() {
            let owner_code = match processes[i].code.clone() {
                Some(code) => code,
                None => continue,
            };
            let owner_name = processes[i].name.clone();

            for j in 0..processes[i].exchanges.len() {
                let (raw_name, amount, categories, resolved) = {
                    let exchange = &processes[i].exchanges[j];
                    let categories = match &exchange.kind {
                        ExchangeKind::Biosphere { categories } => categories.clone(),
                        _ => continue,
                    };
                    (
                        exchange.name.clone(),
                        exchange.amount,
                        categories,
                        exchange.is_resolved(),
                    )
                };
                if resolved {
                    continue;
                }

                let name = self.normalize_name(&raw_name, &categories);

                match self.lookup(&name, &categories).await? {
                    Some(flow) => {
                        processes[i].exchanges[j].link = Some(ExchangeLink {
                            input: (self.biosphere_db_name.clone(), flow.code.clone()),
                            output: (self.reference_db_name.clone(), owner_code.clone()),
                        });
                        outcome.linked += 1;
                    }
                    None => {
                        debug!(
                            name = %name,
                            process = %owner_name,
                            "基本流完全未命中,进自建流诊断桶"
                        );
                        outcome.created.push(CreatedBiosphereFlow {
                            name,
                            categories,
                            origin: owner_name.clone(),
                            amount,
                        });
                    }
                }
            }
        }

        info!(
            linked = outcome.linked,
            created = outcome.created.len(),
            "生物圈匹配完成"
        );

        Ok(outcome)
    }

    /// 名称归一化: 区域化水流 → 规范名;区域化后缀 → 剥离
    fn normalize_name(&self, name: &str, categories: &CategoryPath) -> String {
        // 参考列表不区分区域化水流,按顶层类别归一化
        if name.starts_with(WATER_PREFIX) {
            return if categories.compartment == "Resources" {
                WATER_RESOURCE_CANONICAL.to_string()
            } else {
                WATER_EMISSION_CANONICAL.to_string()
            };
        }

        // 旧格式变体: 末段为国家/区域名时剥离
        if let Some(stripped) = self.tables.strip_country_suffix(name) {
            return stripped;
        }

        name.to_string()
    }

    /// 分级查找: 直接等值 → 更名表(检索缩小 → 全表等值 → 仅类别)
    async fn lookup(
        &self,
        name: &str,
        categories: &CategoryPath,
    ) -> EngineResult<Option<ElementaryFlow>> {
        let compartment = self
            .tables
            .translate_compartment(&categories.compartment)
            .ok_or_else(|| EngineError::UnknownCategory {
                segment: categories.compartment.clone(),
            })?;

        let subcompartment = match &categories.subcompartment {
            Some(segment) => Some(
                self.tables
                    .translate_subcompartment(segment)
                    .ok_or_else(|| EngineError::UnknownCategory {
                        segment: segment.clone(),
                    })?,
            ),
            None => None,
        };

        // === 直接等值查找 ===
        if let Some(flow) = self
            .repo
            .find_flow(name, compartment, subcompartment)
            .await?
        {
            return Ok(Some(flow));
        }

        // === 历史更名重试 ===
        let renamed = match self.tables.rename_for(compartment, name) {
            Some(new_name) => new_name.to_string(),
            None => return Ok(None),
        };

        // 1) 检索缩小后的等值匹配
        let candidates = self.repo.search_flows(&renamed).await?;
        if let Some(flow) = candidates
            .into_iter()
            .find(|f| f.name == renamed && f.categories_match(compartment, subcompartment))
        {
            return Ok(Some(flow));
        }

        // 2) 全表等值
        if let Some(flow) = self
            .repo
            .find_flow(&renamed, compartment, subcompartment)
            .await?
        {
            return Ok(Some(flow));
        }

        // 3) 仅按类别,名称退化为检索词
        let candidates = self.repo.search_flows(name).await?;
        Ok(candidates
            .into_iter()
            .find(|f| f.categories_match(compartment, subcompartment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::concordance::BioRename;
    use crate::domain::process::Exchange;
    use crate::repository::biosphere_repo_impl::BiosphereRepositoryImpl;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn tables() -> ConcordanceTables {
        ConcordanceTables {
            bio_renames: vec![BioRename {
                compartment: "air".to_string(),
                old_name: "Sulphur dioxide".to_string(),
                new_name: "Sulfur dioxide".to_string(),
            }],
            countries: vec!["FR".to_string()],
            comps: [
                ("Air".to_string(), "air".to_string()),
                ("Water".to_string(), "water".to_string()),
                ("Resources".to_string(), "natural resource".to_string()),
            ]
            .into_iter()
            .collect(),
            subcomps: [(
                "in water".to_string(),
                "in water".to_string(),
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        }
    }

    fn seeded_repo() -> BiosphereRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE elementary_flow (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                compartment TEXT NOT NULL,
                subcompartment TEXT
            );
            INSERT INTO elementary_flow VALUES
                ('f1', 'Carbon dioxide, fossil', 'air', NULL),
                ('f2', 'Water, unspecified natural origin', 'natural resource', 'in water'),
                ('f3', 'Water', 'water', NULL),
                ('f4', 'Sulfur dioxide', 'air', NULL),
                ('f5', 'Ammonia', 'air', NULL);
            "#,
        )
        .unwrap();
        BiosphereRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn process_with_flow(name: &str, compartment: &str, subcompartment: Option<&str>) -> Process {
        let mut process = Process::new("来源过程");
        process.code = Some("p1".to_string());
        process.exchanges.push(Exchange::new(
            name,
            1.5,
            ExchangeKind::Biosphere {
                categories: CategoryPath::new(
                    compartment,
                    subcompartment.map(str::to_string),
                ),
            },
        ));
        process
    }

    #[tokio::test]
    async fn test_direct_lookup() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        let mut processes = vec![process_with_flow("Carbon dioxide, fossil", "Air", None)];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 1);
        let link = processes[0].exchanges[0].link.as_ref().unwrap();
        assert_eq!(link.input, ("biosphere3".to_string(), "f1".to_string()));
        assert_eq!(link.output, ("ecoinvent".to_string(), "p1".to_string()));
    }

    #[tokio::test]
    async fn test_water_resource_canonicalization() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        // 顶层类别为 Resources 的区域化水流 → "Water, unspecified natural origin"
        let mut processes = vec![process_with_flow("Water, river", "Resources", Some("in water"))];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 1);
        assert_eq!(
            processes[0].exchanges[0].link.as_ref().unwrap().input.1,
            "f2".to_string()
        );
    }

    #[tokio::test]
    async fn test_water_emission_canonicalization() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        // 非 Resources 类别 → "Water"
        let mut processes = vec![process_with_flow("Water, cooling", "Water", None)];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 1);
        assert_eq!(
            processes[0].exchanges[0].link.as_ref().unwrap().input.1,
            "f3".to_string()
        );
    }

    #[tokio::test]
    async fn test_rename_table_retry() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        // "Sulphur dioxide" 直接查找无果,经更名表命中 "Sulfur dioxide"
        let mut processes = vec![process_with_flow("Sulphur dioxide", "Air", None)];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 1);
        assert_eq!(
            processes[0].exchanges[0].link.as_ref().unwrap().input.1,
            "f4".to_string()
        );
    }

    #[tokio::test]
    async fn test_country_suffix_stripped() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        let mut processes = vec![process_with_flow("Ammonia, FR", "Air", None)];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 1);
        assert_eq!(
            processes[0].exchanges[0].link.as_ref().unwrap().input.1,
            "f5".to_string()
        );
    }

    #[tokio::test]
    async fn test_total_miss_goes_to_created_bucket() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        let mut processes = vec![process_with_flow("Custom pollutant", "Air", None)];
        let outcome = matcher.run(&mut processes).await.unwrap();

        assert_eq!(outcome.linked, 0);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].name, "Custom pollutant");
        assert_eq!(outcome.created[0].origin, "来源过程");
        assert_eq!(outcome.created[0].amount, 1.5);
        // 未命中交换流保持未解析
        assert!(processes[0].exchanges[0].link.is_none());
    }

    #[tokio::test]
    async fn test_unknown_compartment_is_fatal() {
        let repo = seeded_repo();
        let tables = tables();
        let matcher = BiosphereMatcher::new(&repo, &tables, "biosphere3", "ecoinvent");

        let mut processes = vec![process_with_flow("Carbon dioxide, fossil", "Deep sea", None)];
        let result = matcher.run(&mut processes).await;
        assert!(matches!(result, Err(EngineError::UnknownCategory { .. })));
    }
}
