// ==========================================
// 清单项目桥接系统 - 名称对照表
// ==========================================
// 依据: IMPACT World+ 团队整理的基本流更名对照
// ==========================================
// 职责: 加载并查询五张 JSON 对照表
//   - obsolete_processes.json  源工具标记为废弃的过程全名
//   - simapro_biosphere.json   基本流更名三元组 (舱室, 旧名, 新名)
//   - list_of_countries.json   源工具区域化流可用的国家/区域名
//   - comps.json               顶层舱室 → 参考舱室代码
//   - subcomps.json            子舱室 → 参考子舱室代码
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

// ==========================================
// ConcordanceTables - 对照表集合
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConcordanceTables {
    pub obsolete: HashSet<String>,            // 废弃过程全名(含位置与过程名段)
    pub bio_renames: Vec<BioRename>,          // 基本流更名三元组
    pub countries: Vec<String>,               // 区域化流国家/区域名
    pub comps: HashMap<String, String>,       // 顶层舱室码表
    pub subcomps: HashMap<String, String>,    // 子舱室码表
}

// ==========================================
// BioRename - 基本流更名条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BioRename {
    pub compartment: String,   // 参考舱室代码(更名仅在该舱室内生效)
    pub old_name: String,      // 当前(源工具)名称
    pub new_name: String,      // 参考列表中的名称
}

/// 更名表的磁盘格式: [舱室, 旧名, 新名] 三元组数组
#[derive(Deserialize)]
struct RawRename(String, String, String);

impl ConcordanceTables {
    /// 从数据目录加载全部对照表
    ///
    /// # 参数
    /// - data_dir: 含五个 JSON 文件的目录
    pub fn load(data_dir: &Path) -> ConfigResult<Self> {
        let obsolete: Vec<String> = load_json(&data_dir.join("obsolete_processes.json"))?;
        let raw_renames: Vec<RawRename> = load_json(&data_dir.join("simapro_biosphere.json"))?;
        let countries: Vec<String> = load_json(&data_dir.join("list_of_countries.json"))?;
        let comps: HashMap<String, String> = load_json(&data_dir.join("comps.json"))?;
        let subcomps: HashMap<String, String> = load_json(&data_dir.join("subcomps.json"))?;

        let tables = Self {
            obsolete: obsolete.into_iter().collect(),
            bio_renames: raw_renames
                .into_iter()
                .map(|RawRename(compartment, old_name, new_name)| BioRename {
                    compartment,
                    old_name,
                    new_name,
                })
                .collect(),
            countries,
            comps,
            subcomps,
        };

        info!(
            obsolete = tables.obsolete.len(),
            renames = tables.bio_renames.len(),
            countries = tables.countries.len(),
            "对照表加载完成"
        );

        Ok(tables)
    }

    /// 过程全名是否在废弃名单中
    pub fn is_obsolete(&self, full_name: &str) -> bool {
        self.obsolete.contains(full_name)
    }

    /// 查询基本流更名(按参考舱室代码过滤)
    pub fn rename_for(&self, compartment: &str, name: &str) -> Option<&str> {
        self.bio_renames
            .iter()
            .find(|r| r.old_name == name && r.compartment == compartment)
            .map(|r| r.new_name.as_str())
    }

    /// 剥离区域化流的国家后缀
    ///
    /// # 规则
    /// - 名称末段(最后一个逗号之后)恰为已知国家/区域名时剥离
    /// - 否则返回 None
    pub fn strip_country_suffix(&self, name: &str) -> Option<String> {
        let (prefix, suffix) = name.rsplit_once(", ")?;
        if self.countries.iter().any(|c| c == suffix) {
            Some(prefix.to_string())
        } else {
            None
        }
    }

    /// 顶层舱室翻译(源命名 → 参考代码)
    pub fn translate_compartment(&self, compartment: &str) -> Option<&str> {
        self.comps.get(compartment).map(String::as_str)
    }

    /// 子舱室翻译(源命名 → 参考代码)
    pub fn translate_subcompartment(&self, subcompartment: &str) -> Option<&str> {
        self.subcomps.get(subcompartment).map(String::as_str)
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    let text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::ParseError(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tables() -> ConcordanceTables {
        ConcordanceTables {
            obsolete: ["Old process {GLO}| obsolete thing".to_string()]
                .into_iter()
                .collect(),
            bio_renames: vec![BioRename {
                compartment: "air".to_string(),
                old_name: "Sulphur dioxide".to_string(),
                new_name: "Sulfur dioxide".to_string(),
            }],
            countries: vec!["FR".to_string(), "DE".to_string()],
            comps: [("Air".to_string(), "air".to_string())].into_iter().collect(),
            subcomps: [(
                "low. pop.".to_string(),
                "non-urban air or from high stacks".to_string(),
            )]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_is_obsolete() {
        let tables = sample_tables();
        assert!(tables.is_obsolete("Old process {GLO}| obsolete thing"));
        assert!(!tables.is_obsolete("Fresh process {GLO}| current thing"));
    }

    #[test]
    fn test_rename_is_compartment_scoped() {
        let tables = sample_tables();
        assert_eq!(
            tables.rename_for("air", "Sulphur dioxide"),
            Some("Sulfur dioxide")
        );
        // 更名只在登记的舱室内生效
        assert_eq!(tables.rename_for("water", "Sulphur dioxide"), None);
    }

    #[test]
    fn test_strip_country_suffix() {
        let tables = sample_tables();
        assert_eq!(
            tables.strip_country_suffix("Ammonia, FR").as_deref(),
            Some("Ammonia")
        );
        // 末段不是国家名时不剥离
        assert_eq!(tables.strip_country_suffix("Ammonia, as N"), None);
        assert_eq!(tables.strip_country_suffix("Ammonia"), None);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConcordanceTables::load(dir.path());
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
