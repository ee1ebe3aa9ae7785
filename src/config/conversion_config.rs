// ==========================================
// 清单项目桥接系统 - 转换配置
// ==========================================
// 职责: 运行一次转换所需的全部外部参数
// 存储: JSON 配置文件(路径由命令行给定)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 默认字段分隔符
pub const DEFAULT_DELIMITER: char = ';';

// ==========================================
// ConversionConfig - 转换配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    // ===== 数据库 =====
    pub reference_db_path: PathBuf,    // 参考数据库文件(活动 + 基本流,只读)
    pub target_db_path: PathBuf,       // 目标数据库文件(落库产物)

    // ===== 数据库命名(写入链接元组的库名) =====
    pub project_db_name: String,       // 迁移后项目库名
    pub reference_db_name: String,     // 参考活动库名(如 "ecoinvent3.6 cut-off")
    pub biosphere_db_name: String,     // 基本流库名(如 "biosphere3")

    // ===== 源文件 =====
    #[serde(default = "default_delimiter")]
    pub delimiter: char,               // 导出文件字段分隔符

    // ===== 数据表 =====
    pub data_dir: PathBuf,             // 对照表目录(废弃名单/更名表/国家表/舱室码表)
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl ConversionConfig {
    /// 从 JSON 配置文件加载
    ///
    /// # 参数
    /// - path: 配置文件路径
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let config: ConversionConfig = serde_json::from_str(&text)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 基本校验: 引用的文件与目录必须存在
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.reference_db_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.reference_db_path.display().to_string(),
            ));
        }
        if !self.data_dir.is_dir() {
            return Err(ConfigError::FileNotFound(
                self.data_dir.display().to_string(),
            ));
        }
        if self.project_db_name.trim().is_empty() {
            return Err(ConfigError::ValueError {
                key: "project_db_name".to_string(),
                message: "项目库名不能为空".to_string(),
            });
        }
        Ok(())
    }

    /// 分隔符的字节形式(csv 解析器需要)
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let ref_db = dir.path().join("reference.db");
        std::fs::File::create(&ref_db).unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();

        let config_path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&config_path).unwrap();
        write!(
            f,
            r#"{{
                "reference_db_path": "{}",
                "target_db_path": "{}",
                "project_db_name": "demo_project",
                "reference_db_name": "ecoinvent3.6 cut-off",
                "biosphere_db_name": "biosphere3",
                "data_dir": "{}"
            }}"#,
            ref_db.display(),
            dir.path().join("target.db").display(),
            data_dir.display()
        )
        .unwrap();

        let config = ConversionConfig::from_file(&config_path).unwrap();
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.project_db_name, "demo_project");
    }

    #[test]
    fn test_missing_config_file() {
        let result = ConversionConfig::from_file(Path::new("no_such_config.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
