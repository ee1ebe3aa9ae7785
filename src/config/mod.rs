// ==========================================
// 清单项目桥接系统 - 配置层
// ==========================================
// 职责: 转换配置 + 名称对照表
// ==========================================

pub mod concordance;
pub mod conversion_config;
pub mod error;

// 重导出核心类型
pub use concordance::{BioRename, ConcordanceTables};
pub use conversion_config::{ConversionConfig, DEFAULT_DELIMITER};
pub use error::{ConfigError, ConfigResult};
