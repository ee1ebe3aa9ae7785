// ==========================================
// 清单项目桥接系统 - 导入层
// ==========================================
// 职责: 源导出文件 → 内部过程/参数数据
// 流程: 预清洗 → 块解析 → (引擎层接管)
// ==========================================

// 模块声明
pub mod error;
pub mod name_parser;
pub mod project_parser;
pub mod source_cleaner;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use name_parser::{has_composite_delimiter, parse_composite_name, ParsedExchangeName};
pub use project_parser::{ParsedProject, ProjectParser};
pub use source_cleaner::SourceCleaner;
