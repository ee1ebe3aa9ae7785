// ==========================================
// 清单项目桥接系统 - 导入模块错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv 文本导出）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 名称语法错误 =====
    #[error("交换流名称缺少 '|' 分隔符: {0}")]
    MissingNameDelimiter(String),

    #[error("交换流名称缺少地理位置花括号段: {0}")]
    MissingLocationBraces(String),

    // ===== 块结构错误 =====
    #[error("块结构错误 (行 {line}): {message}")]
    MalformedBlock { line: u64, message: String },

    #[error("数值格式错误 (行 {line}, 字段 {field}): 实际 {value}")]
    NumberFormatError {
        line: u64,
        field: String,
        value: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
