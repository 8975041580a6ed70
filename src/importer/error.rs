// ==========================================
// Cusmon 表格数据管理 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 流水线本身不产生逐行错误；仅文件解码与
//       字段配置不一致会以错误形式出现
// ==========================================

use crate::domain::SchemaError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作簿不含任何工作表")]
    NoSheets,

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    // ===== 模式错误 =====
    #[error("字段配置不一致 (字段 {field}): {message}")]
    SchemaMismatch { field: String, message: String },

    #[error("表模式无效: {0}")]
    InvalidSchema(#[from] SchemaError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    pub fn schema_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::SchemaMismatch {
            field: field.into(),
            message: message.into(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
