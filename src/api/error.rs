// ==========================================
// Cusmon 表格数据管理 - API层错误类型
// ==========================================
// 职责: 统一 API 错误，将仓储/导入/会话错误转换为调用方可识别的类别
// 对应关系:
// - InvalidInput: 请求体或参数不合法 (原 HTTP 400)
// - Unauthorized: 无会话或会话已过期 (原 HTTP 403)
// ==========================================

use crate::domain::SchemaError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use crate::session::SessionError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("未登录或会话已过期")]
    Unauthorized,

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("主键重复: {0}")]
    DuplicateKey(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("导入失败: {0}")]
    ImportFailed(String),

    // ==========================================
    // 数据库错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DuplicateKey(msg) => ApiError::DuplicateKey(msg),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::SerializationError(msg) => {
                ApiError::InternalError(format!("文档序列化失败: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            ImportError::SheetNotFound(name) => ApiError::NotFound(format!("工作表不存在: {}", name)),
            ImportError::UnsupportedFormat(_) | ImportError::InvalidSchema(_) => {
                ApiError::InvalidInput(err.to_string())
            }
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportFailed(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            // 登录失败对调用方而言是请求错误
            SessionError::ConnectFailed(e) => ApiError::InvalidInput(format!("连接失败: {}", e)),
            SessionError::PersistFailed(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
