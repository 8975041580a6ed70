// ==========================================
// Cusmon 表格数据管理 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入与会话所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 日期字段未配置 import.dateFormat 时使用的解析格式
    ///
    /// # 默认值
    /// - DD-MM-YYYY
    async fn get_default_date_format(&self) -> ConfigResult<String>;

    /// 预览生成的记录条数
    ///
    /// # 默认值
    /// - 5
    async fn get_preview_rows(&self) -> ConfigResult<usize>;

    /// 记录列表返回的最大条数
    ///
    /// # 默认值
    /// - 100
    async fn get_items_limit(&self) -> ConfigResult<usize>;

    /// 会话令牌有效期（秒）
    ///
    /// # 默认值
    /// - 86400
    async fn get_token_expiry_secs(&self) -> ConfigResult<i64>;

    /// 会话持久化文件路径
    ///
    /// # 默认值
    /// - ./connections.json
    async fn get_session_file(&self) -> ConfigResult<String>;
}
