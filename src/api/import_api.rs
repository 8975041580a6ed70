// ==========================================
// Cusmon 表格数据管理 - 导入 API
// ==========================================
// 职责: 打开表格文件 → 预览 → 生成全部记录 → 批量提交
// 说明:
// - 表模式取自表设置；被引用表在生成前一次性预取
// - 提交失败时会话中的记录保持不变，可直接重试提交
// ==========================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::session_api::require_gateway;
use crate::config::ImportConfigReader;
use crate::domain::{Item, TableSchema, TableSettings};
use crate::fields::{render_value, RenderContext};
use crate::importer::{FileParser, ImportSession, SessionConfig, UniversalFileParser};
use crate::repository::ItemRepository;
use crate::session::SessionStore;

/// 渲染后的预览表格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPreview {
    /// 字段显示名（表模式顺序）
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// 导入提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 目标表
    pub table: String,
    /// 数据来源工作表
    pub sheet: String,
    /// 写入的记录数
    pub imported: usize,
    /// 提交耗时（毫秒）
    pub elapsed_ms: i64,
}

async fn reference_data(
    gateway: &dyn ItemRepository,
    schema: &TableSchema,
) -> ApiResult<HashMap<String, Vec<Item>>> {
    let tables = schema.referenced_tables();
    if tables.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(gateway.fetch_tables(&tables).await?)
}

// ==========================================
// ImportApi - 导入 API
// ==========================================
pub struct ImportApi {
    store: Arc<SessionStore>,
    config: Arc<dyn ImportConfigReader>,
}

impl ImportApi {
    pub fn new(store: Arc<SessionStore>, config: Arc<dyn ImportConfigReader>) -> Self {
        Self { store, config }
    }

    async fn session_config(&self) -> ApiResult<SessionConfig> {
        let preview_rows = self
            .config
            .get_preview_rows()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;
        let default_date_format = self
            .config
            .get_default_date_format()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取配置失败: {}", e)))?;
        Ok(SessionConfig {
            preview_rows,
            default_date_format,
        })
    }

    /// 打开导入会话
    ///
    /// # 参数
    /// - table_name: 目标表（其表设置必须包含表模式）
    /// - file_path: .xlsx/.xlsm/.xls/.ods/.csv 文件
    /// - sheet: 工作表名（None 时使用第一个工作表）
    #[instrument(skip(self, token, file_path), fields(path = %file_path.as_ref().display()))]
    pub async fn open_session(
        &self,
        token: Option<&str>,
        table_name: &str,
        file_path: impl AsRef<Path>,
        sheet: Option<&str>,
    ) -> ApiResult<ImportSession> {
        if table_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("PathParam tableName missing".to_string()));
        }
        let gateway = require_gateway(&self.store, token).await?;
        let schema = gateway
            .get_settings(table_name)
            .await?
            .and_then(|settings| settings.schema)
            .ok_or_else(|| ApiError::NotFound(format!("表 {} 未配置表模式", table_name)))?;
        schema.validate()?;

        let workbook = UniversalFileParser.parse(file_path.as_ref())?;
        let session = ImportSession::open(workbook, schema, self.session_config().await?)?;
        let session = match sheet {
            Some(name) => session.select_sheet(name)?,
            None => session,
        };
        info!(table = table_name, sheet = session.sheet_name(), "导入会话已打开");
        Ok(session)
    }

    /// 生成预览记录
    pub async fn preview(&self, token: Option<&str>, session: ImportSession) -> ApiResult<ImportSession> {
        let gateway = require_gateway(&self.store, token).await?;
        let references = reference_data(gateway.as_ref(), session.schema()).await?;
        Ok(session.preview(&references)?)
    }

    /// 生成全部记录（不写库）
    pub async fn finish(&self, token: Option<&str>, session: ImportSession) -> ApiResult<ImportSession> {
        let gateway = require_gateway(&self.store, token).await?;
        let references = reference_data(gateway.as_ref(), session.schema()).await?;
        Ok(session.finish(&references)?)
    }

    /// 将会话中已生成的记录渲染为展示文本
    pub async fn render_items(&self, token: Option<&str>, session: &ImportSession) -> ApiResult<RenderedPreview> {
        let gateway = require_gateway(&self.store, token).await?;
        let schema = session.schema();
        let tables_items = reference_data(gateway.as_ref(), schema).await?;
        let mut tables_settings: HashMap<String, TableSettings> = HashMap::new();
        for table in schema.referenced_tables() {
            if let Some(settings) = gateway.get_settings(&table).await? {
                tables_settings.insert(table, settings);
            }
        }
        let ctx = RenderContext {
            tables_items: &tables_items,
            tables_settings: &tables_settings,
        };

        let headers = schema.iter().map(|(_, field)| field.display_name().to_string()).collect();
        let rows = session
            .items()
            .iter()
            .map(|item| {
                schema
                    .iter()
                    .map(|(key, field)| render_value(item.get(key), field, &ctx))
                    .collect()
            })
            .collect();
        Ok(RenderedPreview { headers, rows })
    }

    /// 提交会话中已生成的记录
    ///
    /// # 返回
    /// - Err(ApiError::DuplicateKey): 遇到重复 _id 即停止；之前的记录已写入
    #[instrument(skip(self, token, session), fields(items = session.items().len()))]
    pub async fn commit(
        &self,
        token: Option<&str>,
        table_name: &str,
        session: &ImportSession,
    ) -> ApiResult<ImportApiResponse> {
        let gateway = require_gateway(&self.store, token).await?;
        let started = Instant::now();
        let imported = match gateway.bulk_insert(table_name, session.items()).await {
            Ok(count) => count,
            Err(e) => {
                warn!(table = table_name, error = %e, "导入提交失败，记录保留在会话中");
                return Err(e.into());
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;
        info!(table = table_name, imported, elapsed_ms, "导入提交完成");

        Ok(ImportApiResponse {
            table: table_name.to_string(),
            sheet: session.sheet_name().to_string(),
            imported,
            elapsed_ms,
        })
    }

    /// 一次性导入：打开 → 生成全部记录 → 提交
    pub async fn import_file(
        &self,
        token: Option<&str>,
        table_name: &str,
        file_path: impl AsRef<Path>,
        sheet: Option<&str>,
    ) -> ApiResult<ImportApiResponse> {
        let session = self.open_session(token, table_name, file_path, sheet).await?;
        let session = self.finish(token, session).await?;
        self.commit(token, table_name, &session).await
    }
}
