// ==========================================
// Cusmon 表格数据管理 - 命令行入口
// ==========================================
// 子命令: tables / create-table / drop-table / schema / preview / import / config
// 所有操作通过会话 API 以 --db 指定的 SQLite 网关执行
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use cusmon_import::api::{ApiError, ImportApi, SessionApi, TableApi};
use cusmon_import::config::{ConfigManager, ImportConfigReader};
use cusmon_import::db::default_db_path;
use cusmon_import::i18n::{self, t, t_with_args};
use cusmon_import::logging;
use cusmon_import::session::SessionStore;

#[derive(Parser, Debug)]
#[command(name = "cusmon-import", version, about = "Schema-driven spreadsheet import into Cusmon tables")]
struct Cli {
    /// SQLite 数据库路径（默认: CUSMON_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 输出语言（en / zh-CN）
    #[arg(long, global = true)]
    lang: Option<String>,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出可见表
    Tables,
    /// 创建表
    CreateTable { table: String },
    /// 删除表及其记录
    DropTable { table: String },
    /// 查看或设置表模式
    Schema {
        table: String,
        /// 从 JSON 文件写入表模式（或完整表设置）
        #[arg(long)]
        set: Option<PathBuf>,
    },
    /// 预览导入结果（不写库）
    Preview {
        table: String,
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
    },
    /// 导入文件到表
    Import {
        table: String,
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
    },
    /// 查看或覆写系统配置
    Config {
        /// key=value
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_with_default(if cli.verbose { "debug" } else { "warn" });

    let locale = cli
        .lang
        .clone()
        .or_else(|| std::env::var("LANG").ok().and_then(|v| i18n::locale_from_env_value(&v).map(String::from)));
    if let Some(locale) = locale {
        i18n::set_locale(&locale);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", t_with_args("cli.error", &[("error", format!("{:#}", e).as_str())]));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_path = cli.db.unwrap_or_else(default_db_path);
    tracing::info!("{}", t_with_args("cli.using_db", &[("path", db_path.as_str())]));

    let config = Arc::new(ConfigManager::new(&db_path).map_err(|e| anyhow!(e.to_string()))?);

    if let Command::Config { set } = &cli.command {
        if let Some(pair) = set {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got {}", pair))?;
            config
                .set_config_value(key.trim(), value.trim())
                .map_err(|e| anyhow!(e.to_string()))?;
        }
        println!("{}", config.get_config_snapshot().map_err(|e| anyhow!(e.to_string()))?);
        return Ok(());
    }

    let session_file = config.get_session_file().await.map_err(|e| anyhow!(e.to_string()))?;
    let expiry = config.get_token_expiry_secs().await.map_err(|e| anyhow!(e.to_string()))?;
    let store = Arc::new(SessionStore::sqlite(session_file, expiry));

    let sessions = SessionApi::new(Arc::clone(&store));
    let username = std::env::var("USER").unwrap_or_else(|_| "cli".to_string());
    let connected = sessions
        .login(json!({"username": username, "password": "", "server": db_path}), None)
        .await?;
    let token = Some(connected.token.as_str());

    let result = execute(cli.command, &store, config, token, connected.tables).await;
    sessions.logout(&connected.token).await?;
    result
}

async fn execute(
    command: Command,
    store: &Arc<SessionStore>,
    config: Arc<ConfigManager>,
    token: Option<&str>,
    tables: Vec<String>,
) -> anyhow::Result<()> {
    let table_api = TableApi::new(Arc::clone(store));
    let import_api = ImportApi::new(Arc::clone(store), config as Arc<dyn ImportConfigReader>);

    match command {
        Command::Tables => {
            if tables.is_empty() {
                println!("{}", t("cli.no_tables"));
            } else {
                println!("{}", t("cli.tables_header"));
                for table in tables {
                    println!("  {}", table);
                }
            }
        }
        Command::CreateTable { table } => {
            table_api.create_table(token, &table).await?;
            println!("{}", t_with_args("cli.table_created", &[("table", table.as_str())]));
        }
        Command::DropTable { table } => {
            table_api.drop_table(token, &table).await?;
            println!("{}", t_with_args("cli.table_dropped", &[("table", table.as_str())]));
        }
        Command::Schema { table, set: Some(path) } => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            // 允许直接给出表模式，或给出 {"schema": ...} 形式的完整设置
            let body = if value.get("schema").is_some() { value } else { json!({ "schema": value }) };
            table_api.put_settings(token, &table, body).await?;
            let settings = table_api.get_settings(token, &table).await?;
            let fields = settings.schema.map(|s| s.len()).unwrap_or(0).to_string();
            println!("{}", t_with_args("cli.schema_saved", &[("table", table.as_str()), ("fields", fields.as_str())]));
        }
        Command::Schema { table, set: None } => {
            let settings = table_api.get_settings(token, &table).await?;
            match settings.schema {
                Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
                None => println!("{}", t_with_args("cli.schema_missing", &[("table", table.as_str())])),
            }
        }
        Command::Preview { table, file, sheet } => {
            let session = import_api.open_session(token, &table, &file, sheet.as_deref()).await?;
            println!("{}", t_with_args("cli.sheets", &[("sheets", session.sheet_names().join(", ").as_str())]));
            let anchor = session.anchor();
            println!(
                "{}",
                t_with_args(
                    "cli.sheet_selected",
                    &[
                        ("sheet", session.sheet_name()),
                        ("row", (anchor.row + 1).to_string().as_str()),
                        ("col", (anchor.col + 1).to_string().as_str()),
                    ],
                )
            );
            for (index, column) in session.columns().iter().enumerate() {
                let keys = session.mapping().get(index);
                if !keys.is_empty() {
                    println!("{}", t_with_args("cli.column_mapping", &[("column", column.as_str()), ("fields", keys.join(", ").as_str())]));
                }
            }
            let unmapped = session.unmapped_fields();
            if !unmapped.is_empty() {
                println!("{}", t_with_args("cli.unmapped_fields", &[("fields", unmapped.join(", ").as_str())]));
            }

            let session = import_api.preview(token, session).await?;
            let rendered = import_api.render_items(token, &session).await?;
            println!("{}", t_with_args("cli.preview_header", &[("count", rendered.rows.len().to_string().as_str())]));
            println!("{}", rendered.headers.join("\t"));
            for row in rendered.rows {
                println!("{}", row.join("\t"));
            }
        }
        Command::Import { table, file, sheet } => {
            let session = import_api.open_session(token, &table, &file, sheet.as_deref()).await?;
            let session = import_api.finish(token, session).await?;
            match import_api.commit(token, &table, &session).await {
                Ok(report) => println!(
                    "{}",
                    t_with_args(
                        "cli.import_done",
                        &[
                            ("count", report.imported.to_string().as_str()),
                            ("table", report.table.as_str()),
                            ("ms", report.elapsed_ms.to_string().as_str()),
                        ],
                    )
                ),
                Err(e) => {
                    if matches!(e, ApiError::DuplicateKey(_)) {
                        eprintln!("{}", t("cli.duplicate_hint"));
                    }
                    return Err(anyhow!(t_with_args("cli.import_failed", &[("error", e.to_string().as_str())])));
                }
            }
        }
        Command::Config { .. } => {}
    }
    Ok(())
}
