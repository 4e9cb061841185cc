//! Módula服务器主程序

mod config;

use clap::Parser;
use modula_core::Result;
use modula_database::{DatabasePool, DatabaseQueries};
use modula_web::{AppState, WebServer};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::config::ModulaConfig;

/// Módula服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "modula-server")]
#[command(about = "Módula - serviço de anamnese e transferência de pacientes")]
struct Args {
    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// PostgreSQL连接字符串
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .init();

    info!("Starting Modula server...");

    // 加载配置，命令行参数覆盖文件/环境变量
    let mut config = ModulaConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }

    info!("Modula server configuration:");
    info!("  host: {}", config.server.host);
    info!("  port: {}", config.server.port);
    info!("  database max connections: {}", config.database.max_connections);

    // 连接数据库并初始化表结构
    let db = DatabasePool::connect(&config.database.url, config.database.max_connections).await?;
    DatabaseQueries::new(&db).create_tables().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| modula_core::ModulaError::Config(format!("invalid listen address: {}", e)))?;

    let server = WebServer::new(addr, AppState::new(db));

    if let Err(e) = server.run().await {
        error!("server failed: {}", e);
        return Err(e);
    }

    Ok(())
}
