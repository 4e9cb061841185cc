//! Web服务器

use axum::{
    routing::{get, post, put},
    Router,
};
use modula_anamnesis::AnamnesisEngine;
use modula_core::Result;
use modula_database::{DatabasePool, DatabaseQueries};
use modula_workflow::TransferProcessor;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::transfers;

/// 处理器共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub db: DatabasePool,
    pub engine: Arc<AnamnesisEngine>,
    pub transfers: Arc<TransferProcessor>,
}

impl AppState {
    pub fn new(db: DatabasePool) -> Self {
        Self {
            db,
            engine: Arc::new(AnamnesisEngine::new()),
            transfers: Arc::new(TransferProcessor::new()),
        }
    }

    pub fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.db)
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = Self::create_app(state);

        Self { addr, app }
    }

    fn create_app(state: AppState) -> Router {
        Router::new()
            // 根路径
            .route("/", get(handlers::api_root))
            // 健康检查（无需token）
            .route("/health", get(handlers::health))
            // API路由（需要认证）
            .nest("/api/v1", api_routes(state))
            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| modula_core::ModulaError::Internal(format!("web server failed: {}", e)))?;

        Ok(())
    }
}

/// API v1 路由
fn api_routes(state: AppState) -> Router {
    Router::new()
        // 病历
        .route(
            "/patients/:patient_id/anamnesis",
            get(handlers::get_or_create_anamnesis).post(handlers::create_anamnesis),
        )
        .route(
            "/anamnesis/:id/sections/:section",
            put(handlers::update_section),
        )
        .route("/anamnesis/:id/auto-save", post(handlers::auto_save))
        .route("/anamnesis/:id/complete", post(handlers::complete_anamnesis))
        .route("/anamnesis/pending", get(handlers::pending_anamneses))
        // 转诊
        .route("/transfers", post(transfers::request_transfer))
        .route("/transfers/bulk-action", post(transfers::bulk_action))
        .route("/transfers/:id/cancel", post(transfers::cancel_transfer))
        .route("/transfers/pending", get(transfers::pending_transfers))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
