// ==========================================
// LYRIQ 车源价格追踪 - HTTP 路由
// ==========================================
// GET  /metrics  Prometheus 文本（过期则刷新）
// GET  /health   健康检查
// GET|POST /reload 清空缓存，下次抓取时重新生成
// ==========================================

use crate::importer::error::ImportError;
use crate::server::ServerState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// 创建路由
pub fn create_router(state: Arc<Mutex<ServerState>>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .route("/reload", get(reload).post(reload))
        .with_state(state)
}

async fn metrics(State(state): State<Arc<Mutex<ServerState>>>) -> Response {
    let stale_source = {
        let guard = state.lock().await;
        guard
            .cache
            .is_stale(Instant::now())
            .then(|| guard.source.clone())
    };

    // 文件读取与渲染在阻塞线程池执行，不持有锁
    if let Some(source) = stale_source {
        let result = match tokio::task::spawn_blocking(move || source.compute()).await {
            Ok(result) => result,
            Err(e) => Err(ImportError::InternalError(format!("指标生成任务失败: {}", e))),
        };
        state.lock().await.cache.apply(Instant::now(), result);
    }

    match state.lock().await.cache.cached() {
        Some(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
            text.to_string(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No metrics available").into_response(),
    }
}

async fn health_check(State(state): State<Arc<Mutex<ServerState>>>) -> Json<serde_json::Value> {
    let last_update = state.lock().await.cache.last_update();
    Json(json!({
        "status": "healthy",
        "last_update": last_update,
        "version": crate::VERSION,
    }))
}

async fn reload(State(state): State<Arc<Mutex<ServerState>>>) -> Json<serde_json::Value> {
    state.lock().await.cache.invalidate();
    tracing::info!("指标缓存已清空");
    Json(json!({ "status": "reload_triggered" }))
}
