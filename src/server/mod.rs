// ==========================================
// LYRIQ 车源价格追踪 - 指标 HTTP 服务
// ==========================================
// 职责: 以 Prometheus 抓取端点的形式提供规范 JSON 的指标
// 约定: 启动前必须成功生成一次指标，否则拒绝启动
// ==========================================

pub mod metrics_cache;
pub mod routes;

pub use metrics_cache::{JsonFileMetricsSource, MetricsCache, MetricsSource};
pub use routes::create_router;

use crate::config::MetricsConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub interval: Duration, // 指标缓存有效期
}

impl ServerConfig {
    pub fn from_metrics_config(config: &MetricsConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_metrics_config(&MetricsConfig::default())
    }
}

/// 共享状态
pub struct ServerState {
    pub cache: MetricsCache,
    pub source: Arc<dyn MetricsSource>,
}

impl ServerState {
    pub fn new(config: &ServerConfig, source: Arc<dyn MetricsSource>) -> Self {
        Self {
            cache: MetricsCache::new(config.interval),
            source,
        }
    }

    /// 首次生成指标；失败即返回错误
    pub fn prime(&mut self) -> Result<()> {
        self.cache
            .refresh(Instant::now(), &*self.source)
            .context("初始指标生成失败")
    }
}

/// 启动指标服务
pub async fn run_server(config: ServerConfig, source: Arc<dyn MetricsSource>) -> Result<()> {
    tracing::info!(
        bind = %config.bind_addr(),
        interval_secs = config.interval.as_secs(),
        "启动指标服务"
    );

    let mut state = ServerState::new(&config, source);
    state.prime()?;

    let app = create_router(Arc::new(Mutex::new(state)));
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("无法绑定地址 {}", config.bind_addr()))?;

    tracing::info!("指标端点: /metrics  健康检查: /health  强制刷新: /reload");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportError;
    use crate::importer::ImportResult;

    struct EmptySource;

    impl MetricsSource for EmptySource {
        fn compute(&self) -> ImportResult<String> {
            Err(ImportError::NoData("empty".to_string()))
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.interval, Duration::from_secs(300));
    }

    #[test]
    fn test_prime_fails_without_data() {
        let mut state = ServerState::new(&ServerConfig::default(), Arc::new(EmptySource));
        let err = state.prime().unwrap_err();
        assert!(format!("{:#}", err).contains("无可用数据"));
    }

    #[tokio::test]
    async fn test_run_server_refuses_to_start_without_data() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            interval: Duration::from_secs(1),
        };
        assert!(run_server(config, Arc::new(EmptySource)).await.is_err());
    }
}
