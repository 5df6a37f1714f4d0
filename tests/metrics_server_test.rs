// ==========================================
// 指标导出与指标服务集成测试
// ==========================================
// 测试目标: 规范 JSON → 指标文本 → HTTP 端点；图表数据提取
// ==========================================


use axum::body::Body;
use axum::http::{Request, StatusCode};
use lyriq_price::domain::ListingRecord;
use lyriq_price::importer::{json_store, ListingImporter};
use lyriq_price::report::{ChartDataExporter, MetricsExporter};
use lyriq_price::server::{create_router, JsonFileMetricsSource, ServerConfig, ServerState};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use test_helpers::{current_export, default_importer, write_temp_csv};
use tokio::sync::Mutex;
use tower::ServiceExt;

fn current_records() -> Vec<ListingRecord> {
    let file = write_temp_csv(&current_export()).expect("Failed to write fixture");
    default_importer().import_csv(file.path()).unwrap().records
}

fn primed_state(path: &Path) -> Arc<Mutex<ServerState>> {
    let source = JsonFileMetricsSource::new(path, MetricsExporter::new("lyriq", 2025));
    let mut state = ServerState::new(&ServerConfig::default(), Arc::new(source));
    state.prime().expect("initial metrics");
    Arc::new(Mutex::new(state))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[test]
fn test_metrics_from_imported_records() {
    let text = MetricsExporter::new("lyriq", 2025).render(&current_records(), 1_000);

    assert!(text.contains("lyriq_vehicles_total 4 1000"));
    assert!(text.contains("lyriq_vehicles_by_state{state=\"tx\"} 2 1000"));
    assert!(text.contains("lyriq_vehicles_by_drive_type{drive_type=\"awd\"} 3 1000"));
    assert!(text.contains("lyriq_new_vehicles 3 1000"));
    assert!(text.contains("lyriq_awd_ratio 0.7500 1000"));
    assert!(text.contains("lyriq_vehicles_by_price_range{range=\"over_60k\"} 2 1000"));
}

#[test]
fn test_chart_data_from_imported_records() {
    let records = current_records();
    let data = ChartDataExporter.extract(&records);

    assert_eq!(data.location_data[0].state, "TX");
    assert_eq!(data.location_data[0].count, 2);
    // 各州均不足 5 辆，配置分布表不含任何州
    assert!(data.trim_distribution.states.is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint_serves_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listings.json");
    json_store::write_records(&path, &current_records()).unwrap();

    let state = primed_state(&path);

    let (status, body) = get(create_router(state.clone()), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# TYPE lyriq_vehicles_total counter"));
    assert!(body.contains("lyriq_vehicles_total 4 "));

    let (status, body) = get(create_router(state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["last_update"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_reload_picks_up_new_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listings.json");
    let records = current_records();
    json_store::write_records(&path, &records).unwrap();

    let state = primed_state(&path);

    // 文件更新后，缓存未过期时仍返回旧文本
    json_store::write_records(&path, &records[..1]).unwrap();
    let (_, body) = get(create_router(state.clone()), "/metrics").await;
    assert!(body.contains("lyriq_vehicles_total 4 "));

    let (status, _) = get(create_router(state.clone()), "/reload").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(create_router(state.clone()), "/metrics").await;
    assert!(body.contains("lyriq_vehicles_total 1 "));
}

#[tokio::test]
async fn test_reload_with_empty_data_returns_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listings.json");
    json_store::write_records(&path, &current_records()).unwrap();

    let state = primed_state(&path);
    json_store::write_records(&path, &[]).unwrap();

    get(create_router(state.clone()), "/reload").await;
    let (status, body) = get(create_router(state.clone()), "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "No metrics available");
}
