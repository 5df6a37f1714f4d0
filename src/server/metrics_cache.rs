// ==========================================
// LYRIQ 车源价格追踪 - 指标缓存
// ==========================================
// 职责: 缓存最近一次生成的指标文本，按有效期刷新
// 约定: 定时刷新失败时保留旧文本；reload 会清空缓存
// ==========================================

use crate::config::MetricsConfig;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::json_store;
use crate::report::MetricsExporter;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

// ==========================================
// MetricsSource - 指标来源
// ==========================================
pub trait MetricsSource: Send + Sync {
    /// 生成一份完整的指标文本
    ///
    /// # 返回
    /// - Err(NoData): 数据源没有任何记录
    fn compute(&self) -> ImportResult<String>;
}

/// 从规范 JSON 文件生成指标
pub struct JsonFileMetricsSource {
    path: PathBuf,
    exporter: MetricsExporter,
}

impl JsonFileMetricsSource {
    pub fn new(path: impl Into<PathBuf>, exporter: MetricsExporter) -> Self {
        Self {
            path: path.into(),
            exporter,
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &MetricsConfig) -> Self {
        Self::new(path, MetricsExporter::from_config(config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSource for JsonFileMetricsSource {
    fn compute(&self) -> ImportResult<String> {
        let records = json_store::read_records(&self.path)?;
        if records.is_empty() {
            return Err(ImportError::NoData(self.path.display().to_string()));
        }

        let text = self
            .exporter
            .render(&records, Utc::now().timestamp_millis());
        info!(
            path = %self.path.display(),
            records = records.len(),
            bytes = text.len(),
            "指标已重新生成"
        );
        Ok(text)
    }
}

// ==========================================
// MetricsCache
// ==========================================
#[derive(Debug, Clone)]
struct CachedMetrics {
    text: String,
    computed_at: Instant,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MetricsCache {
    staleness: Duration,
    entry: Option<CachedMetrics>,
}

impl MetricsCache {
    pub fn new(staleness: Duration) -> Self {
        Self {
            staleness,
            entry: None,
        }
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        match &self.entry {
            None => true,
            Some(entry) => now.saturating_duration_since(entry.computed_at) >= self.staleness,
        }
    }

    /// 立即重新生成；失败时缓存保持不变
    pub fn refresh(&mut self, now: Instant, source: &dyn MetricsSource) -> ImportResult<()> {
        let text = source.compute()?;
        self.store(now, text);
        Ok(())
    }

    /// 写入在锁外生成的指标文本
    pub fn store(&mut self, now: Instant, text: String) {
        self.entry = Some(CachedMetrics {
            text,
            computed_at: now,
            updated_at: Utc::now(),
        });
    }

    /// 处理一次刷新结果；失败时沿用旧文本
    pub fn apply(&mut self, now: Instant, result: ImportResult<String>) {
        match result {
            Ok(text) => self.store(now, text),
            Err(e) => {
                warn!(error = %e, has_cached = self.entry.is_some(), "指标刷新失败，沿用缓存");
            }
        }
    }

    /// 取缓存文本，过期则先刷新
    ///
    /// # 返回
    /// - None: 从未成功生成过（或已被 invalidate 且刷新失败）
    pub fn get_or_refresh(&mut self, now: Instant, source: &dyn MetricsSource) -> Option<&str> {
        if self.is_stale(now) {
            self.apply(now, source.compute());
        }
        self.cached()
    }

    pub fn cached(&self) -> Option<&str> {
        self.entry.as_ref().map(|e| e.text.as_str())
    }

    /// 最近一次成功生成的 Unix 秒；从未生成返回 0
    pub fn last_update(&self) -> i64 {
        self.entry.as_ref().map(|e| e.updated_at.timestamp()).unwrap_or(0)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 依次返回预设结果的来源
    struct ScriptedSource {
        results: Mutex<Vec<ImportResult<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(mut results: Vec<ImportResult<String>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetricsSource for ScriptedSource {
        fn compute(&self) -> ImportResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ImportError::NoData("exhausted".to_string())))
        }
    }

    #[test]
    fn test_fresh_cache_is_not_recomputed() {
        let source = ScriptedSource::new(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let mut cache = MetricsCache::new(Duration::from_secs(300));
        let t0 = Instant::now();

        assert_eq!(cache.get_or_refresh(t0, &source), Some("a"));
        assert_eq!(cache.get_or_refresh(t0 + Duration::from_secs(10), &source), Some("a"));
        assert_eq!(source.calls(), 1);
        assert!(cache.last_update() > 0);
    }

    #[test]
    fn test_stale_cache_is_recomputed() {
        let source = ScriptedSource::new(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let mut cache = MetricsCache::new(Duration::from_secs(300));
        let t0 = Instant::now();

        cache.get_or_refresh(t0, &source);
        assert_eq!(cache.get_or_refresh(t0 + Duration::from_secs(300), &source), Some("b"));
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_stale_text() {
        let source = ScriptedSource::new(vec![
            Ok("a".to_string()),
            Err(ImportError::NoData("x".to_string())),
        ]);
        let mut cache = MetricsCache::new(Duration::from_secs(1));
        let t0 = Instant::now();

        cache.get_or_refresh(t0, &source);
        assert_eq!(cache.get_or_refresh(t0 + Duration::from_secs(5), &source), Some("a"));
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let source = ScriptedSource::new(vec![Ok("a".to_string())]);
        let mut cache = MetricsCache::new(Duration::from_secs(300));
        let t0 = Instant::now();

        cache.get_or_refresh(t0, &source);
        cache.invalidate();
        assert_eq!(cache.cached(), None);
        assert_eq!(cache.last_update(), 0);
        // 刷新失败后无可用文本
        assert_eq!(cache.get_or_refresh(t0, &source), None);
    }

    #[test]
    fn test_apply_keeps_text_on_error() {
        let mut cache = MetricsCache::new(Duration::from_secs(1));
        let t0 = Instant::now();

        cache.apply(t0, Ok("a".to_string()));
        cache.apply(t0, Err(ImportError::NoData("x".to_string())));
        assert_eq!(cache.cached(), Some("a"));
        assert!(!cache.is_stale(t0));
    }

    #[test]
    fn test_json_source_rejects_empty_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "[]").unwrap();

        let source = JsonFileMetricsSource::new(&path, MetricsExporter::new("lyriq", 2025));
        assert!(matches!(source.compute(), Err(ImportError::NoData(_))));
    }

    #[test]
    fn test_json_source_renders_metrics() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("listings.json");
        std::fs::write(&path, r#"[{"vin": "A1", "trim": "Tech", "price": 45000}]"#).unwrap();

        let source = JsonFileMetricsSource::new(&path, MetricsExporter::new("lyriq", 2025));
        let text = source.compute().unwrap();
        assert!(text.contains("lyriq_vehicles_total 1 "));
    }
}
