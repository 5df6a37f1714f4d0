// ==========================================
// LYRIQ 车源价格追踪 - 报表层
// ==========================================
// 职责: 规范记录 → 图表数据 / Prometheus 指标文本
// 红线: 报表层只读记录，不修改、不过滤输入
// ==========================================

pub mod chart_data;
pub mod metrics_exporter;

pub use chart_data::{trim_color, ChartData, ChartDataExporter, StateSummary, TrimDistribution};
pub use metrics_exporter::{clean_label, render_families, MetricFamily, MetricKind, MetricsExporter};
