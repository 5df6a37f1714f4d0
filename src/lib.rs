// ==========================================
// LYRIQ 车源价格追踪 - 核心库
// ==========================================
// 流程: CSV 导出 → 规范记录 → 快照对比 / 图表数据 / Prometheus 指标
// 系统定位: 离线批处理 + 只读指标服务
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与类型
pub mod domain;

// 导入层 - CSV 解析与规范化
pub mod importer;

// 引擎层 - 快照对比
pub mod engine;

// 报表层 - 图表数据与指标
pub mod report;

// 配置层 - 管道配置
pub mod config;

// 服务层 - 指标 HTTP 端点
pub mod server;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DedupKey, DriveType, DuplicateVinPolicy, OutputFormat, SnapshotRelation};

// 领域实体
pub use domain::{DuplicateRecord, ImportOutcome, ImportSummary, ListingRecord, RawRow};

// 导入
pub use importer::{ImportError, ImportResult, ListingImporter, ListingImporterImpl};

// 引擎
pub use engine::{DiffReport, EngineError, Snapshot, SnapshotDiff, SnapshotDiffer};

// 报表
pub use report::{ChartDataExporter, MetricsExporter};

// 配置
pub use config::{ConfigManager, PipelineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "LYRIQ 车源价格追踪";
