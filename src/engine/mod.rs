// ==========================================
// LYRIQ 车源价格追踪 - 引擎层
// ==========================================
// 职责: 快照构建、VIN 集合对比、差异报告
// 红线: 引擎不读写文件，只处理规范记录
// ==========================================

pub mod diff_report;
pub mod error;
pub mod snapshot_differ;

// 重导出核心引擎
pub use diff_report::{CountEntry, DiffReport};
pub use error::{EngineError, EngineResult};
pub use snapshot_differ::{Snapshot, SnapshotDiff, SnapshotDiffer};
