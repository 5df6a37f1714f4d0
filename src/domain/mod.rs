// ==========================================
// LYRIQ 车源价格追踪 - 领域模型层
// ==========================================
// 职责: 定义车源记录、导入汇总、枚举类型
// 红线: 不含文件读写逻辑,不含快照对比逻辑
// ==========================================

pub mod listing;
pub mod types;

// 重导出核心类型
pub use listing::{
    DuplicateRecord, ImportOutcome, ImportSummary, ListingRecord, RawRow, CANONICAL_FIELDS,
    LYRIQ_V_MODEL, PHONE_PLACEHOLDER, V_SERIES_TRIM,
};
pub use types::{DedupKey, DriveType, DuplicateVinPolicy, OutputFormat, SnapshotRelation};
