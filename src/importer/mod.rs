// ==========================================
// LYRIQ 车源价格追踪 - 导入层
// ==========================================
// 职责: CSV 导出文件 → 规范车源记录
// 支持: 分隔符嗅探、字段提取、空行与重复记录过滤、规范 JSON 读写
// ==========================================

// 模块声明
pub mod deduplicator;
pub mod error;
pub mod field_extractor;
pub mod file_parser;
pub mod json_store;
pub mod listing_importer_impl;
pub mod listing_importer_trait;
pub mod record_normalizer;

// 重导出核心类型
pub use deduplicator::{DedupOutcome, DroppedRecord, FirstWinsDeduplicator};
pub use error::{ImportError, ImportResult};
pub use file_parser::{sniff_delimiter, CsvParser, ParsedFile};
pub use listing_importer_impl::{ingestion_timestamp, ListingImporterImpl};
pub use record_normalizer::ListingNormalizer;

// 重导出 Trait 接口
pub use listing_importer_trait::{Deduplicator, FileParser, ListingImporter, RecordNormalizer};
