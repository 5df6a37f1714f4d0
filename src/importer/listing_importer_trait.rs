// ==========================================
// LYRIQ 车源价格追踪 - 车源导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 文件解析 → 记录规范化 → 去重
// ==========================================

use crate::domain::listing::{ImportOutcome, ListingRecord, RawRow};
use crate::domain::types::DedupKey;
use crate::importer::deduplicator::DedupOutcome;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::ParsedFile;
use std::path::Path;

// ==========================================
// ListingImporter Trait
// ==========================================
// 用途: 车源导入主接口
// 实现者: ListingImporterImpl
pub trait ListingImporter {
    /// 从 CSV 文件导入车源数据
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 保留记录 + 被丢弃的重复记录 + 导入汇总
    /// - Err: 文件不存在、读取失败、缺少必需列
    ///
    /// # 导入流程
    /// 1. 文件读取与解析（分隔符嗅探、表头规范化）
    /// 2. 逐行规范化（空行丢弃）
    /// 3. 去重（首次出现者保留）
    fn import_csv(&self, file_path: &Path) -> ImportResult<ImportOutcome>;

    /// 导入已解析的原始行（不经过文件）
    fn import_rows(&self, rows: Vec<RawRow>, source_file: Option<String>) -> ImportOutcome;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 1）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - required_columns: 规范化后必须存在的列
    fn parse(&self, file_path: &Path, required_columns: &[String]) -> ImportResult<ParsedFile>;
}

// ==========================================
// RecordNormalizer Trait
// ==========================================
// 用途: 原始行 → 规范记录（阶段 2）
// 实现者: ListingNormalizer
pub trait RecordNormalizer: Send + Sync {
    /// 规范化单行
    ///
    /// # 返回
    /// - Some(record): 规范记录
    /// - None: 空行（所有单元格为空白）
    fn normalize(&self, row: &RawRow, timestamp: &str) -> Option<ListingRecord>;
}

// ==========================================
// Deduplicator Trait
// ==========================================
// 用途: 按去重键过滤重复记录（阶段 3）
// 实现者: FirstWinsDeduplicator
pub trait Deduplicator: Send + Sync {
    /// 去重（首次出现者保留，保持输入顺序）
    fn dedupe(&self, records: Vec<ListingRecord>, key: &DedupKey) -> DedupOutcome;
}
