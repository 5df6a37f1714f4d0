// ==========================================
// LYRIQ 车源价格追踪 - 车源导入器实现
// ==========================================
// 职责: 整合导入流程，从 CSV 文件到规范记录
// 流程: 解析 → 规范化（丢弃空行）→ 去重 → 汇总
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::listing::{DuplicateRecord, ImportOutcome, ImportSummary, RawRow};
use crate::importer::deduplicator::FirstWinsDeduplicator;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::CsvParser;
use crate::importer::listing_importer_trait::{
    Deduplicator, FileParser, ListingImporter, RecordNormalizer,
};
use crate::importer::record_normalizer::ListingNormalizer;
use chrono::Local;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// 记录时间戳格式（本地时间，微秒精度）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// 生成本次导入的统一时间戳
pub fn ingestion_timestamp() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

// ==========================================
// ListingImporterImpl - 车源导入器实现
// ==========================================
pub struct ListingImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    normalizer: Box<dyn RecordNormalizer>,
    deduplicator: Box<dyn Deduplicator>,
}

impl<C> ListingImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建新的 ListingImporter 实例
    ///
    /// # 参数
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - normalizer: 记录规范化器
    /// - deduplicator: 去重器
    pub fn new(
        config: C,
        file_parser: Box<dyn FileParser>,
        normalizer: Box<dyn RecordNormalizer>,
        deduplicator: Box<dyn Deduplicator>,
    ) -> Self {
        Self {
            config,
            file_parser,
            normalizer,
            deduplicator,
        }
    }

    /// 使用默认组件（CSV 解析 + 标准规范化 + 首次出现保留）
    pub fn with_defaults(config: C) -> Self {
        let normalizer = ListingNormalizer::from_config(&config);
        let parser = CsvParser::new(config.get_encoding());
        Self::new(
            config,
            Box::new(parser),
            Box::new(normalizer),
            Box::new(FirstWinsDeduplicator),
        )
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// 以指定时间戳导入原始行（测试可注入固定时间戳）
    pub fn import_rows_at(
        &self,
        rows: Vec<RawRow>,
        source_file: Option<String>,
        timestamp: &str,
        delimiter: &str,
    ) -> ImportOutcome {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let total_rows = rows.len();

        // === 步骤 2: 逐行规范化 ===
        debug!("步骤 2: 记录规范化");
        let mut records = Vec::with_capacity(total_rows);
        let mut row_numbers = Vec::with_capacity(total_rows);
        let mut empty_rows = 0;
        for row in &rows {
            match self.normalizer.normalize(row, timestamp) {
                Some(record) => {
                    records.push(record);
                    row_numbers.push(row.row_number);
                }
                None => {
                    debug!(row_number = row.row_number, "空行已丢弃");
                    empty_rows += 1;
                }
            }
        }
        info!(
            normalized = records.len(),
            empty_rows = empty_rows,
            "记录规范化完成"
        );

        // === 步骤 3: 去重 ===
        debug!("步骤 3: 去重");
        let dedup_key = self.config.get_dedup_key();
        let outcome = self.deduplicator.dedupe(records, &dedup_key);

        let duplicates: Vec<DuplicateRecord> = outcome
            .dropped
            .iter()
            .map(|d| DuplicateRecord {
                row_number: row_numbers.get(d.position).copied().unwrap_or(0),
                first_row_number: row_numbers.get(d.first_position).copied().unwrap_or(0),
                vin: d.vin.clone(),
            })
            .collect();
        info!(
            dedup_key = %dedup_key,
            retained = outcome.kept.len(),
            duplicates = duplicates.len(),
            "去重完成"
        );

        let summary = ImportSummary {
            run_id,
            source_file,
            parsed_at: timestamp.to_string(),
            delimiter: delimiter.to_string(),
            dedup_key,
            total_rows,
            empty_rows,
            duplicate_rows: duplicates.len(),
            retained_rows: outcome.kept.len(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };

        ImportOutcome {
            summary,
            records: outcome.kept,
            duplicates,
        }
    }
}

impl<C> ListingImporter for ListingImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 从 CSV 文件导入车源数据
    #[instrument(skip(self))]
    fn import_csv(&self, file_path: &Path) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let source = file_path.display().to_string();
        info!(file_path = %source, "开始导入车源数据");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let required = self.config.get_required_columns();
        let parsed = self.file_parser.parse(file_path, &required).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(
            total_rows = parsed.rows.len(),
            delimiter = %parsed.delimiter_label(),
            "文件解析完成"
        );

        let timestamp = ingestion_timestamp();
        let delimiter = parsed.delimiter_label();
        let mut outcome = self.import_rows_at(parsed.rows, Some(source), &timestamp, &delimiter);
        outcome.summary.elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            run_id = %outcome.summary.run_id,
            retained = outcome.summary.retained_rows,
            empty_rows = outcome.summary.empty_rows,
            duplicates = outcome.summary.duplicate_rows,
            elapsed_ms = outcome.summary.elapsed_ms,
            "车源数据导入完成"
        );
        Ok(outcome)
    }

    fn import_rows(&self, rows: Vec<RawRow>, source_file: Option<String>) -> ImportOutcome {
        self.import_rows_at(rows, source_file, &ingestion_timestamp(), ",")
    }
}
