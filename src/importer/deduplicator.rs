// ==========================================
// LYRIQ 车源价格追踪 - 去重器实现
// ==========================================
// 职责: 按去重键检测同批次内重复记录，首次出现者保留
// 去重键: 各字段字符串形式组成的元组（缺失字段为 ""）
// ==========================================

use crate::domain::listing::ListingRecord;
use crate::domain::types::DedupKey;
use crate::importer::field_extractor::canonical_column_name;
use crate::importer::listing_importer_trait::Deduplicator;
use std::collections::HashMap;

// ==========================================
// DroppedRecord - 被丢弃的重复记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub position: usize,       // 在输入序列中的位置（从 0 开始）
    pub first_position: usize, // 保留记录的位置
    pub vin: String,
    pub key: Vec<String>,
}

// ==========================================
// DedupOutcome - 去重结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: Vec<ListingRecord>,    // 保留记录（保持输入顺序）
    pub dropped: Vec<DroppedRecord>, // 重复记录（不包括第一次出现）
    pub kept_positions: Vec<usize>,  // 保留记录在输入序列中的位置
}

pub struct FirstWinsDeduplicator;

impl FirstWinsDeduplicator {
    /// 解析去重字段列表；AllFields 取首条记录的全部字段
    ///
    /// 字段名按表头同样的规则规范化（"VIN" → vin，"milege" → mileage）
    fn resolve_fields(records: &[ListingRecord], key: &DedupKey) -> Vec<String> {
        match key {
            DedupKey::Fields(fields) => {
                let fields: Vec<String> =
                    fields.iter().map(|f| canonical_column_name(f)).collect();
                if let Some(first) = records.first() {
                    let known = first.field_names();
                    for field in fields.iter().filter(|f| !known.contains(&f.as_str())) {
                        tracing::warn!(
                            field = %field,
                            "去重字段在记录中不存在，按空值参与去重"
                        );
                    }
                }
                fields
            }
            DedupKey::AllFields => records
                .first()
                .map(|r| r.field_names().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// 计算单条记录的去重键
pub fn composite_key(record: &ListingRecord, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| record.field_value(f).unwrap_or_default())
        .collect()
}

impl Deduplicator for FirstWinsDeduplicator {
    fn dedupe(&self, records: Vec<ListingRecord>, key: &DedupKey) -> DedupOutcome {
        let fields = Self::resolve_fields(&records, key);

        let mut first_occurrence: HashMap<Vec<String>, usize> = HashMap::new();
        let mut outcome = DedupOutcome::default();

        for (position, record) in records.into_iter().enumerate() {
            let record_key = composite_key(&record, &fields);

            if let Some(&first_position) = first_occurrence.get(&record_key) {
                // 发现重复：记录当前位置
                tracing::debug!(
                    position,
                    first_position,
                    vin = %record.vin,
                    "重复记录已丢弃"
                );
                outcome.dropped.push(DroppedRecord {
                    position,
                    first_position,
                    vin: record.vin,
                    key: record_key,
                });
            } else {
                // 首次出现：保留
                first_occurrence.insert(record_key, position);
                outcome.kept.push(record);
                outcome.kept_positions.push(position);
            }
        }

        outcome
    }
}
