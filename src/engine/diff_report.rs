// ==========================================
// LYRIQ 车源价格追踪 - 快照差异报告
// ==========================================
// 职责: 将新增 / 下架 VIN 解析为完整记录，分别按配置、年款、地点统计
// 输入: 上一快照、当前快照、快照差异
// 输出: DiffReport（控制台文本或 JSON）
// ==========================================

use crate::domain::listing::ListingRecord;
use crate::domain::types::SnapshotRelation;
use crate::engine::snapshot_differ::{Snapshot, SnapshotDiff};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

/// 地点统计保留的条目数
pub const TOP_LOCATIONS: usize = 10;

// ==========================================
// CountEntry - 计数条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: usize,
}

// ==========================================
// DiffReport - 差异报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub previous_count: usize, // 上一快照唯一 VIN 数
    pub current_count: usize,  // 当前快照唯一 VIN 数
    pub added_count: usize,
    pub removed_count: usize,
    pub common_count: usize,
    pub net_change: i64,
    pub relation: SnapshotRelation,
    pub previous_empty_vins: usize,
    pub current_empty_vins: usize,
    pub added: Vec<ListingRecord>,   // 当前快照顺序
    pub removed: Vec<ListingRecord>, // 上一快照顺序
    pub added_by_trim: Vec<CountEntry>,
    pub added_by_year: Vec<CountEntry>,
    pub added_top_locations: Vec<CountEntry>,
    pub removed_by_trim: Vec<CountEntry>,
    pub removed_by_year: Vec<CountEntry>,
    pub removed_top_locations: Vec<CountEntry>,
}

impl DiffReport {
    /// 生成差异报告
    pub fn build(previous: &Snapshot, current: &Snapshot, diff: &SnapshotDiff) -> Self {
        let added: Vec<ListingRecord> = current
            .records()
            .iter()
            .filter(|r| diff.added.contains(&r.vin))
            .cloned()
            .collect();
        let removed: Vec<ListingRecord> = previous
            .records()
            .iter()
            .filter(|r| diff.removed.contains(&r.vin))
            .cloned()
            .collect();

        let (added_by_trim, added_by_year, added_top_locations) = breakdown(&added);
        let (removed_by_trim, removed_by_year, removed_top_locations) = breakdown(&removed);

        Self {
            previous_count: previous.len(),
            current_count: current.len(),
            added_count: diff.added.len(),
            removed_count: diff.removed.len(),
            common_count: diff.common.len(),
            net_change: diff.net_change(),
            relation: diff.relation(),
            previous_empty_vins: previous.empty_vin_count(),
            current_empty_vins: current.empty_vin_count(),
            added,
            removed,
            added_by_trim,
            added_by_year,
            added_top_locations,
            removed_by_trim,
            removed_by_year,
            removed_top_locations,
        }
    }

    /// 控制台文本报告
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80);

        let _ = writeln!(out, "Unique VINs in previous snapshot: {}", self.previous_count);
        let _ = writeln!(out, "Unique VINs in current snapshot: {}", self.current_count);
        let _ = writeln!(out, "\nNew VINs in current snapshot: {}", self.added_count);

        if !self.added.is_empty() {
            let _ = writeln!(out, "\nNew entries found:\n{}", rule);
            for record in &self.added {
                write_record(&mut out, record, true);
            }
        }

        let _ = writeln!(out, "\nVINs removed since previous snapshot: {}", self.removed_count);
        if !self.removed.is_empty() {
            let _ = writeln!(out, "\nRemoved entries:\n{}", rule);
            for record in &self.removed {
                write_record(&mut out, record, false);
            }
        }

        let _ = writeln!(out, "\nSummary:");
        let _ = writeln!(out, "Total new entries: {}", self.added_count);
        let _ = writeln!(out, "Total removed entries: {}", self.removed_count);
        let _ = writeln!(out, "Unchanged entries: {}", self.common_count);
        let _ = writeln!(out, "Net change: {}", self.net_change);
        let _ = writeln!(out, "Relationship: {}", self.relation);

        if !self.added.is_empty() {
            write_counts(&mut out, "New entries by trim:", &self.added_by_trim);
            write_counts(&mut out, "New entries by year:", &self.added_by_year);
            write_counts(
                &mut out,
                "New entries by location (top 10):",
                &self.added_top_locations,
            );
        }
        if !self.removed.is_empty() {
            write_counts(&mut out, "Removed entries by trim:", &self.removed_by_trim);
            write_counts(&mut out, "Removed entries by year:", &self.removed_by_year);
            write_counts(
                &mut out,
                "Removed entries by location (top 10):",
                &self.removed_top_locations,
            );
        }
        out
    }
}

/// 按配置、年款、地点（前 TOP_LOCATIONS 个）分组计数
fn breakdown(records: &[ListingRecord]) -> (Vec<CountEntry>, Vec<CountEntry>, Vec<CountEntry>) {
    let by_trim = count_by(records, |r| r.trim.clone());
    let by_year = count_by(records, |r| r.year.to_string());
    let mut top_locations = count_by(records, |r| r.location.clone());
    top_locations.truncate(TOP_LOCATIONS);
    (by_trim, by_year, top_locations)
}

/// 计数并排序（数量降序，同数量按键升序）
fn count_by<F>(records: &[ListingRecord], key_fn: F) -> Vec<CountEntry>
where
    F: Fn(&ListingRecord) -> String,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *counts.entry(key_fn(record)).or_insert(0) += 1;
    }

    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries
}

fn write_record(out: &mut String, record: &ListingRecord, detailed: bool) {
    let _ = writeln!(out, "\nVIN: {}", record.vin);
    let _ = writeln!(out, "Stock: {}", record.stock);
    let _ = writeln!(out, "Year: {}", record.year);
    let _ = writeln!(out, "Trim: {}", record.trim);
    let _ = writeln!(out, "Price: {}", record.price);
    let _ = writeln!(out, "Location: {}", record.location);
    if detailed {
        let _ = writeln!(out, "Mileage: {}", record.mileage);
        let _ = writeln!(out, "Drive Type: {}", record.drive_type);
    }
    let _ = writeln!(out, "{}", "-".repeat(40));
}

fn write_counts(out: &mut String, title: &str, entries: &[CountEntry]) {
    let _ = writeln!(out, "\n{}", title);
    for entry in entries {
        let _ = writeln!(out, "  {}: {}", entry.key, entry.count);
    }
}
