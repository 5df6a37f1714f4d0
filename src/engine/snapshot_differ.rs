// ==========================================
// LYRIQ 车源价格追踪 - 快照对比引擎
// ==========================================
// 职责: 构建 VIN 索引快照，计算新增 / 下架 / 保留集合
// 红线: 仅按 VIN 身份对比，不检测保留车源的字段变化
// ==========================================

use crate::domain::listing::ListingRecord;
use crate::domain::types::{DuplicateVinPolicy, SnapshotRelation};
use crate::engine::error::{EngineError, EngineResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

// ==========================================
// Snapshot - 一次导入的完整记录集
// ==========================================
// records: 去除空 VIN 后的记录（保持首次出现顺序）
// index: vin → records 下标
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<ListingRecord>,
    index: HashMap<String, usize>,
    empty_vin_count: usize, // 空 VIN 记录（不参与身份对比）
    overwritten: usize,     // LastWins 策略下被覆盖的记录数
}

impl Snapshot {
    /// 构建快照
    ///
    /// # 参数
    /// - records: 规范记录（输入顺序）
    /// - policy: 快照内重复 VIN 的处理策略
    ///
    /// # 返回
    /// - Err(DuplicateVin): Reject 策略下出现重复 VIN
    pub fn build(records: Vec<ListingRecord>, policy: DuplicateVinPolicy) -> EngineResult<Self> {
        let mut snapshot = Snapshot::default();
        // vin → 输入位置（从 1 开始），用于错误报告
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (idx, mut record) in records.into_iter().enumerate() {
            let position = idx + 1;

            // 比较键为去除首尾空白后的 VIN
            let vin = record.vin.trim();
            if vin.len() != record.vin.len() {
                record.vin = vin.to_string();
            }

            if record.vin.is_empty() {
                snapshot.empty_vin_count += 1;
                continue;
            }

            match snapshot.index.get(&record.vin).copied() {
                None => {
                    positions.insert(record.vin.clone(), position);
                    snapshot.index.insert(record.vin.clone(), snapshot.records.len());
                    snapshot.records.push(record);
                }
                Some(slot) => {
                    let first_position = positions.get(&record.vin).copied().unwrap_or(0);
                    match policy {
                        DuplicateVinPolicy::Reject => {
                            return Err(EngineError::DuplicateVin {
                                vin: record.vin,
                                first_position,
                                second_position: position,
                            });
                        }
                        DuplicateVinPolicy::LastWins => {
                            warn!(
                                vin = %record.vin,
                                first_position,
                                second_position = position,
                                "快照内 VIN 重复，后出现的记录覆盖先出现的记录"
                            );
                            snapshot.records[slot] = record;
                            snapshot.overwritten += 1;
                        }
                    }
                }
            }
        }

        if snapshot.empty_vin_count > 0 {
            debug!(count = snapshot.empty_vin_count, "空 VIN 记录已排除");
        }

        Ok(snapshot)
    }

    /// 唯一 VIN 数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, vin: &str) -> Option<&ListingRecord> {
        self.index.get(vin).map(|&i| &self.records[i])
    }

    pub fn contains(&self, vin: &str) -> bool {
        self.index.contains_key(vin)
    }

    /// 记录（快照顺序）
    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn vins(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn empty_vin_count(&self) -> usize {
        self.empty_vin_count
    }

    pub fn overwritten_count(&self) -> usize {
        self.overwritten
    }
}

// ==========================================
// SnapshotDiff - 快照差异
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SnapshotDiff {
    pub added: BTreeSet<String>,   // 当前有、上一快照无
    pub removed: BTreeSet<String>, // 上一快照有、当前无
    pub common: BTreeSet<String>,  // 两者皆有
}

impl SnapshotDiff {
    /// 快照关系（仅用于报告）
    pub fn relation(&self) -> SnapshotRelation {
        match (self.added.is_empty(), self.removed.is_empty()) {
            (true, true) => SnapshotRelation::Identical,
            (true, false) => SnapshotRelation::Subset,
            (false, true) => SnapshotRelation::Superset,
            (false, false) => SnapshotRelation::Mixed,
        }
    }

    /// 净变化 = 新增 - 下架
    pub fn net_change(&self) -> i64 {
        self.added.len() as i64 - self.removed.len() as i64
    }
}

// ==========================================
// SnapshotDiffer - 快照对比引擎
// ==========================================
// 红线: 无状态引擎,所有方法都是纯函数
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self
    }

    /// 计算两个快照的 VIN 集合差异
    pub fn diff(&self, previous: &Snapshot, current: &Snapshot) -> SnapshotDiff {
        let previous_vins = previous.vins();
        let current_vins = current.vins();

        let diff = SnapshotDiff {
            added: current_vins.difference(&previous_vins).cloned().collect(),
            removed: previous_vins.difference(&current_vins).cloned().collect(),
            common: current_vins.intersection(&previous_vins).cloned().collect(),
        };

        debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            common = diff.common.len(),
            relation = %diff.relation(),
            "快照对比完成"
        );
        diff
    }
}
