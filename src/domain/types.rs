// ==========================================
// LYRIQ 车源价格追踪 - 领域类型定义
// ==========================================
// 职责: 驱动形式、去重键、快照关系等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 驱动形式 (Drive Type)
// ==========================================
// 导出文件中为完整描述（如 "All-Wheel Drive"），规范化后为缩写代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveType {
    Awd, // 四驱
    Rwd, // 后驱
    Fwd, // 前驱
}

impl DriveType {
    /// 从描述文本中识别驱动形式（子串匹配，区分大小写）
    pub fn from_description(text: &str) -> Option<Self> {
        if text.contains("All-Wheel Drive") {
            Some(DriveType::Awd)
        } else if text.contains("Rear-Wheel Drive") {
            Some(DriveType::Rwd)
        } else if text.contains("Front-Wheel Drive") {
            Some(DriveType::Fwd)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DriveType::Awd => "AWD",
            DriveType::Rwd => "RWD",
            DriveType::Fwd => "FWD",
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// 去重键 (Dedup Key)
// ==========================================
// AllFields: 全字段组合（默认）
// Fields: 指定字段子集（如 ["vin"] 或 ["vin", "stock"]）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    AllFields,
    Fields(Vec<String>),
}

impl DedupKey {
    /// 从字段列表构造；空列表视为全字段
    pub fn from_fields(fields: Vec<String>) -> Self {
        let fields: Vec<String> = fields
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            DedupKey::AllFields
        } else {
            DedupKey::Fields(fields)
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::AllFields => write!(f, "<all fields>"),
            DedupKey::Fields(fields) => write!(f, "{}", fields.join(",")),
        }
    }
}

// ==========================================
// 快照内重复 VIN 处理策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateVinPolicy {
    #[default]
    Reject,   // 拒绝构建快照（返回错误）
    LastWins, // 后出现的记录覆盖先出现的记录（记录告警与计数）
}

// ==========================================
// 快照关系 (Snapshot Relation)
// ==========================================
// 仅用于报告，按 VIN 身份判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotRelation {
    Identical, // 无新增、无下架
    Subset,    // 仅下架: 当前快照为上一快照的真子集
    Superset,  // 仅新增: 当前快照为上一快照的真超集
    Mixed,     // 既有新增也有下架
}

impl fmt::Display for SnapshotRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotRelation::Identical => write!(f, "identical"),
            SnapshotRelation::Subset => write!(f, "subset"),
            SnapshotRelation::Superset => write!(f, "superset"),
            SnapshotRelation::Mixed => write!(f, "mixed"),
        }
    }
}

// ==========================================
// 输出格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Array,   // 规范记录数组（下游消费的统一形态）
    Wrapped, // {metadata, data} 包装
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_type_from_description() {
        assert_eq!(
            DriveType::from_description("All-Wheel Drive"),
            Some(DriveType::Awd)
        );
        assert_eq!(
            DriveType::from_description("Rear-Wheel Drive"),
            Some(DriveType::Rwd)
        );
        assert_eq!(
            DriveType::from_description("Front-Wheel Drive"),
            Some(DriveType::Fwd)
        );
        assert_eq!(DriveType::from_description("all-wheel drive"), None);
        assert_eq!(DriveType::Awd.to_string(), "AWD");
    }

    #[test]
    fn test_dedup_key_from_fields() {
        assert_eq!(DedupKey::from_fields(vec![]), DedupKey::AllFields);
        assert_eq!(
            DedupKey::from_fields(vec![" ".to_string()]),
            DedupKey::AllFields
        );
        assert_eq!(
            DedupKey::from_fields(vec!["vin".to_string(), " stock ".to_string()]),
            DedupKey::Fields(vec!["vin".to_string(), "stock".to_string()])
        );
    }
}
