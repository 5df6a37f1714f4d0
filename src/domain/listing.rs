// ==========================================
// LYRIQ 车源价格追踪 - 车源领域模型
// ==========================================
// 职责: 原始行 (RawRow)、规范记录 (ListingRecord)、导入汇总
// 红线: 规范记录是核心与所有报表消费者之间唯一的交换单元
// ==========================================

use crate::domain::types::DedupKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 电话缺失时的占位号码
pub const PHONE_PLACEHOLDER: &str = "(111) 111-1111";

/// LYRIQ-V 车型（强制 trim = V-Series）
pub const LYRIQ_V_MODEL: &str = "LYRIQ-V";
pub const V_SERIES_TRIM: &str = "V-Series";

/// 规范字段（输出顺序）
pub const CANONICAL_FIELDS: [&str; 13] = [
    "vin",
    "stock",
    "year",
    "trim",
    "price",
    "mileage",
    "payment",
    "location",
    "drive_type",
    "interior_color",
    "exterior_color",
    "request_info",
    "time",
];

pub fn is_canonical_field(name: &str) -> bool {
    CANONICAL_FIELDS.contains(&name)
}

// ==========================================
// RawRow - 原始行
// ==========================================
// 用途: 文件解析产物（列名已规范化 → 原始单元格文本）
// 生命周期: 仅在规范化之前存在
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: usize, // 数据行号（从 1 开始，不含表头）
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: BTreeMap::new(),
        }
    }

    /// 便捷构造（测试与手工拼装用）
    pub fn from_pairs<K, V, I>(row_number: usize, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            row_number,
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// 所有单元格均为空白
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

// ==========================================
// ListingRecord - 规范车源记录
// ==========================================
// 数值字段: 0 表示未知/无法解析
// extra: 非规范列原样保留（如 make / model / photo）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRecord {
    pub vin: String,            // 车辆识别码（快照身份键）
    pub stock: String,          // 库存编号
    pub year: u32,              // 年款
    pub trim: String,           // 配置（已去除 AWD/RWD 后缀）
    pub price: u64,             // 售价（美元，取整）
    #[serde(alias = "milege")]
    pub mileage: u64, // 里程（兼容历史拼写 milege）
    pub payment: u64,           // 月供（美元）
    pub location: String,       // "City, ST" 或地区
    pub drive_type: String,     // AWD / RWD / FWD / 原文
    pub interior_color: String, // 内饰颜色
    pub exterior_color: String, // 外观颜色
    pub request_info: String,   // 联系电话
    pub time: String,           // 本次导入的统一时间戳

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ListingRecord {
    /// 取字段的字符串形式（去重键使用）；字段不存在返回 None
    pub fn field_value(&self, name: &str) -> Option<String> {
        let value = match name {
            "vin" => self.vin.clone(),
            "stock" => self.stock.clone(),
            "year" => self.year.to_string(),
            "trim" => self.trim.clone(),
            "price" => self.price.to_string(),
            "mileage" => self.mileage.to_string(),
            "payment" => self.payment.to_string(),
            "location" => self.location.clone(),
            "drive_type" => self.drive_type.clone(),
            "interior_color" => self.interior_color.clone(),
            "exterior_color" => self.exterior_color.clone(),
            "request_info" => self.request_info.clone(),
            "time" => self.time.clone(),
            other => return self.extra.get(other).map(value_as_text),
        };
        Some(value)
    }

    /// 记录包含的全部字段名（规范字段在前，附加字段按字典序）
    pub fn field_names(&self) -> Vec<&str> {
        CANONICAL_FIELDS
            .iter()
            .copied()
            .chain(self.extra.keys().map(String::as_str))
            .collect()
    }

    pub fn model(&self) -> Option<&str> {
        self.extra.get("model").and_then(Value::as_str)
    }

    pub fn has_identity(&self) -> bool {
        !self.vin.is_empty()
    }

    /// 州代码: location 含逗号时取最后一个逗号之后的部分（去空白）
    pub fn state(&self) -> Option<&str> {
        if !self.location.contains(',') {
            return None;
        }
        self.location
            .rsplit(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 图表口径的地区: 取最后一个 ", " 之后的部分，否则整个 location
    pub fn region(&self) -> Option<&str> {
        if self.location.is_empty() {
            return None;
        }
        match self.location.rsplit_once(", ") {
            Some((_, state)) => Some(state),
            None => Some(self.location.as_str()),
        }
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ==========================================
// DuplicateRecord - 被去重丢弃的记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub row_number: usize,       // 被丢弃记录的数据行号
    pub first_row_number: usize, // 保留记录（首次出现）的数据行号
    pub vin: String,
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
// 用途: 控制台汇总 + 可选的 metadata 包装
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub run_id: String,              // 导入批次 ID（UUID）
    pub source_file: Option<String>, // 源文件路径
    pub parsed_at: String,           // 统一时间戳（即记录的 time 字段）
    pub delimiter: String,           // 嗅探得到的分隔符
    pub dedup_key: DedupKey,         // 去重键
    pub total_rows: usize,           // 数据行总数
    pub empty_rows: usize,           // 空行（已丢弃）
    pub duplicate_rows: usize,       // 重复记录（已丢弃）
    pub retained_rows: usize,        // 最终保留记录数
    pub elapsed_ms: u64,             // 导入耗时
}

// ==========================================
// ImportOutcome - 一次导入的完整结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub records: Vec<ListingRecord>,
    pub duplicates: Vec<DuplicateRecord>,
}
