// ==========================================
// LYRIQ 车源价格追踪 - 记录规范化器实现
// ==========================================
// 职责: RawRow + 统一时间戳 → ListingRecord（空行返回 None）
// 红线: 纯函数，从不失败
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::listing::{
    is_canonical_field, ListingRecord, RawRow, LYRIQ_V_MODEL, PHONE_PLACEHOLDER, V_SERIES_TRIM,
};
use crate::importer::field_extractor::{
    canonical_column_name, clean_trim, extract_currency, extract_drive_type, extract_mileage,
    extract_year,
};
use crate::importer::listing_importer_trait::RecordNormalizer;
use serde_json::Value;
use std::collections::BTreeMap;

/// 取非空单元格
fn cell<'a>(cells: &BTreeMap<String, &'a str>, name: &str) -> Option<&'a str> {
    cells.get(name).copied().filter(|v| !v.is_empty())
}

// ==========================================
// ListingNormalizer
// ==========================================
#[derive(Debug, Clone)]
pub struct ListingNormalizer {
    year_bounds: Option<(u32, u32)>, // 闭区间；区间外年款置 0
    phone_placeholder: String,
}

impl Default for ListingNormalizer {
    fn default() -> Self {
        Self {
            year_bounds: None,
            phone_placeholder: PHONE_PLACEHOLDER.to_string(),
        }
    }
}

impl ListingNormalizer {
    pub fn new(year_bounds: Option<(u32, u32)>, phone_placeholder: impl Into<String>) -> Self {
        Self {
            year_bounds,
            phone_placeholder: phone_placeholder.into(),
        }
    }

    pub fn from_config(config: &dyn ImportConfigReader) -> Self {
        Self::new(config.get_year_bounds(), config.get_phone_placeholder())
    }

    fn apply_year_bounds(&self, year: u32, row_number: usize) -> u32 {
        match self.year_bounds {
            Some((min, max)) if year != 0 && (year < min || year > max) => {
                tracing::debug!(row = row_number, year, min, max, "年款超出区间，置 0");
                0
            }
            _ => year,
        }
    }
}

impl RecordNormalizer for ListingNormalizer {
    fn normalize(&self, row: &RawRow, timestamp: &str) -> Option<ListingRecord> {
        // 1. 空行
        if row.is_blank() {
            return None;
        }

        // 2. 列名规范化（幂等，兼容未经解析器的行）
        let cells: BTreeMap<String, &str> = row
            .cells
            .iter()
            .map(|(k, v)| (canonical_column_name(k), v.trim()))
            .collect();

        let text = |name: &str| cell(&cells, name);
        let owned = |name: &str| cell(&cells, name).unwrap_or_default().to_string();

        // 3. 数值字段
        let payment = text("payment").map(extract_currency).unwrap_or(0);
        let price = text("price").map(extract_currency).unwrap_or(0);
        let mileage = text("mileage").map(extract_mileage).unwrap_or(0);
        let year = text("year").map(extract_year).unwrap_or(0);
        let year = self.apply_year_bounds(year, row.row_number);

        // 4. 电话占位
        let request_info = text("request_info")
            .map(str::to_string)
            .unwrap_or_else(|| self.phone_placeholder.clone());

        // 5. 驱动形式 / 6. 配置名
        let drive_type = text("drive_type")
            .map(extract_drive_type)
            .unwrap_or_default();
        let mut trim = text("trim").map(clean_trim).unwrap_or_default();

        // 7. LYRIQ-V 强制为 V-Series
        if text("model") == Some(LYRIQ_V_MODEL) {
            trim = V_SERIES_TRIM.to_string();
        }

        // 非规范列原样保留
        let extra: BTreeMap<String, Value> = cells
            .iter()
            .filter(|(k, _)| !k.is_empty() && !is_canonical_field(k))
            .map(|(k, v)| (k.clone(), Value::String((*v).to_string())))
            .collect();

        Some(ListingRecord {
            vin: owned("vin"),
            stock: owned("stock"),
            year,
            trim,
            price,
            mileage,
            payment,
            location: owned("location"),
            drive_type,
            interior_color: owned("interior_color"),
            exterior_color: owned("exterior_color"),
            request_info,
            // 8. 统一时间戳
            time: timestamp.to_string(),
            extra,
        })
    }
}
