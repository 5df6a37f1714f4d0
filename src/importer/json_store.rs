// ==========================================
// LYRIQ 车源价格追踪 - 规范 JSON 存储
// ==========================================
// 职责: 规范记录数组的写出与读取
// 格式: 缩进 2 空格的 UTF-8 JSON（保留非 ASCII 字符）
// 读取: 同时接受纯数组与 {metadata, data} 包装
// ==========================================

use crate::domain::listing::{ImportSummary, ListingRecord};
use crate::domain::types::OutputFormat;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Serialize)]
struct WrappedListingsRef<'a> {
    metadata: &'a ImportSummary,
    data: &'a [ListingRecord],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredListings {
    Array(Vec<ListingRecord>),
    Wrapped {
        #[serde(default)]
        #[allow(dead_code)]
        metadata: Option<Value>,
        data: Vec<ListingRecord>,
    },
}

/// 序列化规范记录
///
/// # 参数
/// - format: Array 输出纯数组；Wrapped 输出 {metadata, data}
pub fn to_json_string(
    records: &[ListingRecord],
    summary: &ImportSummary,
    format: OutputFormat,
) -> ImportResult<String> {
    let json = match format {
        OutputFormat::Array => serde_json::to_string_pretty(records)?,
        OutputFormat::Wrapped => serde_json::to_string_pretty(&WrappedListingsRef {
            metadata: summary,
            data: records,
        })?,
    };
    Ok(json)
}

/// 写出到文件（整体覆盖写）
pub fn write_json_file(path: &Path, json: &str) -> ImportResult<()> {
    std::fs::write(path, json).map_err(|e| ImportError::FileWriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), bytes = json.len(), "JSON 写出完成");
    Ok(())
}

/// 写出规范记录数组（仅数组形态，供新增记录提取等场景）
pub fn write_records(path: &Path, records: &[ListingRecord]) -> ImportResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    write_json_file(path, &json)
}

/// 解析 JSON 文本（数组或包装形态）
pub fn parse_records(json: &str) -> ImportResult<Vec<ListingRecord>> {
    let stored: StoredListings = serde_json::from_str(json)?;
    Ok(match stored {
        StoredListings::Array(records) => records,
        StoredListings::Wrapped { data, .. } => data,
    })
}

/// 读取规范 JSON 文件
pub fn read_records(path: &Path) -> ImportResult<Vec<ListingRecord>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(path)?;
    let records = parse_records(&raw).map_err(|e| match e {
        ImportError::JsonError(message) => {
            ImportError::JsonError(format!("{}: {}", path.display(), message))
        }
        other => other,
    })?;

    tracing::debug!(path = %path.display(), count = records.len(), "JSON 读取完成");
    Ok(records)
}
