// ==========================================
// LYRIQ 车源价格追踪 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 覆写顺序: 默认值 → JSON 配置文件 → 环境变量 → 命令行参数（调用方）
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::domain::listing::PHONE_PLACEHOLDER;
use crate::domain::types::{DedupKey, DuplicateVinPolicy, OutputFormat};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::DEFAULT_ENCODING;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ==========================================
// 配置键（环境变量名）
// ==========================================
pub mod config_keys {
    pub const DEDUP_KEYS: &str = "LYRIQ_PRICE_DEDUP_KEYS";
    pub const REQUIRED_COLUMNS: &str = "LYRIQ_PRICE_REQUIRED_COLUMNS";
    pub const YEAR_MIN: &str = "LYRIQ_PRICE_YEAR_MIN";
    pub const YEAR_MAX: &str = "LYRIQ_PRICE_YEAR_MAX";
    pub const DUPLICATE_VIN_POLICY: &str = "LYRIQ_PRICE_DUPLICATE_VIN_POLICY";
    pub const METRIC_PREFIX: &str = "LYRIQ_PRICE_METRIC_PREFIX";
    pub const METRICS_INTERVAL_SECS: &str = "LYRIQ_PRICE_METRICS_INTERVAL_SECS";
    pub const ENCODING: &str = "LYRIQ_PRICE_ENCODING";

    pub const ALL: [&str; 8] = [
        DEDUP_KEYS,
        REQUIRED_COLUMNS,
        YEAR_MIN,
        YEAR_MAX,
        DUPLICATE_VIN_POLICY,
        METRIC_PREFIX,
        METRICS_INTERVAL_SECS,
        ENCODING,
    ];
}

// ==========================================
// MetricsConfig - 指标导出与服务配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub prefix: String,              // 指标名前缀
    pub reference_year: Option<i32>, // "新车" 判定年份（None = 当前年份）
    pub interval_secs: u64,          // 缓存有效期（秒）
    pub host: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: "lyriq".to_string(),
            reference_year: None,
            interval_secs: 300,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// ==========================================
// PipelineConfig - 管道配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dedup_keys: Vec<String>,       // 空 = 全字段
    pub required_columns: Vec<String>, // 规范化后的列名
    pub year_min: Option<u32>,
    pub year_max: Option<u32>,
    pub phone_placeholder: String,
    pub duplicate_vin_policy: DuplicateVinPolicy,
    pub output_format: OutputFormat,
    pub encoding: String, // CSV 输入编码（WHATWG 标签，如 utf-8 / latin1 / gbk）
    pub metrics: MetricsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup_keys: Vec::new(),
            required_columns: vec!["vin".to_string()],
            year_min: None,
            year_max: None,
            phone_placeholder: PHONE_PLACEHOLDER.to_string(),
            duplicate_vin_policy: DuplicateVinPolicy::default(),
            output_format: OutputFormat::default(),
            encoding: DEFAULT_ENCODING.to_string(),
            metrics: MetricsConfig::default(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: PipelineConfig,
}

impl ConfigManager {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: PipelineConfig) -> ImportResult<Self> {
        let manager = Self { config };
        manager.validate()?;
        Ok(manager)
    }

    /// 加载配置: 默认值 → 配置文件（可选）→ 进程环境变量
    ///
    /// # 参数
    /// - config_path: JSON 配置文件路径；None 表示仅使用默认值与环境变量
    pub fn load(config_path: Option<&Path>) -> ImportResult<Self> {
        let mut manager = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        manager.apply_overrides(|key| std::env::var(key).ok())?;
        manager.validate()?;

        tracing::debug!(
            config_file = ?config_path,
            dedup_key = %manager.get_dedup_key(),
            "配置加载完成"
        );
        Ok(manager)
    }

    /// 从 JSON 配置文件读取（缺省字段取默认值）
    pub fn from_file(path: &Path) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig =
            serde_json::from_str(&raw).map_err(|e| ImportError::ConfigReadError {
                key: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { config })
    }

    /// 应用覆写（lookup 通常为环境变量读取；测试中可注入）
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in config_keys::ALL {
            let Some(value) = lookup(key) else {
                continue;
            };
            self.apply_override(key, &value)?;
            tracing::debug!(config_key = key, raw_value = %value, "环境变量覆写配置");
        }
        Ok(())
    }

    fn apply_override(&mut self, key: &str, value: &str) -> ImportResult<()> {
        match key {
            config_keys::DEDUP_KEYS => self.config.dedup_keys = split_list(value),
            config_keys::REQUIRED_COLUMNS => self.config.required_columns = split_list(value),
            config_keys::YEAR_MIN => self.config.year_min = Some(parse_value(key, value)?),
            config_keys::YEAR_MAX => self.config.year_max = Some(parse_value(key, value)?),
            config_keys::DUPLICATE_VIN_POLICY => {
                self.config.duplicate_vin_policy = parse_policy(key, value)?
            }
            config_keys::METRIC_PREFIX => self.config.metrics.prefix = value.trim().to_string(),
            config_keys::METRICS_INTERVAL_SECS => {
                self.config.metrics.interval_secs = parse_value(key, value)?
            }
            config_keys::ENCODING => self.config.encoding = value.trim().to_string(),
            _ => {
                return Err(ImportError::ConfigReadError {
                    key: key.to_string(),
                    message: "未知配置键".to_string(),
                })
            }
        }
        Ok(())
    }

    /// 配置一致性校验
    pub fn validate(&self) -> ImportResult<()> {
        if let (Some(min), Some(max)) = (self.config.year_min, self.config.year_max) {
            if min > max {
                return Err(ImportError::ConfigValueError {
                    key: "year_min/year_max".to_string(),
                    value: format!("{}..{}", min, max),
                    message: "年款下限大于上限".to_string(),
                });
            }
        }

        if self.config.dedup_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ImportError::ConfigValueError {
                key: "dedup_keys".to_string(),
                value: self.config.dedup_keys.join(","),
                message: "去重字段名不能为空".to_string(),
            });
        }

        if Encoding::for_label(self.config.encoding.trim().as_bytes()).is_none() {
            return Err(ImportError::ConfigValueError {
                key: "encoding".to_string(),
                value: self.config.encoding.clone(),
                message: "不支持的字符编码".to_string(),
            });
        }

        if self.config.metrics.prefix.trim().is_empty() {
            return Err(ImportError::ConfigValueError {
                key: "metrics.prefix".to_string(),
                value: String::new(),
                message: "指标前缀不能为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// 获取配置快照（JSON 格式，便于日志与排查）
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ImportResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ImportError::ConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn parse_policy(key: &str, value: &str) -> ImportResult<DuplicateVinPolicy> {
    match value.trim().to_lowercase().as_str() {
        "reject" => Ok(DuplicateVinPolicy::Reject),
        "last_wins" | "last-wins" => Ok(DuplicateVinPolicy::LastWins),
        _ => Err(ImportError::ConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: "期望 reject 或 last_wins".to_string(),
        }),
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_dedup_key(&self) -> DedupKey {
        DedupKey::from_fields(self.config.dedup_keys.clone())
    }

    fn get_required_columns(&self) -> Vec<String> {
        self.config.required_columns.clone()
    }

    fn get_year_bounds(&self) -> Option<(u32, u32)> {
        match (self.config.year_min, self.config.year_max) {
            (None, None) => None,
            (min, max) => Some((min.unwrap_or(0), max.unwrap_or(u32::MAX))),
        }
    }

    fn get_phone_placeholder(&self) -> String {
        self.config.phone_placeholder.clone()
    }

    fn get_duplicate_vin_policy(&self) -> DuplicateVinPolicy {
        self.config.duplicate_vin_policy
    }

    fn get_encoding(&self) -> String {
        self.config.encoding.clone()
    }
}
