// ==========================================
// LYRIQ 车源价格追踪 - 图表数据导出
// ==========================================
// 职责: 按地区汇总库存（数量 / 均价 / 主要配置），按地区统计配置分布
// 输出: JSON 或 JS 模块文本（locationData / trimDistributionData / trimColors）
// ==========================================

use crate::domain::listing::ListingRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// 进入配置分布图的地区最少车辆数
pub const MIN_STATE_TOTAL: usize = 5;

/// 每个地区保留的主要配置数
pub const TOP_TRIMS_PER_STATE: usize = 3;

/// 未知配置的颜色
pub const DEFAULT_TRIM_COLOR: &str = "#CCCCCC";

/// 配置 → 颜色
pub fn trim_color(trim: &str) -> &'static str {
    match trim {
        "Luxury" => "#4ECDC4",
        "Luxury 1" => "#45B7D1",
        "Luxury 2" => "#96CEB4",
        "Luxury 3" => "#FFEAA7",
        "Sport 1" => "#DDA0DD",
        "Sport 2" => "#98D8C8",
        "Sport 3" => "#F7DC6F",
        "Tech" => "#BB8FCE",
        "V-Series" => "#FF6B6B",
        _ => DEFAULT_TRIM_COLOR,
    }
}

// ==========================================
// 数据结构
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub state: String,
    pub count: usize,
    #[serde(rename = "avgPrice")]
    pub avg_price: u64, // 非零售价的均值（截断）
    pub trims: Vec<String>, // 最常见的配置（同数量按首次出现顺序）
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrimStateRow {
    pub state: String,
    pub total: usize,
    pub trims: Vec<usize>, // 与 TrimDistribution.trims 对齐
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TrimDistribution {
    pub trims: Vec<String>, // 全部配置（排序）
    pub states: Vec<TrimStateRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartData {
    #[serde(rename = "locationData")]
    pub location_data: Vec<StateSummary>,
    #[serde(rename = "trimDistributionData")]
    pub trim_distribution: TrimDistribution,
    #[serde(rename = "trimColors")]
    pub trim_colors: BTreeMap<String, String>,
}

/// 按首次出现顺序计数
#[derive(Debug, Default)]
struct OrderedCounter {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    fn get(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// 数量降序；同数量保持首次出现顺序
    fn most_common(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .order
            .iter()
            .map(|k| (k.clone(), self.get(k)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

#[derive(Debug, Default)]
struct StateAccumulator {
    count: usize,
    price_sum: u64,
    price_count: u64,
    trims: OrderedCounter,
}

// ==========================================
// ChartDataExporter
// ==========================================
pub struct ChartDataExporter;

impl ChartDataExporter {
    /// 提取图表数据
    pub fn extract(&self, records: &[ListingRecord]) -> ChartData {
        let location_data = self.extract_location_data(records);
        let trim_distribution = self.extract_trim_distribution(records);
        let trim_colors = trim_distribution
            .trims
            .iter()
            .map(|t| (t.clone(), trim_color(t).to_string()))
            .collect();

        ChartData {
            location_data,
            trim_distribution,
            trim_colors,
        }
    }

    /// 地区汇总（按车辆数降序）
    pub fn extract_location_data(&self, records: &[ListingRecord]) -> Vec<StateSummary> {
        let mut order: Vec<String> = Vec::new();
        let mut states: HashMap<String, StateAccumulator> = HashMap::new();

        for record in records {
            let Some(state) = record.region() else {
                continue;
            };
            if !states.contains_key(state) {
                order.push(state.to_string());
            }
            let acc = states.entry(state.to_string()).or_default();

            acc.count += 1;
            if record.price > 0 {
                acc.price_sum = acc.price_sum.saturating_add(record.price);
                acc.price_count += 1;
            }
            if !record.trim.is_empty() {
                acc.trims.add(&record.trim);
            }
        }

        let mut result: Vec<StateSummary> = order
            .into_iter()
            .filter_map(|state| {
                let acc = states.remove(&state)?;
                let avg_price = if acc.price_count > 0 {
                    acc.price_sum / acc.price_count
                } else {
                    0
                };
                let trims = acc
                    .trims
                    .most_common()
                    .into_iter()
                    .take(TOP_TRIMS_PER_STATE)
                    .map(|(trim, _)| trim)
                    .collect();
                Some(StateSummary {
                    state,
                    count: acc.count,
                    avg_price,
                    trims,
                })
            })
            .collect();

        // 稳定排序: 同数量保持首次出现顺序
        result.sort_by(|a, b| b.count.cmp(&a.count));
        result
    }

    /// 配置分布（仅含 location 与 trim 都有值的记录）
    pub fn extract_trim_distribution(&self, records: &[ListingRecord]) -> TrimDistribution {
        let mut state_totals = OrderedCounter::default();
        let mut trim_by_state: HashMap<String, OrderedCounter> = HashMap::new();

        for record in records {
            if record.trim.is_empty() {
                continue;
            }
            let Some(state) = record.region() else {
                continue;
            };
            state_totals.add(state);
            trim_by_state
                .entry(state.to_string())
                .or_default()
                .add(&record.trim);
        }

        let mut trims: Vec<String> = trim_by_state
            .values()
            .flat_map(|counter| counter.order.iter().cloned())
            .collect();
        trims.sort();
        trims.dedup();

        let states = state_totals
            .most_common()
            .into_iter()
            .filter(|(_, total)| *total >= MIN_STATE_TOTAL)
            .map(|(state, total)| {
                let counts = trims
                    .iter()
                    .map(|trim| {
                        trim_by_state
                            .get(&state)
                            .map(|counter| counter.get(trim))
                            .unwrap_or(0)
                    })
                    .collect();
                TrimStateRow {
                    state,
                    total,
                    trims: counts,
                }
            })
            .collect();

        TrimDistribution { trims, states }
    }

    /// JSON 文本
    pub fn render_json(&self, data: &ChartData) -> serde_json::Result<String> {
        serde_json::to_string_pretty(data)
    }

    /// JS 模块文本（供仪表盘页面直接引用）
    pub fn render_js(&self, data: &ChartData) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "// Auto-generated chart data for Cadillac Lyriq Dashboard");
        let _ = writeln!(out, "// Do not edit manually - regenerate with `lyriq-price chart-data`");
        let _ = writeln!(out);

        // locationData
        let _ = writeln!(out, "// Location data for geographic distribution chart");
        let _ = writeln!(out, "const locationData = {{");
        let last = data.location_data.len().saturating_sub(1);
        for (i, s) in data.location_data.iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            let _ = writeln!(
                out,
                "    {}: {{ count: {}, avgPrice: {}, trims: {} }}{}",
                js_string(&s.state),
                s.count,
                s.avg_price,
                js_string_array(&s.trims),
                comma
            );
        }
        let _ = writeln!(out, "}};");
        let _ = writeln!(out);

        // trimDistributionData
        let dist = &data.trim_distribution;
        let _ = writeln!(out, "// Trim distribution data for stacked bar chart");
        let _ = writeln!(out, "const trimDistributionData = {{");
        let _ = writeln!(out, "    trims: {},", js_string_array(&dist.trims));
        let _ = writeln!(out, "    states: [");
        let last = dist.states.len().saturating_sub(1);
        for (i, row) in dist.states.iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            let counts: Vec<String> = row.trims.iter().map(|c| c.to_string()).collect();
            let _ = writeln!(
                out,
                "        {{ state: {}, total: {}, trims: [{}] }}{}",
                js_string(&row.state),
                row.total,
                counts.join(", "),
                comma
            );
        }
        let _ = writeln!(out, "    ]");
        let _ = writeln!(out, "}};");
        let _ = writeln!(out);

        // trimColors（按配置列表顺序）
        let _ = writeln!(out, "// Color palette for trim levels");
        let _ = writeln!(out, "const trimColors = {{");
        let last = dist.trims.len().saturating_sub(1);
        for (i, trim) in dist.trims.iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            let _ = writeln!(
                out,
                "    {}: {}{}",
                js_string(trim),
                js_string(trim_color(trim)),
                comma
            );
        }
        let _ = writeln!(out, "}};");
        out
    }

    /// 控制台摘要
    pub fn render_summary(&self, records: &[ListingRecord], data: &ChartData) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Summary:");
        let _ = writeln!(out, "  Total records processed: {}", records.len());
        let _ = writeln!(out, "  States with data: {}", data.location_data.len());
        let _ = writeln!(out, "  Unique trim levels: {}", data.trim_distribution.trims.len());
        let _ = writeln!(out, "  States in trim chart: {}", data.trim_distribution.states.len());

        let _ = writeln!(out, "\nTop 5 states by inventory:");
        for (i, s) in data.location_data.iter().take(5).enumerate() {
            let _ = writeln!(
                out,
                "  {}. {}: {} vehicles (avg: ${})",
                i + 1,
                s.state,
                s.count,
                group_thousands(s.avg_price)
            );
        }

        let _ = writeln!(out, "\nTrim level distribution:");
        let mut trims = OrderedCounter::default();
        for record in records.iter().filter(|r| !r.trim.is_empty()) {
            trims.add(&record.trim);
        }
        for (trim, count) in trims.most_common() {
            let percentage = count as f64 / records.len().max(1) as f64 * 100.0;
            let _ = writeln!(out, "  {}: {} vehicles ({:.1}%)", trim, count, percentage);
        }
        out
    }
}

/// JS 单引号字符串字面量
fn js_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

fn js_string_array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| js_string(v)).collect();
    format!("[{}]", items.join(", "))
}

/// 千分位分组（12345 → "12,345"）
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
