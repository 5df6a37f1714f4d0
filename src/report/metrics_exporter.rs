// ==========================================
// LYRIQ 车源价格追踪 - Prometheus 指标导出
// ==========================================
// 职责: 规范记录 → Prometheus 文本格式（exposition format 0.0.4）
// 约定: 每个指标族前输出 # HELP / # TYPE；样本携带毫秒时间戳
// 约定: 同一族内样本按标签值排序，输出确定
// ==========================================

use crate::config::MetricsConfig;
use crate::domain::listing::ListingRecord;
use chrono::Datelike;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// 高价车阈值（售价 > 此值）
pub const HIGH_VALUE_PRICE: u64 = 50_000;

/// 低里程阈值（0 < 里程 < 此值）
pub const LOW_MILEAGE: u64 = 5_000;

/// 里程分段宽度与上限
pub const MILEAGE_BUCKET_WIDTH: u64 = 2_500;
pub const MILEAGE_BUCKET_LIMIT: u64 = 40_000;

// ==========================================
// 指标数据结构
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// 样本值（决定输出精度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Average(f64), // 两位小数
    Ratio(f64),   // 四位小数
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(v) => write!(f, "{}", v),
            MetricValue::Average(v) => write!(f, "{:.2}", v),
            MetricValue::Ratio(v) => write!(f, "{:.4}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

/// 标签值清洗: 小写，空格与连字符 → "_"，转义反斜杠 / 引号 / 换行
pub fn clean_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        match c {
            ' ' | '-' => out.push('_'),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// 非零值的 (平均, 最小, 最大)
#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    sum: u128,
    count: u64,
    min: u64,
    max: u64,
}

impl Stats {
    fn add(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value as u128;
        self.count += 1;
    }

    fn average(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }
}

// ==========================================
// 族构建器
// ==========================================
struct FamilyBuilder {
    prefix: String,
    families: Vec<MetricFamily>,
}

impl FamilyBuilder {
    fn push(&mut self, name: &str, help: &str, kind: MetricKind, samples: Vec<Sample>) {
        if samples.is_empty() {
            return;
        }
        self.families.push(MetricFamily {
            name: format!("{}_{}", self.prefix, name),
            help: help.to_string(),
            kind,
            samples,
        });
    }

    fn single(&mut self, name: &str, help: &str, value: MetricValue) {
        self.push(
            name,
            help,
            MetricKind::Gauge,
            vec![Sample {
                labels: Vec::new(),
                value,
            }],
        );
    }

    /// 计数族: 单标签
    fn counts(&mut self, name: &str, help: &str, label: &str, counts: BTreeMap<String, u64>) {
        let samples = counts
            .into_iter()
            .map(|(value, count)| Sample {
                labels: vec![(label.to_string(), value)],
                value: MetricValue::Count(count),
            })
            .collect();
        self.push(name, help, MetricKind::Gauge, samples);
    }

    /// 计数族: 双标签
    fn cross_counts(
        &mut self,
        name: &str,
        help: &str,
        labels: (&str, &str),
        counts: BTreeMap<(String, String), u64>,
    ) {
        let samples = counts
            .into_iter()
            .map(|((a, b), count)| Sample {
                labels: vec![(labels.0.to_string(), a), (labels.1.to_string(), b)],
                value: MetricValue::Count(count),
            })
            .collect();
        self.push(name, help, MetricKind::Gauge, samples);
    }

    /// 平均 / 最小 / 最大 三族（可按标签分组）
    fn stats_group(
        &mut self,
        names: [&str; 3],
        subject: &str,
        label: Option<&str>,
        groups: BTreeMap<String, Stats>,
    ) {
        let sample = |key: &String, value: MetricValue| Sample {
            labels: label
                .map(|l| vec![(l.to_string(), key.clone())])
                .unwrap_or_default(),
            value,
        };

        let averages = groups
            .iter()
            .map(|(k, s)| sample(k, MetricValue::Average(s.average())))
            .collect();
        let mins = groups
            .iter()
            .map(|(k, s)| sample(k, MetricValue::Count(s.min)))
            .collect();
        let maxes = groups
            .iter()
            .map(|(k, s)| sample(k, MetricValue::Count(s.max)))
            .collect();

        self.push(names[0], &format!("Average {}", subject), MetricKind::Gauge, averages);
        self.push(names[1], &format!("Minimum {}", subject), MetricKind::Gauge, mins);
        self.push(names[2], &format!("Maximum {}", subject), MetricKind::Gauge, maxes);
    }
}

fn bump(map: &mut BTreeMap<String, u64>, key: String) {
    *map.entry(key).or_insert(0) += 1;
}

fn bump_pair(map: &mut BTreeMap<(String, String), u64>, a: String, b: String) {
    *map.entry((a, b)).or_insert(0) += 1;
}

/// 售价区间
pub fn price_range(price: u64) -> &'static str {
    match price {
        p if p < 40_000 => "under_40k",
        p if p < 50_000 => "40k_50k",
        p if p < 60_000 => "50k_60k",
        _ => "over_60k",
    }
}

/// 里程区间标签（按 2500 分段，40000 以上合并）
pub fn mileage_range(mileage: u64) -> String {
    if mileage >= MILEAGE_BUCKET_LIMIT {
        return format!("over_{}", MILEAGE_BUCKET_LIMIT);
    }
    let lower = mileage / MILEAGE_BUCKET_WIDTH * MILEAGE_BUCKET_WIDTH;
    format!("{}_{}", lower, lower + MILEAGE_BUCKET_WIDTH)
}

fn mileage_range_labels() -> Vec<String> {
    let mut labels: Vec<String> = (0..MILEAGE_BUCKET_LIMIT / MILEAGE_BUCKET_WIDTH)
        .map(|i| mileage_range(i * MILEAGE_BUCKET_WIDTH))
        .collect();
    labels.push(format!("over_{}", MILEAGE_BUCKET_LIMIT));
    labels
}

// ==========================================
// MetricsExporter
// ==========================================
#[derive(Debug, Clone)]
pub struct MetricsExporter {
    prefix: String,
    reference_year: i32, // "新车" 与车龄的参考年份
}

impl MetricsExporter {
    pub fn new(prefix: impl Into<String>, reference_year: i32) -> Self {
        Self {
            prefix: prefix.into(),
            reference_year,
        }
    }

    /// 参考年份缺省为当前年份
    pub fn from_config(config: &MetricsConfig) -> Self {
        let year = config
            .reference_year
            .unwrap_or_else(|| chrono::Local::now().year());
        Self::new(config.prefix.clone(), year)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 生成全部指标族
    pub fn collect(&self, records: &[ListingRecord]) -> Vec<MetricFamily> {
        let mut b = FamilyBuilder {
            prefix: self.prefix.clone(),
            families: Vec::new(),
        };

        // ===== 总量 =====
        b.push(
            "vehicles_total",
            "Total number of LYRIQ vehicles",
            MetricKind::Counter,
            vec![Sample {
                labels: Vec::new(),
                value: MetricValue::Count(records.len() as u64),
            }],
        );

        // ===== 售价 / 里程 / 月供（非零值）=====
        for (names, subject, field) in [
            (["price_average", "price_min", "price_max"], "price of LYRIQ vehicles", 0),
            (["mileage_average", "mileage_min", "mileage_max"], "mileage of LYRIQ vehicles", 1),
            (["payment_average", "payment_min", "payment_max"], "payment amount", 2),
        ] {
            let mut stats = Stats::default();
            for r in records {
                let value = [r.price, r.mileage, r.payment][field];
                if value > 0 {
                    stats.add(value);
                }
            }
            let mut groups = BTreeMap::new();
            if stats.count > 0 {
                groups.insert(String::new(), stats);
            }
            b.stats_group(names, subject, None, groups);
        }

        // ===== 单维度分布 =====
        let mut by_year = BTreeMap::new();
        let mut by_trim = BTreeMap::new();
        let mut by_state = BTreeMap::new();
        let mut by_drive = BTreeMap::new();
        let mut by_interior = BTreeMap::new();
        let mut by_exterior = BTreeMap::new();

        // ===== 交叉分布 =====
        let mut trim_state = BTreeMap::new();
        let mut year_state = BTreeMap::new();
        let mut drive_state = BTreeMap::new();
        let mut trim_year = BTreeMap::new();
        let mut trim_drive = BTreeMap::new();
        let mut color_combo = BTreeMap::new();

        // ===== 分组统计 =====
        let mut price_by_state: BTreeMap<String, Stats> = BTreeMap::new();
        let mut mileage_by_state: BTreeMap<String, Stats> = BTreeMap::new();
        let mut price_by_trim: BTreeMap<String, Stats> = BTreeMap::new();
        let mut mileage_by_trim: BTreeMap<String, Stats> = BTreeMap::new();
        let mut payment_by_trim: BTreeMap<String, Stats> = BTreeMap::new();

        // 区间计数（固定顺序，含 0 计数）
        let mut price_ranges: Vec<(&str, u64)> = ["under_40k", "40k_50k", "50k_60k", "over_60k"]
            .into_iter()
            .map(|r| (r, 0))
            .collect();
        let mut mileage_ranges: Vec<(String, u64)> =
            mileage_range_labels().into_iter().map(|r| (r, 0)).collect();

        let mut high_value = 0u64;
        let mut low_mileage = 0u64;
        let mut new_vehicles = 0u64;
        let mut awd = 0u64;
        let mut rwd = 0u64;
        let mut age_sum = 0i64;
        let mut age_count = 0i64;
        let mut per_mile_sum = 0f64;
        let mut per_mile_count = 0u64;

        for r in records {
            let year = (r.year > 0).then(|| r.year.to_string());
            let trim = (!r.trim.is_empty()).then(|| clean_label(&r.trim));
            let state = r.state().map(clean_label);
            let drive = (!r.drive_type.is_empty()).then(|| clean_label(&r.drive_type));
            let interior = (!r.interior_color.is_empty()).then(|| clean_label(&r.interior_color));
            let exterior = (!r.exterior_color.is_empty()).then(|| clean_label(&r.exterior_color));

            if let Some(y) = &year {
                bump(&mut by_year, y.clone());
            }
            if let Some(t) = &trim {
                bump(&mut by_trim, t.clone());
            }
            if let Some(s) = &state {
                bump(&mut by_state, s.clone());
            }
            if let Some(d) = &drive {
                bump(&mut by_drive, d.clone());
            }
            if let Some(c) = &interior {
                bump(&mut by_interior, c.clone());
            }
            if let Some(c) = &exterior {
                bump(&mut by_exterior, c.clone());
            }

            if let (Some(s), Some(t)) = (&state, &trim) {
                bump_pair(&mut trim_state, s.clone(), t.clone());
            }
            if let (Some(s), Some(y)) = (&state, &year) {
                bump_pair(&mut year_state, s.clone(), y.clone());
            }
            if let (Some(s), Some(d)) = (&state, &drive) {
                bump_pair(&mut drive_state, s.clone(), d.clone());
            }
            if let (Some(t), Some(y)) = (&trim, &year) {
                bump_pair(&mut trim_year, t.clone(), y.clone());
            }
            if let (Some(t), Some(d)) = (&trim, &drive) {
                bump_pair(&mut trim_drive, t.clone(), d.clone());
            }
            if let (Some(i), Some(e)) = (&interior, &exterior) {
                bump(&mut color_combo, format!("{}_{}", i, e));
            }

            if r.price > 0 {
                let range = price_range(r.price);
                if let Some(slot) = price_ranges.iter_mut().find(|(name, _)| *name == range) {
                    slot.1 += 1;
                }
                if let Some(s) = &state {
                    price_by_state.entry(s.clone()).or_default().add(r.price);
                }
                if let Some(t) = &trim {
                    price_by_trim.entry(t.clone()).or_default().add(r.price);
                }
            }
            if r.mileage > 0 {
                let range = mileage_range(r.mileage);
                if let Some(slot) = mileage_ranges.iter_mut().find(|(name, _)| *name == range) {
                    slot.1 += 1;
                }
                if let Some(s) = &state {
                    mileage_by_state.entry(s.clone()).or_default().add(r.mileage);
                }
                if let Some(t) = &trim {
                    mileage_by_trim.entry(t.clone()).or_default().add(r.mileage);
                }
                if r.mileage < LOW_MILEAGE {
                    low_mileage += 1;
                }
            }
            if r.payment > 0 {
                if let Some(t) = &trim {
                    payment_by_trim.entry(t.clone()).or_default().add(r.payment);
                }
            }

            if r.price > HIGH_VALUE_PRICE {
                high_value += 1;
            }
            if r.year > 0 {
                if r.year as i64 == self.reference_year as i64 {
                    new_vehicles += 1;
                }
                age_sum += self.reference_year as i64 - r.year as i64;
                age_count += 1;
            }
            match r.drive_type.to_uppercase().as_str() {
                "AWD" => awd += 1,
                "RWD" => rwd += 1,
                _ => {}
            }
            if r.price > 0 && r.mileage > 0 {
                per_mile_sum += r.price as f64 / r.mileage as f64;
                per_mile_count += 1;
            }
        }

        b.counts("vehicles_by_year", "Number of vehicles by year", "year", by_year);
        b.counts("vehicles_by_trim", "Number of vehicles by trim", "trim", by_trim);
        b.counts("vehicles_by_state", "Number of vehicles by state", "state", by_state);
        b.counts(
            "vehicles_by_drive_type",
            "Number of vehicles by drive type",
            "drive_type",
            by_drive,
        );
        b.counts(
            "vehicles_by_interior_color",
            "Number of vehicles by interior color",
            "color",
            by_interior,
        );
        b.counts(
            "vehicles_by_exterior_color",
            "Number of vehicles by exterior color",
            "color",
            by_exterior,
        );

        let range_samples = |ranges: Vec<(String, u64)>| -> Vec<Sample> {
            ranges
                .into_iter()
                .map(|(name, count)| Sample {
                    labels: vec![("range".to_string(), name)],
                    value: MetricValue::Count(count),
                })
                .collect()
        };
        b.push(
            "vehicles_by_price_range",
            "Number of vehicles by price range",
            MetricKind::Gauge,
            range_samples(
                price_ranges
                    .into_iter()
                    .map(|(n, c)| (n.to_string(), c))
                    .collect(),
            ),
        );
        b.push(
            "vehicles_by_mileage_range",
            "Number of vehicles by mileage range",
            MetricKind::Gauge,
            range_samples(mileage_ranges),
        );

        b.cross_counts(
            "vehicles_by_trim_state",
            "Number of vehicles by trim and state",
            ("state", "trim"),
            trim_state,
        );
        b.cross_counts(
            "vehicles_by_year_state",
            "Number of vehicles by year and state",
            ("state", "year"),
            year_state,
        );
        b.cross_counts(
            "vehicles_by_drive_state",
            "Number of vehicles by drive type and state",
            ("state", "drive_type"),
            drive_state,
        );

        b.stats_group(
            ["price_by_state", "price_min_by_state", "price_max_by_state"],
            "price by state",
            Some("state"),
            price_by_state,
        );
        b.stats_group(
            ["mileage_by_state", "mileage_min_by_state", "mileage_max_by_state"],
            "mileage by state",
            Some("state"),
            mileage_by_state,
        );

        b.counts(
            "vehicles_by_color_combo",
            "Number of vehicles by interior and exterior color combination",
            "combo",
            color_combo,
        );
        b.cross_counts(
            "vehicles_by_trim_year",
            "Number of vehicles by trim and year",
            ("trim", "year"),
            trim_year,
        );

        b.stats_group(
            ["price_by_trim", "price_min_by_trim", "price_max_by_trim"],
            "price by trim",
            Some("trim"),
            price_by_trim,
        );
        b.stats_group(
            ["mileage_by_trim", "mileage_min_by_trim", "mileage_max_by_trim"],
            "mileage by trim",
            Some("trim"),
            mileage_by_trim,
        );
        b.stats_group(
            ["payment_by_trim", "payment_min_by_trim", "payment_max_by_trim"],
            "payment by trim",
            Some("trim"),
            payment_by_trim,
        );

        b.cross_counts(
            "vehicles_by_trim_drive",
            "Number of vehicles by trim and drive type",
            ("trim", "drive_type"),
            trim_drive,
        );

        // ===== 派生指标 =====
        b.single(
            "high_value_vehicles",
            "Number of vehicles priced above 50000",
            MetricValue::Count(high_value),
        );
        b.single(
            "low_mileage_vehicles",
            "Number of vehicles with mileage below 5000",
            MetricValue::Count(low_mileage),
        );
        b.single(
            "new_vehicles",
            "Number of vehicles of the reference model year",
            MetricValue::Count(new_vehicles),
        );
        if awd + rwd > 0 {
            b.single(
                "awd_ratio",
                "Share of AWD among AWD and RWD vehicles",
                MetricValue::Ratio(awd as f64 / (awd + rwd) as f64),
            );
        }
        if age_count > 0 {
            b.single(
                "average_vehicle_age",
                "Average vehicle age in years",
                MetricValue::Average(age_sum as f64 / age_count as f64),
            );
        }
        if per_mile_count > 0 {
            b.single(
                "average_price_per_mile",
                "Average price per mile",
                MetricValue::Average(per_mile_sum / per_mile_count as f64),
            );
        }

        b.families
    }

    /// 渲染为 Prometheus 文本
    pub fn render(&self, records: &[ListingRecord], timestamp_ms: i64) -> String {
        render_families(&self.collect(records), timestamp_ms)
    }
}

/// 指标族 → 文本
pub fn render_families(families: &[MetricFamily], timestamp_ms: i64) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, family.help);
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind);
        for sample in &family.samples {
            out.push_str(&family.name);
            if !sample.labels.is_empty() {
                let labels: Vec<String> = sample
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, v))
                    .collect();
                let _ = write!(out, "{{{}}}", labels.join(","));
            }
            let _ = writeln!(out, " {} {}", sample.value, timestamp_ms);
        }
    }
    out
}
