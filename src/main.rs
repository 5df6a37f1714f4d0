// ==========================================
// LYRIQ 车源价格追踪 - 命令行入口
// ==========================================
// 子命令: convert / diff / chart-data / metrics / serve
// 约定: 结果写 stdout 或文件，摘要与日志写 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lyriq_price::config::ConfigManager;
use lyriq_price::domain::{DuplicateVinPolicy, ListingRecord, OutputFormat};
use lyriq_price::engine::{DiffReport, Snapshot, SnapshotDiffer};
use lyriq_price::importer::{json_store, ListingImporter, ListingImporterImpl};
use lyriq_price::report::{ChartDataExporter, MetricsExporter};
use lyriq_price::server::{self, JsonFileMetricsSource, ServerConfig};
use lyriq_price::logging;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "lyriq-price")]
#[command(about = "LYRIQ listing price tracker: CSV normalization, snapshot diff, metrics")]
#[command(version)]
struct Cli {
    /// JSON config file (defaults + LYRIQ_PRICE_* environment overrides otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a CSV export into canonical JSON
    Convert {
        /// Input CSV file
        input: PathBuf,
        /// Output JSON file (stdout when omitted)
        output: Option<PathBuf>,
        /// Force output to stdout
        #[arg(long)]
        stdout: bool,
        /// Dedup key fields (comma-separated; all fields when omitted)
        #[arg(long, value_delimiter = ',')]
        dedup_keys: Option<Vec<String>>,
        /// Wrap output as {metadata, data}
        #[arg(long)]
        wrapped: bool,
        /// Input character encoding label (e.g. utf-8, latin1, windows-1252)
        #[arg(long)]
        encoding: Option<String>,
    },
    /// Compare two snapshots by VIN (CSV or canonical JSON)
    Diff {
        previous: PathBuf,
        current: PathBuf,
        /// Later duplicate VINs overwrite earlier ones instead of failing
        #[arg(long)]
        last_wins: bool,
        /// Write the newly added records to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export chart data (per-state summary and trim distribution)
    ChartData {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ChartFormat::Js)]
        format: ChartFormat,
    },
    /// Render Prometheus metrics once
    Metrics {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long)]
        prefix: Option<String>,
        /// Year counted as "new" (defaults to the current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },
    /// Serve Prometheus metrics over HTTP
    Serve {
        /// Canonical JSON file to read
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long)]
        host: Option<String>,
        #[arg(long, short)]
        port: Option<u16>,
        /// Cache lifetime in seconds
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChartFormat {
    Json,
    Js,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let mut config = ConfigManager::load(cli.config.as_deref()).context("配置加载失败")?;
    apply_cli_overrides(&mut config, &cli.command);
    // 命令行覆盖后重新校验
    config.validate().context("配置校验失败")?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            stdout,
            ..
        } => run_convert(config, &input, output.filter(|_| !stdout)),
        Commands::Diff {
            previous,
            current,
            output,
            json,
            ..
        } => run_diff(&config, &previous, &current, output.as_deref(), json),
        Commands::ChartData {
            input,
            output,
            format,
        } => run_chart_data(&config, &input, output.as_deref(), format),
        Commands::Metrics { input, output, .. } => {
            run_metrics(&config, &input, output.as_deref())
        }
        Commands::Serve { input, .. } => {
            let metrics = &config.config().metrics;
            let source = JsonFileMetricsSource::from_config(input, metrics);
            server::run_server(ServerConfig::from_metrics_config(metrics), Arc::new(source)).await
        }
    }
}

/// 把子命令参数写入配置
fn apply_cli_overrides(config: &mut ConfigManager, command: &Commands) {
    let pipeline = config.config_mut();
    match command {
        Commands::Convert {
            dedup_keys,
            wrapped,
            encoding,
            ..
        } => {
            if let Some(keys) = dedup_keys {
                pipeline.dedup_keys = keys.clone();
            }
            if *wrapped {
                pipeline.output_format = OutputFormat::Wrapped;
            }
            if let Some(encoding) = encoding {
                pipeline.encoding = encoding.clone();
            }
        }
        Commands::Diff { last_wins, .. } => {
            if *last_wins {
                pipeline.duplicate_vin_policy = DuplicateVinPolicy::LastWins;
            }
        }
        Commands::ChartData { .. } => {}
        Commands::Metrics {
            prefix,
            reference_year,
            ..
        } => {
            if let Some(prefix) = prefix {
                pipeline.metrics.prefix = prefix.clone();
            }
            if reference_year.is_some() {
                pipeline.metrics.reference_year = *reference_year;
            }
        }
        Commands::Serve {
            host,
            port,
            interval,
            prefix,
            ..
        } => {
            let metrics = &mut pipeline.metrics;
            if let Some(host) = host {
                metrics.host = host.clone();
            }
            if let Some(port) = port {
                metrics.port = *port;
            }
            if let Some(interval) = interval {
                metrics.interval_secs = *interval;
            }
            if let Some(prefix) = prefix {
                metrics.prefix = prefix.clone();
            }
        }
    }
}

/// 读取记录: .csv 走导入管道，其余按规范 JSON 读取
fn load_records(config: &ConfigManager, path: &Path) -> Result<Vec<ListingRecord>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let importer = ListingImporterImpl::with_defaults(config.clone());
        let outcome = importer
            .import_csv(path)
            .with_context(|| format!("导入失败: {}", path.display()))?;
        Ok(outcome.records)
    } else {
        json_store::read_records(path).with_context(|| format!("读取失败: {}", path.display()))
    }
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => json_store::write_json_file(path, text)
            .with_context(|| format!("写出失败: {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn run_convert(config: ConfigManager, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let format = config.config().output_format;
    let importer = ListingImporterImpl::with_defaults(config);
    let outcome = importer
        .import_csv(input)
        .with_context(|| format!("导入失败: {}", input.display()))?;

    let json = json_store::to_json_string(&outcome.records, &outcome.summary, format)?;
    emit(output.as_deref(), &json)?;

    let summary = &outcome.summary;
    eprintln!("Records: {}", summary.retained_rows);
    eprintln!("Empty rows removed: {}", summary.empty_rows);
    eprintln!("Duplicates removed: {}", summary.duplicate_rows);
    if let Some(path) = &output {
        eprintln!("Output: {}", path.display());
    }
    Ok(())
}

fn run_diff(
    config: &ConfigManager,
    previous: &Path,
    current: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let policy = config.config().duplicate_vin_policy;

    let previous_snapshot = Snapshot::build(load_records(config, previous)?, policy)
        .with_context(|| format!("快照构建失败: {}", previous.display()))?;
    let current_snapshot = Snapshot::build(load_records(config, current)?, policy)
        .with_context(|| format!("快照构建失败: {}", current.display()))?;

    let diff = SnapshotDiffer::new().diff(&previous_snapshot, &current_snapshot);
    let report = DiffReport::build(&previous_snapshot, &current_snapshot, &diff);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if let Some(path) = output {
        json_store::write_records(path, &report.added)
            .with_context(|| format!("写出失败: {}", path.display()))?;
        info!(path = %path.display(), count = report.added.len(), "新增记录已写出");
    }
    Ok(())
}

fn run_chart_data(
    config: &ConfigManager,
    input: &Path,
    output: Option<&Path>,
    format: ChartFormat,
) -> Result<()> {
    let records = load_records(config, input)?;
    let exporter = ChartDataExporter;
    let data = exporter.extract(&records);

    let text = match format {
        ChartFormat::Json => exporter.render_json(&data)?,
        ChartFormat::Js => exporter.render_js(&data),
    };
    emit(output, &text)?;
    eprint!("{}", exporter.render_summary(&records, &data));
    Ok(())
}

fn run_metrics(config: &ConfigManager, input: &Path, output: Option<&Path>) -> Result<()> {
    let records = load_records(config, input)?;
    if records.is_empty() {
        bail!("无可用数据: {}", input.display());
    }

    let exporter = MetricsExporter::from_config(&config.config().metrics);
    let text = exporter.render(&records, chrono::Utc::now().timestamp_millis());
    emit(output, &text)?;
    eprintln!("Generated metrics for {} vehicles", records.len());
    Ok(())
}
