use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum, error::ErrorKind};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::control::PassControl;
use crate::filter::{DateRange, FilterParams};
use crate::metrics::DashboardSummary;
use crate::pipeline::{PassOutput, Pipeline};
#[cfg(feature = "onnx")]
use crate::scoring::OnnxModel;
use crate::scoring::{LexiconModel, SentimentModel};
use crate::source::preprocess::preprocess_raw_dump;
use crate::source::{JsonFileSource, SourceKind};
use crate::timestamps::parse_date;
use crate::transport::fs::{DatasetStage, discover_datasets};
use crate::utils::normalize_inline_whitespace;

const DATA_DIR_HELP: &str =
    "Data directory resolution order: explicit arg, SENTIMENT_WATCH_DATA_DIR, then ./data.";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    News,
    Social,
}

impl From<SourceArg> for SourceKind {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::News => SourceKind::News,
            SourceArg::Social => SourceKind::Social,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dashboard_pass",
    disable_help_subcommand = true,
    about = "Run one sentiment dashboard pass",
    long_about = "Load a dataset, score sentiment, apply date/keyword filters, \
                  flag anomalous scores, and print the dashboard aggregates.",
    after_help = DATA_DIR_HELP
)]
/// CLI for `dashboard_pass`.
///
/// Common usage:
/// - News pass over `./data`: `--source news`
/// - Keyword and date window:
///   `--source social --keyword crypto --start 2024-01-01 --end 2024-01-31`
/// - Rebuild the processed file from the raw dump first: `--preprocess`
struct DashboardCli {
    #[arg(long, value_enum, default_value = "news", help = "Dataset to analyse")]
    source: SourceArg,
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        help = "Directory holding <source_id>_processed_data.json files"
    )]
    data_dir: Option<PathBuf>,
    #[arg(long, value_name = "DATE", value_parser = parse_date_arg, help = "First day to include")]
    start: Option<NaiveDate>,
    #[arg(long, value_name = "DATE", value_parser = parse_date_arg, help = "Last day to include")]
    end: Option<NaiveDate>,
    #[arg(long, help = "Case-insensitive substring filter on record text")]
    keyword: Option<String>,
    #[arg(long, help = "Process the raw dump into the processed dataset before the pass")]
    preprocess: bool,
    #[arg(
        long = "raw-fallback",
        help = "Process the raw dump in memory when no processed dataset exists"
    )]
    raw_fallback: bool,
    #[arg(long = "clean-text", help = "Clean text (URLs, mentions, stopwords) before scoring")]
    clean_text: bool,
    #[arg(long, help = "Score records in parallel (requires the `parallel` feature)")]
    parallel: bool,
    #[arg(long = "no-alerts", help = "Never dispatch alerts for this pass")]
    no_alerts: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Spool alert messages into this directory instead of logging them"
    )]
    outbox: Option<PathBuf>,
    #[arg(long, help = "Print the pass output and dashboard summary as JSON")]
    json: bool,
    #[cfg(feature = "onnx")]
    #[arg(
        long = "onnx-model",
        value_name = "DIR",
        help = "Classify with the ONNX model (model.onnx + vocab.txt) in this directory"
    )]
    onnx_model: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(
    name = "list_datasets",
    disable_help_subcommand = true,
    about = "List raw and processed datasets in a data directory",
    after_help = DATA_DIR_HELP
)]
struct ListDatasetsCli {
    #[arg(long = "data-dir", value_name = "DIR", help = "Directory to scan")]
    data_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    summary: &'a DashboardSummary,
    output: &'a PassOutput,
}

/// Parse dashboard flags, run one pass and print the result.
pub fn run_dashboard_pass<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<DashboardCli, _>(
        std::iter::once("dashboard_pass".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let model = build_model(&cli)?;
    let mut config = PipelineConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.raw_fallback = cli.raw_fallback;
    config.scorer = config
        .scorer
        .with_clean_text(cli.clean_text)
        .with_parallel(cli.parallel);
    if cli.no_alerts {
        config.alerts.enabled = false;
    }
    if let Some(outbox) = cli.outbox {
        config.alerts.outbox = Some(outbox);
    }

    let kind: SourceKind = cli.source.into();
    if cli.preprocess {
        let written = preprocess_raw_dump(&config.data_dir, kind)?;
        println!("processed raw dump -> {}", written.display());
    }

    let filter = build_filter(cli.start, cli.end, cli.keyword)?;
    let pipeline = Pipeline::with_model(&config, model)?;
    let source = JsonFileSource::new(kind, &config.data_dir).with_raw_fallback(config.raw_fallback);
    let output = pipeline.run_pass(&source, &filter, &PassControl::none())?;
    let summary = DashboardSummary::from_records(&output.records);

    if cli.json {
        let report = JsonReport {
            source: kind.source_id(),
            summary: &summary,
            output: &output,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(kind, &summary, &output);
    Ok(())
}

#[cfg(feature = "onnx")]
fn build_model(cli: &DashboardCli) -> Result<Arc<dyn SentimentModel>, Box<dyn Error>> {
    match &cli.onnx_model {
        Some(dir) => Ok(Arc::new(OnnxModel::load(dir)?)),
        None => Ok(Arc::new(LexiconModel::new())),
    }
}

#[cfg(not(feature = "onnx"))]
fn build_model(_cli: &DashboardCli) -> Result<Arc<dyn SentimentModel>, Box<dyn Error>> {
    Ok(Arc::new(LexiconModel::new()))
}

/// List dataset files under the data directory.
pub fn run_list_datasets<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<ListDatasetsCli, _>(
        std::iter::once("list_datasets".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| PipelineConfig::from_env().data_dir);

    let files = discover_datasets(&data_dir);
    println!("=== datasets in {} ===", data_dir.display());
    if files.is_empty() {
        println!("(none)");
        return Ok(());
    }
    for file in files {
        let stage = match file.stage {
            DatasetStage::Raw => "raw",
            DatasetStage::Processed => "processed",
        };
        println!(
            "{:<18} {:<10} {:>10} bytes  {}",
            file.kind.source_id(),
            stage,
            file.bytes,
            file.path.display()
        );
    }
    Ok(())
}

fn build_filter(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    keyword: Option<String>,
) -> Result<FilterParams, Box<dyn Error>> {
    let mut filter = FilterParams::all();
    match (start, end) {
        (None, None) => {}
        (start, end) => {
            let range = DateRange::new(
                start.unwrap_or(NaiveDate::MIN),
                end.unwrap_or(NaiveDate::MAX),
            )?;
            filter = filter.with_date_range(range);
        }
    }
    if let Some(keyword) = keyword {
        filter = filter.with_keyword(keyword);
    }
    Ok(filter)
}

fn print_summary(kind: SourceKind, summary: &DashboardSummary, output: &PassOutput) {
    println!("=== {} ===", kind.label());
    println!("records: {}", summary.records);
    match summary.average_score {
        Some(avg) => println!("average sentiment score: {avg:.3}"),
        None => println!("average sentiment score: n/a"),
    }
    if summary.anomalies > 0 {
        println!("!! anomalous sentiment detected ({} records)", summary.anomalies);
    }
    if let Some(threshold) = output.detection.threshold {
        println!("isolation threshold: {threshold:.4}");
    }
    for warning in &output.warnings {
        println!("warning: {warning}");
    }

    println!("\n--- sentiment breakdown ---");
    for share in &summary.breakdown {
        println!(
            "{:<9} {:>6}  {:>5.1}%",
            share.label,
            share.count,
            share.share * 100.0
        );
    }

    println!("\n--- trend (rolling mean) ---");
    for trend in &summary.trends {
        let latest = trend
            .points
            .iter()
            .rev()
            .find_map(|point| point.rolling_mean);
        let points = trend.points.len();
        match latest {
            Some(mean) => println!("{:<18} {points:>4} points, latest {mean:.3}", trend.source),
            None => println!("{:<18} {points:>4} points, window not filled", trend.source),
        }
    }

    println!("\n--- recent posts ---");
    for post in &summary.recent {
        let marker = if post.is_anomaly { "*" } else { " " };
        println!(
            "{marker} {:<19}  {:<8} {:.3}  {}",
            post.timestamp.to_string(),
            post.sentiment,
            post.sentiment_score,
            truncate(&normalize_inline_whitespace(&post.text), 80)
        );
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw)
        .ok_or_else(|| format!("could not parse '{raw}' as a date (expected YYYY-MM-DD)"))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parse_cli_handles_help_and_bad_flags() {
        let help = parse_cli::<DashboardCli, _>(["dashboard_pass", "--help"]).unwrap();
        assert!(help.is_none());
        assert!(parse_cli::<DashboardCli, _>(["dashboard_pass", "--source", "tv"]).is_err());
        assert!(parse_cli::<DashboardCli, _>(["dashboard_pass", "--start", "soon"]).is_err());

        let cli = parse_cli::<DashboardCli, _>([
            "dashboard_pass",
            "--source",
            "social",
            "--start",
            "2024-01-01",
            "--keyword",
            "crypto",
        ])
        .unwrap()
        .unwrap();
        assert!(matches!(cli.source, SourceArg::Social));
        assert_eq!(cli.start, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn build_filter_opens_missing_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1);
        let filter = build_filter(start, None, Some("x".into())).unwrap();
        let range = filter.date_range.unwrap();
        assert_eq!(range.end(), NaiveDate::MAX);
        assert_eq!(filter.keyword.as_deref(), Some("x"));

        assert!(build_filter(None, None, None).unwrap().is_identity());
        let inverted = build_filter(
            NaiveDate::from_ymd_opt(2024, 2, 1),
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
        );
        assert!(inverted.is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 10), "héllo");
        assert_eq!(truncate("héllo", 2), "hé...");
    }

    #[test]
    fn dashboard_pass_runs_over_a_data_dir() {
        let dir = tempdir().unwrap();
        let rows: Vec<serde_json::Value> = (0..12)
            .map(|i| {
                json!({
                    "title": format!("headline {i}"),
                    "description": "markets steady",
                    "timestamp": format!("2024-01-{:02}", i + 1),
                    "source": "Wire",
                    "url": ""
                })
            })
            .collect();
        std::fs::write(
            dir.path().join("google_news_processed_data.json"),
            serde_json::to_string(&rows).unwrap(),
        )
        .unwrap();
        let data_dir = dir.path().to_string_lossy().to_string();
        run_dashboard_pass(args(&["--data-dir", &data_dir, "--no-alerts", "--json"])).unwrap();
        run_list_datasets(args(&["--data-dir", &data_dir])).unwrap();

        let missing = dir.path().join("nothing").to_string_lossy().to_string();
        assert!(run_dashboard_pass(args(&["--data-dir", &missing, "--source", "social"])).is_err());
    }
}
