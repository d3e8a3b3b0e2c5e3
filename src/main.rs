//! DEALSCOPE: property data fusion and investment calculation engine
//!
//! Entry point. Loads configuration, initialises structured logging, reads a
//! scraped listing and a valuation report from disk, and prints the merged
//! record with its financial metrics as JSON. An optional request file
//! carries financing terms and strategy details such as rehab budget or ARV.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use dealscope::config::AppConfig;
use dealscope::engine::{AnalysisRequest, Analyzer};
use dealscope::finance::Strategy;
use dealscope::sources::{JsonFileSource, PropertyQuery};
use dealscope::types::SourceKind;

const USAGE: &str = "usage: dealscope <scraped.json|-|none> <valuation.json|-|none> \
[strategy|default] [request.json]";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        AppConfig::resolve_env("DEALSCOPE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 4 {
        bail!("{USAGE}");
    }
    let (scraped_arg, valuation_arg) = (args[0].as_str(), args[1].as_str());
    if scraped_arg == "-" && valuation_arg == "-" {
        bail!("only one payload can be read from stdin");
    }
    let strategy: Option<Strategy> = args
        .get(2)
        .filter(|s| !s.eq_ignore_ascii_case("default"))
        .map(|s| s.parse())
        .transpose()
        .context("Invalid strategy argument")?;

    let mut request = match args.get(3) {
        Some(path) => load_request(path)?,
        None => AnalysisRequest::default(),
    };
    // Command-line strategy beats the request file
    if strategy.is_some() {
        request.strategy = strategy;
    }

    info!(
        config = %config_path,
        scraped = scraped_arg,
        valuation = valuation_arg,
        strategy = %request.strategy.unwrap_or(cfg.analysis.default_strategy),
        "DEALSCOPE starting"
    );

    let mut analyzer = Analyzer::new(&cfg);
    if let Some(path) = payload_path(scraped_arg) {
        analyzer = analyzer.with_scraped(Box::new(JsonFileSource::new(SourceKind::Scraped, path)));
    }
    if let Some(path) = payload_path(valuation_arg) {
        analyzer =
            analyzer.with_valuation(Box::new(JsonFileSource::new(SourceKind::EstimatedApi, path)));
    }

    let query = PropertyQuery::new(scraped_arg, Utc::now());
    let analysis = analyzer.analyze(&query, &request).await;

    if !analysis.failed_sources.is_empty() {
        warn!(failed = ?analysis.failed_sources, "Analysis ran on partial data");
    }
    info!("{}", analysis.metrics);

    let json = serde_json::to_string_pretty(&analysis).context("Failed to serialise analysis")?;
    println!("{json}");

    Ok(())
}

/// `none` (or an empty argument) leaves that tier out.
fn payload_path(arg: &str) -> Option<&str> {
    match arg.trim() {
        "" => None,
        a if a.eq_ignore_ascii_case("none") => None,
        a => Some(a),
    }
}

fn load_request(path: &str) -> Result<AnalysisRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {path}"))?;
    AnalysisRequest::from_json(&raw).with_context(|| format!("Invalid request file: {path}"))
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dealscope=info"));

    let json_logging = std::env::var("DEALSCOPE_LOG_JSON").is_ok();

    // Logs go to stderr so stdout carries only the analysis JSON
    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
