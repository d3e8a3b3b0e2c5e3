//! Analysis pipeline: fetch → merge → calculate.
//!
//! Fetches the scraped and valuation tiers concurrently, treats a failing
//! source as absent, then hands the records to the fusion and finance
//! engines. A failed fetch degrades the analysis but never aborts it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::finance::{FinanceEngine, FinancialMetrics, Financing, Strategy, StrategyDetails};
use crate::fusion::{FusionEngine, MergeOptions, MergedPropertyRecord};
use crate::sources::{PropertyQuery, PropertySource};
use crate::types::{ProviderRecord, SourceKind};

/// One finished analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub query: PropertyQuery,
    pub record: MergedPropertyRecord,
    pub metrics: FinancialMetrics,
    /// Sources that were configured but failed, by name.
    pub failed_sources: Vec<String>,
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.record)?;
        write!(f, "{}", self.metrics)
    }
}

/// Per-request overrides; anything unset falls back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub strategy: Option<Strategy>,
    pub financing: Option<Financing>,
    #[serde(alias = "strategyDetails", alias = "strategy_details")]
    pub details: Option<StrategyDetails>,
}

impl AnalysisRequest {
    /// Parse a request document such as
    /// `{"strategy": "flip", "details": {"arv": 250000, "points": 3}}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse analysis request")
    }
}

/// Ties sources, fusion and finance together.
pub struct Analyzer {
    scraped: Option<Box<dyn PropertySource>>,
    valuation: Option<Box<dyn PropertySource>>,
    fusion: FusionEngine,
    finance: FinanceEngine,
    use_heuristics: bool,
    default_strategy: Strategy,
    default_financing: Financing,
}

impl Analyzer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            scraped: None,
            valuation: None,
            fusion: FusionEngine::new(config.fusion.clone()),
            finance: FinanceEngine::new(config.calculation.clone()),
            use_heuristics: config.analysis.use_heuristics,
            default_strategy: config.analysis.default_strategy,
            default_financing: config.financing,
        }
    }

    pub fn with_scraped(mut self, source: Box<dyn PropertySource>) -> Self {
        self.scraped = Some(source);
        self
    }

    pub fn with_valuation(mut self, source: Box<dyn PropertySource>) -> Self {
        self.valuation = Some(source);
        self
    }

    /// Run the full pipeline for one property.
    pub async fn analyze(&self, query: &PropertyQuery, request: &AnalysisRequest) -> Analysis {
        let (scraped, valuation) = futures::join!(
            fetch_tier(self.scraped.as_deref(), SourceKind::Scraped, query),
            fetch_tier(self.valuation.as_deref(), SourceKind::EstimatedApi, query)
        );

        let failed_sources: Vec<String> = [&scraped, &valuation]
            .into_iter()
            .filter_map(|outcome| match outcome {
                TierOutcome::Failed(name) => Some(name.clone()),
                _ => None,
            })
            .collect();

        let options = MergeOptions {
            use_heuristics: self.use_heuristics,
            as_of: Some(query.as_of),
        };
        let record = self
            .fusion
            .merge(scraped.into_record(), valuation.into_record(), &options);

        let strategy = request.strategy.unwrap_or(self.default_strategy);
        let financing = request.financing.unwrap_or(self.default_financing);
        let metrics = self
            .finance
            .calculate(&record, strategy, &financing, request.details.as_ref());

        info!(
            query = %query,
            strategy = %strategy,
            completeness = record.completeness.score,
            failed = failed_sources.len(),
            "Analysis complete"
        );

        Analysis {
            query: query.clone(),
            record,
            metrics,
            failed_sources,
        }
    }
}

enum TierOutcome {
    Absent,
    Fetched(ProviderRecord),
    Failed(String),
}

impl TierOutcome {
    fn into_record(self) -> Option<ProviderRecord> {
        match self {
            TierOutcome::Fetched(record) => Some(record),
            _ => None,
        }
    }
}

async fn fetch_tier(
    source: Option<&dyn PropertySource>,
    slot: SourceKind,
    query: &PropertyQuery,
) -> TierOutcome {
    let Some(source) = source else {
        return TierOutcome::Absent;
    };
    if source.kind() != slot {
        warn!(
            source = %source.name(),
            declared = %source.kind(),
            slot = %slot,
            "Source configured in another tier's slot"
        );
    }
    match source.fetch(query).await {
        Ok(record) => TierOutcome::Fetched(record),
        Err(e) => {
            warn!(
                source = %source.name(),
                error = %format!("{e:#}"),
                "Source fetch failed, continuing without it"
            );
            TierOutcome::Failed(source.name())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
