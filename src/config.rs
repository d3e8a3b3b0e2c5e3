//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults matching the engine's built-in assumptions, so a
//! missing key (or an empty file) is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::finance::{Financing, Strategy};
use crate::types::DealError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub fusion: FusionConfig,
    pub calculation: CalculationConfig,
    pub financing: Financing,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Synthesize low-confidence defaults when no provider has a field.
    pub use_heuristics: bool,
    pub default_strategy: Strategy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_heuristics: true,
            default_strategy: Strategy::Rental,
        }
    }
}

/// Assumptions used by the fusion engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FusionConfig {
    /// Scraped prices above this are treated as scrape errors.
    pub max_plausible_price: f64,
    /// Heuristic monthly rent as a fraction of price (the "0.7% rule").
    pub rent_to_price_ratio: f64,
    /// Heuristic rent above this triggers the bedroom lookup for
    /// non-commercial properties.
    pub max_residential_rent: f64,
    /// Monthly rent for 1, 2, 3... bedrooms, used when the ratio rent is
    /// implausible. Counts past the end of the table use the last entry.
    pub rent_by_bedrooms: Vec<f64>,
    /// Bedroom count assumed when the real one is unknown.
    pub fallback_bedrooms: u32,
    pub sqft_per_bedroom: f64,
    pub sqft_base: f64,
    pub property_tax_rate: f64,
    pub insurance_rate: f64,
    /// Share of gross rent kept as NOI when back-filling cap rate.
    pub noi_ratio: f64,
    /// Illustrative financing for the back-filled cash-on-cash figure.
    pub backfill_down_payment_ratio: f64,
    pub backfill_interest_rate_percent: f64,
    pub backfill_loan_term_years: u32,
    /// Share of rent assumed to go to operating expenses for that figure.
    pub backfill_expense_ratio: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_plausible_price: 10_000_000.0,
            rent_to_price_ratio: 0.007,
            max_residential_rent: 20_000.0,
            rent_by_bedrooms: vec![2000.0, 2800.0, 3500.0, 4500.0, 5500.0],
            fallback_bedrooms: 3,
            sqft_per_bedroom: 750.0,
            sqft_base: 500.0,
            property_tax_rate: 0.012,
            insurance_rate: 0.0035,
            noi_ratio: 0.6,
            backfill_down_payment_ratio: 0.25,
            backfill_interest_rate_percent: 7.0,
            backfill_loan_term_years: 30,
            backfill_expense_ratio: 0.4,
        }
    }
}

/// Assumptions used by the financial calculation engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalculationConfig {
    /// Annual, as a fraction of price.
    pub property_tax_rate: f64,
    /// Annual, as a fraction of price.
    pub insurance_rate: f64,
    /// Monthly, as a fraction of rent.
    pub maintenance_rate: f64,
    pub vacancy_rate: f64,
    /// Charged only on the long-term `rental` strategy.
    pub management_rate: f64,
    /// Buyer closing costs as a fraction of price.
    pub closing_cost_rate: f64,
    /// Agent commission on resale as a fraction of ARV.
    pub selling_cost_rate: f64,
    /// ARV must exceed price by this multiple for a flip to be viable.
    pub min_arv_multiplier: f64,
    pub cosmetic_multiplier: f64,
    pub moderate_multiplier: f64,
    pub extensive_multiplier: f64,
    pub gut_multiplier: f64,
    pub default_holding_months: u32,
    /// Points at or above this imply a hard-money loan.
    pub hard_money_points_threshold: f64,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            property_tax_rate: 0.012,
            insurance_rate: 0.004,
            maintenance_rate: 0.10,
            vacancy_rate: 0.08,
            management_rate: 0.08,
            closing_cost_rate: 0.03,
            selling_cost_rate: 0.06,
            min_arv_multiplier: 1.15,
            cosmetic_multiplier: 1.12,
            moderate_multiplier: 1.18,
            extensive_multiplier: 1.25,
            gut_multiplier: 1.35,
            default_holding_months: 6,
            hard_money_points_threshold: 2.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> std::result::Result<(), DealError> {
        let f = &self.fusion;
        let c = &self.calculation;

        let fractions = [
            ("fusion.rent_to_price_ratio", f.rent_to_price_ratio),
            ("fusion.property_tax_rate", f.property_tax_rate),
            ("fusion.insurance_rate", f.insurance_rate),
            ("fusion.noi_ratio", f.noi_ratio),
            ("fusion.backfill_down_payment_ratio", f.backfill_down_payment_ratio),
            ("fusion.backfill_expense_ratio", f.backfill_expense_ratio),
            ("calculation.property_tax_rate", c.property_tax_rate),
            ("calculation.insurance_rate", c.insurance_rate),
            ("calculation.maintenance_rate", c.maintenance_rate),
            ("calculation.vacancy_rate", c.vacancy_rate),
            ("calculation.management_rate", c.management_rate),
            ("calculation.closing_cost_rate", c.closing_cost_rate),
            ("calculation.selling_cost_rate", c.selling_cost_rate),
        ];
        for (key, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(DealError::Config(format!("{key} must be within 0..=1, got {value}")));
            }
        }

        if !f.max_plausible_price.is_finite() || f.max_plausible_price <= 0.0 {
            return Err(DealError::Config("fusion.max_plausible_price must be positive".into()));
        }
        if f.rent_by_bedrooms.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(DealError::Config(
                "fusion.rent_by_bedrooms entries must be non-negative".into(),
            ));
        }
        if c.min_arv_multiplier.is_nan() || c.min_arv_multiplier < 1.0 {
            return Err(DealError::Config(format!(
                "calculation.min_arv_multiplier must be at least 1, got {}",
                c.min_arv_multiplier
            )));
        }
        if !(0.0..=100.0).contains(&self.financing.down_payment_percent) {
            return Err(DealError::Config(format!(
                "financing.down_payment_percent must be within 0..=100, got {}",
                self.financing.down_payment_percent
            )));
        }
        if self.financing.loan_term_years == 0 {
            return Err(DealError::Config("financing.loan_term_years must be positive".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
