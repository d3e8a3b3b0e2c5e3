//! Financial calculation engine.
//!
//! Turns a merged property record plus a chosen investment strategy into
//! either rental-hold metrics or fix-and-flip metrics. Pure and infallible:
//! missing inputs count as zero and every degenerate division resolves to 0.

pub mod amortization;
pub mod flip;
pub mod rental;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::config::CalculationConfig;
use crate::fusion::MergedPropertyRecord;
pub use flip::FlipMetrics;
pub use rental::{ExpenseBreakdown, RentalMetrics};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Investment strategy. Everything except `Flip` uses the rental path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Rental,
    Flip,
    Brrrr,
    Airbnb,
    Commercial,
}

impl Strategy {
    pub fn is_flip(&self) -> bool {
        matches!(self, Strategy::Flip)
    }

    /// Third-party management is only budgeted for long-term rentals.
    pub fn charges_management(&self) -> bool {
        matches!(self, Strategy::Rental)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Rental => write!(f, "rental"),
            Strategy::Flip => write!(f, "flip"),
            Strategy::Brrrr => write!(f, "brrrr"),
            Strategy::Airbnb => write!(f, "airbnb"),
            Strategy::Commercial => write!(f, "commercial"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rental" | "buy-and-hold" | "buyandhold" | "hold" | "ltr" => Ok(Strategy::Rental),
            "flip" | "fix-and-flip" | "fixandflip" => Ok(Strategy::Flip),
            "brrrr" => Ok(Strategy::Brrrr),
            "airbnb" | "str" | "short-term" => Ok(Strategy::Airbnb),
            "commercial" => Ok(Strategy::Commercial),
            _ => Err(anyhow::anyhow!("Unknown strategy: {s}")),
        }
    }
}

/// Loan terms for the purchase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Financing {
    #[serde(alias = "down_payment_percent")]
    pub down_payment_percent: f64,
    #[serde(alias = "interest_rate_percent")]
    pub interest_rate_percent: f64,
    #[serde(alias = "loan_term_years")]
    pub loan_term_years: u32,
}

impl Default for Financing {
    fn default() -> Self {
        Self {
            down_payment_percent: 20.0,
            interest_rate_percent: 7.0,
            loan_term_years: 30,
        }
    }
}

impl Financing {
    /// Cash down for a purchase at `price`, clamped to `[0, price]`.
    pub fn down_payment(&self, price: f64) -> f64 {
        let pct = if self.down_payment_percent.is_finite() {
            self.down_payment_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        (price * pct / 100.0).max(0.0)
    }

    pub fn loan_amount(&self, price: f64) -> f64 {
        (price - self.down_payment(price)).max(0.0)
    }
}

/// Scope of a renovation; sets the ARV uplift when no valid ARV is supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenovationLevel {
    Cosmetic,
    #[default]
    Moderate,
    Extensive,
    Gut,
}

impl fmt::Display for RenovationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenovationLevel::Cosmetic => write!(f, "cosmetic"),
            RenovationLevel::Moderate => write!(f, "moderate"),
            RenovationLevel::Extensive => write!(f, "extensive"),
            RenovationLevel::Gut => write!(f, "gut"),
        }
    }
}

impl std::str::FromStr for RenovationLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosmetic" | "light" => Ok(RenovationLevel::Cosmetic),
            "moderate" | "medium" => Ok(RenovationLevel::Moderate),
            "extensive" | "heavy" => Ok(RenovationLevel::Extensive),
            "gut" | "full" | "gut-rehab" => Ok(RenovationLevel::Gut),
            _ => Err(anyhow::anyhow!("Unknown renovation level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    #[default]
    Conventional,
    HardMoney,
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanType::Conventional => write!(f, "conventional"),
            LoanType::HardMoney => write!(f, "hard_money"),
        }
    }
}

impl std::str::FromStr for LoanType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match key.as_str() {
            "conventional" | "mortgage" => Ok(LoanType::Conventional),
            "hardmoney" | "hml" | "bridge" => Ok(LoanType::HardMoney),
            _ => Err(anyhow::anyhow!("Unknown loan type: {s}")),
        }
    }
}

/// Optional strategy-specific inputs, mostly for flips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyDetails {
    pub rehab_costs: Option<f64>,
    /// After-repair value claimed by the caller. Only trusted above the floor.
    pub arv: Option<f64>,
    pub renovation_level: RenovationLevel,
    pub holding_period_months: Option<u32>,
    /// Stated loan type. Points at or above the hard-money threshold override it.
    pub loan_type: Option<LoanType>,
    /// Origination points, as a percentage of the loan.
    pub points: Option<f64>,
    /// Figures persisted by an earlier calculation.
    pub stored_net_profit: Option<f64>,
    pub stored_roi: Option<f64>,
}

impl StrategyDetails {
    /// Rehab budget, 0 when absent or invalid.
    pub fn rehab(&self) -> f64 {
        self.rehab_costs
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Result of a calculation. Exactly one shape is populated; the other is
/// zero-filled so the serialized form always carries every key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub strategy: Strategy,
    #[serde(flatten)]
    rental: RentalMetrics,
    #[serde(flatten)]
    flip: FlipMetrics,
}

impl FinancialMetrics {
    pub fn from_rental(strategy: Strategy, rental: RentalMetrics) -> Self {
        Self {
            strategy,
            rental,
            flip: FlipMetrics::default(),
        }
    }

    pub fn from_flip(flip: FlipMetrics) -> Self {
        Self {
            strategy: Strategy::Flip,
            rental: RentalMetrics::default(),
            flip,
        }
    }

    /// Rental-hold metrics, or `None` for a flip.
    pub fn rental(&self) -> Option<&RentalMetrics> {
        (!self.strategy.is_flip()).then_some(&self.rental)
    }

    /// Flip metrics, or `None` for a rental-path strategy.
    pub fn flip(&self) -> Option<&FlipMetrics> {
        self.strategy.is_flip().then_some(&self.flip)
    }

    /// The strategy's headline return: cash-on-cash for holds, ROI for flips.
    pub fn headline_return(&self) -> f64 {
        if self.strategy.is_flip() {
            self.flip.roi
        } else {
            self.rental.cash_on_cash_return
        }
    }
}

impl fmt::Display for FinancialMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strategy.is_flip() {
            write!(
                f,
                "[flip] ARV ${:.0} | profit ${:.0} | ROI {:.2}% | margin {:.2}% | {} months",
                self.flip.after_repair_value,
                self.flip.net_profit,
                self.flip.roi,
                self.flip.profit_margin,
                self.flip.holding_period_months,
            )
        } else {
            write!(
                f,
                "[{}] cash flow ${:.0}/mo | cap {:.2}% | CoC {:.2}% | total {:.2}%",
                self.strategy,
                self.rental.monthly_cash_flow,
                self.rental.cap_rate,
                self.rental.cash_on_cash_return,
                self.rental.total_return,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes [`FinancialMetrics`] for a merged record.
#[derive(Debug, Clone, Default)]
pub struct FinanceEngine {
    config: CalculationConfig,
}

impl FinanceEngine {
    pub fn new(config: CalculationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    /// Run the strategy's calculation path against `record`.
    pub fn calculate(
        &self,
        record: &MergedPropertyRecord,
        strategy: Strategy,
        financing: &Financing,
        details: Option<&StrategyDetails>,
    ) -> FinancialMetrics {
        let default_details = StrategyDetails::default();
        let details = details.unwrap_or(&default_details);
        let price = amount(record.price);

        let metrics = if strategy.is_flip() {
            FinancialMetrics::from_flip(flip::analyze(&self.config, price, financing, details))
        } else {
            let rent = amount(record.monthly_rent);
            FinancialMetrics::from_rental(
                strategy,
                rental::analyze(&self.config, strategy, price, rent, financing, details.rehab()),
            )
        };

        info!(
            address = record.address.as_deref().unwrap_or("<unknown>"),
            strategy = %strategy,
            headline = format!("{:.2}%", metrics.headline_return()),
            "Financial metrics calculated"
        );

        metrics
    }
}

/// Calculate with the default assumptions.
pub fn calculate(
    record: &MergedPropertyRecord,
    strategy: Strategy,
    financing: &Financing,
    details: Option<&StrategyDetails>,
) -> FinancialMetrics {
    FinanceEngine::default().calculate(record, strategy, financing, details)
}

/// A record amount as a usable number: absent, negative or non-finite is 0.
fn amount(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{merge, MergeOptions};
    use crate::types::{PropertyFields, ProviderRecord, SourceKind};
    use chrono::{DateTime, Utc};

    fn make_record(price: Option<f64>, rent: Option<f64>) -> MergedPropertyRecord {
        let scraped = ProviderRecord::new(
            SourceKind::Scraped,
            DateTime::<Utc>::UNIX_EPOCH,
            PropertyFields {
                address: Some("77 Harbor Rd".into()),
                price,
                monthly_rent: rent,
                ..Default::default()
            },
        );
        merge(Some(scraped), None, &MergeOptions::with_heuristics(false))
    }

    fn all_numbers(value: &serde_json::Value) -> Vec<f64> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().into_iter().collect(),
            serde_json::Value::Object(map) => map.values().flat_map(all_numbers).collect(),
            serde_json::Value::Array(items) => items.iter().flat_map(all_numbers).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("FLIP".parse::<Strategy>().unwrap(), Strategy::Flip);
        assert_eq!(" Rental ".parse::<Strategy>().unwrap(), Strategy::Rental);
        assert_eq!("fix-and-flip".parse::<Strategy>().unwrap(), Strategy::Flip);
        assert!("timeshare".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_loan_type_and_renovation_from_str() {
        assert_eq!("Hard Money".parse::<LoanType>().unwrap(), LoanType::HardMoney);
        assert_eq!("hard_money".parse::<LoanType>().unwrap(), LoanType::HardMoney);
        assert_eq!("GUT".parse::<RenovationLevel>().unwrap(), RenovationLevel::Gut);
        assert!("spa".parse::<RenovationLevel>().is_err());
    }

    #[test]
    fn test_financing_clamps_down_payment() {
        let f = Financing { down_payment_percent: 150.0, ..Financing::default() };
        assert_eq!(f.down_payment(100_000.0), 100_000.0);
        assert_eq!(f.loan_amount(100_000.0), 0.0);
        let f = Financing { down_payment_percent: -5.0, ..Financing::default() };
        assert_eq!(f.down_payment(100_000.0), 0.0);
    }

    #[test]
    fn test_financing_deserializes_both_casings() {
        let camel: Financing =
            serde_json::from_str(r#"{"downPaymentPercent": 25, "loanTermYears": 15}"#).unwrap();
        assert_eq!(camel.down_payment_percent, 25.0);
        assert_eq!(camel.loan_term_years, 15);
        assert_eq!(camel.interest_rate_percent, 7.0);
    }

    #[test]
    fn test_rental_strategy_exposes_only_rental_shape() {
        let record = make_record(Some(250_000.0), Some(2000.0));
        let metrics = calculate(&record, Strategy::Rental, &Financing::default(), None);
        assert!(metrics.rental().is_some());
        assert!(metrics.flip().is_none());
        assert_eq!(metrics.flip, FlipMetrics::default());
    }

    #[test]
    fn test_flip_strategy_exposes_only_flip_shape() {
        let record = make_record(Some(300_000.0), Some(2000.0));
        let metrics = calculate(&record, Strategy::Flip, &Financing::default(), None);
        assert!(metrics.flip().is_some());
        assert!(metrics.rental().is_none());
        assert_eq!(metrics.rental, RentalMetrics::default());
        assert_eq!(metrics.flip().unwrap().after_repair_value, 354_000.0);
    }

    #[test]
    fn test_metrics_serialize_both_shapes_flat() {
        let record = make_record(Some(250_000.0), Some(2000.0));
        let metrics = calculate(&record, Strategy::Brrrr, &Financing::default(), None);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["strategy"], "brrrr");
        assert!(json["capRate"].as_f64().unwrap() > 0.0);
        assert_eq!(json["netProfit"].as_f64(), Some(0.0));
        assert!(json["expenseBreakdown"]["propertyTax"].is_number());
    }

    #[test]
    fn test_empty_record_produces_finite_zeros() {
        let record = make_record(None, None);
        for strategy in [
            Strategy::Rental,
            Strategy::Flip,
            Strategy::Brrrr,
            Strategy::Airbnb,
            Strategy::Commercial,
        ] {
            let metrics = calculate(&record, strategy, &Financing::default(), None);
            let json = serde_json::to_value(&metrics).unwrap();
            for n in all_numbers(&json) {
                assert!(n.is_finite(), "{strategy} produced {n}");
            }
        }
    }

    #[test]
    fn test_degenerate_financing_stays_finite() {
        let record = make_record(Some(250_000.0), Some(2000.0));
        let financing = Financing {
            down_payment_percent: 0.0,
            interest_rate_percent: f64::NAN,
            loan_term_years: 0,
        };
        for strategy in [Strategy::Rental, Strategy::Flip] {
            let metrics = calculate(&record, strategy, &financing, None);
            let json = serde_json::to_value(&metrics).unwrap();
            for n in all_numbers(&json) {
                assert!(n.is_finite());
            }
        }
    }

    #[test]
    fn test_display_headline() {
        let record = make_record(Some(300_000.0), None);
        let metrics = calculate(&record, Strategy::Flip, &Financing::default(), None);
        let display = format!("{metrics}");
        assert!(display.starts_with("[flip] ARV $354000"));
    }
}
