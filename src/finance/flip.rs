//! Fix-and-flip metrics.
//!
//! ARV is validated against a floor of `price * min_arv_multiplier` on every
//! call, using the cent-rounded figures that are reported. Figures persisted by
//! an earlier calculation are reused when they are usable and the purchase
//! price is positive.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::amortization;
use super::{Financing, LoanType, RenovationLevel, StrategyDetails};
use crate::config::CalculationConfig;
use crate::money::{ceil_cents, percent, round_cents};

/// Margin added to the floor when a renovation multiplier would land on or
/// below it.
const ARV_FLOOR_MARGIN: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipMetrics {
    pub purchase_price: f64,
    pub rehab_costs: f64,
    pub total_investment: f64,     // Cash in: down + rehab + closing
    pub after_repair_value: f64,
    pub net_profit: f64,
    pub roi: f64,                  // % of cash invested
    pub profit_margin: f64,        // % of ARV
    pub holding_period_months: u32,
}

/// Compute flip metrics for a purchase at `price`.
pub fn analyze(
    config: &CalculationConfig,
    price: f64,
    financing: &Financing,
    details: &StrategyDetails,
) -> FlipMetrics {
    let rehab = details.rehab();
    let arv = after_repair_value(config, price, details);
    let months = details
        .holding_period_months
        .filter(|m| *m > 0)
        .unwrap_or(config.default_holding_months);

    let down = financing.down_payment(price);
    let closing = price * config.closing_cost_rate;
    let total_investment = down + rehab + closing;

    let (net_profit, roi) = match stored_figures(details).filter(|_| price > 0.0) {
        Some((profit, roi)) => {
            debug!(net_profit = profit, roi, "Reusing stored flip figures");
            (profit, roi)
        }
        None => {
            let holding = holding_costs(config, price, financing, details, months);
            let selling = arv * config.selling_cost_rate;
            let profit = arv - (price + rehab + closing + holding + selling);
            debug!(
                holding = format!("${holding:.2}"),
                selling = format!("${selling:.2}"),
                profit = format!("${profit:.2}"),
                "Flip recomputed"
            );
            (profit, percent(profit, total_investment))
        }
    };

    FlipMetrics {
        purchase_price: round_cents(price),
        rehab_costs: round_cents(rehab),
        total_investment: round_cents(total_investment),
        after_repair_value: round_cents(arv),
        net_profit: round_cents(net_profit),
        roi: round_cents(roi),
        profit_margin: round_cents(percent(net_profit, arv)),
        holding_period_months: months,
    }
}

/// The ARV to use, already at cent precision and strictly above the floor
/// computed from the cent-rounded price.
fn after_repair_value(config: &CalculationConfig, price: f64, details: &StrategyDetails) -> f64 {
    let floor = round_cents(price) * config.min_arv_multiplier;

    if let Some(arv) = details.arv.filter(|a| a.is_finite()) {
        let arv = round_cents(arv);
        if arv > floor {
            return arv;
        }
        warn!(
            arv = format!("${arv:.2}"),
            floor = format!("${floor:.2}"),
            "Supplied ARV at or below floor, recomputing"
        );
    }

    let base = round_cents(price);
    let multiplier = renovation_multiplier(config, details.renovation_level);
    let mut arv = ceil_cents(base * multiplier);
    if base > 0.0 && arv <= floor {
        arv = ceil_cents(base * (config.min_arv_multiplier + ARV_FLOOR_MARGIN));
    }
    debug!(
        level = %details.renovation_level,
        arv = format!("${arv:.2}"),
        "ARV estimated from renovation level"
    );
    arv
}

fn renovation_multiplier(config: &CalculationConfig, level: RenovationLevel) -> f64 {
    match level {
        RenovationLevel::Cosmetic => config.cosmetic_multiplier,
        RenovationLevel::Moderate => config.moderate_multiplier,
        RenovationLevel::Extensive => config.extensive_multiplier,
        RenovationLevel::Gut => config.gut_multiplier,
    }
}

/// Stored profit and ROI, when both are present, finite and non-zero.
fn stored_figures(details: &StrategyDetails) -> Option<(f64, f64)> {
    let usable = |v: Option<f64>| v.filter(|x| x.is_finite() && *x != 0.0);
    match (usable(details.stored_net_profit), usable(details.stored_roi)) {
        (Some(profit), Some(roi)) => Some((profit, roi)),
        _ => None,
    }
}

/// Effective loan type. Points at or above the threshold mean hard money
/// whatever the stated type; below it the stated type applies.
pub fn loan_type(config: &CalculationConfig, details: &StrategyDetails) -> LoanType {
    match details.points {
        Some(p) if p.is_finite() && p >= config.hard_money_points_threshold => {
            if details.loan_type == Some(LoanType::Conventional) {
                debug!(points = p, "Points imply hard money, overriding stated loan type");
            }
            LoanType::HardMoney
        }
        _ => details.loan_type.unwrap_or(LoanType::Conventional),
    }
}

/// Financing plus tax and insurance over the holding period. The monthly
/// payment always amortizes over the full loan term.
fn holding_costs(
    config: &CalculationConfig,
    price: f64,
    financing: &Financing,
    details: &StrategyDetails,
    months: u32,
) -> f64 {
    let loan = financing.loan_amount(price);
    let held = months as f64;

    let financing_cost = match loan_type(config, details) {
        LoanType::Conventional => {
            amortization::monthly_payment(
                loan,
                financing.interest_rate_percent,
                financing.loan_term_years,
            ) * held
        }
        LoanType::HardMoney => {
            let rate = if financing.interest_rate_percent.is_finite() {
                financing.interest_rate_percent.max(0.0)
            } else {
                0.0
            };
            let points = details
                .points
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0);
            loan * rate / 100.0 / 12.0 * held + loan * points / 100.0
        }
    };

    let carrying = price * (config.property_tax_rate + config.insurance_rate) / 12.0 * held;
    financing_cost + carrying
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
