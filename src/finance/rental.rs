//! Rental-hold metrics: rental, BRRRR, short-term and commercial strategies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::amortization;
use super::{Financing, Strategy};
use crate::config::CalculationConfig;
use crate::money::{percent, round_cents};

/// Monthly operating expenses by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub property_tax: f64,
    pub insurance: f64,
    pub maintenance: f64,
    pub vacancy: f64,
    pub property_management: f64,
}

impl ExpenseBreakdown {
    pub fn total(&self) -> f64 {
        self.property_tax + self.insurance + self.maintenance + self.vacancy + self.property_management
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalMetrics {
    pub monthly_rent: f64,
    pub monthly_payment: f64,          // Principal and interest
    pub total_monthly_expenses: f64,   // P&I plus operating expenses
    pub monthly_cash_flow: f64,
    pub annual_cash_flow: f64,
    #[serde(rename = "annualNOI")]
    pub annual_noi: f64,
    pub cap_rate: f64,                 // %
    pub cash_on_cash_return: f64,      // %
    pub total_return: f64,             // % incl. first-year principal paydown
    pub total_cash_invested: f64,      // Down + rehab + closing
    pub expense_breakdown: ExpenseBreakdown,
}

/// Compute hold metrics for a purchase at `price` renting for `rent`/month.
pub fn analyze(
    config: &CalculationConfig,
    strategy: Strategy,
    price: f64,
    rent: f64,
    financing: &Financing,
    rehab: f64,
) -> RentalMetrics {
    let down = financing.down_payment(price);
    let loan = financing.loan_amount(price);
    let payment = amortization::monthly_payment(
        loan,
        financing.interest_rate_percent,
        financing.loan_term_years,
    );

    let expenses = ExpenseBreakdown {
        property_tax: price * config.property_tax_rate / 12.0,
        insurance: price * config.insurance_rate / 12.0,
        maintenance: rent * config.maintenance_rate,
        vacancy: rent * config.vacancy_rate,
        property_management: if strategy.charges_management() {
            rent * config.management_rate
        } else {
            0.0
        },
    };
    let operating = expenses.total();

    let total_monthly = payment + operating;
    let monthly_cash_flow = rent - total_monthly;
    let annual_cash_flow = monthly_cash_flow * 12.0;
    let annual_noi = (rent - operating) * 12.0;

    let closing = price * config.closing_cost_rate;
    let invested = down + rehab + closing;
    let principal_paydown = amortization::first_year_principal(
        loan,
        financing.interest_rate_percent,
        financing.loan_term_years,
    );

    debug!(
        strategy = %strategy,
        payment = format!("${payment:.2}"),
        operating = format!("${operating:.2}"),
        invested = format!("${invested:.0}"),
        "Rental path computed"
    );

    RentalMetrics {
        monthly_rent: round_cents(rent),
        monthly_payment: round_cents(payment),
        total_monthly_expenses: round_cents(total_monthly),
        monthly_cash_flow: round_cents(monthly_cash_flow),
        annual_cash_flow: round_cents(annual_cash_flow),
        annual_noi: round_cents(annual_noi),
        cap_rate: round_cents(percent(annual_noi, price)),
        cash_on_cash_return: round_cents(percent(annual_cash_flow, invested)),
        total_return: round_cents(percent(annual_cash_flow + principal_paydown, invested)),
        total_cash_invested: round_cents(invested),
        expense_breakdown: ExpenseBreakdown {
            property_tax: round_cents(expenses.property_tax),
            insurance: round_cents(expenses.insurance),
            maintenance: round_cents(expenses.maintenance),
            vacancy: round_cents(expenses.vacancy),
            property_management: round_cents(expenses.property_management),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.006,
            "expected {expected}, got {actual}"
        );
    }

    fn make_metrics(strategy: Strategy) -> RentalMetrics {
        analyze(
            &CalculationConfig::default(),
            strategy,
            250_000.0,
            2000.0,
            &Financing::default(),
            0.0,
        )
    }

    #[test]
    fn test_long_term_rental() {
        let m = make_metrics(Strategy::Rental);
        assert_close(m.monthly_payment, 1330.60);
        assert_close(m.expense_breakdown.property_tax, 250.0);
        assert_close(m.expense_breakdown.insurance, 83.33);
        assert_close(m.expense_breakdown.maintenance, 200.0);
        assert_close(m.expense_breakdown.vacancy, 160.0);
        assert_close(m.expense_breakdown.property_management, 160.0);
        assert_close(m.total_monthly_expenses, 2183.94);
        assert_close(m.monthly_cash_flow, -183.94);
        assert_close(m.annual_cash_flow, -2207.26);
        assert_close(m.annual_noi, 13_760.0);
        assert_close(m.cap_rate, 5.50);
        assert_close(m.total_cash_invested, 57_500.0);
        assert_close(m.cash_on_cash_return, -3.84);
        assert_close(m.total_return, -0.31);
    }

    #[test]
    fn test_management_only_for_rental() {
        for strategy in [Strategy::Brrrr, Strategy::Airbnb, Strategy::Commercial] {
            let m = make_metrics(strategy);
            assert_eq!(m.expense_breakdown.property_management, 0.0);
            assert_close(m.annual_noi, 15_680.0);
            assert_close(m.cap_rate, 6.27);
            assert_close(m.total_return, 3.03);
        }
    }

    #[test]
    fn test_rehab_adds_to_cash_invested() {
        let m = analyze(
            &CalculationConfig::default(),
            Strategy::Brrrr,
            250_000.0,
            2000.0,
            &Financing::default(),
            25_000.0,
        );
        assert_close(m.total_cash_invested, 82_500.0);
    }

    #[test]
    fn test_all_cash_purchase() {
        let financing = Financing { down_payment_percent: 100.0, ..Financing::default() };
        let m = analyze(
            &CalculationConfig::default(),
            Strategy::Rental,
            250_000.0,
            2000.0,
            &financing,
            0.0,
        );
        assert_eq!(m.monthly_payment, 0.0);
        // No debt service: cash flow equals NOI
        assert_close(m.annual_cash_flow, m.annual_noi);
        assert_close(m.total_return, m.cash_on_cash_return);
    }

    #[test]
    fn test_zero_price_does_not_divide() {
        let m = analyze(
            &CalculationConfig::default(),
            Strategy::Rental,
            0.0,
            1500.0,
            &Financing::default(),
            0.0,
        );
        assert_eq!(m.cap_rate, 0.0);
        assert_eq!(m.cash_on_cash_return, 0.0);
        assert_eq!(m.total_return, 0.0);
        assert!(m.annual_noi > 0.0);
    }

    #[test]
    fn test_annual_noi_serialized_name() {
        let json = serde_json::to_value(make_metrics(Strategy::Rental)).unwrap();
        assert!(json.get("annualNOI").is_some());
        assert!(json.get("cashOnCashReturn").is_some());
    }
}
