//! Fixed-rate loan amortization.
//!
//! Monthly payment: `M = P * r(1+r)^n / ((1+r)^n - 1)` with `r` the monthly
//! rate and `n` the number of payments.

use serde::{Deserialize, Serialize};

/// One month of an amortization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    /// 1-based payment number.
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    /// Balance remaining after this payment.
    pub balance: f64,
}

/// Monthly principal-and-interest payment on a fixed-rate loan.
///
/// Returns 0 for a non-positive principal or a zero-length term. A zero
/// rate degenerates to straight-line repayment.
pub fn monthly_payment(principal: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let n = term_years.saturating_mul(12);
    if principal <= 0.0 || !principal.is_finite() || n == 0 {
        return 0.0;
    }
    let r = monthly_rate(annual_rate_percent);
    if r <= 0.0 {
        return principal / n as f64;
    }
    let growth = (1.0 + r).powi(n as i32);
    let payment = principal * (r * growth) / (growth - 1.0);
    if payment.is_finite() {
        payment
    } else {
        0.0
    }
}

/// The first `months` rows of the schedule for a loan.
///
/// Stops early once the balance is paid off.
pub fn schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    months: u32,
) -> Vec<AmortizationRow> {
    let payment = monthly_payment(principal, annual_rate_percent, term_years);
    if payment <= 0.0 {
        return Vec::new();
    }
    let r = monthly_rate(annual_rate_percent);
    let total = months.min(term_years.saturating_mul(12));

    let mut rows = Vec::with_capacity(total as usize);
    let mut balance = principal;
    for month in 1..=total {
        if balance <= 0.0 {
            break;
        }
        let interest = balance * r;
        let principal_part = (payment - interest).min(balance);
        balance -= principal_part;
        rows.push(AmortizationRow {
            month,
            payment: interest + principal_part,
            interest,
            principal: principal_part,
            balance: balance.max(0.0),
        });
    }
    rows
}

/// Principal repaid over the first twelve payments (first-year equity build).
pub fn first_year_principal(principal: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    schedule(principal, annual_rate_percent, term_years, 12)
        .iter()
        .map(|row| row.principal)
        .sum()
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    if annual_rate_percent.is_finite() && annual_rate_percent > 0.0 {
        annual_rate_percent / 100.0 / 12.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_thirty_year_payment() {
        // $200k at 6% over 30 years is the textbook $1,199.10
        let payment = monthly_payment(200_000.0, 6.0, 30);
        assert!((payment - 1199.10).abs() < 0.01, "got {payment}");
    }

    #[test]
    fn test_seven_percent_payment() {
        // $240k at 7% over 30 years ≈ $1,596.73
        let payment = monthly_payment(240_000.0, 7.0, 30);
        assert!((payment - 1596.73).abs() < 0.01, "got {payment}");
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let payment = monthly_payment(120_000.0, 0.0, 10);
        assert!((payment - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_pay_nothing() {
        assert_eq!(monthly_payment(0.0, 7.0, 30), 0.0);
        assert_eq!(monthly_payment(-5.0, 7.0, 30), 0.0);
        assert_eq!(monthly_payment(100_000.0, 7.0, 0), 0.0);
        assert_eq!(monthly_payment(f64::NAN, 7.0, 30), 0.0);
    }

    #[test]
    fn test_schedule_splits_interest_and_principal() {
        let rows = schedule(200_000.0, 6.0, 30, 12);
        assert_eq!(rows.len(), 12);
        // First month: 200k * 0.5% = $1,000 interest
        assert!((rows[0].interest - 1000.0).abs() < 1e-6);
        assert!((rows[0].principal - 199.10).abs() < 0.01);
        // Interest share falls as balance declines
        assert!(rows[11].interest < rows[0].interest);
        assert!(rows[11].principal > rows[0].principal);
        assert!(rows[11].balance < rows[0].balance);
    }

    #[test]
    fn test_full_schedule_pays_off_loan() {
        let rows = schedule(50_000.0, 5.0, 5, 60);
        assert_eq!(rows.len(), 60);
        assert!(rows.last().unwrap().balance < 0.01);
        let repaid: f64 = rows.iter().map(|r| r.principal).sum();
        assert!((repaid - 50_000.0).abs() < 0.01);
    }

    #[test]
    fn test_schedule_capped_at_term() {
        let rows = schedule(10_000.0, 5.0, 1, 36);
        assert_eq!(rows.len(), 12);
    }

    #[test]
    fn test_first_year_principal() {
        let principal = first_year_principal(200_000.0, 6.0, 30);
        // Roughly $2,456 of principal in year one of a 6% 30-year loan
        assert!((principal - 2456.0).abs() < 1.0, "got {principal}");
    }

    #[test]
    fn test_first_year_principal_no_loan() {
        assert_eq!(first_year_principal(0.0, 7.0, 30), 0.0);
    }
}
