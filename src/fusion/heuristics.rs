//! Heuristic defaults for fields no provider supplied.
//!
//! Only consulted when both the scraped and the valuation tiers are silent,
//! and always tagged low confidence by the caller.

use tracing::debug;

use crate::config::FusionConfig;
use crate::types::PropertyType;

/// Synthesizes fallback values from already-resolved facts.
pub struct HeuristicEstimator<'a> {
    config: &'a FusionConfig,
}

impl<'a> HeuristicEstimator<'a> {
    pub fn new(config: &'a FusionConfig) -> Self {
        Self { config }
    }

    /// Monthly rent from the rent-to-price ratio.
    ///
    /// Very expensive residential properties would produce absurd rents under
    /// a flat ratio, so above the residential ceiling the bedroom table is
    /// used instead. Commercial properties keep the ratio figure.
    pub fn monthly_rent(
        &self,
        price: Option<f64>,
        bedrooms: Option<u32>,
        property_type: Option<PropertyType>,
    ) -> Option<f64> {
        let price = price?;
        let by_ratio = price * self.config.rent_to_price_ratio;
        let commercial = property_type.map(|t| t.is_commercial()).unwrap_or(false);

        if by_ratio > self.config.max_residential_rent && !commercial {
            let rent = self.rent_for_bedrooms(bedrooms);
            debug!(
                ratio_rent = format!("${by_ratio:.0}"),
                bedroom_rent = ?rent,
                bedrooms = ?bedrooms,
                "Ratio rent implausible, using bedroom table"
            );
            return rent;
        }
        Some(by_ratio)
    }

    /// Look up rent by bedroom count, clamping into the table's range.
    pub fn rent_for_bedrooms(&self, bedrooms: Option<u32>) -> Option<f64> {
        let table = &self.config.rent_by_bedrooms;
        if table.is_empty() {
            return None;
        }
        let beds = bedrooms.unwrap_or(self.config.fallback_bedrooms).max(1) as usize;
        let index = beds.min(table.len()) - 1;
        table.get(index).copied()
    }

    /// Square footage from bedroom count; unknown without one.
    pub fn square_footage(&self, bedrooms: Option<u32>) -> Option<f64> {
        bedrooms.map(|b| b as f64 * self.config.sqft_per_bedroom + self.config.sqft_base)
    }

    /// Annual property taxes.
    pub fn property_taxes(&self, price: Option<f64>) -> Option<f64> {
        price.map(|p| p * self.config.property_tax_rate)
    }

    /// Annual insurance premium.
    pub fn insurance(&self, price: Option<f64>) -> Option<f64> {
        price.map(|p| p * self.config.insurance_rate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
