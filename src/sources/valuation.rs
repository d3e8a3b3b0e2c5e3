//! Valuation / rental-estimate API payload.
//!
//! The API groups its answer into sub-objects, each optional:
//! `property` (public-record facts), `value` (AVM), `rental` (rent
//! estimate), `comparables`, `listing` (active listing, if any) and
//! `neighborhood` (area medians).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{comparables, lenient_datetime, lenient_f64, lenient_u32, non_blank, ComparablePayload};
use crate::types::{
    Coordinates, DealError, PropertyFields, PropertyType, ProviderRecord, RentRange, SourceKind,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuationReport {
    pub property: PropertyFacts,
    pub value: ValueEstimate,
    pub rental: RentalEstimate,
    pub comparables: Vec<ComparablePayload>,
    pub listing: Option<ActiveListing>,
    pub neighborhood: Option<NeighborhoodContext>,
    #[serde(deserialize_with = "lenient_datetime")]
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyFacts {
    #[serde(alias = "formattedAddress", alias = "addressLine1")]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "zipCode")]
    pub zip: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    pub property_type: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub bedrooms: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bathrooms: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub square_footage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lot_size: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub year_built: Option<u32>,
    /// Annual.
    #[serde(deserialize_with = "lenient_f64")]
    pub property_taxes: Option<f64>,
    /// Monthly.
    #[serde(deserialize_with = "lenient_f64", alias = "hoaFee")]
    pub hoa_fees: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValueEstimate {
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_range_low: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_range_high: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RentalEstimate {
    #[serde(deserialize_with = "lenient_f64")]
    pub rent: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rent_range_low: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rent_range_high: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveListing {
    #[serde(deserialize_with = "lenient_f64", alias = "listPrice")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub days_on_market: Option<u32>,
    pub status: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "photos")]
    pub images: Vec<String>,
}

/// Area-level medians. Context for the reader, never property facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NeighborhoodContext {
    #[serde(deserialize_with = "lenient_f64")]
    pub median_price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub median_rent: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub median_days_on_market: Option<f64>,
}

impl ValuationReport {
    pub fn from_json(raw: &str) -> Result<Self, DealError> {
        serde_json::from_str(raw).map_err(|e| DealError::InvalidPayload {
            source_kind: SourceKind::EstimatedApi,
            message: e.to_string(),
        })
    }

    /// Convert into a valuation-tier record, stamped with `fetchedAt` when
    /// the payload has one.
    pub fn into_record(self, fallback_at: DateTime<Utc>) -> ProviderRecord {
        let observed_at = self.fetched_at.unwrap_or(fallback_at);
        let property = self.property;
        let listing = self.listing.unwrap_or_default();

        if let Some(n) = &self.neighborhood {
            debug!(
                median_price = ?n.median_price,
                median_rent = ?n.median_rent,
                "Neighborhood context received (not merged)"
            );
        }

        let coordinates = match (property.latitude, property.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        let rent_range = match (self.rental.rent_range_low, self.rental.rent_range_high) {
            (Some(low), Some(high)) => Some(RentRange { low, high }),
            _ => None,
        };

        let fields = PropertyFields {
            address: non_blank(property.address),
            city: non_blank(property.city),
            state: non_blank(property.state),
            zip: non_blank(property.zip),
            coordinates,
            property_type: property.property_type.as_deref().and_then(PropertyType::from_label),
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            square_footage: property.square_footage,
            lot_size: property.lot_size,
            year_built: property.year_built,
            price: listing.price,
            avm_price: self.value.price,
            monthly_rent: None,
            rent_estimate: self.rental.rent,
            rent_range,
            cap_rate: None,
            noi: None,
            property_taxes: property.property_taxes,
            hoa_fees: property.hoa_fees,
            insurance: None,
            estimated_rehab: None,
            days_on_market: listing.days_on_market,
            listing_status: non_blank(listing.status),
            comparables: comparables(self.comparables),
            images: listing.images,
            description: non_blank(listing.description),
        };

        ProviderRecord::new(SourceKind::EstimatedApi, observed_at, fields)
    }
}
