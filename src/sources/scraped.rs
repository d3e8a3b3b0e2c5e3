//! Web-scraped listing payload.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{comparables, lenient_datetime, lenient_f64, lenient_u32, non_blank, ComparablePayload};
use crate::types::{
    Coordinates, DealError, PropertyFields, PropertyType, ProviderRecord, SourceKind,
};

/// A listing as the scraper emits it. Every field is optional and numeric
/// fields tolerate formatted text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapedListing {
    pub url: Option<String>,
    #[serde(alias = "streetAddress")]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "zipCode", alias = "postalCode")]
    pub zip: Option<String>,
    #[serde(deserialize_with = "lenient_f64", alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(alias = "homeType")]
    pub property_type: Option<String>,

    #[serde(deserialize_with = "lenient_f64", alias = "listPrice", alias = "askingPrice")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_u32", alias = "beds")]
    pub bedrooms: Option<u32>,
    #[serde(deserialize_with = "lenient_f64", alias = "baths")]
    pub bathrooms: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "sqft", alias = "livingArea")]
    pub square_footage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "lotSqft")]
    pub lot_size: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub year_built: Option<u32>,

    #[serde(deserialize_with = "lenient_f64", alias = "rent")]
    pub monthly_rent: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "rentZestimate")]
    pub rent_estimate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "zestimate")]
    pub estimated_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "taxes", alias = "annualTaxes")]
    pub property_taxes: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "hoa", alias = "monthlyHoa")]
    pub hoa_fees: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "annualInsurance")]
    pub insurance: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub cap_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub noi: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "rehabEstimate")]
    pub estimated_rehab: Option<f64>,

    #[serde(deserialize_with = "lenient_u32")]
    pub days_on_market: Option<u32>,
    #[serde(alias = "status", alias = "homeStatus")]
    pub listing_status: Option<String>,
    pub comparables: Vec<ComparablePayload>,
    #[serde(alias = "photos")]
    pub images: Vec<String>,
    pub description: Option<String>,

    #[serde(deserialize_with = "lenient_datetime")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ScrapedListing {
    pub fn from_json(raw: &str) -> Result<Self, DealError> {
        serde_json::from_str(raw).map_err(|e| DealError::InvalidPayload {
            source_kind: SourceKind::Scraped,
            message: e.to_string(),
        })
    }

    /// Convert into a scraped-tier record, stamped with `scrapedAt` when the
    /// payload has one.
    pub fn into_record(self, fallback_at: DateTime<Utc>) -> ProviderRecord {
        let observed_at = self.scraped_at.unwrap_or(fallback_at);
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };

        let fields = PropertyFields {
            address: non_blank(self.address),
            city: non_blank(self.city),
            state: non_blank(self.state),
            zip: non_blank(self.zip),
            coordinates,
            property_type: self.property_type.as_deref().and_then(PropertyType::from_label),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            square_footage: self.square_footage,
            lot_size: self.lot_size,
            year_built: self.year_built,
            price: self.price,
            avm_price: self.estimated_value,
            monthly_rent: self.monthly_rent,
            rent_estimate: self.rent_estimate,
            rent_range: None,
            cap_rate: self.cap_rate,
            noi: self.noi,
            property_taxes: self.property_taxes,
            hoa_fees: self.hoa_fees,
            insurance: self.insurance,
            estimated_rehab: self.estimated_rehab,
            days_on_market: self.days_on_market,
            listing_status: non_blank(self.listing_status),
            comparables: comparables(self.comparables),
            images: self
                .images
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            description: non_blank(self.description),
        };

        ProviderRecord::new(SourceKind::Scraped, observed_at, fields)
    }
}
