//! Shared types for the DEALSCOPE engine.
//!
//! Provider payloads, provenance metadata and the small value types used by
//! both the fusion and the finance modules live here so neither depends on
//! the other's internals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which class of provider supplied a value.
///
/// Declaration order is priority order: earlier variants win field conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Scraped,
    EstimatedApi,
    Heuristic,
}

impl SourceKind {
    /// All source kinds in priority order.
    pub const ALL: &'static [SourceKind] = &[
        SourceKind::Scraped,
        SourceKind::EstimatedApi,
        SourceKind::Heuristic,
    ];

    /// Confidence assigned to an ordinary field taken from this source.
    pub fn default_confidence(&self) -> Confidence {
        match self {
            SourceKind::Scraped => Confidence::High,
            SourceKind::EstimatedApi => Confidence::Medium,
            SourceKind::Heuristic => Confidence::Low,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Scraped => write!(f, "scraped"),
            SourceKind::EstimatedApi => write!(f, "estimated_api"),
            SourceKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// How much a field value can be trusted. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Broad property classification used by the rent heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    SingleFamily,
    MultiFamily,
    Condo,
    Townhouse,
    Manufactured,
    Land,
    Commercial,
    Other,
}

impl PropertyType {
    pub fn is_commercial(&self) -> bool {
        matches!(self, PropertyType::Commercial)
    }

    /// Parse a free-form provider label, mapping anything unknown to `Other`.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.parse().unwrap_or(PropertyType::Other))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::SingleFamily => write!(f, "Single Family"),
            PropertyType::MultiFamily => write!(f, "Multi Family"),
            PropertyType::Condo => write!(f, "Condo"),
            PropertyType::Townhouse => write!(f, "Townhouse"),
            PropertyType::Manufactured => write!(f, "Manufactured"),
            PropertyType::Land => write!(f, "Land"),
            PropertyType::Commercial => write!(f, "Commercial"),
            PropertyType::Other => write!(f, "Other"),
        }
    }
}

/// Case-insensitive parse accepting the labels listing sites commonly use.
impl std::str::FromStr for PropertyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match key.as_str() {
            "singlefamily" | "singlefamilyresidence" | "sfr" | "house" => Ok(PropertyType::SingleFamily),
            "multifamily" | "duplex" | "triplex" | "fourplex" | "apartment" => Ok(PropertyType::MultiFamily),
            "condo" | "condominium" => Ok(PropertyType::Condo),
            "townhouse" | "townhome" => Ok(PropertyType::Townhouse),
            "manufactured" | "mobile" | "mobilehome" => Ok(PropertyType::Manufactured),
            "land" | "lot" | "lotsland" => Ok(PropertyType::Land),
            "commercial" | "retail" | "office" | "industrial" => Ok(PropertyType::Commercial),
            "other" => Ok(PropertyType::Other),
            _ => Err(anyhow::anyhow!("Unknown property type: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Low/high monthly rent band reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RentRange {
    pub low: f64,
    pub high: f64,
}

impl RentRange {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// A comparable sale or listing near the subject property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    pub address: String,
    pub price: f64,
    pub square_footage: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub distance_miles: Option<f64>,
    pub sold_date: Option<NaiveDate>,
}

impl fmt::Display for Comparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (${:.0}", self.address, self.price)?;
        if let Some(d) = self.distance_miles {
            write!(f, ", {d:.1} mi")?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Provider records
// ---------------------------------------------------------------------------

/// Candidate property facts from one provider. Every field is optional.
///
/// Annual figures: `property_taxes`, `insurance`, `noi`.
/// Monthly figures: `monthly_rent`, `rent_estimate`, `hoa_fees`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFields {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub square_footage: Option<f64>,
    pub lot_size: Option<f64>,
    pub year_built: Option<u32>,
    /// Asking / list price.
    pub price: Option<f64>,
    /// Automated valuation model estimate.
    pub avm_price: Option<f64>,
    /// Advertised rent on the listing itself.
    pub monthly_rent: Option<f64>,
    /// Modelled market rent.
    pub rent_estimate: Option<f64>,
    pub rent_range: Option<RentRange>,
    pub cap_rate: Option<f64>,
    pub noi: Option<f64>,
    pub property_taxes: Option<f64>,
    pub hoa_fees: Option<f64>,
    pub insurance: Option<f64>,
    pub estimated_rehab: Option<f64>,
    pub days_on_market: Option<u32>,
    pub listing_status: Option<String>,
    #[serde(default)]
    pub comparables: Vec<Comparable>,
    #[serde(default)]
    pub images: Vec<String>,
    pub description: Option<String>,
}

/// One ingestion from a single provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub source: SourceKind,
    pub observed_at: DateTime<Utc>,
    pub fields: PropertyFields,
}

impl ProviderRecord {
    pub fn new(source: SourceKind, observed_at: DateTime<Utc>, fields: PropertyFields) -> Self {
        Self {
            source,
            observed_at,
            fields,
        }
    }
}

impl fmt::Display for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {}",
            self.source,
            self.fields.address.as_deref().unwrap_or("<no address>"),
            self.observed_at.format("%Y-%m-%d %H:%M"),
        )
    }
}

/// Where a merged field value came from and how far to trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProvenance {
    pub value: serde_json::Value,
    pub source: SourceKind,
    pub confidence: Confidence,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for FieldProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.value, self.source, self.confidence)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised at the edges of the engine. Fusion and calculation are
/// infallible; these come from payload decoding, sources and configuration.
#[derive(Debug, thiserror::Error)]
pub enum DealError {
    #[error("Invalid {source_kind} payload: {message}")]
    InvalidPayload {
        source_kind: SourceKind,
        message: String,
    },

    #[error("Source error ({source_name}): {message}")]
    Source { source_name: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
