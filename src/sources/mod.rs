//! Property data sources.
//!
//! Defines the `PropertySource` trait implemented by the scrapers and
//! valuation clients that live outside this crate, plus the serde models of
//! their raw payloads. Payload decoding is lenient: a malformed value becomes
//! an absent field, and only structurally broken JSON is an error.

pub mod file;
pub mod scraped;
pub mod valuation;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::{Comparable, DealError, ProviderRecord, SourceKind};
pub use file::JsonFileSource;
pub use scraped::ScrapedListing;
pub use valuation::ValuationReport;

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// What to look up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    pub address: String,
    /// Observation time assumed for payloads that carry no timestamp.
    pub as_of: DateTime<Utc>,
}

impl PropertyQuery {
    pub fn new(address: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            as_of,
        }
    }
}

impl fmt::Display for PropertyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.address, self.as_of.format("%Y-%m-%d"))
    }
}

/// Abstraction over one provider of property facts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Human-readable source name (for logging).
    fn name(&self) -> String;

    /// The tier this source's records belong to.
    fn kind(&self) -> SourceKind;

    /// Fetch and decode this source's record for a property.
    async fn fetch(&self, query: &PropertyQuery) -> Result<ProviderRecord>;
}

/// Decode a raw provider payload of the given tier.
pub fn decode_payload(
    kind: SourceKind,
    raw: &str,
    fallback_at: DateTime<Utc>,
) -> std::result::Result<ProviderRecord, DealError> {
    match kind {
        SourceKind::Scraped => Ok(ScrapedListing::from_json(raw)?.into_record(fallback_at)),
        SourceKind::EstimatedApi => Ok(ValuationReport::from_json(raw)?.into_record(fallback_at)),
        SourceKind::Heuristic => Err(DealError::InvalidPayload {
            source_kind: kind,
            message: "heuristic values are synthesized, not ingested".into(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// A comparable sale as providers report it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparablePayload {
    #[serde(alias = "formattedAddress")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient_f64", alias = "salePrice", alias = "soldPrice")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "sqft", alias = "livingArea")]
    pub square_footage: Option<f64>,
    #[serde(deserialize_with = "lenient_u32", alias = "beds")]
    pub bedrooms: Option<u32>,
    #[serde(deserialize_with = "lenient_f64", alias = "baths")]
    pub bathrooms: Option<f64>,
    #[serde(deserialize_with = "lenient_f64", alias = "distance")]
    pub distance_miles: Option<f64>,
    #[serde(deserialize_with = "lenient_date", alias = "soldDate", alias = "removedDate")]
    pub sold_date: Option<NaiveDate>,
}

impl ComparablePayload {
    /// Comparables without a price carry no information and are dropped.
    pub fn into_comparable(self) -> Option<Comparable> {
        let price = self.price.filter(|p| *p > 0.0)?;
        Some(Comparable {
            address: self.address.unwrap_or_default(),
            price,
            square_footage: self.square_footage,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            distance_miles: self.distance_miles,
            sold_date: self.sold_date,
        })
    }
}

pub(crate) fn comparables(payloads: Vec<ComparablePayload>) -> Vec<Comparable> {
    payloads
        .into_iter()
        .filter_map(ComparablePayload::into_comparable)
        .collect()
}

/// Trim, dropping blank strings.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Parse a number out of provider text: `"$450,000"`, `"1,850 sqft"`,
/// `"3.5"`, `"$1.2M"`, `"450k"`. Returns `None` for anything else.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_'))
        .collect();
    let cleaned = cleaned.trim_start();

    let end = cleaned
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(cleaned.len());
    let number: f64 = cleaned[..end].parse().ok()?;

    let rest = &cleaned[end..];
    let mut suffix = rest.chars();
    let scale = match (suffix.next(), suffix.next()) {
        (Some('k' | 'K'), next) if !next.is_some_and(|c| c.is_alphabetic()) => 1_000.0,
        (Some('m' | 'M'), next) if !next.is_some_and(|c| c.is_alphabetic()) => 1_000_000.0,
        _ => 1.0,
    };

    let value = number * scale;
    value.is_finite().then_some(value)
}

fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// `Option<f64>` from a JSON number or numeric text; anything else is `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Non-negative whole number; fractional input is rounded.
pub fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32))
}

/// Timestamps in RFC 3339; unparseable text is `None`.
pub fn lenient_datetime<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(s)) = value else {
        return Ok(None);
    };
    Ok(DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc)))
}

/// A date as `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(s)) = value else {
        return Ok(None);
    };
    let s = s.trim();
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
