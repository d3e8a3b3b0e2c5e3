//! Mock property source for integration testing.
//!
//! Deterministic `PropertySource` returning a fixed record. It counts
//! fetches and can be forced to fail.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use dealscope::sources::{PropertyQuery, PropertySource};
use dealscope::types::{PropertyFields, ProviderRecord, SourceKind};

/// Fixed observation time used by every mock record.
pub fn observed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

pub struct MockSource {
    name: String,
    kind: SourceKind,
    fields: PropertyFields,
    fetches: Arc<Mutex<u32>>,
    /// If set, every fetch returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    pub fn new(name: &str, kind: SourceKind, fields: PropertyFields) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields,
            fetches: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// A scraped listing for a typical single-family rental.
    pub fn scraped_listing() -> Self {
        Self::new(
            "mock-scraper",
            SourceKind::Scraped,
            PropertyFields {
                address: Some("418 Maple Ave".into()),
                city: Some("Columbus".into()),
                state: Some("OH".into()),
                zip: Some("43215".into()),
                bedrooms: Some(3),
                bathrooms: Some(2.0),
                square_footage: Some(1600.0),
                price: Some(250_000.0),
                monthly_rent: Some(2000.0),
                ..Default::default()
            },
        )
    }

    /// A valuation report for the same property.
    pub fn valuation_report() -> Self {
        Self::new(
            "mock-valuation",
            SourceKind::EstimatedApi,
            PropertyFields {
                address: Some("418 Maple Avenue".into()),
                property_type: Some(dealscope::types::PropertyType::SingleFamily),
                bedrooms: Some(4),
                year_built: Some(1998),
                lot_size: Some(6500.0),
                avm_price: Some(255_000.0),
                rent_estimate: Some(2050.0),
                ..Default::default()
            },
        )
    }

    /// Force all subsequent fetches to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn fetch_count(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl PropertySource for MockSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _query: &PropertyQuery) -> Result<ProviderRecord> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(ProviderRecord::new(self.kind, observed_at(), self.fields.clone()))
    }
}
