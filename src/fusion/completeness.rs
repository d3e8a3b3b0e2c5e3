//! Completeness scoring for a merged record.
//!
//! Required fields carry 70% of the score and optional fields 30%. Every
//! filled field also counts toward the bucket of the source that supplied it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Field;
use crate::types::{FieldProvenance, SourceKind};

const REQUIRED_WEIGHT: f64 = 70.0;
const OPTIONAL_WEIGHT: f64 = 30.0;

/// Fields a usable analysis cannot do without.
pub const REQUIRED_FIELDS: [Field; 11] = [
    Field::Address,
    Field::City,
    Field::State,
    Field::Zip,
    Field::PropertyType,
    Field::Price,
    Field::Bedrooms,
    Field::Bathrooms,
    Field::SquareFootage,
    Field::YearBuilt,
    Field::MonthlyRent,
];

/// Fields that sharpen an analysis but are not essential.
pub const OPTIONAL_FIELDS: [Field; 11] = [
    Field::LotSize,
    Field::PropertyTaxes,
    Field::HoaFees,
    Field::Insurance,
    Field::CapRate,
    Field::Noi,
    Field::Avm,
    Field::RentEstimate,
    Field::Comparables,
    Field::DaysOnMarket,
    Field::Description,
];

/// Number of scored fields filled by each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCounts {
    pub scraped: u32,
    pub estimated_api: u32,
    pub heuristic: u32,
}

impl SourceCounts {
    pub fn record(&mut self, source: SourceKind) {
        match source {
            SourceKind::Scraped => self.scraped += 1,
            SourceKind::EstimatedApi => self.estimated_api += 1,
            SourceKind::Heuristic => self.heuristic += 1,
        }
    }

    pub fn get(&self, source: SourceKind) -> u32 {
        match source {
            SourceKind::Scraped => self.scraped,
            SourceKind::EstimatedApi => self.estimated_api,
            SourceKind::Heuristic => self.heuristic,
        }
    }

    pub fn total(&self) -> u32 {
        self.scraped + self.estimated_api + self.heuristic
    }
}

/// How much of the canonical record could be filled, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCompleteness {
    /// 0–100.
    pub score: u8,
    /// Scored fields nobody supplied, required fields first.
    pub missing_fields: Vec<Field>,
    pub source_counts: SourceCounts,
}

impl fmt::Display for DataCompleteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% complete (scraped={} api={} heuristic={}, {} missing)",
            self.score,
            self.source_counts.scraped,
            self.source_counts.estimated_api,
            self.source_counts.heuristic,
            self.missing_fields.len(),
        )
    }
}

impl DataCompleteness {
    /// Score a record from its provenance map. A field is filled exactly
    /// when it has provenance.
    pub fn assess(provenance: &BTreeMap<Field, FieldProvenance>) -> Self {
        let mut counts = SourceCounts::default();
        let mut missing = Vec::new();

        let mut tally = |fields: &[Field]| -> usize {
            let mut filled = 0;
            for field in fields {
                match provenance.get(field) {
                    Some(p) => {
                        counts.record(p.source);
                        filled += 1;
                    }
                    None => missing.push(*field),
                }
            }
            filled
        };

        let required = tally(&REQUIRED_FIELDS[..]);
        let optional = tally(&OPTIONAL_FIELDS[..]);

        Self {
            score: weighted_score(required, optional),
            missing_fields: missing,
            source_counts: counts,
        }
    }

    pub fn is_missing(&self, field: Field) -> bool {
        self.missing_fields.contains(&field)
    }

    /// Whether every required field was filled.
    pub fn has_required(&self) -> bool {
        !REQUIRED_FIELDS.iter().any(|f| self.is_missing(*f))
    }
}

fn weighted_score(required: usize, optional: usize) -> u8 {
    let raw = (required as f64 / REQUIRED_FIELDS.len() as f64) * REQUIRED_WEIGHT
        + (optional as f64 / OPTIONAL_FIELDS.len() as f64) * OPTIONAL_WEIGHT;
    raw.round().clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
