//! Priority resolution of a single field across provider tiers.
//!
//! Each field is resolved by an accessor over `PropertyFields`, evaluated
//! against the tiers in priority order. The first tier whose value passes
//! [`Present`] wins outright; values are never blended.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    Comparable, Confidence, Coordinates, FieldProvenance, PropertyFields, PropertyType,
    ProviderRecord, RentRange, SourceKind,
};

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Whether a candidate value counts as supplied.
pub trait Present {
    fn is_present(&self) -> bool;
}

impl Present for f64 {
    fn is_present(&self) -> bool {
        self.is_finite()
    }
}

impl Present for u32 {
    fn is_present(&self) -> bool {
        true
    }
}

impl Present for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Present for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Present for PropertyType {
    fn is_present(&self) -> bool {
        true
    }
}

impl Present for Coordinates {
    fn is_present(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Present for RentRange {
    fn is_present(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low > 0.0 && self.high >= self.low
    }
}

impl Present for Comparable {
    fn is_present(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Keep only strictly positive finite amounts. Prices, areas and rents of
/// zero are treated as "not supplied".
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

// ---------------------------------------------------------------------------
// Resolution result
// ---------------------------------------------------------------------------

/// Outcome of resolving one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Found {
        value: T,
        source: SourceKind,
        confidence: Confidence,
        observed_at: DateTime<Utc>,
    },
    Missing,
}

impl<T> Resolved<T> {
    /// A value contributed by `record` at that source's default confidence.
    pub fn from_record(value: T, record: &ProviderRecord) -> Self {
        Self::from_record_with(value, record, record.source.default_confidence())
    }

    pub fn from_record_with(value: T, record: &ProviderRecord, confidence: Confidence) -> Self {
        Resolved::Found {
            value,
            source: record.source,
            confidence,
            observed_at: record.observed_at,
        }
    }

    pub fn heuristic(value: T, observed_at: DateTime<Utc>) -> Self {
        Resolved::Found {
            value,
            source: SourceKind::Heuristic,
            confidence: Confidence::Low,
            observed_at,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolved::Found { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Resolved::Found { value, .. } => Some(value),
            Resolved::Missing => None,
        }
    }

    pub fn source(&self) -> Option<SourceKind> {
        match self {
            Resolved::Found { source, .. } => Some(*source),
            Resolved::Missing => None,
        }
    }

    /// Fill a missing value lazily; a found value is returned untouched.
    pub fn or_else(self, fallback: impl FnOnce() -> Resolved<T>) -> Resolved<T> {
        match self {
            Resolved::Missing => fallback(),
            found => found,
        }
    }

    /// Split into the plain value and its provenance record.
    pub fn into_parts(self) -> (Option<T>, Option<FieldProvenance>)
    where
        T: Serialize,
    {
        match self {
            Resolved::Found {
                value,
                source,
                confidence,
                observed_at,
            } => {
                let json = serde_json::to_value(&value).unwrap_or(serde_json::Value::Null);
                (
                    Some(value),
                    Some(FieldProvenance {
                        value: json,
                        source,
                        confidence,
                        observed_at,
                    }),
                )
            }
            Resolved::Missing => (None, None),
        }
    }
}

impl<T: Copy> Resolved<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Evaluate `accessor` against `tiers` in order; first present value wins.
pub fn first_present<T, F>(tiers: &[&ProviderRecord], accessor: F) -> Resolved<T>
where
    T: Present,
    F: Fn(&PropertyFields) -> Option<T>,
{
    for record in tiers {
        if let Some(value) = accessor(&record.fields) {
            if value.is_present() {
                return Resolved::from_record(value, record);
            }
        }
    }
    Resolved::Missing
}

/// Provenance of a value computed from other resolved fields: it is only as
/// trustworthy as its weakest input.
///
/// Inputs are compared by confidence, then by source priority, so the result
/// is the same whatever order they are passed in.
pub fn derived<T>(value: T, inputs: &[(SourceKind, Confidence, DateTime<Utc>)]) -> Resolved<T> {
    match inputs
        .iter()
        .min_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)).then(a.2.cmp(&b.2)))
    {
        Some(&(source, confidence, observed_at)) => Resolved::Found {
            value,
            source,
            confidence,
            observed_at,
        },
        None => Resolved::Missing,
    }
}

/// Provenance triple of a found value, for use with [`derived`].
pub fn lineage<T>(resolved: &Resolved<T>) -> Option<(SourceKind, Confidence, DateTime<Utc>)> {
    match resolved {
        Resolved::Found {
            source,
            confidence,
            observed_at,
            ..
        } => Some((*source, *confidence, *observed_at)),
        Resolved::Missing => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
