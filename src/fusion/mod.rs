//! Data fusion: merge provider records into one canonical property record.
//!
//! Fields are resolved independently with strict tier precedence
//! (scraped → valuation API → heuristic). Price has its own resolution
//! path because scrapers regularly mis-parse it. Derived investment
//! figures are back-filled last, and the result is scored for
//! completeness.

pub mod completeness;
pub mod heuristics;
pub mod resolve;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::FusionConfig;
use crate::finance::amortization;
use crate::money::{percent, ratio, round_cents};
use crate::types::{
    Comparable, Confidence, Coordinates, FieldProvenance, PropertyType, ProviderRecord,
    RentRange, SourceKind,
};
pub use completeness::{DataCompleteness, SourceCounts, OPTIONAL_FIELDS, REQUIRED_FIELDS};
use heuristics::HeuristicEstimator;
use resolve::{derived, first_present, lineage, positive, Present, Resolved};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Every provenance-tracked field of a merged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Address,
    City,
    State,
    Zip,
    Coordinates,
    PropertyType,
    Bedrooms,
    Bathrooms,
    SquareFootage,
    LotSize,
    YearBuilt,
    Price,
    ListingPrice,
    Avm,
    PricePerSqft,
    MonthlyRent,
    RentEstimate,
    RentRange,
    EstimatedRehab,
    CapRate,
    GrossYield,
    CashOnCash,
    Noi,
    PropertyTaxes,
    HoaFees,
    Insurance,
    Comparables,
    DaysOnMarket,
    ListingStatus,
    Images,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same camelCase name the field serializes to.
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => write!(f, "{name}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Options & output
// ---------------------------------------------------------------------------

/// Per-request merge options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Synthesize low-confidence defaults for fields no provider supplied.
    pub use_heuristics: bool,
    /// Timestamp stamped on heuristic values. Defaults to the newest
    /// provider observation so that output depends only on the inputs.
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            use_heuristics: true,
            as_of: None,
        }
    }
}

impl MergeOptions {
    pub fn with_heuristics(use_heuristics: bool) -> Self {
        Self {
            use_heuristics,
            as_of: None,
        }
    }

    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

/// The canonical property record produced by a merge.
///
/// Built once per analysis. Annual figures: `property_taxes`, `insurance`,
/// `noi`. Monthly: `monthly_rent`, `rent_estimate`, `hoa_fees`. Percentages
/// are expressed as 0–100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPropertyRecord {
    // Identity
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub coordinates: Option<Coordinates>,

    // Physical
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub square_footage: Option<f64>,
    pub lot_size: Option<f64>,
    pub year_built: Option<u32>,

    // Financial
    pub price: Option<f64>,
    pub listing_price: Option<f64>,
    pub avm: Option<f64>,
    pub price_per_sqft: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub rent_estimate: Option<f64>,
    pub rent_range: Option<RentRange>,
    pub estimated_rehab: Option<f64>,

    // Investment
    pub cap_rate: Option<f64>,
    pub gross_yield: Option<f64>,
    pub cash_on_cash: Option<f64>,
    pub noi: Option<f64>,

    // Costs
    pub property_taxes: Option<f64>,
    pub hoa_fees: Option<f64>,
    pub insurance: Option<f64>,

    // Market context
    pub comparables: Vec<Comparable>,
    pub comparable_count: usize,
    pub comparable_avg_price: Option<f64>,
    pub days_on_market: Option<u32>,
    pub listing_status: Option<String>,
    pub images: Vec<String>,
    pub description: Option<String>,

    pub provenance: BTreeMap<Field, FieldProvenance>,
    pub completeness: DataCompleteness,
}

impl fmt::Display for MergedPropertyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = [self.address.as_deref(), self.city.as_deref(), self.state.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} | price={} rent={} cap={} | {}",
            if location.is_empty() { "<unknown location>" } else { location.as_str() },
            self.price.map(|p| format!("${p:.0}")).unwrap_or_else(|| "?".into()),
            self.monthly_rent.map(|r| format!("${r:.0}/mo")).unwrap_or_else(|| "?".into()),
            self.cap_rate.map(|c| format!("{c:.2}%")).unwrap_or_else(|| "?".into()),
            self.completeness,
        )
    }
}

impl MergedPropertyRecord {
    pub fn provenance_of(&self, field: Field) -> Option<&FieldProvenance> {
        self.provenance.get(&field)
    }

    pub fn source_of(&self, field: Field) -> Option<SourceKind> {
        self.provenance.get(&field).map(|p| p.source)
    }

    pub fn confidence_of(&self, field: Field) -> Option<Confidence> {
        self.provenance.get(&field).map(|p| p.confidence)
    }

    /// Fields whose value came from the heuristic tier or was derived from one.
    pub fn low_confidence_fields(&self) -> Vec<Field> {
        self.provenance
            .iter()
            .filter(|(_, p)| p.confidence == Confidence::Low)
            .map(|(f, _)| *f)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Merges provider records into a [`MergedPropertyRecord`].
///
/// Stateless apart from its configuration; one engine can serve any number
/// of concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Merge a scraped listing and a valuation-API record.
    ///
    /// Either input may be absent. Missing data is never an error: it shows
    /// up as `None` fields and in `completeness.missing_fields`.
    pub fn merge(
        &self,
        scraped: Option<ProviderRecord>,
        estimated_api: Option<ProviderRecord>,
        options: &MergeOptions,
    ) -> MergedPropertyRecord {
        let scraped = scraped.map(|r| retag(r, SourceKind::Scraped));
        let api = estimated_api.map(|r| retag(r, SourceKind::EstimatedApi));
        let tiers: Vec<&ProviderRecord> = scraped.iter().chain(api.iter()).collect();

        let heuristic_at = options
            .as_of
            .or_else(|| tiers.iter().map(|r| r.observed_at).max())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let estimator = HeuristicEstimator::new(&self.config);
        let synth = |field: Field, value: Option<f64>| -> Resolved<f64> {
            synthesize(options.use_heuristics, field, value, heuristic_at)
        };

        // -- Priority resolution -------------------------------------------

        let address = first_present(&tiers, |f| f.address.clone());
        let city = first_present(&tiers, |f| f.city.clone());
        let state = first_present(&tiers, |f| f.state.clone());
        let zip = first_present(&tiers, |f| f.zip.clone());
        let coordinates = first_present(&tiers, |f| f.coordinates);
        let property_type = first_present(&tiers, |f| f.property_type);
        let bedrooms = first_present(&tiers, |f| f.bedrooms);
        let bathrooms = first_present(&tiers, |f| positive(f.bathrooms));
        let lot_size = first_present(&tiers, |f| positive(f.lot_size));
        let year_built = first_present(&tiers, |f| f.year_built.filter(|y| *y > 0));

        let price = self.resolve_price(scraped.as_ref(), api.as_ref());
        let listing_price = self.resolve_listing_price(scraped.as_ref(), api.as_ref());
        let avm = first_present(&tiers, |f| positive(f.avm_price));
        let rent_estimate = first_present(&tiers, |f| positive(f.rent_estimate));
        let rent_range = first_present(&tiers, |f| f.rent_range);
        let estimated_rehab = first_present(&tiers, |f| non_negative(f.estimated_rehab));

        let cap_rate = first_present(&tiers, |f| f.cap_rate);
        let noi = first_present(&tiers, |f| f.noi);
        let hoa_fees = first_present(&tiers, |f| non_negative(f.hoa_fees));

        let days_on_market = first_present(&tiers, |f| f.days_on_market);
        let listing_status = first_present(&tiers, |f| f.listing_status.clone());
        let comparables = first_present(&tiers, |f| {
            Some(
                f.comparables
                    .iter()
                    .filter(|c| c.is_present())
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });
        let images = first_present(&tiers, |f| {
            Some(
                f.images
                    .iter()
                    .filter(|i| i.is_present())
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });
        let description = first_present(&tiers, |f| f.description.clone());

        // -- Heuristic tier --------------------------------------------------
        // Runs after price so every synthesized figure sees the final price.

        let square_footage = first_present(&tiers, |f| positive(f.square_footage))
            .or_else(|| synth(Field::SquareFootage, estimator.square_footage(bedrooms.get())));
        let monthly_rent = first_present(&tiers, |f| {
            positive(f.monthly_rent).or(positive(f.rent_estimate))
        })
        .or_else(|| {
            synth(
                Field::MonthlyRent,
                estimator.monthly_rent(price.get(), bedrooms.get(), property_type.get()),
            )
        });
        let property_taxes = first_present(&tiers, |f| non_negative(f.property_taxes))
            .or_else(|| synth(Field::PropertyTaxes, estimator.property_taxes(price.get())));
        let insurance = first_present(&tiers, |f| non_negative(f.insurance))
            .or_else(|| synth(Field::Insurance, estimator.insurance(price.get())));

        // -- Derived back-fill -----------------------------------------------

        let price_per_sqft = self.derive_price_per_sqft(&price, &square_footage);
        let noi = noi.or_else(|| self.derive_noi(&monthly_rent));
        let cap_rate = cap_rate.or_else(|| self.derive_cap_rate(&monthly_rent, &price));
        let gross_yield = self.derive_gross_yield(&monthly_rent, &price);
        let cash_on_cash = self.derive_cash_on_cash(&monthly_rent, &price);

        // -- Assemble ----------------------------------------------------------

        let mut provenance = BTreeMap::new();
        let p = &mut provenance;

        let comparables = settle(p, Field::Comparables, comparables).unwrap_or_default();
        let comparable_count = comparables.len();
        let comparable_avg_price = if comparables.is_empty() {
            None
        } else {
            let total: f64 = comparables.iter().map(|c| c.price).sum();
            Some(round_cents(ratio(total, comparable_count as f64)))
        };

        let record = MergedPropertyRecord {
            address: settle(p, Field::Address, address),
            city: settle(p, Field::City, city),
            state: settle(p, Field::State, state),
            zip: settle(p, Field::Zip, zip),
            coordinates: settle(p, Field::Coordinates, coordinates),
            property_type: settle(p, Field::PropertyType, property_type),
            bedrooms: settle(p, Field::Bedrooms, bedrooms),
            bathrooms: settle(p, Field::Bathrooms, bathrooms),
            square_footage: settle(p, Field::SquareFootage, square_footage),
            lot_size: settle(p, Field::LotSize, lot_size),
            year_built: settle(p, Field::YearBuilt, year_built),
            price: settle(p, Field::Price, price),
            listing_price: settle(p, Field::ListingPrice, listing_price),
            avm: settle(p, Field::Avm, avm),
            price_per_sqft: settle(p, Field::PricePerSqft, price_per_sqft),
            monthly_rent: settle(p, Field::MonthlyRent, monthly_rent),
            rent_estimate: settle(p, Field::RentEstimate, rent_estimate),
            rent_range: settle(p, Field::RentRange, rent_range),
            estimated_rehab: settle(p, Field::EstimatedRehab, estimated_rehab),
            cap_rate: settle(p, Field::CapRate, cap_rate),
            gross_yield: settle(p, Field::GrossYield, gross_yield),
            cash_on_cash: settle(p, Field::CashOnCash, cash_on_cash),
            noi: settle(p, Field::Noi, noi),
            property_taxes: settle(p, Field::PropertyTaxes, property_taxes),
            hoa_fees: settle(p, Field::HoaFees, hoa_fees),
            insurance: settle(p, Field::Insurance, insurance),
            comparables,
            comparable_count,
            comparable_avg_price,
            days_on_market: settle(p, Field::DaysOnMarket, days_on_market),
            listing_status: settle(p, Field::ListingStatus, listing_status),
            images: settle(p, Field::Images, images).unwrap_or_default(),
            description: settle(p, Field::Description, description),
            completeness: DataCompleteness::assess(p),
            provenance,
        };

        info!(
            address = record.address.as_deref().unwrap_or("<unknown>"),
            score = record.completeness.score,
            missing = record.completeness.missing_fields.len(),
            scraped = record.completeness.source_counts.scraped,
            estimated_api = record.completeness.source_counts.estimated_api,
            heuristic = record.completeness.source_counts.heuristic,
            "Property records merged"
        );

        record
    }

    /// Price: scraped unless implausible, then API list price, then API AVM.
    fn resolve_price(
        &self,
        scraped: Option<&ProviderRecord>,
        api: Option<&ProviderRecord>,
    ) -> Resolved<f64> {
        if let Some(record) = scraped {
            if let Some(price) = positive(record.fields.price) {
                if price <= self.config.max_plausible_price {
                    return Resolved::from_record_with(price, record, Confidence::High);
                }
                warn!(
                    scraped_price = format!("${price:.0}"),
                    ceiling = format!("${:.0}", self.config.max_plausible_price),
                    "Scraped price implausible, treating as scrape error"
                );
            }
        }

        if let Some(record) = api {
            if let Some(price) = positive(record.fields.price) {
                debug!(price, "Price taken from valuation API listing");
                return Resolved::from_record_with(price, record, Confidence::High);
            }
            if let Some(avm) = positive(record.fields.avm_price) {
                debug!(avm, "Price taken from valuation API AVM");
                return Resolved::from_record_with(avm, record, Confidence::Medium);
            }
        }

        Resolved::Missing
    }

    /// The asking price on a listing, with the same scrape-error ceiling.
    fn resolve_listing_price(
        &self,
        scraped: Option<&ProviderRecord>,
        api: Option<&ProviderRecord>,
    ) -> Resolved<f64> {
        let plausible = scraped.and_then(|r| {
            positive(r.fields.price)
                .filter(|p| *p <= self.config.max_plausible_price)
                .map(|p| Resolved::from_record(p, r))
        });
        if let Some(found) = plausible {
            return found;
        }
        api.and_then(|r| positive(r.fields.price).map(|p| Resolved::from_record(p, r)))
            .unwrap_or(Resolved::Missing)
    }

    fn derive_price_per_sqft(&self, price: &Resolved<f64>, sqft: &Resolved<f64>) -> Resolved<f64> {
        match (price.get(), sqft.get(), lineage(price), lineage(sqft)) {
            (Some(p), Some(s), Some(lp), Some(ls)) if s > 0.0 => {
                derived(round_cents(ratio(p, s)), &[lp, ls])
            }
            _ => Resolved::Missing,
        }
    }

    fn derived_annual_noi(&self, rent: &Resolved<f64>) -> Option<f64> {
        rent.get().map(|r| r * 12.0 * self.config.noi_ratio)
    }

    fn derive_noi(&self, rent: &Resolved<f64>) -> Resolved<f64> {
        match (self.derived_annual_noi(rent), lineage(rent)) {
            (Some(noi), Some(l)) => {
                debug!(noi, "NOI back-filled from rent");
                derived(round_cents(noi), &[l])
            }
            _ => Resolved::Missing,
        }
    }

    fn derive_cap_rate(&self, rent: &Resolved<f64>, price: &Resolved<f64>) -> Resolved<f64> {
        match (
            self.derived_annual_noi(rent),
            price.get(),
            lineage(rent),
            lineage(price),
        ) {
            (Some(noi), Some(p), Some(lr), Some(lp)) if p > 0.0 => {
                let cap = percent(noi, p);
                debug!(cap_rate = cap, "Cap rate back-filled from rent");
                derived(round_cents(cap), &[lr, lp])
            }
            _ => Resolved::Missing,
        }
    }

    fn derive_gross_yield(&self, rent: &Resolved<f64>, price: &Resolved<f64>) -> Resolved<f64> {
        match (rent.get(), price.get(), lineage(rent), lineage(price)) {
            (Some(r), Some(p), Some(lr), Some(lp)) if p > 0.0 => {
                derived(round_cents(percent(r * 12.0, p)), &[lr, lp])
            }
            _ => Resolved::Missing,
        }
    }

    /// Illustrative cash-on-cash under the configured back-fill financing
    /// (25% down, 7%, 30 years by default).
    fn derive_cash_on_cash(&self, rent: &Resolved<f64>, price: &Resolved<f64>) -> Resolved<f64> {
        let (Some(r), Some(p), Some(lr), Some(lp)) =
            (rent.get(), price.get(), lineage(rent), lineage(price))
        else {
            return Resolved::Missing;
        };
        if p <= 0.0 {
            return Resolved::Missing;
        }

        let down = p * self.config.backfill_down_payment_ratio;
        let payment = amortization::monthly_payment(
            p - down,
            self.config.backfill_interest_rate_percent,
            self.config.backfill_loan_term_years,
        );
        let monthly_expenses = r * self.config.backfill_expense_ratio + payment;
        let annual_cash_flow = (r - monthly_expenses) * 12.0;

        derived(round_cents(percent(annual_cash_flow, down)), &[lr, lp])
    }
}

/// Merge with the default fusion configuration.
pub fn merge(
    scraped: Option<ProviderRecord>,
    estimated_api: Option<ProviderRecord>,
    options: &MergeOptions,
) -> MergedPropertyRecord {
    FusionEngine::default().merge(scraped, estimated_api, options)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records passed in a tier slot take that tier's identity.
fn retag(mut record: ProviderRecord, kind: SourceKind) -> ProviderRecord {
    if record.source != kind {
        warn!(
            declared = %record.source,
            slot = %kind,
            "Provider record passed in another tier's slot, retagging"
        );
        record.source = kind;
    }
    record
}

fn synthesize(
    enabled: bool,
    field: Field,
    value: Option<f64>,
    observed_at: DateTime<Utc>,
) -> Resolved<f64> {
    match value.filter(|v| v.is_finite()) {
        Some(v) if enabled => {
            let v = round_cents(v);
            debug!(field = %field, value = v, "Heuristic default synthesized");
            Resolved::heuristic(v, observed_at)
        }
        _ => Resolved::Missing,
    }
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Move a resolved value into the record, keeping its provenance.
fn settle<T: Serialize>(
    provenance: &mut BTreeMap<Field, FieldProvenance>,
    field: Field,
    resolved: Resolved<T>,
) -> Option<T> {
    let (value, origin) = resolved.into_parts();
    if let Some(origin) = origin {
        provenance.insert(field, origin);
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
