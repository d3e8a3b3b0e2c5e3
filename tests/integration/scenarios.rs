//! End-to-end scenarios: provider payloads through fusion and finance.

use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;

use dealscope::config::AppConfig;
use dealscope::engine::{AnalysisRequest, Analyzer};
use dealscope::finance::{self, Financing, Strategy, StrategyDetails};
use dealscope::fusion::{merge, Field, MergeOptions};
use dealscope::sources::{JsonFileSource, PropertyQuery, ScrapedListing, ValuationReport};
use dealscope::types::{Confidence, PropertyFields, ProviderRecord, SourceKind};

use crate::mock_source::{observed_at, MockSource};

fn query() -> PropertyQuery {
    PropertyQuery::new("418 Maple Ave", Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap())
}

fn scraped(fields: PropertyFields) -> ProviderRecord {
    ProviderRecord::new(SourceKind::Scraped, observed_at(), fields)
}

fn api(fields: PropertyFields) -> ProviderRecord {
    ProviderRecord::new(SourceKind::EstimatedApi, observed_at(), fields)
}

fn temp_file(label: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dealscope-it-{label}-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

#[test]
fn test_scrape_error_price_replaced_by_api_listing() {
    let record = merge(
        Some(scraped(PropertyFields { price: Some(15_000_000.0), ..Default::default() })),
        Some(api(PropertyFields { price: Some(450_000.0), ..Default::default() })),
        &MergeOptions::default(),
    );
    assert_eq!(record.price, Some(450_000.0));
    assert_eq!(record.source_of(Field::Price), Some(SourceKind::EstimatedApi));
    // Heuristics see the corrected price
    assert_eq!(record.property_taxes, Some(5400.0));
}

#[test]
fn test_scraped_values_never_overwritten() {
    let scraped_fields = PropertyFields {
        address: Some("418 Maple Ave".into()),
        city: Some("Columbus".into()),
        bedrooms: Some(3),
        bathrooms: Some(2.0),
        square_footage: Some(1600.0),
        year_built: Some(1998),
        price: Some(250_000.0),
        monthly_rent: Some(2000.0),
        property_taxes: Some(2900.0),
        insurance: Some(900.0),
        ..Default::default()
    };
    let api_fields = PropertyFields {
        address: Some("418 Maple Avenue".into()),
        city: Some("Cbus".into()),
        bedrooms: Some(4),
        bathrooms: Some(3.0),
        square_footage: Some(1900.0),
        year_built: Some(2001),
        price: Some(260_000.0),
        monthly_rent: Some(2300.0),
        property_taxes: Some(3300.0),
        insurance: Some(1100.0),
        ..Default::default()
    };
    for use_heuristics in [true, false] {
        let record = merge(
            Some(scraped(scraped_fields.clone())),
            Some(api(api_fields.clone())),
            &MergeOptions::with_heuristics(use_heuristics),
        );
        assert_eq!(record.address.as_deref(), Some("418 Maple Ave"));
        assert_eq!(record.city.as_deref(), Some("Columbus"));
        assert_eq!(record.bedrooms, Some(3));
        assert_eq!(record.bathrooms, Some(2.0));
        assert_eq!(record.square_footage, Some(1600.0));
        assert_eq!(record.year_built, Some(1998));
        assert_eq!(record.price, Some(250_000.0));
        assert_eq!(record.monthly_rent, Some(2000.0));
        assert_eq!(record.property_taxes, Some(2900.0));
        assert_eq!(record.insurance, Some(900.0));
        for field in [Field::Address, Field::Price, Field::MonthlyRent, Field::Insurance] {
            assert_eq!(record.source_of(field), Some(SourceKind::Scraped));
            assert_eq!(record.confidence_of(field), Some(Confidence::High));
        }
    }
}

#[test]
fn test_merge_idempotent_including_provenance() {
    let build = || {
        merge(
            Some(scraped(PropertyFields {
                address: Some("418 Maple Ave".into()),
                price: Some(250_000.0),
                bedrooms: Some(3),
                ..Default::default()
            })),
            Some(api(PropertyFields {
                avm_price: Some(255_000.0),
                rent_estimate: Some(2050.0),
                ..Default::default()
            })),
            &MergeOptions::default(),
        )
    };
    let first = build();
    let second = build();
    assert_eq!(first, second);
    assert_eq!(first.provenance, second.provenance);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_completeness_bounds() {
    let empty = merge(None, None, &MergeOptions::with_heuristics(false));
    assert_eq!(empty.completeness.score, 0);
    assert_eq!(empty.completeness.missing_fields.len(), 22);

    let partial = merge(
        Some(scraped(PropertyFields {
            address: Some("418 Maple Ave".into()),
            price: Some(250_000.0),
            ..Default::default()
        })),
        None,
        &MergeOptions::default(),
    );
    assert!(partial.completeness.score > 0);
    assert!(partial.completeness.score < 100);
    assert!(partial.completeness.is_missing(Field::City));
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[test]
fn test_cap_rate_back_fill_from_rent_and_price() {
    let record = merge(
        Some(scraped(PropertyFields {
            price: Some(250_000.0),
            monthly_rent: Some(2000.0),
            ..Default::default()
        })),
        None,
        &MergeOptions::with_heuristics(false),
    );
    assert_eq!(record.noi, Some(14_400.0));
    assert_eq!(record.cap_rate, Some(5.76));
}

#[test]
fn test_flip_moderate_arv() {
    let record = merge(
        Some(scraped(PropertyFields { price: Some(300_000.0), ..Default::default() })),
        None,
        &MergeOptions::default(),
    );
    let metrics = finance::calculate(&record, Strategy::Flip, &Financing::default(), None);
    let flip = metrics.flip().unwrap();
    assert_eq!(flip.after_repair_value, 354_000.0);
    assert!(flip.after_repair_value > flip.purchase_price * 1.15);
}

#[test]
fn test_stored_zero_profit_recomputed() {
    let record = merge(
        Some(scraped(PropertyFields { price: Some(200_000.0), ..Default::default() })),
        None,
        &MergeOptions::default(),
    );
    let details = StrategyDetails {
        arv: Some(250_000.0),
        stored_net_profit: Some(0.0),
        stored_roi: Some(0.0),
        ..Default::default()
    };
    let metrics = finance::calculate(&record, Strategy::Flip, &Financing::default(), Some(&details));
    let flip = metrics.flip().unwrap();
    assert!(flip.net_profit > 0.0);
    assert!(flip.roi > 0.0);
    assert!((flip.net_profit - 21_013.10).abs() < 0.02);
}

#[test]
fn test_no_non_finite_outputs() {
    let record = merge(
        Some(scraped(PropertyFields {
            price: Some(f64::NAN),
            monthly_rent: Some(f64::INFINITY),
            square_footage: Some(0.0),
            ..Default::default()
        })),
        None,
        &MergeOptions::default(),
    );
    assert_eq!(record.price, None);
    assert_eq!(record.monthly_rent, None);
    assert_eq!(record.price_per_sqft, None);

    for strategy in [Strategy::Rental, Strategy::Flip, Strategy::Airbnb] {
        let metrics = finance::calculate(&record, strategy, &Financing::default(), None);
        let json = serde_json::to_value(&metrics).unwrap();
        for (key, value) in json.as_object().unwrap() {
            if let Some(n) = value.as_f64() {
                assert!(n.is_finite(), "{key} is not finite");
            }
            assert!(!value.is_null(), "{key} serialised as null");
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pipeline_with_mock_sources() {
    let scraped_source = MockSource::scraped_listing();
    let valuation_source = MockSource::valuation_report();
    let scraped_fetches = scraped_source.fetch_count();
    let valuation_fetches = valuation_source.fetch_count();

    let analyzer = Analyzer::new(&AppConfig::default())
        .with_scraped(Box::new(scraped_source))
        .with_valuation(Box::new(valuation_source));
    let analysis = analyzer.analyze(&query(), &AnalysisRequest::default()).await;

    assert_eq!(*scraped_fetches.lock().unwrap(), 1);
    assert_eq!(*valuation_fetches.lock().unwrap(), 1);

    let record = &analysis.record;
    assert_eq!(record.address.as_deref(), Some("418 Maple Ave"));
    assert_eq!(record.bedrooms, Some(3));
    assert_eq!(record.year_built, Some(1998));
    assert_eq!(record.avm, Some(255_000.0));
    assert_eq!(record.source_of(Field::LotSize), Some(SourceKind::EstimatedApi));
    assert!(record.completeness.has_required());

    let rental = analysis.metrics.rental().unwrap();
    assert!((rental.cap_rate - 5.50).abs() < 0.01);
}

#[tokio::test]
async fn test_pipeline_survives_failing_source() {
    let scraped_source = MockSource::scraped_listing();
    scraped_source.set_error("scraper blocked");

    let analyzer = Analyzer::new(&AppConfig::default())
        .with_scraped(Box::new(scraped_source))
        .with_valuation(Box::new(MockSource::valuation_report()));
    let analysis = analyzer.analyze(&query(), &AnalysisRequest::default()).await;

    assert_eq!(analysis.failed_sources, vec!["mock-scraper".to_string()]);
    assert_eq!(analysis.record.address.as_deref(), Some("418 Maple Avenue"));
    assert_eq!(analysis.record.bedrooms, Some(4));
    // AVM stands in for the missing list price
    assert_eq!(analysis.record.price, Some(255_000.0));
    assert_eq!(analysis.record.confidence_of(Field::Price), Some(Confidence::Medium));
}

#[tokio::test]
async fn test_pipeline_from_payload_files() {
    let scraped_path = temp_file(
        "scraped",
        r#"{
            "address": "77 Harbor Rd",
            "city": "Tacoma",
            "state": "WA",
            "zipCode": "98402",
            "homeType": "Condo",
            "price": "$15,000,000",
            "beds": 2,
            "baths": "1.5",
            "sqft": "1,050",
            "scrapedAt": "2026-03-30T18:00:00Z"
        }"#,
    );
    let valuation_path = temp_file(
        "valuation",
        r#"{
            "property": {"yearBuilt": 2008, "lotSize": 0},
            "value": {"price": 412000},
            "rental": {"rent": 2150, "rentRangeLow": 1950, "rentRangeHigh": 2300},
            "listing": {"price": "$415,000", "daysOnMarket": 21, "status": "Active"},
            "neighborhood": {"medianPrice": 450000},
            "fetchedAt": "2026-03-31T07:00:00Z"
        }"#,
    );

    let analyzer = Analyzer::new(&AppConfig::default())
        .with_scraped(Box::new(JsonFileSource::new(SourceKind::Scraped, &scraped_path)))
        .with_valuation(Box::new(JsonFileSource::new(SourceKind::EstimatedApi, &valuation_path)));
    let request = AnalysisRequest {
        strategy: Some(Strategy::Flip),
        ..Default::default()
    };
    let analysis = analyzer.analyze(&query(), &request).await;

    let record = &analysis.record;
    assert!(analysis.failed_sources.is_empty());
    assert_eq!(record.price, Some(415_000.0));
    assert_eq!(record.listing_price, Some(415_000.0));
    assert_eq!(record.avm, Some(412_000.0));
    assert_eq!(record.monthly_rent, Some(2150.0));
    assert_eq!(record.lot_size, None);
    assert_eq!(record.days_on_market, Some(21));
    let scraped_at: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, 30, 18, 0, 0).unwrap();
    assert_eq!(record.provenance_of(Field::Bedrooms).unwrap().observed_at, scraped_at);

    let flip = analysis.metrics.flip().unwrap();
    assert_eq!(flip.purchase_price, 415_000.0);
    assert_eq!(flip.after_repair_value, 489_700.0);

    let _ = std::fs::remove_file(&scraped_path);
    let _ = std::fs::remove_file(&valuation_path);
}

#[test]
fn test_payload_adapters_feed_merge() {
    let as_of = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    let listing = ScrapedListing::from_json(r#"{"price": "$249,900", "rent": "2,000"}"#).unwrap();
    let report = ValuationReport::from_json(r#"{"rental": {"rent": 2100}}"#).unwrap();
    let record = merge(
        Some(listing.into_record(as_of)),
        Some(report.into_record(as_of)),
        &MergeOptions::with_heuristics(false),
    );
    assert_eq!(record.monthly_rent, Some(2000.0));
    assert_eq!(record.rent_estimate, Some(2100.0));
    assert_eq!(record.source_of(Field::RentEstimate), Some(SourceKind::EstimatedApi));
}
