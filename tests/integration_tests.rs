// Integration tests for estate-match

use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::NaiveDate;
use estate_match::core::{MatchVariant, Matcher, ZoneCodeResolver};
use estate_match::models::{Buyer, Coordinates, Property, PropertyTarget, ZoneCode};
use estate_match::routes::{self, candidates::AppState};
use estate_match::services::{
    AggregatorOptions, BuyerPoolFilter, CandidateAggregator, CandidateError, CoordinateExtractor,
    GeocodingError, ListingStore, StoreError,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// ListingStore over fixed vectors, applying the pool filter in memory
struct InMemoryStore {
    properties: Vec<Property>,
    buyers: Vec<Buyer>,
    delay: Option<Duration>,
    fail: bool,
}

impl InMemoryStore {
    fn new(properties: Vec<Property>, buyers: Vec<Buyer>) -> Self {
        Self {
            properties,
            buyers,
            delay: None,
            fail: false,
        }
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn get_property(&self, property_number: &str) -> Result<Option<Property>, StoreError> {
        if self.fail {
            return Err(StoreError::Api("connection refused".to_string()));
        }
        Ok(self
            .properties
            .iter()
            .find(|p| p.property_number == property_number)
            .cloned())
    }

    async fn get_properties(&self, property_numbers: &[String]) -> Result<Vec<Property>, StoreError> {
        Ok(self
            .properties
            .iter()
            .filter(|p| property_numbers.contains(&p.property_number))
            .cloned()
            .collect())
    }

    async fn fetch_buyer_pool(&self, filter: &BuyerPoolFilter) -> Result<Vec<Buyer>, StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.buyers.iter().filter(|b| filter.admits(b)).cloned().collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.fail)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Extractor answering from a fixed table
struct FixedExtractor {
    coordinates: HashMap<String, Coordinates>,
}

#[async_trait]
impl CoordinateExtractor for FixedExtractor {
    async fn extract(&self, property: &Property) -> Result<Option<Coordinates>, GeocodingError> {
        Ok(self.coordinates.get(&property.property_number).copied())
    }
}

fn create_property(number: &str, address: &str) -> Property {
    Property {
        property_number: number.to_string(),
        address: address.to_string(),
        property_type: "中古戸建て".to_string(),
        price: Some(18_000_000),
        ..Property::default()
    }
}

fn create_buyer(number: &str, area: &str, status: &str, flag: &str) -> Buyer {
    Buyer {
        buyer_number: number.to_string(),
        name: format!("買主 {}", number),
        email: format!("{}@example.com", number.to_lowercase()),
        desired_area: area.to_string(),
        desired_property_type: "戸建".to_string(),
        price_range_house: "1500万〜2500万".to_string(),
        latest_status: status.to_string(),
        distribution_type: flag.to_string(),
        ..Buyer::default()
    }
}

fn sample_store() -> InMemoryStore {
    let properties = vec![
        create_property("AA100", "大分県大分市萩原2丁目3-4"),
        create_property("AA200", "大分市敷戸台"),
    ];

    let mut dated = create_buyer("B001", "①", "A:すぐ", "要");
    dated.reception_date = NaiveDate::from_ymd_opt(2024, 6, 1);
    let mut older = create_buyer("B002", "㊵", "C", "要");
    older.reception_date = NaiveDate::from_ymd_opt(2024, 1, 15);
    let wrong_zone = create_buyer("B003", "③", "A", "要");
    let mail_only = create_buyer("B004", "①", "B", "メール");
    let mut broker = create_buyer("B005", "①", "A", "要");
    broker.inquiry_source = "業者問合せ".to_string();
    let dropped = create_buyer("B006", "①", "D:購入済", "要");
    let mut same_person = create_buyer("B007", "①", "E", "LINE→メール");
    same_person.email = "B004@Example.com".to_string();

    InMemoryStore::new(
        properties,
        vec![dated, older, wrong_zone, mail_only, broker, dropped, same_person],
    )
}

fn aggregator(store: InMemoryStore, options: AggregatorOptions) -> CandidateAggregator {
    CandidateAggregator::new(Arc::new(store), None, options)
}

#[tokio::test]
async fn test_candidate_list_end_to_end() {
    let aggregator = aggregator(sample_store(), AggregatorOptions::default());
    let found = aggregator
        .find_candidates("AA100", MatchVariant::default())
        .await
        .unwrap();

    // 萩原2丁目 resolves through the chome rule
    assert_eq!(
        found.zone_codes,
        [ZoneCode::circled(1), ZoneCode::circled(40)].into()
    );
    let numbers: Vec<&str> = found
        .list
        .candidates
        .iter()
        .map(|c| c.buyer.buyer_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["B001", "B002"]);
    assert_eq!(found.list.total, 2);
}

#[tokio::test]
async fn test_distribution_consolidates_and_lists_emails() {
    let aggregator = aggregator(sample_store(), AggregatorOptions::default());
    let found = aggregator
        .find_candidates("AA100", MatchVariant::Distribution)
        .await
        .unwrap();

    assert_eq!(found.list.total, 3);
    let merged = found
        .list
        .candidates
        .iter()
        .find(|c| c.merged_buyer_numbers.len() == 2)
        .expect("B004 and B007 merge by email");
    assert_eq!(merged.merged_buyer_numbers, vec!["B004", "B007"]);

    let emails = found.list.emails();
    assert_eq!(emails.len(), 3);
    assert!(emails.contains(&"b004@example.com".to_string()));
    assert!(!emails.contains(&"b005@example.com".to_string()));
}

#[tokio::test]
async fn test_missing_property_is_not_found() {
    let aggregator = aggregator(sample_store(), AggregatorOptions::default());
    let err = aggregator
        .find_candidates("ZZ999", MatchVariant::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CandidateError::NotFound(_)));
    assert_eq!(err.code(), "PROPERTY_NOT_FOUND");
}

#[tokio::test]
async fn test_store_failure_is_data_access() {
    let mut store = sample_store();
    store.fail = true;
    let err = aggregator(store, AggregatorOptions::default())
        .find_candidates("AA100", MatchVariant::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DATA_ACCESS_ERROR");
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let mut store = sample_store();
    store.delay = Some(Duration::from_millis(200));
    let options = AggregatorOptions {
        deadline: Duration::from_millis(20),
        ..AggregatorOptions::default()
    };
    let err = aggregator(store, options)
        .find_candidates("AA100", MatchVariant::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CandidateError::DeadlineExceeded(_)));
}

#[tokio::test]
async fn test_distribution_pool_matches_unfiltered_evaluation() {
    // Same person: the record declining mail carries the zone of the property
    let mut wants_mail = create_buyer("B1", "①", "B", "要");
    wants_mail.email = "family@example.com".to_string();
    let mut declines = create_buyer("B2", "③", "B", "不要");
    declines.email = "family@example.com".to_string();
    let buyers = vec![wants_mail, declines];

    let property = create_property("AA300", "大分市萩原3丁目");
    let zones = ZoneCodeResolver::shared().resolve_property(&property);
    let target = PropertyTarget::new(&property, zones, None);
    let unfiltered = Matcher::for_variant(MatchVariant::Distribution).find_candidates(
        &buyers,
        &target,
        &HashMap::new(),
    );
    assert_eq!(unfiltered.total, 1);

    let store = InMemoryStore::new(vec![property], buyers);
    let found = aggregator(store, AggregatorOptions::default())
        .find_candidates("AA300", MatchVariant::Distribution)
        .await
        .unwrap();
    assert_eq!(found.list.total, unfiltered.total);
    assert_eq!(found.list.candidates[0].merged_buyer_numbers, vec!["B1", "B2"]);
}

#[tokio::test]
async fn test_distance_match_uses_inquired_property() {
    let mut store = sample_store();
    store.properties.push(create_property("AA050", "別府市北浜"));
    let mut nearby = create_buyer("B100", "⑤", "B", "要");
    nearby.inquired_property_number = Some("AA050".to_string());
    store.buyers = vec![nearby];

    let extractor = FixedExtractor {
        coordinates: HashMap::from([
            ("AA100".to_string(), Coordinates::new(33.2328, 131.6065)),
            ("AA050".to_string(), Coordinates::new(33.2400, 131.6100)),
        ]),
    };
    let options = AggregatorOptions {
        enable_distance_match: true,
        ..AggregatorOptions::default()
    };
    let aggregator = CandidateAggregator::new(Arc::new(store), Some(Arc::new(extractor)), options);

    let found = aggregator
        .find_candidates("AA100", MatchVariant::Distribution)
        .await
        .unwrap();
    assert_eq!(found.list.total, 1);
    assert!(found.list.candidates[0].distance_km.is_some_and(|d| d < 3.0));

    // The candidate list never measures distance
    let list = aggregator
        .find_candidates("AA100", MatchVariant::default())
        .await
        .unwrap();
    assert_eq!(list.list.total, 0);
}

fn app_state(store: InMemoryStore) -> AppState {
    AppState::new(
        Arc::new(aggregator(store, AggregatorOptions::default())),
        50,
        200,
    )
}

#[actix_web::test]
async fn test_http_candidates_endpoint() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(sample_store())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/AA100/candidates?limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(body["candidates"][0]["buyer_number"], "B001");
    assert_eq!(body["property"]["zoneCodes"], serde_json::json!(["①", "㊵"]));

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/AA100/distribution")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["emails"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_http_error_mapping() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(sample_store())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/ZZ999/candidates")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "PROPERTY_NOT_FOUND");

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/AA100/candidates?limit=500")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_http_zone_resolve_and_health() {
    let mut failing = sample_store();
    failing.fail = true;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(failing)))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/zones/resolve?address=%E5%88%A5%E5%BA%9C%E5%B8%82%E5%85%83%E7%94%BA")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["zoneCodes"], serde_json::json!(["⑩", "㊶"]));

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "degraded");

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/AA100/candidates")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
}
