use crate::core::{CandidateList, FilterConfig, MatchVariant, Matcher, ZoneCodeResolver};
use crate::models::{Buyer, Coordinates, Property, PropertyTarget, ZoneCode};
use crate::services::traits::{BuyerPoolFilter, CoordinateExtractor, ListingStore, StoreError};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by candidate aggregation
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("Property not found: {0}")]
    NotFound(String),

    #[error("Data access failed: {0}")]
    DataAccess(#[from] StoreError),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl CandidateError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CandidateError::NotFound(_) => "PROPERTY_NOT_FOUND",
            CandidateError::DataAccess(_) => "DATA_ACCESS_ERROR",
            CandidateError::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
        }
    }
}

/// Runtime knobs of the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Bound on one whole `find_candidates` call
    pub deadline: Duration,
    /// Bound on each coordinate lookup
    pub geocode_timeout: Duration,
    pub geocode_concurrency: usize,
    /// Distance matching for the distribution variant
    pub enable_distance_match: bool,
    pub distance_radius_km: f64,
    pub page_size: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            geocode_timeout: Duration::from_secs(5),
            geocode_concurrency: 8,
            enable_distance_match: false,
            distance_radius_km: crate::core::distance::DEFAULT_RADIUS_KM,
            page_size: crate::services::traits::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Property, its zones and the ranked candidates
#[derive(Debug, Clone)]
pub struct AggregatedCandidates {
    pub property: Property,
    pub zone_codes: BTreeSet<ZoneCode>,
    pub list: CandidateList,
}

/// Candidate aggregation orchestrator
///
/// # Pipeline Stages
/// 1. Load the property and resolve its zones
/// 2. Load the pre-filtered buyer pool
/// 3. Resolve coordinates (only with distance matching)
/// 4. Rank with `Matcher`
pub struct CandidateAggregator {
    store: Arc<dyn ListingStore>,
    extractor: Option<Arc<dyn CoordinateExtractor>>,
    resolver: &'static ZoneCodeResolver,
    options: AggregatorOptions,
}

impl CandidateAggregator {
    pub fn new(
        store: Arc<dyn ListingStore>,
        extractor: Option<Arc<dyn CoordinateExtractor>>,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            store,
            extractor,
            resolver: ZoneCodeResolver::shared(),
            options,
        }
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    pub fn resolver(&self) -> &ZoneCodeResolver {
        self.resolver
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    /// Filter config for a variant with the configured distance settings applied
    pub fn filter_config(&self, variant: MatchVariant) -> FilterConfig {
        let config = variant.filter_config();
        match variant {
            MatchVariant::Distribution => config.with_distance_match(
                self.options.enable_distance_match,
                self.options.distance_radius_km,
            ),
            MatchVariant::CandidateList { .. } => config,
        }
    }

    /// Eligible buyers for a property, bounded by the configured deadline
    pub async fn find_candidates(
        &self,
        property_number: &str,
        variant: MatchVariant,
    ) -> Result<AggregatedCandidates, CandidateError> {
        let deadline = self.options.deadline;
        match tokio::time::timeout(deadline, self.run(property_number, variant)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Candidate search for {} exceeded {:?}",
                    property_number,
                    deadline
                );
                Err(CandidateError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn run(
        &self,
        property_number: &str,
        variant: MatchVariant,
    ) -> Result<AggregatedCandidates, CandidateError> {
        let start = std::time::Instant::now();

        // Stage 1
        let property = self
            .store
            .get_property(property_number)
            .await?
            .ok_or_else(|| CandidateError::NotFound(property_number.to_string()))?;
        let zone_codes = self.resolver.resolve_property(&property);

        // Stage 2
        let config = self.filter_config(variant);
        let pool_filter =
            BuyerPoolFilter::for_variant(variant, &config).with_page_size(self.options.page_size);
        let pool = self.store.fetch_buyer_pool(&pool_filter).await?;

        // Stage 3
        let (coordinates, inquired) = match &self.extractor {
            Some(extractor) if config.enable_distance_match => {
                self.resolve_coordinates(extractor.as_ref(), &property, &pool)
                    .await
            }
            _ => (None, HashMap::new()),
        };

        // Stage 4
        let target = PropertyTarget::new(&property, zone_codes.clone(), coordinates);
        let list = Matcher::new(variant, config).find_candidates(&pool, &target, &inquired);

        tracing::info!(
            "Property {} ({:?}): {} candidates from {} buyers in {:?}",
            property_number,
            variant,
            list.total,
            pool.len(),
            start.elapsed()
        );

        Ok(AggregatedCandidates {
            property,
            zone_codes,
            list,
        })
    }

    /// Coordinates of the property and of every property the pool inquired about.
    /// Failures degrade to missing coordinates.
    async fn resolve_coordinates(
        &self,
        extractor: &dyn CoordinateExtractor,
        property: &Property,
        pool: &[Buyer],
    ) -> (Option<Coordinates>, HashMap<String, Coordinates>) {
        let own = self.locate(extractor, property).await;
        if own.is_none() {
            // Nothing to measure against
            return (None, HashMap::new());
        }

        let numbers: Vec<String> = pool
            .iter()
            .filter(|b| !b.is_deleted())
            .filter_map(|b| b.inquired_property_number.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if numbers.is_empty() {
            return (own, HashMap::new());
        }

        let inquired_properties = match self.store.get_properties(&numbers).await {
            Ok(properties) => properties,
            Err(e) => {
                tracing::warn!("Could not load inquired properties: {}", e);
                return (own, HashMap::new());
            }
        };

        let inquired: HashMap<String, Coordinates> = stream::iter(inquired_properties.iter())
            .map(|p| async move { (p.property_number.clone(), self.locate(extractor, p).await) })
            .buffer_unordered(self.options.geocode_concurrency.max(1))
            .filter_map(|(number, coords)| async move { coords.map(|c| (number, c)) })
            .collect()
            .await;

        tracing::debug!(
            "Resolved coordinates for {} of {} inquired properties",
            inquired.len(),
            numbers.len()
        );
        (own, inquired)
    }

    async fn locate(&self, extractor: &dyn CoordinateExtractor, property: &Property) -> Option<Coordinates> {
        match tokio::time::timeout(self.options.geocode_timeout, extractor.extract(property)).await {
            Ok(Ok(coords)) => coords,
            Ok(Err(e)) => {
                tracing::debug!("No coordinates for {}: {}", property.property_number, e);
                None
            }
            Err(_) => {
                tracing::warn!("Coordinate lookup for {} timed out", property.property_number);
                None
            }
        }
    }
}
