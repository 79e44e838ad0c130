use crate::core::{FilterConfig, MatchVariant};
use crate::models::{Buyer, Coordinates, Property};
use crate::services::geocoding::GeocodingError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a listing store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Rows per request when paging through the buyer table
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Data-layer pre-filter applied when loading the buyer pool
#[derive(Debug, Clone, PartialEq)]
pub struct BuyerPoolFilter {
    /// Keep only records whose distribution flag is one of these; `None` keeps every flag
    pub distribution_tokens: Option<Vec<String>>,
    pub exclude_deleted: bool,
    /// Drop records with a null status
    pub require_status: bool,
    pub page_size: usize,
}

impl BuyerPoolFilter {
    /// Per-record pushdown of the distribution and status gates
    pub fn for_config(config: &FilterConfig) -> Self {
        Self {
            distribution_tokens: Some(config.distribution_tokens.iter().cloned().collect()),
            exclude_deleted: true,
            require_status: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Only soft-deleted records are dropped
    pub fn live_records() -> Self {
        Self {
            distribution_tokens: None,
            exclude_deleted: true,
            require_status: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Pre-filter that cannot change the result of `variant`.
    ///
    /// A consolidating variant needs every live record of a person, since a
    /// record failing the flag or status gate on its own still adds zones,
    /// types and prices to the merged buyer.
    pub fn for_variant(variant: MatchVariant, config: &FilterConfig) -> Self {
        if variant.consolidates() {
            Self::live_records()
        } else {
            Self::for_config(config)
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Same predicate the backends push down, applied in memory
    pub fn admits(&self, buyer: &Buyer) -> bool {
        if self.exclude_deleted && buyer.is_deleted() {
            return false;
        }
        if self.require_status && buyer.latest_status.trim().is_empty() {
            return false;
        }
        match &self.distribution_tokens {
            Some(tokens) => tokens.iter().any(|t| t == buyer.distribution_type.trim()),
            None => true,
        }
    }
}

/// Read-only access to properties and buyers
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn get_property(&self, property_number: &str) -> Result<Option<Property>, StoreError>;

    async fn get_properties(&self, property_numbers: &[String]) -> Result<Vec<Property>, StoreError>;

    /// Every buyer record passing `filter`, across all pages
    async fn fetch_buyer_pool(&self, filter: &BuyerPoolFilter) -> Result<Vec<Buyer>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Derives coordinates for a property from its map link or address
#[async_trait]
pub trait CoordinateExtractor: Send + Sync {
    async fn extract(&self, property: &Property) -> Result<Option<Coordinates>, GeocodingError>;
}
