// Service exports
pub mod aggregator;
pub mod cache;
pub mod geocoding;
pub mod postgres;
pub mod supabase;
pub mod traits;

pub use aggregator::{AggregatedCandidates, AggregatorOptions, CandidateAggregator, CandidateError};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use geocoding::{CachedExtractor, GeocodingError, MapLinkExtractor};
pub use postgres::PostgresClient;
pub use supabase::{SupabaseClient, SupabaseTables};
pub use traits::{BuyerPoolFilter, CoordinateExtractor, ListingStore, StoreError};
