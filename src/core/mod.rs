// Core matching exports
pub mod consolidate;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod price;
pub mod property_type;
pub mod zone_tables;
pub mod zones;

pub use consolidate::{consolidate, ConsolidatedBuyer};
pub use distance::{haversine_distance, within_radius};
pub use filters::{BuyerEligibilityFilter, FilterConfig};
pub use matcher::{CandidateList, MatchVariant, Matcher};
pub use price::{ParsedPrice, PriceRange};
pub use zones::ZoneCodeResolver;
