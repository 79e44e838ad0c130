// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Buyer, BuyerCriteria, Candidate, Coordinates, Gate, GateOutcomes, MatchResult, PriceRanges,
    Property, PropertyKind, PropertyTarget, TypePreference, ZoneCode,
};
pub use requests::{CandidatesQuery, ResolveZonesQuery};
pub use responses::{
    CandidatesResponse, DistributionResponse, ErrorResponse, HealthResponse, PropertySummary,
    ResolveZonesResponse,
};
