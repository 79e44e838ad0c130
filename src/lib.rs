//! Estate Match - buyer candidate matching for a real-estate back office
//!
//! Given a property, this library works out which buyers are eligible
//! candidates: address-to-zone inference, a seven-gate eligibility filter,
//! consolidation of duplicate buyer records and ranking.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{BuyerEligibilityFilter, FilterConfig, MatchVariant, Matcher, ZoneCodeResolver};
pub use models::{Buyer, Candidate, MatchResult, Property, ZoneCode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let zones = ZoneCodeResolver::shared().resolve("大分県大分市");
        assert!(zones.contains(&ZoneCode::circled(40)));
    }
}
