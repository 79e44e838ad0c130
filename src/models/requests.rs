use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for the candidate list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CandidatesQuery {
    #[validate(range(min = 1, max = 200))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query string for the zone diagnostic endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveZonesQuery {
    #[validate(length(min = 1, max = 500))]
    pub address: String,
}
