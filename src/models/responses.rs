use serde::{Deserialize, Serialize};
use crate::models::domain::{Candidate, Property, ZoneCode};

/// Response for the candidate list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<Candidate>,
    /// Number of matching buyers before truncation
    pub total: usize,
    pub property: PropertySummary,
}

/// Response for the distribution endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionResponse {
    pub candidates: Vec<Candidate>,
    pub total: usize,
    pub emails: Vec<String>,
    pub property: PropertySummary,
}

/// Property echoed back to the caller along with its resolved zones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_number: String,
    pub address: String,
    pub property_type: String,
    pub price: Option<u64>,
    #[serde(rename = "zoneCodes")]
    pub zone_codes: Vec<ZoneCode>,
}

impl PropertySummary {
    pub fn new(property: &Property, zone_codes: Vec<ZoneCode>) -> Self {
        Self {
            property_number: property.property_number.clone(),
            address: property.address.clone(),
            property_type: property.property_type.clone(),
            price: property.price,
            zone_codes,
        }
    }
}

/// Response for the zone diagnostic endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveZonesResponse {
    pub address: String,
    #[serde(rename = "zoneCodes")]
    pub zone_codes: Vec<ZoneCode>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
