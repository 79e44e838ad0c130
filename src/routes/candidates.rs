use crate::core::MatchVariant;
use crate::models::{
    CandidatesQuery, CandidatesResponse, DistributionResponse, ErrorResponse, HealthResponse,
    PropertySummary, ResolveZonesQuery, ResolveZonesResponse,
};
use crate::services::{AggregatedCandidates, CandidateAggregator, CandidateError};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<CandidateAggregator>,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(aggregator: Arc<CandidateAggregator>, default_limit: usize, max_limit: usize) -> Self {
        Self {
            aggregator,
            default_limit,
            max_limit,
        }
    }
}

/// Configure all candidate-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route(
            "/properties/{property_number}/candidates",
            web::get().to(find_candidates),
        )
        .route(
            "/properties/{property_number}/distribution",
            web::get().to(find_distribution),
        )
        .route("/zones/resolve", web::get().to(resolve_zones));
}

fn request_span(route: &'static str, property_number: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        route,
        property_number
    )
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "VALIDATION_ERROR".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Map an aggregation failure onto its HTTP status
pub fn candidate_error_response(err: &CandidateError) -> HttpResponse {
    let status = match err {
        CandidateError::NotFound(_) => StatusCode::NOT_FOUND,
        CandidateError::DataAccess(_) => StatusCode::BAD_GATEWAY,
        CandidateError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
    };
    HttpResponse::build(status).json(ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

fn summary(found: &AggregatedCandidates) -> PropertySummary {
    PropertySummary::new(&found.property, found.zone_codes.iter().copied().collect())
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store = state.aggregator.store();
    let healthy = match store.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!("{} health check failed: {}", store.backend_name(), e);
            false
        }
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Candidate list endpoint
///
/// GET /api/v1/properties/{property_number}/candidates?limit=50
async fn find_candidates(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CandidatesQuery>,
) -> impl Responder {
    let property_number = path.into_inner();
    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for candidates of {}: {}", property_number, errors);
        return validation_error(errors);
    }

    let limit = query
        .limit
        .unwrap_or(state.default_limit)
        .min(state.max_limit);
    let span = request_span("candidates", &property_number);

    async move {
        tracing::info!("Finding candidates, limit: {}", limit);
        match state
            .aggregator
            .find_candidates(&property_number, MatchVariant::CandidateList { limit })
            .await
        {
            Ok(found) => HttpResponse::Ok().json(CandidatesResponse {
                property: summary(&found),
                total: found.list.total,
                candidates: found.list.candidates,
            }),
            Err(e) => {
                tracing::error!("Candidate search failed: {}", e);
                candidate_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Distribution recipients endpoint
///
/// GET /api/v1/properties/{property_number}/distribution
async fn find_distribution(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let property_number = path.into_inner();
    let span = request_span("distribution", &property_number);

    async move {
        match state
            .aggregator
            .find_candidates(&property_number, MatchVariant::Distribution)
            .await
        {
            Ok(found) => {
                let emails = found.list.emails();
                tracing::info!("{} distribution recipients", emails.len());
                HttpResponse::Ok().json(DistributionResponse {
                    property: summary(&found),
                    total: found.list.total,
                    emails,
                    candidates: found.list.candidates,
                })
            }
            Err(e) => {
                tracing::error!("Distribution search failed: {}", e);
                candidate_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Zone diagnostic endpoint
///
/// GET /api/v1/zones/resolve?address=大分市中央町1丁目
async fn resolve_zones(
    state: web::Data<AppState>,
    query: web::Query<ResolveZonesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let zone_codes = state.aggregator.resolver().resolve(&query.address);
    tracing::debug!("Resolved {:?} -> {:?}", query.address, zone_codes);

    HttpResponse::Ok().json(ResolveZonesResponse {
        address: query.into_inner().address,
        zone_codes: zone_codes.into_iter().collect(),
    })
}
