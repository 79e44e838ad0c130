use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use estate_match::config::{Backend, Settings};
use estate_match::routes::{self, candidates::AppState};
use estate_match::services::{
    CacheManager, CachedExtractor, CandidateAggregator, CoordinateExtractor, ListingStore,
    MapLinkExtractor, PostgresClient, SupabaseClient, SupabaseTables,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for query string errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    JsonError {
        error: "VALIDATION_ERROR".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", what, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, err))
}

/// RUST_LOG wins, then LOG_LEVEL, then the configured level
fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
        EnvFilter::new(level)
    });
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn ListingStore>> {
    match settings.data_source.backend {
        Backend::Supabase => {
            let client = SupabaseClient::new(
                settings.supabase.url.clone(),
                settings.supabase.service_key.clone(),
                SupabaseTables {
                    properties: settings.supabase.properties_table.clone(),
                    buyers: settings.supabase.buyers_table.clone(),
                },
                Duration::from_secs(settings.supabase.timeout_secs),
            )
            .map_err(|e| startup_error("Failed to create Supabase client", e))?;
            info!("Supabase client initialized");
            let store: Arc<dyn ListingStore> = Arc::new(client);
            Ok(store)
        }
        Backend::Postgres => {
            let client = PostgresClient::from_settings(
                &settings.database.url,
                settings.database.max_connections,
                settings.database.min_connections,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            info!("PostgreSQL client initialized");
            let store: Arc<dyn ListingStore> = Arc::new(client);
            Ok(store)
        }
    }
}

async fn build_extractor(settings: &Settings) -> std::io::Result<Option<Arc<dyn CoordinateExtractor>>> {
    if !settings.matching.enable_distance_match {
        return Ok(None);
    }

    let extractor = MapLinkExtractor::new(
        settings.geocoding.api_key.clone(),
        settings.geocoding.endpoint.clone(),
        Duration::from_secs(settings.geocoding.timeout_secs),
    )
    .map_err(|e| startup_error("Failed to create geocoding client", e))?;
    if !extractor.has_api_key() {
        info!("No geocoding API key, coordinates come from map links only");
    }

    let cache = CacheManager::connect(
        settings.cache.redis_url.as_deref(),
        settings.cache.l1_cache_size,
        settings.cache.ttl_secs,
    )
    .await;
    let stats = cache.stats();
    info!("Coordinate cache ready (redis: {})", stats.redis_enabled);

    let cached: Arc<dyn CoordinateExtractor> =
        Arc::new(CachedExtractor::new(Arc::new(extractor), Arc::new(cache)));
    Ok(Some(cached))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings);
    info!("Starting estate-match candidate service...");

    let store = build_store(&settings).await?;
    let extractor = build_extractor(&settings).await?;
    let options = settings.aggregator_options();
    info!(
        "Matching: distance {} (radius {} km), deadline {:?}",
        options.enable_distance_match, options.distance_radius_km, options.deadline
    );

    let aggregator = Arc::new(CandidateAggregator::new(store, extractor, options));
    let app_state = AppState::new(
        aggregator,
        settings.matching.default_limit,
        settings.matching.max_limit,
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
