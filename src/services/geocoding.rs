use crate::models::{Coordinates, Property};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::traits::CoordinateExtractor;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Hosts that serve shortened map links
const SHORT_LINK_HOSTS: &[&str] = &["goo.gl", "maps.app.goo.gl"];

static PIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)").expect("valid pin regex")
});

static VIEWPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").expect("valid viewport regex"));

static QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&](?:q|query|ll|center)=(-?\d+\.\d+)(?:,|%2C|%2c)\s*(?:\+|%20)?(-?\d+\.\d+)")
        .expect("valid query regex")
});

/// Errors from coordinate lookups
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding API returned error: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Read coordinates embedded in a map URL.
///
/// Tries the `!3d..!4d..` place pin, then the `@lat,lng` viewport, then the
/// `q`/`query`/`ll`/`center` parameters.
pub fn parse_map_link(url: &str) -> Option<Coordinates> {
    [&*PIN, &*VIEWPORT, &*QUERY]
        .iter()
        .filter_map(|re| re.captures(url))
        .filter_map(|caps| {
            let lat = caps.get(1)?.as_str().parse().ok()?;
            let lng = caps.get(2)?.as_str().parse().ok()?;
            Some(Coordinates::new(lat, lng))
        })
        .find(Coordinates::is_valid)
}

pub fn is_short_link(url: &str) -> bool {
    let without_scheme = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = without_scheme.split('/').next().unwrap_or_default();
    SHORT_LINK_HOSTS.contains(&host)
}

/// Coordinates from a property's map link, with an optional Geocoding API fallback
pub struct MapLinkExtractor {
    client: Client,
    api_key: Option<String>,
    geocode_url: String,
}

impl MapLinkExtractor {
    pub fn new(
        api_key: Option<String>,
        geocode_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            geocode_url: geocode_url.unwrap_or_else(|| DEFAULT_GEOCODE_URL.to_string()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Follow redirects of a shortened link and parse the final URL
    pub async fn expand_and_parse(&self, url: &str) -> Result<Option<Coordinates>, GeocodingError> {
        let response = self.client.get(url).send().await?;
        let expanded = response.url().as_str().to_string();
        tracing::debug!("Expanded map link {} -> {}", url, expanded);
        Ok(parse_map_link(&expanded))
    }

    /// Look up an address with the Geocoding API
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };

        let url = format!(
            "{}?address={}&language=ja&region=jp&key={}",
            self.geocode_url,
            urlencoding::encode(address),
            urlencoding::encode(key)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodingError::Api(format!(
                "Geocoding request failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let status = json
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| GeocodingError::InvalidResponse("Missing status".into()))?;

        match status {
            "OK" => {
                let location = json
                    .pointer("/results/0/geometry/location")
                    .ok_or_else(|| GeocodingError::InvalidResponse("Missing location".into()))?;
                let lat = location.get("lat").and_then(Value::as_f64);
                let lng = location.get("lng").and_then(Value::as_f64);
                match (lat, lng) {
                    (Some(lat), Some(lng)) => {
                        Ok(Some(Coordinates::new(lat, lng)).filter(Coordinates::is_valid))
                    }
                    _ => Err(GeocodingError::InvalidResponse("Location without lat/lng".into())),
                }
            }
            "ZERO_RESULTS" => Ok(None),
            other => Err(GeocodingError::Api(other.to_string())),
        }
    }
}

#[async_trait]
impl CoordinateExtractor for MapLinkExtractor {
    async fn extract(&self, property: &Property) -> Result<Option<Coordinates>, GeocodingError> {
        if let Some(url) = property.google_map_url.as_deref().filter(|u| !u.trim().is_empty()) {
            if let Some(coords) = parse_map_link(url) {
                return Ok(Some(coords));
            }
            if is_short_link(url) {
                match self.expand_and_parse(url).await {
                    Ok(Some(coords)) => return Ok(Some(coords)),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        "Could not expand map link for {}: {}",
                        property.property_number,
                        e
                    ),
                }
            }
        }

        if property.address.trim().is_empty() {
            return Ok(None);
        }
        self.geocode(&property.address).await
    }
}

/// Wraps an extractor with the coordinate cache
pub struct CachedExtractor {
    inner: Arc<dyn CoordinateExtractor>,
    cache: Arc<CacheManager>,
}

impl CachedExtractor {
    pub fn new(inner: Arc<dyn CoordinateExtractor>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl CoordinateExtractor for CachedExtractor {
    async fn extract(&self, property: &Property) -> Result<Option<Coordinates>, GeocodingError> {
        let key = CacheKey::coordinates(&property.property_number);
        if let Ok(cached) = self.cache.get::<Coordinates>(&key).await {
            return Ok(Some(cached));
        }

        // Only hits are stored, a miss is retried on the next lookup
        let coords = self.inner.extract(property).await?;
        if let Some(found) = &coords {
            if let Err(e) = self.cache.set(&key, found).await {
                tracing::warn!("Failed to cache coordinates for {}: {}", property.property_number, e);
            }
        }
        Ok(coords)
    }
}
