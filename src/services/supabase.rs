use crate::models::{Buyer, Property};
use crate::services::traits::{BuyerPoolFilter, ListingStore, StoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Table names in the Supabase project
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    pub properties: String,
    pub buyers: String,
}

impl Default for SupabaseTables {
    fn default() -> Self {
        Self {
            properties: "property_listings".to_string(),
            buyers: "buyers".to_string(),
        }
    }
}

/// Supabase (PostgREST) client
///
/// Read-only access to:
/// - Property listings by number
/// - The buyer table, paged with limit/offset
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: Client,
    tables: SupabaseTables,
}

impl SupabaseClient {
    pub fn new(
        base_url: String,
        service_key: String,
        tables: SupabaseTables,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            service_key,
            client,
            tables,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    /// GET a table with PostgREST query parameters, returning the raw row array
    async fn select_rows(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Value>, StoreError> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.table_url(table), query);

        tracing::debug!("Supabase select: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Supabase select on {} failed: {} - {}", table, status, body);
            return Err(StoreError::Api(format!("Failed to query {}: {}", table, status)));
        }

        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            _ => Err(StoreError::InvalidResponse("Expected a JSON array of rows".into())),
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>, StoreError> {
        let rows = self.select_rows(table, params).await?;
        Ok(parse_rows(table, rows))
    }
}

/// Deserialize rows, skipping the ones that do not fit `T`
fn parse_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    let mut parsed = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value(row) {
            Ok(value) => parsed.push(value),
            Err(e) => tracing::warn!("Skipping malformed row in {}: {}", table, e),
        }
    }
    parsed
}

/// PostgREST `in.(...)` list with every value quoted
fn in_list(values: &[String]) -> String {
    let quoted = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", quoted)
}

fn pool_params(filter: &BuyerPoolFilter, offset: usize) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    if filter.exclude_deleted {
        params.push(("deleted_at".to_string(), "is.null".to_string()));
    }
    if filter.require_status {
        params.push(("latest_status".to_string(), "not.is.null".to_string()));
    }
    if let Some(tokens) = &filter.distribution_tokens {
        params.push(("distribution_type".to_string(), in_list(tokens)));
    }
    params.push(("order".to_string(), "buyer_number.asc".to_string()));
    params.push(("limit".to_string(), filter.page_size.to_string()));
    params.push(("offset".to_string(), offset.to_string()));
    params
}

#[async_trait]
impl ListingStore for SupabaseClient {
    async fn get_property(&self, property_number: &str) -> Result<Option<Property>, StoreError> {
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("property_number".to_string(), format!("eq.{}", property_number)),
            ("limit".to_string(), "1".to_string()),
        ];
        let mut rows: Vec<Property> = self.select(&self.tables.properties, &params).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn get_properties(&self, property_numbers: &[String]) -> Result<Vec<Property>, StoreError> {
        if property_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("property_number".to_string(), in_list(property_numbers)),
        ];
        self.select(&self.tables.properties, &params).await
    }

    async fn fetch_buyer_pool(&self, filter: &BuyerPoolFilter) -> Result<Vec<Buyer>, StoreError> {
        if filter.distribution_tokens.as_ref().is_some_and(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let mut pool = Vec::new();
        let mut offset = 0;
        loop {
            let rows = self
                .select_rows(&self.tables.buyers, &pool_params(filter, offset))
                .await?;
            // End of data is decided on the raw page, before malformed rows are dropped
            let fetched = rows.len();
            pool.extend(parse_rows::<Buyer>(&self.tables.buyers, rows));
            if fetched < filter.page_size {
                break;
            }
            offset += filter.page_size;
        }

        tracing::debug!("Fetched {} buyers from Supabase", pool.len());
        Ok(pool)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let params = vec![
            ("select".to_string(), "property_number".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        self.select_rows(&self.tables.properties, &params)
            .await
            .map(|_| true)
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
