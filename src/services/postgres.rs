use crate::models::{Buyer, Property};
use crate::services::traits::{BuyerPoolFilter, ListingStore, StoreError};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

const PROPERTY_COLUMNS: &str =
    "property_number, address, property_type, price, google_map_url, distribution_areas";

const BUYER_COLUMNS: &str = "buyer_number, name, email, phone_number, desired_area, \
     desired_property_type, price_range_house, price_range_apartment, price_range_land, \
     latest_status, distribution_type, inquiry_source, broker_inquiry, property_number, \
     reception_date, deleted_at";

/// Direct PostgreSQL access to the back-office tables
///
/// Only ever reads; no migrations are run.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }
}

fn text(row: &PgRow, column: &str) -> Result<String, sqlx::Error> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

fn property_from_row(row: &PgRow) -> Result<Property, sqlx::Error> {
    let price: Option<i64> = row.try_get("price")?;
    Ok(Property {
        property_number: row.try_get("property_number")?,
        address: text(row, "address")?,
        property_type: text(row, "property_type")?,
        price: price.and_then(|p| u64::try_from(p).ok()),
        google_map_url: row.try_get("google_map_url")?,
        distribution_areas: row.try_get("distribution_areas")?,
    })
}

fn buyer_from_row(row: &PgRow) -> Result<Buyer, sqlx::Error> {
    Ok(Buyer {
        buyer_number: row.try_get("buyer_number")?,
        name: text(row, "name")?,
        email: text(row, "email")?,
        phone_number: text(row, "phone_number")?,
        desired_area: text(row, "desired_area")?,
        desired_property_type: text(row, "desired_property_type")?,
        price_range_house: text(row, "price_range_house")?,
        price_range_apartment: text(row, "price_range_apartment")?,
        price_range_land: text(row, "price_range_land")?,
        latest_status: text(row, "latest_status")?,
        distribution_type: text(row, "distribution_type")?,
        inquiry_source: text(row, "inquiry_source")?,
        broker_inquiry: text(row, "broker_inquiry")?,
        inquired_property_number: row.try_get("property_number")?,
        reception_date: row.try_get("reception_date")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// SELECT for one page of the buyer pool.
///
/// Binds run `$1` tokens (only when a flag filter is set), then limit, then offset.
fn pool_query(filter: &BuyerPoolFilter) -> String {
    let mut conditions = Vec::new();
    let mut next_bind = 1;
    if filter.distribution_tokens.is_some() {
        conditions.push(format!("distribution_type = ANY(${})", next_bind));
        next_bind += 1;
    }
    if filter.exclude_deleted {
        conditions.push("deleted_at IS NULL".to_string());
    }
    if filter.require_status {
        conditions.push("latest_status IS NOT NULL".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    format!(
        "SELECT {} FROM buyers{} ORDER BY buyer_number LIMIT ${} OFFSET ${}",
        BUYER_COLUMNS,
        where_clause,
        next_bind,
        next_bind + 1
    )
}

#[async_trait]
impl ListingStore for PostgresClient {
    async fn get_property(&self, property_number: &str) -> Result<Option<Property>, StoreError> {
        let query = format!(
            "SELECT {} FROM property_listings WHERE property_number = $1 LIMIT 1",
            PROPERTY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(property_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(property_from_row).transpose()?)
    }

    async fn get_properties(&self, property_numbers: &[String]) -> Result<Vec<Property>, StoreError> {
        if property_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {} FROM property_listings WHERE property_number = ANY($1)",
            PROPERTY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(property_numbers)
            .fetch_all(&self.pool)
            .await?;

        let properties: Result<Vec<Property>, _> = rows.iter().map(property_from_row).collect();
        Ok(properties?)
    }

    async fn fetch_buyer_pool(&self, filter: &BuyerPoolFilter) -> Result<Vec<Buyer>, StoreError> {
        let query = pool_query(filter);
        let mut pool = Vec::new();
        let mut offset = 0;

        loop {
            let mut page = sqlx::query(&query);
            if let Some(tokens) = &filter.distribution_tokens {
                page = page.bind(tokens);
            }
            let rows = page
                .bind(filter.page_size as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await?;

            let fetched = rows.len();
            for row in &rows {
                pool.push(buyer_from_row(row)?);
            }
            if fetched < filter.page_size {
                break;
            }
            offset += filter.page_size;
        }

        tracing::debug!("Fetched {} buyers from PostgreSQL", pool.len());
        Ok(pool)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FilterConfig;

    #[test]
    fn test_pool_query_conditions() {
        let filter = BuyerPoolFilter::for_config(&FilterConfig::candidate_list());
        let query = pool_query(&filter);
        assert!(query.contains("distribution_type = ANY($1)"));
        assert!(query.contains("deleted_at IS NULL"));
        assert!(query.contains("latest_status IS NOT NULL"));
        assert!(query.ends_with("LIMIT $2 OFFSET $3"));

        let relaxed = BuyerPoolFilter {
            exclude_deleted: false,
            require_status: false,
            ..filter
        };
        let query = pool_query(&relaxed);
        assert!(!query.contains("deleted_at IS NULL"));
        assert!(!query.contains("latest_status IS NOT NULL"));
        assert!(query.contains("WHERE distribution_type = ANY($1) ORDER BY"));
    }

    #[test]
    fn test_live_records_query_binds_only_paging() {
        let query = pool_query(&BuyerPoolFilter::live_records());
        assert!(query.contains(" WHERE deleted_at IS NULL ORDER BY"));
        assert!(!query.contains("ANY("));
        assert!(!query.contains("latest_status IS NOT NULL"));
        assert!(query.ends_with("LIMIT $1 OFFSET $2"));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_health_check() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let client = PostgresClient::new(&url, 2, 1).await.unwrap();
        assert!(client.health_check().await.unwrap());
    }
}
