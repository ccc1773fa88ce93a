/// Catalog snapshot fetcher.
///
/// Pulls a bounded set of active restaurants and available dishes, plus the
/// user's recent orders when a user id is known. The hosted backend speaks
/// PostgREST; a JSON file stands in for it offline.
use std::path::PathBuf;
use std::time::Duration;

use grounding::CatalogSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CatalogBackend, Config};
use crate::error::AppError;

/// How much of the catalog one turn may see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SnapshotLimits {
    pub restaurants: usize,
    pub dishes: usize,
    pub order_history: usize,
    pub user_id: Option<String>,
}

impl SnapshotLimits {
    pub fn for_user(&self, user_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            ..self.clone()
        }
    }
}

pub enum CatalogSource {
    Rest(RestCatalog),
    File(PathBuf),
    Static(CatalogSnapshot),
}

impl CatalogSource {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        match &config.catalog {
            CatalogBackend::Rest { base_url, api_key } => Ok(Self::Rest(RestCatalog::new(
                base_url,
                api_key,
                config.catalog_timeout,
            )?)),
            CatalogBackend::File { path } => Ok(Self::File(path.clone())),
        }
    }

    pub async fn fetch_snapshot(&self, limits: &SnapshotLimits) -> Result<CatalogSnapshot, AppError> {
        let snapshot = match self {
            CatalogSource::Rest(rest) => rest.fetch_snapshot(limits).await?,
            CatalogSource::File(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::Catalog(format!("failed to read {}: {e}", path.display()))
                })?;
                let snapshot: CatalogSnapshot = serde_json::from_str(&raw).map_err(|e| {
                    AppError::Catalog(format!("invalid catalog fixture {}: {e}", path.display()))
                })?;
                bounded(snapshot, limits)
            }
            CatalogSource::Static(snapshot) => bounded(snapshot.clone(), limits),
        };
        info!(
            restaurants = snapshot.restaurants.len(),
            dishes = snapshot.dishes.len(),
            orders = snapshot.recent_orders.as_ref().map(Vec::len).unwrap_or(0),
            "catalog snapshot fetched"
        );
        Ok(snapshot)
    }
}

/// Applies the same visibility rules the REST queries do.
fn bounded(mut snapshot: CatalogSnapshot, limits: &SnapshotLimits) -> CatalogSnapshot {
    snapshot.restaurants.retain(|r| r.is_active);
    snapshot.restaurants.truncate(limits.restaurants);
    snapshot.dishes.retain(|d| d.is_available);
    snapshot.dishes.truncate(limits.dishes);
    if let Some(orders) = snapshot.recent_orders.as_mut() {
        orders.truncate(limits.order_history);
    }
    if limits.user_id.is_none() || limits.order_history == 0 {
        snapshot.recent_orders = None;
    }
    snapshot
}

pub struct RestCatalog {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    summary: Option<String>,
}

impl RestCatalog {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("mcp-servers/concierge")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build catalog client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    async fn fetch_snapshot(&self, limits: &SnapshotLimits) -> Result<CatalogSnapshot, AppError> {
        let restaurant_query = [
            ("select", "*".to_string()),
            ("is_active", "eq.true".to_string()),
            ("order", "rating.desc.nullslast".to_string()),
            ("limit", limits.restaurants.to_string()),
        ];
        let dish_query = [
            ("select", "*".to_string()),
            ("is_available", "eq.true".to_string()),
            ("limit", limits.dishes.to_string()),
        ];
        let restaurants = self.get_rows("restaurants", &restaurant_query);
        let dishes = self.get_rows("dishes", &dish_query);
        let (restaurants, dishes) = tokio::try_join!(restaurants, dishes)?;

        let recent_orders = match limits.user_id.as_deref() {
            Some(user_id) if limits.order_history > 0 => self.recent_orders(user_id, limits).await,
            _ => None,
        };

        Ok(CatalogSnapshot {
            restaurants,
            dishes,
            recent_orders,
        })
    }

    /// Order history is an enhancement; a failure here only loses it.
    async fn recent_orders(&self, user_id: &str, limits: &SnapshotLimits) -> Option<Vec<String>> {
        let query = [
            ("select", "summary".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
            ("limit", limits.order_history.to_string()),
        ];
        let rows: Vec<OrderRow> = self
            .get_rows("orders", &query)
            .await
            .inspect_err(|e| warn!(error = %e, "order history unavailable, continuing without it"))
            .ok()?;
        Some(rows.into_iter().filter_map(|r| r.summary).collect())
    }

    async fn get_rows<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("{table} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(512).collect();
            return Err(AppError::Catalog(format!(
                "{table} request returned {status}: {body}"
            )));
        }
        resp.json::<Vec<T>>()
            .await
            .map_err(|e| AppError::Catalog(format!("{table} rows did not decode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FIXTURE: &str = r#"{
        "restaurants": [
            {"id": "r1", "name": "Nando's Bahrain", "rating": 4.4, "prep_time": "20 min", "min_order": "5.000"},
            {"id": "r2", "name": "Shake Shack Bahrain", "rating": 4.6, "min_order": 2},
            {"id": "r3", "name": "Closed Kitchen Bahrain", "is_active": false}
        ],
        "dishes": [
            {"id": "d1", "name": "Peri-Peri Chicken", "price": "3.500", "restaurant_id": "r1"},
            {"id": "d2", "name": "Garlic Bread", "price": "0.900", "restaurant_id": "r1", "is_available": false},
            {"id": "d3", "name": "ShackBurger", "price": "2.900", "restaurant_id": "r2"}
        ],
        "recent_orders": ["ShackBurger from Shake Shack Bahrain", "Peri-Peri Chicken"]
    }"#;

    fn limits(restaurants: usize, user_id: Option<&str>) -> SnapshotLimits {
        SnapshotLimits {
            restaurants,
            dishes: 10,
            order_history: 1,
            user_id: user_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_file_source_applies_limits() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FIXTURE.as_bytes()).expect("write fixture");

        let source = CatalogSource::File(file.path().to_path_buf());
        let snapshot = source
            .fetch_snapshot(&limits(1, Some("u1")))
            .await
            .expect("fixture should load");

        assert_eq!(snapshot.restaurants.len(), 1);
        assert_eq!(snapshot.dishes.len(), 2, "unavailable dish filtered");
        assert_eq!(snapshot.recent_orders.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_anonymous_turn_has_no_history() {
        let snapshot: CatalogSnapshot = serde_json::from_str(FIXTURE).expect("fixture parses");
        let source = CatalogSource::Static(snapshot);
        let snapshot = source
            .fetch_snapshot(&limits(10, None))
            .await
            .expect("static source never fails");
        assert!(snapshot.recent_orders.is_none());
        let ids: Vec<&str> = snapshot.restaurants.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"], "inactive restaurant filtered");
    }

    #[tokio::test]
    async fn test_missing_file_is_catalog_error() {
        let source = CatalogSource::File(PathBuf::from("/nonexistent/catalog.json"));
        let err = source
            .fetch_snapshot(&limits(10, None))
            .await
            .expect_err("missing file should fail");
        assert!(matches!(err, AppError::Catalog(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_catalog_error() {
        let rest = RestCatalog::new("http://127.0.0.1:9", "key", Duration::from_secs(2))
            .expect("client builds");
        let err = CatalogSource::Rest(rest)
            .fetch_snapshot(&limits(10, None))
            .await
            .expect_err("nothing listens on port 9");
        assert!(matches!(err, AppError::Catalog(_)));
    }

    #[test]
    fn test_limits_for_user() {
        let base = limits(5, None);
        let scoped = base.for_user(Some("u7"));
        assert_eq!(scoped.user_id.as_deref(), Some("u7"));
        assert_eq!(scoped.restaurants, 5);
    }
}
