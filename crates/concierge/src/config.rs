use std::path::PathBuf;
use std::time::Duration;

use grounding::assemble::CardDefaults;
use grounding::extract::ExtractorConfig;
use grounding::GroundingConfig;

use crate::catalog::SnapshotLimits;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub enum CatalogBackend {
    /// PostgREST-style hosted backend.
    Rest { base_url: String, api_key: String },
    /// JSON snapshot on disk, re-read on every fetch.
    File { path: PathBuf },
}

/// Application configuration loaded explicitly from environment variables.
///
/// Catalog size limits, the model name and the timeouts are passed down to
/// the fetcher and the prompt assembler from here; nothing below reads the
/// environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL. `None` disables the snapshot cache.
    pub redis_url: Option<String>,
    pub catalog: CatalogBackend,
    pub catalog_timeout: Duration,
    pub limits: SnapshotLimits,
    pub snapshot_ttl_secs: u64,
    pub model: String,
    pub temperature: Option<f32>,
    /// Upper bound for the whole model call, retries included.
    pub turn_timeout: Duration,
    pub history_limit: usize,
    pub suffix: String,
    pub placeholder_image: String,
    pub rate_limit_rps: Option<u32>,
}

impl Config {
    /// Required (one of):
    /// - `CATALOG_BASE_URL` + `CATALOG_API_KEY`
    /// - `CATALOG_FIXTURE_PATH`
    ///
    /// Optional:
    /// - `REDIS_URL`
    /// - `CONCIERGE_MODEL` (default: "gpt-4o-mini"), `CONCIERGE_TEMPERATURE`
    /// - `CONCIERGE_TURN_TIMEOUT_SECS` (default: 25)
    /// - `CONCIERGE_HISTORY_LIMIT` (default: 10)
    /// - `CATALOG_TIMEOUT_SECS` (default: 10)
    /// - `CATALOG_RESTAURANT_LIMIT` / `CATALOG_DISH_LIMIT` / `CATALOG_ORDER_HISTORY_LIMIT`
    /// - `SNAPSHOT_TTL_SECS` (default: 60)
    /// - `CATALOG_SUFFIX` (default: "Bahrain")
    /// - `CARD_PLACEHOLDER_IMAGE` (default: "/placeholder.svg")
    /// - `RATE_LIMIT_RPS`
    pub fn from_env() -> Result<Self, AppError> {
        let catalog = match (
            non_empty_env("CATALOG_BASE_URL"),
            non_empty_env("CATALOG_API_KEY"),
            non_empty_env("CATALOG_FIXTURE_PATH"),
        ) {
            (Some(base_url), Some(api_key), _) => CatalogBackend::Rest {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            },
            (Some(_), None, _) => {
                return Err(AppError::Config(
                    "CATALOG_API_KEY is required when CATALOG_BASE_URL is set".to_string(),
                ))
            }
            (None, _, Some(path)) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "catalog fixture not found: {}",
                        path.display()
                    )));
                }
                CatalogBackend::File { path }
            }
            (None, _, None) => {
                return Err(AppError::Config(
                    "set CATALOG_BASE_URL and CATALOG_API_KEY, or CATALOG_FIXTURE_PATH".to_string(),
                ))
            }
        };

        Ok(Self {
            redis_url: non_empty_env("REDIS_URL"),
            catalog,
            catalog_timeout: Duration::from_secs(env_parse("CATALOG_TIMEOUT_SECS", 10)),
            limits: SnapshotLimits {
                restaurants: env_parse("CATALOG_RESTAURANT_LIMIT", 30),
                dishes: env_parse("CATALOG_DISH_LIMIT", 120),
                order_history: env_parse("CATALOG_ORDER_HISTORY_LIMIT", 5),
                user_id: None,
            },
            snapshot_ttl_secs: env_parse("SNAPSHOT_TTL_SECS", 60),
            model: non_empty_env("CONCIERGE_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            temperature: std::env::var("CONCIERGE_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse::<f32>().ok()),
            turn_timeout: Duration::from_secs(env_parse("CONCIERGE_TURN_TIMEOUT_SECS", 25)),
            history_limit: env_parse("CONCIERGE_HISTORY_LIMIT", 10),
            suffix: non_empty_env("CATALOG_SUFFIX").unwrap_or_else(|| "Bahrain".to_string()),
            placeholder_image: non_empty_env("CARD_PLACEHOLDER_IMAGE")
                .unwrap_or_else(|| "/placeholder.svg".to_string()),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|&n| n > 0),
        })
    }

    pub fn grounding(&self) -> GroundingConfig {
        GroundingConfig {
            extractor: ExtractorConfig {
                suffix: self.suffix.clone(),
                ..ExtractorConfig::default()
            },
            defaults: CardDefaults {
                placeholder_image: self.placeholder_image.clone(),
                ..CardDefaults::default()
            },
            ..GroundingConfig::default()
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}
