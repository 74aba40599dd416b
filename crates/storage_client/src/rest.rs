//! REST client for the durable store.
//!
//! Covers: user rows (get-or-create with duplicate-key surfacing),
//! prediction and forecast inserts, history queries, and the cache-mirror
//! collection.

use std::error::Error as StdError;

use common::{
    CacheMirrorRow, Error, ForecastResult, NewForecast, NewPrediction, PredictionResult, Result,
    UserRow,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

const REST_PREFIX: &str = "/rest/v1";

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

/// Error body shape returned by the store on failed writes.
#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Async REST client for the durable store.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StorageClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("failed to build storage HTTP client");

        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, table)
    }

    fn get(&self, table: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.get(self.url(table)))
    }

    fn post(&self, table: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.post(self.url(table)))
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map a non-2xx response to a `Persistence` error, surfacing the
    /// store's SQLSTATE code when the body carries one.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(resp);
        }

        let raw = resp.text().await.unwrap_or_default();
        let parsed: Option<StoreErrorBody> = serde_json::from_str(&raw).ok();
        let (code, message) = match parsed {
            Some(body) => (body.code, body.message.unwrap_or_else(|| raw.clone())),
            None => (None, raw),
        };
        Err(Error::Persistence {
            code,
            message: format!("store returned {}: {}", status, message),
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let resp = Self::check(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))
    }

    /// First row of an insert-with-representation response.
    fn first_row<T>(rows: Vec<T>, table: &str) -> Result<T> {
        rows.into_iter().next().ok_or_else(|| Error::Persistence {
            code: None,
            message: format!("insert into {} returned no representation", table),
        })
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let filter = format!("eq.{}", email);
        let resp = self
            .get("users")
            .query(&[("select", "*"), ("email", filter.as_str())])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let rows: Vec<UserRow> = Self::decode(resp).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a user row. A unique-constraint violation surfaces as
    /// `Persistence { code: Some("23505"), .. }` for the caller to recover.
    pub async fn create_user(&self, auth_user_id: &str, email: &str) -> Result<UserRow> {
        let resp = self
            .post("users")
            .header("Prefer", "return=representation")
            .json(&serde_json::json!([{
                "auth_user_id": auth_user_id,
                "email": email,
            }]))
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let rows: Vec<UserRow> = Self::decode(resp).await?;
        let row = Self::first_row(rows, "users")?;
        debug!("created user row {} for {}", row.id, email);
        Ok(row)
    }

    // ── Predictions ───────────────────────────────────────────────────

    pub async fn insert_prediction(&self, row: &NewPrediction) -> Result<PredictionResult> {
        let resp = self
            .post("predictions")
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let rows: Vec<PredictionResult> = Self::decode(resp).await?;
        Self::first_row(rows, "predictions")
    }

    /// All predictions for a user, newest first.
    pub async fn list_predictions(&self, user_id: Uuid) -> Result<Vec<PredictionResult>> {
        let filter = format!("eq.{}", user_id);
        let resp = self
            .get("predictions")
            .query(&[
                ("select", "*"),
                ("user_id", filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        Self::decode(resp).await
    }

    // ── Forecasts ─────────────────────────────────────────────────────

    pub async fn insert_forecast(&self, row: &NewForecast) -> Result<ForecastResult> {
        let resp = self
            .post("forecasts")
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let rows: Vec<ForecastResult> = Self::decode(resp).await?;
        Self::first_row(rows, "forecasts")
    }

    // ── Cache mirror ──────────────────────────────────────────────────

    pub async fn load_cache_rows(&self, user_id: &str) -> Result<Vec<CacheMirrorRow>> {
        let filter = format!("eq.{}", user_id);
        let resp = self
            .get("prediction_cache")
            .query(&[("select", "*"), ("user_id", filter.as_str())])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        Self::decode(resp).await
    }

    /// Upsert one cache row on its key.
    pub async fn store_cache_row(&self, row: &CacheMirrorRow) -> Result<()> {
        let resp = self
            .post("prediction_cache")
            .query(&[("on_conflict", "cache_key")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        Self::check(resp).await?;
        Ok(())
    }
}
