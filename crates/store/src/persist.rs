//! Durable-store capability used by the orchestrator.
//!
//! The REST storage client implements both seams; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use common::{
    CacheMirrorRow, ForecastResult, NewForecast, NewPrediction, PredictionResult, Result, UserRow,
};
use storage_client::StorageClient;
use uuid::Uuid;

use crate::cache::CacheMirror;

/// Insert/query surface of the external relational store.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>>;
    async fn create_user(&self, auth_user_id: &str, email: &str) -> Result<UserRow>;
    async fn insert_prediction(&self, row: &NewPrediction) -> Result<PredictionResult>;
    async fn list_predictions(&self, user_id: Uuid) -> Result<Vec<PredictionResult>>;
    async fn insert_forecast(&self, row: &NewForecast) -> Result<ForecastResult>;
}

#[async_trait]
impl DurableStore for StorageClient {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        StorageClient::get_user_by_email(self, email).await
    }

    async fn create_user(&self, auth_user_id: &str, email: &str) -> Result<UserRow> {
        StorageClient::create_user(self, auth_user_id, email).await
    }

    async fn insert_prediction(&self, row: &NewPrediction) -> Result<PredictionResult> {
        StorageClient::insert_prediction(self, row).await
    }

    async fn list_predictions(&self, user_id: Uuid) -> Result<Vec<PredictionResult>> {
        StorageClient::list_predictions(self, user_id).await
    }

    async fn insert_forecast(&self, row: &NewForecast) -> Result<ForecastResult> {
        StorageClient::insert_forecast(self, row).await
    }
}

#[async_trait]
impl CacheMirror for StorageClient {
    async fn load(&self, user_id: &str) -> Result<Vec<CacheMirrorRow>> {
        self.load_cache_rows(user_id).await
    }

    async fn store(&self, row: &CacheMirrorRow) -> Result<()> {
        self.store_cache_row(row).await
    }
}
