//! Prediction orchestrator — the client-side store.
//!
//! Request flow: validate → exact cache get → fuzzy lookup → backend on
//! miss → persist → write through to the cache → return. Cache hits
//! short-circuit with no external call and no persistence, and the cache is
//! only updated after persistence succeeded.

use std::sync::Arc;

use common::{
    total_appliances, AuthUser, Error, ForecastResult, NewForecast, NewPrediction,
    PredictionRequest, PredictionResult, Result, UserRow,
};
use energy_model::generate_forecast;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::backend::PredictionBackend;
use crate::cache::{fingerprint, PredictionCache};
use crate::persist::DurableStore;

/// Session state and collaborators for one user's prediction flow.
///
/// Runs as a single logical task: methods take `&mut self` and await their
/// collaborators sequentially, so no entry is ever observed half-updated.
/// Concurrent identical requests are not coalesced — two stores (or two
/// interleaved calls) with the same fingerprint can each miss and issue
/// duplicate external calls.
pub struct EnergyStore {
    cache: PredictionCache,
    backend: Arc<dyn PredictionBackend>,
    storage: Arc<dyn DurableStore>,
    rng: StdRng,
    prediction: Option<PredictionResult>,
    forecast: Option<ForecastResult>,
    history: Vec<PredictionResult>,
}

impl EnergyStore {
    pub fn new(
        cache: PredictionCache,
        backend: Arc<dyn PredictionBackend>,
        storage: Arc<dyn DurableStore>,
        rng: StdRng,
    ) -> Self {
        Self {
            cache,
            backend,
            storage,
            rng,
            prediction: None,
            forecast: None,
            history: Vec::new(),
        }
    }

    /// The most recent prediction returned by this store.
    pub fn latest_prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn latest_forecast(&self) -> Option<&ForecastResult> {
        self.forecast.as_ref()
    }

    pub fn history(&self) -> &[PredictionResult] {
        &self.history
    }

    /// Resolve a prediction for the request, consulting the cache first.
    pub async fn fetch_prediction(
        &mut self,
        user: &AuthUser,
        request: &PredictionRequest,
    ) -> Result<PredictionResult> {
        // Invalid ranges never reach a collaborator.
        let days = request.days()?;

        let key = fingerprint(&user.id, request);
        if let Some(hit) = self.cache.get(&user.id, &key).await {
            debug!("cache hit for fingerprint {}", &key[..8]);
            self.prediction = Some(hit.clone());
            return Ok(hit);
        }
        if let Some(hit) = self.cache.find_similar(&user.id, request).await {
            debug!("similar cached prediction reused");
            self.prediction = Some(hit.clone());
            return Ok(hit);
        }

        let figures = self.backend.predict(request).await?;

        let user_row = self.get_or_create_user(user).await?;
        let row = NewPrediction {
            user_id: user_row.id,
            appliances: request.appliances.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            consumption: figures.consumption,
            days,
            total_appliances: total_appliances(&request.appliances),
            historical_values: figures.historical_values,
            time_series_predictions: figures.time_series_predictions,
        };
        let saved = self.storage.insert_prediction(&row).await?;

        // Only a persisted result enters the cache.
        self.cache.set(&user.id, &key, &saved, request).await;

        info!(
            "prediction {}: {:.1} kWh over {} days ({} appliances)",
            saved.id, saved.consumption, saved.days, saved.total_appliances
        );
        self.prediction = Some(saved.clone());
        Ok(saved)
    }

    /// Project the next period from the latest prediction.
    pub async fn fetch_forecast(&mut self, user: &AuthUser) -> Result<ForecastResult> {
        let prior = self
            .prediction
            .clone()
            .ok_or_else(|| Error::Precondition("forecast requires a prior prediction".into()))?;

        let figures = generate_forecast(&prior, &mut self.rng);
        let user_row = self.get_or_create_user(user).await?;
        let row = NewForecast {
            user_id: user_row.id,
            prediction_id: prior.id,
            consumption: figures.consumption,
            trend: figures.trend,
            percentage_change: figures.percentage_change,
        };
        let saved = self.storage.insert_forecast(&row).await?;

        info!(
            "forecast {}: {:.1} kWh next period, {} ({:+.1}%)",
            saved.id, saved.consumption, saved.trend, saved.percentage_change
        );
        self.forecast = Some(saved.clone());
        Ok(saved)
    }

    /// All of the user's persisted predictions, newest first. A user with
    /// no durable identity row has no history.
    pub async fn fetch_prediction_history(
        &mut self,
        user: &AuthUser,
    ) -> Result<Vec<PredictionResult>> {
        let Some(user_row) = self.storage.get_user_by_email(&user.email).await? else {
            self.history.clear();
            return Ok(Vec::new());
        };

        let rows = self.storage.list_predictions(user_row.id).await?;
        debug!("loaded {} history rows", rows.len());
        self.history = rows.clone();
        Ok(rows)
    }

    /// Get or create the user's durable identity row. A duplicate-key race
    /// (another writer won) is recovered by re-reading the existing row.
    async fn get_or_create_user(&self, user: &AuthUser) -> Result<UserRow> {
        if let Some(row) = self.storage.get_user_by_email(&user.email).await? {
            return Ok(row);
        }

        match self.storage.create_user(&user.id, &user.email).await {
            Ok(row) => Ok(row),
            Err(e) if e.is_duplicate_key() => self
                .storage
                .get_user_by_email(&user.email)
                .await?
                .ok_or_else(|| Error::Persistence {
                    code: None,
                    message: "user row missing after duplicate-key recovery".into(),
                }),
            Err(e) => Err(e),
        }
    }
}
