//! Prediction backends.
//!
//! A cache miss is filled either by the external prediction endpoint or,
//! in offline mode, by the local synthetic model.

use std::sync::Mutex;

use async_trait::async_trait;
use common::{PredictionFigures, PredictionRequest, Result};
use predict_client::PredictClient;
use rand::rngs::StdRng;

/// Source of raw prediction figures for a cache miss.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionFigures>;
}

/// Delegates to the external prediction endpoint. The retry policy lives
/// inside the client.
pub struct RemoteBackend {
    client: PredictClient,
}

impl RemoteBackend {
    pub fn new(client: PredictClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PredictionBackend for RemoteBackend {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionFigures> {
        self.client.predict(request).await
    }
}

/// Computes the figures locally with the synthetic model.
///
/// Produces the forecast series only; historical values come from the
/// endpoint and stay empty on this path.
pub struct LocalBackend {
    rng: Mutex<StdRng>,
}

impl LocalBackend {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PredictionBackend for LocalBackend {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionFigures> {
        let mut rng = self.rng.lock().expect("rng mutex poisoned");
        let days = request.days()?;
        let consumption = energy_model::estimate(request, &mut *rng)?;
        let daily = consumption / days as f64;
        let predictions = energy_model::synthesize(daily, days, request.start_date, &mut *rng);

        Ok(PredictionFigures {
            consumption,
            historical_values: Vec::new(),
            time_series_predictions: predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{ApplianceCounts, Error};
    use energy_model::seasonal_factor;
    use rand::SeedableRng;

    fn sample_request() -> PredictionRequest {
        let mut appliances = ApplianceCounts::new();
        appliances.insert("lightbulbs".into(), 8);
        appliances.insert("tvs".into(), 1);
        PredictionRequest {
            appliances,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_local_backend_produces_one_value_per_day() {
        let backend = LocalBackend::new(StdRng::seed_from_u64(1));
        let figures = backend.predict(&sample_request()).await.unwrap();
        assert_eq!(figures.time_series_predictions.len(), 7);
        assert!(figures.historical_values.is_empty());
    }

    #[tokio::test]
    async fn test_local_backend_stays_in_the_model_envelope() {
        // daily = 0.3*8 + 2.5 = 4.9 kWh; base over 7 days = 34.3 kWh.
        let base = 4.9 * 7.0 * seasonal_factor(1);
        let backend = LocalBackend::new(StdRng::seed_from_u64(2));
        let figures = backend.predict(&sample_request()).await.unwrap();
        assert!(figures.consumption >= base * 0.85 - 1e-9);
        assert!(figures.consumption <= base * 1.15 + 1e-9);
    }

    #[tokio::test]
    async fn test_local_backend_rejects_invalid_ranges() {
        let mut request = sample_request();
        request.end_date = request.start_date;
        let backend = LocalBackend::new(StdRng::seed_from_u64(3));
        assert!(matches!(
            backend.predict(&request).await,
            Err(Error::InvalidRange(_))
        ));
    }
}
