//! Domain types shared across the predictor.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Appliance kind → unit count.
///
/// Kind names are open-ended; unknown kinds fall back to the default energy
/// factor. A `BTreeMap` keeps iteration order canonical for fingerprinting.
pub type ApplianceCounts = BTreeMap<String, u32>;

/// Sum of all appliance counts (0 for the empty map).
pub fn total_appliances(appliances: &ApplianceCounts) -> u32 {
    appliances.values().sum()
}

/// Calendar days covered by `[start, end)`.
///
/// Errors if the end date is not strictly after the start date.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> Result<i64, Error> {
    let days = (end - start).num_days();
    if days <= 0 {
        return Err(Error::InvalidRange(format!(
            "end date {} must be after start date {}",
            end, start
        )));
    }
    Ok(days)
}

/// A consumption prediction request as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub appliances: ApplianceCounts,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PredictionRequest {
    /// Calendar days covered by the request window.
    pub fn days(&self) -> Result<i64, Error> {
        span_days(self.start_date, self.end_date)
    }
}

/// A persisted consumption prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appliances: ApplianceCounts,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Total consumption over the window in kWh.
    pub consumption: f64,
    pub days: i64,
    pub total_appliances: u32,
    #[serde(default)]
    pub historical_values: Vec<f64>,
    #[serde(default)]
    pub time_series_predictions: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

/// Row payload for inserting a new prediction into the durable store.
#[derive(Debug, Clone, Serialize)]
pub struct NewPrediction {
    pub user_id: Uuid,
    pub appliances: ApplianceCounts,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub consumption: f64,
    pub days: i64,
    pub total_appliances: u32,
    pub historical_values: Vec<f64>,
    pub time_series_predictions: Vec<f64>,
}

/// Qualitative direction of a forecast relative to the prior prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increase,
    Decrease,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Increase => "increase",
            Trend::Decrease => "decrease",
            Trend::Stable => "stable",
        };
        f.write_str(label)
    }
}

/// A persisted next-period forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub id: Uuid,
    pub prediction_id: Uuid,
    pub user_id: Uuid,
    /// Projected consumption for the next period in kWh.
    pub consumption: f64,
    pub trend: Trend,
    pub percentage_change: f64,
    pub created_at: DateTime<Utc>,
}

/// Row payload for inserting a new forecast into the durable store.
#[derive(Debug, Clone, Serialize)]
pub struct NewForecast {
    pub user_id: Uuid,
    pub prediction_id: Uuid,
    pub consumption: f64,
    pub trend: Trend,
    pub percentage_change: f64,
}

/// Opaque authenticated-user handle from the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity-provider subject id.
    pub id: String,
    pub email: String,
}

/// A user row in the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    #[serde(default)]
    pub auth_user_id: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw figures produced for one request, either by the external prediction
/// endpoint or by the local model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFigures {
    pub consumption: f64,
    #[serde(default)]
    pub historical_values: Vec<f64>,
    #[serde(default)]
    pub time_series_predictions: Vec<f64>,
}

/// Durable mirror row for one cache entry, keyed by (user, fingerprint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMirrorRow {
    pub cache_key: String,
    pub user_id: String,
    pub result: PredictionResult,
    pub request: PredictionRequest,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_span_days_counts_calendar_days() {
        assert_eq!(span_days(date(2025, 1, 1), date(2025, 1, 8)).unwrap(), 7);
        assert_eq!(span_days(date(2025, 1, 1), date(2025, 1, 2)).unwrap(), 1);
    }

    #[test]
    fn test_span_days_rejects_non_positive_windows() {
        assert!(matches!(
            span_days(date(2025, 1, 8), date(2025, 1, 1)),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            span_days(date(2025, 1, 1), date(2025, 1, 1)),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_total_appliances_sums_counts() {
        let mut appliances = ApplianceCounts::new();
        appliances.insert("lightbulbs".into(), 8);
        appliances.insert("tvs".into(), 1);
        assert_eq!(total_appliances(&appliances), 9);
    }

    #[test]
    fn test_total_appliances_empty_map_is_zero() {
        assert_eq!(total_appliances(&ApplianceCounts::new()), 0);
    }

    #[test]
    fn test_request_dates_round_trip_as_iso_strings() {
        let request = PredictionRequest {
            appliances: ApplianceCounts::new(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 8),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["start_date"], "2025-01-01");
        assert_eq!(json["end_date"], "2025-01-08");
    }

    #[test]
    fn test_trend_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Trend::Increase).unwrap(), "increase");
        assert_eq!(serde_json::to_value(Trend::Stable).unwrap(), "stable");
    }
}
