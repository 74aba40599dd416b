//! Synthetic energy consumption model.
//!
//! Estimates consumption from appliance counts and a date window, generates
//! per-day series, and projects next-period forecasts. All randomness is
//! injected so callers can seed it.

pub mod estimate;
pub mod factors;
pub mod forecast;
pub mod series;

pub use estimate::{daily_consumption, estimate, seasonal_factor};
pub use factors::{daily_factor, DEFAULT_FACTOR};
pub use forecast::{classify_trend, generate_forecast, ForecastFigures};
pub use series::{synthesize, WEEKLY_PATTERN};
