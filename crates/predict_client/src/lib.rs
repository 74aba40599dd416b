//! Prediction endpoint client.
//!
//! Wraps the external `/predict` call with a fixed timeout and a constant
//! retry delay.

pub mod client;
pub mod retry;

pub use client::PredictClient;
pub use retry::RetryPolicy;
