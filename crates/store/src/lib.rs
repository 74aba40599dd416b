//! Prediction store.
//!
//! The client-side orchestration core: TTL cache with fuzzy lookup,
//! prediction backends, and the request flow that ties them to the durable
//! store.

pub mod backend;
pub mod cache;
pub mod engine;
pub mod persist;

pub use backend::{LocalBackend, PredictionBackend, RemoteBackend};
pub use cache::{fingerprint, CacheMirror, MemoryCache, PredictionCache};
pub use engine::EnergyStore;
pub use persist::DurableStore;
