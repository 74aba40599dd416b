//! Prediction cache.
//!
//! An authoritative in-memory map with TTL and FIFO-by-age eviction, plus a
//! best-effort durable mirror. The two halves are separate so the eviction
//! and TTL logic is testable without any network dependency.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::clock::Clock;
use common::{CacheMirrorRow, PredictionRequest, PredictionResult, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Maximum relative count difference for two requests to be "similar".
pub const SIMILARITY_TOLERANCE: f64 = 0.20;

/// Canonical fingerprint of (user, request), used as the exact-match key.
pub fn fingerprint(user_id: &str, request: &PredictionRequest) -> String {
    let mut canonical = format!(
        "{}|{}|{}",
        user_id, request.start_date, request.end_date
    );
    for (kind, count) in &request.appliances {
        canonical.push_str(&format!("|{}={}", kind, count));
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn within_tolerance(a: u32, b: u32) -> bool {
    if a == b {
        return true;
    }
    let larger = a.max(b) as f64;
    (a as f64 - b as f64).abs() / larger <= SIMILARITY_TOLERANCE
}

/// Whether two requests are close enough to share a cached result: equal
/// day-count, identical appliance kind membership (counting kinds with
/// count > 0), and every count within 20% of the larger of the pair.
pub fn similar_requests(a: &PredictionRequest, b: &PredictionRequest) -> bool {
    match (a.days(), b.days()) {
        (Ok(d1), Ok(d2)) if d1 == d2 => {}
        _ => return false,
    }

    let a_kinds = a.appliances.iter().filter(|&(_, &count)| count > 0);
    let b_kinds = b.appliances.iter().filter(|&(_, &count)| count > 0);
    if a_kinds.clone().count() != b_kinds.clone().count() {
        return false;
    }

    a_kinds
        .zip(b_kinds)
        .all(|((ka, &ca), (kb, &cb))| ka == kb && within_tolerance(ca, cb))
}

/// A cached prediction with its originating request and lifetime bounds.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub result: PredictionResult,
    pub request: PredictionRequest,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn from_row(row: CacheMirrorRow) -> Self {
        Self {
            key: row.cache_key,
            result: row.result,
            request: row.request,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }

    fn to_row(&self, user_id: &str) -> CacheMirrorRow {
        CacheMirrorRow {
            cache_key: self.key.clone(),
            user_id: user_id.to_string(),
            result: self.result.clone(),
            request: self.request.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Authoritative in-memory cache.
///
/// Entries are scanned and evicted in insertion order, which matches
/// creation order because every insert lands at the back of the queue.
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys oldest-created first.
    order: VecDeque<String>,
    max_entries: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(max_entries: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
            ttl,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }

    /// Exact lookup. Expired entries are purged and treated as a miss.
    pub fn get(&mut self, key: &str) -> Option<PredictionResult> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if now <= entry.expires_at {
                return Some(entry.result.clone());
            }
            debug!("purging expired cache entry");
            self.remove(key);
        }
        None
    }

    /// Store a fresh entry stamped with the current time and the TTL.
    pub fn set(
        &mut self,
        key: &str,
        result: &PredictionResult,
        request: &PredictionRequest,
    ) -> CacheEntry {
        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.to_string(),
            result: result.clone(),
            request: request.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.insert(entry.clone());
        entry
    }

    /// Insert a pre-stamped entry (hydration path), evicting the oldest
    /// entry first when at capacity.
    pub fn insert(&mut self, entry: CacheEntry) {
        let key = entry.key.clone();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.order.front().cloned() {
                debug!("cache full ({} entries), evicting oldest", self.max_entries);
                self.remove(&oldest);
            }
        }
        if self.entries.insert(key.clone(), entry).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);
    }

    /// First non-expired entry with a similar request, in insertion order.
    pub fn find_similar(&mut self, request: &PredictionRequest) -> Option<PredictionResult> {
        let now = self.clock.now();
        let keys: Vec<String> = self.order.iter().cloned().collect();
        for key in keys {
            let Some(entry) = self.entries.get(&key) else {
                continue;
            };
            if now > entry.expires_at {
                self.remove(&key);
                continue;
            }
            if similar_requests(&entry.request, request) {
                return Some(entry.result.clone());
            }
        }
        None
    }
}

/// Durable mirror of the cache, keyed by (user, fingerprint).
#[async_trait]
pub trait CacheMirror: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Vec<CacheMirrorRow>>;
    async fn store(&self, row: &CacheMirrorRow) -> Result<()>;
}

/// TTL cache over the authoritative in-memory map, hydrated once per
/// process from the mirror and written through to it best-effort.
pub struct PredictionCache {
    memory: MemoryCache,
    mirror: Option<Arc<dyn CacheMirror>>,
    hydrated: bool,
}

impl PredictionCache {
    pub fn new(memory: MemoryCache, mirror: Option<Arc<dyn CacheMirror>>) -> Self {
        Self {
            memory,
            mirror,
            hydrated: false,
        }
    }

    /// Load the mirror's rows into memory on first access, dropping rows
    /// that already expired. Replayed in creation order so the scan order
    /// is reproducible across restarts.
    async fn ensure_hydrated(&mut self, user_id: &str) {
        if self.hydrated {
            return;
        }
        self.hydrated = true;

        let Some(mirror) = self.mirror.clone() else {
            return;
        };
        match mirror.load(user_id).await {
            Ok(mut rows) => {
                rows.sort_by_key(|row| row.created_at);
                let now = self.memory.now();
                let total = rows.len();
                let mut kept = 0usize;
                for row in rows {
                    if now > row.expires_at {
                        continue;
                    }
                    self.memory.insert(CacheEntry::from_row(row));
                    kept += 1;
                }
                debug!("hydrated {}/{} cache rows from the mirror", kept, total);
            }
            Err(e) => warn!("cache mirror hydration failed: {}", e),
        }
    }

    pub async fn get(&mut self, user_id: &str, key: &str) -> Option<PredictionResult> {
        self.ensure_hydrated(user_id).await;
        self.memory.get(key)
    }

    pub async fn find_similar(
        &mut self,
        user_id: &str,
        request: &PredictionRequest,
    ) -> Option<PredictionResult> {
        self.ensure_hydrated(user_id).await;
        self.memory.find_similar(request)
    }

    pub async fn set(
        &mut self,
        user_id: &str,
        key: &str,
        result: &PredictionResult,
        request: &PredictionRequest,
    ) {
        self.ensure_hydrated(user_id).await;
        let entry = self.memory.set(key, result, request);

        if let Some(mirror) = &self.mirror {
            // The in-memory map stays authoritative for this process; a
            // failed mirror write is logged, not fatal.
            if let Err(e) = mirror.store(&entry.to_row(user_id)).await {
                warn!("cache mirror write failed: {}", e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}
