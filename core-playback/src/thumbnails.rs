//! # Thumbnail Cache
//!
//! Scrub previews keyed by quantized position.
//!
//! Concurrent requests for the same key share one native generation. A
//! finished generation is committed only while its key is still the most
//! recently requested one; anything else is a late result from fast
//! scrubbing and is dropped so it can never replace a newer preview.

use crate::backend::PlayerBackend;
use crate::error::{PlaybackError, Result};
use crate::types::{Thumbnail, ThumbnailKey};
use bridge_traits::NativeImage;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

type Generation = Shared<BoxFuture<'static, std::result::Result<NativeImage, String>>>;

struct CacheInner {
    entries: LruCache<ThumbnailKey, Thumbnail>,
    inflight: HashMap<ThumbnailKey, Generation>,
    latest: Option<ThumbnailKey>,
    /// Bumped by `clear`; results from an older epoch are discarded.
    epoch: u64,
    current: Option<Thumbnail>,
}

#[derive(Clone)]
pub struct ThumbnailCache {
    quantum: Duration,
    inner: Arc<Mutex<CacheInner>>,
}

impl ThumbnailCache {
    pub fn new(quantum: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            quantum,
            inner: Arc::new(Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                inflight: HashMap::new(),
                latest: None,
                epoch: 0,
                current: None,
            })),
        }
    }

    pub fn key_for(&self, time: Duration) -> ThumbnailKey {
        ThumbnailKey::from_time(time, self.quantum)
    }

    /// Preview for `at`, generated by `backend` on a miss.
    ///
    /// `Ok(None)` means the result arrived after a newer request and was
    /// discarded.
    pub async fn request(
        &self,
        backend: Arc<dyn PlayerBackend>,
        at: Duration,
    ) -> Result<Option<Thumbnail>> {
        self.request_with(at, move |time| async move {
            backend.generate_thumbnail(time).await
        })
        .await
    }

    /// Same as [`request`](Self::request) with an arbitrary generator.
    pub async fn request_with<F, Fut>(&self, at: Duration, generate: F) -> Result<Option<Thumbnail>>
    where
        F: FnOnce(Duration) -> Fut,
        Fut: Future<Output = Result<NativeImage>> + Send + 'static,
    {
        let key = self.key_for(at);
        let time = key.time(self.quantum);

        let (epoch, generation) = {
            let mut inner = self.inner.lock();
            inner.latest = Some(key);

            if let Some(hit) = inner.entries.get(&key).cloned() {
                trace!(key = key.0, "Thumbnail cache hit");
                inner.current = Some(hit.clone());
                return Ok(Some(hit));
            }

            let generation = match inner.inflight.get(&key) {
                Some(shared) => shared.clone(),
                None => {
                    let future = generate(time);
                    let shared = async move { future.await.map_err(|e| e.to_string()) }
                        .boxed()
                        .shared();
                    inner.inflight.insert(key, shared.clone());
                    shared
                }
            };
            (inner.epoch, generation)
        };

        let result = generation.await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(key = key.0, "Thumbnail finished after cache was cleared");
            return Ok(None);
        }
        inner.inflight.remove(&key);

        if inner.latest != Some(key) {
            debug!(key = key.0, "Discarding stale thumbnail");
            return Ok(None);
        }

        match result {
            Ok(image) => {
                let thumbnail = Thumbnail { key, time, image };
                inner.entries.put(key, thumbnail.clone());
                inner.current = Some(thumbnail.clone());
                Ok(Some(thumbnail))
            }
            Err(reason) => Err(PlaybackError::ThumbnailUnavailable(reason)),
        }
    }

    pub fn get(&self, key: ThumbnailKey) -> Option<Thumbnail> {
        self.inner.lock().entries.peek(&key).cloned()
    }

    /// The preview that should be on screen right now.
    pub fn current(&self) -> Option<Thumbnail> {
        self.inner.lock().current.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything, including generations still running.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.inflight.clear();
        inner.latest = None;
        inner.current = None;
        inner.epoch += 1;
    }
}
