//! Image fetching for rendered placeholders.
//!
//! Every pending load is fetched on its own task; completions funnel through a
//! channel into one owner task, the only place the loaded flags and the
//! outstanding count are written.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::builder::PendingImageLoad;
use crate::error::LoadError;
use crate::layout::ImageId;

/// Raw bytes of a fetched image. Decoding is left to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub url: Url,
    pub bytes: Bytes,
}

/// Fetches image data for a URL.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<ImageData, LoadError>;
}

/// Reads `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

#[async_trait]
impl ImageLoader for FileLoader {
    async fn load(&self, url: &Url) -> Result<ImageData, LoadError> {
        if url.scheme() != "file" {
            return Err(LoadError::UnsupportedScheme(url.scheme().to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|()| LoadError::Other(format!("{url} is not a local path")))?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| LoadError::Io {
            url: url.clone(),
            message: e.to_string(),
        })?;
        debug!(url = %url, len = bytes.len(), "read image");
        Ok(ImageData {
            url: url.clone(),
            bytes: Bytes::from(bytes),
        })
    }
}

/// Wraps a loader with a URL-keyed cache of successful loads.
pub struct CachedLoader<L> {
    inner: L,
    cache: Mutex<HashMap<Url, ImageData>>,
}

impl<L: ImageLoader> CachedLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<L: ImageLoader> ImageLoader for CachedLoader<L> {
    async fn load(&self, url: &Url) -> Result<ImageData, LoadError> {
        if let Some(hit) = self.cache.lock().await.get(url) {
            return Ok(hit.clone());
        }
        // Lock is not held across the fetch; two misses for one URL both load.
        let data = self.inner.load(url).await?;
        self.cache.lock().await.insert(url.clone(), data.clone());
        Ok(data)
    }
}

/// Identifies one render; completions from an older render are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

pub type ImageLoadedCallback = Arc<dyn Fn(ImageId, Option<&ImageData>) + Send + Sync>;
pub type ImagesLoadedCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct BridgeCallbacks {
    /// Called once per image, with `None` when the fetch failed
    pub on_image_loaded: Option<ImageLoadedCallback>,
    /// Called once, after the last image of a dispatch completes
    pub on_images_loaded: Option<ImagesLoadedCallback>,
}

struct Completion {
    slot: usize,
    result: Result<ImageData, LoadError>,
}

/// Connects rendered placeholders to an [`ImageLoader`].
#[derive(Clone)]
pub struct ImageBridge {
    loader: Arc<dyn ImageLoader>,
    generation: Arc<AtomicU64>,
}

impl ImageBridge {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self::with_generation(loader, Arc::new(AtomicU64::new(0)))
    }

    /// Bridge sharing a generation counter with other bridges, so invalidating
    /// any of them silences dispatches made through all of them.
    pub fn with_generation(loader: Arc<dyn ImageLoader>, generation: Arc<AtomicU64>) -> Self {
        Self { loader, generation }
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Start a new generation. Dispatches already in flight stop reporting.
    pub fn invalidate(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Fetch every unloaded record in `loads`.
    ///
    /// The returned task resolves to the records with their final `loaded`
    /// flags. If nothing is outstanding, `on_images_loaded` fires right away.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(
        &self,
        mut loads: Vec<PendingImageLoad>,
        callbacks: BridgeCallbacks,
    ) -> JoinHandle<Vec<PendingImageLoad>> {
        let generation = self.generation();
        let current = Arc::clone(&self.generation);
        let (tx, mut rx) = mpsc::unbounded_channel();

        for (slot, load) in loads.iter().enumerate().filter(|(_, load)| !load.loaded) {
            let loader = Arc::clone(&self.loader);
            let tx = tx.clone();
            let url = load.url.clone();
            tokio::spawn(async move {
                let result = loader.load(&url).await;
                // The owner is gone once its generation went stale.
                let _ = tx.send(Completion { slot, result });
            });
        }
        drop(tx);

        tokio::spawn(async move {
            let mut remaining = loads.iter().filter(|load| !load.loaded).count();
            debug!(generation = generation.0, remaining, "dispatched image loads");
            if remaining == 0 {
                if let Some(on_images_loaded) = &callbacks.on_images_loaded {
                    on_images_loaded();
                }
                return loads;
            }

            while let Some(Completion { slot, result }) = rx.recv().await {
                if Generation(current.load(Ordering::Acquire)) != generation {
                    debug!(generation = generation.0, "discarding stale image loads");
                    break;
                }
                let load = &mut loads[slot];
                if load.loaded {
                    continue;
                }
                load.loaded = true;
                remaining -= 1;

                let data = match result {
                    Ok(data) => Some(data),
                    Err(e) => {
                        warn!(url = %load.url, error = %e, "image failed to load");
                        None
                    }
                };
                if let Some(on_image_loaded) = &callbacks.on_image_loaded {
                    on_image_loaded(load.id, data.as_ref());
                }
                if remaining == 0 {
                    if let Some(on_images_loaded) = &callbacks.on_images_loaded {
                        on_images_loaded();
                    }
                    break;
                }
            }
            loads
        })
    }
}
