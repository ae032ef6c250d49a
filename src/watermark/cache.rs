use super::image_processing::decode_file;
use super::metadata::{MetadataProvider, MetadataRecord};
use super::{ImageLoadError, MetadataError};
use ab_glyph::FontVec;
use image::{DynamicImage, RgbaImage};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Deterministic key for a path plus optional geometry parts.
pub fn cache_key(path: &Path, parts: &[u32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    for part in parts {
        hasher.update(b":");
        hasher.update(part.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

enum Entry<V, E> {
    Ready(Arc<V>),
    Failed(E),
}

/// Read-through memo table that keeps successes and failures for the life of
/// the process. The lock is never held while a value is computed, so two
/// callers racing on the same key may both compute; the later store wins.
pub struct MemoCache<V, E> {
    name: &'static str,
    entries: RwLock<HashMap<String, Entry<V, E>>>,
}

impl<V, E: Clone> MemoCache<V, E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<Result<Arc<V>, E>> {
        self.entries.read().get(key).map(|entry| match entry {
            Entry::Ready(value) => Ok(value.clone()),
            Entry::Failed(error) => Err(error.clone()),
        })
    }

    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.lookup(key) {
            trace!("{} cache hit: {}", self.name, key);
            return hit;
        }

        let entry = match compute() {
            Ok(value) => Entry::Ready(Arc::new(value)),
            Err(error) => Entry::Failed(error),
        };
        let result = match &entry {
            Entry::Ready(value) => Ok(value.clone()),
            Entry::Failed(error) => Err(error.clone()),
        };
        self.entries.write().insert(key.to_string(), entry);
        debug!(
            "{} cache stored {} entry: {}",
            self.name,
            if result.is_ok() { "ready" } else { "failed" },
            key
        );
        result
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| matches!(e, Entry::Failed(_)))
            .count()
    }
}

pub struct MetadataCache {
    provider: Arc<dyn MetadataProvider>,
    entries: MemoCache<MetadataRecord, MetadataError>,
}

impl MetadataCache {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            entries: MemoCache::new("metadata"),
        }
    }

    pub fn resolve(&self, path: &Path) -> Result<Arc<MetadataRecord>, MetadataError> {
        let key = cache_key(path, &[]);
        self.entries
            .get_or_compute(&key, || self.provider.extract(path))
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    pub fn entries(&self) -> &MemoCache<MetadataRecord, MetadataError> {
        &self.entries
    }
}

pub struct ImageCache {
    entries: MemoCache<DynamicImage, ImageLoadError>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            entries: MemoCache::new("image"),
        }
    }

    pub fn load(&self, path: &Path) -> Result<Arc<DynamicImage>, ImageLoadError> {
        let key = cache_key(path, &[]);
        self.entries.get_or_compute(&key, || decode_file(path))
    }

    pub fn entries(&self) -> &MemoCache<DynamicImage, ImageLoadError> {
        &self.entries
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Blank transparent canvases keyed by the asset they are generated for and
/// their size. Callers copy the shared buffer before drawing on it.
pub struct CanvasCache {
    entries: MemoCache<RgbaImage, Infallible>,
}

impl CanvasCache {
    pub fn new() -> Self {
        Self {
            entries: MemoCache::new("canvas"),
        }
    }

    pub fn blank(&self, path: &Path, width: u32, height: u32) -> Arc<RgbaImage> {
        let key = cache_key(path, &[width, height]);
        let Ok(canvas) = self
            .entries
            .get_or_compute(&key, || Ok(RgbaImage::new(width, height)));
        canvas
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CanvasCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed font files. The error is kept as text so failed loads can be cached.
pub struct FontCache {
    entries: MemoCache<FontVec, String>,
}

impl FontCache {
    pub fn new() -> Self {
        Self {
            entries: MemoCache::new("font"),
        }
    }

    pub fn load(&self, path: &Path) -> Result<Arc<FontVec>, String> {
        let key = cache_key(path, &[]);
        self.entries.get_or_compute(&key, || {
            let data = std::fs::read(path).map_err(|e| e.to_string())?;
            FontVec::try_from_vec(data).map_err(|_| "failed to parse font".to_string())
        })
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Every cache the compositor reads through. Built once and shared.
pub struct CacheService {
    pub metadata: MetadataCache,
    pub images: ImageCache,
    pub canvases: CanvasCache,
    pub fonts: FontCache,
}

impl CacheService {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        info!("Initializing caches with {} metadata provider", provider.name());
        Self {
            metadata: MetadataCache::new(provider),
            images: ImageCache::new(),
            canvases: CanvasCache::new(),
            fonts: FontCache::new(),
        }
    }
}
