//! Image caching and decoding.
//!
//! Image layers reference their bitmap either through an embedded `data:`
//! URL or through a key registered ahead of time (an uploaded file, say).
//! Anything else is unresolved and renders as a placeholder.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::color::Color;
use common::error::{StudioError, StudioResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decoded RGBA image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, non-premultiplied.
    pub data: Vec<u8>,
}

impl ImageData {
    /// Create from raw RGBA data. Returns `None` if the length is wrong.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Decode any format the image crate was built with.
    pub fn decode(bytes: &[u8]) -> StudioResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| StudioError::internal(format!("image decode failed: {}", e)))?;
        let rgba = img.to_rgba8();

        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
        })
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> StudioResult<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::internal("not a data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::internal("data URL has no payload"))?;
        if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
            return Err(StudioError::internal("only base64 data URLs are supported"));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| StudioError::internal(format!("invalid base64: {}", e)))?;
        Self::decode(&bytes)
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::TRANSPARENT;
        }

        let offset = (y as usize * self.width as usize + x as usize) * 4;
        Color::rgba(
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        )
    }

    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

struct CacheEntry {
    data: Arc<ImageData>,
    /// Logical clock value of the last access.
    last_access: u64,
    /// Registered sources cannot be decoded again, so they are never evicted.
    pinned: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    current_size: usize,
    clock: u64,
}

impl CacheState {
    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.current_size -= old.data.memory_size();
        }
    }

    fn store(&mut self, key: String, data: Arc<ImageData>, pinned: bool) {
        self.remove(&key);
        self.clock += 1;
        self.current_size += data.memory_size();
        let entry = CacheEntry {
            data,
            last_access: self.clock,
            pinned,
        };
        self.entries.insert(key, entry);
    }
}

/// Decoded images keyed by source reference.
///
/// Images registered with [`insert`](Self::insert) stay until replaced or
/// cleared. Images decoded from `data:` URLs are kept on a best-effort basis
/// and evicted least-recently-used first when the byte budget runs out; they
/// can always be decoded again from the reference itself.
pub struct ImageCache {
    state: RwLock<CacheState>,
    /// Maximum cache size in bytes.
    max_size: usize,
}

impl ImageCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_size,
        }
    }

    /// Cache with a 100MB budget.
    pub fn with_default_size() -> Self {
        Self::new(100 * 1024 * 1024)
    }

    pub fn get(&self, key: &str) -> Option<Arc<ImageData>> {
        let mut state = self.state.write();
        state.clock += 1;
        let now = state.clock;
        let entry = state.entries.get_mut(key)?;
        entry.last_access = now;
        Some(entry.data.clone())
    }

    /// Register an image under `key`. Registered images are never evicted.
    pub fn insert(&self, key: impl Into<String>, data: ImageData) -> Arc<ImageData> {
        let data = Arc::new(data);
        let mut state = self.state.write();
        state.store(key.into(), data.clone(), true);
        data
    }

    /// Cache a decoded `data:` image if it fits once unpinned entries have
    /// been evicted.
    fn insert_decoded(&self, key: &str, data: ImageData) -> Arc<ImageData> {
        let data = Arc::new(data);
        let size = data.memory_size();

        let mut state = self.state.write();
        while state.current_size + size > self.max_size {
            let oldest = state
                .entries
                .iter()
                .filter(|(_, e)| !e.pinned)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else { break };
            state.remove(&oldest);
            debug!(key = %oldest, "evicted decoded image");
        }

        if state.current_size + size <= self.max_size {
            state.store(key.to_string(), data.clone(), false);
        } else {
            debug!(bytes = size, "decoded image exceeds cache budget; not cached");
        }
        data
    }

    /// Decode an image file and register it under `key`.
    pub fn insert_file(&self, key: impl Into<String>, path: impl AsRef<Path>) -> StudioResult<Arc<ImageData>> {
        let bytes = std::fs::read(path.as_ref())?;
        let data = ImageData::decode(&bytes)?;
        Ok(self.insert(key, data))
    }

    /// Look up a reference, decoding and caching `data:` URLs on first use.
    pub fn resolve(&self, reference: &str) -> Option<Arc<ImageData>> {
        if let Some(data) = self.get(reference) {
            return Some(data);
        }
        if !reference.starts_with("data:") {
            return None;
        }

        match ImageData::from_data_url(reference) {
            Ok(data) => Some(self.insert_decoded(reference, data)),
            Err(e) => {
                warn!(error = %e, "undecodable embedded image");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.state.read().current_size
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.current_size = 0;
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::with_default_size()
    }
}
