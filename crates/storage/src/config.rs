//! Configuration for the sled storage driver.

use crate::MIB;

/// Settings for a sled-backed storage handle.
///
/// Hand one to the `"sled"` driver as its first argument; without it the
/// driver uses [`SledConfig::default`].
#[derive(Debug, Clone)]
pub struct SledConfig {
    /// Page cache size in bytes.
    pub cache_capacity: u64,
    /// Background flush interval. `None` disables the flusher thread.
    pub flush_every_ms: Option<u64>,
    /// Keep everything in memory and remove it when the handle is dropped.
    /// No files and no version stamp are written.
    pub temporary: bool,
    /// Flush to disk after every atomic batch write.
    pub sync_on_write: bool,
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 64 * MIB,
            flush_every_ms: Some(500),
            temporary: false,
            sync_on_write: true,
        }
    }
}

impl SledConfig {
    /// In-memory configuration (for testing).
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            sync_on_write: false,
            ..Self::default()
        }
    }

    /// Set the page cache size (in bytes).
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set the background flush interval (in milliseconds).
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }

    /// Set whether batch writes are flushed before returning.
    pub fn sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}
