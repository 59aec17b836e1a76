//! Bounded pool of reusable zlib encoders.
//!
//! Packing a token needs a zlib encoder whose internal state is a few hundred
//! kilobytes. Under concurrent issuance the encoders are checked out from
//! this pool instead of being allocated per call. A checked-out encoder is
//! owned exclusively by one [`PooledCompressor`] and goes back to the pool
//! when the guard drops, whether or not the pack succeeded.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Bounded free list of zlib encoders sharing one compression level.
pub struct CompressorPool {
    level: Compression,
    capacity: usize,
    idle: Mutex<Vec<ZlibEncoder<Vec<u8>>>>,
}

impl CompressorPool {
    /// Create an empty pool.
    ///
    /// `level` is clamped to 9. At most `capacity` idle encoders are kept;
    /// extra encoders returned to a full pool are dropped.
    pub fn new(level: u32, capacity: usize) -> Self {
        Self {
            level: Compression::new(level.min(9)),
            capacity: capacity.max(1),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Compression level used by every encoder in the pool.
    pub fn level(&self) -> u32 {
        self.level.level()
    }

    /// Maximum number of idle encoders kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of encoders currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Check out an encoder, creating one if none is idle.
    pub fn checkout(&self) -> PooledCompressor<'_> {
        let encoder = self.idle.lock().pop();
        PooledCompressor {
            pool: self,
            encoder,
        }
    }

    fn new_encoder(&self) -> ZlibEncoder<Vec<u8>> {
        ZlibEncoder::new(Vec::new(), self.level)
    }

    fn put_back(&self, encoder: ZlibEncoder<Vec<u8>>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(encoder);
        }
    }
}

impl std::fmt::Debug for CompressorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressorPool")
            .field("level", &self.level.level())
            .field("capacity", &self.capacity)
            .field("idle", &self.idle_count())
            .finish()
    }
}

/// Scoped checkout of one encoder; returns it to the pool on drop.
pub struct PooledCompressor<'a> {
    pool: &'a CompressorPool,
    encoder: Option<ZlibEncoder<Vec<u8>>>,
}

impl PooledCompressor<'_> {
    /// Compress `input` into a complete zlib stream.
    pub fn compress(&mut self, input: &[u8]) -> io::Result<Vec<u8>> {
        let pool = self.pool;
        let encoder = self.encoder.get_or_insert_with(|| pool.new_encoder());

        // Discard output left behind by an interrupted earlier use.
        if encoder.total_in() != 0 || !encoder.get_ref().is_empty() {
            encoder.reset(Vec::new())?;
        }

        encoder.write_all(input)?;
        // reset() finishes the stream and hands back the filled buffer,
        // leaving the encoder clean for the next checkout.
        encoder.reset(Vec::new())
    }
}

impl Drop for PooledCompressor<'_> {
    fn drop(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.pool.put_back(encoder);
        }
    }
}
