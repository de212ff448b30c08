use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::checksum::validate;
use crate::codec::{extract_candidate, Frame, FrameScheme, ResyncConfig, COMPACT_TRAILER};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Running counters kept by a [`Resynchronizer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Frames that extracted and validated.
    pub frames: u64,
    /// Bytes dropped while scanning for the next frame.
    pub discarded_bytes: u64,
    /// Candidates rejected by the checksum validator.
    pub checksum_failures: u64,
    /// Marker matches that could not be a frame (bad length, unknown command,
    /// truncated by end of input).
    pub implausible: u64,
}

/// Rolling buffer over the unbounded bus byte stream.
///
/// Feed it arbitrary chunks with [`feed`](Self::feed) and drain frames with
/// [`next_frame`](Self::next_frame). Chunk boundaries need not line up with frame
/// boundaries. Malformed input is never an error: the cursor drops one byte and
/// scans again, so every corrupted run costs at most its own length.
#[derive(Debug)]
pub struct Resynchronizer {
    buf: BytesMut,
    config: ResyncConfig,
    stats: BusStats,
}

impl Resynchronizer {
    /// Create a resynchronizer with default configuration.
    pub fn new() -> Self {
        Self::with_config(ResyncConfig::default())
    }

    /// Create a resynchronizer with explicit configuration.
    pub fn with_config(config: ResyncConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.initial_capacity),
            config,
            stats: BusStats::default(),
        }
    }

    /// Append bytes received from the bus.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract the next validated frame, if the buffer holds one.
    ///
    /// `None` means "wait for more input", never failure.
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.extract(false)
    }

    /// Extract the next validated frame once the byte source is exhausted.
    ///
    /// A marker still waiting for bytes can never complete, so it is skipped like
    /// any other implausible match and the scan moves on. Call repeatedly until
    /// `None` to drain every frame left in the buffer.
    pub fn finish(&mut self) -> Option<Frame> {
        self.extract(true)
    }

    fn extract(&mut self, at_end: bool) -> Option<Frame> {
        loop {
            self.skip_to_marker();
            if self.buf.is_empty() {
                return None;
            }

            let candidate = match extract_candidate(&self.buf, &self.config) {
                Ok(Some(candidate)) => candidate,
                Ok(None) if !at_end => return None,
                Ok(None) => {
                    self.reject(FrameError::Truncated {
                        buffered: self.buf.len(),
                    });
                    continue;
                }
                Err(FrameError::NoPreamble(_)) => {
                    self.discard(1);
                    continue;
                }
                Err(err) => {
                    self.reject(err);
                    continue;
                }
            };

            match validate(&candidate) {
                Ok(frame) => {
                    self.buf.advance(candidate.wire_size());
                    if frame.scheme() == FrameScheme::Compact
                        && self.buf.starts_with(&COMPACT_TRAILER)
                    {
                        self.buf.advance(COMPACT_TRAILER.len());
                    }
                    self.stats.frames = self.stats.frames.saturating_add(1);
                    trace!(
                        scheme = ?frame.scheme(),
                        command = frame.command(),
                        size = candidate.wire_size(),
                        "frame extracted"
                    );
                    return Some(frame);
                }
                Err(err) => self.reject(err.into()),
            }
        }
    }

    /// Number of unconsumed bytes in the buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Current configuration.
    pub fn config(&self) -> &ResyncConfig {
        &self.config
    }

    fn skip_to_marker(&mut self) {
        let skip = self
            .buf
            .iter()
            .position(|b| FrameScheme::is_marker_start(*b))
            .unwrap_or(self.buf.len());
        if skip > 0 {
            trace!(skipped = skip, "skipping bytes before frame marker");
            self.discard(skip);
        }
    }

    /// Drop the byte at the cursor after a marker match that did not hold up.
    fn reject(&mut self, err: FrameError) {
        match err {
            FrameError::Checksum(_) => {
                debug!(error = %err, "dropping candidate that failed checksum");
                self.stats.checksum_failures = self.stats.checksum_failures.saturating_add(1);
            }
            _ => {
                trace!(error = %err, "implausible frame at cursor");
                self.stats.implausible = self.stats.implausible.saturating_add(1);
            }
        }
        self.discard(1);
    }

    fn discard(&mut self, count: usize) {
        self.buf.advance(count);
        self.stats.discarded_bytes = self.stats.discarded_bytes.saturating_add(count as u64);
    }
}

impl Default for Resynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads validated frames from any `Read` byte source.
///
/// Handles partial reads and resynchronization internally; callers always get
/// complete, checksum-verified frames.
pub struct BusReader<T> {
    inner: T,
    resync: Resynchronizer,
}

impl<T: Read> BusReader<T> {
    /// Create a bus reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ResyncConfig::default())
    }

    /// Create a bus reader with explicit configuration.
    pub fn with_config(inner: T, config: ResyncConfig) -> Self {
        Self {
            inner,
            resync: Resynchronizer::with_config(config),
        }
    }

    /// Read the next validated frame (blocking).
    ///
    /// At EOF the frames still buffered are drained first; after that it returns
    /// `Err(FrameError::ConnectionClosed)`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.resync.next_frame() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return self.resync.finish().ok_or(FrameError::ConnectionClosed);
            }

            self.resync.feed(&chunk[..read]);
        }
    }

    /// Counters from the underlying resynchronizer.
    pub fn stats(&self) -> BusStats {
        self.resync.stats()
    }

    /// Borrow the underlying byte source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying byte source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner byte source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
