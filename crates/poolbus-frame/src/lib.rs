//! Frame extraction for the pool-equipment RS-485 bus.
//!
//! Two framing schemes share the wire:
//! - Standard frames: `A5 pp dd ss cc ll <payload> hi lo`, a 16-bit big-endian sum
//!   over everything before it.
//! - Compact frames: `10 02 dd cc <payload> ck [10 03]`, payload size fixed per
//!   command, an 8-bit sum over everything before it.
//!
//! The [`Resynchronizer`] owns the unconsumed tail of the byte stream. It never fails
//! on malformed input: anything that does not extract and validate is skipped one
//! byte at a time until a frame lines up again.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;

pub use checksum::{compact_checksum, standard_checksum, validate};
pub use codec::{
    compact_payload_len, extract_candidate, Frame, FrameScheme, RawCandidate, ResyncConfig,
    COMPACT_PREAMBLE, COMPACT_TRAILER, DEFAULT_MAX_STANDARD_PAYLOAD, STANDARD_HEADER_SIZE,
    STANDARD_MARKER,
};
pub use error::{ChecksumError, FrameError, Result};
pub use reader::{BusReader, BusStats, Resynchronizer};
