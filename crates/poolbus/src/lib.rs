//! Protocol stack for the shared RS-485 bus used by pool equipment.
//!
//! Turns the raw byte stream from the bus into typed, per-device channel updates
//! for controllers, variable-speed pumps, chemistry controllers and chlorine
//! generators.
//!
//! # Crate Structure
//!
//! - [`frame`]: Resynchronization, Standard/Compact framing and checksum validation
//! - [`device`]: Device registry, liveness tracking and per-family payload decoders
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use poolbus::device::{CollectingSink, DeviceAddress, DeviceFamily, DeviceRouter};
//! use poolbus::frame::Resynchronizer;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let router = DeviceRouter::new(sink.clone());
//! router
//!     .register_family(DeviceAddress::new(DeviceFamily::ChlorineGenerator, 0x50))
//!     .unwrap();
//!
//! let mut resync = Resynchronizer::new();
//! resync.feed(&[0x10, 0x02, 0x50, 0x11, 0x50, 0xC3, 0x10, 0x03]);
//! while let Some(frame) = resync.next_frame() {
//!     router.dispatch(&frame);
//! }
//! // Online transition, then the salt output value.
//! assert_eq!(sink.len(), 2);
//! ```

/// Re-export frame types.
pub mod frame {
    pub use poolbus_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use poolbus_device::*;
}
