//! Device routing and payload decoding for pool-equipment bus frames.
//!
//! A [`DeviceRouter`] maps each validated [`poolbus_frame::Frame`] to at most one
//! registered device, runs that device's [`DeviceDecoder`], tracks its
//! [`Liveness`] and hands the resulting [`ChannelValue`]s to a [`ChannelSink`].
//!
//! Frames for devices nobody registered are expected on a shared bus and are
//! dropped quietly.

pub mod address;
pub mod chem;
pub mod chlorinator;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod fields;
pub mod liveness;
pub mod pump;
pub mod router;
pub mod sink;
pub mod value;

pub use address::{DeviceAddress, DeviceFamily, BROADCAST, BUS_MASTER};
pub use chem::ChemControllerDecoder;
pub use chlorinator::ChlorineGeneratorDecoder;
pub use config::RouterConfig;
pub use controller::ControllerDecoder;
pub use decoder::{new_decoder, DeviceDecoder};
pub use error::{DecodeError, ParseAddressError, Result, RouterError};
pub use liveness::{Liveness, LivenessStatus, LivenessTransition};
pub use pump::PumpDecoder;
pub use router::{DeviceRouter, RoutingOutcome};
pub use sink::{ChannelSink, CollectingSink, SinkEvent};
pub use value::{ChannelSpec, ChannelValue, ScaledValue, TemperatureUnit, ValueKind};
