//! The per-family decoding seam.
//!
//! A [`DeviceDecoder`] is a mapping from one validated [`Frame`] to the channel
//! values it carries. Decoders own whatever state they need to detect changes
//! across frames; nothing is shared between instances.

use poolbus_frame::Frame;

use crate::address::DeviceFamily;
use crate::chem::ChemControllerDecoder;
use crate::chlorinator::ChlorineGeneratorDecoder;
use crate::controller::ControllerDecoder;
use crate::error::DecodeError;
use crate::pump::PumpDecoder;
use crate::value::{ChannelSpec, ChannelValue};

pub trait DeviceDecoder: Send {
    /// Family whose payload layout this decoder understands.
    fn family(&self) -> DeviceFamily;

    /// Decode one frame routed to this device.
    ///
    /// Commands the decoder does not interpret yield an empty set, not an
    /// error. `DecodeError` is reserved for payloads whose shape contradicts
    /// their command.
    fn decode(&mut self, frame: &Frame) -> Result<Vec<ChannelValue>, DecodeError>;

    /// Whether a successful decode of `command` is evidence the device is online.
    fn confirms_online(&self, command: u8) -> bool {
        let _ = command;
        true
    }

    /// Every channel this decoder can emit.
    fn channel_schema(&self) -> Vec<ChannelSpec>;
}

/// Fresh decoder for `family`.
pub fn new_decoder(family: DeviceFamily) -> Box<dyn DeviceDecoder> {
    match family {
        DeviceFamily::Controller => Box::new(ControllerDecoder::new()),
        DeviceFamily::Pump => Box::new(PumpDecoder::new()),
        DeviceFamily::ChemController => Box::new(ChemControllerDecoder::new()),
        DeviceFamily::ChlorineGenerator => Box::new(ChlorineGeneratorDecoder::new()),
    }
}
