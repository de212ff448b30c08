//! Chlorine generator (IntelliChlor class) payload decoding.
//!
//! The generator speaks the Compact framing. Frames addressed to it carry
//! controller requests (probe, salt output set point, name request); frames
//! addressed to the bus master are its replies.

use poolbus_frame::Frame;
use tracing::debug;

use crate::address::DeviceFamily;
use crate::decoder::DeviceDecoder;
use crate::error::DecodeError;
use crate::fields::{ascii_name, decode_flags, expect_len, known_bits, FlagSpec};
use crate::value::{ChannelSpec, ChannelValue, ScaledValue, ValueKind};

const CMD_PROBE: u8 = 0x00;
const CMD_PROBE_REPLY: u8 = 0x01;
const CMD_VERSION: u8 = 0x03;
const CMD_SALT_OUTPUT: u8 = 0x11;
const CMD_STATUS: u8 = 0x12;
const CMD_NAME_REQUEST: u8 = 0x14;
const CMD_SALT_OUTPUT_ALT: u8 = 0x15;

const VERSION_LEN: usize = 17;
const STATUS_LEN: usize = 2;

/// Salinity is reported in units of 50 ppm.
const SALINITY_STEP_PPM: f64 = 50.0;

const STATUS_FLAGS: [FlagSpec; 8] = [
    FlagSpec::bit(1, 0, "chlorinator#lowflow"),
    FlagSpec::bit(1, 1, "chlorinator#lowsalt"),
    FlagSpec::bit(1, 2, "chlorinator#verylowsalt"),
    FlagSpec::bit(1, 3, "chlorinator#highcurrent"),
    FlagSpec::bit(1, 4, "chlorinator#cleancell"),
    FlagSpec::bit(1, 5, "chlorinator#lowvoltage"),
    FlagSpec::bit(1, 6, "chlorinator#lowwatertemp"),
    FlagSpec::bit(1, 7, "chlorinator#commerror"),
];

#[derive(Debug, Default)]
pub struct ChlorineGeneratorDecoder;

impl ChlorineGeneratorDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn decode_status(payload: &[u8]) -> Vec<ChannelValue> {
    let status = payload[1] & known_bits(&STATUS_FLAGS, 1);
    let mut out = vec![
        ChannelValue::new(
            "chlorinator#salinity",
            ScaledValue::Number(f64::from(payload[0]) * SALINITY_STEP_PPM),
        ),
        ChannelValue::new("chlorinator#status", ScaledValue::BitFlags(u32::from(status))),
    ];
    decode_flags(payload, &STATUS_FLAGS, &mut out);
    out
}

fn decode_version(payload: &[u8]) -> Vec<ChannelValue> {
    vec![
        ChannelValue::new(
            "chlorinator#version",
            ScaledValue::Number(f64::from(payload[0])),
        ),
        ChannelValue::new(
            "chlorinator#name",
            ScaledValue::Text(ascii_name(&payload[1..])),
        ),
    ]
}

impl DeviceDecoder for ChlorineGeneratorDecoder {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::ChlorineGenerator
    }

    fn decode(&mut self, frame: &Frame) -> Result<Vec<ChannelValue>, DecodeError> {
        let command = frame.command();
        let payload = frame.payload().as_ref();

        match command {
            CMD_SALT_OUTPUT | CMD_SALT_OUTPUT_ALT => {
                expect_len(command, payload, 1)?;
                Ok(vec![ChannelValue::new(
                    "chlorinator#saltoutput",
                    ScaledValue::Percent(f64::from(payload[0])),
                )])
            }
            CMD_STATUS => {
                expect_len(command, payload, STATUS_LEN)?;
                Ok(decode_status(payload))
            }
            CMD_VERSION => {
                expect_len(command, payload, VERSION_LEN)?;
                Ok(decode_version(payload))
            }
            CMD_PROBE | CMD_PROBE_REPLY | CMD_NAME_REQUEST => Ok(Vec::new()),
            other => {
                debug!(command = other, "chlorinator command not interpreted");
                Ok(Vec::new())
            }
        }
    }

    fn channel_schema(&self) -> Vec<ChannelSpec> {
        let mut schema = vec![
            ChannelSpec::new("chlorinator#saltoutput", ValueKind::Percent),
            ChannelSpec::new("chlorinator#salinity", ValueKind::Number),
            ChannelSpec::new("chlorinator#status", ValueKind::BitFlags),
            ChannelSpec::new("chlorinator#version", ValueKind::Number),
            ChannelSpec::new("chlorinator#name", ValueKind::Text),
        ];
        schema.extend(
            STATUS_FLAGS
                .iter()
                .map(|flag| ChannelSpec::new(flag.channel_id, ValueKind::OnOff)),
        );
        schema
    }
}
