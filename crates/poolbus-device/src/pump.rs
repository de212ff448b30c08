//! Variable-speed pump (IntelliFlo class) payload decoding.

use num_enum::{FromPrimitive, IntoPrimitive};
use poolbus_frame::Frame;
use strum_macros::Display;
use tracing::debug;

use crate::address::DeviceFamily;
use crate::decoder::DeviceDecoder;
use crate::error::DecodeError;
use crate::fields::{expect_len, minutes_of_day, u16_be};
use crate::value::{ChannelSpec, ChannelValue, ScaledValue, ValueKind};

const CMD_ACK: u8 = 0x01;
const CMD_REMOTE_CONTROL: u8 = 0x04;
const CMD_RUN: u8 = 0x06;
const CMD_STATUS: u8 = 0x07;

const STATUS_LEN: usize = 15;

const RUNNING: u8 = 0x0A;
const REMOTE_ON: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PumpMode {
    Filter = 0,
    Manual = 1,
    #[strum(to_string = "Speed 1")]
    Speed1 = 2,
    #[strum(to_string = "Speed 2")]
    Speed2 = 3,
    #[strum(to_string = "Speed 3")]
    Speed3 = 4,
    #[strum(to_string = "Speed 4")]
    Speed4 = 5,
    #[strum(to_string = "Feature 1")]
    Feature1 = 6,
    #[strum(to_string = "External Program 1")]
    ExternalProgram1 = 9,
    #[strum(to_string = "External Program 2")]
    ExternalProgram2 = 10,
    #[strum(to_string = "External Program 3")]
    ExternalProgram3 = 11,
    #[strum(to_string = "External Program 4")]
    ExternalProgram4 = 12,
    #[num_enum(default)]
    Unknown = 255,
}

/// Stateless decoder for one pump.
#[derive(Debug, Default)]
pub struct PumpDecoder;

impl PumpDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn number(channel_id: &str, raw: impl Into<f64>) -> ChannelValue {
    ChannelValue::new(channel_id, ScaledValue::Number(raw.into()))
}

fn decode_status(p: &[u8]) -> Vec<ChannelValue> {
    vec![
        ChannelValue::new("pump#run", ScaledValue::OnOff(p[0] == RUNNING)),
        ChannelValue::new("pump#mode", ScaledValue::enumerated(PumpMode::from(p[1]))),
        number("pump#drivestate", p[2]),
        number("pump#power", u16_be(p, 3)),
        ChannelValue::new("pump#rpm", ScaledValue::Rpm(i32::from(u16_be(p, 5)))),
        number("pump#gpm", p[7]),
        number("pump#ppc", p[8]),
        number("pump#error", p[10]),
        number("pump#timer", p[11]),
        number("pump#time", minutes_of_day(p[13], p[14])),
    ]
}

impl DeviceDecoder for PumpDecoder {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::Pump
    }

    fn decode(&mut self, frame: &Frame) -> Result<Vec<ChannelValue>, DecodeError> {
        let command = frame.command();
        let payload = frame.payload().as_ref();

        match command {
            CMD_STATUS => {
                expect_len(command, payload, STATUS_LEN)?;
                Ok(decode_status(payload))
            }
            CMD_REMOTE_CONTROL => {
                expect_len(command, payload, 1)?;
                Ok(vec![ChannelValue::new(
                    "pump#remotecontrol",
                    ScaledValue::OnOff(payload[0] == REMOTE_ON),
                )])
            }
            CMD_RUN => {
                expect_len(command, payload, 1)?;
                Ok(vec![ChannelValue::new(
                    "pump#run",
                    ScaledValue::OnOff(payload[0] == RUNNING),
                )])
            }
            CMD_ACK => {
                expect_len(command, payload, 2)?;
                Ok(vec![ChannelValue::new(
                    "pump#setrpm",
                    ScaledValue::Rpm(i32::from(u16_be(payload, 0))),
                )])
            }
            other => {
                debug!(command = other, "pump command not interpreted");
                Ok(Vec::new())
            }
        }
    }

    fn channel_schema(&self) -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::new("pump#run", ValueKind::OnOff),
            ChannelSpec::new("pump#mode", ValueKind::Enum),
            ChannelSpec::new("pump#drivestate", ValueKind::Number),
            ChannelSpec::new("pump#power", ValueKind::Number),
            ChannelSpec::new("pump#rpm", ValueKind::Rpm),
            ChannelSpec::new("pump#gpm", ValueKind::Number),
            ChannelSpec::new("pump#ppc", ValueKind::Number),
            ChannelSpec::new("pump#error", ValueKind::Number),
            ChannelSpec::new("pump#timer", ValueKind::Number),
            ChannelSpec::new("pump#time", ValueKind::Number),
            ChannelSpec::new("pump#remotecontrol", ValueKind::OnOff),
            ChannelSpec::new("pump#setrpm", ValueKind::Rpm),
        ]
    }
}
