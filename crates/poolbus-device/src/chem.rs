//! Chemistry controller (IntelliChem class) payload decoding.

use num_enum::{FromPrimitive, IntoPrimitive};
use poolbus_frame::Frame;
use strum_macros::Display;
use tracing::debug;

use crate::address::DeviceFamily;
use crate::decoder::DeviceDecoder;
use crate::error::DecodeError;
use crate::fields::{decode_flags, expect_len, known_bits, u16_be, FlagSpec};
use crate::value::{ChannelSpec, ChannelValue, ScaledValue, TemperatureUnit, ValueKind};

const CMD_STATUS: u8 = 0x12;
const STATUS_LEN: usize = 41;

const ALARM_OFFSET: usize = 30;
const WARNING_OFFSET: usize = 31;
const DOSING_OFFSET: usize = 34;

const ALARMS: [FlagSpec; 8] = [
    FlagSpec::bit(ALARM_OFFSET, 0, "chem#flowalarm"),
    FlagSpec::bit(ALARM_OFFSET, 1, "chem#phhigh"),
    FlagSpec::bit(ALARM_OFFSET, 2, "chem#phlow"),
    FlagSpec::bit(ALARM_OFFSET, 3, "chem#orphigh"),
    FlagSpec::bit(ALARM_OFFSET, 4, "chem#orplow"),
    FlagSpec::bit(ALARM_OFFSET, 5, "chem#phtankempty"),
    FlagSpec::bit(ALARM_OFFSET, 6, "chem#orptankempty"),
    FlagSpec::bit(ALARM_OFFSET, 7, "chem#probefault"),
];

const WARNINGS: [FlagSpec; 5] = [
    FlagSpec::bit(WARNING_OFFSET, 0, "chem#phlockout"),
    FlagSpec::bit(WARNING_OFFSET, 1, "chem#phdailylimit"),
    FlagSpec::bit(WARNING_OFFSET, 2, "chem#orpdailylimit"),
    FlagSpec::bit(WARNING_OFFSET, 3, "chem#invalidsetup"),
    FlagSpec::bit(WARNING_OFFSET, 4, "chem#chlorinatorcommerror"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum DosingState {
    Dosing = 0,
    Monitoring = 1,
    Mixing = 2,
    #[num_enum(default)]
    Unknown = 255,
}

/// Stateless decoder for one chemistry controller.
#[derive(Debug, Default)]
pub struct ChemControllerDecoder;

impl ChemControllerDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn hundredths(raw: u16) -> ScaledValue {
    ScaledValue::Number(f64::from(raw) / 100.0)
}

fn number(raw: impl Into<f64>) -> ScaledValue {
    ScaledValue::Number(raw.into())
}

fn decode_status(p: &[u8]) -> Vec<ChannelValue> {
    let saturation = f64::from(i8::from_ne_bytes([p[20]])) / 100.0;
    let alarms = p[ALARM_OFFSET] & known_bits(&ALARMS, ALARM_OFFSET);
    let warnings = p[WARNING_OFFSET] & known_bits(&WARNINGS, WARNING_OFFSET);
    let dosing = p[DOSING_OFFSET];

    let mut out = vec![
        ChannelValue::new("chem#ph", hundredths(u16_be(p, 0))),
        ChannelValue::new("chem#orp", number(u16_be(p, 2))),
        ChannelValue::new("chem#phsetpoint", hundredths(u16_be(p, 4))),
        ChannelValue::new("chem#orpsetpoint", number(u16_be(p, 6))),
        ChannelValue::new("chem#phtanklevel", number(p[18])),
        ChannelValue::new("chem#orptanklevel", number(p[19])),
        ChannelValue::new("chem#saturationindex", ScaledValue::Number(saturation)),
        ChannelValue::new("chem#calciumhardness", number(u16_be(p, 21))),
        ChannelValue::new("chem#cyanuricacid", number(p[24])),
        ChannelValue::new("chem#alkalinity", number(u16_be(p, 25))),
        ChannelValue::new(
            "chem#watertemperature",
            ScaledValue::Temperature(f64::from(p[29]), TemperatureUnit::Fahrenheit),
        ),
        ChannelValue::new("chem#alarms", ScaledValue::BitFlags(u32::from(alarms))),
        ChannelValue::new("chem#warnings", ScaledValue::BitFlags(u32::from(warnings))),
    ];
    decode_flags(p, &ALARMS, &mut out);
    decode_flags(p, &WARNINGS, &mut out);
    out.push(ChannelValue::new(
        "chem#phdosing",
        ScaledValue::enumerated(DosingState::from((dosing >> 4) & 0x03)),
    ));
    out.push(ChannelValue::new(
        "chem#orpdosing",
        ScaledValue::enumerated(DosingState::from((dosing >> 6) & 0x03)),
    ));
    out.push(ChannelValue::new(
        "chem#firmware",
        ScaledValue::Text(format!("{}.{:03}", p[37], p[36])),
    ));
    out
}

impl DeviceDecoder for ChemControllerDecoder {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::ChemController
    }

    fn decode(&mut self, frame: &Frame) -> Result<Vec<ChannelValue>, DecodeError> {
        let command = frame.command();
        let payload = frame.payload().as_ref();

        if command != CMD_STATUS {
            debug!(command, "chemistry command not interpreted");
            return Ok(Vec::new());
        }
        expect_len(command, payload, STATUS_LEN)?;
        Ok(decode_status(payload))
    }

    fn channel_schema(&self) -> Vec<ChannelSpec> {
        let mut schema: Vec<ChannelSpec> = [
            "chem#ph",
            "chem#orp",
            "chem#phsetpoint",
            "chem#orpsetpoint",
            "chem#phtanklevel",
            "chem#orptanklevel",
            "chem#saturationindex",
            "chem#calciumhardness",
            "chem#cyanuricacid",
            "chem#alkalinity",
        ]
        .into_iter()
        .map(|id| ChannelSpec::new(id, ValueKind::Number))
        .collect();

        schema.push(ChannelSpec::new("chem#watertemperature", ValueKind::Temperature));
        schema.push(ChannelSpec::new("chem#alarms", ValueKind::BitFlags));
        schema.push(ChannelSpec::new("chem#warnings", ValueKind::BitFlags));
        schema.extend(
            ALARMS
                .iter()
                .chain(WARNINGS.iter())
                .map(|flag| ChannelSpec::new(flag.channel_id, ValueKind::OnOff)),
        );
        schema.push(ChannelSpec::new("chem#phdosing", ValueKind::Enum));
        schema.push(ChannelSpec::new("chem#orpdosing", ValueKind::Enum));
        schema.push(ChannelSpec::new("chem#firmware", ValueKind::Text));
        schema
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn frame(payload: &[u8]) -> Frame {
        Frame::Standard {
            protocol: 0x00,
            destination: 0x10,
            source: 0x90,
            command: CMD_STATUS,
            payload: Bytes::copy_from_slice(payload),
            checksum: 0,
        }
    }

    fn status() -> [u8; 41] {
        let mut p = [0u8; 41];
        p[0..2].copy_from_slice(&750u16.to_be_bytes());
        p[2..4].copy_from_slice(&650u16.to_be_bytes());
        p[4..6].copy_from_slice(&760u16.to_be_bytes());
        p[6..8].copy_from_slice(&700u16.to_be_bytes());
        p[18] = 6;
        p[19] = 3;
        p[20] = 0xF6;
        p[21..23].copy_from_slice(&300u16.to_be_bytes());
        p[24] = 40;
        p[25..27].copy_from_slice(&90u16.to_be_bytes());
        p[29] = 82;
        p[34] = 0x60;
        p[36] = 80;
        p[37] = 1;
        p
    }

    fn value<'a>(values: &'a [ChannelValue], id: &str) -> &'a ScaledValue {
        &values
            .iter()
            .find(|v| v.channel_id == id)
            .unwrap_or_else(|| panic!("missing {id}"))
            .value
    }

    #[test]
    fn status_frame_readings() {
        let values = ChemControllerDecoder::new().decode(&frame(&status())).unwrap();

        assert_eq!(value(&values, "chem#ph"), &ScaledValue::Number(7.5));
        assert_eq!(value(&values, "chem#orp"), &ScaledValue::Number(650.0));
        assert_eq!(value(&values, "chem#phsetpoint"), &ScaledValue::Number(7.6));
        assert_eq!(value(&values, "chem#saturationindex"), &ScaledValue::Number(-0.1));
        assert_eq!(value(&values, "chem#calciumhardness"), &ScaledValue::Number(300.0));
        assert_eq!(value(&values, "chem#alkalinity"), &ScaledValue::Number(90.0));
        assert_eq!(
            value(&values, "chem#watertemperature"),
            &ScaledValue::Temperature(82.0, TemperatureUnit::Fahrenheit)
        );
        assert_eq!(value(&values, "chem#firmware"), &ScaledValue::Text("1.080".into()));
    }

    #[test]
    fn dosing_states() {
        let values = ChemControllerDecoder::new().decode(&frame(&status())).unwrap();
        assert_eq!(
            value(&values, "chem#phdosing"),
            &ScaledValue::enumerated(DosingState::Mixing)
        );
        assert_eq!(
            value(&values, "chem#orpdosing"),
            &ScaledValue::enumerated(DosingState::Monitoring)
        );
    }

    #[test]
    fn alarm_and_warning_flags() {
        let mut p = status();
        p[ALARM_OFFSET] = 0x21;
        p[WARNING_OFFSET] = 0xE2;

        let values = ChemControllerDecoder::new().decode(&frame(&p)).unwrap();
        assert_eq!(value(&values, "chem#alarms"), &ScaledValue::BitFlags(0x21));
        assert_eq!(value(&values, "chem#flowalarm"), &ScaledValue::OnOff(true));
        assert_eq!(value(&values, "chem#phtankempty"), &ScaledValue::OnOff(true));
        assert_eq!(value(&values, "chem#phhigh"), &ScaledValue::OnOff(false));

        // Reserved warning bits 5..7 never surface.
        assert_eq!(value(&values, "chem#warnings"), &ScaledValue::BitFlags(0x02));
        assert_eq!(value(&values, "chem#phdailylimit"), &ScaledValue::OnOff(true));
    }

    #[test]
    fn wrong_length_and_other_commands() {
        let mut decoder = ChemControllerDecoder::new();
        assert!(matches!(
            decoder.decode(&frame(&[0u8; 40])),
            Err(DecodeError::LengthMismatch { expected: 41, actual: 40, .. })
        ));

        let other = Frame::Standard {
            protocol: 0x00,
            destination: 0x10,
            source: 0x90,
            command: 0x13,
            payload: Bytes::new(),
            checksum: 0,
        };
        assert!(decoder.decode(&other).unwrap().is_empty());
    }
}
