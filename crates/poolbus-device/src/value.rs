use num_enum::IntoPrimitive;
use serde::Serialize;
use strum_macros::Display;

/// Temperature unit reported by the controller's mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, IntoPrimitive)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TemperatureUnit {
    #[default]
    #[strum(to_string = "°F")]
    Fahrenheit = 0,
    #[strum(to_string = "°C")]
    Celsius = 1,
}

/// A decoded, typed channel value.
///
/// Scaling is applied once, in the decoder; values never round-trip through a
/// lossier representation on the way to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ScaledValue {
    Temperature(f64, TemperatureUnit),
    Percent(f64),
    Rpm(i32),
    OnOff(bool),
    Enum(i32),
    BitFlags(u32),
    /// Plain decimal: watts, ppm, pH, millivolts, gallons per minute.
    Number(f64),
    Text(String),
    /// The device marks the field as not currently valid.
    Undefined,
}

impl ScaledValue {
    /// Emit a closed-table enumeration as its wire code.
    pub fn enumerated(code: impl Into<u8>) -> Self {
        ScaledValue::Enum(i32::from(code.into()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ScaledValue::Temperature(..) => ValueKind::Temperature,
            ScaledValue::Percent(_) => ValueKind::Percent,
            ScaledValue::Rpm(_) => ValueKind::Rpm,
            ScaledValue::OnOff(_) => ValueKind::OnOff,
            ScaledValue::Enum(_) => ValueKind::Enum,
            ScaledValue::BitFlags(_) => ValueKind::BitFlags,
            ScaledValue::Number(_) => ValueKind::Number,
            ScaledValue::Text(_) => ValueKind::Text,
            ScaledValue::Undefined => ValueKind::Undefined,
        }
    }
}

impl std::fmt::Display for ScaledValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaledValue::Temperature(value, unit) => write!(f, "{value} {unit}"),
            ScaledValue::Percent(value) => write!(f, "{value} %"),
            ScaledValue::Rpm(value) => write!(f, "{value} rpm"),
            ScaledValue::OnOff(true) => f.write_str("ON"),
            ScaledValue::OnOff(false) => f.write_str("OFF"),
            ScaledValue::Enum(code) => write!(f, "#{code}"),
            ScaledValue::BitFlags(bits) => write!(f, "{bits:#010b}"),
            ScaledValue::Number(value) => write!(f, "{value}"),
            ScaledValue::Text(text) => f.write_str(text),
            ScaledValue::Undefined => f.write_str("UNDEF"),
        }
    }
}

/// Shape of the values a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Temperature,
    Percent,
    Rpm,
    OnOff,
    Enum,
    BitFlags,
    Number,
    Text,
    Undefined,
}

/// One `group#channel` update produced by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelValue {
    pub channel_id: String,
    pub value: ScaledValue,
}

impl ChannelValue {
    pub fn new(channel_id: impl Into<String>, value: ScaledValue) -> Self {
        Self {
            channel_id: channel_id.into(),
            value,
        }
    }
}

/// A channel a decoder can emit, as listed by `channel_schema()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub channel_id: String,
    pub kind: ValueKind,
}

impl ChannelSpec {
    pub fn new(channel_id: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerated_uses_wire_code() {
        assert_eq!(
            ScaledValue::enumerated(TemperatureUnit::Celsius),
            ScaledValue::Enum(1)
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            ScaledValue::Temperature(65.0, TemperatureUnit::Fahrenheit).to_string(),
            "65 °F"
        );
        assert_eq!(ScaledValue::OnOff(true).to_string(), "ON");
        assert_eq!(ScaledValue::BitFlags(0x81).to_string(), "0b10000001");
    }

    #[test]
    fn serializes_tagged() {
        let value = ChannelValue::new("pump#rpm", ScaledValue::Rpm(1750));
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"channel_id":"pump#rpm","value":{"kind":"rpm","value":1750}}"#
        );
    }
}
