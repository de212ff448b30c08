//! Offset readers and flag tables shared by the family decoders.

use crate::error::DecodeError;
use crate::value::{ChannelValue, ScaledValue};

/// One named boolean inside a status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    pub offset: usize,
    pub mask: u8,
    pub channel_id: &'static str,
}

impl FlagSpec {
    /// A flag backed by a single bit.
    pub const fn bit(offset: usize, bit: u8, channel_id: &'static str) -> Self {
        Self {
            offset,
            mask: 1 << bit,
            channel_id,
        }
    }

    /// A flag that is set when any bit in `mask` is set.
    pub const fn any(offset: usize, mask: u8, channel_id: &'static str) -> Self {
        Self {
            offset,
            mask,
            channel_id,
        }
    }
}

/// Reject payloads whose length differs from what `command` implies.
pub fn expect_len(command: u8, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::LengthMismatch {
            command,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Big-endian u16 at `offset`. Callers check the payload length first.
pub fn u16_be(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

/// Minutes after midnight from an hour/minute byte pair.
pub fn minutes_of_day(hour: u8, minute: u8) -> f64 {
    f64::from(u16::from(hour) * 60 + u16::from(minute))
}

/// Decode every flag in `table`. Bits outside the table are never surfaced.
pub fn decode_flags(payload: &[u8], table: &[FlagSpec], out: &mut Vec<ChannelValue>) {
    for flag in table {
        let set = payload
            .get(flag.offset)
            .is_some_and(|byte| byte & flag.mask != 0);
        out.push(ChannelValue::new(flag.channel_id, ScaledValue::OnOff(set)));
    }
}

/// Mask of the bits in `table` that sit at `offset`.
pub fn known_bits(table: &[FlagSpec], offset: usize) -> u8 {
    table
        .iter()
        .filter(|flag| flag.offset == offset)
        .fold(0, |mask, flag| mask | flag.mask)
}

/// Printable ASCII from a fixed-width name field, padding trimmed.
pub fn ascii_name(bytes: &[u8]) -> String {
    let name: String = bytes
        .iter()
        .filter(|b| b.is_ascii_graphic() || **b == b' ')
        .map(|b| char::from(*b))
        .collect();
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: [FlagSpec; 3] = [
        FlagSpec::bit(0, 0, "a#low"),
        FlagSpec::bit(0, 7, "a#high"),
        FlagSpec::any(1, 0x0C, "a#either"),
    ];

    #[test]
    fn expect_len_reports_mismatch() {
        assert!(expect_len(0x02, &[0; 29], 29).is_ok());
        assert_eq!(
            expect_len(0x02, &[0; 28], 29),
            Err(DecodeError::LengthMismatch {
                command: 0x02,
                expected: 29,
                actual: 28
            })
        );
    }

    #[test]
    fn flags_ignore_reserved_bits() {
        let mut out = Vec::new();
        decode_flags(&[0x7E, 0x08], &FLAGS, &mut out);
        assert_eq!(
            out,
            vec![
                ChannelValue::new("a#low", ScaledValue::OnOff(false)),
                ChannelValue::new("a#high", ScaledValue::OnOff(false)),
                ChannelValue::new("a#either", ScaledValue::OnOff(true)),
            ]
        );
        assert_eq!(known_bits(&FLAGS, 0), 0x81);
    }

    #[test]
    fn readers() {
        assert_eq!(u16_be(&[0x00, 0x06, 0xD6], 1), 1750);
        assert_eq!(minutes_of_day(9, 32), 572.0);
        assert_eq!(ascii_name(b"Intellichlor--40"), "Intellichlor--40");
        assert_eq!(ascii_name(b"IC40\0\0  "), "IC40");
    }
}
