use bytes::Bytes;
#[cfg(test)]
use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// First byte of a Standard frame. The byte after it is a protocol byte that
/// varies between controller generations, so any value is accepted.
pub const STANDARD_MARKER: u8 = 0xA5;

/// Standard header: marker (1) + protocol (1) + dest (1) + source (1) + command (1) + length (1).
pub const STANDARD_HEADER_SIZE: usize = 6;

const STANDARD_CHECKSUM_SIZE: usize = 2;

/// Compact frame preamble (DLE STX).
pub const COMPACT_PREAMBLE: [u8; 2] = [0x10, 0x02];

/// Compact frame trailer (DLE ETX). Not covered by the checksum.
pub const COMPACT_TRAILER: [u8; 2] = [0x10, 0x03];

/// Compact header: preamble (2) + dest (1) + command (1).
const COMPACT_HEADER_SIZE: usize = 4;

const COMPACT_CHECKSUM_SIZE: usize = 1;

/// Default upper bound for a Standard length byte.
///
/// The largest status payload seen on the bus is 41 bytes (chemistry controller);
/// configuration dumps stay well under 64.
pub const DEFAULT_MAX_STANDARD_PAYLOAD: usize = 64;

/// Framing scheme, resolved once when the preamble is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameScheme {
    Standard,
    Compact,
}

impl FrameScheme {
    /// Resolve the scheme from the first bytes at the cursor.
    ///
    /// Returns `Ok(None)` when more bytes are needed to decide.
    pub fn detect(src: &[u8]) -> Result<Option<Self>> {
        match src {
            [] => Ok(None),
            [STANDARD_MARKER, ..] => Ok(Some(Self::Standard)),
            [first] if *first == COMPACT_PREAMBLE[0] => Ok(None),
            [first, second, ..] if [*first, *second] == COMPACT_PREAMBLE => {
                Ok(Some(Self::Compact))
            }
            [first, ..] => Err(FrameError::NoPreamble(*first)),
        }
    }

    /// True if `byte` can open a frame of either scheme.
    pub fn is_marker_start(byte: u8) -> bool {
        byte == STANDARD_MARKER || byte == COMPACT_PREAMBLE[0]
    }
}

/// Payload size of a Compact frame, keyed by command.
///
/// Compact frames carry no length field; a command missing here cannot be framed.
pub fn compact_payload_len(command: u8) -> Option<usize> {
    match command {
        0x00 => Some(1),  // probe from the controller
        0x01 => Some(2),  // probe reply
        0x03 => Some(17), // version + 16-character model name
        0x11 => Some(1),  // salt output percent
        0x12 => Some(2),  // salinity + status flags
        0x14 => Some(1),  // model name request
        0x15 => Some(1),  // salt output percent, alternate form
        _ => None,
    }
}

/// Structurally complete frame bytes that have not been checksum-validated yet.
///
/// Only [`extract_candidate`] builds these, so the size always matches the
/// frame's own length byte or command table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub(crate) scheme: FrameScheme,
    pub(crate) bytes: Bytes,
}

impl RawCandidate {
    /// Scheme resolved from the preamble.
    pub fn scheme(&self) -> FrameScheme {
        self.scheme
    }

    /// Every byte of the frame, preamble through checksum.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Number of bytes this candidate occupies on the wire.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }
}

/// A checksum-validated frame.
///
/// Standard wire format:
/// ```text
/// ┌──────┬──────────┬──────┬────────┬─────────┬────────┬──────────┬───────────┐
/// │ 0xA5 │ protocol │ dest │ source │ command │ length │ payload  │ sum (BE)  │
/// │ (1B) │ (1B)     │ (1B) │ (1B)   │ (1B)    │ (1B)   │ (length) │ (2B)      │
/// └──────┴──────────┴──────┴────────┴─────────┴────────┴──────────┴───────────┘
/// ```
///
/// Compact wire format: `10 02 dest command <payload> sum [10 03]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Standard {
        protocol: u8,
        source: u8,
        destination: u8,
        command: u8,
        payload: Bytes,
        checksum: u16,
    },
    Compact {
        destination: u8,
        command: u8,
        payload: Bytes,
        checksum: u8,
    },
}

impl Frame {
    pub fn scheme(&self) -> FrameScheme {
        match self {
            Frame::Standard { .. } => FrameScheme::Standard,
            Frame::Compact { .. } => FrameScheme::Compact,
        }
    }

    pub fn command(&self) -> u8 {
        match self {
            Frame::Standard { command, .. } | Frame::Compact { command, .. } => *command,
        }
    }

    pub fn destination(&self) -> u8 {
        match self {
            Frame::Standard { destination, .. } | Frame::Compact { destination, .. } => {
                *destination
            }
        }
    }

    /// Source address. Compact frames do not carry one.
    pub fn source(&self) -> Option<u8> {
        match self {
            Frame::Standard { source, .. } => Some(*source),
            Frame::Compact { .. } => None,
        }
    }

    pub fn payload(&self) -> &Bytes {
        match self {
            Frame::Standard { payload, .. } | Frame::Compact { payload, .. } => payload,
        }
    }
}

/// Configuration for the resynchronizer.
#[derive(Debug, Clone)]
pub struct ResyncConfig {
    /// Largest Standard payload accepted before a length byte is treated as noise.
    pub max_standard_payload: usize,
    /// Initial capacity of the rolling buffer.
    pub initial_capacity: usize,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            max_standard_payload: DEFAULT_MAX_STANDARD_PAYLOAD,
            initial_capacity: 1024,
        }
    }
}

/// Try to extract a candidate frame starting at `src[0]`.
///
/// Returns `Ok(None)` if the buffer does not hold the whole frame yet. Errors mean
/// the bytes at the cursor cannot start a frame; nothing is consumed either way.
pub fn extract_candidate(src: &[u8], config: &ResyncConfig) -> Result<Option<RawCandidate>> {
    let Some(scheme) = FrameScheme::detect(src)? else {
        return Ok(None);
    };

    let total = match scheme {
        FrameScheme::Standard => {
            if src.len() < STANDARD_HEADER_SIZE {
                return Ok(None);
            }
            let payload_len = usize::from(src[5]);
            if payload_len > config.max_standard_payload {
                return Err(FrameError::ImplausibleLength {
                    size: payload_len,
                    max: config.max_standard_payload,
                });
            }
            STANDARD_HEADER_SIZE + payload_len + STANDARD_CHECKSUM_SIZE
        }
        FrameScheme::Compact => {
            if src.len() < COMPACT_HEADER_SIZE {
                return Ok(None);
            }
            let command = src[3];
            let payload_len =
                compact_payload_len(command).ok_or(FrameError::UnknownCompactCommand(command))?;
            COMPACT_HEADER_SIZE + payload_len + COMPACT_CHECKSUM_SIZE
        }
    };

    if src.len() < total {
        return Ok(None);
    }

    Ok(Some(RawCandidate {
        scheme,
        bytes: Bytes::copy_from_slice(&src[..total]),
    }))
}

/// Encode a Standard frame, appending the checksum. Test fixtures only; the
/// stack never writes to the bus.
#[cfg(test)]
pub(crate) fn encode_standard(
    protocol: u8,
    destination: u8,
    source: u8,
    command: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = u8::try_from(payload.len()).map_err(|_| FrameError::ImplausibleLength {
        size: payload.len(),
        max: usize::from(u8::MAX),
    })?;
    let start = dst.len();
    dst.reserve(STANDARD_HEADER_SIZE + payload.len() + STANDARD_CHECKSUM_SIZE);
    dst.put_u8(STANDARD_MARKER);
    dst.put_u8(protocol);
    dst.put_u8(destination);
    dst.put_u8(source);
    dst.put_u8(command);
    dst.put_u8(length);
    dst.put_slice(payload);
    let sum = crate::checksum::standard_checksum(&dst[start..]);
    dst.put_u16(sum);
    Ok(())
}

/// Encode a Compact frame, appending the checksum and the DLE ETX trailer.
#[cfg(test)]
pub(crate) fn encode_compact(
    destination: u8,
    command: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    match compact_payload_len(command) {
        Some(len) if len == payload.len() => {}
        Some(len) => {
            return Err(FrameError::ImplausibleLength {
                size: payload.len(),
                max: len,
            })
        }
        None => return Err(FrameError::UnknownCompactCommand(command)),
    }
    let start = dst.len();
    dst.reserve(COMPACT_HEADER_SIZE + payload.len() + COMPACT_CHECKSUM_SIZE + 2);
    dst.put_slice(&COMPACT_PREAMBLE);
    dst.put_u8(destination);
    dst.put_u8(command);
    dst.put_slice(payload);
    let sum = crate::checksum::compact_checksum(&dst[start..]);
    dst.put_u8(sum);
    dst.put_slice(&COMPACT_TRAILER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_status() -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_standard(0x1E, 0x0F, 0x10, 0x02, &[0u8; 29], &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn detect_schemes() {
        assert_eq!(
            FrameScheme::detect(&[0xA5]).unwrap(),
            Some(FrameScheme::Standard)
        );
        assert_eq!(
            FrameScheme::detect(&[0x10, 0x02]).unwrap(),
            Some(FrameScheme::Compact)
        );
        assert_eq!(FrameScheme::detect(&[0x10]).unwrap(), None);
        assert!(matches!(
            FrameScheme::detect(&[0x10, 0x03]),
            Err(FrameError::NoPreamble(0x10))
        ));
        assert!(matches!(
            FrameScheme::detect(&[0xFF, 0x00]),
            Err(FrameError::NoPreamble(0xFF))
        ));
    }

    #[test]
    fn extract_complete_standard_frame() {
        let wire = standard_status();
        let candidate = extract_candidate(&wire, &ResyncConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(candidate.scheme, FrameScheme::Standard);
        assert_eq!(candidate.wire_size(), STANDARD_HEADER_SIZE + 29 + 2);
    }

    #[test]
    fn extract_waits_for_full_standard_frame() {
        let wire = standard_status();
        for cut in 0..wire.len() {
            let result = extract_candidate(&wire[..cut], &ResyncConfig::default()).unwrap();
            assert!(result.is_none(), "cut at {cut} should need more data");
        }
    }

    #[test]
    fn extract_rejects_implausible_length() {
        let wire = [0xA5, 0x00, 0x10, 0x60, 0x07, 0xF0];
        let result = extract_candidate(&wire, &ResyncConfig::default());
        assert!(matches!(
            result,
            Err(FrameError::ImplausibleLength { size: 0xF0, .. })
        ));
    }

    #[test]
    fn extract_compact_uses_command_table() {
        let wire = [0x10, 0x02, 0x50, 0x11, 0x50, 0xC3, 0x10, 0x03];
        let candidate = extract_candidate(&wire, &ResyncConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(candidate.scheme, FrameScheme::Compact);
        assert_eq!(candidate.bytes.as_ref(), &wire[..6]);
    }

    #[test]
    fn extract_compact_unknown_command() {
        let wire = [0x10, 0x02, 0x50, 0x7E, 0x00, 0x00];
        let result = extract_candidate(&wire, &ResyncConfig::default());
        assert!(matches!(result, Err(FrameError::UnknownCompactCommand(0x7E))));
    }

    #[test]
    fn encode_standard_matches_captured_pump_status() {
        let mut buf = BytesMut::new();
        encode_standard(
            0x00,
            0x10,
            0x60,
            0x07,
            &[
                0x0A, 0x02, 0x02, 0x00, 0xE7, 0x06, 0xD6, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
                0x02, 0x03,
            ],
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[buf.len() - 2..], &[0x03, 0x02]);
    }

    #[test]
    fn encode_compact_rejects_wrong_payload_size() {
        let mut buf = BytesMut::new();
        let result = encode_compact(0x50, 0x11, &[0x50, 0x00], &mut buf);
        assert!(matches!(result, Err(FrameError::ImplausibleLength { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_accessors() {
        let frame = Frame::Compact {
            destination: 0x50,
            command: 0x11,
            payload: Bytes::from_static(&[0x50]),
            checksum: 0xC3,
        };
        assert_eq!(frame.scheme(), FrameScheme::Compact);
        assert_eq!(frame.command(), 0x11);
        assert_eq!(frame.destination(), 0x50);
        assert_eq!(frame.source(), None);
        assert_eq!(frame.payload().as_ref(), &[0x50]);
    }
}
