use crate::codec::{FrameScheme, RawCandidate, STANDARD_HEADER_SIZE};
use crate::error::ChecksumError;

/// 16-bit unsigned sum used by Standard frames.
pub fn standard_checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)))
}

/// 8-bit sum (mod 256) used by Compact frames.
pub fn compact_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Verify a candidate's trailing checksum and lift it into a [`crate::Frame`].
///
/// Candidates come from [`crate::extract_candidate`], so their size already
/// matches their own length byte or command table entry.
pub fn validate(candidate: &RawCandidate) -> Result<crate::Frame, ChecksumError> {
    let bytes = &candidate.bytes;
    match candidate.scheme {
        FrameScheme::Standard => {
            let body_end = bytes.len() - 2;
            let expected = standard_checksum(&bytes[..body_end]);
            let actual = u16::from_be_bytes([bytes[body_end], bytes[body_end + 1]]);
            if expected != actual {
                return Err(ChecksumError::Standard { expected, actual });
            }
            Ok(crate::Frame::Standard {
                protocol: bytes[1],
                destination: bytes[2],
                source: bytes[3],
                command: bytes[4],
                payload: bytes.slice(STANDARD_HEADER_SIZE..body_end),
                checksum: actual,
            })
        }
        FrameScheme::Compact => {
            let body_end = bytes.len() - 1;
            let expected = compact_checksum(&bytes[..body_end]);
            let actual = bytes[body_end];
            if expected != actual {
                return Err(ChecksumError::Compact { expected, actual });
            }
            Ok(crate::Frame::Compact {
                destination: bytes[2],
                command: bytes[3],
                payload: bytes.slice(4..body_end),
                checksum: actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::{encode_standard, extract_candidate, ResyncConfig};
    use crate::Frame;

    fn candidate(wire: &[u8]) -> RawCandidate {
        extract_candidate(wire, &ResyncConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn standard_checksum_is_sum_through_payload() {
        let wire = [0xA5, 0x01, 0x10, 0x20, 0x02, 0x01, 0x00];
        assert_eq!(standard_checksum(&wire), 0x00D9);
    }

    #[test]
    fn compact_checksum_wraps() {
        assert_eq!(compact_checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(compact_checksum(&[0x10, 0x02, 0x50, 0x11, 0x50]), 0xC3);
    }

    #[test]
    fn validate_compact_salt_output() {
        let frame = validate(&candidate(&[0x10, 0x02, 0x50, 0x11, 0x50, 0xC3])).unwrap();
        assert_eq!(
            frame,
            Frame::Compact {
                destination: 0x50,
                command: 0x11,
                payload: Bytes::from_static(&[0x50]),
                checksum: 0xC3,
            }
        );
    }

    #[test]
    fn validate_compact_rejects_bad_trailer() {
        let err = validate(&candidate(&[0x10, 0x02, 0x50, 0x11, 0x50, 0xC4])).unwrap_err();
        assert_eq!(
            err,
            ChecksumError::Compact {
                expected: 0xC3,
                actual: 0xC4
            }
        );
    }

    #[test]
    fn recomputed_checksum_matches_trailer() {
        let mut wire = BytesMut::new();
        encode_standard(0x1E, 0x0F, 0x10, 0x08, &[0x4B; 13], &mut wire).unwrap();
        let body_end = wire.len() - 2;
        let trailer = u16::from_be_bytes([wire[body_end], wire[body_end + 1]]);
        assert_eq!(standard_checksum(&wire[..body_end]), trailer);

        match validate(&candidate(&wire)).unwrap() {
            Frame::Standard {
                source,
                destination,
                command,
                payload,
                checksum,
                ..
            } => {
                assert_eq!((source, destination, command), (0x10, 0x0F, 0x08));
                assert_eq!(payload.len(), 13);
                assert_eq!(checksum, trailer);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn any_single_payload_bit_flip_fails() {
        let mut wire = BytesMut::new();
        encode_standard(0x00, 0x10, 0x60, 0x07, &[0x5A; 15], &mut wire).unwrap();
        let payload_range = STANDARD_HEADER_SIZE..wire.len() - 2;

        for index in payload_range {
            for bit in 0..8 {
                let mut corrupted = wire.to_vec();
                corrupted[index] ^= 1 << bit;
                assert!(
                    validate(&candidate(&corrupted)).is_err(),
                    "flip of bit {bit} at {index} should fail"
                );
            }
        }
    }
}
