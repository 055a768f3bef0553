//! BER length octets.
//!
//! X.690 Section 8.1.3: short form for 0-127, long form with up to four
//! subsequent length octets. The indefinite form (0x80) is rejected.

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum length accepted on decode (2 MiB).
///
/// Real SNMP messages are at most a few KB; anything larger is hostile.
pub const MAX_LENGTH: usize = 0x200000;

/// Encode a length, returning the octets in reverse order for the reverse buffer.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];

    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let mut count = 0;
    let mut remaining = len;
    while remaining > 0 && count < 4 {
        buf[count] = remaining as u8;
        remaining >>= 8;
        count += 1;
    }
    buf[count] = 0x80 | count as u8;
    (buf, count + 1)
}

/// Number of octets [`encode_length`] produces for `len`.
pub fn length_encoded_len(len: usize) -> usize {
    encode_length(len).1
}

/// Decode a length, returning `(length, octets_consumed)`.
///
/// `base_offset` is the position of `data[0]` in the enclosing buffer and is
/// only used for error reporting.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
        ));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_octets = (first & 0x7F) as usize;

    if num_octets > 4 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
        ));
    }

    if data.len() < 1 + num_octets {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    }

    // Non-minimal long forms are legal (X.690 8.1.3.5 Note 2)
    let len = data[1..=num_octets]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    if len > MAX_LENGTH {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((len, 1 + num_octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form() {
        assert_eq!(decode_length(&[0], 0).unwrap(), (0, 1));
        assert_eq!(decode_length(&[127], 0).unwrap(), (127, 1));
    }

    #[test]
    fn test_long_form() {
        assert_eq!(decode_length(&[0x81, 128], 0).unwrap(), (128, 2));
        assert_eq!(decode_length(&[0x82, 0x01, 0x00], 0).unwrap(), (256, 3));
        // non-minimal encoding accepted
        assert_eq!(decode_length(&[0x82, 0x00, 0x05], 0).unwrap(), (5, 3));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            decode_length(&[0x80], 0),
            Err(Error::Decode {
                kind: DecodeErrorKind::IndefiniteLength,
                ..
            })
        ));
        assert!(matches!(
            decode_length(&[0x85, 0, 0, 0, 0, 1], 0),
            Err(Error::Decode {
                kind: DecodeErrorKind::LengthTooLong { octets: 5 },
                ..
            })
        ));
        assert!(matches!(
            decode_length(&[0x82, 0x01], 3),
            Err(Error::Decode {
                offset: 3,
                kind: DecodeErrorKind::TruncatedData
            })
        ));
        assert!(decode_length(&[], 0).is_err());
    }

    #[test]
    fn test_max_length_enforced() {
        let max = MAX_LENGTH;
        let at_max = [0x83, (max >> 16) as u8, (max >> 8) as u8, max as u8];
        assert_eq!(decode_length(&at_max, 0).unwrap(), (MAX_LENGTH, 4));

        let over = MAX_LENGTH + 1;
        let over_max = [0x83, (over >> 16) as u8, (over >> 8) as u8, over as u8];
        assert!(matches!(
            decode_length(&over_max, 0),
            Err(Error::Decode {
                kind: DecodeErrorKind::LengthExceedsMax { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_encode() {
        let (buf, len) = encode_length(0);
        assert_eq!(&buf[..len], &[0]);

        let (buf, len) = encode_length(128);
        assert_eq!(&buf[..len], &[128, 0x81]);

        let (buf, len) = encode_length(256);
        assert_eq!(&buf[..len], &[0, 1, 0x82]);

        let (buf, len) = encode_length(0x010203);
        assert_eq!(&buf[..len], &[0x03, 0x02, 0x01, 0x83]);
        assert_eq!(length_encoded_len(0x010203), 4);
    }
}
