//! BER encoding.
//!
//! Uses a reverse buffer: content is pushed first, then its length and tag
//! are prepended, so no length ever has to be computed ahead of time.
//! Callers therefore push the fields of a SEQUENCE last-to-first.

use super::length::encode_length;
use super::tag;
use bytes::Bytes;

/// Buffer for BER encoding that writes backwards.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a new encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a new encode buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Prepend bytes (given in forward order).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Prepend a BER length.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, count) = encode_length(len);
        self.buf.extend_from_slice(&bytes[..count]);
    }

    /// Prepend a tag octet.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend a complete primitive TLV.
    pub fn push_tlv(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Encode a constructed type (SEQUENCE, PDU, etc).
    ///
    /// The closure pushes the contents; length and tag are wrapped around them.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let start_len = self.len();
        f(self);
        let content_len = self.len() - start_len;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER (minimal two's complement).
    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let len = integer_content_len(value);
        self.push_tlv(tag::universal::INTEGER, &bytes[4 - len..]);
    }

    /// Encode an unsigned 32-bit integer with a specific application tag.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let (arr, len) = unsigned_content(value as u64);
        self.push_tlv(tag, &arr[9 - len..]);
    }

    /// Encode a Counter64.
    pub fn push_counter64(&mut self, value: u64) {
        let (arr, len) = unsigned_content(value);
        self.push_tlv(tag::application::COUNTER64, &arr[9 - len..]);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_tlv(tag::universal::OCTET_STRING, data);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_tlv(tag::universal::NULL, &[]);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &crate::oid::Oid) {
        self.push_tlv(tag::universal::OBJECT_IDENTIFIER, &oid.to_ber_smallvec());
    }

    /// Encode an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_tlv(tag::application::IP_ADDRESS, &addr);
    }

    /// Finalize and return the encoded bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Content length of a minimally encoded signed INTEGER.
///
/// Leading 0x00 (or 0xFF for negatives) octets are dropped as long as the
/// next octet still carries the right sign bit.
pub fn integer_content_len(value: i32) -> usize {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    if value >= 0 {
        while start < 3 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        while start < 3 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }
    4 - start
}

/// Minimal positive-integer encoding of an unsigned value.
///
/// Returns a 9-byte array whose valid bytes are the trailing `len`; a 0x00
/// octet is kept in front whenever the top bit of the first significant
/// octet is set.
#[inline]
fn unsigned_content(value: u64) -> ([u8; 9], usize) {
    let mut result = [0u8; 9];
    result[1..].copy_from_slice(&value.to_be_bytes());

    if value == 0 {
        return (result, 1);
    }

    let mut start = 1;
    while result[start] == 0 {
        start += 1;
    }
    if result[start] & 0x80 != 0 {
        start -= 1;
    }
    (result, 9 - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut EncodeBuf)) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        f(&mut buf);
        buf.finish().to_vec()
    }

    #[test]
    fn test_encode_integer() {
        assert_eq!(encoded(|b| b.push_integer(0)), vec![0x02, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_integer(127)), vec![0x02, 0x01, 0x7F]);
        // high bit set: leading zero inserted
        assert_eq!(encoded(|b| b.push_integer(128)), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-1)), vec![0x02, 0x01, 0xFF]);
        assert_eq!(encoded(|b| b.push_integer(-128)), vec![0x02, 0x01, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-129)), vec![0x02, 0x02, 0xFF, 0x7F]);
        assert_eq!(
            encoded(|b| b.push_integer(i32::MIN)),
            vec![0x02, 0x04, 0x80, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_encode_unsigned() {
        let gauge = tag::application::GAUGE32;
        assert_eq!(encoded(|b| b.push_unsigned32(gauge, 0)), vec![0x42, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_unsigned32(gauge, 255)), vec![0x42, 0x02, 0x00, 0xFF]);
        assert_eq!(encoded(|b| b.push_unsigned32(gauge, 256)), vec![0x42, 0x02, 0x01, 0x00]);
        assert_eq!(
            encoded(|b| b.push_unsigned32(gauge, u32::MAX)),
            vec![0x42, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encoded(|b| b.push_counter64(u64::MAX)),
            vec![0x46, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_encode_null() {
        assert_eq!(encoded(|b| b.push_null()), vec![0x05, 0x00]);
    }

    #[test]
    fn test_encode_sequence() {
        let bytes = encoded(|buf| {
            buf.push_sequence(|buf| {
                // reverse buffer: last field first
                buf.push_integer(2);
                buf.push_integer(1);
            })
        });
        assert_eq!(bytes, vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_encode_long_content() {
        let data = vec![0xAB; 300];
        let bytes = encoded(|b| b.push_octet_string(&data));
        assert_eq!(&bytes[..4], &[0x04, 0x82, 0x01, 0x2C]);
        assert_eq!(bytes.len(), 304);
    }

    #[test]
    fn test_integer_content_len() {
        assert_eq!(integer_content_len(0), 1);
        assert_eq!(integer_content_len(32767), 2);
        assert_eq!(integer_content_len(32768), 3);
        assert_eq!(integer_content_len(i32::MAX), 4);
    }
}
