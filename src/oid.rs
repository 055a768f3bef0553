//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.
//! Ordering is lexicographic by arc, with a proper prefix sorting before any of
//! its extensions. The MIB tree and every GETNEXT walk rely on that order.

use crate::error::{DecodeErrorKind, Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Immutable once constructed; derived OIDs ([`child`](Oid::child),
/// [`parent`](Oid::parent)) are new values.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use snmp_mib_agent::oid::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1]);
    /// assert_eq!(oid.len(), 4);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted string notation (e.g., "1.3.6.1.4.1.99999").
    ///
    /// A leading dot is accepted. Arc constraints are not checked here; use
    /// [`validate()`](Self::validate) for that.
    ///
    /// ```
    /// use snmp_mib_agent::oid::Oid;
    ///
    /// let oid = Oid::parse(".1.3.6.1.4.1").unwrap();
    /// assert_eq!(oid.to_string(), "1.3.6.1.4.1");
    /// assert!(Oid::parse("1.3.x").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        for part in s.split('.') {
            if part.is_empty() {
                continue;
            }

            let arc: u32 = part.parse().map_err(|_| {
                Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s.to_string())
            })?;

            arcs.push(arc);
        }

        if arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid_with_input(
                OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                },
                s.to_string(),
            ));
        }

        Ok(Self { arcs })
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// Get the parent OID (all arcs except the last).
    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(Oid {
                arcs: SmallVec::from_slice(&self.arcs[..self.arcs.len() - 1]),
            })
        }
    }

    /// Create a child OID by appending an arc.
    ///
    /// ```
    /// use snmp_mib_agent::oid;
    ///
    /// let test_count = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2).child(0);
    /// assert_eq!(test_count.to_string(), "1.3.6.1.4.1.99999.1.2.0");
    /// ```
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Last arc, if any.
    pub fn last(&self) -> Option<u32> {
        self.arcs.last().copied()
    }

    /// Validate OID arcs per X.690 Section 8.19.4.
    ///
    /// An OID that passes encodes to BER and decodes back unchanged:
    ///
    /// - empty, or at least two arcs
    /// - arc1 must be 0, 1, or 2
    /// - arc2 must be <= 39 when arc1 is 0 or 1
    /// - `arc1 * 40 + arc2` must fit in a `u32` when arc1 is 2
    /// - no more than [`MAX_OID_LEN`] arcs
    ///
    /// ```
    /// use snmp_mib_agent::oid;
    ///
    /// assert!(oid!(1, 3, 6, 1).validate().is_ok());
    /// assert!(oid!(1).validate().is_err());
    /// assert!(oid!(1, 40).validate().is_err());
    /// assert!(oid!(2, u32::MAX).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            }));
        }

        let (arc1, arc2) = match self.arcs.as_slice() {
            [] => return Ok(()),
            [_] => return Err(Error::invalid_oid(OidErrorKind::SingleArc)),
            [arc1, arc2, ..] => (*arc1, *arc2),
        };

        if arc1 > 2 {
            return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(arc1)));
        }

        let second_fits = match arc1 {
            2 => arc2 <= u32::MAX - 80,
            _ => arc2 < 40,
        };
        if !second_fits {
            return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                first: arc1,
                second: arc2,
            }));
        }

        Ok(())
    }

    /// Encode to BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs are combined as `(arc1 * 40) + arc2`, remaining arcs
    /// use base-128 with the continuation bit set on every octet but the last.
    /// Arc constraints are not checked; only OIDs that pass
    /// [`validate()`](Self::validate) decode back to themselves.
    /// [`Message::encode`](crate::message::Message::encode) checks every OID
    /// it carries.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();

        match self.arcs.len() {
            0 => return bytes,
            1 => encode_subidentifier(&mut bytes, self.arcs[0].wrapping_mul(40)),
            _ => encode_subidentifier(
                &mut bytes,
                self.arcs[0].wrapping_mul(40).wrapping_add(self.arcs[1]),
            ),
        }

        for &arc in self.arcs.iter().skip(2) {
            encode_subidentifier(&mut bytes, arc);
        }

        bytes
    }

    /// Encode to BER content octets as a `Vec`.
    pub fn to_ber(&self) -> Vec<u8> {
        self.to_ber_smallvec().to_vec()
    }

    /// Decode from BER content octets.
    ///
    /// Enforces [`MAX_OID_LEN`] per RFC 2578 Section 3.5.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        // First subidentifier packs arc1*40 + arc2; may be multi-byte when arc1=2
        let (first_subid, consumed) = decode_subidentifier(data, 0)?;

        if first_subid < 40 {
            arcs.push(0);
            arcs.push(first_subid);
        } else if first_subid < 80 {
            arcs.push(1);
            arcs.push(first_subid - 40);
        } else {
            arcs.push(2);
            arcs.push(first_subid - 80);
        }

        let mut i = consumed;
        while i < data.len() {
            let (arc, bytes_consumed) = decode_subidentifier(&data[i..], i)?;
            arcs.push(arc);
            i += bytes_consumed;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    i,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u32) {
    if value == 0 {
        bytes.push(0);
        return;
    }

    let mut count = 0;
    let mut temp = value;
    while temp > 0 {
        count += 1;
        temp >>= 7;
    }

    for i in (0..count).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier, returning (value, bytes_consumed).
fn decode_subidentifier(data: &[u8], base_offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    let mut i = 0;

    loop {
        let Some(&byte) = data.get(i) else {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::TruncatedData,
            ));
        };
        i += 1;

        if value > (u32::MAX >> 7) {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::IntegerOverflow,
            ));
        }

        value = (value << 7) | ((byte & 0x7F) as u32);

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((value, i))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Slice ordering is lexicographic with the shorter prefix first.
        self.arcs.cmp(&other.arcs)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_mib_agent::oid;
///
/// let enterprises = oid!(1, 3, 6, 1, 4, 1);
/// assert_eq!(enterprises.to_string(), "1.3.6.1.4.1");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let oid = Oid::parse("1.3.6.1.4.1.99999.1.2.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 4, 1, 99999, 1, 2, 0]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Oid::parse("1.3.six.1").is_err());
        assert!(Oid::parse("1.3.-6").is_err());
    }

    #[test]
    fn test_parse_rejects_too_many_arcs() {
        let text = vec!["1"; MAX_OID_LEN + 1].join(".");
        assert!(Oid::parse(&text).is_err());
    }

    #[test]
    fn test_display() {
        let oid = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 3, 0]);
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.3.0");
    }

    #[test]
    fn test_ordering() {
        let a = oid!(1, 3, 6, 1, 4, 1, 99999, 1);
        let b = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0);
        let c = oid!(1, 3, 6, 1, 4, 1, 99999, 2);
        let d = oid!(1, 3, 6, 1, 4, 1, 100000);

        // prefix sorts first
        assert!(a < b);
        assert!(b < c);
        // arcs compare numerically, not textually
        assert!(c < d);
        assert!(oid!(1, 3, 6, 1, 9) < oid!(1, 3, 6, 1, 10));
    }

    #[test]
    fn test_starts_with() {
        let oid = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0);
        assert!(oid.starts_with(&oid!(1, 3, 6, 1, 4, 1)));
        assert!(!oid!(1, 3, 6, 1).starts_with(&oid));
        assert!(oid.starts_with(&Oid::empty()));
    }

    #[test]
    fn test_parent_child() {
        let oid = oid!(1, 3, 6, 1);
        assert_eq!(oid.child(4), oid!(1, 3, 6, 1, 4));
        assert_eq!(oid.parent(), Some(oid!(1, 3, 6)));
        assert!(Oid::empty().parent().is_none());
    }

    #[test]
    fn test_ber_encoding() {
        // 1.3.6.1 encodes as: (1*40+3)=43, 6, 1
        let oid = Oid::parse("1.3.6.1").unwrap();
        assert_eq!(oid.to_ber(), vec![0x2B, 0x06, 0x01]);

        // 99999 = 0x1869F -> 0x86 0x8D 0x1F
        let oid = oid!(1, 3, 6, 1, 4, 1, 99999);
        assert_eq!(
            oid.to_ber(),
            vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0x86, 0x8D, 0x1F]
        );
    }

    #[test]
    fn test_ber_large_second_arc() {
        // X.690 example: {2 999 3} -> first subid 1079 = 0x88 0x37
        let oid = Oid::from_slice(&[2, 999, 3]);
        assert_eq!(oid.to_ber(), vec![0x88, 0x37, 0x03]);
        assert_eq!(Oid::from_ber(&oid.to_ber()).unwrap(), oid);
    }

    #[test]
    fn test_from_ber_truncated() {
        // continuation bit set on the final byte
        assert!(Oid::from_ber(&[0x2B, 0x86]).is_err());
    }

    #[test]
    fn test_from_ber_overflow() {
        assert!(Oid::from_ber(&[0x2B, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).is_err());
    }

    #[test]
    fn test_from_ber_too_long() {
        let mut data = vec![0x2B];
        data.extend(std::iter::repeat_n(0x01, MAX_OID_LEN));
        assert!(Oid::from_ber(&data).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(oid!(1, 3, 6, 1).validate().is_ok());
        assert!(oid!(3, 0).validate().is_err());
        assert!(oid!(0, 40).validate().is_err());
        assert!(oid!(2, 999).validate().is_ok());
        assert!(Oid::empty().validate().is_ok());
        assert!(matches!(
            oid!(1).validate(),
            Err(Error::InvalidOid {
                kind: OidErrorKind::SingleArc,
                ..
            })
        ));
        assert!(oid!(2, u32::MAX - 80).validate().is_ok());
        assert!(oid!(2, u32::MAX - 79).validate().is_err());
    }

    #[test]
    fn test_validated_oids_roundtrip_ber() {
        for oid in [
            Oid::empty(),
            oid!(0, 0),
            oid!(1, 39, 7),
            oid!(2, u32::MAX - 80, u32::MAX),
        ] {
            oid.validate().unwrap();
            assert_eq!(Oid::from_ber(&oid.to_ber()).unwrap(), oid);
        }
    }
}
