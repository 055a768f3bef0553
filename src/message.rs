//! Community-based SNMP message format (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, data PDU }`
//!
//! Both versions share this layout and differ only in the version number.
//! Any other version number, SNMPv3 included, fails to decode.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::value::Value;
use crate::version::Version;
use bytes::Bytes;

/// The PDU carried by a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePdu {
    /// Any PDU with the common request/response layout.
    Generic(Pdu),
    /// SNMPv1 Trap-PDU.
    TrapV1(TrapV1Pdu),
}

impl MessagePdu {
    /// PDU type of the carried PDU.
    pub fn pdu_type(&self) -> PduType {
        match self {
            MessagePdu::Generic(pdu) => pdu.pdu_type,
            MessagePdu::TrapV1(_) => PduType::TrapV1,
        }
    }

    fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            MessagePdu::Generic(pdu) => pdu.encode(buf),
            MessagePdu::TrapV1(trap) => trap.encode(buf),
        }
    }
}

impl From<Pdu> for MessagePdu {
    fn from(pdu: Pdu) -> Self {
        MessagePdu::Generic(pdu)
    }
}

impl From<TrapV1Pdu> for MessagePdu {
    fn from(trap: TrapV1Pdu) -> Self {
        MessagePdu::TrapV1(trap)
    }
}

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: Version,
    /// Cleartext community string.
    pub community: Bytes,
    pub pdu: MessagePdu,
}

impl Message {
    /// Create a new community message.
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self {
            version,
            community: community.into(),
            pdu: pdu.into(),
        }
    }

    /// Create a v2c message.
    pub fn v2c(community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self::new(Version::V2c, community, pdu)
    }

    /// Create a v1 message.
    pub fn v1(community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self::new(Version::V1, community, pdu)
    }

    /// The generic PDU, if this message carries one.
    pub fn generic_pdu(&self) -> Option<&Pdu> {
        match &self.pdu {
            MessagePdu::Generic(pdu) => Some(pdu),
            MessagePdu::TrapV1(_) => None,
        }
    }

    /// Encode to BER.
    ///
    /// Fails with [`Error::InvalidOid`] if any binding name, OID value or
    /// trap enterprise would not decode back to itself (see
    /// [`Oid::validate`]).
    ///
    /// ```
    /// use snmp_mib_agent::{Message, Pdu, Value, VarBind, oid};
    ///
    /// let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), Value::ObjectIdentifier(oid!(1)));
    /// let msg = Message::v2c(&b"public"[..], Pdu::get_request(1, &[]).to_response(vec![vb]));
    /// assert!(msg.encode().is_err());
    /// ```
    pub fn encode(&self) -> Result<Bytes> {
        self.validate_oids()?;

        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });

        Ok(buf.finish())
    }

    fn validate_oids(&self) -> Result<()> {
        let (enterprise, varbinds) = match &self.pdu {
            MessagePdu::Generic(pdu) => (None, &pdu.varbinds),
            MessagePdu::TrapV1(trap) => (Some(&trap.enterprise), &trap.varbinds),
        };

        if let Some(enterprise) = enterprise {
            enterprise.validate()?;
        }
        for vb in varbinds {
            vb.oid.validate()?;
            if let Value::ObjectIdentifier(oid) = &vb.value {
                oid.validate()?;
            }
        }
        Ok(())
    }

    /// Decode from BER.
    ///
    /// ```
    /// use snmp_mib_agent::{Message, Pdu, Version, oid};
    ///
    /// let msg = Message::v2c(&b"public"[..], Pdu::get_request(1, &[oid!(1, 3, 6, 1, 4, 1)]));
    /// let decoded = Message::decode(msg.encode().unwrap()).unwrap();
    /// assert_eq!(decoded, msg);
    /// assert_eq!(decoded.version, Version::V2c);
    /// ```
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let version_offset = seq.offset();
        let version_num = seq.read_integer()?;
        let version = Version::from_i32(version_num).ok_or_else(|| {
            Error::decode(version_offset, DecodeErrorKind::UnknownVersion(version_num))
        })?;

        let community = seq.read_octet_string()?;

        let pdu = if seq.peek_tag() == Some(tag::pdu::TRAP_V1) {
            MessagePdu::TrapV1(TrapV1Pdu::decode(&mut seq)?)
        } else {
            MessagePdu::Generic(Pdu::decode(&mut seq)?)
        };

        Ok(Message {
            version,
            community,
            pdu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::GenericTrap;
    use crate::varbind::VarBind;

    #[test]
    fn test_version_preserved() {
        for version in [Version::V1, Version::V2c] {
            let pdu = Pdu::get_request(1, &[oid!(1, 3, 6, 1)]);
            let msg = Message::new(version, &b"public"[..], pdu);
            let decoded = Message::decode(msg.encode().unwrap()).unwrap();
            assert_eq!(decoded.version, version);
            assert_eq!(decoded.community.as_ref(), b"public");
        }
    }

    #[test]
    fn test_trap_v1_message() {
        let trap = TrapV1Pdu::new(
            oid!(1, 3, 6, 1, 4, 1, 99999, 1),
            [127, 0, 0, 1],
            GenericTrap::EnterpriseSpecific,
            1,
            500,
            vec![VarBind::null(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0))],
        );
        let msg = Message::v1(&b"traps"[..], trap);
        let decoded = Message::decode(msg.encode().unwrap()).unwrap();
        assert_eq!(decoded.pdu.pdu_type(), PduType::TrapV1);
        assert!(decoded.generic_pdu().is_none());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_v3_rejected() {
        // SEQUENCE { INTEGER 3, ... }
        let data = Bytes::from_static(&[0x30, 0x05, 0x02, 0x01, 0x03, 0x04, 0x00]);
        let err = Message::decode(data).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                offset: 2,
                kind: DecodeErrorKind::UnknownVersion(3)
            }
        ));
    }

    #[test]
    fn test_unencodable_oids_rejected() {
        let cases = [
            // binding name
            Message::v2c(&b"public"[..], Pdu::get_request(1, &[oid!(1)])),
            // OID value
            Message::v2c(
                &b"public"[..],
                Pdu::set_request(
                    2,
                    vec![VarBind::new(
                        oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0),
                        Value::ObjectIdentifier(oid!(0, 40, 1)),
                    )],
                ),
            ),
            // trap enterprise
            Message::v1(
                &b"traps"[..],
                TrapV1Pdu::new(
                    oid!(2, u32::MAX),
                    [127, 0, 0, 1],
                    GenericTrap::EnterpriseSpecific,
                    1,
                    0,
                    vec![],
                ),
            ),
        ];

        for msg in cases {
            assert!(matches!(msg.encode(), Err(Error::InvalidOid { .. })));
        }
    }

    #[test]
    fn test_truncated_message() {
        let msg = Message::v2c(&b"public"[..], Pdu::get_request(5, &[oid!(1, 3, 6, 1)]));
        let encoded = msg.encode().unwrap();
        for len in 0..encoded.len() {
            assert!(
                Message::decode(encoded.slice(..len)).is_err(),
                "prefix of {} bytes decoded",
                len
            );
        }
    }
}
