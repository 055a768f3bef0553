//! SNMP Protocol Data Units (PDUs).
//!
//! [`Pdu`] covers every PDU sharing the request-id / error-status /
//! error-index / bindings layout. The SNMPv1 Trap-PDU has its own shape and
//! lives in [`TrapV1Pdu`].

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// snmpTraps (1.3.6.1.6.3.1.1.5): parent of the six standard notifications.
const SNMP_TRAPS: [u32; 9] = [1, 3, 6, 1, 6, 3, 1, 1, 5];

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::TRAP_V1 => Some(Self::TrapV1),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GetRequest => "GetRequest",
            Self::GetNextRequest => "GetNextRequest",
            Self::Response => "Response",
            Self::SetRequest => "SetRequest",
            Self::TrapV1 => "TrapV1",
            Self::GetBulkRequest => "GetBulkRequest",
            Self::InformRequest => "InformRequest",
            Self::TrapV2 => "TrapV2",
        };
        f.write_str(name)
    }
}

/// Generic PDU structure for request/response operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    /// Correlates a response with its request.
    pub request_id: i32,
    /// Error status; non-repeaters for GETBULK.
    pub error_status: i32,
    /// 1-based index of the offending binding; max-repetitions for GETBULK.
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Create a GET request PDU.
    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(
            PduType::GetRequest,
            request_id,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// Create a GETNEXT request PDU.
    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(
            PduType::GetNextRequest,
            request_id,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// Create a SET request PDU.
    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self::request(PduType::SetRequest, request_id, varbinds)
    }

    /// Create a GETBULK request PDU.
    pub fn get_bulk(
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Self {
        Self {
            pdu_type: PduType::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// Create an SNMPv2-Trap or InformRequest PDU carrying `varbinds`.
    pub fn notification(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self::request(pdu_type, request_id, varbinds)
    }

    /// GETBULK non-repeaters, clamped to `0..=varbinds.len()`.
    pub fn non_repeaters(&self) -> usize {
        (self.error_status.max(0) as usize).min(self.varbinds.len())
    }

    /// GETBULK max-repetitions, clamped to be non-negative.
    pub fn max_repetitions(&self) -> usize {
        self.error_index.max(0) as usize
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    ///
    /// The SNMPv1 Trap-PDU tag is rejected here; use [`TrapV1Pdu::decode`].
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let start = decoder.offset();
        let tag = decoder.read_tag()?;
        let pdu_type = match PduType::from_tag(tag) {
            Some(t) if t != PduType::TrapV1 => t,
            _ => {
                return Err(Error::decode(
                    start,
                    DecodeErrorKind::UnknownPduType(tag),
                ));
            }
        };

        let len = decoder.read_length()?;
        let mut pdu = decoder.sub_decoder(len)?;

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Get the error status as an enum.
    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// Build a successful Response echoing the request id.
    pub fn to_response(&self, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Build an error Response echoing the request bindings.
    pub fn to_error_response(&self, error_status: ErrorStatus, error_index: i32) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: error_status.as_i32(),
            error_index,
            varbinds: self.varbinds.clone(),
        }
    }
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GenericTrap {
    ColdStart = 0,
    WarmStart = 1,
    LinkDown = 2,
    LinkUp = 3,
    AuthenticationFailure = 4,
    EgpNeighborLoss = 5,
    /// Vendor-specific; the code is carried in `specific_trap`.
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, PartialEq)]
pub struct TrapV1Pdu {
    /// Enterprise OID of the originating entity.
    pub enterprise: Oid,
    /// IPv4 address of the originating agent.
    pub agent_addr: [u8; 4],
    pub generic_trap: i32,
    pub specific_trap: i32,
    /// sysUpTime at emission, in hundredths of a second.
    pub time_stamp: u32,
    pub varbinds: Vec<VarBind>,
}

impl TrapV1Pdu {
    /// Create a new SNMPv1 Trap PDU.
    pub fn new(
        enterprise: Oid,
        agent_addr: [u8; 4],
        generic_trap: GenericTrap,
        specific_trap: i32,
        time_stamp: u32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap: generic_trap.as_i32(),
            specific_trap,
            time_stamp,
            varbinds,
        }
    }

    /// Translate an SNMPv2 notification into a v1 Trap-PDU (RFC 3584 Section 3.2).
    ///
    /// The standard notifications `snmpTraps.k` map to generic trap `k - 1`
    /// under `default_enterprise`. Anything else is enterprise-specific: the
    /// last arc becomes the specific code and the enterprise is the remaining
    /// prefix, with a trailing `0` arc removed. Counter64 bindings have no v1
    /// encoding and are dropped.
    ///
    /// ```
    /// use snmp_mib_agent::oid;
    /// use snmp_mib_agent::pdu::TrapV1Pdu;
    ///
    /// let trap = TrapV1Pdu::from_notification(
    ///     &oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0, 1),
    ///     &oid!(1, 3, 6, 1, 4, 1, 99999),
    ///     [127, 0, 0, 1],
    ///     300,
    ///     vec![],
    /// );
    /// assert_eq!(trap.enterprise, oid!(1, 3, 6, 1, 4, 1, 99999, 1));
    /// assert_eq!((trap.generic_trap, trap.specific_trap), (6, 1));
    /// ```
    pub fn from_notification(
        trap_oid: &Oid,
        default_enterprise: &Oid,
        agent_addr: [u8; 4],
        time_stamp: u32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        let varbinds = varbinds
            .into_iter()
            .filter(|vb| !matches!(vb.value, Value::Counter64(_)))
            .collect();

        let arcs = trap_oid.arcs();
        let standard = arcs.len() == SNMP_TRAPS.len() + 1
            && arcs[..SNMP_TRAPS.len()] == SNMP_TRAPS
            && (1..=6).contains(&arcs[SNMP_TRAPS.len()]);

        if standard {
            let generic = arcs[SNMP_TRAPS.len()] as i32 - 1;
            return Self {
                enterprise: default_enterprise.clone(),
                agent_addr,
                generic_trap: generic,
                specific_trap: 0,
                time_stamp,
                varbinds,
            };
        }

        let specific = trap_oid.last().unwrap_or(0) as i32;
        let mut enterprise = trap_oid.parent().unwrap_or_else(Oid::empty);
        if enterprise.last() == Some(0)
            && let Some(parent) = enterprise.parent()
        {
            enterprise = parent;
        }

        Self {
            enterprise,
            agent_addr,
            generic_trap: GenericTrap::EnterpriseSpecific.as_i32(),
            specific_trap: specific,
            time_stamp,
            varbinds,
        }
    }

    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_unsigned32(tag::application::TIMETICKS, self.time_stamp);
            buf.push_integer(self.specific_trap);
            buf.push_integer(self.generic_trap);
            // NetworkAddress ::= CHOICE { internet IpAddress }
            buf.push_ip_address(self.agent_addr);
            buf.push_oid(&self.enterprise);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pdu = decoder.read_constructed(tag::pdu::TRAP_V1)?;

        let enterprise = pdu.read_oid()?;
        let agent_addr = pdu.read_ip_address()?;
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let time_stamp = pdu.read_unsigned32(tag::application::TIMETICKS)?;
        let varbinds = decode_varbind_list(&mut pdu)?;

        Ok(TrapV1Pdu {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}
