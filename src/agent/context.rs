//! Per-request state threaded through the dispatcher.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::ErrorStatus;
use crate::pdu::{Pdu, PduType};
use crate::version::Version;

/// What the dispatcher knows about the request being served.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Source address of the request.
    pub source: SocketAddr,
    pub version: Version,
    /// Community string the request carried.
    pub community: Bytes,
    /// Request ID from the PDU.
    pub request_id: i32,
    pub pdu_type: PduType,
}

impl RequestContext {
    pub(crate) fn new(source: SocketAddr, version: Version, community: Bytes, pdu: &Pdu) -> Self {
        Self {
            source,
            version,
            community,
            request_id: pdu.request_id,
            pdu_type: pdu.pdu_type,
        }
    }

    /// `status` as it must appear on the wire for this request's version.
    pub fn wire_status(&self, status: ErrorStatus) -> ErrorStatus {
        match self.version {
            Version::V1 => status.to_v1(),
            Version::V2c => status,
        }
    }

    /// Error response echoing the request bindings, with `status` mapped for v1.
    ///
    /// `index` is the 0-based position of the offending binding, or `None`
    /// for a PDU-level error.
    pub(crate) fn error_response(
        &self,
        pdu: &Pdu,
        status: ErrorStatus,
        index: Option<usize>,
    ) -> Pdu {
        let error_index = index.map_or(0, |i| (i + 1) as i32);
        pdu.to_error_response(self.wire_status(status), error_index)
    }
}
