//! GET, GETNEXT and GETBULK against the MIB tree.

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

use super::vacm::AccessMode;
use super::{Agent, RequestContext};

/// Fixed part of a response message (version, PDU header, sequence
/// headers), excluding the community string and the bindings.
const RESPONSE_OVERHEAD: usize = 100;

impl Agent {
    /// Index of the first binding the community may not read, if any.
    fn first_unreadable(&self, ctx: &RequestContext, pdu: &Pdu) -> Option<usize> {
        pdu.varbinds.iter().position(|vb| {
            !self
                .inner
                .vacm
                .authorize(&ctx.community, &vb.oid, AccessMode::Read)
        })
    }

    /// Handle GET request.
    ///
    /// Authorization is checked for every binding before any value is read,
    /// so a denied request reveals nothing about what exists.
    pub(super) fn handle_get(&self, ctx: &RequestContext, pdu: &Pdu) -> Pdu {
        if let Some(index) = self.first_unreadable(ctx, pdu) {
            tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %ctx.source, snmp.request_id = ctx.request_id, snmp.oid = %pdu.varbinds[index].oid }, "read access denied");
            return ctx.error_response(pdu, ErrorStatus::NoAccess, Some(index));
        }

        let mib = &self.inner.mib;
        let mut response_varbinds = Vec::with_capacity(pdu.varbinds.len());

        for (index, vb) in pdu.varbinds.iter().enumerate() {
            let value = match mib.lookup(&vb.oid) {
                Some(object) => mib.read(object),
                None => Value::NoSuchObject,
            };

            // v1 has neither exception values nor Counter64 (RFC 2576 Section 4.1.2.1)
            if ctx.version == Version::V1
                && (value.is_exception() || matches!(value, Value::Counter64(_)))
            {
                return ctx.error_response(pdu, ErrorStatus::NoSuchName, Some(index));
            }

            response_varbinds.push(VarBind::new(vb.oid.clone(), value));
        }

        pdu.to_response(response_varbinds)
    }

    /// Handle GETNEXT request.
    pub(super) fn handle_get_next(&self, ctx: &RequestContext, pdu: &Pdu) -> Pdu {
        let mut response_varbinds = Vec::with_capacity(pdu.varbinds.len());

        for (index, vb) in pdu.varbinds.iter().enumerate() {
            match self.next_readable(ctx, &vb.oid) {
                Some(next_vb) => response_varbinds.push(next_vb),
                None if ctx.version == Version::V1 => {
                    return ctx.error_response(pdu, ErrorStatus::NoSuchName, Some(index));
                }
                None => response_varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
            }
        }

        pdu.to_response(response_varbinds)
    }

    /// Handle GETBULK request.
    ///
    /// Per RFC 3416 Section 4.2.3, if the response would exceed the message
    /// size limit, we return fewer variable bindings rather than all of them.
    pub(super) fn handle_get_bulk(&self, ctx: &RequestContext, pdu: &Pdu) -> Pdu {
        let non_repeaters = pdu.non_repeaters();
        let max_repetitions = pdu.max_repetitions();

        let mut response_varbinds = Vec::new();
        let mut current_size: usize = RESPONSE_OVERHEAD + ctx.community.len();
        let max_size = self.inner.max_message_size;

        let can_add = |vb: &VarBind, current_size: usize| -> bool {
            current_size + vb.encoded_size() <= max_size
        };

        // Non-repeaters: one GETNEXT each
        for vb in &pdu.varbinds[..non_repeaters] {
            let next_vb = self
                .next_readable(ctx, &vb.oid)
                .unwrap_or_else(|| VarBind::new(vb.oid.clone(), Value::EndOfMibView));

            if !can_add(&next_vb, current_size) {
                return ctx.error_response(pdu, ErrorStatus::TooBig, None);
            }

            current_size += next_vb.encoded_size();
            response_varbinds.push(next_vb);
        }

        // Repeaters, interleaved row by row
        let repeaters = &pdu.varbinds[non_repeaters..];
        if !repeaters.is_empty() {
            let mut current_oids: Vec<Oid> = repeaters.iter().map(|vb| vb.oid.clone()).collect();
            let mut all_done = vec![false; repeaters.len()];

            'outer: for _ in 0..max_repetitions {
                let mut row_complete = true;
                for (i, oid) in current_oids.iter_mut().enumerate() {
                    let next_vb = if all_done[i] {
                        VarBind::new(oid.clone(), Value::EndOfMibView)
                    } else {
                        match self.next_readable(ctx, oid) {
                            Some(next_vb) => {
                                *oid = next_vb.oid.clone();
                                row_complete = false;
                                next_vb
                            }
                            None => {
                                all_done[i] = true;
                                VarBind::new(oid.clone(), Value::EndOfMibView)
                            }
                        }
                    };

                    if !can_add(&next_vb, current_size) {
                        tracing::trace!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, bindings = response_varbinds.len() }, "GETBULK response truncated");
                        break 'outer;
                    }

                    current_size += next_vb.encoded_size();
                    response_varbinds.push(next_vb);
                }

                if row_complete {
                    break;
                }
            }
        }

        pdu.to_response(response_varbinds)
    }

    /// Next registered object after `oid` that the community may read.
    ///
    /// For v1 requests Counter64 objects are skipped, since they cannot be
    /// represented in an SNMPv1 response.
    fn next_readable(&self, ctx: &RequestContext, oid: &Oid) -> Option<VarBind> {
        let mib = &self.inner.mib;
        let mut cursor = oid;

        loop {
            let (next, object) = mib.lookup_next(cursor)?;
            cursor = next;

            if !self
                .inner
                .vacm
                .authorize(&ctx.community, next, AccessMode::Read)
            {
                continue;
            }

            let value = mib.read(object);
            if ctx.version == Version::V1 && matches!(value, Value::Counter64(_)) {
                continue;
            }
            return Some(VarBind::new(next.clone(), value));
        }
    }
}
