//! Two-phase SET commit protocol (RFC 3416).

use crate::error::ErrorStatus;
use crate::mib::ManagedObject;
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::value::Value;

use super::vacm::AccessMode;
use super::{Agent, RequestContext};

impl Agent {
    /// Handle SET request with two-phase commit protocol.
    ///
    /// Per RFC 3416, SET operations should be atomic. We implement this via:
    /// 1. **Test phase**: authorize, look up and test ALL varbinds. If any
    ///    fails, abort before touching the MIB.
    /// 2. **Commit phase**: write each varbind. If a write fails, restore the
    ///    previously committed objects to the values they held before the SET.
    pub(super) fn handle_set(&self, ctx: &RequestContext, pdu: &Pdu) -> Pdu {
        struct PendingSet<'a> {
            oid: &'a Oid,
            object: &'a ManagedObject,
            value: &'a Value,
        }

        let mib = &self.inner.mib;
        let mut pending: Vec<PendingSet> = Vec::with_capacity(pdu.varbinds.len());

        // ========== PHASE 1: TEST ==========
        for (index, vb) in pdu.varbinds.iter().enumerate() {
            if !self
                .inner
                .vacm
                .authorize(&ctx.community, &vb.oid, AccessMode::Write)
            {
                tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %ctx.source, snmp.request_id = ctx.request_id, snmp.oid = %vb.oid }, "write access denied");
                return ctx.error_response(pdu, ErrorStatus::NoAccess, Some(index));
            }

            let Some(object) = mib.lookup(&vb.oid) else {
                return ctx.error_response(pdu, ErrorStatus::NotWritable, Some(index));
            };

            let result = object.test(&vb.value);
            if !result.is_ok() {
                tracing::debug!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, snmp.oid = %vb.oid, status = %result.to_error_status() }, "SET test failed");
                return ctx.error_response(pdu, result.to_error_status(), Some(index));
            }

            pending.push(PendingSet {
                oid: &vb.oid,
                object,
                value: &vb.value,
            });
        }

        // ========== PHASE 2: COMMIT ==========
        let mut committed: Vec<(&PendingSet, Value)> = Vec::with_capacity(pending.len());

        for (index, p) in pending.iter().enumerate() {
            let previous = mib.read(p.object);

            if let Err(result) = mib.write(p.object, p.value.clone()) {
                tracing::warn!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, snmp.oid = %p.oid, status = %result.to_error_status() }, "SET commit failed, rolling back");

                let mut status = ErrorStatus::CommitFailed;
                for (c, old) in committed.iter().rev() {
                    if mib.write(c.object, old.clone()).is_err() {
                        tracing::warn!(target: "snmp_mib_agent::agent", { snmp.oid = %c.oid }, "SET undo failed");
                        status = ErrorStatus::UndoFailed;
                    }
                }

                return ctx.error_response(pdu, status, Some(index));
            }

            committed.push((p, previous));
        }

        pdu.to_response(pdu.varbinds.clone())
    }
}

