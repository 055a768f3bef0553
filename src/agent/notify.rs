//! Notification origination: SNMPv1 traps, SNMPv2 traps and informs.
//!
//! A [`NotificationType`] names a notification OID and the objects whose
//! current values travel with it. [`Agent::emit_trap`] renders it once per
//! [`TrapTarget`] in the form that target speaks:
//!
//! - v2c trap or inform: `sysUpTime.0`, `snmpTrapOID.0`, the object values,
//!   then any extra bindings.
//! - v1 trap: a Trap-PDU translated per RFC 3584 Section 3.2.
//!
//! Traps leave through the agent socket. Informs each get their own
//! ephemeral socket and are re-sent on timeout until acknowledged or out of
//! retries.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::message::{Message, MessagePdu};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

use super::Agent;

/// sysUpTime.0
pub const SYS_UPTIME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];

/// snmpTrapOID.0
pub const SNMP_TRAP_OID: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0];

/// Default port notifications are sent to.
pub const DEFAULT_TRAP_PORT: u16 = 162;

/// A declared notification (the `NOTIFICATION-TYPE` macro).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationType {
    pub name: Box<str>,
    /// Notification OID, sent as the value of `snmpTrapOID.0`.
    pub oid: Oid,
    /// Objects whose values are bound into every emission, in order.
    pub objects: Vec<Oid>,
}

impl NotificationType {
    pub fn new(name: impl Into<Box<str>>, oid: Oid) -> Self {
        Self {
            name: name.into(),
            oid,
            objects: Vec::new(),
        }
    }

    /// Append an object to the `OBJECTS` clause.
    pub fn object(mut self, oid: Oid) -> Self {
        self.objects.push(oid);
        self
    }
}

/// How a notification is delivered to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Unconfirmed; sent once.
    #[default]
    Trap,
    /// Confirmed InformRequest, re-sent every `timeout` up to `retries` times.
    Inform { timeout: Duration, retries: u32 },
}

/// A manager that receives notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapTarget {
    pub address: SocketAddr,
    pub community: Bytes,
    pub version: Version,
    pub delivery: Delivery,
}

impl TrapTarget {
    /// SNMPv2c trap target.
    pub fn new(address: SocketAddr, community: impl Into<Bytes>) -> Self {
        Self {
            address,
            community: community.into(),
            version: Version::V2c,
            delivery: Delivery::Trap,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Deliver as InformRequest instead of a trap.
    pub fn inform(mut self, timeout: Duration, retries: u32) -> Self {
        self.delivery = Delivery::Inform { timeout, retries };
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.version == Version::V1 && matches!(self.delivery, Delivery::Inform { .. }) {
            return Err(Error::Config(
                format!("inform delivery to {} requires SNMPv2c", self.address).into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one [`Agent::emit_trap`] call, counted per target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Targets a notification was handed to the socket for.
    pub sent: usize,
    /// Inform targets that answered with a Response.
    pub acknowledged: usize,
    /// Targets that could not be sent to, or informs that were never answered.
    pub failed: usize,
}

impl Agent {
    /// Emit the notification declared as `name` to every configured target.
    ///
    /// Object values are read under the MIB guard at the time of the call.
    /// Returns once traps are sent and every inform has been acknowledged or
    /// given up on.
    pub async fn emit_trap(&self, name: &str, extra: Vec<VarBind>) -> Result<NotifyReport> {
        let notification = self
            .inner
            .notifications
            .iter()
            .find(|n| &*n.name == name)
            .ok_or_else(|| Error::UnknownNotification { name: name.into() })?;

        let uptime = self.uptime();
        let mib = &self.inner.mib;
        let mut payload: Vec<VarBind> = notification
            .objects
            .iter()
            .map(|oid| VarBind::new(oid.clone(), mib.get(oid).unwrap_or(Value::NoSuchObject)))
            .collect();
        payload.extend(extra);

        // Every target's message must fit before anything goes out.
        let mut outgoing = Vec::with_capacity(self.inner.trap_targets.len());
        for target in &self.inner.trap_targets {
            let request_id = self.next_request_id();
            let data = self
                .notification_message(target, notification, uptime, request_id, &payload)
                .encode()?;
            if data.len() > self.inner.max_message_size {
                return Err(Error::MessageTooLarge {
                    size: data.len(),
                    max: self.inner.max_message_size,
                });
            }
            outgoing.push((target, request_id, data));
        }

        let mut report = NotifyReport::default();
        let mut informs = JoinSet::new();

        for (target, request_id, data) in outgoing {
            match target.delivery {
                Delivery::Trap => match self.inner.socket.send_to(&data, target.address).await {
                    Ok(_) => {
                        self.inner.counters.out_traps.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(target: "snmp_mib_agent::notify", { notification = %notification.name, snmp.target = %target.address, snmp.version = %target.version }, "trap sent");
                        report.sent += 1;
                    }
                    Err(e) => {
                        tracing::warn!(target: "snmp_mib_agent::notify", { notification = %notification.name, snmp.target = %target.address, error = %e }, "failed to send trap");
                        report.failed += 1;
                    }
                },
                Delivery::Inform { timeout, retries } => {
                    let address = target.address;
                    let name = notification.name.clone();
                    informs.spawn(async move {
                        let outcome =
                            send_inform(address, data, request_id, timeout, retries).await;
                        if let Err(e) = &outcome {
                            tracing::warn!(target: "snmp_mib_agent::notify", { notification = %name, snmp.target = %address, error = %e }, "failed to send inform");
                        }
                        outcome
                    });
                }
            }
        }

        while let Some(joined) = informs.join_next().await {
            match joined {
                Ok(Ok(acknowledged)) => {
                    self.inner.counters.out_traps.fetch_add(1, Ordering::Relaxed);
                    report.sent += 1;
                    if acknowledged {
                        report.acknowledged += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Ok(Err(_)) | Err(_) => report.failed += 1,
            }
        }

        Ok(report)
    }

    fn next_request_id(&self) -> i32 {
        self.inner.next_request_id.fetch_add(1, Ordering::Relaxed) & i32::MAX
    }

    fn notification_message(
        &self,
        target: &TrapTarget,
        notification: &NotificationType,
        uptime: u32,
        request_id: i32,
        payload: &[VarBind],
    ) -> Message {
        let pdu: MessagePdu = match (target.version, target.delivery) {
            (Version::V1, _) => TrapV1Pdu::from_notification(
                &notification.oid,
                self.inner.mib.enterprise(),
                self.agent_addr(),
                uptime,
                payload.to_vec(),
            )
            .into(),
            (Version::V2c, delivery) => {
                let pdu_type = match delivery {
                    Delivery::Trap => PduType::TrapV2,
                    Delivery::Inform { .. } => PduType::InformRequest,
                };
                let mut varbinds = Vec::with_capacity(payload.len() + 2);
                varbinds.push(VarBind::new(Oid::from_slice(SYS_UPTIME), Value::TimeTicks(uptime)));
                varbinds.push(VarBind::new(
                    Oid::from_slice(SNMP_TRAP_OID),
                    Value::ObjectIdentifier(notification.oid.clone()),
                ));
                varbinds.extend_from_slice(payload);
                Pdu::notification(pdu_type, request_id, varbinds).into()
            }
        };

        Message::new(target.version, target.community.clone(), pdu)
    }

    /// IPv4 address advertised in v1 Trap-PDUs.
    fn agent_addr(&self) -> [u8; 4] {
        match self.inner.local_addr.ip() {
            IpAddr::V4(ip) => ip.octets(),
            IpAddr::V6(ip) => ip.to_ipv4_mapped().map_or([0; 4], |ip| ip.octets()),
        }
    }
}

/// Send an inform and wait for the matching Response.
///
/// Returns `Ok(false)` when every attempt timed out.
async fn send_inform(
    target: SocketAddr,
    data: Bytes,
    request_id: i32,
    timeout: Duration,
    retries: u32,
) -> Result<bool> {
    let bind: SocketAddr = if target.is_ipv4() {
        (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind)
        .await
        .map_err(|e| Error::transport(Some(target), e))?;

    let mut buf = vec![0u8; 65535];
    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::debug!(target: "snmp_mib_agent::notify", { snmp.target = %target, snmp.request_id = request_id, attempt }, "retrying inform");
        }
        socket
            .send_to(&data, target)
            .await
            .map_err(|e| Error::transport(Some(target), e))?;

        let acknowledged = tokio::time::timeout(timeout, async {
            loop {
                let (len, source) = socket.recv_from(&mut buf).await?;
                if source != target {
                    continue;
                }
                let Ok(message) = Message::decode(Bytes::copy_from_slice(&buf[..len])) else {
                    continue;
                };
                if let Some(pdu) = message.generic_pdu()
                    && pdu.pdu_type == PduType::Response
                    && pdu.request_id == request_id
                {
                    return Ok::<_, std::io::Error>(());
                }
            }
        })
        .await;

        match acknowledged {
            Ok(Ok(())) => return Ok(true),
            Ok(Err(e)) => return Err(Error::transport(Some(target), e)),
            Err(_elapsed) => {}
        }
    }

    tracing::warn!(target: "snmp_mib_agent::notify", { snmp.target = %target, snmp.request_id = request_id, retries }, "inform not acknowledged, giving up");
    Ok(false)
}
