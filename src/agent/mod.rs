//! SNMP agent (RFC 3416 command responder and notification originator).
//!
//! The agent serves a [`MibTree`] over UDP. Every datagram is handled in its
//! own task: decode, authorize, execute against the tree, encode, reply.
//!
//! # Features
//!
//! - **Atomic SET**: two-phase test/commit with undo per RFC 3416
//! - **Access control**: community views, see [`vacm`]
//! - **Notifications**: v1/v2c traps and informs via [`Agent::emit_trap`]
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_mib_agent::agent::Agent;
//! use snmp_mib_agent::{ManagedObject, Syntax, Value, oid};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_mib_agent::Error> {
//!     let agent = Agent::builder()
//!         .bind("0.0.0.0:1161")
//!         .enterprise(oid!(1, 3, 6, 1, 4, 1, 99999))
//!         .read_community("public")
//!         .write_community("private")
//!         .object(
//!             oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0),
//!             ManagedObject::read_only(Syntax::OctetString, || Value::from("My SNMP Agent")),
//!         )
//!         .object(
//!             oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0),
//!             ManagedObject::variable(Syntax::Integer, Value::Integer(0)),
//!         )
//!         .build()
//!         .await?;
//!
//!     agent.run().await
//! }
//! ```

mod context;
mod get_handler;
mod notify;
mod periodic;
mod set_handler;
pub mod vacm;

pub use context::RequestContext;
pub use notify::{
    DEFAULT_TRAP_PORT, Delivery, NotificationType, NotifyReport, SNMP_TRAP_OID, SYS_UPTIME,
    TrapTarget,
};
pub use periodic::PeriodicTask;
pub use vacm::{AccessMode, Vacm, VacmBuilder, VacmEntry, View, ViewSubtree};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::{AgentConfig, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RECV_BUFFER_SIZE};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::message::{Message, MessagePdu};
use crate::mib::{ManagedObject, MibTree};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::util::bind_udp_socket;
use crate::version::Version;

/// Builder for [`Agent`].
///
/// Objects, notifications and access rules are collected here and frozen by
/// [`build()`](AgentBuilder::build); the agent's MIB has a fixed set of OIDs.
pub struct AgentBuilder {
    bind_addr: String,
    max_message_size: usize,
    max_concurrent_requests: Option<usize>,
    recv_buffer_size: Option<usize>,
    enterprise: Oid,
    objects: Vec<(Oid, ManagedObject)>,
    notifications: Vec<NotificationType>,
    trap_targets: Vec<TrapTarget>,
    read_communities: Vec<Bytes>,
    write_communities: Vec<Bytes>,
    vacm: Option<Vacm>,
    cancel: Option<CancellationToken>,
}

impl AgentBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:161` (UDP)
    /// - Max message size: 1472 bytes (Ethernet MTU - IP/UDP headers)
    /// - Max concurrent requests: unbounded
    /// - Receive buffer size: 4MB (requested from kernel)
    /// - Enterprise: `1.3.6.1.4.1`
    /// - No communities (all requests rejected)
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:161".to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_concurrent_requests: None,
            recv_buffer_size: Some(DEFAULT_RECV_BUFFER_SIZE),
            enterprise: Oid::from_slice(&[1, 3, 6, 1, 4, 1]),
            objects: Vec::new(),
            notifications: Vec::new(),
            trap_targets: Vec::new(),
            read_communities: Vec::new(),
            write_communities: Vec::new(),
            vacm: None,
            cancel: None,
        }
    }

    /// Set the UDP bind address.
    ///
    /// Default is `0.0.0.0:161`. Binding port 161 typically requires
    /// privileges. Use `[::]:port` for dual-stack.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the maximum message size for responses.
    ///
    /// GETBULK responses are truncated to fit; other responses that do not
    /// fit are answered with `tooBig`.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Bound the number of datagrams handled at once.
    ///
    /// Default is `None` (unbounded). With a limit, the receive loop waits
    /// for a slot before reading the next datagram.
    pub fn max_concurrent_requests(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    /// Set the UDP socket receive buffer size.
    ///
    /// Default is 4MB. The kernel may cap this at `net.core.rmem_max`.
    /// Set to `None` to use the kernel default.
    pub fn recv_buffer_size(mut self, size: Option<usize>) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Root of the subtree every object must live under.
    pub fn enterprise(mut self, oid: Oid) -> Self {
        self.enterprise = oid;
        self
    }

    /// Register a managed object.
    pub fn object(mut self, oid: Oid, object: ManagedObject) -> Self {
        self.objects.push((oid, object));
        self
    }

    /// Declare a notification that [`Agent::emit_trap`] can send.
    pub fn notification(mut self, notification: NotificationType) -> Self {
        self.notifications.push(notification);
        self
    }

    /// Add a notification receiver.
    pub fn trap_target(mut self, target: TrapTarget) -> Self {
        self.trap_targets.push(target);
        self
    }

    /// Grant `community` read access to the enterprise subtree.
    pub fn read_community(mut self, community: impl Into<Bytes>) -> Self {
        self.read_communities.push(community.into());
        self
    }

    /// Grant `community` read and write access to the enterprise subtree.
    pub fn write_community(mut self, community: impl Into<Bytes>) -> Self {
        self.write_communities.push(community.into());
        self
    }

    /// Configure access control using a builder function.
    ///
    /// Entries added here sit alongside those from
    /// [`read_community`](Self::read_community) and
    /// [`write_community`](Self::write_community).
    ///
    /// ```rust,no_run
    /// use snmp_mib_agent::agent::{Agent, View};
    /// use snmp_mib_agent::oid;
    ///
    /// # async fn example() -> Result<(), snmp_mib_agent::Error> {
    /// let agent = Agent::builder()
    ///     .bind("127.0.0.1:1161")
    ///     .vacm(|v| v
    ///         .read_only("public", oid!(1, 3, 6, 1, 4, 1))
    ///         .entry("ops", |e| e
    ///             .read_view(View::new().include(oid!(1, 3, 6, 1, 4, 1)))
    ///             .write_view(View::new().include(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2)))))
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn vacm<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(VacmBuilder) -> VacmBuilder,
    {
        self.vacm = Some(configure(VacmBuilder::new()).build());
        self
    }

    /// Set a cancellation token for graceful shutdown.
    ///
    /// If not set, the agent creates its own token accessible via `Agent::cancel()`.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Apply plain-data configuration, resolving trap target addresses.
    pub async fn config(mut self, config: &AgentConfig) -> Result<Self> {
        self.bind_addr = config.bind_address.clone();
        self.max_message_size = config.max_message_size;
        self.recv_buffer_size = config.recv_buffer_size;
        self.enterprise = Oid::parse(&config.enterprise_oid)?;
        if let Some(community) = &config.read_community {
            self = self.read_community(community.clone().into_bytes());
        }
        if let Some(community) = &config.write_community {
            self = self.write_community(community.clone().into_bytes());
        }
        for target in &config.trap_targets {
            let target = target.resolve().await?;
            self = self.trap_target(target);
        }
        Ok(self)
    }

    /// Build the agent and bind its socket.
    pub async fn build(self) -> Result<Agent> {
        let bind_addr: SocketAddr = self.bind_addr.parse().map_err(|_| {
            Error::Config(format!("invalid bind address: {}", self.bind_addr).into())
        })?;

        self.enterprise.validate()?;
        let mut mib = MibTree::new(self.enterprise.clone());
        for (oid, object) in self.objects {
            mib.register(oid, object)?;
        }

        for (i, notification) in self.notifications.iter().enumerate() {
            if self.notifications[..i]
                .iter()
                .any(|n| n.name == notification.name)
            {
                return Err(Error::Config(
                    format!("notification {} declared twice", notification.name).into(),
                ));
            }
            if let Some(missing) = notification
                .objects
                .iter()
                .find(|oid| mib.lookup(oid).is_none())
            {
                return Err(Error::Config(
                    format!(
                        "notification {} binds unregistered object {}",
                        notification.name, missing
                    )
                    .into(),
                ));
            }
        }

        for target in &self.trap_targets {
            target.validate()?;
        }

        let mut vacm = self.vacm.unwrap_or_default();
        for community in self.read_communities {
            vacm.add_entry(
                VacmEntry::new(community).read_view(View::new().include(self.enterprise.clone())),
            );
        }
        for community in self.write_communities {
            vacm.add_entry(
                VacmEntry::new(community)
                    .read_view(View::new().include(self.enterprise.clone()))
                    .write_view(View::new().include(self.enterprise.clone())),
            );
        }
        if vacm.is_empty() {
            tracing::warn!(target: "snmp_mib_agent::agent", "no communities configured, every request will be rejected");
        }

        let socket = bind_udp_socket(bind_addr, self.recv_buffer_size)
            .map_err(|e| Error::transport(Some(bind_addr), e))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| Error::transport(Some(bind_addr), e))?;

        let cancel = self.cancel.unwrap_or_default();

        let concurrency_limit = self
            .max_concurrent_requests
            .map(|n| Arc::new(Semaphore::new(n)));

        tracing::info!(target: "snmp_mib_agent::agent", { snmp.local_addr = %local_addr, objects = mib.len(), enterprise = %mib.enterprise() }, "agent bound");

        Ok(Agent {
            inner: Arc::new(AgentInner {
                socket,
                local_addr,
                mib: Arc::new(mib),
                vacm,
                notifications: self.notifications,
                trap_targets: self.trap_targets,
                max_message_size: self.max_message_size,
                concurrency_limit,
                started: Instant::now(),
                next_request_id: AtomicI32::new(1),
                counters: Counters::default(),
                cancel,
            }),
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// RFC 3418 snmp group counters (subset).
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) in_pkts: AtomicU32,
    pub(crate) in_bad_versions: AtomicU32,
    pub(crate) in_bad_community_names: AtomicU32,
    pub(crate) in_asn_parse_errs: AtomicU32,
    pub(crate) silent_drops: AtomicU32,
    pub(crate) out_traps: AtomicU32,
}

/// Snapshot of the agent's statistics counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// snmpInPkts: every datagram received.
    pub in_pkts: u32,
    /// snmpInBadVersions: messages with a version other than v1/v2c.
    pub in_bad_versions: u32,
    /// snmpInBadCommunityNames: messages with an unknown community.
    pub in_bad_community_names: u32,
    /// snmpInASNParseErrs: messages that failed to decode.
    pub in_asn_parse_errs: u32,
    /// snmpSilentDrops: requests whose response could not be made to fit.
    pub silent_drops: u32,
    /// snmpOutTraps: notifications sent.
    pub out_traps: u32,
}

/// Inner state shared across agent clones.
pub(crate) struct AgentInner {
    pub(crate) socket: UdpSocket,
    pub(crate) local_addr: SocketAddr,
    pub(crate) mib: Arc<MibTree>,
    pub(crate) vacm: Vacm,
    pub(crate) notifications: Vec<NotificationType>,
    pub(crate) trap_targets: Vec<TrapTarget>,
    pub(crate) max_message_size: usize,
    pub(crate) concurrency_limit: Option<Arc<Semaphore>>,
    pub(crate) started: Instant,
    pub(crate) next_request_id: AtomicI32,
    pub(crate) counters: Counters,
    /// Cancellation token for graceful shutdown.
    pub(crate) cancel: CancellationToken,
}

/// SNMP Agent.
///
/// Cheap to clone; clones share the socket, the MIB and the counters.
#[derive(Clone)]
pub struct Agent {
    pub(crate) inner: Arc<AgentInner>,
}

impl Agent {
    /// Create a builder for configuring the agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Get the local address the agent is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// The MIB tree served by this agent, for background producers.
    pub fn mib(&self) -> &Arc<MibTree> {
        &self.inner.mib
    }

    /// Get the cancellation token for this agent.
    ///
    /// Call `token.cancel()` to initiate graceful shutdown.
    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Stop [`run`](Self::run) and every [`PeriodicTask`] spawned through
    /// [`spawn_periodic`](Self::spawn_periodic).
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    /// Time since the agent was built, in hundredths of a second (sysUpTime).
    pub fn uptime(&self) -> u32 {
        (self.inner.started.elapsed().as_millis() / 10) as u32
    }

    /// Snapshot of the statistics counters.
    pub fn stats(&self) -> AgentStats {
        let c = &self.inner.counters;
        AgentStats {
            in_pkts: c.in_pkts.load(Ordering::Relaxed),
            in_bad_versions: c.in_bad_versions.load(Ordering::Relaxed),
            in_bad_community_names: c.in_bad_community_names.load(Ordering::Relaxed),
            in_asn_parse_errs: c.in_asn_parse_errs.load(Ordering::Relaxed),
            silent_drops: c.silent_drops.load(Ordering::Relaxed),
            out_traps: c.out_traps.load(Ordering::Relaxed),
        }
    }

    /// Run `tick` every `period` until [`stop`](Self::stop) or
    /// [`PeriodicTask::stop`].
    pub fn spawn_periodic<F, Fut>(&self, period: Duration, tick: F) -> PeriodicTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        PeriodicTask::spawn(period, &self.inner.cancel, tick)
    }

    /// Run the agent, processing requests concurrently.
    ///
    /// Returns `Ok(())` once the cancellation token fires, or
    /// [`Error::Transport`] if the socket fails.
    #[instrument(skip(self), err, fields(snmp.local_addr = %self.local_addr()))]
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; 65535];
        tracing::info!(target: "snmp_mib_agent::agent", "agent started");

        loop {
            let permit = match &self.inner.concurrency_limit {
                Some(sem) => tokio::select! {
                    permit = Arc::clone(sem).acquire_owned() => permit.ok(),
                    _ = self.inner.cancel.cancelled() => break,
                },
                None => None,
            };

            let (len, source) = tokio::select! {
                result = self.inner.socket.recv_from(&mut buf) => {
                    result.map_err(|e| Error::transport(Some(self.inner.local_addr), e))?
                }
                _ = self.inner.cancel.cancelled() => break,
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            let agent = self.clone();

            tokio::spawn(async move {
                if let Some(response) = agent.handle_datagram(data, source)
                    && let Err(e) = agent.inner.socket.send_to(&response, source).await
                {
                    tracing::warn!(target: "snmp_mib_agent::agent", { snmp.source = %source, error = %e }, "failed to send response");
                }
                drop(permit);
            });
        }

        tracing::info!(target: "snmp_mib_agent::agent", "agent shutdown requested");
        Ok(())
    }

    /// Process one datagram and return the encoded response, if any.
    ///
    /// Malformed messages, notifications and responses produce `None`.
    pub fn handle_datagram(&self, data: Bytes, source: SocketAddr) -> Option<Bytes> {
        let counters = &self.inner.counters;
        counters.in_pkts.fetch_add(1, Ordering::Relaxed);

        let message = match Message::decode(data) {
            Ok(message) => message,
            Err(e) => {
                if let Some(DecodeErrorKind::UnknownVersion(_)) = e.decode_kind() {
                    counters.in_bad_versions.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.in_asn_parse_errs.fetch_add(1, Ordering::Relaxed);
                }
                tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %source, error = %e }, "dropping malformed message");
                return None;
            }
        };

        let Message {
            version,
            community,
            pdu,
        } = message;

        let pdu = match pdu {
            MessagePdu::Generic(pdu) => pdu,
            MessagePdu::TrapV1(_) => {
                tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %source }, "ignoring received Trap-PDU");
                return None;
            }
        };

        match (version, pdu.pdu_type) {
            (_, PduType::Response | PduType::TrapV2 | PduType::TrapV1)
            | (Version::V1, PduType::GetBulkRequest | PduType::InformRequest) => {
                tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %source, snmp.pdu_type = %pdu.pdu_type, snmp.version = %version }, "ignoring PDU");
                return None;
            }
            _ => {}
        }

        let ctx = RequestContext::new(source, version, community, &pdu);
        tracing::trace!(target: "snmp_mib_agent::agent", { snmp.source = %source, snmp.request_id = ctx.request_id, snmp.pdu_type = %ctx.pdu_type, snmp.varbind_count = pdu.varbinds.len() }, "request decoded");

        let response = if self.inner.vacm.is_known_community(&ctx.community) {
            self.dispatch_request(&ctx, &pdu)
        } else {
            counters.in_bad_community_names.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: "snmp_mib_agent::agent", { snmp.source = %source, snmp.request_id = ctx.request_id }, "unknown community");
            ctx.error_response(&pdu, ErrorStatus::AuthorizationError, None)
        };

        self.encode_response(&ctx, response)
    }

    /// Dispatch a request to the appropriate handler.
    fn dispatch_request(&self, ctx: &RequestContext, pdu: &Pdu) -> Pdu {
        match pdu.pdu_type {
            PduType::GetRequest => self.handle_get(ctx, pdu),
            PduType::GetNextRequest => self.handle_get_next(ctx, pdu),
            PduType::GetBulkRequest => self.handle_get_bulk(ctx, pdu),
            PduType::SetRequest => self.handle_set(ctx, pdu),
            // RFC 3416 Section 4.2.7: acknowledge with the same bindings
            PduType::InformRequest => pdu.to_response(pdu.varbinds.clone()),
            // filtered in handle_datagram
            _ => ctx.error_response(pdu, ErrorStatus::GenErr, None),
        }
    }

    /// Encode `response`, falling back to an empty `tooBig` when it does
    /// not fit in the maximum message size, or to an empty `genErr` when an
    /// object produced an OID value that cannot be encoded.
    fn encode_response(&self, ctx: &RequestContext, response: Pdu) -> Option<Bytes> {
        let max = self.inner.max_message_size;
        let message = Message::new(ctx.version, ctx.community.clone(), response.clone());
        let encoded = match message.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, error = %e }, "response not encodable");
                let gen_err = Pdu {
                    varbinds: Vec::new(),
                    ..ctx.error_response(&response, ErrorStatus::GenErr, None)
                };
                Message::new(ctx.version, ctx.community.clone(), gen_err)
                    .encode()
                    .ok()?
            }
        };
        if encoded.len() <= max {
            tracing::trace!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, snmp.error_status = response.error_status, snmp.bytes = encoded.len() }, "response encoded");
            return Some(encoded);
        }

        let too_big = Pdu {
            varbinds: Vec::new(),
            ..ctx.error_response(&response, ErrorStatus::TooBig, None)
        };
        let encoded_too_big = Message::new(ctx.version, ctx.community.clone(), too_big)
            .encode()
            .ok()?;
        if encoded_too_big.len() <= max {
            tracing::debug!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, size = encoded.len(), max }, "response too big");
            return Some(encoded_too_big);
        }

        self.inner.counters.silent_drops.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "snmp_mib_agent::agent", { snmp.request_id = ctx.request_id, max }, "even an empty response exceeds the maximum message size");
        None
    }
}
