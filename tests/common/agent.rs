//! In-process SNMP agent for testing.
//!
//! Wraps the library's Agent with automatic lifecycle management.
//! Agents bind to ephemeral localhost ports and shut down cleanly on drop.

use crate::common::fixtures;

use bytes::Bytes;
use snmp_mib_agent::{Agent, AgentBuilder, Message, Pdu, Version};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An in-process SNMP agent for testing.
///
/// Automatically starts on creation and stops on drop.
pub struct TestAgent {
    agent: Agent,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl TestAgent {
    /// Agent serving the fixture objects with `public` read and `private`
    /// read/write communities.
    pub async fn new() -> Self {
        Self::with_builder(|b| b).await
    }

    /// Like [`new`](Self::new), with extra builder configuration.
    pub async fn with_builder<F>(configure: F) -> Self
    where
        F: FnOnce(AgentBuilder) -> AgentBuilder,
    {
        let mut builder = Agent::builder()
            .bind("127.0.0.1:0")
            .enterprise(fixtures::enterprise())
            .read_community(fixtures::COMMUNITY_RO)
            .write_community(fixtures::COMMUNITY_RW);
        for (oid, object) in fixtures::test_objects() {
            builder = builder.object(oid, object);
        }
        Self::start(configure(builder)).await
    }

    /// Start an agent from a fully custom builder. The bind address is
    /// forced to an ephemeral localhost port.
    pub async fn start(builder: AgentBuilder) -> Self {
        let cancel = CancellationToken::new();
        let agent = builder
            .bind("127.0.0.1:0")
            .cancel(cancel.clone())
            .build()
            .await
            .expect("failed to build test agent");

        let runner = agent.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                eprintln!("TestAgent error: {}", e);
            }
        });

        Self {
            agent,
            cancel,
            _task: task,
        }
    }

    /// Get the agent's listening address.
    pub fn addr(&self) -> SocketAddr {
        self.agent.local_addr()
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Explicitly stop the agent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A bare-bones manager speaking to one agent over UDP.
pub struct Manager {
    socket: UdpSocket,
    agent: SocketAddr,
}

impl Manager {
    pub async fn new(agent: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind manager");
        Self { socket, agent }
    }

    /// Send raw bytes to the agent.
    pub async fn send_raw(&self, data: &[u8]) {
        self.socket.send_to(data, self.agent).await.expect("send");
    }

    /// Wait up to `wait` for a datagram.
    pub async fn recv_raw(&self, wait: Duration) -> Option<Bytes> {
        let mut buf = vec![0u8; 65535];
        match tokio::time::timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Some(Bytes::copy_from_slice(&buf[..len])),
            _ => None,
        }
    }

    /// Send a request and decode the response PDU, if one arrives.
    pub async fn request(
        &self,
        version: Version,
        community: &'static [u8],
        pdu: Pdu,
    ) -> Option<Pdu> {
        let request_id = pdu.request_id;
        let request = Message::new(version, community, pdu).encode().unwrap();
        self.send_raw(&request).await;
        let data = self.recv_raw(Duration::from_secs(2)).await?;
        let message = Message::decode(data).expect("agent sent malformed response");
        assert_eq!(message.version, version);
        assert_eq!(message.community.as_ref(), community);
        let pdu = message.generic_pdu().cloned().expect("response PDU");
        assert_eq!(pdu.request_id, request_id);
        Some(pdu)
    }

    pub async fn get(&self, community: &'static [u8], oids: &[snmp_mib_agent::Oid]) -> Pdu {
        self.request(Version::V2c, community, Pdu::get_request(1, oids))
            .await
            .expect("GET response")
    }

    pub async fn set(
        &self,
        community: &'static [u8],
        varbinds: Vec<snmp_mib_agent::VarBind>,
    ) -> Pdu {
        self.request(Version::V2c, community, Pdu::set_request(2, varbinds))
            .await
            .expect("SET response")
    }
}
