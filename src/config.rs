//! Plain-data agent configuration.
//!
//! [`AgentConfig`] is what a bootstrap layer hands to the core: addresses,
//! communities and trap targets as strings and numbers. With the `cli`
//! feature it deserializes from JSON. Apply it with
//! [`AgentBuilder::config`](crate::agent::AgentBuilder::config).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::agent::{DEFAULT_TRAP_PORT, TrapTarget};
use crate::error::{Error, Result};
use crate::version::Version;

/// Default receive buffer requested from the kernel (4 MiB).
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default maximum message size (Ethernet MTU minus IP/UDP headers).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1472;

/// Agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Deserialize, serde::Serialize),
    serde(default, deny_unknown_fields)
)]
pub struct AgentConfig {
    /// UDP listen endpoint.
    pub bind_address: String,
    /// Community granted read access to the enterprise subtree.
    pub read_community: Option<String>,
    /// Community granted read and write access to the enterprise subtree.
    pub write_community: Option<String>,
    /// Dotted enterprise root, e.g. `1.3.6.1.4.1.99999`.
    pub enterprise_oid: String,
    pub trap_targets: Vec<TrapTargetConfig>,
    pub max_message_size: usize,
    /// `None` keeps the kernel default.
    pub recv_buffer_size: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:161".to_string(),
            read_community: None,
            write_community: None,
            enterprise_oid: "1.3.6.1.4.1".to_string(),
            trap_targets: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recv_buffer_size: Some(DEFAULT_RECV_BUFFER_SIZE),
        }
    }
}

/// One notification receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "cli",
    derive(serde::Deserialize, serde::Serialize),
    serde(default, deny_unknown_fields)
)]
pub struct TrapTargetConfig {
    /// `host`, `host:port`, `ip` or `ip:port`; port defaults to 162.
    pub address: String,
    pub community: String,
    pub version: Version,
    /// Send InformRequests instead of traps.
    pub inform: bool,
    /// Inform retransmission timeout in milliseconds.
    pub timeout_ms: u64,
    /// Inform retransmissions after the first attempt.
    pub retries: u32,
}

impl Default for TrapTargetConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            community: "public".to_string(),
            version: Version::V2c,
            inform: false,
            timeout_ms: 1500,
            retries: 3,
        }
    }
}

impl TrapTargetConfig {
    /// Resolve the address and build the target.
    pub async fn resolve(&self) -> Result<TrapTarget> {
        let address = resolve_address(&self.address, DEFAULT_TRAP_PORT).await?;
        let mut target = TrapTarget::new(address, self.community.clone().into_bytes())
            .version(self.version);
        if self.inform {
            target = target.inform(Duration::from_millis(self.timeout_ms), self.retries);
        }
        target.validate()?;
        Ok(target)
    }
}

/// Resolve `input` to one socket address, filling in `default_port` when
/// none is given. The first address returned by the resolver wins.
pub async fn resolve_address(input: &str, default_port: u16) -> Result<SocketAddr> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Config("empty address".into()));
    }
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = input.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let target = match input.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => input.to_string(),
        _ => format!("{}:{}", input, default_port),
    };

    tokio::net::lookup_host(target)
        .await
        .map_err(|e| Error::Config(format!("cannot resolve {}: {}", input, e).into()))?
        .next()
        .ok_or_else(|| Error::Config(format!("{} resolved to no addresses", input).into()))
}
