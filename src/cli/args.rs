//! Command-line arguments for the `snmp-mib-agent` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{AgentConfig, TrapTargetConfig};
use crate::error::{Error, Result};
use crate::version::Version;

/// SNMP version for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    /// SNMPv1
    #[value(name = "1")]
    V1,
    /// SNMPv2c (default)
    #[default]
    #[value(name = "2c")]
    V2c,
}

impl From<SnmpVersion> for Version {
    fn from(v: SnmpVersion) -> Self {
        match v {
            SnmpVersion::V1 => Version::V1,
            SnmpVersion::V2c => Version::V2c,
        }
    }
}

/// Serve the MY-MIB example module over SNMP v1/v2c.
#[derive(Debug, Parser)]
#[command(name = "snmp-mib-agent", version, about)]
pub struct AgentArgs {
    /// JSON configuration file; flags given on the command line override it.
    #[arg(short = 'f', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// UDP listen address.
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Community with read access to the enterprise subtree.
    #[arg(long = "read-community", value_name = "COMMUNITY")]
    pub read_community: Option<String>,

    /// Community with read and write access to the enterprise subtree.
    #[arg(long = "write-community", value_name = "COMMUNITY")]
    pub write_community: Option<String>,

    /// Notification receiver, `host[:port]` (port defaults to 162). Repeatable.
    #[arg(short = 't', long = "trap-target", value_name = "HOST")]
    pub trap_targets: Vec<String>,

    /// Community used for notifications sent to --trap-target receivers.
    #[arg(long = "trap-community", default_value = "traps")]
    pub trap_community: String,

    /// Notification version for --trap-target receivers: 1 or 2c.
    #[arg(long = "trap-version", default_value = "2c")]
    pub trap_version: SnmpVersion,

    /// Send informs instead of traps to --trap-target receivers (v2c only).
    #[arg(long = "inform")]
    pub inform: bool,

    /// Initial value of testCount.
    #[arg(long = "initial-count", default_value = "0")]
    pub initial_count: i32,

    /// Increment testCount and emit testTrap every 3 seconds.
    #[arg(short = 'w', long = "worker")]
    pub worker: bool,

    /// Enable debug logging (snmp_mib_agent=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (snmp_mib_agent=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl AgentArgs {
    /// Initialize tracing based on debug/trace flags.
    ///
    /// `RUST_LOG`, when set, takes precedence over the flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = if self.trace {
            "snmp_mib_agent=trace"
        } else if self.debug {
            "snmp_mib_agent=debug"
        } else {
            "snmp_mib_agent=info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load the configuration file, if any, and apply flag overrides.
    ///
    /// Without a file the enterprise is `enterprises.99999`, and without a
    /// community flag the agent answers `public` for reads and `private` for
    /// writes.
    pub fn to_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e).into())
                })?;
                parse_config(&text)?
            }
            None => AgentConfig {
                read_community: Some("public".to_string()),
                write_community: Some("private".to_string()),
                enterprise_oid: crate::demo::enterprise().to_string(),
                ..AgentConfig::default()
            },
        };

        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(community) = &self.read_community {
            config.read_community = Some(community.clone());
        }
        if let Some(community) = &self.write_community {
            config.write_community = Some(community.clone());
        }

        for address in &self.trap_targets {
            config.trap_targets.push(TrapTargetConfig {
                address: address.clone(),
                community: self.trap_community.clone(),
                version: self.trap_version.into(),
                inform: self.inform,
                ..TrapTargetConfig::default()
            });
        }

        Ok(config)
    }
}

/// Parse a JSON configuration document.
pub fn parse_config(text: &str) -> Result<AgentConfig> {
    serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e).into()))
}
