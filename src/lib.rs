// Allow large error types - the Error enum includes OIDs inline for debugging convenience.
#![allow(clippy::result_large_err)]

//! # snmp-mib-agent
//!
//! Minimal async SNMP v1/v2c agent serving an in-memory MIB.
//!
//! ## Features
//!
//! - GET, GETNEXT, GETBULK and atomic SET over UDP
//! - Community-based view access control
//! - v1 traps, v2c traps and acknowledged informs
//! - Closure-backed managed objects behind one read/write guard
//! - Zero-copy BER encoding/decoding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_mib_agent::agent::{Agent, NotificationType, TrapTarget};
//! use snmp_mib_agent::{ManagedObject, Syntax, Value, oid};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_mib_agent::Error> {
//!     let count = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0);
//!     let agent = Agent::builder()
//!         .bind("0.0.0.0:1161")
//!         .enterprise(oid!(1, 3, 6, 1, 4, 1, 99999))
//!         .read_community("public")
//!         .write_community("private")
//!         .object(count.clone(), ManagedObject::variable(Syntax::Integer, Value::Integer(0)))
//!         .notification(
//!             NotificationType::new("countChanged", oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0, 1))
//!                 .object(count.clone()),
//!         )
//!         .trap_target(TrapTarget::new("127.0.0.1:162".parse().unwrap(), "traps"))
//!         .build()
//!         .await?;
//!
//!     let producer = agent.clone();
//!     let _task = agent.spawn_periodic(Duration::from_secs(3), move || {
//!         let agent = producer.clone();
//!         let count = count.clone();
//!         async move {
//!             let _ = agent.mib().update(&count, |v| Value::Integer(v.as_i32().unwrap_or(0) + 1));
//!             let _ = agent.emit_trap("countChanged", vec![]).await;
//!         }
//!     });
//!
//!     agent.run().await
//! }
//! ```

pub mod agent;
pub mod ber;
pub mod config;
pub mod demo;
pub mod error;
pub mod message;
pub mod mib;
pub mod oid;
pub mod pdu;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use agent::{
    AccessMode, Agent, AgentBuilder, AgentStats, NotificationType, NotifyReport, PeriodicTask,
    TrapTarget, Vacm, VacmBuilder, View,
};
pub use config::{AgentConfig, TrapTargetConfig};
pub use error::{DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use message::{Message, MessagePdu};
pub use mib::{ManagedObject, MibTree, SetResult, Syntax};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
