//! Command-line support for the `snmp-mib-agent` binary.
//!
//! This module is only available with the `cli` feature.

pub mod args;
