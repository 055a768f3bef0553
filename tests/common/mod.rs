//! Shared test utilities for snmp-mib-agent integration tests.

// Allow dead code and unused imports since not all test files use all utilities
#![allow(dead_code)]
#![allow(unused_imports)]

mod agent;
mod fixtures;

pub use agent::{Manager, TestAgent};
pub use fixtures::*;
