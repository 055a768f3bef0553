//! The `MY-MIB` example module served by the `snmp-mib-agent` binary.
//!
//! ```text
//! enterprises.99999
//!   .1.0.1  testTrap         NOTIFICATION-TYPE OBJECTS { testCount }
//!   .1.1.0  testDescription  OCTET STRING, read-only, "My Description [<testCount>]"
//!   .1.2.0  testCount        INTEGER, read-write
//! ```
//!
//! [`spawn_worker`] increments `testCount` and emits `testTrap` every
//! [`WORKER_PERIOD`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use crate::agent::{Agent, AgentBuilder, NotificationType, PeriodicTask};
use crate::mib::{ManagedObject, SetResult, Syntax};
use crate::oid::Oid;
use crate::value::Value;

/// `enterprises.99999`
pub const ENTERPRISE: &[u32] = &[1, 3, 6, 1, 4, 1, 99999];

/// Name `testTrap` is declared under.
pub const TEST_TRAP: &str = "testTrap";

/// Interval between worker increments.
pub const WORKER_PERIOD: Duration = Duration::from_secs(3);

pub fn enterprise() -> Oid {
    Oid::from_slice(ENTERPRISE)
}

fn object(arcs: &[u32]) -> Oid {
    let mut oid = enterprise();
    for &arc in arcs {
        oid = oid.child(arc);
    }
    oid
}

pub fn test_trap() -> Oid {
    object(&[1, 0, 1])
}

pub fn test_description() -> Oid {
    object(&[1, 1, 0])
}

pub fn test_count() -> Oid {
    object(&[1, 2, 0])
}

/// Register `MY-MIB` on `builder`, with `testCount` starting at `initial`.
///
/// The builder's enterprise is left as configured; it must cover
/// `enterprises.99999` for the objects to register.
pub fn install(builder: AgentBuilder, initial: i32) -> AgentBuilder {
    let count = Arc::new(AtomicI32::new(initial));

    let describe = Arc::clone(&count);
    let read = Arc::clone(&count);
    let write = count;

    builder
        .object(
            test_description(),
            ManagedObject::read_only(Syntax::OctetString, move || {
                Value::from(format!("My Description [{}]", describe.load(Ordering::Relaxed)))
            }),
        )
        .object(
            test_count(),
            ManagedObject::read_write(
                Syntax::Integer,
                move || Value::Integer(read.load(Ordering::Relaxed)),
                move |value| {
                    let n = value.as_i32().ok_or(SetResult::WrongType)?;
                    write.store(n, Ordering::Relaxed);
                    Ok(())
                },
            ),
        )
        .notification(NotificationType::new(TEST_TRAP, test_trap()).object(test_count()))
}

/// Every `period`, increment `testCount` and emit `testTrap`.
pub fn spawn_worker(agent: &Agent, period: Duration) -> PeriodicTask {
    let worker = agent.clone();
    agent.spawn_periodic(period, move || {
        let agent = worker.clone();
        async move {
            let count = test_count();
            match agent
                .mib()
                .update(&count, |v| Value::Integer(v.as_i32().unwrap_or(0).wrapping_add(1)))
            {
                Ok(value) => tracing::debug!(target: "snmp_mib_agent::agent", { testCount = %value }, "worker tick"),
                Err(status) => {
                    tracing::warn!(target: "snmp_mib_agent::agent", { status = %status.to_error_status() }, "worker failed to update testCount");
                    return;
                }
            }
            if let Err(e) = agent.emit_trap(TEST_TRAP, Vec::new()).await {
                tracing::warn!(target: "snmp_mib_agent::agent", { error = %e }, "worker failed to emit testTrap");
            }
        }
    })
}
