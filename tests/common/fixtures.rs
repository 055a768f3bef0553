//! Common test fixtures and constants.

use snmp_mib_agent::{ManagedObject, SetResult, Syntax, Value, oid, Oid};

// =============================================================================
// MY-MIB (enterprises.99999)
// =============================================================================

pub fn enterprise() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999)
}

/// testDescription.0, read-only OCTET STRING
pub fn test_description() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)
}

/// testCount.0, read-write INTEGER
pub fn test_count() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0)
}

/// testLevel.0, read-write INTEGER restricted to 0..=10
pub fn test_level() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 3, 0)
}

/// testTrap notification OID
pub fn test_trap() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0, 1)
}

/// Nonexistent OID under the enterprise
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 9, 9, 0)
}

/// The objects every [`TestAgent`](super::TestAgent) serves.
pub fn test_objects() -> Vec<(Oid, ManagedObject)> {
    vec![
        (
            test_description(),
            ManagedObject::read_only(Syntax::OctetString, || Value::from("My Description")),
        ),
        (
            test_count(),
            ManagedObject::variable(Syntax::Integer, Value::Integer(0)),
        ),
        (
            test_level(),
            ManagedObject::variable(Syntax::Integer, Value::Integer(5)).with_validator(|v| {
                match v.as_i32() {
                    Some(0..=10) => SetResult::Ok,
                    _ => SetResult::WrongValue,
                }
            }),
        ),
    ]
}

// =============================================================================
// Communities
// =============================================================================

/// Read-only community
pub const COMMUNITY_RO: &[u8] = b"public";
/// Read-write community
pub const COMMUNITY_RW: &[u8] = b"private";
/// Community for notifications
pub const COMMUNITY_TRAP: &[u8] = b"traps";
