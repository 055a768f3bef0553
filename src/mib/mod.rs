//! In-memory MIB tree.
//!
//! [`MibTree`] maps OIDs to [`ManagedObject`]s in lexicographic order and
//! owns the read/write guard every value access goes through. The set of
//! registered OIDs is fixed once the tree is shared; only the values behind
//! the accessors change.
//!
//! ```
//! use snmp_mib_agent::{ManagedObject, MibTree, Syntax, Value, oid};
//!
//! let mut mib = MibTree::new(oid!(1, 3, 6, 1, 4, 1, 99999));
//! let count = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0);
//! mib.register(count.clone(), ManagedObject::variable(Syntax::Integer, Value::Integer(0)))
//!     .unwrap();
//!
//! let next = mib
//!     .update(&count, |v| Value::Integer(v.as_i32().unwrap_or(0) + 1))
//!     .unwrap();
//! assert_eq!(next, Value::Integer(1));
//! assert_eq!(mib.get(&count), Some(Value::Integer(1)));
//! ```

mod object;
mod table;

pub use object::{ManagedObject, SetResult, Syntax};
pub use table::OidTable;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::value::Value;

/// Ordered collection of managed objects under one enterprise subtree.
#[derive(Debug)]
pub struct MibTree {
    enterprise: Oid,
    objects: OidTable<ManagedObject>,
    guard: RwLock<()>,
}

impl MibTree {
    /// Create an empty tree rooted at `enterprise`.
    pub fn new(enterprise: Oid) -> Self {
        Self {
            enterprise,
            objects: OidTable::new(),
            guard: RwLock::new(()),
        }
    }

    /// Root every registered OID lies under.
    pub fn enterprise(&self) -> &Oid {
        &self.enterprise
    }

    /// Register an object.
    ///
    /// Fails if the OID is already registered or lies outside the enterprise
    /// subtree. The enterprise OID itself is not a valid object name.
    pub fn register(&mut self, oid: Oid, object: ManagedObject) -> Result<()> {
        if !oid.starts_with(&self.enterprise) || oid.len() == self.enterprise.len() {
            return Err(Error::OutsideEnterprise {
                oid,
                enterprise: self.enterprise.clone(),
            });
        }
        oid.validate()?;

        tracing::debug!(target: "snmp_mib_agent::mib", { snmp.oid = %oid, syntax = %object.syntax(), writable = object.is_writable() }, "registering object");
        self.objects
            .insert(oid, object)
            .map_err(|(oid, _)| Error::DuplicateOid { oid })
    }

    /// Exact match.
    pub fn lookup(&self, oid: &Oid) -> Option<&ManagedObject> {
        self.objects.get(oid)
    }

    /// Smallest registered OID strictly greater than `oid`; `None` at end of MIB.
    pub fn lookup_next(&self, oid: &Oid) -> Option<(&Oid, &ManagedObject)> {
        self.objects.get_next(oid)
    }

    /// Up to `max_count` successive [`lookup_next`](Self::lookup_next) results.
    pub fn lookup_range(
        &self,
        start_exclusive: &Oid,
        max_count: usize,
    ) -> Vec<(&Oid, &ManagedObject)> {
        self.objects.range_after(start_exclusive, max_count).collect()
    }

    /// Read an object's current value under the shared lock.
    pub fn read(&self, object: &ManagedObject) -> Value {
        let _shared = self.guard.read();
        object.get()
    }

    /// Store a value through an object's setter under the exclusive lock.
    ///
    /// No test phase is run; callers wanting syntax and range checks call
    /// [`ManagedObject::test`] first.
    pub fn write(
        &self,
        object: &ManagedObject,
        value: Value,
    ) -> std::result::Result<(), SetResult> {
        let _exclusive = self.guard.write();
        object.set(value)
    }

    /// Current value of the object at `oid`.
    pub fn get(&self, oid: &Oid) -> Option<Value> {
        self.lookup(oid).map(|object| self.read(object))
    }

    /// Atomic read-modify-write of the object at `oid`, returning the new value.
    ///
    /// The exclusive lock is held across the read, `f` and the write, so
    /// concurrent updaters never lose each other's changes.
    pub fn update<F>(&self, oid: &Oid, f: F) -> std::result::Result<Value, SetResult>
    where
        F: FnOnce(Value) -> Value,
    {
        let object = self.lookup(oid).ok_or(SetResult::NotWritable)?;
        let _exclusive = self.guard.write();
        let next = f(object.get());
        match object.test(&next) {
            SetResult::Ok => {}
            err => return Err(err),
        }
        object.set(next.clone())?;
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in ascending OID order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &ManagedObject)> {
        self.objects.iter()
    }
}
