//! Community-based view access control.
//!
//! A reduced form of the RFC 3415 View-based Access Control Model: each
//! [`VacmEntry`] ties a community string to an optional read view and an
//! optional write view, where a [`View`] is a set of included and excluded
//! OID subtrees. A request is allowed to touch an OID iff some entry for its
//! community has a view for the requested mode that contains the OID.
//!
//! ```
//! use snmp_mib_agent::agent::{AccessMode, VacmBuilder, View};
//! use snmp_mib_agent::oid;
//!
//! let vacm = VacmBuilder::new()
//!     .read_only("public", oid!(1, 3, 6, 1, 4, 1))
//!     .entry("private", |e| e
//!         .read_view(View::new().include(oid!(1, 3, 6, 1, 4, 1)))
//!         .write_view(View::new()
//!             .include(oid!(1, 3, 6, 1, 4, 1, 99999))
//!             .exclude(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1))))
//!     .build();
//!
//! let count = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0);
//! assert!(vacm.authorize(b"public", &count, AccessMode::Read));
//! assert!(!vacm.authorize(b"public", &count, AccessMode::Write));
//! assert!(vacm.authorize(b"private", &count, AccessMode::Write));
//! let descr = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0);
//! assert!(!vacm.authorize(b"private", &descr, AccessMode::Write));
//! ```

use bytes::Bytes;
use subtle::ConstantTimeEq;

use crate::oid::Oid;

/// Operation class being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// GET, GETNEXT and GETBULK.
    Read,
    /// SET.
    Write,
}

/// A collection of OID subtrees defining accessible objects.
#[derive(Debug, Clone, Default)]
pub struct View {
    subtrees: Vec<ViewSubtree>,
}

impl View {
    /// Create a new empty view. An empty view contains nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include every OID under `oid`.
    pub fn include(self, oid: Oid) -> Self {
        self.push(oid, true)
    }

    /// Exclude every OID under `oid`. Exclusion wins over inclusion.
    pub fn exclude(self, oid: Oid) -> Self {
        self.push(oid, false)
    }

    fn push(mut self, oid: Oid, included: bool) -> Self {
        self.subtrees.push(ViewSubtree { oid, included });
        self
    }

    /// Check if an OID is in this view: some included subtree matches and
    /// no excluded subtree does.
    pub fn contains(&self, oid: &Oid) -> bool {
        let mut included = false;
        for subtree in self.subtrees.iter().filter(|s| s.matches(oid)) {
            if !subtree.included {
                return false;
            }
            included = true;
        }
        included
    }
}

/// A subtree in a view.
#[derive(Debug, Clone)]
pub struct ViewSubtree {
    pub oid: Oid,
    /// Include (true) or exclude (false) this subtree.
    pub included: bool,
}

impl ViewSubtree {
    /// Check if an OID falls under this subtree.
    pub fn matches(&self, oid: &Oid) -> bool {
        oid.starts_with(&self.oid)
    }
}

/// One community's permissions.
#[derive(Debug, Clone)]
pub struct VacmEntry {
    pub community: Bytes,
    pub read_view: Option<View>,
    pub write_view: Option<View>,
}

impl VacmEntry {
    /// Create an entry with no access at all.
    pub fn new(community: impl Into<Bytes>) -> Self {
        Self {
            community: community.into(),
            read_view: None,
            write_view: None,
        }
    }

    pub fn read_view(mut self, view: View) -> Self {
        self.read_view = Some(view);
        self
    }

    pub fn write_view(mut self, view: View) -> Self {
        self.write_view = Some(view);
        self
    }

    fn view(&self, mode: AccessMode) -> Option<&View> {
        match mode {
            AccessMode::Read => self.read_view.as_ref(),
            AccessMode::Write => self.write_view.as_ref(),
        }
    }

    fn community_matches(&self, community: &[u8]) -> bool {
        self.community.as_ref().ct_eq(community).into()
    }
}

/// Access control table.
#[derive(Debug, Clone, Default)]
pub struct Vacm {
    entries: Vec<VacmEntry>,
}

impl Vacm {
    /// Create an empty table that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: VacmEntry) {
        self.entries.push(entry);
    }

    /// Whether `community` may access `oid` in `mode`.
    ///
    /// Every entry is examined so the time taken does not depend on which
    /// entry matched.
    pub fn authorize(&self, community: &[u8], oid: &Oid, mode: AccessMode) -> bool {
        let mut allowed = false;
        for entry in &self.entries {
            if entry.community_matches(community)
                && entry.view(mode).is_some_and(|view| view.contains(oid))
            {
                allowed = true;
            }
        }
        allowed
    }

    /// Whether any entry exists for `community`.
    pub fn is_known_community(&self, community: &[u8]) -> bool {
        let mut known = false;
        for entry in &self.entries {
            known |= entry.community_matches(community);
        }
        known
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for a [`Vacm`] table.
#[derive(Debug, Default)]
pub struct VacmBuilder {
    vacm: Vacm,
}

impl VacmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry configured by `configure`.
    pub fn entry<F>(mut self, community: impl Into<Bytes>, configure: F) -> Self
    where
        F: FnOnce(VacmEntry) -> VacmEntry,
    {
        self.vacm.add_entry(configure(VacmEntry::new(community)));
        self
    }

    /// Read access to `subtree`.
    pub fn read_only(self, community: impl Into<Bytes>, subtree: Oid) -> Self {
        self.entry(community, |e| e.read_view(View::new().include(subtree)))
    }

    /// Read and write access to `subtree`.
    pub fn read_write(self, community: impl Into<Bytes>, subtree: Oid) -> Self {
        self.entry(community, |e| {
            e.read_view(View::new().include(subtree.clone()))
                .write_view(View::new().include(subtree))
        })
    }

    /// Write access to `subtree` without read access.
    pub fn write_only(self, community: impl Into<Bytes>, subtree: Oid) -> Self {
        self.entry(community, |e| e.write_view(View::new().include(subtree)))
    }

    pub fn build(self) -> Vacm {
        self.vacm
    }
}
