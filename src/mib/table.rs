//! Sorted OID storage backing the MIB tree.

use crate::oid::Oid;

/// Entries kept sorted by OID so exact and next-OID lookups are binary searches.
#[derive(Debug, Clone)]
pub struct OidTable<V> {
    entries: Vec<(Oid, V)>,
}

impl<V> OidTable<V> {
    /// Create a new empty OID table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, oid: &Oid) -> Result<usize, usize> {
        self.entries.binary_search_by(|(o, _)| o.cmp(oid))
    }

    /// Insert an entry, keeping the table sorted.
    ///
    /// Returns the rejected value back if the OID is already present.
    pub fn insert(&mut self, oid: Oid, value: V) -> Result<(), (Oid, V)> {
        match self.position(&oid) {
            Ok(_) => Err((oid, value)),
            Err(idx) => {
                self.entries.insert(idx, (oid, value));
                Ok(())
            }
        }
    }

    /// Exact match.
    pub fn get(&self, oid: &Oid) -> Option<&V> {
        self.position(oid).ok().map(|idx| &self.entries[idx].1)
    }

    /// Smallest entry strictly greater than `oid`.
    pub fn get_next(&self, oid: &Oid) -> Option<(&Oid, &V)> {
        let idx = match self.position(oid) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.entries.get(idx).map(|(o, v)| (o, v))
    }

    /// Up to `max` entries strictly greater than `oid`, in order.
    pub fn range_after(&self, oid: &Oid, max: usize) -> impl Iterator<Item = (&Oid, &V)> {
        let start = match self.position(oid) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.entries[start..]
            .iter()
            .take(max)
            .map(|(o, v)| (o, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &V)> {
        self.entries.iter().map(|(o, v)| (o, v))
    }
}

impl<V> Default for OidTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn table() -> OidTable<i32> {
        let mut table = OidTable::new();
        table.insert(oid!(1, 3, 6, 1, 3), 150).unwrap();
        table.insert(oid!(1, 3, 6, 1, 1), 50).unwrap();
        table.insert(oid!(1, 3, 6, 1, 2), 100).unwrap();
        table
    }

    #[test]
    fn test_insert_keeps_order() {
        let keys: Vec<_> = table().iter().map(|(o, _)| o.clone()).collect();
        assert_eq!(
            keys,
            vec![oid!(1, 3, 6, 1, 1), oid!(1, 3, 6, 1, 2), oid!(1, 3, 6, 1, 3)]
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = table();
        let (oid, value) = table.insert(oid!(1, 3, 6, 1, 2), 7).unwrap_err();
        assert_eq!(oid, oid!(1, 3, 6, 1, 2));
        assert_eq!(value, 7);
        assert_eq!(table.get(&oid!(1, 3, 6, 1, 2)), Some(&100));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_get_next() {
        let table = table();
        // before first
        assert_eq!(table.get_next(&oid!(1, 3)).unwrap().0, &oid!(1, 3, 6, 1, 1));
        // exact match skips itself
        assert_eq!(
            table.get_next(&oid!(1, 3, 6, 1, 1)).unwrap().0,
            &oid!(1, 3, 6, 1, 2)
        );
        // between entries
        assert_eq!(
            table.get_next(&oid!(1, 3, 6, 1, 1, 5)).unwrap().0,
            &oid!(1, 3, 6, 1, 2)
        );
        assert!(table.get_next(&oid!(1, 3, 6, 1, 3)).is_none());
        assert!(table.get_next(&oid!(1, 3, 6, 2)).is_none());
    }

    #[test]
    fn test_range_after() {
        let table = table();
        let values: Vec<_> = table.range_after(&oid!(1, 3, 6, 1, 1), 5).map(|(_, v)| *v).collect();
        assert_eq!(values, vec![100, 150]);

        let values: Vec<_> = table.range_after(&Oid::empty(), 2).map(|(_, v)| *v).collect();
        assert_eq!(values, vec![50, 100]);

        assert_eq!(table.range_after(&oid!(1, 3, 6, 1, 3), 5).count(), 0);
    }
}
