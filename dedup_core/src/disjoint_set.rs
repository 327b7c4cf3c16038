use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Union-find over arbitrary keys, indexed by a map from key to the
/// index of the entry (a `BTreeSet`) that holds it.
///
/// Adapted from the teacher's own match-grouping union-find
/// (`vid_dup_finder_app`'s `disjoint_set.rs`), generalized here to merge
/// whole exact-pHash and LSH-verified similarity clusters (Stage C of
/// the duplicate detector) rather than confirmed/false-positive pairs.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet<T>
where
    T: Ord,
{
    map: BTreeMap<T, usize>,
    entries: Vec<BTreeSet<T>>,
}

impl<T> DisjointSet<T>
where
    T: Ord + Clone,
{
    /// Unions `p1` and `p2` into the same entry, creating or merging
    /// entries as needed.
    pub fn insert(&mut self, p1: T, p2: T) {
        let (p1_idx, p2_idx) = (self.map.get(&p1).copied(), self.map.get(&p2).copied());

        if p1_idx.is_some() && p1_idx == p2_idx {
            return;
        }

        match (p1_idx, p2_idx) {
            (None, None) => self.insert_known_new_entry([p1, p2]),
            (None, Some(idx)) | (Some(idx), None) => self.append_to_entry(idx, [p1, p2]),
            (Some(idx_1), Some(idx_2)) => {
                let keep_idx = self.merge_entries(idx_1, idx_2);
                self.append_to_entry(keep_idx, [p1, p2]);
            }
        }
    }

    /// Unions every member of `cluster` with its first member. A
    /// singleton or empty cluster is a no-op (nothing to union).
    pub fn union_cluster(&mut self, cluster: &BTreeSet<T>) {
        let mut iter = cluster.iter();
        if let Some(first) = iter.next() {
            for other in iter {
                self.insert(first.clone(), other.clone());
            }
        }
    }

    fn append_to_entry(&mut self, idx: usize, items: impl IntoIterator<Item = T>) {
        let entry = self.entries.get_mut(idx).expect("index came from self.map, entries not yet shrunk");
        for item in items {
            entry.insert(item.clone());
            self.map.insert(item, idx);
        }
    }

    fn insert_known_new_entry(&mut self, items: impl IntoIterator<Item = T>) {
        let entry = items.into_iter().collect::<BTreeSet<_>>();
        let idx = self.entries.len();
        for item in entry.iter().cloned() {
            self.map.insert(item, idx);
        }
        self.entries.push(entry);
    }

    /// Merges the smaller-or-equal-indexed entry into the other, always
    /// removing whichever is the *last* entry in the vec so the
    /// surviving index is never renumbered. Returns the surviving index.
    fn merge_entries(&mut self, idx_1: usize, idx_2: usize) -> usize {
        let (preserve_idx, remove_idx) = if idx_1 < idx_2 { (idx_1, idx_2) } else { (idx_2, idx_1) };

        let members = self.remove_entry(remove_idx);
        for item in members {
            self.map.insert(item.clone(), preserve_idx);
            self.entries[preserve_idx].insert(item);
        }

        preserve_idx
    }

    /// Removes the entry at `idx`, swapping the last entry into its slot
    /// (and fixing up that entry's map pointers) unless `idx` was
    /// already last.
    fn remove_entry(&mut self, idx: usize) -> BTreeSet<T> {
        let last_idx = self.entries.len() - 1;
        if idx == last_idx {
            let removed = self.entries.remove(idx);
            for item in &removed {
                self.map.remove(item);
            }
            removed
        } else {
            let removed = self.entries.swap_remove(idx);
            for item in &removed {
                self.map.remove(item);
            }
            for item in self.entries[idx].clone() {
                self.map.insert(item, idx);
            }
            removed
        }
    }

    /// Every finished union-find entry, as a set of its members.
    pub fn all_sets(&self) -> impl Iterator<Item = &BTreeSet<T>> {
        self.entries.iter()
    }

    /// Whether `key` belongs to any entry (i.e. was ever unioned with
    /// something).
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }
}
