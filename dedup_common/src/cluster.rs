use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

/// A non-empty set of paths judged mutually near-duplicate by the
/// detector. Clusters never share members in a final
/// [`DeduplicationResult`]; a path belongs to at most one.
pub type Cluster = BTreeSet<PathBuf>;

/// Why a [`DuplicateSet`] could not be built from a cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepresentativeError {
    #[error("cluster has no members")]
    EmptyCluster,
    #[error("cluster has a single member; it is unique, not a duplicate set")]
    SingleMember,
}

/// One group of near-duplicates with a chosen best representative.
///
/// Invariants, enforced by [`DuplicateSet::new`]: `best` is a member of
/// `representatives`; `representatives` and `duplicates` are disjoint;
/// together they equal the input cluster; the set has at least two
/// members total (a singleton cluster is unique, not a duplicate set).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateSet {
    pub best: PathBuf,
    pub representatives: BTreeSet<PathBuf>,
    pub duplicates: BTreeSet<PathBuf>,
}

impl DuplicateSet {
    /// Builds a `DuplicateSet` from a cluster already partitioned into
    /// representatives and duplicates, checking every invariant in §3.
    pub fn new(
        best: PathBuf,
        representatives: BTreeSet<PathBuf>,
        duplicates: BTreeSet<PathBuf>,
    ) -> Result<Self, RepresentativeError> {
        let total = representatives.len() + duplicates.len();
        if total == 0 {
            return Err(RepresentativeError::EmptyCluster);
        }
        if total < 2 {
            return Err(RepresentativeError::SingleMember);
        }
        debug_assert!(representatives.contains(&best));
        debug_assert!(representatives.is_disjoint(&duplicates));
        Ok(Self {
            best,
            representatives,
            duplicates,
        })
    }

    #[must_use]
    pub fn all_members(&self) -> BTreeSet<PathBuf> {
        self.representatives.union(&self.duplicates).cloned().collect()
    }
}

/// The output of a full deduplication run: every input path accounted for
/// in exactly one of `unique`, some set's `representatives`, or some set's
/// `duplicates`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeduplicationResult {
    pub unique: BTreeSet<PathBuf>,
    pub duplicate_sets: Vec<DuplicateSet>,
}

impl DeduplicationResult {
    #[must_use]
    pub fn new(unique: BTreeSet<PathBuf>, duplicate_sets: Vec<DuplicateSet>) -> Self {
        Self {
            unique,
            duplicate_sets,
        }
    }

    /// Total number of paths accounted for across `unique` and every
    /// duplicate set. Used by tests to check the partition covers the
    /// original input exactly once each.
    #[must_use]
    pub fn total_paths(&self) -> usize {
        self.unique.len()
            + self
                .duplicate_sets
                .iter()
                .map(|s| s.representatives.len() + s.duplicates.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn rejects_empty_cluster() {
        let err = DuplicateSet::new(path("a"), BTreeSet::new(), BTreeSet::new()).unwrap_err();
        assert_eq!(err, RepresentativeError::EmptyCluster);
    }

    #[test]
    fn rejects_single_member_cluster() {
        let reps = BTreeSet::from([path("a")]);
        let err = DuplicateSet::new(path("a"), reps, BTreeSet::new()).unwrap_err();
        assert_eq!(err, RepresentativeError::SingleMember);
    }

    #[test]
    fn accepts_well_formed_set() {
        let reps = BTreeSet::from([path("a")]);
        let dups = BTreeSet::from([path("b"), path("c")]);
        let set = DuplicateSet::new(path("a"), reps, dups).unwrap();
        assert_eq!(set.all_members().len(), 3);
    }
}
