//! Shared immutable values flowing through the symbolic semantics: location
//! tuples, integer valuations, edge tuples and label sets.

use crate::{EdgeId, LabelId, ProcessId};
use std::fmt;
use std::sync::Arc;
use zonal_dbm::LocId;

/// An immutable tuple of locations, one per process, indexed by process id.
/// Cloning is an atomic increment; equality and hashing are by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VLoc(Arc<[LocId]>);

impl VLoc {
    pub fn new(locs: Vec<LocId>) -> VLoc {
        VLoc(locs.into())
    }

    #[inline]
    pub fn locs(&self) -> &[LocId] {
        &self.0
    }

    #[inline]
    pub fn loc(&self, pid: ProcessId) -> LocId {
        self.0[pid]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy with the given per-process replacements applied.
    pub fn with_updates(&self, updates: &[(ProcessId, LocId)]) -> VLoc {
        let mut locs = self.0.to_vec();
        for &(pid, loc) in updates {
            locs[pid] = loc;
        }
        VLoc(locs.into())
    }
}

impl fmt::Display for VLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, loc) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", loc)?;
        }
        write!(f, ">")
    }
}

/// An immutable valuation of the bounded integer variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntVal(Arc<[i64]>);

impl IntVal {
    pub fn new(values: Vec<i64>) -> IntVal {
        IntVal(values.into())
    }

    #[inline]
    pub fn values(&self) -> &[i64] {
        &self.0
    }

    #[inline]
    pub fn value(&self, var: usize) -> i64 {
        self.0[var]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IntVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// A tuple of edges fired jointly in one step, one optional slot per
/// process; `None` marks a process that does not participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VEdge(Arc<[Option<EdgeId>]>);

impl VEdge {
    pub fn new(slots: Vec<Option<EdgeId>>) -> VEdge {
        VEdge(slots.into())
    }

    /// The empty vedge over `process_count` processes (initial states).
    pub fn empty(process_count: usize) -> VEdge {
        VEdge(vec![None; process_count].into())
    }

    #[inline]
    pub fn slots(&self) -> &[Option<EdgeId>] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|s| s.is_none())
    }

    /// Participating processes with their edges, in process-id order.
    pub fn iter_present(&self) -> impl Iterator<Item = (ProcessId, EdgeId)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(pid, slot)| slot.map(|e| (pid, e)))
    }
}

impl fmt::Display for VEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match slot {
                Some(e) => write!(f, "{}", e)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, ">")
    }
}

/// A set of labels as a 64-bit mask. The builder caps systems at 64 labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LabelSet(u64);

impl LabelSet {
    pub const EMPTY: LabelSet = LabelSet(0);

    pub fn singleton(label: LabelId) -> LabelSet {
        debug_assert!(label < 64);
        LabelSet(1u64 << label)
    }

    #[inline]
    pub fn insert(&mut self, label: LabelId) {
        debug_assert!(label < 64);
        self.0 |= 1u64 << label;
    }

    #[inline]
    pub fn contains(self, label: LabelId) -> bool {
        label < 64 && self.0 & (1u64 << label) != 0
    }

    #[inline]
    pub fn union(self, other: LabelSet) -> LabelSet {
        LabelSet(self.0 | other.0)
    }

    #[inline]
    pub fn is_subset_of(self, other: LabelSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = LabelId> {
        (0..64).filter(move |l| self.contains(*l))
    }
}

impl FromIterator<LabelId> for LabelSet {
    fn from_iter<I: IntoIterator<Item = LabelId>>(iter: I) -> LabelSet {
        let mut set = LabelSet::EMPTY;
        for label in iter {
            set.insert(label);
        }
        set
    }
}
