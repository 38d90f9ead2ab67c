//! Slab-indexed universe item chains (spec.md §9: indices into a slab
//! rather than raw pointers, trivializing the scheduler's DFS later).

use crate::package::Package;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Index of a `UniverseItem` inside a `Universe`'s arena. Stable for the
/// lifetime of the `Universe` (items are never removed, only chains grow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    /// Construct an `ItemId` from a raw index. Exposed for collaborator
    /// crates' tests that need stable, distinct ids without spinning up a
    /// full `Universe`; production code only ever obtains one from
    /// `Universe::add`.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw slab index, e.g. for mapping to an external solver's 1-based
    /// variable numbering.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node in a uid chain: a package plus the scheduling metadata the SAT
/// encoder and scheduler mutate across passes.
pub struct UniverseItem {
    pub pkg: Arc<Package>,
    /// Variable priority, reset per scheduling pass (spec.md §3).
    priority: AtomicI32,
    /// Set once this item has had its depend/conflict/require clauses
    /// emitted in the current encoder pass.
    processed: AtomicBool,
    /// Set once this item is known to be present in the universe's chain
    /// index (guards against double-insertion during expansion).
    inhash: AtomicBool,
}

impl fmt::Debug for UniverseItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniverseItem")
            .field("pkg", &self.pkg.uid)
            .field("priority", &self.priority())
            .field("processed", &self.processed())
            .finish()
    }
}

impl UniverseItem {
    pub(crate) fn new(pkg: Arc<Package>) -> Self {
        Self {
            pkg,
            priority: AtomicI32::new(0),
            processed: AtomicBool::new(false),
            inhash: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Relaxed)
    }

    pub fn set_priority(&self, value: i32) {
        self.priority.store(value, Ordering::Relaxed);
    }

    /// Reset mutable per-pass state before a new scheduling pass (spec.md §3:
    /// "priority integer (mutable, reset per scheduling pass)").
    pub fn reset_pass_state(&self) {
        self.priority.store(0, Ordering::Relaxed);
        self.processed.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn processed(&self) -> bool {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn mark_processed(&self) {
        self.processed.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn inhash(&self) -> bool {
        self.inhash.load(Ordering::Relaxed)
    }
}

/// An ordered chain of items sharing one uid. Insertion order is preserved
/// (local first, per spec.md §9), implemented as a small-vec adjacency list
/// rather than an intrusive doubly-linked list.
pub type Chain = SmallVec<[ItemId; 4]>;
