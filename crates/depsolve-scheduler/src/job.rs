//! The atomic transaction the scheduler orders (spec.md §3 Job, §4.G).

use depsolve_universe::ItemId;
use std::fmt;

/// Index of a `Job` inside a `JobGraph`'s slab. Stable for the graph's
/// lifetime, mirroring `depsolve_universe::ItemId`'s arena-index pattern
/// (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u32);

impl JobId {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// The kind of atomic transaction a `Job` represents (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    Install,
    Delete,
    Upgrade,
    /// The install half of a split upgrade (spec.md §4.G cycle breaking).
    UpgradeInstall,
    /// The delete half of a split upgrade.
    UpgradeRemove,
    Fetch,
}

impl JobType {
    /// Priority bias applied before the scheduler's topological sort
    /// (spec.md §4.G): pulls a split upgrade's two halves back together in
    /// the final order without being required for correctness.
    #[must_use]
    pub const fn priority_bias(self) -> i32 {
        match self {
            Self::UpgradeInstall => 1,
            Self::UpgradeRemove => -1,
            Self::Install | Self::Delete | Self::Upgrade | Self::Fetch => 0,
        }
    }
}

/// One atomic transaction. `new_item` is the primary target (new side for
/// install/upgrade, the victim for delete); `old_item` is the old side for
/// an (unsplit or split) upgrade. `xlink` pairs the two halves of a split
/// upgrade once the scheduler has performed the split.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_type: JobType,
    pub new_item: Option<ItemId>,
    pub old_item: Option<ItemId>,
    pub xlink: Option<JobId>,
    pub priority: i32,
}

impl Job {
    #[must_use]
    pub fn install(item: ItemId) -> Self {
        Self::new(JobType::Install, Some(item), None)
    }

    #[must_use]
    pub fn fetch(item: ItemId) -> Self {
        Self::new(JobType::Fetch, Some(item), None)
    }

    #[must_use]
    pub fn delete(item: ItemId) -> Self {
        Self::new(JobType::Delete, None, Some(item))
    }

    #[must_use]
    pub fn upgrade(new_item: ItemId, old_item: ItemId) -> Self {
        Self::new(JobType::Upgrade, Some(new_item), Some(old_item))
    }

    fn new(job_type: JobType, new_item: Option<ItemId>, old_item: Option<ItemId>) -> Self {
        Self {
            priority: job_type.priority_bias(),
            job_type,
            new_item,
            old_item,
            xlink: None,
        }
    }

    /// The uid-identifying item this job's ordering edges key off: the new
    /// side if present, else the old side.
    #[must_use]
    pub fn primary_item(&self) -> Option<ItemId> {
        self.new_item.or(self.old_item)
    }
}
