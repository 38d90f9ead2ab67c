//! The package universe: multi-origin candidate discovery keyed by uid
//! (spec.md §4.B), plus the collaborator interfaces it queries against
//! (spec.md §6).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod arena;
mod package;
mod store;
mod universe;

pub use arena::{Chain, ItemId, UniverseItem};
pub use package::{ConflictKind, DepRef, Package, PackageBuilder, PackageType, Uid};
pub use store::{FetchTransport, LoadMask, LockMode, MatchKind, PackageStore};
pub use universe::{AddOutcome, Universe, need_upgrade};
