//! The Conflict Engine (spec.md §4.D): discovers file/dir path collisions
//! between universe items and materialises them as typed, mutual conflict
//! registrations on the affected packages.

use crate::pathindex::PathIndex;
use depsolve_core::{Context, Result};
use depsolve_universe::{ConflictKind, ItemId, LoadMask, PackageStore, PackageType, Uid, Universe};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

fn conflict_kind(a: PackageType, b: PackageType) -> ConflictKind {
    if a == PackageType::Installed || b == PackageType::Installed {
        ConflictKind::RemoteLocal
    } else {
        ConflictKind::RemoteRemote
    }
}

/// Owns the path index and the running conflict count for one solve pass.
pub struct ConflictEngine {
    path_index: PathIndex,
    max_bumps: u32,
    conflicts_registered: u32,
}

impl ConflictEngine {
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            path_index: PathIndex::new(ctx.path_hash_max_bumps),
            max_bumps: ctx.path_hash_max_bumps,
            conflicts_registered: 0,
        }
    }

    #[must_use]
    pub fn conflicts_registered(&self) -> u32 {
        self.conflicts_registered
    }

    /// Start a fresh pass (spec.md §4.D state machine): a new path index and
    /// a zeroed counter, so a caller can tell whether *this* re-solve
    /// attempt discovered anything new.
    pub fn reset_pass(&mut self) {
        self.path_index = PathIndex::new(self.max_bumps);
        self.conflicts_registered = 0;
    }

    /// Hash every file/dir path of `item_id`'s package into the index. On a
    /// hit against a different uid, materialises a mutual, typed conflict on
    /// both packages and bumps the counter. Files/dirs that can't be loaded
    /// (e.g. an uncached remote) are silently skipped — best effort, per
    /// spec.md §4.D.
    pub fn append_chain(
        &mut self,
        item_id: ItemId,
        universe: &Universe,
        store: &dyn PackageStore,
    ) -> Result<u32> {
        let pkg = Arc::clone(&universe.item(item_id).pkg);

        if !pkg.files_loaded() {
            if let Err(e) = store.ensure_loaded(
                &pkg,
                LoadMask {
                    files: true,
                    dirs: true,
                    ..LoadMask::default()
                },
            ) {
                debug!(uid = %pkg.uid, error = %e, "files/dirs unavailable, skipping path check");
                return Ok(0);
            }
        }

        let Some(files) = pkg.files() else {
            return Ok(0);
        };
        let dirs = pkg.dirs().unwrap_or_default();

        let mut newly_found = 0;
        for path in files.iter().chain(dirs.iter()) {
            let path_str = path.to_string_lossy();
            let Some((other_item, other_uid)) =
                self.path_index.insert(&path_str, item_id, &pkg.uid)
            else {
                continue;
            };

            let other_pkg = Arc::clone(&universe.item(other_item).pkg);
            let kind = conflict_kind(pkg.kind, other_pkg.kind);
            pkg.register_conflict(other_uid.clone(), kind);
            other_pkg.register_conflict(pkg.uid.clone(), kind);
            self.conflicts_registered += 1;
            newly_found += 1;
        }

        Ok(newly_found)
    }

    /// Look up `path`'s owner in the local store; if it's a different uid not
    /// yet in the universe, pull it in as a new chain and register the
    /// conflict (spec.md §4.D).
    pub fn check_local_path(
        &mut self,
        path: &Path,
        acting_item: ItemId,
        universe: &mut Universe,
        store: &dyn PackageStore,
    ) -> Result<Option<Uid>> {
        let Some(owner_uid) = store.file_path_owner(path) else {
            return Ok(None);
        };

        let acting_pkg = Arc::clone(&universe.item(acting_item).pkg);
        if owner_uid == acting_pkg.uid {
            return Ok(None);
        }

        let Some(owner_pkg) = universe.get_local(&owner_uid) else {
            return Ok(None);
        };

        let kind = conflict_kind(acting_pkg.kind, owner_pkg.kind);
        acting_pkg.register_conflict(owner_uid.clone(), kind);
        owner_pkg.register_conflict(acting_pkg.uid.clone(), kind);
        self.conflicts_registered += 1;

        Ok(Some(owner_uid))
    }
}
