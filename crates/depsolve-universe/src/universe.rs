//! The Package Universe (spec.md §4.B): a multi-origin candidate graph
//! keyed by uid, with upgrade-candidate discovery and deterministic
//! candidate selection.

use crate::arena::{Chain, ItemId, UniverseItem};
use crate::package::{Package, Uid};
use crate::store::{MatchKind, PackageStore};
use ahash::AHashMap;
use depsolve_core::{Error, PkgVersion, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of `Universe::add`. A duplicate digest is an expected outcome, not
/// a failure (spec.md §4.B).
#[derive(Debug, Clone, Copy)]
pub enum AddOutcome {
    Inserted(ItemId),
    Existing(ItemId),
}

impl AddOutcome {
    #[must_use]
    pub const fn item_id(self) -> ItemId {
        match self {
            Self::Inserted(id) | Self::Existing(id) => id,
        }
    }
}

/// The multi-origin candidate graph.
pub struct Universe {
    store: Arc<dyn PackageStore>,
    arena: Vec<UniverseItem>,
    chains: AHashMap<Uid, Chain>,
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("items", &self.arena.len())
            .field("chains", &self.chains.len())
            .finish()
    }
}

impl Universe {
    #[must_use]
    pub fn new(store: Arc<dyn PackageStore>) -> Self {
        Self {
            store,
            arena: Vec::new(),
            chains: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> &UniverseItem {
        &self.arena[id.0 as usize]
    }

    /// Every `(ItemId, &UniverseItem)` pair in the arena, in insertion order.
    /// Used by the SAT encoder's Depend/Explicit-conflict/Require-Provide
    /// clause families, which must walk every candidate regardless of chain.
    pub fn iter_items(&self) -> impl Iterator<Item = (ItemId, &UniverseItem)> {
        self.arena
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId(u32::try_from(i).expect("arena index fits u32")), item))
    }

    /// Every uid chain currently in the universe. Used by the SAT encoder's
    /// Chain-conflict clause family (at most one candidate per uid may be
    /// installed).
    #[must_use]
    pub fn chains(&self) -> &AHashMap<Uid, Chain> {
        &self.chains
    }

    /// Reset all per-pass mutable state (priority/processed) ahead of a new
    /// SAT encoding pass; the universe itself (chains, packages) is not
    /// rebuilt within a single `solve()` call (spec.md §5).
    pub fn reset_pass_state(&self) {
        for item in &self.arena {
            item.reset_pass_state();
        }
    }

    /// Insert `pkg` into its uid chain. Computes the digest if missing,
    /// dedups by digest within the chain, and returns the new or existing
    /// item (spec.md §4.B). Only a digest-computation failure is a true
    /// error; a duplicate digest is `AddOutcome::Existing`, not an error.
    pub fn add(&mut self, pkg: Package) -> Result<AddOutcome> {
        let uid = pkg.uid.clone();

        if pkg.digest().is_none() {
            let digest = compute_digest(&pkg)?;
            pkg.set_digest(digest);
        }
        let digest = pkg.digest().expect("digest set above");

        if let Some(chain) = self.chains.get(&uid) {
            for &existing_id in chain {
                if let Some(existing_digest) = self.arena[existing_id.0 as usize].pkg.digest()
                    && existing_digest == digest
                {
                    trace!(uid = %uid, "duplicate digest, reusing existing item");
                    return Ok(AddOutcome::Existing(existing_id));
                }
            }
        }

        let id = ItemId(u32::try_from(self.arena.len()).expect("universe arena overflow"));
        self.arena.push(UniverseItem::new(Arc::new(pkg)));
        self.chains.entry(uid).or_default().push(id);

        Ok(AddOutcome::Inserted(id))
    }

    /// O(1) head lookup for a uid's chain.
    #[must_use]
    pub fn find(&self, uid: &Uid) -> Option<&Chain> {
        self.chains.get(uid)
    }

    /// Convenience: the `Installed` member of a uid's chain, loading it from
    /// the local store if the chain doesn't exist yet.
    pub fn get_local(&mut self, uid: &Uid) -> Option<Arc<Package>> {
        if let Some(chain) = self.chains.get(uid) {
            for &id in chain {
                let item = &self.arena[id.0 as usize];
                if item.pkg.kind == crate::package::PackageType::Installed {
                    return Some(Arc::clone(&item.pkg));
                }
            }
            return None;
        }

        let found = self
            .store
            .query(uid.as_str(), MatchKind::Exact)
            .into_iter()
            .find(|p| p.kind == crate::package::PackageType::Installed)?;

        let pkg = Arc::try_unwrap(found).unwrap_or_else(|arc| (*arc).clone_shallow());
        match self.add(pkg) {
            Ok(outcome) => Some(Arc::clone(&self.arena[outcome.item_id().0 as usize].pkg)),
            Err(e) => {
                debug!(uid = %uid, error = %e, "failed to add local package to universe");
                None
            }
        }
    }

    /// Discover and insert every remote that would upgrade `local` under
    /// `uid`, plus `local` itself. Returns the chain once populated, or
    /// `None` if no remote is an upgrade and `force` is false (spec.md
    /// §4.B).
    ///
    /// `pinned_version`, when set, restricts the remotes considered to
    /// exactly that version (e.g. `pkg install foo-1.2.3`): remotes at any
    /// other version are skipped entirely, as if the repository didn't
    /// carry them. `local` is still inserted regardless of the pin.
    pub fn upgrade_candidates(
        &mut self,
        uid: &Uid,
        local: Option<&Package>,
        force: bool,
        pinned_version: Option<&PkgVersion>,
    ) -> Option<Chain> {
        if let Some(chain) = self.chains.get(uid) {
            return Some(chain.clone());
        }

        let remotes = self
            .store
            .repo_names()
            .into_iter()
            .flat_map(|repo| {
                self.store
                    .repo_query(uid.as_str(), MatchKind::Exact, &repo)
            })
            .collect::<Vec<_>>();

        let mut any_upgrade = false;
        for remote in &remotes {
            if let Some(pinned) = pinned_version
                && remote.version.compare(pinned) != Ordering::Equal
            {
                trace!(uid = %uid, "remote skipped, does not match pinned version");
                continue;
            }

            let is_upgrade = match local {
                Some(l) => need_upgrade(remote, l),
                None => true,
            };
            if is_upgrade || force {
                any_upgrade |= is_upgrade;
                let owned = (**remote).clone_shallow();
                if let Err(e) = self.add(owned) {
                    debug!(uid = %uid, error = %e, "failed to add remote candidate");
                }
            }
        }

        if let Some(l) = local {
            let owned = l.clone_shallow();
            if let Err(e) = self.add(owned) {
                debug!(uid = %uid, error = %e, "failed to add local candidate");
            }
        }

        if !any_upgrade && !force {
            return None;
        }

        self.chains.get(uid).cloned()
    }

    /// Deterministic pick among a chain's candidates (spec.md §4.B).
    #[must_use]
    pub fn select_candidate<'a>(
        &'a self,
        chain: &Chain,
        local: Option<&Package>,
        conservative: bool,
        reponame: Option<&str>,
        pinning: bool,
    ) -> Option<&'a UniverseItem> {
        let mut candidates: Vec<&UniverseItem> =
            chain.iter().map(|&id| &self.arena[id.0 as usize]).collect();

        if pinning
            && let Some(repo) = reponame
        {
            let pinned: Vec<&UniverseItem> = candidates
                .iter()
                .copied()
                .filter(|item| item.pkg.repo_name.as_deref() == Some(repo))
                .collect();
            if !pinned.is_empty() {
                candidates = pinned;
            }
        }

        if conservative
            && let Some(local_pkg) = local
        {
            if let Some(local_digest) = local_pkg.digest()
                && let Some(item) = candidates
                    .iter()
                    .find(|item| item.pkg.digest().as_deref() == Some(&*local_digest))
            {
                return Some(item);
            }
            if let Some(item) = candidates
                .iter()
                .find(|item| item.pkg.version == local_pkg.version)
            {
                return Some(item);
            }
        }

        let repo_names = self.store.repo_names();
        let repo_priority = |item: &UniverseItem| -> usize {
            item.pkg
                .repo_name
                .as_ref()
                .and_then(|r| repo_names.iter().position(|n| n.as_ref() == r.as_ref()))
                .unwrap_or(usize::MAX)
        };

        candidates.sort_by(|a, b| {
            b.pkg
                .version
                .compare(&a.pkg.version)
                .then_with(|| repo_priority(a).cmp(&repo_priority(b)))
                .then_with(|| a.pkg.uid.cmp(&b.pkg.uid))
        });

        candidates.into_iter().next()
    }
}

/// Returns true iff `remote` would actually upgrade `local`, per spec.md
/// §4.B's enumerated field comparison. Equal digests short-circuit to false.
#[must_use]
pub fn need_upgrade(remote: &Package, local: &Package) -> bool {
    if let (Some(rd), Some(ld)) = (remote.digest(), local.digest())
        && rd == ld
    {
        return false;
    }

    if remote.version.compare(&local.version) == Ordering::Greater {
        return true;
    }
    if remote.arch != local.arch {
        return true;
    }
    if deps_differ(remote, local) {
        return true;
    }
    if *remote.conflicts.lock() != *local.conflicts.lock() {
        return true;
    }
    if remote.provides != local.provides {
        return true;
    }
    if remote.requires != local.requires {
        return true;
    }
    if remote.shlibs_provided != local.shlibs_provided {
        return true;
    }
    if remote.shlibs_required != local.shlibs_required {
        return true;
    }

    false
}

fn deps_differ(remote: &Package, local: &Package) -> bool {
    let remote_set: ahash::AHashSet<(&str, &str)> = remote
        .deps
        .iter()
        .map(|d| (d.name.as_ref(), d.uid.as_str()))
        .collect();
    let local_set: ahash::AHashSet<(&str, &str)> = local
        .deps
        .iter()
        .map(|d| (d.name.as_ref(), d.uid.as_str()))
        .collect();
    remote_set != local_set
}

fn compute_digest(pkg: &Package) -> Result<Arc<str>> {
    use std::hash::{BuildHasher, Hasher};

    if pkg.uid.as_str().is_empty() {
        return Err(Error::DigestFailed {
            uid: pkg.uid.to_string(),
            reason: "empty uid".to_string(),
        });
    }

    let build = ahash::RandomState::with_seeds(0xD1, 0x5B, 0xC0, 0xDE);
    let mut hasher = build.build_hasher();
    hasher.write(pkg.uid.as_str().as_bytes());
    hasher.write(pkg.version.as_str().as_bytes());
    hasher.write(pkg.origin.as_bytes());
    hasher.write(pkg.arch.as_bytes());
    for dep in &pkg.deps {
        hasher.write(dep.uid.as_str().as_bytes());
    }
    Ok(Arc::from(format!("{:016x}", hasher.finish())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{DepRef, PackageBuilder, PackageType};
    use crate::store::{LoadMask, LockMode};
    use depsolve_core::PkgVersion;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        repos: Vec<Arc<str>>,
        remotes: Mutex<AHashMap<Arc<str>, Vec<Arc<Package>>>>,
        locals: Mutex<Vec<Arc<Package>>>,
    }

    impl PackageStore for FakeStore {
        fn query(&self, pattern: &str, _match_kind: MatchKind) -> Vec<Arc<Package>> {
            self.locals
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.uid.as_str() == pattern)
                .cloned()
                .collect()
        }
        fn query_cond(&self, _f: &str, _p: &[&str], _m: MatchKind) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn ensure_loaded(&self, _pkg: &Package, _fields: LoadMask) -> Result<()> {
            Ok(())
        }
        fn repo_query(&self, pattern: &str, _m: MatchKind, repo_name: &str) -> Vec<Arc<Package>> {
            self.remotes
                .lock()
                .unwrap()
                .get(repo_name)
                .into_iter()
                .flatten()
                .filter(|p| p.uid.as_str() == pattern)
                .cloned()
                .collect()
        }
        fn repo_shlib_provide(&self, _s: &str, _r: &str) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn file_path_owner(&self, _path: &Path) -> Option<Uid> {
            None
        }
        fn repo_names(&self) -> Vec<Arc<str>> {
            self.repos.clone()
        }
        fn begin_solver(&self) {}
        fn end_solver(&self) {}
        fn upgrade_lock(&self, _mode: LockMode) -> Result<()> {
            Ok(())
        }
        fn release_lock(&self) {}
        fn apply_replacements(&self, _r: &[(Uid, Uid)]) -> Result<()> {
            Ok(())
        }
    }

    fn v(s: &str) -> PkgVersion {
        PkgVersion::parse(s).unwrap()
    }

    fn pkg(uid: &str, version: &str, kind: PackageType) -> Package {
        PackageBuilder::new(Uid::new(uid), uid, v(version), kind)
            .arch("amd64")
            .build()
    }

    #[test]
    fn add_dedups_by_digest() {
        let store = Arc::new(FakeStore::default());
        let mut universe = Universe::new(store);

        let p1 = pkg("foo", "1.0", PackageType::Remote);
        let p2 = pkg("foo", "1.0", PackageType::Remote);

        let a = universe.add(p1).unwrap();
        let b = universe.add(p2).unwrap();

        assert!(matches!(a, AddOutcome::Inserted(_)));
        assert!(matches!(b, AddOutcome::Existing(_)));
        assert_eq!(a.item_id(), b.item_id());
        assert_eq!(universe.find(&Uid::new("foo")).unwrap().len(), 1);
    }

    #[test]
    fn need_upgrade_false_for_identical_package() {
        let pkg = pkg("foo", "1.0", PackageType::Remote);
        assert!(!need_upgrade(&pkg, &pkg));
    }

    #[test]
    fn need_upgrade_true_on_higher_version() {
        let local = pkg("foo", "1.0", PackageType::Installed);
        let remote = pkg("foo", "2.0", PackageType::Remote);
        assert!(need_upgrade(&remote, &local));
    }

    #[test]
    fn need_upgrade_false_on_lower_remote_version() {
        let local = pkg("foo", "2.0", PackageType::Installed);
        let remote = pkg("foo", "1.0", PackageType::Remote);
        assert!(!need_upgrade(&remote, &local));
    }

    #[test]
    fn select_candidate_picks_highest_version() {
        let store = Arc::new(FakeStore::default());
        let mut universe = Universe::new(store);
        universe
            .add(pkg("foo", "1.0", PackageType::Remote))
            .unwrap();
        universe
            .add(pkg("foo", "2.0", PackageType::Remote))
            .unwrap();

        let chain = universe.find(&Uid::new("foo")).unwrap().clone();
        let selected = universe
            .select_candidate(&chain, None, false, None, false)
            .unwrap();
        assert_eq!(selected.pkg.version.as_str(), "2.0");
    }

    #[test]
    fn select_candidate_conservative_prefers_local_version() {
        let store = Arc::new(FakeStore::default());
        let mut universe = Universe::new(store);
        let local = pkg("foo", "1.5", PackageType::Installed);
        universe.add(local).unwrap();
        universe
            .add(pkg("foo", "2.0", PackageType::Remote))
            .unwrap();

        let chain = universe.find(&Uid::new("foo")).unwrap().clone();
        let local_pkg = pkg("foo", "1.5", PackageType::Installed);
        let selected = universe
            .select_candidate(&chain, Some(&local_pkg), true, None, false)
            .unwrap();
        assert_eq!(selected.pkg.version.as_str(), "1.5");
    }

    #[test]
    fn deps_differ_detects_added_dependency() {
        let mut remote = pkg("foo", "1.0", PackageType::Remote);
        remote.deps.push(DepRef {
            uid: Uid::new("bar"),
            name: Arc::from("bar"),
            version: None,
        });
        let local = pkg("foo", "1.0", PackageType::Installed);
        assert!(need_upgrade(&remote, &local));
    }
}
