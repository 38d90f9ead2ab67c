//! The Request Manager (spec.md §4.C): turns user-facing patterns into
//! concrete `RequestEntry` sets over the universe, and resolves the
//! cross-request ties a single final component of origin can produce.

use ahash::AHashSet;
use depsolve_core::{Context, Error, Result};
use depsolve_universe::{ItemId, LoadMask, MatchKind, PackageStore, Uid, Universe};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// A single user- or internally-supplied match pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub text: String,
    pub match_kind: MatchKind,
}

impl Pattern {
    #[must_use]
    pub fn new(text: impl Into<String>, match_kind: MatchKind) -> Self {
        Self {
            text: text.into(),
            match_kind,
        }
    }
}

/// One candidate item within a `RequestEntry`, carrying the per-item flags
/// the cross-request tie-break and job synthesis stages need.
#[derive(Debug, Clone, Copy)]
pub struct RequestItem {
    pub item_id: ItemId,
    pub automatic: bool,
    pub skip: bool,
}

/// Whether a `RequestEntry`'s chain should be installed (request one item
/// from it true) or deleted (request every item in it false) by the SAT
/// encoder's Request clause family (spec.md §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEntryKind {
    Add,
    Delete,
}

/// A pattern's expansion into universe items: the uid it matched, and every
/// candidate item discovered for that uid.
#[derive(Debug, Clone)]
pub struct RequestEntry {
    pub pattern: Pattern,
    pub uid: Uid,
    pub kind: RequestEntryKind,
    pub items: Vec<RequestItem>,
}

impl RequestEntry {
    #[must_use]
    pub fn new(pattern: Pattern, uid: Uid, kind: RequestEntryKind) -> Self {
        Self {
            pattern,
            uid,
            kind,
            items: Vec::new(),
        }
    }
}

/// Whether a request's install/upgrade pass treats a non-exact pattern that
/// doesn't match anything locally installed as a no-op (`Upgrade`) or an
/// install target (`Install`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    Install,
    Upgrade,
}

/// The accumulated set of patterns and resolved entries for one solve.
#[derive(Debug, Default)]
pub struct Request {
    patterns: Vec<Pattern>,
    entries: Vec<RequestEntry>,
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[RequestEntry] {
        &self.entries
    }

    /// Append a pattern to the request's pattern list (spec.md §4.C).
    pub fn add_pattern(&mut self, text: impl Into<String>, match_kind: MatchKind) {
        self.patterns.push(Pattern::new(text, match_kind));
    }

    /// For each pattern, query the repositories, expand each hit through
    /// `Universe::upgrade_candidates`, and record a `RequestEntry`. Locked
    /// local counterparts are fatal; non-exact upgrade patterns that miss a
    /// local install are silently dropped (spec.md §4.C).
    pub fn resolve_install_upgrade(
        &mut self,
        universe: &mut Universe,
        store: &dyn PackageStore,
        ctx: &Context,
        mode: InstallMode,
    ) -> Result<()> {
        let patterns = self.patterns.clone();
        for pattern in patterns {
            for uid in hits_for_pattern(store, &pattern) {
                let local = universe.get_local(&uid);

                if let Some(local_pkg) = &local
                    && local_pkg.locked
                {
                    return Err(Error::Locked {
                        uid: uid.to_string(),
                    });
                }

                let is_broad = !matches!(pattern.match_kind, MatchKind::Exact | MatchKind::All);
                if mode == InstallMode::Upgrade && is_broad && local.is_none() {
                    debug!(uid = %uid, "upgrade of unmatched package is a no-op");
                    continue;
                }

                // Patterns carry only a uid match, not a version pin; a host
                // that wants to install an exact version would resolve it to
                // a concrete `PkgVersion` before reaching this point and pass
                // it through here instead of `None`.
                let Some(chain) =
                    universe.upgrade_candidates(&uid, local.as_deref(), ctx.force, None)
                else {
                    continue;
                };

                let mut entry = RequestEntry::new(pattern.clone(), uid, RequestEntryKind::Add);
                for id in chain {
                    entry.items.push(RequestItem {
                        item_id: id,
                        automatic: false,
                        skip: false,
                    });
                }
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Query the local DB for each pattern, record delete entries, then
    /// transitively walk reverse dependencies. A locked rdep aborts the
    /// whole request (spec.md §4.C).
    pub fn resolve_delete(&mut self, universe: &mut Universe, store: &dyn PackageStore) -> Result<()> {
        let mut seen: AHashSet<Uid> = AHashSet::new();
        let mut queue: VecDeque<Uid> = VecDeque::new();

        let patterns = self.patterns.clone();
        for pattern in &patterns {
            for pkg in store.query(&pattern.text, pattern.match_kind) {
                if seen.insert(pkg.uid.clone()) {
                    queue.push_back(pkg.uid.clone());
                }
            }
        }

        let mut delete_set: Vec<Uid> = queue.iter().cloned().collect();

        while let Some(uid) = queue.pop_front() {
            let Some(local) = universe.get_local(&uid) else {
                continue;
            };
            store.ensure_loaded(
                &local,
                LoadMask {
                    rdeps: true,
                    ..LoadMask::default()
                },
            )?;
            let Some(rdeps) = local.rdeps() else {
                continue;
            };
            for rdep_uid in rdeps {
                if seen.contains(&rdep_uid) {
                    continue;
                }
                let rdep_local = universe.get_local(&rdep_uid);
                if let Some(rdep_pkg) = &rdep_local
                    && rdep_pkg.locked
                {
                    return Err(Error::Locked {
                        uid: rdep_uid.to_string(),
                    });
                }
                seen.insert(rdep_uid.clone());
                delete_set.push(rdep_uid.clone());
                queue.push_back(rdep_uid);
            }
        }

        self.entries = delete_set
            .into_iter()
            .filter_map(|uid| {
                let chain = universe.find(&uid)?.clone();
                let mut entry = RequestEntry::new(
                    Pattern::new(uid.to_string(), MatchKind::Internal),
                    uid,
                    RequestEntryKind::Delete,
                );
                for id in chain {
                    entry.items.push(RequestItem {
                        item_id: id,
                        automatic: false,
                        skip: false,
                    });
                }
                Some(entry)
            })
            .collect();

        Ok(())
    }

    /// Enumerate every locally installed, non-vital, automatic package whose
    /// transitive closure of rdeps is also automatic (spec.md §4.C).
    pub fn resolve_autoremove(&mut self, universe: &mut Universe, store: &dyn PackageStore) -> Result<()> {
        let installed = store.query("", MatchKind::All);
        let mut removable = Vec::new();

        'outer: for pkg in &installed {
            if pkg.vital || !pkg.is_automatic() {
                continue;
            }
            store.ensure_loaded(
                pkg,
                LoadMask {
                    rdeps: true,
                    ..LoadMask::default()
                },
            )?;

            let mut stack: Vec<Uid> = pkg.rdeps().unwrap_or_default();
            let mut visited: AHashSet<Uid> = AHashSet::new();
            while let Some(rdep_uid) = stack.pop() {
                if !visited.insert(rdep_uid.clone()) {
                    continue;
                }
                let Some(rdep) = store.query(rdep_uid.as_str(), MatchKind::Exact).into_iter().next()
                else {
                    continue;
                };
                if !rdep.is_automatic() {
                    continue 'outer;
                }
                store.ensure_loaded(
                    &rdep,
                    LoadMask {
                        rdeps: true,
                        ..LoadMask::default()
                    },
                )?;
                stack.extend(rdep.rdeps().unwrap_or_default());
            }
            removable.push(pkg.uid.clone());
        }

        self.entries = removable
            .into_iter()
            .filter_map(|uid| {
                let chain = universe.find(&uid)?.clone();
                let mut entry = RequestEntry::new(
                    Pattern::new(uid.to_string(), MatchKind::Internal),
                    uid,
                    RequestEntryKind::Delete,
                );
                for id in chain {
                    entry.items.push(RequestItem {
                        item_id: id,
                        automatic: true,
                        skip: false,
                    });
                }
                Some(entry)
            })
            .collect();

        Ok(())
    }

    /// Post-pass that walks deps of each added item, pulls their upgrade
    /// candidates into the universe, and adds any with a remote candidate to
    /// the add-set with `automatic=true`. Iterates to fixpoint on a work
    /// queue (spec.md §4.C); when `recursive` is false only the initial
    /// entries' direct deps are materialised, not deps-of-deps.
    pub fn process_add_request(
        &mut self,
        universe: &mut Universe,
        ctx: &Context,
        recursive: bool,
    ) -> Result<()> {
        let mut seen_uid: AHashSet<Uid> = self.entries.iter().map(|e| e.uid.clone()).collect();
        let mut queue: VecDeque<ItemId> = self
            .entries
            .iter()
            .flat_map(|e| e.items.iter().map(|i| i.item_id))
            .collect();

        while let Some(item_id) = queue.pop_front() {
            let pkg = Arc::clone(&universe.item(item_id).pkg);
            for dep in pkg.deps.clone() {
                if seen_uid.contains(&dep.uid) {
                    continue;
                }
                let local = universe.get_local(&dep.uid);
                let version_pin = dep.version.as_ref();
                let Some(chain) =
                    universe.upgrade_candidates(&dep.uid, local.as_deref(), ctx.force, version_pin)
                else {
                    continue;
                };

                seen_uid.insert(dep.uid.clone());
                let mut entry = RequestEntry::new(
                    Pattern::new(dep.uid.to_string(), MatchKind::Internal),
                    dep.uid.clone(),
                    RequestEntryKind::Add,
                );
                for id in &chain {
                    universe.item(*id).pkg.set_automatic(true);
                    entry.items.push(RequestItem {
                        item_id: *id,
                        automatic: true,
                        skip: false,
                    });
                    if recursive {
                        queue.push_back(*id);
                    }
                }
                self.entries.push(entry);
            }
        }

        Ok(())
    }

    /// Cross-entry tie-break (spec.md §4.C): when a single RequestEntry holds
    /// more than one surviving candidate, prefer the one whose origin's last
    /// path segment equals the package name; otherwise the highest version.
    /// Non-selected items are marked `skip`. Deterministic.
    pub fn resolve_entry_conflicts(&mut self, universe: &Universe) {
        for entry in &mut self.entries {
            if entry.items.len() <= 1 {
                continue;
            }

            let mut ranked: Vec<usize> = (0..entry.items.len()).collect();
            ranked.sort_by(|&a, &b| {
                let pa = &universe.item(entry.items[a].item_id).pkg;
                let pb = &universe.item(entry.items[b].item_id).pkg;
                origin_matches_name(pb)
                    .cmp(&origin_matches_name(pa))
                    .then_with(|| pb.version.compare(&pa.version))
                    .then_with(|| pa.uid.cmp(&pb.uid))
            });

            for (rank, &idx) in ranked.iter().enumerate() {
                entry.items[idx].skip = rank != 0;
            }
        }
    }
}

fn origin_matches_name(pkg: &depsolve_universe::Package) -> bool {
    pkg.origin
        .rsplit('/')
        .next()
        .is_some_and(|last| last == &*pkg.name)
}

fn hits_for_pattern(store: &dyn PackageStore, pattern: &Pattern) -> Vec<Uid> {
    let mut uids: Vec<Uid> = Vec::new();
    for repo in store.repo_names() {
        for pkg in store.repo_query(&pattern.text, pattern.match_kind, &repo) {
            if !uids.contains(&pkg.uid) {
                uids.push(pkg.uid.clone());
            }
        }
    }
    if uids.is_empty() && matches!(pattern.match_kind, MatchKind::Exact) {
        uids.push(Uid::parse(&pattern.text));
    }
    uids
}
