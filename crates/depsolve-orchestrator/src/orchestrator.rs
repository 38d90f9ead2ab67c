//! Drives the whole pipeline from a user-facing operation down to an
//! ordered job list, looping the Conflict Engine to a fixpoint before
//! handing off to the scheduler (spec.md §4.H).

use ahash::AHashSet;
use depsolve_conflict::ConflictEngine;
use depsolve_core::{Context, Error, EventSink, Result};
use depsolve_request::{InstallMode, Request};
use depsolve_scheduler::{Job, JobGraph, JobId, JobType};
use depsolve_universe::{PackageStore, PackageType, Uid, Universe};
use std::sync::Arc;
use tracing::{debug, info};

/// Which top-level user operation is being solved (spec.md §4.H `j.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Autoremove,
    Deinstall,
    Install,
    Upgrade,
    Fetch,
}

/// The result of one `Orchestrator::solve` call: the scheduled job order
/// plus bookkeeping the caller needs before `execute` (spec.md §3, §4.H).
#[derive(Debug)]
pub struct SolveOutcome {
    pub order: Vec<JobId>,
    pub graph: JobGraph,
    /// True when a job targets a remote package whose files/dirs aren't
    /// loaded yet; the caller must fetch before `execute` can proceed, and
    /// the conflict fixpoint loop is skipped until a subsequent solve with a
    /// warm cache.
    pub need_fetch: bool,
    /// (old_uid, new_uid) pairs where a capability previously satisfied by
    /// `old_uid` is now satisfied by a differently-named package (spec.md
    /// §3 Replacement table). Consumed once by the persistent-store adapter.
    pub replacements: Vec<(Uid, Uid)>,
}

/// Caps how many times the conflict-discovery/re-solve fixpoint loop
/// (spec.md §4.D, §4.H) may iterate before the conflict is surfaced as
/// unresolved rather than retried forever.
const CONFLICT_RESOLVE_LIMIT: u32 = 10;

/// Drives `Request` → `Universe` → SAT encode/solve → Scheduler end to end,
/// re-entering the SAT solve whenever conflict discovery finds something new
/// (spec.md §4.H).
pub struct Orchestrator {
    store: Arc<dyn PackageStore>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: Arc<dyn PackageStore>) -> Self {
        Self { store }
    }

    /// Run one full solve (spec.md §4.H). `request` must already carry the
    /// patterns the caller wants resolved; this populates its entries
    /// according to `op`, runs the SAT solver, loops conflict discovery to a
    /// fixpoint, and schedules the result.
    pub fn solve(
        &self,
        op: OperationKind,
        request: &mut Request,
        universe: &mut Universe,
        ctx: &Context,
        sink: &dyn EventSink,
    ) -> Result<SolveOutcome> {
        self.store.begin_solver();
        let result = self.solve_inner(op, request, universe, ctx, sink);
        self.store.end_solver();
        result
    }

    fn solve_inner(
        &self,
        op: OperationKind,
        request: &mut Request,
        universe: &mut Universe,
        ctx: &Context,
        sink: &dyn EventSink,
    ) -> Result<SolveOutcome> {
        self.populate_request(op, request, universe, ctx)?;
        request.resolve_entry_conflicts(universe);
        info!(op = ?op, entries = request.entries().len(), "request resolved");

        let mut jobs = depsolve_sat::solve(universe, request.entries(), ctx, sink)?;
        if op == OperationKind::Fetch {
            jobs = jobs.into_iter().filter_map(|j| j.new_item.map(Job::fetch)).collect();
        }
        info!(jobs = jobs.len(), "initial solve complete");

        let replacements = compute_replacements(&jobs, universe);
        if !replacements.is_empty() {
            self.store.apply_replacements(&replacements)?;
        }

        let need_fetch = jobs.iter().any(|j| job_needs_fetch(j, universe));

        if op != OperationKind::Fetch && !need_fetch {
            let mut engine = ConflictEngine::new(ctx);
            let mut attempt = 0;
            loop {
                engine.reset_pass();
                for job in &jobs {
                    if let Some(id) = job.new_item {
                        engine.append_chain(id, universe, self.store.as_ref())?;
                    }
                }

                if engine.conflicts_registered() == 0 {
                    break;
                }

                attempt += 1;
                if attempt > CONFLICT_RESOLVE_LIMIT {
                    return Err(Error::Conflict {
                        count: engine.conflicts_registered() as usize,
                    });
                }

                debug!(attempt, conflicts = engine.conflicts_registered(), "re-solving after newly discovered conflicts");
                jobs = depsolve_sat::solve(universe, request.entries(), ctx, sink)?;
            }
        }

        let mut graph = JobGraph::new(jobs);
        let order = graph.schedule(universe)?;
        info!(scheduled = order.len(), need_fetch, "scheduling complete");

        Ok(SolveOutcome {
            order,
            graph,
            need_fetch,
            replacements,
        })
    }

    fn populate_request(
        &self,
        op: OperationKind,
        request: &mut Request,
        universe: &mut Universe,
        ctx: &Context,
    ) -> Result<()> {
        match op {
            OperationKind::Autoremove => request.resolve_autoremove(universe, self.store.as_ref()),
            OperationKind::Deinstall => request.resolve_delete(universe, self.store.as_ref()),
            OperationKind::Install | OperationKind::Fetch => {
                request.resolve_install_upgrade(universe, self.store.as_ref(), ctx, InstallMode::Install)?;
                request.process_add_request(universe, ctx, true)
            }
            OperationKind::Upgrade => {
                request.resolve_install_upgrade(universe, self.store.as_ref(), ctx, InstallMode::Upgrade)?;
                request.process_add_request(universe, ctx, true)
            }
        }
    }
}

/// A job's target is unfetched when it's a remote candidate whose files/dirs
/// haven't been loaded — conflict discovery can only be trusted once they
/// are (spec.md §4.D `append_chain`, §4.H).
fn job_needs_fetch(job: &Job, universe: &Universe) -> bool {
    let Some(id) = job.new_item else { return false };
    if !matches!(job.job_type, JobType::Install | JobType::Upgrade | JobType::UpgradeInstall | JobType::Fetch) {
        return false;
    }
    let pkg = &universe.item(id).pkg;
    pkg.kind != PackageType::Installed && !pkg.files_loaded()
}

/// Best-effort replacement-table derivation (spec.md §3): when a standalone
/// delete removes a package that `provides` some capability, and a distinct
/// uid is newly installed providing that same capability, record the pair.
/// The original tracks this per dependency edge as it re-resolves; this data
/// model only carries provides/requires sets, so the capability itself
/// (rather than a specific requirer) is the matching key — a documented
/// simplification (see DESIGN.md).
fn compute_replacements(jobs: &[Job], universe: &Universe) -> Vec<(Uid, Uid)> {
    let removed_caps: Vec<(Uid, AHashSet<Arc<str>>)> = jobs
        .iter()
        .filter(|j| j.job_type == JobType::Delete)
        .filter_map(|j| j.old_item)
        .map(|id| {
            let pkg = &universe.item(id).pkg;
            (pkg.uid.clone(), pkg.provides.iter().cloned().collect())
        })
        .filter(|(_, caps): &(Uid, AHashSet<Arc<str>>)| !caps.is_empty())
        .collect();

    if removed_caps.is_empty() {
        return Vec::new();
    }

    let mut replacements = Vec::new();
    for job in jobs {
        if !matches!(job.job_type, JobType::Install | JobType::UpgradeInstall) {
            continue;
        }
        let Some(id) = job.new_item else { continue };
        let new_pkg = &universe.item(id).pkg;
        for (old_uid, caps) in &removed_caps {
            if old_uid == &new_pkg.uid {
                continue;
            }
            if new_pkg.provides.iter().any(|c| caps.contains(c)) {
                replacements.push((old_uid.clone(), new_pkg.uid.clone()));
            }
        }
    }
    replacements
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsolve_core::{NullEventSink, PkgVersion};
    use depsolve_universe::{LoadMask, LockMode, MatchKind, Package, PackageBuilder};
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        repos: Vec<Arc<str>>,
        remotes: Mutex<ahash::AHashMap<Arc<str>, Vec<Arc<Package>>>>,
        locals: Mutex<Vec<Arc<Package>>>,
    }

    impl FakeStore {
        fn with_repo(repo: &str) -> Self {
            Self {
                repos: vec![Arc::from(repo)],
                ..Self::default()
            }
        }

        fn add_remote(&self, repo: &str, pkg: Package) {
            self.remotes.lock().unwrap().entry(Arc::from(repo)).or_default().push(Arc::new(pkg));
        }
    }

    impl PackageStore for FakeStore {
        fn query(&self, pattern: &str, match_kind: MatchKind) -> Vec<Arc<Package>> {
            if matches!(match_kind, MatchKind::All) {
                return self.locals.lock().unwrap().clone();
            }
            self.locals.lock().unwrap().iter().filter(|p| p.uid.as_str() == pattern).cloned().collect()
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

    #[test]
    fn install_of_uncached_remote_sets_need_fetch() {
        let store = FakeStore::with_repo("main");
        store.add_remote(
            "main",
            PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote)
                .origin("ports/foo")
                .build(),
        );
        let store: Arc<dyn PackageStore> = Arc::new(store);
        let mut universe = Universe::new(Arc::clone(&store));
        let ctx = Context::default();
        let sink = NullEventSink;

        let orchestrator = Orchestrator::new(Arc::clone(&store));
        let mut request = Request::new();
        request.add_pattern("foo", MatchKind::Exact);

        let outcome = orchestrator
            .solve(OperationKind::Install, &mut request, &mut universe, &ctx, &sink)
            .unwrap();

        assert!(outcome.need_fetch);
        assert_eq!(outcome.order.len(), 1);
    }

    #[test]
    fn fetch_operation_synthesizes_fetch_jobs_not_install() {
        let store = FakeStore::with_repo("main");
        store.add_remote(
            "main",
            PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote)
                .origin("ports/foo")
                .build(),
        );
        let store: Arc<dyn PackageStore> = Arc::new(store);
        let mut universe = Universe::new(Arc::clone(&store));
        let ctx = Context::default();
        let sink = NullEventSink;

        let orchestrator = Orchestrator::new(Arc::clone(&store));
        let mut request = Request::new();
        request.add_pattern("foo", MatchKind::Exact);

        let outcome = orchestrator
            .solve(OperationKind::Fetch, &mut request, &mut universe, &ctx, &sink)
            .unwrap();

        assert_eq!(outcome.order.len(), 1);
        let job = outcome.graph.job(outcome.order[0]);
        assert_eq!(job.job_type, JobType::Fetch);
    }
}
