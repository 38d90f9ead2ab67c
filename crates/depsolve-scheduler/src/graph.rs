//! Cycle breaking and deterministic topological ordering over a job list
//! (spec.md §4.G).

use crate::job::{Job, JobId, JobType};
use ahash::AHashMap;
use depsolve_core::{Error, Result};
use depsolve_universe::{Uid, Universe};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

/// Owns the job list across the cycle-break/split/sort pipeline.
#[derive(Debug)]
pub struct JobGraph {
    jobs: Vec<Job>,
}

impl JobGraph {
    #[must_use]
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id.index() as usize]
    }

    /// Run the repeat loop of spec.md §4.G to completion: detect a cycle,
    /// split an eligible Upgrade job on it, repeat until acyclic, then
    /// return the deterministic Kahn topological order.
    pub fn schedule(&mut self, universe: &Universe) -> Result<Vec<JobId>> {
        loop {
            let edges = self.build_edges(universe);
            let Some(cycle) = find_cycle(self.jobs.len(), &edges) else {
                break;
            };

            let split_target = cycle.iter().copied().find(|&i| self.jobs[i].job_type == JobType::Upgrade);
            let Some(idx) = split_target else {
                return Err(Error::ChainCycle);
            };

            debug!(job = idx, "splitting upgrade to break scheduling cycle");
            self.split_upgrade(idx);
        }

        let edges = self.build_edges(universe);
        let order = topo_sort(&self.jobs, universe, &edges);
        Ok(order.into_iter().map(|i| JobId::from_raw(u32::try_from(i).expect("job count fits u32"))).collect())
    }

    /// Replace the Upgrade job at `idx` with an UpgradeRemove (reusing the
    /// slot) and a freshly pushed UpgradeInstall, linked by `xlink`
    /// (spec.md §4.G).
    fn split_upgrade(&mut self, idx: usize) {
        let new_item = self.jobs[idx].new_item.take();
        let new_job_id = JobId::from_raw(u32::try_from(self.jobs.len()).expect("job count fits u32"));

        self.jobs[idx].job_type = JobType::UpgradeRemove;
        self.jobs[idx].priority = JobType::UpgradeRemove.priority_bias();
        self.jobs[idx].xlink = Some(new_job_id);

        self.jobs.push(Job {
            job_type: JobType::UpgradeInstall,
            new_item,
            old_item: None,
            xlink: Some(JobId::from_raw(u32::try_from(idx).expect("job count fits u32"))),
            priority: JobType::UpgradeInstall.priority_bias(),
        });
    }

    /// Builds the four edge kinds from spec.md §4.G against the *current*
    /// job list. Rebuilding from scratch each pass (rather than rewiring
    /// incrementally on split) keeps the edge derivation a pure function of
    /// job state, which a split naturally updates.
    fn build_edges(&self, universe: &Universe) -> DiGraph<(), ()> {
        let mut g = DiGraph::<(), ()>::with_capacity(self.jobs.len(), self.jobs.len() * 2);
        let nodes: Vec<NodeIndex> = (0..self.jobs.len()).map(|_| g.add_node(())).collect();

        let mut new_by_uid: AHashMap<Uid, usize> = AHashMap::new();
        let mut old_by_uid: AHashMap<Uid, usize> = AHashMap::new();
        for (i, job) in self.jobs.iter().enumerate() {
            if let Some(id) = job.new_item {
                new_by_uid.insert(universe.item(id).pkg.uid.clone(), i);
            }
            if let Some(id) = job.old_item {
                old_by_uid.insert(universe.item(id).pkg.uid.clone(), i);
            }
        }

        for (i, job) in self.jobs.iter().enumerate() {
            // 1. B's new package depends on A's new package: A before B.
            if let Some(new_id) = job.new_item {
                for dep in &universe.item(new_id).pkg.deps {
                    if let Some(&a) = new_by_uid.get(&dep.uid)
                        && a != i
                    {
                        g.update_edge(nodes[a], nodes[i], ());
                    }
                }
            }
            // 2. A's old package depends on B's old package: A before B
            //    (delete the dependent before the dependency).
            if let Some(old_id) = job.old_item {
                for dep in &universe.item(old_id).pkg.deps {
                    if let Some(&b) = old_by_uid.get(&dep.uid)
                        && b != i
                    {
                        g.update_edge(nodes[i], nodes[b], ());
                    }
                }
            }
            // 3. A's old package conflicts with B's new package: A before B.
            if let Some(old_id) = job.old_item {
                let old_uid = &universe.item(old_id).pkg.uid;
                for (j, other) in self.jobs.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    if let Some(new_id) = other.new_item
                        && universe.item(old_id).pkg.conflicts_with(&universe.item(new_id).pkg.uid)
                    {
                        let _ = old_uid;
                        g.update_edge(nodes[i], nodes[j], ());
                    }
                }
            }
            // 4. The split-upgrade edge: remove-half before install-half.
            if job.job_type == JobType::UpgradeRemove
                && let Some(pair) = job.xlink
            {
                g.update_edge(nodes[i], nodes[pair.index() as usize], ());
            }
        }

        g
    }
}

fn find_cycle(n: usize, graph: &DiGraph<(), ()>) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut mark = vec![Mark::Unvisited; n];
    let mut path: Vec<usize> = Vec::new();

    fn visit(
        node: usize,
        graph: &DiGraph<(), ()>,
        mark: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        mark[node] = Mark::OnPath;
        path.push(node);

        for next in graph.neighbors_directed(NodeIndex::new(node), Direction::Outgoing) {
            let next = next.index();
            match mark[next] {
                Mark::OnPath => {
                    let start = path.iter().position(|&n| n == next).expect("next is on path");
                    return Some(path[start..].to_vec());
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, graph, mark, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        path.pop();
        mark[node] = Mark::Done;
        None
    }

    for start in 0..n {
        if mark[start] == Mark::Unvisited
            && let Some(cycle) = visit(start, graph, &mut mark, &mut path)
        {
            return Some(cycle);
        }
    }
    None
}

fn job_uid<'a>(idx: usize, jobs: &[Job], universe: &'a Universe) -> &'a Uid {
    let id = jobs[idx].primary_item().expect("every job has at least one item");
    &universe.item(id).pkg.uid
}

/// Kahn's algorithm with the deterministic `(priority DESC, uid DESC)`
/// tie-break (spec.md §4.G).
fn topo_sort(jobs: &[Job], universe: &Universe, graph: &DiGraph<(), ()>) -> Vec<usize> {
    let n = jobs.len();
    let mut indeg = vec![0usize; n];
    for node in graph.node_indices() {
        indeg[node.index()] = graph.neighbors_directed(node, Direction::Incoming).count();
    }

    let mut available: Vec<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();
    let mut sorted = Vec::with_capacity(n);

    while !available.is_empty() {
        available.sort_by(|&a, &b| {
            jobs[a]
                .priority
                .cmp(&jobs[b].priority)
                .then_with(|| job_uid(a, jobs, universe).cmp(job_uid(b, jobs, universe)))
        });
        let idx = available.pop().expect("non-empty checked above");
        sorted.push(idx);

        for succ in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
            indeg[succ.index()] -= 1;
            if indeg[succ.index()] == 0 {
                available.push(succ.index());
            }
        }
    }

    assert_eq!(
        sorted.len(),
        n,
        "scheduler graph has unscheduled nodes despite the acyclic check"
    );
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsolve_core::PkgVersion;
    use depsolve_universe::{LoadMask, LockMode, MatchKind, Package, PackageBuilder, PackageStore, PackageType};
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Default)]
    struct NullStore;
    impl PackageStore for NullStore {
        fn query(&self, _p: &str, _m: MatchKind) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn query_cond(&self, _f: &str, _p: &[&str], _m: MatchKind) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn ensure_loaded(&self, _pkg: &Package, _fields: LoadMask) -> Result<()> {
            Ok(())
        }
        fn repo_query(&self, _p: &str, _m: MatchKind, _r: &str) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn repo_shlib_provide(&self, _s: &str, _r: &str) -> Vec<Arc<Package>> {
            Vec::new()
        }
        fn file_path_owner(&self, _path: &Path) -> Option<Uid> {
            None
        }
        fn repo_names(&self) -> Vec<Arc<str>> {
            Vec::new()
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
    fn linear_deps_sort_in_dependency_order() {
        let store: Arc<dyn PackageStore> = Arc::new(NullStore);
        let mut universe = Universe::new(store);

        let base = PackageBuilder::new(Uid::new("base"), "base", v("1.0"), PackageType::Remote).build();
        let base_id = universe.add(base).unwrap().item_id();

        let top = PackageBuilder::new(Uid::new("top"), "top", v("1.0"), PackageType::Remote)
            .dep(depsolve_universe::DepRef {
                uid: Uid::new("base"),
                name: Arc::from("base"),
                version: None,
            })
            .build();
        let top_id = universe.add(top).unwrap().item_id();

        let jobs = vec![Job::install(top_id), Job::install(base_id)];
        let mut graph = JobGraph::new(jobs);
        let order = graph.schedule(&universe).unwrap();

        let base_pos = order.iter().position(|&id| graph.job(id).new_item == Some(base_id)).unwrap();
        let top_pos = order.iter().position(|&id| graph.job(id).new_item == Some(top_id)).unwrap();
        assert!(base_pos < top_pos, "dependency must be installed before dependent");
    }

    #[test]
    fn cycle_without_upgrade_job_is_fatal() {
        let store: Arc<dyn PackageStore> = Arc::new(NullStore);
        let mut universe = Universe::new(store);

        let a = PackageBuilder::new(Uid::new("a"), "a", v("1.0"), PackageType::Remote)
            .dep(depsolve_universe::DepRef {
                uid: Uid::new("b"),
                name: Arc::from("b"),
                version: None,
            })
            .build();
        let a_id = universe.add(a).unwrap().item_id();

        let b = PackageBuilder::new(Uid::new("b"), "b", v("1.0"), PackageType::Remote)
            .dep(depsolve_universe::DepRef {
                uid: Uid::new("a"),
                name: Arc::from("a"),
                version: None,
            })
            .build();
        let b_id = universe.add(b).unwrap().item_id();

        let jobs = vec![Job::install(a_id), Job::install(b_id)];
        let mut graph = JobGraph::new(jobs);
        let result = graph.schedule(&universe);
        assert!(matches!(result, Err(Error::ChainCycle)));
    }
}
