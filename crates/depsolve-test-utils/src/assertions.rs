//! Domain-specific assertion helpers for checking the shape of a scheduled
//! job order, matching what spec.md §8's concrete scenarios expect.

use anyhow::{Context, bail};
use depsolve_scheduler::{JobGraph, JobId, JobType};
use depsolve_universe::{Uid, Universe};

/// Assert that `order` (as scheduled by `graph`) is exactly the given
/// sequence of `(job_type, uid)` pairs, in order.
pub fn assert_job_sequence(
    graph: &JobGraph,
    order: &[JobId],
    universe: &Universe,
    expected: &[(JobType, &str)],
) -> anyhow::Result<()> {
    if order.len() != expected.len() {
        bail!("expected {} jobs, got {}: {:?}", expected.len(), order.len(), describe(graph, order, universe));
    }

    for (i, (&id, &(want_type, want_uid))) in order.iter().zip(expected).enumerate() {
        let job = graph.job(id);
        if job.job_type != want_type {
            bail!("job {i}: expected type {want_type:?}, got {:?}", job.job_type);
        }
        let item = job.primary_item().with_context(|| format!("job {i} has neither new_item nor old_item"))?;
        let uid = &universe.item(item).pkg.uid;
        if uid.as_str() != want_uid {
            bail!("job {i}: expected uid {want_uid}, got {uid}");
        }
    }

    Ok(())
}

/// Assert that a `JobType::UpgradeInstall` at `install_idx` in `order` is
/// preceded somewhere by its paired `JobType::UpgradeRemove` (the `xlink`
/// partner), per spec.md §8's pairing invariant.
pub fn assert_upgrade_remove_precedes_install(graph: &JobGraph, order: &[JobId], install_idx: usize) -> anyhow::Result<()> {
    let install_id = *order.get(install_idx).context("install_idx out of range")?;
    let install_job = graph.job(install_id);
    if install_job.job_type != JobType::UpgradeInstall {
        bail!("job at {install_idx} is not an UpgradeInstall: {:?}", install_job.job_type);
    }
    let remove_id = install_job.xlink.context("UpgradeInstall has no xlink partner")?;
    let remove_pos = order.iter().position(|&id| id == remove_id).context("xlink partner not found in order")?;
    if remove_pos >= install_idx {
        bail!("UpgradeRemove at {remove_pos} does not precede its UpgradeInstall at {install_idx}");
    }
    Ok(())
}

fn describe(graph: &JobGraph, order: &[JobId], universe: &Universe) -> Vec<(JobType, String)> {
    order
        .iter()
        .map(|&id| {
            let job = graph.job(id);
            let uid: Uid = job.primary_item().map_or_else(|| Uid::new("?"), |item| universe.item(item).pkg.uid.clone());
            (job.job_type, uid.as_str().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use depsolve_core::PkgVersion;
    use depsolve_universe::{PackageBuilder, PackageStore, PackageType};
    use depsolve_scheduler::Job;
    use std::sync::Arc;

    fn v(s: &str) -> PkgVersion {
        PkgVersion::parse(s).unwrap()
    }

    #[test]
    fn job_sequence_matches_expected() {
        let store: Arc<dyn PackageStore> = Arc::new(MemoryStore::new());
        let mut universe = Universe::new(store);
        let foo = PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote).build();
        let foo_id = universe.add(foo).unwrap().item_id();

        let mut graph = JobGraph::new(vec![Job::install(foo_id)]);
        let order = graph.schedule(&universe).unwrap();

        assert_job_sequence(&graph, &order, &universe, &[(JobType::Install, "foo")]).unwrap();
    }
}
