//! Builds a linear dependency chain `pkg0 <- pkg1 <- ... <- pkg{n-1}` (each
//! package depending on the previous one), the shape both the scheduler's
//! topological sort and the orchestrator's end-to-end pipeline scale with.

use depsolve_core::PkgVersion;
use depsolve_test_utils::store::MemoryStore;
use depsolve_universe::{DepRef, PackageBuilder, PackageType, Uid, Universe};
use std::sync::Arc;

fn v(s: &str) -> PkgVersion {
    PkgVersion::parse(s).expect("bench version literals are valid")
}

fn name(i: usize) -> String {
    format!("pkg{i}")
}

/// Populate `store` with a chain of `n` remote packages in the `main` repo,
/// and return the uid of the tail package (the one that transitively
/// depends on every other).
pub fn populate_remote_chain(store: &MemoryStore, n: usize) -> Uid {
    store.add_repo("main");
    for i in 0..n {
        let mut builder = PackageBuilder::new(Uid::new(&name(i)), name(i), v("1.0"), PackageType::Remote);
        if i > 0 {
            builder = builder.dep(DepRef {
                uid: Uid::new(&name(i - 1)),
                name: Arc::from(name(i - 1)),
                version: None,
            });
        }
        store.add_remote("main", builder.build());
    }
    Uid::new(&name(n - 1))
}

/// Build a `Universe` whose arena already holds the full `n`-package chain
/// (as `Remote` candidates), returning the item id of each package in
/// dependency order (index 0 first).
pub fn universe_with_chain(store: Arc<MemoryStore>, n: usize) -> (Universe, Vec<depsolve_universe::ItemId>) {
    populate_remote_chain(&store, n);
    let mut universe = Universe::new(store);
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let mut builder = PackageBuilder::new(Uid::new(&name(i)), name(i), v("1.0"), PackageType::Remote);
        if i > 0 {
            builder = builder.dep(DepRef {
                uid: Uid::new(&name(i - 1)),
                name: Arc::from(name(i - 1)),
                version: None,
            });
        }
        let id = universe.add(builder.build()).expect("bench package digests never fail").item_id();
        ids.push(id);
    }
    (universe, ids)
}
