//! Pre-built package sets for the concrete resolution scenarios a test
//! might want to reach for directly instead of constructing packages by
//! hand every time (spec.md §8's "Concrete scenarios").

use depsolve_core::PkgVersion;
use depsolve_universe::{DepRef, Package, PackageBuilder, PackageType, Uid};
use std::sync::Arc;

fn v(s: &str) -> PkgVersion {
    PkgVersion::parse(s).expect("fixture version literals are valid")
}

fn dep(name: &str) -> DepRef {
    DepRef {
        uid: Uid::new(name),
        name: Arc::from(name),
        version: None,
    }
}

/// Scenario 1: a remote `foo-1.0` depending on `bar`, and the `bar-2.0` it
/// should resolve to. Nothing is installed yet.
#[must_use]
pub struct SimpleInstallWithDep {
    pub foo: Package,
    pub bar: Package,
}

#[must_use]
pub fn simple_install_with_dep() -> SimpleInstallWithDep {
    SimpleInstallWithDep {
        foo: PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote).dep(dep("bar")).build(),
        bar: PackageBuilder::new(Uid::new("bar"), "bar", v("2.0"), PackageType::Remote).build(),
    }
}

/// Scenario 2: an installed `libA-1`/`libB-1` pair (`libB` depends on
/// `libA`), and the `libA-2`/`libB-2` remote pair that should replace them.
/// The old/new instances share a uid chain, so their remove-before-install
/// ordering comes from the scheduler's split-upgrade `xlink` pairing
/// (spec.md §4.G rule 4), not from `Package::conflicts` (which is keyed by
/// *other* uids and has no way to represent a same-chain collision).
#[must_use]
pub struct UpgradeWithConflictSplit {
    pub lib_a_old: Package,
    pub lib_b_old: Package,
    pub lib_a_new: Package,
    pub lib_b_new: Package,
}

#[must_use]
pub fn upgrade_with_conflict_split() -> UpgradeWithConflictSplit {
    UpgradeWithConflictSplit {
        lib_a_old: PackageBuilder::new(Uid::new("libA"), "libA", v("1"), PackageType::Installed).build(),
        lib_b_old: PackageBuilder::new(Uid::new("libB"), "libB", v("1"), PackageType::Installed).dep(dep("libA")).build(),
        lib_a_new: PackageBuilder::new(Uid::new("libA"), "libA", v("2"), PackageType::Remote).build(),
        lib_b_new: PackageBuilder::new(Uid::new("libB"), "libB", v("2"), PackageType::Remote).dep(dep("libA")).build(),
    }
}

/// Scenario 3: a locked installed `foo-1` and the `foo-2` remote candidate
/// an upgrade request should be rejected against.
#[must_use]
pub struct LockedBlocksUpgrade {
    pub foo_old: Package,
    pub foo_new: Package,
}

#[must_use]
pub fn locked_blocks_upgrade() -> LockedBlocksUpgrade {
    LockedBlocksUpgrade {
        foo_old: PackageBuilder::new(Uid::new("foo"), "foo", v("1"), PackageType::Installed).locked(true).build(),
        foo_new: PackageBuilder::new(Uid::new("foo"), "foo", v("2"), PackageType::Remote).build(),
    }
}

/// Scenario 4: an automatically-installed leaf `lib` with no remaining
/// reverse dependency, alongside the manually-installed `app` that used to
/// depend on it.
#[must_use]
pub struct AutoremoveOfAutomaticLeaf {
    pub app: Package,
    pub lib: Package,
}

#[must_use]
pub fn autoremove_of_automatic_leaf() -> AutoremoveOfAutomaticLeaf {
    let app = PackageBuilder::new(Uid::new("app"), "app", v("1.0"), PackageType::Installed).automatic(false).build();
    let lib = PackageBuilder::new(Uid::new("lib"), "lib", v("1.0"), PackageType::Installed).automatic(true).build();
    lib.set_rdeps(Vec::new());
    AutoremoveOfAutomaticLeaf { app, lib }
}

/// Scenario 5: two undominated remote candidates for the same uid chain,
/// neither depended on by anything else.
#[must_use]
pub struct SatRequestInternalChoice {
    pub openssl_1_1: Package,
    pub openssl_3_0: Package,
}

#[must_use]
pub fn sat_request_internal_choice() -> SatRequestInternalChoice {
    SatRequestInternalChoice {
        openssl_1_1: PackageBuilder::new(Uid::new("openssl"), "openssl", v("1.1"), PackageType::Remote).build(),
        openssl_3_0: PackageBuilder::new(Uid::new("openssl"), "openssl", v("3.0"), PackageType::Remote).build(),
    }
}

/// Scenario 6: an installed `A-1`/`B-1` pair depending on each other, and
/// the `A-2`/`B-2` remote pair that preserves the cycle, forcing the
/// scheduler to split one of the two upgrades.
#[must_use]
pub struct CycleResolution {
    pub a_old: Package,
    pub b_old: Package,
    pub a_new: Package,
    pub b_new: Package,
}

#[must_use]
pub fn cycle_resolution() -> CycleResolution {
    CycleResolution {
        a_old: PackageBuilder::new(Uid::new("A"), "A", v("1"), PackageType::Installed).dep(dep("B")).build(),
        b_old: PackageBuilder::new(Uid::new("B"), "B", v("1"), PackageType::Installed).dep(dep("A")).build(),
        a_new: PackageBuilder::new(Uid::new("A"), "A", v("2"), PackageType::Remote).dep(dep("B")).build(),
        b_new: PackageBuilder::new(Uid::new("B"), "B", v("2"), PackageType::Remote).dep(dep("A")).build(),
    }
}
