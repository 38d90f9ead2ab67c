//! Proptest strategies for generating `PkgVersion`-shaped strings, so the
//! total-order property in spec.md §8 can be exercised over a wide sample
//! rather than the fixed list already hand-written in `depsolve-core`.

use proptest::prelude::*;

/// A single dot-component: digits, a tilde pre-release marker, or a short
/// alpha run, matching the run kinds `depsolve_core::version` tokenizes.
fn component_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => (0u32..1000).prop_map(|n| n.to_string()),
        1 => Just("~".to_string()),
        1 => "[a-z]{1,6}".prop_map(|s| s),
    ]
}

/// A bare `version` part: one to four dot-separated components.
pub fn version_part_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(component_strategy(), 1..4).prop_map(|parts| parts.join("."))
}

/// An optional `epoch:` prefix.
fn epoch_prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just(String::new()),
        1 => (0u64..5).prop_map(|e| format!("{e}:")),
    ]
}

/// An optional `_revision[,portrevision]` suffix.
fn revision_suffix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just(String::new()),
        1 => (0u64..10).prop_map(|r| format!("_{r}")),
        1 => (0u64..10, 0u64..10).prop_map(|(r, p)| format!("_{r},{p}")),
    ]
}

/// Any string `PkgVersion::parse` should accept: `[epoch:]version[_rev[,port]]`.
pub fn pkg_version_string_strategy() -> impl Strategy<Value = String> {
    (epoch_prefix_strategy(), version_part_strategy(), revision_suffix_strategy())
        .prop_map(|(epoch, version, revision)| format!("{epoch}{version}{revision}"))
}
