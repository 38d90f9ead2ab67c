//! Explicit, passed-through configuration replacing the original's
//! process-wide `pkg_ctx` global (spec.md §9 Design Notes).

use std::path::PathBuf;

/// Settings threaded through the resolution pipeline. There is no
/// module-level mutable state anywhere in this workspace; every component
/// that needs one of these values receives a `&Context` explicitly.
#[derive(Debug, Clone)]
pub struct Context {
    /// Root of the persistent package database, owned by the collaborator
    /// behind `PackageStore`; carried here only so components can include it
    /// in diagnostics.
    pub dbdir: PathBuf,
    /// Root of the local package/fetch cache.
    pub cachedir: PathBuf,
    /// ABI tag (e.g. `FreeBSD:14:amd64`) used for the single-ABI constraint
    /// check; cross-arch blending beyond this check is out of scope.
    pub abi: String,
    /// Verbosity for `tracing` spans emitted by the core (0 = quiet).
    pub debug_level: u8,
    /// Directories touched by the current transaction, used by the
    /// scheduler/orchestrator to order filesystem-affecting jobs; populated
    /// by the host, read-only here.
    pub touched_dirs: Vec<PathBuf>,
    /// Number of SAT-UNSAT retry attempts before surfacing failed literals
    /// to the user instead of auto-dropping them (spec.md §9 Open Question).
    pub sat_retry_limit: u32,
    /// Maximum number of cuckoo key bumps the conflict engine's path index
    /// will attempt before falling back to exact comparison (spec.md §9
    /// Open Question).
    pub path_hash_max_bumps: u32,
    /// When true, a missing dependency chain suppresses the depend clause
    /// instead of failing the solve (spec.md §4.E).
    pub force_missing: bool,
    /// When true, `upgrade_candidates` inserts remotes even if none would
    /// actually upgrade the local package.
    pub force: bool,
    /// Prefer not to change the locally installed version when it still
    /// satisfies the request (spec.md glossary: conservative upgrade).
    pub conservative: bool,
    /// Restrict candidate selection to a specific repository per uid.
    pub pinning: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            dbdir: PathBuf::from("/var/db/pkg"),
            cachedir: PathBuf::from("/var/cache/pkg"),
            abi: String::new(),
            debug_level: 0,
            touched_dirs: Vec::new(),
            sat_retry_limit: 10,
            path_hash_max_bumps: 8,
            force_missing: false,
            force: false,
            conservative: false,
            pinning: false,
        }
    }
}
