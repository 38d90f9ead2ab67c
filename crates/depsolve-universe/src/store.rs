//! External collaborator interfaces (spec.md §6): the persistent store and
//! fetch transport the core queries but never implements. Archive
//! extraction, SQL, and wire transports are out of scope (spec.md §1); only
//! the shape of the calls the core makes is defined here.

use crate::package::{Package, Uid};
use depsolve_core::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a request pattern should be matched against a package name/uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Exact uid or name match.
    Exact,
    /// Shell-style glob.
    Glob,
    /// Regular expression.
    Regex,
    /// An internally-synthesized pattern (e.g. a dependency uid lookup),
    /// never shown to the user and never subject to ambiguity prompts.
    Internal,
    /// Match every package (used by `Upgrade All` / `Autoremove`).
    All,
}

/// Which lazily-populated fields of a `Package` to fill in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadMask {
    pub files: bool,
    pub dirs: bool,
    pub rdeps: bool,
}

impl LoadMask {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            files: true,
            dirs: true,
            rdeps: true,
        }
    }
}

/// Locking mode requested around the write phase (spec.md §5:
/// `PKGDB_LOCK_EXCLUSIVE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// The persistent package database / repository catalog collaborator.
///
/// No wire format or SQL schema is prescribed by this core (spec.md §1); a
/// host implements this trait however its storage layer works.
pub trait PackageStore: Send + Sync {
    /// Query the local database for packages matching `pattern`.
    fn query(&self, pattern: &str, match_kind: MatchKind) -> Vec<Arc<Package>>;

    /// Query the local database with a host-defined filter fragment (e.g. a
    /// SQL `WHERE` clause) plus bound parameters.
    fn query_cond(
        &self,
        filter_fragment: &str,
        params: &[&str],
        match_kind: MatchKind,
    ) -> Vec<Arc<Package>>;

    /// Ensure the given lazily-populated fields are loaded on `pkg`.
    fn ensure_loaded(&self, pkg: &Package, fields: LoadMask) -> Result<()>;

    /// Query a specific remote repository for packages matching `pattern`.
    fn repo_query(&self, pattern: &str, match_kind: MatchKind, repo_name: &str) -> Vec<Arc<Package>>;

    /// Query a specific remote repository for providers of a shared-library
    /// soname.
    fn repo_shlib_provide(&self, soname: &str, repo_name: &str) -> Vec<Arc<Package>>;

    /// Look up which locally-installed package owns `path`, if any.
    fn file_path_owner(&self, path: &Path) -> Option<Uid>;

    /// Names of the configured remote repositories, in priority order
    /// (lowest index wins ties, per spec.md §4.B `select_candidate`).
    fn repo_names(&self) -> Vec<Arc<str>>;

    /// Signal the start of a solver session (spec.md §4.H).
    fn begin_solver(&self);

    /// Signal the end of a solver session.
    fn end_solver(&self);

    /// Acquire the persistent-store write lock before `execute` (spec.md §5).
    fn upgrade_lock(&self, mode: LockMode) -> Result<()>;

    /// Release a previously acquired lock.
    fn release_lock(&self);

    /// Apply the accumulated replacement table after a successful solve
    /// (spec.md §3 Replacement table).
    fn apply_replacements(&self, replacements: &[(Uid, Uid)]) -> Result<()>;
}

/// The fetch/mirror transport collaborator (spec.md §6). HTTP/SSH/FILE
/// transports and signature verification are out of scope; only the call
/// shape is defined here.
pub trait FetchTransport: Send + Sync {
    /// Download `pkg`'s archive to `dest`.
    fn fetch_package(&self, pkg: &Package, dest: &Path) -> Result<()>;

    /// Mirror `pkg`'s archive into a local repository directory.
    fn mirror_package(&self, pkg: &Package, dir: &Path) -> Result<()>;

    /// Path `pkg`'s archive would be cached at, whether or not it exists yet.
    fn cached_path(&self, pkg: &Package) -> PathBuf;
}
