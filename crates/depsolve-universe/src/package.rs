//! Package types: the immutable-post-construction node data spec.md §3
//! describes, plus the `uid` identifier it is keyed by.

use ahash::AHashSet;
use depsolve_core::PkgVersion;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

/// Unique package identifier: `"<name>"` or `"<name>@<flavor>"`.
///
/// The uid is the key under which a universe chain is indexed; it is not
/// itself versioned.
#[derive(Clone)]
pub struct Uid {
    full: Arc<str>,
    at_idx: Option<usize>,
}

impl Uid {
    /// Build a uid from a bare name, with no flavor.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            full: Arc::from(name),
            at_idx: None,
        }
    }

    /// Build a uid from a name and a flavor (`name@flavor`).
    #[must_use]
    pub fn with_flavor(name: &str, flavor: &str) -> Self {
        let full = format!("{name}@{flavor}");
        let at_idx = Some(name.len());
        Self {
            full: Arc::from(full),
            at_idx,
        }
    }

    /// Parse `"name"` or `"name@flavor"`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.find('@') {
            Some(idx) => Self {
                full: Arc::from(s),
                at_idx: Some(idx),
            },
            None => Self {
                full: Arc::from(s),
                at_idx: None,
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self.at_idx {
            Some(idx) => &self.full[..idx],
            None => &self.full,
        }
    }

    #[must_use]
    pub fn flavor(&self) -> Option<&str> {
        self.at_idx.map(|idx| &self.full[idx + 1..])
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uid").field(&self.full).finish()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for Uid {}

impl Hash for Uid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.full.cmp(&other.full)
    }
}

/// Where a package instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageType {
    /// Already installed, loaded from the local database.
    Installed,
    /// Available from a configured remote repository.
    Remote,
    /// Loaded from a local file (e.g. `pkg install ./foo.pkg`).
    File,
}

/// A direct dependency target: the uid it resolves to in the universe, plus
/// the declared name/version for diagnostics (the uid chain is the
/// authority; name/version here are provenance only).
#[derive(Debug, Clone)]
pub struct DepRef {
    pub uid: Uid,
    pub name: Arc<str>,
    pub version: Option<PkgVersion>,
}

/// The discriminated type of a registered conflict (spec.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Between a locally-installed package and a remote candidate.
    RemoteLocal,
    /// Between two remote candidates.
    RemoteRemote,
}

/// An immutable-post-construction package node.
///
/// `rdeps` and `files`/`dirs` are the two fields the spec calls out as
/// lazily materialized; they use interior mutability so the rest of the
/// struct can stay a plain immutable value.
pub struct Package {
    pub uid: Uid,
    pub name: Arc<str>,
    pub version: PkgVersion,
    pub origin: Arc<str>,
    pub arch: Arc<str>,
    pub digest: Mutex<Option<Arc<str>>>,
    pub repo_name: Option<Arc<str>>,
    pub kind: PackageType,
    pub locked: bool,
    pub automatic: Mutex<bool>,
    pub vital: bool,
    pub deps: SmallVec<[DepRef; 8]>,
    pub conflicts: Mutex<AHashSet<Uid>>,
    pub conflict_kinds: Mutex<ahash::AHashMap<Uid, ConflictKind>>,
    pub provides: AHashSet<Arc<str>>,
    pub requires: AHashSet<Arc<str>>,
    pub shlibs_provided: AHashSet<Arc<str>>,
    pub shlibs_required: AHashSet<Arc<str>>,
    rdeps: Mutex<Option<Vec<Uid>>>,
    files: Mutex<Option<Vec<PathBuf>>>,
    dirs: Mutex<Option<Vec<PathBuf>>>,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("uid", &self.uid)
            .field("version", &self.version.as_str())
            .field("kind", &self.kind)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Builder for `Package`, since most fields are set once at construction but
/// the type itself wraps a few in `Mutex` for later lazy fill-in.
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    uid: Option<Uid>,
    name: Option<Arc<str>>,
    version: Option<PkgVersion>,
    origin: Arc<str>,
    arch: Arc<str>,
    digest: Option<Arc<str>>,
    repo_name: Option<Arc<str>>,
    kind: Option<PackageType>,
    locked: bool,
    automatic: bool,
    vital: bool,
    deps: SmallVec<[DepRef; 8]>,
    conflicts: AHashSet<Uid>,
    provides: AHashSet<Arc<str>>,
    requires: AHashSet<Arc<str>>,
    shlibs_provided: AHashSet<Arc<str>>,
    shlibs_required: AHashSet<Arc<str>>,
    files: Option<Vec<PathBuf>>,
    dirs: Option<Vec<PathBuf>>,
}

impl PackageBuilder {
    #[must_use]
    pub fn new(uid: Uid, name: impl Into<Arc<str>>, version: PkgVersion, kind: PackageType) -> Self {
        Self {
            uid: Some(uid),
            name: Some(name.into()),
            version: Some(version),
            kind: Some(kind),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn origin(mut self, origin: impl Into<Arc<str>>) -> Self {
        self.origin = origin.into();
        self
    }

    #[must_use]
    pub fn arch(mut self, arch: impl Into<Arc<str>>) -> Self {
        self.arch = arch.into();
        self
    }

    #[must_use]
    pub fn digest(mut self, digest: impl Into<Arc<str>>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    #[must_use]
    pub fn repo_name(mut self, repo_name: impl Into<Arc<str>>) -> Self {
        self.repo_name = Some(repo_name.into());
        self
    }

    #[must_use]
    pub const fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    #[must_use]
    pub const fn automatic(mut self, automatic: bool) -> Self {
        self.automatic = automatic;
        self
    }

    #[must_use]
    pub const fn vital(mut self, vital: bool) -> Self {
        self.vital = vital;
        self
    }

    #[must_use]
    pub fn dep(mut self, dep: DepRef) -> Self {
        self.deps.push(dep);
        self
    }

    #[must_use]
    pub fn conflict(mut self, uid: Uid) -> Self {
        self.conflicts.insert(uid);
        self
    }

    #[must_use]
    pub fn provides(mut self, cap: impl Into<Arc<str>>) -> Self {
        self.provides.insert(cap.into());
        self
    }

    #[must_use]
    pub fn requires(mut self, cap: impl Into<Arc<str>>) -> Self {
        self.requires.insert(cap.into());
        self
    }

    #[must_use]
    pub fn shlib_provided(mut self, soname: impl Into<Arc<str>>) -> Self {
        self.shlibs_provided.insert(soname.into());
        self
    }

    #[must_use]
    pub fn shlib_required(mut self, soname: impl Into<Arc<str>>) -> Self {
        self.shlibs_required.insert(soname.into());
        self
    }

    #[must_use]
    pub fn files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = Some(files);
        self
    }

    #[must_use]
    pub fn dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.dirs = Some(dirs);
        self
    }

    /// Finalize the package. Panics if a required field was never set; all
    /// required fields are set by `new`, so this only fires on programmer
    /// error (mirrors the teacher's `assert!`-on-construction pattern).
    #[must_use]
    pub fn build(self) -> Package {
        Package {
            uid: self.uid.expect("uid set by PackageBuilder::new"),
            name: self.name.expect("name set by PackageBuilder::new"),
            version: self.version.expect("version set by PackageBuilder::new"),
            origin: self.origin,
            arch: self.arch,
            digest: Mutex::new(self.digest),
            repo_name: self.repo_name,
            kind: self.kind.expect("kind set by PackageBuilder::new"),
            locked: self.locked,
            automatic: Mutex::new(self.automatic),
            vital: self.vital,
            deps: self.deps,
            conflicts: Mutex::new(self.conflicts),
            conflict_kinds: Mutex::new(ahash::AHashMap::default()),
            provides: self.provides,
            requires: self.requires,
            shlibs_provided: self.shlibs_provided,
            shlibs_required: self.shlibs_required,
            rdeps: Mutex::new(None),
            files: Mutex::new(self.files),
            dirs: Mutex::new(self.dirs),
        }
    }
}

impl Package {
    /// Get the lazily-materialized reverse dependency set, if loaded.
    #[must_use]
    pub fn rdeps(&self) -> Option<Vec<Uid>> {
        self.rdeps.lock().clone()
    }

    /// Fill in the reverse-dependency set (called once, by the collaborator
    /// that materializes it from the local DB).
    pub fn set_rdeps(&self, rdeps: Vec<Uid>) {
        *self.rdeps.lock() = Some(rdeps);
    }

    /// True once `files`/`dirs` have been loaded for this package.
    #[must_use]
    pub fn files_loaded(&self) -> bool {
        self.files.lock().is_some()
    }

    #[must_use]
    pub fn files(&self) -> Option<Vec<PathBuf>> {
        self.files.lock().clone()
    }

    #[must_use]
    pub fn dirs(&self) -> Option<Vec<PathBuf>> {
        self.dirs.lock().clone()
    }

    /// Best-effort load of files/dirs; a no-op if already loaded.
    pub fn set_files(&self, files: Vec<PathBuf>, dirs: Vec<PathBuf>) {
        *self.files.lock() = Some(files);
        *self.dirs.lock() = Some(dirs);
    }

    #[must_use]
    pub fn digest(&self) -> Option<Arc<str>> {
        self.digest.lock().clone()
    }

    pub fn set_digest(&self, digest: Arc<str>) {
        *self.digest.lock() = Some(digest);
    }

    #[must_use]
    pub fn is_automatic(&self) -> bool {
        *self.automatic.lock()
    }

    pub fn set_automatic(&self, value: bool) {
        *self.automatic.lock() = value;
    }

    /// Register a mutual conflict with `other`, typed per spec.md §4.D.
    /// `RemoteLocal` is only valid between a local and a remote side;
    /// local-local is impossible by construction (the caller never pairs
    /// two `Installed` packages).
    pub fn register_conflict(&self, other_uid: Uid, kind: ConflictKind) {
        self.conflicts.lock().insert(other_uid.clone());
        self.conflict_kinds.lock().insert(other_uid, kind);
    }

    #[must_use]
    pub fn conflicts_with(&self, uid: &Uid) -> bool {
        self.conflicts.lock().contains(uid)
    }

    /// Snapshot every field, including the lazily-materialized ones, into a
    /// fresh owned `Package`. Used when a package borrowed from a collaborator
    /// (e.g. behind an `Arc` with other live references) needs to be inserted
    /// into a `Universe`, which takes ownership.
    #[must_use]
    pub fn clone_shallow(&self) -> Self {
        Self {
            uid: self.uid.clone(),
            name: Arc::clone(&self.name),
            version: self.version.clone(),
            origin: Arc::clone(&self.origin),
            arch: Arc::clone(&self.arch),
            digest: Mutex::new(self.digest()),
            repo_name: self.repo_name.clone(),
            kind: self.kind,
            locked: self.locked,
            automatic: Mutex::new(self.is_automatic()),
            vital: self.vital,
            deps: self.deps.clone(),
            conflicts: Mutex::new(self.conflicts.lock().clone()),
            conflict_kinds: Mutex::new(self.conflict_kinds.lock().clone()),
            provides: self.provides.clone(),
            requires: self.requires.clone(),
            shlibs_provided: self.shlibs_provided.clone(),
            shlibs_required: self.shlibs_required.clone(),
            rdeps: Mutex::new(self.rdeps.lock().clone()),
            files: Mutex::new(self.files.lock().clone()),
            dirs: Mutex::new(self.dirs.lock().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsolve_core::PkgVersion;

    fn v(s: &str) -> PkgVersion {
        PkgVersion::parse(s).unwrap()
    }

    #[test]
    fn uid_parses_name_and_flavor() {
        let u = Uid::parse("foo@py39");
        assert_eq!(u.name(), "foo");
        assert_eq!(u.flavor(), Some("py39"));
        assert_eq!(u.as_str(), "foo@py39");
    }

    #[test]
    fn uid_without_flavor() {
        let u = Uid::parse("foo");
        assert_eq!(u.name(), "foo");
        assert_eq!(u.flavor(), None);
    }

    #[test]
    fn package_display_is_name_dash_version() {
        let pkg = PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote).build();
        assert_eq!(pkg.to_string(), "foo-1.0");
    }

    #[test]
    fn rdeps_lazy_until_set() {
        let pkg = PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote).build();
        assert!(pkg.rdeps().is_none());
        pkg.set_rdeps(vec![Uid::new("bar")]);
        assert_eq!(pkg.rdeps().unwrap(), vec![Uid::new("bar")]);
    }

    #[test]
    fn locked_flag_is_set_at_construction() {
        let pkg = PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Installed)
            .locked(true)
            .build();
        assert!(pkg.locked);
    }

    #[test]
    fn register_conflict_is_typed_and_symmetric_when_caller_calls_both_sides() {
        let a = PackageBuilder::new(Uid::new("a"), "a", v("1.0"), PackageType::Installed).build();
        let b = PackageBuilder::new(Uid::new("b"), "b", v("2.0"), PackageType::Remote).build();

        a.register_conflict(Uid::new("b"), ConflictKind::RemoteLocal);
        b.register_conflict(Uid::new("a"), ConflictKind::RemoteLocal);

        assert!(a.conflicts_with(&Uid::new("b")));
        assert!(b.conflicts_with(&Uid::new("a")));
    }
}
