//! An in-memory `PackageStore`, standing in for the persistent database and
//! repository catalog a real host would back with SQLite/a repo mirror
//! (spec.md §6).

use ahash::AHashMap;
use depsolve_core::Result;
use depsolve_universe::{LoadMask, LockMode, MatchKind, Package, PackageStore, Uid};
use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Holds a local package set plus zero or more named remote repositories, in
/// the priority order `repo_names` should return them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    locals: Mutex<Vec<Arc<Package>>>,
    repos: Mutex<AHashMap<Arc<str>, Vec<Arc<Package>>>>,
    repo_order: Mutex<Vec<Arc<str>>>,
    file_owners: Mutex<AHashMap<PathBuf, Uid>>,
    applied_replacements: Mutex<Vec<(Uid, Uid)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository name (even an empty one) so it shows up in
    /// `repo_names` in insertion order.
    pub fn add_repo(&self, name: &str) {
        let mut order = self.repo_order.lock();
        if !order.iter().any(|n| n.as_ref() == name) {
            order.push(Arc::from(name));
        }
        self.repos.lock().entry(Arc::from(name)).or_default();
    }

    pub fn add_local(&self, pkg: Package) -> Arc<Package> {
        let pkg = Arc::new(pkg);
        self.locals.lock().push(Arc::clone(&pkg));
        pkg
    }

    pub fn add_remote(&self, repo: &str, pkg: Package) -> Arc<Package> {
        self.add_repo(repo);
        let pkg = Arc::new(pkg);
        self.repos.lock().get_mut(repo).expect("just registered").push(Arc::clone(&pkg));
        pkg
    }

    pub fn set_file_owner(&self, path: impl Into<PathBuf>, owner: Uid) {
        self.file_owners.lock().insert(path.into(), owner);
    }

    #[must_use]
    pub fn applied_replacements(&self) -> Vec<(Uid, Uid)> {
        self.applied_replacements.lock().clone()
    }

    #[must_use]
    pub fn locals(&self) -> Vec<Arc<Package>> {
        self.locals.lock().clone()
    }
}

fn matches(pattern: &str, match_kind: MatchKind, pkg: &Package) -> bool {
    match match_kind {
        MatchKind::All => true,
        MatchKind::Exact | MatchKind::Internal => {
            pkg.uid.as_str() == pattern || pkg.name.as_ref() == pattern
        }
        MatchKind::Glob => glob_to_regex(pattern).is_match(pkg.name.as_ref()),
        MatchKind::Regex => Regex::new(pattern).map(|re| re.is_match(&pkg.name)).unwrap_or(false),
    }
}

/// Translate a shell-style glob (`*`, `?`) into an anchored regex. Good enough
/// for test fixtures; not a general globbing implementation.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                re.push('\\');
                re.push(c);
            }
            _ => re.push(c),
        }
    }
    re.push('$');
    Regex::new(&re).expect("glob_to_regex always produces a valid pattern")
}

impl PackageStore for MemoryStore {
    fn query(&self, pattern: &str, match_kind: MatchKind) -> Vec<Arc<Package>> {
        self.locals.lock().iter().filter(|p| matches(pattern, match_kind, p)).cloned().collect()
    }

    fn query_cond(&self, _filter_fragment: &str, _params: &[&str], match_kind: MatchKind) -> Vec<Arc<Package>> {
        if matches!(match_kind, MatchKind::All) {
            return self.locals.lock().clone();
        }
        Vec::new()
    }

    fn ensure_loaded(&self, _pkg: &Package, _fields: LoadMask) -> Result<()> {
        Ok(())
    }

    fn repo_query(&self, pattern: &str, match_kind: MatchKind, repo_name: &str) -> Vec<Arc<Package>> {
        self.repos
            .lock()
            .get(repo_name)
            .into_iter()
            .flatten()
            .filter(|p| matches(pattern, match_kind, p))
            .cloned()
            .collect()
    }

    fn repo_shlib_provide(&self, soname: &str, repo_name: &str) -> Vec<Arc<Package>> {
        self.repos
            .lock()
            .get(repo_name)
            .into_iter()
            .flatten()
            .filter(|p| p.shlibs_provided.contains(soname))
            .cloned()
            .collect()
    }

    fn file_path_owner(&self, path: &Path) -> Option<Uid> {
        self.file_owners.lock().get(path).cloned()
    }

    fn repo_names(&self) -> Vec<Arc<str>> {
        self.repo_order.lock().clone()
    }

    fn begin_solver(&self) {}

    fn end_solver(&self) {}

    fn upgrade_lock(&self, _mode: LockMode) -> Result<()> {
        Ok(())
    }

    fn release_lock(&self) {}

    fn apply_replacements(&self, replacements: &[(Uid, Uid)]) -> Result<()> {
        self.applied_replacements.lock().extend_from_slice(replacements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsolve_core::PkgVersion;
    use depsolve_universe::{PackageBuilder, PackageType};

    fn v(s: &str) -> PkgVersion {
        PkgVersion::parse(s).unwrap()
    }

    #[test]
    fn local_query_exact_matches_uid_or_name() {
        let store = MemoryStore::new();
        store.add_local(PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Installed).build());

        assert_eq!(store.query("foo", MatchKind::Exact).len(), 1);
        assert_eq!(store.query("bar", MatchKind::Exact).len(), 0);
        assert_eq!(store.query("anything", MatchKind::All).len(), 1);
    }

    #[test]
    fn repo_query_is_scoped_to_its_repo() {
        let store = MemoryStore::new();
        store.add_remote("main", PackageBuilder::new(Uid::new("foo"), "foo", v("1.0"), PackageType::Remote).build());
        store.add_remote("extra", PackageBuilder::new(Uid::new("bar"), "bar", v("1.0"), PackageType::Remote).build());

        assert_eq!(store.repo_query("foo", MatchKind::Exact, "main").len(), 1);
        assert_eq!(store.repo_query("foo", MatchKind::Exact, "extra").len(), 0);
        assert_eq!(store.repo_names(), vec![Arc::<str>::from("main"), Arc::from("extra")]);
    }

    #[test]
    fn glob_query_matches_by_name_prefix() {
        let store = MemoryStore::new();
        store.add_local(PackageBuilder::new(Uid::new("libfoo"), "libfoo", v("1.0"), PackageType::Installed).build());
        store.add_local(PackageBuilder::new(Uid::new("bar"), "bar", v("1.0"), PackageType::Installed).build());

        assert_eq!(store.query("lib*", MatchKind::Glob).len(), 1);
    }

    #[test]
    fn apply_replacements_accumulates() {
        let store = MemoryStore::new();
        store.apply_replacements(&[(Uid::new("old"), Uid::new("new"))]).unwrap();
        assert_eq!(store.applied_replacements(), vec![(Uid::new("old"), Uid::new("new"))]);
    }
}
