//! A no-op `FetchTransport`: every call succeeds without touching a
//! filesystem or network (spec.md §6 leaves the wire format to the host).

use depsolve_core::Result;
use depsolve_universe::{FetchTransport, Package};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullFetchTransport;

impl FetchTransport for NullFetchTransport {
    fn fetch_package(&self, _pkg: &Package, _dest: &Path) -> Result<()> {
        Ok(())
    }

    fn mirror_package(&self, _pkg: &Package, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn cached_path(&self, pkg: &Package) -> PathBuf {
        PathBuf::from(format!("{}.pkg", pkg.uid.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsolve_core::PkgVersion;
    use depsolve_universe::{PackageBuilder, PackageType, Uid};
    use std::path::Path;

    #[test]
    fn fetch_and_mirror_are_no_ops() {
        let transport = NullFetchTransport;
        let pkg = PackageBuilder::new(Uid::new("foo"), "foo", PkgVersion::parse("1.0").unwrap(), PackageType::Remote).build();
        assert!(transport.fetch_package(&pkg, Path::new("/tmp/foo.pkg")).is_ok());
        assert!(transport.mirror_package(&pkg, Path::new("/tmp")).is_ok());
        assert_eq!(transport.cached_path(&pkg), PathBuf::from("foo.pkg"));
    }
}
