//! Cuckoo-keyed path hash index (spec.md §4.D).
//!
//! Each file/dir path maps to a 64-bit hash under a deterministic sequence of
//! keys: attempt `0` uses the index's base key, attempt `1` the next, and so
//! on up to `max_bumps`. Because the sequence is a pure function of `(path,
//! attempt)`, the same path always walks the same probe sequence regardless
//! of insertion order — unlike a mutable global key, this needs no rehash
//! when a collision forces a bump. A path that never finds a free slot or
//! its own prior entry within the cap spills into an exact-match overflow
//! bucket keyed by the final attempt's hash, guaranteeing termination
//! without losing conflict detection.

use ahash::{AHashMap, RandomState};
use depsolve_universe::{ItemId, Uid};
use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

type Slot = (Arc<str>, ItemId, Uid);

pub struct PathIndex {
    base: RandomState,
    max_bumps: u32,
    primary: BTreeMap<u64, Slot>,
    overflow: AHashMap<u64, Vec<Slot>>,
}

impl PathIndex {
    #[must_use]
    pub fn new(max_bumps: u32) -> Self {
        Self {
            base: RandomState::new(),
            max_bumps,
            primary: BTreeMap::new(),
            overflow: AHashMap::new(),
        }
    }

    fn hash_attempt(&self, path: &str, attempt: u32) -> u64 {
        let mut hasher = self.base.build_hasher();
        hasher.write(path.as_bytes());
        hasher.write(&attempt.to_le_bytes());
        hasher.finish()
    }

    /// Insert `path` owned by `(item_id, uid)`. Returns the conflicting
    /// `(ItemId, Uid)` if the path is already owned by a different uid; `None`
    /// if the path is new or already owned by the same uid (idempotent
    /// re-insertion, e.g. re-running `append_chain` after a re-solve).
    pub fn insert(&mut self, path: &str, item_id: ItemId, uid: &Uid) -> Option<(ItemId, Uid)> {
        for attempt in 0..=self.max_bumps {
            let h = self.hash_attempt(path, attempt);

            if let Some(bucket) = self.overflow.get_mut(&h) {
                return Self::probe_bucket(bucket, path, item_id, uid);
            }

            match self.primary.get(&h) {
                None => {
                    self.primary.insert(h, (Arc::from(path), item_id, uid.clone()));
                    return None;
                }
                Some((existing_path, existing_item, existing_uid)) if existing_path.as_ref() == path => {
                    return if existing_uid == uid {
                        None
                    } else {
                        Some((*existing_item, existing_uid.clone()))
                    };
                }
                Some(_) => {
                    // Different path, same slot at this attempt: keep bumping.
                }
            }
        }

        // Exhausted every attempt without a free slot or a self-match: spill
        // both the incoming path and whatever occupies the final slot into an
        // exact-match bucket keyed by that slot's hash.
        let final_hash = self.hash_attempt(path, self.max_bumps);
        if let Some(existing) = self.primary.remove(&final_hash) {
            self.overflow.entry(final_hash).or_default().push(existing);
        }
        let bucket = self.overflow.entry(final_hash).or_default();
        Self::probe_bucket(bucket, path, item_id, uid)
    }

    fn probe_bucket(
        bucket: &mut Vec<Slot>,
        path: &str,
        item_id: ItemId,
        uid: &Uid,
    ) -> Option<(ItemId, Uid)> {
        for (existing_path, existing_item, existing_uid) in bucket.iter() {
            if existing_path.as_ref() == path {
                return if existing_uid == uid {
                    None
                } else {
                    Some((*existing_item, existing_uid.clone()))
                };
            }
        }
        bucket.push((Arc::from(path), item_id, uid.clone()));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ItemId {
        ItemId::from_raw(n)
    }

    #[test]
    fn same_path_same_uid_is_idempotent() {
        let mut idx = PathIndex::new(8);
        let uid = Uid::new("foo");
        assert!(idx.insert("/usr/bin/foo", id(0), &uid).is_none());
        assert!(idx.insert("/usr/bin/foo", id(0), &uid).is_none());
    }

    #[test]
    fn same_path_different_uid_conflicts() {
        let mut idx = PathIndex::new(8);
        let a = Uid::new("a");
        let b = Uid::new("b");
        assert!(idx.insert("/usr/bin/foo", id(0), &a).is_none());
        let conflict = idx.insert("/usr/bin/foo", id(1), &b);
        assert_eq!(conflict.unwrap().1, a);
    }

    #[test]
    fn distinct_paths_do_not_conflict() {
        let mut idx = PathIndex::new(8);
        let a = Uid::new("a");
        let b = Uid::new("b");
        assert!(idx.insert("/usr/bin/foo", id(0), &a).is_none());
        assert!(idx.insert("/usr/bin/bar", id(1), &b).is_none());
    }
}
