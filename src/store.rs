//! The value store: one mutex-guarded map from key to [`Value`] plus an
//! independent expiry map, and every operation spec.md §4.2 lists.
//!
//! Grounded on spec.md §4.2/§4.2.1 directly; the locking discipline
//! ("acquire on entry, release on all exit paths", spec.md §5) comes for
//! free from `MutexGuard` scoping instead of the teacher's manual
//! `server_read()`/`server_write()` pair, since this store is an
//! explicitly-constructed value (spec.md §9's "re-architect as an
//! explicitly-constructed value" design note) rather than a process-wide
//! `Lazy<Arc<RwLock<..>>>` singleton.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a value of a different type (an extension of the
    /// spec's error table: see DESIGN.md "WRONGTYPE handling"). Grounded
    /// on the teacher's `WRONG_TYPE_ERR` constant in `src/obj.rs`.
    WrongType,
    IndexOutOfRange,
}

struct Inner {
    data: HashMap<Vec<u8>, Value>,
    expires: HashMap<Vec<u8>, Instant>,
}

pub struct Store {
    inner: Mutex<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl Store {
    pub fn new() -> Store {
        Store {
            inner: Mutex::new(Inner {
                data: HashMap::new(),
                expires: HashMap::new(),
            }),
        }
    }

    /// Locks the store and performs the lazy expiry sweep (spec.md
    /// §4.2.1) before returning the guard, so every operation built on
    /// top of this never observes an expired key.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        let mut guard = self.inner.lock().unwrap();
        sweep(&mut guard);
        guard
    }

    // ---- string ops ----

    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) {
        let mut inner = self.lock();
        inner.data.insert(key.clone(), Value::Str(value));
        inner.expires.remove(&key);
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let inner = self.lock();
        inner.data.get(key).and_then(|v| v.as_str()).map(|s| s.to_vec())
    }

    pub fn getset(&self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        let prior = inner.data.get(&key).and_then(|v| v.as_str()).map(|s| s.to_vec());
        inner.data.insert(key.clone(), Value::Str(value));
        inner.expires.remove(&key);
        prior
    }

    // ---- generic ops ----

    pub fn keys(&self) -> Vec<Vec<u8>> {
        let inner = self.lock();
        inner.data.keys().cloned().collect()
    }

    pub fn key_type(&self, key: &[u8]) -> &'static str {
        let inner = self.lock();
        match inner.data.get(key) {
            Some(v) => v.type_name(),
            None => "none",
        }
    }

    pub fn del(&self, key: &[u8]) -> bool {
        let mut inner = self.lock();
        inner.expires.remove(key);
        inner.data.remove(key).is_some()
    }

    pub fn expire(&self, key: &[u8], secs: i64) -> bool {
        let mut inner = self.lock();
        if !inner.data.contains_key(key) {
            return false;
        }
        let deadline = if secs <= 0 {
            Instant::now()
        } else {
            Instant::now() + Duration::from_secs(secs as u64)
        };
        inner.expires.insert(key.to_vec(), deadline);
        true
    }

    /// Moves `old` to `new`, overwriting whatever (of any type) sits at
    /// `new`. Returns `false` when `old` does not exist. Because the
    /// store is a single tagged-union map (spec.md §3), this overwrite
    /// can never leave two typed entries behind at `new` — see
    /// DESIGN.md's "RENAME cross-type overwrite" decision.
    pub fn rename(&self, old: &[u8], new: Vec<u8>) -> bool {
        let mut inner = self.lock();
        let Some(value) = inner.data.remove(old) else {
            return false;
        };
        let expiry = inner.expires.remove(old);
        inner.data.insert(new.clone(), value);
        inner.expires.remove(&new);
        if let Some(deadline) = expiry {
            inner.expires.insert(new, deadline);
        }
        true
    }

    pub fn flushall(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.expires.clear();
    }

    // ---- list ops ----

    pub fn lpush(&self, key: Vec<u8>, values: Vec<Vec<u8>>) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::List(VecDeque::new()));
        let list = entry.as_list_mut().ok_or(StoreError::WrongType)?;
        for v in values {
            list.push_front(v);
        }
        Ok(list.len() as i64)
    }

    pub fn rpush(&self, key: Vec<u8>, values: Vec<Vec<u8>>) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::List(VecDeque::new()));
        let list = entry.as_list_mut().ok_or(StoreError::WrongType)?;
        for v in values {
            list.push_back(v);
        }
        Ok(list.len() as i64)
    }

    pub fn lpop(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        inner.data.get_mut(key)?.as_list_mut()?.pop_front()
    }

    pub fn rpop(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        inner.data.get_mut(key)?.as_list_mut()?.pop_back()
    }

    pub fn llen(&self, key: &[u8]) -> i64 {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_list())
            .map(|l| l.len() as i64)
            .unwrap_or(0)
    }

    pub fn lindex(&self, key: &[u8], index: i64) -> Option<Vec<u8>> {
        let inner = self.lock();
        let list = inner.data.get(key)?.as_list()?;
        normalize_index(index, list.len()).and_then(|i| list.get(i)).cloned()
    }

    pub fn lset(&self, key: &[u8], index: i64, value: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let list = inner
            .data
            .get_mut(key)
            .and_then(|v| v.as_list_mut())
            .ok_or(StoreError::IndexOutOfRange)?;
        let idx = normalize_index(index, list.len()).ok_or(StoreError::IndexOutOfRange)?;
        list[idx] = value;
        Ok(())
    }

    pub fn lrem(&self, key: &[u8], count: i64, value: &[u8]) -> i64 {
        let mut inner = self.lock();
        let Some(list) = inner.data.get_mut(key).and_then(|v| v.as_list_mut()) else {
            return 0;
        };
        let mut removed = 0i64;
        if count == 0 {
            let before = list.len();
            list.retain(|v| v != value);
            removed = (before - list.len()) as i64;
        } else if count > 0 {
            let mut i = 0;
            while i < list.len() && removed < count {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let want = -count;
            let mut i = list.len();
            while i > 0 && removed < want {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn lget(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_list())
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ---- hash ops ----

    pub fn hset(&self, key: Vec<u8>, field: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::Hash(HashMap::new()));
        let hash = entry.as_hash_mut().ok_or(StoreError::WrongType)?;
        hash.insert(field, value);
        Ok(())
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Vec<u8>> {
        let inner = self.lock();
        inner.data.get(key)?.as_hash()?.get(field).cloned()
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> bool {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_hash())
            .map(|h| h.contains_key(field))
            .unwrap_or(false)
    }

    pub fn hdel(&self, key: &[u8], field: &[u8]) -> bool {
        let mut inner = self.lock();
        inner
            .data
            .get_mut(key)
            .and_then(|v| v.as_hash_mut())
            .map(|h| h.remove(field).is_some())
            .unwrap_or(false)
    }

    pub fn hlen(&self, key: &[u8]) -> i64 {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_hash())
            .map(|h| h.len() as i64)
            .unwrap_or(0)
    }

    pub fn hkeys(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_hash())
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn hvals(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_hash())
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn hgetall(&self, key: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| v.as_hash())
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn hmset(&self, key: Vec<u8>, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::Hash(HashMap::new()));
        let hash = entry.as_hash_mut().ok_or(StoreError::WrongType)?;
        for (f, v) in pairs {
            hash.insert(f, v);
        }
        Ok(())
    }

    /// Per spec.md §9: sets the field only when the hash itself already
    /// exists, returning `true`; returns `false` (no mutation) when the
    /// hash does not exist. This is the spec's deliberately-preserved,
    /// non-canonical observed behavior, not a bug in this crate.
    pub fn hsetnx(&self, key: &[u8], field: Vec<u8>, value: Vec<u8>) -> bool {
        let mut inner = self.lock();
        match inner.data.get_mut(key).and_then(|v| v.as_hash_mut()) {
            Some(hash) => {
                hash.insert(field, value);
                true
            }
            None => false,
        }
    }

    pub fn hrandfield(&self, key: &[u8], n: i64) -> Vec<Vec<u8>> {
        let inner = self.lock();
        let Some(hash) = inner.data.get(key).and_then(|v| v.as_hash()) else {
            return Vec::new();
        };
        if hash.is_empty() || n <= 0 {
            return Vec::new();
        }
        let values: Vec<&Vec<u8>> = hash.values().collect();
        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| values.choose(&mut rng).map(|v| (*v).clone()).unwrap())
            .collect()
    }

    // ---- snapshot support (see snapshot.rs) ----

    pub fn snapshot_entries(&self) -> Vec<(Vec<u8>, Value)> {
        let inner = self.lock();
        inner.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn load_entries(&self, entries: Vec<(Vec<u8>, Value)>) {
        let mut inner = self.inner.lock().unwrap();
        inner.data.clear();
        inner.expires.clear();
        for (k, v) in entries {
            inner.data.insert(k, v);
        }
    }
}

fn sweep(inner: &mut Inner) {
    let now = Instant::now();
    let expired: Vec<Vec<u8>> = inner
        .expires
        .iter()
        .filter(|(_, deadline)| now >= **deadline)
        .map(|(k, _)| k.clone())
        .collect();
    for key in expired {
        inner.data.remove(&key);
        inner.expires.remove(&key);
    }
}

/// Normalizes a possibly-negative index against `len`, returning `None`
/// when it falls outside `[0, len)` after normalization.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if index < 0 { len + index } else { index };
    if i < 0 || i >= len {
        None
    } else {
        Some(i as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration as StdDuration;

    #[test]
    fn set_get_roundtrip() {
        let s = Store::new();
        s.set(b"foo".to_vec(), b"bar".to_vec());
        assert_eq!(s.get(b"foo"), Some(b"bar".to_vec()));
    }

    #[test]
    fn get_missing_is_none() {
        let s = Store::new();
        assert_eq!(s.get(b"missing"), None);
    }

    #[test]
    fn del_then_get_is_none() {
        let s = Store::new();
        s.set(b"k".to_vec(), b"v".to_vec());
        assert_eq!(s.del(b"k"), true);
        assert_eq!(s.get(b"k"), None);
        assert_eq!(s.del(b"k"), false);
    }

    #[test]
    fn one_type_invariant_set_clears_other_types() {
        let s = Store::new();
        s.rpush(b"k".to_vec(), vec![b"a".to_vec()]).unwrap();
        s.set(b"k".to_vec(), b"v".to_vec());
        assert_eq!(s.key_type(b"k"), "string");
        assert_eq!(s.llen(b"k"), 0);
    }

    #[test]
    fn lpush_prepends_in_argument_order() {
        let s = Store::new();
        s.lpush(b"L".to_vec(), vec![b"v1".to_vec(), b"v2".to_vec(), b"v3".to_vec()])
            .unwrap();
        assert_eq!(
            s.lget(b"L"),
            vec![b"v3".to_vec(), b"v2".to_vec(), b"v1".to_vec()]
        );
    }

    #[test]
    fn rpush_appends_in_argument_order() {
        let s = Store::new();
        s.rpush(b"L".to_vec(), vec![b"v1".to_vec(), b"v2".to_vec(), b"v3".to_vec()])
            .unwrap();
        assert_eq!(
            s.lget(b"L"),
            vec![b"v1".to_vec(), b"v2".to_vec(), b"v3".to_vec()]
        );
    }

    #[test]
    fn lindex_supports_negative_index() {
        let s = Store::new();
        s.rpush(b"L".to_vec(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
            .unwrap();
        assert_eq!(s.lindex(b"L", -1), Some(b"c".to_vec()));
        assert_eq!(s.lindex(b"L", 5), None);
    }

    #[test]
    fn lrem_counts_match_spec_table() {
        let s = Store::new();
        s.rpush(b"L".to_vec(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
            .unwrap();
        assert_eq!(s.lrem(b"L", 0, b"a"), 1);
        assert_eq!(s.llen(b"L"), 2);
    }

    #[test]
    fn lpush_on_string_key_is_wrong_type() {
        let s = Store::new();
        s.set(b"k".to_vec(), b"v".to_vec());
        assert_eq!(s.lpush(b"k".to_vec(), vec![b"x".to_vec()]), Err(StoreError::WrongType));
    }

    #[test]
    fn hset_hget_hgetall() {
        let s = Store::new();
        s.hset(b"H".to_vec(), b"f1".to_vec(), b"v1".to_vec()).unwrap();
        s.hset(b"H".to_vec(), b"f2".to_vec(), b"v2".to_vec()).unwrap();
        assert_eq!(s.hget(b"H", b"f1"), Some(b"v1".to_vec()));
        assert_eq!(s.hlen(b"H"), 2);
        let mut all = s.hgetall(b"H");
        all.sort();
        assert_eq!(
            all,
            vec![(b"f1".to_vec(), b"v1".to_vec()), (b"f2".to_vec(), b"v2".to_vec())]
        );
    }

    #[test]
    fn hsetnx_observed_semantics() {
        let s = Store::new();
        // Hash doesn't exist yet: returns false, no mutation.
        assert_eq!(s.hsetnx(b"H", b"f".to_vec(), b"v".to_vec()), false);
        assert_eq!(s.hget(b"H", b"f"), None);

        s.hset(b"H".to_vec(), b"other".to_vec(), b"x".to_vec()).unwrap();
        assert_eq!(s.hsetnx(b"H", b"f".to_vec(), b"v".to_vec()), true);
        assert_eq!(s.hget(b"H", b"f"), Some(b"v".to_vec()));
    }

    #[test]
    fn rename_moves_value_and_clears_old() {
        let s = Store::new();
        s.set(b"a".to_vec(), b"1".to_vec());
        assert!(s.rename(b"a", b"b".to_vec()));
        assert_eq!(s.get(b"a"), None);
        assert_eq!(s.get(b"b"), Some(b"1".to_vec()));
    }

    #[test]
    fn rename_overwrites_destination_regardless_of_type() {
        let s = Store::new();
        s.rpush(b"dst".to_vec(), vec![b"x".to_vec()]).unwrap();
        s.set(b"src".to_vec(), b"1".to_vec());
        assert!(s.rename(b"src", b"dst".to_vec()));
        assert_eq!(s.key_type(b"dst"), "string");
    }

    #[test]
    fn rename_missing_source_fails() {
        let s = Store::new();
        assert!(!s.rename(b"nope", b"x".to_vec()));
    }

    #[test]
    fn expire_sweep_removes_key_on_next_touch() {
        let s = Store::new();
        s.set(b"x".to_vec(), b"1".to_vec());
        assert!(s.expire(b"x", 0));
        thread::sleep(StdDuration::from_millis(5));
        assert_eq!(s.get(b"x"), None);
        assert_eq!(s.key_type(b"x"), "none");
    }

    #[test]
    fn flushall_clears_everything() {
        let s = Store::new();
        s.set(b"a".to_vec(), b"1".to_vec());
        s.rpush(b"b".to_vec(), vec![b"x".to_vec()]).unwrap();
        s.flushall();
        assert_eq!(s.keys().len(), 0);
    }

    #[test]
    fn concurrent_sets_never_tear() {
        let s = std::sync::Arc::new(Store::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = s.clone();
            handles.push(thread::spawn(move || {
                s.set(b"k".to_vec(), i.to_string().into_bytes());
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let final_value = s.get(b"k").unwrap();
        let n: i32 = String::from_utf8(final_value).unwrap().parse().unwrap();
        assert!((0..16).contains(&n));
    }
}
