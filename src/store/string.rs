use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;

use crate::error::ClientError;
use crate::store::now_ms;

struct StringRecord {
    value: Bytes,
    expires_at_ms: Option<u64>,
}

impl StringRecord {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at_ms.map_or(true, |at| now < at)
    }
}

/// Key→value with optional absolute expiry. Expiry is lazy: a dead record
/// behaves as absent on any read and gets deleted on the spot.
#[derive(Default)]
pub struct StringStore {
    inner: Mutex<HashMap<Bytes, StringRecord>>,
}

impl StringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any prior record. Passing no expiry clears an existing one.
    pub fn set(&self, key: Bytes, value: Bytes, expires_at_ms: Option<u64>) {
        self.inner
            .lock()
            .unwrap()
            .insert(key, StringRecord { value, expires_at_ms });
    }

    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(key) {
            Some(record) if record.is_live(now_ms()) => Some(record.value.clone()),
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn exists(&self, key: &Bytes) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.remove(key) {
            Some(record) => record.is_live(now_ms()),
            None => false,
        }
    }

    pub fn size(&self) -> usize {
        let now = now_ms();
        self.inner
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.is_live(now))
            .count()
    }

    pub fn keys(&self) -> Vec<Bytes> {
        let now = now_ms();
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, record)| record.is_live(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Sets an absolute expiry on a live key; false when the key is absent.
    pub fn set_expiry(&self, key: &Bytes, at_ms: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(key) {
            Some(record) if record.is_live(now_ms()) => {
                record.expires_at_ms = Some(at_ms);
                true
            }
            _ => false,
        }
    }

    pub fn remove_expiry(&self, key: &Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(key) {
            Some(record) if record.is_live(now_ms()) => {
                record.expires_at_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn expiry_of(&self, key: &Bytes) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        inner
            .get(key)
            .filter(|record| record.is_live(now_ms()))
            .and_then(|record| record.expires_at_ms)
    }

    /// Sweeps dead records. Best-effort; lazy reads keep the visible
    /// semantics identical whether or not this ever runs.
    pub fn cleanup_expired(&self) -> usize {
        let now = now_ms();
        let mut inner = self.inner.lock().unwrap();
        let before = inner.len();
        inner.retain(|_, record| record.is_live(now));
        before - inner.len()
    }

    /// INCR: absent stores "1"; an integer value increments in place with
    /// its expiry untouched; anything else is a client error.
    pub fn incr(&self, key: &Bytes) -> Result<i64, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        let live = inner
            .get(key)
            .filter(|record| record.is_live(now_ms()))
            .is_some();
        if !live {
            inner.insert(
                key.clone(),
                StringRecord { value: Bytes::from_static(b"1"), expires_at_ms: None },
            );
            return Ok(1);
        }
        let record = inner.get_mut(key).unwrap();
        let n = std::str::from_utf8(&record.value)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(ClientError::NotAnInteger)?;
        let n = n.checked_add(1).ok_or(ClientError::NotAnInteger)?;
        record.value = Bytes::from(n.to_string());
        Ok(n)
    }

    /// Live `(key, value, expiry)` set for the snapshot writer. Dead records
    /// are swept first so they never reach disk.
    pub fn snapshot(&self) -> Vec<(Bytes, Bytes, Option<u64>)> {
        self.cleanup_expired();
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|(key, record)| (key.clone(), record.value.clone(), record.expires_at_ms))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_then_get() {
        let store = StringStore::new();
        store.set(b("foo"), b("bar"), None);
        assert_eq!(store.get(&b("foo")), Some(b("bar")));
        assert_eq!(store.get(&b("missing")), None);
    }

    #[test]
    fn expired_key_reads_as_absent_and_is_deleted() {
        let store = StringStore::new();
        store.set(b("foo"), b("bar"), Some(now_ms().saturating_sub(1)));
        assert_eq!(store.get(&b("foo")), None);
        assert_eq!(store.size(), 0);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn set_without_expiry_clears_a_previous_one() {
        let store = StringStore::new();
        store.set(b("foo"), b("bar"), Some(now_ms() + 60_000));
        store.set(b("foo"), b("baz"), None);
        assert_eq!(store.expiry_of(&b("foo")), None);
        assert_eq!(store.get(&b("foo")), Some(b("baz")));
    }

    #[test]
    fn expiry_can_be_set_and_removed() {
        let store = StringStore::new();
        store.set(b("foo"), b("bar"), None);
        let at = now_ms() + 60_000;
        assert!(store.set_expiry(&b("foo"), at));
        assert_eq!(store.expiry_of(&b("foo")), Some(at));
        assert!(store.remove_expiry(&b("foo")));
        assert_eq!(store.expiry_of(&b("foo")), None);
        assert!(!store.set_expiry(&b("missing"), at));
    }

    #[test]
    fn cleanup_sweeps_only_dead_records() {
        let store = StringStore::new();
        store.set(b("dead"), b("x"), Some(1));
        store.set(b("live"), b("y"), None);
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn incr_counts_from_absent_and_preserves_expiry() {
        let store = StringStore::new();
        assert_eq!(store.incr(&b("n")), Ok(1));
        assert_eq!(store.incr(&b("n")), Ok(2));
        assert_eq!(store.get(&b("n")), Some(b("2")));

        let at = now_ms() + 60_000;
        store.set(b("m"), b("41"), Some(at));
        assert_eq!(store.incr(&b("m")), Ok(42));
        assert_eq!(store.expiry_of(&b("m")), Some(at));
    }

    #[test]
    fn incr_rejects_non_integers() {
        let store = StringStore::new();
        store.set(b("s"), b("abc"), None);
        assert_eq!(store.incr(&b("s")), Err(ClientError::NotAnInteger));
        store.set(b("big"), b(&i64::MAX.to_string()), None);
        assert_eq!(store.incr(&b("big")), Err(ClientError::NotAnInteger));
    }

    #[test]
    fn snapshot_skips_expired_records() {
        let store = StringStore::new();
        store.set(b("dead"), b("x"), Some(1));
        store.set(b("live"), b("y"), Some(now_ms() + 60_000));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, b("live"));
    }
}
