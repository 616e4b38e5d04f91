use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use bytes::Bytes;

use crate::error::ClientError;
use crate::store::now_ms;

/// `(ms, seq)` stream entry ID; derived ordering is the lexicographic
/// ordering the monotonicity invariant is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamEntryId(pub u64, pub u64);

impl StreamEntryId {
    pub const MIN: Self = Self(0, 0);
    pub const MAX: Self = Self(u64::MAX, u64::MAX);

    /// Parses an entry position: `<ms>-<seq>`, or a bare `<ms>` which
    /// normalizes to seq 0. Used for ranges and XREAD cursors; XADD specs go
    /// through `from_spec`.
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, Some(seq)),
            None => (s, None),
        };
        let ms = ms.parse::<u64>().map_err(|_| ClientError::BadStreamId)?;
        let seq = match seq {
            Some(seq) => seq.parse::<u64>().map_err(|_| ClientError::BadStreamId)?,
            None => 0,
        };
        Ok(Self(ms, seq))
    }

    /// Range start: `-` is the smallest possible ID.
    pub fn parse_range_start(s: &str) -> Result<Self, ClientError> {
        if s == "-" {
            return Ok(Self::MIN);
        }
        Self::parse(s)
    }

    /// Range end: `+` is the largest possible ID. A bare `<ms>` normalizes
    /// to seq 0 here too, same as on the start side.
    pub fn parse_range_end(s: &str) -> Result<Self, ClientError> {
        if s == "+" {
            return Ok(Self::MAX);
        }
        Self::parse(s)
    }

    /// Resolves an XADD ID spec against the stream tail: `*` takes the
    /// current wall-clock ms, `<ms>-*` picks the next free seq for that ms,
    /// and `<ms>-<seq>` is literal. The caller still validates monotonicity.
    pub fn from_spec(spec: &str, last: Option<StreamEntryId>) -> Result<Self, ClientError> {
        if spec == "*" {
            let ms = now_ms();
            return Ok(Self(ms, Self::next_seq(ms, last)));
        }
        match spec.split_once('-') {
            Some((ms, "*")) => {
                let ms = ms.parse::<u64>().map_err(|_| ClientError::BadStreamId)?;
                Ok(Self(ms, Self::next_seq(ms, last)))
            }
            Some((ms, seq)) => {
                let ms = ms.parse::<u64>().map_err(|_| ClientError::BadStreamId)?;
                let seq = seq.parse::<u64>().map_err(|_| ClientError::BadStreamId)?;
                Ok(Self(ms, seq))
            }
            None => Err(ClientError::BadStreamId),
        }
    }

    /// Inclusive containment, the XRANGE filter.
    pub fn between(&self, start: StreamEntryId, end: StreamEntryId) -> bool {
        *self >= start && *self <= end
    }

    /// Sequence-assignment rule: continue the tail's sequence when the ms
    /// matches, otherwise 0. Exception: ms 0, where seq 0 would collide
    /// with the forbidden 0-0.
    fn next_seq(ms: u64, last: Option<StreamEntryId>) -> u64 {
        match last {
            Some(StreamEntryId(last_ms, last_seq)) if last_ms == ms => last_seq + 1,
            _ if ms == 0 => 1,
            _ => 0,
        }
    }
}

impl Display for StreamEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamEntryId,
    pub fields: Vec<(Bytes, Bytes)>,
}

/// A client parked in XREAD BLOCK, watching several streams at once. The
/// first satisfying append deregisters it everywhere and fires the signal.
pub struct StreamWaiter {
    pairs: Vec<(Bytes, StreamEntryId)>,
    sender: Sender<()>,
}

#[derive(Default)]
struct StreamInner {
    streams: HashMap<Bytes, Vec<StreamEntry>>,
    waiters: HashMap<u64, StreamWaiter>,
    watchers: HashMap<Bytes, Vec<u64>>,
}

/// Key→append-only entry log plus the cross-stream blocked-client registry.
/// One lock covers both, so registration's already-satisfied check and
/// append's notification sweep are atomic with the data they look at.
#[derive(Default)]
pub struct StreamStore {
    inner: Mutex<StreamInner>,
    waiter_seq: AtomicU64,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry, resolving and validating the ID spec against the
    /// current tail, then wakes every watcher the new entry satisfies.
    pub fn add(
        &self,
        key: &Bytes,
        id_spec: &str,
        fields: Vec<(Bytes, Bytes)>,
    ) -> Result<StreamEntryId, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        let last = inner.streams.get(key).and_then(|s| s.last()).map(|e| e.id);
        let id = StreamEntryId::from_spec(id_spec, last)?;
        if id <= StreamEntryId::MIN {
            return Err(ClientError::StreamIdZero);
        }
        if let Some(last) = last {
            if id <= last {
                return Err(ClientError::StreamIdNotGreater);
            }
        }
        inner
            .streams
            .entry(key.clone())
            .or_default()
            .push(StreamEntry { id, fields });
        Self::notify_watchers(&mut inner, key);
        Ok(id)
    }

    pub fn range(
        &self,
        key: &Bytes,
        start: StreamEntryId,
        end: StreamEntryId,
    ) -> Vec<StreamEntry> {
        let inner = self.inner.lock().unwrap();
        inner.streams.get(key).map_or_else(Vec::new, |entries| {
            entries
                .iter()
                .filter(|e| e.id.between(start, end))
                .cloned()
                .collect()
        })
    }

    /// Entries strictly greater than `after`; the XREAD read primitive.
    pub fn entries_after(&self, key: &Bytes, after: StreamEntryId) -> Vec<StreamEntry> {
        let inner = self.inner.lock().unwrap();
        inner.streams.get(key).map_or_else(Vec::new, |entries| {
            entries.iter().filter(|e| e.id > after).cloned().collect()
        })
    }

    pub fn last_id(&self, key: &Bytes) -> Option<StreamEntryId> {
        let inner = self.inner.lock().unwrap();
        inner.streams.get(key).and_then(|s| s.last()).map(|e| e.id)
    }

    pub fn first_id(&self, key: &Bytes) -> Option<StreamEntryId> {
        let inner = self.inner.lock().unwrap();
        inner.streams.get(key).and_then(|s| s.first()).map(|e| e.id)
    }

    pub fn length(&self, key: &Bytes) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.streams.get(key).map_or(0, |s| s.len())
    }

    pub fn exists(&self, key: &Bytes) -> bool {
        self.inner.lock().unwrap().streams.contains_key(key)
    }

    /// DEL: drops the whole stream. Watchers stay registered and simply
    /// never match entries from the deleted log.
    pub fn remove(&self, key: &Bytes) -> bool {
        self.inner.lock().unwrap().streams.remove(key).is_some()
    }

    /// Registers a waiter on every listed stream, unless one of them
    /// already holds an entry past its cursor; in that case nothing is
    /// registered and the caller reads immediately.
    pub fn register_waiter(
        &self,
        pairs: Vec<(Bytes, StreamEntryId)>,
        sender: Sender<()>,
    ) -> Option<u64> {
        let mut inner = self.inner.lock().unwrap();
        let satisfied = pairs.iter().any(|(key, after)| {
            inner
                .streams
                .get(key)
                .and_then(|s| s.last())
                .is_some_and(|e| e.id > *after)
        });
        if satisfied {
            return None;
        }
        let id = self.waiter_seq.fetch_add(1, Ordering::Relaxed);
        for (key, _) in &pairs {
            inner.watchers.entry(key.clone()).or_default().push(id);
        }
        inner.waiters.insert(id, StreamWaiter { pairs, sender });
        Some(id)
    }

    /// Timeout side of the wake/timeout race: true when the waiter was still
    /// registered (this caller owns the reply), false when an append already
    /// took it.
    pub fn deregister_waiter(&self, waiter_id: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        Self::remove_waiter(&mut inner, waiter_id).is_some()
    }

    fn remove_waiter(inner: &mut StreamInner, waiter_id: u64) -> Option<StreamWaiter> {
        let waiter = inner.waiters.remove(&waiter_id)?;
        for (key, _) in &waiter.pairs {
            if let Some(ids) = inner.watchers.get_mut(key) {
                ids.retain(|id| *id != waiter_id);
                if ids.is_empty() {
                    inner.watchers.remove(key);
                }
            }
        }
        Some(waiter)
    }

    /// After an append: every watcher of this stream whose cursor is now
    /// behind the tail gets deregistered from ALL its streams, then
    /// signalled. Removal before signalling is what makes delivery
    /// exactly-once against a racing timeout.
    fn notify_watchers(inner: &mut StreamInner, key: &Bytes) {
        let last = match inner.streams.get(key).and_then(|s| s.last()) {
            Some(entry) => entry.id,
            None => return,
        };
        let candidates = match inner.watchers.get(key) {
            Some(ids) => ids.clone(),
            None => return,
        };
        for waiter_id in candidates {
            let satisfied = inner
                .waiters
                .get(&waiter_id)
                .map(|w| {
                    w.pairs
                        .iter()
                        .any(|(k, after)| k == key && last > *after)
                })
                .unwrap_or(false);
            if !satisfied {
                continue;
            }
            if let Some(waiter) = Self::remove_waiter(inner, waiter_id) {
                // receiver gone means the worker died; nothing to deliver to
                let _ = waiter.sender.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(Bytes, Bytes)> {
        pairs.iter().map(|(k, v)| (b(k), b(v))).collect()
    }

    #[test]
    fn parse_accepts_full_and_bare_ids() {
        assert_eq!(StreamEntryId::parse("5-3").unwrap(), StreamEntryId(5, 3));
        assert_eq!(StreamEntryId::parse("5").unwrap(), StreamEntryId(5, 0));
        assert_eq!(StreamEntryId::parse("oops"), Err(ClientError::BadStreamId));
        assert_eq!(StreamEntryId::parse("5-"), Err(ClientError::BadStreamId));
    }

    #[test]
    fn range_sentinels() {
        assert_eq!(
            StreamEntryId::parse_range_start("-").unwrap(),
            StreamEntryId::MIN
        );
        assert_eq!(
            StreamEntryId::parse_range_end("+").unwrap(),
            StreamEntryId::MAX
        );
        // a bare ms defaults seq to 0 on both sides
        assert_eq!(
            StreamEntryId::parse_range_end("7").unwrap(),
            StreamEntryId(7, 0)
        );
    }

    #[test]
    fn ordering_is_lexicographic_on_ms_then_seq() {
        assert!(StreamEntryId(1, 9) < StreamEntryId(2, 0));
        assert!(StreamEntryId(2, 0) < StreamEntryId(2, 1));
        assert_eq!(StreamEntryId(3, 3), StreamEntryId(3, 3));
    }

    #[test]
    fn auto_seq_continues_the_tail() {
        let store = StreamStore::new();
        let key = b("s");
        assert_eq!(
            store.add(&key, "1526919030474-0", fields(&[("t", "36")])),
            Ok(StreamEntryId(1526919030474, 0))
        );
        assert_eq!(
            store.add(&key, "1526919030474-*", fields(&[("t", "37")])),
            Ok(StreamEntryId(1526919030474, 1))
        );
        // a fresh ms restarts the sequence at 0
        assert_eq!(
            store.add(&key, "1526919030475-*", fields(&[("t", "38")])),
            Ok(StreamEntryId(1526919030475, 0))
        );
    }

    #[test]
    fn auto_seq_for_ms_zero_starts_at_one() {
        let store = StreamStore::new();
        assert_eq!(
            store.add(&b("s"), "0-*", fields(&[("f", "v")])),
            Ok(StreamEntryId(0, 1))
        );
    }

    #[test]
    fn wildcard_takes_the_wall_clock() {
        let store = StreamStore::new();
        let before = now_ms();
        let id = store.add(&b("s"), "*", fields(&[("f", "v")])).unwrap();
        assert!(id.0 >= before);
        assert!(id.0 <= now_ms());
    }

    #[test]
    fn add_validation_errors() {
        let store = StreamStore::new();
        let key = b("s");
        assert_eq!(
            store.add(&key, "0-0", fields(&[("f", "v")])),
            Err(ClientError::StreamIdZero)
        );
        store.add(&key, "5-1", fields(&[("f", "v")])).unwrap();
        assert_eq!(
            store.add(&key, "5-1", fields(&[("f", "v")])),
            Err(ClientError::StreamIdNotGreater)
        );
        assert_eq!(
            store.add(&key, "4-9", fields(&[("f", "v")])),
            Err(ClientError::StreamIdNotGreater)
        );
        assert_eq!(
            store.add(&key, "nope", fields(&[("f", "v")])),
            Err(ClientError::BadStreamId)
        );
        // a failed first add must not leave an empty stream behind
        assert!(!store.exists(&b("fresh")));
        let _ = store.add(&b("fresh"), "0-0", fields(&[("f", "v")]));
        assert!(!store.exists(&b("fresh")));
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let store = StreamStore::new();
        let key = b("s");
        for spec in ["1-1", "2-1", "2-2", "3-0"] {
            store.add(&key, spec, fields(&[("n", spec)])).unwrap();
        }
        let ids = |entries: Vec<StreamEntry>| {
            entries.iter().map(|e| e.id).collect::<Vec<_>>()
        };
        assert_eq!(
            ids(store.range(&key, StreamEntryId(2, 1), StreamEntryId(2, 2))),
            vec![StreamEntryId(2, 1), StreamEntryId(2, 2)]
        );
        assert_eq!(
            ids(store.range(&key, StreamEntryId::MIN, StreamEntryId::MAX)).len(),
            4
        );
        // bare-ms end normalizes to seq 0, so 2-1 and 2-2 fall outside
        assert_eq!(
            ids(store.range(
                &key,
                StreamEntryId::MIN,
                StreamEntryId::parse_range_end("2").unwrap()
            )),
            vec![StreamEntryId(1, 1)]
        );
    }

    #[test]
    fn entries_after_is_strict() {
        let store = StreamStore::new();
        let key = b("s");
        store.add(&key, "1-0", fields(&[("f", "v")])).unwrap();
        store.add(&key, "2-0", fields(&[("f", "v")])).unwrap();
        let after = store.entries_after(&key, StreamEntryId(1, 0));
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, StreamEntryId(2, 0));
    }

    #[test]
    fn waiter_refused_when_data_is_ready() {
        let store = StreamStore::new();
        store.add(&b("s"), "2-0", fields(&[("f", "v")])).unwrap();
        let (tx, _rx) = mpsc::channel();
        assert!(store
            .register_waiter(vec![(b("s"), StreamEntryId(1, 0))], tx)
            .is_none());
    }

    #[test]
    fn add_wakes_and_fully_deregisters_a_waiter() {
        let store = StreamStore::new();
        let (tx, rx) = mpsc::channel();
        let id = store
            .register_waiter(
                vec![(b("a"), StreamEntryId(0, 0)), (b("b"), StreamEntryId(0, 0))],
                tx,
            )
            .unwrap();
        store.add(&b("a"), "1-0", fields(&[("f", "v")])).unwrap();
        assert!(rx.try_recv().is_ok());
        // woken means gone from every stream, including b
        assert!(!store.deregister_waiter(id));
        store.add(&b("b"), "1-0", fields(&[("f", "v")])).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn timed_out_waiter_is_not_signalled() {
        let store = StreamStore::new();
        let (tx, rx) = mpsc::channel();
        let id = store
            .register_waiter(vec![(b("s"), StreamEntryId(0, 0))], tx)
            .unwrap();
        assert!(store.deregister_waiter(id));
        store.add(&b("s"), "1-0", fields(&[("f", "v")])).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stale_cursor_does_not_wake_on_smaller_entries() {
        let store = StreamStore::new();
        store.add(&b("s"), "5-0", fields(&[("f", "v")])).unwrap();
        let (tx, rx) = mpsc::channel();
        let id = store
            .register_waiter(vec![(b("s"), StreamEntryId(5, 0))], tx)
            .unwrap();
        store.add(&b("s"), "6-0", fields(&[("f", "v")])).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(!store.deregister_waiter(id));
    }
}
