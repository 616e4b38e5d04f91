use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use bytes::Bytes;

/// A client parked in BLPOP: the wake path sends `(key, element)` down the
/// channel; the worker that owns the connection encodes the reply itself.
pub struct ListWaiter {
    pub id: u64,
    pub sender: Sender<(Bytes, Bytes)>,
}

#[derive(Default)]
struct ListInner {
    lists: HashMap<Bytes, VecDeque<Bytes>>,
    waiters: HashMap<Bytes, VecDeque<ListWaiter>>,
}

/// Key→ordered sequence plus a FIFO queue of blocked clients per key.
/// Lists and waiters share one lock: pairing a waiter with an element and
/// the empty-list deletion invariant both need the joint critical section.
#[derive(Default)]
pub struct ListStore {
    inner: Mutex<ListInner>,
    waiter_seq: AtomicU64,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_waiter_id(&self) -> u64 {
        self.waiter_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Appends at the tail; returns the length right after the push, before
    /// any blocked client consumes from it.
    pub fn rpush(&self, key: &Bytes, elements: &[Bytes]) -> usize {
        let len = {
            let mut inner = self.inner.lock().unwrap();
            let list = inner.lists.entry(key.clone()).or_default();
            list.extend(elements.iter().cloned());
            list.len()
        };
        self.wake_waiters(key);
        len
    }

    /// Prepends in argument order: `LPUSH k a b c` leaves the list `c b a …`.
    pub fn lpush(&self, key: &Bytes, elements: &[Bytes]) -> usize {
        let len = {
            let mut inner = self.inner.lock().unwrap();
            let list = inner.lists.entry(key.clone()).or_default();
            for element in elements {
                list.push_front(element.clone());
            }
            list.len()
        };
        self.wake_waiters(key);
        len
    }

    /// Removes up to `count` elements from the head. Deletes the key when
    /// the last element goes.
    pub fn lpop(&self, key: &Bytes, count: usize) -> Vec<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        let Some(list) = inner.lists.get_mut(key) else {
            return vec![];
        };
        let take = count.min(list.len());
        let popped = list.drain(..take).collect();
        if list.is_empty() {
            inner.lists.remove(key);
        }
        popped
    }

    pub fn lrange(&self, key: &Bytes, start: i64, end: i64) -> Vec<Bytes> {
        let inner = self.inner.lock().unwrap();
        let Some(list) = inner.lists.get(key) else {
            return vec![];
        };
        let len = list.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let end = if end < 0 { len + end } else { end.min(len - 1) };
        if start >= len || end < 0 || start > end {
            return vec![];
        }
        list.iter()
            .skip(start as usize)
            .take((end - start + 1) as usize)
            .cloned()
            .collect()
    }

    pub fn llen(&self, key: &Bytes) -> usize {
        self.inner
            .lock()
            .unwrap()
            .lists
            .get(key)
            .map_or(0, |list| list.len())
    }

    pub fn exists(&self, key: &Bytes) -> bool {
        self.inner.lock().unwrap().lists.contains_key(key)
    }

    /// DEL: drops the whole list. Blocked waiters stay queued; a list only
    /// exists while it has elements, so there is nothing to hand them.
    pub fn remove(&self, key: &Bytes) -> bool {
        self.inner.lock().unwrap().lists.remove(key).is_some()
    }

    /// Atomically: if the list is non-empty the caller should pop instead
    /// (returns false); otherwise the waiter joins the key's FIFO queue.
    pub fn block_waiter(&self, key: &Bytes, waiter: ListWaiter) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.lists.get(key).is_some_and(|list| !list.is_empty()) {
            return false;
        }
        inner.waiters.entry(key.clone()).or_default().push_back(waiter);
        true
    }

    /// Timeout side of the wake/timeout race: whoever removes the waiter
    /// owns the reply. Returns false when the wake path already took it.
    pub fn unblock_waiter(&self, key: &Bytes, waiter_id: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(queue) = inner.waiters.get_mut(key) else {
            return false;
        };
        let Some(position) = queue.iter().position(|w| w.id == waiter_id) else {
            return false;
        };
        queue.remove(position);
        if queue.is_empty() {
            inner.waiters.remove(key);
        }
        true
    }

    /// Atomically pairs the oldest waiter with the head element, when both
    /// exist. The joint critical section guarantees no element satisfies two
    /// waiters and no waiter receives two elements.
    pub fn pop_for_waiter(&self, key: &Bytes) -> Option<(ListWaiter, Bytes)> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.lists.get(key).is_some_and(|list| !list.is_empty()) {
            return None;
        }
        let queue = inner.waiters.get_mut(key)?;
        let waiter = queue.pop_front()?;
        if queue.is_empty() {
            inner.waiters.remove(key);
        }
        let list = inner.lists.get_mut(key).unwrap();
        let element = list.pop_front().unwrap();
        if list.is_empty() {
            inner.lists.remove(key);
        }
        Some((waiter, element))
    }

    /// Push-path drain: hand elements to waiters while both sides are
    /// non-empty. A delivery whose receiver has gone away puts the element
    /// back at the head and moves on to the next waiter.
    fn wake_waiters(&self, key: &Bytes) {
        while let Some((waiter, element)) = self.pop_for_waiter(key) {
            if let Err(returned) = waiter.sender.send((key.clone(), element)) {
                let (_, element) = returned.0;
                let mut inner = self.inner.lock().unwrap();
                inner.lists.entry(key.clone()).or_default().push_front(element);
            }
        }
    }
}
