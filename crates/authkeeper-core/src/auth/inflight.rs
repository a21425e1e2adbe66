use std::collections::HashMap;
use std::hash::Hash;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

pub type SharedLookup<V> = Shared<BoxFuture<'static, V>>;

struct Entry<V> {
    ticket: u64,
    lookup: SharedLookup<V>,
}

/// Outcome of `InFlight::join_or_start`
pub enum Joined<V> {
    /// Answered without a lookup
    Settled(V),
    /// A pending lookup; `started` is true for the caller that created it
    Pending { lookup: SharedLookup<V>, started: bool },
}

/// At most one pending lookup per key.
///
/// Callers arriving while a lookup is pending get a clone of the same shared
/// future. A finished lookup records its answer and drops its entry in one
/// step under the map lock (`complete_with`), and new callers check for a
/// recorded answer under that same lock, so no caller can find neither.
///
/// Entries are ticketed: a lookup that was cleared and replaced cannot
/// remove its successor.
pub struct InFlight<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    next_ticket: Mutex<u64>,
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_ticket: Mutex::new(0),
        }
    }

    /// Join the pending lookup for `key`; otherwise return what `settled`
    /// reports, or start a lookup with `start` if it reports nothing.
    ///
    /// Both closures run under the map lock and must not touch this `InFlight`.
    pub fn join_or_start<C, F>(&self, key: K, settled: C, start: F) -> Joined<V>
    where
        C: FnOnce() -> Option<V>,
        F: FnOnce(u64) -> BoxFuture<'static, V>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            return Joined::Pending {
                lookup: entry.lookup.clone(),
                started: false,
            };
        }
        if let Some(value) = settled() {
            return Joined::Settled(value);
        }

        let ticket = {
            let mut next = self.next_ticket.lock();
            *next += 1;
            *next
        };
        let lookup = start(ticket).shared();
        entries.insert(
            key,
            Entry {
                ticket,
                lookup: lookup.clone(),
            },
        );
        Joined::Pending {
            lookup,
            started: true,
        }
    }

    /// Run `record` and then remove the entry for `key` if it still belongs
    /// to `ticket`, all under the map lock.
    pub fn complete_with<R>(&self, key: &K, ticket: u64, record: impl FnOnce() -> R) -> R {
        let mut entries = self.entries.lock();
        let recorded = record();
        if matches!(entries.get(key), Some(entry) if entry.ticket == ticket) {
            entries.remove(key);
        }
        recorded
    }

    /// Forget every pending lookup; their futures keep running for existing waiters
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn pending<V>(joined: Joined<V>) -> (SharedLookup<V>, bool) {
        match joined {
            Joined::Pending { lookup, started } => (lookup, started),
            Joined::Settled(_) => panic!("expected a pending lookup"),
        }
    }

    #[tokio::test]
    async fn test_second_caller_joins_pending_lookup() {
        let inflight: InFlight<&str, u32> = InFlight::new();
        let started = Arc::new(AtomicUsize::new(0));

        let make = |started: Arc<AtomicUsize>| {
            move |_ticket: u64| {
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    42
                }
                .boxed()
            }
        };

        let (first, first_started) =
            pending(inflight.join_or_start("user", || None, make(started.clone())));
        let (second, second_started) =
            pending(inflight.join_or_start("user", || Some(7), make(started.clone())));
        assert!(first_started);
        assert!(!second_started);

        let (a, b) = futures::join!(first, second);
        assert_eq!((a, b), (42, 42));
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_settled_answer_skips_lookup() {
        let inflight: InFlight<&str, u32> = InFlight::new();
        let joined = inflight.join_or_start("user", || Some(7), |_| async { 1 }.boxed());
        assert!(matches!(joined, Joined::Settled(7)));
        assert!(inflight.is_empty());
    }

    #[test]
    fn test_recorded_answer_is_visible_once_entry_is_gone() {
        let inflight: InFlight<&str, u32> = InFlight::new();
        let answer = parking_lot::Mutex::new(None);

        let mut ticket = 0;
        let _ = inflight.join_or_start("user", || *answer.lock(), |t| {
            ticket = t;
            async { 3 }.boxed()
        });

        let recorded = inflight.complete_with(&"user", ticket, || {
            *answer.lock() = Some(3);
            true
        });
        assert!(recorded);
        assert!(!inflight.is_pending(&"user"));
        assert!(matches!(
            inflight.join_or_start("user", || *answer.lock(), |_| async { 4 }.boxed()),
            Joined::Settled(3)
        ));
    }

    #[test]
    fn test_complete_only_removes_own_ticket() {
        let inflight: InFlight<&str, u32> = InFlight::new();

        let _old = inflight.join_or_start("user", || None, |_| async { 1 }.boxed());
        inflight.clear();
        let mut new_ticket = 0;
        let (_new, started) = pending(inflight.join_or_start("user", || None, |ticket| {
            new_ticket = ticket;
            async { 2 }.boxed()
        }));
        assert!(started);

        inflight.complete_with(&"user", new_ticket - 1, || ());
        assert!(inflight.is_pending(&"user"));
        inflight.complete_with(&"user", new_ticket, || ());
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share() {
        let inflight: InFlight<&str, u32> = InFlight::new();
        let (a, a_started) = pending(inflight.join_or_start("a", || None, |_| async { 1 }.boxed()));
        let (b, b_started) = pending(inflight.join_or_start("b", || None, |_| async { 2 }.boxed()));
        assert!(a_started && b_started);
        assert_eq!(inflight.len(), 2);
        assert_eq!(a.await + b.await, 3);
    }
}
