use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique tag for one request. Pages are rebuilt on navigation,
/// so tickets must never repeat across page instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn next() -> Ticket {
        Ticket(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct Remote<T> {
    value: T,
    loading: bool,
    current: Option<Ticket>,
}

impl<T: Default> Default for Remote<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Remote<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            loading: false,
            current: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn ticket(&self) -> Option<Ticket> {
        self.current
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current == Some(ticket)
    }

    pub fn begin(&mut self) -> Ticket {
        let ticket = Ticket::next();
        self.current = Some(ticket);
        self.loading = true;
        ticket
    }

    pub fn reset(&mut self, value: T) {
        self.value = value;
        self.loading = false;
        self.current = Some(Ticket::next());
    }

    /// Applies a response. `Ok(false)` means the response was stale and
    /// ignored; on `Err` the previous value is kept.
    pub fn finish<E>(&mut self, ticket: Ticket, result: Result<T, E>) -> Result<bool, E> {
        if !self.is_current(ticket) {
            debug!("Dropping stale response {:?}", ticket);
            return Ok(false);
        }
        self.loading = false;
        self.value = result?;
        Ok(true)
    }
}

/// Revision of one optimistic edit, unique across ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(u64);

impl Revision {
    fn next() -> Revision {
        Revision(NEXT_REVISION.fetch_add(1, Ordering::Relaxed))
    }
}

/// Confirmed values plus at most one pending edit per key.
///
/// What is displayed is the pending value when there is one, else the
/// confirmed value. A rejected edit only rolls back when it is still the
/// latest edit of its key.
#[derive(Debug, Clone)]
pub struct Optimistic<K, V> {
    confirmed: HashMap<K, V>,
    pending: HashMap<K, (Revision, V)>,
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Optimistic<K, V> {
    fn default() -> Self {
        Self {
            confirmed: HashMap::new(),
            pending: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Optimistic<K, V> {
    pub fn reset(&mut self, confirmed: HashMap<K, V>) {
        self.confirmed = confirmed;
        self.pending.clear();
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.pending
            .get(key)
            .map(|(_, value)| value)
            .or_else(|| self.confirmed.get(key))
    }

    pub fn confirmed(&self, key: &K) -> Option<&V> {
        self.confirmed.get(key)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_revision(&self, key: &K) -> Option<Revision> {
        self.pending.get(key).map(|(revision, _)| *revision)
    }

    pub fn propose(&mut self, key: K, value: V) -> Revision {
        let revision = Revision::next();
        self.pending.insert(key, (revision, value));
        revision
    }

    pub fn confirm(&mut self, key: &K, revision: Revision, stored: V) {
        self.confirmed.insert(key.clone(), stored);
        if self.pending.get(key).is_some_and(|(r, _)| *r == revision) {
            self.pending.remove(key);
        }
    }

    /// Drops a failed edit. Returns whether the display rolled back.
    pub fn reject(&mut self, key: &K, revision: Revision) -> bool {
        if self.pending.get(key).is_some_and(|(r, _)| *r == revision) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }
}
