#![forbid(unsafe_code)]

//! Ordered listener collection with snapshot-stable notification.
//!
//! # Design
//!
//! The registry keeps two references to the listener sequence: `current`,
//! the snapshot walked by an in-flight [`ListenerRegistry::notify`], and
//! `next`, the sequence mutated by subscribe/unsubscribe. A mutation first
//! checks whether the two are the same allocation and clones before writing
//! (copy-on-write), so a pass that already started never sees the edit.
//!
//! # Invariants
//!
//! 1. Outside of `notify`, after any mutation `current` and `next` hold the
//!    same contents.
//! 2. `notify` invokes exactly the listeners registered when it started, in
//!    registration order.
//! 3. Subscribe/unsubscribe performed by a listener during `notify` are
//!    visible to the next `notify`.
//! 4. An [`Unsubscribe`] returned by `subscribe` is idempotent and becomes a
//!    no-op once the registry has been cleared.
//!
//! No `RefCell` borrow is held while a listener runs, so listeners may
//! freely re-enter the registry.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::source::{Listener, Unsubscribe};

#[derive(Clone)]
struct Entry {
    id: u64,
    listener: Listener,
}

struct Lists {
    current: Rc<Vec<Entry>>,
    next: Rc<Vec<Entry>>,
}

impl Lists {
    /// Detach `next` from an in-flight snapshot before writing to it.
    fn next_mut(&mut self) -> &mut Vec<Entry> {
        if Rc::ptr_eq(&self.next, &self.current) {
            self.next = Rc::new(self.current.as_ref().clone());
        }
        Rc::make_mut(&mut self.next)
    }
}

struct RegistryState {
    /// `None` once cleared.
    lists: Option<Lists>,
    next_id: u64,
}

/// Mutable, ordered collection of zero-argument callbacks.
///
/// Cloning creates a new handle to the **same** registry.
#[derive(Clone)]
pub struct ListenerRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        let empty = Rc::new(Vec::new());
        Self {
            state: Rc::new(RefCell::new(RegistryState {
                lists: Some(Lists {
                    current: Rc::clone(&empty),
                    next: empty,
                }),
                next_id: 0,
            })),
        }
    }

    /// Register a listener at the end of the sequence.
    ///
    /// Subscribing to a cleared registry registers nothing and returns a
    /// no-op handle.
    pub fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            let Some(lists) = state.lists.as_mut() else {
                tracing::warn!("subscribe on a cleared listener registry ignored");
                return Unsubscribe::noop();
            };
            lists.next_mut().push(Entry { id, listener });
            state.next_id += 1;
            id
        };

        let weak: Weak<RefCell<RegistryState>> = Rc::downgrade(&self.state);
        Unsubscribe::new(move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let mut state = state.borrow_mut();
            let Some(lists) = state.lists.as_mut() else {
                return;
            };
            let next = lists.next_mut();
            if let Some(pos) = next.iter().position(|e| e.id == id) {
                next.remove(pos);
            }
        })
    }

    /// Invoke every listener registered at the moment this call began.
    pub fn notify(&self) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            let Some(lists) = state.lists.as_mut() else {
                return;
            };
            lists.current = Rc::clone(&lists.next);
            Rc::clone(&lists.current)
        };
        tracing::trace!(listeners = snapshot.len(), "listener registry notify");
        for entry in snapshot.iter() {
            (entry.listener)();
        }
    }

    /// Discard all listeners. Outstanding handles become no-ops.
    pub fn clear(&self) {
        self.state.borrow_mut().lists = None;
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.state.borrow().lists.is_none()
    }

    /// Number of listeners the next `notify` would invoke.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .borrow()
            .lists
            .as_ref()
            .map_or(0, |lists| lists.next.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .field("cleared", &self.is_cleared())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Rc::clone(log);
        Rc::new(move || log.borrow_mut().push(tag))
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let _a = registry.subscribe(recorder(&log, "a"));
        let _b = registry.subscribe(recorder(&log, "b"));
        let _c = registry.subscribe(recorder(&log, "c"));

        registry.notify();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let _a = registry.subscribe(recorder(&log, "a"));
        let b = registry.subscribe(recorder(&log, "b"));

        b.unsubscribe();
        registry.notify();
        assert_eq!(*log.borrow(), vec!["a"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_listener_twice_is_two_entries() {
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let listener: Listener = Rc::new(move || c.set(c.get() + 1));
        let registry = ListenerRegistry::new();
        let first = registry.subscribe(Rc::clone(&listener));
        let _second = registry.subscribe(listener);

        registry.notify();
        assert_eq!(count.get(), 2);

        first.unsubscribe();
        registry.notify();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn subscribe_during_notify_waits_for_next_pass() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();

        let reg = registry.clone();
        let late = recorder(&log, "late");
        let added = Rc::new(Cell::new(false));
        let added_flag = Rc::clone(&added);
        let log_first = Rc::clone(&log);
        let _first = registry.subscribe(Rc::new(move || {
            log_first.borrow_mut().push("first");
            if !added_flag.replace(true) {
                let _ = reg.subscribe(Rc::clone(&late));
            }
        }));

        registry.notify();
        assert_eq!(*log.borrow(), vec!["first"]);

        registry.notify();
        assert_eq!(*log.borrow(), vec!["first", "first", "late"]);
    }

    #[test]
    fn unsubscribe_during_notify_does_not_skip_current_pass() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();

        let victim_handle: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));
        let vh = Rc::clone(&victim_handle);
        let log_killer = Rc::clone(&log);
        let _killer = registry.subscribe(Rc::new(move || {
            log_killer.borrow_mut().push("killer");
            if let Some(h) = vh.borrow().as_ref() {
                h.unsubscribe();
            }
        }));
        let victim = registry.subscribe(recorder(&log, "victim"));
        *victim_handle.borrow_mut() = Some(victim);

        registry.notify();
        assert_eq!(*log.borrow(), vec!["killer", "victim"]);

        registry.notify();
        assert_eq!(*log.borrow(), vec!["killer", "victim", "killer"]);
    }

    #[test]
    fn self_unsubscribe_during_notify() {
        let count = Rc::new(Cell::new(0u32));
        let registry = ListenerRegistry::new();
        let slot: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let s = Rc::clone(&slot);
        let c = Rc::clone(&count);
        let handle = registry.subscribe(Rc::new(move || {
            c.set(c.get() + 1);
            if let Some(h) = s.borrow().as_ref() {
                h.unsubscribe();
            }
        }));
        *slot.borrow_mut() = Some(handle);

        registry.notify();
        registry.notify();
        assert_eq!(count.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_makes_handles_noops() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = registry.subscribe(recorder(&log, "a"));

        registry.clear();
        assert!(registry.is_cleared());
        a.unsubscribe();
        registry.notify();
        assert!(log.borrow().is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn subscribe_after_clear_is_ignored() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.clear();
        let handle = registry.subscribe(recorder(&log, "a"));
        assert!(!handle.is_pending());
        registry.notify();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent_across_reinsertion() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = registry.subscribe(recorder(&log, "a"));
        a.unsubscribe();
        let _b = registry.subscribe(recorder(&log, "b"));
        a.unsubscribe();

        registry.notify();
        assert_eq!(*log.borrow(), vec!["b"]);
    }
}
