#![forbid(unsafe_code)]

//! Hierarchical subscription nodes.
//!
//! Every consumer owns one [`Subscription`]. A node either registers its
//! change callback directly with the state source (root level) or, when it
//! has a parent, as one entry in the parent's nested [`ListenerRegistry`].
//! A state change therefore cascades strictly top-down: a node's callback
//! recomputes its consumer's view and only then calls
//! [`Subscription::notify_nested_subs`], which is what reaches the next
//! level.
//!
//! # State machine
//!
//! ```text
//!   Unsubscribed --try_subscribe--> Subscribed
//!   Subscribed --try_unsubscribe--> Unsubscribed
//! ```
//!
//! # Invariants
//!
//! 1. A node is subscribed iff it holds an [`Unsubscribe`] handle iff its
//!    nested listeners are a live registry (not the detached no-op).
//! 2. `try_subscribe` and `try_unsubscribe` are idempotent.
//! 3. After `try_unsubscribe` the node holds no reference into its parent's
//!    registry and may be subscribed again.
//!
//! The parent link is a `Weak` reference used only to delegate
//! `add_nested_sub`; lifetime of the tree belongs to whoever owns the
//! consumers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::listeners::ListenerRegistry;
use crate::source::{Listener, Subscribable, Unsubscribe};

/// Nested listener storage: the shared no-op state or a live registry.
#[derive(Clone)]
enum NestedListeners {
    Detached,
    Live(ListenerRegistry),
}

impl NestedListeners {
    fn notify(&self) {
        if let Self::Live(registry) = self {
            registry.notify();
        }
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        match self {
            Self::Detached => Unsubscribe::noop(),
            Self::Live(registry) => registry.subscribe(listener),
        }
    }
}

struct SubscriptionInner {
    source: Rc<dyn Subscribable>,
    parent: Option<Weak<RefCell<SubscriptionInner>>>,
    on_state_change: Listener,
    unsubscribe: Option<Unsubscribe>,
    listeners: NestedListeners,
}

/// Non-owning link to a subscription node, used as a parent reference.
#[derive(Clone)]
pub struct WeakSubscription {
    inner: Weak<RefCell<SubscriptionInner>>,
}

impl WeakSubscription {
    /// Upgrade to a usable node handle if the node is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Subscription> {
        self.inner.upgrade().map(|inner| Subscription { inner })
    }
}

impl fmt::Debug for WeakSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSubscription")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// One consumer's node in the subscription tree.
pub struct Subscription {
    inner: Rc<RefCell<SubscriptionInner>>,
}

impl Subscription {
    /// Create an unsubscribed node.
    ///
    /// `on_state_change` is the owning consumer's callback; it is what gets
    /// registered with the parent (or the source) on `try_subscribe`.
    pub fn new(
        source: Rc<dyn Subscribable>,
        parent: Option<WeakSubscription>,
        on_state_change: Listener,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SubscriptionInner {
                source,
                parent: parent.map(|p| p.inner),
                on_state_change,
                unsubscribe: None,
                listeners: NestedListeners::Detached,
            })),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakSubscription {
        WeakSubscription {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Register `listener` as a nested subscriber, subscribing this node
    /// first if needed.
    pub fn add_nested_sub(&self, listener: Listener) -> Unsubscribe {
        self.try_subscribe();
        let listeners = self.inner.borrow().listeners.clone();
        listeners.subscribe(listener)
    }

    /// Notify nested subscribers registered with this node.
    pub fn notify_nested_subs(&self) {
        let listeners = self.inner.borrow().listeners.clone();
        listeners.notify();
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.borrow().unsubscribe.is_some()
    }

    /// Whether this node delegates to a parent instead of the source.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.inner.borrow().parent.is_some()
    }

    /// Subscribe through the parent, or the source when there is none.
    pub fn try_subscribe(&self) {
        let (source, parent, on_state_change) = {
            let inner = self.inner.borrow();
            if inner.unsubscribe.is_some() {
                return;
            }
            (
                Rc::clone(&inner.source),
                inner.parent.clone(),
                Rc::clone(&inner.on_state_change),
            )
        };

        let unsubscribe = match parent {
            Some(weak) => match weak.upgrade() {
                Some(parent) => Subscription { inner: parent }.add_nested_sub(on_state_change),
                None => {
                    tracing::warn!("parent subscription dropped before child subscribed");
                    return;
                }
            },
            None => source.subscribe(on_state_change),
        };

        let mut inner = self.inner.borrow_mut();
        inner.unsubscribe = Some(unsubscribe);
        inner.listeners = NestedListeners::Live(ListenerRegistry::new());
        tracing::trace!(nested = inner.parent.is_some(), "subscription attached");
    }

    /// Detach from the parent (or source) and drop nested listeners.
    pub fn try_unsubscribe(&self) {
        let (unsubscribe, listeners) = {
            let mut inner = self.inner.borrow_mut();
            let Some(unsubscribe) = inner.unsubscribe.take() else {
                return;
            };
            let listeners = std::mem::replace(&mut inner.listeners, NestedListeners::Detached);
            (unsubscribe, listeners)
        };
        unsubscribe.unsubscribe();
        if let NestedListeners::Live(registry) = listeners {
            registry.clear();
        }
        tracing::trace!("subscription detached");
    }

    /// Number of nested subscribers currently registered.
    #[must_use]
    pub fn nested_len(&self) -> usize {
        match &self.inner.borrow().listeners {
            NestedListeners::Detached => 0,
            NestedListeners::Live(registry) => registry.len(),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscribed", &self.is_subscribed())
            .field("nested", &self.has_parent())
            .field("nested_len", &self.nested_len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Minimal root source backed by a registry.
    #[derive(Default)]
    struct Root {
        listeners: ListenerRegistry,
    }

    impl Subscribable for Root {
        fn subscribe(&self, listener: Listener) -> Unsubscribe {
            self.listeners.subscribe(listener)
        }
    }

    fn counting(count: &Rc<Cell<u32>>) -> Listener {
        let count = Rc::clone(count);
        Rc::new(move || count.set(count.get() + 1))
    }

    #[test]
    fn starts_unsubscribed() {
        let root = Rc::new(Root::default());
        let sub = Subscription::new(root.clone(), None, Rc::new(|| {}));
        assert!(!sub.is_subscribed());
        assert_eq!(sub.nested_len(), 0);
        assert!(root.listeners.is_empty());
    }

    #[test]
    fn root_node_subscribes_to_source() {
        let root = Rc::new(Root::default());
        let count = Rc::new(Cell::new(0));
        let sub = Subscription::new(root.clone(), None, counting(&count));

        sub.try_subscribe();
        sub.try_subscribe();
        assert!(sub.is_subscribed());
        assert_eq!(root.listeners.len(), 1);

        root.listeners.notify();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn child_registers_through_parent() {
        let root = Rc::new(Root::default());
        let parent = Subscription::new(root.clone(), None, Rc::new(|| {}));
        let count = Rc::new(Cell::new(0));
        let child = Subscription::new(root.clone(), Some(parent.downgrade()), counting(&count));

        child.try_subscribe();
        assert!(child.is_subscribed());
        assert!(parent.is_subscribed(), "add_nested_sub subscribes the parent");
        assert_eq!(parent.nested_len(), 1);
        assert_eq!(root.listeners.len(), 1, "only the parent talks to the source");

        // The parent's own callback does not cascade; its owner does.
        root.listeners.notify();
        assert_eq!(count.get(), 0);
        parent.notify_nested_subs();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribe_detaches_and_clears() {
        let root = Rc::new(Root::default());
        let parent = Subscription::new(root.clone(), None, Rc::new(|| {}));
        let count = Rc::new(Cell::new(0));
        let child = Subscription::new(root.clone(), Some(parent.downgrade()), counting(&count));
        child.try_subscribe();

        child.try_unsubscribe();
        child.try_unsubscribe();
        assert!(!child.is_subscribed());
        assert_eq!(parent.nested_len(), 0);

        parent.notify_nested_subs();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn parent_unsubscribe_drops_nested_listeners() {
        let root = Rc::new(Root::default());
        let parent = Subscription::new(root.clone(), None, Rc::new(|| {}));
        let count = Rc::new(Cell::new(0));
        let handle = parent.add_nested_sub(counting(&count));

        parent.try_unsubscribe();
        assert!(root.listeners.is_empty());
        parent.notify_nested_subs();
        handle.unsubscribe();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn resubscribe_round_trip() {
        let root = Rc::new(Root::default());
        let count = Rc::new(Cell::new(0));
        let sub = Subscription::new(root.clone(), None, counting(&count));

        sub.try_subscribe();
        sub.try_unsubscribe();
        assert!(!sub.is_subscribed());
        assert_eq!(sub.nested_len(), 0);
        assert!(root.listeners.is_empty());

        sub.try_subscribe();
        root.listeners.notify();
        assert_eq!(count.get(), 1);
        assert_eq!(root.listeners.len(), 1);
    }

    #[test]
    fn dropped_parent_leaves_child_unsubscribed() {
        let root = Rc::new(Root::default());
        let parent = Subscription::new(root.clone(), None, Rc::new(|| {}));
        let child = Subscription::new(root.clone(), Some(parent.downgrade()), Rc::new(|| {}));
        drop(parent);

        child.try_subscribe();
        assert!(!child.is_subscribed());
        assert!(root.listeners.is_empty());
    }

    #[test]
    fn weak_upgrade_tracks_lifetime() {
        let root = Rc::new(Root::default());
        let sub = Subscription::new(root, None, Rc::new(|| {}));
        let weak = sub.downgrade();
        assert!(weak.upgrade().is_some());
        drop(sub);
        assert!(weak.upgrade().is_none());
    }
}
