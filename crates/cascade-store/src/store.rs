#![forbid(unsafe_code)]

//! Reducer-driven state container.
//!
//! A [`Store`] owns the current state snapshot and a reducer. Every dispatch
//! runs the reducer once, swaps in the returned snapshot and then notifies
//! subscribers synchronously, in registration order, with the same
//! snapshot-stable discipline as nested subscription registries.
//!
//! Reducers must be pure: dispatching from inside a reducer is rejected with
//! [`StoreError::DispatchInReducer`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use cascade_core::{Dispatch, Listener, ListenerRegistry, StateSource, Subscribable, Unsubscribe};
use thiserror::Error;

/// `(state, action) -> next state`. Returning the same `Rc` keeps identity.
pub type Reducer<S, A> = Rc<dyn Fn(&Rc<S>, &A) -> Rc<S>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("reducers may not dispatch actions")]
    DispatchInReducer,
}

struct StoreInner<S, A> {
    state: RefCell<Rc<S>>,
    reducer: RefCell<Reducer<S, A>>,
    dispatching: Cell<bool>,
    listeners: ListenerRegistry,
}

impl<S, A> StoreInner<S, A> {
    fn reduce(&self, action: &A) -> Result<(), StoreError> {
        if self.dispatching.replace(true) {
            tracing::error!("dispatch from inside a reducer rejected");
            return Err(StoreError::DispatchInReducer);
        }
        let reducer = Rc::clone(&self.reducer.borrow());
        let current = Rc::clone(&self.state.borrow());
        let next = {
            let _guard = DispatchingGuard(&self.dispatching);
            reducer(&current, action)
        };
        let changed = !Rc::ptr_eq(&current, &next);
        *self.state.borrow_mut() = next;
        tracing::trace!(changed, listeners = self.listeners.len(), "store reduced");
        self.listeners.notify();
        Ok(())
    }
}

/// Clears the dispatching flag even if the reducer unwinds.
struct DispatchingGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Single-threaded state source.
///
/// Cloning yields another handle to the same store.
///
/// Two dispatch paths exist. [`Store::try_dispatch`] is the checked one and
/// reports a dispatch from inside a reducer as
/// [`StoreError::DispatchInReducer`]. The [`Dispatch`] handed to consumers
/// through [`StateSource::dispatcher`] cannot report errors: a rejected
/// dispatch is logged at `error` level, leaves the state untouched and still
/// returns the action.
pub struct Store<S, A> {
    inner: Rc<StoreInner<S, A>>,
}

impl<S: 'static, A: 'static> Store<S, A> {
    pub fn new(reducer: impl Fn(&Rc<S>, &A) -> Rc<S> + 'static, initial: S) -> Self {
        Self::with_state(Rc::new(reducer), Rc::new(initial))
    }

    #[must_use]
    pub fn with_state(reducer: Reducer<S, A>, initial: Rc<S>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                reducer: RefCell::new(reducer),
                dispatching: Cell::new(false),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Run the reducer, store the result and notify subscribers.
    ///
    /// # Errors
    ///
    /// [`StoreError::DispatchInReducer`] when called while a reducer runs.
    pub fn try_dispatch(&self, action: A) -> Result<A, StoreError> {
        self.inner.reduce(&action)?;
        Ok(action)
    }

    /// Swap the reducer. The current state is kept.
    pub fn replace_reducer(&self, reducer: impl Fn(&Rc<S>, &A) -> Rc<S> + 'static) {
        *self.inner.reducer.borrow_mut() = Rc::new(reducer);
        tracing::debug!("store reducer replaced");
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Coerce into the trait object consumers are mounted with.
    #[must_use]
    pub fn as_source(&self) -> Rc<dyn StateSource<S, A>> {
        Rc::new(self.clone())
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, A> Subscribable for Store<S, A> {
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.inner.listeners.subscribe(listener)
    }
}

impl<S: 'static, A: 'static> StateSource<S, A> for Store<S, A> {
    fn get_state(&self) -> Rc<S> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Unchecked dispatch; see the [`Store`] docs for how rejection surfaces.
    fn dispatcher(&self) -> Dispatch<A> {
        let weak: Weak<StoreInner<S, A>> = Rc::downgrade(&self.inner);
        Dispatch::new(move |action| {
            if let Some(inner) = weak.upgrade() {
                // Rejection is already logged; the action is handed back either way.
                let _ = inner.reduce(&action);
            }
            action
        })
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .field("listeners", &self.inner.listeners.len())
            .field("dispatching", &self.inner.dispatching.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Action {
        Add(i64),
        Noop,
    }

    #[derive(Debug, PartialEq)]
    struct Counter {
        count: i64,
    }

    fn reducer(state: &Rc<Counter>, action: &Action) -> Rc<Counter> {
        match action {
            Action::Add(n) => Rc::new(Counter {
                count: state.count + n,
            }),
            Action::Noop => Rc::clone(state),
        }
    }

    fn store() -> Store<Counter, Action> {
        Store::new(reducer, Counter { count: 0 })
    }

    #[test]
    fn dispatch_reduces_and_returns_action() {
        let store = store();
        assert_eq!(store.dispatch(Action::Add(2)), Action::Add(2));
        assert_eq!(store.try_dispatch(Action::Add(3)), Ok(Action::Add(3)));
        assert_eq!(store.get_state().count, 5);
    }

    #[test]
    fn noop_reducer_keeps_identity() {
        let store = store();
        let before = store.get_state();
        store.dispatch(Action::Noop);
        assert!(Rc::ptr_eq(&before, &store.get_state()));
    }

    #[test]
    fn listeners_see_new_state() {
        let store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let handle = {
            let seen = Rc::clone(&seen);
            let reader = store.clone();
            store.subscribe(Rc::new(move || seen.borrow_mut().push(reader.get_state().count)))
        };
        store.dispatch(Action::Add(1));
        store.dispatch(Action::Noop);
        handle.unsubscribe();
        store.dispatch(Action::Add(1));
        assert_eq!(*seen.borrow(), vec![1, 1]);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn dispatch_inside_reducer_is_rejected() {
        let slot: Rc<RefCell<Option<Dispatch<Action>>>> = Rc::new(RefCell::new(None));
        let inner_result = Rc::new(Cell::new(None));
        let store = {
            let slot = Rc::clone(&slot);
            let inner_result = Rc::clone(&inner_result);
            Store::new(
                move |state: &Rc<Counter>, action: &Action| {
                    if let (Action::Add(_), Some(dispatch)) = (action, slot.borrow().clone()) {
                        inner_result.set(Some(dispatch.dispatch(Action::Add(100))));
                    }
                    reducer(state, action)
                },
                Counter { count: 0 },
            )
        };
        *slot.borrow_mut() = Some(store.dispatcher());

        store.dispatch(Action::Add(1));
        assert_eq!(store.get_state().count, 1, "nested dispatch had no effect");
        assert_eq!(inner_result.get(), Some(Action::Add(100)));
        assert!(!store.inner.dispatching.get());
    }

    #[test]
    fn try_dispatch_reports_reentrancy() {
        let store = store();
        store.inner.dispatching.set(true);
        assert_eq!(store.try_dispatch(Action::Noop), Err(StoreError::DispatchInReducer));
    }

    #[test]
    fn replace_reducer_keeps_state() {
        let store = store();
        store.dispatch(Action::Add(4));
        store.replace_reducer(|state: &Rc<Counter>, _: &Action| {
            Rc::new(Counter {
                count: state.count * 10,
            })
        });
        store.dispatch(Action::Noop);
        assert_eq!(store.get_state().count, 40);
    }

    #[test]
    fn dispatcher_outliving_store_is_inert() {
        let dispatch = store().dispatcher();
        assert_eq!(dispatch.dispatch(Action::Add(1)), Action::Add(1));
    }
}
