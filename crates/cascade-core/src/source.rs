#![forbid(unsafe_code)]

//! Boundary with the externally owned state source.
//!
//! The core never mutates state itself. It only needs three capabilities
//! from a source: registering a zero-argument change listener, reading the
//! current state and forwarding the dispatch capability to projections.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Zero-argument change callback.
pub type Listener = Rc<dyn Fn()>;

/// Handle returned by every `subscribe` in the crate.
///
/// Cloneable and idempotent: the wrapped teardown runs at most once no
/// matter how many clones call [`Unsubscribe::unsubscribe`]. Dropping the
/// handle does **not** unsubscribe.
#[derive(Clone)]
#[must_use = "dropping an Unsubscribe handle leaves the listener registered"]
pub struct Unsubscribe {
    teardown: Rc<Cell<Option<Box<dyn FnOnce()>>>>,
}

impl Unsubscribe {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Rc::new(Cell::new(Some(Box::new(teardown)))),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self {
            teardown: Rc::new(Cell::new(None)),
        }
    }

    /// Run the teardown if it has not run yet.
    pub fn unsubscribe(&self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Whether the teardown is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        let teardown = self.teardown.take();
        let pending = teardown.is_some();
        self.teardown.set(teardown);
        pending
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// The dispatch capability of a state source.
///
/// Projections receive it by reference; the core itself never invokes it.
pub struct Dispatch<A> {
    inner: Rc<dyn Fn(A) -> A>,
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dispatch({:p})", Rc::as_ptr(&self.inner).cast::<()>())
    }
}

impl<A> Dispatch<A> {
    pub fn new(f: impl Fn(A) -> A + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    /// Forward an action to the source, returning it.
    pub fn dispatch(&self, action: A) -> A {
        (self.inner)(action)
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

/// Anything that can announce "state changed" to a listener.
pub trait Subscribable {
    fn subscribe(&self, listener: Listener) -> Unsubscribe;
}

/// Full state source contract consumed by connected consumers.
pub trait StateSource<S, A>: Subscribable {
    /// Current state. Compared only with the configured equality predicate.
    fn get_state(&self) -> Rc<S>;

    /// The dispatch capability, stable for the lifetime of the source.
    ///
    /// [`Dispatch::dispatch`] always hands the action back, so a source that
    /// can refuse an action reports that out of band (logging) and should
    /// offer a checked entry point of its own.
    fn dispatcher(&self) -> Dispatch<A>;

    fn dispatch(&self, action: A) -> A {
        self.dispatcher().dispatch(action)
    }
}
