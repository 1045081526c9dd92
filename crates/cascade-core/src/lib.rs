#![forbid(unsafe_code)]

//! Core of Cascade: ordered change propagation and memoized view derivation.
//!
//! - [`ListenerRegistry`]: ordered callbacks with copy-on-write snapshots, so
//!   listeners may subscribe or unsubscribe while a notification is running.
//! - [`Subscription`]: one node of the propagation tree. A nested node
//!   registers through its parent, so a state change reaches it only after
//!   every ancestor has finished recomputing.
//! - [`ProjectionProxy`] and [`MergeProxy`]: normalized projection and merge
//!   arguments.
//! - [`SelectorFactory`]: per-consumer `compute(state, own_props)` with
//!   three-stage memoization.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous: `Rc<RefCell<..>>` for
//! shared mutable state, `Weak` for the parent link of a subscription node.
//! The state source is referenced through the [`StateSource`] trait and is
//! never owned by this crate.
//!
//! # Invariants
//!
//! 1. A notification pass invokes exactly the listeners registered when it
//!    began, in registration order.
//! 2. A node is subscribed iff it holds an unsubscribe handle iff its nested
//!    registry is live.
//! 3. With `pure` enabled, a call whose partial views are unchanged returns
//!    the previous final view by identity.

pub mod bind;
pub mod diagnostics;
pub mod equality;
pub mod error;
pub mod listeners;
pub mod merge;
pub mod options;
pub mod projection;
pub mod selector;
pub mod source;
pub mod subscription;
pub mod value;

pub use bind::{ActionCreator, ActionCreators, bind_action_creator, bind_action_creators};
pub use diagnostics::Diagnostics;
pub use equality::{shallow_equal, shallow_equal_props, strict_equal};
pub use error::{ConnectError, Result, Warning};
pub use listeners::ListenerRegistry;
pub use merge::{Merge, MergeFn, MergeProxy, default_merge};
pub use options::ConnectOptions;
pub use projection::{
    DispatchProjection, Projected, Projection, ProjectionFn, ProjectionProxy, StateProjection,
    check_state_projection,
};
pub use selector::SelectorFactory;
pub use source::{Dispatch, Listener, StateSource, Subscribable, Unsubscribe};
pub use subscription::{Subscription, WeakSubscription};
pub use value::{Callback, Props, Value};
