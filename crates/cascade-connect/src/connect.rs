#![forbid(unsafe_code)]

//! `connect` and the consumer lifecycle.
//!
//! [`connect`] validates a consumer's projection arguments once and yields a
//! [`Connector`]. Each [`Connector::mount`] creates a [`Consumer`] owning
//! exactly one [`Subscription`] and one [`SelectorFactory`].
//!
//! # Change handling
//!
//! When the state source (or the parent consumer) announces a change, the
//! consumer:
//!
//! 1. recomputes its view through the selector,
//! 2. calls its `on_update` hook if the view identity changed,
//! 3. notifies its own nested consumers.
//!
//! A consumer whose state projection is omitted does not subscribe at all;
//! its nested consumers attach to the nearest subscribed ancestor instead.
//!
//! A projection may dispatch while the consumer is deriving its view. The
//! change notification that arrives mid-derivation is deferred: the running
//! derivation repeats against the latest state before it returns, then
//! notifies nested consumers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use cascade_core::{
    ConnectOptions, Diagnostics, DispatchProjection, Listener, Merge, Props, Result, SelectorFactory,
    StateProjection, StateSource, Subscribable, Subscription, Unsubscribe, Value,
    WeakSubscription, check_state_projection,
};

use crate::provider::ConnectContext;

/// Validate the arguments of a consumer and prepare it for mounting.
///
/// # Errors
///
/// [`ConnectError::InvalidProjectionArgument`](cascade_core::ConnectError)
/// when `map_state` is not a recognized state projection.
pub fn connect<S: 'static, A: 'static>(
    map_state: StateProjection<S, A>,
    map_dispatch: DispatchProjection<A>,
    merge: Merge,
    options: ConnectOptions<S>,
) -> Result<Connector<S, A>> {
    check_state_projection(&map_state, &options.display_name())?;
    let should_handle_state_changes = !map_state.is_omitted();
    tracing::debug!(
        display_name = %options.display_name(),
        should_handle_state_changes,
        pure = options.pure,
        "connector created"
    );
    Ok(Connector {
        parts: Rc::new(ConnectorParts {
            map_state,
            map_dispatch,
            merge,
            options,
            should_handle_state_changes,
        }),
    })
}

struct ConnectorParts<S, A> {
    map_state: StateProjection<S, A>,
    map_dispatch: DispatchProjection<A>,
    merge: Merge,
    options: ConnectOptions<S>,
    should_handle_state_changes: bool,
}

/// A validated consumer description, mountable any number of times.
pub struct Connector<S, A> {
    parts: Rc<ConnectorParts<S, A>>,
}

impl<S, A> Clone for Connector<S, A> {
    fn clone(&self) -> Self {
        Self {
            parts: Rc::clone(&self.parts),
        }
    }
}

impl<S: 'static, A: 'static> Connector<S, A> {
    #[must_use]
    pub fn display_name(&self) -> String {
        self.parts.options.display_name()
    }

    #[must_use]
    pub fn should_handle_state_changes(&self) -> bool {
        self.parts.should_handle_state_changes
    }

    #[must_use]
    pub fn options(&self) -> &ConnectOptions<S> {
        &self.parts.options
    }

    /// Create a consumer at the position described by `ctx`.
    ///
    /// The initial view is computed immediately and is available through
    /// [`Consumer::view`]; `on_update` fires only for later changes.
    ///
    /// # Errors
    ///
    /// Propagates projection recognition failures from the selector.
    pub fn mount(
        &self,
        ctx: &ConnectContext<S, A>,
        own_props: Props,
        on_update: impl Fn(&Value) + 'static,
    ) -> Result<Consumer<S, A>> {
        let parts = &self.parts;
        let source = Rc::clone(ctx.source());
        let display_name: Rc<str> = Rc::from(parts.options.display_name());
        let mut selector = SelectorFactory::new(
            &parts.map_state,
            &parts.map_dispatch,
            &parts.merge,
            source.dispatcher(),
            &parts.options,
            ctx.diagnostics(),
        )?;
        let view = selector.compute(&source.get_state(), &own_props);
        let inherited_parent = ctx.parent_subscription().cloned();
        let handles_changes = parts.should_handle_state_changes;

        let inner = Rc::new_cyclic(|weak: &Weak<ConsumerInner<S, A>>| {
            let subscription = handles_changes.then(|| {
                let weak = weak.clone();
                let on_state_change: Listener = Rc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_state_change();
                    }
                });
                let link: Rc<dyn Subscribable> = Rc::new(SourceLink(Rc::clone(&source)));
                Subscription::new(link, inherited_parent.clone(), on_state_change)
            });
            ConsumerInner {
                source: Rc::clone(&source),
                diagnostics: ctx.diagnostics().clone(),
                selector: RefCell::new(selector),
                own_props: RefCell::new(own_props),
                view: RefCell::new(view),
                refresh_pending: Cell::new(false),
                nested_pending: Cell::new(false),
                subscription,
                inherited_parent,
                on_update: Box::new(on_update),
                display_name,
            }
        });

        if let Some(subscription) = &inner.subscription {
            subscription.try_subscribe();
            // State may have moved between the first compute and subscribing.
            inner.refresh();
        }
        tracing::debug!(
            display_name = %inner.display_name,
            subscribed = inner.is_subscribed(),
            "consumer mounted"
        );
        Ok(Consumer { inner })
    }
}

impl<S, A> fmt::Debug for Connector<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("map_state", &self.parts.map_state)
            .field("map_dispatch", &self.parts.map_dispatch)
            .field("merge", &self.parts.merge)
            .field("options", &self.parts.options)
            .field(
                "should_handle_state_changes",
                &self.parts.should_handle_state_changes,
            )
            .finish()
    }
}

/// Adapts a full state source to the subscription-only contract.
struct SourceLink<S, A>(Rc<dyn StateSource<S, A>>);

impl<S, A> Subscribable for SourceLink<S, A> {
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.0.subscribe(listener)
    }
}

struct ConsumerInner<S, A> {
    source: Rc<dyn StateSource<S, A>>,
    diagnostics: Diagnostics,
    selector: RefCell<SelectorFactory<S, A>>,
    own_props: RefCell<Props>,
    view: RefCell<Value>,
    refresh_pending: Cell<bool>,
    nested_pending: Cell<bool>,
    subscription: Option<Subscription>,
    inherited_parent: Option<WeakSubscription>,
    on_update: Box<dyn Fn(&Value)>,
    display_name: Rc<str>,
}

impl<S: 'static, A: 'static> ConsumerInner<S, A> {
    fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_subscribed)
    }

    fn on_state_change(&self) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        if !subscription.is_subscribed() {
            tracing::trace!(display_name = %self.display_name, "stale notification ignored");
            return;
        }
        if self.refresh().is_none() {
            self.nested_pending.set(true);
            return;
        }
        subscription.notify_nested_subs();
    }

    /// Recompute the view; fire `on_update` if its identity changed.
    ///
    /// Returns `None` when a derivation is already running on this consumer.
    /// That derivation picks up the latest state before it finishes.
    fn refresh(&self) -> Option<bool> {
        let next = {
            let Ok(mut selector) = self.selector.try_borrow_mut() else {
                self.refresh_pending.set(true);
                tracing::trace!(display_name = %self.display_name, "re-entrant refresh deferred");
                return None;
            };
            loop {
                self.refresh_pending.set(false);
                let state = self.source.get_state();
                let own_props = self.own_props.borrow().clone();
                let next = selector.compute(&state, &own_props);
                if !self.refresh_pending.get() {
                    break next;
                }
            }
        };
        let changed = !next.same(&self.view.borrow());
        if changed {
            *self.view.borrow_mut() = next.clone();
            (self.on_update)(&next);
        }
        tracing::trace!(display_name = %self.display_name, changed, "consumer refreshed");
        if self.nested_pending.replace(false) {
            if let Some(subscription) = &self.subscription {
                subscription.notify_nested_subs();
            }
        }
        Some(changed)
    }
}

impl<S, A> Drop for ConsumerInner<S, A> {
    fn drop(&mut self) {
        if let Some(subscription) = &self.subscription {
            subscription.try_unsubscribe();
        }
    }
}

/// A mounted consumer: one subscription node plus one selector.
///
/// Dropping it unsubscribes.
pub struct Consumer<S, A> {
    inner: Rc<ConsumerInner<S, A>>,
}

impl<S: 'static, A: 'static> Consumer<S, A> {
    /// The most recently derived view.
    #[must_use]
    pub fn view(&self) -> Value {
        self.inner.view.borrow().clone()
    }

    #[must_use]
    pub fn own_props(&self) -> Props {
        self.inner.own_props.borrow().clone()
    }

    /// Replace the own props and rederive. Returns whether the view changed.
    pub fn update_own_props(&self, own_props: Props) -> bool {
        *self.inner.own_props.borrow_mut() = own_props;
        self.inner.refresh().unwrap_or(false)
    }

    /// Context for consumers mounted below this one.
    #[must_use]
    pub fn context(&self) -> ConnectContext<S, A> {
        let parent = match &self.inner.subscription {
            Some(subscription) => Some(subscription.downgrade()),
            None => self.inner.inherited_parent.clone(),
        };
        ConnectContext::new(
            Rc::clone(&self.inner.source),
            parent,
            self.inner.diagnostics.clone(),
        )
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.is_subscribed()
    }

    /// This consumer's subscription node, if it handles state changes.
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        self.inner.subscription.as_ref()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    /// Stop receiving notifications. Dropping the consumer does the same.
    pub fn unmount(&self) {
        if let Some(subscription) = &self.inner.subscription {
            subscription.try_unsubscribe();
            tracing::debug!(display_name = %self.inner.display_name, "consumer unmounted");
        }
    }
}

impl<S, A> fmt::Debug for Consumer<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("display_name", &self.inner.display_name)
            .field("view", &self.inner.view.borrow())
            .field("subscription", &self.inner.subscription)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
