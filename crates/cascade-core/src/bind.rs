#![forbid(unsafe_code)]

//! Binding action creators to a dispatch capability.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::source::Dispatch;
use crate::value::{Callback, Props, Value};

/// Builds an action from call arguments.
pub type ActionCreator<A> = Rc<dyn Fn(&[Value]) -> A>;

/// Named action creators, the mapping form of a capability projection.
pub struct ActionCreators<A> {
    creators: BTreeMap<String, ActionCreator<A>>,
}

impl<A> ActionCreators<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            creators: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, creator: impl Fn(&[Value]) -> A + 'static) -> Self {
        self.creators.insert(name.into(), Rc::new(creator));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, creator: ActionCreator<A>) {
        self.creators.insert(name.into(), creator);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionCreator<A>)> {
        self.creators.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<A> Default for ActionCreators<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for ActionCreators<A> {
    fn clone(&self) -> Self {
        Self {
            creators: self.creators.clone(),
        }
    }
}

impl<A> fmt::Debug for ActionCreators<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.creators.keys()).finish()
    }
}

/// Wrap one creator so that calling it dispatches the created action.
///
/// The callback returns the dispatched action as [`Value::Opaque`].
pub fn bind_action_creator<A: 'static>(creator: &ActionCreator<A>, dispatch: &Dispatch<A>) -> Callback {
    let creator = Rc::clone(creator);
    let dispatch = dispatch.clone();
    Callback::new(move |args| Value::opaque(dispatch.dispatch(creator(args))))
}

/// Bind every creator, producing the mapping exposed to the consumer.
pub fn bind_action_creators<A: 'static>(creators: &ActionCreators<A>, dispatch: &Dispatch<A>) -> Props {
    creators
        .iter()
        .map(|(name, creator)| (name, bind_action_creator(creator, dispatch)))
        .collect()
}
