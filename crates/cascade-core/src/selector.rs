#![forbid(unsafe_code)]

//! Per-consumer derivation of the final view.
//!
//! A [`SelectorFactory`] composes one state projection, one capability
//! projection and one merge step into `compute(state, own_props)`.
//!
//! # Invalidation axes (pure mode)
//!
//! | Stage           | Recomputed when                                             | Kept when                         |
//! |-----------------|-------------------------------------------------------------|-----------------------------------|
//! | state props     | state changed, or own props changed and the projection needs them | `are_state_props_equal` holds |
//! | dispatch props  | own props changed and the projection needs them             | result is `same` as before        |
//! | merged view     | a partial view changed identity, or own props changed       | never recomputed otherwise        |
//!
//! The first call computes every stage. In impure mode every call does.

use std::fmt;
use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::merge::{Merge, MergeProxy};
use crate::options::{ConnectOptions, PropsEqual, StatesEqual, ValuesEqual};
use crate::projection::{DispatchProjection, ProjectionProxy, StateProjection};
use crate::source::Dispatch;
use crate::value::{Props, Value};

struct Memo<S> {
    state: Rc<S>,
    own_props: Props,
    state_props: Value,
    dispatch_props: Value,
    merged: Value,
}

/// Memoizing view derivation owned by a single consumer.
pub struct SelectorFactory<S, A> {
    map_state: ProjectionProxy<S>,
    map_dispatch: ProjectionProxy<Dispatch<A>>,
    merge: MergeProxy,
    dispatch: Dispatch<A>,
    pure: bool,
    are_states_equal: StatesEqual<S>,
    are_own_props_equal: PropsEqual,
    are_state_props_equal: ValuesEqual,
    memo: Option<Memo<S>>,
}

impl<S: 'static, A: 'static> SelectorFactory<S, A> {
    /// Normalize the three arguments for one consumer.
    ///
    /// # Errors
    ///
    /// [`ConnectError::InvalidProjectionArgument`](crate::error::ConnectError)
    /// if `map_state` is not a recognized state projection.
    pub fn new(
        map_state: &StateProjection<S, A>,
        map_dispatch: &DispatchProjection<A>,
        merge: &Merge,
        dispatch: Dispatch<A>,
        options: &ConnectOptions<S>,
        diagnostics: &Diagnostics,
    ) -> Result<Self> {
        let display_name: Rc<str> = Rc::from(options.display_name());
        let verifier = options.verify_results.then(|| diagnostics.clone());
        let map_state =
            ProjectionProxy::for_state(map_state, Rc::clone(&display_name), verifier.clone())?;
        let map_dispatch = ProjectionProxy::for_dispatch(
            map_dispatch,
            &dispatch,
            Rc::clone(&display_name),
            verifier.clone(),
        );
        let merge = MergeProxy::new(
            merge,
            options.pure,
            Rc::clone(&options.are_merged_props_equal),
            display_name,
            verifier,
        );
        Ok(Self {
            map_state,
            map_dispatch,
            merge,
            dispatch,
            pure: options.pure,
            are_states_equal: Rc::clone(&options.are_states_equal),
            are_own_props_equal: Rc::clone(&options.are_own_props_equal),
            are_state_props_equal: Rc::clone(&options.are_state_props_equal),
            memo: None,
        })
    }

    #[must_use]
    pub fn has_computed_once(&self) -> bool {
        self.memo.is_some()
    }

    /// Derive the view for `state` and `own_props`.
    pub fn compute(&mut self, state: &Rc<S>, own_props: &Props) -> Value {
        match self.memo.take() {
            Some(memo) if self.pure => {
                let memo = self.handle_subsequent_call(memo, state, own_props);
                let merged = memo.merged.clone();
                self.memo = Some(memo);
                merged
            }
            _ => self.compute_all(state, own_props),
        }
    }

    fn compute_all(&mut self, state: &Rc<S>, own_props: &Props) -> Value {
        let state_props = self.map_state.call(state, own_props);
        let dispatch_props = self.map_dispatch.call(&self.dispatch, own_props);
        let merged = self.merge.call(&state_props, &dispatch_props, own_props);
        tracing::trace!(pure = self.pure, "selector computed all stages");
        self.memo = Some(Memo {
            state: Rc::clone(state),
            own_props: own_props.clone(),
            state_props,
            dispatch_props,
            merged: merged.clone(),
        });
        merged
    }

    fn handle_subsequent_call(&mut self, mut memo: Memo<S>, state: &Rc<S>, own_props: &Props) -> Memo<S> {
        let own_changed = !(self.are_own_props_equal)(own_props, &memo.own_props);
        let state_changed = !(self.are_states_equal)(state, &memo.state);
        memo.state = Rc::clone(state);
        memo.own_props = own_props.clone();

        let mut state_props_changed = false;
        if state_changed || (own_changed && self.map_state.depends_on_own_props()) {
            let next = self.map_state.call(state, own_props);
            if !(self.are_state_props_equal)(&next, &memo.state_props) {
                memo.state_props = next;
                state_props_changed = true;
            }
        }

        let mut dispatch_props_changed = false;
        if own_changed && self.map_dispatch.depends_on_own_props() {
            let next = self.map_dispatch.call(&self.dispatch, own_props);
            if !next.same(&memo.dispatch_props) {
                memo.dispatch_props = next;
                dispatch_props_changed = true;
            }
        }

        tracing::debug!(
            state_changed,
            own_changed,
            state_props_changed,
            dispatch_props_changed,
            "selector stages evaluated"
        );

        if state_props_changed || dispatch_props_changed || own_changed {
            memo.merged = self
                .merge
                .call(&memo.state_props, &memo.dispatch_props, own_props);
        }
        memo
    }
}

impl<S, A> fmt::Debug for SelectorFactory<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorFactory")
            .field("map_state", &self.map_state)
            .field("map_dispatch", &self.map_dispatch)
            .field("merge", &self.merge)
            .field("pure", &self.pure)
            .field("has_computed_once", &self.memo.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
