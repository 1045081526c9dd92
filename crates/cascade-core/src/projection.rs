#![forbid(unsafe_code)]

//! Projection arguments and the proxy that normalizes them.
//!
//! A consumer supplies up to two projections: one from state and one from
//! the dispatch capability. Each is a tagged [`Projection`]:
//!
//! - `Omitted`: a constant result (empty mapping for state,
//!   `{dispatch}` for the capability side).
//! - `Constant(ActionCreators)`: the creators are bound to dispatch once and
//!   the bound mapping is returned on every call. Only valid on the
//!   capability side.
//! - `Function(ProjectionFn)`: a user function with a declared arity.
//!
//! # Extra-input dependency
//!
//! Whether a function depends on the consumer's own props is decided once,
//! lazily, on the first call: an explicit override wins, otherwise a
//! declared arity of exactly one means "independent" and anything else
//! means "dependent". Until then the proxy reports "dependent" so the probe
//! call receives own props.
//!
//! # Factories
//!
//! The first call may yield [`Projected::Factory`]. The produced function
//! then replaces the original for every later call and the dependency flag
//! is recomputed from it. The proxy's phase (`Probe` -> `Resolved`) records
//! which function is active.

use std::fmt;
use std::rc::Rc;

use crate::bind::{ActionCreators, bind_action_creators};
use crate::diagnostics::Diagnostics;
use crate::error::{ConnectError, Result};
use crate::source::Dispatch;
use crate::value::{Props, Value};

/// Result of invoking a projection function.
pub enum Projected<In> {
    /// A derived partial view (normally a mapping).
    Ready(Value),
    /// A per-consumer projection to use from now on.
    Factory(ProjectionFn<In>),
}

impl<In> From<Value> for Projected<In> {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

impl<In> From<Props> for Projected<In> {
    fn from(props: Props) -> Self {
        Self::Ready(Value::Map(props))
    }
}

impl<In> From<ProjectionFn<In>> for Projected<In> {
    fn from(f: ProjectionFn<In>) -> Self {
        Self::Factory(f)
    }
}

type ProjectionCall<In> = Rc<dyn Fn(&In, Option<&Props>) -> Projected<In>>;

/// A projection function together with its declared extra-input arity.
pub struct ProjectionFn<In> {
    call: ProjectionCall<In>,
    arity: usize,
    depends_on_own_props: Option<bool>,
}

impl<In: 'static> ProjectionFn<In> {
    /// A function of the input only (declared arity 1).
    pub fn unary(f: impl Fn(&In) -> Projected<In> + 'static) -> Self {
        Self {
            call: Rc::new(move |input, _| f(input)),
            arity: 1,
            depends_on_own_props: None,
        }
    }

    /// A function of the input and own props (declared arity 2).
    ///
    /// If an override marks it independent, it receives empty own props.
    pub fn binary(f: impl Fn(&In, &Props) -> Projected<In> + 'static) -> Self {
        Self {
            call: Rc::new(move |input, own| match own {
                Some(own) => f(input, own),
                None => f(input, &Props::new()),
            }),
            arity: 2,
            depends_on_own_props: None,
        }
    }

    /// A function that takes whatever it is given (declared arity 0).
    ///
    /// Receives `None` when it does not depend on own props.
    pub fn variadic(f: impl Fn(&In, Option<&Props>) -> Projected<In> + 'static) -> Self {
        Self {
            call: Rc::new(f),
            arity: 0,
            depends_on_own_props: None,
        }
    }
}

impl<In> ProjectionFn<In> {
    /// Explicitly declare whether own props are needed, bypassing arity.
    #[must_use]
    pub fn depends_on_own_props(mut self, depends: bool) -> Self {
        self.depends_on_own_props = Some(depends);
        self
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The override if set, otherwise `arity != 1`.
    #[must_use]
    pub fn resolve_depends_on_own_props(&self) -> bool {
        self.depends_on_own_props.unwrap_or(self.arity != 1)
    }

    fn invoke(&self, input: &In, own: Option<&Props>) -> Projected<In> {
        (self.call)(input, own)
    }
}

impl<In> Clone for ProjectionFn<In> {
    fn clone(&self) -> Self {
        Self {
            call: Rc::clone(&self.call),
            arity: self.arity,
            depends_on_own_props: self.depends_on_own_props,
        }
    }
}

impl<In> fmt::Debug for ProjectionFn<In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionFn")
            .field("arity", &self.arity)
            .field("depends_on_own_props", &self.depends_on_own_props)
            .finish()
    }
}

/// A projection argument as supplied by the consumer.
pub enum Projection<In, A> {
    Omitted,
    Constant(ActionCreators<A>),
    Function(ProjectionFn<In>),
}

impl<In, A> Projection<In, A> {
    /// Short form name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Omitted => "omitted",
            Self::Constant(_) => "mapping",
            Self::Function(_) => "function",
        }
    }

    #[must_use]
    pub fn is_omitted(&self) -> bool {
        matches!(self, Self::Omitted)
    }
}

impl<In, A> Default for Projection<In, A> {
    fn default() -> Self {
        Self::Omitted
    }
}

impl<In, A> Clone for Projection<In, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Omitted => Self::Omitted,
            Self::Constant(creators) => Self::Constant(creators.clone()),
            Self::Function(f) => Self::Function(f.clone()),
        }
    }
}

impl<In, A> fmt::Debug for Projection<In, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Omitted => f.write_str("Omitted"),
            Self::Constant(creators) => f.debug_tuple("Constant").field(creators).finish(),
            Self::Function(func) => f.debug_tuple("Function").field(func).finish(),
        }
    }
}

impl<In: 'static, A> From<ProjectionFn<In>> for Projection<In, A> {
    fn from(f: ProjectionFn<In>) -> Self {
        Self::Function(f)
    }
}

impl<In, A> From<ActionCreators<A>> for Projection<In, A> {
    fn from(creators: ActionCreators<A>) -> Self {
        Self::Constant(creators)
    }
}

pub type StateProjection<S, A> = Projection<S, A>;
pub type DispatchProjection<A> = Projection<Dispatch<A>, A>;

pub const MAP_STATE_TO_PROPS: &str = "mapStateToProps";
pub const MAP_DISPATCH_TO_PROPS: &str = "mapDispatchToProps";

/// Fail early if `projection` is not a recognized state projection.
pub fn check_state_projection<S, A>(projection: &StateProjection<S, A>, display_name: &str) -> Result<()> {
    match projection {
        Projection::Omitted | Projection::Function(_) => Ok(()),
        Projection::Constant(_) => Err(ConnectError::invalid_projection(
            projection.kind(),
            MAP_STATE_TO_PROPS,
            display_name,
        )),
    }
}

// ---------------------------------------------------------------------------
// Proxy
// ---------------------------------------------------------------------------

enum Phase<In> {
    Constant(Value),
    Probe(ProjectionFn<In>),
    Resolved(ProjectionFn<In>),
}

/// Uniform callable produced from a [`Projection`], one per consumer.
pub struct ProjectionProxy<In> {
    phase: Phase<In>,
    depends_on_own_props: bool,
    method: &'static str,
    display_name: Rc<str>,
    verifier: Option<Diagnostics>,
}

impl<S: 'static> ProjectionProxy<S> {
    /// Normalize a state projection.
    pub fn for_state<A>(
        projection: &StateProjection<S, A>,
        display_name: Rc<str>,
        verifier: Option<Diagnostics>,
    ) -> Result<Self> {
        check_state_projection(projection, &display_name)?;
        let phase = match projection {
            Projection::Function(f) => Phase::Probe(f.clone()),
            _ => Phase::Constant(Value::Map(Props::new())),
        };
        Ok(Self::with_phase(phase, MAP_STATE_TO_PROPS, display_name, verifier))
    }
}

impl<A: 'static> ProjectionProxy<Dispatch<A>> {
    /// Normalize a capability projection. Every form is recognized.
    pub fn for_dispatch(
        projection: &DispatchProjection<A>,
        dispatch: &Dispatch<A>,
        display_name: Rc<str>,
        verifier: Option<Diagnostics>,
    ) -> Self {
        let phase = match projection {
            Projection::Omitted => Phase::Constant(Value::Map(
                Props::new().with("dispatch", Value::opaque(dispatch.clone())),
            )),
            Projection::Constant(creators) => {
                Phase::Constant(Value::Map(bind_action_creators(creators, dispatch)))
            }
            Projection::Function(f) => Phase::Probe(f.clone()),
        };
        Self::with_phase(phase, MAP_DISPATCH_TO_PROPS, display_name, verifier)
    }
}

impl<In: 'static> ProjectionProxy<In> {
    fn with_phase(
        phase: Phase<In>,
        method: &'static str,
        display_name: Rc<str>,
        verifier: Option<Diagnostics>,
    ) -> Self {
        let depends_on_own_props = !matches!(phase, Phase::Constant(_));
        Self {
            phase,
            depends_on_own_props,
            method,
            display_name,
            verifier,
        }
    }

    /// Whether the active projection needs own props.
    #[must_use]
    pub fn depends_on_own_props(&self) -> bool {
        self.depends_on_own_props
    }

    /// Whether the first (probe) call has happened.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self.phase, Phase::Probe(_))
    }

    pub fn call(&mut self, input: &In, own_props: &Props) -> Value {
        match &self.phase {
            Phase::Constant(value) => value.clone(),
            Phase::Resolved(f) => {
                let own = self.depends_on_own_props.then_some(own_props);
                match f.invoke(input, own) {
                    Projected::Ready(value) => value,
                    Projected::Factory(g) => Value::opaque(g),
                }
            }
            Phase::Probe(f) => {
                let f = f.clone();
                self.detect_factory_and_verify(f, input, own_props)
            }
        }
    }

    fn detect_factory_and_verify(&mut self, f: ProjectionFn<In>, input: &In, own_props: &Props) -> Value {
        self.depends_on_own_props = f.resolve_depends_on_own_props();
        let own = self.depends_on_own_props.then_some(own_props);
        let value = match f.invoke(input, own) {
            Projected::Ready(value) => {
                self.phase = Phase::Resolved(f);
                value
            }
            Projected::Factory(g) => {
                self.depends_on_own_props = g.resolve_depends_on_own_props();
                let own = self.depends_on_own_props.then_some(own_props);
                let value = match g.invoke(input, own) {
                    Projected::Ready(value) => value,
                    Projected::Factory(nested) => Value::opaque(nested),
                };
                tracing::debug!(
                    method = self.method,
                    depends_on_own_props = self.depends_on_own_props,
                    "projection factory resolved"
                );
                self.phase = Phase::Resolved(g);
                value
            }
        };
        if let Some(diagnostics) = &self.verifier {
            diagnostics.verify_plain_object(&value, &self.display_name, self.method);
        }
        value
    }
}

impl<In> fmt::Debug for ProjectionProxy<In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Constant(_) => "constant",
            Phase::Probe(_) => "probe",
            Phase::Resolved(_) => "resolved",
        };
        f.debug_struct("ProjectionProxy")
            .field("method", &self.method)
            .field("phase", &phase)
            .field("depends_on_own_props", &self.depends_on_own_props)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
