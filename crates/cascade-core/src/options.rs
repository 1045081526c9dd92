#![forbid(unsafe_code)]

//! Per-consumer configuration bundle.
//!
//! # Defaults
//!
//! | Field                    | Default                         |
//! |--------------------------|---------------------------------|
//! | `pure`                   | `true`                          |
//! | `are_states_equal`       | [`strict_equal`] (identity)     |
//! | `are_own_props_equal`    | [`shallow_equal_props`]         |
//! | `are_state_props_equal`  | [`shallow_equal`]               |
//! | `are_merged_props_equal` | [`shallow_equal`]               |
//! | `component_name`         | `"Component"`                   |
//! | `verify_results`         | `cfg!(debug_assertions)`        |
//!
//! `verify_results` is the non-production switch: when off, first results
//! are not checked for being plain mappings and the provider does not warn
//! about a replaced store.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::equality::{shallow_equal, shallow_equal_props, strict_equal};
use crate::value::{Props, Value};

pub type StatesEqual<S> = Rc<dyn Fn(&Rc<S>, &Rc<S>) -> bool>;
pub type PropsEqual = Rc<dyn Fn(&Props, &Props) -> bool>;
pub type ValuesEqual = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Options recognized by `connect`.
pub struct ConnectOptions<S> {
    pub pure: bool,
    pub are_states_equal: StatesEqual<S>,
    pub are_own_props_equal: PropsEqual,
    pub are_state_props_equal: ValuesEqual,
    pub are_merged_props_equal: ValuesEqual,
    /// Name of the wrapped component, used in diagnostics.
    pub component_name: Rc<str>,
    pub verify_results: bool,
    /// Free-form extension bag, passed through unmodified.
    pub extra: BTreeMap<String, Value>,
}

impl<S: 'static> ConnectOptions<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pure: true,
            are_states_equal: Rc::new(strict_equal::<S>),
            are_own_props_equal: Rc::new(shallow_equal_props),
            are_state_props_equal: Rc::new(shallow_equal),
            are_merged_props_equal: Rc::new(shallow_equal),
            component_name: Rc::from("Component"),
            verify_results: cfg!(debug_assertions),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn pure(mut self, pure: bool) -> Self {
        self.pure = pure;
        self
    }

    #[must_use]
    pub fn with_states_equal(mut self, f: impl Fn(&Rc<S>, &Rc<S>) -> bool + 'static) -> Self {
        self.are_states_equal = Rc::new(f);
        self
    }

    #[must_use]
    pub fn with_own_props_equal(mut self, f: impl Fn(&Props, &Props) -> bool + 'static) -> Self {
        self.are_own_props_equal = Rc::new(f);
        self
    }

    #[must_use]
    pub fn with_state_props_equal(mut self, f: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.are_state_props_equal = Rc::new(f);
        self
    }

    #[must_use]
    pub fn with_merged_props_equal(mut self, f: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.are_merged_props_equal = Rc::new(f);
        self
    }

    #[must_use]
    pub fn component_name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.component_name = name.into();
        self
    }

    #[must_use]
    pub fn verify_results(mut self, verify: bool) -> Self {
        self.verify_results = verify;
        self
    }

    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl<S> ConnectOptions<S> {
    /// `Connect(<component>)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("Connect({})", self.component_name)
    }
}

impl<S: 'static> Default for ConnectOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for ConnectOptions<S> {
    fn clone(&self) -> Self {
        Self {
            pure: self.pure,
            are_states_equal: Rc::clone(&self.are_states_equal),
            are_own_props_equal: Rc::clone(&self.are_own_props_equal),
            are_state_props_equal: Rc::clone(&self.are_state_props_equal),
            are_merged_props_equal: Rc::clone(&self.are_merged_props_equal),
            component_name: Rc::clone(&self.component_name),
            verify_results: self.verify_results,
            extra: self.extra.clone(),
        }
    }
}

impl<S> fmt::Debug for ConnectOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("pure", &self.pure)
            .field("component_name", &self.component_name)
            .field("verify_results", &self.verify_results)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}
