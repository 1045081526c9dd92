#![forbid(unsafe_code)]

//! The final combination step of a consumer's derived view.

use std::fmt;
use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::options::ValuesEqual;
use crate::value::{Props, Value};

/// `(state_props, dispatch_props, own_props) -> merged view`.
pub type MergeFn = Rc<dyn Fn(&Value, &Value, &Props) -> Value>;

/// A merge argument as supplied by the consumer.
#[derive(Clone, Default)]
pub enum Merge {
    #[default]
    Omitted,
    Function(MergeFn),
}

impl Merge {
    pub fn function(f: impl Fn(&Value, &Value, &Props) -> Value + 'static) -> Self {
        Self::Function(Rc::new(f))
    }
}

impl fmt::Debug for Merge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Omitted => f.write_str("Omitted"),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

pub const MERGE_PROPS: &str = "mergeProps";

/// Right-biased shallow union: own props, then state props, then dispatch
/// props. Partial views that are not mappings contribute nothing.
#[must_use]
pub fn default_merge(state_props: &Value, dispatch_props: &Value, own_props: &Props) -> Value {
    let mut merged = own_props.clone();
    for part in [state_props, dispatch_props] {
        if let Some(props) = part.as_props() {
            merged.extend_from(props);
        }
    }
    // Never hand back own props by identity; the result is a fresh view.
    if Props::ptr_eq(&merged, own_props) {
        merged = own_props.iter().map(|(k, v)| (k, v.clone())).collect();
    }
    Value::Map(merged)
}

/// Per-consumer wrapper around a [`Merge`].
pub enum MergeProxy {
    Default,
    Custom {
        merge: MergeFn,
        previous: Option<Value>,
        pure: bool,
        are_merged_props_equal: ValuesEqual,
        display_name: Rc<str>,
        verifier: Option<Diagnostics>,
    },
}

impl MergeProxy {
    #[must_use]
    pub fn new(
        merge: &Merge,
        pure: bool,
        are_merged_props_equal: ValuesEqual,
        display_name: Rc<str>,
        verifier: Option<Diagnostics>,
    ) -> Self {
        match merge {
            Merge::Omitted => Self::Default,
            Merge::Function(f) => Self::Custom {
                merge: Rc::clone(f),
                previous: None,
                pure,
                are_merged_props_equal,
                display_name,
                verifier,
            },
        }
    }

    pub fn call(&mut self, state_props: &Value, dispatch_props: &Value, own_props: &Props) -> Value {
        match self {
            Self::Default => default_merge(state_props, dispatch_props, own_props),
            Self::Custom {
                merge,
                previous,
                pure,
                are_merged_props_equal,
                display_name,
                verifier,
            } => {
                let next = merge(state_props, dispatch_props, own_props);
                if let Some(prev) = previous.as_ref() {
                    if *pure && are_merged_props_equal(&next, prev) {
                        return prev.clone();
                    }
                } else if let Some(diagnostics) = verifier {
                    diagnostics.verify_plain_object(&next, display_name, MERGE_PROPS);
                }
                *previous = Some(next.clone());
                next
            }
        }
    }
}

impl fmt::Debug for MergeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("MergeProxy::Default"),
            Self::Custom { previous, pure, .. } => f
                .debug_struct("MergeProxy::Custom")
                .field("has_run_once", &previous.is_some())
                .field("pure", pure)
                .finish_non_exhaustive(),
        }
    }
}
