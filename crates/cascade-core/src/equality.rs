#![forbid(unsafe_code)]

//! Default equality predicates for the selector pipeline.

use std::rc::Rc;

use crate::value::{Props, Value};

/// Identity comparison of two state snapshots.
#[must_use]
pub fn strict_equal<S: ?Sized>(a: &Rc<S>, b: &Rc<S>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Key-wise identity comparison of two mappings.
#[must_use]
pub fn shallow_equal_props(a: &Props, b: &Props) -> bool {
    if Props::ptr_eq(a, b) {
        return true;
    }
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .all(|(key, value)| b.get(key).is_some_and(|other| value.same(other)))
}

/// Shallow equality over arbitrary view values.
///
/// Identical values are equal; otherwise only two mappings can be equal,
/// and only when [`shallow_equal_props`] holds.
#[must_use]
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    if a.same(b) {
        return true;
    }
    match (a, b) {
        (Value::Map(a), Value::Map(b)) => shallow_equal_props(a, b),
        _ => false,
    }
}
