#![forbid(unsafe_code)]

//! Explicit warning context.
//!
//! Non-fatal warnings are routed through a [`Diagnostics`] value instead of
//! module-level flags. The context remembers which once-only warnings have
//! already fired and keeps a record of everything emitted, which tests read
//! back and clear with [`Diagnostics::reset`].
//!
//! Every emitted warning is also logged at `WARN` level via `tracing`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::Warning;
use crate::value::Value;

#[derive(Default)]
struct DiagnosticsInner {
    warned_duplicate_store: Cell<bool>,
    records: RefCell<Vec<Warning>>,
}

/// Shared warning sink. Cloning shares the same once-flags and records.
#[derive(Clone, Default)]
pub struct Diagnostics {
    inner: Rc<DiagnosticsInner>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn if `value` is not a plain mapping. Returns whether it was one.
    pub fn verify_plain_object(&self, value: &Value, display_name: &str, method: &'static str) -> bool {
        if value.is_plain_mapping() {
            return true;
        }
        self.emit(Warning::NonPlainResult {
            method,
            display_name: display_name.to_owned(),
            received: value.kind(),
        });
        false
    }

    /// Emit the duplicate-store warning unless this context already did.
    /// Returns whether it was emitted now.
    pub fn warn_duplicate_store(&self) -> bool {
        if self.inner.warned_duplicate_store.replace(true) {
            return false;
        }
        self.emit(Warning::DuplicateStore);
        true
    }

    fn emit(&self, warning: Warning) {
        tracing::warn!(%warning, "cascade diagnostic");
        self.inner.records.borrow_mut().push(warning);
    }

    /// Warnings emitted since creation or the last reset.
    #[must_use]
    pub fn records(&self) -> Vec<Warning> {
        self.inner.records.borrow().clone()
    }

    /// Forget emitted warnings and re-arm once-only warnings.
    pub fn reset(&self) {
        self.inner.warned_duplicate_store.set(false);
        self.inner.records.borrow_mut().clear();
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("records", &self.inner.records.borrow().len())
            .field(
                "warned_duplicate_store",
                &self.inner.warned_duplicate_store.get(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn plain_mapping_passes_silently() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.verify_plain_object(&props! { "a" => 1 }.into(), "Connect(X)", "mapStateToProps"));
        assert!(diagnostics.records().is_empty());
    }

    #[test]
    fn non_plain_result_is_recorded() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.verify_plain_object(&Value::Int(3), "Connect(X)", "mapStateToProps"));
        assert_eq!(
            diagnostics.records(),
            vec![Warning::NonPlainResult {
                method: "mapStateToProps",
                display_name: "Connect(X)".into(),
                received: "int",
            }]
        );
    }

    #[test]
    fn duplicate_store_warns_once_until_reset() {
        let diagnostics = Diagnostics::new();
        let shared = diagnostics.clone();
        assert!(diagnostics.warn_duplicate_store());
        assert!(!shared.warn_duplicate_store());
        assert_eq!(diagnostics.records().len(), 1);

        diagnostics.reset();
        assert!(diagnostics.records().is_empty());
        assert!(shared.warn_duplicate_store());
    }

    #[test]
    fn independent_contexts_do_not_share_flags() {
        let a = Diagnostics::new();
        let b = Diagnostics::new();
        assert!(a.warn_duplicate_store());
        assert!(b.warn_duplicate_store());
    }
}
