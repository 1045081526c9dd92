#![forbid(unsafe_code)]

//! Root of a consumer tree.

use std::fmt;
use std::rc::Rc;

use cascade_core::{Diagnostics, StateSource, WeakSubscription};

/// What a consumer needs from its position in the tree: the state source,
/// the nearest connected ancestor's subscription (if any) and the shared
/// diagnostics context.
pub struct ConnectContext<S, A> {
    source: Rc<dyn StateSource<S, A>>,
    parent: Option<WeakSubscription>,
    diagnostics: Diagnostics,
}

impl<S, A> ConnectContext<S, A> {
    pub(crate) fn new(
        source: Rc<dyn StateSource<S, A>>,
        parent: Option<WeakSubscription>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            source,
            parent,
            diagnostics,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Rc<dyn StateSource<S, A>> {
        &self.source
    }

    /// Subscription nested consumers register through. `None` at the root.
    #[must_use]
    pub fn parent_subscription(&self) -> Option<&WeakSubscription> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl<S, A> Clone for ConnectContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            parent: self.parent.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<S, A> fmt::Debug for ConnectContext<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectContext")
            .field("parent", &self.parent)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

/// Makes one state source available to every consumer mounted under it.
///
/// The source is fixed for the provider's lifetime. Offering a different one
/// through [`Provider::replace_store`] keeps the original and, when result
/// verification is on, warns once per [`Diagnostics`] context.
pub struct Provider<S, A> {
    context: ConnectContext<S, A>,
    verify_results: bool,
}

impl<S, A> Provider<S, A> {
    pub fn new(source: Rc<dyn StateSource<S, A>>) -> Self {
        Self::with_diagnostics(source, Diagnostics::new())
    }

    pub fn with_diagnostics(source: Rc<dyn StateSource<S, A>>, diagnostics: Diagnostics) -> Self {
        Self {
            context: ConnectContext::new(source, None, diagnostics),
            verify_results: cfg!(debug_assertions),
        }
    }

    #[must_use]
    pub fn verify_results(mut self, verify: bool) -> Self {
        self.verify_results = verify;
        self
    }

    /// Context for top-level consumers.
    #[must_use]
    pub fn context(&self) -> ConnectContext<S, A> {
        self.context.clone()
    }

    #[must_use]
    pub fn store(&self) -> &Rc<dyn StateSource<S, A>> {
        &self.context.source
    }

    /// Offer a new source. Returns whether it differed from the current one;
    /// the current source is kept either way.
    pub fn replace_store(&self, source: &Rc<dyn StateSource<S, A>>) -> bool {
        if std::ptr::addr_eq(Rc::as_ptr(source), Rc::as_ptr(&self.context.source)) {
            return false;
        }
        if self.verify_results {
            self.context.diagnostics.warn_duplicate_store();
        }
        true
    }
}

impl<S, A> fmt::Debug for Provider<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("context", &self.context)
            .field("verify_results", &self.verify_results)
            .finish()
    }
}
