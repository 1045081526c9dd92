#![forbid(unsafe_code)]

//! Cascade public facade crate.
//!
//! Re-exports the stable surface of the workspace crates.
//!
//! ```
//! use cascade::prelude::*;
//!
//! let store = Store::new(|n: &std::rc::Rc<i64>, _: &()| std::rc::Rc::new(**n + 1), 0i64);
//! let provider = Provider::new(store.as_source());
//! let connector = connect(
//!     Projection::Function(ProjectionFn::unary(|n: &i64| props! { "n" => *n }.into())),
//!     Projection::Omitted,
//!     Merge::Omitted,
//!     ConnectOptions::new(),
//! )
//! .unwrap();
//! let consumer = connector.mount(&provider.context(), Props::new(), |_| {}).unwrap();
//! store.dispatch(());
//! assert_eq!(consumer.view().as_props().and_then(|p| p.get("n")), Some(&Value::Int(1)));
//! ```

pub use cascade_connect as connect;
pub use cascade_core as core;
#[cfg(feature = "store")]
pub use cascade_store as store;

pub use cascade_core::props;

pub mod prelude {
    pub use cascade_connect::{ConnectContext, Connector, Consumer, Provider, connect};
    pub use cascade_core::{
        ActionCreators, ConnectError, ConnectOptions, Diagnostics, Dispatch, Merge, Projected,
        Projection, ProjectionFn, Props, StateSource, Subscribable, Subscription, Value, Warning,
        props,
    };
    #[cfg(feature = "store")]
    pub use cascade_store::{Store, StoreError};
}
