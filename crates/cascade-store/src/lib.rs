#![forbid(unsafe_code)]

//! Reference state source for Cascade.
//!
//! [`Store`] implements [`cascade_core::StateSource`]: a reducer, a current
//! snapshot and a listener registry notified synchronously after every
//! dispatch.

pub mod store;

pub use store::{Reducer, Store, StoreError};
