#![forbid(unsafe_code)]

//! Connecting consumers to a state source.
//!
//! A [`Provider`] roots a consumer tree at one state source. [`connect`]
//! turns projection and merge arguments into a [`Connector`]; mounting it
//! under a [`ConnectContext`] yields a [`Consumer`] that keeps its derived
//! view current and cascades change notifications to consumers mounted
//! beneath it.

pub mod connect;
pub mod provider;

pub use connect::{Connector, Consumer, connect};
pub use provider::{ConnectContext, Provider};
