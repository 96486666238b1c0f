//! Native token wrapping.

pub mod wrapped;

pub use wrapped::{IWrappedNative, WrappedToken};
