//! Target resolution - ordered multi-strategy element location
//!
//! A [`TargetSpec`] describes what to find as a list of location strategies
//! tried strictly in declared order:
//! - by role and accessible name (semantic, most stable)
//! - by placeholder text
//! - by label adjacency
//! - by structural pattern (brittle, last resort)
//!
//! The first strategy with at least one match wins; later strategies are
//! never consulted once one succeeds.

pub mod errors;
pub mod resolver;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use types::*;
