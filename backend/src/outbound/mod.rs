//! Outbound adapters implementing the driven ports.
//!
//! - [`elasticsearch`]: the production document store.
//! - [`memory`]: an in-process store for development and tests.
//! - [`deadline`]: a decorator bounding every store call by a timeout.

pub mod deadline;
pub mod elasticsearch;
pub mod memory;
