//! Warehouse access
//!
//! Connection descriptors arrive as JDBC-style URLs on each planning request.
//! The client is only used for optional row-count sampling; planning never
//! depends on the warehouse being reachable.

mod client;
mod descriptor;
mod error;

pub use client::{TableStats, WarehouseClient};
pub use descriptor::ConnectionDescriptor;
pub use error::WarehouseError;
