//! Identifier types shared by every crate in the workspace.

mod ids;

pub use ids::{AggregateId, CustomerId, SupplierId};
