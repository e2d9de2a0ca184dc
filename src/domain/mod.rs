//! Domain model: aggregates, value objects, events and item reconciliation.
pub mod aggregates;
pub mod events;
pub mod reconcile;
pub mod value_objects;
