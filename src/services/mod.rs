//! Business logic on top of the store adapters

pub mod namespace;
