//! Crew roster pipeline over a live record store.
//!
//! The store delivers complete collection snapshots on every change;
//! [`view::ViewState`] reruns the filter, sort, pagination and summary
//! stages over each one. Derived fields are computed at render time and
//! never persisted.

pub mod config;
pub mod derive;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod view;
