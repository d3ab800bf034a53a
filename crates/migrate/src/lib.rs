//! # tideway-migrate: Schema Migration Engine
//!
//! Orders, applies, tracks, and reverts an append-only catalog of schema
//! migrations against a live relational store. The engine guarantees
//! exactly-once application across repeated and concurrent invocations:
//! applied versions are recorded in a ledger table inside the target
//! database, and runs are serialized through a store-native named lock.
//!
//! The engine consumes a [`MigrationRegistry`] (the catalog), a [`Ledger`]
//! (the applied-version record), and a [`Store`] (the capability boundary
//! to the database). Migration content itself is opaque to the engine;
//! units are authored against the [`MigrationUnit`] trait, typically using
//! the [`guard`] helpers to stay safe under re-execution.

pub mod definitions;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod registry;
pub mod rollback;
pub mod runner;
pub mod store;
pub mod testing;
pub mod unit;

// Re-export core traits and types
pub use definitions::*;
pub use error::*;
pub use ledger::*;
pub use registry::*;
pub use rollback::*;
pub use runner::*;
pub use store::*;
pub use unit::*;
