//! Warehouse loading of staged wind batches.
//!
//! The load protocol is the same on every backend:
//! 1. ensure the forecast table exists
//! 2. bind an external reference over one run's staged prefix
//! 3. insert from the external reference, computing the derived columns
//! 4. release the external reference
//!
//! [`Dialect`] renders the SQL for each step; a [`Warehouse`] executes it.

pub mod client;
pub mod duckdb;
pub mod error;
pub mod firebolt;
pub mod loader;
pub mod sql;

pub use client::Warehouse;
pub use self::duckdb::DuckDbWarehouse;
pub use error::{Result, WarehouseError};
pub use firebolt::{FireboltClient, FireboltConfig};
pub use loader::WarehouseLoader;
pub use sql::{quote_literal, Dialect, Identifier, StageCredentials};
