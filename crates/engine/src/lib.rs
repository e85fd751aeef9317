//! EmberDB engine: the database facade, transactions, startup replay, and
//! the background TTL sweeper pool.
//!
//! All client access goes through [`Database::view`] / [`Database::update`]
//! (or an explicit [`Database::begin`]). Mutations are journaled to the
//! append-only log before they become visible; startup replays the log to
//! rebuild the in-memory stores.

mod database;
mod replay;
mod sweeper;
mod tx_hashes;
mod tx_sets;
mod tx_strings;
mod tx_zsets;
mod txn;

pub use database::Database;
pub use txn::Tx;

pub use ember_core::{Config, DataType, Error, Record, Result};
