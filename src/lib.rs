//! # EmberDB
//!
//! An embedded, in-memory multi-model key-value store with a durable
//! write-ahead log, Redis-like data types (string, hash, set, sorted set),
//! per-key TTL eviction, and serialized single-writer transactions.
//!
//! # Quick Start
//!
//! ```no_run
//! use emberdb::{Config, Database};
//!
//! fn main() -> emberdb::Result<()> {
//!     let db = Database::open(Config::default())?;
//!
//!     db.update(|tx| {
//!         tx.set("user:name", "Alice")?;
//!         tx.hset("user:1", "email", "alice@example.com")?;
//!         tx.zadd("leaderboard", 42.0, "alice")
//!     })?;
//!
//!     db.view(|tx| {
//!         assert_eq!(tx.get("user:name")?, "Alice");
//!         assert_eq!(tx.zrank("leaderboard", "alice")?, 0);
//!         Ok(())
//!     })?;
//!
//!     db.close()
//! }
//! ```
//!
//! # Model
//!
//! | Type | Operations |
//! |------|-----------|
//! | **String** | `set`, `setex`, `get`, `delete`, `expire`, `ttl`, `exists` |
//! | **Hash** | `hset`, `hget`, `hgetall`, `hdel`, `hexists`, `hlen`, `hkeys`, `hvals`, `hclear`, `hexpire`, `httl` |
//! | **Set** | `sadd`, `srem`, `spop`, `sismember`, `srandmember`, `smove`, `scard`, `smembers`, `sunion`, `sdiff`, `sclear`, `sexpire`, `sttl` |
//! | **Sorted set** | `zadd`, `zscore`, `zcard`, `zrank`, `zrevrank`, `zincrby`, `zrange`, `zrevrange`, `zget_by_rank`, `zscore_range`, `zrem`, `zclear`, `zexpire`, `zttl` |
//!
//! All operations run inside a transaction: [`Database::update`] for
//! read/write (committed atomically, journaled before visible),
//! [`Database::view`] for read-only. Setting `Config::path` to a directory
//! enables the write-ahead log; an empty path runs purely in memory.
//!
//! Internal crates (core, storage, durability, engine) are not stable API;
//! only the surface re-exported here is.

pub use ember_engine::{Config, DataType, Database, Error, Record, Result, Tx};
