//! Core types for EmberDB: errors, configuration, data type tags, and the
//! log-record codec shared by the storage, durability, and engine crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use record::{Record, RECORD_HEADER_SIZE};
pub use types::{DataType, HashMark, SetMark, StrMark, ZSetMark};
