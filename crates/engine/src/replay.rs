//! Startup replay and record application.
//!
//! One dispatch serves two callers: the loader replaying the append-only
//! log at startup, and the commit path applying a transaction's staged
//! records after they are durably journaled. Keeping them identical is what
//! makes the log's replay observationally equivalent to the committed
//! state.

use crate::Database;
use ember_core::types::{HashMark, SetMark, StrMark, ZSetMark};
use ember_core::{clock, DataType, Error, Record, Result};
use ember_durability::WalError;
use tracing::info;

/// Replay the whole log into the stores and expiry map.
///
/// Iterates segments `1..=N`, entries `0..` until the end-of-segment
/// signal. Records with an empty key are skipped defensively; any decode
/// failure or unknown type/mark aborts the load.
pub(crate) fn load(db: &Database) -> Result<()> {
    let Some(wal) = &db.wal else {
        return Ok(());
    };

    let mut applied = 0usize;
    for segment in 1..=wal.segments() {
        let mut entry = 0u64;
        loop {
            let bytes = match wal.read(segment, entry) {
                Ok(bytes) => bytes,
                Err(WalError::Eof) => break,
                Err(e) => return Err(e.into()),
            };

            let record = Record::decode(&bytes)?;
            if !record.key.is_empty() {
                apply_record(db, &record)?;
                applied += 1;
            }
            entry += 1;
        }
    }

    info!(records = applied, "replayed append-only log");
    Ok(())
}

/// Apply one record to the stores and expiry map.
pub(crate) fn apply_record(db: &Database, record: &Record) -> Result<()> {
    match record.data_type()? {
        DataType::String => apply_string(db, record),
        DataType::Hash => apply_hash(db, record),
        DataType::Set => apply_set(db, record),
        DataType::ZSet => apply_zset(db, record),
    }
}

/// Whether an expire record's deadline already lies in the past.
fn deadline_elapsed(record: &Record) -> bool {
    (record.timestamp as i64) < clock::unix_seconds()
}

fn key_str(record: &Record) -> String {
    String::from_utf8_lossy(&record.key).into_owned()
}

fn member_str(record: &Record) -> String {
    String::from_utf8_lossy(&record.member).into_owned()
}

fn value_str(record: &Record) -> String {
    String::from_utf8_lossy(&record.value).into_owned()
}

fn apply_string(db: &Database, record: &Record) -> Result<()> {
    let key = key_str(record);
    match StrMark::from_code(record.mark())? {
        // String values travel in the member field.
        StrMark::Set => db.strings.insert(&record.key, member_str(record)),
        StrMark::Rem => {
            db.strings.remove(&record.key);
            db.expiry.del(DataType::String, &key);
        }
        StrMark::Expire => {
            if deadline_elapsed(record) {
                db.strings.remove(&record.key);
                db.expiry.del(DataType::String, &key);
            } else {
                db.set_ttl(DataType::String, &key, record.timestamp as i64);
            }
        }
    }
    Ok(())
}

fn apply_hash(db: &Database, record: &Record) -> Result<()> {
    let key = key_str(record);
    match HashMark::from_code(record.mark())? {
        HashMark::HSet => {
            db.hashes.hset(&key, &member_str(record), value_str(record));
        }
        HashMark::HDel => {
            db.hashes.hdel(&key, &member_str(record));
        }
        HashMark::HClear => {
            db.hashes.clear(&key);
            db.expiry.del(DataType::Hash, &key);
        }
        HashMark::HExpire => {
            if deadline_elapsed(record) {
                db.hashes.clear(&key);
                db.expiry.del(DataType::Hash, &key);
            } else {
                db.set_ttl(DataType::Hash, &key, record.timestamp as i64);
            }
        }
    }
    Ok(())
}

fn apply_set(db: &Database, record: &Record) -> Result<()> {
    let key = key_str(record);
    match SetMark::from_code(record.mark())? {
        SetMark::SAdd => {
            db.sets.sadd(&key, &member_str(record));
        }
        SetMark::SRem => {
            db.sets.srem(&key, &member_str(record));
        }
        // Source in the key field, destination in the value field.
        SetMark::SMove => {
            db.sets.smove(&key, &value_str(record), &member_str(record));
        }
        SetMark::SClear => {
            db.sets.clear(&key);
            db.expiry.del(DataType::Set, &key);
        }
        SetMark::SExpire => {
            if deadline_elapsed(record) {
                db.sets.clear(&key);
                db.expiry.del(DataType::Set, &key);
            } else {
                db.set_ttl(DataType::Set, &key, record.timestamp as i64);
            }
        }
    }
    Ok(())
}

fn apply_zset(db: &Database, record: &Record) -> Result<()> {
    let key = key_str(record);
    match ZSetMark::from_code(record.mark())? {
        // The score travels as decimal text in the value field.
        ZSetMark::ZAdd => {
            let score: f64 = value_str(record)
                .parse()
                .map_err(|_| Error::InvalidEntry)?;
            db.zsets.zadd(&key, score, &member_str(record));
        }
        ZSetMark::ZRem => {
            db.zsets.zrem(&key, &member_str(record));
        }
        ZSetMark::ZClear => {
            db.zsets.clear(&key);
            db.expiry.del(DataType::ZSet, &key);
        }
        ZSetMark::ZExpire => {
            if deadline_elapsed(record) {
                db.zsets.clear(&key);
                db.expiry.del(DataType::ZSet, &key);
            } else {
                db.set_ttl(DataType::ZSet, &key, record.timestamp as i64);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Config;

    fn in_memory() -> Database {
        Database::open(Config::in_memory()).unwrap()
    }

    #[test]
    fn test_apply_string_set_and_rem() {
        let db = in_memory();
        let set = Record::new(b"k", b"v", DataType::String, StrMark::Set.code());
        apply_record(&db, &set).unwrap();
        assert_eq!(db.strings.get(b"k"), Some("v".to_string()));

        let rem = Record::new(b"k", b"", DataType::String, StrMark::Rem.code());
        apply_record(&db, &rem).unwrap();
        assert_eq!(db.strings.get(b"k"), None);
    }

    #[test]
    fn test_apply_expire_future_sets_ttl() {
        let db = in_memory();
        db.strings.insert(b"k", "v".to_string());

        let deadline = clock::unix_seconds() + 100;
        let expire = Record::with_deadline(b"k", b"", deadline, DataType::String, StrMark::Expire.code());
        apply_record(&db, &expire).unwrap();

        assert!(db.strings.contains(b"k"));
        assert_eq!(db.get_ttl(DataType::String, "k"), Some(deadline));
    }

    #[test]
    fn test_apply_expire_elapsed_deletes() {
        let db = in_memory();
        db.strings.insert(b"k", "v".to_string());

        let expire = Record::with_deadline(
            b"k",
            b"",
            clock::unix_seconds() - 100,
            DataType::String,
            StrMark::Expire.code(),
        );
        apply_record(&db, &expire).unwrap();

        assert!(!db.strings.contains(b"k"));
        assert_eq!(db.get_ttl(DataType::String, "k"), None);
    }

    #[test]
    fn test_apply_smove_is_atomic_move() {
        let db = in_memory();
        db.sets.sadd("src", "m");

        let mv = Record::with_value(b"src", b"m", b"dst", DataType::Set, SetMark::SMove.code());
        apply_record(&db, &mv).unwrap();

        assert!(!db.sets.sismember("src", "m"));
        assert!(db.sets.sismember("dst", "m"));
    }

    #[test]
    fn test_apply_zadd_parses_score() {
        let db = in_memory();
        let add = Record::with_value(b"z", b"m", b"2.5", DataType::ZSet, ZSetMark::ZAdd.code());
        apply_record(&db, &add).unwrap();
        assert_eq!(db.zsets.zscore("z", "m"), Some(2.5));
    }

    #[test]
    fn test_apply_zadd_bad_score_is_invalid_entry() {
        let db = in_memory();
        let add = Record::with_value(b"z", b"m", b"not-a-number", DataType::ZSet, ZSetMark::ZAdd.code());
        assert!(matches!(apply_record(&db, &add), Err(Error::InvalidEntry)));
    }

    #[test]
    fn test_apply_unknown_mark_is_invalid_entry() {
        let db = in_memory();
        let bogus = Record::new(b"k", b"", DataType::String, 9);
        assert!(matches!(apply_record(&db, &bogus), Err(Error::InvalidEntry)));
    }

    #[test]
    fn test_apply_hash_round() {
        let db = in_memory();
        let set = Record::with_value(b"h", b"f", b"v", DataType::Hash, HashMark::HSet.code());
        apply_record(&db, &set).unwrap();
        assert_eq!(db.hashes.hget("h", "f"), Some("v".to_string()));

        let del = Record::new(b"h", b"f", DataType::Hash, HashMark::HDel.code());
        apply_record(&db, &del).unwrap();
        assert!(!db.hashes.key_exists("h"));
    }
}
