//! TTL behavior through the public transaction API.

use ember_core::{Config, Error};
use ember_engine::Database;
use std::time::Duration;

fn in_memory() -> Database {
    Database::open(Config::in_memory()).unwrap()
}

#[test]
fn test_ttl_counts_down_until_expiry() {
    let db = in_memory();
    db.update(|tx| tx.setex("k", "v", 2)).unwrap();

    db.view(|tx| {
        let ttl = tx.ttl("k")?;
        assert!(ttl >= 1 && ttl <= 2, "ttl was {}", ttl);
        Ok(())
    })
    .unwrap();

    std::thread::sleep(Duration::from_secs(3));

    db.view(|tx| {
        assert_eq!(tx.ttl("k")?, 0);
        assert!(matches!(tx.get("k"), Err(Error::ExpiredKey | Error::InvalidKey)));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_expired_reads_per_type() {
    let db = in_memory();
    db.update(|tx| {
        tx.hset("h", "f", "v")?;
        tx.sadd("s", "m")?;
        tx.zadd("z", 1.0, "m")
    })
    .unwrap();
    // Expire in a second transaction: existence checks read committed
    // state, and the keys only exist once the first commit applies.
    db.update(|tx| {
        tx.hexpire("h", 1)?;
        tx.sexpire("s", 1)?;
        tx.zexpire("z", 1)
    })
    .unwrap();

    std::thread::sleep(Duration::from_secs(2));

    db.view(|tx| {
        assert_eq!(tx.hget("h", "f")?, None);
        assert_eq!(tx.hlen("h")?, 0);
        assert!(!tx.sismember("s", "m")?);
        assert_eq!(tx.scard("s")?, 0);
        assert_eq!(tx.zscore("z", "m")?, None);
        assert_eq!(tx.zrank("z", "m")?, -1);
        assert_eq!(tx.httl("h")?, 0);
        assert_eq!(tx.sttl("s")?, 0);
        assert_eq!(tx.zttl("z")?, 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_overwrite_does_not_clear_ttl_until_expiry() {
    let db = in_memory();
    db.update(|tx| tx.setex("k", "v1", 100)).unwrap();
    db.update(|tx| tx.set("k", "v2")).unwrap();

    db.view(|tx| {
        assert_eq!(tx.get("k")?, "v2");
        assert!(tx.ttl("k")? > 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_background_sweep_with_engine_running() {
    // Engine-level smoke test for the sweeper pool; the precise "no reads
    // involved" property is covered by the sweeper unit tests.
    let config = Config {
        eviction_interval: 1,
        ..Config::in_memory()
    };
    let db = Database::open(config).unwrap();

    db.update(|tx| tx.setex("k", "v", 1)).unwrap();
    std::thread::sleep(Duration::from_secs(4));

    db.view(|tx| {
        assert!(matches!(tx.get("k"), Err(Error::InvalidKey)));
        Ok(())
    })
    .unwrap();
    db.close().unwrap();
}
