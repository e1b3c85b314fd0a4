//! Transaction behaviour of the bucket DB on a sled store.

use tempfile::TempDir;
use walletdb_db::{default_registry, update, view, BucketDb, Db, DbError, Entry};
use walletdb_storage::{
    KvIterator, Range, SledConfig, SledStorage, Storage, StorageError, SLED_DB_TYPE,
};

fn setup() -> BucketDb {
    BucketDb::new(Box::new(SledStorage::open_temporary().unwrap()))
}

fn entry(key: &[u8], value: &[u8]) -> Entry {
    Entry {
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

#[test]
fn test_failed_update_leaves_no_trace() {
    let db = setup();

    let result: Result<(), DbError> = update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        wallet.put(b"k", b"v")?;
        wallet.new_bucket("account")?;
        Err(DbError::IllegalKey)
    });
    assert!(matches!(result, Err(DbError::IllegalKey)));

    view(&db, |tx| {
        assert!(tx.top_level_bucket("wallet")?.is_none());
        assert!(tx.bucket_names()?.is_empty());
        Ok::<_, DbError>(())
    })
    .unwrap();
}

#[test]
fn test_update_commits() {
    let db = setup();

    update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        wallet.put(b"k", b"v")
    })
    .unwrap();

    let value = view(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        wallet.get(b"k")
    })
    .unwrap();
    assert_eq!(value, Some(b"v".to_vec()));
}

#[test]
fn test_uncommitted_writes_are_invisible() {
    let db = setup();
    let tx = db.begin_tx().unwrap();
    tx.create_top_level_bucket("pending").unwrap();

    let reader = db.begin_read_tx().unwrap();
    assert!(reader.top_level_bucket("pending").unwrap().is_none());
    reader.rollback().unwrap();

    tx.rollback().unwrap();
    let reader = db.begin_read_tx().unwrap();
    assert!(reader.top_level_bucket("pending").unwrap().is_none());
}

#[test]
fn test_read_tx_sees_consistent_snapshot() {
    let db = setup();
    update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        wallet.put(b"a", b"old")?;
        wallet.put(b"b", b"old")
    })
    .unwrap();

    let reader = db.begin_read_tx().unwrap();
    let wallet = reader.top_level_bucket("wallet").unwrap().unwrap();
    assert_eq!(wallet.get(b"a").unwrap(), Some(b"old".to_vec()));

    std::thread::scope(|s| {
        let writer = s.spawn(|| {
            update(&db, |tx| {
                let wallet = tx.top_level_bucket("wallet")?.unwrap();
                wallet.put(b"a", b"new")?;
                wallet.put(b"b", b"new")
            })
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(wallet.get(b"b").unwrap(), Some(b"old".to_vec()));
        assert_eq!(wallet.get(b"a").unwrap(), Some(b"old".to_vec()));
        drop(wallet);
        reader.rollback().unwrap();

        writer.join().unwrap().unwrap();
    });

    let values = view(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        Ok::<_, DbError>((wallet.get(b"a")?, wallet.get(b"b")?))
    })
    .unwrap();
    assert_eq!(values, (Some(b"new".to_vec()), Some(b"new".to_vec())));
}

#[test]
fn test_nested_delete_cascades() {
    let db = setup();

    let deep_meta = update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        let account = wallet.new_bucket("account")?;
        let branch = account.new_bucket("branch")?;
        account.put(b"a", b"1")?;
        branch.put(b"b", b"2")?;
        Ok::<_, DbError>(branch.meta().clone())
    })
    .unwrap();

    update(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        wallet.delete_bucket("account")
    })
    .unwrap();

    view(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        assert!(wallet.bucket("account")?.is_none());
        assert!(wallet.bucket_names()?.is_empty());
        assert!(tx.fetch_bucket(&deep_meta)?.is_none());
        Ok::<_, DbError>(())
    })
    .unwrap();

    // Only the wallet marker and the id allocator remain.
    let mut iter = db.storage().new_iterator(&Range::all());
    let mut count = 0;
    while iter.next() {
        count += 1;
    }
    assert_eq!(count, 2);
}

#[test]
fn test_recreated_bucket_is_empty() {
    let db = setup();
    update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        wallet.new_bucket("account")?.put(b"k", b"v")?;
        wallet.delete_bucket("account")?;
        let fresh = wallet.new_bucket("account")?;
        assert_eq!(fresh.get(b"k")?, None);
        Ok::<_, DbError>(())
    })
    .unwrap();
}

#[test]
fn test_bucket_errors() {
    let db = setup();
    let tx = db.begin_tx().unwrap();
    let wallet = tx.create_top_level_bucket("wallet").unwrap();

    assert!(wallet.bucket("missing").unwrap().is_none());
    assert!(matches!(
        tx.create_top_level_bucket("wallet"),
        Err(DbError::BucketExists(_))
    ));
    wallet.new_bucket("child").unwrap();
    assert!(matches!(wallet.new_bucket("child"), Err(DbError::BucketExists(p)) if p == "wallet/child"));
    assert!(matches!(
        wallet.delete_bucket("missing"),
        Err(DbError::BucketNotFound(_))
    ));
    assert!(matches!(
        tx.delete_top_level_bucket("missing"),
        Err(DbError::BucketNotFound(_))
    ));
    assert!(matches!(wallet.new_bucket(""), Err(DbError::InvalidBucketName(_))));
    assert!(matches!(wallet.put(b"", b"v"), Err(DbError::IllegalKey)));
    assert!(matches!(wallet.delete(b""), Err(DbError::IllegalKey)));
}

#[test]
fn test_read_tx_rejects_writes() {
    let db = setup();
    update(&db, |tx| tx.create_top_level_bucket("wallet").map(|_| ())).unwrap();

    let tx = db.begin_read_tx().unwrap();
    let wallet = tx.top_level_bucket("wallet").unwrap().unwrap();
    assert!(matches!(wallet.put(b"k", b"v"), Err(DbError::WriteNotAllowed)));
    assert!(matches!(wallet.delete(b"k"), Err(DbError::WriteNotAllowed)));
    assert!(matches!(wallet.clear(), Err(DbError::WriteNotAllowed)));
    assert!(matches!(wallet.new_bucket("x"), Err(DbError::WriteNotAllowed)));
    assert!(matches!(wallet.delete_bucket("x"), Err(DbError::WriteNotAllowed)));
}

#[test]
fn test_fetch_bucket() {
    let db = setup();
    let meta = update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        let account = wallet.new_bucket("account")?;
        account.put(b"k", b"v")?;
        Ok::<_, DbError>(account.meta().clone())
    })
    .unwrap();
    assert_eq!(meta.paths(), &["wallet".to_string(), "account".to_string()]);
    assert_eq!(meta.depth(), 2);

    let value = view(&db, |tx| {
        let account = tx.fetch_bucket(&meta)?.unwrap();
        assert_eq!(account.meta(), &meta);
        account.get(b"k")
    })
    .unwrap();
    assert_eq!(value, Some(b"v".to_vec()));

    // A descriptor for a deleted and recreated bucket no longer resolves.
    update(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        wallet.delete_bucket("account")?;
        wallet.new_bucket("account").map(|_| ())
    })
    .unwrap();
    view(&db, |tx| {
        assert!(tx.fetch_bucket(&meta)?.is_none());
        Ok::<_, DbError>(())
    })
    .unwrap();
}

#[test]
fn test_fetch_top_level_bucket() {
    let db = setup();
    let meta = update(&db, |tx| {
        Ok::<_, DbError>(tx.create_top_level_bucket("wallet")?.meta().clone())
    })
    .unwrap();

    let tx = db.begin_read_tx().unwrap();
    let wallet = tx.fetch_bucket(&meta).unwrap().unwrap();
    assert_eq!(wallet.meta().depth(), 1);
    assert_eq!(wallet.meta().name(), "wallet");
}

#[test]
fn test_prefix_scan_and_iterator() {
    let db = setup();
    update(&db, |tx| {
        let keys = tx.create_top_level_bucket("keys")?;
        let other = tx.create_top_level_bucket("other")?;
        keys.put(b"1/0", b"a")?;
        keys.put(b"1/1", b"b")?;
        keys.put(b"2/0", b"c")?;
        other.put(b"1/9", b"x")?;
        Ok::<_, DbError>(())
    })
    .unwrap();

    let tx = db.begin_tx().unwrap();
    let keys = tx.top_level_bucket("keys").unwrap().unwrap();
    keys.put(b"1/2", b"staged").unwrap();
    keys.delete(b"1/0").unwrap();

    assert_eq!(
        keys.get_by_prefix(b"1/").unwrap(),
        vec![entry(b"1/1", b"b"), entry(b"1/2", b"staged")]
    );
    assert_eq!(keys.get_by_prefix(b"").unwrap().len(), 3);

    let mut iter = keys.new_iterator(Some(&Range::new(b"1/2".to_vec(), None)));
    let mut seen = Vec::new();
    while iter.next() {
        seen.push(iter.key().unwrap().to_vec());
    }
    assert_eq!(seen, vec![b"1/2".to_vec(), b"2/0".to_vec()]);
    assert!(iter.error().is_none());

    let mut iter = keys.new_iterator(None);
    assert!(iter.seek(b"2"));
    assert_eq!(iter.value(), Some(&b"c"[..]));
}

#[test]
fn test_clear_keeps_children() {
    let db = setup();
    update(&db, |tx| {
        let wallet = tx.create_top_level_bucket("wallet")?;
        wallet.put(b"a", b"1")?;
        wallet.put(b"b", b"2")?;
        wallet.new_bucket("child")?.put(b"c", b"3")?;
        Ok::<_, DbError>(())
    })
    .unwrap();

    update(&db, |tx| tx.top_level_bucket("wallet")?.unwrap().clear()).unwrap();

    view(&db, |tx| {
        let wallet = tx.top_level_bucket("wallet")?.unwrap();
        assert!(wallet.get_by_prefix(b"")?.is_empty());
        let child = wallet.bucket("child")?.unwrap();
        assert_eq!(child.get(b"c")?, Some(b"3".to_vec()));
        Ok::<_, DbError>(())
    })
    .unwrap();
}

#[test]
fn test_bucket_names_sorted() {
    let db = setup();
    update(&db, |tx| {
        for name in ["c", "a", "b"] {
            tx.create_top_level_bucket(name)?;
        }
        Ok::<_, DbError>(())
    })
    .unwrap();

    let names = view(&db, |tx| tx.bucket_names()).unwrap();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_reopen_after_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db");
    let registry = default_registry();
    let config = SledConfig::default().flush_every_ms(None);

    let db = registry.create(SLED_DB_TYPE, &path, &[&config]).unwrap();
    update(db.as_ref(), |tx| {
        tx.create_top_level_bucket("wallet")?.put(b"k", b"v")
    })
    .unwrap();
    db.close().unwrap();

    let db = registry.open(SLED_DB_TYPE, &path, &[&config]).unwrap();
    let value = view(db.as_ref(), |tx| tx.top_level_bucket("wallet")?.unwrap().get(b"k")).unwrap();
    assert_eq!(value, Some(b"v".to_vec()));
    db.close().unwrap();

    let again = registry.create(SLED_DB_TYPE, &path, &[&config]);
    assert!(matches!(
        again,
        Err(DbError::Storage(StorageError::AlreadyExists(_)))
    ));
}

#[test]
fn test_open_missing_fails() {
    let dir = TempDir::new().unwrap();
    let result = default_registry().open(SLED_DB_TYPE, dir.path().join("nope"), &[]);
    assert!(matches!(
        result,
        Err(DbError::Storage(StorageError::DoesNotExist(_)))
    ));
}
