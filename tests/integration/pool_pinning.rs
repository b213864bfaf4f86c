#![allow(missing_docs)]

use std::path::Path;

use tempfile::tempdir;
use umbra::primitives::pool::{BufferPool, PoolOptions, ReplacementStrategy};
use umbra::primitives::store::PageStore;
use umbra::types::{PageId, Result, UmbraError};

fn open_pool(dir: &Path, capacity: usize) -> Result<BufferPool> {
    let path = dir.join("pool.db");
    if !path.exists() {
        PageStore::create(&path)?;
    }
    BufferPool::open(
        &path,
        PoolOptions {
            capacity,
            strategy: ReplacementStrategy::Lru,
        },
    )
}

#[test]
fn repeat_pin_is_served_without_io() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 3)?;

    pool.pin(PageId(2))?;
    assert_eq!(pool.read_count(), 1);

    pool.pin(PageId(2))?;
    assert_eq!(pool.read_count(), 1, "hit must not touch the store");
    assert!(pool.fix_counts().contains(&2));
    Ok(())
}

#[test]
fn unpin_decrements_and_bottoms_out() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    pool.pin(PageId(1))?;
    pool.unpin(PageId(1))?;
    assert!(pool.fix_counts().iter().all(|&c| c == 0));

    let err = pool.unpin(PageId(1)).unwrap_err();
    assert!(matches!(err, UmbraError::InvalidArgument(_)));
    assert!(pool.fix_counts().iter().all(|&c| c == 0), "never below zero");
    Ok(())
}

#[test]
fn operations_on_non_resident_pages_fail() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    let absent = PageId(9);
    assert!(matches!(
        pool.unpin(absent).unwrap_err(),
        UmbraError::PageNotResident(PageId(9))
    ));
    assert!(matches!(
        pool.mark_dirty(absent).unwrap_err(),
        UmbraError::PageNotResident(PageId(9))
    ));
    assert!(matches!(
        pool.force_page(absent).unwrap_err(),
        UmbraError::PageNotResident(PageId(9))
    ));
    Ok(())
}

#[test]
fn handles_to_the_same_page_alias_one_buffer() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    let first = pool.pin(PageId(0))?;
    let second = pool.pin(PageId(0))?;
    first.data_mut()[0] = 0x7E;
    assert_eq!(second.data()[0], 0x7E);

    pool.unpin(PageId(0))?;
    pool.unpin(PageId(0))?;
    Ok(())
}

#[test]
fn dirty_roundtrip_through_force_page() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    let page = PageId(3);
    let handle = pool.pin(page)?;
    handle.data_mut()[..9].copy_from_slice(b"tuple-one");
    drop(handle);
    pool.mark_dirty(page)?;
    pool.unpin(page)?;
    pool.force_page(page)?;
    assert_eq!(pool.write_count(), 1);
    assert!(!pool.dirty_flags().iter().any(|&d| d));

    // The store sees the bytes without going through the pool.
    let mut store = PageStore::open(dir.path().join("pool.db"))?;
    let mut buf = vec![0u8; umbra::types::PAGE_SIZE];
    store.read_page(page, &mut buf)?;
    assert_eq!(&buf[..9], b"tuple-one");
    Ok(())
}

#[test]
fn evicted_page_reloads_with_its_content() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 1)?;

    let handle = pool.pin(PageId(1))?;
    handle.data_mut()[..5].copy_from_slice(b"alpha");
    drop(handle);
    pool.mark_dirty(PageId(1))?;
    pool.unpin(PageId(1))?;

    // Capacity 1: pinning another page evicts and writes back page 1.
    pool.pin(PageId(2))?;
    assert_eq!(pool.write_count(), 1);
    pool.unpin(PageId(2))?;

    let again = pool.pin(PageId(1))?;
    assert_eq!(&again.data()[..5], b"alpha");
    Ok(())
}

#[test]
fn zero_capacity_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pool.db");
    PageStore::create(&path).unwrap();
    let err = BufferPool::open(
        &path,
        PoolOptions {
            capacity: 0,
            strategy: ReplacementStrategy::Fifo,
        },
    )
    .unwrap_err();
    assert!(matches!(err, UmbraError::InvalidArgument(_)));
}

#[test]
fn missing_backing_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = BufferPool::open(dir.path().join("absent.db"), PoolOptions::default()).unwrap_err();
    assert!(matches!(err, UmbraError::FileNotFound(_)));
}
