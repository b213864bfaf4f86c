#![allow(missing_docs)]

use std::path::Path;

use tempfile::tempdir;
use umbra::primitives::pool::{BufferPool, PoolOptions, ReplacementStrategy};
use umbra::primitives::store::PageStore;
use umbra::types::{PageId, Result, PAGE_SIZE};

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

fn page_bytes(dir: &Path, page: u64) -> Vec<u8> {
    let mut store = PageStore::open(dir.join("pool.db")).unwrap();
    let mut buf = vec![0u8; PAGE_SIZE];
    store.read_page(PageId(page), &mut buf).unwrap();
    buf
}

#[test]
fn flush_writes_exactly_the_dirty_set() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 4)?;

    for n in 1..=3 {
        pool.pin(PageId(n))?;
        pool.unpin(PageId(n))?;
    }
    pool.mark_dirty(PageId(1))?;
    pool.mark_dirty(PageId(3))?;

    pool.flush()?;
    assert_eq!(pool.write_count(), 2);
    assert!(!pool.dirty_flags().iter().any(|&d| d));

    // Nothing left to write: a second flush is free.
    pool.flush()?;
    assert_eq!(pool.write_count(), 2);
    Ok(())
}

#[test]
fn shutdown_flushes_pages_that_are_still_pinned() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    let page = PageId(1);
    let handle = pool.pin(page)?;
    handle.data_mut()[..7].copy_from_slice(b"durable");
    drop(handle);
    pool.mark_dirty(page)?;
    // Deliberately no unpin: shutdown must still write the page back.
    pool.shutdown()?;

    assert_eq!(&page_bytes(dir.path(), 1)[..7], b"durable");
    Ok(())
}

#[test]
fn dropping_the_pool_flushes_best_effort() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    let handle = pool.pin(PageId(2))?;
    handle.data_mut()[..4].copy_from_slice(b"kept");
    drop(handle);
    pool.mark_dirty(PageId(2))?;
    pool.unpin(PageId(2))?;
    drop(pool);

    assert_eq!(&page_bytes(dir.path(), 2)[..4], b"kept");
    Ok(())
}

#[test]
fn clean_pool_shuts_down_without_writes() -> Result<()> {
    let dir = tempdir().unwrap();
    let pool = open_pool(dir.path(), 2)?;

    pool.pin(PageId(1))?;
    pool.unpin(PageId(1))?;
    assert_eq!(pool.write_count(), 0);
    pool.shutdown()?;

    assert!(page_bytes(dir.path(), 1).iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn reopened_pool_sees_flushed_state() -> Result<()> {
    let dir = tempdir().unwrap();
    {
        let pool = open_pool(dir.path(), 2)?;
        let handle = pool.pin(PageId(5))?;
        handle.data_mut()[..5].copy_from_slice(b"cycle");
        drop(handle);
        pool.mark_dirty(PageId(5))?;
        pool.unpin(PageId(5))?;
        pool.shutdown()?;
    }
    let pool = open_pool(dir.path(), 2)?;
    let handle = pool.pin(PageId(5))?;
    assert_eq!(&handle.data()[..5], b"cycle");
    drop(handle);
    pool.unpin(PageId(5))?;
    Ok(())
}
