use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

use crate::primitives::store::PageStore;
use crate::types::{FrameId, PageId, Result, UmbraError};

use super::frame::Frame;
use super::list::FrameList;
use super::policy::{ReplacementPolicy, ReplacementStrategy};

/// Configuration for opening a buffer pool.
#[derive(Clone, Debug)]
pub struct PoolOptions {
    /// Number of frames the pool holds.
    pub capacity: usize,
    /// Replacement strategy used to choose eviction victims.
    pub strategy: ReplacementStrategy,
}

impl Default for PoolOptions {
    /// 128 LRU frames.
    fn default() -> Self {
        Self {
            capacity: 128,
            strategy: ReplacementStrategy::default(),
        }
    }
}

/// Snapshot of pool counters.
#[derive(Default, Clone, Debug)]
pub struct PoolStats {
    /// Pages read from the store.
    pub reads: u64,
    /// Pages written back to the store.
    pub writes: u64,
    /// Pins served without I/O.
    pub hits: u64,
    /// Pins that had to load from the store.
    pub misses: u64,
    /// Frames whose resident page was replaced.
    pub evictions: u64,
}

struct PoolInner {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    order: FrameList,
    occupied: usize,
    stats: PoolStats,
    store: PageStore,
}

/// A pinned page.
///
/// The handle shares the frame's buffer through an `Arc`, so the bytes stay
/// valid (and stay put) for as long as the handle lives. Dropping the handle
/// does NOT release the pin; callers release pins explicitly with
/// [`BufferPool::unpin`].
#[derive(Debug)]
pub struct PageHandle {
    page: PageId,
    buf: Arc<RwLock<Box<[u8]>>>,
}

impl PageHandle {
    /// Page number this handle refers to.
    pub fn page_id(&self) -> PageId {
        self.page
    }

    /// Read access to the page bytes.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.buf.read()
    }

    /// Write access to the page bytes. Callers that modify the page must
    /// also call [`BufferPool::mark_dirty`] for the change to be written
    /// back. Release the guard before invoking pool operations that touch
    /// the same page (`force_page`, `flush`, eviction via `pin`).
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.buf.write()
    }
}

/// Fixed-capacity page cache in front of one [`PageStore`].
///
/// All structural state (page table, eviction order, frame metadata,
/// counters, the store itself) lives behind one mutex; it is mutually
/// consistent only between complete operations. Disk I/O on a miss happens
/// inside the critical section, synchronously.
pub struct BufferPool {
    inner: Mutex<PoolInner>,
    policy: Box<dyn ReplacementPolicy>,
    strategy: ReplacementStrategy,
    capacity: usize,
    path: PathBuf,
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("strategy", &self.strategy)
            .field("capacity", &self.capacity)
            .field("path", &self.path)
            .finish()
    }
}

impl BufferPool {
    /// Opens the page file at `path` and builds a pool of
    /// `options.capacity` empty frames in front of it.
    pub fn open(path: impl AsRef<Path>, options: PoolOptions) -> Result<Self> {
        if options.capacity == 0 {
            return Err(UmbraError::InvalidArgument("pool capacity must be at least 1"));
        }
        let path = path.as_ref().to_path_buf();
        let store = PageStore::open(&path)?;
        let mut frames: Vec<Frame> = (0..options.capacity).map(|_| Frame::new()).collect();
        let mut order = FrameList::new();
        for idx in 0..options.capacity {
            order.push_back(&mut frames, idx);
        }
        debug_assert_eq!(order.len(), options.capacity);
        debug!(
            path = %path.display(),
            capacity = options.capacity,
            strategy = options.strategy.as_str(),
            "buffer pool opened"
        );
        Ok(Self {
            inner: Mutex::new(PoolInner {
                frames,
                page_table: HashMap::new(),
                order,
                occupied: 0,
                stats: PoolStats::default(),
                store,
            }),
            policy: options.strategy.policy(),
            strategy: options.strategy,
            capacity: options.capacity,
            path,
        })
    }

    /// Pins `page`, loading it from the store on a miss. The returned
    /// handle stays valid until the matching [`unpin`](Self::unpin); the
    /// pool never repurposes a frame while pins are outstanding.
    pub fn pin(&self, page: PageId) -> Result<PageHandle> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(&idx) = inner.page_table.get(&page) {
            inner.stats.hits += 1;
            inner.frames[idx].fix_count += 1;
            self.policy.on_hit(&mut inner.order, &mut inner.frames, idx);
            trace!(page = %page, frame = idx, "pin hit");
            return Ok(PageHandle {
                page,
                buf: inner.frames[idx].buf.clone(),
            });
        }
        inner.stats.misses += 1;
        let idx = self
            .policy
            .select_victim(&inner.order, &inner.frames, inner.occupied)?;
        self.replace(inner, idx, page)?;
        self.policy.on_load(&mut inner.order, &mut inner.frames, idx);
        trace!(page = %page, frame = idx, "pin miss loaded");
        Ok(PageHandle {
            page,
            buf: inner.frames[idx].buf.clone(),
        })
    }

    /// Repurposes frame `idx` to hold `page`: write back, reload, re-index.
    /// On failure the frame is relinked and the pool stays consistent.
    fn replace(&self, inner: &mut PoolInner, idx: FrameId, page: PageId) -> Result<()> {
        inner.order.unlink(&mut inner.frames, idx);
        let old = inner.frames[idx].page;

        if inner.frames[idx].dirty {
            let old_page = old.expect("dirty frame holds a page");
            let buf = inner.frames[idx].buf.clone();
            let data = buf.read();
            debug!(page = %old_page, frame = idx, "writing back dirty victim");
            if let Err(err) = inner.store.write_page(old_page, &data) {
                drop(data);
                inner.order.push_back(&mut inner.frames, idx);
                return Err(err);
            }
            drop(data);
            inner.stats.writes += 1;
            inner.frames[idx].dirty = false;
        }

        if let Err(err) = inner.store.ensure_capacity(page.0 + 1) {
            inner.order.push_back(&mut inner.frames, idx);
            return Err(err);
        }

        let buf = inner.frames[idx].buf.clone();
        let mut data = buf.write();
        if let Err(err) = inner.store.read_page(page, &mut data) {
            drop(data);
            // The buffer may hold a partial read; retire the frame to empty
            // rather than advertise stale content.
            if let Some(old_page) = old {
                inner.page_table.remove(&old_page);
                inner.occupied -= 1;
            }
            inner.frames[idx].page = None;
            inner.frames[idx].dirty = false;
            inner.frames[idx].fix_count = 0;
            inner.order.push_back(&mut inner.frames, idx);
            return Err(err);
        }
        drop(data);
        inner.stats.reads += 1;

        match old {
            Some(old_page) => {
                inner.page_table.remove(&old_page);
                inner.stats.evictions += 1;
            }
            None => inner.occupied += 1,
        }
        let frame = &mut inner.frames[idx];
        frame.page = Some(page);
        frame.dirty = false;
        frame.fix_count = 1;
        inner.page_table.insert(page, idx);
        Ok(())
    }

    fn resident(inner: &PoolInner, page: PageId) -> Result<FrameId> {
        inner
            .page_table
            .get(&page)
            .copied()
            .ok_or(UmbraError::PageNotResident(page))
    }

    /// Releases one pin on `page`.
    pub fn unpin(&self, page: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = Self::resident(&inner, page)?;
        let frame = &mut inner.frames[idx];
        if frame.fix_count == 0 {
            return Err(UmbraError::InvalidArgument(
                "unpin on a page with no outstanding pins",
            ));
        }
        frame.fix_count -= 1;
        Ok(())
    }

    /// Marks `page` as modified so eviction and flush write it back. Pin
    /// state is not checked; callers are trusted to mark only pages they
    /// hold.
    pub fn mark_dirty(&self, page: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = Self::resident(&inner, page)?;
        inner.frames[idx].dirty = true;
        Ok(())
    }

    /// Writes `page` back to the store immediately, dirty or not.
    pub fn force_page(&self, page: PageId) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let idx = Self::resident(inner, page)?;
        let buf = inner.frames[idx].buf.clone();
        let data = buf.read();
        inner.store.write_page(page, &data)?;
        drop(data);
        inner.stats.writes += 1;
        inner.frames[idx].dirty = false;
        Ok(())
    }

    /// Writes back every dirty frame, clearing each. Pinned frames are
    /// written too; their pins are unaffected. Clean frames cost nothing.
    pub fn flush(&self) -> Result<()> {
        let mut guard = self.inner.lock();
        Self::flush_locked(&mut guard)
    }

    fn flush_locked(inner: &mut PoolInner) -> Result<()> {
        for idx in 0..inner.frames.len() {
            if !inner.frames[idx].dirty {
                continue;
            }
            let page = inner.frames[idx].page.expect("dirty frame holds a page");
            let buf = inner.frames[idx].buf.clone();
            let data = buf.read();
            inner.store.write_page(page, &data)?;
            drop(data);
            inner.frames[idx].dirty = false;
            inner.stats.writes += 1;
        }
        Ok(())
    }

    /// Flushes all dirty frames, syncs the backing file, and releases the
    /// pool. Consuming `self` makes later use of the pool unrepresentable.
    /// A flush failure is reported; resources are released regardless.
    pub fn shutdown(self) -> Result<()> {
        let result = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            Self::flush_locked(inner).and_then(|()| inner.store.sync())
        };
        debug!(path = %self.path.display(), "buffer pool shut down");
        result
    }

    /// Number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Strategy the pool was opened with.
    pub fn strategy(&self) -> ReplacementStrategy {
        self.strategy
    }

    /// Path of the backing page file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resident page of each slot, indexed by frame.
    pub fn frame_contents(&self) -> Vec<Option<PageId>> {
        let inner = self.inner.lock();
        inner.frames.iter().map(|f| f.page).collect()
    }

    /// Dirty flag of each slot, indexed by frame.
    pub fn dirty_flags(&self) -> Vec<bool> {
        let inner = self.inner.lock();
        inner.frames.iter().map(|f| f.dirty).collect()
    }

    /// Fix count of each slot, indexed by frame.
    pub fn fix_counts(&self) -> Vec<u32> {
        let inner = self.inner.lock();
        inner.frames.iter().map(|f| f.fix_count).collect()
    }

    /// Pages read from the store since open.
    pub fn read_count(&self) -> u64 {
        self.inner.lock().stats.reads
    }

    /// Pages written to the store since open.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().stats.writes
    }

    /// Count of frames currently holding a page.
    pub fn occupied_frames(&self) -> usize {
        self.inner.lock().occupied
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats.clone()
    }
}

impl Drop for BufferPool {
    /// Best-effort write-back of whatever `shutdown` did not get to.
    fn drop(&mut self) {
        let mut guard = self.inner.lock();
        if let Err(err) = Self::flush_locked(&mut guard) {
            warn!(
                path = %self.path.display(),
                error = %err,
                "flush on drop failed; dirty pages may be lost"
            );
        }
    }
}
