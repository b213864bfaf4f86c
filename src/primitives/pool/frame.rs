use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{FrameId, PageId, PAGE_SIZE};

/// One pool slot: a page-sized buffer plus its bookkeeping. Frames are
/// created once at pool initialization; eviction rewrites `page` and the
/// buffer contents but never the slot itself.
pub struct Frame {
    /// Resident page, or `None` while the slot holds nothing.
    pub page: Option<PageId>,
    /// Page-sized buffer shared with pinned callers. The `Arc` keeps the
    /// buffer's identity stable for as long as any handle is alive.
    pub buf: Arc<RwLock<Box<[u8]>>>,
    /// Content modified since the last write-back.
    pub dirty: bool,
    /// Outstanding pins. Non-zero means the frame must not be evicted.
    pub fix_count: u32,
    /// Slot index of the neighbor toward the front of the eviction order.
    pub prev: Option<FrameId>,
    /// Slot index of the neighbor toward the rear of the eviction order.
    pub next: Option<FrameId>,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: None,
            buf: Arc::new(RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice())),
            dirty: false,
            fix_count: 0,
            prev: None,
            next: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.fix_count > 0
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
