#![forbid(unsafe_code)]

//! Identifiers, constants, and the crate-wide error type.

use std::fmt;
use std::path::PathBuf;

/// Logical page number: the zero-based index of a fixed-size block in the
/// backing file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(value: u64) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u64 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Stable slot index of a frame inside the pool arena.
pub type FrameId = usize;

/// Size of every page in bytes, in memory and on disk.
pub const PAGE_SIZE: usize = 4096;

/// Errors surfaced by the page store and the buffer pool.
#[derive(thiserror::Error, Debug)]
pub enum UmbraError {
    /// The backing page file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// A read referenced a page at or beyond the end of the file.
    #[error("read failed: page {0} does not exist")]
    ReadFailed(PageId),
    /// A page write could not be completed.
    #[error("write failed for page {page}")]
    WriteFailed {
        /// Page whose write failed.
        page: PageId,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file could not be extended to the requested page count.
    #[error("could not grow file to {pages} pages")]
    CapacityError {
        /// Requested minimum page count.
        pages: u64,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The referenced page is not cached in any frame.
    #[error("page {0} is not resident")]
    PageNotResident(PageId),
    /// Every frame is pinned; no eviction candidate exists.
    #[error("no evictable frame: all {0} frames are pinned")]
    NoEvictableFrame(usize),
    /// A caller-supplied argument was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An I/O failure not covered by a more specific kind.
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, UmbraError>;
