#![forbid(unsafe_code)]

//! The paged-file storage manager.
//!
//! A page file is a flat sequence of [`PAGE_SIZE`] blocks; the page number
//! is the zero-based block index. There is no header or metadata page. The
//! buffer pool consumes `read_page` / `write_page` / `ensure_capacity`; the
//! cursor-relative helpers serve callers that walk a file sequentially.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::debug;

use crate::primitives::io::{FileIo, StdFileIo};
use crate::types::{PageId, Result, UmbraError, PAGE_SIZE};

/// Handle to one open page file.
pub struct PageStore {
    io: Arc<dyn FileIo>,
    path: PathBuf,
    total_pages: u64,
    cursor: u64,
}

impl std::fmt::Debug for PageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStore")
            .field("path", &self.path)
            .field("total_pages", &self.total_pages)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl PageStore {
    /// Creates the page file at `path`, initialized with a single zero
    /// page. An existing file is truncated.
    pub fn create(path: impl AsRef<Path>) -> Result<()> {
        let io = StdFileIo::create(&path)?;
        io.write_at(0, &[0u8; PAGE_SIZE])?;
        io.sync_all()?;
        debug!(path = %path.as_ref().display(), "page file created");
        Ok(())
    }

    /// Opens an existing page file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io = match StdFileIo::open(&path) {
            Ok(io) => io,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(UmbraError::FileNotFound(path));
            }
            Err(err) => return Err(err.into()),
        };
        let len = io.len()?;
        let total_pages = len.div_ceil(PAGE_SIZE as u64);
        Ok(Self {
            io: Arc::new(io),
            path,
            total_pages,
            cursor: 0,
        })
    }

    /// Removes the page file at `path`.
    pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(UmbraError::FileNotFound(path.to_path_buf()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages currently in the file.
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Page number of the last block read or written; 0 after open.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    fn check_buf(buf: &[u8]) -> Result<()> {
        if buf.len() != PAGE_SIZE {
            return Err(UmbraError::InvalidArgument(
                "page buffer must be exactly PAGE_SIZE bytes",
            ));
        }
        Ok(())
    }

    /// Reads page `page` into `buf`.
    pub fn read_page(&mut self, page: PageId, buf: &mut [u8]) -> Result<()> {
        Self::check_buf(buf)?;
        if page.0 >= self.total_pages {
            return Err(UmbraError::ReadFailed(page));
        }
        self.io.read_at(page.0 * PAGE_SIZE as u64, buf)?;
        self.cursor = page.0;
        Ok(())
    }

    /// Writes `buf` to page `page`. Writing at `total_pages` is permitted
    /// and extends the file by one page.
    pub fn write_page(&mut self, page: PageId, buf: &[u8]) -> Result<()> {
        Self::check_buf(buf)?;
        if page.0 > self.total_pages {
            return Err(UmbraError::WriteFailed {
                page,
                source: std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "page number beyond end of file",
                ),
            });
        }
        self.io
            .write_at(page.0 * PAGE_SIZE as u64, buf)
            .map_err(|source| UmbraError::WriteFailed { page, source })?;
        if page.0 == self.total_pages {
            self.total_pages += 1;
        }
        self.cursor = page.0;
        Ok(())
    }

    /// Grows the file with zero-filled pages until it holds at least
    /// `min_pages`.
    pub fn ensure_capacity(&mut self, min_pages: u64) -> Result<()> {
        if self.total_pages >= min_pages {
            return Ok(());
        }
        self.io
            .truncate(min_pages * PAGE_SIZE as u64)
            .map_err(|source| UmbraError::CapacityError {
                pages: min_pages,
                source,
            })?;
        debug!(
            path = %self.path.display(),
            from = self.total_pages,
            to = min_pages,
            "page file grown"
        );
        self.total_pages = min_pages;
        Ok(())
    }

    /// Appends one zero page to the end of the file and leaves the cursor
    /// on it.
    pub fn append_empty_page(&mut self) -> Result<()> {
        self.ensure_capacity(self.total_pages + 1)?;
        self.cursor = self.total_pages - 1;
        Ok(())
    }

    /// Reads page 0.
    pub fn read_first(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_page(PageId(0), buf)
    }

    /// Reads the page before the cursor.
    pub fn read_previous(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.cursor == 0 {
            return Err(UmbraError::InvalidArgument("no page before the first"));
        }
        self.read_page(PageId(self.cursor - 1), buf)
    }

    /// Reads the page at the cursor.
    pub fn read_current(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_page(PageId(self.cursor), buf)
    }

    /// Reads the page after the cursor.
    pub fn read_next(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.cursor + 1 >= self.total_pages {
            return Err(UmbraError::InvalidArgument("no page after the last"));
        }
        self.read_page(PageId(self.cursor + 1), buf)
    }

    /// Reads the last page of the file.
    pub fn read_last(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.total_pages == 0 {
            return Err(UmbraError::ReadFailed(PageId(0)));
        }
        self.read_page(PageId(self.total_pages - 1), buf)
    }

    /// Writes `buf` at the cursor.
    pub fn write_current(&mut self, buf: &[u8]) -> Result<()> {
        self.write_page(PageId(self.cursor), buf)
    }

    /// Synchronizes the backing file to disk.
    pub fn sync(&self) -> Result<()> {
        self.io.sync_all()?;
        Ok(())
    }
}
