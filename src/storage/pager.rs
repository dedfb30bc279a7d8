//! The page cache: owns the file descriptor and a fixed-capacity slot array
//! of in-memory page buffers.
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::errors::Error;

/// Fixed size of every page, on disk and in memory.
pub const PAGE_SIZE: usize = 4096;
/// Upper bound on pages the Pager will hold, in memory or on disk.
pub const TABLE_MAX_PAGES: usize = 100;

pub type Page = [u8; PAGE_SIZE];

/// Page cache over a single database file.
///
/// Slots are appended, never recycled: a page is only ever requested by
/// number once higher numbers have already been allocated, so indexing
/// into `pages` never needs to insert ahead of its current length.
pub struct Pager {
    file: File,
    pages: heapless::Vec<Option<Box<Page>>, TABLE_MAX_PAGES>,
    num_pages_on_disk: u32,
}

impl Pager {
    /// Opens (or creates) `path` read/write. Fails with [`Error::CorruptFile`]
    /// if the file length is not a whole number of pages.
    pub fn open(path: &Path) -> Result<Pager, Error> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(Error::CorruptFile);
        }
        let num_pages_on_disk = (len / PAGE_SIZE as u64) as u32;

        let mut pages = heapless::Vec::new();
        for _ in 0..num_pages_on_disk {
            pages.push(None).map_err(|_| Error::PageOutOfBounds(num_pages_on_disk))?;
        }

        Ok(Pager { file, pages, num_pages_on_disk })
    }

    /// The authoritative count of allocated pages (populated or not).
    pub fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    /// The next page number that would be handed out by an allocation.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages()
    }

    /// Returns the buffer for `page_num`, reading it from disk on first
    /// access if it already existed there, or zero-initializing it if it's
    /// new. New pages must be requested in order, immediately following the
    /// current `num_pages` (see [`Pager::unused_page_num`]).
    pub fn get(&mut self, page_num: u32) -> Result<&mut Page, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfBounds(page_num));
        }
        let idx = page_num as usize;
        if idx == self.pages.len() {
            self.pages.push(None).map_err(|_| Error::PageOutOfBounds(page_num))?;
        } else if idx > self.pages.len() {
            return Err(Error::PageOutOfBounds(page_num));
        }

        if self.pages[idx].is_none() {
            let mut buf = Box::new([0u8; PAGE_SIZE]);
            if page_num < self.num_pages_on_disk {
                self.file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                // A short read at EOF is fine: `buf` is already zeroed.
                let _ = self.file.read(&mut buf[..])?;
            }
            self.pages[idx] = Some(buf);
        }

        Ok(self.pages[idx].as_mut().unwrap())
    }

    /// Writes a populated slot back to disk. Precondition: the slot must be
    /// populated (callers only flush pages they've already fetched).
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let idx = page_num as usize;
        let buf = self
            .pages
            .get(idx)
            .and_then(|slot| slot.as_ref())
            .ok_or(Error::InvalidPage(page_num))?;
        self.file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&buf[..])?;
        Ok(())
    }

    /// Flushes every populated slot and closes the file descriptor.
    pub fn close(mut self) -> Result<(), Error> {
        for page_num in 0..self.num_pages() {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
            }
        }
        self.file.flush()?;
        Ok(())
    }
}
