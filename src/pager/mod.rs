//! Component B: paged in-memory file (spec §4.B).
//!
//! Pages are 4 KiB and held in RAM for the whole build; callers serialize
//! writes to distinct pages by construction (see spec §5), `add_page` is the
//! only operation requiring the file-level lock.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::types::PAGE_SIZE;

pub mod overflow;

/// Number of elements that fit in one page, optionally reserving a
/// null-bitmap tail (one bit per element, packed LSB-first, spec §6).
pub fn elements_per_page(bytes_per_element: usize, has_null_mask: bool) -> usize {
    if !has_null_mask {
        return PAGE_SIZE / bytes_per_element;
    }
    let mut epp = PAGE_SIZE / bytes_per_element;
    while epp > 0 {
        let mask_bytes = epp.div_ceil(8);
        if epp * bytes_per_element + mask_bytes <= PAGE_SIZE {
            break;
        }
        epp -= 1;
    }
    epp
}

type Page = Arc<Mutex<Vec<u8>>>;

/// A fixed-page-size, append-only, in-memory file.
pub struct PagedFile {
    bytes_per_element: usize,
    has_null_mask: bool,
    elements_per_page: usize,
    pages: RwLock<Vec<Page>>,
}

impl PagedFile {
    pub fn new(bytes_per_element: usize, has_null_mask: bool, initial_pages: usize) -> Self {
        let elements_per_page = elements_per_page(bytes_per_element, has_null_mask);
        let pages = (0..initial_pages)
            .map(|_| Arc::new(Mutex::new(vec![0u8; PAGE_SIZE])))
            .collect();
        Self {
            bytes_per_element,
            has_null_mask,
            elements_per_page,
            pages: RwLock::new(pages),
        }
    }

    pub fn bytes_per_element(&self) -> usize {
        self.bytes_per_element
    }

    pub fn elements_per_page(&self) -> usize {
        self.elements_per_page
    }

    pub fn num_pages(&self) -> usize {
        self.pages.read().len()
    }

    /// Appends a new page, zeroed if `zero` is true, returning its index.
    /// Serialized across callers (spec §4.B: "addPage is serialized with a
    /// mutex").
    pub fn add_page(&self, zero: bool) -> usize {
        let mut pages = self.pages.write();
        let idx = pages.len();
        let data = if zero {
            vec![0u8; PAGE_SIZE]
        } else {
            Vec::with_capacity(PAGE_SIZE)
        };
        pages.push(Arc::new(Mutex::new(data)));
        idx
    }

    /// Ensures at least `count` pages exist, adding zeroed pages as needed.
    pub fn ensure_pages(&self, count: usize) {
        while self.num_pages() < count {
            self.add_page(true);
        }
    }

    fn page(&self, page_idx: usize) -> Page {
        Arc::clone(&self.pages.read()[page_idx])
    }

    /// Writes `bytes` at `byte_offset` within page `page_idx`. Distinct
    /// pages may be written concurrently without contention; writes to the
    /// same page lock briefly but always touch disjoint byte ranges by
    /// construction (spec §5).
    pub fn write(&self, page_idx: usize, byte_offset: usize, bytes: &[u8]) {
        let page = self.page(page_idx);
        let mut guard = page.lock();
        guard[byte_offset..byte_offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Sets or clears the null bit for element `elem_idx` within a page that
    /// reserves a null-mask tail. Pages start zeroed, and an element that has
    /// never been written must read back as null (spec §3 `Column`
    /// invariant), so the stored bit means "present": it is set when
    /// `is_null` is false and cleared when `is_null` is true.
    pub fn set_null(&self, page_idx: usize, elem_idx: usize, is_null: bool) {
        debug_assert!(self.has_null_mask);
        let mask_start = self.elements_per_page * self.bytes_per_element;
        let byte = elem_idx / 8;
        let bit = elem_idx % 8;
        let page = self.page(page_idx);
        let mut guard = page.lock();
        if is_null {
            guard[mask_start + byte] &= !(1 << bit);
        } else {
            guard[mask_start + byte] |= 1 << bit;
        }
    }

    /// Element-addressed write for column-shaped data: locates the page and
    /// in-page offset for node offset `n` and writes `bytes` there.
    pub fn write_element(&self, n: u64, bytes: &[u8]) {
        let page_idx = n as usize / self.elements_per_page;
        let in_page = (n as usize % self.elements_per_page) * self.bytes_per_element;
        self.ensure_pages(page_idx + 1);
        self.write(page_idx, in_page, bytes);
    }

    pub fn read_element(&self, n: u64, out: &mut [u8]) {
        let page_idx = n as usize / self.elements_per_page;
        let in_page = (n as usize % self.elements_per_page) * self.bytes_per_element;
        let page = self.page(page_idx);
        let guard = page.lock();
        out.copy_from_slice(&guard[in_page..in_page + out.len()]);
    }

    /// Byte-addressed read, for callers (like the overflow file) that index
    /// pages directly rather than through the element-stride mapping.
    pub fn read_element_raw(&self, page_idx: usize, byte_offset: usize, out: &mut [u8]) {
        let page = self.page(page_idx);
        let guard = page.lock();
        out.copy_from_slice(&guard[byte_offset..byte_offset + out.len()]);
    }

    pub fn is_null(&self, n: u64) -> bool {
        let page_idx = n as usize / self.elements_per_page;
        let elem_idx = n as usize % self.elements_per_page;
        let mask_start = self.elements_per_page * self.bytes_per_element;
        let page = self.page(page_idx);
        let guard = page.lock();
        (guard[mask_start + elem_idx / 8] >> (elem_idx % 8)) & 1 == 0
    }

    /// Writes every page in logical order to `path`, starting at byte 0.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for page in self.pages.read().iter() {
            let mut guard = page.lock();
            if guard.len() < PAGE_SIZE {
                guard.resize(PAGE_SIZE, 0);
            }
            writer.write_all(&guard)?;
        }
        writer.flush()?;
        Ok(())
    }
}
