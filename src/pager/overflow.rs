//! Component C: overflow file for variable-length values (spec §4.C).
//!
//! Backed by the same paged storage as [`super::PagedFile`], in two usage
//! modes: a single-mutex append mode for primary-key strings, and a
//! per-caller-cursor mode for property columns/lists.

use parking_lot::Mutex;

use super::PagedFile;
use crate::error::{LoadError, Result};
use crate::types::PAGE_SIZE;
use crate::value::PropValue;

/// 64-bit pointer into an overflow file: low 48 bits page index, high 16
/// bits in-page byte offset, little-endian (spec §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverflowPointer(pub u64);

impl OverflowPointer {
    pub fn encode(page_idx: u64, offset_in_page: u16) -> Self {
        debug_assert!(page_idx < (1u64 << 48));
        Self(page_idx | ((offset_in_page as u64) << 48))
    }

    pub fn page_idx(self) -> u64 {
        self.0 & 0xFFFF_FFFF_FFFF
    }

    pub fn offset_in_page(self) -> u16 {
        (self.0 >> 48) as u16
    }
}

/// 16-byte inline string handle (spec §3, §6): short strings (≤12 bytes) are
/// stored entirely inline; longer strings store a 4-byte prefix plus an
/// [`OverflowPointer`] to the full bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InlineString {
    pub len: u32,
    pub prefix: [u8; 4],
    pub tail: u64,
}

const INLINE_TAIL_LEN: usize = 12;

impl InlineString {
    pub fn is_short(&self) -> bool {
        self.len as usize <= INLINE_TAIL_LEN
    }

    pub fn overflow_ptr(&self) -> Option<OverflowPointer> {
        (!self.is_short()).then_some(OverflowPointer(self.tail))
    }

    pub fn to_bytes(self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.len.to_le_bytes());
        buf[4..8].copy_from_slice(&self.prefix);
        buf[8..16].copy_from_slice(&self.tail.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&bytes[4..8]);
        Self {
            len: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            prefix,
            tail: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
        }
    }
}

/// 16-byte handle for a list value, laid out the same way as
/// [`InlineString`] so property columns/lists can use one fixed width for
/// both: element count, then an overflow pointer to the first element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListHandle {
    pub count: u32,
    pub overflow_ptr: OverflowPointer,
}

impl ListHandle {
    pub fn to_bytes(self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.count.to_le_bytes());
        buf[8..16].copy_from_slice(&self.overflow_ptr.0.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            count: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            overflow_ptr: OverflowPointer(u64::from_le_bytes(bytes[8..16].try_into().unwrap())),
        }
    }
}

/// A per-caller write cursor into the overflow file (spec §4.C mode 2).
/// `None` means uninitialized — the first write allocates a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageByteCursor {
    pub page_idx: Option<usize>,
    pub offset_in_page: usize,
}

struct AppendCursor {
    page_idx: usize,
    offset_in_page: usize,
}

pub struct OverflowFile {
    pages: PagedFile,
    append_cursor: Mutex<AppendCursor>,
}

impl OverflowFile {
    pub fn new() -> Self {
        let pages = PagedFile::new(1, false, 1);
        Self {
            pages,
            append_cursor: Mutex::new(AppendCursor {
                page_idx: 0,
                offset_in_page: 0,
            }),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.pages.num_pages()
    }

    pub fn read(&self, ptr: OverflowPointer, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.pages
            .read_element_raw(ptr.page_idx() as usize, ptr.offset_in_page() as usize, &mut out);
        out
    }

    /// Append-mode string write, serialized by a single mutex (spec §4.C.1).
    pub fn append_string(&self, raw: &[u8]) -> Result<InlineString> {
        if raw.len() > u32::MAX as usize {
            return Err(LoadError::Internal(format!(
                "string of {} bytes exceeds overflow length limit",
                raw.len()
            )));
        }
        let mut prefix = [0u8; 4];
        let n = raw.len().min(4);
        prefix[..n].copy_from_slice(&raw[..n]);

        if raw.len() <= INLINE_TAIL_LEN {
            let mut tail = [0u8; 8];
            tail[..raw.len()].copy_from_slice(raw);
            return Ok(InlineString {
                len: raw.len() as u32,
                prefix,
                tail: u64::from_le_bytes(tail),
            });
        }

        let mut cursor = self.append_cursor.lock();
        if cursor.offset_in_page + raw.len() > PAGE_SIZE {
            let idx = self.pages.add_page(true);
            cursor.page_idx = idx;
            cursor.offset_in_page = 0;
        }
        let ptr = OverflowPointer::encode(cursor.page_idx as u64, cursor.offset_in_page as u16);
        self.pages.write(cursor.page_idx, cursor.offset_in_page, raw);
        cursor.offset_in_page += raw.len();

        Ok(InlineString {
            len: raw.len() as u32,
            prefix,
            tail: ptr.0,
        })
    }

    fn alloc_for_cursor(&self, cursor: &mut PageByteCursor, len: usize) -> usize {
        if cursor.page_idx.is_none() || cursor.offset_in_page + len > PAGE_SIZE {
            let idx = self.pages.add_page(true);
            cursor.page_idx = Some(idx);
            cursor.offset_in_page = 0;
        }
        cursor.page_idx.unwrap()
    }

    /// Cursor-mode string write (spec §4.C mode 2): one page allocation per
    /// overrun, otherwise lock-free for the owning caller.
    pub fn copy_string(&self, raw: &[u8], cursor: &mut PageByteCursor) -> Result<InlineString> {
        if raw.len() > u32::MAX as usize {
            return Err(LoadError::Internal(format!(
                "string of {} bytes exceeds overflow length limit",
                raw.len()
            )));
        }
        let mut prefix = [0u8; 4];
        let n = raw.len().min(4);
        prefix[..n].copy_from_slice(&raw[..n]);

        if raw.len() <= INLINE_TAIL_LEN {
            let mut tail = [0u8; 8];
            tail[..raw.len()].copy_from_slice(raw);
            return Ok(InlineString {
                len: raw.len() as u32,
                prefix,
                tail: u64::from_le_bytes(tail),
            });
        }

        let page_idx = self.alloc_for_cursor(cursor, raw.len());
        let ptr = OverflowPointer::encode(page_idx as u64, cursor.offset_in_page as u16);
        self.pages.write(page_idx, cursor.offset_in_page, raw);
        cursor.offset_in_page += raw.len();
        Ok(InlineString {
            len: raw.len() as u32,
            prefix,
            tail: ptr.0,
        })
    }

    /// Cursor-mode list write: recursively lays out nested lists/strings,
    /// then the flat sequence of 16-byte element handles (spec §4.C).
    pub fn copy_list(&self, values: &[PropValue], cursor: &mut PageByteCursor) -> Result<ListHandle> {
        let mut encoded = Vec::with_capacity(values.len() * 16);
        for v in values {
            let bytes = match v {
                PropValue::Str(s) => self.copy_string(s.as_bytes(), cursor)?.to_bytes(),
                PropValue::List(items) => self.copy_list(items, cursor)?.to_bytes(),
                other => {
                    let mut buf = [0u8; 16];
                    if let Some(scalar) = other.scalar_bytes() {
                        buf[..scalar.len()].copy_from_slice(&scalar);
                    }
                    buf
                }
            };
            encoded.extend_from_slice(&bytes);
        }
        let ptr = self.copy_raw(&encoded, cursor)?;
        Ok(ListHandle {
            count: values.len() as u32,
            overflow_ptr: ptr,
        })
    }

    /// Copies an already-encoded byte blob into the overflow file under
    /// `cursor`, allowing it to span into fresh pages (spec §4.C mode 2).
    /// Used directly by [`Self::copy_list`] and by the rel builder's
    /// overflow re-sort step (spec §4.I), which moves already-encoded list
    /// bodies from the unsorted to the ordered overflow file verbatim.
    pub fn copy_raw(&self, raw: &[u8], cursor: &mut PageByteCursor) -> Result<OverflowPointer> {
        let page_idx = self.alloc_for_cursor(cursor, raw.len().max(1));
        let ptr = OverflowPointer::encode(page_idx as u64, cursor.offset_in_page as u16);
        let mut remaining = raw;
        let mut page_idx = page_idx;
        let mut offset = cursor.offset_in_page;
        while !remaining.is_empty() {
            let space = PAGE_SIZE - offset;
            let take = remaining.len().min(space);
            self.pages.write(page_idx, offset, &remaining[..take]);
            remaining = &remaining[take..];
            offset += take;
            if !remaining.is_empty() {
                page_idx = self.pages.add_page(true);
                offset = 0;
            }
        }
        cursor.page_idx = Some(page_idx);
        cursor.offset_in_page = offset;
        Ok(ptr)
    }

    pub fn pages(&self) -> &PagedFile {
        &self.pages
    }

    pub fn flush(&self, path: &std::path::Path) -> Result<()> {
        self.pages.flush(path)
    }
}

impl Default for OverflowFile {
    fn default() -> Self {
        Self::new()
    }
}
