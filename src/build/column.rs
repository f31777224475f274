//! A property column: fixed-width storage for one structured property
//! (spec §3 `Column`), with an overflow file for `String`/`List` values.

use crate::error::Result;
use crate::pager::overflow::{ListHandle, OverflowFile, PageByteCursor};
use crate::pager::PagedFile;
use crate::types::TypeId;
use crate::value::PropValue;

pub struct Column {
    pub type_id: TypeId,
    pub pages: PagedFile,
    pub overflow: Option<OverflowFile>,
}

impl Column {
    pub fn new(type_id: TypeId, num_nodes: u64) -> Self {
        let pages = PagedFile::new(type_id.fixed_width(), true, 0);
        let overflow = matches!(type_id, TypeId::String | TypeId::List).then(OverflowFile::new);
        let col = Self {
            type_id,
            pages,
            overflow,
        };
        col.pages.ensure_pages(
            (num_nodes as usize)
                .div_ceil(col.pages.elements_per_page().max(1))
                .max(1),
        );
        col
    }

    /// Writes `value` at node offset `n`, routing `String`/`List` values
    /// through the owned overflow file via `cursor` (mode 2 of spec §4.C).
    pub fn write(&self, n: u64, value: &PropValue, cursor: &mut PageByteCursor) -> Result<()> {
        let bytes = match value {
            PropValue::Str(s) => self
                .overflow
                .as_ref()
                .expect("string column must own an overflow file")
                .copy_string(s.as_bytes(), cursor)?
                .to_bytes(),
            PropValue::List(items) => self
                .overflow
                .as_ref()
                .expect("list column must own an overflow file")
                .copy_list(items, cursor)?
                .to_bytes(),
            other => {
                let mut buf = [0u8; 16];
                if let Some(scalar) = other.scalar_bytes() {
                    buf[..scalar.len()].copy_from_slice(&scalar);
                }
                buf
            }
        };
        self.pages.write_element(n, &bytes[..self.type_id.fixed_width()]);
        self.pages.set_null(
            n as usize / self.pages.elements_per_page(),
            n as usize % self.pages.elements_per_page(),
            false,
        );
        Ok(())
    }

    pub fn write_null(&self, n: u64) {
        self.pages.set_null(
            n as usize / self.pages.elements_per_page(),
            n as usize % self.pages.elements_per_page(),
            true,
        );
    }

    pub fn read_list_handle(&self, n: u64) -> ListHandle {
        let mut buf = [0u8; 16];
        self.pages.read_element(n, &mut buf);
        ListHandle::from_bytes(&buf)
    }

    pub fn flush(&self, dir: &std::path::Path, stem: &str) -> Result<()> {
        self.pages.flush(&dir.join(format!("{stem}.col")))?;
        if let Some(ovf) = &self.overflow {
            ovf.flush(&dir.join(format!("{stem}.ovf")))?;
        }
        Ok(())
    }
}
