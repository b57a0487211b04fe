//! Page format and the `DbFile` trait: the storage-layer contract the
//! relational operators and the buffer pool build on.
//!
//! `Page` is a raw, fixed-size byte container. The buffer pool that owns it
//! never interprets its bytes; only a `DbFile` implementation knows how to
//! read and write tuples through it. This crate also ships `HeapFile`, a
//! self-contained slotted-page reference fixture used by the test suite to
//! exercise the `DbFile` contract — it keeps its own file handle rather than
//! reaching back into a buffer pool, so this crate never depends on `catalog`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::path::Path;

use bincode::config::{self, Config as BincodeConfig};
use bincode::serde::{decode_from_slice, encode_into_slice, encode_to_vec};
use common::{DbError, DbResult, Tuple, TupleDesc, PAGE_SIZE};

const HEADER_BYTES: usize = size_of::<PageHeader>();
const SLOT_BYTES: usize = size_of::<Slot>();

fn bincode_config() -> impl BincodeConfig {
    config::legacy()
}

/// A fixed-size page of raw bytes. Read and written in place by a `DbFile`;
/// the buffer pool that holds it never looks inside.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<u8>,
}

impl Page {
    pub fn new() -> Self {
        let mut page = Self {
            data: vec![0u8; PAGE_SIZE],
        };
        page.write_header(&PageHeader::default())
            .expect("initialize page header");
        page
    }

    fn header(&self) -> DbResult<PageHeader> {
        let (header, read) = decode_from_slice(&self.data[..HEADER_BYTES], bincode_config())
            .map_err(|e| DbError::Storage(format!("read page header failed: {e}")))?;
        debug_assert_eq!(read, HEADER_BYTES);
        Ok(header)
    }

    fn write_header(&mut self, header: &PageHeader) -> DbResult<()> {
        let written = encode_into_slice(header, &mut self.data[..HEADER_BYTES], bincode_config())
            .map_err(|e| DbError::Storage(format!("write page header failed: {e}")))?;
        debug_assert_eq!(written, HEADER_BYTES);
        Ok(())
    }

    fn slot_offset(slot_idx: u16) -> usize {
        HEADER_BYTES + slot_idx as usize * SLOT_BYTES
    }

    fn read_slot(&self, slot_idx: u16) -> DbResult<Slot> {
        let start = Self::slot_offset(slot_idx);
        let end = start + SLOT_BYTES;
        if end > PAGE_SIZE {
            return Err(DbError::Storage(format!("slot {slot_idx} out of bounds")));
        }
        let (slot, read) = decode_from_slice(&self.data[start..end], bincode_config())
            .map_err(|e| DbError::Storage(format!("read slot failed: {e}")))?;
        debug_assert_eq!(read, SLOT_BYTES);
        Ok(slot)
    }

    fn write_slot(&mut self, slot_idx: u16, slot: &Slot) -> DbResult<()> {
        let start = Self::slot_offset(slot_idx);
        let end = start + SLOT_BYTES;
        if end > PAGE_SIZE {
            return Err(DbError::Storage(format!("slot {slot_idx} out of bounds")));
        }
        let written = encode_into_slice(slot, &mut self.data[start..end], bincode_config())
            .map_err(|e| DbError::Storage(format!("write slot failed: {e}")))?;
        debug_assert_eq!(written, SLOT_BYTES);
        Ok(())
    }

    fn free_space(&self) -> DbResult<usize> {
        let header = self.header()?;
        let slots_start = HEADER_BYTES + header.num_slots as usize * SLOT_BYTES;
        let free_offset = usize::from(header.free_offset);
        Ok(free_offset.saturating_sub(slots_start))
    }

    fn can_fit(&self, payload_len: usize) -> DbResult<bool> {
        let needed = payload_len + SLOT_BYTES;
        Ok(self.free_space()? >= needed)
    }

    fn append_tuple(&mut self, bytes: &[u8]) -> DbResult<u16> {
        if bytes.len() > u16::MAX as usize {
            return Err(DbError::Storage("tuple exceeds maximum size".into()));
        }
        let mut header = self.header()?;
        if header.num_slots == u16::MAX {
            return Err(DbError::Storage("slot index overflow".into()));
        }
        if !self.can_fit(bytes.len())? {
            return Err(DbError::Storage("page full".into()));
        }
        let slot_idx = header.num_slots;
        let len = bytes.len() as u16;
        let new_free_offset = header.free_offset - len;
        self.data[new_free_offset as usize..header.free_offset as usize].copy_from_slice(bytes);

        let slot = Slot {
            offset: new_free_offset,
            len,
        };
        self.write_slot(slot_idx, &slot)?;

        header.num_slots += 1;
        header.free_offset = new_free_offset;
        self.write_header(&header)?;
        Ok(slot_idx)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct PageHeader {
    num_slots: u16,
    free_offset: u16,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self {
            num_slots: 0,
            free_offset: PAGE_SIZE as u16,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Slot {
    offset: u16,
    len: u16,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A named collection of tuples backed by pages.
///
/// Only the methods here are consumed by the rest of the workspace: page
/// I/O, appending tuples, and forward iteration. A concrete production
/// implementation (B-tree, indexing, free-space maps, crash-safe
/// allocation) is out of scope; `HeapFile` below is the reference fixture
/// the test suite exercises this contract against.
pub trait DbFile {
    fn name(&self) -> &str;
    fn tuple_desc(&self) -> &TupleDesc;
    fn read_page(&mut self, page: &mut Page, page_index: u32) -> DbResult<()>;
    fn write_page(&mut self, page: &Page, page_index: u32) -> DbResult<()>;
    fn insert_tuple(&mut self, tuple: Tuple) -> DbResult<()>;
    fn iter_tuples(&mut self) -> Box<dyn Iterator<Item = DbResult<Tuple>> + '_>;
}

/// Self-contained slotted-page heap file: the reference `DbFile` fixture.
///
/// Keeps its own file handle and does its own raw I/O; it never reaches
/// back into a buffer pool, so this crate stays free of a dependency on
/// `catalog`.
#[derive(Debug)]
pub struct HeapFile {
    name: String,
    desc: TupleDesc,
    file: File,
}

impl HeapFile {
    pub fn open(path: &Path, name: impl Into<String>, desc: TupleDesc) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            name: name.into(),
            desc,
            file,
        })
    }

    fn file_len(&self) -> DbResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn num_pages(&self) -> DbResult<u32> {
        Ok((self.file_len()? / PAGE_SIZE as u64) as u32)
    }

    fn last_page_index(&self) -> DbResult<Option<u32>> {
        let pages = self.num_pages()?;
        Ok(if pages == 0 { None } else { Some(pages - 1) })
    }

    fn allocate_page(&self) -> DbResult<(u32, Page)> {
        Ok((self.num_pages()?, Page::new()))
    }

    fn raw_read_page(&mut self, page_index: u32) -> DbResult<Page> {
        let mut page = Page::new();
        if page_index >= self.num_pages()? {
            return Ok(page);
        }
        self.file
            .seek(SeekFrom::Start(page_index as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut page.data)?;
        Ok(page)
    }

    fn raw_write_page(&mut self, page: &Page, page_index: u32) -> DbResult<()> {
        self.file
            .seek(SeekFrom::Start(page_index as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&page.data)?;
        self.file.flush()?;
        Ok(())
    }
}

impl DbFile for HeapFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn read_page(&mut self, page: &mut Page, page_index: u32) -> DbResult<()> {
        *page = self.raw_read_page(page_index)?;
        Ok(())
    }

    fn write_page(&mut self, page: &Page, page_index: u32) -> DbResult<()> {
        self.raw_write_page(page, page_index)
    }

    fn insert_tuple(&mut self, tuple: Tuple) -> DbResult<()> {
        let bytes = encode_to_vec(&tuple.0, bincode_config())
            .map_err(|e| DbError::Storage(format!("serialize tuple failed: {e}")))?;

        let (page_index, mut page) = match self.last_page_index()? {
            Some(idx) => (idx, self.raw_read_page(idx)?),
            None => self.allocate_page()?,
        };

        let (page_index, mut page) = if page.can_fit(bytes.len())? {
            (page_index, page)
        } else {
            self.allocate_page()?
        };

        page.append_tuple(&bytes)?;
        self.raw_write_page(&page, page_index)
    }

    fn iter_tuples(&mut self) -> Box<dyn Iterator<Item = DbResult<Tuple>> + '_> {
        let total_pages = match self.num_pages() {
            Ok(n) => n,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        Box::new(HeapFileIter {
            file: self,
            page_index: 0,
            total_pages,
            slot_index: 0,
            current_page: None,
        })
    }
}

struct HeapFileIter<'a> {
    file: &'a mut HeapFile,
    page_index: u32,
    total_pages: u32,
    slot_index: u16,
    current_page: Option<Page>,
}

impl Iterator for HeapFileIter<'_> {
    type Item = DbResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_page.is_none() {
                if self.page_index >= self.total_pages {
                    return None;
                }
                match self.file.raw_read_page(self.page_index) {
                    Ok(page) => self.current_page = Some(page),
                    Err(e) => return Some(Err(e)),
                }
                self.slot_index = 0;
            }

            let page = self.current_page.as_ref().expect("page just populated");
            let num_slots = match page.header() {
                Ok(h) => h.num_slots,
                Err(e) => return Some(Err(e)),
            };

            if self.slot_index >= num_slots {
                self.current_page = None;
                self.page_index += 1;
                continue;
            }

            let slot_idx = self.slot_index;
            self.slot_index += 1;

            let slot = match page.read_slot(slot_idx) {
                Ok(s) => s,
                Err(e) => return Some(Err(e)),
            };
            if slot.is_empty() {
                continue;
            }
            let start = slot.offset as usize;
            let end = start + slot.len as usize;
            let decoded: Result<(Vec<types::Value>, usize), _> =
                decode_from_slice(&page.data[start..end], bincode_config());
            return Some(match decoded {
                Ok((values, _)) => Ok(Tuple::new(values)),
                Err(e) => Err(DbError::Storage(format!("deserialize tuple failed: {e}"))),
            });
        }
    }
}
