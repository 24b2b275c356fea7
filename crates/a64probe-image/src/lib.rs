//! In-memory code image.
//!
//! A [`CodeImage`] holds one or more byte segments mapped at absolute
//! addresses and serves the aligned little-endian reads the decoder and
//! the switch-table evaluator need. Reads outside any segment return
//! `None`; the callers decide whether that is terminal or fatal.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Image construction errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("could not read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("segment at {base:#x} overlaps an existing segment")]
    Overlap { base: u64 },
    #[error("segment at {base:#x} wraps the address space")]
    AddressWrap { base: u64 },
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// One contiguous byte range mapped at an absolute base address.
#[derive(Clone, Debug)]
pub struct Segment {
    base: u64,
    data: Vec<u8>,
}

impl Segment {
    /// Base address of the segment.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// One past the last mapped address.
    pub const fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    /// The mapped bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }
}

/// A set of non-overlapping code segments.
#[derive(Clone, Debug, Default)]
pub struct CodeImage {
    segments: Vec<Segment>,
}

impl CodeImage {
    /// An empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// An image with a single segment.
    pub fn with_segment(base: u64, data: Vec<u8>) -> Result<Self> {
        let mut image = Self::new();
        image.add_segment(base, data)?;
        Ok(image)
    }

    /// An image built from whole code words at `base`, little-endian.
    pub fn from_words(base: u64, words: &[u32]) -> Self {
        let data = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Self {
            segments: vec![Segment { base, data }],
        }
    }

    /// Map a flat binary file at `base`.
    pub fn from_file(path: &Path, base: u64) -> Result<Self> {
        let data = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_segment(base, data)
    }

    /// Map an additional segment, rejecting overlaps.
    pub fn add_segment(&mut self, base: u64, data: Vec<u8>) -> Result<()> {
        let Some(end) = base.checked_add(data.len() as u64) else {
            return Err(ImageError::AddressWrap { base });
        };
        if self
            .segments
            .iter()
            .any(|s| base < s.end() && s.base() < end)
        {
            return Err(ImageError::Overlap { base });
        }
        self.segments.push(Segment { base, data });
        Ok(())
    }

    /// The mapped segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True if `addr` falls inside a mapped segment.
    pub fn contains(&self, addr: u64) -> bool {
        self.segment_for(addr).is_some()
    }

    /// Base address of the segment containing `addr`. Used for rendering
    /// addresses as image-relative offsets in diagnostics.
    pub fn base_of(&self, addr: u64) -> Option<u64> {
        self.segment_for(addr).map(Segment::base)
    }

    /// `addr` as an offset from its containing segment's base.
    pub fn offset_of(&self, addr: u64) -> Option<u64> {
        self.base_of(addr).map(|base| addr - base)
    }

    /// Read the aligned 4-byte code word at `addr`.
    pub fn read_word(&self, addr: u64) -> Option<u32> {
        if addr % 4 != 0 {
            return None;
        }
        self.read_bytes::<4>(addr).map(u32::from_le_bytes)
    }

    /// Read a signed 32-bit value at `addr` (switch-table entries).
    pub fn read_i32(&self, addr: u64) -> Option<i32> {
        self.read_bytes::<4>(addr).map(i32::from_le_bytes)
    }

    fn read_bytes<const N: usize>(&self, addr: u64) -> Option<[u8; N]> {
        let seg = self.segment_for(addr)?;
        let offset = (addr - seg.base) as usize;
        let bytes = seg.data.get(offset..offset + N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    fn segment_for(&self, addr: u64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains(addr))
    }
}
