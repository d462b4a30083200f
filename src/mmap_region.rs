// A file-backed, read-write memory mapping with grow-on-demand sizing.
//
// Mirrors the mmap lifecycle the teacher's binary trigram index uses
// (open file, `MmapOptions::map`, rebuild on resize) but for a single
// read-write region rather than a read-only index blob, and borrows the
// teacher's binary symbol database's fixed header idea (magic + explicit
// length field) rather than a sentinel byte: MessagePack payloads routinely
// contain `0x00` bytes in the middle of perfectly valid content (a small
// positive integer, or any of the raw bytes inside an f32/f64), so a
// first-zero-byte scan would silently truncate real data.

use crate::error::Result;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"IKV1";
const HEADER_SIZE: usize = 12; // 4-byte magic + 8-byte little-endian content length

pub struct MmapRegion {
    path: PathBuf,
    file: File,
    mmap: MmapMut,
}

impl MmapRegion {
    /// Open (creating if absent) the file at `path` and map at least
    /// `initial_len` bytes, zero-extending the file if it is shorter. A
    /// freshly created (all-zero) file gets its header initialized to an
    /// empty content block.
    pub fn open(path: impl AsRef<Path>, initial_len: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let initial_len = initial_len.max(HEADER_SIZE as u64);
        let current_len = file.metadata()?.len();
        if current_len < initial_len {
            file.set_len(initial_len)?;
        }

        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        let mut region = Self { path, file, mmap };
        if &region.mmap[0..4] != MAGIC {
            region.write_header(0);
        }
        Ok(region)
    }

    fn write_header(&mut self, content_len: u64) {
        self.mmap[0..4].copy_from_slice(MAGIC);
        self.mmap[4..HEADER_SIZE].copy_from_slice(&content_len.to_le_bytes());
    }

    /// Total mapped length, header included.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() <= HEADER_SIZE
    }

    /// Bytes available for content after the header.
    pub fn capacity(&self) -> usize {
        self.mmap.len().saturating_sub(HEADER_SIZE)
    }

    /// Length of the currently written content block, per the header.
    pub fn content_size(&self) -> usize {
        u64::from_le_bytes(self.mmap[4..HEADER_SIZE].try_into().unwrap()) as usize
    }

    /// The current content block (excludes the header).
    pub fn content_bytes(&self) -> &[u8] {
        let size = self.content_size();
        &self.mmap[HEADER_SIZE..HEADER_SIZE + size]
    }

    /// Grow, if needed, so `capacity() >= content_len`, doubling from the
    /// current length (or `initial_size` if that's larger) until it fits.
    pub fn ensure_capacity(&mut self, content_len: usize, initial_size: u64) -> Result<()> {
        if self.capacity() >= content_len {
            return Ok(());
        }
        let target = HEADER_SIZE as u64 + content_len as u64;
        let mut new_len = (self.mmap.len() as u64).max(HEADER_SIZE as u64 + initial_size);
        while new_len < target {
            new_len *= 2;
        }
        self.grow(new_len)
    }

    /// Write `bytes` as the new content block, zero-filling any leftover
    /// capacity and updating the header length. Panics if `capacity()` is
    /// smaller than `bytes.len()` -- call `ensure_capacity` first.
    pub fn write_content(&mut self, bytes: &[u8]) {
        assert!(self.capacity() >= bytes.len(), "content exceeds capacity");
        let start = HEADER_SIZE;
        self.mmap[start..start + bytes.len()].copy_from_slice(bytes);
        for b in &mut self.mmap[start + bytes.len()..] {
            *b = 0;
        }
        self.write_header(bytes.len() as u64);
    }

    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    /// Grow the region to at least `new_len` total bytes: flush, unmap,
    /// extend the file (zero-filling), and remap. Never shrinks.
    pub fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len <= self.mmap.len() as u64 {
            return Ok(());
        }
        self.flush()?;
        self.file.set_len(new_len)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&self.file)? };
        self.mmap = mmap;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn opens_and_zero_extends_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let region = MmapRegion::open(&path, 4096).unwrap();
        assert_eq!(region.len(), 4096);
        assert_eq!(region.content_size(), 0);
        assert!(region.content_bytes().is_empty());
    }

    #[test]
    fn write_content_updates_header_and_is_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let mut region = MmapRegion::open(&path, 64).unwrap();
        region.write_content(&[1, 2, 3, 0, 4]); // an embedded zero byte
        assert_eq!(region.content_size(), 5);
        assert_eq!(region.content_bytes(), &[1, 2, 3, 0, 4]);
    }

    #[test]
    fn ensure_capacity_grows_only_when_needed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let mut region = MmapRegion::open(&path, 16).unwrap();
        let len_before = region.len();
        region.ensure_capacity(1, 16).unwrap();
        assert_eq!(region.len(), len_before);

        region.ensure_capacity(1024, 16).unwrap();
        assert!(region.len() as u64 >= 1024 + HEADER_SIZE as u64);
    }

    #[test]
    fn grow_never_shrinks_and_preserves_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let mut region = MmapRegion::open(&path, 16).unwrap();
        region.write_content(&[9, 9, 9, 9]);
        region.grow(256).unwrap();
        assert_eq!(region.len(), 256);
        assert_eq!(region.content_bytes(), &[9, 9, 9, 9]);
    }

    #[test]
    fn reopening_preserves_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let mut region = MmapRegion::open(&path, 64).unwrap();
            region.write_content(b"abc");
            region.flush().unwrap();
        }
        let region = MmapRegion::open(&path, 64).unwrap();
        assert_eq!(region.content_bytes(), b"abc");
    }

    proptest::proptest! {
        #[test]
        fn len_never_decreases_across_a_sequence_of_grows(
            steps in proptest::collection::vec(16u64..4096, 1..10)
        ) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("store.db");
            let mut region = MmapRegion::open(&path, 16).unwrap();
            let mut last_len = region.len() as u64;
            proptest::prop_assert!(last_len >= 16);
            for step in steps {
                let target = last_len + step;
                region.grow(target).unwrap();
                proptest::prop_assert!(region.len() as u64 >= last_len);
                last_len = region.len() as u64;
            }
        }
    }
}
