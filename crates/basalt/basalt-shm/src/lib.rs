//! Named, size-fixed shared memory regions backed by memory-mapped files.
//!
//! The logical region name is a filesystem path (put it on a tmpfs mount such
//! as `/dev/shm` for true shared memory). Lifecycle:
//!
//! - `ShmRegionMut::create`      — create fresh; an existing file is a collision
//! - `ShmRegionMut::create_or_truncate` — reclaim an abandoned region
//! - `ShmRegionMut::open` / `ShmRegion::open` — attach read-write / read-only
//! - drop                        — detach (other processes stay attached)
//! - `unlink`                    — destroy; idempotent
//!
//! `ftruncate` zero-fills new regions, so a freshly created mapping reads as
//! all-zero bytes.

use memmap2::{Mmap, MmapMut};
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

/// A writable mapping of a named region. Held by the single writer process.
pub struct ShmRegionMut {
    _file: File,
    mmap: MmapMut,
}

/// A read-only mapping of a named region. Any number may exist concurrently.
pub struct ShmRegion {
    _file: File,
    mmap: Mmap,
}

impl ShmRegionMut {
    /// Create a fresh region of exactly `size_bytes` and map it read-write.
    ///
    /// Fails with `AlreadyExists` if a region of that name is present — the
    /// caller decides whether to reclaim (`unlink` then retry) or abort.
    pub fn create<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Create or reclaim a region: truncates any existing file to zero and
    /// resizes to `size_bytes`, so stale contents can never leak through.
    pub fn create_or_truncate<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Attach to an existing region read-write.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}

impl ShmRegion {
    /// Attach to an existing region read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}

/// Destroy a named region. A second unlink of the same name is a no-op.
pub fn unlink<P: AsRef<Path>>(path: P) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("basalt_shm_{tag}_{}", std::process::id()))
    }

    #[test]
    fn create_collides_with_existing_region() {
        let path = test_path("collide");
        let _ = unlink(&path);

        let first = ShmRegionMut::create(&path, 128).expect("first create");
        let second = ShmRegionMut::create(&path, 128);
        assert_eq!(
            second.err().map(|e| e.kind()),
            Some(io::ErrorKind::AlreadyExists)
        );

        drop(first);
        unlink(&path).unwrap();
    }

    #[test]
    fn fresh_region_is_zero_filled() {
        let path = test_path("zeroed");
        let _ = unlink(&path);

        let mut region = ShmRegionMut::create(&path, 64).expect("create");
        let bytes = unsafe { std::slice::from_raw_parts(region.as_mut_ptr(), region.len()) };
        assert!(bytes.iter().all(|&b| b == 0));

        drop(region);
        unlink(&path).unwrap();
    }

    #[test]
    fn truncate_discards_stale_contents() {
        let path = test_path("reclaim");
        let _ = unlink(&path);

        {
            let mut region = ShmRegionMut::create(&path, 32).expect("create");
            unsafe { region.as_mut_ptr().write_bytes(0xAB, 32) };
        }
        let mut region = ShmRegionMut::create_or_truncate(&path, 32).expect("reclaim");
        let bytes = unsafe { std::slice::from_raw_parts(region.as_mut_ptr(), region.len()) };
        assert!(bytes.iter().all(|&b| b == 0));

        drop(region);
        unlink(&path).unwrap();
    }

    #[test]
    fn unlink_is_idempotent() {
        let path = test_path("unlink_twice");
        let _ = unlink(&path);

        let region = ShmRegionMut::create(&path, 16).expect("create");
        drop(region);

        unlink(&path).expect("first unlink");
        unlink(&path).expect("second unlink is a no-op");
    }

    #[test]
    fn open_missing_region_fails() {
        let path = test_path("missing");
        let _ = unlink(&path);
        assert!(ShmRegion::open(&path).is_err());
    }
}
