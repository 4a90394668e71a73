use std::{io, ptr, slice};

use crate::error::BackingStoreError;

/// Page size of the host, used to round region sizes.
pub fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size > 0 { size as usize } else { 4096 }
}

/// Raw memory a region is carved from: `len` zeroed, read/write bytes that
/// stay at a fixed address for the lifetime of the value.
pub trait Backing: Sized {
  fn reserve(len: usize) -> Result<Self, BackingStoreError>;

  fn as_slice(&self) -> &[u8];

  fn as_mut_slice(&mut self) -> &mut [u8];

  /// Base address of the region, for translating raw addresses to offsets.
  fn as_ptr(&self) -> *const u8;

  fn as_mut_ptr(&mut self) -> *mut u8;

  fn len(&self) -> usize {
    self.as_slice().len()
  }
}

/// Anonymous private mapping obtained with `mmap(2)`.
///
/// The kernel hands out zero-filled, page-aligned pages; the mapping is
/// returned with `munmap(2)` on drop.
pub struct MmapBacking {
  base: *mut u8,
  len: usize,
}

impl Backing for MmapBacking {
  fn reserve(len: usize) -> Result<Self, BackingStoreError> {
    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return Err(BackingStoreError {
        size: len,
        source: io::Error::last_os_error(),
      });
    }

    Ok(Self {
      base: address as *mut u8,
      len,
    })
  }

  fn as_slice(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.base, self.len) }
  }

  fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base, self.len) }
  }

  fn as_ptr(&self) -> *const u8 {
    self.base
  }

  fn as_mut_ptr(&mut self) -> *mut u8 {
    self.base
  }

  fn len(&self) -> usize {
    self.len
  }
}

impl Drop for MmapBacking {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.cast(), self.len);
    }
  }
}

/// Zeroed buffer on the process heap. Payload addresses are only 8-byte
/// aligned, which is all the arena promises.
pub struct VecBacking {
  words: Vec<u64>,
}

impl Backing for VecBacking {
  fn reserve(len: usize) -> Result<Self, BackingStoreError> {
    let count = len.div_ceil(size_of::<u64>());
    let mut words = Vec::new();

    words
      .try_reserve_exact(count)
      .map_err(|err| BackingStoreError {
        size: len,
        source: io::Error::new(io::ErrorKind::OutOfMemory, err),
      })?;
    words.resize(count, 0);

    Ok(Self { words })
  }

  fn as_slice(&self) -> &[u8] {
    let len = self.words.len() * size_of::<u64>();
    unsafe { slice::from_raw_parts(self.words.as_ptr().cast(), len) }
  }

  fn as_mut_slice(&mut self) -> &mut [u8] {
    let len = self.words.len() * size_of::<u64>();
    unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr().cast(), len) }
  }

  fn as_ptr(&self) -> *const u8 {
    self.words.as_ptr().cast()
  }

  fn as_mut_ptr(&mut self) -> *mut u8 {
    self.words.as_mut_ptr().cast()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_size_is_power_of_two() {
    assert!(page_size().is_power_of_two());
  }

  #[test]
  fn test_mmap_backing_is_zeroed_and_writable() {
    let len = page_size() * 2;
    let mut backing = MmapBacking::reserve(len).unwrap();

    assert_eq!(backing.len(), len);
    assert!(backing.as_slice().iter().all(|&b| b == 0));

    backing.as_mut_slice()[len - 1] = 0xAB;
    assert_eq!(backing.as_slice()[len - 1], 0xAB);
    assert_eq!(backing.as_mut_ptr() as usize % page_size(), 0);
    assert_eq!(backing.as_ptr(), backing.as_mut_ptr().cast_const());
  }

  #[test]
  fn test_mmap_backing_reports_os_failure() {
    let err = MmapBacking::reserve(0).err().unwrap();

    assert_eq!(err.size, 0);
  }

  #[test]
  fn test_vec_backing_is_zeroed_and_word_aligned() {
    let mut backing = VecBacking::reserve(4096).unwrap();

    assert_eq!(backing.len(), 4096);
    assert!(backing.as_slice().iter().all(|&b| b == 0));
    assert_eq!(backing.as_mut_ptr() as usize % 8, 0);
    assert_eq!(backing.as_ptr(), backing.as_slice().as_ptr());
  }
}
