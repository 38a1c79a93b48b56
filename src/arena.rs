use std::ptr::{self, NonNull};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use tracing::{info, warn};

use crate::{
  align_to,
  config::{MAX_ARENA_SIZE, page_size},
  error::AllocError,
};

/// A private, anonymous, zero-filled mapping obtained with `mmap(2)`.
///
/// The mapping is not released on drop; [`Arena::unmap`] is called
/// explicitly by the owner so a failed `munmap` can leave the arena in place.
pub struct Arena {
  start: NonNull<u8>,
  size: usize,
}

impl Arena {
  /// Maps an arena of at least `requested` bytes, rounded up to the page size.
  pub fn map(requested: usize) -> Result<Self, AllocError> {
    if requested == 0 {
      return Err(AllocError::BadArguments("arena size must be non-zero"));
    }

    if requested > MAX_ARENA_SIZE {
      return Err(AllocError::BadArguments("arena size exceeds MAX_ARENA_SIZE"));
    }

    let page_size = page_size();
    let size = align_to!(requested, page_size);

    info!(requested, page_size, size, "mapping arena");

    let address = unsafe {
      mmap(
        ptr::null_mut(),
        size,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let err = AllocError::last_os_error("mmap");
      warn!(size, error = %err, "arena mapping failed");
      return Err(err);
    }

    let start = NonNull::new(address.cast::<u8>()).ok_or_else(|| AllocError::SyscallFailed {
      call: "mmap",
      source: std::io::Error::other("mmap returned a null mapping"),
    })?;

    let arena = Self { start, size };

    info!(start = ?arena.start(), end = ?arena.end(), "arena mapped");

    Ok(arena)
  }

  /// Wraps a region this process did not necessarily map.
  ///
  /// # Safety
  ///
  /// Only [`Arena::unmap`] failure paths may be exercised on it.
  #[cfg(test)]
  pub(crate) unsafe fn from_raw_parts(
    start: NonNull<u8>,
    size: usize,
  ) -> Self {
    Self { start, size }
  }

  pub fn start(&self) -> *mut u8 {
    self.start.as_ptr()
  }

  /// One past the last byte of the arena.
  pub fn end(&self) -> *mut u8 {
    self.start.as_ptr().wrapping_add(self.size)
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    let address = address as usize;
    address >= self.start() as usize && address < self.end() as usize
  }

  /// Returns the mapping to the OS.
  ///
  /// # Safety
  ///
  /// On success every pointer into the arena dangles and `self` must not be
  /// used again. On failure the mapping is left untouched.
  pub unsafe fn unmap(&self) -> Result<(), AllocError> {
    info!(start = ?self.start(), size = self.size, "unmapping arena");

    if unsafe { munmap(self.start().cast::<c_void>(), self.size) } != 0 {
      let err = AllocError::last_os_error("munmap");
      warn!(error = %err, "arena unmapping failed");
      return Err(err);
    }

    Ok(())
  }
}
