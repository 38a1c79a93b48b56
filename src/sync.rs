use std::ptr::NonNull;

use parking_lot::{Mutex, MutexGuard, const_mutex};

use crate::{
  allocator::{Allocator, ArenaStats},
  error::AllocError,
};

/// An [`Allocator`] behind a `parking_lot` mutex, so one arena can be shared
/// between threads. Each call holds the lock for its full duration.
pub struct SyncAllocator {
  inner: Mutex<Allocator>,
}

impl SyncAllocator {
  pub const fn new() -> Self {
    Self {
      inner: const_mutex(Allocator::new()),
    }
  }

  pub fn init(
    &self,
    size: usize,
  ) -> Result<usize, AllocError> {
    self.inner.lock().init(size)
  }

  pub fn destroy(&self) -> Result<(), AllocError> {
    self.inner.lock().destroy()
  }

  pub fn allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.inner.lock().allocate(size)
  }

  /// # Safety
  ///
  /// Same contract as [`Allocator::free`].
  pub unsafe fn free(
    &self,
    address: *mut u8,
  ) -> Result<(), AllocError> {
    unsafe { self.inner.lock().free(address) }
  }

  pub fn status(&self) -> i32 {
    self.inner.lock().status()
  }

  pub fn stats(&self) -> ArenaStats {
    self.inner.lock().stats()
  }

  /// Locks the allocator for a sequence of operations that must not
  /// interleave with other threads, e.g. an operation followed by a
  /// [`status`](Allocator::status) read.
  pub fn lock(&self) -> MutexGuard<'_, Allocator> {
    self.inner.lock()
  }
}

impl Default for SyncAllocator {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use super::*;
  use crate::{chunk::HEADER_SIZE, config::page_size};

  #[test]
  fn test_shared_between_threads() {
    let allocator = Arc::new(SyncAllocator::new());
    let arena_size = allocator.init(16 * page_size()).unwrap();

    let handles: Vec<_> = (0..4)
      .map(|i| {
        let allocator = Arc::clone(&allocator);

        thread::spawn(move || {
          for round in 0..50 {
            let size = 8 * (i + 1) + round;
            let address = allocator.allocate(size).unwrap();

            unsafe {
              address.as_ptr().write_bytes(i as u8, size);
              assert_eq!(*address.as_ptr().add(size - 1), i as u8);
              allocator.free(address.as_ptr()).unwrap();
            }
          }
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }

    let stats = allocator.stats();
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.free_bytes, arena_size - HEADER_SIZE);

    allocator.destroy().unwrap();
  }

  #[test]
  fn test_lock_reads_status_atomically() {
    let allocator = SyncAllocator::new();

    let mut guard = allocator.lock();
    assert!(guard.allocate(8).is_err());
    assert_eq!(guard.status(), crate::error::ERR_UNINITIALIZED);
  }
}
