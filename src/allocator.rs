use std::{marker::PhantomData, ptr, ptr::NonNull};

use tracing::{debug, trace, warn};

use crate::{
  arena::Arena,
  chunk::{Chunk, HEADER_SIZE},
  error::{AllocError, SUCCESS},
};

/// First-fit free-list allocator over a single mmap'd arena.
///
/// The arena is carved into an address-ordered, doubly linked list of
/// [`Chunk`]s that tiles it exactly. Allocation scans from the lowest address
/// for the first free chunk that fits and splits off the remainder; freeing
/// merges the chunk with free neighbors on both sides, so two adjacent chunks
/// are never both free at rest.
///
/// Every operation records its outcome in [`status`](Allocator::status), which
/// is the only report `free` has besides its `Result`.
///
/// # Thread Safety
///
/// `Allocator` is not `Sync`. Wrap it in [`SyncAllocator`](crate::SyncAllocator)
/// to share it between threads.
pub struct Allocator {
  arena: Option<Arena>,
  head: *mut Chunk,
  status: i32,
}

// The allocator owns its mapping outright; moving it to another thread moves
// the whole arena with it.
unsafe impl Send for Allocator {}

impl Allocator {
  pub const fn new() -> Self {
    Self {
      arena: None,
      head: ptr::null_mut(),
      status: SUCCESS,
    }
  }

  /// Maps an arena of at least `size` bytes and seeds it with one free chunk.
  ///
  /// Returns the actual arena size, rounded up to the page size.
  pub fn init(
    &mut self,
    size: usize,
  ) -> Result<usize, AllocError> {
    let result = self.try_init(size);
    self.record(result)
  }

  /// Unmaps the arena. Every pointer handed out before dangles afterwards.
  pub fn destroy(&mut self) -> Result<(), AllocError> {
    let result = self.try_destroy();
    self.record(result)
  }

  /// Allocates `size` bytes from the first free chunk large enough.
  ///
  /// The chunk keeps exactly `size` bytes when the rest can host another
  /// chunk. The returned pointer has no alignment guarantee. `OutOfMemory` is
  /// an ordinary outcome that leaves the arena untouched.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let result = self.try_allocate(size);
    self.record(result)
  }

  /// Returns a chunk to the arena and coalesces it with free neighbors.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer returned by [`allocate`](Self::allocate)
  /// on this arena that has not been freed since. Anything else, double frees
  /// included, is undefined behavior; the pointer is not validated.
  pub unsafe fn free(
    &mut self,
    address: *mut u8,
  ) -> Result<(), AllocError> {
    let result = unsafe { self.try_free(address) };
    self.record(result)
  }

  /// Outcome code of the most recent operation: `0` on success, otherwise
  /// the [`AllocError::code`] of its failure.
  pub fn status(&self) -> i32 {
    self.status
  }

  pub fn is_initialized(&self) -> bool {
    self.arena.is_some()
  }

  /// Size of the active arena, `0` when uninitialized.
  pub fn arena_size(&self) -> usize {
    self.arena.as_ref().map_or(0, Arena::size)
  }

  /// `[start, end)` of the active arena.
  pub fn bounds(&self) -> Option<(*mut u8, *mut u8)> {
    self
      .arena
      .as_ref()
      .map(|arena| (arena.start(), arena.end()))
  }

  /// Offset of `address` from the start of the arena, if it lies inside it.
  pub fn offset_of(
    &self,
    address: *const u8,
  ) -> Option<usize> {
    let arena = self.arena.as_ref()?;

    arena
      .contains(address)
      .then(|| address as usize - arena.start() as usize)
  }

  /// Walks the chunk list in address order.
  pub fn chunks(&self) -> Chunks<'_> {
    Chunks {
      current: self.head,
      base: self.bounds().map_or(ptr::null_mut(), |(start, _)| start),
      _allocator: PhantomData,
    }
  }

  pub fn stats(&self) -> ArenaStats {
    let mut stats = ArenaStats {
      arena_size: self.arena_size(),
      ..ArenaStats::default()
    };

    for chunk in self.chunks() {
      stats.chunks += 1;

      if chunk.is_free {
        stats.free_chunks += 1;
        stats.free_bytes += chunk.size;
        stats.largest_free = stats.largest_free.max(chunk.size);
      } else {
        stats.used_bytes += chunk.size;
      }
    }

    stats
  }

  fn record<T>(
    &mut self,
    result: Result<T, AllocError>,
  ) -> Result<T, AllocError> {
    self.status = match &result {
      Ok(_) => SUCCESS,
      Err(err) => err.code(),
    };

    result
  }

  fn try_init(
    &mut self,
    size: usize,
  ) -> Result<usize, AllocError> {
    if self.arena.is_some() {
      return Err(AllocError::AlreadyInitialized);
    }

    let arena = Arena::map(size)?;
    let arena_size = arena.size();

    self.head = unsafe {
      Chunk::write(
        arena.start(),
        arena_size - HEADER_SIZE,
        true,
        ptr::null_mut(),
        ptr::null_mut(),
      )
    };
    self.arena = Some(arena);

    debug!(size = arena_size - HEADER_SIZE, "seeded initial free chunk");

    Ok(arena_size)
  }

  fn try_destroy(&mut self) -> Result<(), AllocError> {
    let arena = self.arena.as_ref().ok_or(AllocError::Uninitialized)?;

    unsafe { arena.unmap()? };

    self.arena = None;
    self.head = ptr::null_mut();

    Ok(())
  }

  unsafe fn find_free_chunk(
    &self,
    size: usize,
  ) -> *mut Chunk {
    unsafe {
      let mut current = self.head;

      while !current.is_null() {
        let header = Chunk::load(current);
        trace!(chunk = ?current, size = header.size, is_free = header.is_free, "scanning");

        if header.is_free && header.size >= size {
          return current;
        }
        current = header.forward;
      }

      ptr::null_mut()
    }
  }

  fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let arena_size = self
      .arena
      .as_ref()
      .ok_or(AllocError::Uninitialized)?
      .size();

    if size == 0 {
      return Err(AllocError::BadArguments("allocation size must be non-zero"));
    }

    if size > arena_size - HEADER_SIZE {
      warn!(requested = size, arena_size, "allocation larger than the arena");
      return Err(AllocError::OutOfMemory { requested: size });
    }

    unsafe {
      let chunk = self.find_free_chunk(size);

      if chunk.is_null() {
        warn!(requested = size, "no free chunk large enough");
        return Err(AllocError::OutOfMemory { requested: size });
      }

      if Chunk::load(chunk).can_split(size) {
        let remainder = Chunk::split(chunk, size);
        let remainder_size = Chunk::load(remainder).size;
        debug!(chunk = ?chunk, size, remainder = remainder_size, "split chunk");
      }

      Chunk::update(chunk, |header| header.is_free = false);

      let chunk_size = Chunk::load(chunk).size;
      debug!(chunk = ?chunk, requested = size, size = chunk_size, "allocated chunk");

      NonNull::new(Chunk::data(chunk)).ok_or(AllocError::OutOfMemory { requested: size })
    }
  }

  unsafe fn try_free(
    &mut self,
    address: *mut u8,
  ) -> Result<(), AllocError> {
    let arena = self.arena.as_ref().ok_or(AllocError::Uninitialized)?;

    if address.is_null() {
      return Err(AllocError::BadArguments("cannot free a null pointer"));
    }

    debug_assert!(arena.contains(address), "freed pointer lies outside the arena");

    unsafe {
      let chunk = Chunk::from_data(address);
      Chunk::update(chunk, |header| header.is_free = true);

      let forward = Chunk::load(chunk).forward;
      if !forward.is_null() && Chunk::load(forward).is_free {
        Chunk::absorb_forward(chunk);
        let merged = Chunk::load(chunk).size;
        debug!(chunk = ?chunk, size = merged, "merged forward");
      }

      let backward = Chunk::load(chunk).backward;
      if !backward.is_null() && Chunk::load(backward).is_free {
        Chunk::absorb_forward(backward);
        let merged = Chunk::load(backward).size;
        debug!(chunk = ?backward, size = merged, "merged backward");
      }
    }

    Ok(())
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for Allocator {
  fn drop(&mut self) {
    if let Some(arena) = self.arena.take() {
      if let Err(err) = unsafe { arena.unmap() } {
        warn!(error = %err, "leaking arena on drop");
      }
    }
  }
}

/// Snapshot of one chunk, as seen by [`Allocator::chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
  /// Offset of the header from the start of the arena.
  pub offset: usize,
  /// Usable bytes after the header.
  pub size: usize,
  pub is_free: bool,
}

impl ChunkInfo {
  /// Offset of the data region, i.e. of the pointer `allocate` hands out.
  pub fn data_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// Header plus data.
  pub fn span(&self) -> usize {
    HEADER_SIZE + self.size
  }
}

pub struct Chunks<'a> {
  current: *mut Chunk,
  base: *mut u8,
  _allocator: PhantomData<&'a Allocator>,
}

impl Iterator for Chunks<'_> {
  type Item = ChunkInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    unsafe {
      let chunk = Chunk::load(self.current);
      let info = ChunkInfo {
        offset: self.current as usize - self.base as usize,
        size: chunk.size,
        is_free: chunk.is_free,
      };

      self.current = chunk.forward;

      Some(info)
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
  pub arena_size: usize,
  pub chunks: usize,
  pub free_chunks: usize,
  pub free_bytes: usize,
  pub used_bytes: usize,
  pub largest_free: usize,
}

impl ArenaStats {
  /// Bytes taken by chunk headers.
  pub fn overhead(&self) -> usize {
    self.chunks * HEADER_SIZE
  }
}
