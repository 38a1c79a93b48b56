use std::{mem, ptr};

/// Header embedded at the front of every chunk in the arena.
///
/// ```text
///   ┌──────────────────────────┬──────────────────────────────┐
///   │  size | is_free          │                              │
///   │  forward | backward      │        size bytes            │
///   └──────────────────────────┴──────────────────────────────┘
///   ▲                          ▲                              ▲
///   header                     data (handed to the caller)    forward
/// ```
///
/// `forward` and `backward` link chunks in address order, so the list tiles
/// the arena without gaps.
///
/// Chunks hold exactly the bytes requested, so a header can start at any
/// address. Headers are only ever copied in and out with [`Chunk::load`] and
/// [`Chunk::store`], never referenced in place.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
  pub size: usize,
  pub is_free: bool,
  pub forward: *mut Chunk,
  pub backward: *mut Chunk,
}

pub const HEADER_SIZE: usize = mem::size_of::<Chunk>();

impl Chunk {
  /// Writes a new header at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be valid for `HEADER_SIZE + size` bytes.
  pub unsafe fn write(
    at: *mut u8,
    size: usize,
    is_free: bool,
    forward: *mut Chunk,
    backward: *mut Chunk,
  ) -> *mut Chunk {
    let chunk = at.cast::<Chunk>();

    unsafe {
      Chunk::store(
        chunk,
        Chunk {
          size,
          is_free,
          forward,
          backward,
        },
      );
    }

    chunk
  }

  /// Copies the header out of the arena.
  ///
  /// # Safety
  ///
  /// `chunk` must point at a live header.
  pub unsafe fn load(chunk: *const Chunk) -> Chunk {
    unsafe { chunk.read_unaligned() }
  }

  /// # Safety
  ///
  /// `chunk` must be valid for `HEADER_SIZE` bytes.
  pub unsafe fn store(
    chunk: *mut Chunk,
    header: Chunk,
  ) {
    unsafe { chunk.write_unaligned(header) }
  }

  /// Loads the header, applies `f` and stores it back.
  ///
  /// # Safety
  ///
  /// `chunk` must point at a live header.
  pub unsafe fn update(
    chunk: *mut Chunk,
    f: impl FnOnce(&mut Chunk),
  ) {
    unsafe {
      let mut header = Chunk::load(chunk);
      f(&mut header);
      Chunk::store(chunk, header);
    }
  }

  /// Address of the data region that follows the header.
  pub fn data(chunk: *mut Chunk) -> *mut u8 {
    chunk.cast::<u8>().wrapping_add(HEADER_SIZE)
  }

  /// Recovers the header from a pointer previously returned by [`Chunk::data`].
  ///
  /// # Safety
  ///
  /// `data` must have been produced by `Chunk::data` on a live header.
  pub unsafe fn from_data(data: *mut u8) -> *mut Chunk {
    unsafe { data.sub(HEADER_SIZE) }.cast::<Chunk>()
  }

  /// Whether the chunk can give up `size` bytes and still host a header plus
  /// at least one byte of data in the remainder.
  pub fn can_split(
    &self,
    size: usize,
  ) -> bool {
    self
      .size
      .checked_sub(size)
      .is_some_and(|rest| rest > HEADER_SIZE)
  }

  /// Shrinks `chunk` to exactly `size` bytes and carves a free chunk from the
  /// remainder right after it. Returns the new chunk.
  ///
  /// # Safety
  ///
  /// `chunk` must be a live header with `can_split(size)`.
  pub unsafe fn split(
    chunk: *mut Chunk,
    size: usize,
  ) -> *mut Chunk {
    unsafe {
      let mut header = Chunk::load(chunk);
      let rest = header.size - size - HEADER_SIZE;
      let at = Chunk::data(chunk).add(size);

      let remainder = Chunk::write(at, rest, true, header.forward, chunk);

      if !header.forward.is_null() {
        Chunk::update(header.forward, |next| next.backward = remainder);
      }

      header.size = size;
      header.forward = remainder;
      Chunk::store(chunk, header);

      remainder
    }
  }

  /// Merges the chunk following `chunk` into it, unlinking the absorbed
  /// header from the list.
  ///
  /// # Safety
  ///
  /// `chunk` must be a live header with a non-null `forward`.
  pub unsafe fn absorb_forward(chunk: *mut Chunk) {
    unsafe {
      let mut header = Chunk::load(chunk);
      let absorbed = header.forward;
      let taken = Chunk::load(absorbed);

      header.size += HEADER_SIZE + taken.size;
      header.forward = taken.forward;
      Chunk::store(chunk, header);

      if !taken.forward.is_null() {
        Chunk::update(taken.forward, |next| next.backward = chunk);
      }

      ptr::write_bytes(absorbed.cast::<u8>(), 0, HEADER_SIZE);
    }
  }
}
