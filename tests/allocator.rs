use std::ptr::{self, NonNull};

use marena::{
  AllocError, Allocator, ChunkInfo, HEADER_SIZE, MAX_ARENA_SIZE,
  error::{ERR_BAD_ARGUMENTS, ERR_OUT_OF_MEMORY, ERR_UNINITIALIZED, SUCCESS},
  page_size,
};

fn chunks(allocator: &Allocator) -> Vec<ChunkInfo> {
  allocator.chunks().collect()
}

fn assert_invariants(allocator: &Allocator) {
  let chunks = chunks(allocator);

  let mut offset = 0;
  for chunk in &chunks {
    assert_eq!(chunk.offset, offset, "gap or overlap in {chunks:?}");
    offset += chunk.span();
  }
  assert_eq!(offset, allocator.arena_size());

  for pair in chunks.windows(2) {
    assert!(!(pair[0].is_free && pair[1].is_free), "adjacent free chunks: {pair:?}");
  }
}

/// Small xorshift so allocation sequences are reproducible.
struct Sequence(u64);

impl Sequence {
  fn next(&mut self) -> u64 {
    self.0 ^= self.0 << 13;
    self.0 ^= self.0 >> 7;
    self.0 ^= self.0 << 17;
    self.0
  }
}

#[test]
fn test_init_rounds_to_page() {
  let page = page_size();

  for requested in [1, 17, page - 1, page, page + 1, 5 * page - 3] {
    let mut allocator = Allocator::new();
    let size = allocator.init(requested).unwrap();

    assert_eq!(size % page, 0);
    assert!(size >= requested);
    assert_eq!(allocator.arena_size(), size);

    let (start, end) = allocator.bounds().unwrap();
    assert_eq!(end as usize - start as usize, size);
  }
}

#[test]
fn test_init_rejects_bad_sizes() {
  let mut allocator = Allocator::new();

  assert!(matches!(allocator.init(0), Err(AllocError::BadArguments(_))));
  assert_eq!(allocator.status(), ERR_BAD_ARGUMENTS);
  assert!(!allocator.is_initialized());

  assert!(matches!(
    allocator.init(MAX_ARENA_SIZE + 1),
    Err(AllocError::BadArguments(_))
  ));
  assert_eq!(allocator.status(), ERR_BAD_ARGUMENTS);
  assert!(!allocator.is_initialized());
}

#[test]
fn test_misuse_before_init_and_after_destroy() {
  let mut allocator = Allocator::new();

  for _ in 0..2 {
    assert!(matches!(allocator.allocate(16), Err(AllocError::Uninitialized)));
    assert_eq!(allocator.status(), ERR_UNINITIALIZED);

    let freed = unsafe { allocator.free(ptr::null_mut()) };
    assert!(matches!(freed, Err(AllocError::Uninitialized)));
    assert_eq!(allocator.status(), ERR_UNINITIALIZED);

    assert!(matches!(allocator.destroy(), Err(AllocError::Uninitialized)));
    assert_eq!(allocator.status(), ERR_UNINITIALIZED);

    allocator.init(page_size()).unwrap();
    allocator.allocate(16).unwrap();
    allocator.destroy().unwrap();
    assert_eq!(allocator.status(), SUCCESS);
  }
}

#[test]
fn test_round_trip_restores_arena() {
  let mut allocator = Allocator::new();
  let size = allocator.init(4 * page_size()).unwrap();
  let initial = chunks(&allocator);

  for n in [1, 8, 16, 100, 1000, size / 2, size - 2 * HEADER_SIZE, size - HEADER_SIZE] {
    let address = allocator.allocate(n).unwrap();
    assert_invariants(&allocator);

    unsafe { allocator.free(address.as_ptr()).unwrap() };
    assert_eq!(chunks(&allocator), initial, "allocate({n}) then free");
  }
}

#[test]
fn test_coalescing_three_chunks() {
  let mut allocator = Allocator::new();
  allocator.init(page_size()).unwrap();
  let free_before = allocator.stats().free_bytes;

  let a = allocator.allocate(16).unwrap();
  let b = allocator.allocate(16).unwrap();
  let c = allocator.allocate(16).unwrap();

  unsafe {
    allocator.free(a.as_ptr()).unwrap();
    allocator.free(c.as_ptr()).unwrap();
  }

  let regions = chunks(&allocator);
  assert_eq!(regions.len(), 3);
  assert!(regions[0].is_free);
  assert!(!regions[1].is_free);
  assert!(regions[2].is_free);
  assert_eq!(regions[0].size, 16);
  assert_invariants(&allocator);

  unsafe { allocator.free(b.as_ptr()).unwrap() };

  let regions = chunks(&allocator);
  assert_eq!(regions.len(), 1);
  assert!(regions[0].is_free);
  assert_eq!(regions[0].size, free_before);
  assert_eq!(allocator.stats().free_bytes, free_before);
}

#[test]
fn test_exhaustion_leaves_arena_unchanged() {
  let mut allocator = Allocator::new();
  let size = allocator.init(page_size()).unwrap();
  let before = chunks(&allocator);

  let result = allocator.allocate(size - HEADER_SIZE + 1);
  assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
  assert_eq!(allocator.status(), ERR_OUT_OF_MEMORY);
  assert_eq!(chunks(&allocator), before);

  // Fragmented: plenty of free bytes in total, but no single chunk fits.
  let blocks: Vec<NonNull<u8>> = (0..8).map(|_| allocator.allocate(256).unwrap()).collect();
  for block in blocks.iter().step_by(2) {
    unsafe { allocator.free(block.as_ptr()).unwrap() };
  }

  let tail = chunks(&allocator).last().unwrap().size;
  let before = chunks(&allocator);

  assert!(allocator.allocate(tail.max(256) + 8).is_err());
  assert_eq!(allocator.status(), ERR_OUT_OF_MEMORY);
  assert_eq!(chunks(&allocator), before);
}

#[test]
fn test_whole_arena_allocation() {
  let mut allocator = Allocator::new();
  let size = allocator.init(page_size()).unwrap();

  let address = allocator.allocate(size - HEADER_SIZE).unwrap();
  assert_eq!(allocator.offset_of(address.as_ptr()), Some(HEADER_SIZE));
  assert!(matches!(allocator.allocate(1), Err(AllocError::OutOfMemory { .. })));

  unsafe {
    address.as_ptr().write_bytes(0x5A, size - HEADER_SIZE);
    allocator.free(address.as_ptr()).unwrap();
  }

  assert_eq!(allocator.stats().free_bytes, size - HEADER_SIZE);
}

#[test]
fn test_allocation_is_deterministic() {
  let sizes = [24, 7, 300, 16, 1, 64, 1024, 12];

  let run = || {
    let mut allocator = Allocator::new();
    allocator.init(2 * page_size()).unwrap();

    let mut offsets = Vec::new();
    let mut live = Vec::new();

    for (i, &size) in sizes.iter().enumerate() {
      let address = allocator.allocate(size).unwrap();
      offsets.push(allocator.offset_of(address.as_ptr()).unwrap());
      live.push(address);

      if i % 3 == 2 {
        let victim = live.remove(0);
        unsafe { allocator.free(victim.as_ptr()).unwrap() };
      }
    }

    offsets
  };

  assert_eq!(run(), run());
}

#[test]
fn test_random_sequence_keeps_invariants() {
  let mut allocator = Allocator::new();
  allocator.init(8 * page_size()).unwrap();

  let mut sequence = Sequence(0x2545_F491_4F6C_DD1D);
  let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

  for step in 0..2000 {
    let roll = sequence.next();

    if roll % 3 != 0 || live.is_empty() {
      let size = (sequence.next() % 512) as usize + 1;
      let fill = step as u8;

      match allocator.allocate(size) {
        Ok(address) => {
          unsafe { address.as_ptr().write_bytes(fill, size) };
          live.push((address, size, fill));
        }
        Err(AllocError::OutOfMemory { .. }) => assert_eq!(allocator.status(), ERR_OUT_OF_MEMORY),
        Err(err) => panic!("unexpected error: {err}"),
      }
    } else {
      let index = (sequence.next() % live.len() as u64) as usize;
      let (address, size, fill) = live.swap_remove(index);

      unsafe {
        let bytes = std::slice::from_raw_parts(address.as_ptr(), size);
        assert!(bytes.iter().all(|&b| b == fill), "chunk contents clobbered");

        allocator.free(address.as_ptr()).unwrap();
      }
    }

    assert_invariants(&allocator);
  }

  for (address, _, _) in live.drain(..) {
    unsafe { allocator.free(address.as_ptr()).unwrap() };
  }

  assert_eq!(chunks(&allocator).len(), 1);
  assert_eq!(allocator.stats().free_bytes, allocator.arena_size() - HEADER_SIZE);
}

#[test]
fn test_independent_arenas() {
  let mut first = Allocator::new();
  let mut second = Allocator::new();
  first.init(page_size()).unwrap();
  second.init(page_size()).unwrap();

  let a = first.allocate(32).unwrap();
  let b = second.allocate(32).unwrap();

  assert_ne!(a, b);
  assert!(first.offset_of(b.as_ptr()).is_none());
  assert!(second.offset_of(a.as_ptr()).is_none());

  first.destroy().unwrap();
  assert_eq!(second.stats().used_bytes, 32);
}
