use std::sync::OnceLock;

/// Largest arena size, in bytes, that [`Allocator::init`](crate::Allocator::init)
/// accepts. Requests above it fail with `BadArguments`.
pub const MAX_ARENA_SIZE: usize = 0x7FFF_FFFF;

/// Used only when `sysconf` cannot report a page size.
const FALLBACK_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Returns the platform page size. Arena sizes are always a multiple of it.
pub fn page_size() -> usize {
  *PAGE_SIZE.get_or_init(|| {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    if size > 0 {
      size as usize
    } else {
      tracing::warn!(fallback = FALLBACK_PAGE_SIZE, "sysconf(_SC_PAGESIZE) failed");
      FALLBACK_PAGE_SIZE
    }
  })
}
