use std::io::Read;

use marena::{Allocator, HEADER_SIZE, page_size};
use tracing_subscriber::EnvFilter;

/// Waits until the user presses ENTER when `--step` was given.
/// Useful when you want to inspect the mapping with tools like `pmap` or
/// `gdb` between steps.
fn block_until_enter_pressed(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

/// Prints every chunk of the arena in address order.
fn print_chunks(
  label: &str,
  allocator: &Allocator,
) {
  println!("[{label}]");

  for chunk in allocator.chunks() {
    println!(
      "    offset {:>6}  size {:>6}  {}",
      chunk.offset,
      chunk.size,
      if chunk.is_free { "free" } else { "used" }
    );
  }

  let stats = allocator.stats();
  println!(
    "    {} chunks, {} free bytes, {} used bytes, largest free {}",
    stats.chunks, stats.free_bytes, stats.used_bytes, stats.largest_free
  );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let step = std::env::args().any(|arg| arg == "--step");
  let mut allocator = Allocator::new();

  // --------------------------------------------------------------------
  // 1) Map a one-page arena. The request is rounded up to the page size.
  // --------------------------------------------------------------------
  let arena_size = allocator.init(1)?;
  println!(
    "\n[1] Requested 1 byte, got an arena of {} bytes (page size {}, header {})",
    arena_size,
    page_size(),
    HEADER_SIZE
  );
  print_chunks("1", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 2) Allocate three 16 byte chunks. Each one is split off the free tail.
  // --------------------------------------------------------------------
  let a = allocator.allocate(16)?;
  let b = allocator.allocate(16)?;
  let c = allocator.allocate(16)?;

  unsafe {
    a.as_ptr().write_bytes(0xAA, 16);
    b.as_ptr().write_bytes(0xBB, 16);
    c.as_ptr().write_bytes(0xCC, 16);
  }

  println!("\n[2] Allocated A = {a:?}, B = {b:?}, C = {c:?}");
  print_chunks("2", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 3) Free A and C. C merges with the free tail, A stays a hole.
  // --------------------------------------------------------------------
  unsafe {
    allocator.free(a.as_ptr())?;
    allocator.free(c.as_ptr())?;
  }

  println!("\n[3] Freed A and C");
  print_chunks("3", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 4) A small request lands in the hole left by A (first fit).
  // --------------------------------------------------------------------
  let d = allocator.allocate(8)?;
  println!(
    "\n[4] Allocated 8 bytes at {d:?}: {}",
    if d == a { "reused A's chunk" } else { "placed elsewhere" }
  );
  print_chunks("4", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 5) Ask for more than the arena holds. This fails without side effects.
  // --------------------------------------------------------------------
  match allocator.allocate(arena_size) {
    Ok(address) => println!("\n[5] Unexpectedly allocated {address:?}"),
    Err(err) => println!(
      "\n[5] Allocation of {arena_size} bytes failed: {err} (status {})",
      allocator.status()
    ),
  }
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 6) Free everything. The arena collapses back into one free chunk.
  // --------------------------------------------------------------------
  unsafe {
    allocator.free(d.as_ptr())?;
    allocator.free(b.as_ptr())?;
  }

  println!("\n[6] Freed B and D");
  print_chunks("6", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 7) Unmap the arena. Every pointer above now dangles.
  // --------------------------------------------------------------------
  allocator.destroy()?;
  println!("\n[7] Arena destroyed, status {}", allocator.status());

  Ok(())
}
