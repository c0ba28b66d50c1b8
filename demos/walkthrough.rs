use std::ptr::NonNull;

use rfreelist::{ArenaProvider, Config, FreeListAllocator};

/// Builds the allocator the demo runs against: OS-backed where `mmap` exists, a
/// build-time buffer everywhere else.
#[cfg(unix)]
fn run() {
  let config = Config::dynamic();
  println!("Using an mmap-backed arena of {} bytes", config.capacity);
  walkthrough(FreeListAllocator::new(rfreelist::MmapArena::new(), config));
}

#[cfg(not(unix))]
fn run() {
  let mut buffer = rfreelist::StaticBuffer::<{ rfreelist::STATIC_CAPACITY }>::new();
  println!("Using a static arena of {} bytes", rfreelist::STATIC_CAPACITY);
  walkthrough(FreeListAllocator::new(
    rfreelist::StaticArena::new(&mut buffer),
    Config::default(),
  ));
}

/// Prints the directory the same way `log_state` logs it.
fn print_memory_state<P: ArenaProvider>(allocator: &FreeListAllocator<P>) {
  println!("\n=== Memory State ===");
  for block in allocator.dump_state() {
    println!("{block}");
  }

  let stats = allocator.stats();
  println!("Total free: {} bytes", stats.total_free);
  println!("Total used: {} bytes", stats.total_used);
  println!("===================\n");
}

fn release<P: ArenaProvider>(
  allocator: &mut FreeListAllocator<P>,
  ptr: Option<NonNull<u8>>,
) {
  let Some(ptr) = ptr else {
    return;
  };

  match allocator.release(ptr.as_ptr()) {
    Ok(()) => println!("Released {ptr:p}"),
    Err(err) => println!("Release reported: {err}"),
  }
}

fn walkthrough<P: ArenaProvider>(mut allocator: FreeListAllocator<P>) {
  if let Err(err) = allocator.initialize() {
    println!("Could not initialize the allocator: {err}");
    return;
  }

  // --------------------------------------------------------------------
  // 1) Basic allocation: 40, 100, 40 and 40 bytes.
  // --------------------------------------------------------------------
  println!("--- Test 1: Basic Allocation ---");
  let a = allocator.allocate(size_of::<i32>() * 10).ok();
  let b = allocator.allocate(100).ok();
  let c = allocator.allocate(size_of::<f64>() * 5).ok();
  let e = allocator.allocate(size_of::<i32>() * 10).ok();
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 2) Write into the blocks to show they are usable.
  // --------------------------------------------------------------------
  println!("--- Test 2: Using Allocated Memory ---");
  if let Some(a) = a {
    let ints = a.cast::<i32>().as_ptr();
    unsafe {
      ints.write(42);
      ints.add(9).write(99);
      println!("a[0] = {}, a[9] = {}", ints.read(), ints.add(9).read());
    }
  }
  if let Some(b) = b {
    let message = b"Hello from custom allocator!";
    unsafe {
      b.as_ptr().copy_from_nonoverlapping(message.as_ptr(), message.len());
      let text = std::slice::from_raw_parts(b.as_ptr(), message.len());
      println!("b = {:?}", String::from_utf8_lossy(text));
    }
  }

  // --------------------------------------------------------------------
  // 3) Free the middle block: a hole between two allocated blocks.
  // --------------------------------------------------------------------
  println!("\n--- Test 3: Freeing Memory ---");
  release(&mut allocator, b);
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 4) Free both neighbours of the hole: everything merges into one block.
  // --------------------------------------------------------------------
  println!("--- Test 4: Coalescing ---");
  release(&mut allocator, a);
  print_memory_state(&allocator);

  release(&mut allocator, c);
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 5) First fit lands in the coalesced hole at the front.
  // --------------------------------------------------------------------
  println!("--- Test 5: Reuse Freed Memory ---");
  let d = allocator.allocate(200).ok();
  if let Some(d) = d {
    println!("d = {d:p} (same as a? {})", Some(d) == a);
  }
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 6) A request larger than anything free fails without side effects.
  // --------------------------------------------------------------------
  println!("--- Test 6: Allocation Failure ---");
  match allocator.allocate(10_000) {
    Ok(ptr) => println!("Unexpectedly allocated {ptr:p}"),
    Err(err) => println!("Allocation failed as expected: {err}"),
  }
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 7) Releasing twice is reported once and changes nothing.
  // --------------------------------------------------------------------
  println!("--- Test 7: Double Free ---");
  release(&mut allocator, e);
  release(&mut allocator, e);
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 8) Writing one element past a 40 byte block trips the sentinel.
  // --------------------------------------------------------------------
  println!("--- Test 8: Buffer Overflow Detection ---");
  if let Ok(overflow) = allocator.allocate(size_of::<i32>() * 10) {
    let ints = overflow.cast::<i32>().as_ptr();
    unsafe {
      ints.write(1);
      ints.add(9).write(10);
      ints.add(10).write(999);
    }

    println!("Attempting to free buffer with overflow...");
    release(&mut allocator, Some(overflow));
  }
  print_memory_state(&allocator);

  // --------------------------------------------------------------------
  // 9) Every pointer is 8-byte aligned.
  // --------------------------------------------------------------------
  println!("--- Test 9: Alignment Verification ---");
  for _ in 0..5 {
    match allocator.allocate(40) {
      Ok(ptr) => {
        let address = ptr.as_ptr() as usize;
        let verdict = if address % 8 == 0 { "Aligned" } else { "MISALIGNED!" };
        println!("Allocated pointer: {ptr:p} (address mod 8 = {}) {verdict}", address % 8);
      }
      Err(err) => println!("Allocation failed: {err}"),
    }
  }

  release(&mut allocator, d);
  print_memory_state(&allocator);

  allocator.log_state();
  allocator.teardown();
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  println!("Custom Memory Allocator Test");
  run();
}
