//! # rfreelist - A Fixed-Capacity Free-List Allocator
//!
//! This crate provides a **first-fit free-list allocator** over a single contiguous
//! arena of fixed capacity. The arena comes either from a buffer sized at build time or
//! from an anonymous `mmap(2)`, never from the global allocator.
//!
//! ## Overview
//!
//! The arena is partitioned into adjacent blocks, each prefixed by a header. Headers
//! form a singly linked list in address order:
//!
//! ```text
//!   Arena (capacity C):
//!
//!   ┌────────┬─────────┬────────┬──────────────┬────────┬──────────────────────┐
//!   │ Header │ Payload │ Header │   Payload    │ Header │       Payload        │
//!   │ ALLOC  │  48 B   │ FREE   │    112 B     │ FREE?  │      remaining       │
//!   └───┬────┴─────────┴───┬────┴──────────────┴───┬────┴──────────────────────┘
//!       │      next        ▲        next           ▲
//!       └──────────────────┘ ──────────────────────┘
//!
//!   Links are offsets from the arena start, bounds-checked on every hop.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rfreelist
//!   ├── align      - Alignment macro (align!) and constants
//!   ├── arena      - ArenaProvider trait, StaticArena, MmapArena
//!   ├── block      - Block header layout and tags
//!   ├── config     - Capacity and split threshold
//!   ├── error      - Provisioning, allocation and corruption errors
//!   └── freelist   - FreeListAllocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rfreelist::{Config, FreeListAllocator, StaticArena, StaticBuffer};
//!
//! let mut buffer = StaticBuffer::<4096>::new();
//! let mut allocator = FreeListAllocator::new(StaticArena::new(&mut buffer), Config::default());
//!
//! let ptr = allocator.allocate(40).unwrap().cast::<i32>();
//!
//! unsafe {
//!     ptr.as_ptr().write(42);
//!     assert_eq!(ptr.as_ptr().read(), 42);
//! }
//!
//! allocator.release(ptr.as_ptr().cast()).unwrap();
//! assert_eq!(allocator.stats().free_blocks, 1);
//! ```
//!
//! ## How It Works
//!
//! Allocation walks the list from the head and takes the **first** free block that is
//! large enough. If the surplus could hold another header plus a minimum payload, the
//! tail is split off:
//!
//! ```text
//!   Before:  ┌────────┬──────────────────────────────────────────┐
//!            │ FREE   │                  size                    │
//!            └────────┴──────────────────────────────────────────┘
//!
//!   After:   ┌────────┬──────────────┬─────┬────────┬────────────┐
//!            │ ALLOC  │ user bytes   │ S   │ FREE   │ remainder  │
//!            └────────┴──────────────┴─────┴────────┴────────────┘
//!                     ▲              ▲
//!                     │              └── sentinel (0xDEADC0DE)
//!                     └── pointer returned to the caller
//! ```
//!
//! Releasing recovers the header by pointer arithmetic, checks its tag and sentinel,
//! then merges the block with a free neighbour on either side:
//!
//! ```text
//!   ┌────────┬──────┬────────┬──────┬────────┬──────┐
//!   │ FREE   │      │ RELEASE│      │ FREE   │      │
//!   └────────┴──────┴────────┴──────┴────────┴──────┘
//!                         │
//!                         ▼
//!   ┌────────┬──────────────────────────────────────┐
//!   │ FREE   │             one block                │
//!   └────────┴──────────────────────────────────────┘
//! ```
//!
//! ## Corruption Detection
//!
//! - **Double release**: the header carries a `Released` tag after the first release.
//! - **Invalid pointer**: pointers outside the arena, misaligned pointers and headers
//!   with an unknown tag are rejected without touching the arena.
//! - **Buffer overflow**: a sentinel word follows the caller's bytes. A mismatch is
//!   reported, but the block is released anyway.
//!
//! Every condition is returned as a [`Corruption`] and logged through the `log` facade.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives. Wrap the allocator in a
//!   mutex to share it.
//! - **Fixed capacity**: The arena never grows.
//! - **O(n) operations**: Both the first-fit search and the backward coalescing walk
//!   visit every block in front of the target. A `prev` link would make release O(1)
//!   at the cost of another header field.

pub mod align;
mod arena;
mod block;
mod config;
mod error;
mod freelist;

#[cfg(unix)]
pub use arena::MmapArena;
pub use arena::{ArenaProvider, Region, StaticArena, StaticBuffer};
pub use block::{HEADER_SIZE, MIN_BLOCK_SIZE, SENTINEL, SENTINEL_SIZE, Tag};
pub use config::{Config, DYNAMIC_CAPACITY, STATIC_CAPACITY};
pub use error::{AllocError, Corruption, ProvisionError};
pub use freelist::{ArenaStats, BlockInfo, Blocks, FreeListAllocator};
