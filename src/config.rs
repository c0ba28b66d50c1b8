use crate::block::MIN_BLOCK_SIZE;

/// Capacity used by the build-time sized arena.
pub const STATIC_CAPACITY: usize = 4096;

/// Capacity used by the OS-backed arena.
pub const DYNAMIC_CAPACITY: usize = 1024 * 1024;

/// Tunables for a [`FreeListAllocator`](crate::FreeListAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Arena size in bytes, headers included. Rounded down to the alignment.
  pub capacity: usize,
  /// Smallest payload a split may leave behind as a separate free block.
  pub min_block_size: usize,
}

impl Config {
  /// Settings for an arena requested from the OS.
  pub const fn dynamic() -> Self {
    Self {
      capacity: DYNAMIC_CAPACITY,
      min_block_size: MIN_BLOCK_SIZE,
    }
  }

  pub const fn with_capacity(
    mut self,
    capacity: usize,
  ) -> Self {
    self.capacity = capacity;
    self
  }

  pub const fn with_min_block_size(
    mut self,
    min_block_size: usize,
  ) -> Self {
    self.min_block_size = min_block_size;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      capacity: STATIC_CAPACITY,
      min_block_size: MIN_BLOCK_SIZE,
    }
  }
}
