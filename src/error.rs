/// Reasons an [`ArenaProvider`](crate::ArenaProvider) could not hand out a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
  #[error("requested arena of {requested} bytes exceeds the {available} bytes available")]
  TooLarge { requested: usize, available: usize },
  #[error("arena of {capacity} bytes cannot hold a single block (minimum {minimum})")]
  CapacityTooSmall { capacity: usize, minimum: usize },
  #[error("mmap of {capacity} bytes failed (errno {errno})")]
  Mmap { capacity: usize, errno: i32 },
}

/// Why [`FreeListAllocator::allocate`](crate::FreeListAllocator::allocate) returned no
/// pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  #[error("zero-sized allocation")]
  ZeroSize,
  #[error("no free block large enough for {requested} bytes")]
  Exhausted { requested: usize },
  #[error("arena could not be provisioned: {0}")]
  Provision(#[from] ProvisionError),
}

/// Corruption detected on [`FreeListAllocator::release`](crate::FreeListAllocator::release).
///
/// `DoubleRelease` and `InvalidPointer` leave the arena untouched. `BoundaryOverwrite` is
/// reported after the block has been released anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
  #[error("double release detected at {address:#x}")]
  DoubleRelease { address: usize },
  #[error("invalid pointer passed to release: {address:#x}")]
  InvalidPointer { address: usize },
  #[error("buffer overflow detected at {address:#x}: sentinel was {found:#X}, expected {expected:#X}")]
  BoundaryOverwrite { address: usize, found: u32, expected: u32 },
}
