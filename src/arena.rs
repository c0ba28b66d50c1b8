use std::ptr::NonNull;

use crate::error::ProvisionError;

/// A contiguous, writable byte region handed to the allocator by an [`ArenaProvider`].
#[derive(Debug, PartialEq, Eq)]
pub struct Region {
  base: NonNull<u8>,
  len: usize,
}

impl Region {
  /// # Safety
  ///
  /// `base` must point to `len` bytes that are valid for reads and writes, aligned to
  /// [`ALIGNMENT`](crate::align::ALIGNMENT), not accessed by anything else and kept at a
  /// stable address until the region is given back through
  /// [`ArenaProvider::reclaim`].
  pub const unsafe fn from_raw_parts(
    base: NonNull<u8>,
    len: usize,
  ) -> Self {
    Self { base, len }
  }

  pub const fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub const fn len(&self) -> usize {
    self.len
  }

  pub const fn is_empty(&self) -> bool {
    self.len == 0
  }
}

/// Source of the single region an allocator manages.
pub trait ArenaProvider {
  /// Hands out a region of exactly `capacity` bytes.
  fn provision(
    &mut self,
    capacity: usize,
  ) -> Result<Region, ProvisionError>;

  /// Takes back a region previously returned by [`provision`](Self::provision).
  ///
  /// # Safety
  ///
  /// `region` must come from this provider, and no pointer into it may be used
  /// afterwards.
  unsafe fn reclaim(
    &mut self,
    region: Region,
  );
}

/// Fixed-size, 16-byte aligned backing storage for a [`StaticArena`].
///
/// ```rust
/// use rfreelist::StaticBuffer;
///
/// static mut POOL: StaticBuffer<4096> = StaticBuffer::new();
/// ```
#[repr(C, align(16))]
pub struct StaticBuffer<const N: usize>([u8; N]);

impl<const N: usize> StaticBuffer<N> {
  pub const fn new() -> Self {
    Self([0; N])
  }
}

impl<const N: usize> Default for StaticBuffer<N> {
  fn default() -> Self {
    Self::new()
  }
}

/// Provider over a buffer whose size is fixed at build time.
///
/// Reclaiming is free: the buffer simply becomes available for the next
/// [`provision`](ArenaProvider::provision).
pub struct StaticArena<'a, const N: usize> {
  buffer: &'a mut StaticBuffer<N>,
}

impl<'a, const N: usize> StaticArena<'a, N> {
  pub fn new(buffer: &'a mut StaticBuffer<N>) -> Self {
    Self { buffer }
  }
}

impl<const N: usize> ArenaProvider for StaticArena<'_, N> {
  fn provision(
    &mut self,
    capacity: usize,
  ) -> Result<Region, ProvisionError> {
    if capacity > N {
      return Err(ProvisionError::TooLarge {
        requested: capacity,
        available: N,
      });
    }

    let base = NonNull::from(&mut self.buffer.0).cast::<u8>();

    // The buffer is exclusively borrowed for 'a and 16-byte aligned.
    Ok(unsafe { Region::from_raw_parts(base, capacity) })
  }

  unsafe fn reclaim(
    &mut self,
    _region: Region,
  ) {
  }
}

/// Provider that requests the region from the OS with an anonymous `mmap(2)`.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct MmapArena;

#[cfg(unix)]
impl MmapArena {
  pub const fn new() -> Self {
    Self
  }
}

#[cfg(unix)]
impl ArenaProvider for MmapArena {
  fn provision(
    &mut self,
    capacity: usize,
  ) -> Result<Region, ProvisionError> {
    log::info!("requesting {capacity} bytes from the OS via mmap");

    let address = unsafe {
      libc::mmap(
        std::ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
      log::error!("mmap of {capacity} bytes failed (errno {errno})");
      return Err(ProvisionError::Mmap { capacity, errno });
    }

    let Some(base) = NonNull::new(address.cast::<u8>()) else {
      return Err(ProvisionError::Mmap { capacity, errno: 0 });
    };

    log::info!("mapped {capacity} bytes at {base:p}");

    // Anonymous mappings are page aligned and private to this process.
    Ok(unsafe { Region::from_raw_parts(base, capacity) })
  }

  unsafe fn reclaim(
    &mut self,
    region: Region,
  ) {
    let result = unsafe { libc::munmap(region.base().as_ptr().cast(), region.len()) };

    if result != 0 {
      let err = std::io::Error::last_os_error();
      log::error!("munmap of {:p} failed: {err}", region.base());
    } else {
      log::info!("returned {} bytes at {:p} to the OS", region.len(), region.base());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::is_aligned;

  #[test]
  fn test_static_arena_bounds() {
    let mut buffer = StaticBuffer::<256>::new();
    let mut arena = StaticArena::new(&mut buffer);

    assert_eq!(
      arena.provision(512),
      Err(ProvisionError::TooLarge {
        requested: 512,
        available: 256,
      })
    );

    let region = arena.provision(256).unwrap();
    assert_eq!(region.len(), 256);
    assert!(is_aligned(region.base().as_ptr() as usize));

    unsafe { arena.reclaim(region) };

    // The buffer is handed out again after a reclaim.
    let again = arena.provision(128).unwrap();
    assert_eq!(again.len(), 128);
  }

  #[cfg(unix)]
  #[test]
  fn test_mmap_arena_is_writable() {
    let mut arena = MmapArena::new();
    let region = arena.provision(64 * 1024).unwrap();

    assert!(is_aligned(region.base().as_ptr() as usize));

    unsafe {
      let bytes = std::slice::from_raw_parts_mut(region.base().as_ptr(), region.len());
      bytes.fill(0xAB);
      assert!(bytes.iter().all(|&b| b == 0xAB));

      arena.reclaim(region);
    }
  }
}
