use std::{fmt, ptr::NonNull};

use crate::{
  align,
  align::{ALIGNMENT, is_aligned},
  arena::{ArenaProvider, Region},
  block::{HEADER_SIZE, Header, SENTINEL, SENTINEL_SIZE, Tag},
  config::Config,
  error::{AllocError, Corruption, ProvisionError},
};

/// First-fit allocator over a single fixed-capacity arena.
///
/// Blocks are kept in an address-ordered singly linked list whose links are offsets
/// into the arena. Every link and header is bounds-checked before it is dereferenced.
pub struct FreeListAllocator<P: ArenaProvider> {
  provider: P,
  config: Config,
  region: Option<Region>,
}

impl<P: ArenaProvider> FreeListAllocator<P> {
  /// Creates an allocator. No memory is requested until the first
  /// [`initialize`](Self::initialize) or [`allocate`](Self::allocate).
  pub fn new(
    provider: P,
    config: Config,
  ) -> Self {
    Self {
      provider,
      config,
      region: None,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Arena size in bytes, headers included.
  pub fn capacity(&self) -> usize {
    self.config.capacity & !(ALIGNMENT - 1)
  }

  pub fn is_initialized(&self) -> bool {
    self.region.is_some()
  }

  /// Provisions the arena and installs one free block spanning all of it.
  ///
  /// Calling this on an initialized allocator does nothing.
  pub fn initialize(&mut self) -> Result<(), ProvisionError> {
    if self.region.is_some() {
      return Ok(());
    }

    let capacity = self.capacity();
    let minimum = HEADER_SIZE.saturating_add(self.config.min_block_size);

    if capacity < minimum {
      return Err(ProvisionError::CapacityTooSmall {
        capacity: self.config.capacity,
        minimum,
      });
    }

    let region = self.provider.provision(capacity)?;
    let head = Header::new(Tag::Free, capacity - HEADER_SIZE, None);
    write_header_at(&region, 0, head);

    log::info!(
      "allocator initialized with {} bytes at {:p}",
      head.size(),
      region.base()
    );

    self.region = Some(region);
    Ok(())
  }

  /// Returns the arena to its provider. Every pointer handed out so far dangles.
  pub fn teardown(&mut self) {
    if let Some(region) = self.region.take() {
      log::info!("tearing down arena of {} bytes at {:p}", region.len(), region.base());

      // The region came from this provider and the allocator no longer refers to it.
      unsafe { self.provider.reclaim(region) };
    }
  }

  /// Hands out `size` usable bytes, 8-byte aligned.
  ///
  /// The first free block large enough wins. When the surplus can hold another header
  /// plus [`Config::min_block_size`] bytes, the tail is split off as a new free block.
  /// A failed search leaves the arena untouched.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.initialize()?;

    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    if size > self.capacity() {
      log::warn!("allocation of {size} bytes exceeds the arena capacity");
      return Err(AllocError::Exhausted { requested: size });
    }

    let rounded = align!(size);
    let needed = align!(rounded + SENTINEL_SIZE);

    let Some((offset, mut header)) = self
      .walk()
      .find(|(_, header)| header.is_free() && header.size() >= needed)
    else {
      log::warn!("no suitable block found for {size} bytes");
      return Err(AllocError::Exhausted { requested: size });
    };

    let region = self.region.as_ref().ok_or(AllocError::Exhausted { requested: size })?;

    log::trace!("found free block: size={} at offset {offset}", header.size());

    let split_at = (needed + HEADER_SIZE).checked_add(self.config.min_block_size);

    if split_at.is_some_and(|threshold| header.size() >= threshold) {
      let tail = offset + HEADER_SIZE + needed;
      let remainder = Header::new(Tag::Free, header.size() - needed - HEADER_SIZE, header.next());
      write_header_at(region, tail, remainder);

      header.set_size(needed);
      header.set_next(Some(tail));

      log::trace!("split block: allocated={needed}, remaining={}", remainder.size());
    }

    header.set_tag(Tag::Allocated);
    header.set_sentinel_at(rounded);
    write_header_at(region, offset, header);

    let payload = offset + HEADER_SIZE;
    write_word_at(region, payload + rounded, SENTINEL);

    // `payload` lies inside the region: the block was found within it.
    let address = unsafe { region.base().add(payload) };
    log::trace!("returning pointer {address:p} (sentinel at offset {rounded})");

    Ok(address)
  }

  /// Gives a pointer obtained from [`allocate`](Self::allocate) back to the arena.
  ///
  /// Null is ignored. Double releases and pointers this allocator did not hand out are
  /// reported and leave the arena untouched. An overwritten sentinel is reported as
  /// well, but the block is still released and coalesced.
  pub fn release(
    &mut self,
    address: *mut u8,
  ) -> Result<(), Corruption> {
    if address.is_null() {
      return Ok(());
    }

    log::trace!("freeing pointer {address:p}");

    let Some(offset) = self.header_offset(address) else {
      return Err(report(Corruption::InvalidPointer {
        address: address as usize,
      }));
    };

    let Some(region) = self.region.as_ref() else {
      return Err(report(Corruption::InvalidPointer {
        address: address as usize,
      }));
    };

    let Some(mut header) = header_at(region, offset) else {
      return Err(report(Corruption::InvalidPointer {
        address: address as usize,
      }));
    };

    match header.tag() {
      Some(Tag::Allocated) => {}
      Some(Tag::Free | Tag::Released) => {
        return Err(report(Corruption::DoubleRelease {
          address: address as usize,
        }));
      }
      None => {
        return Err(report(Corruption::InvalidPointer {
          address: address as usize,
        }));
      }
    }

    let payload = offset + HEADER_SIZE;
    let fits = payload
      .checked_add(header.size())
      .is_some_and(|end| end <= region.len())
      && header
        .sentinel_at()
        .checked_add(SENTINEL_SIZE)
        .is_some_and(|end| end <= header.size());

    if !fits {
      return Err(report(Corruption::InvalidPointer {
        address: address as usize,
      }));
    }

    let overwrite = match word_at(region, payload + header.sentinel_at()) {
      Some(SENTINEL) => {
        log::trace!("sentinel check passed for {address:p}");
        None
      }
      found => Some(report(Corruption::BoundaryOverwrite {
        address: address as usize,
        found: found.unwrap_or(0),
        expected: SENTINEL,
      })),
    };

    header.set_tag(Tag::Released);

    if let Some(next) = header.next().and_then(|next| header_at(region, next))
      && next.is_free()
    {
      match merged_size(header.size(), next.size()) {
        Some(size) => {
          log::trace!("merging with next block: {} + {}", header.size(), next.size());
          header.set_size(size);
          header.set_next(next.next());
        }
        None => log::error!("next block of {address:p} has an impossible size {}", next.size()),
      }
    }

    write_header_at(region, offset, header);

    let previous = walk(region).find(|(_, candidate)| candidate.next() == Some(offset));

    if let Some((previous_offset, mut previous)) = previous
      && previous.is_free()
    {
      match merged_size(previous.size(), header.size()) {
        Some(size) => {
          log::trace!("merging with previous block: {} + {}", previous.size(), header.size());
          previous.set_size(size);
          previous.set_next(header.next());
          write_header_at(region, previous_offset, previous);
        }
        None => log::error!(
          "previous block of {address:p} has an impossible size {}",
          previous.size()
        ),
      }
    }

    overwrite.map_or(Ok(()), Err)
  }

  /// Snapshot of every block in address order.
  ///
  /// The iterator borrows the allocator, so the directory cannot change underneath it.
  pub fn dump_state(&self) -> Blocks<'_> {
    Blocks {
      walk: self.walk(),
      index: 0,
    }
  }

  /// Totals over the current directory.
  pub fn stats(&self) -> ArenaStats {
    self
      .dump_state()
      .fold(ArenaStats::default(), |mut stats, block| {
        stats.blocks += 1;

        if block.is_free() {
          stats.free_blocks += 1;
          stats.total_free += block.size;
          stats.largest_free = stats.largest_free.max(block.size);
        } else {
          stats.total_used += block.size;
        }

        stats
      })
  }

  /// Writes the directory and its totals to the `debug` log.
  pub fn log_state(&self) {
    log::debug!("=== Memory State ===");

    for block in self.dump_state() {
      log::debug!("{block}");
    }

    let stats = self.stats();
    log::debug!("Total free: {} bytes", stats.total_free);
    log::debug!("Total used: {} bytes", stats.total_used);
  }

  /// Whether `address` points into the arena.
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    self.region.as_ref().is_some_and(|region| {
      let base = region.base().as_ptr() as usize;
      let address = address as usize;
      address >= base && address - base < region.len()
    })
  }

  fn walk(&self) -> Walk<'_> {
    match &self.region {
      Some(region) => walk(region),
      None => Walk {
        region: None,
        next: None,
      },
    }
  }

  /// Arena offset of the header in front of `address`, if one could be there.
  fn header_offset(
    &self,
    address: *mut u8,
  ) -> Option<usize> {
    let region = self.region.as_ref()?;
    let payload = (address as usize).checked_sub(region.base().as_ptr() as usize)?;

    if payload < HEADER_SIZE || payload >= region.len() || !is_aligned(payload) {
      return None;
    }

    Some(payload - HEADER_SIZE)
  }
}

impl<P: ArenaProvider> Drop for FreeListAllocator<P> {
  fn drop(&mut self) {
    self.teardown();
  }
}

/// One entry of [`FreeListAllocator::dump_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub index: usize,
  /// Header offset from the start of the arena.
  pub offset: usize,
  /// Header address.
  pub address: usize,
  /// Payload bytes, header excluded.
  pub size: usize,
  /// `None` when the header holds a tag this allocator never writes.
  pub tag: Option<Tag>,
}

impl BlockInfo {
  pub const fn is_free(&self) -> bool {
    matches!(self.tag, Some(tag) if tag.is_free())
  }
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "Block {}: size={}, ", self.index, self.size)?;

    match self.tag {
      Some(tag) => write!(f, "{tag}")?,
      None => f.write_str("CORRUPTED")?,
    }

    write!(f, ", addr={:#x}", self.address)
  }
}

/// Totals returned by [`FreeListAllocator::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
  pub blocks: usize,
  pub free_blocks: usize,
  pub total_free: usize,
  pub total_used: usize,
  pub largest_free: usize,
}

/// Iterator returned by [`FreeListAllocator::dump_state`].
pub struct Blocks<'a> {
  walk: Walk<'a>,
  index: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let region = self.walk.region?;
    let (offset, header) = self.walk.next()?;

    let tag = header.tag();
    if tag.is_none() {
      log::error!("unrecognized tag {:#X} at offset {offset}", header.raw_tag());
    }

    let info = BlockInfo {
      index: self.index,
      offset,
      address: region.base().as_ptr() as usize + offset,
      size: header.size(),
      tag,
    };

    self.index += 1;
    Some(info)
  }
}

/// Follows `next` links from the head, stopping at the first link that leaves the arena
/// or does not move forward.
struct Walk<'a> {
  region: Option<&'a Region>,
  next: Option<usize>,
}

fn walk(region: &Region) -> Walk<'_> {
  Walk {
    region: Some(region),
    next: Some(0),
  }
}

impl Iterator for Walk<'_> {
  type Item = (usize, Header);

  fn next(&mut self) -> Option<Self::Item> {
    let region = self.region?;
    let offset = self.next.take()?;
    let header = header_at(region, offset)?;

    self.next = match header.next() {
      Some(next) if next <= offset => {
        log::error!("block at offset {offset} links backwards to {next}");
        None
      }
      next => next,
    };

    Some((offset, header))
  }
}

/// Payload size of `first` after absorbing the header and payload of `second`.
fn merged_size(
  first: usize,
  second: usize,
) -> Option<usize> {
  first.checked_add(HEADER_SIZE)?.checked_add(second)
}

fn report(corruption: Corruption) -> Corruption {
  log::error!("{corruption}");
  corruption
}

fn header_fits(
  region: &Region,
  offset: usize,
) -> bool {
  is_aligned(offset)
    && offset
      .checked_add(HEADER_SIZE)
      .is_some_and(|end| end <= region.len())
}

fn header_at(
  region: &Region,
  offset: usize,
) -> Option<Header> {
  if !header_fits(region, offset) {
    log::error!("header offset {offset} lies outside the arena");
    return None;
  }

  // In bounds and aligned: the region base is aligned and so is `offset`.
  Some(unsafe { region.base().add(offset).cast::<Header>().read() })
}

fn write_header_at(
  region: &Region,
  offset: usize,
  header: Header,
) {
  if !header_fits(region, offset) {
    log::error!("refusing to write header at offset {offset} outside the arena");
    return;
  }

  unsafe { region.base().add(offset).cast::<Header>().write(header) };
}

fn word_fits(
  region: &Region,
  offset: usize,
) -> bool {
  offset
    .checked_add(SENTINEL_SIZE)
    .is_some_and(|end| end <= region.len())
}

fn word_at(
  region: &Region,
  offset: usize,
) -> Option<u32> {
  if !word_fits(region, offset) {
    return None;
  }

  Some(unsafe { region.base().add(offset).cast::<u32>().read_unaligned() })
}

fn write_word_at(
  region: &Region,
  offset: usize,
  word: u32,
) {
  if word_fits(region, offset) {
    unsafe { region.base().add(offset).cast::<u32>().write_unaligned(word) };
  }
}
