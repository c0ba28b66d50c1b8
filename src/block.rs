use std::{fmt, mem};

/// Marker written right after the caller's bytes and checked on release.
pub const SENTINEL: u32 = 0xDEAD_C0DE;

/// Bytes reserved in every payload for the [`SENTINEL`].
pub const SENTINEL_SIZE: usize = mem::size_of::<u32>();

/// Bytes taken by a [`Header`] in front of every block.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Default smallest payload worth carving out as a separate free block.
pub const MIN_BLOCK_SIZE: usize = 32;

const NO_NEXT: u64 = u64::MAX;

/// Guard discriminant stored in every block header.
///
/// A plain `is_free` flag could not tell a released block from one that was never handed
/// out, nor a header from arbitrary bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
  /// Free space that was never handed out, or the tail left over by a split.
  Free,
  /// Payload currently owned by a caller.
  Allocated,
  /// Payload returned through `release`. Treated as free by the directory.
  Released,
}

impl Tag {
  const ALLOCATED: u32 = 0xDEAD_BEEF;
  const FREE: u32 = 0xFEED_FACE;
  const RELEASED: u32 = 0xFEE1_DEAD;

  pub const fn from_raw(raw: u32) -> Option<Self> {
    match raw {
      Self::ALLOCATED => Some(Self::Allocated),
      Self::FREE => Some(Self::Free),
      Self::RELEASED => Some(Self::Released),
      _ => None,
    }
  }

  pub const fn to_raw(self) -> u32 {
    match self {
      Self::Allocated => Self::ALLOCATED,
      Self::Free => Self::FREE,
      Self::Released => Self::RELEASED,
    }
  }

  /// Whether the directory may hand this block out.
  pub const fn is_free(self) -> bool {
    matches!(self, Self::Free | Self::Released)
  }
}

impl fmt::Display for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(match self {
      Self::Free => "FREE",
      Self::Allocated => "ALLOCATED",
      Self::Released => "RELEASED",
    })
  }
}

/// Block metadata overlaid on the arena in front of every payload.
///
/// ```text
///   ┌──────────┬──────────┬──────────┬──────────┬─────────────┐
///   │ tag: u32 │ reserved │ size     │ next     │ sentinel_at │
///   │          │ u32      │ u64      │ u64      │ u64         │
///   └──────────┴──────────┴──────────┴──────────┴─────────────┘
///                       32 bytes on every target
/// ```
///
/// `next` is an offset into the arena rather than an address, so a corrupted link can
/// be bounds-checked before it is followed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  tag: u32,
  reserved: u32,
  size: u64,
  next: u64,
  sentinel_at: u64,
}

impl Header {
  pub fn new(
    tag: Tag,
    size: usize,
    next: Option<usize>,
  ) -> Self {
    Self {
      tag: tag.to_raw(),
      reserved: 0,
      size: size as u64,
      next: next.map_or(NO_NEXT, |offset| offset as u64),
      sentinel_at: 0,
    }
  }

  /// Decoded tag, or `None` when the raw value is not one this allocator writes.
  pub const fn tag(&self) -> Option<Tag> {
    Tag::from_raw(self.tag)
  }

  pub const fn raw_tag(&self) -> u32 {
    self.tag
  }

  pub fn set_tag(
    &mut self,
    tag: Tag,
  ) {
    self.tag = tag.to_raw();
  }

  pub fn is_free(&self) -> bool {
    self.tag().is_some_and(Tag::is_free)
  }

  pub const fn size(&self) -> usize {
    self.size as usize
  }

  pub fn set_size(
    &mut self,
    size: usize,
  ) {
    self.size = size as u64;
  }

  pub const fn next(&self) -> Option<usize> {
    if self.next == NO_NEXT {
      None
    } else {
      Some(self.next as usize)
    }
  }

  pub fn set_next(
    &mut self,
    next: Option<usize>,
  ) {
    self.next = next.map_or(NO_NEXT, |offset| offset as u64);
  }

  /// Payload-relative offset of the sentinel written at allocation time.
  pub const fn sentinel_at(&self) -> usize {
    self.sentinel_at as usize
  }

  pub fn set_sentinel_at(
    &mut self,
    offset: usize,
  ) {
    self.sentinel_at = offset as u64;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::{ALIGNMENT, is_aligned};

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER_SIZE, 32);
    assert!(is_aligned(HEADER_SIZE));
    assert!(mem::align_of::<Header>() <= ALIGNMENT);
  }

  #[test]
  fn test_tag_round_trip_and_unknown() {
    for tag in [Tag::Free, Tag::Allocated, Tag::Released] {
      assert_eq!(Tag::from_raw(tag.to_raw()), Some(tag));
    }

    assert_eq!(Tag::from_raw(0), None);
    assert_eq!(Tag::from_raw(SENTINEL), None);
  }

  #[test]
  fn test_released_counts_as_free() {
    assert!(Tag::Free.is_free());
    assert!(Tag::Released.is_free());
    assert!(!Tag::Allocated.is_free());
  }

  #[test]
  fn test_next_link() {
    let mut header = Header::new(Tag::Free, 64, None);
    assert_eq!(header.next(), None);

    header.set_next(Some(96));
    assert_eq!(header.next(), Some(96));
    assert_eq!(header.size(), 64);
    assert!(header.is_free());

    header.set_tag(Tag::Allocated);
    assert!(!header.is_free());
  }
}
