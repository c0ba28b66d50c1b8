/// Boundary every payload and header offset is rounded up to.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the next [`ALIGNMENT`] boundary.
///
/// # Examples
///
/// ```rust
/// use rfreelist::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(40), 40);
/// assert_eq!(align!(100), 104);
/// assert_eq!(align!(40 + 4), 48);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Returns `true` if `value` already sits on an [`ALIGNMENT`] boundary.
#[inline]
pub const fn is_aligned(value: usize) -> bool {
  value & (ALIGNMENT - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::SENTINEL_SIZE;

  #[test]
  fn test_request_rounding() {
    // (requested, rounded, rounded plus sentinel)
    let cases = [
      (1, 8, 16),
      (4, 8, 16),
      (8, 8, 16),
      (13, 16, 24),
      (40, 40, 48),
      (72, 72, 80),
      (100, 104, 112),
      (200, 200, 208),
    ];

    for (requested, rounded, needed) in cases {
      assert_eq!(align!(requested), rounded, "rounding {requested}");
      assert_eq!(align!(align!(requested) + SENTINEL_SIZE), needed, "sizing {requested}");
      assert!(is_aligned(needed));
    }
  }

  #[test]
  fn test_sentinel_always_fits_behind_the_request() {
    for requested in 1..=256usize {
      let rounded = align!(requested);
      let needed = align!(rounded + SENTINEL_SIZE);

      assert!(rounded >= requested && rounded - requested < ALIGNMENT);
      assert!(needed >= rounded + SENTINEL_SIZE);
      assert_eq!(needed - rounded, ALIGNMENT);
    }
  }

  #[test]
  fn test_zero_stays_zero() {
    assert_eq!(align!(0), 0);
    assert!(is_aligned(0));
    assert!(!is_aligned(4));
  }
}
