//! Half-open offset ranges.
//!
//! [`OffsetRange`] is the positional primitive of the edit algebra: a
//! `[start, end)` span over 0-based offsets, independent of any line/column
//! structure. Ranges are plain `Copy` values; every operation returns a new
//! range.

/// A half-open `[start, end)` range of offsets, with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetRange {
  pub start: usize,
  pub end:   usize,
}

impl OffsetRange {
  #[inline]
  pub fn new(start: usize, end: usize) -> Self {
    debug_assert!(start <= end, "range start {start} is after end {end}");
    Self { start, end }
  }

  /// An empty range anchored at `offset`.
  #[inline]
  pub fn empty_at(offset: usize) -> Self {
    Self::new(offset, offset)
  }

  #[inline]
  pub fn of_len(start: usize, len: usize) -> Self {
    Self::new(start, start + len)
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  #[inline]
  pub fn contains(&self, offset: usize) -> bool {
    self.start <= offset && offset < self.end
  }

  // Shifts.
  //

  /// Moves both boundaries by `amount`.
  #[inline]
  #[must_use]
  pub fn delta(self, amount: isize) -> Self {
    Self::new(
      self.start.wrapping_add_signed(amount),
      self.end.wrapping_add_signed(amount),
    )
  }

  #[inline]
  #[must_use]
  pub fn delta_start(self, amount: isize) -> Self {
    Self::new(self.start.wrapping_add_signed(amount), self.end)
  }

  #[inline]
  #[must_use]
  pub fn delta_end(self, amount: isize) -> Self {
    Self::new(self.start, self.end.wrapping_add_signed(amount))
  }

  // Set operations.
  //

  /// The overlapping part of the two ranges. Returns an empty range when they
  /// merely touch, `None` when they are apart.
  #[must_use]
  pub fn intersect(self, other: Self) -> Option<Self> {
    let start = self.start.max(other.start);
    let end = self.end.min(other.end);
    (start <= end).then(|| Self::new(start, end))
  }

  /// True when the ranges overlap or share a boundary.
  #[inline]
  pub fn intersects_or_touches(self, other: Self) -> bool {
    self.start <= other.end && other.start <= self.end
  }

  /// The smallest range covering both.
  #[must_use]
  pub fn join(self, other: Self) -> Self {
    Self::new(self.start.min(other.start), self.end.max(other.end))
  }

  /// Joins with a range that starts exactly where this one ends.
  #[must_use]
  pub fn join_right_touching(self, other: Self) -> Self {
    debug_assert!(self.end == other.start, "ranges do not touch");
    Self::new(self.start, other.end)
  }
}
