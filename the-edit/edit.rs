//! The generic edit algebra.
//!
//! This module provides [`Edit`], an ordered, strictly disjoint batch of
//! atomic [`Replacement`]s applied simultaneously to one base sequence, and
//! the operations for combining such batches without re-deriving them from
//! whole documents.
//!
//! # Model
//!
//! A replacement is "replace this `[start, end)` range with content of some
//! new length". The algebra never looks at the content itself; everything it
//! needs goes through the [`Replacement`] trait:
//!
//! - `new_len` - length of the inserted content
//! - `slice` - carve out a sub-portion of the content, re-anchored elsewhere
//! - `try_join_touching` - merge with an adjacent replacement, or decline
//!
//! Concrete payloads are a closed set: plain text
//! ([`StringReplacement`](crate::text::StringReplacement)) and annotated text
//! ([`AnnotatedStringReplacement`](crate::annotated::AnnotatedStringReplacement)).
//!
//! # Invariant
//!
//! For consecutive replacements `r[i]`, `r[i + 1]`:
//!
//! ```text
//! r[i].replace_range().end <= r[i + 1].replace_range().start
//! ```
//!
//! Touching is allowed, overlap is not. [`Edit::new`] rejects violating input
//! with [`EditError::ReplacementsOutOfOrder`]; no transformation in this
//! module ever produces a violating edit.
//!
//! # Composition
//!
//! [`Edit::compose`] combines two sequentially applied edits into one:
//!
//! ```ignore
//! // other.apply(this.apply(base)) == this.compose(other).apply(base)
//! let combined = first.compose(second);
//! ```
//!
//! # Rebasing
//!
//! [`Edit::try_rebase`] forward-ports an edit over an unrelated edit computed
//! against the same snapshot. Conflicting replacements are dropped, or, in
//! strict mode, abort the whole rebase:
//!
//! ```ignore
//! let ported = ours.try_rebase(&theirs, false); // always Some, lossy
//! let strict = ours.try_rebase(&theirs, true);  // None on any conflict
//! ```
//!
//! # Offset Mapping
//!
//! [`Edit::apply_to_offset`] maps a pre-edit offset to its post-edit
//! position, [`Edit::apply_inverse_to_offset`] maps the other way. Both
//! collapse offsets that fall strictly inside a replaced span to the span's
//! *start*; downstream cursor repositioning depends on that convention.
//!
//! # Error Handling
//!
//! Construction returns [`Result<T, EditError>`]. Everything else is total:
//! rebase conflicts are data, not errors, and impossible internal states in
//! `compose` are `unreachable!`.

use std::collections::VecDeque;

use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::range::OffsetRange;

pub type Result<T> = std::result::Result<T, EditError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
  #[error("replacement starting at {start} overlaps previous replacement ending at {prev_end}")]
  ReplacementsOutOfOrder { prev_end: usize, start: usize },
}

/// One atomic "replace this range with new content" operation.
///
/// Implementors only describe the content (its length, how to slice it, and
/// when two adjacent contents may merge); all positional logic lives in
/// [`Edit`].
pub trait Replacement: Clone {
  /// The range this replacement removes, in pre-edit coordinates.
  fn replace_range(&self) -> OffsetRange;

  /// Length of the content this replacement inserts.
  fn new_len(&self) -> usize;

  /// The portion of this replacement's output that lies within
  /// `range_in_replacement`, re-anchored at `new_range`.
  fn slice(&self, new_range: OffsetRange, range_in_replacement: OffsetRange) -> Self;

  /// Merges with a replacement that starts exactly where this one ends.
  /// Returns `None` when the two cannot be represented as one replacement.
  fn try_join_touching(&self, other: &Self) -> Option<Self>;

  /// Net length change: new content length minus replaced length.
  #[inline]
  fn len_delta(&self) -> isize {
    self.new_len() as isize - self.replace_range().len() as isize
  }

  /// True when the replacement neither removes nor inserts anything.
  #[inline]
  fn is_no_op(&self) -> bool {
    self.new_len() == 0 && self.replace_range().is_empty()
  }

  /// The range the new content occupies in post-edit coordinates, were this
  /// the only replacement.
  #[inline]
  fn range_after_replace(&self) -> OffsetRange {
    OffsetRange::of_len(self.replace_range().start, self.new_len())
  }

  /// An equivalent replacement with both range and content shifted by
  /// `amount`.
  #[must_use]
  fn shift(&self, amount: isize) -> Self {
    self.slice(
      self.replace_range().delta(amount),
      OffsetRange::new(0, self.new_len()),
    )
  }
}

/// An ordered, strictly disjoint batch of replacements over one base.
///
/// Immutable value type: every transformation returns a new edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit<R> {
  replacements: SmallVec<[R; 2]>,
}

impl<R: Replacement> Edit<R> {
  pub fn empty() -> Self {
    Self {
      replacements: SmallVec::new(),
    }
  }

  pub fn single(replacement: R) -> Self {
    Self {
      replacements: smallvec::smallvec![replacement],
    }
  }

  /// Builds an edit from replacements already sorted by range.
  ///
  /// Pre-sorting and pre-merging are the caller's contract; unsorted or
  /// overlapping input is rejected, never repaired.
  pub fn new(replacements: impl IntoIterator<Item = R>) -> Result<Self> {
    let replacements: SmallVec<[R; 2]> = replacements.into_iter().collect();

    let mut prev_end = 0;
    for replacement in &replacements {
      let range = replacement.replace_range();
      if range.start < prev_end {
        return Err(EditError::ReplacementsOutOfOrder {
          prev_end,
          start: range.start,
        });
      }
      prev_end = range.end;
    }

    Ok(Self { replacements })
  }

  /// Internal constructor for replacements known to satisfy the invariant.
  pub(crate) fn from_sorted(replacements: SmallVec<[R; 2]>) -> Self {
    debug_assert!(
      replacements
        .windows(2)
        .all(|pair| pair[0].replace_range().end <= pair[1].replace_range().start),
      "replacements must be sorted and disjoint"
    );
    Self { replacements }
  }

  pub fn replacements(&self) -> &[R] {
    &self.replacements
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.replacements.is_empty()
  }

  /// Net length change of the whole edit.
  pub fn len_delta(&self) -> isize {
    self.replacements.iter().map(Replacement::len_delta).sum()
  }

  /// Length of the data after applying this edit to data of `base_len`.
  pub fn new_len(&self, base_len: usize) -> usize {
    base_len.wrapping_add_signed(self.len_delta())
  }

  /// The range spanning the first through last replace-range, or `None` for
  /// the empty edit.
  pub fn joined_replace_range(&self) -> Option<OffsetRange> {
    let first = self.replacements.first()?.replace_range();
    let last = self.replacements.last()?.replace_range();
    Some(first.join(last))
  }

  /// The ranges the new contents occupy, in post-edit coordinates.
  pub fn new_ranges(&self) -> Vec<OffsetRange> {
    let mut ranges = Vec::with_capacity(self.replacements.len());
    let mut delta = 0isize;

    for replacement in &self.replacements {
      ranges.push(replacement.range_after_replace().delta(delta));
      delta += replacement.len_delta();
    }

    ranges
  }

  // Canonicalization.
  //

  /// The canonical form: no-op replacements dropped, runs of exactly-touching
  /// replacements merged as far as `try_join_touching` allows.
  ///
  /// Two edits have the same effect on every base iff their normalized forms
  /// are equal, and `edit.apply(base) == edit.normalize().apply(base)`.
  #[must_use]
  pub fn normalize(self) -> Self {
    let mut normalized: SmallVec<[R; 2]> = SmallVec::with_capacity(self.replacements.len());
    let mut last: Option<R> = None;

    for replacement in self.replacements {
      if replacement.is_no_op() {
        continue;
      }
      match last {
        Some(prev) if prev.replace_range().end == replacement.replace_range().start => {
          match prev.try_join_touching(&replacement) {
            Some(joined) => last = Some(joined),
            None => {
              normalized.push(prev);
              last = Some(replacement);
            },
          }
        },
        Some(prev) => {
          normalized.push(prev);
          last = Some(replacement);
        },
        None => last = Some(replacement),
      }
    }
    if let Some(prev) = last {
      normalized.push(prev);
    }

    Self::from_sorted(normalized)
  }

  // Composition.
  //

  /// Combines two sequentially applied edits: `self` first, `other` second,
  /// `other` expressed in the coordinates of `self`'s output.
  ///
  /// For every base: `other.apply(self.apply(base)) ==
  /// self.compose(other).apply(base)`. The result is normalized.
  #[must_use]
  pub fn compose(self, other: Self) -> Self {
    let edit1 = self.normalize();
    let edit2 = other.normalize();

    if edit1.is_empty() {
      return edit2;
    }
    if edit2.is_empty() {
      return edit1;
    }

    let mut queue: VecDeque<R> = edit1.replacements.into_iter().collect();
    let mut result: SmallVec<[R; 2]> = SmallVec::new();

    // Cumulative length delta of the consumed `edit1` replacements; maps
    // base coordinates into `edit2` coordinates.
    let mut edit1_to_edit2 = 0isize;

    for r2 in edit2.replacements {
      let r2_range = r2.replace_range();

      // Copy over `edit1` replacements whose output ends strictly before
      // `r2` starts; `r2` cannot affect them.
      while let Some(r1) = queue.front() {
        let mapped = r1.range_after_replace().delta(edit1_to_edit2);
        if mapped.end >= r2_range.start {
          break;
        }
        edit1_to_edit2 += r1.len_delta();
        if let Some(r1) = queue.pop_front() {
          result.push(r1);
        }
      }

      // Consume every `edit1` replacement whose output intersects or touches
      // `r2`, tracking the run's first and last.
      let first_edit1_to_edit2 = edit1_to_edit2;
      let mut first_intersecting: Option<R> = None;
      let mut last_intersecting: Option<R> = None;

      while let Some(r1) = queue.front() {
        let mapped = r1.range_after_replace().delta(edit1_to_edit2);
        if mapped.start > r2_range.end {
          break;
        }
        edit1_to_edit2 += r1.len_delta();
        if let Some(r1) = queue.pop_front() {
          if first_intersecting.is_none() {
            first_intersecting = Some(r1.clone());
          }
          last_intersecting = Some(r1);
        }
      }

      match first_intersecting {
        None => {
          // Untouched by `edit1`: translate back into base coordinates.
          result.push(r2.shift(-edit1_to_edit2));
        },
        Some(first) => {
          let Some(last) = last_intersecting else {
            unreachable!("intersecting run recorded a first replacement but no last");
          };

          // Start of the spliced replace range, in base coordinates.
          let new_start = first
            .replace_range()
            .start
            .min(r2_range.start.wrapping_add_signed(-first_edit1_to_edit2));

          // Content of `first` that survives in front of `r2`.
          let first_new_start = first
            .replace_range()
            .start
            .wrapping_add_signed(first_edit1_to_edit2);
          if first_new_start < r2_range.start {
            let prefix_len = r2_range.start - first_new_start;
            result.push(first.slice(
              OffsetRange::empty_at(new_start),
              OffsetRange::new(0, prefix_len),
            ));
          }

          // Content of `last` that survives after `r2` goes back onto the
          // queue; the next `r2` may consume it.
          let last_new_end = last
            .replace_range()
            .end
            .wrapping_add_signed(edit1_to_edit2);
          if last_new_end > r2_range.end {
            let consumed = last.new_len() - (last_new_end - r2_range.end);
            let suffix = last.slice(
              OffsetRange::empty_at(last.replace_range().end),
              OffsetRange::new(consumed, last.new_len()),
            );
            edit1_to_edit2 -= suffix.new_len() as isize;
            queue.push_front(suffix);
          }

          // `r2`'s own content, spanning the whole spliced range.
          let new_end = r2_range.end.wrapping_add_signed(-edit1_to_edit2);
          result.push(r2.slice(
            OffsetRange::new(new_start, new_end),
            OffsetRange::new(0, r2.new_len()),
          ));
        },
      }
    }

    // Whatever `edit2` never reached is unaffected.
    result.extend(queue);

    Self::from_sorted(result).normalize()
  }

  // Rebasing.
  //

  /// Forward-ports this edit as if `base` (computed against the same
  /// snapshot) had already been applied.
  ///
  /// A replacement whose range intersects or touches a `base` replacement is
  /// a conflict: it is dropped, or, with `no_overlap`, the whole rebase
  /// returns `None` so the caller can recompute from scratch. The result is
  /// not normalized.
  pub fn try_rebase<B: Replacement>(&self, base: &Edit<B>, no_overlap: bool) -> Option<Self> {
    let mut rebased: SmallVec<[R; 2]> = SmallVec::with_capacity(self.replacements.len());

    let mut our_idx = 0;
    let mut base_idx = 0;
    let mut offset = 0isize;

    while let Some(ours) = self.replacements.get(our_idx) {
      match base.replacements().get(base_idx) {
        None => {
          // No more base replacements; keep the rest, shifted.
          rebased.push(ours.shift(offset));
          our_idx += 1;
        },
        Some(b) if ours.replace_range().intersects_or_touches(b.replace_range()) => {
          if no_overlap {
            return None;
          }
          tracing::debug!(
            ours = ?ours.replace_range(),
            base = ?b.replace_range(),
            "dropping conflicting replacement during rebase"
          );
          our_idx += 1;
        },
        Some(b) if ours.replace_range().start < b.replace_range().start => {
          rebased.push(ours.shift(offset));
          our_idx += 1;
        },
        Some(b) => {
          offset += b.len_delta();
          base_idx += 1;
        },
      }
    }

    Some(Self::from_sorted(rebased))
  }

  // Offset mapping.
  //

  /// Maps a pre-edit offset to its post-edit position.
  ///
  /// An offset strictly inside a replaced span collapses to that span's new
  /// start.
  pub fn apply_to_offset(&self, offset: usize) -> usize {
    let mut delta = 0isize;

    for replacement in &self.replacements {
      let range = replacement.replace_range();
      if range.start > offset {
        break;
      }
      if offset < range.end {
        return range.start.wrapping_add_signed(delta);
      }
      delta += replacement.len_delta();
    }

    offset.wrapping_add_signed(delta)
  }

  /// Maps both endpoints of `range` through [`Edit::apply_to_offset`],
  /// independently.
  pub fn apply_to_offset_range(&self, range: OffsetRange) -> OffsetRange {
    OffsetRange::new(
      self.apply_to_offset(range.start),
      self.apply_to_offset(range.end),
    )
  }

  /// Maps a post-edit offset back to its pre-edit position.
  ///
  /// Symmetric to [`Edit::apply_to_offset`]: an offset inside a span of new
  /// content collapses to the replaced range's start.
  pub fn apply_inverse_to_offset(&self, post_offset: usize) -> usize {
    let mut delta = 0isize;

    for replacement in &self.replacements {
      let range = replacement.replace_range();
      let mapped = post_offset as isize - delta;
      if (range.start as isize) > mapped {
        break;
      }
      if mapped < range.start as isize + replacement.new_len() as isize {
        return range.start;
      }
      delta += replacement.len_delta();
    }

    (post_offset as isize - delta) as usize
  }
}

impl<R: Serialize> Serialize for Edit<R> {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self.replacements.as_slice().serialize(serializer)
  }
}

impl<'de, R: Replacement + Deserialize<'de>> Deserialize<'de> for Edit<R> {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let replacements = Vec::<R>::deserialize(deserializer)?;
    Edit::new(replacements).map_err(serde::de::Error::custom)
  }
}
