//! Keeping auxiliary ranges valid across edits.
//!
//! Features that hold ranges into a document (a highlighted span, a tracked
//! region) use [`apply_edits_to_ranges`] to move those ranges through an
//! edit without understanding the edit algebra.

use std::collections::VecDeque;

use crate::{
  edit::{
    Edit,
    Replacement,
  },
  range::OffsetRange,
};

/// Remaps a sorted list of ranges through `edit`, preserving order.
///
/// A replacement deletes its overlap out of every range it touches; the
/// first touched range absorbs the replacement's new content, later ones are
/// repositioned after it. A range fully inside the replaced span collapses
/// onto the insertion.
pub fn apply_edits_to_ranges<R: Replacement>(
  sorted_ranges: &[OffsetRange],
  edit: &Edit<R>,
) -> Vec<OffsetRange> {
  // Intermediate positions go negative while a requeued range waits for the
  // offset advance it already compensated for, hence the signed pairs.
  let mut queue: VecDeque<(isize, isize)> = sorted_ranges
    .iter()
    .map(|range| (range.start as isize, range.end as isize))
    .collect();
  let mut result = Vec::with_capacity(sorted_ranges.len());
  let mut offset = 0isize;

  for replacement in edit.replacements() {
    let replace_range = replacement.replace_range();
    let rep_start = replace_range.start as isize;
    let rep_end = replace_range.end as isize;
    let new_len = replacement.new_len() as isize;
    let net = new_len - replace_range.len() as isize;

    // Ranges ending strictly before the replacement are unaffected.
    while let Some(&(start, end)) = queue.front() {
      if end >= rep_start {
        break;
      }
      queue.pop_front();
      result.push(OffsetRange::new(
        (start + offset) as usize,
        (end + offset) as usize,
      ));
    }

    // Collect the ranges that intersect or touch the replaced span. The
    // flush above already guarantees `end >= rep_start` here.
    let mut touching: Vec<(isize, isize)> = Vec::new();
    while let Some(&(start, end)) = queue.front() {
      if start > rep_end {
        break;
      }
      queue.pop_front();
      touching.push((start, end));
    }

    // Processed back to front so the requeue keeps the queue sorted.
    for i in (0..touching.len()).rev() {
      let (mut start, mut end) = touching[i];

      // Drop the overlap; only the first range absorbs the new content.
      let overlap = end.min(rep_end) - start.max(rep_start);
      end -= overlap;
      if i == 0 {
        end += new_len;
      }

      // A range starting inside the replaced span snaps to its start.
      let ahead = start - rep_start;
      if ahead > 0 {
        start -= ahead;
        end -= ahead;
      }

      if i != 0 {
        start += new_len;
        end += new_len;
      }

      // The requeued range passes the offset advance below a second time.
      start -= net;
      end -= net;

      queue.push_front((start, end));
    }

    offset += net;
  }

  while let Some((start, end)) = queue.pop_front() {
    result.push(OffsetRange::new(
      (start + offset) as usize,
      (end + offset) as usize,
    ));
  }

  result
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::text::StringEdit;

  fn ranges(pairs: &[(usize, usize)]) -> Vec<OffsetRange> {
    pairs
      .iter()
      .map(|&(start, end)| OffsetRange::new(start, end))
      .collect()
  }

  #[test]
  fn shifts_ranges_after_the_edit() {
    let edit = StringEdit::replace(OffsetRange::new(0, 1), "XX");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(2, 4), (6, 7)]), &edit),
      ranges(&[(3, 5), (7, 8)])
    );
  }

  #[test]
  fn leaves_ranges_before_the_edit() {
    let edit = StringEdit::replace(OffsetRange::new(8, 9), "XX");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(2, 4)]), &edit),
      ranges(&[(2, 4)])
    );
  }

  #[test]
  fn shrinks_range_around_deletion() {
    // "0123456789": delete [3, 5) inside [2, 6).
    let edit = StringEdit::delete(OffsetRange::new(3, 5));
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(2, 6)]), &edit),
      ranges(&[(2, 4)])
    );
  }

  #[test]
  fn consumed_range_absorbs_new_content() {
    // The range lies fully inside the replaced span; it collapses onto the
    // replacement and takes over its new content.
    let edit = StringEdit::replace(OffsetRange::new(2, 8), "XY");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(4, 6)]), &edit),
      ranges(&[(2, 4)])
    );
  }

  #[test]
  fn only_first_range_absorbs_new_content() {
    // "0123456789": replace [3, 6) with "ab". The first touched range grows
    // over the insertion, the second keeps only its tail.
    let edit = StringEdit::replace(OffsetRange::new(3, 6), "ab");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(2, 4), (5, 7)]), &edit),
      ranges(&[(2, 5), (5, 6)])
    );
  }

  #[test]
  fn touching_range_absorbs_insertion_at_its_end() {
    let edit = StringEdit::insert(4, "abc");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(2, 4)]), &edit),
      ranges(&[(2, 7)])
    );
  }

  #[test]
  fn insertion_at_range_start_extends_it() {
    let edit = StringEdit::insert(0, "abcde");
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(0, 1)]), &edit),
      ranges(&[(0, 6)])
    );
  }

  #[test]
  fn multiple_replacements_accumulate_offsets() {
    // Delete [0, 2), insert "xyz" at 5: a later range shifts by -2 + 3.
    let edit = StringEdit::new(vec![
      crate::text::StringReplacement::delete(OffsetRange::new(0, 2)),
      crate::text::StringReplacement::insert(5, "xyz"),
    ])
    .unwrap();
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(6, 8)]), &edit),
      ranges(&[(7, 9)])
    );
  }

  #[test]
  fn empty_inputs() {
    let edit = StringEdit::replace(OffsetRange::new(1, 2), "x");
    assert!(apply_edits_to_ranges(&[], &edit).is_empty());

    let empty = StringEdit::empty();
    assert_eq!(
      apply_edits_to_ranges(&ranges(&[(1, 2)]), &empty),
      ranges(&[(1, 2)])
    );
  }
}
