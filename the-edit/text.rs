//! String-valued edits.
//!
//! [`StringReplacement`] instantiates the algebra with literal text payloads
//! and [`StringEdit`] is the edit type built from them. This layer adds the
//! operations that need the actual text: applying to a `&str`, deriving the
//! inverse edit, neutrality checks, common prefix/suffix shrinking, and the
//! persisted JSON form.
//!
//! Offsets are byte offsets; replace ranges and slice points must lie on
//! `char` boundaries of the data they address.
//!
//! # Wire Format
//!
//! A [`StringEdit`] serializes as an ordered array of records describing the
//! *original* replace range and the inserted text:
//!
//! ```json
//! [{ "txt": "XY", "pos": 1, "len": 2 }]
//! ```
//!
//! Deserialization re-validates ordering, so a corrupted record sequence
//! cannot smuggle an overlapping edit past the construction invariant.

use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
};
use smallvec::SmallVec;

use crate::{
  Tendril,
  edit::{
    Edit,
    Replacement,
    Result,
  },
  range::OffsetRange,
};

/// An edit over plain text replacements.
pub type StringEdit = Edit<StringReplacement>;

/// Replace `replace_range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringReplacement {
  replace_range: OffsetRange,
  new_text:      Tendril,
}

impl StringReplacement {
  pub fn new(replace_range: OffsetRange, new_text: impl Into<Tendril>) -> Self {
    Self {
      replace_range,
      new_text: new_text.into(),
    }
  }

  #[inline]
  pub fn insert(offset: usize, text: impl Into<Tendril>) -> Self {
    Self::new(OffsetRange::empty_at(offset), text)
  }

  #[inline]
  pub fn delete(range: OffsetRange) -> Self {
    Self::new(range, "")
  }

  pub fn new_text(&self) -> &str {
    &self.new_text
  }

  /// Applies just this replacement to `base`.
  pub fn replace(&self, base: &str) -> String {
    let mut result = String::with_capacity(base.len().wrapping_add_signed(self.len_delta()));
    result.push_str(&base[..self.replace_range.start]);
    result.push_str(&self.new_text);
    result.push_str(&base[self.replace_range.end..]);
    result
  }

  /// True when applying this replacement to `text` would change nothing,
  /// i.e. the new text equals what the replace range currently holds.
  pub fn is_neutral_on(&self, text: &str) -> bool {
    text.get(self.replace_range.start..self.replace_range.end) == Some(self.new_text.as_str())
  }

  /// Shrinks the replacement by the longest common prefix and suffix it
  /// shares with the text it replaces, preserving its effect.
  ///
  /// The suffix is capped so prefix and suffix never overlap when the old
  /// and new contents share a long middle.
  #[must_use]
  pub fn remove_common_suffix_prefix(&self, original_text: &str) -> Self {
    let old_text = &original_text[self.replace_range.start..self.replace_range.end];

    let prefix_len = common_prefix_len(old_text, &self.new_text);
    let suffix_len = common_suffix_len(old_text, &self.new_text)
      .min(old_text.len() - prefix_len)
      .min(self.new_text.len() - prefix_len);

    Self::new(
      OffsetRange::new(
        self.replace_range.start + prefix_len,
        self.replace_range.end - suffix_len,
      ),
      &self.new_text[prefix_len..self.new_text.len() - suffix_len],
    )
  }
}

impl Replacement for StringReplacement {
  fn replace_range(&self) -> OffsetRange {
    self.replace_range
  }

  fn new_len(&self) -> usize {
    self.new_text.len()
  }

  fn slice(&self, new_range: OffsetRange, range_in_replacement: OffsetRange) -> Self {
    Self::new(
      new_range,
      &self.new_text[range_in_replacement.start..range_in_replacement.end],
    )
  }

  /// Plain text always joins: adjacent new texts concatenate.
  fn try_join_touching(&self, other: &Self) -> Option<Self> {
    let mut new_text = self.new_text.clone();
    new_text.push_str(&other.new_text);
    Some(Self {
      replace_range: self.replace_range.join_right_touching(other.replace_range),
      new_text,
    })
  }
}

impl Edit<StringReplacement> {
  // Factories.
  //

  pub fn replace(range: OffsetRange, new_text: impl Into<Tendril>) -> Self {
    Self::single(StringReplacement::new(range, new_text))
  }

  pub fn insert(offset: usize, text: impl Into<Tendril>) -> Self {
    Self::single(StringReplacement::insert(offset, text))
  }

  pub fn delete(range: OffsetRange) -> Self {
    Self::single(StringReplacement::delete(range))
  }

  /// Builds an edit from replacements in any order. Sorts by range, then
  /// rejects overlaps like [`Edit::new`].
  pub fn from_unsorted(replacements: impl IntoIterator<Item = StringReplacement>) -> Result<Self> {
    let mut replacements: Vec<_> = replacements.into_iter().collect();
    replacements.sort_by_key(|r| (r.replace_range().start, r.replace_range().end));
    Self::new(replacements)
  }

  /// Left-fold of [`Edit::compose`] over `edits`; empty input gives the
  /// empty edit.
  pub fn compose_all(edits: impl IntoIterator<Item = Self>) -> Self {
    edits.into_iter().fold(Self::empty(), Edit::compose)
  }

  // Text operations.
  //

  /// Applies the edit, splicing unreplaced spans of `base` with each
  /// replacement's new text.
  pub fn apply(&self, base: &str) -> String {
    let mut result = String::with_capacity(self.new_len(base.len()));
    let mut pos = 0;

    for replacement in self.replacements() {
      let range = replacement.replace_range();
      result.push_str(&base[pos..range.start]);
      result.push_str(replacement.new_text());
      pos = range.end;
    }
    result.push_str(&base[pos..]);

    result
  }

  /// The edit that undoes this one when applied to the *edited* text.
  /// `base` is the text this edit applies to.
  pub fn inverse(&self, base: &str) -> Self {
    let mut inverted: SmallVec<[StringReplacement; 2]> =
      SmallVec::with_capacity(self.replacements().len());
    let mut delta = 0isize;

    for replacement in self.replacements() {
      let range = replacement.replace_range();
      inverted.push(StringReplacement::new(
        // The inverse range sits at the output position of the new content;
        // its text is what the original range held.
        OffsetRange::of_len(
          range.start.wrapping_add_signed(delta),
          replacement.new_len(),
        ),
        &base[range.start..range.end],
      ));
      delta += replacement.len_delta();
    }

    Self::from_sorted(inverted)
  }

  /// True when no replacement would change `text`.
  pub fn is_neutral_on(&self, text: &str) -> bool {
    self.replacements().iter().all(|r| r.is_neutral_on(text))
  }

  /// Per-replacement [`StringReplacement::remove_common_suffix_prefix`],
  /// dropping replacements that shrink to nothing.
  #[must_use]
  pub fn remove_common_suffix_prefix(&self, original_text: &str) -> Self {
    let replacements = self
      .replacements()
      .iter()
      .map(|r| r.remove_common_suffix_prefix(original_text))
      .filter(|r| !r.is_no_op())
      .collect();
    Self::from_sorted(replacements)
  }

  // Persistence.
  //

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string(self)
  }

  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    serde_json::from_str(json)
  }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
  a.chars()
    .zip(b.chars())
    .take_while(|(x, y)| x == y)
    .map(|(x, _)| x.len_utf8())
    .sum()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
  a.chars()
    .rev()
    .zip(b.chars().rev())
    .take_while(|(x, y)| x == y)
    .map(|(x, _)| x.len_utf8())
    .sum()
}

/// Persisted form: `pos`/`len` describe the original replace range, `txt`
/// the replacement text.
#[derive(Serialize, Deserialize)]
struct WireReplacement {
  txt: String,
  pos: usize,
  len: usize,
}

impl Serialize for StringReplacement {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    WireReplacement {
      txt: self.new_text.to_string(),
      pos: self.replace_range.start,
      len: self.replace_range.len(),
    }
    .serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for StringReplacement {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let wire = WireReplacement::deserialize(deserializer)?;
    Ok(Self::new(OffsetRange::of_len(wire.pos, wire.len), wire.txt))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn replacement(start: usize, end: usize, text: &str) -> StringReplacement {
    StringReplacement::new(OffsetRange::new(start, end), text)
  }

  /// Builds a valid edit out of arbitrary offset/text triples: offsets are
  /// clamped to char boundaries of `base`, then overlapping changes are
  /// discarded in order.
  fn arbitrary_edit(base: &str, raw: &[(usize, usize, String)]) -> StringEdit {
    fn snap(base: &str, offset: usize) -> usize {
      let mut offset = offset % (base.len() + 1);
      while !base.is_char_boundary(offset) {
        offset -= 1;
      }
      offset
    }

    let mut changes: Vec<(usize, usize, &str)> = raw
      .iter()
      .map(|(a, b, text)| {
        let a = snap(base, *a);
        let b = snap(base, *b);
        (a.min(b), a.max(b), text.as_str())
      })
      .collect();
    changes.sort_by_key(|(from, to, _)| (*from, *to));

    let mut replacements = Vec::new();
    let mut last_end = 0;
    for (from, to, text) in changes {
      if from < last_end {
        continue;
      }
      replacements.push(replacement(from, to, text));
      last_end = to;
    }

    StringEdit::new(replacements).unwrap()
  }

  #[test]
  fn basic_replace() {
    let edit = StringEdit::replace(OffsetRange::new(1, 3), "XY");
    assert_eq!(edit.apply("abcdef"), "aXYdef");
  }

  #[test]
  fn apply_multiple() {
    let edit = StringEdit::new(vec![
      replacement(0, 1, "H"),
      replacement(5, 5, ","),
      replacement(6, 11, "rust"),
    ])
    .unwrap();
    assert_eq!(edit.apply("hello world"), "Hello, rust");
  }

  #[test]
  fn single_replacement_apply() {
    let r = replacement(6, 11, "rust");
    assert_eq!(r.replace("hello world"), "hello rust");
  }

  #[test]
  fn from_unsorted_sorts_and_rejects_overlap() {
    let edit = StringEdit::from_unsorted(vec![
      replacement(6, 11, "rust"),
      replacement(0, 1, "H"),
    ])
    .unwrap();
    assert_eq!(edit.apply("hello world"), "Hello rust");

    assert!(
      StringEdit::from_unsorted(vec![
        replacement(0, 4, "a"),
        replacement(2, 6, "b"),
      ])
      .is_err()
    );
  }

  #[test]
  fn compose_all_folds_left() {
    let edits = vec![
      StringEdit::insert(0, "a"),
      StringEdit::insert(1, "b"),
      StringEdit::insert(2, "c"),
    ];
    assert_eq!(StringEdit::compose_all(edits).apply(""), "abc");
    assert!(StringEdit::compose_all([]).is_empty());
  }

  #[test]
  fn inverse_undoes() {
    let base = "hello world";
    let edit = StringEdit::new(vec![
      replacement(0, 5, "bye"),
      replacement(6, 11, "rust"),
    ])
    .unwrap();

    let edited = edit.apply(base);
    assert_eq!(edited, "bye rust");

    let inverse = edit.inverse(base);
    assert_eq!(inverse.replacements(), &[
      replacement(0, 3, "hello"),
      replacement(4, 8, "world"),
    ]);
    assert_eq!(inverse.apply(&edited), base);
  }

  #[test]
  fn neutrality() {
    let text = "abcdef";
    assert!(replacement(1, 3, "bc").is_neutral_on(text));
    assert!(!replacement(1, 3, "bd").is_neutral_on(text));

    let edit = StringEdit::new(vec![
      replacement(0, 1, "a"),
      replacement(3, 3, ""),
    ])
    .unwrap();
    assert!(edit.is_neutral_on(text));
  }

  #[test]
  fn remove_common_suffix_prefix_shrinks() {
    let base = "hello world";
    let r = replacement(0, 11, "hello rust!ld");
    let shrunk = r.remove_common_suffix_prefix(base);
    assert_eq!(shrunk, replacement(6, 9, "rust!"));

    // Effect is preserved.
    assert_eq!(r.replace(base), shrunk.replace(base));
  }

  #[test]
  fn remove_common_suffix_prefix_caps_overlap() {
    // Old and new share more than the shorter side's length; the suffix must
    // not eat into the prefix.
    let base = "aaaa";
    let r = replacement(0, 4, "aaaaaa");
    let shrunk = r.remove_common_suffix_prefix(base);
    assert_eq!(shrunk, replacement(4, 4, "aa"));
    assert_eq!(r.replace(base), shrunk.replace(base));
  }

  #[test]
  fn remove_common_suffix_prefix_drops_vacuous() {
    let base = "abcdef";
    let edit = StringEdit::new(vec![
      replacement(0, 2, "ab"),
      replacement(3, 5, "dX"),
    ])
    .unwrap();

    let shrunk = edit.remove_common_suffix_prefix(base);
    assert_eq!(shrunk.replacements(), &[replacement(4, 5, "X")]);
  }

  #[test]
  fn json_round_trip() {
    let edit = StringEdit::new(vec![
      replacement(1, 3, "XY"),
      replacement(5, 5, "!"),
    ])
    .unwrap();

    let json = edit.to_json().unwrap();
    assert_eq!(json, r#"[{"txt":"XY","pos":1,"len":2},{"txt":"!","pos":5,"len":0}]"#);
    assert_eq!(StringEdit::from_json(&json).unwrap(), edit);
  }

  #[test]
  fn json_rejects_overlapping_records() {
    let json = r#"[{"txt":"a","pos":0,"len":4},{"txt":"b","pos":2,"len":1}]"#;
    assert!(StringEdit::from_json(json).is_err());
  }

  #[test]
  fn multibyte_text() {
    let base = "héllo wörld";
    // "héllo" is 6 bytes.
    let edit = StringEdit::replace(OffsetRange::new(0, 6), "hällo");
    let edited = edit.apply(base);
    assert_eq!(edited, "hällo wörld");

    let shrunk = edit
      .replacements()
      .first()
      .unwrap()
      .remove_common_suffix_prefix(base);
    assert_eq!(shrunk, replacement(1, 3, "ä"));

    assert_eq!(edit.inverse(base).apply(&edited), base);
  }

  quickcheck::quickcheck! {
    fn prop_compose_law(
      base: String,
      raw1: Vec<(usize, usize, String)>,
      raw2: Vec<(usize, usize, String)>
    ) -> bool {
      let e1 = arbitrary_edit(&base, &raw1);
      let intermediate = e1.apply(&base);
      let e2 = arbitrary_edit(&intermediate, &raw2);

      let sequential = e2.apply(&intermediate);
      e1.compose(e2).apply(&base) == sequential
    }

    fn prop_normalize_idempotent_and_preserving(
      base: String,
      raw: Vec<(usize, usize, String)>
    ) -> bool {
      let edit = arbitrary_edit(&base, &raw);
      let normalized = edit.clone().normalize();

      normalized.clone().normalize() == normalized && normalized.apply(&base) == edit.apply(&base)
    }

    fn prop_inverse_law(base: String, raw: Vec<(usize, usize, String)>) -> bool {
      let edit = arbitrary_edit(&base, &raw);
      let edited = edit.apply(&base);

      edit.inverse(&base).apply(&edited) == base
    }

    fn prop_json_round_trip(base: String, raw: Vec<(usize, usize, String)>) -> bool {
      let edit = arbitrary_edit(&base, &raw);
      let json = edit.to_json().unwrap();

      StringEdit::from_json(&json).unwrap() == edit
    }

    fn prop_shrink_preserves_effect(base: String, raw: Vec<(usize, usize, String)>) -> bool {
      let edit = arbitrary_edit(&base, &raw);

      edit.remove_common_suffix_prefix(&base).apply(&base) == edit.apply(&base)
    }
  }
}
