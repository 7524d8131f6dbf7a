//! Text replacements carrying an annotation.
//!
//! [`AnnotatedStringReplacement`] is the second concrete payload of the
//! algebra: text plus a caller-defined annotation (an edit source, a
//! provider id, ...). Unlike plain text, two touching annotated replacements
//! only merge when their annotations are equal, so [`Edit::normalize`] keeps
//! differently-annotated runs apart.

use crate::{
  Tendril,
  edit::{
    Edit,
    Replacement,
  },
  range::OffsetRange,
  text::{
    StringEdit,
    StringReplacement,
  },
};

/// An edit over annotated text replacements.
pub type AnnotatedStringEdit<A> = Edit<AnnotatedStringReplacement<A>>;

/// Replace `replace_range` with `new_text`, tagged with `annotation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedStringReplacement<A> {
  replace_range: OffsetRange,
  new_text:      Tendril,
  annotation:    A,
}

impl<A> AnnotatedStringReplacement<A> {
  pub fn new(replace_range: OffsetRange, new_text: impl Into<Tendril>, annotation: A) -> Self {
    Self {
      replace_range,
      new_text: new_text.into(),
      annotation,
    }
  }

  pub fn new_text(&self) -> &str {
    &self.new_text
  }

  pub fn annotation(&self) -> &A {
    &self.annotation
  }
}

impl<A: Clone + Eq> Replacement for AnnotatedStringReplacement<A> {
  fn replace_range(&self) -> OffsetRange {
    self.replace_range
  }

  fn new_len(&self) -> usize {
    self.new_text.len()
  }

  fn slice(&self, new_range: OffsetRange, range_in_replacement: OffsetRange) -> Self {
    Self {
      replace_range: new_range,
      new_text:      Tendril::from(
        &self.new_text[range_in_replacement.start..range_in_replacement.end],
      ),
      annotation:    self.annotation.clone(),
    }
  }

  /// Only replacements with the same annotation may merge.
  fn try_join_touching(&self, other: &Self) -> Option<Self> {
    if self.annotation != other.annotation {
      return None;
    }
    let mut new_text = self.new_text.clone();
    new_text.push_str(&other.new_text);
    Some(Self {
      replace_range: self.replace_range.join_right_touching(other.replace_range),
      new_text,
      annotation: self.annotation.clone(),
    })
  }
}

impl<A: Clone + Eq> Edit<AnnotatedStringReplacement<A>> {
  /// Drops the annotations, keeping the text effect.
  pub fn strip_annotations(&self) -> StringEdit {
    let replacements = self
      .replacements()
      .iter()
      .map(|r| StringReplacement::new(r.replace_range(), r.new_text()))
      .collect();
    StringEdit::from_sorted(replacements)
  }
}
