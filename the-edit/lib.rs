use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod annotated;
pub mod edit;
pub mod range;
pub mod text;
pub mod tracking;

pub type Tendril = SmartString<LazyCompact>;
