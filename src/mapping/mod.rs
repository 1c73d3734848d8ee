//! Source <-> generated range correspondence.
//!
//! This module provides:
//! - `Mapping` and `RangePair` describing one correspondence unit
//! - `MappingIndex` answering range-translation queries in either direction

mod index;

pub use index::{Mapping, MappingIndex, MappingKind, RangePair, Side};
