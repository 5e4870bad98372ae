//! # Hit classification
//!
//! Classification passes work on [`Groups`](crate::grouping::Groups) of hits, never on raw
//! sequences, and only ever add to a hit: `classified` is set by the first pass reaching the
//! hit and every pass appends its own evidence slot.
pub mod artifact;
