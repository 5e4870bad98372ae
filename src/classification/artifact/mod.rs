//! # Artifact heuristics
//!
//! ## Overview
//! -----------------
//! Five independent passes flag hits as [`Classification::Artifact`](crate::hits::Classification):
//!
//! | Pass | Grouping | Flags when |
//! |---|---|---|
//! | [`hot_pixel`] | resolution → exact pixel | distinct timestamps on the pixel ≥ `often` |
//! | [`near_hot_pixel`] | resolution → near pixel cluster | cluster members ≥ `often` |
//! | [`near_hot_pixel2`] | resolution | neighbourhood occurrence sum ≥ `often` |
//! | [`too_often`] | device + time window → timestamp | distinct timestamps in the window ≥ `often` |
//! | [`too_large_bright_area`] | none | bright area (‰ of the image) > cutoff |
//!
//! The passes commute: they can run in any order, be skipped individually or be re-run
//! without changing their outcome. The `*_process` entry points return the number of hits
//! they flagged in that call.
pub mod hot_pixel;
pub mod near_hot_pixel;
pub mod near_hot_pixel2;
pub mod too_large_bright_area;
pub mod too_often;
