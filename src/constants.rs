//! # Constants and type definitions for hitsieve
//!
//! This module centralizes the **field names**, **default thresholds**, and **common type
//! definitions** used throughout the `hitsieve` library.
//!
//! ## Overview
//!
//! - Canonical field names of a hit record, as they appear in the input JSON and in the
//!   tabular output
//! - Default parameters of the artifact classifiers
//! - Core type aliases used across the crate
//!
//! Field names are shared by the [`Hit`](crate::hits::Hit) (de)serialization, the CSV
//! flattening in [`csv_writer`](crate::io::csv_writer), and the debug-image paths.

// -------------------------------------------------------------------------------------------------
// Original fields of a hit, as found in the input JSON
// -------------------------------------------------------------------------------------------------

pub const ID: &str = "id";
pub const DEVICE_ID: &str = "device_id";
pub const TIMESTAMP: &str = "timestamp";

pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";

pub const X: &str = "x";
pub const Y: &str = "y";

pub const FRAME_CONTENT: &str = "frame_content";

// -------------------------------------------------------------------------------------------------
// Fields added by the processing stages
// -------------------------------------------------------------------------------------------------

pub const FRAME_DECODED: &str = "frame_decoded";
pub const FRAME_DECODED_ORIG: &str = "frame_decoded_orig";
pub const IMAGE_WIDTH: &str = "image_width";
pub const IMAGE_HEIGHT: &str = "image_height";
pub const DECODE_ERROR: &str = "decode_error";

/// Image basic stats
pub const DARKNESS: &str = "image_darkness";
pub const BRIGHTEST: &str = "image_brightest";
/// Prefix of the per-threshold bright pixel counters, see [`brighter_count_field`].
pub const BRIGHTER_COUNT_PREFIX: &str = "image_brighter_count_";

/// Reconstruction of the black filled area
pub const EDGE: &str = "edge";
pub const CROP_X: &str = "crop_x";
pub const CROP_Y: &str = "crop_y";
pub const CROP_SIZE: &str = "crop_size";

/// Classification
pub const CLASSIFIED: &str = "classified";
pub const CLASS_ARTIFACT: &str = "artifact";

/// Artifact evidence fields
pub const ARTIFACT_TOO_OFTEN: &str = "artifact_too_often";
pub const ARTIFACT_HOT_PIXEL: &str = "artifact_hot_pixel";
pub const ARTIFACT_NEAR_HOT_PIXEL: &str = "artifact_near_hot_pixel";
pub const ARTIFACT_NEAR_HOT_PIXEL_REFXY: &str = "artifact_near_hot_pixel_refxy";
pub const ARTIFACT_NEAR_HOT_PIXEL2: &str = "artifact_near_hot_pixel2";
pub const ARTIFACT_TOO_LARGE_BRIGHT_AREA: &str = "artifact_too_large_bright_area";

/// Name of the bright pixel counter field for a given threshold.
///
/// ```
/// assert_eq!(hitsieve::constants::brighter_count_field(128), "image_brighter_count_128");
/// ```
pub fn brighter_count_field(threshold: u8) -> String {
    format!("{BRIGHTER_COUNT_PREFIX}{threshold}")
}

// -------------------------------------------------------------------------------------------------
// Default classifier parameters
// -------------------------------------------------------------------------------------------------

/// Width of the "too often" time window and of the device-minute partition, in ms.
pub const DEFAULT_TIME_DIVISION: i64 = 60_000;

/// Distinct timestamps on one exact pixel before it counts as a hot pixel.
pub const DEFAULT_HOT_PIXEL_OFTEN: usize = 3;

/// Members of a near-pixel cluster before the cluster counts as a hot spot.
pub const DEFAULT_NEAR_HOT_PIXEL_OFTEN: usize = 3;

/// Radius (px) of a near-pixel neighbourhood.
pub const DEFAULT_NEAR_HOT_PIXEL_DISTANCE: f64 = 5.0;

/// Distinct timestamps in one time window before a device fires "too often".
pub const DEFAULT_TOO_OFTEN: usize = 4;

/// Pixel value from which a pixel counts as bright.
pub const DEFAULT_BRIGHT_THRESHOLD: u8 = 70;

/// Bright area cutoff, in per-mille of the image area.
pub const DEFAULT_BRIGHT_AREA_CUTOFF: f64 = 100.0;

/// Elements seen by the stream extractor between two progress lines.
pub const DEFAULT_LOG_EVERY: usize = 10_000;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Unique identifier of a hit
pub type HitId = i64;

/// Identifier of the detecting device
pub type DeviceId = i64;

/// Capture time in milliseconds
pub type Millis = i64;

/// Capture frame resolution `(width, height)`
pub type Resolution = (u32, u32);

/// Pixel position `(x, y)` within the capture frame
pub type PixelXY = (i64, i64);

/// Integer time bucket, `timestamp / time_division`
pub type TimeBucket = i64;
