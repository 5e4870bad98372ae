//! Too large bright area: a crop where too much of the surface is bright, typically light
//! leaking onto an uncovered sensor.
//!
//! The bright area is `image_brighter_count_<threshold> × 1000 / (width × height)` in
//! per-mille of the decoded image. Both the counter and the image size must already be
//! known; a missing one is a pipeline ordering error and is reported as
//! [`HitSieveError::MissingEvidence`].
use crate::{
    constants::brighter_count_field,
    hits::Hit,
    hitsieve_errors::HitSieveError,
    imaging::frame_decoder::{brightest_channel, count_of_brightest_pixels},
};

/// Bright area of the hit in per-mille of its image area.
pub fn bright_area_per_mille(hit: &Hit, threshold: u8) -> Result<f64, HitSieveError> {
    let (width, height) = hit.image_size.ok_or_else(|| hit.missing("image"))?;
    let area = hit
        .brighter_count(threshold)
        .ok_or_else(|| hit.missing(&brighter_count_field(threshold)))?;
    Ok(area as f64 * 1000.0 / (width as f64 * height as f64))
}

/// Flag the hit when its bright area is strictly greater than `cutoff` (‰).
///
/// Return
/// ----------
/// * `Ok(true)` when flagged; the area is then stored as `artifact_too_large_bright_area`.
pub fn too_large_bright_area_classify(
    hit: &mut Hit,
    threshold: u8,
    cutoff: f64,
) -> Result<bool, HitSieveError> {
    let p = bright_area_per_mille(hit, threshold)?;
    if p > cutoff {
        hit.mark_artifact();
        hit.evidence.too_large_bright_area = Some(p);
        return Ok(true);
    }
    Ok(false)
}

/// Count the bright pixels of the decoded image, then classify.
pub fn too_large_bright_area(
    hit: &mut Hit,
    threshold: u8,
    cutoff: f64,
) -> Result<bool, HitSieveError> {
    count_of_brightest_pixels(hit, threshold, brightest_channel)?;
    too_large_bright_area_classify(hit, threshold, cutoff)
}
