//! Hot pixel: a sensor location firing at the very same coordinate again and again.
use itertools::Itertools;

use crate::{
    constants::{PixelXY, Resolution},
    grouping::{group_by_resolution, group_by_xy, Exclusion, Groups},
    hits::Hit,
};

/// Hits of one device grouped by resolution, then by exact pixel.
pub type HotPixelGroups<'a> = Vec<(Resolution, Groups<'a, PixelXY>)>;

/// Group the hits of one device by resolution and exact `(x, y)`.
pub fn group_for_hot_pixel<'a, I>(hits: I, exclusion: Option<Exclusion<'_>>) -> HotPixelGroups<'a>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_resolution(hits, exclusion)
        .into_iter()
        .map(|(resolution, members)| (resolution, group_by_xy(members, None)))
        .filter(|(_, pixels)| !pixels.is_empty())
        .collect()
}

/// Flag every hit of one exact-pixel group when the pixel fired at `often` or more distinct
/// timestamps.
///
/// Return
/// ----------
/// * `true` when the group was flagged; each hit then carries the distinct count as
///   `artifact_hot_pixel`.
pub fn hot_pixel_classify(pixel_hits: &mut [&mut Hit], often: usize) -> bool {
    let count = pixel_hits.iter().map(|h| h.timestamp).unique().count();
    if count < often {
        return false;
    }
    for hit in pixel_hits.iter_mut() {
        hit.mark_artifact();
        hit.evidence.hot_pixel = Some(count);
    }
    true
}

/// Run [`hot_pixel_classify`] over every pixel group.
pub fn hot_pixel_process(groups: &mut HotPixelGroups<'_>, often: usize) -> usize {
    let mut flagged = 0;
    for (_, pixels) in groups.iter_mut() {
        for (_, pixel_hits) in pixels.iter_mut() {
            if hot_pixel_classify(pixel_hits, often) {
                flagged += pixel_hits.len();
            }
        }
    }
    flagged
}
