//! Near hot pixel, exhaustive variant.
//!
//! ## Overview
//! -----------------
//! For the hits of one device and one resolution:
//!
//! 1. count the occurrences of every exact pixel;
//! 2. for every hit, sum the occurrence counts of all pixels strictly closer than
//!    `distance`, **including the hit's own pixel**, so the sum is at least 1.
//!
//! The sum is written to `artifact_near_hot_pixel2` on **every** evaluated hit, flagged or
//! not; the hit is flagged when the sum reaches `often`.
//!
//! The neighbourhood scan is `O(n × p)` for `n` hits over `p` distinct pixels and runs on
//! the `rayon` pool.
use rayon::prelude::*;

use crate::{
    constants::{PixelXY, Resolution},
    grouping::{group_by_resolution, point_to_point_distance, Exclusion, FastHashMap, Groups},
    hits::Hit,
};

/// Group the hits of one device by resolution.
pub fn group_for_near_hot_pixel2<'a, I>(
    hits: I,
    exclusion: Option<Exclusion<'_>>,
) -> Groups<'a, Resolution>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_resolution(hits, exclusion)
}

/// Neighbourhood occurrence sum of `xy` over the exact-pixel histogram.
fn neighbourhood(hot_pixels: &FastHashMap<PixelXY, usize>, xy: PixelXY, distance: f64) -> usize {
    hot_pixels
        .iter()
        .filter(|(&pixel, _)| point_to_point_distance(pixel, xy) < distance)
        .map(|(_, &count)| count)
        .sum()
}

/// Classify the hits of one resolution group.
///
/// Return
/// ----------
/// * The number of hits flagged by this call.
pub fn near_hot_pixel_classify2(hits: &mut [&mut Hit], often: usize, distance: f64) -> usize {
    let mut hot_pixels: FastHashMap<PixelXY, usize> = FastHashMap::default();
    for hit in hits.iter() {
        *hot_pixels.entry(hit.xy()).or_insert(0) += 1;
    }

    let sums: Vec<usize> = hits
        .par_iter()
        .map(|hit| neighbourhood(&hot_pixels, hit.xy(), distance))
        .collect();

    let mut flagged = 0;
    for (hit, sum) in hits.iter_mut().zip(sums) {
        hit.evidence.near_hot_pixel2 = Some(sum);
        if sum >= often {
            hit.mark_artifact();
            flagged += 1;
        }
    }
    flagged
}

pub fn near_hot_pixel_process2(
    groups: &mut Groups<'_, Resolution>,
    often: usize,
    distance: f64,
) -> usize {
    groups
        .iter_mut()
        .map(|(_, hits)| near_hot_pixel_classify2(hits, often, distance))
        .sum()
}

#[cfg(test)]
mod near_hot_pixel2_test {
    use super::*;

    fn hits_at(points: &[(i64, i64)]) -> Vec<Hit> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Hit::new(i as i64, 1, 1000 * i as i64)
                    .with_resolution(100, 100)
                    .with_xy(x, y)
            })
            .collect()
    }

    #[test]
    fn test_evidence_is_recorded_on_every_hit() {
        let mut hits = hits_at(&[(10, 10), (10, 10), (12, 10), (80, 80)]);
        let mut groups = group_for_near_hot_pixel2(hits.iter_mut(), None);
        assert_eq!(near_hot_pixel_process2(&mut groups, 3, 5.0), 3);

        let sums: Vec<Option<usize>> = hits.iter().map(|h| h.evidence.near_hot_pixel2).collect();
        assert_eq!(sums, vec![Some(3), Some(3), Some(3), Some(1)]);
        assert!(!hits[3].is_artifact());
        assert!(hits[..3].iter().all(Hit::is_artifact));
    }

    #[test]
    fn test_sum_includes_own_pixel_and_is_not_transitive() {
        // (0,0) and (8,0) are both within 5 px of (4,0) but not of each other
        let mut hits = hits_at(&[(0, 0), (4, 0), (8, 0)]);
        let mut groups = group_for_near_hot_pixel2(hits.iter_mut(), None);
        near_hot_pixel_process2(&mut groups, 3, 5.0);

        assert_eq!(hits[0].evidence.near_hot_pixel2, Some(2));
        assert_eq!(hits[1].evidence.near_hot_pixel2, Some(3));
        assert_eq!(hits[2].evidence.near_hot_pixel2, Some(2));
        assert!(hits[1].is_artifact());
        assert!(!hits[0].is_artifact());
    }

    #[test]
    fn test_resolutions_do_not_mix() {
        let mut hits = hits_at(&[(10, 10), (10, 10)]);
        hits.push(
            Hit::new(9, 1, 9000)
                .with_resolution(640, 480)
                .with_xy(10, 10),
        );
        let mut groups = group_for_near_hot_pixel2(hits.iter_mut(), None);
        near_hot_pixel_process2(&mut groups, 3, 5.0);
        assert_eq!(hits[2].evidence.near_hot_pixel2, Some(1));
        assert!(hits.iter().all(|h| !h.is_artifact()));
    }
}
