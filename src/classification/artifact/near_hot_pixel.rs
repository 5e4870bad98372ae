//! Near hot pixel, clustered variant.
//!
//! Hits of one resolution are clustered with [`group_by_near_xy`]: each hit joins the first
//! anchor seen strictly closer than `distance`, or becomes an anchor itself. A cluster with
//! `often` or more members is flagged, and its members record the cluster size and anchor.
use crate::{
    constants::{PixelXY, Resolution},
    grouping::{group_by_near_xy, group_by_resolution, Exclusion, Groups},
    hits::Hit,
};

/// Hits of one device grouped by resolution, then by near-pixel cluster anchor.
pub type NearHotPixelGroups<'a> = Vec<(Resolution, Groups<'a, PixelXY>)>;

pub fn group_for_near_hot_pixel<'a, I>(
    hits: I,
    distance: f64,
    exclusion: Option<Exclusion<'_>>,
) -> NearHotPixelGroups<'a>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_resolution(hits, exclusion)
        .into_iter()
        .map(|(resolution, members)| (resolution, group_by_near_xy(members, distance, None)))
        .filter(|(_, clusters)| !clusters.is_empty())
        .collect()
}

/// Flag a whole cluster when it holds at least `often` hits.
///
/// Arguments
/// -----------------
/// * `cluster`: the members of one near-pixel cluster.
/// * `often`: minimal cluster size.
/// * `anchor`: the cluster key, stored as `artifact_near_hot_pixel_refxy`.
pub fn near_hot_pixel_classify(cluster: &mut [&mut Hit], often: usize, anchor: PixelXY) -> bool {
    let count = cluster.len();
    if count < often {
        return false;
    }
    for hit in cluster.iter_mut() {
        hit.mark_artifact();
        hit.evidence.near_hot_pixel = Some(count);
        hit.evidence.near_hot_pixel_refxy = Some(anchor);
    }
    true
}

pub fn near_hot_pixel_process(groups: &mut NearHotPixelGroups<'_>, often: usize) -> usize {
    let mut flagged = 0;
    for (_, clusters) in groups.iter_mut() {
        for (anchor, cluster) in clusters.iter_mut() {
            if near_hot_pixel_classify(cluster, often, *anchor) {
                flagged += cluster.len();
            }
        }
    }
    flagged
}
