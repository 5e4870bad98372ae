//! Too often: a device reporting hits at too many distinct instants within one time window.
use crate::{
    constants::{DeviceId, Millis, TimeBucket},
    grouping::{group_by_lambda, group_by_timestamp_division, Exclusion, Groups},
    hits::Hit,
};

/// Hits grouped by `(device, time window)`, then by exact timestamp.
pub type TooOftenGroups<'a> = Vec<((DeviceId, TimeBucket), Groups<'a, Millis>)>;

/// Group hits by device and `timestamp / time_division`, then by exact timestamp.
///
/// Arguments
/// -----------------
/// * `hits`: hits of any number of devices.
/// * `time_division`: window length in milliseconds (60 000 = one minute).
/// * `exclusion`: hits for which it returns `true` are ignored.
///
/// # Panics
/// When `time_division` is 0.
pub fn group_for_too_often<'a, I>(
    hits: I,
    time_division: Millis,
    exclusion: Option<Exclusion<'_>>,
) -> TooOftenGroups<'a>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    let windows = group_by_lambda(
        hits,
        |h, _| (h.device_id, h.timestamp.div_euclid(time_division)),
        exclusion,
    );
    windows
        .into_iter()
        .map(|(window, members)| (window, group_by_timestamp_division(members, 1, None)))
        .filter(|(_, by_timestamp)| !by_timestamp.is_empty())
        .collect()
}

/// Flag every hit of one window when it holds at least `often` distinct timestamps.
pub fn too_often_classify(by_timestamp: &mut Groups<'_, Millis>, often: usize) -> usize {
    let count = by_timestamp.len();
    if count < often {
        return 0;
    }
    let mut flagged = 0;
    for (_, hits) in by_timestamp.iter_mut() {
        for hit in hits.iter_mut() {
            hit.mark_artifact();
            hit.evidence.too_often = Some(count);
            flagged += 1;
        }
    }
    flagged
}

pub fn too_often_process(groups: &mut TooOftenGroups<'_>, often: usize) -> usize {
    groups
        .iter_mut()
        .map(|(_, by_timestamp)| too_often_classify(by_timestamp, often))
        .sum()
}
