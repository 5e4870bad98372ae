//! # Grouping engine
//!
//! Partitions a flat sequence of hits into groups keyed by device, resolution, pixel
//! position, spatial proximity or time bucket. Every classifier consumes groups built here.
//!
//! ## Ownership model
//! -----------------
//! A [`Groups`] holds **`&mut Hit` borrows**: each hit lands in exactly one group, so a
//! partition can be re-partitioned (`device → resolution → pixel`) and every leaf group can
//! be mutated by a classifier, possibly on another thread, with the borrow checker proving
//! that no two groups alias the same hit. Groups live only for the duration of one pass.
//!
//! ## Ordering
//! -----------------
//! Keys are kept in **insertion order** (order first seen in the input), backed by an
//! `ahash` index for exact lookups. The order is load-bearing for
//! [`group_by_near_xy`]: a hit joins the first previously seen key within the radius, so
//! traversal order decides which of several candidate anchors becomes canonical.
//!
//! ## Exclusion
//! -----------------
//! Every `group_by_*` function takes an optional [`Exclusion`] predicate; hits for which it
//! returns `true` are left out of every group and are not surfaced anywhere else.
use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;

use crate::{
    constants::{DeviceId, Millis, PixelXY, Resolution, TimeBucket},
    hits::Hit,
};

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;

/// Predicate excluding hits from a grouping; `Sync` so groupings can run on worker threads.
pub type Exclusion<'e> = &'e (dyn Fn(&Hit) -> bool + Sync);

/// Insertion-ordered partition of mutably borrowed hits.
#[derive(Debug)]
pub struct Groups<'a, K> {
    keys: Vec<K>,
    members: Vec<Vec<&'a mut Hit>>,
    index: FastHashMap<K, usize>,
}

impl<K> Default for Groups<'_, K> {
    fn default() -> Self {
        Groups {
            keys: Vec::new(),
            members: Vec::new(),
            index: FastHashMap::default(),
        }
    }
}

impl<'a, K: Eq + Hash + Clone> Groups<'a, K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, key: K, hit: &'a mut Hit) {
        match self.index.get(&key) {
            Some(&i) => self.members[i].push(hit),
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push(key);
                self.members.push(vec![hit]);
            }
        }
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn get(&self, key: &K) -> Option<&[&'a mut Hit]> {
        self.index.get(key).map(|&i| self.members[i].as_slice())
    }

    /// Number of hits over all groups.
    pub fn total_members(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[&'a mut Hit])> + '_ {
        self.keys
            .iter()
            .zip(self.members.iter().map(Vec::as_slice))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut Vec<&'a mut Hit>)> + '_ {
        self.keys.iter().zip(self.members.iter_mut())
    }
}

impl<'a, K> IntoIterator for Groups<'a, K> {
    type Item = (K, Vec<&'a mut Hit>);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<Vec<&'a mut Hit>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.members)
    }
}

/// Group hits by a key computed from the hit and the keys seen so far.
///
/// Arguments
/// -----------------
/// * `hits`: the hits to partition, consumed as mutable borrows.
/// * `key_fn`: receives the hit and the already created keys (insertion order).
/// * `exclusion`: hits for which it returns `true` are skipped.
///
/// Return
/// ----------
/// * The partition; empty groups never appear.
pub fn group_by_lambda<'a, K, I, F>(
    hits: I,
    mut key_fn: F,
    exclusion: Option<Exclusion<'_>>,
) -> Groups<'a, K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a mut Hit>,
    F: FnMut(&Hit, &[K]) -> K,
{
    let mut groups = Groups::new();
    for hit in hits {
        if exclusion.is_some_and(|excluded| excluded(&*hit)) {
            continue;
        }
        let key = key_fn(&*hit, &groups.keys);
        groups.push(key, hit);
    }
    groups
}

pub fn group_by_device_id<'a, I>(hits: I, exclusion: Option<Exclusion<'_>>) -> Groups<'a, DeviceId>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_lambda(hits, |h, _| h.device_id, exclusion)
}

pub fn group_by_resolution<'a, I>(
    hits: I,
    exclusion: Option<Exclusion<'_>>,
) -> Groups<'a, Resolution>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_lambda(hits, |h, _| h.resolution(), exclusion)
}

pub fn group_by_xy<'a, I>(hits: I, exclusion: Option<Exclusion<'_>>) -> Groups<'a, PixelXY>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_lambda(hits, |h, _| h.xy(), exclusion)
}

/// Group by `timestamp / time_division` (floor division).
///
/// # Panics
/// When `time_division` is 0; [`Config::validate`](crate::config::Config::validate)
/// rejects such a value.
pub fn group_by_timestamp_division<'a, I>(
    hits: I,
    time_division: Millis,
    exclusion: Option<Exclusion<'_>>,
) -> Groups<'a, TimeBucket>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_lambda(hits, |h, _| h.timestamp.div_euclid(time_division), exclusion)
}

/// Euclidean distance between two pixels.
pub fn point_to_point_distance(a: PixelXY, b: PixelXY) -> f64 {
    ((a.0 - b.0) as f64).hypot((a.1 - b.1) as f64)
}

/// First key of `keys` strictly nearer than `distance` to the hit, or the hit's own position.
pub fn get_near_xy_key(keys: &[PixelXY], hit: &Hit, distance: f64) -> PixelXY {
    let xy = hit.xy();
    keys.iter()
        .copied()
        .find(|&k| point_to_point_distance(k, xy) < distance)
        .unwrap_or(xy)
}

/// Group hits into clusters anchored on the first hit of each cluster.
///
/// A hit joins the first existing anchor (insertion order) strictly nearer than `distance`,
/// or becomes a new anchor.
pub fn group_by_near_xy<'a, I>(
    hits: I,
    distance: f64,
    exclusion: Option<Exclusion<'_>>,
) -> Groups<'a, PixelXY>
where
    I: IntoIterator<Item = &'a mut Hit>,
{
    group_by_lambda(hits, |h, keys| get_near_xy_key(keys, h, distance), exclusion)
}
