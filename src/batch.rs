//! # Batch pipeline
//!
//! Wires the decoder, the reconstructor and the artifact passes into one ordered run over an
//! in-memory batch of hits.
//!
//! ## Pipeline
//! -----------------
//! 1. Sort the batch by `id` (arrival order inside a capture frame).
//! 2. Keep the hits holding a decoded image and split them by device. Devices are processed
//!    in parallel on the `rayon` pool; all hits of one device stay on one worker.
//! 3. Per device:
//!    - split by `time_division` bucket, then by exact timestamp (one capture frame), and
//!      reconstruct every frame still holding an unclassified hit;
//!    - measure darkness / brightest on the reconstructed crops;
//!    - run the enabled artifact passes: too often, hot pixel, near hot pixel (clustered),
//!      near hot pixel (exhaustive), too large bright area.
//! 4. Release the decoded rasters when [`Config::release_images`] is set.
//!
//! Hits without image (rejected by the loader or with a `decode_error`) stay in the batch
//! untouched.
use std::ops::AddAssign;

use log::debug;
use rayon::prelude::*;

use crate::{
    classification::artifact::{
        hot_pixel::{group_for_hot_pixel, hot_pixel_process},
        near_hot_pixel::{group_for_near_hot_pixel, near_hot_pixel_process},
        near_hot_pixel2::{group_for_near_hot_pixel2, near_hot_pixel_process2},
        too_large_bright_area::too_large_bright_area,
        too_often::{group_for_too_often, too_often_process},
    },
    config::Config,
    constants::DeviceId,
    grouping::{group_by_device_id, group_by_timestamp_division},
    hits::Hit,
    hitsieve_errors::HitSieveError,
    imaging::{
        frame_decoder::{brightest_channel, measure_darkness_brightest},
        reconstruction::{do_reconstruct, filter_unclassified},
    },
};

/// Summary of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Hits in the batch.
    pub total: usize,
    /// Hits with a decoded image, i.e. seen by the classifiers.
    pub analysed: usize,
    pub devices: usize,
    /// Capture frames with two hits or more that went through reconstruction.
    pub frames_reconstructed: usize,
    /// Hits classified as artifact at the end of the run.
    pub artifacts: usize,
}

impl AddAssign for BatchReport {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.analysed += rhs.analysed;
        self.devices += rhs.devices;
        self.frames_reconstructed += rhs.frames_reconstructed;
        self.artifacts += rhs.artifacts;
    }
}

fn reconstruct_device(hits: &mut [&mut Hit], config: &Config) -> Result<usize, HitSieveError> {
    let mut frames_reconstructed = 0;
    let by_bucket =
        group_by_timestamp_division(hits.iter_mut().map(|h| &mut **h), config.time_division, None);
    for (_, bucket_hits) in by_bucket {
        let frames = group_by_timestamp_division(bucket_hits, 1, None);
        let pending = filter_unclassified(&frames);
        for (timestamp, mut frame) in frames {
            if frame.len() < 2 || !pending.contains(&timestamp) {
                continue;
            }
            do_reconstruct(&mut frame, config)?;
            frames_reconstructed += 1;
        }
    }
    Ok(frames_reconstructed)
}

/// Run every enabled pass over the image hits of one device.
fn analyse_device(
    device_id: DeviceId,
    mut hits: Vec<&mut Hit>,
    config: &Config,
) -> Result<BatchReport, HitSieveError> {
    let mut report = BatchReport {
        analysed: hits.len(),
        devices: 1,
        ..Default::default()
    };

    if config.reconstruct {
        report.frames_reconstructed = reconstruct_device(&mut hits, config)?;
    }

    for hit in hits.iter_mut() {
        measure_darkness_brightest(hit, brightest_channel)?;
    }

    if config.too_often_enabled {
        let mut groups =
            group_for_too_often(hits.iter_mut().map(|h| &mut **h), config.time_division, None);
        let flagged = too_often_process(&mut groups, config.too_often);
        debug!("device {device_id}: too often flagged {flagged} hits");
    }

    if config.hot_pixel {
        let mut groups = group_for_hot_pixel(hits.iter_mut().map(|h| &mut **h), None);
        let flagged = hot_pixel_process(&mut groups, config.hot_pixel_often);
        debug!("device {device_id}: hot pixel flagged {flagged} hits");
    }

    if config.near_hot_pixel {
        let mut groups = group_for_near_hot_pixel(
            hits.iter_mut().map(|h| &mut **h),
            config.near_hot_pixel_distance,
            None,
        );
        let flagged = near_hot_pixel_process(&mut groups, config.near_hot_pixel_often);
        debug!("device {device_id}: near hot pixel flagged {flagged} hits");
    }

    if config.near_hot_pixel2 {
        let mut groups = group_for_near_hot_pixel2(hits.iter_mut().map(|h| &mut **h), None);
        let flagged = near_hot_pixel_process2(
            &mut groups,
            config.near_hot_pixel2_often,
            config.near_hot_pixel2_distance,
        );
        debug!("device {device_id}: exhaustive near hot pixel flagged {flagged} hits");
    }

    if config.too_large_bright_area {
        let mut flagged = 0;
        for hit in hits.iter_mut() {
            if too_large_bright_area(hit, config.bright_threshold, config.bright_area_cutoff)? {
                flagged += 1;
            }
        }
        debug!("device {device_id}: too large bright area flagged {flagged} hits");
    }

    Ok(report)
}

/// Classify a batch of hits in place.
///
/// Arguments
/// -----------------
/// * `hits`: the batch, usually the output of
///   [`load_objects_from_stream`](crate::io::stream_extractor::load_objects_from_stream)
///   with [`hit_load_parser`](crate::imaging::frame_decoder::hit_load_parser). It is
///   re-ordered by `id`.
/// * `config`: thresholds, pass toggles, logging and debug-image sink.
///
/// Return
/// ----------
/// * A [`BatchReport`], or the first batch-fatal error (invalid config, missing evidence,
///   geometry violation, debug-image I/O).
pub fn analyse_hits_batch(hits: &mut [Hit], config: &Config) -> Result<BatchReport, HitSieveError> {
    config.validate()?;
    let start = config.print_log(&format!("Analysing batch of {} hits...", hits.len()), None);
    hits.sort_by_key(|h| h.id);

    let without_image = |h: &Hit| !h.has_image();
    let by_device: Vec<(DeviceId, Vec<&mut Hit>)> =
        group_by_device_id(hits.iter_mut(), Some(&without_image))
            .into_iter()
            .collect();

    let reports = by_device
        .into_par_iter()
        .map(|(device_id, device_hits)| analyse_device(device_id, device_hits, config))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = BatchReport::default();
    for r in reports {
        report += r;
    }
    report.total = hits.len();
    report.artifacts = hits.iter().filter(|h| h.is_artifact()).count();

    if config.release_images {
        hits.iter_mut().for_each(Hit::release_image);
    }

    config.print_log(
        &format!(
            "... done: {} hits, {} analysed over {} devices, {} frames reconstructed, {} artifacts",
            report.total,
            report.analysed,
            report.devices,
            report.frames_reconstructed,
            report.artifacts
        ),
        Some(start),
    );
    Ok(report)
}
