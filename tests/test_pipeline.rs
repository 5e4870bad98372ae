mod common;

use approx::assert_relative_eq;
use common::{hit_json, json_array, quiet_config, uniform_crop};
use hitsieve::{
    analyse_hits_batch,
    imaging::frame_decoder::{hit_load_parser, load_image},
    io::stream_extractor::load_objects_from_str, Config, Hit,
};
use image::Rgba;
use serde_json::Value;

fn batch_text() -> String {
    let dim = uniform_crop(5, 30);
    let bright = uniform_crop(10, 200);
    let mut objects: Vec<Value> = Vec::new();

    // device 1: the same pixel in three different minutes
    for (i, t) in [1_000_000, 2_000_000, 3_000_000].into_iter().enumerate() {
        objects.push(hit_json(10 + i as i64, 1, t, (10, 10), Some(&dim)));
    }
    // device 2: four captures within one minute, far apart
    for (i, xy) in [(10, 10), (40, 40), (70, 70), (90, 20)].into_iter().enumerate() {
        objects.push(hit_json(20 + i as i64, 2, 120_000 + 1000 * i as i64, xy, Some(&dim)));
    }
    // device 3: a saturated crop and a quiet one
    objects.push(hit_json(30, 3, 500_000, (50, 50), Some(&bright)));
    objects.push(hit_json(31, 3, 900_000, (20, 80), Some(&dim)));
    // device 4: no payload
    objects.push(hit_json(40, 4, 0, (1, 1), None));

    json_array(&objects, ",\n")
}

fn run(config: &Config) -> Vec<Hit> {
    let (mut hits, stats) =
        load_objects_from_str::<Hit, _>(&batch_text(), config, hit_load_parser).unwrap();
    assert_eq!((stats.accepted, stats.rejected), (9, 1));

    let report = analyse_hits_batch(&mut hits, config).unwrap();
    assert_eq!(report.total, 9);
    assert_eq!(report.analysed, 9);
    assert_eq!(report.devices, 3);
    hits
}

fn by_id(hits: &[Hit], id: i64) -> &Hit {
    hits.iter().find(|h| h.id == id).unwrap()
}

#[test]
fn every_heuristic_flags_its_own_case() {
    let hits = run(&quiet_config());

    for id in 10..13 {
        let hit = by_id(&hits, id);
        assert!(hit.is_artifact());
        assert_eq!(hit.evidence.hot_pixel, Some(3));
        assert_eq!(hit.evidence.near_hot_pixel, Some(3));
        assert_eq!(hit.evidence.near_hot_pixel_refxy, Some((10, 10)));
        assert_eq!(hit.evidence.near_hot_pixel2, Some(3));
        assert_eq!(hit.evidence.too_often, None);
    }

    for id in 20..24 {
        let hit = by_id(&hits, id);
        assert!(hit.is_artifact());
        assert_eq!(hit.evidence.too_often, Some(4));
        assert_eq!(hit.evidence.hot_pixel, None);
        assert_eq!(hit.evidence.near_hot_pixel2, Some(1));
    }

    let saturated = by_id(&hits, 30);
    assert!(saturated.is_artifact());
    assert_relative_eq!(saturated.evidence.too_large_bright_area.unwrap(), 1000.0);
    assert_eq!(saturated.brighter_count(70), Some(100));

    let quiet = by_id(&hits, 31);
    assert!(!quiet.is_artifact());
    assert_eq!(quiet.evidence.near_hot_pixel2, Some(1));
    assert_eq!(quiet.photometry.darkness, Some(30));
    assert_eq!(quiet.photometry.brightest, Some(30));
}

#[test]
fn exhaustive_evidence_is_present_on_every_analysed_hit() {
    let hits = run(&quiet_config());
    assert!(hits.iter().all(|h| h.evidence.near_hot_pixel2.is_some()));
}

#[test]
fn rerunning_the_batch_changes_nothing() {
    let config = quiet_config();
    let mut hits = run(&config);
    let first: Vec<String> = hits.iter().map(|h| format!("{:?}", h.to_fields())).collect();

    // images were released at the end of the first run
    for hit in hits.iter_mut() {
        load_image(hit).unwrap();
    }
    analyse_hits_batch(&mut hits, &config).unwrap();
    let second: Vec<String> = hits.iter().map(|h| format!("{:?}", h.to_fields())).collect();
    assert_eq!(first, second);
}

#[test]
fn blanked_crop_is_restored_from_the_earlier_hit() {
    let mut first = uniform_crop(5, 120);
    first.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
    // captured after the first crop was cut out: its left columns are black
    let mut second = uniform_crop(5, 60);
    for x in 0..2 {
        for y in 0..5 {
            second.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    let text = json_array(
        &[
            hit_json(2, 7, 42_000, (53, 50), Some(&second)),
            hit_json(1, 7, 42_000, (50, 50), Some(&first)),
        ],
        ",",
    );
    let config = quiet_config();
    let (mut hits, _) = load_objects_from_str::<Hit, _>(&text, &config, hit_load_parser).unwrap();
    let report = analyse_hits_batch(&mut hits, &config).unwrap();
    assert_eq!(report.frames_reconstructed, 1);

    let restored = &hits[1];
    assert_eq!(restored.id, 2);
    assert!(restored.frame_decoded_orig.is_some());
    assert_eq!(restored.photometry.darkness, Some(60));
    assert_eq!(restored.photometry.brightest, Some(120));
}
