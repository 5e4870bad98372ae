mod common;

use std::io::Cursor;

use common::{hit_json, json_array, quiet_config, uniform_crop};
use hitsieve::{
    imaging::frame_decoder::hit_load_parser,
    io::stream_extractor::{load_objects_from_str, ObjectExtractor},
    Hit, HitSieveError,
};
use serde_json::{json, Value};

fn sample_objects() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "alpha", "tags": ["a", "b"]}),
        json!({"id": 2, "nested": {"deeper": {"x": 1.5}}, "empty": {}}),
        json!({"id": 3, "list": [{"k": 1}, {"k": 2}], "flag": null}),
    ]
}

#[test]
fn extracted_objects_reparse_to_the_array_elements() {
    let objects = sample_objects();
    for separator in [",", " , ", ",\n", "\n,\n\t", "\r\n,   \r\n"] {
        let text = format!("  \n{}\n", json_array(&objects, separator));
        let reparsed: Vec<Value> = ObjectExtractor::new(Cursor::new(text.as_bytes()))
            .map(|raw| serde_json::from_str(&raw.unwrap()).unwrap())
            .collect();
        assert_eq!(reparsed, objects, "separator {separator:?}");
    }
}

#[test]
fn leading_noise_is_ignored() {
    let text = format!("HTTP/1.1 200 OK\n\n{}", json_array(&sample_objects(), ","));
    let (objects, stats) =
        load_objects_from_str::<Value, _>(&text, &quiet_config(), |_| true).unwrap();
    assert_eq!(objects, sample_objects());
    assert_eq!(stats.rejected, 0);
}

#[test]
fn accepted_plus_rejected_is_total_for_every_filter() {
    let objects: Vec<Value> = (0..23).map(|i| json!({"id": i})).collect();
    let text = json_array(&objects, ",\n");
    let filters: Vec<Box<dyn Fn(&mut Value) -> bool>> = vec![
        Box::new(|_: &mut Value| true),
        Box::new(|_: &mut Value| false),
        Box::new(|v: &mut Value| v["id"].as_i64().unwrap() % 3 == 0),
        Box::new(|v: &mut Value| v["id"].as_i64().unwrap() < 10),
    ];
    for filter in filters {
        let config = hitsieve::Config::builder().log(false).log_every(5).build().unwrap();
        let (accepted, stats) =
            load_objects_from_str(&text, &config, |v: &mut Value| filter(v)).unwrap();
        assert_eq!(stats.total(), 23);
        assert_eq!(stats.accepted, accepted.len());
    }
}

#[test]
fn hit_loader_rejects_hits_without_payload_and_keeps_corrupt_ones() {
    let crop = uniform_crop(5, 80);
    let mut corrupt = hit_json(3, 1, 3000, (10, 10), None);
    corrupt["frame_content"] = json!("bm90IGEgcG5n");
    let text = json_array(
        &[
            hit_json(1, 1, 1000, (10, 10), Some(&crop)),
            hit_json(2, 1, 2000, (10, 10), None),
            corrupt,
        ],
        ",",
    );

    let (hits, stats) =
        load_objects_from_str::<Hit, _>(&text, &quiet_config(), hit_load_parser).unwrap();
    assert_eq!((stats.accepted, stats.rejected), (2, 1));
    assert_eq!(hits[0].id, 1);
    assert!(hits[0].has_image());
    assert_eq!(hits[0].image_size, Some((5, 5)));
    assert_eq!(hits[0].extra.get("provider"), Some(&json!("it")));

    assert_eq!(hits[1].id, 3);
    assert!(!hits[1].has_image());
    assert!(hits[1].decode_error.is_some());
}

#[test]
fn malformed_hit_aborts_the_load() {
    let text = r#"[{"id": 1, "device_id": 1, "timestamp": 0}, {"id": "one"}]"#;
    let err = load_objects_from_str::<Hit, _>(text, &quiet_config(), |_| true).unwrap_err();
    assert!(matches!(err, HitSieveError::MalformedObject { index: 1, .. }));
}

#[test]
fn loosely_typed_hits_without_payload_are_rejected() {
    for object in [
        json!({"id": 1, "device_id": 1, "timestamp": 0, "x": null, "y": null, "frame_content": ""}),
        json!({"id": 2, "device_id": 1, "timestamp": 0, "width": 1920.0, "height": 1080.0}),
        json!({"id": 3, "device_id": 1, "timestamp": 0, "frame_content": null}),
    ] {
        let text = json_array(&[object.clone()], ",");
        let (hits, stats) =
            load_objects_from_str::<Hit, _>(&text, &quiet_config(), hit_load_parser).unwrap();
        assert!(hits.is_empty(), "{object}");
        assert_eq!((stats.accepted, stats.rejected), (0, 1), "{object}");
    }
}

#[test]
fn integral_float_geometry_is_kept_on_accepted_hits() {
    let mut object = hit_json(1, 1, 1000, (10, 10), Some(&uniform_crop(5, 80)));
    object["width"] = json!(100.0);
    object["x"] = json!(10.0);
    let (hits, stats) = load_objects_from_str::<Hit, _>(
        &json_array(&[object], ","),
        &quiet_config(),
        hit_load_parser,
    )
    .unwrap();
    assert_eq!(stats.accepted, 1);
    assert_eq!(hits[0].resolution(), (100, 100));
    assert_eq!(hits[0].xy(), (10, 10));
}
