use base64::{engine::general_purpose::STANDARD, Engine as _};
use hitsieve::{imaging::frame_decoder::encode_png, Config};
use image::{Rgba, RgbaImage};
use serde_json::{json, Value};

/// Declared capture frame size of every fixture hit.
pub const FRAME: (u32, u32) = (100, 100);

pub fn quiet_config() -> Config {
    Config::builder().log(false).build().unwrap()
}

/// Square crop filled with one grey level.
pub fn uniform_crop(size: u32, level: u8) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba([level, level, level, 255]))
}

pub fn crop_base64(crop: &RgbaImage) -> String {
    STANDARD.encode(encode_png(crop).unwrap())
}

/// JSON object of a hit as exported by the detector backend, with an optional crop.
pub fn hit_json(id: i64, device_id: i64, timestamp: i64, xy: (i64, i64), crop: Option<&RgbaImage>) -> Value {
    let mut hit = json!({
        "id": id,
        "device_id": device_id,
        "timestamp": timestamp,
        "width": FRAME.0,
        "height": FRAME.1,
        "x": xy.0,
        "y": xy.1,
        "provider": "it",
    });
    if let Some(c) = crop {
        hit["frame_content"] = json!(crop_base64(c));
    }
    hit
}

/// Serialize `objects` as a JSON array, joining the elements with `separator`.
pub fn json_array(objects: &[Value], separator: &str) -> String {
    let body: Vec<String> = objects.iter().map(Value::to_string).collect();
    format!("[{}]", body.join(separator))
}
