//! # Hit records
//!
//! A [`Hit`] is one cosmic-ray detection event: identity and geometry fields read from
//! the input JSON, an optional image payload, and everything the pipeline derives from
//! it (photometry, crop placement after reconstruction, classification and evidence).
//!
//! ## Additive evidence
//! -----------------
//! Derived state only ever grows during a batch:
//! - [`Hit::mark_artifact`] sets `classified` only when it is still empty, so the first
//!   heuristic reaching a hit owns the classification;
//! - each heuristic writes its own [`ArtifactEvidence`] slot, which later heuristics never
//!   touch. A hit may therefore carry evidence from several heuristics.
//!
//! ## Open-ended fields
//! -----------------
//! Any input field not modelled here (location, user, team, metadata, ...) is kept in
//! [`Hit::extra`] and handed back untouched by [`Hit::to_fields`]. Names of the fields the
//! pipeline computes (`classified`, `frame_decoded`, `artifact_*`, ...) are dropped on
//! import, so a re-imported export never carries stale values next to fresh ones.
//!
//! ## Tolerant input
//! -----------------
//! Integer fields accept integral floats (`1920.0`) and integer strings. Geometry fields
//! (`width`, `height`, `x`, `y`) also accept `null` as 0. A `frame_content` that is not a
//! string counts as absent, so the loader rejects the hit instead of aborting the batch.
use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use crate::constants::{
    brighter_count_field, DeviceId, HitId, Millis, PixelXY, Resolution, ARTIFACT_HOT_PIXEL,
    ARTIFACT_NEAR_HOT_PIXEL, ARTIFACT_NEAR_HOT_PIXEL2, ARTIFACT_NEAR_HOT_PIXEL_REFXY,
    ARTIFACT_TOO_LARGE_BRIGHT_AREA, ARTIFACT_TOO_OFTEN, BRIGHTER_COUNT_PREFIX, BRIGHTEST,
    CLASSIFIED, CLASS_ARTIFACT,
    CROP_SIZE, CROP_X, CROP_Y, DARKNESS, DECODE_ERROR, DEVICE_ID, EDGE, FRAME_CONTENT,
    FRAME_DECODED, FRAME_DECODED_ORIG, HEIGHT, ID, IMAGE_HEIGHT, IMAGE_WIDTH, TIMESTAMP, WIDTH,
    X, Y,
};
use crate::hitsieve_errors::HitSieveError;

/// Classification written by the artifact classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Artifact,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Artifact => f.write_str(CLASS_ARTIFACT),
        }
    }
}

/// Basic photometric statistics of the hit image.
///
/// `darkness` and `brightest` are computed over non-black pixels only; `brighter_count`
/// holds one counter per threshold ever requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Photometry {
    pub darkness: Option<u8>,
    pub brightest: Option<u8>,
    pub brighter_count: BTreeMap<u8, u32>,
}

/// Placement of a hit crop within the reconstructed full frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlacement {
    /// The crop was not square, i.e. it touched the frame boundary.
    pub edge: bool,
    pub crop_x: i64,
    pub crop_y: i64,
    pub crop_size: (u32, u32),
}

/// One evidence slot per artifact heuristic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactEvidence {
    /// Distinct timestamps on the exact pixel.
    pub hot_pixel: Option<usize>,
    /// Members of the near-pixel cluster.
    pub near_hot_pixel: Option<usize>,
    /// Anchor of the near-pixel cluster.
    pub near_hot_pixel_refxy: Option<PixelXY>,
    /// Neighbourhood occurrence sum, recorded for every evaluated hit.
    pub near_hot_pixel2: Option<usize>,
    /// Distinct timestamps in the time window.
    pub too_often: Option<usize>,
    /// Bright area in per-mille of the image area.
    pub too_large_bright_area: Option<f64>,
}

impl ArtifactEvidence {
    /// `true` when no heuristic has recorded anything yet.
    pub fn is_empty(&self) -> bool {
        *self == ArtifactEvidence::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawHit")]
pub struct Hit {
    pub id: HitId,
    pub device_id: DeviceId,
    pub timestamp: Millis,
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
    pub frame_content: Option<String>,

    pub frame_decoded: Option<Vec<u8>>,
    pub frame_decoded_orig: Option<Vec<u8>>,
    /// Decoded raster; owned by the hit while the batch runs.
    pub image: Option<RgbaImage>,
    /// Size of the decoded image, kept after the raster is released.
    pub image_size: Option<(u32, u32)>,
    pub photometry: Photometry,
    pub crop: Option<CropPlacement>,
    pub classified: Option<Classification>,
    pub evidence: ArtifactEvidence,
    pub decode_error: Option<String>,

    pub extra: Map<String, Value>,
}

/// Fields of a hit as read from the input JSON.
#[derive(Deserialize)]
struct RawHit {
    #[serde(deserialize_with = "lenient::integer")]
    id: HitId,
    #[serde(deserialize_with = "lenient::integer")]
    device_id: DeviceId,
    #[serde(deserialize_with = "lenient::integer")]
    timestamp: Millis,
    #[serde(default, deserialize_with = "lenient::integer_or_default")]
    width: u32,
    #[serde(default, deserialize_with = "lenient::integer_or_default")]
    height: u32,
    #[serde(default, deserialize_with = "lenient::integer_or_default")]
    x: i64,
    #[serde(default, deserialize_with = "lenient::integer_or_default")]
    y: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    frame_content: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Names written by the pipeline itself; never taken from the input.
const COMPUTED_FIELDS: &[&str] = &[
    FRAME_DECODED,
    FRAME_DECODED_ORIG,
    IMAGE_WIDTH,
    IMAGE_HEIGHT,
    DARKNESS,
    BRIGHTEST,
    EDGE,
    CROP_X,
    CROP_Y,
    CROP_SIZE,
    CLASSIFIED,
    ARTIFACT_TOO_OFTEN,
    ARTIFACT_HOT_PIXEL,
    ARTIFACT_NEAR_HOT_PIXEL,
    ARTIFACT_NEAR_HOT_PIXEL_REFXY,
    ARTIFACT_NEAR_HOT_PIXEL2,
    ARTIFACT_TOO_LARGE_BRIGHT_AREA,
    DECODE_ERROR,
];

fn is_computed_field(name: &str) -> bool {
    COMPUTED_FIELDS.contains(&name) || name.starts_with(BRIGHTER_COUNT_PREFIX)
}

impl From<RawHit> for Hit {
    fn from(raw: RawHit) -> Self {
        let mut extra = raw.extra;
        extra.retain(|name, _| !is_computed_field(name));
        Hit {
            id: raw.id,
            device_id: raw.device_id,
            timestamp: raw.timestamp,
            width: raw.width,
            height: raw.height,
            x: raw.x,
            y: raw.y,
            frame_content: raw.frame_content,
            extra,
            ..Default::default()
        }
    }
}

mod lenient {
    use super::*;
    use serde::de::Error;

    fn as_integer(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn convert<T: TryFrom<i64>, E: Error>(value: &Value) -> Result<T, E> {
        as_integer(value)
            .and_then(|i| T::try_from(i).ok())
            .ok_or_else(|| E::custom(format!("invalid integer {value}")))
    }

    pub(super) fn integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        convert(&Value::deserialize(deserializer)?)
    }

    pub(super) fn integer_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64> + Default,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(T::default()),
            value => convert(&value),
        }
    }

    pub(super) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }
}

impl Hit {
    /// Create a hit with identity fields only.
    pub fn new(id: HitId, device_id: DeviceId, timestamp: Millis) -> Self {
        Hit {
            id,
            device_id,
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_xy(mut self, x: i64, y: i64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_frame_content(mut self, frame_content: impl Into<String>) -> Self {
        self.frame_content = Some(frame_content.into());
        self
    }

    /// Capture frame resolution `(width, height)`.
    pub fn resolution(&self) -> Resolution {
        (self.width, self.height)
    }

    /// Detection position `(x, y)` in the capture frame.
    pub fn xy(&self) -> PixelXY {
        (self.x, self.y)
    }

    /// `true` when the input carried a non-empty image payload.
    pub fn has_frame_content(&self) -> bool {
        self.frame_content.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// `true` when a decoded raster is available for image-based classification.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_artifact(&self) -> bool {
        self.classified == Some(Classification::Artifact)
    }

    /// Classify the hit as artifact unless another heuristic already did.
    pub fn mark_artifact(&mut self) {
        if self.classified.is_none() {
            self.classified = Some(Classification::Artifact);
        }
    }

    /// The decoded raster, or [`HitSieveError::MissingEvidence`] when the decoding pass
    /// did not run for this hit.
    pub fn image(&self) -> Result<&RgbaImage, HitSieveError> {
        self.image
            .as_ref()
            .ok_or_else(|| self.missing("image"))
    }

    /// Stored bright pixel counter for `threshold`, if it was computed.
    pub fn brighter_count(&self, threshold: u8) -> Option<u32> {
        self.photometry.brighter_count.get(&threshold).copied()
    }

    /// Replace the decoded raster and its PNG payload.
    pub fn set_image(&mut self, image: RgbaImage, png: Vec<u8>) {
        self.image_size = Some(image.dimensions());
        self.image = Some(image);
        self.frame_decoded = Some(png);
    }

    /// Drop the decoded raster; `frame_decoded` and `image_size` are kept.
    pub fn release_image(&mut self) {
        self.image = None;
    }

    pub(crate) fn missing(&self, field: &str) -> HitSieveError {
        HitSieveError::MissingEvidence {
            id: self.id,
            field: field.to_string(),
        }
    }

    /// Flatten the hit into an ordered `(field, value)` list for storage or tabular output.
    ///
    /// Only fields carrying a value are listed, so the union over a batch is the set of
    /// fields ever seen. Binary payloads are rendered as base64 text.
    pub fn to_fields(&self) -> Vec<(String, Value)> {
        self.to_fields_where(|_| true)
    }

    /// Same as [`Hit::to_fields`], restricted to the present fields for which `keep`
    /// returns `true`. Dropped fields are never rendered.
    pub fn to_fields_where(&self, keep: impl FnMut(&str) -> bool) -> Vec<(String, Value)> {
        let mut out = FieldSink {
            keep,
            fields: Vec::new(),
        };
        out.push(ID, Some(self.id), |v| json!(v));
        out.push(DEVICE_ID, Some(self.device_id), |v| json!(v));
        out.push(TIMESTAMP, Some(self.timestamp), |v| json!(v));
        out.push(WIDTH, Some(self.width), |v| json!(v));
        out.push(HEIGHT, Some(self.height), |v| json!(v));
        out.push(X, Some(self.x), |v| json!(v));
        out.push(Y, Some(self.y), |v| json!(v));
        out.push(FRAME_CONTENT, self.frame_content.as_ref(), |s| json!(s));
        for (k, v) in &self.extra {
            out.push(k, Some(v), Value::clone);
        }
        out.push(FRAME_DECODED, self.frame_decoded.as_ref(), |b| {
            json!(STANDARD.encode(b))
        });
        out.push(IMAGE_WIDTH, self.image_size, |(w, _)| json!(w));
        out.push(IMAGE_HEIGHT, self.image_size, |(_, h)| json!(h));
        out.push(DARKNESS, self.photometry.darkness, |v| json!(v));
        out.push(BRIGHTEST, self.photometry.brightest, |v| json!(v));
        for (threshold, count) in &self.photometry.brighter_count {
            out.push(&brighter_count_field(*threshold), Some(count), |c| json!(c));
        }
        if let Some(crop) = &self.crop {
            out.push(EDGE, Some(crop.edge), |v| json!(v));
            out.push(CROP_X, Some(crop.crop_x), |v| json!(v));
            out.push(CROP_Y, Some(crop.crop_y), |v| json!(v));
            out.push(CROP_SIZE, Some(crop.crop_size), |(w, h)| json!([w, h]));
        }
        out.push(FRAME_DECODED_ORIG, self.frame_decoded_orig.as_ref(), |b| {
            json!(STANDARD.encode(b))
        });
        out.push(CLASSIFIED, self.classified, |c| json!(c.to_string()));

        let e = &self.evidence;
        out.push(ARTIFACT_TOO_OFTEN, e.too_often, |v| json!(v));
        out.push(ARTIFACT_HOT_PIXEL, e.hot_pixel, |v| json!(v));
        out.push(ARTIFACT_NEAR_HOT_PIXEL, e.near_hot_pixel, |v| json!(v));
        out.push(ARTIFACT_NEAR_HOT_PIXEL_REFXY, e.near_hot_pixel_refxy, |(x, y)| {
            json!([x, y])
        });
        out.push(ARTIFACT_NEAR_HOT_PIXEL2, e.near_hot_pixel2, |v| json!(v));
        out.push(ARTIFACT_TOO_LARGE_BRIGHT_AREA, e.too_large_bright_area, |v| {
            json!(v)
        });
        out.push(DECODE_ERROR, self.decode_error.as_ref(), |s| json!(s));
        out.fields
    }
}

/// Output of [`Hit::to_fields_where`]: the `keep` predicate is asked only about present
/// fields, and a value is rendered only once kept.
struct FieldSink<K> {
    keep: K,
    fields: Vec<(String, Value)>,
}

impl<K: FnMut(&str) -> bool> FieldSink<K> {
    fn push<V>(&mut self, name: &str, value: Option<V>, render: impl FnOnce(V) -> Value) {
        if let Some(v) = value {
            if (self.keep)(name) {
                self.fields.push((name.to_string(), render(v)));
            }
        }
    }
}
