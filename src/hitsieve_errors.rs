use thiserror::Error;

use crate::constants::HitId;

#[derive(Error, Debug)]
pub enum HitSieveError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed JSON object #{index} in the input array: {source}")]
    MalformedObject {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Input ended inside object #{0}")]
    TruncatedInput(usize),

    #[error("Object #{0} in the input array is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid base64 frame content: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Image decoding/encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV writer error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid column exclusion pattern: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Hit {0} has no frame content")]
    MissingFrameContent(HitId),

    #[error("Hit {id} is missing '{field}', the pass that computes it must run first")]
    MissingEvidence { id: HitId, field: String },

    #[error("Crop of hit {id} at ({x}, {y}) size {width}x{height} lies outside the {canvas_width}x{canvas_height} frame")]
    GeometryViolation {
        id: HitId,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PartialEq for HitSieveError {
    fn eq(&self, other: &Self) -> bool {
        use HitSieveError::*;
        match (self, other) {
            (MalformedObject { index: a, .. }, MalformedObject { index: b, .. }) => a == b,
            (TruncatedInput(a), TruncatedInput(b)) => a == b,
            (InvalidUtf8(a), InvalidUtf8(b)) => a == b,
            (MissingFrameContent(a), MissingFrameContent(b)) => a == b,
            (
                MissingEvidence { id: a, field: fa },
                MissingEvidence { id: b, field: fb },
            ) => a == b && fa == fb,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (GeometryViolation { id: a, .. }, GeometryViolation { id: b, .. }) => a == b,

            // Wrapped library errors are not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (Base64Decode(_), Base64Decode(_)) => true,
            (ImageError(_), ImageError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (RegexError(_), RegexError(_)) => true,

            _ => false,
        }
    }
}
