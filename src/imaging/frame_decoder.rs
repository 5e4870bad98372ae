//! # Frame decoding and basic photometry
//!
//! Turns the base64 `frame_content` of a [`Hit`] into an RGBA raster and measures the
//! statistics the classifiers rely on.
//!
//! ## Overview
//! -----------------
//! - [`load_image`] decodes `frame_content` → `frame_decoded` (raw bytes) → `image`.
//! - [`measure_darkness_brightest`] scans non-black pixels for the darkest and brightest
//!   values.
//! - [`count_of_brightest_pixels`] counts pixels at or above an arbitrary threshold and
//!   stores the counter under that threshold.
//! - [`hit_load_parser`] is the extractor filter used for hit imports.
//!
//! Every scan is `O(width × height)` and goes through a [`PixelValue`] projection of the
//! RGBA pixel, [`brightest_channel`] by default (max of R, G, B; alpha ignored).
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use log::warn;

use crate::{hits::Hit, hitsieve_errors::HitSieveError};

/// Projection of an RGBA pixel onto a single brightness value.
pub type PixelValue = fn(&Rgba<u8>) -> u8;

/// Brightest of the R, G, B channels; alpha is ignored.
pub fn brightest_channel(pixel: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    r.max(g).max(b)
}

/// Decode a base64 payload, tolerating embedded line breaks and spaces.
pub fn decode_base64(frame_content: &str) -> Result<Vec<u8>, HitSieveError> {
    let compact: String = frame_content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

/// Encode a raster as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, HitSieveError> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Decode the hit image into [`Hit::image`] and return it.
///
/// When `frame_decoded` is empty it is first filled by decoding `frame_content`.
///
/// Errors
/// -----------------
/// * [`HitSieveError::MissingFrameContent`] when neither payload is present.
/// * [`HitSieveError::Base64Decode`] / [`HitSieveError::ImageError`] on a corrupt payload.
pub fn load_image(hit: &mut Hit) -> Result<&RgbaImage, HitSieveError> {
    if hit.frame_decoded.is_none() {
        let content = hit
            .frame_content
            .as_deref()
            .ok_or(HitSieveError::MissingFrameContent(hit.id))?;
        hit.frame_decoded = Some(decode_base64(content)?);
    }

    let bytes = hit
        .frame_decoded
        .as_deref()
        .ok_or(HitSieveError::MissingFrameContent(hit.id))?;
    let image = image::load_from_memory(bytes)?.to_rgba8();
    hit.image_size = Some(image.dimensions());
    Ok(hit.image.insert(image))
}

/// Measure the darkest and brightest pixel values, excluding black (`0`) pixels.
///
/// Sets `photometry.darkness` and `photometry.brightest`. An all-black image yields
/// `(255, 0)`.
pub fn measure_darkness_brightest(
    hit: &mut Hit,
    pixel_value: PixelValue,
) -> Result<(u8, u8), HitSieveError> {
    let image = hit.image()?;

    let mut darkness = u8::MAX;
    let mut brightest = 0;
    for pixel in image.pixels() {
        let g = pixel_value(pixel);
        if g != 0 {
            brightest = brightest.max(g);
            darkness = darkness.min(g);
        }
    }
    hit.photometry.darkness = Some(darkness);
    hit.photometry.brightest = Some(brightest);
    Ok((darkness, brightest))
}

/// Count pixels whose value is greater than or equal to `threshold`.
///
/// The counter is stored under `threshold` (`image_brighter_count_<threshold>`); counters of
/// other thresholds are left as they are.
pub fn count_of_brightest_pixels(
    hit: &mut Hit,
    threshold: u8,
    pixel_value: PixelValue,
) -> Result<u32, HitSieveError> {
    let image = hit.image()?;
    let count = image
        .pixels()
        .filter(|p| pixel_value(p) >= threshold)
        .count() as u32;
    hit.photometry.brighter_count.insert(threshold, count);
    Ok(count)
}

/// Extractor filter for hit imports.
///
/// Rejects hits without image payload. Accepted hits get their image decoded; a corrupt
/// payload keeps the hit in the batch with `decode_error` set and no raster, which
/// excludes it from every image-based pass.
pub fn hit_load_parser(hit: &mut Hit) -> bool {
    if !hit.has_frame_content() {
        return false;
    }
    if let Err(e) = load_image(hit).map(|_| ()) {
        warn!("hit {}: image payload cannot be decoded: {e}", hit.id);
        hit.decode_error = Some(e.to_string());
    }
    true
}

#[cfg(test)]
mod frame_decoder_test {
    use super::*;

    fn hit_with_image(image: &RgbaImage) -> Hit {
        let png = encode_png(image).unwrap();
        Hit::new(1, 1, 0).with_frame_content(STANDARD.encode(png))
    }

    fn sample() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([10, 5, 0, 255]));
        img.put_pixel(1, 1, Rgba([0, 200, 30, 255]));
        img.put_pixel(2, 2, Rgba([128, 128, 128, 0]));
        img
    }

    #[test]
    fn test_brightest_channel_ignores_alpha() {
        assert_eq!(brightest_channel(&Rgba([1, 9, 3, 255])), 9);
        assert_eq!(brightest_channel(&Rgba([0, 0, 0, 255])), 0);
    }

    #[test]
    fn test_decode_base64_tolerates_line_breaks() {
        assert_eq!(decode_base64("aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(decode_base64("@@@").is_err());
    }

    #[test]
    fn test_load_and_measure() {
        let mut hit = hit_with_image(&sample());
        let img = load_image(&mut hit).unwrap();
        assert_eq!(img.dimensions(), (3, 3));
        assert_eq!(hit.image_size, Some((3, 3)));
        assert!(hit.frame_decoded.is_some());

        let (darkness, brightest) = measure_darkness_brightest(&mut hit, brightest_channel).unwrap();
        assert_eq!((darkness, brightest), (10, 200));
        assert_eq!(hit.photometry.darkness, Some(10));

        assert_eq!(count_of_brightest_pixels(&mut hit, 128, brightest_channel).unwrap(), 2);
        assert_eq!(count_of_brightest_pixels(&mut hit, 10, brightest_channel).unwrap(), 3);
        assert_eq!(hit.brighter_count(128), Some(2));
        assert_eq!(hit.brighter_count(10), Some(3));
    }

    #[test]
    fn test_all_black_image() {
        let mut hit = hit_with_image(&RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        load_image(&mut hit).unwrap();
        assert_eq!(
            measure_darkness_brightest(&mut hit, brightest_channel).unwrap(),
            (255, 0)
        );
    }

    #[test]
    fn test_measure_without_image_fails_loudly() {
        let mut hit = Hit::new(5, 1, 0);
        assert!(matches!(
            measure_darkness_brightest(&mut hit, brightest_channel),
            Err(HitSieveError::MissingEvidence { id: 5, .. })
        ));
    }

    #[test]
    fn test_load_parser() {
        let mut no_payload = Hit::new(1, 1, 0);
        assert!(!hit_load_parser(&mut no_payload));

        let mut empty_payload = Hit::new(2, 1, 0).with_frame_content("");
        assert!(!hit_load_parser(&mut empty_payload));

        let mut corrupt = Hit::new(3, 1, 0).with_frame_content(STANDARD.encode(b"not an image"));
        assert!(hit_load_parser(&mut corrupt));
        assert!(corrupt.decode_error.is_some());
        assert!(!corrupt.has_image());

        let mut good = hit_with_image(&sample());
        assert!(hit_load_parser(&mut good));
        assert!(good.has_image());
        assert!(good.decode_error.is_none());
    }
}
