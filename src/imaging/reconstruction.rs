//! # Reconstruction of crops blanked by overlapping hits
//!
//! Early versions of the detector firmware cut every hit out of the capture frame and then
//! **filled the cut region with black** before looking for the next hit. When two hits of the
//! same frame overlap, the later crop therefore shows a black hole where the earlier one was
//! taken, and the filled area is one pixel too wide on the right and bottom sides.
//!
//! ## Algorithm
//! -----------------
//! For one capture frame (hits of one device sharing one timestamp, sorted by id):
//!
//! 1. Allocate a black RGBA canvas of the declared frame `width × height`.
//! 2. In **reverse** arrival order, place every crop on the canvas ([`append_to_frame`]).
//!    The crop offset is its geometric center when the crop is square (crops are centered
//!    on the hit by construction) or its brightest pixel otherwise, in which case the hit is
//!    flagged `edge`. After each paste, the 1 px right strip, bottom strip and bottom-right
//!    corner are re-copied from the crop border to erase the oversized black fill.
//!    Painting in reverse order puts the earliest (unblanked) crops on top.
//! 3. In **forward** order, re-crop every hit from the completed canvas and replace its
//!    `image` / `frame_decoded` ([`replace_from_frame`]); the previous payload is kept in
//!    `frame_decoded_orig`.
//!
//! Groups of zero or one hit are left untouched.
//!
//! ## Debug output
//! -----------------
//! When a debug root is configured, originals go to
//! `reconstruct/<edge|no_edge>/<device>/<timestamp>/orig/<id>.png`, the reconstructed crops
//! to `reconstruct/<edge|no_edge>/<device>/<timestamp>/<id>.png`, and the canvas to
//! `.../frame.png`.
use image::{imageops, Rgba, RgbaImage};

use crate::{
    config::Config,
    constants::Millis,
    grouping::Groups,
    hits::{CropPlacement, Hit},
    hitsieve_errors::HitSieveError,
    imaging::frame_decoder::encode_png,
};

/// ITU-R 601-2 luma, the grey level used to locate the brightest crop pixel.
fn luma(pixel: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

fn pixel_at(canvas: &RgbaImage, x: i64, y: i64) -> Rgba<u8> {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return Rgba([0, 0, 0, 0]);
    }
    *canvas.get_pixel(x as u32, y as u32)
}

/// Copy the `width × height` canvas region at `(sx, sy)` onto `(dx, dy)`.
///
/// Source pixels outside the canvas read as transparent black, destination pixels outside
/// the canvas are dropped.
fn copy_region(canvas: &mut RgbaImage, sx: i64, sy: i64, width: i64, height: i64, dx: i64, dy: i64) {
    let strip: Vec<Rgba<u8>> = (0..height)
        .flat_map(|j| (0..width).map(move |i| (i, j)))
        .map(|(i, j)| pixel_at(canvas, sx + i, sy + j))
        .collect();

    for j in 0..height {
        for i in 0..width {
            let (x, y) = (dx + i, dy + j);
            if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
                canvas.put_pixel(x as u32, y as u32, strip[(j * width + i) as usize]);
            }
        }
    }
}

/// Offset of the hit position inside its crop, and whether the crop touched the frame edge.
fn anchor_in_crop(crop: &RgbaImage) -> (u32, u32, bool) {
    let (width, height) = crop.dimensions();
    if width == height {
        return (width / 2, height / 2, false);
    }

    let (mut fx, mut fy, mut mg) = (0, 0, 0);
    for (cx, cy, pixel) in crop.enumerate_pixels() {
        let g = luma(pixel);
        if mg < g {
            mg = g;
            fx = cx;
            fy = cy;
        }
    }
    (fx, fy, true)
}

/// Paste the hit crop onto the frame canvas and record its placement in [`Hit::crop`].
pub fn append_to_frame(canvas: &mut RgbaImage, hit: &mut Hit) -> Result<(), HitSieveError> {
    let crop = hit.image()?;
    let (width, height) = crop.dimensions();
    let (fx, fy, edge) = anchor_in_crop(crop);

    let x0 = hit.x - fx as i64;
    let y0 = hit.y - fy as i64;
    let (w, h) = (width as i64, height as i64);

    imageops::replace(canvas, crop, x0, y0);

    // the firmware black fill is 1 px too large: right strip, bottom strip, corner
    copy_region(canvas, x0 + w - 1, y0, 1, h, x0 + w, y0);
    copy_region(canvas, x0, y0 + h - 1, w, 1, x0, y0 + h);
    copy_region(canvas, x0 + w - 1, y0 + h - 1, 1, 1, x0 + w, y0 + h);

    hit.crop = Some(CropPlacement {
        edge,
        crop_x: x0,
        crop_y: y0,
        crop_size: (width, height),
    });
    Ok(())
}

/// Re-crop the hit region from the completed canvas into `image` and `frame_decoded`.
///
/// Errors
/// -----------------
/// * [`HitSieveError::MissingEvidence`] when [`append_to_frame`] did not run for the hit.
/// * [`HitSieveError::GeometryViolation`] when the crop does not lie within the canvas,
///   which means the declared frame size or position of the hit is wrong.
pub fn replace_from_frame(canvas: &RgbaImage, hit: &mut Hit) -> Result<(), HitSieveError> {
    let placement = hit.crop.ok_or_else(|| hit.missing("crop_x"))?;
    let (w, h) = placement.crop_size;
    let (cw, ch) = canvas.dimensions();

    let fits = placement.crop_x >= 0
        && placement.crop_y >= 0
        && placement.crop_x + w as i64 <= cw as i64
        && placement.crop_y + h as i64 <= ch as i64;
    if !fits {
        return Err(HitSieveError::GeometryViolation {
            id: hit.id,
            x: placement.crop_x,
            y: placement.crop_y,
            width: w,
            height: h,
            canvas_width: cw,
            canvas_height: ch,
        });
    }

    let image =
        imageops::crop_imm(canvas, placement.crop_x as u32, placement.crop_y as u32, w, h).to_image();
    let png = encode_png(&image)?;
    hit.set_image(image, png);
    Ok(())
}

/// Reconstruct the crops of one capture frame.
///
/// Arguments
/// -----------------
/// * `hits`: hits of one device and one capture timestamp, sorted by id. The declared frame
///   size of the first hit sizes the canvas.
/// * `config`: debug-image sink.
///
/// Return
/// ----------
/// * `Ok(())`; no change at all when `hits.len() <= 1`.
pub fn do_reconstruct(hits: &mut [&mut Hit], config: &Config) -> Result<(), HitSieveError> {
    if hits.len() <= 1 {
        return Ok(());
    }

    let (width, height) = hits[0].resolution();
    let device = hits[0].device_id.to_string();
    let timestamp = hits[0].timestamp.to_string();
    let (device, timestamp) = (device.as_str(), timestamp.as_str());
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    let mut edge = "no_edge";
    for hit in hits.iter() {
        let (w, h) = hit.image()?.dimensions();
        if w != h {
            edge = "edge";
        }
    }

    for hit in hits.iter_mut().rev() {
        if hit.frame_decoded_orig.is_none() {
            hit.frame_decoded_orig = hit.frame_decoded.clone();
        }
        append_to_frame(&mut canvas, hit)?;
        if let Some(orig) = &hit.frame_decoded_orig {
            config.store_png(&["reconstruct", edge, device, timestamp, "orig"], hit.id, orig)?;
        }
    }

    for hit in hits.iter_mut() {
        replace_from_frame(&canvas, hit)?;
        if let Some(png) = &hit.frame_decoded {
            config.store_png(&["reconstruct", edge, device, timestamp], hit.id, png)?;
        }
    }

    if config.debug_enabled() {
        config.store_png(&["reconstruct", edge, device, timestamp], "frame", &encode_png(&canvas)?)?;
    }
    Ok(())
}

/// `true` when every hit is already classified as artifact.
pub fn check_all_artifacts(hits: &[&mut Hit]) -> bool {
    hits.iter().all(|h| h.is_artifact())
}

/// Timestamps of the frames holding at least one hit not yet classified as artifact.
pub fn filter_unclassified(by_timestamp: &Groups<'_, Millis>) -> Vec<Millis> {
    by_timestamp
        .iter()
        .filter(|(_, hits)| !check_all_artifacts(hits))
        .map(|(timestamp, _)| *timestamp)
        .collect()
}
