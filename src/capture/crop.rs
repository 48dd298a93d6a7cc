//! Crop a full-tab raster down to the selected region.
//!
//! The selection rectangle arrives in CSS pixels; the raster is physical
//! pixels, so every coordinate is scaled by the device pixel ratio before
//! cropping. Scaled values are rounded and clamped to the raster bounds.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::capture::{CaptureRequest, CroppedImage, RasterImage};
use crate::error::{Error, Result};

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

fn scaled(v: f64, dpr: f64) -> u32 {
    (v * dpr).round().max(0.0) as u32
}

pub fn crop_to_data_url(raster: &RasterImage, request: &CaptureRequest) -> Result<CroppedImage> {
    let decoded = image::load_from_memory(&raster.png)
        .map_err(|e| Error::ImageDecode(format!("raster decode: {}", e)))?;

    let (img_w, img_h) = (decoded.width(), decoded.height());
    let dpr = request.device_pixel_ratio;

    let x = scaled(request.rect.x, dpr).min(img_w.saturating_sub(1));
    let y = scaled(request.rect.y, dpr).min(img_h.saturating_sub(1));
    let w = scaled(request.rect.width, dpr).clamp(1, img_w - x);
    let h = scaled(request.rect.height, dpr).clamp(1, img_h - y);

    let cropped = decoded.crop_imm(x, y, w, h);

    // Encode to PNG then base64
    let mut buffer = Cursor::new(Vec::new());
    cropped
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| Error::ImageDecode(format!("png encode: {}", e)))?;

    let data_url = format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(buffer.into_inner()));

    log::debug!("cropped {}x{} region at ({}, {}) from {}x{} raster", w, h, x, y, img_w, img_h);

    Ok(CroppedImage {
        data_url,
        width: w,
        height: h,
    })
}
