//! Screen-region capture types shared across contexts.
//!
//! A finalized selection becomes a [`CaptureRequest`]; the privileged
//! context answers with a full-tab [`RasterImage`]; the in-page context
//! crops it down to a [`CroppedImage`] that travels by value to every
//! consumer.

pub mod crop;

pub use crop::{crop_to_data_url, PNG_DATA_URL_PREFIX};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::geometry::SelectionRect;

/// Exactly one of these is produced per successful selection. Immutable
/// once sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub rect: SelectionRect,
    pub device_pixel_ratio: f64,
}

/// Full visible-tab raster in physical pixels, PNG-encoded.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
}

/// The region scoped to the selection, carried as a PNG data URL so it can
/// feed a multimodal prompt directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CroppedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}
