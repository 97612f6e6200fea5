//! Print layout for the thermal printer.
//!
//! A captured photo becomes a 1-bit bitmap the width of the print head: the
//! photo in grayscale below a white header band carrying two caption lines.
//! The output is a binary PBM (P4) next to the source photo, plus a grayscale
//! PNG of the same layout for on-screen review.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fast_image_resize::Resizer;
use image::imageops::{BiLevel, dither, overlay};
use image::{GrayImage, Luma};
use log::{debug, info};

use crate::caption_font::{CaptionFont, load_caption_font};
use crate::config::CaptionConfig;
use crate::error::{BoothError, Result};
use crate::scaling::scale_gray;

/// Geometry of the printed frame, in printer dots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    /// Print head width; the whole frame is this wide.
    pub width: u32,
    pub height: u32,
    /// The photo is stretched to width x photo_height.
    pub photo_height: u32,
    /// Top of the photo. Everything above is the caption band.
    pub photo_top: u32,
    /// Vertical centers of the title and date lines.
    pub caption_centers: [u32; 2],
}

impl Default for FrameLayout {
    fn default() -> Self {
        FrameLayout{width: 384,
                    height: 480,
                    photo_height: 400,
                    photo_top: 60,
                    caption_centers: [10, 35]}
    }
}

pub struct FrameComposer {
    layout: FrameLayout,
    title: String,
    date: String,
    font: Box<dyn CaptionFont>,
    resizer: Mutex<Resizer>,
}

impl FrameComposer {
    pub fn new(layout: FrameLayout, captions: &CaptionConfig) -> Self {
        let font = load_caption_font(captions.font_path.as_deref(), captions.font_px);
        info!("Caption font: {}", font.name());
        Self::with_font(layout, &captions.title, &captions.date, font)
    }

    pub fn with_font(layout: FrameLayout, title: &str, date: &str,
                     font: Box<dyn CaptionFont>) -> Self {
        FrameComposer{layout,
                      title: title.to_string(),
                      date: date.to_string(),
                      font,
                      resizer: Mutex::new(Resizer::new())}
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Lays out `photo` as the grayscale frame, before thresholding.
    pub fn render(&self, photo: &GrayImage) -> Result<GrayImage> {
        let l = &self.layout;
        let scaled = {
            // The resizer only holds scratch buffers.
            let mut resizer = self.resizer.lock().unwrap_or_else(|e| e.into_inner());
            scale_gray(&mut resizer, photo, l.width, l.photo_height)?
        };
        let mut canvas = GrayImage::from_pixel(l.width, l.height, Luma([255]));
        overlay(&mut canvas, &scaled, 0, l.photo_top as i64);

        let center_x = (l.width / 2) as i32;
        for (text, center_y) in [&self.title, &self.date].into_iter().zip(l.caption_centers) {
            self.font.draw_centered(&mut canvas, center_x, center_y as i32, text);
        }
        Ok(canvas)
    }

    /// Writes the framed PNG and the 1-bit PBM for the photo at `photo_path`
    /// and returns the PBM path. Calling this again for the same photo
    /// rewrites identical files.
    pub fn compose(&self, photo_path: &Path) -> Result<PathBuf> {
        let photo = image::open(photo_path).map_err(|e| BoothError::SourceUnavailable{
            path: photo_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut framed = self.render(&photo.to_luma8())?;

        let png_path = framed_png_path(photo_path);
        framed.save(&png_path)
            .map_err(|e| BoothError::ComposeFailed(
                format!("{}: {}", png_path.display(), e)))?;

        to_one_bit(&mut framed);
        let pbm_path = photo_path.with_extension("pbm");
        std::fs::write(&pbm_path, encode_pbm(&framed))?;
        debug!("Composed {}", pbm_path.display());
        Ok(pbm_path)
    }
}

fn framed_png_path(photo_path: &Path) -> PathBuf {
    let stem = photo_path.file_stem().map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    photo_path.with_file_name(format!("{}_framed.png", stem))
}

/// Floyd-Steinberg dithers to pure black (0) and white (255).
pub fn to_one_bit(image: &mut GrayImage) {
    dither(image, &BiLevel);
}

/// Binary PBM: rows packed MSB first, 1 = black, each row padded to a byte.
/// Pixels darker than mid-gray count as black.
pub fn encode_pbm(image: &GrayImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let row_bytes = width.div_ceil(8) as usize;
    let header = format!("P4\n{} {}\n", width, height);
    let mut out = Vec::with_capacity(header.len() + row_bytes * height as usize);
    out.extend_from_slice(header.as_bytes());
    for row in image.rows() {
        let mut packed = vec![0u8; row_bytes];
        for (x, pixel) in row.enumerate() {
            if pixel.0[0] < 128 {
                packed[x / 8] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&packed);
    }
    out
}
