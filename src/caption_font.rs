// Caption text rendering. The preferred TrueType font is optional equipment:
// if it is missing or unparseable we quietly fall back to the 8x8 bitmap font
// compiled into the binary.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use log::debug;

const INK: Luma<u8> = Luma([0]);

pub trait CaptionFont: Send + Sync {
    /// (width, height) of `text` when drawn.
    fn measure(&self, text: &str) -> (u32, u32);

    /// Draws `text` in black with its top-left corner at (x, y). Parts
    /// falling outside the canvas are clipped.
    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str);

    fn name(&self) -> &str;

    /// Draws `text` centered on (center_x, center_y).
    fn draw_centered(&self, canvas: &mut GrayImage, center_x: i32, center_y: i32,
                     text: &str) {
        let (w, h) = self.measure(text);
        self.draw(canvas, center_x - w as i32 / 2, center_y - h as i32 / 2, text);
    }
}

pub struct TrueTypeFont {
    font: FontVec,
    scale: PxScale,
}

impl TrueTypeFont {
    pub fn load(path: &Path, px: f32) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                debug!("Font {} not readable: {}", path.display(), e);
                return None;
            }
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(TrueTypeFont{font, scale: PxScale::from(px)}),
            Err(e) => {
                debug!("Font {} not usable: {}", path.display(), e);
                None
            }
        }
    }
}

impl CaptionFont for TrueTypeFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        text_size(self.scale, &self.font, text)
    }

    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str) {
        draw_text_mut(canvas, INK, x, y, self.scale, &self.font, text);
    }

    fn name(&self) -> &str {
        "truetype"
    }
}

/// 8x8 glyphs, each pixel drawn as a `scale` x `scale` block. Characters
/// without a glyph render as blanks.
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    pub fn new(scale: u32) -> Self {
        BitmapFont{scale: scale.max(1)}
    }

    fn glyph(c: char) -> [u8; 8] {
        BASIC_FONTS.get(c)
            .or_else(|| LATIN_FONTS.get(c))
            .unwrap_or([0; 8])
    }
}

impl CaptionFont for BitmapFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        let cell = 8 * self.scale;
        (text.chars().count() as u32 * cell, cell)
    }

    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str) {
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);
        let scale = self.scale as i32;
        for (i, c) in text.chars().enumerate() {
            let origin_x = x + i as i32 * 8 * scale;
            for (row, bits) in Self::glyph(c).iter().enumerate() {
                for col in 0..8 {
                    // Bit 0 is the leftmost pixel.
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = origin_x + col * scale + dx;
                            let py = y + row as i32 * scale + dy;
                            if px >= 0 && px < width && py >= 0 && py < height {
                                canvas.put_pixel(px as u32, py as u32, INK);
                            }
                        }
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        "bitmap"
    }
}

/// Returns the TrueType font at `path` if it loads, otherwise the bitmap
/// font sized to roughly match `px`. Never fails.
pub fn load_caption_font(path: Option<&Path>, px: f32) -> Box<dyn CaptionFont> {
    if let Some(font) = path.and_then(|p| TrueTypeFont::load(p, px)) {
        return Box::new(font);
    }
    let scale = ((px / 8.0).floor() as u32).max(1);
    debug!("Using built-in bitmap caption font at {}x", scale);
    Box::new(BitmapFont::new(scale))
}
