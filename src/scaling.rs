// Image scaling on top of fast_image_resize, for the 8-bit gray and RGB
// buffers the booth works with.

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{GrayImage, RgbImage};

use crate::error::{BoothError, Result};

fn resize_raw(resizer: &mut Resizer, src: &[u8], src_dims: (u32, u32),
              dst_dims: (u32, u32), pixel_type: PixelType) -> Result<Vec<u8>> {
    let src_image = ImageRef::new(src_dims.0, src_dims.1, src, pixel_type)
        .map_err(|e| BoothError::ComposeFailed(e.to_string()))?;
    let mut dst_image = Image::new(dst_dims.0, dst_dims.1, pixel_type);
    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    resizer.resize(&src_image, &mut dst_image, &options)
        .map_err(|e| BoothError::ComposeFailed(e.to_string()))?;
    Ok(dst_image.into_vec())
}

/// Stretches `image` to exactly width x height.
pub fn scale_gray(resizer: &mut Resizer, image: &GrayImage, width: u32, height: u32)
                  -> Result<GrayImage> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    let data = resize_raw(resizer, image.as_raw(), image.dimensions(),
                          (width, height), PixelType::U8)?;
    GrayImage::from_raw(width, height, data)
        .ok_or_else(|| BoothError::ComposeFailed("resized buffer size mismatch".to_string()))
}

/// Stretches `image` to exactly width x height.
pub fn scale_rgb(resizer: &mut Resizer, image: &RgbImage, width: u32, height: u32)
                 -> Result<RgbImage> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    let data = resize_raw(resizer, image.as_raw(), image.dimensions(),
                          (width, height), PixelType::U8x3)?;
    RgbImage::from_raw(width, height, data)
        .ok_or_else(|| BoothError::ComposeFailed("resized buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_scale_gray() {
        let mut resizer = Resizer::new();
        let image = GrayImage::from_pixel(64, 48, Luma([77]));
        let scaled = scale_gray(&mut resizer, &image, 384, 400).unwrap();
        assert_eq!(scaled.dimensions(), (384, 400));
        // A flat image stays flat.
        assert!(scaled.pixels().all(|p| p.0[0].abs_diff(77) <= 1));
    }

    #[test]
    fn test_scale_rgb() {
        let mut resizer = Resizer::new();
        let image = RgbImage::from_pixel(640, 480, Rgb([10, 200, 30]));
        let scaled = scale_rgb(&mut resizer, &image, 80, 60).unwrap();
        assert_eq!(scaled.dimensions(), (80, 60));
        assert!(scaled.pixels().all(|p| p.0[1].abs_diff(200) <= 1));
    }
}
