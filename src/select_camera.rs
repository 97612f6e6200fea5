use std::path::Path;

use crate::abstract_camera::AbstractCamera;
use crate::image_camera::ImageCamera;
use crate::v4l_camera::V4lCamera;

use canonical_error::{CanonicalError, failed_precondition_error, invalid_argument_error,
                      not_found_error};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CameraInterface {
    V4l,
    Image,
}

// Returns a camera:
// * If `camera_interface` is Image, an ImageCamera serving `test_image` is
//   returned (`test_image` is then required).
// * If `camera_interface` is V4l, the V4L2 device `camera_index` is returned.
// * With no `camera_interface`, a V4L2 camera is preferred; if none is present
//   and `test_image` is given, the ImageCamera is used instead.
pub fn select_camera(camera_interface: Option<CameraInterface>,
                     camera_index: usize,
                     test_image: Option<&Path>)
                     -> Result<Box<dyn AbstractCamera + Send>, CanonicalError> {
    match camera_interface {
        Some(CameraInterface::Image) => {
            let Some(path) = test_image else {
                return Err(invalid_argument_error(
                    "Image camera requested but no test image was given"));
            };
            Ok(Box::new(image_camera_from_file(path)?))
        },
        Some(CameraInterface::V4l) => {
            Ok(Box::new(V4lCamera::new(camera_index)?))
        },
        None => {
            let v4l_cameras = V4lCamera::enumerate_cameras();
            if !v4l_cameras.is_empty() {
                return Ok(Box::new(V4lCamera::new(camera_index)?));
            }
            match test_image {
                Some(path) => Ok(Box::new(image_camera_from_file(path)?)),
                None => Err(not_found_error("No camera found")),
            }
        },
    }
}

fn image_camera_from_file(path: &Path) -> Result<ImageCamera, CanonicalError> {
    let image = match image::open(path) {
        Ok(i) => i,
        Err(e) => return Err(failed_precondition_error(
            format!("Could not read {}: {}", path.display(), e).as_str())),
    };
    ImageCamera::new(image.to_rgb8())
}
