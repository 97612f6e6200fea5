// Copyright (c) 2023 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use env_logger;

use photobooth::v4l_camera::V4lCamera;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    // Enumerate V4L2 cameras.
    let v4l_cameras = V4lCamera::enumerate_cameras();
    println!("Found {} V4L2 cameras: ", v4l_cameras.len());
    for info in &v4l_cameras {
        println!("{}: {} ({})", info.index, info.name, info.path.display());
    }
}
