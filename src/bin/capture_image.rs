// Copyright (c) 2023 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::PathBuf;

use chrono::offset::Local;
use chrono::DateTime;
use clap::Parser;
use env_logger;
use log::info;

use photobooth::abstract_camera::Resolution;
use photobooth::select_camera::{CameraInterface, select_camera};

/// Utility program for capturing a single still from the camera, to check
/// framing and exposure before an event.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Output JPEG file.
    #[arg(short, long)]
    output: PathBuf,

    /// V4L2 device number (/dev/videoN).
    #[arg(long, default_value_t = 0)]
    camera_index: usize,

    #[arg(long, default_value = "640x480")]
    resolution: String,
}

#[tokio::main]
async fn main() {
    // If any thread panics, bail out.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Thread panicked: {}", panic_info);
        std::process::exit(1);
    }));
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let resolution: Resolution = args.resolution.parse().unwrap();

    let mut camera = select_camera(Some(CameraInterface::V4l), args.camera_index, None)
        .unwrap();
    info!("camera: {}", camera.model());
    let granted = camera.configure(resolution).unwrap();
    camera.start().await.unwrap();

    // The first frames after starting are often under-exposed; let the
    // camera settle.
    for _ in 0..5 {
        camera.capture_frame().await.unwrap();
    }
    camera.capture_still(&args.output).await.unwrap();
    camera.stop().await;

    let datetime: DateTime<Local> = Local::now();
    info!("Image {} ({}) obtained at {}",
          args.output.display(), granted, datetime.format("%d/%m/%Y %T"));
}
