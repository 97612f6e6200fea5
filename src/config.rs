//! Booth settings. Every field has a default matching the reference kiosk
//! build; binaries override them from the command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::abstract_camera::Resolution;

#[derive(Clone, Debug)]
pub struct CountdownConfig {
    /// Number of visible countdown steps ("3, 2, 1").
    pub ticks: u32,
    /// Duration of each step.
    pub tick: Duration,
    /// Pause after the shutter cue, before the still is taken.
    pub shutter_hold: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        CountdownConfig{ticks: 3,
                        tick: Duration::from_secs(1),
                        shutter_hold: Duration::from_millis(500)}
    }
}

#[derive(Clone, Debug)]
pub struct CaptionConfig {
    pub title: String,
    pub date: String,
    /// Preferred TrueType font. The built-in bitmap font is used when this is
    /// None or cannot be loaded.
    pub font_path: Option<PathBuf>,
    pub font_px: f32,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        CaptionConfig{
            title: "Mariage Paula and Heath".to_string(),
            date: "15 juin 2025".to_string(),
            font_path: Some(PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf")),
            font_px: 20.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PreviewConfig {
    /// Size frames are scaled to for display.
    pub region: Resolution,
    pub interval: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig{region: Resolution::new(800, 600),
                      interval: Duration::from_millis(33)}
    }
}

#[derive(Clone, Debug)]
pub struct PrinterConfig {
    /// Printer driver executable; invoked as
    /// `<program> <device_flag> <device_id> <artifact>`.
    pub program: PathBuf,
    pub device_flag: String,
    pub device_id: String,
    pub working_dir: Option<PathBuf>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        PrinterConfig{program: PathBuf::from("printer.py"),
                      device_flag: "-s".to_string(),
                      device_id: "5,MX10".to_string(),
                      working_dir: None}
    }
}

#[derive(Clone, Debug)]
pub struct BoothConfig {
    /// Where photos and print artifacts are written. Created if absent.
    pub photo_dir: PathBuf,
    /// Resolution the camera is configured to.
    pub resolution: Resolution,
    pub countdown: CountdownConfig,
    pub captions: CaptionConfig,
    pub preview: PreviewConfig,
    pub printer: PrinterConfig,
}

impl Default for BoothConfig {
    fn default() -> Self {
        BoothConfig{photo_dir: PathBuf::from("photos"),
                    resolution: Resolution::new(640, 480),
                    countdown: CountdownConfig::default(),
                    captions: CaptionConfig::default(),
                    preview: PreviewConfig::default(),
                    printer: PrinterConfig::default()}
    }
}
