// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use env_logger;
use image::RgbImage;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use photobooth::abstract_camera::Resolution;
use photobooth::booth::Photobooth;
use photobooth::config::BoothConfig;
use photobooth::controller::{Trigger, TriggerSource};
use photobooth::preview::PreviewSink;
use photobooth::printer::CommandPrinter;
use photobooth::select_camera::{CameraInterface, select_camera};
use photobooth::session::BoothEvent;

/// Kiosk photobooth: live preview, countdown capture, framed thermal print.
///
/// Keys (followed by Enter): c or space = capture, p = print, q or Esc = quit.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Directory for photos and print files. Created if absent.
    #[arg(long, default_value = "photos")]
    photo_dir: PathBuf,

    /// Camera to use: "v4l" or "image". Default: first V4L2 camera, else the
    /// --test-image.
    #[arg(long, value_parser = parse_interface)]
    camera: Option<CameraInterface>,

    /// V4L2 device number (/dev/videoN).
    #[arg(long, default_value_t = 0)]
    camera_index: usize,

    /// Image served by the image camera.
    #[arg(long)]
    test_image: Option<PathBuf>,

    #[arg(long, default_value = "640x480", value_parser = parse_resolution)]
    resolution: Resolution,

    #[arg(long, default_value = "800x600", value_parser = parse_resolution)]
    preview_size: Resolution,

    /// Countdown steps before each capture.
    #[arg(long, default_value_t = 3)]
    countdown: u32,

    /// First caption line.
    #[arg(long)]
    title: Option<String>,

    /// Second caption line.
    #[arg(long)]
    date: Option<String>,

    /// TrueType caption font. Falls back to a built-in font.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Printer driver executable.
    #[arg(long)]
    printer: Option<PathBuf>,

    /// Printer device identifier passed to the driver.
    #[arg(long)]
    printer_device: Option<String>,

    /// Working directory for the printer driver.
    #[arg(long)]
    printer_dir: Option<PathBuf>,

    /// File or FIFO delivering "capture"/"print" lines from hardware buttons.
    #[arg(long)]
    button_input: Option<PathBuf>,
}

fn parse_interface(s: &str) -> Result<CameraInterface, String> {
    match s.to_ascii_lowercase().as_str() {
        "v4l" | "v4l2" => Ok(CameraInterface::V4l),
        "image" => Ok(CameraInterface::Image),
        _ => Err(format!("unknown camera interface {:?}", s)),
    }
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    s.parse::<Resolution>().map_err(|e| e.to_string())
}

impl Args {
    fn booth_config(&self) -> BoothConfig {
        let mut config = BoothConfig::default();
        config.photo_dir = self.photo_dir.clone();
        config.resolution = self.resolution;
        config.preview.region = self.preview_size;
        config.countdown.ticks = self.countdown;
        if let Some(title) = &self.title {
            config.captions.title = title.clone();
        }
        if let Some(date) = &self.date {
            config.captions.date = date.clone();
        }
        if self.font.is_some() {
            config.captions.font_path = self.font.clone();
        }
        if let Some(program) = &self.printer {
            config.printer.program = program.clone();
        }
        if let Some(device) = &self.printer_device {
            config.printer.device_id = device.clone();
        }
        if self.printer_dir.is_some() {
            config.printer.working_dir = self.printer_dir.clone();
        }
        config
    }
}

// Window chrome is out of scope here; log the achieved frame rate so the
// preview cadence can be checked on the device.
struct FrameRateSink {
    frames: u32,
    since: Instant,
}

impl PreviewSink for FrameRateSink {
    fn render(&mut self, _frame: &RgbImage, frame_id: u64) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(10) {
            debug!("Preview {:.1} fps (frame {})",
                   self.frames as f64 / elapsed.as_secs_f64(), frame_id);
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

// The countdown overlay and status line.
fn show_event(event: &BoothEvent) {
    match event {
        BoothEvent::CountdownTick(n) => println!("    {}", n),
        BoothEvent::Shutter => {
            println!("    *click*\x07");
            let _ = std::io::stdout().flush();
        },
        BoothEvent::PhotoSaved(path) => println!("Photo saved: {}", path.display()),
        BoothEvent::CaptureFailed(reason) => println!("Capture failed: {}", reason),
        BoothEvent::NothingToPrint => println!("Nothing to print"),
        BoothEvent::PrintStarted(path) => println!("Printing {}", path.display()),
        BoothEvent::PrintFinished{ok: true, ..} => println!("Print done"),
        BoothEvent::PrintFinished{ok: false, ..} => println!("Print failed, press print to retry"),
    }
}

// Forwards button lines. A FIFO reports EOF whenever its writer goes away, so
// reopen and keep reading.
async fn read_button_input(path: PathBuf, triggers: mpsc::UnboundedSender<Trigger>) {
    loop {
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!("Cannot open button input {}: {}", path.display(), e);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        let mut lines = BufReader::new(file).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match Trigger::from_command(&line, TriggerSource::Button) {
                Some(trigger) => {
                    if triggers.send(trigger).is_err() {
                        return;
                    }
                },
                None => debug!("Ignoring button input {:?}", line),
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.booth_config();

    let camera = match select_camera(args.camera, args.camera_index,
                                     args.test_image.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("No usable camera: {}", e);
            std::process::exit(1);
        }
    };
    let printer = Arc::new(CommandPrinter::new(&config.printer));
    let (booth, mut events) = match Photobooth::new(config, camera, printer).await {
        Ok(b) => b,
        Err(e) => {
            error!("Could not start booth: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let preview = booth.preview_loop();
    let preview_task = tokio::spawn(async move {
        let mut sink = FrameRateSink{frames: 0, since: Instant::now()};
        preview.run(&mut sink, shutdown_rx).await;
    });

    let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();
    let buttons = args.button_input.is_some();
    if let Some(path) = args.button_input.clone() {
        tokio::spawn(read_button_input(path, trigger_tx));
    }

    println!("c/space: capture   p: print   q: quit");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        let key = line.trim_matches(['\r', '\n']);
                        if key.eq_ignore_ascii_case("q") || key == "\x1b" {
                            break;
                        }
                        match Trigger::from_command(key, TriggerSource::Screen) {
                            Some(trigger) => {
                                booth.controller.handle(trigger);
                            },
                            None => println!("c/space: capture   p: print   q: quit"),
                        }
                    },
                    _ => {
                        // Without buttons there is nothing left to listen to.
                        if !buttons {
                            break;
                        }
                        stdin_open = false;
                    }
                }
            },
            Some(trigger) = trigger_rx.recv() => {
                booth.controller.handle(trigger);
            },
            Some(event) = events.recv() => show_event(&event),
            _ = &mut ctrl_c => break,
        }
    }

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = preview_task.await;
    booth.shutdown().await;
}
