// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::PathBuf;

use clap::Parser;
use env_logger;
use log::info;

use photobooth::config::CaptionConfig;
use photobooth::frame_composer::{FrameComposer, FrameLayout};

/// Renders the print layout for an existing photo: writes <photo>.pbm and
/// <photo>_framed.png next to it. Useful for checking captions and font
/// before an event.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Source photo.
    photo: PathBuf,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    date: Option<String>,

    /// TrueType caption font.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut captions = CaptionConfig::default();
    if let Some(title) = args.title {
        captions.title = title;
    }
    if let Some(date) = args.date {
        captions.date = date;
    }
    if args.font.is_some() {
        captions.font_path = args.font;
    }
    let composer = FrameComposer::new(FrameLayout::default(), &captions);
    match composer.compose(&args.photo) {
        Ok(artifact) => info!("Wrote {}", artifact.display()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
