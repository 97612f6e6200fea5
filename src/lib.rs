// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod abstract_camera;
pub mod booth;
pub mod caption_font;
pub mod capture_session;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_composer;
pub mod image_camera;
pub mod preview;
pub mod printer;
pub mod scaling;
pub mod select_camera;
pub mod session;
pub mod v4l_camera;
