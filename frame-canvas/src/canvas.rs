// SPDX-License-Identifier: MIT
//! Solid fills and caption drawing for placeholder frames.
//!
//! Caption origins follow the convention of classic computer-vision text
//! drawing: `origin` is the bottom-left corner of the text baseline, and
//! `font_scale` multiplies a base glyph height of [`BASE_GLYPH_PX`] pixels.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use log::{debug, warn};

/// Glyph height in pixels at `font_scale == 1.0`.
pub const BASE_GLYPH_PX: f32 = 22.0;

/// Environment variable naming a TTF/OTF file used for captions.
pub const FONT_ENV_VAR: &str = "TELEOP_CAPTION_FONT";

const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text to stamp onto a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    /// Baseline origin `(x, y)` in pixels.
    pub origin: (i32, i32),
    pub font_scale: f32,
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Caption {
    pub fn new(text: impl Into<String>, origin: (i32, i32)) -> Self {
        Self {
            text: text.into(),
            origin,
            font_scale: 1.0,
            color: [255, 0, 0],
            thickness: 1,
        }
    }

    pub fn font_scale(mut self, font_scale: f32) -> Self {
        self.font_scale = font_scale;
        self
    }

    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    fn px_scale(&self) -> PxScale {
        PxScale::from(BASE_GLYPH_PX * self.font_scale.max(0.1))
    }
}

#[derive(Debug)]
pub enum FontError {
    Io { path: PathBuf, source: io::Error },
    Invalid { path: PathBuf },
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Io { path, source } => {
                write!(f, "cannot read font {}: {}", path.display(), source)
            }
            FontError::Invalid { path } => write!(f, "not a usable font: {}", path.display()),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontError::Io { source, .. } => Some(source),
            FontError::Invalid { .. } => None,
        }
    }
}

/// A loaded caption font.
pub struct CaptionFont {
    font: FontVec,
    path: PathBuf,
}

impl CaptionFont {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|source| FontError::Io {
            path: path.clone(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| FontError::Invalid {
            path: path.clone(),
        })?;
        Ok(Self { font, path })
    }

    /// Finds a font: `explicit`, then [`FONT_ENV_VAR`], then well-known system paths.
    pub fn resolve(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            match Self::load(path) {
                Ok(font) => return Some(font),
                Err(e) => warn!("configured caption font unusable: {}", e),
            }
        }

        if let Some(path) = std::env::var_os(FONT_ENV_VAR) {
            match Self::load(&path) {
                Ok(font) => return Some(font),
                Err(e) => warn!("{} font unusable: {}", FONT_ENV_VAR, e),
            }
        }

        for candidate in SYSTEM_FONT_PATHS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            if let Ok(font) = Self::load(path) {
                debug!("using caption font {}", path.display());
                return Some(font);
            }
        }

        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionFont").field("path", &self.path).finish()
    }
}

/// Image filled with a single RGB color.
pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width.max(1), height.max(1), Rgb(color))
}

/// Draws `caption` onto `image`. Text falling outside the image is clipped.
pub fn draw_caption(image: &mut RgbImage, caption: &Caption, font: &CaptionFont) {
    if caption.text.is_empty() {
        return;
    }
    let scale = caption.px_scale();
    let (x, y) = top_left(caption);
    let color = Rgb(caption.color);

    // Thickness is emulated by overdrawing at small offsets.
    let spread = (caption.thickness as i32 - 1) / 2;
    for dy in -spread..=spread {
        for dx in -spread..=spread {
            draw_text_mut(
                image,
                color,
                x + dx,
                y + dy,
                scale,
                &font.font,
                &caption.text,
            );
        }
    }
}

/// Converts a baseline origin into the top-left corner used by the rasterizer.
fn top_left(caption: &Caption) -> (i32, i32) {
    let ascent = (BASE_GLYPH_PX * caption.font_scale.max(0.1)).round() as i32;
    (caption.origin.0, caption.origin.1 - ascent)
}
