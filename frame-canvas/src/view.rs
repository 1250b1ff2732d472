// SPDX-License-Identifier: MIT
//! # Image Views
//!
//! [`ImageView`] is a read-only window onto packed pixel memory. It never owns
//! the bytes exclusively: storage is an `Arc<dyn AsRef<[u8]>>`, which lets the
//! same type wrap a mapped decoder buffer, an owned `Vec<u8>` or a rendered
//! placeholder.
//!
//! Sub-views share the parent's storage and only narrow the visible rectangle,
//! so splitting a side-by-side stereo frame costs two `Arc` clones.

use std::fmt;
use std::sync::Arc;

use image::RgbImage;

/// Shared, immutable pixel storage.
pub type SharedPixels = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// Pixel layouts understood by the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit RGB, 3 bytes per pixel, rows tightly packed.
    Rgb8,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Errors raised while constructing views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Width or height is zero.
    ZeroSized { width: u32, height: u32 },
    /// Backing storage is shorter than `stride * height`.
    BufferTooSmall { needed: usize, actual: usize },
    /// Requested sub-region does not fit inside the parent view.
    OutOfBounds { rect: Rect, width: u32, height: u32 },
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::ZeroSized { width, height } => {
                write!(f, "image view must not be empty ({}x{})", width, height)
            }
            ViewError::BufferTooSmall { needed, actual } => write!(
                f,
                "pixel buffer too small: need {} bytes, have {}",
                needed, actual
            ),
            ViewError::OutOfBounds {
                rect,
                width,
                height,
            } => write!(
                f,
                "region {}x{}+{}+{} outside {}x{} view",
                rect.width, rect.height, rect.x, rect.y, width, height
            ),
        }
    }
}

impl std::error::Error for ViewError {}

/// Read-only view over a region of shared packed pixels.
#[derive(Clone)]
pub struct ImageView {
    pixels: SharedPixels,
    format: PixelFormat,
    /// Bytes per row of the backing buffer (not of the visible region).
    stride: usize,
    /// Visible region, in backing-buffer coordinates.
    region: Rect,
    caption: Option<Arc<str>>,
}

impl ImageView {
    /// Wraps tightly packed pixels of the given geometry.
    pub fn from_shared(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: SharedPixels,
    ) -> Result<Self, ViewError> {
        if width == 0 || height == 0 {
            return Err(ViewError::ZeroSized { width, height });
        }
        let stride = width as usize * format.bytes_per_pixel();
        let needed = stride * height as usize;
        let actual = (*pixels).as_ref().len();
        if actual < needed {
            return Err(ViewError::BufferTooSmall { needed, actual });
        }
        Ok(Self {
            pixels,
            format,
            stride,
            region: Rect::new(0, 0, width, height),
            caption: None,
        })
    }

    /// Takes ownership of a rendered RGB image.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize * PixelFormat::Rgb8.bytes_per_pixel();
        Self {
            pixels: Arc::new(image.into_raw()),
            format: PixelFormat::Rgb8,
            stride,
            region: Rect::new(0, 0, width, height),
            caption: None,
        }
    }

    /// Attaches the text drawn into this image, kept for diagnostics.
    pub fn with_caption(mut self, caption: impl Into<Arc<str>>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Narrows the view to `rect`, given relative to this view. No pixels are copied.
    pub fn sub_view(&self, rect: Rect) -> Result<Self, ViewError> {
        if rect.width == 0 || rect.height == 0 {
            return Err(ViewError::ZeroSized {
                width: rect.width,
                height: rect.height,
            });
        }
        if rect.right() > self.region.width || rect.bottom() > self.region.height {
            return Err(ViewError::OutOfBounds {
                rect,
                width: self.region.width,
                height: self.region.height,
            });
        }
        Ok(Self {
            pixels: Arc::clone(&self.pixels),
            format: self.format,
            stride: self.stride,
            region: Rect::new(
                self.region.x + rect.x,
                self.region.y + rect.y,
                rect.width,
                rect.height,
            ),
            caption: self.caption.clone(),
        })
    }

    pub fn width(&self) -> u32 {
        self.region.width
    }

    pub fn height(&self) -> u32 {
        self.region.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Visible region in the coordinates of the backing buffer.
    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Bytes of row `y` restricted to the visible columns.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.region.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = (self.region.y + y) as usize * self.stride + self.region.x as usize * bpp;
        let end = start + self.region.width as usize * bpp;
        (*self.pixels).as_ref().get(start..end)
    }

    /// RGB value at `(x, y)` relative to the view.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.region.width {
            return None;
        }
        let row = self.row(y)?;
        let offset = x as usize * self.format.bytes_per_pixel();
        Some([row[offset], row[offset + 1], row[offset + 2]])
    }

    /// True when both views read from the same backing storage.
    pub fn shares_buffer(&self, other: &ImageView) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.pixels) as *const (),
            Arc::as_ptr(&other.pixels) as *const (),
        )
    }

    /// Number of live views (including this one) sharing the backing storage.
    pub fn buffer_refs(&self) -> usize {
        Arc::strong_count(&self.pixels)
    }

    /// Copies the visible region into an owned image, e.g. for texture upload.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut out = Vec::with_capacity(
            self.region.width as usize * self.region.height as usize * 3,
        );
        for y in 0..self.region.height {
            if let Some(row) = self.row(y) {
                out.extend_from_slice(row);
            }
        }
        // Rows were validated at construction, so the length always matches.
        RgbImage::from_raw(self.region.width, self.region.height, out)
            .unwrap_or_else(|| RgbImage::new(self.region.width, self.region.height))
    }
}

impl fmt::Debug for ImageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("format", &self.format)
            .field("region", &self.region)
            .field("stride", &self.stride)
            .field("caption", &self.caption)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        data
    }

    #[test]
    fn test_from_shared_rejects_short_buffer() {
        let err = ImageView::from_shared(4, 4, PixelFormat::Rgb8, Arc::new(vec![0u8; 10]))
            .unwrap_err();
        assert_eq!(
            err,
            ViewError::BufferTooSmall {
                needed: 48,
                actual: 10
            }
        );
    }

    #[test]
    fn test_sub_view_reads_offset_columns() {
        let view =
            ImageView::from_shared(6, 3, PixelFormat::Rgb8, Arc::new(gradient(6, 3))).unwrap();
        let right = view.sub_view(Rect::new(3, 0, 3, 3)).unwrap();

        assert_eq!(right.width(), 3);
        assert_eq!(right.pixel(0, 2), Some([3, 2, 7]));
        assert_eq!(right.row(1).unwrap().len(), 9);
        assert!(right.shares_buffer(&view));
        assert_eq!(view.buffer_refs(), 2);
    }

    #[test]
    fn test_nested_sub_view_is_relative() {
        let view =
            ImageView::from_shared(8, 4, PixelFormat::Rgb8, Arc::new(gradient(8, 4))).unwrap();
        let half = view.sub_view(Rect::new(4, 0, 4, 4)).unwrap();
        let quarter = half.sub_view(Rect::new(2, 1, 2, 2)).unwrap();

        assert_eq!(quarter.region(), Rect::new(6, 1, 2, 2));
        assert_eq!(quarter.pixel(0, 0), Some([6, 1, 7]));
    }

    #[test]
    fn test_sub_view_out_of_bounds() {
        let view =
            ImageView::from_shared(4, 4, PixelFormat::Rgb8, Arc::new(gradient(4, 4))).unwrap();
        assert!(matches!(
            view.sub_view(Rect::new(2, 0, 3, 4)),
            Err(ViewError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_to_rgb_image_copies_region() {
        let view =
            ImageView::from_shared(4, 2, PixelFormat::Rgb8, Arc::new(gradient(4, 2))).unwrap();
        let image = view.sub_view(Rect::new(1, 1, 2, 1)).unwrap().to_rgb_image();

        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(1, 0).0, [2, 1, 7]);
    }

    #[test]
    fn test_rect_overlap() {
        let left = Rect::new(0, 0, 640, 720);
        let right = Rect::new(640, 0, 640, 720);
        assert!(!left.overlaps(&right));
        assert!(left.overlaps(&Rect::new(639, 0, 2, 1)));
    }
}
