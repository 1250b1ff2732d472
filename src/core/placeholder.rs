//! # Placeholder Frames
//!
//! Synthetic images shown when no live frame is available. They are rendered
//! once per stream at the descriptor's nominal size and then shared by every
//! slot that needs them.
//!
//! | Kind | Fill | Caption | Origin |
//! |------|------|---------|--------|
//! | no data | `(0,0,200)` | `[left]name` / `[right]name` | `(250,250)` |
//! | error / end of stream | `(255,255,0)` | `Error or End Video` | center |
//! | failed | `(255,255,0)` | `Stream failed` | center |
//!
//! Captions use font scale 5, thickness 4 and color `(255,0,0)`.

use std::path::Path;

use frame_canvas::ImageView;
use frame_canvas::canvas::{self, Caption, CaptionFont};
use log::warn;

use super::frame_slot::{FrameSlot, NO_DATA_COLOR, SlotOrigin};
use crate::config::{Side, StreamDescriptor};

pub const ERROR_COLOR: [u8; 3] = [255, 255, 0];
pub const CAPTION_COLOR: [u8; 3] = [255, 0, 0];
pub const CAPTION_FONT_SCALE: f32 = 5.0;
pub const CAPTION_THICKNESS: u32 = 4;
pub const NO_DATA_ORIGIN: (i32, i32) = (250, 250);
pub const ERROR_TEXT: &str = "Error or End Video";
pub const FAILED_TEXT: &str = "Stream failed";

/// Pre-rendered placeholders for one stream.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    no_data: [ImageView; 2],
    error: ImageView,
    failed: ImageView,
}

impl PlaceholderSet {
    /// Renders every placeholder at the descriptor's nominal size.
    ///
    /// Without a usable font the images are plain fills; the caption text is
    /// still attached to each view.
    pub fn render(descriptor: &StreamDescriptor, font_path: Option<&Path>) -> Self {
        let font = CaptionFont::resolve(font_path);
        if font.is_none() {
            warn!(
                "{}: no caption font found, placeholders will be drawn without text",
                descriptor.label()
            );
        }
        Self::render_with(descriptor, font.as_ref())
    }

    pub fn render_with(descriptor: &StreamDescriptor, font: Option<&CaptionFont>) -> Self {
        let (width, height) = (descriptor.width.max(1), descriptor.height.max(1));
        let center = ((width / 2) as i32, (height / 2) as i32);

        let no_data = [Side::Left, Side::Right].map(|side| {
            let text = format!("{}{}", side.tag(), descriptor.name);
            captioned(width, height, NO_DATA_COLOR, &text, NO_DATA_ORIGIN, font)
        });

        Self {
            no_data,
            error: captioned(width, height, ERROR_COLOR, ERROR_TEXT, center, font),
            failed: captioned(width, height, ERROR_COLOR, FAILED_TEXT, center, font),
        }
    }

    /// Slot for "nothing decodable yet".
    pub fn no_data_slot(&self) -> FrameSlot {
        FrameSlot::new(self.no_data.clone(), SlotOrigin::NoData)
    }

    /// Slot for a bus error or end of stream; both images are identical.
    pub fn error_slot(&self) -> FrameSlot {
        FrameSlot::new(
            [self.error.clone(), self.error.clone()],
            SlotOrigin::StreamError,
        )
    }

    pub fn failed_slot(&self) -> FrameSlot {
        FrameSlot::new(
            [self.failed.clone(), self.failed.clone()],
            SlotOrigin::Failed,
        )
    }

    pub fn no_data_image(&self, side: Side) -> &ImageView {
        &self.no_data[side.index()]
    }
}

fn captioned(
    width: u32,
    height: u32,
    fill: [u8; 3],
    text: &str,
    origin: (i32, i32),
    font: Option<&CaptionFont>,
) -> ImageView {
    let mut image = canvas::solid(width, height, fill);
    if let Some(font) = font {
        let caption = Caption::new(text, origin)
            .font_scale(CAPTION_FONT_SCALE)
            .thickness(CAPTION_THICKNESS)
            .color(CAPTION_COLOR);
        canvas::draw_caption(&mut image, &caption, font);
    }
    ImageView::from_rgb_image(image).with_caption(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> PlaceholderSet {
        let desc = StreamDescriptor::new("front", 5001).nominal_size(320, 240);
        PlaceholderSet::render_with(&desc, None)
    }

    #[test]
    fn test_no_data_captions_name_each_side() {
        let slot = set().no_data_slot();
        assert_eq!(slot.origin(), SlotOrigin::NoData);
        assert_eq!(slot.image(Side::Left).caption(), Some("[left]front"));
        assert_eq!(slot.image(Side::Right).caption(), Some("[right]front"));
        assert_eq!(slot.image(Side::Left).pixel(0, 0), Some(NO_DATA_COLOR));
    }

    #[test]
    fn test_error_slot_images_identical() {
        let slot = set().error_slot();
        let [left, right] = slot.images();
        assert!(left.shares_buffer(right));
        assert_eq!((left.width(), left.height()), (320, 240));
        assert_eq!(left.caption(), Some(ERROR_TEXT));
        assert_eq!(left.pixel(1, 1), Some(ERROR_COLOR));
    }

    #[test]
    fn test_failed_slot() {
        let slot = set().failed_slot();
        assert_eq!(slot.origin(), SlotOrigin::Failed);
        assert_eq!(slot.image(Side::Right).caption(), Some(FAILED_TEXT));
    }

    #[test]
    fn test_slots_reuse_rendered_images() {
        let placeholders = set();
        let a = placeholders.error_slot();
        let b = placeholders.error_slot();
        assert!(a.image(Side::Left).shares_buffer(b.image(Side::Left)));
    }
}
