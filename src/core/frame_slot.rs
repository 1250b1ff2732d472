//! One decode result: a left/right image pair.

use frame_canvas::{ImageView, canvas};
use once_cell::sync::Lazy;

use crate::config::Side;

/// Edge length of the tile held by a default-constructed slot.
pub const DEFAULT_TILE_SIZE: u32 = 10;
/// Color of the default tile and of "no data" placeholders.
pub const NO_DATA_COLOR: [u8; 3] = [0, 0, 200];

static DEFAULT_TILE: Lazy<ImageView> = Lazy::new(|| {
    ImageView::from_rgb_image(canvas::solid(
        DEFAULT_TILE_SIZE,
        DEFAULT_TILE_SIZE,
        NO_DATA_COLOR,
    ))
});

/// Shared 10x10 placeholder used for image indices a slot does not populate.
pub fn default_tile() -> ImageView {
    DEFAULT_TILE.clone()
}

/// Where a slot's images came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOrigin {
    /// Default-constructed tiles
    Default,
    /// Decoded frame from the stream
    Live,
    /// Error or end-of-stream placeholder
    StreamError,
    /// Nothing decodable was available
    NoData,
    /// The stream hit a fatal condition
    Failed,
}

/// Images for both eyes. Live images keep the decoded buffer alive.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    images: [ImageView; 2],
    origin: SlotOrigin,
    sequence: Option<u64>,
}

impl FrameSlot {
    pub fn new(images: [ImageView; 2], origin: SlotOrigin) -> Self {
        Self {
            images,
            origin,
            sequence: None,
        }
    }

    /// A live slot tagged with the index of the sample it came from.
    pub fn live(images: [ImageView; 2], sequence: u64) -> Self {
        Self {
            images,
            origin: SlotOrigin::Live,
            sequence: Some(sequence),
        }
    }

    pub fn image(&self, side: Side) -> &ImageView {
        &self.images[side.index()]
    }

    pub fn images(&self) -> &[ImageView; 2] {
        &self.images
    }

    pub fn origin(&self) -> SlotOrigin {
        self.origin
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn is_live(&self) -> bool {
        self.origin == SlotOrigin::Live
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new([default_tile(), default_tile()], SlotOrigin::Default)
    }
}
