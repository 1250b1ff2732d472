//! Mono/stereo extraction: maps one decoded frame onto a slot's image pair.

use frame_canvas::{ImageView, PixelFormat, Rect, SharedPixels, ViewError};

use super::frame_slot::default_tile;
use crate::config::{Side, StreamType};

/// Builds the left/right images for a decoded packed-RGB frame.
///
/// A stereo stream read as `Both` is split down the middle into two views of
/// the same buffer; the right half takes the extra column of an odd width.
/// Any other combination puts the whole frame at `side`'s index and leaves
/// the other index on the default tile.
pub fn extract(
    pixels: SharedPixels,
    width: u32,
    height: u32,
    stream_type: StreamType,
    side: Side,
) -> Result<[ImageView; 2], ViewError> {
    let frame = ImageView::from_shared(width, height, PixelFormat::Rgb8, pixels)?;

    if stream_type == StreamType::Stereo && side == Side::Both {
        let half = width / 2;
        if half == 0 {
            return Err(ViewError::ZeroSized { width: half, height });
        }
        let left = frame.sub_view(Rect::new(0, 0, half, height))?;
        let right = frame.sub_view(Rect::new(half, 0, width - half, height))?;
        return Ok([left, right]);
    }

    let mut images = [default_tile(), default_tile()];
    images[side.index()] = frame;
    Ok(images)
}
