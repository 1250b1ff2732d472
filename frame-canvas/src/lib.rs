// SPDX-License-Identifier: MIT
//! # frame-canvas: image views for decoded teleop frames
//!
//! This crate is the image side of the teleop frame pipeline. The decode loop
//! hands it raw packed-RGB memory (a mapped GStreamer buffer or an owned
//! `Vec<u8>`) and gets back cheap, cloneable views that a renderer can read
//! without copying.
//!
//! ## Key Components
//!
//! - [`view`]: [`ImageView`] and [`Rect`], read-only views over shared pixel
//!   storage with zero-copy sub-views (used for the stereo split)
//! - [`canvas`]: solid fills and caption drawing for placeholder frames
//!
//! ## Memory Model
//!
//! Pixel storage is held behind an `Arc`, so every view (and every sub-view)
//! keeps the backing memory alive. When the storage is a mapped buffer, the
//! mapping is released when the last view referencing it is dropped.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use frame_canvas::{ImageView, PixelFormat, Rect};
//!
//! let pixels = vec![0u8; 8 * 2 * 3];
//! let frame = ImageView::from_shared(8, 2, PixelFormat::Rgb8, Arc::new(pixels))?;
//! let left = frame.sub_view(Rect::new(0, 0, 4, 2))?;
//! let right = frame.sub_view(Rect::new(4, 0, 4, 2))?;
//! assert!(left.shares_buffer(&right));
//! # Ok::<(), frame_canvas::ViewError>(())
//! ```

pub mod canvas;
pub mod view;

pub use canvas::{Caption, CaptionFont};
pub use view::{ImageView, PixelFormat, Rect, SharedPixels, ViewError};
