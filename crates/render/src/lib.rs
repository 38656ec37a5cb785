//! Software renderer and PNG exporter for thumbnail compositions.
//!
//! This crate handles:
//! - Coverage rasterization of fills, strokes, text and images
//! - Canvas-style drawing state (save/restore, global alpha, rotation, shadows)
//! - Font loading and glyph caching
//! - Image decoding and caching
//! - PNG encoding

pub mod buffer;
pub mod config;
pub mod context;
pub mod export;
pub mod font;
pub mod image_cache;
pub mod mask;
pub mod renderer;

pub use buffer::PixelBuffer;
pub use config::RenderConfig;
pub use context::{RenderContext, Shadow};
pub use export::{encode_png, export_png};
pub use font::FontCache;
pub use image_cache::{ImageCache, ImageData};
pub use mask::Mask;
pub use renderer::{fit_rect, Renderer};
