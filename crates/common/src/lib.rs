//! Common utilities and types shared by the composition engine crates.

pub mod color;
pub mod geometry;
pub mod error;

pub use color::Color;
pub use geometry::{Outline, Path, PathEl, Point, Polygon, Rect, Transform};
pub use error::{StudioError, StudioResult};
