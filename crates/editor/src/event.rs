//! Pointer input and screen-to-canvas mapping.

use common::geometry::Point;
use serde::{Deserialize, Serialize};

/// Pointer input in screen (client) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    /// The pointer left the canvas. Ends a drag exactly like `Up`.
    Leave,
}

/// Where the canvas is displayed on screen.
///
/// The displayed size may differ from the raster size when the canvas is
/// scaled for display; pointer positions are scaled back to raster pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Viewport {
    /// Canvas displayed at its native size at the screen origin.
    pub fn native(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            display_width: canvas_width as f32,
            display_height: canvas_height as f32,
            canvas_width: canvas_width as f32,
            canvas_height: canvas_height as f32,
        }
    }

    pub fn with_display(mut self, left: f32, top: f32, width: f32, height: f32) -> Self {
        self.left = left;
        self.top = top;
        self.display_width = width;
        self.display_height = height;
        self
    }

    /// Map a screen position into canvas pixels.
    pub fn to_canvas(&self, x: f32, y: f32) -> Point {
        Point::new(
            (x - self.left) * scale(self.canvas_width, self.display_width),
            (y - self.top) * scale(self.canvas_height, self.display_height),
        )
    }
}

/// Canvas pixels per display pixel; a degenerate display maps 1:1.
fn scale(canvas: f32, display: f32) -> f32 {
    if display > 0.0 && display.is_finite() {
        canvas / display
    } else {
        1.0
    }
}
