//! Canvas-style drawing state over a pixel buffer.
//!
//! A [`RenderContext`] lives for exactly one render call. It keeps a
//! save/restore stack of transform, global alpha and shadow, and composites
//! coverage masks built in local space through the current transform.

use crate::buffer::PixelBuffer;
use crate::image_cache::ImageData;
use crate::mask::Mask;
use common::color::Color;
use common::geometry::{Path, Point, Rect, Transform};

/// Drop shadow parameters. The offset is in canvas pixels and is not
/// affected by the current transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Shadow {
    /// Shadows that would be fully hidden under the shape are skipped.
    fn is_visible(&self) -> bool {
        self.color.a > 0 && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }
}

#[derive(Clone, Debug)]
struct DrawState {
    transform: Transform,
    global_alpha: f32,
    shadow: Option<Shadow>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            global_alpha: 1.0,
            shadow: None,
        }
    }
}

/// Drawing context for a single render pass.
pub struct RenderContext<'a> {
    buffer: &'a mut PixelBuffer,
    state: DrawState,
    stack: Vec<DrawState>,
    /// Supersamples per axis.
    samples: u32,
    /// Curve flattening tolerance.
    tolerance: f32,
}

impl<'a> RenderContext<'a> {
    pub fn new(buffer: &'a mut PixelBuffer, samples: u32, tolerance: f32) -> Self {
        Self {
            buffer,
            state: DrawState::default(),
            stack: Vec::new(),
            samples: samples.clamp(1, 4),
            tolerance,
        }
    }

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Pop the last saved state. Unbalanced restores are ignored.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn global_alpha(&self) -> f32 {
        self.state.global_alpha
    }

    /// Values outside `[0, 1]` are ignored, as on an HTML canvas.
    pub fn set_global_alpha(&mut self, alpha: f32) {
        if alpha.is_finite() && (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.state.transform = Transform::translation(x, y).then(&self.state.transform);
    }

    pub fn rotate(&mut self, radians: f32) {
        self.state.transform = Transform::rotation(radians).then(&self.state.transform);
    }

    pub fn set_shadow(&mut self, shadow: Shadow) {
        self.state.shadow = Some(shadow);
    }

    /// The canvas in local coordinates, padded for any shadow spill.
    pub fn local_clip(&self) -> Rect {
        let mut pad = 2.0;
        if let Some(shadow) = &self.state.shadow {
            pad += shadow.offset_x.abs() + shadow.offset_y.abs() + shadow.blur * 2.0;
        }
        let canvas = Rect::new(0.0, 0.0, self.buffer.width as f32, self.buffer.height as f32)
            .inflate(pad, pad);
        match self.state.transform.inverse() {
            Some(inverse) => inverse.transform_rect(canvas),
            None => Rect::ZERO,
        }
    }

    pub fn fill_path(&mut self, path: &Path, color: Color) {
        let outline = path.flatten(self.tolerance);
        let mask = Mask::fill_outline(&outline, self.samples, self.local_clip());
        self.draw_mask(&mask, color);
    }

    pub fn stroke_path(&mut self, path: &Path, color: Color, width: f32, dash: &[f32]) {
        let outline = path.flatten(self.tolerance);
        let mask = Mask::stroke_outline(&outline, width, dash, self.samples, self.local_clip());
        self.draw_mask(&mask, color);
    }

    /// Composite a local-space mask in `color`, shadow first.
    pub fn draw_mask(&mut self, mask: &Mask, color: Color) {
        if mask.is_empty() || color.a == 0 || self.state.global_alpha <= 0.0 {
            return;
        }

        if let Some(shadow) = self.state.shadow.filter(Shadow::is_visible) {
            let blurred = mask.blurred(shadow.blur / 2.0);
            let offset = self
                .state
                .transform
                .then(&Transform::translation(shadow.offset_x, shadow.offset_y));
            self.paint(&blurred, offset, shadow.color);
        }
        self.paint(mask, self.state.transform, color);
    }

    fn canvas_area(&self, local: Rect, transform: &Transform) -> Option<Rect> {
        let canvas = Rect::new(0.0, 0.0, self.buffer.width as f32, self.buffer.height as f32);
        transform
            .transform_rect(local)
            .round_out()
            .intersection(&canvas)
    }

    fn paint(&mut self, mask: &Mask, transform: Transform, color: Color) {
        let Some(inverse) = transform.inverse() else {
            return;
        };
        let Some(area) = self.canvas_area(mask.bounds(), &transform) else {
            return;
        };

        let alpha = color.a as f32 / 255.0 * self.state.global_alpha;
        for y in area.y as u32..area.bottom() as u32 {
            for x in area.x as u32..area.right() as u32 {
                let local = inverse.transform_point(Point::new(x as f32 + 0.5, y as f32 + 0.5));
                let coverage = mask.sample(local);
                if coverage <= 0.0 {
                    continue;
                }
                let a = (alpha * coverage * 255.0).round().clamp(0.0, 255.0) as u8;
                self.buffer
                    .blend_pixel(x, y, Color::rgba(color.r, color.g, color.b, a));
            }
        }
    }

    /// Draw `image` stretched over `dest`, clipped to `clip`, both in local
    /// space. Sampling is nearest-neighbour.
    pub fn draw_image(&mut self, image: &ImageData, dest: Rect, clip: Rect) {
        if image.width == 0 || image.height == 0 || dest.is_empty() {
            return;
        }
        let Some(visible) = dest.intersection(&clip) else {
            return;
        };
        let transform = self.state.transform;
        let Some(inverse) = transform.inverse() else {
            return;
        };
        let Some(area) = self.canvas_area(visible, &transform) else {
            return;
        };

        let scale_x = image.width as f32 / dest.width;
        let scale_y = image.height as f32 / dest.height;
        for y in area.y as u32..area.bottom() as u32 {
            for x in area.x as u32..area.right() as u32 {
                let local = inverse.transform_point(Point::new(x as f32 + 0.5, y as f32 + 0.5));
                if !visible.contains_point(local) {
                    continue;
                }
                let u = ((local.x - dest.x) * scale_x).floor().max(0.0) as u32;
                let v = ((local.y - dest.y) * scale_y).floor().max(0.0) as u32;
                let texel = image.get_pixel(u.min(image.width - 1), v.min(image.height - 1));
                let a = (texel.a as f32 * self.state.global_alpha).round() as u8;
                self.buffer
                    .blend_pixel(x, y, Color::rgba(texel.r, texel.g, texel.b, a));
            }
        }
    }
}
