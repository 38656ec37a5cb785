//! Composition renderer.
//!
//! [`Renderer::render`] is a pure projection of a composition (plus the
//! current selection) onto a freshly allocated raster. Font and image caches
//! only memoize decoding work and never change what gets drawn.

use crate::buffer::PixelBuffer;
use crate::config::RenderConfig;
use crate::context::{RenderContext, Shadow};
use crate::font::FontCache;
use crate::image_cache::ImageCache;
use crate::mask::Mask;
use common::color::Color;
use common::error::{StudioError, StudioResult};
use common::geometry::{Path, Point, Rect};
use scene::{Composition, ImageFit, Layer, LayerId, LayerKind, TextAlign};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Rasterizes compositions.
pub struct Renderer {
    config: RenderConfig,
    fonts: Arc<FontCache>,
    images: Arc<ImageCache>,
}

impl Renderer {
    /// Renderer with system fonts and an empty image cache.
    pub fn new(config: RenderConfig) -> Self {
        Self::with_caches(
            config,
            Arc::new(FontCache::new()),
            Arc::new(ImageCache::with_default_size()),
        )
    }

    pub fn with_caches(config: RenderConfig, fonts: Arc<FontCache>, images: Arc<ImageCache>) -> Self {
        Self {
            config,
            fonts,
            images,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontCache> {
        &self.fonts
    }

    pub fn images(&self) -> &Arc<ImageCache> {
        &self.images
    }

    /// Render `composition`, outlining the layer `selected` if it is drawn.
    ///
    /// Fails only when the canvas is empty or larger than
    /// [`RenderConfig::max_surface_pixels`]; nothing is drawn in that case.
    pub fn render(
        &self,
        composition: &Composition,
        selected: Option<&LayerId>,
    ) -> StudioResult<PixelBuffer> {
        let (width, height) = (composition.canvas_width, composition.canvas_height);
        let pixels = width as u64 * height as u64;
        if pixels == 0 {
            return Err(StudioError::surface(format!("canvas is {}x{}", width, height)));
        }
        if pixels > self.config.max_surface_pixels {
            return Err(StudioError::surface(format!(
                "canvas {}x{} exceeds the {} pixel limit",
                width, height, self.config.max_surface_pixels
            )));
        }

        let mut buffer = PixelBuffer::new(width, height);
        {
            let mut ctx = RenderContext::new(
                &mut buffer,
                self.config.antialias_samples,
                self.config.curve_tolerance,
            );

            for layer in composition.sorted_by_z() {
                if layer.is_hidden() {
                    trace!(layer = %layer.id, "skipping hidden layer");
                    continue;
                }

                self.draw_layer(&mut ctx, layer);

                if selected == Some(&layer.id) {
                    self.draw_selection(&mut ctx, layer);
                }
            }
        }

        debug!(width, height, layers = composition.len(), "rendered composition");
        Ok(buffer)
    }

    fn draw_layer(&self, ctx: &mut RenderContext<'_>, layer: &Layer) {
        ctx.save();
        ctx.set_global_alpha(layer.effective_opacity());

        let rotation = layer.rotation_degrees();
        if rotation != 0.0 {
            ctx.translate(layer.x, layer.y);
            ctx.rotate(rotation.to_radians());
            ctx.translate(-layer.x, -layer.y);
        }

        trace!(layer = %layer.id, kind = ?layer.kind, z = layer.z_index, "drawing layer");
        match layer.kind {
            LayerKind::Background | LayerKind::Shape => self.draw_shape(ctx, layer),
            LayerKind::Text => self.draw_text(ctx, layer),
            LayerKind::Image => self.draw_image(ctx, layer),
        }

        ctx.restore();
    }

    fn draw_shape(&self, ctx: &mut RenderContext<'_>, layer: &Layer) {
        let rect = layer.draw_rect();
        let path = if layer.fill.is_elliptical() {
            Path::ellipse(rect)
        } else {
            match layer.fill.border_radius {
                Some(radius) if radius != 0.0 => Path::rounded_rect(rect, radius),
                _ => Path::rect(rect),
            }
        };

        if let Some(fill) = layer_color(layer, "fill_color", layer.fill.fill_color.as_deref()) {
            ctx.fill_path(&path, fill);
        }

        let border = layer_color(layer, "border_color", layer.fill.border_color.as_deref());
        if let (Some(color), Some(width)) = (border, layer.fill.border_width) {
            if width > 0.0 {
                ctx.stroke_path(&path, color, width, &[]);
            }
        }
    }

    fn draw_text(&self, ctx: &mut RenderContext<'_>, layer: &Layer) {
        let style = &layer.text;
        let Some(text) = style.text.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };

        let family = style
            .font_family
            .as_deref()
            .unwrap_or(&self.config.default_font_family);
        let weight = style
            .font_weight
            .as_deref()
            .unwrap_or(&self.config.default_font_weight);
        let size = style
            .font_size
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(self.config.default_font_size);
        let align = style.text_align.unwrap_or(self.config.default_text_align);
        let fill = layer_color(layer, "color", style.color.as_deref())
            .unwrap_or(self.config.default_text_color);

        let Some(glyphs) = self.text_mask(text, family, weight, size, layer.center(), align) else {
            warn!(layer = %layer.id, family, "no font available; text not drawn");
            return;
        };

        if let Some(color) = layer_color(layer, "shadow_color", style.shadow_color.as_deref()) {
            ctx.set_shadow(Shadow {
                color,
                blur: style.shadow_blur.unwrap_or(0.0).max(0.0),
                offset_x: style.shadow_offset_x.unwrap_or(0.0),
                offset_y: style.shadow_offset_y.unwrap_or(0.0),
            });
        }

        let stroke = layer_color(layer, "stroke_color", style.stroke_color.as_deref());
        if let (Some(color), Some(width)) = (stroke, style.stroke_width) {
            if width > 0.0 {
                // Past the canvas diagonal a wider stroke looks the same.
                let clip = ctx.local_clip();
                let radius = (width / 2.0).min(clip.width.hypot(clip.height));
                ctx.draw_mask(&glyphs.dilate(radius), color);
            }
        }

        ctx.draw_mask(&glyphs, fill);
    }

    fn draw_image(&self, ctx: &mut RenderContext<'_>, layer: &Layer) {
        let frame = layer.bounds();
        let bitmap = layer
            .image
            .references()
            .find_map(|reference| self.images.resolve(reference));

        match bitmap {
            Some(image) => {
                let fit = layer.image.fit.unwrap_or_default();
                let dest = fit_rect(frame, image.width, image.height, fit);
                ctx.draw_image(&image, dest, frame);
            }
            None => {
                trace!(layer = %layer.id, "image unresolved; drawing placeholder");
                ctx.fill_path(&Path::rect(frame), self.config.placeholder_fill);
                let caption = self.text_mask(
                    &self.config.placeholder_caption,
                    &self.config.placeholder_caption_font,
                    "normal",
                    self.config.placeholder_caption_size,
                    layer.center(),
                    TextAlign::Center,
                );
                if let Some(caption) = caption {
                    ctx.draw_mask(&caption, self.config.placeholder_caption_color);
                }
            }
        }
    }

    /// Dashed outline around the layer's upright box, in canvas space.
    fn draw_selection(&self, ctx: &mut RenderContext<'_>, layer: &Layer) {
        let margin = self.config.selection_margin;
        let outline = layer.bounds().inflate(margin, margin);
        ctx.stroke_path(
            &Path::rect(outline),
            self.config.selection_color,
            self.config.selection_line_width,
            &self.config.selection_dash,
        );
    }

    /// Coverage of one line of text, vertically centered on `anchor.y`.
    ///
    /// Returns `None` when no font can be resolved.
    fn text_mask(
        &self,
        text: &str,
        family: &str,
        weight: &str,
        size: f32,
        anchor: Point,
        align: TextAlign,
    ) -> Option<Mask> {
        let font = self.fonts.get_font(family, weight)?;
        let run = font.layout(text, size);
        let left = match align {
            TextAlign::Left | TextAlign::Start => anchor.x,
            TextAlign::Center => anchor.x - run.width / 2.0,
            TextAlign::Right | TextAlign::End => anchor.x - run.width,
        };
        let metrics = font.line_metrics(size);
        let baseline = (anchor.y + (metrics.ascent + metrics.descent) / 2.0).round() as i32;

        let placed: Vec<_> = run
            .glyphs
            .iter()
            .map(|g| {
                let bitmap = font.rasterize(g.ch, size);
                let x = (left + g.x).round() as i32 + bitmap.xmin;
                let y = baseline - bitmap.ymin - bitmap.height as i32;
                (x, y, bitmap)
            })
            .filter(|(_, _, b)| b.width > 0 && b.height > 0)
            .collect();

        let Some(bounds) = placed
            .iter()
            .map(|(x, y, b)| Rect::new(*x as f32, *y as f32, b.width as f32, b.height as f32))
            .reduce(|a, b| a.union(&b))
        else {
            return Some(Mask::empty());
        };

        let mut mask = Mask::covering(bounds);
        for (x, y, bitmap) in &placed {
            mask.blit(*x, *y, bitmap.width, bitmap.height, &bitmap.data);
        }
        Some(mask)
    }
}

/// Parse an optional layer color, treating unparseable values as unset.
fn layer_color(layer: &Layer, field: &str, value: Option<&str>) -> Option<Color> {
    let value = value?;
    let color = Color::parse(value);
    if color.is_none() {
        warn!(layer = %layer.id, field, value, "unparseable color treated as unset");
    }
    color
}

/// Destination of an `image_width`×`image_height` bitmap fitted into
/// `frame`, centered.
pub fn fit_rect(frame: Rect, image_width: u32, image_height: u32, fit: ImageFit) -> Rect {
    let (iw, ih) = (image_width as f32, image_height as f32);
    if iw <= 0.0 || ih <= 0.0 || frame.is_empty() {
        return frame;
    }

    let sx = frame.width / iw;
    let sy = frame.height / ih;
    let (width, height) = match fit {
        ImageFit::Fill => (frame.width, frame.height),
        ImageFit::Contain => (iw * sx.min(sy), ih * sx.min(sy)),
        ImageFit::Cover => (iw * sx.max(sy), ih * sx.max(sy)),
        ImageFit::None => (iw, ih),
        ImageFit::ScaleDown => {
            let s = sx.min(sy).min(1.0);
            (iw * s, ih * s)
        }
    };
    Rect::from_center(frame.center(), width, height)
}
