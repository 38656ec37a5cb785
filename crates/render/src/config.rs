//! Renderer configuration.

use common::color::Color;
use scene::TextAlign;

/// Selection accent color (`#3B82F6`).
pub const SELECTION_COLOR: Color = Color::rgb(0x3b, 0x82, 0xf6);
/// Image placeholder fill (`#E5E7EB`).
pub const PLACEHOLDER_FILL: Color = Color::rgb(0xe5, 0xe7, 0xeb);
/// Image placeholder caption color (`#9CA3AF`).
pub const PLACEHOLDER_CAPTION_COLOR: Color = Color::rgb(0x9c, 0xa3, 0xaf);

/// Renderer configuration: the defaults applied when a layer leaves a field
/// unset, plus the look of the selection and placeholder overlays.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Font family for text layers without one.
    pub default_font_family: String,
    /// Font size in pixels for text layers without one.
    pub default_font_size: f32,
    /// Font weight for text layers without one.
    pub default_font_weight: String,
    /// Glyph fill for text layers without a color.
    pub default_text_color: Color,
    /// Alignment for text layers without one.
    pub default_text_align: TextAlign,
    /// Selection outline color.
    pub selection_color: Color,
    /// Selection outline width.
    pub selection_line_width: f32,
    /// Gap between a layer's box and its selection outline.
    pub selection_margin: f32,
    /// Selection outline dash pattern.
    pub selection_dash: Vec<f32>,
    /// Fill of unresolved image layers.
    pub placeholder_fill: Color,
    /// Caption drawn on unresolved image layers.
    pub placeholder_caption: String,
    pub placeholder_caption_color: Color,
    pub placeholder_caption_size: f32,
    pub placeholder_caption_font: String,
    /// Largest raster the renderer will allocate, in pixels.
    pub max_surface_pixels: u64,
    /// Supersamples per axis for edge antialiasing (1 disables it).
    pub antialias_samples: u32,
    /// Maximum deviation when flattening curves, in pixels.
    pub curve_tolerance: f32,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback font.
    pub fn with_default_font(mut self, family: &str, size: f32) -> Self {
        self.default_font_family = family.to_string();
        self.default_font_size = size;
        self
    }

    /// Set the selection outline color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the selection outline margin.
    pub fn with_selection_margin(mut self, margin: f32) -> Self {
        self.selection_margin = margin;
        self
    }

    /// Set the raster size limit.
    pub fn with_max_surface_pixels(mut self, pixels: u64) -> Self {
        self.max_surface_pixels = pixels;
        self
    }

    /// Set antialiasing supersamples per axis, clamped to 1..=4.
    pub fn with_antialias_samples(mut self, samples: u32) -> Self {
        self.antialias_samples = samples.clamp(1, 4);
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_font_family: "Arial".to_string(),
            default_font_size: 48.0,
            default_font_weight: "normal".to_string(),
            default_text_color: Color::WHITE,
            default_text_align: TextAlign::Center,
            selection_color: SELECTION_COLOR,
            selection_line_width: 3.0,
            selection_margin: 5.0,
            selection_dash: vec![5.0, 5.0],
            placeholder_fill: PLACEHOLDER_FILL,
            placeholder_caption: "Image Placeholder".to_string(),
            placeholder_caption_color: PLACEHOLDER_CAPTION_COLOR,
            placeholder_caption_size: 16.0,
            placeholder_caption_font: "Arial".to_string(),
            max_surface_pixels: 64 * 1024 * 1024,
            antialias_samples: 2,
            curve_tolerance: 0.25,
        }
    }
}
