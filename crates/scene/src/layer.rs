//! Layers: the atomic drawable units of a composition.

use common::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable layer identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer type tag. Determines which payload fields are meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Background,
    Shape,
    Text,
    Image,
}

/// Horizontal text alignment relative to the layer's x coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
    Start,
    End,
}

/// How a bitmap is fitted into its layer box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
    None,
    ScaleDown,
}

/// Overwrite each listed field of `$dst` whose counterpart in `$src` is set.
macro_rules! merge_fields {
    ($dst:ident, $src:ident; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                $dst.$field = Some(value.clone());
            }
        )+
    };
}

/// Text payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    /// Fill color of the glyphs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_blur: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_offset_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_offset_y: Option<f32>,
}

impl TextStyle {
    pub fn merge(&mut self, other: &TextStyle) {
        merge_fields!(self, other;
            text, font_family, font_size, font_weight, color, text_align,
            stroke_color, stroke_width, shadow_color, shadow_blur,
            shadow_offset_x, shadow_offset_y,
        );
    }
}

/// Fill payload shared by shapes and backgrounds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f32>,
    /// Free-form shape hint (`rectangle`, `circle`, `arrow`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<String>,
}

impl FillStyle {
    pub fn merge(&mut self, other: &FillStyle) {
        merge_fields!(self, other;
            fill_color, border_color, border_width, border_radius, shape_type,
        );
    }

    /// Whether the shape hint asks for an ellipse instead of a rectangle.
    pub fn is_elliptical(&self) -> bool {
        matches!(
            self.shape_type.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("circle") | Some("ellipse") | Some("oval")
        )
    }
}

/// Image payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Embedded data, usually a `data:` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<ImageFit>,
}

impl ImageSource {
    pub fn merge(&mut self, other: &ImageSource) {
        merge_fields!(self, other; image_url, image_data, fit);
    }

    /// Candidate source references, embedded data first.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.image_data
            .as_deref()
            .into_iter()
            .chain(self.image_url.as_deref())
    }
}

/// A drawable layer.
///
/// `x` and `y` are the center of the layer box in canvas pixels. Background
/// layers ignore them and are anchored at the canvas origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// Rotation in degrees, clockwise, around the layer center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    /// Opacity in `[0, 1]`; unset means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Stacking order. Higher draws later.
    #[serde(default)]
    pub z_index: i32,
    #[serde(flatten)]
    pub text: TextStyle,
    #[serde(flatten)]
    pub fill: FillStyle,
    #[serde(flatten)]
    pub image: ImageSource,
    /// Fields this editor does not interpret, written back unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Layer {
    pub fn new(id: impl Into<LayerId>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: None,
            opacity: None,
            z_index: 0,
            text: TextStyle::default(),
            fill: FillStyle::default(),
            image: ImageSource::default(),
            extra: serde_json::Map::new(),
        }
    }

    /// Full-canvas background with a solid fill.
    pub fn background(id: impl Into<LayerId>, width: f32, height: f32, fill: &str) -> Self {
        Self::new(id, LayerKind::Background)
            .with_frame(width / 2.0, height / 2.0, width, height)
            .with_fill(fill)
    }

    pub fn with_frame(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn with_fill(mut self, color: &str) -> Self {
        self.fill.fill_color = Some(color.to_string());
        self
    }

    pub fn with_border(mut self, color: &str, width: f32) -> Self {
        self.fill.border_color = Some(color.to_string());
        self.fill.border_width = Some(width);
        self
    }

    pub fn with_text(mut self, text: &str, color: &str) -> Self {
        self.text.text = Some(text.to_string());
        self.text.color = Some(color.to_string());
        self
    }

    pub fn with_image(mut self, reference: &str) -> Self {
        self.image.image_url = Some(reference.to_string());
        self
    }

    /// Effective opacity, clamped to `[0, 1]`.
    pub fn effective_opacity(&self) -> f32 {
        self.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    /// Rotation in degrees, zero when unset.
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.unwrap_or(0.0)
    }

    /// Whether the layer is explicitly hidden via zero opacity.
    pub fn is_hidden(&self) -> bool {
        self.opacity == Some(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Unrotated box centered on `(x, y)`, used for hit-testing and the
    /// selection outline.
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center(), self.width, self.height)
    }

    /// Box the layer content is drawn into, before rotation.
    pub fn draw_rect(&self) -> Rect {
        match self.kind {
            LayerKind::Background => Rect::new(0.0, 0.0, self.width, self.height),
            _ => self.bounds(),
        }
    }

    /// Copy of this layer with `patch` merged in.
    pub fn patched(&self, patch: &LayerPatch) -> Layer {
        let mut layer = self.clone();
        if let Some(x) = patch.x {
            layer.x = x;
        }
        if let Some(y) = patch.y {
            layer.y = y;
        }
        if let Some(width) = patch.width {
            layer.width = width;
        }
        if let Some(height) = patch.height {
            layer.height = height;
        }
        if patch.rotation.is_some() {
            layer.rotation = patch.rotation;
        }
        if patch.opacity.is_some() {
            layer.opacity = patch.opacity;
        }
        layer.text.merge(&patch.text);
        layer.fill.merge(&patch.fill);
        layer.image.merge(&patch.image);
        layer
    }
}

/// Partial layer update. Set fields overwrite; unset fields are left alone.
///
/// Identity, type and stacking order are not patchable; stacking changes go
/// through [`Composition::reorder`](crate::Composition::reorder).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(flatten)]
    pub text: TextStyle,
    #[serde(flatten)]
    pub fill: FillStyle,
    #[serde(flatten)]
    pub image: ImageSource,
}

impl LayerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text.text = Some(text.to_string());
        self
    }

    pub fn with_fill(mut self, color: &str) -> Self {
        self.fill.fill_color = Some(color.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_deserialize() {
        let json = r##"{
            "id": "text_main",
            "type": "text",
            "text": "HELLO",
            "x": 640,
            "y": 360,
            "width": 1000,
            "height": 150,
            "z_index": 10,
            "font_family": "Impact",
            "font_size": 95,
            "font_weight": "bold",
            "color": "#FFFFFF",
            "text_align": "center",
            "stroke_color": "#000000",
            "stroke_width": 5,
            "shadow_color": "#000000",
            "shadow_blur": 6,
            "shadow_offset_x": 2,
            "shadow_offset_y": 2,
            "opacity": 1.0,
            "rotation": 0
        }"##;

        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.id.as_str(), "text_main");
        assert_eq!(layer.kind, LayerKind::Text);
        assert_eq!(layer.z_index, 10);
        assert_eq!(layer.text.font_size, Some(95.0));
        assert_eq!(layer.text.text_align, Some(TextAlign::Center));
        assert_eq!(layer.text.shadow_offset_y, Some(2.0));
        assert_eq!(layer.rotation, Some(0.0));
        assert_eq!(layer.fill, FillStyle::default());
    }

    #[test]
    fn test_layer_serialize_skips_unset() {
        let layer = Layer::new("s", LayerKind::Shape).with_fill("#FF0000");
        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["type"], "shape");
        assert_eq!(value["fill_color"], "#FF0000");
        assert!(value.get("opacity").is_none());
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_unknown_layer_fields_round_trip() {
        let json = r##"{"id": "logo", "type": "image", "x": 10, "y": 10,
            "image_url": "user_upload_1", "locked": true, "effects": {"glow": 4}}"##;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.extra.len(), 2);
        assert_eq!(layer.extra["locked"], true);
        assert!(!layer.extra.contains_key("image_url"));

        let moved = layer.patched(&LayerPatch::position(40.0, 10.0));
        let value = serde_json::to_value(&moved).unwrap();
        assert_eq!(value["locked"], true);
        assert_eq!(value["effects"]["glow"], 4);
        assert_eq!(value["image_url"], "user_upload_1");
        assert_eq!(value["x"], 40.0);
    }

    #[test]
    fn test_bounds_and_draw_rect() {
        let shape = Layer::new("s", LayerKind::Shape).with_frame(100.0, 50.0, 40.0, 20.0);
        assert_eq!(shape.bounds(), Rect::new(80.0, 40.0, 40.0, 20.0));
        assert_eq!(shape.draw_rect(), shape.bounds());

        let bg = Layer::new("bg", LayerKind::Background).with_frame(0.0, 0.0, 1280.0, 720.0);
        assert_eq!(bg.draw_rect(), Rect::new(0.0, 0.0, 1280.0, 720.0));
        assert_eq!(bg.bounds(), Rect::new(-640.0, -360.0, 1280.0, 720.0));
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let layer = Layer::new("t", LayerKind::Text)
            .with_frame(10.0, 20.0, 100.0, 50.0)
            .with_text("old", "#000000")
            .with_opacity(0.5);

        let patched = layer.patched(&LayerPatch::new().with_text("new").with_rotation(15.0));
        assert_eq!(patched.text.text.as_deref(), Some("new"));
        assert_eq!(patched.text.color.as_deref(), Some("#000000"));
        assert_eq!(patched.rotation, Some(15.0));
        assert_eq!(patched.opacity, Some(0.5));
        assert_eq!(patched.x, 10.0);

        assert_eq!(layer.patched(&LayerPatch::new()), layer);
    }

    #[test]
    fn test_patch_from_json() {
        let patch: LayerPatch =
            serde_json::from_str(r#"{"x": 5, "fill_color": "red", "fit": "contain"}"#).unwrap();
        assert_eq!(patch.x, Some(5.0));
        assert_eq!(patch.fill.fill_color.as_deref(), Some("red"));
        assert_eq!(patch.image.fit, Some(ImageFit::Contain));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_elliptical_shape_hint() {
        let mut fill = FillStyle::default();
        assert!(!fill.is_elliptical());
        fill.shape_type = Some("Circle".into());
        assert!(fill.is_elliptical());
        fill.shape_type = Some("arrow".into());
        assert!(!fill.is_elliptical());
    }

    #[test]
    fn test_hidden_and_opacity() {
        let layer = Layer::new("a", LayerKind::Shape);
        assert!(!layer.is_hidden());
        assert_eq!(layer.effective_opacity(), 1.0);
        assert!(layer.clone().with_opacity(0.0).is_hidden());
        assert_eq!(layer.with_opacity(3.0).effective_opacity(), 1.0);
    }
}
