//! Color representation and CSS color-string parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with 8-bit, non-premultiplied components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse any supported CSS color string: hex, `rgb()`/`rgba()` or a name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::from_hex(value);
        }

        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::from_rgb_function(args);
        }

        Self::from_name(&lower)
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex
            .strip_prefix('#')
            .unwrap_or(hex)
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()?;

        let channels: Vec<u8> = match digits.len() {
            // Short forms repeat each nibble: `f` -> `ff`.
            3 | 4 => digits.iter().map(|&d| d << 4 | d).collect(),
            6 | 8 => digits.chunks(2).map(|p| p[0] << 4 | p[1]).collect(),
            _ => return None,
        };
        let alpha = channels.get(3).copied().unwrap_or(255);
        Some(Self::rgba(channels[0], channels[1], channels[2], alpha))
    }

    /// Parse the argument list of `rgb(...)` / `rgba(...)`.
    fn from_rgb_function(args: &str) -> Option<Self> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }

        let channel = |s: &str| -> Option<u8> {
            let v: f32 = s.parse().ok()?;
            Some(v.round().clamp(0.0, 255.0) as u8)
        };

        let r = channel(parts[0])?;
        let g = channel(parts[1])?;
        let b = channel(parts[2])?;
        let a = match parts.get(3) {
            Some(s) => {
                let v: f32 = s.parse().ok()?;
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };

        Some(Self::rgba(r, g, b, a))
    }

    /// Look up a CSS named color, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name == "transparent" {
            return Some(Self::TRANSPARENT);
        }
        NAMED_COLORS
            .binary_search_by(|(n, _)| n.cmp(&name.as_str()))
            .ok()
            .map(|i| {
                let [r, g, b] = NAMED_COLORS[i].1;
                Self::rgb(r, g, b)
            })
    }

    /// Scale the alpha channel by `factor` (clamped to 0.0 - 1.0).
    #[inline]
    pub fn with_alpha_scaled(&self, factor: f32) -> Color {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Color::rgba(self.r, self.g, self.b, a)
    }

    /// Source-over compositing onto `background`.
    pub fn blend_over(&self, background: Color) -> Color {
        match self.a {
            255 => return *self,
            0 => return background,
            _ => {}
        }

        let src = self.a as f32 / 255.0;
        let dst = background.a as f32 / 255.0 * (1.0 - src);
        let alpha = src + dst;
        let mix = |s: u8, d: u8| ((s as f32 * src + d as f32 * dst) / alpha).round().clamp(0.0, 255.0) as u8;

        Color {
            r: mix(self.r, background.r),
            g: mix(self.g, background.g),
            b: mix(self.b, background.b),
            a: (alpha * 255.0).round() as u8,
        }
    }
}

/// CSS named colors, sorted by name.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aqua", [0, 255, 255]),
    ("black", [0, 0, 0]),
    ("blue", [0, 0, 255]),
    ("brown", [165, 42, 42]),
    ("coral", [255, 127, 80]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkred", [139, 0, 0]),
    ("deeppink", [255, 20, 147]),
    ("fuchsia", [255, 0, 255]),
    ("gold", [255, 215, 0]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("grey", [128, 128, 128]),
    ("hotpink", [255, 105, 180]),
    ("indigo", [75, 0, 130]),
    ("lightblue", [173, 216, 230]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lime", [0, 255, 0]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("orange", [255, 165, 0]),
    ("orangered", [255, 69, 0]),
    ("pink", [255, 192, 203]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("teal", [0, 128, 128]),
    ("tomato", [255, 99, 71]),
    ("violet", [238, 130, 238]),
    ("white", [255, 255, 255]),
    ("yellow", [255, 255, 0]),
];

/// Formats as lowercase hex, with alpha only when not opaque.
impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(Color::from_hex("#1A1A2E"), Some(Color::rgb(0x1a, 0x1a, 0x2e)));
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("e94560"), Some(Color::rgb(0xe9, 0x45, 0x60)));
        assert_eq!(Color::from_hex("#0008"), Some(Color::rgba(0, 0, 0, 0x88)));
        assert_eq!(Color::from_hex("#00000080"), Some(Color::rgba(0, 0, 0, 128)));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#ggg"), None);
        assert_eq!(Color::from_hex("#ÿÿÿ"), None);
    }

    #[test]
    fn test_named_colors() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(Color::from_name("Gold"), Some(Color::rgb(255, 215, 0)));
        assert_eq!(Color::from_name("red"), Some(Color::RED));
        assert_eq!(Color::from_name("reddish"), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", Color::rgb(0x3b, 0x82, 0xf6)), "#3b82f6");
        assert_eq!(Color::rgba(0, 0, 0, 128).to_string(), "#00000080");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Color::parse("#3B82F6"), Some(Color::rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(Color::parse("rgb(10, 20, 30)"), Some(Color::rgb(10, 20, 30)));
        assert_eq!(Color::parse("rgba(0,0,0,0.5)"), Some(Color::rgba(0, 0, 0, 128)));
        assert_eq!(Color::parse("Transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse("not-a-color"), None);
        assert_eq!(Color::parse("rgb(1,2)"), None);
    }

    #[test]
    fn test_blend_over() {
        assert_eq!(Color::RED.blend_over(Color::WHITE), Color::RED);
        assert_eq!(Color::TRANSPARENT.blend_over(Color::WHITE), Color::WHITE);

        let half_black = Color::rgba(0, 0, 0, 128);
        let out = half_black.blend_over(Color::WHITE);
        assert_eq!(out.a, 255);
        assert!(out.r > 120 && out.r < 135);
    }

    #[test]
    fn test_alpha_scaling() {
        assert_eq!(Color::WHITE.with_alpha_scaled(0.0).a, 0);
        assert_eq!(Color::WHITE.with_alpha_scaled(0.5).a, 128);
        assert_eq!(Color::rgba(1, 2, 3, 200).with_alpha_scaled(2.0).a, 200);
    }
}
