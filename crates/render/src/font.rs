//! Font handling and text rasterization.

use fontdue::{Font, FontSettings};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rasterized glyph bitmap.
pub struct GlyphBitmap {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Left side bearing.
    pub xmin: i32,
    /// Bottom of glyph relative to baseline, y up.
    pub ymin: i32,
    /// Grayscale coverage, row-major, top row first.
    pub data: Vec<u8>,
}

/// Vertical font metrics at a given size, y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    /// Negative for fonts descending below the baseline.
    pub descent: f32,
}

/// A glyph placed on a single line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    /// Pen position relative to the start of the line.
    pub x: f32,
}

/// Single-line layout result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    pub glyphs: Vec<PlacedGlyph>,
    pub width: f32,
}

/// A loaded font with rasterization support.
pub struct LoadedFont {
    font: Font,
    /// Glyph cache keyed by character and size in tenths of a pixel.
    glyph_cache: RwLock<HashMap<(char, u32), Arc<GlyphBitmap>>>,
}

impl LoadedFont {
    pub fn new(data: &[u8]) -> Option<Self> {
        let font = Font::from_bytes(data, FontSettings::default()).ok()?;

        Some(Self {
            font,
            glyph_cache: RwLock::new(HashMap::new()),
        })
    }

    fn quantize(size: f32) -> u32 {
        (size * 10.0).round().max(1.0) as u32
    }

    /// Rasterize a glyph at a given size.
    pub fn rasterize(&self, ch: char, size: f32) -> Arc<GlyphBitmap> {
        let size_key = Self::quantize(size);
        let cache_key = (ch, size_key);

        {
            let cache = self.glyph_cache.read();
            if let Some(bitmap) = cache.get(&cache_key) {
                return bitmap.clone();
            }
        }

        let (metrics, data) = self.font.rasterize(ch, size_key as f32 / 10.0);
        let bitmap = Arc::new(GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            data,
        });

        self.glyph_cache.write().insert(cache_key, bitmap.clone());
        bitmap
    }

    pub fn line_metrics(&self, size: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(size) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
            },
            None => LineMetrics {
                ascent: size * 0.8,
                descent: -size * 0.2,
            },
        }
    }

    /// Lay out `text` on one line with kerning applied.
    pub fn layout(&self, text: &str, size: f32) -> TextRun {
        let size = Self::quantize(size) as f32 / 10.0;
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0;
        let mut prev: Option<char> = None;

        for ch in text.chars() {
            if let Some(p) = prev {
                pen += self.font.horizontal_kern(p, ch, size).unwrap_or(0.0);
            }
            glyphs.push(PlacedGlyph { ch, x: pen });
            pen += self.font.metrics(ch, size).advance_width;
            prev = Some(ch);
        }

        TextRun { glyphs, width: pen }
    }
}

/// Font lookup key: lowercase family name plus boldness.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
}

impl FontKey {
    pub fn new(family: &str, weight: &str) -> Self {
        Self {
            family: family.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase(),
            bold: is_bold(weight),
        }
    }
}

/// CSS weights `bold`, `bolder` and numeric 600+ select a bold face.
pub fn is_bold(weight: &str) -> bool {
    let weight = weight.trim().to_ascii_lowercase();
    match weight.as_str() {
        "bold" | "bolder" => true,
        other => other.parse::<u32>().map_or(false, |w| w >= 600),
    }
}

/// Generic family a concrete family name falls back to.
fn generic_family(family: &str) -> &'static str {
    let serif = ["serif", "times", "georgia", "garamond", "cambria"];
    let mono = ["mono", "courier", "consolas", "menlo"];

    if mono.iter().any(|m| family.contains(m)) {
        "monospace"
    } else if serif.iter().any(|s| family.contains(s)) && !family.contains("sans") {
        "serif"
    } else {
        "sans-serif"
    }
}

/// Font cache for managing loaded fonts.
pub struct FontCache {
    /// Registered and resolved fonts.
    fonts: RwLock<HashMap<FontKey, Arc<LoadedFont>>>,
    /// Keys with no registered or system face; never probed again.
    misses: RwLock<HashSet<FontKey>>,
    /// Fallback for any family that cannot be resolved.
    default_font: Option<Arc<LoadedFont>>,
}

impl FontCache {
    /// Cache with a system default font, when one can be found.
    pub fn new() -> Self {
        let mut cache = Self::empty();
        cache.default_font = Self::load_first(&system_font_paths("sans-serif", false));
        if cache.default_font.is_none() {
            warn!("no system font found; text will not render until a font is registered");
        }
        cache
    }

    /// Cache with no fonts at all.
    pub fn empty() -> Self {
        Self {
            fonts: RwLock::new(HashMap::new()),
            misses: RwLock::new(HashSet::new()),
            default_font: None,
        }
    }

    fn load_first(paths: &[String]) -> Option<Arc<LoadedFont>> {
        paths.iter().find_map(|path| {
            let data = std::fs::read(path).ok()?;
            let font = LoadedFont::new(&data)?;
            debug!(path = %path, "loaded system font");
            Some(Arc::new(font))
        })
    }

    pub fn has_default(&self) -> bool {
        self.default_font.is_some()
    }

    /// Resolve a family and weight, falling back to the regular face of the
    /// family, then a system face of its generic family, then the default.
    pub fn get_font(&self, family: &str, weight: &str) -> Option<Arc<LoadedFont>> {
        let key = FontKey::new(family, weight);

        {
            let fonts = self.fonts.read();
            if let Some(font) = fonts.get(&key) {
                return Some(font.clone());
            }
            if key.bold {
                let regular = FontKey {
                    family: key.family.clone(),
                    bold: false,
                };
                if let Some(font) = fonts.get(&regular) {
                    return Some(font.clone());
                }
            }
        }

        if !self.misses.read().contains(&key) {
            if let Some(font) = Self::load_first(&system_font_paths(generic_family(&key.family), key.bold)) {
                self.fonts.write().insert(key, font.clone());
                return Some(font);
            }
            debug!(family = %key.family, bold = key.bold, "no system face; using default");
            self.misses.write().insert(key);
        }

        self.default_font.clone()
    }

    /// Register a font under a family name.
    pub fn add_font(&self, family: &str, weight: &str, data: &[u8]) -> bool {
        match LoadedFont::new(data) {
            Some(font) => {
                let key = FontKey::new(family, weight);
                // A regular face also serves the bold lookup of its family.
                self.misses.write().retain(|miss| miss.family != key.family);
                self.fonts.write().insert(key, Arc::new(font));
                true
            }
            None => false,
        }
    }

    /// Register a font file under a family name.
    pub fn add_font_file(&self, family: &str, weight: &str, path: impl AsRef<Path>) -> bool {
        match std::fs::read(path.as_ref()) {
            Ok(data) => self.add_font(family, weight, &data),
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "failed to read font file");
                false
            }
        }
    }

    /// Use the given font data as the fallback for unresolved families.
    pub fn set_default_font(&mut self, data: &[u8]) -> bool {
        match LoadedFont::new(data) {
            Some(font) => {
                self.default_font = Some(Arc::new(font));
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.read().len()
    }

    /// Number of lookups remembered as unresolvable.
    pub fn miss_count(&self) -> usize {
        self.misses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.read().is_empty()
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known system font locations for a generic family.
fn system_font_paths(family: &str, bold: bool) -> Vec<String> {
    let mut paths = Vec::new();
    let (dejavu, liberation) = match (family, bold) {
        ("serif", false) => ("DejaVuSerif", "LiberationSerif-Regular"),
        ("serif", true) => ("DejaVuSerif-Bold", "LiberationSerif-Bold"),
        ("monospace", false) => ("DejaVuSansMono", "LiberationMono-Regular"),
        ("monospace", true) => ("DejaVuSansMono-Bold", "LiberationMono-Bold"),
        (_, false) => ("DejaVuSans", "LiberationSans-Regular"),
        (_, true) => ("DejaVuSans-Bold", "LiberationSans-Bold"),
    };

    for dir in ["/usr/share/fonts/truetype/dejavu", "/usr/share/fonts/TTF", "/usr/share/fonts/dejavu"] {
        paths.push(format!("{}/{}.ttf", dir, dejavu));
    }
    paths.push(format!("/usr/share/fonts/truetype/liberation/{}.ttf", liberation));

    #[cfg(target_os = "macos")]
    {
        paths.push("/Library/Fonts/Arial.ttf".to_string());
        paths.push("/System/Library/Fonts/Supplemental/Arial.ttf".to_string());
    }

    #[cfg(target_os = "windows")]
    {
        paths.push(if bold { "C:\\Windows\\Fonts\\arialbd.ttf" } else { "C:\\Windows\\Fonts\\arial.ttf" }.to_string());
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bold() {
        assert!(is_bold("bold"));
        assert!(is_bold("700"));
        assert!(is_bold(" Bolder "));
        assert!(!is_bold("normal"));
        assert!(!is_bold("400"));
        assert!(!is_bold("heavy-ish"));
    }

    #[test]
    fn test_font_key_normalizes_family() {
        let key = FontKey::new("'Impact'", "bold");
        assert_eq!(key.family, "impact");
        assert!(key.bold);
    }

    #[test]
    fn test_generic_family() {
        assert_eq!(generic_family("arial"), "sans-serif");
        assert_eq!(generic_family("times new roman"), "serif");
        assert_eq!(generic_family("dejavu sans mono"), "monospace");
        assert_eq!(generic_family("noto sans serif"), "sans-serif");
    }

    #[test]
    fn test_empty_cache_rejects_garbage() {
        let cache = FontCache::empty();
        assert!(!cache.has_default());
        assert!(!cache.add_font("Broken", "normal", b"not a font"));
        assert!(cache.is_empty());
    }

    fn bundled_font() -> FontCache {
        let cache = FontCache::empty();
        assert!(cache.add_font_file("Arial", "normal", concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/DejaVuSans.ttf")));
        cache
    }

    #[test]
    fn test_layout_with_registered_font() {
        let cache = bundled_font();
        let font = cache.get_font("arial", "normal").unwrap();

        let run = font.layout("HELLO", 48.0);
        assert_eq!(run.glyphs.len(), 5);
        assert!(run.width > 48.0);
        assert!(run.glyphs.windows(2).all(|w| w[1].x > w[0].x));

        let metrics = font.line_metrics(48.0);
        assert!(metrics.ascent > 0.0);
        assert!(metrics.descent <= 0.0);

        let glyph = font.rasterize('H', 48.0);
        assert!(glyph.width > 0 && glyph.height > 0);
        assert_eq!(glyph.data.len(), glyph.width * glyph.height);
        assert!(Arc::ptr_eq(&glyph, &font.rasterize('H', 48.0)));
    }

    #[test]
    fn test_bold_falls_back_to_regular_face() {
        let cache = bundled_font();
        let regular = cache.get_font("Arial", "normal").unwrap();
        let bold = cache.get_font("Arial", "bold").unwrap();
        assert!(Arc::ptr_eq(&regular, &bold));
        assert_eq!(cache.miss_count(), 0);
    }

    #[test]
    fn test_default_font_fallback() {
        let data = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/DejaVuSans.ttf")).unwrap();
        let mut cache = FontCache::empty();
        assert!(!cache.set_default_font(b"garbage"));
        assert!(cache.set_default_font(&data));
        assert!(cache.has_default());
        assert!(cache.get_font("No Such Family Anywhere", "normal").is_some());
    }

    #[test]
    fn test_misses_are_remembered() {
        let cache = FontCache::empty();
        // No system face is registered under this key, whatever the host has.
        let key = FontKey::new("Cursive Nonexistent", "normal");
        cache.misses.write().insert(key.clone());
        assert!(cache.get_font("Cursive Nonexistent", "normal").is_none());
        assert_eq!(cache.miss_count(), 1);
        assert!(cache.is_empty());

        // Registering the family forgets its misses.
        assert!(cache.add_font_file(
            "Cursive Nonexistent",
            "normal",
            concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/DejaVuSans.ttf")
        ));
        assert_eq!(cache.miss_count(), 0);
        assert!(cache.get_font("Cursive Nonexistent", "normal").is_some());
    }

    #[test]
    fn test_lookup_without_system_face_is_cached() {
        let cache = FontCache::empty();
        let first = cache.get_font("Unavailable Family", "bold");
        let second = cache.get_font("Unavailable Family", "bold");
        assert_eq!(first.is_some(), second.is_some());
        // Either the system face was loaded once or the miss was recorded.
        assert_eq!(cache.len() + cache.miss_count(), 1);
    }
}
