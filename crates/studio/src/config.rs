//! Studio configuration.

use common::error::{StudioError, StudioResult};
use render::{FontCache, ImageCache, RenderConfig, Renderer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A font file registered under a family name.
#[derive(Clone, Debug, PartialEq)]
pub struct FontFile {
    pub family: String,
    pub weight: String,
    pub path: PathBuf,
}

/// Configuration for one render job.
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Template JSON to load.
    pub template_path: PathBuf,
    /// Which template to use when the file holds an array.
    pub template_index: usize,
    /// Edit script applied before rendering.
    pub edits_path: Option<PathBuf>,
    /// Where the PNG is written.
    pub output_path: PathBuf,
    /// Where the edited template is written, if anywhere.
    pub save_path: Option<PathBuf>,
    /// Extra font files.
    pub fonts: Vec<FontFile>,
    /// Font used for families nothing else resolves, replacing the system
    /// sans-serif.
    pub default_font: Option<PathBuf>,
    /// Image files registered under a source key.
    pub images: Vec<(String, PathBuf)>,
    /// Image cache budget in bytes.
    pub image_cache_size: usize,
    /// Whether to log at debug level.
    pub verbose: bool,
    /// Renderer defaults.
    pub render: RenderConfig,
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    pub fn with_template_index(mut self, index: usize) -> Self {
        self.template_index = index;
        self
    }

    pub fn with_edits(mut self, path: impl Into<PathBuf>) -> Self {
        self.edits_path = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn with_font(mut self, family: &str, weight: &str, path: impl Into<PathBuf>) -> Self {
        self.fonts.push(FontFile {
            family: family.to_string(),
            weight: weight.to_string(),
            path: path.into(),
        });
        self
    }

    pub fn with_default_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_font = Some(path.into());
        self
    }

    pub fn with_image(mut self, key: &str, path: impl Into<PathBuf>) -> Self {
        self.images.push((key.to_string(), path.into()));
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Build a renderer with the configured fonts and images registered.
    ///
    /// Unreadable font files are skipped with a warning; an unusable default
    /// font or an unreadable image file is an error.
    pub fn renderer(&self) -> StudioResult<Renderer> {
        let mut fonts = FontCache::new();
        if let Some(path) = &self.default_font {
            let data = std::fs::read(path)?;
            if !fonts.set_default_font(&data) {
                return Err(StudioError::internal(format!(
                    "{} is not a usable font",
                    path.display()
                )));
            }
            info!(path = %path.display(), "registered default font");
        }

        for font in &self.fonts {
            if fonts.add_font_file(&font.family, &font.weight, &font.path) {
                info!(family = %font.family, path = %font.path.display(), "registered font");
            } else {
                warn!(family = %font.family, path = %font.path.display(), "font not registered");
            }
        }

        let images = ImageCache::new(self.image_cache_size);
        for (key, path) in &self.images {
            images.insert_file(key.as_str(), path)?;
            info!(key = %key, path = %path.display(), "registered image");
        }

        Ok(Renderer::with_caches(
            self.render.clone(),
            Arc::new(fonts),
            Arc::new(images),
        ))
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("template.json"),
            template_index: 0,
            edits_path: None,
            output_path: PathBuf::from("thumbnail.png"),
            save_path: None,
            fonts: Vec::new(),
            default_font: None,
            images: Vec::new(),
            image_cache_size: 100 * 1024 * 1024, // 100MB
            verbose: false,
            render: RenderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StudioConfig::default();
        assert_eq!(config.output_path, PathBuf::from("thumbnail.png"));
        assert_eq!(config.template_index, 0);
        assert!(config.fonts.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn test_config_builder() {
        let config = StudioConfig::new()
            .with_template("in.json")
            .with_output("out.png")
            .with_font("Impact", "bold", "/tmp/impact.ttf")
            .with_verbose(true);

        assert_eq!(config.template_path, PathBuf::from("in.json"));
        assert_eq!(config.fonts[0].family, "Impact");
        assert!(config.verbose);
    }

    #[test]
    fn test_missing_image_file_is_an_error() {
        let config = StudioConfig::new().with_image("hero", "/nonexistent/hero.png");
        assert!(config.renderer().is_err());
    }

    #[test]
    fn test_missing_font_file_is_skipped() {
        let config = StudioConfig::new().with_font("Impact", "normal", "/nonexistent/impact.ttf");
        assert!(config.renderer().is_ok());
    }

    #[test]
    fn test_default_font() {
        let bundled = concat!(env!("CARGO_MANIFEST_DIR"), "/../render/tests/fonts/DejaVuSans.ttf");
        let renderer = StudioConfig::new().with_default_font(bundled).renderer().unwrap();
        assert!(renderer.fonts().has_default());
        assert!(renderer.fonts().get_font("Some Unknown Display Face", "normal").is_some());

        let dir = tempfile::tempdir().unwrap();
        let not_a_font = dir.path().join("notes.txt");
        std::fs::write(&not_a_font, "hello").unwrap();
        assert!(StudioConfig::new().with_default_font(&not_a_font).renderer().is_err());
        assert!(StudioConfig::new().with_default_font("/nonexistent/font.ttf").renderer().is_err());
    }
}
