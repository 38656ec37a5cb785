//! Thumbnail Studio - headless thumbnail composition and editing.
//!
//! This crate wires the editing engine into a command-line tool:
//! - template loading
//! - scripted edits through the interaction controller
//! - rendering and PNG export
//! - saving the edited template

pub mod config;
pub mod edits;

pub use config::StudioConfig;
pub use edits::EditOp;

use anyhow::{bail, Context, Result};
use editor::EditorSession;
use scene::{LayerId, Template};
use tracing::info;

/// Studio version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a render job produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub layers: usize,
    pub edits_applied: usize,
    pub png_bytes: usize,
}

/// Pick one template out of a file holding one or many.
pub fn load_template(config: &StudioConfig) -> Result<Template> {
    let json = std::fs::read_to_string(&config.template_path)
        .with_context(|| format!("reading {}", config.template_path.display()))?;
    let mut templates = Template::list_from_json(&json)?;
    if config.template_index >= templates.len() {
        bail!(
            "template index {} out of range ({} templates)",
            config.template_index,
            templates.len()
        );
    }
    Ok(templates.swap_remove(config.template_index))
}

/// Load, edit, render and write one thumbnail.
///
/// `select` is applied after the edit script so the exported image can
/// show a selection outline.
pub async fn run(config: &StudioConfig, select: Option<&LayerId>) -> Result<RunSummary> {
    let template = load_template(config)?;
    let name = template.metadata.name.clone();
    let renderer = config.renderer()?;
    let mut session = EditorSession::from_template(template, renderer);

    let edits_applied = match &config.edits_path {
        Some(path) => {
            let edits = edits::load_edits(path)
                .with_context(|| format!("loading edits from {}", path.display()))?;
            edits::apply_all(session.controller_mut(), &edits)
        }
        None => 0,
    };

    if let Some(id) = select {
        if !session.controller_mut().select(id) && session.controller().selected() != Some(id) {
            bail!("no layer with id {}", id);
        }
    }

    let png = session.export().await?;
    tokio::fs::write(&config.output_path, &png)
        .await
        .with_context(|| format!("writing {}", config.output_path.display()))?;
    info!(path = %config.output_path.display(), bytes = png.len(), "thumbnail written");

    if let Some(path) = &config.save_path {
        tokio::fs::write(path, session.template().to_json()?)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "template saved");
    }

    let composition = session.controller().composition();
    Ok(RunSummary {
        name,
        width: composition.canvas_width,
        height: composition.canvas_height,
        layers: composition.len(),
        edits_applied,
        png_bytes: png.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = r##"{
        "id": "tmpl_001",
        "name": "Bold Statement",
        "canvas_width": 320,
        "canvas_height": 180,
        "tags": ["bold"],
        "layers": [
            {"id": "bg", "type": "background", "x": 160, "y": 90, "width": 320, "height": 180,
             "fill_color": "#FFFFFF", "z_index": 0},
            {"id": "box", "type": "shape", "x": 80, "y": 90, "width": 40, "height": 40,
             "fill_color": "#FF0000", "z_index": 1}
        ]
    }"##;

    fn setup(dir: &TempDir) -> StudioConfig {
        let template = dir.path().join("template.json");
        fs::write(&template, TEMPLATE).unwrap();
        StudioConfig::new()
            .with_template(template)
            .with_output(dir.path().join("out.png"))
    }

    fn pixel(path: &std::path::Path, x: u32, y: u32) -> [u8; 4] {
        let bytes = fs::read(path).unwrap();
        image::load_from_memory(&bytes).unwrap().to_rgba8().get_pixel(x, y).0
    }

    #[tokio::test]
    async fn test_run_writes_png() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);

        let summary = run(&config, None).await.unwrap();
        assert_eq!(summary.name, "Bold Statement");
        assert_eq!((summary.width, summary.height), (320, 180));
        assert_eq!(summary.layers, 2);
        assert_eq!(pixel(&config.output_path, 80, 90), [255, 0, 0, 255]);
        assert_eq!(pixel(&config.output_path, 200, 90), [255, 255, 255, 255]);
    }

    #[tokio::test]
    async fn test_run_with_edits_and_save() {
        let dir = TempDir::new().unwrap();
        let edits = dir.path().join("edits.json");
        fs::write(
            &edits,
            r#"[
                {"op": "pointer_down", "x": 80, "y": 90},
                {"op": "pointer_move", "x": 200, "y": 90},
                {"op": "pointer_up"},
                {"op": "delete", "id": "bg"}
            ]"#,
        )
        .unwrap();
        let saved = dir.path().join("saved.json");
        let config = setup(&dir).with_edits(&edits).with_save_path(&saved);

        let summary = run(&config, None).await.unwrap();
        assert_eq!(summary.edits_applied, 2);
        assert_eq!(summary.layers, 2);
        assert_eq!(pixel(&config.output_path, 200, 90), [255, 0, 0, 255]);
        assert_eq!(pixel(&config.output_path, 80, 90), [255, 255, 255, 255]);

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(saved["id"], "tmpl_001");
        assert_eq!(saved["tags"][0], "bold");
        assert_eq!(saved["layers"][1]["x"], 200.0);
    }

    #[tokio::test]
    async fn test_run_with_selection() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        run(&config, Some(&LayerId::new("box"))).await.unwrap();
        // Dashed outline starts at the top-left corner of the inflated box.
        assert_ne!(pixel(&config.output_path, 55, 65), [255, 255, 255, 255]);

        assert!(run(&config, Some(&LayerId::new("missing"))).await.is_err());
    }

    #[test]
    fn test_template_index_out_of_range() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir).with_template_index(3);
        assert!(load_template(&config).is_err());
    }

    #[test]
    fn test_load_from_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all.json");
        fs::write(&path, format!("[{}, {}]", TEMPLATE, TEMPLATE.replace("Bold Statement", "Second"))).unwrap();
        let config = StudioConfig::new().with_template(path).with_template_index(1);
        assert_eq!(load_template(&config).unwrap().metadata.name, "Second");
    }
}
