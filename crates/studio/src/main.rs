//! Thumbnail Studio - render and edit thumbnail templates from the command line.

use anyhow::Result;
use clap::Parser;
use scene::LayerId;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use studio::StudioConfig;

/// Thumbnail Studio - render a thumbnail template to PNG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template JSON (a single template or an array)
    template: PathBuf,

    /// Index into a template array
    #[arg(long, default_value = "0")]
    index: usize,

    /// Output PNG path
    #[arg(short, long, default_value = "thumbnail.png")]
    output: PathBuf,

    /// Edit script to replay before rendering
    #[arg(long)]
    edits: Option<PathBuf>,

    /// Select a layer so its outline is drawn
    #[arg(long)]
    select: Option<String>,

    /// Write the edited template here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Register a font file, as FAMILY[:WEIGHT]=PATH (weight defaults to normal)
    #[arg(long = "font", value_parser = parse_font)]
    fonts: Vec<FontArg>,

    /// Font used for families nothing else resolves
    #[arg(long)]
    default_font: Option<PathBuf>,

    /// Register an image file under a source key, as KEY=PATH
    #[arg(long = "image", value_parser = parse_key_path)]
    images: Vec<(String, PathBuf)>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_key_path(s: &str) -> Result<(String, PathBuf), String> {
    let (key, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=PATH, got {}", s))?;
    if key.is_empty() || path.is_empty() {
        return Err(format!("expected KEY=PATH, got {}", s));
    }
    Ok((key.to_string(), PathBuf::from(path)))
}

/// A `--font` value.
#[derive(Clone, Debug, PartialEq)]
struct FontArg {
    family: String,
    weight: String,
    path: PathBuf,
}

fn parse_font(s: &str) -> Result<FontArg, String> {
    let (name, path) = parse_key_path(s)?;
    let (family, weight) = match name.rsplit_once(':') {
        Some((family, weight)) if !family.is_empty() && !weight.is_empty() => (family, weight),
        Some(_) => return Err(format!("expected FAMILY[:WEIGHT]=PATH, got {}", s)),
        None => (name.as_str(), "normal"),
    };
    Ok(FontArg {
        family: family.to_string(),
        weight: weight.to_string(),
        path,
    })
}

impl Args {
    fn into_config(self) -> StudioConfig {
        let mut config = StudioConfig::new()
            .with_template(self.template)
            .with_template_index(self.index)
            .with_output(self.output)
            .with_verbose(self.verbose);

        if let Some(edits) = self.edits {
            config = config.with_edits(edits);
        }
        if let Some(save) = self.save {
            config = config.with_save_path(save);
        }
        if let Some(path) = self.default_font {
            config = config.with_default_font(path);
        }
        for font in self.fonts {
            config = config.with_font(&font.family, &font.weight, font.path);
        }
        for (key, path) in self.images {
            config = config.with_image(&key, path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Thumbnail Studio v{}", studio::VERSION);

    let select = args.select.clone().map(LayerId::new);
    let config = args.into_config();
    info!("Rendering: {}", config.template_path.display());

    let summary = studio::run(&config, select.as_ref()).await?;
    info!(
        name = %summary.name,
        width = summary.width,
        height = summary.height,
        layers = summary.layers,
        edits = summary.edits_applied,
        bytes = summary.png_bytes,
        "done"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = Args::parse_from(["thumbnail-studio", "template.json"]);
        assert_eq!(args.template, PathBuf::from("template.json"));
        assert_eq!(args.output, PathBuf::from("thumbnail.png"));
        assert_eq!(args.index, 0);
        assert!(args.fonts.is_empty());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_fonts_and_images() {
        let args = Args::parse_from([
            "thumbnail-studio",
            "t.json",
            "--font",
            "Impact=/fonts/impact.ttf",
            "--font",
            "Bebas Neue:bold=/fonts/bebas-bold.ttf",
            "--default-font",
            "/fonts/fallback.ttf",
            "--image",
            "hero=hero.png",
        ]);
        assert_eq!(args.fonts.len(), 2);
        assert_eq!(
            args.fonts[1],
            FontArg {
                family: "Bebas Neue".to_string(),
                weight: "bold".to_string(),
                path: PathBuf::from("/fonts/bebas-bold.ttf"),
            }
        );

        let config = args.into_config();
        assert_eq!(config.fonts[0].family, "Impact");
        assert_eq!(config.fonts[0].weight, "normal");
        assert_eq!(config.fonts[1].weight, "bold");
        assert_eq!(config.default_font, Some(PathBuf::from("/fonts/fallback.ttf")));
        assert_eq!(config.images[0].0, "hero");
    }

    #[test]
    fn test_bad_key_path() {
        assert!(parse_key_path("no-separator").is_err());
        assert!(parse_key_path("=path").is_err());
        assert!(parse_font(":bold=/f.ttf").is_err());
        assert!(parse_font("Impact:=/f.ttf").is_err());
        assert_eq!(parse_font("Impact:700=/f.ttf").map(|f| f.weight), Ok("700".to_string()));
        assert!(Args::try_parse_from(["thumbnail-studio", "t.json", "--font", "x"]).is_err());
    }
}
