use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facegate::{
    config, encoding, Authenticator, Comparator, DetectorTuning, EncodeOutcome, FaceEncoder,
    FaceLocalizer, FaceRegion, SeetaLocalizer,
};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::info;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "facegate")]
#[command(
    version,
    about = "Face authentication engine - encode, compare and match face images"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode the most prominent face in an image
    Encode {
        /// Image to encode
        image: PathBuf,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        models: ModelArgs,
    },
    /// Compare two stored encodings
    Compare {
        /// JSON file holding the known encoding
        known: PathBuf,
        /// JSON file holding the probe encoding
        probe: PathBuf,
        /// Score with the learned-embedding metric and thresholds
        #[arg(long)]
        native: bool,
    },
    /// Match a probe image against a stored face set
    Authenticate {
        /// Probe image
        image: PathBuf,
        /// JSON file holding the stored faces
        known: PathBuf,
        #[command(flatten)]
        models: ModelArgs,
    },
    /// Report face regions in an image
    Detect {
        /// Image to scan
        image: PathBuf,
        /// Write a copy of the image with regions outlined
        #[arg(long)]
        boxed: Option<PathBuf>,
        /// Vote floor for the inspection sweep
        #[arg(long, default_value_t = 2)]
        min_neighbors: u32,
        #[command(flatten)]
        models: ModelArgs,
    },
    /// Open config file in editor
    Config,
}

#[derive(Args)]
struct ModelArgs {
    /// Cascade model for the fallback detector
    #[arg(long)]
    detector_model: Option<PathBuf>,
    /// Landmark predictor model for the learned embedder
    #[cfg(feature = "dlib")]
    #[arg(long)]
    landmark_model: Option<PathBuf>,
    /// Encoder network model for the learned embedder
    #[cfg(feature = "dlib")]
    #[arg(long)]
    encoder_model: Option<PathBuf>,
}

#[derive(Serialize)]
struct EncodeReport {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<facegate::Encoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct FaceBox {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Serialize)]
struct DetectReport {
    success: bool,
    count: usize,
    faces: Vec<FaceBox>,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Encode {
            image,
            output,
            models,
        } => encode(&cfg, &image, output.as_deref(), &models),
        Commands::Compare {
            known,
            probe,
            native,
        } => compare(&cfg, &known, &probe, native),
        Commands::Authenticate {
            image,
            known,
            models,
        } => authenticate(&cfg, &image, &known, &models),
        Commands::Detect {
            image,
            boxed,
            min_neighbors,
            models,
        } => detect(&cfg, &image, boxed.as_deref(), min_neighbors, &models),
        Commands::Config => open_config(),
    }
}

/// Build the best encoder the installation supports: the learned embedder
/// when its models are in reach, the classical fallback otherwise.
fn build_encoder(cfg: &config::Config, models: &ModelArgs) -> Result<FaceEncoder> {
    #[cfg(feature = "dlib")]
    {
        match dlib_backend(cfg, models) {
            Ok(backend) => return Ok(FaceEncoder::with_backend(backend)),
            Err(e) => log::warn!("learned embedder unavailable, using fallback: {:#}", e),
        }
    }

    let model = config::detector_model(models.detector_model.as_deref(), cfg)?;
    let localizer = SeetaLocalizer::open(&model)
        .with_context(|| format!("opening detector model {}", model.display()))?;
    Ok(FaceEncoder::with_localizer(
        Box::new(localizer),
        cfg.detector.tuning(),
    ))
}

#[cfg(feature = "dlib")]
fn dlib_backend(
    cfg: &config::Config,
    models: &ModelArgs,
) -> Result<Box<dyn facegate::EmbeddingBackend>> {
    let landmarks = config::landmark_model(models.landmark_model.as_deref(), cfg)?;
    let encoder = config::encoder_model(models.encoder_model.as_deref(), cfg)?;
    let backend = facegate::DlibEmbedder::open(&landmarks, &encoder)?;
    Ok(Box::new(backend))
}

fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(img.to_rgb8())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn encode(
    cfg: &config::Config,
    image: &Path,
    output: Option<&Path>,
    models: &ModelArgs,
) -> Result<()> {
    let img = load_image(image)?;
    let mut encoder = build_encoder(cfg, models)?;

    let report = match encoder.encode(&img) {
        EncodeOutcome::Encoded(encoding) => {
            info!("encoded {} into {} values", image.display(), encoding.len());
            EncodeReport {
                success: true,
                encoding: Some(encoding),
                error: None,
            }
        }
        EncodeOutcome::NoFace => EncodeReport {
            success: false,
            encoding: None,
            error: Some("No face detected in image".to_string()),
        },
    };

    match output {
        Some(path) => {
            fs::write(path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote encoding report to {}", path.display());
            Ok(())
        }
        None => print_json(&report),
    }
}

fn compare(cfg: &config::Config, known_path: &Path, probe_path: &Path, native: bool) -> Result<()> {
    let known = encoding::read_encoding(known_path)?;
    let probe = encoding::read_encoding(probe_path)?;

    let threshold = if native {
        cfg.match_threshold
    } else {
        cfg.fallback_threshold
    };
    let comparator = Comparator::new(native, cfg.tolerance, threshold);
    print_json(&comparator.compare(&known, &probe))
}

fn authenticate(
    cfg: &config::Config,
    image: &Path,
    known: &Path,
    models: &ModelArgs,
) -> Result<()> {
    let img = load_image(image)?;
    let known_faces = encoding::read_known_faces(known)?;
    info!("matching probe against {} stored face(s)", known_faces.len());

    let mut authenticator = Authenticator::new(cfg, build_encoder(cfg, models)?);
    print_json(&authenticator.authenticate(&img, &known_faces))
}

fn detect(
    cfg: &config::Config,
    image: &Path,
    boxed: Option<&Path>,
    min_neighbors: u32,
    models: &ModelArgs,
) -> Result<()> {
    let img = load_image(image)?;
    let gray = image::imageops::grayscale(&img);

    let model = config::detector_model(models.detector_model.as_deref(), cfg)?;
    let mut localizer = SeetaLocalizer::open(&model)
        .with_context(|| format!("opening detector model {}", model.display()))?;

    // Inspection sweep: low vote floor, no upper size cap.
    let tuning = DetectorTuning {
        min_neighbors,
        max_size: None,
        ..cfg.detector.tuning()
    };
    let regions = localizer.locate(&gray, &tuning)?;
    info!("found {} face(s) in {}", regions.len(), image.display());

    if let Some(boxed) = boxed {
        save_annotated(&img, &regions, boxed)?;
        info!("wrote annotated copy to {}", boxed.display());
    }

    let report = DetectReport {
        success: true,
        count: regions.len(),
        faces: regions
            .iter()
            .map(|r| FaceBox {
                x: r.x,
                y: r.y,
                w: r.width,
                h: r.height,
            })
            .collect(),
    };
    print_json(&report)
}

fn save_annotated(img: &RgbImage, regions: &[FaceRegion], output: &Path) -> Result<()> {
    let mut annotated = img.clone();
    for region in regions {
        let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
        draw_hollow_rect_mut(&mut annotated, rect, Rgb([255, 0, 0]));
    }
    annotated
        .save(output)
        .with_context(|| format!("writing {}", output.display()))
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
