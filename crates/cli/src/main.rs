use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use facelock_core::{FaceLock, FaceLockConfig, FaceLockOutcome, Input};

/// Restore the real face from an original photo onto a generated image.
#[derive(Parser)]
#[command(name = "facelock")]
struct Cli {
    /// Original photo containing the face to keep.
    original: PathBuf,

    /// Generated image whose face is replaced.
    generated: PathBuf,

    /// Output file (required unless --detect is used).
    output: Option<PathBuf>,

    /// Face detector ONNX model (defaults to the cache and ./models lookup).
    #[arg(long)]
    model: Option<PathBuf>,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f32>,

    /// Fraction of the face box added on each side (0.0-1.0).
    #[arg(long)]
    padding: Option<f64>,

    /// Width of the soft edge around the pasted face, in pixels.
    #[arg(long)]
    feather: Option<u32>,

    /// Only print the face box found in each input.
    #[arg(long)]
    detect: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let face_lock = FaceLock::from_config(config);

    let original = fs::read(&cli.original)?;
    let generated = fs::read(&cli.generated)?;

    if cli.detect {
        print_box(&face_lock, Input::Original, &cli.original, &original);
        print_box(&face_lock, Input::Generated, &cli.generated, &generated);
        return Ok(());
    }

    let Some(output) = cli.output.as_deref() else {
        return Err("Output file is required unless --detect is used".into());
    };
    let report = face_lock.run(&original, &generated);
    match report.outcome {
        FaceLockOutcome::Composited {
            original_box,
            generated_box,
        } => println!(
            "Face locked: original {}x{} at ({}, {}) -> generated {}x{} at ({}, {})",
            original_box.width,
            original_box.height,
            original_box.x,
            original_box.y,
            generated_box.width,
            generated_box.height,
            generated_box.x,
            generated_box.y,
        ),
        FaceLockOutcome::Passthrough(reason) => {
            println!("Face lock skipped ({reason:?}); writing generated image unchanged")
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &report.bytes)?;
    log::info!("Wrote {} bytes to {}", report.bytes.len(), output.display());
    Ok(())
}

fn build_config(cli: &Cli) -> Result<FaceLockConfig, Box<dyn std::error::Error>> {
    let mut config = match cli.config {
        Some(ref path) => FaceLockConfig::from_json_file(path)?,
        None => FaceLockConfig::default(),
    }
    .with_env_overrides();

    if let Some(ref model) = cli.model {
        config.model_path = Some(model.clone());
    }
    if let Some(confidence) = cli.confidence {
        config.confidence_floor = confidence;
    }
    if let Some(padding) = cli.padding {
        config.face_padding = padding;
    }
    if let Some(feather) = cli.feather {
        config.feather_px = feather;
    }
    Ok(config)
}

fn print_box(face_lock: &FaceLock, input: Input, path: &Path, bytes: &[u8]) {
    let label = match input {
        Input::Original => "original",
        Input::Generated => "generated",
    };
    match face_lock.locate(bytes, input) {
        Ok(Some(b)) => println!(
            "{label} {}: {}x{} at ({}, {})",
            path.display(),
            b.width,
            b.height,
            b.x,
            b.y
        ),
        Ok(None) => println!("{label} {}: no face", path.display()),
        Err(e) => println!("{label} {}: {e}", path.display()),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in [&cli.original, &cli.generated] {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if !cli.detect && cli.output.is_none() {
        return Err("Output file is required unless --detect is used".into());
    }
    if let Some(ref model) = cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(
                format!("Confidence must be between 0.0 and 1.0, got {confidence}").into(),
            );
        }
    }
    if let Some(padding) = cli.padding {
        if !(0.0..=1.0).contains(&padding) {
            return Err(format!("Padding must be between 0.0 and 1.0, got {padding}").into());
        }
    }
    Ok(())
}
