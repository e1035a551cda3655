use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rustocr::{ModelManager, Ocr, OcrResult, OptionsBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rustocr")]
#[command(about = "Scene-text OCR CLI - detect and recognize text in an image", long_about = None)]
struct Args {
    /// Input image file (PNG, JPG, BMP, etc.)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (default: <input>.txt or <input>.json)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Path to the model manifest (schema version 1)
    #[arg(long, default_value = "models/manifest.json")]
    manifest: PathBuf,

    /// Detector model name, as listed in the manifest
    #[arg(long, default_value = "craft")]
    detector: String,

    /// Recognizer model name, as listed in the manifest
    #[arg(long, default_value = "crnn-en")]
    recognizer: String,

    /// Base URL model/charset files are downloaded from, joined with
    /// each manifest entry's relative path
    #[arg(long)]
    base_url: Option<String>,

    /// Restrict recognition to these language codes
    #[arg(long = "lang", value_delimiter = ',')]
    lang_list: Vec<String>,

    /// Merge adjacent crops on the same line into one result
    #[arg(long)]
    merge_lines: bool,

    /// Verbose logging (equivalent to RUST_LOG=rustocr=debug)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Plain text output, one line per result
    Text,
    /// JSON output with per-result boxes and confidences
    Json,
}

#[derive(Serialize)]
struct JsonOutput {
    success: bool,
    results: Vec<ResultOutput>,
}

#[derive(Serialize)]
struct ResultOutput {
    text: String,
    confidence: f32,
    box_points: Vec<[f64; 2]>,
}

fn get_default_output(input: &PathBuf, format: &OutputFormat) -> PathBuf {
    let ext = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
    };
    let mut output = input.clone();
    output.set_extension(ext);
    output
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "rustocr=debug" } else { "rustocr=info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", args.input);
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| get_default_output(&args.input, &args.format));

    tracing::info!(manifest = ?args.manifest, "loading model manifest");
    let manifest_json = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("failed to read manifest at {:?}", args.manifest))?;

    let mut builder = Ocr::builder()
        .detector_model(&args.detector)
        .recognizer_model(&args.recognizer);
    if let Some(base_url) = args.base_url.clone() {
        builder = builder.model_manager(ModelManager::new().with_base_url(base_url));
    }
    let ocr = builder
        .build(&manifest_json)
        .await
        .context("failed to build OCR engine")?;

    let options = OptionsBuilder::new()
        .lang_list(args.lang_list)
        .merge_lines(args.merge_lines)
        .build();

    tracing::info!(input = ?args.input, "running OCR pipeline");
    let results = ocr
        .recognize_path(&args.input, &options)
        .context("OCR pipeline failed")?;

    match args.format {
        OutputFormat::Text => write_text_output(&output_path, &results)?,
        OutputFormat::Json => write_json_output(&output_path, &results)?,
    }

    println!("Output written to: {:?}", output_path);
    Ok(())
}

fn write_text_output(path: &PathBuf, results: &[OcrResult]) -> Result<()> {
    let mut file = File::create(path).context("failed to create output file")?;
    for result in results {
        writeln!(file, "{}", result.text)?;
    }
    Ok(())
}

fn write_json_output(path: &PathBuf, results: &[OcrResult]) -> Result<()> {
    let output = JsonOutput {
        success: true,
        results: results
            .iter()
            .map(|r| ResultOutput {
                text: r.text.clone(),
                confidence: r.confidence,
                box_points: r.quad.points.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect(),
    };
    let json_str = serde_json::to_string_pretty(&output).context("failed to serialize JSON")?;
    let mut file = File::create(path).context("failed to create output file")?;
    file.write_all(json_str.as_bytes())?;
    Ok(())
}
