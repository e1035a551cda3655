//! rustocr - scene-text detection and recognition using ONNX models
//!
//! This library detects text regions in an image with a CRAFT-style
//! detector, crops and rectifies each region, and transcribes it with a
//! CRNN-style recognizer decoded by greedy CTC. Detector and recognizer
//! are both pluggable ONNX graphs, selected by name from a JSON model
//! manifest and cached locally by [`ModelManager`].
//!
//! # Quick Start
//!
//! ```ignore
//! use rustocr::{Ocr, Options};
//!
//! async fn run() -> rustocr::Result<()> {
//!     let manifest = std::fs::read_to_string("models/manifest.json")?;
//!     let ocr = Ocr::builder().build(&manifest).await?;
//!     let results = ocr.recognize_path("document.png", &Options::default())?;
//!     for r in results {
//!         println!("{} ({:.2})", r.text, r.confidence);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - Scene-text detection: heatmap thresholding, connected components,
//!   minimum-area rectangle extraction, horizontal/free classification
//! - Line grouping and optional post-recognition line merging
//! - Perspective-rectified and axis-aligned crop building
//! - Greedy CTC decoding with per-call allow/block/language charset
//!   filtering
//! - Structured tracing of every pipeline stage via an injectable
//!   [`TraceWriter`]
//! - Pluggable [`ImageDecoder`] and [`InferenceRunner`] so the core
//!   pipeline never depends on a concrete image or inference library

mod charset;
mod crop_builder;
mod ctc;
mod detector;
mod error;
mod geom;
mod grouping;
mod image_ops;
mod model_manager;
mod options;
mod orchestrator;
mod recognizer;
mod runtime;
mod trace;

pub use charset::Charset;
pub use error::{OcrError, Result};
pub use geom::{Point, Quad};
pub use model_manager::{ModelEntry, ModelKind, ModelManager, ModelManifest};
pub use options::{
    CharsetFilter, MergeLinesOptions, Options, OptionsBuilder, RecognizerOptions,
    RecognizerOptionsOverrides,
};
pub use orchestrator::{Ocr, OcrBuilder, OcrResult};
pub use runtime::{DefaultImageDecoder, ImageDecoder, ImageSource, InferenceRunner, OrtInferenceRunner};
pub use trace::{steps, JsonLinesTraceWriter, TraceStep, TraceWriter};

use std::path::Path;

/// Runs the full pipeline against a single image file, downloading and
/// caching the models named in `manifest_json` on first use.
///
/// This is a thin convenience wrapper over [`Ocr::builder`] for callers
/// that don't need to reuse a built [`Ocr`] across several images.
///
/// # Example
///
/// ```ignore
/// use rustocr::recognize_image;
///
/// async fn run() -> rustocr::Result<()> {
///     let manifest = std::fs::read_to_string("models/manifest.json")?;
///     let results = recognize_image("document.png", &manifest).await?;
///     for r in results {
///         println!("{}", r.text);
///     }
///     Ok(())
/// }
/// ```
pub async fn recognize_image(
    image_path: impl AsRef<Path>,
    manifest_json: &str,
) -> Result<Vec<OcrResult>> {
    let ocr = Ocr::builder().build(manifest_json).await?;
    ocr.recognize_path(image_path, &Options::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_reachable_from_the_crate_root() {
        let opts = Options::default();
        assert_eq!(opts.align, 32);
    }
}
