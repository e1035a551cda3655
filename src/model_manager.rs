//! Model Manager
//!
//! Downloads, caches, and checksum-verifies the ONNX models the pipeline
//! runs against, driven by a JSON model manifest (schema version 1,
//! spec §6). Models are cached under the user's home directory.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{OcrError, Result};

/// Which role a manifest entry's ONNX graph plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Detector,
    Recognizer,
}

/// One model listed in the manifest (spec §6 "model manifest").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub model_name: String,
    pub kind: ModelKind,
    /// ISO-ish language codes, or `"*"` for language-agnostic.
    pub languages: Vec<String>,
    /// Relative path, constrained under `models/onnx/`.
    pub onnx_file: String,
    /// Required when `kind == Recognizer`.
    pub charset_file: Option<String>,
    pub sha256: String,
    pub size: u64,
}

/// The manifest document: schema version plus available models.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    pub schema_version: u32,
    pub models: Vec<ModelEntry>,
}

impl ModelManifest {
    /// Parses and validates a manifest document. Rejects manifests with
    /// an unrecognized schema version or entries whose `onnx_file`
    /// escapes `models/onnx/`.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: ModelManifest = serde_json::from_str(contents)?;
        if manifest.schema_version != 1 {
            return Err(OcrError::UnsupportedConfig {
                reason: format!(
                    "unsupported model manifest schema version {}",
                    manifest.schema_version
                ),
            });
        }
        for entry in &manifest.models {
            if !entry.onnx_file.starts_with("models/onnx/") {
                return Err(OcrError::UnsupportedConfig {
                    reason: format!(
                        "model `{}` declares onnxFile `{}` outside models/onnx/",
                        entry.model_name, entry.onnx_file
                    ),
                });
            }
            if entry.kind == ModelKind::Recognizer && entry.charset_file.is_none() {
                return Err(OcrError::UnsupportedConfig {
                    reason: format!(
                        "recognizer `{}` is missing a charsetFile",
                        entry.model_name
                    ),
                });
            }
        }
        Ok(manifest)
    }

    pub fn find(&self, model_name: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.model_name == model_name)
    }
}

/// Downloads and caches model files named by a [`ModelManifest`], under
/// `~/.rustocr/models/`.
pub struct ModelManager {
    cache_dir: PathBuf,
    base_url: String,
}

impl ModelManager {
    /// Creates a manager rooted at `~/.rustocr/models/`. `base_url` has no
    /// useful default — it must name a host that actually serves the
    /// caller's manifest entries — so callers are expected to set it via
    /// [`Self::with_base_url`]; an unconfigured manager fails the first
    /// download with a clear error rather than silently hitting a
    /// placeholder host.
    pub fn new() -> Self {
        let home = dirs::home_dir().expect("failed to determine home directory");
        Self {
            cache_dir: home.join(".rustocr").join("models"),
            base_url: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ensures `entry`'s ONNX file is present and checksum-verified in
    /// the cache, downloading it if necessary, and returns its path.
    pub fn ensure_model(&self, entry: &ModelEntry) -> Result<PathBuf> {
        let dest = self.cache_dir.join(&entry.onnx_file);
        if dest.exists() {
            if self.verify_checksum(&dest, &entry.sha256)? {
                return Ok(dest);
            }
            tracing::debug!(model = %entry.model_name, "cached model failed checksum, re-downloading");
        }
        self.download(&entry.onnx_file, &dest)?;
        if !self.verify_checksum(&dest, &entry.sha256)? {
            return Err(OcrError::ModelLoad {
                path: dest.clone(),
                message: "downloaded model failed sha256 verification".into(),
            });
        }
        Ok(dest)
    }

    /// Ensures a recognizer's charset file is present in the cache,
    /// downloading it alongside the model if necessary.
    pub fn ensure_charset(&self, entry: &ModelEntry) -> Result<PathBuf> {
        let charset_file = entry.charset_file.as_ref().ok_or_else(|| OcrError::UnsupportedConfig {
            reason: format!("recognizer `{}` has no charsetFile", entry.model_name),
        })?;
        let dest = self.cache_dir.join(charset_file);
        if !dest.exists() {
            self.download(charset_file, &dest)?;
        }
        Ok(dest)
    }

    fn verify_checksum(&self, path: &Path, expected_sha256: &str) -> Result<bool> {
        let mut file = fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let digest = hex_encode(&hasher.finalize());
        Ok(digest.eq_ignore_ascii_case(expected_sha256))
    }

    fn download(&self, relative_path: &str, dest: &Path) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(OcrError::UnsupportedConfig {
                reason: format!(
                    "no model base URL configured; call ModelManager::with_base_url() \
                     before requesting `{relative_path}`"
                ),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = format!("{}/{}", self.base_url, relative_path);
        let client = Client::new();
        let mut response = client.get(&url).send().map_err(|e| OcrError::ModelLoad {
            path: dest.to_path_buf(),
            message: format!("failed to download from {url}: {e}"),
        })?;

        if !response.status().is_success() {
            return Err(OcrError::ModelLoad {
                path: dest.to_path_buf(),
                message: format!("download from {url} returned {}", response.status()),
            });
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars(">-"),
        );

        let mut file = fs::File::create(dest)?;
        io::copy(&mut response, &mut file)?;
        pb.finish_with_message("download complete");
        Ok(())
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_schema_version() {
        let json = r#"{"schemaVersion":2,"models":[]}"#;
        let err = ModelManifest::parse(json);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_onnx_file_outside_models_onnx() {
        let json = r#"{
            "schemaVersion":1,
            "models":[{
                "modelName":"craft",
                "kind":"detector",
                "languages":["*"],
                "onnxFile":"../escape.onnx",
                "charsetFile":null,
                "sha256":"deadbeef",
                "size":1
            }]
        }"#;
        let err = ModelManifest::parse(json);
        assert!(err.is_err());
    }

    #[test]
    fn recognizer_without_charset_is_rejected() {
        let json = r#"{
            "schemaVersion":1,
            "models":[{
                "modelName":"crnn",
                "kind":"recognizer",
                "languages":["en"],
                "onnxFile":"models/onnx/crnn.onnx",
                "charsetFile":null,
                "sha256":"deadbeef",
                "size":1
            }]
        }"#;
        let err = ModelManifest::parse(json);
        assert!(err.is_err());
    }

    #[test]
    fn parses_a_valid_manifest() {
        let json = r#"{
            "schemaVersion":1,
            "models":[{
                "modelName":"craft",
                "kind":"detector",
                "languages":["*"],
                "onnxFile":"models/onnx/craft.onnx",
                "charsetFile":null,
                "sha256":"deadbeef",
                "size":1
            }]
        }"#;
        let manifest = ModelManifest::parse(json).unwrap();
        assert_eq!(manifest.models.len(), 1);
        assert!(manifest.find("craft").is_some());
    }
}
