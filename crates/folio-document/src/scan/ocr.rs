// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process OCR engine backed by the `ocrs` crate, a pure-Rust OCR engine
// running neural network models via `rten`.
//
// # Feature Gate
//
// Only available with the `ocr` feature:
//
// ```toml
// folio-document = { path = "crates/folio-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// Two model files are required:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Running `ocrs-cli` once downloads both into `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is where [`OcrConfig::default`] looks.
//
// `ocrs` and `rten` must be built in release mode; debug builds are 10-100x
// slower.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use ocrs::{ImageSource, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use folio_bridge::{OcrEngine, OcrSession, Recognition};
use folio_core::error::{FolioError, Result};

use crate::pdf::reader::{EmbeddedImage, PdfReader};
use crate::scan::postprocess::token_plausibility;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Languages the bundled models read. Other requests still run, with a log line.
const SUPPORTED_LANGUAGES: &[&str] = &["eng", "en", "spa", "es"];

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `text-detection.rten` and `text-recognition.rten` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(FolioError::Ocr(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed [`OcrEngine`]. Models are loaded once; sessions share them.
pub struct OcrsEngine {
    engine: Arc<ocrs::OcrEngine>,
}

impl OcrsEngine {
    /// Load both models. This is the expensive step; build one engine and
    /// share it through an `OcrClient`.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = Model::load_file(&config.detection_model_path)
            .map_err(|err| FolioError::Ocr(format!("failed to load detection model: {err}")))?;
        let recognition_model = Model::load_file(&config.recognition_model_path)
            .map_err(|err| FolioError::Ocr(format!("failed to load recognition model: {err}")))?;

        let engine = ocrs::OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| FolioError::Ocr(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self {
            engine: Arc::new(engine),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrConfig::default())
    }
}

impl OcrEngine for OcrsEngine {
    fn create_session(&self, languages: &[String]) -> Result<Box<dyn OcrSession>> {
        let unsupported: Vec<&String> = languages
            .iter()
            .filter(|lang| !SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .collect();
        if !unsupported.is_empty() {
            warn!(?unsupported, "Models are trained on Latin script; accuracy may suffer");
        }
        Ok(Box::new(OcrsSession {
            engine: Arc::clone(&self.engine),
        }))
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}

struct OcrsSession {
    engine: Arc<ocrs::OcrEngine>,
}

impl OcrSession for OcrsSession {
    /// Accepts an encoded image or a PDF; for PDFs every embedded image is
    /// read in object order.
    fn recognize(&mut self, input: &[u8]) -> Result<Recognition> {
        let images: Vec<DynamicImage> = if input.starts_with(b"%PDF") {
            let reader = PdfReader::from_bytes(input)?;
            reader
                .images()
                .into_iter()
                .filter_map(|embedded| match to_dynamic(embedded) {
                    Ok(image) => Some(image),
                    Err(err) => {
                        warn!(%err, "Skipping undecodable page image");
                        None
                    }
                })
                .collect()
        } else {
            let image = image::load_from_memory(input)
                .map_err(|err| FolioError::Ocr(format!("unreadable image: {err}")))?;
            vec![image]
        };

        if images.is_empty() {
            return Err(FolioError::Ocr("no page images to recognise".into()));
        }

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            pages.push(self.recognize_image(image)?);
        }
        let text = pages.join("\n\n");
        let confidence = token_plausibility(&text);
        Ok(Recognition { text, confidence })
    }

    fn terminate(&mut self) {
        debug!("OCR session terminated");
    }
}

impl OcrsSession {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize_image(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            FolioError::Ocr(format!("failed to create image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| FolioError::Ocr(format!("OCR preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| FolioError::Ocr(format!("OCR text recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), "Page recognised");
        Ok(text)
    }
}

fn to_dynamic(embedded: EmbeddedImage) -> Result<DynamicImage> {
    match embedded {
        EmbeddedImage::Encoded(bytes) => image::load_from_memory(&bytes)
            .map_err(|err| FolioError::Ocr(format!("unreadable embedded image: {err}"))),
        EmbeddedImage::Raw {
            width,
            height,
            components,
            samples,
        } => {
            let image = match components {
                1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
                3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
                4 => RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
                    .map(DynamicImage::ImageRgb8),
                _ => None,
            };
            image.ok_or_else(|| {
                FolioError::Ocr(format!(
                    "unsupported raw image layout ({width}x{height}, {components} components)"
                ))
            })
        }
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            [px[0], px[1], px[2]].map(|c| ((255 - u16::from(c)) * k / 255) as u8)
        })
        .collect()
}
