//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::GenericImageView;
use tempfile::TempDir;
use tracing::{debug, info};

use super::{EngineInfo, Pdftoppm, RecognitionEngine};
use crate::error::OcrError;

/// A recognized line with its axis-aligned box `(x, y, width, height)`.
struct TextLine {
    rect: (f32, f32, f32, f32),
    text: String,
}

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The recognition language is fixed by the model files, so `languages` is
/// only reported back by [`RecognitionEngine::verify`].
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    languages: Vec<String>,
    rasterizer: Pdftoppm,
}

impl PureOcrEngine {
    /// Create an engine from `det.onnx`, `rec.onnx` and `dict.txt` in a directory.
    pub fn from_dir(model_dir: &Path, languages: Vec<String>) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("rec.onnx");
        let dict_path = model_dir.join("dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            languages,
            rasterizer: Pdftoppm::new(),
        })
    }

    /// Recognize a rendered page image.
    fn recognize_image(&self, image_path: &Path) -> Result<String, OcrError> {
        let image = image::open(image_path)
            .map_err(|e| OcrError::Recognition(format!("failed to load image: {}", e)))?;
        let (width, height) = image.dimensions();
        debug!("Processing image: {}x{}", width, height);

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;
            engine
                .run_from_image(&image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let mut lines: Vec<TextLine> = results
            .iter()
            .map(|r| TextLine {
                rect: polygon_to_rect(&r.bounding_box),
                text: r.text.replace("[UNK]", " "),
            })
            .collect();

        sort_reading_order(&mut lines);

        Ok(lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl RecognitionEngine for PureOcrEngine {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn verify(&self) -> Result<EngineInfo, OcrError> {
        Ok(EngineInfo {
            backend: self.name(),
            available_languages: self.languages.clone(),
            active_languages: self.languages.clone(),
        })
    }

    fn recognize_page(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        deadline: Option<Instant>,
    ) -> Result<String, OcrError> {
        let start = Instant::now();
        let temp_dir = TempDir::new()?;
        let image_path = self
            .rasterizer
            .render(pdf_path, page, dpi, temp_dir.path(), deadline)?;
        let text = self.recognize_image(&image_path)?;

        info!(
            "OCR complete: page {} in {}ms",
            page,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Rows are 20px bands, read top to bottom and then left to right.
fn sort_reading_order(lines: &mut [TextLine]) {
    lines.sort_by(|a, b| {
        let row_a = (a.rect.1 / 20.0) as i32;
        let row_b = (b.rect.1 / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.rect
                .0
                .partial_cmp(&b.rect.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Bounding rectangle of the first 4 exterior points of a polygon.
fn polygon_to_rect(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32, f32, f32) {
    let points: Vec<(f32, f32)> = polygon
        .exterior()
        .coords()
        .take(4)
        .map(|c| (c.x as f32, c.y as f32))
        .collect();
    if points.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let min_x = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_x = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    (min_x, min_y, max_x - min_x, max_y - min_y)
}
