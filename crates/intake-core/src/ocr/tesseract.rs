//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract via command line for text recognition. Language data is
//! located once when the engine is built and handed to every child process
//! through `TESSDATA_PREFIX`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::{debug, info};

use super::process::output_until;
use super::{EngineInfo, Pdftoppm, RecognitionEngine};
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Common tessdata install locations, checked in order.
const TESSDATA_CANDIDATES: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/usr/local/share/tessdata",
    "/usr/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "C:\\Program Files\\Tesseract-OCR\\tessdata",
];

const LANGUAGE_HINT: &str = "install the language packs (Debian/Ubuntu: apt install tesseract-ocr-jpn tesseract-ocr-eng; macOS: brew install tesseract-lang; Windows: select the languages in the Tesseract installer)";

/// Tesseract OCR backend.
pub struct TesseractEngine {
    binary: PathBuf,
    languages: Vec<String>,
    tessdata_dir: Option<PathBuf>,
    rasterizer: Pdftoppm,
}

impl TesseractEngine {
    /// Create an engine for the given languages (e.g. `["jpn", "eng"]`).
    pub fn new(languages: Vec<String>) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages,
            tessdata_dir: None,
            rasterizer: Pdftoppm::new(),
        }
    }

    /// Create an engine from the recognition settings.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.languages.clone()).with_tessdata_dir(config.tessdata_dir.clone())
    }

    /// Use an explicit tessdata directory, or discover one when `None`.
    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir.or_else(discover_tessdata);
        if let Some(ref dir) = self.tessdata_dir {
            info!("Tesseract data path: {}", dir.display());
        }
        self
    }

    /// Use a specific `tesseract` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Language argument passed to `-l`.
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        if let Some(ref dir) = self.tessdata_dir {
            command.env("TESSDATA_PREFIX", dir);
        }
        command
    }

    fn list_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = self.command().arg("--list-langs").output();
        match output {
            Ok(output) => {
                // Tesseract 3 printed the list on stderr.
                let mut listing = String::from_utf8_lossy(&output.stdout).to_string();
                listing.push('\n');
                listing.push_str(&String::from_utf8_lossy(&output.stderr));
                Ok(parse_language_list(&listing))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_installed()),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    /// Run Tesseract on an image file, killing it at `deadline`.
    fn run_tesseract(
        &self,
        image_path: &Path,
        page: u32,
        deadline: Option<Instant>,
    ) -> Result<String, OcrError> {
        let mut command = self.command();
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language_arg()]);

        match output_until(&mut command, deadline) {
            Ok(None) => Err(OcrError::DeadlineExceeded(page)),
            Ok(Some(output)) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(classify_failure(&stderr, &self.languages))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_installed()),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn verify(&self) -> Result<EngineInfo, OcrError> {
        let available = self.list_languages()?;
        let missing: Vec<String> = self
            .languages
            .iter()
            .filter(|lang| !available.contains(lang))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(OcrError::MissingLanguageData {
                missing,
                hint: LANGUAGE_HINT.to_string(),
            });
        }

        debug!("Tesseract languages available: {}", available.join(", "));
        Ok(EngineInfo {
            backend: self.name(),
            available_languages: available,
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
        let text = self.run_tesseract(&image_path, page, deadline)?;

        debug!(
            "Recognized page {} of {} ({} chars) in {}ms",
            page,
            pdf_path.display(),
            text.chars().count(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// First existing tessdata directory from the usual install locations.
pub fn discover_tessdata() -> Option<PathBuf> {
    TESSDATA_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_dir())
}

fn not_installed() -> OcrError {
    OcrError::BackendUnavailable("tesseract not found (install tesseract-ocr)".to_string())
}

/// Languages from `tesseract --list-langs` output.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(' '))
        .map(str::to_string)
        .collect()
}

fn classify_failure(stderr: &str, languages: &[String]) -> OcrError {
    if stderr.contains("Failed loading language") || stderr.contains("Error opening data file") {
        let missing: Vec<String> = languages
            .iter()
            .filter(|lang| stderr.contains(&format!("'{}'", lang)))
            .cloned()
            .collect();
        return OcrError::MissingLanguageData {
            missing: if missing.is_empty() {
                languages.to_vec()
            } else {
                missing
            },
            hint: LANGUAGE_HINT.to_string(),
        };
    }
    OcrError::Recognition(format!("tesseract failed: {}", stderr.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_arg() {
        let engine = TesseractEngine::new(vec!["jpn".into(), "eng".into()]);
        assert_eq!(engine.language_arg(), "jpn+eng");
    }

    #[test]
    fn test_parse_language_list() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\njpn\nosd\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "jpn", "osd"]);
    }

    #[test]
    fn test_classify_missing_language() {
        let stderr = "Error opening data file /usr/share/tessdata/jpn.traineddata\n\
                      Failed loading language 'jpn'\n\
                      Tesseract couldn't load any languages!";
        let err = classify_failure(stderr, &["jpn".to_string(), "eng".to_string()]);
        match err {
            OcrError::MissingLanguageData { missing, .. } => assert_eq!(missing, vec!["jpn"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_other_failure() {
        let err = classify_failure("Image file page-1.png cannot be read!", &["eng".to_string()]);
        assert!(matches!(err, OcrError::Recognition(_)));
        assert!(!err.is_systemic());
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_tesseract_hits_deadline() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tesseract");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = TesseractEngine::new(vec!["eng".into()]).with_binary(&script);
        let start = Instant::now();
        let err = engine
            .run_tesseract(
                &dir.path().join("page-1.png"),
                1,
                Some(start + Duration::from_millis(300)),
            )
            .unwrap_err();
        assert!(matches!(err, OcrError::DeadlineExceeded(1)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_binary_is_systemic() {
        let engine = TesseractEngine::new(vec!["eng".into()]).with_binary("/nonexistent/tesseract");
        let err = engine.verify().unwrap_err();
        assert!(matches!(err, OcrError::BackendUnavailable(_)));
    }
}
