//! Text acquisition: embedded text first, page recognition as fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{OcrError, PdfError};
use crate::models::config::PdfConfig;
use crate::models::record::PageMethod;
use crate::ocr::RecognitionEngine;
use crate::pdf::{PageSource, PdfExtractor};

/// Text obtained for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// How the text was obtained.
    pub method: PageMethod,
    /// Non-whitespace characters in the page text.
    pub chars: usize,
}

/// Text of a whole document, page texts joined in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredText {
    pub path: PathBuf,
    /// Every page's text followed by a newline.
    pub text: String,
    pub pages: Vec<PageText>,
}

impl AcquiredText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Method used for each page, in page order.
    pub fn methods(&self) -> Vec<PageMethod> {
        self.pages.iter().map(|p| p.method).collect()
    }
}

/// Why a document produced no text.
#[derive(Error, Debug)]
pub enum AcquireError {
    /// The document could not be opened.
    #[error("{0}")]
    Document(#[from] PdfError),

    /// Recognition failed on one page.
    #[error("page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: OcrError,
    },

    /// The recognition backend itself is unusable.
    #[error("{0}")]
    Engine(OcrError),
}

impl AcquireError {
    /// Whether the whole run must stop.
    pub fn is_systemic(&self) -> bool {
        matches!(self, AcquireError::Engine(_))
    }

    /// Whether the document ran out of time.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self,
            AcquireError::Page {
                source: OcrError::DeadlineExceeded(_),
                ..
            }
        )
    }
}

/// Count of non-whitespace characters.
pub fn significant_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Turns documents into text.
pub struct TextAcquirer {
    engine: Arc<dyn RecognitionEngine>,
    min_text_chars: usize,
    render_dpi: u32,
}

impl TextAcquirer {
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: &PdfConfig) -> Self {
        Self {
            engine,
            min_text_chars: config.min_text_chars,
            render_dpi: config.render_dpi,
        }
    }

    /// Acquire the text of a PDF file.
    ///
    /// Once `deadline` passes the remaining pages are not attempted and any
    /// running recognition child is killed.
    pub fn acquire(
        &self,
        path: &Path,
        deadline: Option<Instant>,
    ) -> Result<AcquiredText, AcquireError> {
        let extractor = PdfExtractor::open(path)?;
        self.acquire_from(&extractor, path, deadline)
    }

    /// Acquire text from an already opened page source backed by `path`.
    pub fn acquire_from<S: PageSource + ?Sized>(
        &self,
        source: &S,
        path: &Path,
        deadline: Option<Instant>,
    ) -> Result<AcquiredText, AcquireError> {
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(AcquireError::Document(PdfError::NoPages));
        }

        let mut text = String::new();
        let mut pages = Vec::with_capacity(page_count as usize);

        for number in 1..=page_count {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(AcquireError::Page {
                    page: number,
                    source: OcrError::DeadlineExceeded(number),
                });
            }

            let embedded = match source.extract_page_text(number) {
                Ok(page_text) => page_text,
                Err(e) => {
                    debug!("Page {} has no usable text layer: {}", number, e);
                    String::new()
                }
            };

            let embedded_chars = significant_chars(&embedded);
            let (page_text, method) = if embedded_chars >= self.min_text_chars {
                (embedded, PageMethod::Embedded)
            } else {
                debug!(
                    "Page {} has {} characters of embedded text, recognizing",
                    number, embedded_chars
                );
                let recognized = self
                    .engine
                    .recognize_page(path, number, self.render_dpi, deadline)
                    .map_err(|e| {
                        if e.is_systemic() {
                            AcquireError::Engine(e)
                        } else {
                            AcquireError::Page {
                                page: number,
                                source: e,
                            }
                        }
                    })?;
                (recognized, PageMethod::Recognized)
            };

            let chars = significant_chars(&page_text);
            debug!("Page {}: {:?}, {} characters", number, method, chars);
            if chars == 0 {
                warn!("Page {} of {} produced no text", number, path.display());
            }

            text.push_str(&page_text);
            text.push('\n');
            pages.push(PageText {
                number,
                method,
                chars,
            });
        }

        let recognized = pages
            .iter()
            .filter(|p| p.method == PageMethod::Recognized)
            .count();
        info!(
            "Acquired {} ({} pages, {} recognized)",
            path.display(),
            pages.len(),
            recognized
        );

        Ok(AcquiredText {
            path: path.to_path_buf(),
            text,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::EngineInfo;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct FakePages(Vec<Result<String, ()>>);

    impl PageSource for FakePages {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }

        fn extract_page_text(&self, page: u32) -> crate::pdf::Result<String> {
            match &self.0[(page - 1) as usize] {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(PdfError::TextExtraction {
                    page,
                    reason: "broken content stream".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeEngine {
        calls: Mutex<Vec<(u32, u32)>>,
        failure: Option<fn() -> OcrError>,
    }

    impl FakeEngine {
        fn calls(&self) -> Vec<(u32, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RecognitionEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn verify(&self) -> Result<EngineInfo, OcrError> {
            Ok(EngineInfo {
                backend: "fake",
                available_languages: vec![],
                active_languages: vec![],
            })
        }

        fn recognize_page(
            &self,
            _pdf: &Path,
            page: u32,
            dpi: u32,
            _deadline: Option<Instant>,
        ) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push((page, dpi));
            match self.failure {
                Some(make) => Err(make()),
                None => Ok(format!("recognized page {}", page)),
            }
        }
    }

    fn garbled() -> OcrError {
        OcrError::Recognition("garbled".into())
    }

    fn missing_language() -> OcrError {
        OcrError::MissingLanguageData {
            missing: vec!["jpn".into()],
            hint: String::new(),
        }
    }

    fn acquirer(engine: Arc<FakeEngine>) -> TextAcquirer {
        TextAcquirer::new(engine, &PdfConfig::default())
    }

    #[test]
    fn test_sufficient_text_skips_recognition() {
        let engine = Arc::new(FakeEngine::default());
        let page = "請".repeat(50);
        let source = FakePages(vec![Ok(page.clone())]);

        let acquired = acquirer(engine.clone())
            .acquire_from(&source, Path::new("a.pdf"), None)
            .unwrap();

        assert!(engine.calls().is_empty());
        assert_eq!(acquired.text, format!("{}\n", page));
        assert_eq!(acquired.methods(), vec![PageMethod::Embedded]);
        assert_eq!(acquired.pages[0].chars, 50);
    }

    #[test]
    fn test_whitespace_does_not_count() {
        let engine = Arc::new(FakeEngine::default());
        let page = format!("{} \n\t", "a ".repeat(49));
        let source = FakePages(vec![Ok(page)]);

        let acquired = acquirer(engine.clone())
            .acquire_from(&source, Path::new("a.pdf"), None)
            .unwrap();

        assert_eq!(engine.calls(), vec![(1, 300)]);
        assert_eq!(acquired.text, "recognized page 1\n");
    }

    #[test]
    fn test_mixed_pages_in_order() {
        let engine = Arc::new(FakeEngine::default());
        let long = "x".repeat(60);
        let source = FakePages(vec![Ok(long.clone()), Err(()), Ok("short".into())]);

        let acquired = acquirer(engine.clone())
            .acquire_from(&source, Path::new("a.pdf"), None)
            .unwrap();

        assert_eq!(engine.calls(), vec![(2, 300), (3, 300)]);
        assert_eq!(
            acquired.text,
            format!("{}\nrecognized page 2\nrecognized page 3\n", long)
        );
        assert_eq!(
            acquired.methods(),
            vec![
                PageMethod::Embedded,
                PageMethod::Recognized,
                PageMethod::Recognized
            ]
        );
        assert_eq!(acquired.page_count(), 3);
    }

    #[test]
    fn test_page_failure_is_recoverable() {
        let engine = Arc::new(FakeEngine {
            failure: Some(garbled as fn() -> OcrError),
            ..Default::default()
        });
        let source = FakePages(vec![Ok(String::new())]);

        let err = acquirer(engine)
            .acquire_from(&source, Path::new("a.pdf"), None)
            .unwrap_err();

        assert!(matches!(err, AcquireError::Page { page: 1, .. }));
        assert!(!err.is_systemic());
    }

    #[test]
    fn test_missing_language_is_systemic() {
        let engine = Arc::new(FakeEngine {
            failure: Some(missing_language as fn() -> OcrError),
            ..Default::default()
        });
        let source = FakePages(vec![Ok(String::new())]);

        let err = acquirer(engine)
            .acquire_from(&source, Path::new("a.pdf"), None)
            .unwrap_err();

        assert!(err.is_systemic());
    }

    #[test]
    fn test_passed_deadline_stops_before_next_page() {
        let engine = Arc::new(FakeEngine::default());
        let source = FakePages(vec![Ok(String::new()), Ok(String::new())]);

        let err = acquirer(engine.clone())
            .acquire_from(&source, Path::new("a.pdf"), Some(Instant::now()))
            .unwrap_err();

        assert!(matches!(
            err,
            AcquireError::Page {
                page: 1,
                source: OcrError::DeadlineExceeded(1)
            }
        ));
        assert!(!err.is_systemic());
        assert!(err.is_deadline_exceeded());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 truncated").unwrap();

        let engine = Arc::new(FakeEngine::default());
        let err = acquirer(engine.clone()).acquire(&path, None).unwrap_err();

        assert!(matches!(err, AcquireError::Document(_)));
        assert!(engine.calls().is_empty());
    }
}
