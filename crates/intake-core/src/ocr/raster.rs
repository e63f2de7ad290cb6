//! Page rasterization through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::trace;

use super::process::output_until;
use crate::error::OcrError;

/// Renders single PDF pages to PNG files.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    binary: PathBuf,
}

impl Pdftoppm {
    pub fn new() -> Self {
        Self::with_binary("pdftoppm")
    }

    /// Use a specific `pdftoppm` executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Render `page` at `dpi` into `output_dir`, returning the image path.
    ///
    /// The child is killed if it is still running at `deadline`.
    pub fn render(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        output_dir: &Path,
        deadline: Option<Instant>,
    ) -> Result<PathBuf, OcrError> {
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();
        let output_prefix = output_dir.join("page");

        trace!("Rendering page {} of {} at {} DPI", page, pdf_path.display(), dpi);

        let mut command = Command::new(&self.binary);
        command
            .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix);

        match output_until(&mut command, deadline) {
            Ok(None) => Err(OcrError::DeadlineExceeded(page)),
            Ok(Some(out)) if out.status.success() => {
                find_page_image(output_dir, page).ok_or_else(|| OcrError::Render {
                    page,
                    reason: "no image generated".to_string(),
                })
            }
            Ok(Some(out)) => Err(OcrError::Render {
                page,
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendUnavailable(
                "pdftoppm not found (install poppler-utils)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new()
    }
}

/// pdftoppm zero-pads the page number to the width of the page count.
fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    (1..=6)
        .map(|digits| dir.join(format!("page-{:0width$}.png", page, width = digits)))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_page_image_padding() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-007.png"), b"png").unwrap();

        assert_eq!(
            find_page_image(dir.path(), 7),
            Some(dir.path().join("page-007.png"))
        );
        assert_eq!(find_page_image(dir.path(), 8), None);
    }

    #[test]
    fn test_missing_binary_is_backend_unavailable() {
        let raster = Pdftoppm::with_binary("/nonexistent/pdftoppm");
        let dir = tempfile::tempdir().unwrap();
        let err = raster
            .render(Path::new("a.pdf"), 1, 300, dir.path(), None)
            .unwrap_err();
        assert!(err.is_systemic());
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_render_hits_deadline() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("pdftoppm");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let start = Instant::now();
        let err = Pdftoppm::with_binary(&script)
            .render(
                Path::new("a.pdf"),
                3,
                300,
                dir.path(),
                Some(start + Duration::from_millis(300)),
            )
            .unwrap_err();
        assert!(matches!(err, OcrError::DeadlineExceeded(3)));
        assert!(!err.is_systemic());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
