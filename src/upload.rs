//! Upload sources and client-side file validation.
//!
//! The backend is the authority on what it accepts, but rejecting an obvious
//! mismatch (a `.txt` sent to the image resizer, a 200 MB scan sent anywhere)
//! before the multipart body is built saves a round trip and, more
//! importantly, guarantees no job id is ever minted for a file that cannot
//! succeed.

use crate::error::JobError;
use crate::tools::ToolSpec;
use reqwest::multipart::Part;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file to be uploaded, held in memory.
#[derive(Clone)]
pub struct UploadSource {
    filename: String,
    mime: String,
    data: Vec<u8>,
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSource")
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

impl UploadSource {
    /// Read a local file. The MIME type is guessed from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|_| JobError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Read {} ({} bytes)", path.display(), data.len());
        Ok(Self::from_bytes(filename, data))
    }

    /// Wrap an in-memory buffer; `filename` drives MIME detection.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let mime = sniff_mime(&filename);
        Self {
            filename,
            mime,
            data: data.into(),
        }
    }

    /// Override the guessed MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn into_part(self) -> Result<Part, JobError> {
        Part::bytes(self.data)
            .file_name(self.filename)
            .mime_str(&self.mime)
            .map_err(|e| JobError::Internal(format!("invalid MIME type: {e}")))
    }
}

/// MIME type implied by a file name, `application/octet-stream` if unknown.
pub fn sniff_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Check file count, type and size against a tool's constraints.
///
/// `enforce_size` toggles the soft size limit; type and count checks always apply.
pub fn validate_upload(
    spec: &ToolSpec,
    sources: &[UploadSource],
    enforce_size: bool,
) -> Result<(), JobError> {
    let (min, max) = spec.files;
    if sources.len() < min || sources.len() > max {
        let expected = if min == max {
            format!("exactly {min} file")
        } else {
            format!("{min} to {max} files")
        };
        return Err(JobError::InvalidParams {
            tool: spec.tool,
            reason: format!("expected {expected}, got {}", sources.len()),
        });
    }

    for source in sources {
        if !spec.accepts.accepts(&source.mime) {
            return Err(JobError::UnsupportedFile {
                tool: spec.tool,
                filename: source.filename.clone(),
                mime: source.mime.clone(),
                expected: spec.accepts.describe(),
            });
        }
        if source.is_empty() {
            return Err(JobError::InvalidParams {
                tool: spec.tool,
                reason: format!("'{}' is empty", source.filename),
            });
        }
        if enforce_size && source.len() > spec.max_upload_bytes {
            return Err(JobError::FileTooLarge {
                tool: spec.tool,
                filename: source.filename.clone(),
                size: source.len(),
                limit: spec.max_upload_bytes,
            });
        }
    }
    Ok(())
}

/// Resolve CLI-style path arguments into upload sources.
pub async fn sources_from_paths(paths: &[PathBuf]) -> Result<Vec<UploadSource>, JobError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(UploadSource::from_path(path).await?);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use std::io::Write;

    fn pdf(name: &str) -> UploadSource {
        UploadSource::from_bytes(name, b"%PDF-1.7\n".to_vec())
    }

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(sniff_mime("scan.pdf"), "application/pdf");
        assert_eq!(sniff_mime("photo.JPG"), "image/jpeg");
        assert_eq!(sniff_mime("notes.txt"), "text/plain");
        assert_eq!(sniff_mime("blob"), "application/octet-stream");
    }

    #[test]
    fn image_tool_rejects_text_file() {
        let src = UploadSource::from_bytes("notes.txt", b"hello".to_vec());
        let err = validate_upload(Tool::ImageResizer.spec(), &[src], true).unwrap_err();
        assert!(matches!(err, JobError::UnsupportedFile { .. }));
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn ocr_accepts_pdf_and_images() {
        let spec = Tool::OcrPdf.spec();
        assert!(validate_upload(spec, &[pdf("a.pdf")], true).is_ok());
        let png = UploadSource::from_bytes("a.png", vec![0x89, b'P', b'N', b'G']);
        assert!(validate_upload(spec, &[png], true).is_ok());
    }

    #[test]
    fn size_limit_is_soft() {
        let big = UploadSource::from_bytes("big.png", vec![0u8; 10 * 1024 * 1024 + 1]);
        let spec = Tool::ImageCompressor.spec();
        let err = validate_upload(spec, &[big.clone()], true).unwrap_err();
        assert!(matches!(err, JobError::FileTooLarge { limit, .. } if limit == 10 * 1024 * 1024));
        assert!(validate_upload(spec, &[big], false).is_ok());
    }

    #[test]
    fn merge_needs_two_to_ten_files() {
        let spec = Tool::MergePdf.spec();
        assert!(validate_upload(spec, &[pdf("a.pdf")], true).is_err());
        assert!(validate_upload(spec, &[pdf("a.pdf"), pdf("b.pdf")], true).is_ok());
        let eleven: Vec<_> = (0..11).map(|i| pdf(&format!("{i}.pdf"))).collect();
        assert!(validate_upload(spec, &eleven, true).is_err());
    }

    #[test]
    fn single_file_tools_reject_several() {
        let err = validate_upload(Tool::SplitPdf.spec(), &[pdf("a.pdf"), pdf("b.pdf")], true)
            .unwrap_err();
        assert!(err.to_string().contains("exactly 1 file"), "{err}");
    }

    #[test]
    fn empty_file_is_rejected() {
        let empty = UploadSource::from_bytes("a.pdf", Vec::new());
        assert!(validate_upload(Tool::DeskewPdf.spec(), &[empty], true).is_err());
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4 test").unwrap();
        let src = UploadSource::from_path(tmp.path()).await.unwrap();
        assert_eq!(src.mime(), "application/pdf");
        assert_eq!(src.len(), 13);
        assert!(src.filename().ends_with(".pdf"));
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = UploadSource::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::FileNotFound { .. }));
    }
}
