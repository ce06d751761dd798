//! Declarative tool registry.
//!
//! Every processing tool the backend exposes is a [`Tool`] variant with a
//! static [`ToolSpec`] describing its routes, completion mode and upload
//! constraints. The [`ToolKind`] trait binds a tool to its request and
//! response types so a single generic [`crate::client::ToolClient`] can drive
//! all of them.
//!
//! ## Why a table instead of per-tool methods?
//!
//! The fifteen tools differ only in URL segments, payload schemas and a
//! couple of protocol quirks (synchronous transforms, `/status` suffixes,
//! download variants). Encoding those differences as data keeps the
//! create → submit → poll → download sequence in exactly one place.

/// Declare a zero-sized marker type implementing [`ToolKind`].
macro_rules! tool_kind {
    ($(#[$meta:meta])* $name:ident => $tool:ident {
        upload: $opts:ty, params: $params:ty, output: $out:ty $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::tools::ToolKind for $name {
            const TOOL: $crate::tools::Tool = $crate::tools::Tool::$tool;
            type UploadOptions = $opts;
            type Params = $params;
            type Output = $out;
        }
    };
}

pub mod image;
pub mod pdf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Tool identity ────────────────────────────────────────────────────────

/// A processing tool offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    PdfToImages = 0,
    OrganizePdf,
    MergePdf,
    CompressPdf,
    OcrPdf,
    DeskewPdf,
    SplitPdf,
    PdfToWord,
    ImageConverter,
    ImageCompressor,
    ImageResizer,
    ImageCropper,
    ImageFilters,
    ImageRotate,
    ImageWatermark,
}

impl Tool {
    /// Every tool, in catalogue order.
    pub const ALL: [Tool; 15] = [
        Tool::PdfToImages,
        Tool::OrganizePdf,
        Tool::MergePdf,
        Tool::CompressPdf,
        Tool::OcrPdf,
        Tool::DeskewPdf,
        Tool::SplitPdf,
        Tool::PdfToWord,
        Tool::ImageConverter,
        Tool::ImageCompressor,
        Tool::ImageResizer,
        Tool::ImageCropper,
        Tool::ImageFilters,
        Tool::ImageRotate,
        Tool::ImageWatermark,
    ];

    /// Static routing and validation record for this tool.
    pub fn spec(self) -> &'static ToolSpec {
        &REGISTRY[self as usize]
    }

    /// URL path segment, e.g. `"image-resizer"`.
    pub fn slug(self) -> &'static str {
        self.spec().slug
    }

    pub fn from_slug(slug: &str) -> Option<Tool> {
        let slug = slug.trim().trim_start_matches("/tools/").trim_matches('/');
        Tool::ALL.into_iter().find(|t| t.slug() == slug)
    }

    /// Path used by the website for this tool; the recent-tools list stores these.
    pub fn href(self) -> String {
        format!("/tools/{}", self.slug())
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::from_slug(s).ok_or_else(|| {
            let known: Vec<&str> = Tool::ALL.iter().map(|t| t.slug()).collect();
            format!("unknown tool '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

// ── Route descriptors ────────────────────────────────────────────────────

/// Where the multipart upload is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateRoute {
    /// `POST {tool}/jobs`
    Jobs,
    /// `POST {tool}/upload`
    Upload,
}

/// Which GET returns the job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRoute {
    /// `GET {tool}/jobs/{id}`
    Job,
    /// `GET {tool}/jobs/{id}/status`
    JobStatus,
    /// No status endpoint; the transform response is the only record.
    None,
}

/// How a tool reaches its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Submit returns immediately; the job is polled until terminal.
    Polled,
    /// The transform response already carries the finished result.
    Synchronous,
}

/// What the artifact download looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadRoute {
    /// `jobs/{id}/download`
    Single,
    /// `jobs/{id}/download/{variant}`
    Variants {
        default: &'static str,
        allowed: &'static [&'static str],
    },
    /// `jobs/{id}/assets/download` (ZIP of all generated assets)
    Archive,
}

/// File types a tool accepts, checked against the sniffed MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Image,
    PdfOrImage,
}

impl FileKind {
    pub fn accepts(self, mime: &str) -> bool {
        let is_pdf = mime == "application/pdf";
        let is_image = mime.starts_with("image/");
        match self {
            FileKind::Pdf => is_pdf,
            FileKind::Image => is_image,
            FileKind::PdfOrImage => is_pdf || is_image,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            FileKind::Pdf => "a PDF document",
            FileKind::Image => "an image",
            FileKind::PdfOrImage => "a PDF document or an image",
        }
    }
}

pub const IMAGE_UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;
pub const PDF_UPLOAD_LIMIT: u64 = 50 * 1024 * 1024;

/// Static description of one tool's protocol.
#[derive(Debug, Serialize)]
pub struct ToolSpec {
    pub tool: Tool,
    pub slug: &'static str,
    pub title: &'static str,
    pub create: CreateRoute,
    /// Multipart field name carrying the file(s).
    pub upload_field: &'static str,
    /// Inclusive bounds on the number of files in one upload.
    pub files: (usize, usize),
    /// Configure/transform segment under `jobs/{id}/`, if the tool has one.
    pub action: Option<&'static str>,
    pub status: StatusRoute,
    pub completion: Completion,
    pub accepts: FileKind,
    pub max_upload_bytes: u64,
    pub download: DownloadRoute,
    /// Reported when the server marks a job failed without a message.
    pub failure_message: &'static str,
}

impl ToolSpec {
    /// Path segments for the upload request.
    pub fn create_path(&self) -> Vec<&str> {
        match self.create {
            CreateRoute::Jobs => vec![self.slug, "jobs"],
            CreateRoute::Upload => vec![self.slug, "upload"],
        }
    }

    /// Path segments below `{tool}/jobs/{id}/`.
    pub fn job_path<'a>(&'a self, job_id: &'a str, tail: &[&'a str]) -> Vec<&'a str> {
        let mut segments = vec![self.slug, "jobs", job_id];
        segments.extend_from_slice(tail);
        segments
    }

    pub fn action_path<'a>(&'a self, job_id: &'a str) -> Option<Vec<&'a str>> {
        self.action.map(|a| self.job_path(job_id, &[a]))
    }

    pub fn status_path<'a>(&'a self, job_id: &'a str) -> Option<Vec<&'a str>> {
        match self.status {
            StatusRoute::Job => Some(self.job_path(job_id, &[])),
            StatusRoute::JobStatus => Some(self.job_path(job_id, &["status"])),
            StatusRoute::None => None,
        }
    }

    /// Path segments for the artifact download.
    ///
    /// `variant` selects e.g. the OCR `txt`/`json` output; `None` picks the
    /// tool's default. Tools without variants reject any explicit variant.
    pub fn download_path<'a>(
        &'a self,
        job_id: &'a str,
        variant: Option<&'a str>,
    ) -> Result<Vec<&'a str>, String> {
        match (self.download, variant) {
            (DownloadRoute::Single, None) => Ok(self.job_path(job_id, &["download"])),
            (DownloadRoute::Archive, None) => Ok(self.job_path(job_id, &["assets", "download"])),
            (DownloadRoute::Variants { default, .. }, None) => {
                Ok(self.job_path(job_id, &["download", default]))
            }
            (DownloadRoute::Variants { allowed, .. }, Some(v)) => {
                if allowed.contains(&v) {
                    Ok(self.job_path(job_id, &["download", v]))
                } else {
                    Err(format!(
                        "download variant '{v}' is not one of: {}",
                        allowed.join(", ")
                    ))
                }
            }
            (_, Some(v)) => Err(format!("{} has no download variant '{v}'", self.slug)),
        }
    }

    pub fn is_synchronous(&self) -> bool {
        self.completion == Completion::Synchronous
    }
}

macro_rules! tool_spec {
    (
        $tool:ident, $slug:literal, $title:literal,
        create: $create:ident, field: $field:literal, files: $files:expr,
        action: $action:expr, status: $status:ident, completion: $completion:ident,
        accepts: $accepts:ident, limit: $limit:expr, download: $download:expr,
        failure: $failure:literal $(,)?
    ) => {
        ToolSpec {
            tool: Tool::$tool,
            slug: $slug,
            title: $title,
            create: CreateRoute::$create,
            upload_field: $field,
            files: $files,
            action: $action,
            status: StatusRoute::$status,
            completion: Completion::$completion,
            accepts: FileKind::$accepts,
            max_upload_bytes: $limit,
            download: $download,
            failure_message: $failure,
        }
    };
}

/// Indexed by `Tool as usize`; order must match the enum.
static REGISTRY: [ToolSpec; 15] = [
    tool_spec!(PdfToImages, "pdf-to-images", "PDF to Images",
        create: Jobs, field: "file", files: (1, 1),
        action: None, status: Job, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Archive,
        failure: "Conversion failed"),
    tool_spec!(OrganizePdf, "organize-pdf", "Organize PDF",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: Job, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Processing failed"),
    tool_spec!(MergePdf, "merge-pdf", "Merge PDF",
        create: Jobs, field: "files", files: (2, 10),
        action: Some("process"), status: Job, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Merge failed"),
    tool_spec!(CompressPdf, "compress-pdf", "Compress PDF",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: Job, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Compression failed"),
    tool_spec!(OcrPdf, "ocr-pdf", "OCR PDF",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: Job, completion: Polled,
        accepts: PdfOrImage, limit: PDF_UPLOAD_LIMIT,
        download: DownloadRoute::Variants { default: "txt", allowed: &["txt", "json"] },
        failure: "OCR failed"),
    tool_spec!(DeskewPdf, "deskew-pdf", "Deskew PDF",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: Job, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Deskew failed"),
    tool_spec!(SplitPdf, "split-pdf", "Split PDF",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: JobStatus, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Split failed"),
    tool_spec!(PdfToWord, "pdf-to-word", "PDF to Word",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("process"), status: JobStatus, completion: Polled,
        accepts: Pdf, limit: PDF_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Conversion failed"),
    tool_spec!(ImageConverter, "image-converter", "Image Converter",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("convert"), status: JobStatus, completion: Polled,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Conversion failed"),
    tool_spec!(ImageCompressor, "image-compressor", "Image Compressor",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("compress"), status: JobStatus, completion: Polled,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Compression failed"),
    tool_spec!(ImageResizer, "image-resizer", "Image Resizer",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("resize"), status: JobStatus, completion: Polled,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Resize failed"),
    tool_spec!(ImageCropper, "image-cropper", "Image Cropper",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("crop"), status: JobStatus, completion: Polled,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Crop failed"),
    tool_spec!(ImageFilters, "image-filters", "Image Filters",
        create: Jobs, field: "file", files: (1, 1),
        action: Some("apply"), status: JobStatus, completion: Polled,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Filter processing failed"),
    tool_spec!(ImageRotate, "image-rotate", "Rotate Image",
        create: Upload, field: "file", files: (1, 1),
        action: Some("transform"), status: JobStatus, completion: Synchronous,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Transform failed"),
    tool_spec!(ImageWatermark, "image-watermark", "Watermark Image",
        create: Upload, field: "file", files: (1, 1),
        action: Some("transform"), status: None, completion: Synchronous,
        accepts: Image, limit: IMAGE_UPLOAD_LIMIT, download: DownloadRoute::Single,
        failure: "Watermark failed"),
];

// ── Type bindings ────────────────────────────────────────────────────────

/// Extra multipart fields sent alongside the upload.
pub trait UploadFields: Send + Sync {
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// JSON body for the configure/transform call.
pub trait ToolParams: Serialize + Send + Sync {
    /// `false` when the action endpoint takes no body at all.
    const HAS_BODY: bool = true;

    /// Client-side sanity checks. The server remains authoritative.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Binds a [`Tool`] to its request/response types.
pub trait ToolKind: Send + Sync + 'static {
    const TOOL: Tool;
    type UploadOptions: UploadFields + Default;
    type Params: ToolParams;
    type Output: DeserializeOwned + Serialize + fmt::Debug + Send;
}

/// Used by tools whose action takes no body (or that have no action).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams;

impl ToolParams for NoParams {
    const HAS_BODY: bool = false;
}

/// Used by tools whose upload carries only the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUploadOptions;

impl UploadFields for NoUploadOptions {}

/// Result type for tools whose completed record carries nothing beyond the job itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoOutput {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_matches_enum() {
        for tool in Tool::ALL {
            assert_eq!(tool.spec().tool, tool, "registry slot for {tool:?}");
        }
    }

    #[test]
    fn slugs_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_slug(tool.slug()), Some(tool));
            assert_eq!(tool.to_string(), tool.slug());
            assert_eq!(tool.slug().parse::<Tool>().unwrap(), tool);
        }
        assert_eq!(Tool::from_slug("/tools/ocr-pdf"), Some(Tool::OcrPdf));
        assert!("nope".parse::<Tool>().unwrap_err().contains("image-resizer"));
    }

    #[test]
    fn serde_uses_slugs() {
        assert_eq!(
            serde_json::to_string(&Tool::ImageResizer).unwrap(),
            "\"image-resizer\""
        );
        let t: Tool = serde_json::from_str("\"pdf-to-word\"").unwrap();
        assert_eq!(t, Tool::PdfToWord);
    }

    #[test]
    fn create_routes() {
        assert_eq!(Tool::ImageRotate.spec().create_path(), ["image-rotate", "upload"]);
        assert_eq!(Tool::OcrPdf.spec().create_path(), ["ocr-pdf", "jobs"]);
        assert_eq!(Tool::MergePdf.spec().upload_field, "files");
    }

    #[test]
    fn status_routes() {
        assert_eq!(
            Tool::OcrPdf.spec().status_path("j1").unwrap(),
            ["ocr-pdf", "jobs", "j1"]
        );
        assert_eq!(
            Tool::SplitPdf.spec().status_path("j1").unwrap(),
            ["split-pdf", "jobs", "j1", "status"]
        );
        assert!(Tool::ImageWatermark.spec().status_path("j1").is_none());
    }

    #[test]
    fn action_routes() {
        assert_eq!(
            Tool::ImageFilters.spec().action_path("x").unwrap(),
            ["image-filters", "jobs", "x", "apply"]
        );
        assert!(Tool::PdfToImages.spec().action_path("x").is_none());
    }

    #[test]
    fn download_routes() {
        let ocr = Tool::OcrPdf.spec();
        assert_eq!(
            ocr.download_path("j", None).unwrap(),
            ["ocr-pdf", "jobs", "j", "download", "txt"]
        );
        assert_eq!(
            ocr.download_path("j", Some("json")).unwrap(),
            ["ocr-pdf", "jobs", "j", "download", "json"]
        );
        assert!(ocr.download_path("j", Some("docx")).is_err());

        let resize = Tool::ImageResizer.spec();
        assert_eq!(
            resize.download_path("j", None).unwrap(),
            ["image-resizer", "jobs", "j", "download"]
        );
        assert!(resize.download_path("j", Some("txt")).is_err());

        assert_eq!(
            Tool::PdfToImages.spec().download_path("j", None).unwrap(),
            ["pdf-to-images", "jobs", "j", "assets", "download"]
        );
    }

    #[test]
    fn file_kinds() {
        assert!(FileKind::Pdf.accepts("application/pdf"));
        assert!(!FileKind::Pdf.accepts("image/png"));
        assert!(FileKind::Image.accepts("image/webp"));
        assert!(!FileKind::Image.accepts("text/plain"));
        assert!(FileKind::PdfOrImage.accepts("image/jpeg"));
        assert!(FileKind::PdfOrImage.accepts("application/pdf"));
        assert_eq!(Tool::OcrPdf.spec().accepts, FileKind::PdfOrImage);
    }

    #[test]
    fn limits_follow_file_kind() {
        for tool in Tool::ALL {
            let spec = tool.spec();
            let expected = if spec.accepts == FileKind::Image {
                IMAGE_UPLOAD_LIMIT
            } else {
                PDF_UPLOAD_LIMIT
            };
            assert_eq!(spec.max_upload_bytes, expected, "{tool}");
        }
    }

    #[test]
    fn only_rotate_and_watermark_are_synchronous() {
        let sync: Vec<Tool> = Tool::ALL
            .into_iter()
            .filter(|t| t.spec().is_synchronous())
            .collect();
        assert_eq!(sync, [Tool::ImageRotate, Tool::ImageWatermark]);
    }
}
