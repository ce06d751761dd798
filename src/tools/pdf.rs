//! PDF tools: request and result types.

use super::{NoOutput, NoParams, NoUploadOptions, ToolParams, UploadFields};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Markers ──────────────────────────────────────────────────────────────

tool_kind!(
    /// Render every page to an image; fetch them via `pdf_to_images_results`.
    PdfToImages => PdfToImages { upload: NoUploadOptions, params: NoParams, output: NoOutput }
);
tool_kind!(
    OrganizePdf => OrganizePdf { upload: NoUploadOptions, params: OrganizeParams, output: NoOutput }
);
tool_kind!(
    MergePdf => MergePdf { upload: NoUploadOptions, params: MergeParams, output: MergeOutput }
);
tool_kind!(
    CompressPdf => CompressPdf { upload: CompressPdfOptions, params: NoParams, output: CompressPdfOutput }
);
tool_kind!(
    /// Text extraction; accepts scanned PDFs and plain images.
    OcrPdf => OcrPdf { upload: OcrOptions, params: NoParams, output: OcrOutput }
);
tool_kind!(
    DeskewPdf => DeskewPdf { upload: NoUploadOptions, params: NoParams, output: DeskewOutput }
);
tool_kind!(
    SplitPdf => SplitPdf { upload: NoUploadOptions, params: SplitParams, output: SplitOutput }
);
tool_kind!(
    PdfToWord => PdfToWord { upload: NoUploadOptions, params: NoParams, output: NoOutput }
);

// ── Parameters ───────────────────────────────────────────────────────────

/// New page order for organize-pdf (0-indexed source pages).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizeParams {
    pub page_order: Vec<u32>,
}

impl ToolParams for OrganizeParams {
    fn validate(&self) -> Result<(), String> {
        if self.page_order.is_empty() {
            return Err("page_order must list at least one page".into());
        }
        Ok(())
    }
}

/// Order in which the uploaded files are concatenated (indices into the upload).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    pub file_order: Vec<u32>,
}

impl MergeParams {
    /// Keep upload order for `n` files.
    pub fn in_upload_order(n: usize) -> Self {
        Self {
            file_order: (0..n as u32).collect(),
        }
    }
}

impl ToolParams for MergeParams {
    fn validate(&self) -> Result<(), String> {
        if self.file_order.len() < 2 {
            return Err("file_order must list at least two files".into());
        }
        let mut seen = self.file_order.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.file_order.len() {
            return Err("file_order contains duplicates".into());
        }
        Ok(())
    }
}

/// Pages to extract into the split output (0-indexed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    pub pages: Vec<u32>,
}

impl ToolParams for SplitParams {
    fn validate(&self) -> Result<(), String> {
        if self.pages.is_empty() {
            return Err("select at least one page".into());
        }
        Ok(())
    }
}

// ── Upload options ───────────────────────────────────────────────────────

/// Compression strength for compress-pdf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl PdfQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            PdfQuality::Low => "low",
            PdfQuality::Medium => "medium",
            PdfQuality::High => "high",
        }
    }
}

impl FromStr for PdfQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(PdfQuality::Low),
            "medium" => Ok(PdfQuality::Medium),
            "high" => Ok(PdfQuality::High),
            other => Err(format!("unknown quality '{other}' (low, medium, high)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressPdfOptions {
    pub quality: PdfQuality,
    /// Target reduction in percent (1–99).
    pub compress_by_percent: Option<u8>,
    /// Upper bound on the output size.
    pub max_file_size_mb: Option<f64>,
}

impl UploadFields for CompressPdfOptions {
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("quality", self.quality.as_str().to_string())];
        if let Some(p) = self.compress_by_percent {
            fields.push(("compress_by_percent", p.clamp(1, 99).to_string()));
        }
        if let Some(mb) = self.max_file_size_mb.filter(|mb| *mb > 0.0) {
            fields.push(("max_file_size_mb", mb.to_string()));
        }
        fields
    }
}

/// Tesseract language packs installed on the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrLanguage {
    Auto,
    #[default]
    Eng,
    Hin,
    Spa,
    Fra,
    Deu,
    Ara,
    ChiSim,
    Jpn,
    Kor,
    Rus,
}

impl OcrLanguage {
    pub const ALL: [OcrLanguage; 11] = [
        OcrLanguage::Auto,
        OcrLanguage::Eng,
        OcrLanguage::Hin,
        OcrLanguage::Spa,
        OcrLanguage::Fra,
        OcrLanguage::Deu,
        OcrLanguage::Ara,
        OcrLanguage::ChiSim,
        OcrLanguage::Jpn,
        OcrLanguage::Kor,
        OcrLanguage::Rus,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OcrLanguage::Auto => "auto",
            OcrLanguage::Eng => "eng",
            OcrLanguage::Hin => "hin",
            OcrLanguage::Spa => "spa",
            OcrLanguage::Fra => "fra",
            OcrLanguage::Deu => "deu",
            OcrLanguage::Ara => "ara",
            OcrLanguage::ChiSim => "chi_sim",
            OcrLanguage::Jpn => "jpn",
            OcrLanguage::Kor => "kor",
            OcrLanguage::Rus => "rus",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OcrLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OcrLanguage::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported OCR language '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    #[default]
    Standard,
    /// Preprocesses pages (denoise, binarise) before recognition. Slower.
    Enhanced,
}

impl OcrMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OcrMode::Standard => "standard",
            OcrMode::Enhanced => "enhanced",
        }
    }
}

impl FromStr for OcrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(OcrMode::Standard),
            "enhanced" => Ok(OcrMode::Enhanced),
            other => Err(format!("unknown OCR mode '{other}' (standard, enhanced)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OcrOptions {
    pub language: OcrLanguage,
    pub mode: OcrMode,
}

impl UploadFields for OcrOptions {
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("language", self.language.code().to_string()),
            ("mode", self.mode.as_str().to_string()),
        ]
    }
}

// ── Results ──────────────────────────────────────────────────────────────
//
// Fields are optional throughout: the backend adds and drops keys between
// releases and a missing statistic must not fail an otherwise finished job.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeOutput {
    #[serde(default)]
    pub total_files: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressPdfOutput {
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub compressed_size: Option<u64>,
    #[serde(default)]
    pub reduction_percent: Option<f64>,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    #[serde(default)]
    pub total_characters: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub text_file: Option<String>,
    #[serde(default)]
    pub json_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeskewOutput {
    /// Mean absolute correction in degrees.
    #[serde(default)]
    pub avg_angle_corrected: Option<f64>,
    #[serde(default)]
    pub angles_per_page: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitOutput {
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub selected_pages: Option<u32>,
}

// ── Auxiliary responses ──────────────────────────────────────────────────

/// `GET pdf-to-images/jobs/{id}/results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfImagesResults {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub images: Vec<PageImage>,
    #[serde(default)]
    pub zip_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    pub page: u32,
    /// Server-relative asset path.
    pub url: String,
}

/// One entry of `GET merge-pdf/jobs/{id}/files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeFile {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MergeFileList {
    #[serde(default)]
    pub files: Vec<MergeFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolKind};

    #[test]
    fn markers_bind_tools() {
        assert_eq!(<OcrPdf as ToolKind>::TOOL, Tool::OcrPdf);
        assert_eq!(<SplitPdf as ToolKind>::TOOL, Tool::SplitPdf);
        assert_eq!(<PdfToWord as ToolKind>::TOOL, Tool::PdfToWord);
    }

    #[test]
    fn ocr_upload_fields() {
        let opts = OcrOptions {
            language: OcrLanguage::ChiSim,
            mode: OcrMode::Enhanced,
        };
        assert_eq!(
            opts.form_fields(),
            vec![("language", "chi_sim".to_string()), ("mode", "enhanced".to_string())]
        );
        assert_eq!(OcrOptions::default().form_fields()[0].1, "eng");
    }

    #[test]
    fn ocr_language_parse() {
        assert_eq!("chi_sim".parse::<OcrLanguage>().unwrap(), OcrLanguage::ChiSim);
        assert_eq!("AUTO".parse::<OcrLanguage>().unwrap(), OcrLanguage::Auto);
        assert!("klingon".parse::<OcrLanguage>().is_err());
    }

    #[test]
    fn compress_pdf_fields_skip_unset() {
        let fields = CompressPdfOptions::default().form_fields();
        assert_eq!(fields, vec![("quality", "medium".to_string())]);

        let fields = CompressPdfOptions {
            quality: PdfQuality::High,
            compress_by_percent: Some(150),
            max_file_size_mb: Some(2.5),
        }
        .form_fields();
        assert_eq!(fields[0].1, "high");
        assert_eq!(fields[1], ("compress_by_percent", "99".to_string()));
        assert_eq!(fields[2], ("max_file_size_mb", "2.5".to_string()));
    }

    #[test]
    fn param_validation() {
        assert!(SplitParams { pages: vec![] }.validate().is_err());
        assert!(SplitParams { pages: vec![0, 2] }.validate().is_ok());
        assert!(OrganizeParams::default().validate().is_err());
        assert!(MergeParams::in_upload_order(3).validate().is_ok());
        assert!(MergeParams { file_order: vec![0] }.validate().is_err());
        assert!(MergeParams { file_order: vec![1, 1] }.validate().is_err());
    }

    #[test]
    fn params_serialise_to_backend_shape() {
        let body = serde_json::to_value(OrganizeParams { page_order: vec![2, 0, 1] }).unwrap();
        assert_eq!(body, serde_json::json!({"page_order": [2, 0, 1]}));
        let body = serde_json::to_value(MergeParams::in_upload_order(2)).unwrap();
        assert_eq!(body, serde_json::json!({"file_order": [0, 1]}));
    }

    #[test]
    fn results_tolerate_missing_fields() {
        let out: OcrOutput = serde_json::from_value(serde_json::json!({
            "total_characters": 1200,
            "language": "eng"
        }))
        .unwrap();
        assert_eq!(out.total_characters, Some(1200));
        assert!(out.json_file.is_none());

        let res: PdfImagesResults = serde_json::from_value(serde_json::json!({
            "job_id": "j",
            "images": [{"page": 1, "url": "/api/v1/pdf-to-images/jobs/j/assets/page_1.png"}]
        }))
        .unwrap();
        assert_eq!(res.images.len(), 1);
        assert_eq!(res.total_pages, 0);
    }
}
