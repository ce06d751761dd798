//! Image tools: request and result types.
//!
//! Optional parameters are skipped when serialising so that the backend
//! applies its own defaults; the explicit defaults here (quality 85 or 95,
//! `maintain_aspect`, `preserve_exif`) match the values the backend would
//! use anyway.

use super::{NoUploadOptions, ToolParams};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Markers ──────────────────────────────────────────────────────────────

tool_kind!(
    ImageConverter => ImageConverter { upload: NoUploadOptions, params: ConvertParams, output: ConvertOutput }
);
tool_kind!(
    ImageCompressor => ImageCompressor { upload: NoUploadOptions, params: CompressImageParams, output: CompressImageOutput }
);
tool_kind!(
    ImageResizer => ImageResizer { upload: NoUploadOptions, params: ResizeParams, output: ResizeOutput }
);
tool_kind!(
    ImageCropper => ImageCropper { upload: NoUploadOptions, params: CropParams, output: CropOutput }
);
tool_kind!(
    ImageFilters => ImageFilters { upload: NoUploadOptions, params: FilterParams, output: FilterOutput }
);
tool_kind!(
    /// Completes synchronously: the transform response carries the result.
    ImageRotate => ImageRotate { upload: NoUploadOptions, params: RotateParams, output: TransformOutput }
);
tool_kind!(
    /// Completes synchronously and has no status endpoint.
    ImageWatermark => ImageWatermark { upload: NoUploadOptions, params: WatermarkParams, output: TransformOutput }
);

static RE_HEX_COLOUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());
static RE_ASPECT_RATIO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([1-9]\d*):([1-9]\d*)$").unwrap());

fn check_quality(quality: u8) -> Result<(), String> {
    if !(1..=100).contains(&quality) {
        return Err(format!("quality must be 1-100, got {quality}"));
    }
    Ok(())
}

// ── Shared vocabulary ────────────────────────────────────────────────────

/// Output formats the image tools can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Avif,
    Bmp,
    Tiff,
    Gif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 8] = [
        ImageFormat::Jpg,
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Avif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::Gif,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(
            self,
            ImageFormat::Jpg | ImageFormat::Jpeg | ImageFormat::Webp | ImageFormat::Avif
        )
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.');
        let s = if s.eq_ignore_ascii_case("tif") { "tiff" } else { s };
        ImageFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported image format '{s}'"))
    }
}

/// Pixel dimensions. The backend sends either `[w, h]` or `{width, height}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DimensionsRepr")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionsRepr {
    Pair(u32, u32),
    Object { width: u32, height: u32 },
}

impl From<DimensionsRepr> for Dimensions {
    fn from(r: DimensionsRepr) -> Self {
        match r {
            DimensionsRepr::Pair(width, height) | DimensionsRepr::Object { width, height } => {
                Dimensions { width, height }
            }
        }
    }
}

// ── Converter ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertParams {
    pub format: ImageFormat,
    pub quality: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size_kb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    pub preserve_exif: bool,
}

impl ConvertParams {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            quality: 85,
            target_size_kb: None,
            max_width: None,
            max_height: None,
            preserve_exif: true,
        }
    }
}

impl ToolParams for ConvertParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertOutput {
    #[serde(default)]
    pub original_format: Option<String>,
    #[serde(default)]
    pub target_format: Option<String>,
    #[serde(default)]
    pub input_size: Option<u64>,
    #[serde(default)]
    pub output_size: Option<u64>,
    #[serde(default)]
    pub size_diff_percent: Option<f64>,
    #[serde(default)]
    pub was_resized: Option<bool>,
    #[serde(default)]
    pub original_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub output_dimensions: Option<Dimensions>,
}

// ── Compressor ───────────────────────────────────────────────────────────

/// Named quality levels understood by the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressPreset {
    Maximum,
    High,
    Balanced,
    Compress,
    MaxCompress,
}

impl CompressPreset {
    /// JPEG/WebP quality the backend maps this preset to.
    pub fn quality(self) -> u8 {
        match self {
            CompressPreset::Maximum => 98,
            CompressPreset::High => 90,
            CompressPreset::Balanced => 75,
            CompressPreset::Compress => 60,
            CompressPreset::MaxCompress => 40,
        }
    }
}

impl FromStr for CompressPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "maximum" => Ok(CompressPreset::Maximum),
            "high" => Ok(CompressPreset::High),
            "balanced" => Ok(CompressPreset::Balanced),
            "compress" => Ok(CompressPreset::Compress),
            "max_compress" => Ok(CompressPreset::MaxCompress),
            other => Err(format!("unknown compression preset '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressImageParams {
    pub quality: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size_kb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<CompressPreset>,
}

impl Default for CompressImageParams {
    fn default() -> Self {
        Self {
            quality: 85,
            target_size_kb: None,
            max_width: None,
            max_height: None,
            output_format: None,
            preset: None,
        }
    }
}

impl ToolParams for CompressImageParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressImageOutput {
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub compressed_size: Option<u64>,
    #[serde(default)]
    pub reduction_percent: Option<f64>,
    #[serde(default)]
    pub compression_ratio: Option<f64>,
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub was_resized: Option<bool>,
    #[serde(default)]
    pub output_dimensions: Option<Dimensions>,
}

// ── Resizer ──────────────────────────────────────────────────────────────

/// Fixed target boxes offered by the resizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizePreset {
    #[serde(rename = "thumbnail")]
    Thumbnail,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large")]
    Large,
    #[serde(rename = "hd")]
    Hd,
    #[serde(rename = "4k")]
    UltraHd,
}

impl ResizePreset {
    pub const ALL: [ResizePreset; 6] = [
        ResizePreset::Thumbnail,
        ResizePreset::Small,
        ResizePreset::Medium,
        ResizePreset::Large,
        ResizePreset::Hd,
        ResizePreset::UltraHd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResizePreset::Thumbnail => "thumbnail",
            ResizePreset::Small => "small",
            ResizePreset::Medium => "medium",
            ResizePreset::Large => "large",
            ResizePreset::Hd => "hd",
            ResizePreset::UltraHd => "4k",
        }
    }

    /// Bounding box of the preset.
    pub fn bounds(self) -> Dimensions {
        let (w, h) = match self {
            ResizePreset::Thumbnail => (150, 150),
            ResizePreset::Small => (480, 480),
            ResizePreset::Medium => (800, 800),
            ResizePreset::Large => (1200, 1200),
            ResizePreset::Hd => (1920, 1080),
            ResizePreset::UltraHd => (3840, 2160),
        };
        Dimensions::new(w, h)
    }

    /// Largest size with the same aspect ratio as `original` that fits
    /// inside [`bounds`](Self::bounds). Never returns a zero dimension.
    pub fn fit(self, original: Dimensions) -> Dimensions {
        let bounds = self.bounds();
        if original.width == 0 || original.height == 0 {
            return bounds;
        }
        let scale = f64::min(
            bounds.width as f64 / original.width as f64,
            bounds.height as f64 / original.height as f64,
        );
        Dimensions::new(
            ((original.width as f64 * scale).round() as u32).max(1),
            ((original.height as f64 * scale).round() as u32).max(1),
        )
    }
}

impl fmt::Display for ResizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResizePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResizePreset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resize preset '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    #[default]
    Lanczos,
    Bicubic,
    Bilinear,
    Nearest,
}

impl FromStr for Resampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lanczos" => Ok(Resampling::Lanczos),
            "bicubic" => Ok(Resampling::Bicubic),
            "bilinear" => Ok(Resampling::Bilinear),
            "nearest" => Ok(Resampling::Nearest),
            other => Err(format!("unknown resampling filter '{other}'")),
        }
    }
}

/// Server priority when several are set: preset, then scale, then width/height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<ResizePreset>,
    pub maintain_aspect: bool,
    pub resampling: Resampling,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    pub quality: u8,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            scale_percent: None,
            preset: None,
            maintain_aspect: true,
            resampling: Resampling::default(),
            output_format: None,
            quality: 85,
        }
    }
}

impl ResizeParams {
    pub fn preset(preset: ResizePreset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    pub fn scale(percent: f32) -> Self {
        Self {
            scale_percent: Some(percent),
            ..Self::default()
        }
    }

    pub fn dimensions(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl ToolParams for ResizeParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)?;
        if self.preset.is_some() {
            return Ok(());
        }
        if let Some(pct) = self.scale_percent {
            if !(pct > 0.0 && pct.is_finite()) {
                return Err(format!("scale_percent must be positive, got {pct}"));
            }
            return Ok(());
        }
        match (self.width, self.height) {
            (Some(0), _) | (_, Some(0)) => Err("width and height must be non-zero".into()),
            (None, None) => {
                Err("provide a width, a height, a scale percentage or a preset".into())
            }
            (Some(_), Some(_)) => Ok(()),
            _ if !self.maintain_aspect => {
                Err("both width and height are required when the aspect ratio is not kept".into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResizeOutput {
    #[serde(default)]
    pub original_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub resized_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub resized_size: Option<u64>,
    #[serde(default)]
    pub resize_method: Option<String>,
    #[serde(default)]
    pub is_upscaling: Option<bool>,
    #[serde(default)]
    pub maintained_aspect: Option<bool>,
    #[serde(default)]
    pub output_format: Option<String>,
}

// ── Cropper ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropParams {
    pub x: u32,
    pub y: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// `W:H`, e.g. `16:9`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub center_crop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    pub quality: u8,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: None,
            height: None,
            aspect_ratio: None,
            center_crop: false,
            output_format: None,
            quality: 85,
        }
    }
}

impl ToolParams for CropParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)?;
        if let Some(ratio) = &self.aspect_ratio {
            if !RE_ASPECT_RATIO.is_match(ratio) {
                return Err(format!("aspect_ratio must look like 16:9, got '{ratio}'"));
            }
            return Ok(());
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err("crop width and height must be non-zero".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropOutput {
    #[serde(default)]
    pub original_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub cropped_dimensions: Option<Dimensions>,
    /// `(left, top, right, bottom)`
    #[serde(default)]
    pub crop_box: Option<(u32, u32, u32, u32)>,
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub cropped_size: Option<u64>,
    #[serde(default)]
    pub crop_method: Option<String>,
}

// ── Filters ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub blur: u8,
    pub sharpen: bool,
    pub edge_enhance: bool,
    pub grayscale: bool,
    pub sepia: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    pub quality: u8,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            blur: 0,
            sharpen: false,
            edge_enhance: false,
            grayscale: false,
            sepia: false,
            output_format: None,
            quality: 95,
        }
    }
}

impl ToolParams for FilterParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)?;
        for (name, v) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("sharpness", self.sharpness),
        ] {
            if !(0.0..=2.0).contains(&v) {
                return Err(format!("{name} must be within 0.0-2.0, got {v}"));
            }
        }
        if self.blur > 10 {
            return Err(format!("blur must be within 0-10, got {}", self.blur));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOutput {
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub output_size: Option<u64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub applied_filters: Vec<String>,
}

/// Decoded `GET image-filters/jobs/{id}/preview`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPreview {
    pub mime: String,
    pub bytes: Vec<u8>,
    pub format: Option<String>,
}

// ── Rotate ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotateParams {
    /// Degrees, counter-clockwise.
    pub rotation: f32,
    pub flip_h: bool,
    pub flip_v: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    pub quality: u8,
}

impl Default for RotateParams {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
            output_format: None,
            quality: 95,
        }
    }
}

impl ToolParams for RotateParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)?;
        if !self.rotation.is_finite() {
            return Err("rotation must be a finite angle".into());
        }
        Ok(())
    }
}

/// `output_info` returned by the synchronous rotate/watermark transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOutput {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, alias = "file_size")]
    pub size_bytes: Option<u64>,
}

// ── Watermark ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    Text,
    Logo,
}

/// Anchor of the watermark on a 3×3 grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl FromStr for WatermarkPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
            .map_err(|_| format!("unknown watermark position '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatermarkParams {
    #[serde(rename = "type")]
    pub kind: WatermarkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Id returned by `upload_watermark_logo`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_job_id: Option<String>,
    /// Logo width as a percentage of the image width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_scale: Option<u32>,
    pub opacity: u8,
    pub rotation: i32,
    pub position: WatermarkPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<ImageFormat>,
    pub quality: u8,
}

impl WatermarkParams {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::blank(WatermarkKind::Text)
        }
    }

    pub fn logo(logo_id: impl Into<String>) -> Self {
        Self {
            logo_job_id: Some(logo_id.into()),
            ..Self::blank(WatermarkKind::Logo)
        }
    }

    fn blank(kind: WatermarkKind) -> Self {
        Self {
            kind,
            text: None,
            text_size: None,
            text_color: None,
            logo_job_id: None,
            logo_scale: None,
            opacity: 50,
            rotation: 0,
            position: WatermarkPosition::default(),
            output_format: None,
            quality: 95,
        }
    }
}

impl ToolParams for WatermarkParams {
    fn validate(&self) -> Result<(), String> {
        check_quality(self.quality)?;
        if self.opacity > 100 {
            return Err(format!("opacity must be 0-100, got {}", self.opacity));
        }
        match self.kind {
            WatermarkKind::Text => {
                if self.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    return Err("text watermarks need non-empty text".into());
                }
                if let Some(colour) = &self.text_color {
                    if !RE_HEX_COLOUR.is_match(colour) {
                        return Err(format!("text_color must be #rrggbb, got '{colour}'"));
                    }
                }
            }
            WatermarkKind::Logo => {
                if self.logo_job_id.as_deref().map_or(true, str::is_empty) {
                    return Err("logo watermarks need a logo id from upload_watermark_logo".into());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogoUpload {
    pub logo_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn medium_preset_fits_tall_image_inside_box() {
        let fitted = ResizePreset::Medium.fit(Dimensions::new(1000, 2000));
        assert_eq!(fitted, Dimensions::new(400, 800));
        assert!(fitted.width <= 800 && fitted.height <= 800);
    }

    #[test]
    fn preset_fit_keeps_aspect_for_wide_images() {
        let fitted = ResizePreset::Hd.fit(Dimensions::new(4000, 1000));
        assert_eq!(fitted, Dimensions::new(1920, 480));
        let tiny = ResizePreset::Thumbnail.fit(Dimensions::new(3000, 1));
        assert_eq!(tiny, Dimensions::new(150, 1));
    }

    #[test]
    fn preset_names() {
        assert_eq!("4k".parse::<ResizePreset>().unwrap(), ResizePreset::UltraHd);
        assert_eq!(
            serde_json::to_value(ResizePreset::UltraHd).unwrap(),
            json!("4k")
        );
        assert_eq!(ResizePreset::Large.bounds(), Dimensions::new(1200, 1200));
    }

    #[test]
    fn resize_body_omits_unset_fields() {
        let body = serde_json::to_value(ResizeParams::preset(ResizePreset::Medium)).unwrap();
        assert_eq!(
            body,
            json!({
                "preset": "medium",
                "maintain_aspect": true,
                "resampling": "lanczos",
                "quality": 85
            })
        );
    }

    #[test]
    fn resize_needs_a_target() {
        assert!(ResizeParams::default().validate().is_err());
        assert!(ResizeParams::dimensions(Some(640), None).validate().is_ok());
        assert!(ResizeParams::scale(50.0).validate().is_ok());
        assert!(ResizeParams::scale(-1.0).validate().is_err());
        let exact = ResizeParams {
            maintain_aspect: false,
            ..ResizeParams::dimensions(Some(640), None)
        };
        assert!(exact.validate().is_err());
    }

    #[test]
    fn dimensions_accept_both_shapes() {
        let out: ResizeOutput = serde_json::from_value(json!({
            "original_dimensions": [1000, 2000],
            "resized_dimensions": {"width": 400, "height": 800}
        }))
        .unwrap();
        assert_eq!(out.original_dimensions, Some(Dimensions::new(1000, 2000)));
        assert_eq!(out.resized_dimensions, Some(Dimensions::new(400, 800)));
    }

    #[test]
    fn crop_aspect_ratio_format() {
        let ok = CropParams {
            aspect_ratio: Some("16:9".into()),
            center_crop: true,
            ..CropParams::default()
        };
        assert!(ok.validate().is_ok());
        let bad = CropParams {
            aspect_ratio: Some("16x9".into()),
            ..CropParams::default()
        };
        assert!(bad.validate().is_err());
        let zero = CropParams {
            aspect_ratio: Some("0:1".into()),
            ..CropParams::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn filter_ranges() {
        assert!(FilterParams::default().validate().is_ok());
        let bright = FilterParams {
            brightness: 2.5,
            ..FilterParams::default()
        };
        assert!(bright.validate().unwrap_err().contains("brightness"));
        let blurry = FilterParams {
            blur: 11,
            ..FilterParams::default()
        };
        assert!(blurry.validate().is_err());
    }

    #[test]
    fn watermark_requirements() {
        assert!(WatermarkParams::text("© ACME").validate().is_ok());
        assert!(WatermarkParams::text("  ").validate().is_err());
        assert!(WatermarkParams::logo("").validate().is_err());
        assert!(WatermarkParams::logo("logo-1").validate().is_ok());

        let mut coloured = WatermarkParams::text("x");
        coloured.text_color = Some("white".into());
        assert!(coloured.validate().is_err());
        coloured.text_color = Some("#FFFFFF".into());
        assert!(coloured.validate().is_ok());
    }

    #[test]
    fn watermark_body_shape() {
        let body = serde_json::to_value(WatermarkParams::text("hi")).unwrap();
        assert_eq!(body["type"], "text");
        assert_eq!(body["position"], "bottom-right");
        assert_eq!(body["opacity"], 50);
        assert!(body.get("logo_job_id").is_none());
        assert_eq!(
            "top-center".parse::<WatermarkPosition>().unwrap(),
            WatermarkPosition::TopCenter
        );
    }

    #[test]
    fn image_format_parse() {
        assert_eq!(".PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("tif".parse::<ImageFormat>().unwrap(), ImageFormat::Tiff);
        assert!("psd".parse::<ImageFormat>().is_err());
        assert!(ImageFormat::Webp.is_lossy());
        assert!(!ImageFormat::Png.is_lossy());
    }

    #[test]
    fn convert_params_defaults() {
        let body = serde_json::to_value(ConvertParams::new(ImageFormat::Webp)).unwrap();
        assert_eq!(
            body,
            json!({"format": "webp", "quality": 85, "preserve_exif": true})
        );
        let bad = ConvertParams {
            quality: 0,
            ..ConvertParams::new(ImageFormat::Jpg)
        };
        assert!(bad.validate().is_err());
    }
}
