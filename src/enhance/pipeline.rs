use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbaImage};
use thiserror::Error;

use super::compositor::composite_cover;
use super::dimensions::Dimensions;
use super::sharpen::{sharpen, SharpenSettings};

/// Label appended to artifact names, after the dimension suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Enhanced,
    AiUpscaled,
}

impl ArtifactKind {
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Enhanced => "enhanced",
            ArtifactKind::AiUpscaled => "AI_upscaled",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to encode output image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("encoder produced no output bytes")]
    EmptyOutput,
}

/// Local enhancement path: cover-fit composite, Laplacian sharpen, JPEG encode.
pub fn enhance_to_jpeg(
    source: &DynamicImage,
    dims: Dimensions,
    settings: SharpenSettings,
    quality: u8,
) -> Result<Vec<u8>, PipelineError> {
    let canvas = composite_cover(source, dims);
    sharpen_and_encode(canvas, settings, quality)
}

/// Tail of the local path, for callers that already hold the composited
/// canvas (the AI fallback reuses the buffer it uploaded from).
pub fn sharpen_and_encode(
    mut canvas: RgbaImage,
    settings: SharpenSettings,
    quality: u8,
) -> Result<Vec<u8>, PipelineError> {
    sharpen(&mut canvas, settings);
    encode_jpeg(&canvas, quality)
}

/// Encodes an already-composited canvas as JPEG. Alpha is dropped via an RGB
/// conversion first; the compositor guarantees opaque output anyway.
pub fn encode_jpeg(canvas: &RgbaImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;

    if bytes.is_empty() {
        return Err(PipelineError::EmptyOutput);
    }
    Ok(bytes)
}

/// `"{stem}_{suffix}_{enhanced|AI_upscaled}.jpg"`
pub fn artifact_file_name(stem: &str, suffix: &str, kind: ArtifactKind) -> String {
    format!("{}_{}_{}.jpg", stem, suffix, kind.label())
}
