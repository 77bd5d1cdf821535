//! Image normalisation and encoding: upload bytes → RGB → base64 JPEG.
//!
//! Ollama's chat API takes images as bare base64 strings inside the JSON
//! body. Whatever the user uploads (palette PNG, RGBA screenshot, 16-bit
//! grey) is flattened to 8-bit RGB first, capped in size, and re-encoded as
//! JPEG so the request body stays small and every model sees the same input.

use crate::config::AnalysisConfig;
use crate::error::KpiLensError;
use crate::output::ImageInfo;
use crate::pipeline::input::{DashboardUpload, ImageKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, RgbImage};
use tracing::debug;

/// An image ready to be embedded in an inference request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 (standard alphabet, padded) JPEG bytes.
    pub data: String,
    pub width: u32,
    pub height: u32,
}

/// Decode raw bytes as the given container format.
pub fn decode_image(
    bytes: &[u8],
    kind: ImageKind,
    filename: &str,
) -> Result<DynamicImage, KpiLensError> {
    image::load_from_memory_with_format(bytes, kind.format()).map_err(|e| {
        KpiLensError::ImageDecodeFailed {
            filename: filename.to_string(),
            detail: e.to_string(),
        }
    })
}

/// Name a colour type the way imaging tools usually label modes.
pub fn color_mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F",
        ColorType::Rgba32F => "RGBA;F",
        _ => "unknown",
    }
}

/// Describe the decoded upload.
pub fn describe(img: &DynamicImage, upload: &DashboardUpload, kind: ImageKind) -> ImageInfo {
    ImageInfo {
        filename: upload.filename.clone(),
        format: kind.label().to_string(),
        width: img.width(),
        height: img.height(),
        color_mode: color_mode_name(img.color()).to_string(),
        size_bytes: upload.bytes.len(),
    }
}

/// Convert to 8-bit RGB and shrink so the longest edge is ≤ `max_dimension`.
///
/// Alpha is discarded, not composited. Images already within bounds keep
/// their exact dimensions.
pub fn normalize(img: &DynamicImage, max_dimension: u32) -> RgbImage {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || longest == 0 {
        return rgb;
    }

    let scale = max_dimension as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    debug!("Downscaling {}x{} → {}x{}", w, h, nw, nh);
    image::imageops::resize(&rgb, nw, nh, FilterType::Triangle)
}

/// JPEG-encode and base64-wrap an RGB image.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<EncodedImage, KpiLensError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|e| KpiLensError::Internal(format!("JPEG encoding failed: {}", e)))?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", data.len());

    Ok(EncodedImage {
        data,
        width: img.width(),
        height: img.height(),
    })
}

/// Decode, describe, normalise and encode an upload.
///
/// Runs on the blocking pool: decoding a large screenshot takes long enough
/// to stall a Tokio worker.
pub async fn prepare(
    upload: DashboardUpload,
    kind: ImageKind,
    config: &AnalysisConfig,
) -> Result<(EncodedImage, ImageInfo), KpiLensError> {
    let max_dimension = config.max_image_dimension;
    let quality = config.jpeg_quality;

    tokio::task::spawn_blocking(move || {
        let img = decode_image(&upload.bytes, kind, &upload.filename)?;
        let info = describe(&img, &upload, kind);
        let rgb = normalize(&img, max_dimension);
        let encoded = encode_jpeg(&rgb, quality)?;
        Ok((encoded, info))
    })
    .await
    .map_err(|e| KpiLensError::Internal(format!("Encode task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn rgba_png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([10, 200, 30, 128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn decode_reports_original_mode() {
        let bytes = rgba_png(8, 4);
        let upload = DashboardUpload::new("kpi.png", bytes.clone());
        let img = decode_image(&bytes, ImageKind::Png, "kpi.png").unwrap();
        let info = describe(&img, &upload, ImageKind::Png);
        assert_eq!(info.color_mode, "RGBA");
        assert_eq!((info.width, info.height), (8, 4));
        assert_eq!(info.format, "PNG");
        assert_eq!(info.size_bytes, bytes.len());
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let mut bytes = rgba_png(4, 4);
        bytes.truncate(20);
        let err = decode_image(&bytes, ImageKind::Png, "kpi.png").unwrap_err();
        assert!(matches!(err, KpiLensError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn normalize_caps_longest_edge() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(400, 100));
        let rgb = normalize(&img, 200);
        assert_eq!(rgb.dimensions(), (200, 50));
    }

    #[test]
    fn normalize_keeps_small_images() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(30, 20));
        assert_eq!(normalize(&img, 200).dimensions(), (30, 20));
    }

    #[test]
    fn encode_produces_jpeg_base64() {
        let rgb = RgbImage::from_pixel(10, 10, image::Rgb([255, 0, 0]));
        let data = encode_jpeg(&rgb, 90).expect("encode should succeed");
        assert_eq!((data.width, data.height), (10, 10));
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[tokio::test]
    async fn prepare_runs_whole_chain() {
        let upload = DashboardUpload::new("kpi.png", rgba_png(3000, 1500));
        let config = AnalysisConfig::default();
        let (encoded, info) = prepare(upload, ImageKind::Png, &config).await.unwrap();
        assert_eq!((info.width, info.height), (3000, 1500));
        assert_eq!((encoded.width, encoded.height), (2048, 1024));
    }
}
