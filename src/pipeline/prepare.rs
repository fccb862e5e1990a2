//! Image preparation: fit a rendered page under the vision API's upload ceiling.
//!
//! A page is tried as lossless PNG first, since crisp glyph edges matter
//! more than bytes for reading lyric underlay. Only when PNG cannot fit even
//! at the lowest DPI does it fall back to lossy JPEG, and only when no JPEG
//! quality fits does it halve the pixel dimensions.
//!
//! The search never fails on size: the last candidate is returned even if
//! it is still over the ceiling.

use crate::config::ImageLimits;
use crate::error::LyricsError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// An encoded page image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// DPI the page was rendered at.
    pub dpi: u32,
    pub width: u32,
    pub height: u32,
}

/// A prepared image tagged with its 1-indexed page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPage {
    pub page: usize,
    pub image: PreparedImage,
}

/// Render a page via `render(dpi)` and shrink it until it fits `limits.max_bytes`.
///
/// 1. PNG at `start_dpi`, then `start_dpi - dpi_step`, … while not below `min_dpi`
/// 2. JPEG of the last render at `start_quality`, stepping down to `min_quality`
/// 3. JPEG at `fallback_quality` of the last render halved in both dimensions
pub fn fit_to_limit<F>(mut render: F, limits: &ImageLimits) -> Result<PreparedImage, LyricsError>
where
    F: FnMut(u32) -> Result<DynamicImage, LyricsError>,
{
    // Public fields can bypass the builder; a zero step would never terminate.
    let dpi_step = limits.dpi_step.max(1);
    let quality_step = i32::from(limits.quality_step.max(1));

    let mut dpi = limits.start_dpi;
    let (image, png) = loop {
        let image = render(dpi)?;
        let png = encode_png(&image)?;
        if png.len() <= limits.max_bytes {
            debug!("PNG at {} DPI fits: {} bytes", dpi, png.len());
            return Ok(prepared(png, "image/png", dpi, &image));
        }
        match dpi.checked_sub(dpi_step) {
            Some(next) if next >= limits.min_dpi => {
                debug!(
                    "Image too large ({:.1} MB), reducing to {} DPI",
                    megabytes(png.len()),
                    next
                );
                dpi = next;
            }
            _ => break (image, png),
        }
    };

    debug!(
        "PNG still {:.1} MB at {} DPI, falling back to JPEG",
        megabytes(png.len()),
        dpi
    );
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    let mut quality = i32::from(limits.start_quality);
    while quality >= i32::from(limits.min_quality) {
        let jpeg = encode_jpeg(&rgb, quality as u8)?;
        if jpeg.len() <= limits.max_bytes {
            debug!(
                "Compressed to {:.1} MB with quality {}",
                megabytes(jpeg.len()),
                quality
            );
            return Ok(prepared(jpeg, "image/jpeg", dpi, &rgb));
        }
        quality -= quality_step;
    }

    let half = rgb.resize_exact(
        (rgb.width() / 2).max(1),
        (rgb.height() / 2).max(1),
        FilterType::Lanczos3,
    );
    let jpeg = encode_jpeg(&half, limits.fallback_quality)?;
    if jpeg.len() > limits.max_bytes {
        warn!(
            "Half-size JPEG is still {} bytes (limit {}); sending it anyway",
            jpeg.len(),
            limits.max_bytes
        );
    }
    Ok(prepared(jpeg, "image/jpeg", dpi, &half))
}

pub(crate) fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    match img {
        DynamicImage::ImageRgb8(_) => img.write_with_encoder(encoder)?,
        // JPEG has no alpha channel.
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?,
    }
    Ok(buf)
}

fn prepared(bytes: Vec<u8>, mime_type: &'static str, dpi: u32, img: &DynamicImage) -> PreparedImage {
    PreparedImage {
        bytes,
        mime_type,
        dpi,
        width: img.width(),
        height: img.height(),
    }
}

fn megabytes(n: usize) -> f64 {
    n as f64 / 1024.0 / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Grey-level noise whose side grows with DPI; PNG cannot compress it.
    fn noise(dpi: u32) -> DynamicImage {
        let side = dpi * 2;
        let mut state: u32 = 0x2545_F491 ^ dpi;
        let img = RgbImage::from_fn(side, side, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let v = (state >> 24) as u8;
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn limits(max_bytes: usize) -> ImageLimits {
        ImageLimits {
            max_bytes,
            ..ImageLimits::default()
        }
    }

    #[test]
    fn fits_at_start_dpi_without_rerender() {
        let mut calls = Vec::new();
        let out = fit_to_limit(
            |dpi| {
                calls.push(dpi);
                Ok(noise(dpi))
            },
            &limits(usize::MAX),
        )
        .unwrap();
        assert_eq!(calls, vec![200]);
        assert_eq!(out.mime_type, "image/png");
        assert_eq!(out.dpi, 200);
    }

    #[test]
    fn steps_dpi_down_until_png_fits() {
        let at_150 = encode_png(&noise(150)).unwrap().len();
        let at_200 = encode_png(&noise(200)).unwrap().len();
        assert!(at_200 > at_150);

        let mut calls = Vec::new();
        let out = fit_to_limit(
            |dpi| {
                calls.push(dpi);
                Ok(noise(dpi))
            },
            &limits(at_150),
        )
        .unwrap();
        assert_eq!(calls, vec![200, 150]);
        assert_eq!(out.mime_type, "image/png");
        assert_eq!(out.dpi, 150);
        assert!(out.bytes.len() <= at_150);
    }

    #[test]
    fn never_renders_below_min_dpi() {
        let mut calls = Vec::new();
        let _ = fit_to_limit(
            |dpi| {
                calls.push(dpi);
                Ok(noise(dpi))
            },
            &limits(1),
        )
        .unwrap();
        assert_eq!(calls, vec![200, 150, 100]);
    }

    #[test]
    fn jpeg_ladder_respects_ceiling_when_a_quality_fits() {
        let rgb = DynamicImage::ImageRgb8(noise(100).to_rgb8());
        let ceiling = encode_jpeg(&rgb, 55).unwrap().len();
        assert!(encode_png(&noise(100)).unwrap().len() > ceiling);

        let out = fit_to_limit(|dpi| Ok(noise(dpi)), &limits(ceiling)).unwrap();
        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(out.dpi, 100);
        assert_eq!(out.width, 200);
        assert!(out.bytes.len() <= ceiling);
    }

    #[test]
    fn impossible_ceiling_still_returns_half_size_jpeg() {
        let out = fit_to_limit(|dpi| Ok(noise(dpi)), &limits(1)).unwrap();
        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!((out.width, out.height), (100, 100));
        assert!(!out.bytes.is_empty());
        assert!(out.bytes.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn zero_steps_still_terminate() {
        let zero_steps = ImageLimits {
            max_bytes: 1,
            dpi_step: 0,
            quality_step: 0,
            ..ImageLimits::default()
        };
        let mut calls = Vec::new();
        let out = fit_to_limit(
            |dpi| {
                calls.push(dpi);
                Ok(noise(dpi))
            },
            &zero_steps,
        )
        .unwrap();
        assert_eq!(calls.len(), 101);
        assert_eq!(calls.last(), Some(&100));
        assert_eq!(out.mime_type, "image/jpeg");
    }

    #[test]
    fn render_errors_propagate() {
        let err = fit_to_limit(
            |_| {
                Err(LyricsError::RasterisationFailed {
                    page: 1,
                    detail: "boom".into(),
                })
            },
            &limits(usize::MAX),
        )
        .unwrap_err();
        assert!(matches!(err, LyricsError::RasterisationFailed { .. }));
    }
}
