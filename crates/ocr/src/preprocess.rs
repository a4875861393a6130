use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Processing intensity for a normalization pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceProfile {
    /// Linear upscale factor applied before thresholding. Small glyphs
    /// recognize noticeably better at 2×.
    pub upscale: f32,
    /// Side of the square neighborhood used for the local threshold.
    /// Must be odd.
    pub block_size: u32,
    /// Bias subtracted from the local mean before comparison.
    pub bias: u8,
    /// Apply a 3×3 sharpening convolution as the final step.
    pub sharpen: bool,
}

impl Default for EnhanceProfile {
    fn default() -> Self {
        EnhanceProfile { upscale: 2.0, block_size: 21, bias: 10, sharpen: true }
    }
}

/// Load an image file, normalize it, and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(path: &Path, profile: &EnhanceProfile) -> Result<Vec<u8>, PreprocessError> {
    let img = image::open(path)?;
    encode_as_png(&normalize(&img, profile))
}

/// Full normalization pass, in fixed order: grayscale, cubic upscale,
/// local adaptive threshold, morphological closing, optional sharpen.
/// Output is binary (0/255) unless sharpening is enabled.
pub fn normalize(img: &DynamicImage, profile: &EnhanceProfile) -> GrayImage {
    let mut gray = img.to_luma8();

    if profile.upscale != 1.0 {
        let nw = ((gray.width() as f32 * profile.upscale).round() as u32).max(1);
        let nh = ((gray.height() as f32 * profile.upscale).round() as u32).max(1);
        gray = image::imageops::resize(&gray, nw, nh, FilterType::CatmullRom);
    }

    // Photographed pages have uneven illumination, so each pixel is
    // compared against its own neighborhood mean rather than a single
    // global cut.
    let thresh = adaptive_threshold(&gray, profile.block_size, profile.bias);

    // Closing fills the pinholes the threshold punches into strokes.
    let closed = erode3x3(&dilate3x3(&thresh));

    if profile.sharpen {
        #[rustfmt::skip]
        let kernel = [
            -1.0, -1.0, -1.0,
            -1.0,  9.0, -1.0,
            -1.0, -1.0, -1.0,
        ];
        image::imageops::filter3x3(&closed, &kernel)
    } else {
        closed
    }
}

/// Encode a grayscale image as PNG bytes for the OCR backend.
pub fn encode_as_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Local mean threshold over a `block_size`² window (clamped at the
/// borders). A pixel turns white iff it exceeds `mean - bias`, with the
/// threshold floored at zero so an already-black neighborhood stays
/// black and the pass is stable on binary input.
fn adaptive_threshold(gray: &GrayImage, block_size: u32, bias: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let radius = (block_size / 2) as i64;
    let integral = integral_image(gray);
    let stride = w as usize + 1;

    ImageBuffer::from_fn(w, h, |x, y| {
        let x0 = (x as i64 - radius).max(0) as usize;
        let y0 = (y as i64 - radius).max(0) as usize;
        let x1 = ((x as i64 + radius) as usize).min(w as usize - 1) + 1;
        let y1 = ((y as i64 + radius) as usize).min(h as usize - 1) + 1;

        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        let mean = sum / count;
        let threshold = mean.saturating_sub(u64::from(bias));

        if u64::from(gray.get_pixel(x, y)[0]) > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Summed-area table with a one-row/one-column zero border, so window
/// sums are four lookups.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32)[0]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    integral
}

fn dilate3x3(img: &GrayImage) -> GrayImage {
    neighborhood3x3(img, |acc, v| acc.max(v))
}

fn erode3x3(img: &GrayImage) -> GrayImage {
    neighborhood3x3(img, |acc, v| acc.min(v))
}

fn neighborhood3x3(img: &GrayImage, fold: fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = img.dimensions();
    ImageBuffer::from_fn(w, h, |x, y| {
        let mut acc = img.get_pixel(x, y)[0];
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                acc = fold(acc, img.get_pixel(nx, ny)[0]);
            }
        }
        Luma([acc])
    })
}
