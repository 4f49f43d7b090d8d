//! Image preprocessing for OCR: Otsu binarization blended with grayscale.
//!
//! Pure binarization throws away anti-aliasing the recognizer can still use,
//! so the output keeps 60 % of the grayscale signal and 40 % of the binary
//! one.

use image::{Rgba, RgbaImage};

/// Weight of the grayscale image in the blend; the binary image gets the rest.
pub const BLEND_GRAY_RATIO: f32 = 0.6;

/// Luminance of a pixel; fully transparent pixels count as white.
fn luminance(px: &Rgba<u8>) -> u8 {
    let [r, g, b, a] = px.0;
    if a == 0 {
        return 255;
    }
    let lum = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    lum.round().clamp(0.0, 255.0) as u8
}

/// Otsu's threshold over a 256-bucket histogram.
///
/// Returns the cut point `t` maximizing the between-class variance of
/// `{lum <= t}` and `{lum > t}`.
pub fn otsu_threshold(histogram: &[u64; 256]) -> u8 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0f64;
    let mut best = (0u8, -1f64);

    for (t, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * count as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (weighted_total - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best.1 {
            best = (t as u8, between);
        }
    }
    best.0
}

/// Binarize `img` for OCR. Output has the same dimensions; degenerate
/// (empty) images are returned unchanged.
pub fn binarize(img: &RgbaImage) -> RgbaImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }

    let lums: Vec<u8> = img.pixels().map(luminance).collect();
    let mut histogram = [0u64; 256];
    for &l in &lums {
        histogram[l as usize] += 1;
    }
    let threshold = otsu_threshold(&histogram);

    let mut out = RgbaImage::new(img.width(), img.height());
    for (px, &lum) in out.pixels_mut().zip(&lums) {
        let binary = if lum > threshold { 255.0 } else { 0.0 };
        let v = (BLEND_GRAY_RATIO * lum as f32 + (1.0 - BLEND_GRAY_RATIO) * binary)
            .round()
            .clamp(0.0, 255.0) as u8;
        *px = Rgba([v, v, v, 255]);
    }
    out
}
