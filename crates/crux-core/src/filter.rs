//! Small image filters used before marker detection.

use ::image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

use crate::{GrayImage, GrayImageView};

/// Standard deviation OpenCV derives for a Gaussian kernel of size `ksize`
/// when the caller passes `sigma = 0`.
pub fn gaussian_sigma_for_kernel(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized `ksize`-tap Gaussian using [`gaussian_sigma_for_kernel`].
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let sigma = gaussian_sigma_for_kernel(ksize);
    let half = (ksize / 2) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut k: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for w in &mut k {
        *w /= sum;
    }
    k
}

/// Separable Gaussian blur with an odd `ksize`; edge pixels are replicated
/// past the border.
///
/// `ksize <= 1` returns an unmodified copy.
pub fn gaussian_blur(src: &GrayImageView<'_>, ksize: usize) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let copy = || GrayImage {
        width: w,
        height: h,
        data: src.data.to_vec(),
    };
    if ksize <= 1 || w == 0 || h == 0 {
        return copy();
    }
    let samples: Vec<f32> = src.data.iter().map(|&v| v as f32).collect();
    let Some(f) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, samples) else {
        return copy();
    };

    let blurred = separable_filter_equal(&f, &gaussian_kernel(ksize | 1));
    GrayImage {
        width: w,
        height: h,
        data: blurred
            .into_raw()
            .into_iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect(),
    }
}

/// Surround `src` with a constant-valued border of `border` pixels on every side.
pub fn pad_constant(src: &GrayImageView<'_>, border: usize, value: u8) -> GrayImage {
    let mut out = GrayImage::filled(src.width + 2 * border, src.height + 2 * border, value);
    out.blit(src, border, border);
    out
}
