//! Binarization: a local-mean mask for candidate search and Otsu splits for
//! the cell samples of a single quad.

use crux_core::GrayImageView;
use imageproc::filter::box_filter;

/// Otsu split of a 256-bin histogram. Values `<= t` form the dark class.
///
/// Returns `None` when fewer than two distinct intensities are present.
fn otsu_from_histogram(hist: &[u32; 256]) -> Option<u8> {
    let mut lo = None;
    let mut hi = 0usize;
    let mut total = 0f64;
    let mut sum_total = 0f64;
    let mut nonzero_bins = 0u32;
    for (i, &h) in hist.iter().enumerate() {
        if h == 0 {
            continue;
        }
        lo.get_or_insert(i);
        hi = i;
        nonzero_bins += 1;
        total += h as f64;
        sum_total += (i as f64) * (h as f64);
    }
    let lo = lo?;
    if lo == hi {
        return None;
    }
    if nonzero_bins == 2 {
        return Some(((lo + hi) / 2) as u8);
    }

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = lo as u8;

    for (t, &h) in hist.iter().enumerate().take(hi) {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    Some(best_t)
}

/// Row-major mask of pixels darker than the mean of their `(2 * radius + 1)`
/// square neighbourhood by more than `offset`.
///
/// Uniform regions, bright or dark, produce no dark pixels, so a large dark
/// blob only keeps a band along its outline.
pub fn local_mean_dark_mask(img: &GrayImageView<'_>, radius: u32, offset: u8) -> Vec<bool> {
    let Some(luma) = img.to_luma8() else {
        return vec![false; img.width * img.height];
    };
    let mean = box_filter(&luma, radius, radius);
    luma.as_raw()
        .iter()
        .zip(mean.as_raw())
        .map(|(&v, &m)| i16::from(v) < i16::from(m) - i16::from(offset))
        .collect()
}

/// Threshold for a handful of cell samples. `None` when all samples agree.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> Option<u8> {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    otsu_from_histogram(&hist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![20u8; 40];
        samples.extend(std::iter::repeat_n(30u8, 10));
        samples.extend(std::iter::repeat_n(220u8, 50));
        let t = otsu_threshold_from_samples(&samples).expect("bimodal");
        assert!((30..220).contains(&t), "t={t}");
    }

    #[test]
    fn two_levels_use_midpoint() {
        assert_eq!(otsu_threshold_from_samples(&[0, 0, 255, 255]), Some(127));
    }

    #[test]
    fn constant_samples_have_no_threshold() {
        assert_eq!(otsu_threshold_from_samples(&[200u8; 16]), None);
    }

    #[test]
    fn constant_image_has_no_dark_pixels() {
        let data = vec![40u8; 64];
        let view = GrayImageView {
            width: 8,
            height: 8,
            data: &data,
        };
        assert!(local_mean_dark_mask(&view, 2, 7).iter().all(|&d| !d));
    }

    #[test]
    fn dark_spot_survives_a_brightness_ramp() {
        // horizontal ramp 60..=240 with one dark pixel on the bright side
        let (w, h) = (31, 9);
        let mut data: Vec<u8> = (0..w * h).map(|i| (60 + (i % w) * 6) as u8).collect();
        data[4 * w + 25] = 20;
        let view = GrayImageView {
            width: w,
            height: h,
            data: &data,
        };
        let mask = local_mean_dark_mask(&view, 3, 7);
        assert!(mask[4 * w + 25]);
        // the dim side of the ramp is not dark just for being dim
        assert_eq!(mask.iter().filter(|&&d| d).count(), 1);
    }
}
