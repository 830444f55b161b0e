//! Adapters between the `image` crate and the engine's raster views.

use std::path::Path;

use ::image::{imageops::FilterType, DynamicImage, ImageReader, RgbImage};
use crux_core::RasterView;

use crate::io::CruxIoError;

/// Resize to `width` keeping the aspect ratio; `None` leaves the image as is.
///
/// The new height is truncated, so a 4000×3000 photo becomes 1216×912.
pub fn resize_to_width(img: &DynamicImage, width: Option<u32>) -> DynamicImage {
    let Some(width) = width.filter(|&w| w > 0 && w != img.width()) else {
        return img.clone();
    };
    let scale = width as f64 / img.width().max(1) as f64;
    let height = ((img.height() as f64 * scale) as u32).max(1);
    img.resize_exact(width, height, FilterType::Triangle)
}

/// Decode an image file and normalize its width.
pub fn load_working_image(
    path: impl AsRef<Path>,
    width: Option<u32>,
) -> Result<RgbImage, CruxIoError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(resize_to_width(&img, width).to_rgb8())
}

/// Borrow an RGB image as a raster view.
pub fn rgb_view(img: &RgbImage) -> RasterView<'_> {
    RasterView::rgb(img.width() as usize, img.height() as usize, img.as_raw())
}

/// Borrow a grayscale image as a raster view.
pub fn gray_view(img: &::image::GrayImage) -> RasterView<'_> {
    RasterView::gray(img.width() as usize, img.height() as usize, img.as_raw())
}

/// Hand an engine grayscale buffer to the `image` crate, e.g. to save a PNG.
pub fn to_image_gray(img: crux_core::GrayImage) -> Option<::image::GrayImage> {
    ::image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WORKING_WIDTH;
    use ::image::{GrayImage, Luma};

    #[test]
    fn resize_keeps_aspect_ratio() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4000, 3000, Luma([128])));
        let out = resize_to_width(&img, Some(WORKING_WIDTH));
        assert_eq!((out.width(), out.height()), (1216, 912));

        let same = resize_to_width(&img, None);
        assert_eq!((same.width(), same.height()), (4000, 3000));
    }

    #[test]
    fn views_match_buffer_layout() {
        let rgb = RgbImage::new(3, 2);
        let view = rgb_view(&rgb);
        assert_eq!((view.width, view.height), (3, 2));
        assert!(view.validate().is_ok());

        let gray = to_image_gray(crux_core::GrayImage::filled(5, 4, 9)).expect("sized");
        assert_eq!(gray.get_pixel(4, 3).0, [9]);
        assert!(gray_view(&gray).validate().is_ok());
    }
}
