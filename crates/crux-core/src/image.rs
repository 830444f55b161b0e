/// Borrowed single-channel 8-bit image, row-major, `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image of the given size filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Copy `src` into this image with its top-left corner at `(x0, y0)`.
    ///
    /// Pixels falling outside the destination are dropped.
    pub fn blit(&mut self, src: &GrayImageView<'_>, x0: usize, y0: usize) {
        for y in 0..src.height {
            let dy = y0 + y;
            if dy >= self.height {
                break;
            }
            for x in 0..src.width {
                let dx = x0 + x;
                if dx >= self.width {
                    break;
                }
                self.data[dy * self.width + dx] = src.data[y * src.width + x];
            }
        }
    }
}

impl From<::image::GrayImage> for GrayImage {
    fn from(img: ::image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.into_raw(),
        }
    }
}

impl GrayImageView<'_> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Copy into an `image` buffer, `None` when the buffer is shorter than
    /// `width * height`.
    pub fn to_luma8(&self) -> Option<::image::GrayImage> {
        let n = self.width.checked_mul(self.height)?;
        ::image::GrayImage::from_raw(
            u32::try_from(self.width).ok()?,
            u32::try_from(self.height).ok()?,
            self.data.get(..n)?.to_vec(),
        )
    }

    /// Pixel value with out-of-bounds reads returning 0 (black).
    #[inline]
    pub fn get_or_black(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

/// Channel layout of a raw 8-bit raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Bgr8,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
        }
    }
}

/// Raster validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image has zero size (width={width}, height={height})")]
    ZeroSize { width: usize, height: usize },
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },
}

/// Borrowed decoded raster in one of the supported pixel formats.
#[derive(Clone, Copy, Debug)]
pub struct RasterView<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> RasterView<'a> {
    pub fn gray(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Gray8,
            data,
        }
    }

    pub fn rgb(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data,
        }
    }

    /// Check that the raster is non-empty and the buffer matches its dimensions.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.format.channels()))
            .ok_or(ImageError::ZeroSize {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Convert to grayscale using BT.601 luma weights.
    pub fn to_gray(&self) -> Result<GrayImage, ImageError> {
        self.validate()?;
        let data = match self.format {
            PixelFormat::Gray8 => self.data.to_vec(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
            PixelFormat::Bgr8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[2], px[1], px[0]))
                .collect(),
        };
        Ok(GrayImage {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_to_gray_uses_luma_weights() {
        let data = [255u8, 255, 255, 0, 0, 0, 255, 0, 0];
        let gray = RasterView::rgb(3, 1, &data).to_gray().expect("gray");
        assert_eq!(gray.data, vec![255, 0, 76]);
    }

    #[test]
    fn bgr_swaps_channels() {
        let rgb = RasterView::rgb(1, 1, &[0, 0, 255]).to_gray().expect("gray");
        let bgr = RasterView {
            width: 1,
            height: 1,
            format: PixelFormat::Bgr8,
            data: &[255, 0, 0],
        }
        .to_gray()
        .expect("gray");
        assert_eq!(rgb, bgr);
    }

    #[test]
    fn validate_rejects_empty_and_short_buffers() {
        assert_eq!(
            RasterView::gray(0, 10, &[]).validate(),
            Err(ImageError::ZeroSize {
                width: 0,
                height: 10
            })
        );
        assert_eq!(
            RasterView::rgb(2, 2, &[0u8; 5]).validate(),
            Err(ImageError::BufferLength {
                expected: 12,
                got: 5
            })
        );
    }

    #[test]
    fn luma8_conversion_keeps_pixels() {
        let mut img = GrayImage::filled(3, 2, 10);
        img.data[5] = 200;
        let luma = img.view().to_luma8().expect("sized");
        assert_eq!(luma.get_pixel(2, 1).0, [200]);
        assert_eq!(GrayImage::from(luma), img);

        let short = GrayImageView {
            width: 4,
            height: 4,
            data: &[0; 3],
        };
        assert!(short.to_luma8().is_none());
    }

    #[test]
    fn blit_clips_to_destination() {
        let mut dst = GrayImage::filled(4, 4, 255);
        let src = GrayImage::filled(3, 3, 0);
        dst.blit(&src.view(), 2, 2);
        assert_eq!(dst.view().get(3, 3), 0);
        assert_eq!(dst.view().get(1, 1), 255);
        assert_eq!(dst.data.iter().filter(|&&v| v == 0).count(), 4);
    }
}
