//! Core types and utilities for the crux route engine.
//!
//! This crate is intentionally small. Callers hand in raw pixel buffers
//! through [`RasterView`] / [`GrayImageView`]; filtering runs on `imageproc`
//! and never decodes files.

mod filter;
mod geometry;
mod homography;
mod image;
mod logger;

pub use filter::{gaussian_blur, gaussian_kernel, gaussian_sigma_for_kernel, pad_constant};
pub use geometry::{distance, is_simple_quad, mean_point, polygon_perimeter};
pub use homography::{homography_from_4pt, Homography};
pub use image::{GrayImage, GrayImageView, ImageError, PixelFormat, RasterView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{default_directive, init_with_level};
