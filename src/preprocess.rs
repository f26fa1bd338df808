//! Image normalization ahead of OCR.
//!
//! Screenshots of light text on a dark background recognize poorly, so
//! mostly-dark images are hard-inverted to a black-on-white bitmap before
//! the sharpening pass.

use image::{DynamicImage, Rgb, RgbImage, imageops};
use rayon::prelude::*;

use crate::config::{
    ArchiveConfig,
    DARK_CHANNEL_THRESHOLD,
    DARK_FRACTION_CUTOFF,
    SHARPEN_SIGMA,
    SHARPEN_THRESHOLD,
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Result of preparing an image for recognition.
#[derive(Debug)]
pub struct Prepared {
    pub image: RgbImage,
    pub dark_fraction: f32,
    pub inverted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    dark_threshold: u8,
    dark_fraction_cutoff: f32,
    sharpen_sigma: f32,
    sharpen_threshold: i32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            dark_threshold: DARK_CHANNEL_THRESHOLD,
            dark_fraction_cutoff: DARK_FRACTION_CUTOFF,
            sharpen_sigma: SHARPEN_SIGMA,
            sharpen_threshold: SHARPEN_THRESHOLD,
        }
    }
}

impl Preprocessor {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            dark_threshold: config.dark_threshold,
            dark_fraction_cutoff: config.dark_fraction,
            sharpen_sigma: config.sharpen_sigma,
            sharpen_threshold: config.sharpen_threshold,
        }
    }

    /// Convert to RGB, invert if mostly dark, then unsharp-mask.
    pub fn prepare(&self, image: &DynamicImage) -> Prepared {
        let mut rgb = image.to_rgb8();
        let dark_fraction = dark_fraction(&rgb, self.dark_threshold);
        let inverted = dark_fraction > self.dark_fraction_cutoff;
        if inverted {
            invert_dark(&mut rgb, self.dark_threshold);
        }
        let image =
            imageops::unsharpen(&rgb, self.sharpen_sigma, self.sharpen_threshold);
        Prepared {
            image,
            dark_fraction,
            inverted,
        }
    }
}

/// A pixel is dark when every channel is below `threshold`.
pub fn is_dark(pixel: &Rgb<u8>, threshold: u8) -> bool {
    pixel.0.iter().all(|&c| c < threshold)
}

/// Fraction of dark pixels in `image`, `0.0` for an empty image.
pub fn dark_fraction(image: &RgbImage, threshold: u8) -> f32 {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let dark = image
        .as_raw()
        .par_chunks_exact(3)
        .filter(|px| px.iter().all(|&c| c < threshold))
        .count();
    dark as f32 / total as f32
}

/// Binary inversion: dark pixels become white, everything else black.
pub fn invert_dark(image: &mut RgbImage, threshold: u8) {
    for pixel in image.pixels_mut() {
        *pixel = if is_dark(pixel, threshold) { WHITE } else { BLACK };
    }
}
