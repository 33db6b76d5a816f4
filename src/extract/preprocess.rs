//! Image cleanup before recognition.
//!
//! Steps always run in the same order: denoise, contrast, deskew. Each one
//! can be switched off in the `ocr_parser.preprocessing` settings.

use std::path::Path;

use image::{GrayImage, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::config::Preprocessing;
use crate::error::Result;

/// Longest side used when estimating skew.
const SKEW_SAMPLE_SIZE: u32 = 1000;

/// Angle step of the skew search, in degrees.
const SKEW_STEP_DEGREES: f32 = 0.2;

/// Skews smaller than this are left alone.
const MIN_CORRECTION_DEGREES: f32 = 0.1;

/// Applies the configured preprocessing steps to page images.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    options: Preprocessing,
}

impl Preprocessor {
    pub fn new(options: Preprocessing) -> Self {
        Self { options }
    }

    /// True when every step is disabled.
    pub fn is_noop(&self) -> bool {
        !self.options.denoise && !self.options.contrast && !self.options.deskew
    }

    /// Run the enabled steps on an in-memory image.
    pub fn apply(&self, image: GrayImage) -> GrayImage {
        let mut image = image;

        if self.options.denoise && self.options.denoise_radius > 0 {
            let r = self.options.denoise_radius;
            image = median_filter(&image, r, r);
        }

        if self.options.contrast {
            image = equalize_histogram(&image);
        }

        if self.options.deskew {
            image = deskew(&image, self.options.max_skew_degrees);
        }

        image
    }

    /// Load an image file, preprocess it and write it back in place.
    pub fn process_file(&self, path: &Path) -> Result<()> {
        if self.is_noop() {
            return Ok(());
        }
        let image = image::open(path)?.to_luma8();
        let processed = self.apply(image);
        processed.save(path)?;
        Ok(())
    }
}

/// Rotate `image` so its text lines run horizontally.
pub fn deskew(image: &GrayImage, max_degrees: f32) -> GrayImage {
    let angle = estimate_skew(image, max_degrees);
    if angle.abs() < MIN_CORRECTION_DEGREES {
        return image.clone();
    }
    log::debug!("deskew: rotating by {:.2} degrees", -angle);
    rotate_about_center(
        image,
        -angle.to_radians(),
        Interpolation::Bilinear,
        Luma([255u8]),
    )
}

/// Estimate the clockwise rotation of the text lines, in degrees.
///
/// Projection-profile search: ink pixels are projected onto the vertical axis
/// for each candidate angle, and the angle whose profile has the sharpest
/// peaks (largest sum of squared bin counts) wins.
pub fn estimate_skew(image: &GrayImage, max_degrees: f32) -> f32 {
    let max_degrees = max_degrees.abs();
    if max_degrees == 0.0 || image.width() == 0 || image.height() == 0 {
        return 0.0;
    }

    let longest = image.width().max(image.height());
    let sample = if longest > SKEW_SAMPLE_SIZE {
        let scale = SKEW_SAMPLE_SIZE as f32 / longest as f32;
        let w = ((image.width() as f32 * scale) as u32).max(1);
        let h = ((image.height() as f32 * scale) as u32).max(1);
        image::imageops::thumbnail(image, w, h)
    } else {
        image.clone()
    };

    let ink = ink_points(&sample);
    if ink.len() < 2 {
        return 0.0;
    }

    let height = sample.height() as f32;
    let width = sample.width() as f32;
    let bins = (width.hypot(height).ceil() as usize) + 1;
    let offset = bins as f32 / 2.0;

    let steps = (max_degrees / SKEW_STEP_DEGREES).round() as i32;
    let mut best = (0.0f32, f64::MIN);
    let mut profile = vec![0u32; bins];

    for step in -steps..=steps {
        let degrees = step as f32 * SKEW_STEP_DEGREES;
        let (sin, cos) = degrees.to_radians().sin_cos();

        profile.iter_mut().for_each(|b| *b = 0);
        for &(x, y) in &ink {
            let projected = -x * sin + y * cos + offset;
            if projected >= 0.0 {
                if let Some(bin) = profile.get_mut(projected as usize) {
                    *bin += 1;
                }
            }
        }

        let score: f64 = profile.iter().map(|&c| (c as f64) * (c as f64)).sum();
        // prefer the smaller correction on equal scores
        if score > best.1 || (score == best.1 && degrees.abs() < best.0.abs()) {
            best = (degrees, score);
        }
    }

    best.0
}

/// Dark pixels, relative to the image centre.
///
/// Otsu's level is the last value of the dark class, so it is inclusive; on a
/// pure black and white page it is 0. Paper white never counts as ink.
fn ink_points(image: &GrayImage) -> Vec<(f32, f32)> {
    let threshold = otsu_level(image).min(254);
    let cx = image.width() as f32 / 2.0;
    let cy = image.height() as f32 / 2.0;

    image
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] <= threshold)
        .map(|(x, y, _)| (x as f32 - cx, y as f32 - cy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lined_page() -> GrayImage {
        let mut image = GrayImage::from_pixel(400, 300, Luma([255]));
        for line in 0..10 {
            let top = 30 + line * 24;
            for y in top..top + 3 {
                for x in 60..340 {
                    image.put_pixel(x, y, Luma([0]));
                }
            }
        }
        image
    }

    fn all_off() -> Preprocessing {
        Preprocessing {
            denoise: false,
            contrast: false,
            deskew: false,
            ..Preprocessing::default()
        }
    }

    #[test]
    fn test_straight_page_has_no_skew() {
        let angle = estimate_skew(&lined_page(), 5.0);
        assert!(angle.abs() < 0.3, "angle = {}", angle);
    }

    #[test]
    fn test_detects_rotation() {
        let rotated = rotate_about_center(
            &lined_page(),
            3.0f32.to_radians(),
            Interpolation::Nearest,
            Luma([255]),
        );
        let angle = estimate_skew(&rotated, 5.0);
        assert!((angle - 3.0).abs() < 0.5, "angle = {}", angle);

        let straightened = deskew(&rotated, 5.0);
        assert!(estimate_skew(&straightened, 5.0).abs() < 0.5);
    }

    #[test]
    fn test_two_tone_page_has_ink() {
        let mut page = GrayImage::from_pixel(100, 100, Luma([255]));
        for x in 10..90 {
            page.put_pixel(x, 50, Luma([0]));
        }
        assert_eq!(ink_points(&page).len(), 80);
    }

    #[test]
    fn test_blank_page() {
        let blank = GrayImage::from_pixel(50, 50, Luma([255]));
        assert_eq!(estimate_skew(&blank, 5.0), 0.0);
        assert_eq!(deskew(&blank, 5.0), blank);
    }

    #[test]
    fn test_disabled_steps_leave_image_untouched() {
        let preprocessor = Preprocessor::new(all_off());
        assert!(preprocessor.is_noop());
        let page = lined_page();
        assert_eq!(preprocessor.apply(page.clone()), page);
    }

    #[test]
    fn test_denoise_removes_speckle() {
        let mut page = GrayImage::from_pixel(20, 20, Luma([255]));
        page.put_pixel(10, 10, Luma([0]));

        let preprocessor = Preprocessor::new(Preprocessing {
            denoise: true,
            denoise_radius: 1,
            ..all_off()
        });
        let cleaned = preprocessor.apply(page);
        assert_eq!(cleaned.get_pixel(10, 10)[0], 255);
    }

    #[test]
    fn test_process_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        lined_page().save(&path).unwrap();

        let preprocessor = Preprocessor::new(Preprocessing::default());
        preprocessor.process_file(&path).unwrap();

        let reloaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(reloaded.dimensions(), (400, 300));
    }
}
