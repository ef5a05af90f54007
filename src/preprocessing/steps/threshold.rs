use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Binarize with a global threshold chosen by Otsu's method.
///
/// The level maximizes the between-class variance of the intensity histogram;
/// pixels brighter than it become white, the rest black. Returns the binarized
/// image and the selected level.
pub fn apply(gray: &GrayImage) -> (GrayImage, u8) {
    let level = otsu_level(gray);
    let binarized = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    (binarized, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let (result, _) = apply(&img);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_separates_text_from_background() {
        // Grey-ish background with faint dark strokes: a fixed cutoff of 128
        // would turn the whole page black.
        let mut img = GrayImage::from_pixel(60, 20, Luma([110]));
        for x in 10..50 {
            img.put_pixel(x, 10, Luma([30]));
            img.put_pixel(x, 11, Luma([30]));
        }

        let (result, level) = apply(&img);

        assert!((30..110).contains(&level), "unexpected level {}", level);
        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 3).0[0], 255);
    }
}
