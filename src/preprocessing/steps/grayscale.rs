use image::{DynamicImage, GrayImage};

/// Reduce any input to a single intensity channel.
pub fn apply(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}
