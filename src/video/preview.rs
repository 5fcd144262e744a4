use crate::errors::EncodingError;
use image::{ImageOutputFormat, RgbImage};

/// Shrink to fit within `max_width` x `max_height`, keeping the aspect ratio
pub(crate) fn resize_image(image: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();

    if width <= max_width && height <= max_height {
        return image.clone();
    }

    let ratio = (max_width as f32 / width as f32).min(max_height as f32 / height as f32);
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    image::imageops::resize(
        image,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    )
}

/// JPEG data URL of `image`
pub(crate) fn image_to_base64(image: &RgbImage) -> Result<String, EncodingError> {
    use base64::{engine::general_purpose, Engine as _};

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    image
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(85))
        .map_err(|e| EncodingError::new(format!("Failed to encode preview: {}", e)))?;

    let base64_string = general_purpose::STANDARD.encode(&buffer);
    Ok(format!("data:image/jpeg;base64,{}", base64_string))
}

/// Bounded JPEG preview of one frame
pub fn preview_data_url(
    image: &RgbImage,
    max_width: u32,
    max_height: u32,
) -> Result<String, EncodingError> {
    image_to_base64(&resize_image(image, max_width, max_height))
}
