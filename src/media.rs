//! Recognized media types and the checks ingest applies to them.

use std::io::Cursor;

use crate::error::ValidationError;

/// Still or animated images. Dimensions are validated at ingest.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Audio and video, stored as-is and never indexed.
pub const OTHER_EXTENSIONS: &[&str] = &["mp4", "mp3", "wav"];

/// Image types that may hold more than one frame; OCR skips them.
const MULTI_FRAME_EXTENSIONS: &[&str] = &["gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Other,
}

/// Lowercase and classify an extension. Unknown types are rejected.
pub fn classify(extension: &str) -> Result<(String, MediaKind), ValidationError> {
    let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        return Err(ValidationError::MissingExtension);
    }
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok((ext, MediaKind::Image))
    } else if OTHER_EXTENSIONS.contains(&ext.as_str()) {
        Ok((ext, MediaKind::Other))
    } else {
        Err(ValidationError::UnsupportedExtension(ext))
    }
}

/// Whether text extraction runs for this (lowercase) extension.
pub fn is_ocr_eligible(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension)
        && !MULTI_FRAME_EXTENSIONS.contains(&extension)
}

/// Read the image header and reject undecodable or zero-sized payloads.
pub fn check_image_dimensions(
    bytes: &[u8],
) -> Result<(u32, u32), ValidationError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(ValidationError::InvalidImage(format!(
            "image has zero size ({width}x{height})"
        )));
    }
    Ok((width, height))
}
