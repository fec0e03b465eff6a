//! Normalizes uploaded pictures into a single compressed format.
//!
//! Every accepted payload is re-encoded as JPEG at a fixed quality, so the
//! blob store only ever holds one format regardless of what clients send.

use bytes::Bytes;
use image::ImageOutputFormat;
use std::io::Cursor;
use thiserror::Error;

/// Declared MIME types accepted for upload, checked before decoding.
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Maximum accepted input payload: 50 MiB.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Content type of every transcoded payload.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Quality applied to every re-encode.
const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaKind(String),
    #[error("payload of {0} bytes exceeds the upload limit")]
    TooLarge(usize),
    #[error("re-encoding failed: {0}")]
    TranscodeFailure(String),
}

/// Re-encode an uploaded picture as JPEG.
///
/// Disallowed declared types are rejected without ever invoking the decoder,
/// and the size cap is enforced before any processing. The same input yields
/// the same output up to encoder internals.
pub fn transcode_to_jpeg(bytes: &Bytes, declared_mime: &str) -> Result<Bytes, TranscodeError> {
    let mime = declared_mime
        .split(';')
        .next()
        .unwrap_or(declared_mime)
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(TranscodeError::UnsupportedMediaKind(
            declared_mime.to_string(),
        ));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(TranscodeError::TooLarge(bytes.len()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|err| TranscodeError::UnsupportedMediaKind(format!("{mime}: {err}")))?;

    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|err| TranscodeError::TranscodeFailure(err.to_string()))?;

    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png_fixture() -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([120, 60, 200])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    #[test]
    fn reencodes_png_as_jpeg() {
        let out = transcode_to_jpeg(&png_fixture(), "image/png").unwrap();
        assert!(!out.is_empty());
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn ignores_mime_parameters() {
        let out = transcode_to_jpeg(&png_fixture(), "image/png; charset=binary").unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn rejects_disallowed_declared_type_without_decoding() {
        let result = transcode_to_jpeg(&png_fixture(), "application/pdf");
        assert!(matches!(
            result,
            Err(TranscodeError::UnsupportedMediaKind(_))
        ));
    }

    #[test]
    fn rejects_undecodable_payload() {
        let result = transcode_to_jpeg(&Bytes::from_static(b"not an image"), "image/png");
        assert!(matches!(
            result,
            Err(TranscodeError::UnsupportedMediaKind(_))
        ));
    }

    #[test]
    fn rejects_oversized_payload_before_decoding() {
        let oversized = Bytes::from(vec![0u8; MAX_UPLOAD_BYTES + 1]);
        let result = transcode_to_jpeg(&oversized, "image/jpeg");
        assert!(matches!(result, Err(TranscodeError::TooLarge(_))));
    }
}
