//! Pixel buffer encodings handed to OCR engines.
//!
//! PNG is used everywhere: it is lossless, and compression artefacts on
//! small print hurt recognition more than payload size does.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a pixel buffer as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Base64 of the PNG encoding.
pub fn encode_png_base64(img: &RgbaImage) -> Result<String, image::ImageError> {
    let b64 = STANDARD.encode(encode_png(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(b64)
}

/// `data:image/png;base64,...` URL for the alternate OCR input encoding.
pub fn to_png_data_url(img: &RgbaImage) -> Result<String, image::ImageError> {
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", encode_png_base64(img)?))
}

/// Split a base64 data URL into `(mime, payload)`.
///
/// Returns `None` for anything that is not a base64 `data:` URL.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    if mime.is_empty() || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

/// Decode an uploaded PNG/JPEG into a pixel buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    image::load_from_memory(bytes).map(DynamicImage::into_rgba8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn png_bytes_have_signature() {
        let png = encode_png(&sample()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn data_url_shape() {
        let url = to_png_data_url(&sample()).unwrap();
        let (mime, payload) = split_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decode_image(&decoded).unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn rejects_non_data_urls() {
        assert_eq!(split_data_url("https://x/y.png"), None);
        assert_eq!(split_data_url("data:image/png,raw"), None);
        assert_eq!(split_data_url("data:;base64,AAAA"), None);
    }

    #[test]
    fn garbage_image_fails_to_decode() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
