use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageReader, ImageEncoder};

use crate::StoreError;

pub const THUMBNAIL_MAX_DIM: u32 = 320;
const THUMBNAIL_JPEG_QUALITY: u8 = 85;

/// Decodes an image and produces a JPEG thumbnail that fits within
/// `THUMBNAIL_MAX_DIM x THUMBNAIL_MAX_DIM`, preserving aspect ratio.
/// Thumbnailing is best-effort: callers should log and continue on error
/// rather than fail the enclosing ingestion job.
pub fn generate_thumbnail(source_bytes: &[u8]) -> Result<Vec<u8>, StoreError> {
    let image = ImageReader::new(Cursor::new(source_bytes))
        .with_guessed_format()?
        .decode()?;

    let thumbnail = image.resize(THUMBNAIL_MAX_DIM, THUMBNAIL_MAX_DIM, FilterType::Lanczos3);

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, THUMBNAIL_JPEG_QUALITY);
    encoder.write_image(
        thumbnail.as_bytes(),
        thumbnail.width(),
        thumbnail.height(),
        thumbnail.color().into(),
    )?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let buf: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Vec::new();
        buf.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn shrinks_large_image_to_bounding_box() {
        let source = sample_png(1000, 500);
        let thumb = generate_thumbnail(&source).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert!(decoded.width() <= THUMBNAIL_MAX_DIM);
        assert!(decoded.height() <= THUMBNAIL_MAX_DIM);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(generate_thumbnail(b"not an image").is_err());
    }
}
