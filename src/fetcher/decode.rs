//! Image payload validation.

use image::{GenericImageView, ImageFormat};

use crate::error::FetchError;
use crate::types::AssetRef;

/// A fetched image whose payload is known to decode
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    /// Where the image came from (including its position in the record)
    pub reference: AssetRef,
    /// Format detected from the payload's magic bytes
    pub format: ImageFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// The encoded payload as received
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("reference", &self.reference)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Validate that `bytes` hold a decodable image and wrap them as an [`Image`].
///
/// The format is sniffed from the payload rather than trusted from headers;
/// servers routinely mislabel image content types.
pub fn decode_image(reference: &AssetRef, bytes: Vec<u8>) -> Result<Image, FetchError> {
    if bytes.is_empty() {
        return Err(FetchError::Decode(format!(
            "empty payload for {}",
            reference.url()
        )));
    }

    let format = image::guess_format(&bytes).map_err(|e| {
        FetchError::Decode(format!("unrecognized image format for {}: {}", reference.url(), e))
    })?;
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        FetchError::Decode(format!("failed to decode {}: {}", reference.url(), e))
    })?;
    let (width, height) = GenericImageView::dimensions(&decoded);

    Ok(Image {
        reference: reference.clone(),
        format,
        width,
        height,
        bytes,
    })
}

/// Run [`decode_image`] on the blocking pool
///
/// Decoding is CPU-bound; offloading it keeps the tokio worker threads free to
/// drive the other fetches of a fan-out. A panicking decoder becomes a decode
/// failure of this asset only.
pub async fn decode_image_blocking(
    reference: &AssetRef,
    bytes: Vec<u8>,
) -> Result<Image, FetchError> {
    let owned = reference.clone();
    tokio::task::spawn_blocking(move || decode_image(&owned, bytes))
        .await
        .map_err(|e| {
            FetchError::Decode(format!("decode task for {} failed: {}", reference.url(), e))
        })?
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn test_decodes_png_dimensions_and_format() {
        let reference = AssetRef::new(2, "https://cdn.example.com/a.png");

        let image = decode_image(&reference, png_bytes(4, 3)).unwrap();

        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (4, 3));
        assert_eq!(image.reference.index(), 2);
    }

    #[test]
    fn test_empty_payload_is_a_decode_failure() {
        let reference = AssetRef::new(0, "https://cdn.example.com/empty.png");

        let err = decode_image(&reference, Vec::new()).unwrap_err();

        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_html_error_page_is_a_decode_failure() {
        let reference = AssetRef::new(0, "https://cdn.example.com/a.png");
        let body = b"<html><body>Service Unavailable</body></html>".to_vec();

        let err = decode_image(&reference, body).unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_truncated_png_is_a_decode_failure() {
        let reference = AssetRef::new(0, "https://cdn.example.com/a.png");
        let mut bytes = png_bytes(8, 8);
        bytes.truncate(20);

        let err = decode_image(&reference, bytes).unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_debug_output_omits_payload() {
        let reference = AssetRef::new(0, "https://cdn.example.com/a.png");
        let image = decode_image(&reference, png_bytes(1, 1)).unwrap();

        let debug = format!("{:?}", image);

        assert!(debug.contains("len"));
        assert!(!debug.contains("bytes"));
    }

    #[tokio::test]
    async fn test_blocking_decode_returns_image() {
        let reference = AssetRef::new(1, "https://cdn.example.com/b.png");

        let image = decode_image_blocking(&reference, png_bytes(5, 2)).await.unwrap();

        assert_eq!((image.width, image.height), (5, 2));
        assert_eq!(image.reference, reference);
    }

    #[tokio::test]
    async fn test_blocking_decode_reports_decode_failure() {
        let reference = AssetRef::new(0, "https://cdn.example.com/b.png");

        let err = decode_image_blocking(&reference, b"not an image".to_vec())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_decode_leaves_runtime_free() {
        // A single worker thread: an inline decode would starve the ticker
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = std::sync::Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };
        let reference = AssetRef::new(0, "https://cdn.example.com/big.png");
        let bytes = png_bytes(256, 256);
        let before = ticks.load(std::sync::atomic::Ordering::SeqCst);

        let image = decode_image_blocking(&reference, bytes).await.unwrap();

        ticker.abort();
        assert_eq!(image.width, 256);
        assert!(
            ticks.load(std::sync::atomic::Ordering::SeqCst) > before,
            "runtime thread should keep running other tasks during the decode"
        );
    }
}
