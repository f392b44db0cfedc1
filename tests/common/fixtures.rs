//! Record types and image payloads for tests

use std::io::Cursor;

use detail_loader::Record;
use serde::{Deserialize, Serialize};

/// Story record as served by the mock API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    pub title: String,
    pub image_urls: Vec<String>,
}

impl Record for StoryRecord {
    fn asset_urls(&self) -> Vec<String> {
        self.image_urls.clone()
    }
}

/// Encode a blank PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    buf
}

/// Payload that is served with an image content type but does not decode
pub const NOT_AN_IMAGE: &[u8] = b"<html><body>404 page rendered as 200</body></html>";
