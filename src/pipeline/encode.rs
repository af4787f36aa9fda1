//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! PNG is lossless, which keeps NRIC and registration digits crisp. Pages are
//! sent with `detail: "high"` so GPT-4-class models tile the full page instead
//! of reading a single 512 px overview.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, warn};

use super::render::RenderedPage;

/// Encode one rendered page as a base64 PNG ready for the VLM API.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode every successfully rendered page, keyed by 1-indexed page number.
///
/// A page whose encoding fails is left out; jobs for it are reported as
/// render failures by the caller.
pub fn encode_pages(pages: &[RenderedPage]) -> HashMap<usize, ImageData> {
    let mut encoded = HashMap::with_capacity(pages.len());
    for page in pages {
        let Ok(img) = &page.image else {
            continue;
        };
        match encode_page(img) {
            Ok(data) => {
                encoded.insert(page.page_num, data);
            }
            Err(e) => warn!("Page {}: PNG encoding failed: {}", page.page_num, e),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use image::{Rgba, RgbaImage};

    fn white(n: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(n, n, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn encode_small_image() {
        let data = encode_page(&white(10)).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn failed_renders_are_not_encoded() {
        let pages = vec![
            RenderedPage {
                page_num: 1,
                image: Ok(white(4)),
                text: String::new(),
            },
            RenderedPage {
                page_num: 2,
                image: Err(PageError::RenderFailed {
                    page: 2,
                    detail: "bad xobject".into(),
                }),
                text: String::new(),
            },
        ];
        let encoded = encode_pages(&pages);
        assert!(encoded.contains_key(&1));
        assert!(!encoded.contains_key(&2));
    }
}
