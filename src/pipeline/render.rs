//! PDF access via pdfium: rasterise pages and read their text layer.
//!
//! Every selected page yields a [`RenderedPage`]: the image the VLM will be
//! shown and the embedded text the classifier will read. A page that fails
//! to render is not fatal; it carries a [`PageError`] and the classifier
//! treats it as unreadable.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not safe
//! to call from async contexts. `tokio::task::spawn_blocking` moves the work
//! onto the blocking thread pool so Tokio workers don't stall while pages
//! are rendered.
//!
//! ## Locating pdfium
//!
//! `PDFIUM_LIB_PATH` (a library file, or a directory holding one) wins. Otherwise
//! a library next to the working directory is tried, then the system one.

use crate::classify::PageAssignment;
use crate::error::{LoanScanError, PageError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One page after rendering.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-indexed page ordinal.
    pub page_num: usize,
    pub image: Result<DynamicImage, PageError>,
    /// Text layer; empty for scanned pages.
    pub text: String,
}

/// Bind to a pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, LoanScanError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.trim().is_empty() => {
            let path = PathBuf::from(p.trim());
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| LoanScanError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Render the selected pages and read their text layers.
///
/// `page_indices` are 0-indexed; out-of-range indices are skipped.
pub async fn render_pages(
    pdf_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<RenderedPage>, LoanScanError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, max_pixels, password.as_deref(), &indices)
    })
    .await
    .map_err(|e| LoanScanError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<RenderedPage>, LoanScanError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }
        let page_num = idx + 1;

        let page = match pages.get(idx as u16) {
            Ok(page) => page,
            Err(e) => {
                warn!("Page {}: could not be opened: {:?}", page_num, e);
                results.push(RenderedPage {
                    page_num,
                    image: Err(PageError::RenderFailed {
                        page: page_num,
                        detail: format!("{:?}", e),
                    }),
                    text: String::new(),
                });
                continue;
            }
        };

        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                debug!("Page {}: no text layer: {:?}", page_num, e);
                String::new()
            }
        };

        let image = page
            .render_with_config(&render_config)
            .map(|bitmap| bitmap.as_image())
            .map_err(|e| PageError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            });

        match &image {
            Ok(img) => debug!(
                "Rendered page {} → {}x{} px, {} chars of text",
                page_num,
                img.width(),
                img.height(),
                text.len()
            ),
            Err(e) => warn!("{}", e),
        }

        results.push(RenderedPage {
            page_num,
            image,
            text,
        });
    }

    Ok(results)
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, LoanScanError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                LoanScanError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                LoanScanError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            LoanScanError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, LoanScanError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| LoanScanError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, LoanScanError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// File name for a labeled page copy, e.g. `p007_subject_of_fa_2.png`.
pub fn labeled_page_file_name(page_num: usize, label: &str) -> String {
    format!("p{:03}_{}.png", page_num, label)
}

/// Write one PNG per `(page, label)` into `dir`.
///
/// A page with several labels is written once per label. Unlabeled and
/// unrendered pages are skipped. Returns the written paths in page order.
pub fn write_labeled_pages(
    dir: &Path,
    pages: &[RenderedPage],
    assignments: &[PageAssignment],
) -> Result<Vec<PathBuf>, LoanScanError> {
    std::fs::create_dir_all(dir).map_err(|e| LoanScanError::LabeledPageWriteFailed {
        path: dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut written = Vec::new();
    for assignment in assignments {
        if assignment.labels.is_empty() {
            continue;
        }
        let Some(Ok(image)) = pages
            .iter()
            .find(|p| p.page_num == assignment.page)
            .map(|p| p.image.as_ref())
        else {
            continue;
        };
        for label in &assignment.labels {
            let path = dir.join(labeled_page_file_name(assignment.page, &label.to_string()));
            image
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| LoanScanError::LabeledPageWriteFailed {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }
    }
    info!("Wrote {} labeled page images to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PageLabel;
    use image::{Rgba, RgbaImage};

    fn page(num: usize) -> RenderedPage {
        RenderedPage {
            page_num: num,
            image: Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                8,
                8,
                Rgba([255, 255, 255, 255]),
            ))),
            text: String::new(),
        }
    }

    #[test]
    fn labeled_file_names_are_zero_padded() {
        assert_eq!(labeled_page_file_name(7, "subject_of_fa_2"), "p007_subject_of_fa_2.png");
        assert_eq!(labeled_page_file_name(123, "bank_copy"), "p123_bank_copy.png");
    }

    #[test]
    fn writes_one_file_per_label() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("labeled");
        let pages = vec![page(1), page(2), page(3)];
        let assignments = vec![
            PageAssignment {
                page: 1,
                labels: vec![PageLabel::whole("bank_copy")],
                error: None,
            },
            PageAssignment {
                page: 2,
                labels: vec![],
                error: None,
            },
            PageAssignment {
                page: 3,
                labels: vec![
                    PageLabel::part("subject_of_fa", 2),
                    PageLabel::whole("guarantor_details"),
                ],
                error: None,
            },
        ];
        let written = write_labeled_pages(&out, &pages, &assignments).unwrap();
        assert_eq!(written.len(), 3);
        assert!(out.join("p001_bank_copy.png").exists());
        assert!(out.join("p003_subject_of_fa_2.png").exists());
        assert!(out.join("p003_guarantor_details.png").exists());
        assert!(!out.join("p002").exists());
    }

    #[test]
    fn unrendered_pages_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![RenderedPage {
            page_num: 1,
            image: Err(PageError::RenderFailed {
                page: 1,
                detail: "boom".into(),
            }),
            text: String::new(),
        }];
        let assignments = vec![PageAssignment {
            page: 1,
            labels: vec![PageLabel::whole("bank_copy")],
            error: None,
        }];
        let written = write_labeled_pages(dir.path(), &pages, &assignments).unwrap();
        assert!(written.is_empty());
    }
}
