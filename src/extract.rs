// src/extract.rs

use crate::document::Document;
use crate::ocr::{OcrEngine, OcrError};
use lopdf::Document as PdfDocument;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("PDF text extraction crashed: {0}")]
    Panicked(String),
}

/// How extraction went. Only `Ok` means the text is trustworthy; the other
/// two are warnings for the presentation layer, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Ok,
    /// The PDF has no text layer and appears to be image-only.
    ScannedPdf,
    /// Extraction raised; `text` is empty.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub status: ExtractionStatus,
}

impl Extraction {
    fn failed(err: ExtractError) -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Failed(err.to_string()),
        }
    }
}

/// Main entry point: never fails, a broken upload degrades to empty text.
pub fn extract(document: &Document, ocr: &dyn OcrEngine) -> Extraction {
    let result = if document.kind().is_image() {
        info!(kind = ?document.kind(), "Extracting text from image");
        extract_text_from_image(document.bytes(), ocr).map(|text| Extraction {
            text,
            status: ExtractionStatus::Ok,
        })
    } else {
        extract_text_from_pdf(document.bytes())
    };

    match result {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(error = %e, "Extraction failed — continuing with empty text");
            Extraction::failed(e)
        }
    }
}

/// Concatenate each page's text in the document's native page order.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<Extraction, ExtractError> {
    let doc = PdfDocument::load_mem(pdf_bytes)?;
    let pages = doc.get_pages();

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!(page = page_num, error = %e, "Page text extraction failed"),
        }
    }

    let mut crash = None;
    if text.trim().is_empty() {
        // lopdf can miss text drawn with unusual font encodings
        match extract_with_pdf_extract(pdf_bytes) {
            Ok(Ok(fallback)) => text = fallback,
            Ok(Err(e)) => warn!(error = %e, "pdf-extract fallback failed"),
            Err(reason) => {
                warn!(reason = %reason, "pdf-extract fallback panicked");
                crash = Some(reason);
            }
        }
    }

    if text.trim().is_empty() {
        if looks_like_scanned(&doc) {
            info!("PDF has no text layer and looks scanned");
            return Ok(Extraction {
                text: String::new(),
                status: ExtractionStatus::ScannedPdf,
            });
        }
        if let Some(reason) = crash {
            return Err(ExtractError::Panicked(reason));
        }
    }

    info!(pages = pages.len(), chars = text.chars().count(), "Text extracted from PDF");
    Ok(Extraction {
        text,
        status: ExtractionStatus::Ok,
    })
}

/// pdf-extract panics on some malformed font setups (a `Tf` naming a font
/// missing from the resources, a font without `BaseFont`). The panic is
/// turned into an `Err` carrying its message.
fn extract_with_pdf_extract(
    pdf_bytes: &[u8],
) -> Result<Result<String, pdf_extract::OutputError>, String> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(pdf_bytes)
    }))
    .map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

/// Decode to 8-bit RGB and run OCR over the bitmap.
pub fn extract_text_from_image(
    image_bytes: &[u8],
    ocr: &dyn OcrEngine,
) -> Result<String, ExtractError> {
    let bitmap = image::load_from_memory(image_bytes)?.to_rgb8();
    info!(width = bitmap.width(), height = bitmap.height(), "Image decoded");
    Ok(ocr.recognize(&bitmap)?)
}

/// Heuristic: inspect the PDF object tree for signs that every page
/// is just a single image with no text operators.
///
/// A page with XObject images but **no** Font resources is almost
/// certainly a scanned page.
fn looks_like_scanned(doc: &PdfDocument) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let mut image_only_pages = 0;

    for object_id in pages.values() {
        let Ok(page_dict) = doc.get_dictionary(*object_id) else {
            continue;
        };

        let resources = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok());

        let has_entry = |key: &[u8]| {
            resources
                .and_then(|res| res.get(key).ok())
                .and_then(|o| doc.dereference(o).ok())
                .and_then(|(_, resolved)| resolved.as_dict().ok())
                .is_some_and(|d| !d.is_empty())
        };

        if has_entry(b"XObject") && !has_entry(b"Font") {
            image_only_pages += 1;
        }
    }

    let ratio = image_only_pages as f64 / pages.len() as f64;
    info!(
        total_pages = pages.len(),
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    // ≥80% image-only pages means the whole PDF is treated as scanned
    ratio >= 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;
    use crate::report::{ReportLayout, render_report};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use lopdf::{Dictionary, Object, Stream, dictionary};
    use std::io::Cursor;

    struct CannedOcr(&'static str);

    impl OcrEngine for CannedOcr {
        fn recognize(&self, _image: &RgbImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _image: &RgbImage) -> Result<String, OcrError> {
            Err(OcrError::Failed {
                code: 1,
                stderr: "boom".to_string(),
            })
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// A single-page PDF with the given resources and content stream.
    fn single_page_pdf(resources: Dictionary, content: &[u8]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn helvetica() -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        }
    }

    /// One page that only paints an image: no fonts, one XObject.
    fn scanned_pdf() -> Vec<u8> {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        );
        single_page_pdf(
            dictionary! {
                "XObject" => dictionary! { "Im1" => Object::Stream(image) },
            },
            b"q 100 0 0 100 0 0 cm /Im1 Do Q",
        )
    }

    #[test]
    fn test_garbage_pdf_bytes() {
        let doc = Document::new(b"this is not a pdf".to_vec(), DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));
        assert!(result.text.is_empty());
        assert!(matches!(result.status, ExtractionStatus::Failed(_)));
    }

    #[test]
    fn test_pdf_pages_in_order() {
        let layout = ReportLayout::default();
        let per_page = layout.lines_per_page();
        let mut summary = String::from("Invoice header");
        for _ in 1..per_page {
            summary.push('\n');
        }
        summary.push_str("\nGrand total");

        let report = render_report(&summary, &layout).unwrap();
        let doc = Document::new(report.bytes, DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));

        assert_eq!(result.status, ExtractionStatus::Ok);
        let header = result.text.find("Invoice").unwrap();
        let total = result.text.find("Grand").unwrap();
        assert!(header < total);
    }

    #[test]
    fn test_scanned_pdf_is_flagged() {
        let doc = Document::new(scanned_pdf(), DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));
        assert!(result.text.is_empty());
        assert_eq!(result.status, ExtractionStatus::ScannedPdf);
    }

    #[test]
    fn test_image_goes_through_ocr() {
        let doc = Document::new(png_bytes(), DocumentKind::Png);
        let result = extract(&doc, &CannedOcr("GSTIN 22AAAAA0000A1Z5"));
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert_eq!(result.text, "GSTIN 22AAAAA0000A1Z5");
    }

    #[test]
    fn test_undecodable_image_degrades() {
        let doc = Document::new(b"not an image".to_vec(), DocumentKind::Jpg);
        let result = extract(&doc, &CannedOcr("never reached"));
        assert!(result.text.is_empty());
        assert!(matches!(result.status, ExtractionStatus::Failed(_)));
    }

    #[test]
    fn test_ocr_failure_degrades() {
        let doc = Document::new(png_bytes(), DocumentKind::Png);
        let result = extract(&doc, &BrokenOcr);
        assert!(result.text.is_empty());
        match result.status {
            ExtractionStatus::Failed(reason) => assert!(reason.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_page_uses_fallback() {
        // lopdf finds no text, pdf-extract runs and finds none either
        let pdf = single_page_pdf(
            dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
            b"",
        );
        let doc = Document::new(pdf, DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert!(result.text.trim().is_empty());
    }

    #[test]
    fn test_font_without_base_font_does_not_crash() {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
        };
        let pdf = single_page_pdf(
            dictionary! { "Font" => dictionary! { "F1" => font } },
            b"BT /F1 12 Tf ET",
        );
        let doc = Document::new(pdf, DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));
        assert!(result.text.is_empty());
        assert!(matches!(result.status, ExtractionStatus::Failed(_)));
    }

    #[test]
    fn test_unknown_font_reference_does_not_crash() {
        let pdf = single_page_pdf(
            dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
            b"BT /F9 12 Tf 10 10 Td (Hello) Tj ET",
        );
        let doc = Document::new(pdf, DocumentKind::Pdf);
        let result = extract(&doc, &CannedOcr("unused"));
        match result.status {
            ExtractionStatus::Failed(_) => assert!(result.text.is_empty()),
            ExtractionStatus::Ok => {}
            other => panic!("unexpected status {other:?}"),
        }
    }
}
