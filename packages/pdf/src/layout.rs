//! Layout-preserving text extraction.
//!
//! The row parser infers column boundaries from runs of whitespace, so
//! extraction must never collapse spaces. Two inputs are understood:
//!
//! - **PDF** documents, recognised by the `%PDF-` signature. Glyph
//!   positions are laid out on a character grid so column gaps survive
//!   as runs of spaces.
//! - **Layout text**, i.e. UTF-8 text whose spacing mirrors the printed
//!   columns (the output of a layout-mode text dump). Pages are separated
//!   by form feeds. Only accepted when the caller opts in with
//!   [`AcceptedFormats::PdfOrLayoutText`].
//!
//! Pages without any text are dropped.

use crate::ExtractError;

/// Signature at the start of every PDF file.
const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Page separator used by layout-mode text dumps.
const PAGE_BREAK: char = '\u{c}';

/// Number of leading bytes quoted in [`ExtractError::NotPdf`].
const PREVIEW_LEN: usize = 32;

/// Input formats a caller is willing to extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcceptedFormats {
    /// PDF documents only. Anything else, such as an HTML error page
    /// served in place of a summary, is an [`ExtractError::NotPdf`].
    #[default]
    PdfOnly,
    /// PDF documents and layout text dumps.
    PdfOrLayoutText,
}

/// Input format of a document, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// A PDF file.
    Pdf,
    /// Plain UTF-8 text with layout whitespace.
    LayoutText,
}

impl DocumentFormat {
    /// Detects the format of `bytes`.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());

        if bytes[start..].starts_with(PDF_SIGNATURE) {
            Self::Pdf
        } else {
            Self::LayoutText
        }
    }
}

/// Extracts one text block per non-empty page, in page order.
///
/// # Errors
///
/// Returns [`ExtractError::Pdf`] if a PDF cannot be parsed,
/// [`ExtractError::NotPdf`] if `accepted` only allows PDFs and the
/// signature is missing, or [`ExtractError::Encoding`] if layout text is
/// not UTF-8.
pub fn extract_pages(
    bytes: &[u8],
    accepted: AcceptedFormats,
) -> Result<Vec<String>, ExtractError> {
    let pages = match (DocumentFormat::detect(bytes), accepted) {
        (DocumentFormat::Pdf, _) => extract_pdf_pages(bytes)?,
        (DocumentFormat::LayoutText, AcceptedFormats::PdfOrLayoutText) => {
            split_text_pages(std::str::from_utf8(bytes)?)
        }
        (DocumentFormat::LayoutText, AcceptedFormats::PdfOnly) => {
            return Err(ExtractError::NotPdf {
                preview: String::from_utf8_lossy(&bytes[..bytes.len().min(PREVIEW_LEN)])
                    .into_owned(),
            });
        }
    };

    let total = pages.len();
    let pages: Vec<String> = pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect();

    if pages.len() < total {
        log::debug!("Skipped {} page(s) without text", total - pages.len());
    }

    Ok(pages)
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    log::debug!("Extracting text from {} byte PDF", bytes.len());

    let pages = crate::pdf_text::extract(bytes)?;

    log::debug!(
        "Extracted {} characters of text from {} page(s)",
        pages.iter().map(String::len).sum::<usize>(),
        pages.len()
    );

    Ok(pages)
}

fn split_text_pages(text: &str) -> Vec<String> {
    text.split(PAGE_BREAK).map(str::to_owned).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    use super::*;

    /// Builds a PDF with one page per entry. Each text run is drawn in
    /// 10pt Courier at `(x, y)`.
    pub(crate) fn pdf(pages: &[&[(f64, f64, &str)]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for runs in pages {
            let mut operations = Vec::new();
            for &(x, y, text) in *runs {
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), Object::Integer(10)]),
                    Operation::new("Td", vec![Object::from(x), Object::from(y)]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ]);
            }
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// One summary row with its five columns at fixed x offsets.
    pub(crate) fn row(y: f64, fields: [&str; 5]) -> Vec<(f64, f64, &str)> {
        [50.0, 160.0, 270.0, 420.0, 520.0]
            .into_iter()
            .zip(fields)
            .map(|(x, text)| (x, y, text))
            .collect()
    }

    #[test]
    fn detects_pdf_signature() {
        assert_eq!(DocumentFormat::detect(b"%PDF-1.7\n..."), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect(b"\r\n%PDF-1.4"), DocumentFormat::Pdf);
        assert_eq!(
            DocumentFormat::detect(b"8/1/2024 0:04   2024-1"),
            DocumentFormat::LayoutText
        );
        assert_eq!(DocumentFormat::detect(b""), DocumentFormat::LayoutText);
    }

    #[test]
    fn keeps_whitespace_runs() {
        let pages = extract_pages(b"a      b   c\n", AcceptedFormats::PdfOrLayoutText).unwrap();
        assert_eq!(pages, vec!["a      b   c\n".to_owned()]);
    }

    #[test]
    fn splits_on_form_feed_and_skips_blank_pages() {
        let pages = extract_pages(
            b"page one\n\x0c  \n \x0cpage three\n",
            AcceptedFormats::PdfOrLayoutText,
        )
        .unwrap();
        assert_eq!(pages, vec!["page one\n".to_owned(), "page three\n".to_owned()]);
    }

    #[test]
    fn empty_document_has_no_pages() {
        assert!(
            extract_pages(b"", AcceptedFormats::PdfOrLayoutText)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn pdf_only_rejects_html_error_pages() {
        let err = extract_pages(
            b"<!DOCTYPE html><html><body>403 Forbidden</body></html>",
            AcceptedFormats::PdfOnly,
        )
        .unwrap_err();

        match err {
            ExtractError::NotPdf { preview } => assert!(preview.starts_with("<!DOCTYPE html>")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_columns_survive_as_whitespace_runs() {
        let first = row(
            700.0,
            ["8/1/2024 0:04", "2024-00055419", "1345 W LINDSEY ST", "Traffic Stop", "OK0140200"],
        );
        let bytes = pdf(&[first.as_slice()]);

        let pages = extract_pages(&bytes, AcceptedFormats::PdfOnly).unwrap();

        assert_eq!(pages.len(), 1);
        let line = pages[0].lines().find(|l| !l.trim().is_empty()).unwrap();
        let columns: Vec<&str> = line
            .split("  ")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        assert_eq!(
            columns,
            vec!["8/1/2024 0:04", "2024-00055419", "1345 W LINDSEY ST", "Traffic Stop", "OK0140200"]
        );
    }

    #[test]
    fn pdf_pages_without_text_are_skipped() {
        let first = row(700.0, ["8/1/2024 0:04", "2024-1", "MAIN ST", "Alarm", "OK0140200"]);
        let third = row(700.0, ["8/1/2024 1:10", "2024-2", "ELM ST", "Burglary", "OK0140200"]);
        let bytes = pdf(&[first.as_slice(), &[], third.as_slice()]);

        let pages = extract_pages(&bytes, AcceptedFormats::PdfOnly).unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("2024-1"));
        assert!(pages[1].contains("2024-2"));
    }

    #[test]
    fn truncated_pdf_is_an_extraction_error() {
        let bytes = pdf(&[row(700.0, ["a", "b", "c", "d", "e"]).as_slice()]);
        let truncated = &bytes[..bytes.len() / 2];

        let err = extract_pages(truncated, AcceptedFormats::PdfOrLayoutText).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
