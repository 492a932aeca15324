//! Column-preserving PDF text output.
//!
//! [`pdf_extract`]'s plain text output writes a single space for any
//! horizontal gap, which erases the column boundaries the row parser relies
//! on. [`ColumnLayout`] receives positioned glyphs instead and lays each
//! page out on a character grid: glyphs sharing a baseline form a line, and
//! a wide gap between glyphs becomes a run of spaces proportional to its
//! width (at least two), aligned to the glyph's grid column where possible.

use std::panic::{AssertUnwindSafe, catch_unwind};

use pdf_extract::{Document, MediaBox, OutputDev, OutputError, Transform};

use crate::ExtractError;

/// Gaps up to this fraction of the font size join glyphs directly.
const JOIN_GAP: f64 = 0.1;

/// Baselines closer than this fraction of the font size share a line.
const BASELINE_TOLERANCE: f64 = 0.5;

/// Grid cell width (in points) when a page has no measurable glyphs.
const FALLBACK_CELL: f64 = 6.0;

/// Extracts one layout text block per page, in page order. Pages without
/// text yield empty strings.
///
/// # Errors
///
/// Returns [`ExtractError::Pdf`] if the document cannot be loaded or its
/// content cannot be interpreted.
pub fn extract(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|e| ExtractError::Pdf(format!("failed to load PDF: {e}")))?;

    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| ExtractError::Pdf(format!("failed to decrypt PDF: {e}")))?;
    }

    let mut layout = ColumnLayout::default();

    // pdf-extract panics on some malformed page trees.
    let result = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::output_doc(&doc, &mut layout)
    }))
    .map_err(|_| ExtractError::Pdf("PDF content could not be interpreted".to_owned()))?;

    result.map_err(|e| ExtractError::Pdf(format!("failed to extract text from PDF: {e}")))?;

    Ok(layout.pages)
}

#[derive(Debug, Clone)]
struct Glyph {
    x: f64,
    y: f64,
    end: f64,
    size: f64,
    text: String,
}

/// [`OutputDev`] that renders each page as whitespace-aligned text.
#[derive(Debug, Default)]
struct ColumnLayout {
    glyphs: Vec<Glyph>,
    pages: Vec<String>,
}

impl OutputDev for ColumnLayout {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.glyphs.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        let glyphs = std::mem::take(&mut self.glyphs);
        self.pages.push(render_page(glyphs));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        let scale = trm.m11.mul_add(trm.m22, -(trm.m12 * trm.m21)).abs().sqrt();
        let size = font_size * scale;

        self.glyphs.push(Glyph {
            x: trm.m31,
            y: trm.m32,
            end: width.mul_add(size, trm.m31),
            size,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

fn render_page(mut glyphs: Vec<Glyph>) -> String {
    if glyphs.is_empty() {
        return String::new();
    }

    let cell = cell_width(&glyphs);
    let origin = glyphs.iter().map(|g| g.x).fold(f64::INFINITY, f64::min);

    // Top of the page first; PDF y grows upwards.
    glyphs.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut page = String::new();
    let mut line: Vec<Glyph> = Vec::new();
    for glyph in glyphs {
        let same_line = line.first().is_some_and(|first| {
            (first.y - glyph.y).abs() <= first.size.max(1.0) * BASELINE_TOLERANCE
        });
        if !same_line && !line.is_empty() {
            render_line(&mut page, std::mem::take(&mut line), origin, cell);
        }
        line.push(glyph);
    }
    render_line(&mut page, line, origin, cell);

    page
}

fn render_line(page: &mut String, mut line: Vec<Glyph>, origin: f64, cell: f64) {
    line.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut text = String::new();
    let mut cursor = 0usize;
    let mut last_end: Option<f64> = None;

    for glyph in line {
        let target = grid_columns(glyph.x - origin, cell);
        let pad = match last_end {
            None => target,
            Some(end) => {
                let gap = glyph.x - end;
                let by_gap = grid_columns(gap, cell);
                if gap <= glyph.size * JOIN_GAP {
                    0
                } else if by_gap < 2 {
                    1
                } else {
                    by_gap.max(target.saturating_sub(cursor))
                }
            }
        };

        text.extend(std::iter::repeat_n(' ', pad));
        text.push_str(&glyph.text);
        cursor += pad + glyph.text.chars().count();
        last_end = Some(glyph.end);
    }

    page.push_str(text.trim_end());
    page.push('\n');
}

/// Median glyph advance, used as the width of one grid column.
fn cell_width(glyphs: &[Glyph]) -> f64 {
    let mut widths: Vec<f64> = glyphs
        .iter()
        .map(|g| g.end - g.x)
        .filter(|w| *w > 0.0)
        .collect();

    if widths.is_empty() {
        return FALLBACK_CELL;
    }

    widths.sort_by(f64::total_cmp);
    widths[widths.len() / 2]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_columns(distance: f64, cell: f64) -> usize {
    (distance / cell).round().max(0.0) as usize
}
