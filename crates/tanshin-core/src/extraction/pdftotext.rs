use crate::error::TanshinError;
use crate::extraction::{PageLayout, PdfExtractor, RawCell};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::process::Command;

/// PDF layout backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -bbox-layout`, which reports every word with its
/// bounding box. Words become [`RawCell`]s; grouping into rows and
/// columns is left to the table extractor.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageLayout>, TanshinError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| TanshinError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| TanshinError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox-layout")
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TanshinError::PdftotextNotFound
                } else {
                    TanshinError::Extraction(format!("pdftotext -bbox-layout failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(TanshinError::PdftotextFailed { code, stderr });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let pages = parse_bbox_xml(&xml)?;
        tracing::debug!(
            pages = pages.len(),
            words = pages.iter().map(|p| p.cells.len()).sum::<usize>(),
            "decoded pdftotext bbox layout"
        );
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Parse `pdftotext -bbox-layout` XHTML into per-page word cells.
///
/// Pages are indexed in the order their `<page>` elements appear; the
/// output carries no page-number attribute. Words without a complete
/// bounding box are skipped.
fn parse_bbox_xml(xml: &str) -> Result<Vec<PageLayout>, TanshinError> {
    let mut reader = Reader::from_str(xml);
    let mut pages: Vec<PageLayout> = Vec::new();
    let mut word: Option<([f32; 4], String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(PageLayout {
                    page_index: pages.len(),
                    cells: Vec::new(),
                }),
                b"word" => word = word_box(&e).map(|bbox| (bbox, String::new())),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => pages.push(PageLayout {
                page_index: pages.len(),
                cells: Vec::new(),
            }),
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = word.as_mut() {
                    match t.unescape() {
                        Ok(decoded) => text.push_str(&decoded),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, text)) = word.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => {
                if let (Some(([x0, y0, x1, y1], text)), Some(page)) = (word.take(), pages.last_mut())
                {
                    let text = text.trim();
                    if !text.is_empty() {
                        page.cells
                            .push(RawCell::new(page.page_index, text, x0, y0, x1, y1));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TanshinError::Extraction(format!(
                    "malformed bbox layout at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

/// `[xMin, yMin, xMax, yMax]` of a `<word>` element.
fn word_box(e: &BytesStart<'_>) -> Option<[f32; 4]> {
    let attr = |name: &str| -> Option<f32> {
        e.try_get_attribute(name)
            .ok()??
            .unescape_value()
            .ok()?
            .trim()
            .parse()
            .ok()
    };
    Some([attr("xMin")?, attr("yMin")?, attr("xMax")?, attr("yMax")?])
}
