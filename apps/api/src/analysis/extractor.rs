//! Document Extractor: turns an uploaded PDF or DOCX into plain text.
//!
//! PDF: embedded text layer only, pages in document order. No OCR.
//! DOCX: the `word/document.xml` part of the package, flattened to text runs.
//!
//! Malformed input never escapes as a low-level decode error; it is reported as
//! `ExtractionError::Failed` carrying the format and byte length.

use std::fmt;
use std::io::{Cursor, Read};

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const DOCX_BODY_PART: &str = "word/document.xml";
/// Upper bound on the decompressed body part we are willing to read.
const MAX_DOCX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Maps a declared media type to a supported format.
    /// Parameters (`; charset=...`) and letter case are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE) {
            Some(DocumentFormat::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MEDIA_TYPE) {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "PDF"),
            DocumentFormat::Docx => write!(f, "DOCX"),
        }
    }
}

/// An uploaded document as received: raw bytes plus the media type the client declared.
/// Lives only for the duration of one analysis request.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    pub media_type: String,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_media_type(&self.media_type)
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document type '{media_type}'")]
    UnsupportedFormat { media_type: String },

    #[error("Failed to extract {format} text ({byte_len} bytes): {reason}")]
    Failed {
        format: DocumentFormat,
        byte_len: usize,
        reason: String,
    },
}

/// Extracts the full plain text of `document`.
///
/// Returns either non-empty text or an error; whitespace-only output counts as a failure.
pub fn extract(document: &RawDocument) -> Result<String, ExtractionError> {
    let format = document
        .format()
        .ok_or_else(|| ExtractionError::UnsupportedFormat {
            media_type: document.media_type.clone(),
        })?;
    let byte_len = document.bytes.len();
    let failed = |reason: String| ExtractionError::Failed {
        format,
        byte_len,
        reason,
    };

    let text = match format {
        DocumentFormat::Pdf => extract_pdf(&document.bytes),
        DocumentFormat::Docx => extract_docx(&document.bytes),
    }
    .map_err(failed)?;

    if text.trim().is_empty() {
        return Err(failed("no extractable text".to_string()));
    }

    debug!(
        "Extracted {} chars from {} document ({} bytes)",
        text.chars().count(),
        format,
        byte_len
    );
    Ok(text)
}

/// Runs [`extract`] on the blocking pool so decoding does not stall other requests.
/// A panic inside a decoder is reported as an extraction failure.
pub async fn extract_blocking(document: RawDocument) -> Result<String, ExtractionError> {
    let format = document
        .format()
        .ok_or_else(|| ExtractionError::UnsupportedFormat {
            media_type: document.media_type.clone(),
        })?;
    let byte_len = document.bytes.len();

    tokio::task::spawn_blocking(move || extract(&document))
        .await
        .unwrap_or_else(|join_error| {
            Err(ExtractionError::Failed {
                format,
                byte_len,
                reason: format!("decoder aborted: {join_error}"),
            })
        })
}

fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())?;
    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let xml = read_docx_body(bytes, MAX_DOCX_BODY_BYTES)?;
    document_xml_to_text(&xml)
}

/// Reads the body part in full. A part larger than `limit` is an error, never a prefix.
fn read_docx_body(bytes: &[u8], limit: u64) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("not a DOCX package: {e}"))?;
    let part = archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| format!("missing {DOCX_BODY_PART}: {e}"))?;

    let mut raw = Vec::new();
    part.take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|e| format!("unreadable {DOCX_BODY_PART}: {e}"))?;
    if raw.len() as u64 > limit {
        return Err(format!("{DOCX_BODY_PART} exceeds {limit} bytes"));
    }

    String::from_utf8(raw).map_err(|e| format!("{DOCX_BODY_PART} is not UTF-8: {e}"))
}

/// Flattens WordprocessingML into text: run text is kept, tabs and breaks become
/// `\t`/`\n`, each paragraph ends with `\n`. Everything else is dropped.
fn document_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;
    // Tab-stop definitions (<w:tabs><w:tab .../></w:tabs>) are not content.
    let mut in_tab_stops = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if !in_tab_stops => text.push('\t'),
                b"br" | b"cr" | b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let unescaped = t.unescape().map_err(|e| {
                    format!("bad text near byte {}: {e}", reader.buffer_position())
                })?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed {DOCX_BODY_PART} near byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(text)
}
