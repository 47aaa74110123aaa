//! Text extraction for uploaded documents.
//!
//! Callers supply raw bytes plus the declared [`DocumentKind`]; this module
//! returns plain UTF-8 text ready for chunking.
//!
//! | Kind | Strategy |
//! |------|----------|
//! | `txt` | UTF-8, falling back to Latin-1 |
//! | `pdf` | `pdf-extract`, all pages concatenated in order |
//! | `docx` | `<w:t>` runs of `word/document.xml`, one line per paragraph |
//!
//! Every failure maps to [`Error::DocumentUnreadable`]; nothing panics
//! through to the caller.

use std::io::Read;

use docchat_core::models::DocumentKind;
use docchat_core::{Error, Result};
use quick_xml::events::Event;
use tracing::debug;

/// Maximum decompressed bytes read from the docx body part (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY: &str = "word/document.xml";

/// Extract plain text from `bytes` according to `kind`.
///
/// PDF parsing is CPU-bound; async callers should prefer
/// [`extract_text_blocking`].
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Txt => decode_text(bytes),
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
    }
}

/// Run [`extract_text`] on the blocking pool.
///
/// A panic inside the PDF parser surfaces as `DocumentUnreadable` instead
/// of tearing down the request.
pub async fn extract_text_blocking(bytes: Vec<u8>, kind: DocumentKind) -> Result<String> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
        .await
        .map_err(|e| Error::DocumentUnreadable(format!("{} extraction aborted: {}", kind, e)))?
}

/// Decode text bytes as UTF-8, then Latin-1.
///
/// Latin-1 maps every byte to a character, so the fallback additionally
/// rejects C0 control bytes other than tab, LF, FF and CR: such input is
/// binary data, not legacy-encoded text.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string()),
        Err(utf8_err) => {
            debug!(error = %utf8_err, "UTF-8 decode failed; trying Latin-1");
            if let Some(pos) = bytes
                .iter()
                .position(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | 0x0c | b'\r'))
            {
                return Err(Error::DocumentUnreadable(format!(
                    "not valid UTF-8 ({}) and not Latin-1 text (control byte 0x{:02x} at offset {})",
                    utf8_err, bytes[pos], pos
                )));
            }
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::DocumentUnreadable(format!("PDF extraction failed: {}", e)))
}

fn ooxml_err(e: impl std::fmt::Display) -> Error {
    Error::DocumentUnreadable(format!("DOCX extraction failed: {}", e))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)?;
    let entry = archive
        .by_name(DOCX_BODY)
        .map_err(|_| ooxml_err(format!("{} not found", DOCX_BODY)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(ooxml_err)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err(format!(
            "{} exceeds size limit ({} bytes)",
            DOCX_BODY, MAX_XML_ENTRY_BYTES
        )));
    }

    extract_w_t_elements(&xml)
}

/// Collect `<w:t>` text, emitting a newline after each `<w:p>` paragraph.
fn extract_w_t_elements(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                out.push_str(te.unescape().map_err(ooxml_err)?.as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
