//! Plain-text extraction for PDF, DOCX and TXT uploads.

use std::io::{Cursor, Read};
use std::panic::{catch_unwind, AssertUnwindSafe};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file extension '{0}'")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ExtractionFailed(String),
}

/// Accepted upload formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Resolves the format from a filename's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractionError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "txt" => Ok(DocumentFormat::Txt),
            _ => Err(ExtractionError::UnsupportedFormat(ext)),
        }
    }
}

/// Extracts plain text from an uploaded document.
///
/// Paragraphs are joined with `\n`. An empty but well-formed document yields `""`.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    let format = DocumentFormat::from_filename(filename)?;
    debug!("Extracting {:?} text from {} bytes", format, bytes.len());

    match format {
        DocumentFormat::Txt => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let result = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            warn!("PDF extraction failed: {e}");
            Err(ExtractionError::ExtractionFailed(
                "Could not read PDF document".to_string(),
            ))
        }
        Err(_) => {
            warn!("PDF extraction panicked on malformed input");
            Err(ExtractionError::ExtractionFailed(
                "Could not read PDF document".to_string(),
            ))
        }
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let failed = |what: &str| {
        warn!("DOCX extraction failed: {what}");
        ExtractionError::ExtractionFailed("Could not read DOCX document".to_string())
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| failed(&e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| failed(&e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| failed(&e.to_string()))?;

    document_xml_to_text(&xml).map_err(|e| failed(&e))
}

/// Walks `word/document.xml` in document order. Table cells hold their own `<w:p>`
/// paragraphs, so they come out interleaved with body paragraphs where they appear.
fn document_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => current.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(paragraphs.join("\n").trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    const DOCX_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Jane Candidate</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Skills: </w:t></w:r><w:r><w:t>Python &amp; SQL</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Acme</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>2019</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:p><w:r><w:t>References on request</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(DocumentFormat::from_filename("cv.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("a.b.docx").unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_filename("notes.txt").unwrap(), DocumentFormat::Txt);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            extract_text(b"hello", "cv.doc"),
            Err(ExtractionError::UnsupportedFormat(ext)) if ext == "doc"
        ));
        assert!(matches!(
            extract_text(b"hello", "README"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_txt_passthrough_and_empty() {
        assert_eq!(extract_text(b"line one\nline two", "cv.txt").unwrap(), "line one\nline two");
        assert_eq!(extract_text(b"", "empty.txt").unwrap(), "");
    }

    #[test]
    fn test_txt_invalid_utf8_is_lossy() {
        let text = extract_text(&[b'o', b'k', 0xFF], "cv.txt").unwrap();
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_docx_paragraphs_and_tables_in_order() {
        let bytes = build_docx(DOCX_XML);
        let text = extract_text(&bytes, "cv.docx").unwrap();
        assert_eq!(
            text,
            "Jane Candidate\nSkills: Python & SQL\nAcme\n2019\nReferences on request"
        );
    }

    #[test]
    fn test_empty_docx_is_empty_string() {
        let bytes = build_docx(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body/></w:document>"#,
        );
        assert_eq!(extract_text(&bytes, "blank.docx").unwrap(), "");
    }

    #[test]
    fn test_corrupt_docx_fails() {
        assert!(matches!(
            extract_text(b"definitely not a zip", "cv.docx"),
            Err(ExtractionError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn test_corrupt_pdf_fails() {
        assert!(matches!(
            extract_text(b"%PDF-garbage", "cv.pdf"),
            Err(ExtractionError::ExtractionFailed(_))
        ));
    }
}
