//! Word-processor (`.docx`) text extraction.
//!
//! Reads `word/document.xml` out of the zip container and collects body
//! paragraph text in document order. Tables, images and styling are dropped.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use crisisdesk_shared::{CrisisDeskError, Result};

/// Path of the main document part inside the container.
const DOCUMENT_PART: &str = "word/document.xml";

/// Extract body paragraphs from a `.docx` file's bytes.
pub(crate) fn paragraphs_from_docx(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        CrisisDeskError::UnsupportedUpload(format!("not a word-processor container: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| CrisisDeskError::UnsupportedUpload(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| CrisisDeskError::UnsupportedUpload(format!("{DOCUMENT_PART}: {e}")))?;

    paragraphs_from_document_xml(&xml)
}

/// Walk WordprocessingML and return the text of each top-level `w:p`.
///
/// Paragraphs inside `w:tbl` are skipped. Within a run, `w:tab` becomes a
/// tab and `w:br`/`w:cr` a newline.
pub(crate) fn paragraphs_from_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut table_depth = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => current = Some(String::new()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" if table_depth == 0 => paragraphs.push(String::new()),
                b"tab" if in_run => push_char(&mut current, '\t'),
                b"br" | b"cr" if in_run => push_char(&mut current, '\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| {
                    CrisisDeskError::UnsupportedUpload(format!("bad text in {DOCUMENT_PART}: {e}"))
                })?;
                if let Some(p) = current.as_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"p" if table_depth == 0 => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CrisisDeskError::UnsupportedUpload(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(current: &mut Option<String>, c: char) {
    if let Some(p) = current.as_mut() {
        p.push(c);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    /// Build a minimal `.docx` container around a `w:body` fragment.
    pub(crate) fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            zip.start_file(DOCUMENT_PART, options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn paragraphs_in_order() {
        let docx = docx_with_body(
            "<w:p><w:r><w:t>First</w:t></w:r></w:p>\
             <w:p><w:r><w:t xml:space=\"preserve\">Second </w:t></w:r><w:r><w:t>part</w:t></w:r></w:p>",
        );
        let paragraphs = paragraphs_from_docx(&docx).unwrap();
        assert_eq!(paragraphs, vec!["First", "Second part"]);
    }

    #[test]
    fn empty_paragraphs_are_kept() {
        let xml = "<w:document><w:body><w:p/><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body></w:document>";
        assert_eq!(paragraphs_from_document_xml(xml).unwrap(), vec!["", "x"]);
    }

    #[test]
    fn table_text_is_dropped() {
        let xml = "<w:document><w:body>\
            <w:p><w:r><w:t>Before</w:t></w:r></w:p>\
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
            <w:p><w:r><w:t>After</w:t></w:r></w:p>\
            </w:body></w:document>";
        assert_eq!(
            paragraphs_from_document_xml(xml).unwrap(),
            vec!["Before", "After"]
        );
    }

    #[test]
    fn tabs_breaks_and_entities() {
        let xml = "<w:document><w:body><w:p>\
            <w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
            <w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C</w:t><w:br/><w:t>D</w:t></w:r>\
            </w:p></w:body></w:document>";
        assert_eq!(
            paragraphs_from_document_xml(xml).unwrap(),
            vec!["A\tB & C\nD"]
        );
    }

    #[test]
    fn non_zip_bytes_are_unsupported() {
        let err = paragraphs_from_docx(b"plain text pretending").unwrap_err();
        assert!(matches!(err, CrisisDeskError::UnsupportedUpload(_)));
    }
}
