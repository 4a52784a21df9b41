//! Delimited tabular (`.csv`) briefings.
//!
//! The file is parsed into a header plus records and written back out as
//! plain comma-delimited text, so the prompt always sees a normalized
//! textual table.

use crisisdesk_shared::{CrisisDeskError, Result};

/// Parse CSV bytes and re-serialize them as header row + data rows.
pub(crate) fn normalize_csv(bytes: &[u8]) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers().map_err(unsupported)?.clone();
    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(&headers).map_err(unsupported)?;

    let mut rows = 0usize;
    for record in reader.records() {
        let record = record.map_err(unsupported)?;
        writer.write_record(&record).map_err(unsupported)?;
        rows += 1;
    }

    let out = writer
        .into_inner()
        .map_err(|e| CrisisDeskError::UnsupportedUpload(format!("csv writer: {}", e.error())))?;

    tracing::debug!(columns = headers.len(), rows, "tabular briefing normalized");

    String::from_utf8(out)
        .map_err(|e| CrisisDeskError::UnsupportedUpload(format!("csv output not UTF-8: {e}")))
}

fn unsupported(e: csv::Error) -> CrisisDeskError {
    CrisisDeskError::UnsupportedUpload(format!("invalid delimited file: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows_roundtrip_as_text() {
        let input = b"stakeholder,concern\nResidents, water supply\nPress,timeline\n";
        let text = normalize_csv(input).unwrap();
        assert_eq!(
            text,
            "stakeholder,concern\nResidents,water supply\nPress,timeline\n"
        );
    }

    #[test]
    fn quoted_fields_are_preserved() {
        let input = b"name,note\n\"Smith, J.\",\"said \"\"no comment\"\"\"\n";
        let text = normalize_csv(input).unwrap();
        assert!(text.contains("\"Smith, J.\""));
        assert!(text.contains("no comment"));
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let input = b"a,b,c\n1,2\n3,4,5,6\n";
        let text = normalize_csv(input).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn empty_input_is_empty_text() {
        assert_eq!(normalize_csv(b"").unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_unsupported() {
        let err = normalize_csv(b"a,b\n\xff\xfe,1\n").unwrap_err();
        assert!(matches!(err, CrisisDeskError::UnsupportedUpload(_)));
    }
}
