use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::warn;

use crate::error::{ParseWarning, Result, ViewerError};

/// One line of a YOLO label file.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxRecord {
    /// Kept verbatim, may be numeric or a name.
    pub class_id: String,
    pub cx: f64, // center x (ratio 0..1 or pixels)
    pub cy: f64, // center y
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Default)]
pub struct ParsedLabels {
    pub records: Vec<BoxRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse label text. Blank and `#` lines are ignored, malformed lines are
/// skipped and reported in `warnings`. Extra tokens after the fifth are ignored.
/// A result without boxes ends with [`ParseWarning::NoBoxes`].
pub fn parse_str(text: &str) -> ParsedLabels {
    let mut parsed = ParsedLabels::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            parsed.warnings.push(ParseWarning::TooFewFields {
                line: line_no,
                content: line.to_owned(),
            });
            continue;
        }
        if let (Ok(cx), Ok(cy), Ok(w), Ok(h)) = (
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
            parts[4].parse::<f64>(),
        ) {
            parsed.records.push(BoxRecord {
                class_id: parts[0].to_owned(),
                cx,
                cy,
                w,
                h,
            });
        } else {
            parsed.warnings.push(ParseWarning::InvalidNumber {
                line: line_no,
                content: line.to_owned(),
            });
        }
    }
    if parsed.records.is_empty() {
        parsed.warnings.push(ParseWarning::NoBoxes);
    }
    parsed
}

/// Read and parse a label file. A missing or unreadable file is an error;
/// bad lines and an empty result are only logged.
pub fn parse(path: &Path) -> Result<ParsedLabels> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ViewerError::LabelsNotFound(path.to_path_buf())
        } else {
            ViewerError::LabelsUnreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let parsed = parse_str(&text);
    for warning in &parsed.warnings {
        warn!("{}: {warning}", path.display());
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_lines_in_file_order() {
        let parsed = parse_str("0 0.5 0.5 0.2 0.4\ncar 10 20 30 40 0.93\n");
        assert!(parsed.warnings.is_empty());
        assert_eq!(
            parsed.records,
            vec![
                BoxRecord { class_id: "0".into(), cx: 0.5, cy: 0.5, w: 0.2, h: 0.4 },
                BoxRecord { class_id: "car".into(), cx: 10.0, cy: 20.0, w: 30.0, h: 40.0 },
            ]
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let parsed = parse_str("# header\n\n   \n  # indented comment\n1 0.1 0.1 0.1 0.1\n");
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn short_line_is_skipped_and_parsing_continues() {
        let parsed = parse_str("1 0.1 0.1\n2 0.2 0.2 0.2 0.2\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].class_id, "2");
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::TooFewFields { line: 1, content: "1 0.1 0.1".into() }]
        );
    }

    #[test]
    fn non_numeric_values_are_skipped_with_line_number() {
        let parsed = parse_str("# c\n0 0.5 abc 0.2 0.2\n0 0.5 0.5 0.2 0.2\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(matches!(parsed.warnings[0], ParseWarning::InvalidNumber { line: 2, .. }));
    }

    #[test]
    fn only_bad_lines_yield_no_records() {
        let parsed = parse_str("1 0.1 0.1\n");
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.warnings[1], ParseWarning::NoBoxes);
    }

    #[test]
    fn empty_or_comment_only_text_warns_about_no_boxes() {
        assert_eq!(parse_str("").warnings, vec![ParseWarning::NoBoxes]);
        assert_eq!(parse_str("# only a header\n\n").warnings, vec![ParseWarning::NoBoxes]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ViewerError::LabelsNotFound(_)));
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "3 150 80 40 40\nbad\n").unwrap();
        let parsed = parse(&path).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].cx, 150.0);
        assert!(matches!(parsed.warnings[..], [ParseWarning::TooFewFields { line: 2, .. }]));
    }
}
