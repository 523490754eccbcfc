//! Streaming CSV transformer that appends a `has_email` column.
//!
//! Rows are read and written one at a time through the `csv` crate, so the
//! whole document is never held in memory. The first non-blank row is the
//! header and gets the literal [`HAS_EMAIL_COLUMN`] appended; every later
//! non-blank row gets `true`/`false` depending on whether any of its fields
//! looks like an email address.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};

use crate::email::row_has_likely_email;

/// Name of the column appended to the header row.
pub const HAS_EMAIL_COLUMN: &str = "has_email";

/// Failure while transforming a document.
///
/// `line` is the 1-based source line of the offending record when known.
/// The rendered message is what ends up on a failed job.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("read error{}: {message}", at_line(.line))]
    Read { line: Option<u64>, message: String },

    #[error("write error{}: {message}", at_line(.line))]
    Write { line: Option<u64>, message: String },
}

fn at_line(line: &Option<u64>) -> String {
    match line {
        Some(n) => format!(" at line {n}"),
        None => String::new(),
    }
}

/// Quote structure violation found in the raw input.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct MalformedQuote {
    line: u64,
    message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Reader adapter that enforces strict RFC 4180 quoting on the bytes it
/// passes through.
///
/// A quote may only open a field, and a closing quote must be followed by
/// another quote, a delimiter or a line end. Violations surface as an
/// `InvalidData` I/O error wrapping [`MalformedQuote`].
struct StrictQuotes<R> {
    inner: R,
    state: QuoteState,
    line: u64,
    quote_line: u64,
}

impl<R> StrictQuotes<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            state: QuoteState::FieldStart,
            line: 1,
            quote_line: 1,
        }
    }

    fn scan(&mut self, bytes: &[u8]) -> Result<(), MalformedQuote> {
        use QuoteState::*;

        for &b in bytes {
            self.state = match (self.state, b) {
                (Quoted, b'"') => QuoteInQuoted,
                (Quoted, _) => Quoted,
                (QuoteInQuoted, b'"') => Quoted,
                (FieldStart, b'"') => {
                    self.quote_line = self.line;
                    Quoted
                }
                (Unquoted, b'"') => {
                    return Err(MalformedQuote {
                        line: self.line,
                        message: "bare \" in non-quoted field",
                    })
                }
                (_, b',' | b'\n' | b'\r') => FieldStart,
                (QuoteInQuoted, _) => {
                    return Err(MalformedQuote {
                        line: self.line,
                        message: "extraneous or missing \" in quoted field",
                    })
                }
                (FieldStart | Unquoted, _) => Unquoted,
            };
            if b == b'\n' {
                self.line += 1;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), MalformedQuote> {
        if self.state == QuoteState::Quoted {
            return Err(MalformedQuote {
                line: self.quote_line,
                message: "unterminated quoted field",
            });
        }
        Ok(())
    }
}

impl<R: Read> Read for StrictQuotes<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let checked = if n == 0 {
            self.finish()
        } else {
            self.scan(&buf[..n])
        };
        checked.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(n)
    }
}

fn read_error(e: csv::Error) -> TransformError {
    if let csv::ErrorKind::Io(io_err) = e.kind() {
        if let Some(quote) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MalformedQuote>())
        {
            return TransformError::Read {
                line: Some(quote.line),
                message: quote.message.to_string(),
            };
        }
    }
    TransformError::Read {
        line: e.position().map(|p| p.line()),
        message: e.to_string(),
    }
}

/// Counters gathered while transforming. The header row is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Data rows written to the destination.
    pub rows_written: u64,
    /// Data rows whose appended value was `true`.
    pub rows_with_email: u64,
}

/// A row is blank when it has no fields, or a single field that is empty
/// after trimming. Blank rows are dropped from the output entirely.
pub fn is_blank_row(record: &StringRecord) -> bool {
    match record.len() {
        0 => true,
        1 => record[0].trim().is_empty(),
        _ => false,
    }
}

/// Transform delimited rows from `reader` into `writer`.
///
/// Quoting is strict: a quote inside an unquoted field, text after a closing
/// quote, or an unterminated quoted field is a read error.
/// Every non-blank row must have as many fields as the header row. Any
/// read, parse or write failure aborts the whole operation; whatever was
/// written to `writer` up to that point must not be used.
pub fn transform_rows<R: Read, W: Write>(
    reader: R,
    writer: W,
) -> Result<TransformSummary, TransformError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(StrictQuotes::new(reader));
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    let mut summary = TransformSummary::default();
    let mut header_len: Option<usize> = None;
    let mut record = StringRecord::new();

    loop {
        let more = reader.read_record(&mut record).map_err(read_error)?;
        if !more {
            break;
        }
        if is_blank_row(&record) {
            continue;
        }

        let line = record.position().map(|p| p.line());

        match header_len {
            None => {
                header_len = Some(record.len());
                record.push_field(HAS_EMAIL_COLUMN);
            }
            Some(expected) => {
                if record.len() != expected {
                    return Err(TransformError::Read {
                        line,
                        message: format!(
                            "expected {expected} fields, found {}",
                            record.len()
                        ),
                    });
                }
                let has_email = row_has_likely_email(record.iter());
                record.push_field(if has_email { "true" } else { "false" });

                summary.rows_written += 1;
                if has_email {
                    summary.rows_with_email += 1;
                }
            }
        }

        writer
            .write_record(&record)
            .map_err(|e| TransformError::Write {
                line,
                message: e.to_string(),
            })?;
    }

    writer.flush().map_err(|e| TransformError::Write {
        line: None,
        message: e.to_string(),
    })?;

    Ok(summary)
}

/// Transform the file at `input` into a newly created (or truncated) file
/// at `output`.
///
/// This is blocking I/O; async callers should run it on a blocking thread.
pub fn transform_file(input: &Path, output: &Path) -> Result<TransformSummary, TransformError> {
    let source = File::open(input).map_err(|e| TransformError::Read {
        line: None,
        message: format!("cannot open input file: {e}"),
    })?;
    let destination = File::create(output).map_err(|e| TransformError::Write {
        line: None,
        message: format!("cannot create output file: {e}"),
    })?;

    let summary = transform_rows(source, destination)?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        rows_written = summary.rows_written,
        rows_with_email = summary.rows_with_email,
        "CSV transform finished",
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io;

    use assert_matches::assert_matches;

    use super::*;

    fn run(input: &str) -> String {
        let mut out = Vec::new();
        transform_rows(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    /// A sink that rejects every write.
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    // -- is_blank_row --------------------------------------------------------

    #[test]
    fn blank_row_detection() {
        assert!(is_blank_row(&StringRecord::new()));
        assert!(is_blank_row(&record(&[""])));
        assert!(is_blank_row(&record(&["   "])));
        assert!(!is_blank_row(&record(&["x"])));
        assert!(!is_blank_row(&record(&["", ""])));
    }

    // -- transform_rows ------------------------------------------------------

    #[test]
    fn appends_header_and_detection_column() {
        assert_eq!(
            run("name,email\nJohn,john@example.com"),
            "name,email,has_email\nJohn,john@example.com,true\n"
        );
    }

    #[test]
    fn address_without_dotted_suffix_is_false() {
        assert_eq!(
            run("name,email\nBob,bob@invalid-email"),
            "name,email,has_email\nBob,bob@invalid-email,false\n"
        );
    }

    #[test]
    fn mixed_rows_keep_order() {
        let input = "name,email,phone,company
John Doe,john.doe@example.com,555-1234,Acme Corp
Jane Smith,jane.smith@company.org,555-5678,Tech Inc
Bob Johnson,bob@invalid-email,555-9012,Startup LLC
Alice Brown,alice.brown@domain.co.uk,555-3456,Global Ltd
Charlie Wilson,charlie@test.com,555-7890,Local Business
David Lee,david.lee@email.net,555-2468,Enterprise Corp";

        let output = run(input);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "name,email,phone,company,has_email");

        let flags: Vec<&str> = lines[1..]
            .iter()
            .map(|l| l.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(flags, ["true", "true", "false", "true", "true", "true"]);

        for (input_line, output_line) in input.lines().skip(1).zip(&lines[1..]) {
            assert!(output_line.starts_with(input_line));
        }
    }

    #[test]
    fn blank_rows_are_dropped_and_not_counted() {
        let input = "name,email\n\nJohn,john@example.com\n   \n\nBob,none\n";
        let mut out = Vec::new();
        let summary = transform_rows(input.as_bytes(), &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,email,has_email\nJohn,john@example.com,true\nBob,none,false\n"
        );
        assert_eq!(
            summary,
            TransformSummary {
                rows_written: 2,
                rows_with_email: 1,
            }
        );
    }

    #[test]
    fn leading_blank_rows_do_not_become_the_header() {
        assert_eq!(run("\n  \nname\nx@example.com\n"), "name,has_email\nx@example.com,true\n");
    }

    #[test]
    fn header_only_input() {
        assert_eq!(
            run("name,email,phone,company"),
            "name,email,phone,company,has_email\n"
        );
    }

    #[test]
    fn header_is_never_checked_for_emails() {
        assert_eq!(run("owner@example.com\n"), "owner@example.com,has_email\n");
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let mut out = Vec::new();
        let summary = transform_rows(&b""[..], &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(summary, TransformSummary::default());
    }

    #[test]
    fn quoted_fields_survive() {
        assert_eq!(
            run("name,email\n\"Doe, John\",\"john@example.com\"\n"),
            "name,email,has_email\n\"Doe, John\",john@example.com,true\n"
        );
    }

    #[test]
    fn crlf_input_is_normalised() {
        assert_eq!(
            run("name,email\r\nJohn,john@example.com\r\n"),
            "name,email,has_email\nJohn,john@example.com,true\n"
        );
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let input = "a,b\n1,x@y.io\n\n2,nope\n";
        let mut first = Vec::new();
        let mut second = Vec::new();
        transform_rows(input.as_bytes(), &mut first).unwrap();
        transform_rows(input.as_bytes(), &mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn field_count_mismatch_is_a_read_error() {
        let err = transform_rows(&b"a,b\n1,2\n3\n"[..], Vec::new()).unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(3), .. });
        assert_eq!(err.to_string(), "read error at line 3: expected 2 fields, found 1");
    }

    #[test]
    fn escaped_quotes_are_accepted() {
        assert_eq!(
            run("name,email\n\"Jo\"\"hn\",john@example.com\n"),
            "name,email,has_email\n\"Jo\"\"hn\",john@example.com,true\n"
        );
    }

    #[test]
    fn quoted_field_may_span_lines() {
        assert_eq!(
            run("note,email\n\"first\nsecond\",x@example.com\n"),
            "note,email,has_email\n\"first\nsecond\",x@example.com,true\n"
        );
    }

    #[test]
    fn bare_quote_in_unquoted_field_is_a_read_error() {
        let err = transform_rows(&b"name,email\nJo\"hn,john@example.com\n"[..], Vec::new())
            .unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(2), .. });
        assert_eq!(err.to_string(), "read error at line 2: bare \" in non-quoted field");
    }

    #[test]
    fn text_after_closing_quote_is_a_read_error() {
        let err = transform_rows(&b"name,email\n\"Jo\"hn,john@example.com\n"[..], Vec::new())
            .unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(2), .. });
        assert_eq!(
            err.to_string(),
            "read error at line 2: extraneous or missing \" in quoted field"
        );
    }

    #[test]
    fn space_before_opening_quote_is_a_read_error() {
        let err = transform_rows(&b"a,b\n1, \"2\"\n"[..], Vec::new()).unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(2), .. });
    }

    #[test]
    fn unterminated_quote_reports_its_opening_line() {
        let err = transform_rows(&b"a,b\n1,2\n\"open,x\n3,4\n"[..], Vec::new()).unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(3), .. });
        assert_eq!(err.to_string(), "read error at line 3: unterminated quoted field");
    }

    #[test]
    fn quote_errors_count_lines_inside_quoted_fields() {
        let input = "a,b\n\"multi\nline\",1\nx,y\"z\n";
        let err = transform_rows(input.as_bytes(), Vec::new()).unwrap_err();

        assert_matches!(err, TransformError::Read { line: Some(4), .. });
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let err = transform_rows(&b"name,email\n\xff\xfe,x@example.com\n"[..], Vec::new())
            .unwrap_err();

        assert_matches!(err, TransformError::Read { .. });
    }

    #[test]
    fn failing_destination_is_a_write_error() {
        let err = transform_rows(&b"name\nx@example.com\n"[..], BrokenSink).unwrap_err();

        assert_matches!(err, TransformError::Write { .. });
        assert!(err.to_string().contains("disk full"));
    }

    // -- transform_file ------------------------------------------------------

    #[test]
    fn transforms_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        std::fs::write(&input, "name,email\nJohn,john@example.com").unwrap();

        let summary = transform_file(&input, &output).unwrap();

        assert_eq!(summary.rows_written, 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "name,email,has_email\nJohn,john@example.com,true\n"
        );
    }

    #[test]
    fn empty_file_produces_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        std::fs::write(&input, "").unwrap();

        transform_file(&input, &output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn two_destinations_get_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&input, "id,contact\n1,a..b@example.com\n2,\n").unwrap();

        transform_file(&input, &first).unwrap();
        transform_file(&input, &second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn missing_input_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = transform_file(
            &dir.path().join("does-not-exist.csv"),
            &dir.path().join("output.csv"),
        )
        .unwrap_err();

        assert_matches!(err, TransformError::Read { line: None, .. });
    }

    #[test]
    fn uncreatable_output_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        std::fs::write(&input, "name\n").unwrap();

        let err = transform_file(&input, &dir.path().join("missing").join("output.csv"))
            .unwrap_err();

        assert_matches!(err, TransformError::Write { line: None, .. });
    }
}
