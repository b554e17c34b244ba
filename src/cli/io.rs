//! Line-oriented JSON I/O for the CLI
//!
//! One filter per stdin line in, one response object per stdout line out.
//! Blank lines are skipped and do not count as filters. A line that is not
//! UTF-8 or not JSON is answered with an error; only read failures stop.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// A filter read from one input line
#[derive(Debug)]
pub struct FilterLine {
    /// 1-based line number in the input
    pub line: usize,
    /// Parsed JSON, or the reason the line is not JSON
    pub filter: CliResult<Value>,
}

/// Iterator over the filters in a reader
///
/// Read failures end the stream with an I/O error. Lines that are not UTF-8
/// or not JSON are yielded as `FilterLine`s carrying an invalid-filter error
/// so the caller can answer and continue.
pub struct FilterLines<R> {
    reader: R,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> FilterLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for FilterLines<R> {
    type Item = CliResult<FilterLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let line = self.line;
            let text = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim(),
                Err(e) => {
                    return Some(Ok(FilterLine {
                        line,
                        filter: Err(CliError::invalid_filter(format!(
                            "line {}: not UTF-8: {}",
                            line, e
                        ))),
                    }))
                }
            };
            if text.is_empty() {
                continue;
            }
            let filter = serde_json::from_str::<Value>(text).map_err(|e| {
                CliError::invalid_filter(format!("line {}: invalid JSON: {}", line, e))
            });
            return Some(Ok(FilterLine { line, filter }));
        }
    }
}

/// Filters from stdin
pub fn read_filters() -> FilterLines<io::StdinLock<'static>> {
    FilterLines::new(io::stdin().lock())
}

/// The first filter on stdin
pub fn read_request() -> CliResult<Value> {
    match read_filters().next() {
        Some(line) => line?.filter,
        None => Err(CliError::io_error("no filter on stdin")),
    }
}

fn response_ok(data: Value) -> Value {
    json!({ "status": "ok", "data": data })
}

fn response_error(code: &str, message: &str) -> Value {
    json!({ "status": "error", "code": code, "message": message })
}

fn emit<W: Write>(writer: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a success response line
pub fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    emit(writer, &response_ok(data))
}

/// Write an error response line
pub fn write_error_to<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    emit(writer, &response_error(code, message))
}

/// Write plain text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;

    #[test]
    fn test_filter_lines_skip_blanks_and_number_lines() {
        let input = "{\"a\":1}\n\n   \n{\"b\":2}\n";
        let lines: Vec<_> = FilterLines::new(input.as_bytes())
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 1);
        assert_eq!(lines[1].line, 4);
        assert_eq!(lines[1].filter.as_ref().unwrap()["b"], 2);
    }

    #[test]
    fn test_filter_lines_bad_json_is_per_line() {
        let input = "{\"a\":1}\n{oops\n{\"c\":3}";
        let lines: Vec<_> = FilterLines::new(input.as_bytes())
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        let err = lines[1].filter.as_ref().unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidFilter);
        assert!(err.message().starts_with("line 2:"));
        assert!(lines[2].filter.is_ok());
    }

    #[test]
    fn test_filter_lines_non_utf8_is_per_line() {
        let mut input = b"{\"a\":1}\n".to_vec();
        input.extend_from_slice(b"{\"b\":\"\xff\xfe\"}\n");
        input.extend_from_slice(b"{\"c\":3}\n");

        let lines: Vec<_> = FilterLines::new(input.as_slice())
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        let err = lines[1].filter.as_ref().unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidFilter);
        assert!(err.message().starts_with("line 2: not UTF-8"));
        assert_eq!(lines[2].filter.as_ref().unwrap()["c"], 3);
    }

    #[test]
    fn test_response_lines() {
        let mut out = Vec::new();
        write_response_to(&mut out, json!({"slots": 2})).unwrap();
        write_error_to(&mut out, "MATCHPARAM_CLI_INVALID_FILTER", "bad").unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[0]["data"]["slots"], 2);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["code"], "MATCHPARAM_CLI_INVALID_FILTER");
    }
}
