//! Semicolon-delimited row reader. Yields raw field arrays lazily, one pass per open file.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecordsIntoIter};

use crate::error::{ImportError, RowError};

pub const DELIMITER: u8 = b';';
pub const QUOTE: u8 = b'"';
/// Longest accepted field; longer rows are treated as malformed.
pub const MAX_FIELD_LEN: usize = 300;

/// One row as read from the file, before any schema is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Value of the leading `id` column, if any.
    pub fn source_id(&self) -> Option<&str> {
        self.get(0).map(str::trim).filter(|id| !id.is_empty())
    }

    /// A data row whose first column literally reads `id` is a stray header.
    pub fn is_stray_header(&self) -> bool {
        self.get(0).map(str::trim) == Some("id")
    }
}

/// Why the reader could not hand out a row.
#[derive(Debug)]
pub enum ReadIssue {
    /// This row is unusable; the following rows can still be read.
    Row { line: u64, error: RowError },
    /// The file cannot be read any further.
    Fatal(ImportError),
}

/// Forward-only row stream over one file. Reopen the file to read it again.
pub struct RowReader {
    path: PathBuf,
    records: StringRecordsIntoIter<File>,
}

impl RowReader {
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        if !path.exists() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(DELIMITER)
            .quote(QUOTE)
            .from_reader(file)
            .into_records();
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Reads the first row as a header. Must be called before any data row is consumed.
    pub fn read_header(&mut self) -> Result<Vec<String>, ImportError> {
        match self.records.next() {
            Some(Ok(record)) => Ok(record.iter().map(|cell| cell.trim().to_string()).collect()),
            Some(Err(source)) => Err(ImportError::Csv {
                path: self.path.clone(),
                source,
            }),
            None => Err(ImportError::EmptyFile {
                path: self.path.clone(),
            }),
        }
    }
}

impl Iterator for RowReader {
    type Item = Result<RawRow, ReadIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Some(Err(ReadIssue::Fatal(ImportError::Csv {
                    path: self.path.clone(),
                    source: err,
                })));
            }
            Err(err) => {
                let line = err.position().map(|pos| pos.line()).unwrap_or(0);
                return Some(Err(ReadIssue::Row {
                    line,
                    error: RowError::Unparseable(err.to_string()),
                }));
            }
        };

        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if let Some(column) = record
            .iter()
            .position(|field| field.chars().count() > MAX_FIELD_LEN)
        {
            return Some(Err(ReadIssue::Row {
                line,
                error: RowError::FieldTooLong {
                    column,
                    limit: MAX_FIELD_LEN,
                },
            }));
        }

        Some(Ok(RawRow::new(line, record.iter())))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::unique_temp_dir;

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let dir = unique_temp_dir(name);
        let path = dir.join(format!("{name}.csv"));
        fs::write(&path, contents).expect("fixture should be written");
        path
    }

    #[test]
    fn reads_semicolon_rows_with_quotes() {
        let path = write_fixture("reader-quotes", "1;\"a;b\";c\n2;x;\"say \"\"hi\"\"\"\n");
        let rows: Vec<RawRow> = RowReader::open(&path)
            .expect("open")
            .map(|row| row.expect("row should parse"))
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["1", "a;b", "c"]);
        assert_eq!(rows[1].get(2), Some("say \"hi\""));
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn rows_of_different_widths_are_returned_as_is() {
        let path = write_fixture("reader-widths", "a;b\na;b;c;d\n");
        let widths: Vec<usize> = RowReader::open(&path)
            .expect("open")
            .map(|row| row.expect("row").len())
            .collect();
        assert_eq!(widths, vec![2, 4]);
    }

    #[test]
    fn overlong_field_is_a_row_issue_and_reading_continues() {
        let long = "x".repeat(MAX_FIELD_LEN + 1);
        let path = write_fixture("reader-long", &format!("1;{long}\n2;ok\n"));
        let mut reader = RowReader::open(&path).expect("open");
        match reader.next() {
            Some(Err(ReadIssue::Row {
                error: RowError::FieldTooLong { column, .. },
                ..
            })) => assert_eq!(column, 1),
            other => panic!("expected FieldTooLong, got {other:?}"),
        }
        let next = reader.next().expect("second row").expect("second row parses");
        assert_eq!(next.fields, vec!["2", "ok"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = unique_temp_dir("reader-missing").join("absent.csv");
        assert!(matches!(
            RowReader::open(&path),
            Err(ImportError::NotFound(_))
        ));
    }

    #[test]
    fn empty_file_has_no_header() {
        let path = write_fixture("reader-empty", "");
        let mut reader = RowReader::open(&path).expect("open");
        assert!(matches!(
            reader.read_header(),
            Err(ImportError::EmptyFile { .. })
        ));
    }

    #[test]
    fn stray_header_detection_trims_first_column() {
        assert!(RawRow::new(1, [" id ", "name"]).is_stray_header());
        assert!(!RawRow::new(1, ["ids", "name"]).is_stray_header());
        assert_eq!(RawRow::new(1, ["", "A"]).source_id(), None);
    }
}
