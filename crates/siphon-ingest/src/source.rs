//! Record sources
//!
//! Opens one input file and yields its records in order. The parser is keyed
//! by file extension: `.csv` streams through the csv crate, `.ndjson` and
//! `.jsonl` stream line-wise, and everything else streams as a JSON array of
//! objects. Every variant is incremental, so input size never dictates
//! resident memory.

use crate::config::CsvOptions;
use crate::error::{ImportError, Result};
use crate::record::Record;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Ordered stream of records from one input file
pub struct RecordSource {
    inner: SourceKind,
}

enum SourceKind {
    Csv {
        records: csv::StringRecordsIntoIter<File>,
        // One entry per column: Some(header) when the column survives the
        // include/exclude filters, None when it is dropped.
        columns: Vec<Option<String>>,
    },
    JsonArray(JsonArrayStream),
    JsonLines(Lines<BufReader<File>>),
}

/// Incremental reader over a JSON array of objects.
///
/// Elements are parsed one at a time straight off the buffered reader, so an
/// arbitrarily large array never materializes in memory.
struct JsonArrayStream {
    reader: BufReader<File>,
    first: bool,
    done: bool,
}

impl JsonArrayStream {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| open_error(path, &e))?;
        let mut reader = BufReader::new(file);
        match peek_non_ws(&mut reader)? {
            Some(b'[') => {
                reader.consume(1);
                Ok(Self {
                    reader,
                    first: true,
                    done: false,
                })
            }
            _ => Err(ImportError::source_read(format!(
                "'{}' is not a JSON array of objects",
                path.display()
            ))),
        }
    }

    fn next_record(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Consume the separator (or closing bracket) and parse one element
    fn advance(&mut self) -> Result<Option<Record>> {
        match peek_non_ws(&mut self.reader)? {
            None => {
                return Err(ImportError::source_read("unterminated JSON array"));
            }
            Some(b']') => {
                self.reader.consume(1);
                self.done = true;
                return Ok(None);
            }
            Some(b',') if !self.first => {
                self.reader.consume(1);
            }
            Some(_) if self.first => {}
            Some(other) => {
                return Err(ImportError::source_read(format!(
                    "expected ',' or ']' in JSON array, found '{}'",
                    other as char
                )));
            }
        }
        self.first = false;

        let mut elements =
            serde_json::Deserializer::from_reader(&mut self.reader).into_iter::<Record>();
        match elements.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(ImportError::source_read(format!(
                "invalid JSON array element: {e}"
            ))),
            None => Err(ImportError::source_read("unterminated JSON array")),
        }
    }
}

/// Skip whitespace and return the next byte without consuming it
fn peek_non_ws(reader: &mut BufReader<File>) -> std::io::Result<Option<u8>> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(None);
        }
        match available.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                reader.consume(i);
                let available = reader.fill_buf()?;
                return Ok(Some(available[0]));
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

impl RecordSource {
    /// Open a source for the given file, keyed by its extension
    pub fn open(path: &Path, csv_options: &CsvOptions) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let inner = match extension.as_str() {
            "csv" => Self::open_csv(path, csv_options)?,
            "ndjson" | "jsonl" => {
                let file = File::open(path).map_err(|e| open_error(path, &e))?;
                SourceKind::JsonLines(BufReader::new(file).lines())
            }
            _ => SourceKind::JsonArray(JsonArrayStream::open(path)?),
        };

        Ok(Self { inner })
    }

    fn open_csv(path: &Path, options: &CsvOptions) -> Result<SourceKind> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .from_path(path)
            .map_err(|e| open_error(path, &e))?;

        let mut reader = reader;
        let headers = reader
            .headers()
            .map_err(|e| open_error(path, &e))?
            .clone();

        let columns = headers
            .iter()
            .map(|header| {
                let included = options
                    .include_columns
                    .as_ref()
                    .map(|re| re.is_match(header))
                    .unwrap_or(true);
                let excluded = options
                    .exclude_columns
                    .as_ref()
                    .map(|re| re.is_match(header))
                    .unwrap_or(false);
                (included && !excluded).then(|| header.to_string())
            })
            .collect();

        Ok(SourceKind::Csv {
            records: reader.into_records(),
            columns,
        })
    }

    /// Next record in source order, or None at end of input
    pub fn next_record(&mut self) -> Option<Result<Record>> {
        match &mut self.inner {
            SourceKind::Csv { records, columns } => {
                let row = match records.next()? {
                    Ok(row) => row,
                    Err(e) => {
                        return Some(Err(ImportError::source_read(format!(
                            "CSV parse error: {}",
                            e
                        ))))
                    }
                };
                let mut record = Record::new();
                for (idx, field) in row.iter().enumerate() {
                    if let Some(Some(name)) = columns.get(idx) {
                        record.insert(name.clone(), Value::String(field.to_string()));
                    }
                }
                Some(Ok(record))
            }
            SourceKind::JsonArray(stream) => stream.next_record(),
            SourceKind::JsonLines(lines) => loop {
                let line = match lines.next()? {
                    Ok(line) => line,
                    Err(e) => return Some(Err(ImportError::Io(e))),
                };
                if line.trim().is_empty() {
                    continue;
                }
                return Some(serde_json::from_str::<Record>(&line).map_err(|e| {
                    ImportError::source_read(format!("invalid JSON line: {}", e))
                }));
            },
        }
    }
}

fn open_error(path: &Path, err: &dyn std::fmt::Display) -> ImportError {
    ImportError::source_read(format!(
        "cannot open '{}': {}. Verify the file path exists and you have read permissions.",
        path.display(),
        err
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn drain(source: &mut RecordSource) -> Vec<Record> {
        let mut out = Vec::new();
        while let Some(record) = source.next_record() {
            out.push(record.unwrap());
        }
        out
    }

    #[test]
    fn test_json_array_source() {
        let file = temp_file(".json", r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        let records = drain(&mut source);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[2]["id"], 3);
    }

    #[test]
    fn test_json_non_array_fails() {
        let file = temp_file(".json", r#"{"id": 1}"#);
        let result = RecordSource::open(file.path(), &CsvOptions::default());
        assert!(matches!(result, Err(ImportError::SourceRead(_))));
    }

    #[test]
    fn test_json_empty_array_yields_nothing() {
        let file = temp_file(".json", "[]");
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        assert!(source.next_record().is_none());
    }

    #[test]
    fn test_json_array_streams_nested_objects() {
        let file = temp_file(
            ".json",
            "[\n  {\"a\": {\"b\": [1, 2]}},\n  {\"a\": 2}\n]\n",
        );
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        let records = drain(&mut source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"]["b"][1], 2);
        assert_eq!(records[1]["a"], 2);
    }

    #[test]
    fn test_json_array_unterminated_fails_mid_stream() {
        let file = temp_file(".json", r#"[{"id": 1},"#);
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();

        // The first element parses; the truncation surfaces on the next read
        assert!(source.next_record().unwrap().is_ok());
        assert!(matches!(
            source.next_record(),
            Some(Err(ImportError::SourceRead(_)))
        ));
        assert!(source.next_record().is_none());
    }

    #[test]
    fn test_json_array_non_object_element_fails() {
        let file = temp_file(".json", "[42]");
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        assert!(matches!(
            source.next_record(),
            Some(Err(ImportError::SourceRead(_)))
        ));
    }

    #[test]
    fn test_ndjson_source_skips_blank_lines() {
        let file = temp_file(".ndjson", "{\"id\": 1}\n\n{\"id\": 2}\n");
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        let records = drain(&mut source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn test_csv_source_preserves_order() {
        let file = temp_file(".csv", "name,price\nwidget,9.99\ngadget,19.99\n");
        let mut source = RecordSource::open(file.path(), &CsvOptions::default()).unwrap();
        let records = drain(&mut source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "widget");
        assert_eq!(records[0]["price"], "9.99");
        assert_eq!(records[1]["name"], "gadget");
    }

    #[test]
    fn test_csv_custom_delimiter() {
        let file = temp_file(".csv", "name;price\nwidget;9.99\n");
        let options = CsvOptions {
            delimiter: b';',
            ..CsvOptions::default()
        };
        let mut source = RecordSource::open(file.path(), &options).unwrap();
        let records = drain(&mut source);
        assert_eq!(records[0]["price"], "9.99");
    }

    #[test]
    fn test_csv_column_filters() {
        let file = temp_file(".csv", "id,name,internal_note\n1,widget,secret\n");
        let options = CsvOptions {
            delimiter: b',',
            include_columns: None,
            exclude_columns: Some(Regex::new("^internal_").unwrap()),
        };
        let mut source = RecordSource::open(file.path(), &options).unwrap();
        let records = drain(&mut source);
        assert!(records[0].contains_key("id"));
        assert!(records[0].contains_key("name"));
        assert!(!records[0].contains_key("internal_note"));

        let options = CsvOptions {
            delimiter: b',',
            include_columns: Some(Regex::new("^name$").unwrap()),
            exclude_columns: None,
        };
        let mut source = RecordSource::open(file.path(), &options).unwrap();
        let records = drain(&mut source);
        assert_eq!(records[0].len(), 1);
        assert!(records[0].contains_key("name"));
    }

    #[test]
    fn test_missing_file() {
        let result = RecordSource::open(Path::new("/no/such/file.json"), &CsvOptions::default());
        assert!(result.is_err());
    }
}
