//! Delimited text files through the polars CSV reader and writer.

use super::error::LoadError;
use super::{RawTable, Record, Value};
use crate::error_display::user_message_from_polars;
use polars::prelude::*;
use std::io::{self, Write};
use std::path::Path;

/// Read a delimited file with every column as text so leading zeros survive.
/// The first row is returned as the raw header.
pub(crate) fn read(path: &Path, delimiter: u8) -> Result<RawTable, LoadError> {
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.into()))
        .and_then(|reader| reader.finish())
        .map_err(|e| load_error(path, e))?;

    if df.height() == 0 {
        return Err(LoadError::MissingHeader(path.to_path_buf()));
    }

    let mut cells: Vec<Vec<Option<String>>> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let strings = column
            .as_materialized_series()
            .str()
            .map_err(|e| load_error(path, e))?;
        cells.push(
            strings
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect(),
        );
    }

    let header: Vec<String> = cells
        .iter()
        .map(|c| c.first().cloned().flatten().unwrap_or_default())
        .collect();

    let rows = (1..df.height())
        .map(|r| {
            cells
                .iter()
                .map(|c| c[r].as_deref().map(Value::text).unwrap_or_default())
                .collect::<Vec<Value>>()
        })
        .collect();

    Ok(RawTable {
        header,
        rows,
        sheet: None,
    })
}

/// Write all records, header first, with the given separator.
pub(crate) fn write<W: Write>(
    writer: W,
    columns: &[String],
    records: &[Record],
    delimiter: u8,
) -> PolarsResult<()> {
    let series: Vec<Series> = columns
        .iter()
        .enumerate()
        .map(|(pos, name)| {
            let values: Vec<Option<String>> = records
                .iter()
                .map(|r| match r.values.get(pos) {
                    None | Some(Value::Empty) => None,
                    Some(v) => Some(v.to_string()),
                })
                .collect();
            Series::new(name.as_str().into(), values)
        })
        .collect();
    let mut df: DataFrame = series.into_iter().collect();

    CsvWriter::new(writer)
        .with_separator(delimiter)
        .include_header(true)
        .finish(&mut df)
}

fn load_error(path: &Path, err: PolarsError) -> LoadError {
    match err {
        PolarsError::NoData(_) => LoadError::MissingHeader(path.to_path_buf()),
        PolarsError::IO { ref error, .. } if error.kind() == io::ErrorKind::NotFound => {
            LoadError::NotFound(path.to_path_buf())
        }
        PolarsError::IO { ref error, .. } => LoadError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(error.kind(), error.to_string()),
        },
        other => LoadError::Parse {
            path: path.to_path_buf(),
            message: user_message_from_polars(&other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_keeps_leading_zeros_and_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.csv");
        fs::write(&path, "ID,Name,Phone\nC001,Alice Wu,0911111111\nC002,,0922222222\n").unwrap();

        let table = read(&path, b',').unwrap();
        assert_eq!(table.header, vec!["ID", "Name", "Phone"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], Value::Text("0911111111".to_string()));
        assert_eq!(table.rows[1][1], Value::Empty);
    }

    #[test]
    fn test_read_semicolon_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.txt");
        fs::write(&path, "ID;Name\nC001;Alice\n").unwrap();

        let table = read(&path, b';').unwrap();
        assert_eq!(table.header, vec!["ID", "Name"]);
        assert_eq!(table.rows[0][1], Value::Text("Alice".to_string()));
    }

    #[test]
    fn test_read_empty_file_is_missing_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        assert!(matches!(read(&path, b','), Err(LoadError::MissingHeader(_))));
    }

    #[test]
    fn test_write_header_and_quoting() {
        let columns = vec!["ID".to_string(), "Address".to_string()];
        let records = vec![Record {
            index: 0,
            values: vec![Value::from("C001"), Value::from("1 Main St, Taipei")],
        }];
        let mut out = Vec::new();
        write(&mut out, &columns, &records, b',').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "ID,Address\nC001,\"1 Main St, Taipei\"\n");
    }
}
