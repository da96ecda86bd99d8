//! Spreadsheet files: read with calamine, written back as xlsx.

use super::error::LoadError;
use super::{RawTable, Record, Value};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

/// Sheet name used when the records did not come from a workbook.
pub(crate) const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Read one sheet, selected by 0-based index or name (default: first sheet).
/// Cells keep their type: whole floats become `Int`, dates become `DateTime`.
pub(crate) fn read(path: &Path, sheet: Option<&str>) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| load_error(path, e))?;
    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(LoadError::MissingHeader(path.to_path_buf()));
    }

    let sheet_idx = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) if idx < sheet_names.len() => idx,
            Ok(_) => return Err(LoadError::SheetNotFound(sel.to_string())),
            Err(_) => sheet_names
                .iter()
                .position(|n| n == sel)
                .ok_or_else(|| LoadError::SheetNotFound(sel.to_string()))?,
        },
        None => 0,
    };
    let sheet_name = sheet_names[sheet_idx].clone();

    if sheet_names.len() > 1 {
        tracing::warn!(
            path = %path.display(),
            sheet = %sheet_name,
            sheets = sheet_names.len(),
            "workbook has several sheets; only the loaded sheet is kept on save"
        );
    }

    let range = workbook
        .worksheet_range_at(sheet_idx)
        .ok_or_else(|| LoadError::SheetNotFound(sheet_name.clone()))?
        .map_err(|e| load_error(path, e))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|c| DataType::as_string(c).unwrap_or_else(|| c.to_string()))
            .collect(),
        None => return Err(LoadError::MissingHeader(path.to_path_buf())),
    };
    let width = header.len();

    let mut dropped = 0usize;
    let rows: Vec<Vec<Value>> = rows
        .map(|cells| {
            dropped += cells
                .iter()
                .skip(width)
                .filter(|c| !DataType::is_empty(*c))
                .count();
            (0..width)
                .map(|i| cells.get(i).map(cell_value).unwrap_or_default())
                .collect::<Vec<Value>>()
        })
        .collect();

    if dropped > 0 {
        tracing::warn!(
            path = %path.display(),
            cells = dropped,
            "cells outside the header columns were ignored"
        );
    }

    Ok(RawTable {
        header,
        rows,
        sheet: Some(sheet_name),
    })
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::text(s.as_str()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => Value::DateTime(dt),
            None => Value::text(cell.to_string()),
        },
        Data::DurationIso(s) => Value::text(s.as_str()),
        Data::Error(e) => {
            tracing::debug!(error = ?e, "spreadsheet cell holds an error value");
            Value::Empty
        }
    }
}

fn load_error(path: &Path, err: calamine::Error) -> LoadError {
    match err {
        calamine::Error::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => LoadError::Parse {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

/// Encode all records as a single-sheet xlsx workbook.
pub(crate) fn write(
    sheet_name: &str,
    columns: &[String],
    records: &[Record],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (c, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_number(c), name, &header_format)?;
    }

    for (r, record) in records.iter().enumerate() {
        let row = u32::try_from(r + 1).unwrap_or(u32::MAX);
        for (c, value) in record.values.iter().enumerate() {
            let col = col_number(c);
            match value {
                Value::Empty => {}
                Value::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                Value::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                Value::Float(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Value::DateTime(dt) => {
                    let format = if dt.time() == chrono::NaiveTime::MIN {
                        &date_format
                    } else {
                        &datetime_format
                    };
                    worksheet.write_datetime_with_format(row, col, dt, format)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

fn col_number(c: usize) -> u16 {
    u16::try_from(c).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_records() -> (Vec<String>, Vec<Record>) {
        let columns = vec!["客戶編號".to_string(), "姓名".to_string(), "生日".to_string()];
        let birthday = NaiveDate::from_ymd_opt(1990, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = vec![
            Record {
                index: 0,
                values: vec![Value::Int(1001), Value::from("王小明"), Value::DateTime(birthday)],
            },
            Record {
                index: 1,
                values: vec![Value::Int(1002), Value::Empty, Value::Empty],
            },
        ];
        (columns, records)
    }

    #[test]
    fn test_write_then_read_keeps_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.xlsx");
        let (columns, records) = sample_records();
        let bytes = write("客戶", &columns, &records).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let table = read(&path, None).unwrap();
        assert_eq!(table.header, columns);
        assert_eq!(table.sheet.as_deref(), Some("客戶"));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], Value::Int(1001));
        assert_eq!(table.rows[0][1], Value::Text("王小明".to_string()));
        assert_eq!(table.rows[0][2], records[0].values[2]);
        assert_eq!(table.rows[1][1], Value::Empty);
    }

    #[test]
    fn test_missing_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.xlsx");
        let (columns, records) = sample_records();
        std::fs::write(&path, write("Sheet1", &columns, &records).unwrap()).unwrap();

        assert!(matches!(
            read(&path, Some("Other")),
            Err(LoadError::SheetNotFound(name)) if name == "Other"
        ));
        assert!(matches!(
            read(&path, Some("3")),
            Err(LoadError::SheetNotFound(_))
        ));
        assert!(read(&path, Some("0")).is_ok());
        assert!(read(&path, Some("Sheet1")).is_ok());
    }
}
