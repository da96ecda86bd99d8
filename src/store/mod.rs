//! In-memory client record set loaded from a CSV or Excel file.
//!
//! The store owns every row of the file. Searching produces a borrowed
//! [`View`] that keeps original row indices; add/edit/delete mutate the
//! record set in place and nothing reaches disk until [`ClientStore::save`].

pub mod columns;
mod csv;
pub mod error;
mod excel;
pub mod search;
mod value;

pub use columns::{ClientField, ColumnMap};
pub use error::{EditError, LoadError, NotFoundError, SaveError, StoreError, ValidationError};
pub use search::{tokenize, MatchMode, View};
pub use value::Value;

use crate::OpenOptions;
use clientbook_cli::FileFormat;
use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stable row identity, assigned at load and never reused within a session.
pub type RowIndex = usize;

/// One client row. `values` is aligned with [`ClientStore::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) index: RowIndex,
    pub(crate) values: Vec<Value>,
}

impl Record {
    pub fn index(&self) -> RowIndex {
        self.index
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Header and body of a file before column normalization.
pub(crate) struct RawTable {
    pub(crate) header: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
    pub(crate) sheet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientStore {
    path: PathBuf,
    format: FileFormat,
    delimiter: u8,
    sheet_name: Option<String>,
    columns: Vec<String>,
    hidden_columns: HashSet<String>,
    column_map: ColumnMap,
    display_columns: Vec<String>,
    search_fields: Vec<String>,
    records: Vec<Record>,
    next_index: RowIndex,
    dirty: bool,
}

impl ClientStore {
    /// Read a client file. The format comes from `options.format` or the
    /// file extension.
    pub fn load(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let format = options
            .format
            .or_else(|| FileFormat::from_path(path))
            .ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| format.default_delimiter());

        let raw = if format.is_delimited() {
            csv::read(path, delimiter)?
        } else {
            excel::read(path, options.sheet.as_deref())?
        };
        if raw.header.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::MissingHeader(path.to_path_buf()));
        }

        let (columns, hidden_columns) = columns::normalize_headers(raw.header);
        let column_map = ColumnMap::build(&columns);
        let display_columns = columns::display_columns(&columns, &column_map, &hidden_columns);
        let records: Vec<Record> = raw
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| Record { index, values })
            .collect();
        let next_index = records.len();

        tracing::info!(
            path = %path.display(),
            format = format.extension(),
            rows = records.len(),
            columns = columns.len(),
            mapped = column_map.len(),
            "loaded client file"
        );
        if column_map.get(ClientField::ClientId).is_none() {
            tracing::warn!(path = %path.display(), "no client ID column found; IDs are not validated");
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            delimiter,
            sheet_name: raw.sheet,
            columns,
            hidden_columns,
            column_map,
            display_columns,
            search_fields: options.search_fields.clone(),
            records,
            next_index,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Every column in save order: file order, then columns added this session.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.column_map
    }

    pub fn display_columns(&self) -> &[String] {
        &self.display_columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    /// Restrict search to these field keys or column names (empty = all).
    pub fn set_search_fields(&mut self, fields: Vec<String>) {
        self.search_fields = fields;
    }

    pub fn get(&self, index: RowIndex) -> Option<&Record> {
        self.position(index).map(|pos| &self.records[pos])
    }

    /// Value of `column` in `record`, or `None` if the column does not exist.
    pub fn value<'a>(&self, record: &'a Record, column: &str) -> Option<&'a Value> {
        let pos = self.columns.iter().position(|c| c == column)?;
        record.values.get(pos)
    }

    /// Value of a canonical field in `record`, if the field is mapped.
    pub fn field<'a>(&self, record: &'a Record, field: ClientField) -> Option<&'a Value> {
        self.value(record, self.column_map.get(field)?)
    }

    /// Name of the column holding client IDs, if one was recognized.
    pub fn id_column(&self) -> Option<&str> {
        self.column_map.get(ClientField::ClientId)
    }

    fn position(&self, index: RowIndex) -> Option<usize> {
        self.records.binary_search_by_key(&index, |r| r.index).ok()
    }

    /// Rows matching `tokens` under `mode`, in original order. No tokens
    /// returns every row.
    pub fn search<S: AsRef<str>>(&self, tokens: &[S], mode: MatchMode) -> View<'_> {
        let needles: Vec<String> = tokens
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if needles.is_empty() {
            return View::new(self.records.iter().collect());
        }

        let fields = search::resolve_fields(
            &self.search_fields,
            &self.columns,
            &self.column_map,
            &self.display_columns,
        );
        let matched: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| search::row_matches(r, &fields, &needles, mode))
            .collect();

        tracing::debug!(
            tokens = ?needles,
            mode = %mode,
            matched = matched.len(),
            total = self.records.len(),
            "search"
        );
        View::new(matched)
    }

    /// Append a new row. Keys are column names; unknown keys become new
    /// columns. Returns the new row's index.
    ///
    /// A new column whose header is a synonym of a field that had no column
    /// gets mapped to that field. Existing mappings never move. ID checks use
    /// the mapping from before this call.
    pub fn add<K, V, I>(&mut self, data: I) -> Result<RowIndex, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let data = collect_fields(data)?;

        if let Some(id_column) = self.id_column() {
            let id = data
                .iter()
                .find(|(k, _)| k == id_column)
                .map(|(_, v)| v.to_string().trim().to_string())
                .unwrap_or_default();
            if id.is_empty() {
                return Err(ValidationError::MissingClientId {
                    column: id_column.to_string(),
                });
            }
            if self.id_exists(&id) {
                return Err(ValidationError::DuplicateClientId { id });
            }
        }

        self.extend_columns(&data);
        let mut values = vec![Value::Empty; self.columns.len()];
        for (key, value) in data {
            if let Some(pos) = self.columns.iter().position(|c| *c == key) {
                values[pos] = value;
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        self.records.push(Record { index, values });
        self.dirty = true;

        tracing::info!(index, rows = self.records.len(), "added record");
        Ok(index)
    }

    /// Overwrite fields of an existing row. A value for the client ID column
    /// is ignored; IDs never change once a row exists.
    pub fn edit<K, V, I>(&mut self, index: RowIndex, data: I) -> Result<(), EditError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let pos = self.position(index).ok_or(NotFoundError(index))?;
        let mut data = collect_fields(data)?;

        if let Some(id_column) = self.id_column().map(str::to_string) {
            let before = data.len();
            data.retain(|(k, _)| *k != id_column);
            if data.len() != before {
                tracing::debug!(index, column = %id_column, "ignoring client ID in edit");
            }
        }
        if data.is_empty() {
            return Ok(());
        }

        self.extend_columns(&data);
        let record = &mut self.records[pos];
        for (key, value) in data {
            if let Some(col) = self.columns.iter().position(|c| *c == key) {
                record.values[col] = value;
            }
        }
        self.dirty = true;

        tracing::info!(index, "edited record");
        Ok(())
    }

    /// Remove rows by index. Unknown indices are skipped; returns how many
    /// rows were removed.
    pub fn delete(&mut self, indices: impl IntoIterator<Item = RowIndex>) -> usize {
        let targets: BTreeSet<RowIndex> = indices.into_iter().collect();
        let before = self.records.len();
        self.records.retain(|r| !targets.contains(&r.index));
        let removed = before - self.records.len();

        if removed > 0 {
            self.dirty = true;
            tracing::info!(removed, rows = self.records.len(), "deleted records");
        }
        removed
    }

    /// Write every row to `target` (default: the loaded path) through a
    /// temporary file in the same directory. The format follows the target's
    /// extension.
    pub fn save(&mut self, target: Option<&Path>) -> Result<PathBuf, SaveError> {
        let path = target.map(Path::to_path_buf).unwrap_or_else(|| self.path.clone());
        let format = match target {
            None => self.format,
            Some(p) => FileFormat::from_path(p).ok_or_else(|| {
                SaveError::UnsupportedFormat(
                    p.extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or_default()
                        .to_string(),
                )
            })?,
        };
        if !format.is_writable() {
            return Err(SaveError::UnsupportedFormat(format.extension().to_string()));
        }

        let io_error = |source| SaveError::Io {
            path: path.clone(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;

        if format.is_delimited() {
            let delimiter = if format == self.format {
                self.delimiter
            } else {
                format.default_delimiter()
            };
            csv::write(tmp.as_file_mut(), &self.columns, &self.records, delimiter).map_err(
                |e| SaveError::Encode {
                    path: path.clone(),
                    message: crate::error_display::user_message_from_polars(&e),
                },
            )?;
        } else {
            let sheet = self
                .sheet_name
                .as_deref()
                .unwrap_or(excel::DEFAULT_SHEET_NAME);
            let bytes = excel::write(sheet, &self.columns, &self.records).map_err(|e| {
                SaveError::Encode {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?;
            tmp.write_all(&bytes).map_err(io_error)?;
        }

        tmp.as_file().sync_all().map_err(io_error)?;
        if let Ok(meta) = std::fs::metadata(&path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(io_error)?;
        }
        tmp.persist(&path).map_err(|e| io_error(e.error))?;

        tracing::info!(
            path = %path.display(),
            format = format.extension(),
            rows = self.records.len(),
            "saved client file"
        );
        self.path = path.clone();
        self.format = format;
        self.dirty = false;
        Ok(path)
    }

    fn id_exists(&self, id: &str) -> bool {
        let Some(pos) = self
            .id_column()
            .and_then(|c| self.columns.iter().position(|col| col == c))
        else {
            return false;
        };
        self.records
            .iter()
            .any(|r| r.values.get(pos).is_some_and(|v| v.to_string().trim() == id))
    }

    /// Append any keys that are not yet columns, padding existing rows.
    fn extend_columns(&mut self, data: &[(String, Value)]) {
        let mut added = false;
        for (key, _) in data {
            if !self.columns.contains(key) {
                self.columns.push(key.clone());
                for record in &mut self.records {
                    record.values.push(Value::Empty);
                }
                tracing::info!(column = %key, "added column");
                added = true;
            }
        }
        if added {
            // Appended columns come last, so earlier matches keep their field
            self.column_map = ColumnMap::build(&self.columns);
            self.display_columns =
                columns::display_columns(&self.columns, &self.column_map, &self.hidden_columns);
        }
    }
}

/// Collect caller data, rejecting blank keys. Later duplicates win.
fn collect_fields<K, V, I>(data: I) -> Result<Vec<(String, Value)>, ValidationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut out: Vec<(String, Value)> = Vec::new();
    for (key, value) in data {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(ValidationError::EmptyColumnName);
        }
        let value = value.into();
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    Ok(out)
}
