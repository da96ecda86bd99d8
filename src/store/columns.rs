//! Canonical client fields and header-synonym resolution.
//!
//! Source files name their columns in many ways ("客戶編號", "ID", "Client ID").
//! The table below is resolved once at load into a [`ColumnMap`] so the rest of
//! the store can ask for "the client ID column" without caring about spelling.

use std::collections::{BTreeMap, HashSet};

/// Logical fields the store knows how to treat specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClientField {
    ClientId,
    Name,
    Phone,
    Mobile,
    Address,
    Notes,
}

impl ClientField {
    /// All fields in display order.
    pub const ALL: [ClientField; 6] = [
        ClientField::ClientId,
        ClientField::Name,
        ClientField::Phone,
        ClientField::Mobile,
        ClientField::Address,
        ClientField::Notes,
    ];

    /// Short key used in config files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            ClientField::ClientId => "id",
            ClientField::Name => "name",
            ClientField::Phone => "phone",
            ClientField::Mobile => "mobile",
            ClientField::Address => "address",
            ClientField::Notes => "notes",
        }
    }

    /// Parse a field key (case-insensitive). `client_id` is accepted for `id`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "id" | "client_id" | "clientid" => Some(ClientField::ClientId),
            "name" => Some(ClientField::Name),
            "phone" => Some(ClientField::Phone),
            "mobile" => Some(ClientField::Mobile),
            "address" => Some(ClientField::Address),
            "notes" | "note" => Some(ClientField::Notes),
            _ => None,
        }
    }

    /// Accepted header spellings for this field.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            ClientField::ClientId => &[
                "客戶編號",
                "編號",
                "客戶代號",
                "客編",
                "ID",
                "Client ID",
                "Customer ID",
                "client_id",
                "No",
            ],
            ClientField::Name => &[
                "姓名",
                "客戶名稱",
                "客戶姓名",
                "名稱",
                "Name",
                "Client Name",
                "Customer Name",
            ],
            ClientField::Phone => &["電話", "市話", "聯絡電話", "Phone", "Tel", "Telephone"],
            ClientField::Mobile => &["手機", "行動電話", "Mobile", "Cell", "Cellphone"],
            ClientField::Address => &["地址", "住址", "通訊地址", "Address"],
            ClientField::Notes => &["備註", "說明", "Notes", "Note", "Remarks", "Memo"],
        }
    }

    fn matches_header(&self, normalized: &str) -> bool {
        self.synonyms()
            .iter()
            .any(|s| normalize_header(s) == normalized)
    }
}

/// Normalize a header for synonym comparison: trim, lower-case, and drop
/// spaces, underscores, hyphens and dots.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Clean raw header cells into unique column names.
///
/// Blank headers become `column_N` (1-based position) and are reported in the
/// returned set; repeated headers get a `_2`, `_3`, ... suffix. Generated and
/// suffixed names never take a name used by a real header in the file.
pub fn normalize_headers(raw: Vec<String>) -> (Vec<String>, HashSet<String>) {
    let cleaned: Vec<String> = raw
        .into_iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let reserved: HashSet<&str> = cleaned
        .iter()
        .filter(|h| !h.is_empty())
        .map(String::as_str)
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut generated = HashSet::new();
    let mut columns = Vec::with_capacity(cleaned.len());

    for (i, header) in cleaned.iter().enumerate() {
        let blank = header.is_empty();
        let base = if blank {
            format!("column_{}", i + 1)
        } else {
            header.clone()
        };

        let taken = |name: &str, seen: &HashSet<String>| {
            seen.contains(name) || (name != header.as_str() && reserved.contains(name))
        };
        let mut name = base.clone();
        let mut n = 2;
        while taken(&name, &seen) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        if name != base || blank {
            tracing::debug!(position = i + 1, column = %name, "renamed header");
        }
        if blank {
            generated.insert(name.clone());
        }
        seen.insert(name.clone());
        columns.push(name);
    }

    (columns, generated)
}

/// Canonical field → actual column name, resolved once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    fields: BTreeMap<ClientField, String>,
}

impl ColumnMap {
    /// Match each canonical field to the first column whose header is one of its
    /// synonyms. A column is claimed by at most one field.
    pub fn build(columns: &[String]) -> Self {
        let mut fields = BTreeMap::new();
        let mut claimed: HashSet<&str> = HashSet::new();

        for field in ClientField::ALL {
            let found = columns
                .iter()
                .find(|c| !claimed.contains(c.as_str()) && field.matches_header(&normalize_header(c)));
            if let Some(column) = found {
                claimed.insert(column.as_str());
                fields.insert(field, column.clone());
            }
        }

        Self { fields }
    }

    pub fn get(&self, field: ClientField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Which canonical field, if any, a column was mapped to.
    pub fn field_for(&self, column: &str) -> Option<ClientField> {
        self.fields
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(f, _)| *f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientField, &str)> {
        self.fields.iter().map(|(f, c)| (*f, c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Mapped columns in canonical order, then the rest in file order. Columns in
/// `hidden` (auto-named blank headers) are left out.
pub fn display_columns(
    columns: &[String],
    map: &ColumnMap,
    hidden: &HashSet<String>,
) -> Vec<String> {
    let mut out: Vec<String> = map.iter().map(|(_, c)| c.to_string()).collect();
    for column in columns {
        if !out.contains(column) && !hidden.contains(column) {
            out.push(column.clone());
        }
    }
    out
}
