//! Shared CLI definitions for clientbook.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// File format for client data files (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Excel 2007+ workbook (.xlsx)
    Xlsx,
    /// Excel macro-enabled workbook (.xlsm), read only
    Xlsm,
    /// Excel binary workbook (.xlsb), read only
    Xlsb,
    /// Legacy Excel workbook (.xls), read only
    Xls,
    /// OpenDocument spreadsheet (.ods), read only
    Ods,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" => Some(Self::Xlsx),
            "xlsm" => Some(Self::Xlsm),
            "xlsb" => Some(Self::Xlsb),
            "xls" => Some(Self::Xls),
            "ods" => Some(Self::Ods),
            _ => None,
        }
    }

    /// True for delimited text formats.
    pub fn is_delimited(&self) -> bool {
        matches!(self, Self::Csv | Self::Tsv)
    }

    /// True for formats read through the spreadsheet reader.
    pub fn is_spreadsheet(&self) -> bool {
        !self.is_delimited()
    }

    /// Whether records can be written back in this format.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Csv | Self::Tsv | Self::Xlsx)
    }

    /// Field separator used when the file does not override it.
    pub fn default_delimiter(&self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            _ => b',',
        }
    }

    /// Canonical extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
            Self::Xlsm => "xlsm",
            Self::Xlsb => "xlsb",
            Self::Xls => "xls",
            Self::Ods => "ods",
        }
    }
}

/// How search keywords combine
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum MatchModeArg {
    /// Every keyword must match (AND)
    All,
    /// Any keyword may match (OR)
    Any,
}

/// Command-line arguments for clientbook
#[derive(Clone, Parser, Debug)]
#[command(
    name = "clientbook",
    version,
    about = "Client records in the terminal",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the client data file (CSV, TSV or Excel).
    /// Defaults to file_loading.default_path from the config (cust.xlsx)
    #[arg(value_name = "PATH")]
    pub path: Option<std::path::PathBuf>,

    /// Specify the delimiter to use when reading a delimited text file (ASCII value, e.g. 59 for ';')
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Force file format (csv, tsv, xlsx, xlsm, xlsb, xls, ods).
    /// By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Excel sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Clients")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub sheet: Option<String>,

    /// How search keywords combine: all (every keyword must match) or any (default: all)
    #[arg(long = "match-mode", value_enum)]
    pub match_mode: Option<MatchModeArg>,

    /// Restrict search to this field. Use once per field; accepts field keys (id, name, phone,
    /// mobile, address, notes) or column names. Default: all displayed columns
    #[arg(long = "search-field", value_name = "FIELD")]
    pub search_fields: Vec<String>,

    /// Enable debug mode to show operational information and debug-level logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write the log to this file instead of the default in the cache directory
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<std::path::PathBuf>,

    /// Clear all cache data (search history, log) and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at ~/.config/clientbook/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if !arg.get_action().takes_values() || placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
