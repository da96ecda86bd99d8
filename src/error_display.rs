//! User-facing error message formatting.
//!
//! Uses typed error matching (PolarsError variants, io::ErrorKind, store
//! errors) rather than string parsing to produce actionable messages.

use crate::store::{LoadError, SaveError, StoreError};
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!("Duplicate column: {}. Rename one of the headers.", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!(
            "Row shape mismatch: {}. Check that every row has the same number of fields as the header.",
            msg
        ),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => {
            "Permission denied. Check that the file is not open in another program.".to_string()
        }
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("No space left") || msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a store error for the status line or error modal.
pub fn user_message_from_store(err: &StoreError) -> String {
    match err {
        StoreError::Load(LoadError::Io { path, source }) => format!(
            "Failed to load {}: {}",
            path.display(),
            user_message_from_io(source, None)
        ),
        StoreError::Load(LoadError::SheetNotFound(name)) => format!(
            "Sheet not found: {}. Use --sheet with a sheet name or 0-based index.",
            name
        ),
        StoreError::Save(SaveError::Io { path, source }) => format!(
            "Failed to save {}: {}",
            path.display(),
            user_message_from_io(source, None)
        ),
        StoreError::Save(SaveError::UnsupportedFormat(ext)) => format!(
            "Cannot save .{} files. Save as .xlsx (or .csv) instead.",
            ext
        ),
        other => {
            let mut msg = other.to_string();
            if let Some(first) = msg.get(..1) {
                let upper = first.to_uppercase();
                msg.replace_range(..1, &upper);
            }
            msg
        }
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find store, polars or io errors.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(le) = cause.downcast_ref::<LoadError>() {
            return match le {
                LoadError::Io { source, .. } => with_path(user_message_from_io(source, None)),
                other => other.to_string(),
            };
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

/// Light cleanup for ComputeError messages: strip Polars-internal phrasing.
fn simplify_compute_message(msg: &str) -> String {
    let msg = msg.trim();
    let msg = msg
        .strip_prefix("could not parse")
        .map(|rest| format!("Could not parse{}", rest))
        .unwrap_or_else(|| msg.to_string());
    match msg.find("\n\n") {
        Some(pos) => msg[..pos].to_string(),
        None => msg,
    }
}
