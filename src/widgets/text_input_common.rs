use color_eyre::Result;
use fs2::FileExt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::cache::CacheManager;

/// History file for a given history id (`search` -> `search_history.txt`).
pub fn history_file(cache: &CacheManager, history_id: &str) -> PathBuf {
    cache.cache_file(&format!("{}_history.txt", history_id))
}

/// Load history from a cache file
pub fn load_history_impl(cache: &CacheManager, history_id: &str) -> Result<Vec<String>> {
    let history_file = history_file(cache, history_id);

    if !history_file.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&history_file)?;
    let reader = BufReader::new(file);
    let mut history = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            history.push(line);
        }
    }

    Ok(history)
}

/// Save the most recent `limit` entries, oldest first, under an exclusive lock.
pub fn save_history_impl(
    cache: &CacheManager,
    history_id: &str,
    history: &[String],
    limit: usize,
) -> Result<()> {
    cache.ensure_cache_dir()?;
    let history_file = history_file(cache, history_id);

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&history_file)?;

    file.lock_exclusive()?;
    let start = history.len().saturating_sub(limit);
    for entry in history.iter().skip(start) {
        writeln!(file, "{}", entry)?;
    }
    file.flush()?;
    file.unlock()?;

    Ok(())
}

/// Add entry to history with deduplication.
/// Only consecutive duplicate entries are skipped.
pub fn add_to_history(history: &mut Vec<String>, entry: String) {
    let entry = entry.trim().to_string();
    if entry.is_empty() {
        return;
    }
    if let Some(last) = history.last() {
        if last == &entry {
            return;
        }
    }
    history.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SEARCH_HISTORY_FILE;
    use tempfile::TempDir;

    #[test]
    fn test_add_to_history() {
        let mut history = Vec::new();

        add_to_history(&mut history, "wu".to_string());
        assert_eq!(history.len(), 1);

        add_to_history(&mut history, "alice bob".to_string());
        assert_eq!(history.len(), 2);

        // Consecutive duplicate (after trimming) is skipped
        add_to_history(&mut history, " alice bob ".to_string());
        assert_eq!(history.len(), 2);

        add_to_history(&mut history, "   ".to_string());
        assert_eq!(history.len(), 2);

        // Non-consecutive duplicate is preserved
        add_to_history(&mut history, "wu".to_string());
        assert_eq!(history, vec!["wu", "alice bob", "wu"]);
    }

    #[test]
    fn test_save_and_load_history_respects_limit() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("cache"));
        let history: Vec<String> = (1..=5).map(|i| format!("C00{}", i)).collect();

        save_history_impl(&cache, "search", &history, 3).unwrap();

        assert!(cache.cache_file(SEARCH_HISTORY_FILE).exists());
        let loaded = load_history_impl(&cache, "search").unwrap();
        assert_eq!(loaded, vec!["C003", "C004", "C005"]);
    }

    #[test]
    fn test_load_history_missing_file() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::with_dir(dir.path().to_path_buf());
        assert!(load_history_impl(&cache, "search").unwrap().is_empty());
    }
}
