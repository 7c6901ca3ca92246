//! `key=value` tracking files in the local repository (`*.lastUpdated`,
//! `resolver-status.properties`, `_remote.repositories`).
//!
//! Several resolver processes may share one local repository, so every read
//! holds a shared lock and every update holds an exclusive lock on the
//! tracking file itself for the whole read-modify-write cycle.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs4::fs_std::FileExt;
use tracing::{debug, warn};

/// Reads and updates tracking files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingFileManager;

impl TrackingFileManager {
    pub fn new() -> Self {
        Self
    }

    /// The entries of a tracking file, or `None` when it does not exist or
    /// cannot be read.
    pub fn read(&self, path: &Path) -> Option<BTreeMap<String, String>> {
        let mut file = File::open(path).ok()?;
        if let Err(e) = FileExt::lock_shared(&file) {
            warn!("Failed to lock {}: {e}", path.display());
            return None;
        }
        let mut content = String::new();
        let result = file.read_to_string(&mut content);
        let _ = FileExt::unlock(&file);
        match result {
            Ok(_) => Some(parse_properties(&content)),
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                None
            }
        }
    }

    /// Apply `updates` to a tracking file, creating it if needed. A `None`
    /// value removes the key. Returns the entries after the update.
    pub fn update(
        &self,
        path: &Path,
        updates: &BTreeMap<String, Option<String>>,
    ) -> std::io::Result<BTreeMap<String, String>> {
        quarry_util::fs::ensure_parent(path)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        FileExt::lock_exclusive(&file)?;
        let result = rewrite(&mut file, updates);
        let _ = FileExt::unlock(&file);
        if result.is_ok() {
            debug!("updated tracking file {}", path.display());
        }
        result
    }
}

fn rewrite(
    file: &mut File,
    updates: &BTreeMap<String, Option<String>>,
) -> std::io::Result<BTreeMap<String, String>> {
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let mut entries = parse_properties(&content);
    for (key, value) in updates {
        match value {
            Some(v) => {
                entries.insert(key.clone(), v.clone());
            }
            None => {
                entries.remove(key);
            }
        }
    }
    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    file.write_all(format_properties(&entries).as_bytes())?;
    file.flush()?;
    Ok(entries)
}

/// Parse `key=value` lines. Blank lines and `#` comments are skipped; `:`
/// and `=` in keys are expected escaped with a backslash.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let mut key = String::new();
        let mut chars = line.chars();
        let mut value_start = None;
        let mut consumed = 0;
        while let Some(c) = chars.next() {
            consumed += c.len_utf8();
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        consumed += next.len_utf8();
                        key.push(next);
                    }
                }
                '=' | ':' => {
                    value_start = Some(consumed);
                    break;
                }
                _ => key.push(c),
            }
        }
        let value = value_start
            .map(|start| unescape(line[start..].trim_start()))
            .unwrap_or_default();
        entries.insert(key.trim_end().to_string(), value);
    }
    entries
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(text: &str, key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' | ':' if key => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize entries as sorted `key=value` lines.
pub fn format_properties(entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}
