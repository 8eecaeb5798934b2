use anyhow::{anyhow, Context};
use log::debug;
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::types::MagId;

pub const TAB: u8 = b'\t';
pub const COMMA: u8 = b',';

/// Zero-byte files are how upstream steps say "nothing to report".
pub fn is_empty_file<P: AsRef<Path>>(path: P) -> anyhow::Result<bool> {
    let path = path.as_ref();
    let meta =
        std::fs::metadata(path).with_context(|| format!("Failed to stat: {}", path.display()))?;
    Ok(meta.len() == 0)
}

pub fn read_table<T, P>(path: P, delimiter: u8, has_headers: bool) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open table: {}", path.display()))?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .with_context(|| format!("Malformed table: {}", path.display()))?;

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn read_tsv<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<T>> {
    read_table(path, TAB, true)
}

pub fn read_csv<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<T>> {
    read_table(path, COMMA, true)
}

/// Keys rows by normalized MAG id, so every source joins on the same form.
/// A MAG listed twice in one source, or a row with no usable id, is an input error.
pub fn index_by_mag<T, F>(rows: Vec<T>, key: F, source: &Path) -> anyhow::Result<HashMap<MagId, T>>
where
    F: Fn(&T) -> &str,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let raw = key(&row);
        let mag = MagId::normalize(raw);
        if mag.is_empty() {
            return Err(anyhow!("Bad MAG id {:?} in {}", raw, source.display()));
        }
        if index.contains_key(&mag) {
            return Err(anyhow!(
                "MAG {} appears more than once in {}",
                mag,
                source.display()
            ));
        }
        index.insert(mag, row);
    }
    Ok(index)
}

/// Files in `dir` whose name contains one of `exts`, sorted by name.
pub fn list_with_extensions<P: AsRef<Path>>(dir: P, exts: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list dir: {}", dir.display()))?;

    let mut paths = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                exts.iter()
                    .any(|ext| filename.to_lowercase().contains(ext))
            } else {
                false
            }
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}
