// Parameter dictionaries for the parameter fuzzer

use crate::error::{CoreError, Result};
use std::fs;
use std::path::Path;

/// Splits a comma separated `--fuzz-params` value.
pub fn parse_param_list(list: &str) -> Vec<String> {
    let mut params = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !params.iter().any(|p: &String| p == name) {
            params.push(name.to_string());
        }
    }
    params
}

/// Loads one parameter name per line. Blank lines and `#` comments are
/// skipped, duplicates keep their first position.
pub fn load_param_dictionary(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut params: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !params.iter().any(|p| p == line) {
            params.push(line.to_string());
        }
    }

    if params.is_empty() {
        return Err(CoreError::DictionaryEmpty(path.to_path_buf()));
    }
    Ok(params)
}

/// Dictionary file entries first, then inline names not already present.
pub fn merge_params(dictionary: Vec<String>, inline: Vec<String>) -> Vec<String> {
    let mut merged = dictionary;
    for name in inline {
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    merged
}
