// Sensitive-rule catalog files

use crate::error::{CoreError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use trawler_scanner::sensitive::{Rule, RuleCatalog};

/// Reads a user catalog file in the built-in catalog's JSON shape.
pub fn load_catalog(path: &Path) -> Result<RuleCatalog> {
    let content = fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    RuleCatalog::from_json(&content).map_err(|e| CoreError::RulesInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Built-in catalog with the user catalog at `path` layered on top. Rules with
/// the same name are replaced by the user's version.
pub fn resolve_catalog(path: Option<&Path>) -> Result<RuleCatalog> {
    let mut catalog = RuleCatalog::builtin()?;
    if let Some(path) = path {
        let user = load_catalog(path)?;
        info!(
            "Loaded {} rules from {}, merging over {} built-in rules",
            user.len(),
            path.display(),
            catalog.len()
        );
        catalog.merge(user);
    }
    debug!("Rule catalog version {} with {} rules", catalog.version, catalog.len());
    Ok(catalog)
}

/// Compiles every rule and reports the ones that fail, for `--rules` checks
/// before a run starts.
pub fn validate_catalog(catalog: &RuleCatalog) -> Vec<(String, String)> {
    catalog
        .rules
        .iter()
        .filter_map(|(name, spec)| {
            Rule::compile(name, spec)
                .err()
                .map(|e| (name.clone(), e.to_string()))
        })
        .collect()
}
