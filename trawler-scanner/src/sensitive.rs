use crate::error::{Result, ScanError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

const BUILTIN_RULES: &str = include_str!("../rules/default_rules.json");

pub const DEFAULT_CONTEXT_BYTES: usize = 40;
pub const DEFAULT_SCAN_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub severity: Severity,
    pub matched: String,
    pub context: String,
    pub url: String,
    pub description: String,
}

/// Uncompiled rule as it appears in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub severity: Severity,
    #[serde(default)]
    pub mask: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleCatalog {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    pub rules: BTreeMap<String, RuleSpec>,
}

impl RuleCatalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RULES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overlays `other` by rule name. Rules in `other` replace ours.
    pub fn merge(&mut self, other: RuleCatalog) {
        if !other.version.is_empty() {
            self.version = other.version;
        }
        for (name, spec) in other.rules {
            self.rules.insert(name, spec);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compiles every rule. Broken patterns are logged and skipped.
    pub fn compile(&self) -> Vec<Rule> {
        let mut compiled = Vec::with_capacity(self.rules.len());
        for (name, spec) in &self.rules {
            match Rule::compile(name, spec) {
                Ok(rule) => compiled.push(rule),
                Err(e) => warn!("Skipping rule: {}", e),
            }
        }
        compiled
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub regex: Regex,
    pub severity: Severity,
    pub mask: bool,
    pub description: String,
}

impl Rule {
    pub fn compile(name: &str, spec: &RuleSpec) -> Result<Self> {
        let regex = Regex::new(&spec.pattern).map_err(|e| ScanError::RuleCompile {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            regex,
            severity: spec.severity,
            mask: spec.mask,
            description: spec.description.clone(),
        })
    }
}

/// Keeps the first and last four characters. Short values are hidden entirely.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let mut out = String::with_capacity(value.len());
    out.extend(&chars[..4]);
    out.push_str(&"*".repeat(chars.len() - 8));
    out.extend(&chars[chars.len() - 4..]);
    out
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    &s[..floor_boundary(s, max)]
}

pub struct SensitiveScanner {
    rules: Vec<Rule>,
    context_bytes: usize,
    max_scan_bytes: usize,
    reported: Mutex<HashSet<(String, String, String)>>,
}

impl SensitiveScanner {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            context_bytes: DEFAULT_CONTEXT_BYTES,
            max_scan_bytes: DEFAULT_SCAN_BYTES,
            reported: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_catalog(catalog: &RuleCatalog) -> Self {
        Self::new(catalog.compile())
    }

    pub fn with_context_bytes(mut self, bytes: usize) -> Self {
        self.context_bytes = bytes;
        self
    }

    pub fn with_max_scan_bytes(mut self, bytes: usize) -> Self {
        self.max_scan_bytes = bytes;
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Runs every rule over `body`, returning findings not reported earlier in
    /// this run.
    pub fn scan(&self, url: &str, body: &str) -> Vec<Finding> {
        let body = truncate_to_boundary(body, self.max_scan_bytes);
        let mut findings = Vec::new();

        for rule in &self.rules {
            for m in rule.regex.find_iter(body) {
                if m.as_str().is_empty() {
                    continue;
                }
                let shown = if rule.mask {
                    mask_value(m.as_str())
                } else {
                    m.as_str().to_string()
                };

                let key = (rule.name.clone(), shown.clone(), url.to_string());
                {
                    let mut reported = self.reported.lock().unwrap_or_else(|e| e.into_inner());
                    if !reported.insert(key) {
                        continue;
                    }
                }

                let context = self.context(body, m.start(), m.end(), &shown);
                debug!("{} matched on {}", rule.name, url);
                findings.push(Finding {
                    rule: rule.name.clone(),
                    severity: rule.severity,
                    matched: shown,
                    context,
                    url: url.to_string(),
                    description: rule.description.clone(),
                });
            }
        }

        findings
    }

    fn context(&self, body: &str, start: usize, end: usize, shown: &str) -> String {
        let lo = floor_boundary(body, start.saturating_sub(self.context_bytes));
        let hi = ceil_boundary(body, end.saturating_add(self.context_bytes));
        let mut context = String::with_capacity(hi - lo);
        context.push_str(&body[lo..start]);
        context.push_str(shown);
        context.push_str(&body[end..hi]);
        context.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn reported_count(&self) -> usize {
        self.reported.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
