use crate::canon::{UrlClass, UrlHash, UrlRecord};
use crate::item::HttpMethod;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Fresh,
    Duplicate,
}

/// Per-pattern caps. `None` means unlimited.
#[derive(Debug, Clone, Copy)]
pub struct PatternCaps {
    /// Applies to any URL whose pattern key replaced an id segment.
    pub id_pattern: Option<usize>,
    /// Applies to file-param URLs (`download?file=a.pdf` echo variants).
    pub file_param: Option<usize>,
}

impl Default for PatternCaps {
    fn default() -> Self {
        Self {
            id_pattern: None,
            file_param: Some(1),
        }
    }
}

#[derive(Default)]
struct Seen {
    exact: HashSet<UrlHash>,
    patterns: HashMap<String, usize>,
}

/// Visited-set for the whole run. A URL is a duplicate when its canonical hash
/// was seen before, or when its pattern key already hit the cap for its kind.
pub struct Deduplicator {
    seen: Mutex<Seen>,
    caps: PatternCaps,
}

impl Deduplicator {
    pub fn new(caps: PatternCaps) -> Self {
        Self {
            seen: Mutex::new(Seen::default()),
            caps,
        }
    }

    fn cap_for(&self, record: &UrlRecord) -> Option<usize> {
        let mut cap = None;
        if record.class == UrlClass::FileParam {
            cap = self.caps.file_param;
        }
        if record.has_id_segments() {
            cap = match (cap, self.caps.id_pattern) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        cap
    }

    /// Checks and records `record` in one step.
    pub fn mark(&self, record: &UrlRecord) -> Mark {
        let cap = self.cap_for(record);
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        if seen.exact.contains(&record.hash) {
            return Mark::Duplicate;
        }
        if let Some(cap) = cap {
            let count = seen.patterns.get(&record.pattern_key).copied().unwrap_or(0);
            if count >= cap {
                return Mark::Duplicate;
            }
        }

        seen.exact.insert(record.hash);
        *seen.patterns.entry(record.pattern_key.clone()).or_insert(0) += 1;
        Mark::Fresh
    }

    /// Like `mark`, for requests whose identity includes method and body.
    /// Body-carrying requests are tracked by exact identity only.
    pub fn mark_request(&self, record: &UrlRecord, method: HttpMethod, body: Option<&str>) -> Mark {
        let Some(body) = body else {
            return self.mark(record);
        };
        let identity = UrlHash::of(&format!("{} {} {}", method.as_str(), record.canonical, body));
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        if seen.exact.insert(identity) {
            Mark::Fresh
        } else {
            Mark::Duplicate
        }
    }

    /// Read-only probe; does not record anything.
    pub fn contains(&self, record: &UrlRecord) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.exact.contains(&record.hash)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(PatternCaps::default())
    }
}
