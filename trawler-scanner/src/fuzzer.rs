use crate::canon::{UrlClass, canonicalize};
use crate::dedup::{Deduplicator, Mark};
use crate::item::{BodyTemplate, HttpMethod, ItemOrigin, WorkItem};
use crate::result::PageResult;
use std::collections::BTreeMap;
use tracing::debug;

/// Parameter names tried when no dictionary is configured.
pub const DEFAULT_PARAMS: &[&str] = &[
    "id", "page", "q", "search", "query", "user", "username", "email", "name", "file", "path",
    "url", "redirect", "next", "callback", "token", "lang", "type", "category", "action", "debug",
    "sort", "limit", "offset",
];

pub const DEFAULT_PARAM_LIMIT: usize = 8;
pub const DEFAULT_POST_LIMIT: usize = 4;

/// Value used for a fuzzed parameter.
pub fn placeholder(name: &str) -> &'static str {
    match name.to_ascii_lowercase().as_str() {
        "id" | "page" | "limit" | "offset" => "1",
        "email" => "test@example.com",
        "url" | "redirect" => "https://example.com",
        _ => "test",
    }
}

/// Expands parameterless endpoints into query and POST variants.
pub struct ParamFuzzer {
    params: Vec<String>,
    param_limit: usize,
    post_limit: usize,
    fuzz_post: bool,
}

impl ParamFuzzer {
    pub fn new(params: Vec<String>) -> Self {
        let params = if params.is_empty() {
            DEFAULT_PARAMS.iter().map(|p| p.to_string()).collect()
        } else {
            params
        };
        Self {
            params,
            param_limit: DEFAULT_PARAM_LIMIT,
            post_limit: DEFAULT_POST_LIMIT,
            fuzz_post: true,
        }
    }

    pub fn with_limits(mut self, param_limit: usize, post_limit: usize) -> Self {
        self.param_limit = param_limit;
        self.post_limit = post_limit;
        self
    }

    pub fn with_post(mut self, enabled: bool) -> Self {
        self.fuzz_post = enabled;
        self
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    fn eligible_for_query(item: &WorkItem, result: &PageResult) -> bool {
        result.is_success()
            && item.origin != ItemOrigin::Fuzzed
            && item.method == HttpMethod::Get
            && !item.url.has_params()
            && matches!(
                item.url.class,
                UrlClass::Normal | UrlClass::Ajax | UrlClass::Restful
            )
    }

    /// Variants for `item`, each already recorded as fresh in `dedup`.
    pub fn expand(&self, item: &WorkItem, result: &PageResult, dedup: &Deduplicator) -> Vec<WorkItem> {
        let mut variants = Vec::new();
        if Self::eligible_for_query(item, result) {
            variants.extend(self.query_variants(item, dedup));
        }
        if self.fuzz_post && result.is_success() && item.origin != ItemOrigin::Fuzzed {
            variants.extend(self.post_variants(item, result, dedup));
        }
        variants
    }

    fn query_variants(&self, item: &WorkItem, dedup: &Deduplicator) -> Vec<WorkItem> {
        let mut out = Vec::new();
        if self.param_limit == 0 || self.params.is_empty() {
            return out;
        }
        let combine = self.params.len() > 1 && self.param_limit > 1;
        let singles = if combine { self.param_limit - 1 } else { self.param_limit };

        for name in &self.params {
            if out.len() >= singles {
                break;
            }
            let query = [(name.as_str(), placeholder(name))];
            if let Some(variant) = self.query_variant(item, &query, dedup) {
                out.push(variant);
            }
        }

        if combine && out.len() < self.param_limit {
            let query: Vec<(&str, &str)> = self
                .params
                .iter()
                .take(3)
                .map(|n| (n.as_str(), placeholder(n)))
                .collect();
            if let Some(variant) = self.query_variant(item, &query, dedup) {
                out.push(variant);
            }
        }

        debug!("{} query variants for {}", out.len(), item.url);
        out
    }

    fn query_variant(&self, item: &WorkItem, query: &[(&str, &str)], dedup: &Deduplicator) -> Option<WorkItem> {
        let mut url = item.url.url()?;
        url.query_pairs_mut().clear().extend_pairs(query.iter());
        let record = canonicalize(url.as_str(), None).ok()?;
        match dedup.mark(&record) {
            Mark::Fresh => Some(WorkItem::child(item, record, ItemOrigin::Fuzzed)),
            Mark::Duplicate => None,
        }
    }

    fn post_variants(&self, item: &WorkItem, result: &PageResult, dedup: &Deduplicator) -> Vec<WorkItem> {
        let mut out = Vec::new();
        for form in result.forms.iter().filter(|f| !f.has_named_fields()) {
            let Ok(action) = canonicalize(&form.action, None) else {
                continue;
            };
            let mut emitted = 0;
            for name in &self.params {
                if emitted >= self.post_limit {
                    break;
                }
                let mut params = BTreeMap::new();
                params.insert(name.clone(), placeholder(name).to_string());
                let template = BodyTemplate::form_urlencoded(params.iter());

                if dedup.mark_request(&action, HttpMethod::Post, Some(&template.body)) == Mark::Fresh {
                    let variant = WorkItem::child(item, action.clone(), ItemOrigin::Fuzzed)
                        .with_method(HttpMethod::Post)
                        .with_body(template);
                    out.push(variant);
                    emitted += 1;
                }
            }
        }
        out
    }
}

impl Default for ParamFuzzer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FormDescriptor;

    fn page(url: &str) -> (WorkItem, PageResult) {
        let mut item = WorkItem::seed(canonicalize(url, None).unwrap());
        item.depth = 2;
        let mut result = PageResult::new(&item);
        result.status_code = 200;
        (item, result)
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholder("id"), "1");
        assert_eq!(placeholder("email"), "test@example.com");
        assert_eq!(placeholder("redirect"), "https://example.com");
        assert_eq!(placeholder("anything"), "test");
    }

    #[test]
    fn test_query_variants_respect_limit_and_depth() {
        let (item, result) = page("http://e.test/search");
        let dedup = Deduplicator::default();
        let fuzzer = ParamFuzzer::default();
        let variants = fuzzer.expand(&item, &result, &dedup);

        assert_eq!(variants.len(), DEFAULT_PARAM_LIMIT);
        assert_eq!(variants[0].url.canonical, "http://e.test/search?id=1");
        assert_eq!(
            variants.last().unwrap().url.canonical,
            "http://e.test/search?id=1&page=1&q=test"
        );
        for v in &variants {
            assert_eq!(v.origin, ItemOrigin::Fuzzed);
            assert_eq!(v.depth, 2);
            assert_eq!(v.parent.as_deref(), Some("http://e.test/search"));
        }
    }

    #[test]
    fn test_duplicates_do_not_count() {
        let (item, result) = page("http://e.test/list");
        let dedup = Deduplicator::default();
        dedup.mark(&canonicalize("http://e.test/list?id=1", None).unwrap());
        let fuzzer = ParamFuzzer::new(vec!["id".into(), "page".into()]).with_limits(8, 0);
        let variants = fuzzer.expand(&item, &result, &dedup);
        let urls: Vec<_> = variants.iter().map(|v| v.url.canonical.as_str()).collect();
        assert_eq!(urls, vec!["http://e.test/list?page=1", "http://e.test/list?id=1&page=1"]);
    }

    #[test]
    fn test_ineligible_endpoints() {
        let dedup = Deduplicator::default();
        let fuzzer = ParamFuzzer::default();

        let (item, result) = page("http://e.test/p?x=1");
        assert!(fuzzer.expand(&item, &result, &dedup).is_empty());

        let (item, result) = page("http://e.test/logo.png");
        assert!(fuzzer.expand(&item, &result, &dedup).is_empty());

        let (mut item, result) = page("http://e.test/a");
        item.origin = ItemOrigin::Fuzzed;
        assert!(fuzzer.expand(&item, &result, &dedup).is_empty());

        let (item, mut result) = page("http://e.test/b");
        result.status_code = 404;
        assert!(fuzzer.expand(&item, &result, &dedup).is_empty());
    }

    #[test]
    fn test_post_variants_for_fieldless_forms() {
        let (item, mut result) = page("http://e.test/contact?x=1");
        result.forms.push(FormDescriptor {
            method: HttpMethod::Post,
            action: "http://e.test/submit".to_string(),
            enctype: "application/x-www-form-urlencoded".to_string(),
            fields: Vec::new(),
        });
        let dedup = Deduplicator::default();
        let variants = ParamFuzzer::default().expand(&item, &result, &dedup);

        assert_eq!(variants.len(), DEFAULT_POST_LIMIT);
        assert!(variants.iter().all(|v| v.method == HttpMethod::Post));
        assert_eq!(variants[0].body.as_ref().unwrap().body, "id=1");
        assert!(!variants[0].may_retry());

        let again = ParamFuzzer::default().expand(&item, &result, &dedup);
        assert!(again.is_empty());
    }

    #[test]
    fn test_post_fuzzing_can_be_disabled() {
        let (item, mut result) = page("http://e.test/contact?x=1");
        result.forms.push(FormDescriptor {
            method: HttpMethod::Post,
            action: "http://e.test/submit".to_string(),
            enctype: "application/x-www-form-urlencoded".to_string(),
            fields: Vec::new(),
        });
        let variants = ParamFuzzer::default()
            .with_post(false)
            .expand(&item, &result, &Deduplicator::default());
        assert!(variants.is_empty());
    }
}
