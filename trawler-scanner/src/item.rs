use crate::canon::UrlRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a work item came from. Declaration order is scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemOrigin {
    Seed,
    FormAction,
    Discovered,
    ApiInferred,
    Fuzzed,
}

impl ItemOrigin {
    /// Lower is scheduled first.
    pub fn rank(&self) -> u8 {
        match self {
            ItemOrigin::Seed => 0,
            ItemOrigin::FormAction => 1,
            ItemOrigin::Discovered => 2,
            ItemOrigin::ApiInferred => 3,
            ItemOrigin::Fuzzed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOrigin::Seed => "seed",
            ItemOrigin::FormAction => "form-action",
            ItemOrigin::Discovered => "discovered",
            ItemOrigin::ApiInferred => "api-inferred",
            ItemOrigin::Fuzzed => "fuzzed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "HEAD" => Some(HttpMethod::Head),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }

    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Request body template for POST items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyTemplate {
    pub content_type: String,
    pub body: String,
}

impl BodyTemplate {
    pub fn form_urlencoded<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        Self {
            content_type: "application/x-www-form-urlencoded".to_string(),
            body,
        }
    }
}

/// A unit of fetch work. Consumed at most once by a fetch worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub url: UrlRecord,
    pub method: HttpMethod,
    pub parent: Option<String>,
    pub depth: usize,
    pub origin: ItemOrigin,
    pub body: Option<BodyTemplate>,
    pub headers: BTreeMap<String, String>,
    /// Lets callers opt a non-GET item into retries.
    pub idempotent: bool,
    pub retries: u32,
}

impl WorkItem {
    pub fn seed(url: UrlRecord) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            parent: None,
            depth: 0,
            origin: ItemOrigin::Seed,
            body: None,
            headers: BTreeMap::new(),
            idempotent: true,
            retries: 0,
        }
    }

    /// Child of `parent`. Fuzzed items keep the parent's depth; every other
    /// origin goes one level deeper.
    pub fn child(parent: &WorkItem, url: UrlRecord, origin: ItemOrigin) -> Self {
        let depth = match origin {
            ItemOrigin::Fuzzed => parent.depth,
            _ => parent.depth + 1,
        };
        Self {
            url,
            method: HttpMethod::Get,
            parent: Some(parent.url.canonical.clone()),
            depth,
            origin,
            body: None,
            headers: BTreeMap::new(),
            idempotent: true,
            retries: 0,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.idempotent = method.is_idempotent();
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: BodyTemplate) -> Self {
        self.body = Some(body);
        self
    }

    pub fn may_retry(&self) -> bool {
        self.method.is_idempotent() || self.idempotent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::canonicalize;

    #[test]
    fn test_child_depths() {
        let seed = WorkItem::seed(canonicalize("http://e.test/", None).unwrap());
        let link = WorkItem::child(
            &seed,
            canonicalize("http://e.test/a", None).unwrap(),
            ItemOrigin::Discovered,
        );
        assert_eq!(link.depth, 1);
        assert_eq!(link.parent.as_deref(), Some("http://e.test/"));

        let fuzzed = WorkItem::child(
            &link,
            canonicalize("http://e.test/a?id=1", None).unwrap(),
            ItemOrigin::Fuzzed,
        );
        assert_eq!(fuzzed.depth, 1);
    }

    #[test]
    fn test_post_not_retryable_unless_flagged() {
        let seed = WorkItem::seed(canonicalize("http://e.test/", None).unwrap());
        let post = seed.clone().with_method(HttpMethod::Post);
        assert!(!post.may_retry());
        let mut flagged = post;
        flagged.idempotent = true;
        assert!(flagged.may_retry());
    }

    #[test]
    fn test_origin_rank_order() {
        assert!(ItemOrigin::Seed.rank() < ItemOrigin::FormAction.rank());
        assert!(ItemOrigin::Discovered.rank() < ItemOrigin::ApiInferred.rank());
        assert!(ItemOrigin::ApiInferred.rank() < ItemOrigin::Fuzzed.rank());
    }
}
