use crate::canon::{CanonReject, ResourceBucket, SpecialKind, canonicalize, path_extension};
use crate::error::Result;
use crate::item::HttpMethod;
use crate::result::{
    ApiHint, FormDescriptor, FormField, HintSource, PageResult, PostDescriptor, SpecialLinks,
    StaticResources,
};
use regex::{Match, Regex};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

/// Everything pulled out of one response body. Lists keep document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub links: Vec<String>,
    pub forms: Vec<FormDescriptor>,
    pub api_hints: Vec<ApiHint>,
    pub post_requests: Vec<PostDescriptor>,
    pub static_resources: StaticResources,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
    pub special_links: SpecialLinks,
}

impl Extraction {
    pub fn apply_to(self, result: &mut PageResult) {
        result.links = self.links;
        result.forms = self.forms;
        result.api_hints = self.api_hints;
        result.post_requests = self.post_requests;
        result.static_resources = self.static_resources;
        result.scripts = self.scripts;
        result.stylesheets = self.stylesheets;
        result.special_links = self.special_links;
    }

    pub fn add_link(&mut self, url: String) {
        push_once(&mut self.links, url);
    }

    pub fn add_api_hint(&mut self, hint: ApiHint) {
        if !self
            .api_hints
            .iter()
            .any(|h| h.url == hint.url && h.method == hint.method)
        {
            self.api_hints.push(hint);
        }
    }

    pub fn add_post(&mut self, post: PostDescriptor) {
        if !self
            .post_requests
            .iter()
            .any(|p| p.url == post.url && p.method == post.method && p.params == post.params)
        {
            self.post_requests.push(post);
        }
    }

    /// Union with another view of the same page, keeping first-seen order.
    pub fn merge(&mut self, other: Extraction) {
        for link in other.links {
            self.add_link(link);
        }
        for form in other.forms {
            push_once(&mut self.forms, form);
        }
        for hint in other.api_hints {
            self.add_api_hint(hint);
        }
        for post in other.post_requests {
            self.add_post(post);
        }
        self.static_resources.merge(&other.static_resources);
        for script in other.scripts {
            push_once(&mut self.scripts, script);
        }
        for sheet in other.stylesheets {
            push_once(&mut self.stylesheets, sheet);
        }
        self.special_links.merge(&other.special_links);
    }
}

fn push_once<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Script,
    Css,
    Json,
    Other,
}

impl ContentKind {
    /// Decides by content type, then by URL extension, then by sniffing.
    pub fn detect(content_type: Option<&str>, url: &Url, body: &str) -> Self {
        if let Some(ct) = content_type {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("html") {
                return ContentKind::Html;
            }
            if ct.contains("javascript") || ct.contains("ecmascript") {
                return ContentKind::Script;
            }
            if ct.contains("text/css") {
                return ContentKind::Css;
            }
            if ct.contains("json") {
                return ContentKind::Json;
            }
        }
        match path_extension(url.path()).as_deref() {
            Some("js") | Some("mjs") => return ContentKind::Script,
            Some("css") => return ContentKind::Css,
            Some("json") => return ContentKind::Json,
            _ => {}
        }
        let head: String = body.trim_start().chars().take(256).collect();
        let head = head.to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            ContentKind::Html
        } else {
            ContentKind::Other
        }
    }
}

struct ScriptPatterns {
    api_literal: Regex,
    fetch: Regex,
    axios: Regex,
    jquery: Regex,
    xhr_open: Regex,
    location: Regex,
    websocket: Regex,
    css_url: Regex,
    css_import: Regex,
}

impl ScriptPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            api_literal: Regex::new(
                r#"["'`]((?:https?://[^"'`\s/]+)?/(?:api|rest|ajax|v\d+)/[^"'`\s]*)["'`]"#,
            )?,
            fetch: Regex::new(
                r#"fetch\s*\(\s*["'`]([^"'`]+)["'`]\s*(?:,\s*\{[^}]*?method\s*:\s*["'`](\w+)["'`])?"#,
            )?,
            axios: Regex::new(
                r#"axios\s*\.\s*(get|post|put|delete|patch|head|options)\s*\(\s*["'`]([^"'`]+)["'`]"#,
            )?,
            jquery: Regex::new(r#"\$\s*\.\s*(ajax|get|post|getJSON)\s*\(\s*["'`]([^"'`]+)["'`]"#)?,
            xhr_open: Regex::new(
                r#"\.open\s*\(\s*["']((?i:GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS))["']\s*,\s*["'`]([^"'`]+)["'`]"#,
            )?,
            location: Regex::new(
                r#"(?:window\.|document\.)?location(?:\.href)?\s*=\s*["'`]([^"'`]+)["'`]"#,
            )?,
            websocket: Regex::new(r#"wss?://[^"'`\s<>()]+"#)?,
            css_url: Regex::new(r#"url\(\s*["']?([^"')\s]+)["']?\s*\)"#)?,
            css_import: Regex::new(r#"@import\s+["']([^"']+)["']"#)?,
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Bad selector {}: {:?}", css, e);
            None
        }
    }
}

fn select<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    selector(css)
        .map(|sel| root.select(&sel).collect())
        .unwrap_or_default()
}

fn is_templated(raw: &str) -> bool {
    raw.contains("${") || raw.contains("{{")
}

/// `"/api/users/" + id` and `base + "/api"` only hold part of a URL. The
/// captured literal sits directly between its quotes.
fn is_concatenated(code: &str, literal: &Match<'_>) -> bool {
    let before = code
        .get(..literal.start().saturating_sub(1))
        .unwrap_or("")
        .trim_end();
    let after = code.get(literal.end() + 1..).unwrap_or("").trim_start();
    before.ends_with('+') || after.starts_with('+')
}

/// Pulls links, forms, assets and endpoint hints out of HTML, JavaScript and
/// CSS bodies. Never fails on malformed input.
pub struct StaticExtractor {
    patterns: ScriptPatterns,
}

impl StaticExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: ScriptPatterns::new()?,
        })
    }

    pub fn extract(
        &self,
        body: &str,
        content_type: Option<&str>,
        page_url: &Url,
        redirect_chain: &[String],
    ) -> Extraction {
        let mut out = Extraction::default();
        for target in redirect_chain {
            if let Some(link) = self.resolve(&mut out, target, page_url) {
                out.add_link(link);
            }
        }

        match ContentKind::detect(content_type, page_url, body) {
            ContentKind::Html => self.extract_html(&mut out, body, page_url),
            ContentKind::Script | ContentKind::Json => self.scan_script(&mut out, body, page_url),
            ContentKind::Css => self.scan_css(&mut out, body, page_url),
            ContentKind::Other => {}
        }
        out
    }

    /// Resolves `raw` to a canonical http(s) URL. Special-protocol links are
    /// recorded on the extraction and yield `None`.
    fn resolve(&self, out: &mut Extraction, raw: &str, base: &Url) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') || raw.to_ascii_lowercase().starts_with("javascript:") {
            return None;
        }
        match canonicalize(raw, Some(base)) {
            Ok(record) => Some(record.canonical),
            Err(CanonReject::SpecialScheme(kind)) => {
                out.special_links.insert(kind, raw.to_string());
                None
            }
            Err(e) => {
                debug!("Skipping {}: {}", raw, e);
                None
            }
        }
    }

    fn extract_html(&self, out: &mut Extraction, body: &str, page_url: &Url) {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let base = select(root, "base[href]")
            .first()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| page_url.join(href).ok())
            .unwrap_or_else(|| page_url.clone());

        for el in select(root, "a[href], area[href], link[href], iframe[src], frame[src]") {
            let element = el.value();
            if element.name() == "link" && is_stylesheet(el) {
                continue;
            }
            let Some(raw) = element.attr("href").or_else(|| element.attr("src")) else {
                continue;
            };
            if let Some(code) = raw.trim().strip_prefix("javascript:") {
                self.scan_script(out, code, &base);
                continue;
            }
            if let Some(link) = self.resolve(out, raw, &base) {
                out.add_link(link);
            }
        }

        self.extract_static_refs(out, root, &base);

        for form in select(root, "form") {
            let descriptor = self.form_descriptor(form, &base);
            if descriptor.method == HttpMethod::Post {
                out.add_post(PostDescriptor {
                    url: descriptor.action.clone(),
                    method: HttpMethod::Post,
                    params: descriptor.params(),
                    content_type: descriptor.enctype.clone(),
                });
            }
            out.forms.push(descriptor);
        }

        for script in select(root, "script") {
            if script.value().attr("src").is_none() {
                let code: String = script.text().collect();
                self.scan_script(out, &code, &base);
            }
        }
        for style in select(root, "style") {
            let css: String = style.text().collect();
            self.scan_css(out, &css, &base);
        }
    }

    fn extract_static_refs(&self, out: &mut Extraction, root: ElementRef<'_>, base: &Url) {
        for el in select(
            root,
            "img[src], img[srcset], script[src], link[href], source[src], source[srcset], video[src], audio[src]",
        ) {
            let element = el.value();
            match element.name() {
                "script" => {
                    if let Some(src) = element.attr("src")
                        && let Some(url) = self.resolve(out, src, base)
                    {
                        push_once(&mut out.scripts, url);
                    }
                }
                "link" => {
                    if is_stylesheet(el)
                        && let Some(href) = element.attr("href")
                        && let Some(url) = self.resolve(out, href, base)
                    {
                        push_once(&mut out.stylesheets, url);
                    }
                }
                tag => {
                    let fallback = match tag {
                        "img" => ResourceBucket::Images,
                        "audio" => ResourceBucket::Audios,
                        _ => ResourceBucket::Videos,
                    };
                    let mut sources: Vec<&str> = element.attr("src").into_iter().collect();
                    if let Some(srcset) = element.attr("srcset") {
                        sources.extend(
                            srcset
                                .split(',')
                                .filter_map(|entry| entry.split_whitespace().next()),
                        );
                    }
                    for src in sources {
                        if let Some(url) = self.resolve(out, src, base) {
                            add_resource(out, url, fallback);
                        }
                    }
                }
            }
        }
    }

    fn form_descriptor(&self, form: ElementRef<'_>, base: &Url) -> FormDescriptor {
        let element = form.value();
        let method = element
            .attr("method")
            .and_then(HttpMethod::parse)
            .unwrap_or(HttpMethod::Get);
        let action = element
            .attr("action")
            .filter(|a| !a.trim().is_empty())
            .and_then(|a| canonicalize(a, Some(base)).ok())
            .or_else(|| canonicalize(base.as_str(), None).ok())
            .map(|record| record.canonical)
            .unwrap_or_else(|| base.to_string());
        let enctype = element
            .attr("enctype")
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| FORM_URLENCODED.to_string());

        let mut fields = Vec::new();
        for field in select(form, "input[name], select[name], textarea[name]") {
            let el = field.value();
            let Some(name) = el.attr("name").map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let (field_type, default_value) = match el.name() {
                "select" => {
                    let chosen = select(field, "option[selected]")
                        .into_iter()
                        .next()
                        .or_else(|| select(field, "option").into_iter().next());
                    let value = chosen.map(|opt| {
                        opt.value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| opt.text().collect::<String>().trim().to_string())
                    });
                    ("select".to_string(), value)
                }
                "textarea" => {
                    let text: String = field.text().collect();
                    ("textarea".to_string(), Some(text).filter(|t| !t.is_empty()))
                }
                _ => (
                    el.attr("type")
                        .map(|t| t.to_ascii_lowercase())
                        .unwrap_or_else(|| "text".to_string()),
                    el.attr("value").map(str::to_string),
                ),
            };
            fields.push(FormField {
                name: name.to_string(),
                field_type,
                default_value,
            });
        }

        FormDescriptor {
            method,
            action,
            enctype,
            fields,
        }
    }

    fn hint(
        &self,
        out: &mut Extraction,
        code: &str,
        literal: Option<Match<'_>>,
        base: &Url,
        method: Option<HttpMethod>,
        source: HintSource,
    ) {
        let Some(literal) = literal else {
            return;
        };
        let raw = literal.as_str();
        if is_templated(raw) || is_concatenated(code, &literal) {
            return;
        }
        let Some(url) = self.resolve(out, raw, base) else {
            return;
        };
        if let Some(method) = method
            && matches!(
                method,
                HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete
            )
        {
            let content_type = match source {
                HintSource::Axios | HintSource::Fetch => JSON,
                _ => FORM_URLENCODED,
            };
            out.add_post(PostDescriptor {
                url: url.clone(),
                method,
                params: Default::default(),
                content_type: content_type.to_string(),
            });
        }
        out.add_api_hint(ApiHint { url, method, source });
    }

    /// Scans JavaScript (inline or served) for endpoint references.
    pub fn scan_script(&self, out: &mut Extraction, code: &str, base: &Url) {
        let p = &self.patterns;

        for cap in p.fetch.captures_iter(code) {
            let method = cap.get(2).and_then(|m| HttpMethod::parse(m.as_str()));
            self.hint(out, code, cap.get(1), base, method.or(Some(HttpMethod::Get)), HintSource::Fetch);
        }
        for cap in p.axios.captures_iter(code) {
            self.hint(out, code, cap.get(2), base, HttpMethod::parse(&cap[1]), HintSource::Axios);
        }
        for cap in p.jquery.captures_iter(code) {
            let method = match &cap[1] {
                "post" => Some(HttpMethod::Post),
                "get" | "getJSON" => Some(HttpMethod::Get),
                _ => None,
            };
            self.hint(out, code, cap.get(2), base, method, HintSource::Jquery);
        }
        for cap in p.xhr_open.captures_iter(code) {
            self.hint(out, code, cap.get(2), base, HttpMethod::parse(&cap[1]), HintSource::Xhr);
        }
        for cap in p.location.captures_iter(code) {
            self.hint(out, code, cap.get(1), base, Some(HttpMethod::Get), HintSource::Location);
        }
        for cap in p.api_literal.captures_iter(code) {
            self.hint(out, code, cap.get(1), base, None, HintSource::Literal);
        }
        for m in p.websocket.find_iter(code) {
            out.special_links
                .insert(SpecialKind::WebSocket, m.as_str().to_string());
        }
    }

    pub fn scan_css(&self, out: &mut Extraction, css: &str, base: &Url) {
        let p = &self.patterns;
        let refs = p
            .css_url
            .captures_iter(css)
            .chain(p.css_import.captures_iter(css))
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect::<Vec<_>>();

        for raw in refs {
            if let Some(url) = self.resolve(out, &raw, base) {
                if path_extension(&url).as_deref() == Some("css") {
                    push_once(&mut out.stylesheets, url);
                } else {
                    add_resource(out, url, ResourceBucket::Images);
                }
            }
        }
    }
}

fn is_stylesheet(el: ElementRef<'_>) -> bool {
    el.value()
        .attr("rel")
        .map(|rel| {
            rel.split_whitespace()
                .any(|r| r.eq_ignore_ascii_case("stylesheet"))
        })
        .unwrap_or(false)
}

fn add_resource(out: &mut Extraction, url: String, fallback: ResourceBucket) {
    let bucket = Url::parse(&url)
        .ok()
        .and_then(|u| path_extension(u.path()))
        .and_then(|ext| ResourceBucket::for_extension(&ext))
        .unwrap_or(fallback);
    out.static_resources.insert(bucket, url);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("http://e.test/dir/page.html").unwrap()
    }

    fn run(body: &str, content_type: &str) -> Extraction {
        StaticExtractor::new()
            .unwrap()
            .extract(body, Some(content_type), &page(), &[])
    }

    #[test]
    fn test_links_in_document_order() {
        let html = r##"
            <html><head><link rel="canonical" href="/canon"><link rel="stylesheet" href="/s.css"></head>
            <body>
                <a href="b.html">B</a>
                <a href="/a">A</a>
                <a href="#top">skip</a>
                <a href="javascript:void(0)">skip</a>
                <iframe src="/frame"></iframe>
                <area href="http://other.test/x">
                <a href="/a">dup</a>
            </body></html>"##;
        let out = run(html, "text/html");
        assert_eq!(
            out.links,
            vec![
                "http://e.test/canon",
                "http://e.test/dir/b.html",
                "http://e.test/a",
                "http://e.test/frame",
                "http://other.test/x",
            ]
        );
        assert_eq!(out.stylesheets, vec!["http://e.test/s.css"]);
    }

    #[test]
    fn test_forms_and_post_descriptors() {
        let html = r#"
            <form action="/login" method="post">
                <input type="text" name="user">
                <input type="password" name="pass" value="x">
                <select name="role"><option value="a">A</option><option value="b" selected>B</option></select>
                <textarea name="note">hi</textarea>
                <input type="submit">
            </form>
            <form><input name="q"></form>"#;
        let out = run(html, "text/html");
        assert_eq!(out.forms.len(), 2);

        let login = &out.forms[0];
        assert_eq!(login.method, HttpMethod::Post);
        assert_eq!(login.action, "http://e.test/login");
        assert_eq!(login.enctype, FORM_URLENCODED);
        let names: Vec<_> = login.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["user", "pass", "role", "note"]);
        assert_eq!(login.fields[2].default_value.as_deref(), Some("b"));
        assert_eq!(login.fields[3].default_value.as_deref(), Some("hi"));

        let search = &out.forms[1];
        assert_eq!(search.method, HttpMethod::Get);
        assert_eq!(search.action, "http://e.test/dir/page.html");

        assert_eq!(out.post_requests.len(), 1);
        assert_eq!(out.post_requests[0].params.get("pass").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_static_resources_bucketed() {
        let html = r#"
            <img src="/logo.png" srcset="/logo-2x.webp 2x, /logo-3x.webp 3x">
            <video src="/intro.mp4"></video>
            <audio src="/a.mp3"></audio>
            <script src="/app.js"></script>
            <a href="/files/report.pdf">report</a>"#;
        let out = run(html, "text/html");
        assert_eq!(
            out.static_resources.images,
            vec!["http://e.test/logo.png", "http://e.test/logo-2x.webp", "http://e.test/logo-3x.webp"]
        );
        assert_eq!(out.static_resources.videos, vec!["http://e.test/intro.mp4"]);
        assert_eq!(out.static_resources.audios, vec!["http://e.test/a.mp3"]);
        assert_eq!(out.scripts, vec!["http://e.test/app.js"]);
        assert!(out.links.contains(&"http://e.test/files/report.pdf".to_string()));
    }

    #[test]
    fn test_special_links_captured_not_followed() {
        let html = r#"
            <a href="mailto:admin@e.test">mail</a>
            <a href="tel:+15550100">call</a>
            <a href="ftp://files.e.test/pub">ftp</a>
            <script>var s = new WebSocket("wss://e.test/socket");</script>"#;
        let out = run(html, "text/html");
        assert!(out.links.is_empty());
        assert_eq!(out.special_links.mailto, vec!["mailto:admin@e.test"]);
        assert_eq!(out.special_links.tel, vec!["tel:+15550100"]);
        assert_eq!(out.special_links.ftp, vec!["ftp://files.e.test/pub"]);
        assert_eq!(out.special_links.websocket, vec!["wss://e.test/socket"]);
    }

    #[test]
    fn test_inline_script_api_hints() {
        let html = r#"<script>
            fetch("/api/users");
            fetch('/api/orders', { method: 'POST' });
            axios.put("/api/items/1");
            $.post("/ajax/save");
            var x = new XMLHttpRequest(); x.open("GET", "/rest/status");
            window.location = "/next";
            const base = "/v2/catalog";
            fetch(`/api/${id}`);
        </script>"#;
        let out = run(html, "text/html");
        let urls: Vec<_> = out.api_hints.iter().map(|h| h.url.as_str()).collect();
        assert!(urls.contains(&"http://e.test/api/users"));
        assert!(urls.contains(&"http://e.test/api/orders"));
        assert!(urls.contains(&"http://e.test/api/items/1"));
        assert!(urls.contains(&"http://e.test/ajax/save"));
        assert!(urls.contains(&"http://e.test/rest/status"));
        assert!(urls.contains(&"http://e.test/next"));
        assert!(urls.contains(&"http://e.test/v2/catalog"));
        assert!(!urls.iter().any(|u| u.contains("$")));

        let posts: Vec<_> = out
            .post_requests
            .iter()
            .map(|p| (p.url.as_str(), p.method))
            .collect();
        assert!(posts.contains(&("http://e.test/api/orders", HttpMethod::Post)));
        assert!(posts.contains(&("http://e.test/api/items/1", HttpMethod::Put)));
        assert!(posts.contains(&("http://e.test/ajax/save", HttpMethod::Post)));
    }

    #[test]
    fn test_plus_in_literal_is_not_concatenation() {
        let js = r#"
            fetch("/api/search?q=a+b");
            fetch("/api/users/" + id);
            const url = base + "/rest/tail";
        "#;
        let out = run(js, "application/javascript");
        let urls: Vec<_> = out.api_hints.iter().map(|h| h.url.as_str()).collect();
        assert!(urls.iter().any(|u| u.starts_with("http://e.test/api/search?q=")));
        assert!(!urls.iter().any(|u| u.contains("/api/users")));
        assert!(!urls.iter().any(|u| u.contains("/rest/tail")));
    }

    #[test]
    fn test_javascript_body() {
        let js = r#"export const load = () => fetch("https://e.test/api/v1/profile");"#;
        let out = StaticExtractor::new().unwrap().extract(
            js,
            Some("application/javascript"),
            &Url::parse("http://e.test/static/app.js").unwrap(),
            &[],
        );
        assert_eq!(out.api_hints[0].url, "https://e.test/api/v1/profile");
        assert_eq!(out.api_hints[0].source, HintSource::Fetch);
    }

    #[test]
    fn test_css_references() {
        let css = r#"
            @import "theme.css";
            body { background: url('/img/bg.jpg'); }
            @font-face { src: url(/fonts/f.woff2) format("woff2"); }"#;
        let out = run(css, "text/css");
        assert_eq!(out.stylesheets, vec!["http://e.test/dir/theme.css"]);
        assert_eq!(out.static_resources.images, vec!["http://e.test/img/bg.jpg"]);
        assert_eq!(out.static_resources.fonts, vec!["http://e.test/fonts/f.woff2"]);
    }

    #[test]
    fn test_redirect_chain_targets_become_links() {
        let out = StaticExtractor::new().unwrap().extract(
            "",
            Some("text/html"),
            &page(),
            &["http://e.test/landing".to_string()],
        );
        assert_eq!(out.links, vec!["http://e.test/landing"]);
    }

    #[test]
    fn test_malformed_html_does_not_panic() {
        let out = run("<html><a href='/ok'>x<div><<<form action=>", "text/html");
        assert!(out.links.contains(&"http://e.test/ok".to_string()));
    }

    #[test]
    fn test_base_href_respected() {
        let out = run(
            r#"<head><base href="http://e.test/root/"></head><a href="child">c</a>"#,
            "text/html",
        );
        assert_eq!(out.links, vec!["http://e.test/root/child"]);
    }
}
