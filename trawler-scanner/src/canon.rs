//! URL canonicalization, hashing and classification.
//!
//! Every candidate URL the crawler sees goes through [`canonicalize`] before it
//! is compared, counted or queued. The canonical form is the identity of a URL
//! for the rest of the engine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

/// Wildcard that stands in for resource-id segments inside a pattern key.
pub const ID_WILDCARD: &str = "{id}";

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tif", "tiff", "avif",
];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "m4v", "mpeg", "mpg", "3gp",
];
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "aac", "m4a", "wma", "opus", "mid", "midi",
];
pub const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "epub",
];
pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz", "jar", "war", "apk", "dmg", "iso",
    "exe", "msi",
];
/// Not bucketed, but never worth fetching.
const STYLE_EXTENSIONS: &[&str] = &["css"];

/// The six static-resource buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceBucket {
    Images,
    Videos,
    Audios,
    Fonts,
    Documents,
    Archives,
}

impl ResourceBucket {
    pub fn for_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Images)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Videos)
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Audios)
        } else if FONT_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Fonts)
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Documents)
        } else if ARCHIVE_EXTENSIONS.contains(&ext) {
            Some(ResourceBucket::Archives)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKind {
    Mailto,
    Tel,
    WebSocket,
    Ftp,
    Data,
}

impl SpecialKind {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "mailto" => Some(SpecialKind::Mailto),
            "tel" => Some(SpecialKind::Tel),
            "ws" | "wss" => Some(SpecialKind::WebSocket),
            "ftp" | "ftps" => Some(SpecialKind::Ftp),
            "data" => Some(SpecialKind::Data),
            _ => None,
        }
    }

    /// Detects special-protocol links before any resolution against a base.
    pub fn detect(raw: &str) -> Option<Self> {
        let (scheme, _) = raw.trim_start().split_once(':')?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
            return None;
        }
        Self::from_scheme(scheme)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonReject {
    #[error("unparseable URL '{0}'")]
    Parse(String),
    #[error("special-protocol link ({0:?})")]
    SpecialScheme(SpecialKind),
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Classification tag of a canonical URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlClass {
    Static,
    FileParam,
    MultiParam,
    Ajax,
    Restful,
    Normal,
}

impl UrlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlClass::Static => "static",
            UrlClass::FileParam => "file-param",
            UrlClass::MultiParam => "multi-param",
            UrlClass::Ajax => "ajax",
            UrlClass::Restful => "restful",
            UrlClass::Normal => "normal",
        }
    }
}

/// First 128 bits of the SHA-256 of the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct UrlHash(pub u128);

impl UrlHash {
    pub fn of(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        UrlHash(u128::from_be_bytes(bytes))
    }
}

impl fmt::Display for UrlHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<UrlHash> for String {
    fn from(hash: UrlHash) -> Self {
        hash.to_string()
    }
}

impl TryFrom<String> for UrlHash {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        u128::from_str_radix(&value, 16).map(UrlHash)
    }
}

/// Immutable, canonicalized view of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub raw: String,
    pub canonical: String,
    pub origin: String,
    pub host: String,
    pub path: String,
    pub param_names: Vec<String>,
    pub class: UrlClass,
    pub pattern_key: String,
    pub hash: UrlHash,
}

impl UrlRecord {
    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.canonical).ok()
    }

    pub fn has_params(&self) -> bool {
        !self.param_names.is_empty()
    }

    /// True when the pattern key collapsed at least one id segment.
    pub fn has_id_segments(&self) -> bool {
        self.pattern_key.contains(ID_WILDCARD)
    }
}

impl fmt::Display for UrlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<UrlRecord, CanonReject> {
    canonicalize_with_hint(raw, base, None)
}

/// Canonicalizes `raw`, resolving it against `base` when relative. The
/// content-type hint lets callers that already know a response is JSON tag the
/// URL as an API endpoint.
pub fn canonicalize_with_hint(
    raw: &str,
    base: Option<&Url>,
    content_type_hint: Option<&str>,
) -> Result<UrlRecord, CanonReject> {
    let trimmed = raw.trim();
    if let Some(kind) = SpecialKind::detect(trimmed) {
        return Err(CanonReject::SpecialScheme(kind));
    }

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    }
    .map_err(|e| CanonReject::Parse(format!("{}: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(match SpecialKind::from_scheme(other) {
                Some(kind) => CanonReject::SpecialScheme(kind),
                None => CanonReject::UnsupportedScheme(other.to_string()),
            });
        }
    }

    let (url, pairs) = normalize(parsed)?;
    let host = url.host_str().ok_or(CanonReject::MissingHost)?.to_string();
    let canonical = url.to_string();

    let mut param_names: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
    param_names.dedup();

    let path = url.path().to_string();
    let class = classify(&path, &pairs, content_type_hint);
    let origin = url.origin().ascii_serialization();
    let pattern_key = pattern_key(&origin, &path, &param_names);

    Ok(UrlRecord {
        raw: raw.to_string(),
        hash: UrlHash::of(&canonical),
        canonical,
        origin,
        host,
        path,
        param_names,
        class,
        pattern_key,
    })
}

fn normalize(mut url: Url) -> Result<(Url, Vec<(String, String)>), CanonReject> {
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(CanonReject::MissingHost);
    }

    url.set_fragment(None);

    let path = normalize_percent_encoding(url.path());
    if path != url.path() {
        url.set_path(&path);
    }
    if url.path().is_empty() {
        url.set_path("/");
    }

    let mut pairs: Vec<(String, String)> = url
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        url.set_query(Some(&query));
    }

    Ok((url, pairs))
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Decodes escaped unreserved characters and uppercases every remaining escape.
fn normalize_percent_encoding(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = &input[i + 1..i + 3];
            if let Ok(decoded) = u8::from_str_radix(hex, 16) {
                if is_unreserved(decoded) {
                    out.push(decoded as char);
                } else {
                    out.push('%');
                    out.push_str(&hex.to_ascii_uppercase());
                }
                i += 3;
                continue;
            }
        }
        // Path strings from `url` are ASCII, so byte-wise copying is safe.
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn extension_of(segment: &str) -> Option<String> {
    let name = segment.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension of the last path segment, if any.
pub fn path_extension(path: &str) -> Option<String> {
    extension_of(path.rsplit('/').next().unwrap_or(path))
}

pub fn is_static_path(path: &str) -> bool {
    path_extension(path)
        .map(|ext| ResourceBucket::for_extension(&ext).is_some() || STYLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_file_value(value: &str) -> bool {
    extension_of(value)
        .map(|ext| {
            DOCUMENT_EXTENSIONS.contains(&ext.as_str())
                || ARCHIVE_EXTENSIONS.contains(&ext.as_str())
                || IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn is_api_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ["/api", "/ajax", "/rest"]
        .iter()
        .any(|token| lower.contains(&format!("{}/", token)) || lower.ends_with(token))
}

pub fn classify(path: &str, pairs: &[(String, String)], content_type_hint: Option<&str>) -> UrlClass {
    if is_static_path(path) {
        return UrlClass::Static;
    }
    if pairs.iter().any(|(_, v)| is_file_value(v)) {
        return UrlClass::FileParam;
    }
    if pairs.len() >= 3 {
        return UrlClass::MultiParam;
    }
    let json_hint = content_type_hint
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    if json_hint || is_api_path(path) {
        return UrlClass::Ajax;
    }
    if restful_pairs(path) >= 2 {
        return UrlClass::Restful;
    }
    UrlClass::Normal
}

/// Resource names start with a letter, are at least two characters long and
/// mostly alphabetic.
pub fn is_resource_name(segment: &str) -> bool {
    let total = segment.chars().count();
    if total < 2 || !segment.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let alpha = segment.chars().filter(|c| c.is_ascii_alphabetic()).count();
    alpha * 100 >= total * 60
}

fn is_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Digits, UUIDs and slug-like tokens containing at least one digit.
pub fn is_resource_id(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    if segment.chars().all(|c| c.is_ascii_digit()) || is_uuid(segment) {
        return true;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && segment.chars().any(|c| c.is_ascii_digit())
}

fn restful_pairs(path: &str) -> usize {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut pairs = 0;
    let mut i = 0;
    while i + 1 < segments.len() {
        if is_resource_name(segments[i]) && is_resource_id(segments[i + 1]) {
            pairs += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

fn pattern_key(origin: &str, path: &str, param_names: &[String]) -> String {
    let pattern_path = path
        .split('/')
        .map(|segment| {
            if is_resource_id(segment) {
                ID_WILDCARD
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if param_names.is_empty() {
        format!("{}{}", origin, pattern_path)
    } else {
        format!("{}{}?{}", origin, pattern_path, param_names.join("&"))
    }
}

/// Crawl scope anchored on the seed's origin.
#[derive(Debug, Clone)]
pub struct Scope {
    origin: String,
    host: String,
    allow_subdomains: bool,
}

impl Scope {
    pub fn new(seed: &UrlRecord, allow_subdomains: bool) -> Self {
        Self {
            origin: seed.origin.clone(),
            host: seed.host.clone(),
            allow_subdomains,
        }
    }

    pub fn contains(&self, record: &UrlRecord) -> bool {
        if record.origin == self.origin {
            return true;
        }
        self.allow_subdomains
            && (record.host == self.host || record.host.ends_with(&format!(".{}", self.host)))
    }
}
