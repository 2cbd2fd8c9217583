use crate::canon::{ResourceBucket, SpecialKind};
use crate::item::{HttpMethod, ItemOrigin, WorkItem};
use crate::sensitive::Finding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Terminal state of a leased work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    Completed,
    Failed,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub field_type: String,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub method: HttpMethod,
    pub action: String,
    pub enctype: String,
    pub fields: Vec<FormField>,
}

impl FormDescriptor {
    pub fn has_named_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Field names mapped to their defaults, empty string when absent.
    pub fn params(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default_value.clone().unwrap_or_default()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub params: BTreeMap<String, String>,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintSource {
    Literal,
    Fetch,
    Xhr,
    Axios,
    Jquery,
    Location,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHint {
    pub url: String,
    pub method: Option<HttpMethod>,
    pub source: HintSource,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticResources {
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
    pub fonts: Vec<String>,
    pub documents: Vec<String>,
    pub archives: Vec<String>,
}

impl StaticResources {
    pub fn bucket_mut(&mut self, bucket: ResourceBucket) -> &mut Vec<String> {
        match bucket {
            ResourceBucket::Images => &mut self.images,
            ResourceBucket::Videos => &mut self.videos,
            ResourceBucket::Audios => &mut self.audios,
            ResourceBucket::Fonts => &mut self.fonts,
            ResourceBucket::Documents => &mut self.documents,
            ResourceBucket::Archives => &mut self.archives,
        }
    }

    pub fn insert(&mut self, bucket: ResourceBucket, url: String) {
        push_unique(self.bucket_mut(bucket), url);
    }

    pub fn buckets(&self) -> [(&'static str, &Vec<String>); 6] {
        [
            ("images", &self.images),
            ("videos", &self.videos),
            ("audios", &self.audios),
            ("fonts", &self.fonts),
            ("documents", &self.documents),
            ("archives", &self.archives),
        ]
    }

    pub fn merge(&mut self, other: &StaticResources) {
        for (bucket, urls) in [
            (ResourceBucket::Images, &other.images),
            (ResourceBucket::Videos, &other.videos),
            (ResourceBucket::Audios, &other.audios),
            (ResourceBucket::Fonts, &other.fonts),
            (ResourceBucket::Documents, &other.documents),
            (ResourceBucket::Archives, &other.archives),
        ] {
            for url in urls {
                self.insert(bucket, url.clone());
            }
        }
    }

    pub fn sort(&mut self) {
        for list in [
            &mut self.images,
            &mut self.videos,
            &mut self.audios,
            &mut self.fonts,
            &mut self.documents,
            &mut self.archives,
        ] {
            list.sort();
        }
    }

    pub fn len(&self) -> usize {
        self.buckets().iter().map(|(_, v)| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialLinks {
    pub mailto: Vec<String>,
    pub tel: Vec<String>,
    pub websocket: Vec<String>,
    pub ftp: Vec<String>,
    pub data: Vec<String>,
}

impl SpecialLinks {
    pub fn insert(&mut self, kind: SpecialKind, link: String) {
        let list = match kind {
            SpecialKind::Mailto => &mut self.mailto,
            SpecialKind::Tel => &mut self.tel,
            SpecialKind::WebSocket => &mut self.websocket,
            SpecialKind::Ftp => &mut self.ftp,
            SpecialKind::Data => &mut self.data,
        };
        push_unique(list, link);
    }

    pub fn groups(&self) -> [(&'static str, &Vec<String>); 5] {
        [
            ("mailto", &self.mailto),
            ("tel", &self.tel),
            ("websocket", &self.websocket),
            ("ftp", &self.ftp),
            ("data", &self.data),
        ]
    }

    pub fn merge(&mut self, other: &SpecialLinks) {
        for (kind, links) in [
            (SpecialKind::Mailto, &other.mailto),
            (SpecialKind::Tel, &other.tel),
            (SpecialKind::WebSocket, &other.websocket),
            (SpecialKind::Ftp, &other.ftp),
            (SpecialKind::Data, &other.data),
        ] {
            for link in links {
                self.insert(kind, link.clone());
            }
        }
    }

    pub fn sort(&mut self) {
        for list in [
            &mut self.mailto,
            &mut self.tel,
            &mut self.websocket,
            &mut self.ftp,
            &mut self.data,
        ] {
            list.sort();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(|(_, v)| v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub method: HttpMethod,
    pub depth: usize,
    pub origin: ItemOrigin,
    pub parent: Option<String>,
    pub state: FetchState,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub final_url: String,
    pub redirect_chain: Vec<String>,
    pub body_size: usize,
    pub truncated: bool,
    pub response_time: Duration,
    pub attempts: u32,
    pub rendered: bool,
    pub links: Vec<String>,
    pub forms: Vec<FormDescriptor>,
    pub api_hints: Vec<ApiHint>,
    pub post_requests: Vec<PostDescriptor>,
    pub static_resources: StaticResources,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
    pub special_links: SpecialLinks,
    pub findings: Vec<Finding>,
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(item: &WorkItem) -> Self {
        Self {
            url: item.url.canonical.clone(),
            method: item.method,
            depth: item.depth,
            origin: item.origin,
            parent: item.parent.clone(),
            state: FetchState::Completed,
            status_code: 0,
            content_type: None,
            final_url: item.url.canonical.clone(),
            redirect_chain: Vec::new(),
            body_size: 0,
            truncated: false,
            response_time: Duration::from_secs(0),
            attempts: 0,
            rendered: false,
            links: Vec::new(),
            forms: Vec::new(),
            api_hints: Vec::new(),
            post_requests: Vec::new(),
            static_resources: StaticResources::default(),
            scripts: Vec::new(),
            stylesheets: Vec::new(),
            special_links: SpecialLinks::default(),
            findings: Vec::new(),
            error: None,
        }
    }

    pub fn with_error(item: &WorkItem, state: FetchState, error: String) -> Self {
        let mut result = Self::new(item);
        result.state = state;
        result.error = Some(error);
        result
    }

    pub fn is_success(&self) -> bool {
        self.state == FetchState::Completed && (200..300).contains(&self.status_code)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            })
            .unwrap_or(false)
    }
}
