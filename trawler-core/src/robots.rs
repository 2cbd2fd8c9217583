// robots.txt retrieval and the crawl predicate built from it

use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use trawler_scanner::RobotsPredicate;
use url::Url;

/// A fetched robots.txt body. Matching is done by `robotstxt`.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    body: String,
}

impl RobotsRules {
    pub fn parse(content: &str) -> Self {
        Self {
            body: content.to_string(),
        }
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, product_token(user_agent), url)
    }

    /// True when no group disallows anything.
    pub fn is_empty(&self) -> bool {
        !self.body.lines().any(|line| {
            let line = line.split('#').next().unwrap_or("");
            line.split_once(':').is_some_and(|(key, value)| {
                key.trim().eq_ignore_ascii_case("disallow") && !value.trim().is_empty()
            })
        })
    }

    /// Predicate for the crawler. URLs on other origins are not judged.
    pub fn into_predicate(self, origin: String, user_agent: String) -> RobotsPredicate {
        Arc::new(move |url: &str| {
            let same_origin = Url::parse(url)
                .map(|u| u.origin().ascii_serialization() == origin)
                .unwrap_or(false);
            !same_origin || self.is_allowed(url, &user_agent)
        })
    }
}

/// `Trawler/0.1 (+https://..)` is matched against robots.txt groups as `Trawler`.
fn product_token(user_agent: &str) -> &str {
    let end = user_agent
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-' || c == '_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}

/// Fetches `<origin>/robots.txt`. Missing or unreadable files allow everything.
pub async fn fetch_robots(seed: &Url, user_agent: &str, timeout: Duration) -> RobotsRules {
    let Ok(robots_url) = seed.join("/robots.txt") else {
        return RobotsRules::default();
    };

    let client = match Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .danger_accept_invalid_certs(true)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Could not build robots.txt client: {}", e);
            return RobotsRules::default();
        }
    };

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                debug!("Loaded robots.txt from {}", robots_url);
                RobotsRules::parse(&body)
            }
            Err(e) => {
                warn!("Could not read {}: {}", robots_url, e);
                RobotsRules::default()
            }
        },
        Ok(response) => {
            debug!("{} returned {}, no restrictions", robots_url, response.status());
            RobotsRules::default()
        }
        Err(e) => {
            warn!("Could not fetch {}: {}", robots_url, e);
            RobotsRules::default()
        }
    }
}
