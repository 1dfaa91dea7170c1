//! Google News RSS search URL assembly.

use serde::{Deserialize, Serialize};
use url::form_urlencoded::Serializer;

pub const GOOGLE_NEWS_RSS_SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Locale parameters appended to every RSS search URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssLocale {
    /// Interface language, e.g. `en-US`
    pub hl: String,
    /// Region, e.g. `US`
    pub gl: String,
    /// Edition id, `<region>:<lang>`
    pub ceid: String,
}

impl Default for RssLocale {
    fn default() -> Self {
        Self { hl: "en-US".to_string(), gl: "US".to_string(), ceid: "US:en".to_string() }
    }
}

impl RssLocale {
    /// Build the search URL for `query` using this locale.
    pub fn search_url(&self, query: &str) -> String {
        let params = Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("hl", &self.hl)
            .append_pair("gl", &self.gl)
            .append_pair("ceid", &self.ceid)
            .finish();

        format!("{}?{}", GOOGLE_NEWS_RSS_SEARCH_URL, params)
    }
}

/// Build a Google News RSS search URL with the default US English locale.
pub fn build_rss_url(query: &str) -> String {
    RssLocale::default().search_url(query)
}
