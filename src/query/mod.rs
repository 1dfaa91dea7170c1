//! Search query construction for Google News RSS.
//!
//! Turns the keyword and exact-phrase fields a reviewer fills in into a
//! search expression such as `consumer recall "product safety" (hazard OR danger) when:30d`,
//! plus the comma-separated display strings stored alongside each request.

mod rss_url;
mod terms;

pub use rss_url::{GOOGLE_NEWS_RSS_SEARCH_URL, RssLocale, build_rss_url};
pub use terms::{display_term, normalize_phrase, split_terms, strip_quotes};

use serde::{Deserialize, Serialize};

/// Lookback window used when the requested one is missing or malformed.
pub const DEFAULT_TIME_RANGE: &str = "180d";

/// Search fields as submitted by the portal or an automation row.
///
/// Every field is a comma-separated list; phrase fields may quote their
/// entries with single or double quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub and_keywords: Option<String>,
    #[serde(default)]
    pub and_exact_phrases: Option<String>,
    #[serde(default)]
    pub or_keywords: Option<String>,
    #[serde(default)]
    pub or_exact_phrases: Option<String>,
    #[serde(default)]
    pub time_range: Option<String>,
}

impl QueryRequest {
    /// True when none of the four term fields carries a term.
    pub fn has_no_terms(&self) -> bool {
        [&self.and_keywords, &self.and_exact_phrases, &self.or_keywords, &self.or_exact_phrases]
            .into_iter()
            .all(|field| split_terms(field.as_deref()).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub query: String,
    pub and_string: String,
    pub or_string: String,
    /// The `<N>d` token actually used in the `when:` clause
    pub time_range: String,
    pub time_range_invalid: bool,
}

/// Validate a `<positive integer>d` time range token.
pub fn parse_time_range(raw: Option<&str>) -> Option<&str> {
    let token = raw?.trim();
    let days = token.strip_suffix('d')?;
    if days.is_empty() || !days.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Any digit count is passed through as typed; only zero days is rejected.
    days.bytes().any(|b| b != b'0').then_some(token)
}

/// Build the search expression and display strings for `request`.
pub fn build_query(request: &QueryRequest) -> QueryResult {
    let and_terms = group_terms(&request.and_keywords, &request.and_exact_phrases);
    let or_terms = group_terms(&request.or_keywords, &request.or_exact_phrases);

    let mut parts = Vec::with_capacity(3);
    if !and_terms.is_empty() {
        parts.push(and_terms.iter().map(|t| t.query.as_str()).collect::<Vec<_>>().join(" "));
    }
    if !or_terms.is_empty() {
        let expression = or_terms.iter().map(|t| t.query.as_str()).collect::<Vec<_>>().join(" OR ");
        if !and_terms.is_empty() && or_terms.len() > 1 {
            parts.push(format!("({})", expression));
        } else {
            parts.push(expression);
        }
    }

    let (time_range, time_range_invalid) = match parse_time_range(request.time_range.as_deref()) {
        Some(token) => (token.to_string(), false),
        None => (DEFAULT_TIME_RANGE.to_string(), true),
    };
    parts.push(format!("when:{}", time_range));

    QueryResult {
        query: parts.join(" "),
        and_string: display_string(&and_terms),
        or_string: display_string(&or_terms),
        time_range,
        time_range_invalid,
    }
}

struct Term<'a> {
    query: String,
    display: &'a str,
}

fn group_terms<'a>(keywords: &'a Option<String>, phrases: &'a Option<String>) -> Vec<Term<'a>> {
    let keywords = split_terms(keywords.as_deref())
        .into_iter()
        .map(|term| Term { query: term.to_string(), display: display_term(term) });
    let phrases = split_terms(phrases.as_deref())
        .into_iter()
        .map(|term| Term { query: normalize_phrase(term), display: display_term(term) });

    keywords.chain(phrases).filter(|term| !term.display.is_empty()).collect()
}

fn display_string(terms: &[Term<'_>]) -> String {
    terms.iter().map(|t| t.display).collect::<Vec<_>>().join(", ")
}
