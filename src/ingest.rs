//! Recording news source requests and storing the articles they returned.

use crate::database::{
    NewsRepository, RepositoryError,
    models::{GOOGLE_NEWS_RSS_ORG_NAME, NEWS_API_ORG_NAME, NewArticle, NewNewsRequest, RequestStatus},
};
use crate::feed::RssItem;
use crate::news_api::{NewsApiQuery, NewsApiResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Ids attached to every article found through one aggregator source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIds {
    pub aggregator_source_id: i64,
    pub finder_entity_id: i64,
}

async fn ensure_source(
    repo: &dyn NewsRepository,
    name_of_org: &str,
    is_rss: bool,
    is_api: bool,
) -> Result<SourceIds, RepositoryError> {
    let aggregator_source_id =
        repo.find_or_create_aggregator_source(name_of_org, is_rss, is_api).await?;
    let finder_entity_id = repo.find_or_create_finder_entity(aggregator_source_id).await?;
    Ok(SourceIds { aggregator_source_id, finder_entity_id })
}

pub async fn ensure_google_rss_source(
    repo: &dyn NewsRepository,
) -> Result<SourceIds, RepositoryError> {
    ensure_source(repo, GOOGLE_NEWS_RSS_ORG_NAME, true, false).await
}

pub async fn ensure_news_api_source(repo: &dyn NewsRepository) -> Result<SourceIds, RepositoryError> {
    ensure_source(repo, NEWS_API_ORG_NAME, false, true).await
}

#[derive(Debug, Clone)]
pub struct StoreRequest<'a> {
    pub request_url: &'a str,
    pub and_string: Option<String>,
    pub or_string: Option<String>,
    pub status: RequestStatus,
    pub items: &'a [RssItem],
    pub source: SourceIds,
    pub is_from_automation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutcome {
    pub news_api_request_id: i64,
    pub articles_received: usize,
    pub articles_saved: usize,
    pub article_ids: Vec<i64>,
}

impl StoreOutcome {
    pub fn duplicates_skipped(&self) -> usize {
        self.articles_received - self.articles_saved
    }
}

/// Article as received, before the request id is known
struct Candidate {
    article: NewArticle,
    content: Option<String>,
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Store every candidate whose link is not already known, then record the
/// saved count on the request.
async fn save_new_articles(
    repo: &dyn NewsRepository,
    request_id: i64,
    candidates: Vec<Candidate>,
) -> Result<StoreOutcome, RepositoryError> {
    let received = candidates.len();
    let mut article_ids = Vec::new();
    for Candidate { mut article, content } in candidates {
        if article.url.is_empty() {
            warn!("Skipping article without link");
            continue;
        }

        article.news_api_request_id = request_id;
        let url = article.url.clone();
        let Some(article_id) = repo.create_article_if_new(article).await? else {
            debug!("Skipping duplicate article: {}", url);
            continue;
        };

        if let Some(content) = content.filter(|c| !c.is_empty()) {
            repo.create_article_content(article_id, &content).await?;
        }

        article_ids.push(article_id);
    }

    repo.set_request_saved_count(request_id, count(article_ids.len())).await?;

    info!(
        "Stored {} new articles for request {} ({} received)",
        article_ids.len(),
        request_id,
        received
    );

    Ok(StoreOutcome {
        news_api_request_id: request_id,
        articles_received: received,
        articles_saved: article_ids.len(),
        article_ids,
    })
}

/// Record the RSS request and store every item whose link is not already known.
pub async fn store_request_and_articles(
    repo: &dyn NewsRepository,
    params: StoreRequest<'_>,
) -> Result<StoreOutcome, RepositoryError> {
    let request_id = repo
        .create_news_request(NewNewsRequest {
            news_article_aggregator_source_id: params.source.aggregator_source_id,
            date_start_of_request: None,
            date_end_of_request: today(),
            count_of_articles_received: count(params.items.len()),
            status: params.status,
            url: params.request_url.to_string(),
            and_string: params.and_string,
            or_string: params.or_string,
            not_string: None,
            is_from_automation: params.is_from_automation,
        })
        .await?;

    let candidates = params
        .items
        .iter()
        .map(|item| Candidate {
            article: NewArticle {
                publication_name: item.source.clone().unwrap_or_else(|| "Unknown".to_string()),
                title: item.title.clone().unwrap_or_default(),
                author: None,
                description: item.description.clone(),
                url: item.link.clone().unwrap_or_default(),
                url_to_image: None,
                published_date: item.pub_date.as_deref().and_then(parse_published_date),
                entity_who_found_article_id: params.source.finder_entity_id,
                news_api_request_id: request_id,
            },
            content: item.content.clone().or_else(|| Some(item.description.clone())),
        })
        .collect();

    save_new_articles(repo, request_id, candidates).await
}

/// Record a News API search. Articles are stored only when the search
/// succeeded; the returned outcome is `None` otherwise.
pub async fn store_news_api_response(
    repo: &dyn NewsRepository,
    source: SourceIds,
    query: &NewsApiQuery,
    response: &NewsApiResponse,
) -> Result<(i64, Option<StoreOutcome>), RepositoryError> {
    let status = if response.is_success() { RequestStatus::Success } else { RequestStatus::Error };
    let request_id = repo
        .create_news_request(NewNewsRequest {
            news_article_aggregator_source_id: source.aggregator_source_id,
            date_start_of_request: Some(query.start_date),
            date_end_of_request: today(),
            count_of_articles_received: count(response.articles().len()),
            status,
            url: response.request_url.clone(),
            and_string: Some(query.keyword.clone()),
            or_string: None,
            not_string: None,
            is_from_automation: false,
        })
        .await?;

    if status == RequestStatus::Error {
        warn!("News API request {} failed: {}", request_id, response.error_message());
        return Ok((request_id, None));
    }

    let candidates = response
        .articles()
        .iter()
        .map(|article| Candidate {
            article: NewArticle {
                publication_name: article
                    .source
                    .name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                title: article.title.clone().unwrap_or_default(),
                author: article.author.clone(),
                description: article.description.clone().unwrap_or_default(),
                url: article.url.clone().unwrap_or_default(),
                url_to_image: article.url_to_image.clone(),
                published_date: article.published_at.as_deref().and_then(parse_published_date),
                entity_who_found_article_id: source.finder_entity_id,
                news_api_request_id: request_id,
            },
            content: article.content.clone(),
        })
        .collect();

    let outcome = save_new_articles(repo, request_id, candidates).await?;
    Ok((request_id, Some(outcome)))
}

/// Parse a feed publication date: RFC 2822 (RSS), RFC 3339, or a bare date.
pub fn parse_published_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        });

    if parsed.is_none() {
        warn!("Failed to parse pubDate: {}", raw);
    }
    parsed
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryNewsRepository;
    use crate::news_api::{NewsApiArticle, NewsApiArticleSource, NewsApiPayload};

    fn item(link: Option<&str>, title: &str) -> RssItem {
        RssItem {
            title: Some(title.to_string()),
            description: format!("{} summary", title),
            link: link.map(str::to_string),
            pub_date: Some("Mon, 12 Oct 2026 14:00:00 GMT".to_string()),
            source: None,
            content: None,
        }
    }

    #[tokio::test]
    async fn test_ensure_source_is_idempotent() {
        let repo = InMemoryNewsRepository::new();
        let first = ensure_google_rss_source(&repo).await.unwrap();
        let second = ensure_google_rss_source(&repo).await.unwrap();
        assert_eq!(first, second);
        repo.with_data(|data| {
            assert_eq!(data.sources.len(), 1);
            assert_eq!(data.sources[0].1, GOOGLE_NEWS_RSS_ORG_NAME);
        });
    }

    #[tokio::test]
    async fn test_store_skips_missing_links_and_duplicates() {
        let repo = InMemoryNewsRepository::new();
        repo.seed_article("https://example.com/known", "Known");
        let source = ensure_google_rss_source(&repo).await.unwrap();

        let items = vec![
            item(Some("https://example.com/new"), "New"),
            item(Some("https://example.com/known"), "Known again"),
            item(None, "No link"),
        ];

        let outcome = store_request_and_articles(
            &repo,
            StoreRequest {
                request_url: "https://news.google.com/rss/search?q=recall",
                and_string: Some("recall".to_string()),
                or_string: None,
                status: RequestStatus::Success,
                items: &items,
                source,
                is_from_automation: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.articles_received, 3);
        assert_eq!(outcome.articles_saved, 1);
        assert_eq!(outcome.duplicates_skipped(), 2);
        assert_eq!(outcome.article_ids.len(), 1);

        repo.with_data(|data| {
            let request = data.requests.iter().find(|r| r.id == outcome.news_api_request_id).unwrap();
            assert_eq!(request.saved_count, 1);
            assert_eq!(request.request.count_of_articles_received, 3);
            assert_eq!(request.request.and_string.as_deref(), Some("recall"));

            let stored = data.articles.iter().find(|a| a.id == outcome.article_ids[0]).unwrap();
            assert_eq!(stored.article.publication_name, "Unknown");
            assert!(stored.article.published_date.is_some());
            assert_eq!(data.contents, vec![(outcome.article_ids[0], "New summary".to_string())]);
        });
    }

    #[tokio::test]
    async fn test_overlapping_stores_save_a_link_once() {
        let repo = InMemoryNewsRepository::new();
        let source = ensure_google_rss_source(&repo).await.unwrap();
        let items = vec![
            item(Some("https://example.com/shared"), "Shared"),
            item(Some("https://example.com/shared"), "Shared twice"),
        ];
        let store = || {
            store_request_and_articles(
                &repo,
                StoreRequest {
                    request_url: "https://news.google.com/rss/search?q=shared",
                    and_string: None,
                    or_string: None,
                    status: RequestStatus::Success,
                    items: &items,
                    source,
                    is_from_automation: false,
                },
            )
        };

        let (first, second) = tokio::join!(store(), store());
        let saved = first.unwrap().articles_saved + second.unwrap().articles_saved;

        assert_eq!(saved, 1);
        repo.with_data(|data| assert_eq!(data.articles.len(), 1));
    }

    fn news_api_response(http_status: u16, articles: Option<Vec<NewsApiArticle>>) -> NewsApiResponse {
        NewsApiResponse {
            http_status,
            request_url: "https://newsapi.org/v2/everything?q=crib".to_string(),
            payload: NewsApiPayload {
                status: Some(if articles.is_some() { "ok" } else { "error" }.to_string()),
                message: articles.is_none().then(|| "rateLimited".to_string()),
                total_results: None,
                articles,
            },
        }
    }

    fn news_api_article(url: &str) -> NewsApiArticle {
        NewsApiArticle {
            source: NewsApiArticleSource { id: None, name: Some("Example Times".to_string()) },
            author: Some("A. Reporter".to_string()),
            title: Some("Crib recall".to_string()),
            url: Some(url.to_string()),
            url_to_image: Some("https://img.example/crib.jpg".to_string()),
            published_at: Some("2026-10-12T14:00:00Z".to_string()),
            content: Some("Full text".to_string()),
            ..Default::default()
        }
    }

    fn news_api_query() -> NewsApiQuery {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        NewsApiQuery::new("crib", None, None, today)
    }

    #[tokio::test]
    async fn test_store_news_api_articles() {
        let repo = InMemoryNewsRepository::new();
        repo.seed_article("https://example.com/known", "Known");
        let source = ensure_news_api_source(&repo).await.unwrap();
        let response = news_api_response(
            200,
            Some(vec![
                news_api_article("https://example.com/new"),
                news_api_article("https://example.com/known"),
            ]),
        );

        let (request_id, outcome) =
            store_news_api_response(&repo, source, &news_api_query(), &response).await.unwrap();
        let outcome = outcome.unwrap();
        assert_eq!(outcome.articles_saved, 1);

        repo.with_data(|data| {
            assert_eq!(data.sources[0].1, NEWS_API_ORG_NAME);
            let request = data.requests.iter().find(|r| r.id == request_id).unwrap();
            assert_eq!(request.request.status, RequestStatus::Success);
            assert_eq!(request.request.and_string.as_deref(), Some("crib"));
            assert_eq!(request.request.date_start_of_request, NaiveDate::from_ymd_opt(2026, 9, 19));
            assert_eq!(request.saved_count, 1);

            let stored = data.articles.iter().find(|a| a.id == outcome.article_ids[0]).unwrap();
            assert_eq!(stored.article.publication_name, "Example Times");
            assert_eq!(stored.article.author.as_deref(), Some("A. Reporter"));
            assert_eq!(stored.article.url_to_image.as_deref(), Some("https://img.example/crib.jpg"));
            assert_eq!(stored.article.news_api_request_id, request_id);
            assert_eq!(data.contents, vec![(outcome.article_ids[0], "Full text".to_string())]);
        });
    }

    #[tokio::test]
    async fn test_failed_news_api_request_stores_no_articles() {
        let repo = InMemoryNewsRepository::new();
        let source = ensure_news_api_source(&repo).await.unwrap();
        let response = news_api_response(429, None);

        let (request_id, outcome) =
            store_news_api_response(&repo, source, &news_api_query(), &response).await.unwrap();
        assert!(outcome.is_none());

        repo.with_data(|data| {
            let request = data.requests.iter().find(|r| r.id == request_id).unwrap();
            assert_eq!(request.request.status, RequestStatus::Error);
            assert_eq!(request.request.count_of_articles_received, 0);
            assert!(data.articles.is_empty());
        });
    }

    #[test]
    fn test_parse_published_date_formats() {
        let rss = parse_published_date("Mon, 12 Oct 2026 14:00:00 GMT").unwrap();
        assert_eq!(rss.to_rfc3339(), "2026-10-12T14:00:00+00:00");

        let iso = parse_published_date("2026-10-12T09:30:00-04:00").unwrap();
        assert_eq!(iso.to_rfc3339(), "2026-10-12T13:30:00+00:00");

        assert!(parse_published_date("2026-10-12").is_some());
        assert!(parse_published_date("yesterday").is_none());
    }
}
