//! Merges the two providers' pages into one request-scoped view:
//! cache-aside fetch, degrade-on-failure, search filter, sort.

use crate::cache::ResponseCache;
use crate::fetch::{FetchError, MessageFetcher};
use crate::providers::{Message, MessagePage, Provider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    SubjectAsc,
    SubjectDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SortOption {
    /// Unknown or absent values fall back to the default `date_desc`.
    pub fn parse(value: Option<&str>) -> SortOption {
        match value {
            Some("subject_asc") => SortOption::SubjectAsc,
            Some("subject_desc") => SortOption::SubjectDesc,
            Some("date_asc") => SortOption::DateAsc,
            Some("date_desc") => SortOption::DateDesc,
            _ => SortOption::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::SubjectAsc => "subject_asc",
            SortOption::SubjectDesc => "subject_desc",
            SortOption::DateAsc => "date_asc",
            SortOption::DateDesc => "date_desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// User-facing banner rendered on the inbox page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Request-scoped aggregate of both providers. Next-page cursors always
/// reflect the unfiltered upstream page boundary.
#[derive(Debug, Serialize)]
pub struct UnifiedView {
    pub emails: Vec<Message>,
    pub linkedin_messages: Vec<Message>,
    pub office365_next_page: Option<String>,
    pub linkedin_next_page: Option<String>,
    pub office365_degraded: bool,
    pub linkedin_degraded: bool,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateParams {
    pub office365_cursor: Option<String>,
    pub linkedin_cursor: Option<String>,
    pub search_query: String,
    pub sort_option: SortOption,
    pub force_refresh: bool,
}

pub struct Aggregator {
    fetcher: MessageFetcher,
    cache: Arc<ResponseCache>,
}

impl Aggregator {
    pub fn new(fetcher: MessageFetcher, cache: Arc<ResponseCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Cache-aside fetch. Only first-page requests participate in the
    /// cache: a cursor identifies a different page than the per-provider
    /// slot stores, so cursor fetches always go live and never overwrite
    /// the cached first page. `force_refresh` skips the read but still
    /// writes through on success.
    pub async fn fetch_page(
        &self,
        provider: Provider,
        token: &str,
        cursor: Option<&str>,
        force_refresh: bool,
    ) -> Result<MessagePage, FetchError> {
        if cursor.is_some() {
            return self.fetcher.fetch(provider, token, cursor).await;
        }

        if !force_refresh {
            if let Some(page) = self.cache.get(provider.cache_key()).await {
                return Ok(page);
            }
        }

        let page = self.fetcher.fetch(provider, token, None).await?;
        self.cache.put(provider.cache_key(), page.clone()).await;
        Ok(page)
    }

    /// Fetch both providers concurrently and merge. A failed provider
    /// degrades to an empty list with a warning notice; it never fails the
    /// aggregation.
    pub async fn aggregate(
        &self,
        email_token: &str,
        messaging_token: &str,
        params: &AggregateParams,
    ) -> UnifiedView {
        let (email_result, linkedin_result) = tokio::join!(
            self.fetch_page(
                Provider::Microsoft,
                email_token,
                params.office365_cursor.as_deref(),
                params.force_refresh,
            ),
            self.fetch_page(
                Provider::Linkedin,
                messaging_token,
                params.linkedin_cursor.as_deref(),
                params.force_refresh,
            ),
        );

        let mut notices = Vec::new();
        let (email_page, office365_degraded) =
            degrade_on_failure(Provider::Microsoft, email_result, &mut notices);
        let (linkedin_page, linkedin_degraded) =
            degrade_on_failure(Provider::Linkedin, linkedin_result, &mut notices);

        UnifiedView {
            emails: filter_and_sort(
                email_page.items,
                Provider::Microsoft,
                &params.search_query,
                params.sort_option,
            ),
            linkedin_messages: filter_and_sort(
                linkedin_page.items,
                Provider::Linkedin,
                &params.search_query,
                params.sort_option,
            ),
            office365_next_page: email_page.next_cursor,
            linkedin_next_page: linkedin_page.next_cursor,
            office365_degraded,
            linkedin_degraded,
            notices,
        }
    }
}

fn degrade_on_failure(
    provider: Provider,
    result: Result<MessagePage, FetchError>,
    notices: &mut Vec<Notice>,
) -> (MessagePage, bool) {
    match result {
        Ok(page) => {
            if page.items.is_empty() {
                notices.push(Notice {
                    level: NoticeLevel::Info,
                    text: match provider {
                        Provider::Microsoft => "No new emails available.".to_string(),
                        Provider::Linkedin => "No new LinkedIn messages available.".to_string(),
                    },
                });
            }
            (page, false)
        }
        Err(err) => {
            tracing::warn!("Degrading {} to an empty list: {}", provider, err);
            notices.push(Notice {
                level: NoticeLevel::Warning,
                text: format!("Failed to retrieve {} messages.", provider.display_name()),
            });
            (
                MessagePage {
                    items: Vec::new(),
                    next_cursor: None,
                },
                true,
            )
        }
    }
}

/// Apply the search filter, then the sort, to one provider's list.
pub fn filter_and_sort(
    items: Vec<Message>,
    provider: Provider,
    search_query: &str,
    sort_option: SortOption,
) -> Vec<Message> {
    let mut items = filter_by_subject(items, search_query);
    sort_messages(&mut items, provider, sort_option);
    items
}

fn filter_by_subject(items: Vec<Message>, search_query: &str) -> Vec<Message> {
    if search_query.is_empty() {
        return items;
    }
    let query = search_query.to_lowercase();
    items
        .into_iter()
        .filter(|msg| msg.subject().to_lowercase().contains(&query))
        .collect()
}

fn sort_messages(items: &mut [Message], provider: Provider, sort_option: SortOption) {
    match sort_option {
        SortOption::SubjectAsc => {
            items.sort_by(|a, b| a.subject().to_lowercase().cmp(&b.subject().to_lowercase()));
        }
        SortOption::SubjectDesc => {
            items.sort_by(|a, b| b.subject().to_lowercase().cmp(&a.subject().to_lowercase()));
        }
        SortOption::DateAsc => {
            items.sort_by(|a, b| a.timestamp(provider).cmp(b.timestamp(provider)));
        }
        SortOption::DateDesc => {
            items.sort_by(|a, b| b.timestamp(provider).cmp(a.timestamp(provider)));
        }
    }
}
