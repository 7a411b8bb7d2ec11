//! Post fetching and conversation grouping.
//!
//! [`PostFetcher`] wraps the X API client with the pipeline's fetch
//! policy: trailing-window timeline reads excluding replies, URL/ID
//! resolution, and thread reconstruction. API failures surface as typed
//! errors; the orchestrator logs them and lets the affected handle
//! contribute zero items.

pub mod model;
pub mod thread;
mod url;

pub use model::{
    post_url, AuthorRef, ContentItem, ContentType, EngagementMetrics, Post, Thread, ThreadPost,
};
pub use url::extract_post_id;

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::error::XApiError;
use crate::x_api::types::Includes;
use crate::x_api::XApiClient;

/// Port for the capture orchestrator's view of content fetching.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch and group an account's recent content into capture items.
    async fn group_threads(
        &self,
        handle: &str,
        days_back: u32,
        max_items: u32,
    ) -> Result<Vec<ContentItem>, XApiError>;
}

/// Fetches posts from the X API and reconstructs conversations.
pub struct PostFetcher {
    client: Arc<XApiClient>,
}

impl PostFetcher {
    /// Create a fetcher over the given API client.
    pub fn new(client: Arc<XApiClient>) -> Self {
        Self { client }
    }

    /// Return up to `max_items` post URLs authored by `handle` within the
    /// trailing `days_back` days, excluding replies, newest first.
    pub async fn fetch_recent(
        &self,
        handle: &str,
        days_back: u32,
        max_items: u32,
    ) -> Result<Vec<String>, XApiError> {
        let user = self.client.get_user_by_username(handle).await?.data;
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days_back));

        let resp = self
            .client
            .get_user_tweets(&user.id, start, end, max_items)
            .await?;

        warn_if_window_filled(handle, resp.data.len(), max_items);

        Ok(resp
            .data
            .iter()
            .map(|t| post_url(&user.username, &t.id))
            .collect())
    }

    /// Single-post lookup with author expansion. Returns `None` when the
    /// post does not exist or its payload is unusable.
    pub async fn fetch_by_id(&self, post_id: &str) -> Result<Option<Post>, XApiError> {
        let resp = match self.client.get_tweet(post_id).await {
            Ok(resp) => resp,
            Err(XApiError::NotFound { what }) => {
                tracing::info!(post_id, %what, "post not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let tweet = resp.data;
        let Some(created_at) = tweet.created_at else {
            tracing::warn!(post_id, "skipping post with no creation timestamp");
            return Ok(None);
        };

        let author = resolve_author(resp.includes.as_ref(), tweet.author_id.as_deref());
        Ok(Some(Post {
            url: post_url(&author.username, &tweet.id),
            conversation_id: tweet.conversation_id.unwrap_or_else(|| tweet.id.clone()),
            id: tweet.id,
            text: tweet.text,
            author,
            created_at,
            metrics: EngagementMetrics::from(&tweet.public_metrics),
        }))
    }

    /// Resolve a post from any accepted URL shape. Unparseable input
    /// yields `None` without touching the network.
    pub async fn fetch_by_url(&self, input: &str) -> Result<Option<Post>, XApiError> {
        match extract_post_id(input) {
            Some(id) => self.fetch_by_id(&id).await,
            None => {
                tracing::debug!(input, "no post ID found in input");
                Ok(None)
            }
        }
    }

    /// Fetch the full conversation containing `post_id`, using recent
    /// search scoped to the author. Falls back to the single post when the
    /// search adds nothing.
    pub async fn fetch_thread_by_id(
        &self,
        post_id: &str,
    ) -> Result<Option<ContentItem>, XApiError> {
        let Some(base) = self.fetch_by_id(post_id).await? else {
            return Ok(None);
        };

        let query = format!(
            "conversation_id:{} from:{}",
            base.conversation_id, base.author.username
        );
        let resp = match self.client.search_recent(&query, 100).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(post_id, error = %e, "conversation search failed, using single post");
                return Ok(Some(ContentItem::Single(base)));
            }
        };

        let author = base.author.clone();
        let elements: Vec<ThreadPost> = resp
            .data
            .into_iter()
            .filter(|t| t.author_id.as_deref() == Some(author.id.as_str()))
            .filter_map(|t| {
                let created_at = t.created_at?;
                Some(ThreadPost {
                    id: t.id,
                    text: t.text,
                    created_at,
                    metrics: EngagementMetrics::from(&t.public_metrics),
                })
            })
            .collect();

        if elements.len() < 2 {
            tracing::debug!(post_id, "single-post conversation");
            return Ok(Some(ContentItem::Single(base)));
        }

        let conversation_id = base.conversation_id.clone();
        Ok(Some(ContentItem::Thread(thread::build_thread(
            elements,
            author,
            conversation_id,
        ))))
    }
}

#[async_trait::async_trait]
impl PostSource for PostFetcher {
    /// Fetch recent posts for a handle, bucket them by conversation, and
    /// return singletons plus reconstructed threads, newest first.
    async fn group_threads(
        &self,
        handle: &str,
        days_back: u32,
        max_items: u32,
    ) -> Result<Vec<ContentItem>, XApiError> {
        let user = self.client.get_user_by_username(handle).await?.data;
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days_back));

        let resp = self
            .client
            .get_user_tweets(&user.id, start, end, max_items)
            .await?;

        if resp.data.is_empty() {
            tracing::info!(handle, days_back, "no posts in window");
            return Ok(Vec::new());
        }

        warn_if_window_filled(handle, resp.data.len(), max_items);

        let author = AuthorRef {
            id: user.id,
            username: user.username,
            name: user.name,
        };
        let items = thread::group_into_items(resp.data, &author);
        tracing::info!(
            handle,
            items = items.len(),
            threads = items.iter().filter(|i| i.is_thread()).count(),
            "grouped recent posts"
        );
        Ok(items)
    }
}

/// Log when a timeline page came back full: any thread touching the window
/// edge is a best-effort prefix and its count reflects only what was
/// retrieved.
fn warn_if_window_filled(handle: &str, returned: usize, max_items: u32) {
    if returned as u32 >= max_items {
        tracing::warn!(
            handle,
            returned,
            max_items,
            "timeline page full; threads spanning the window may be truncated"
        );
    }
}

fn resolve_author(includes: Option<&Includes>, author_id: Option<&str>) -> AuthorRef {
    includes
        .and_then(|inc| {
            inc.users
                .iter()
                .find(|u| Some(u.id.as_str()) == author_id)
                .or_else(|| inc.users.first())
        })
        .map(|u| AuthorRef {
            id: u.id.clone(),
            username: u.username.clone(),
            name: u.name.clone(),
        })
        .unwrap_or_else(|| AuthorRef {
            id: author_id.unwrap_or("unknown").to_string(),
            username: "unknown".to_string(),
            name: "Unknown".to_string(),
        })
}
