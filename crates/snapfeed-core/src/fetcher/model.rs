//! Domain model for fetched content.
//!
//! [`Post`] and [`Thread`] are the pipeline's units of content; a
//! [`ContentItem`] is what the capture orchestrator consumes. All three are
//! immutable once emitted by the fetcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::x_api::types::PublicMetrics;

/// Author of a post, resolved from the API's user expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Platform user ID.
    pub id: String,
    /// Handle without the @.
    pub username: String,
    /// Display name.
    pub name: String,
}

/// Engagement counters for a post or a whole thread.
///
/// Counters missing upstream deserialize as zero; the record does not
/// distinguish missing from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Like count.
    pub likes: u64,
    /// Repost count.
    pub retweets: u64,
    /// Reply count.
    pub replies: u64,
    /// Quote count.
    pub quotes: u64,
    /// Bookmark count.
    pub bookmarks: u64,
    /// Impression count.
    pub impressions: u64,
}

impl EngagementMetrics {
    /// Element-wise accumulation, used for thread aggregates.
    pub fn accumulate(&mut self, other: &EngagementMetrics) {
        self.likes += other.likes;
        self.retweets += other.retweets;
        self.replies += other.replies;
        self.quotes += other.quotes;
        self.bookmarks += other.bookmarks;
        self.impressions += other.impressions;
    }
}

impl From<&PublicMetrics> for EngagementMetrics {
    fn from(m: &PublicMetrics) -> Self {
        Self {
            likes: m.like_count,
            retweets: m.retweet_count,
            replies: m.reply_count,
            quotes: m.quote_count,
            bookmarks: m.bookmark_count,
            impressions: m.impression_count,
        }
    }
}

/// A single post with author and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Stable platform-assigned ID.
    pub id: String,
    /// Canonical URL of the post.
    pub url: String,
    /// Body text.
    pub text: String,
    /// The post's author.
    pub author: AuthorRef,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// ID of the conversation root (equals `id` for standalone posts).
    pub conversation_id: String,
    /// Engagement counters.
    pub metrics: EngagementMetrics,
}

/// One element of a thread (the fields a thread carries per post).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadPost {
    /// Stable platform-assigned ID.
    pub id: String,
    /// Body text.
    pub text: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Engagement counters.
    pub metrics: EngagementMetrics,
}

/// A multi-post conversation by a single author.
///
/// `thread_tweets` is strictly ascending by `created_at`; `id` and
/// `created_at` belong to the chronologically earliest post; `metrics` is
/// the element-wise sum over the thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// ID of the earliest post (the thread's primary ID).
    pub id: String,
    /// URL of the earliest post.
    pub url: String,
    /// Combined text with `[i/N]` prefixes, blank-line separated.
    pub text: String,
    /// The thread's author (all elements share it).
    pub author: AuthorRef,
    /// Creation time of the earliest post.
    pub created_at: DateTime<Utc>,
    /// Shared conversation ID.
    pub conversation_id: String,
    /// Always true; serialized for downstream consumers.
    pub is_thread: bool,
    /// Number of posts in the thread (as retrieved; a window-clipped thread
    /// counts only what was fetched).
    pub thread_tweet_count: usize,
    /// The posts, chronologically ascending.
    pub thread_tweets: Vec<ThreadPost>,
    /// Aggregate engagement across the thread.
    pub metrics: EngagementMetrics,
}

/// Content type, used as the blob folder prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A standalone post.
    Tweet,
    /// A multi-post conversation.
    Convo,
    /// A repost (body starts with `RT @`).
    Retweet,
}

impl ContentType {
    /// Folder-prefix form of the content type.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Tweet => "tweet",
            ContentType::Convo => "convo",
            ContentType::Retweet => "retweet",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capture orchestrator's unit of work: one post or one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    /// A multi-post conversation.
    Thread(Thread),
    /// A standalone post or repost.
    Single(Post),
}

impl ContentItem {
    /// Stable primary ID: the post's own ID, or the earliest post's ID for
    /// a thread.
    pub fn primary_id(&self) -> &str {
        match self {
            ContentItem::Single(p) => &p.id,
            ContentItem::Thread(t) => &t.id,
        }
    }

    /// Creation time of the item (earliest post for threads).
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ContentItem::Single(p) => p.created_at,
            ContentItem::Thread(t) => t.created_at,
        }
    }

    /// The item's author.
    pub fn author(&self) -> &AuthorRef {
        match self {
            ContentItem::Single(p) => &p.author,
            ContentItem::Thread(t) => &t.author,
        }
    }

    /// Canonical URL of the primary post.
    pub fn url(&self) -> &str {
        match self {
            ContentItem::Single(p) => &p.url,
            ContentItem::Thread(t) => &t.url,
        }
    }

    /// Whether this item is a thread.
    pub fn is_thread(&self) -> bool {
        matches!(self, ContentItem::Thread(_))
    }

    /// Content type for folder naming.
    //
    // TODO: quoted posts whose body happens to start with "RT @" are
    // misfiled as retweets; switch to the referenced_tweets expansion once
    // the fetcher requests it.
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentItem::Thread(_) => ContentType::Convo,
            ContentItem::Single(p) if p.text.starts_with("RT @") => ContentType::Retweet,
            ContentItem::Single(_) => ContentType::Tweet,
        }
    }
}

/// Canonical post URL for a handle and ID.
pub fn post_url(username: &str, post_id: &str) -> String {
    format!("https://twitter.com/{username}/status/{post_id}")
}
