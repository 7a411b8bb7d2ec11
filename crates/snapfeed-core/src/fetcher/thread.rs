//! Thread reconstruction from out-of-order timeline responses.
//!
//! The upstream API returns a flat page of posts; conversations arrive
//! interleaved and unordered. Grouping buckets posts by `conversation_id`,
//! emits singletons unchanged, and rebuilds multi-post buckets into
//! [`Thread`]s ordered chronologically with aggregate metrics.

use crate::x_api::types::Tweet;

use super::model::{post_url, AuthorRef, ContentItem, EngagementMetrics, Post, Thread, ThreadPost};

/// Group a page of timeline posts into singletons and threads, newest
/// first by primary-post creation time.
///
/// Posts without a creation timestamp are malformed upstream payloads;
/// they are skipped with a WARN and contribute nothing.
pub fn group_into_items(tweets: Vec<Tweet>, author: &AuthorRef) -> Vec<ContentItem> {
    let mut buckets: Vec<(String, Vec<ThreadPost>)> = Vec::new();

    for tweet in tweets {
        let Some(created_at) = tweet.created_at else {
            tracing::warn!(id = %tweet.id, "skipping post with no creation timestamp");
            continue;
        };
        let conversation_id = tweet.conversation_id.clone().unwrap_or(tweet.id.clone());
        let element = ThreadPost {
            id: tweet.id,
            text: tweet.text,
            created_at,
            metrics: EngagementMetrics::from(&tweet.public_metrics),
        };
        match buckets.iter_mut().find(|(conv, _)| *conv == conversation_id) {
            Some((_, posts)) => posts.push(element),
            None => buckets.push((conversation_id, vec![element])),
        }
    }

    let mut items: Vec<ContentItem> = buckets
        .into_iter()
        .map(|(conversation_id, mut posts)| {
            if posts.len() == 1 {
                let p = posts.pop().expect("bucket of one");
                ContentItem::Single(Post {
                    url: post_url(&author.username, &p.id),
                    id: p.id,
                    text: p.text,
                    author: author.clone(),
                    created_at: p.created_at,
                    conversation_id,
                    metrics: p.metrics,
                })
            } else {
                ContentItem::Thread(build_thread(posts, author.clone(), conversation_id))
            }
        })
        .collect();

    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    items
}

/// Build a [`Thread`] from a conversation bucket.
///
/// Sorts ascending by creation time, numbers the combined body with
/// `[i/N]` prefixes, and sums metrics element-wise. The earliest post
/// supplies the thread's ID, URL, and creation time.
pub fn build_thread(
    mut posts: Vec<ThreadPost>,
    author: AuthorRef,
    conversation_id: String,
) -> Thread {
    debug_assert!(posts.len() >= 2, "a thread has at least two posts");
    posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut metrics = EngagementMetrics::default();
    for post in &posts {
        metrics.accumulate(&post.metrics);
    }

    let text = combined_thread_text(&posts);
    let first = &posts[0];

    Thread {
        id: first.id.clone(),
        url: post_url(&author.username, &first.id),
        text,
        created_at: first.created_at,
        author,
        conversation_id,
        is_thread: true,
        thread_tweet_count: posts.len(),
        thread_tweets: posts,
        metrics,
    }
}

/// Combined thread body: each post prefixed with its `[i/N]` position,
/// blank-line separated.
pub fn combined_thread_text(posts: &[ThreadPost]) -> String {
    let total = posts.len();
    posts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}/{}] {}", i + 1, total, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::x_api::types::PublicMetrics;

    fn author() -> AuthorRef {
        AuthorRef {
            id: "u1".to_string(),
            username: "karpathy".to_string(),
            name: "Andrej Karpathy".to_string(),
        }
    }

    fn tweet(id: &str, conv: &str, hour: u32, likes: u64) -> Tweet {
        Tweet {
            id: id.to_string(),
            text: format!("post {id}"),
            author_id: Some("u1".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2026, 7, 15, hour, 0, 0).unwrap()),
            public_metrics: PublicMetrics {
                like_count: likes,
                retweet_count: likes / 2,
                reply_count: 1,
                quote_count: 0,
                impression_count: likes * 10,
                bookmark_count: 0,
            },
            conversation_id: Some(conv.to_string()),
        }
    }

    #[test]
    fn singleton_buckets_pass_through() {
        let items = group_into_items(vec![tweet("1", "1", 10, 5)], &author());
        assert_eq!(items.len(), 1);
        match &items[0] {
            ContentItem::Single(p) => {
                assert_eq!(p.id, "1");
                assert_eq!(p.conversation_id, "1");
                assert_eq!(p.url, "https://twitter.com/karpathy/status/1");
            }
            ContentItem::Thread(_) => panic!("expected singleton"),
        }
    }

    #[test]
    fn thread_ordering_is_chronological_and_primary_is_earliest() {
        // Arrive newest-first, as the timeline endpoint returns them.
        let items = group_into_items(
            vec![tweet("1003", "1001", 12, 1), tweet("1001", "1001", 10, 1), tweet("1002", "1001", 11, 1)],
            &author(),
        );
        assert_eq!(items.len(), 1);
        let ContentItem::Thread(t) = &items[0] else {
            panic!("expected thread");
        };
        assert_eq!(t.id, "1001");
        assert_eq!(t.thread_tweet_count, 3);
        let ids: Vec<&str> = t.thread_tweets.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["1001", "1002", "1003"]);
        for pair in t.thread_tweets.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
        assert_eq!(t.conversation_id, "1001");
        assert_eq!(t.thread_tweets[0].id, t.id);
    }

    #[test]
    fn thread_text_carries_position_prefixes() {
        let items = group_into_items(
            vec![tweet("1", "1", 10, 0), tweet("2", "1", 11, 0), tweet("3", "1", 12, 0)],
            &author(),
        );
        let ContentItem::Thread(t) = &items[0] else {
            panic!("expected thread");
        };
        assert!(t.text.contains("[1/3] post 1"));
        assert!(t.text.contains("[2/3] post 2"));
        assert!(t.text.contains("[3/3] post 3"));
        let pos1 = t.text.find("[1/3]").unwrap();
        let pos2 = t.text.find("[2/3]").unwrap();
        let pos3 = t.text.find("[3/3]").unwrap();
        assert!(pos1 < pos2 && pos2 < pos3);
    }

    #[test]
    fn thread_metrics_are_elementwise_sums() {
        let items = group_into_items(
            vec![tweet("1", "1", 10, 10), tweet("2", "1", 11, 30)],
            &author(),
        );
        let ContentItem::Thread(t) = &items[0] else {
            panic!("expected thread");
        };
        assert_eq!(t.metrics.likes, 40);
        assert_eq!(t.metrics.retweets, 20);
        assert_eq!(t.metrics.replies, 2);
        assert_eq!(t.metrics.impressions, 400);
    }

    #[test]
    fn items_sorted_newest_first() {
        let items = group_into_items(
            vec![
                tweet("10", "10", 8, 0),
                tweet("20", "20", 14, 0),
                tweet("30", "30", 11, 0),
            ],
            &author(),
        );
        let ids: Vec<&str> = items.iter().map(ContentItem::primary_id).collect();
        assert_eq!(ids, ["20", "30", "10"]);
    }

    #[test]
    fn mixed_threads_and_singletons() {
        let items = group_into_items(
            vec![
                tweet("5", "5", 9, 0),
                tweet("6", "1", 11, 0),
                tweet("1", "1", 10, 0),
            ],
            &author(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().filter(|i| i.is_thread()).count(), 1);
    }

    #[test]
    fn posts_without_timestamp_are_skipped() {
        let mut bad = tweet("9", "9", 10, 0);
        bad.created_at = None;
        let items = group_into_items(vec![bad, tweet("1", "1", 10, 0)], &author());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].primary_id(), "1");
    }
}
