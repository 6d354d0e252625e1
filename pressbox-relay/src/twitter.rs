//! [`SocialClient`] backed by the Twitter/X v2 API.
use crate::{Account, CandidateItem, SocialClient};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use pressbox_social::twitter::{TimelineQuery, TwitterApi};
use std::collections::HashMap;
use std::sync::Mutex;

/// Upper bound on timeline pages read per account and run.
const MAX_PAGES: usize = 5;

pub struct TwitterSource {
    api: TwitterApi,
    max_results: u32,
    exclude_replies: bool,
    exclude_retweets: bool,
    // username -> user id, resolved once per process
    user_ids: Mutex<HashMap<String, String>>,
}

impl TwitterSource {
    pub fn new(api: TwitterApi) -> Self {
        Self {
            api,
            max_results: 10,
            exclude_replies: true,
            exclude_retweets: true,
            user_ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = n;
        self
    }

    pub fn with_exclusions(mut self, replies: bool, retweets: bool) -> Self {
        self.exclude_replies = replies;
        self.exclude_retweets = retweets;
        self
    }

    pub fn can_publish(&self) -> bool {
        self.api.can_publish()
    }

    fn cached_id(&self, username: &str) -> Result<Option<String>> {
        let ids = self
            .user_ids
            .lock()
            .map_err(|_| anyhow!("user id cache poisoned"))?;
        Ok(ids.get(username).cloned())
    }

    async fn user_id(&self, username: &str) -> Result<String> {
        if let Some(id) = self.cached_id(username)? {
            return Ok(id);
        }

        let user = self.api.user_by_username(username).await?;
        tracing::debug!(username, user_id = %user.id, "twitter.user.resolved");
        self.user_ids
            .lock()
            .map_err(|_| anyhow!("user id cache poisoned"))?
            .insert(username.to_string(), user.id.clone());
        Ok(user.id)
    }
}

#[async_trait]
impl SocialClient for TwitterSource {
    async fn recent_posts(
        &self,
        account: &Account,
        since_id: Option<&str>,
    ) -> Result<Vec<CandidateItem>> {
        let user_id = self.user_id(&account.username).await?;

        let mut tweets = Vec::new();
        let mut next_token: Option<String> = None;
        for page in 1..=MAX_PAGES {
            let resp = self
                .api
                .user_tweets(
                    &user_id,
                    &TimelineQuery {
                        since_id,
                        pagination_token: next_token.as_deref(),
                        max_results: self.max_results,
                        exclude_replies: self.exclude_replies,
                        exclude_retweets: self.exclude_retweets,
                    },
                )
                .await?;
            tweets.extend(resp.data.unwrap_or_default());
            next_token = resp.meta.and_then(|m| m.next_token);

            // Without a checkpoint only the newest page matters.
            if since_id.is_none() || next_token.is_none() {
                break;
            }
            tracing::debug!(username = %account.username, page, "twitter.timeline.next_page");
        }
        if since_id.is_some() && next_token.is_some() {
            tracing::warn!(
                username = %account.username,
                pages = MAX_PAGES,
                fetched = tweets.len(),
                "twitter.timeline.truncated; older posts since the checkpoint are skipped"
            );
        }

        let items = tweets
            .into_iter()
            .filter(|tweet| !(self.exclude_retweets && tweet.is_retweet()))
            .map(|tweet| CandidateItem {
                id: tweet.id,
                text: tweet.text,
                account: account.username.clone(),
            })
            .collect();
        Ok(items)
    }

    async fn publish(&self, text: &str) -> Result<String> {
        let created = self.api.create_tweet(text).await?;
        Ok(created.id)
    }
}
