//! Thin wrapper around the Twitter/X v2 endpoints Pressbox uses.
//!
//! Reads use the app-only bearer token; publishing needs an OAuth 2.0 user
//! context token. Both are handed to the shared HTTP client, which never logs
//! them.
use crate::twitter::types::{
    CreateTweetRequest, CreateTweetResponse, CreatedTweet, TimelineResponse, User, UserResponse,
};
use anyhow::{Context, Result, anyhow, bail};
use pressbox_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;

/// Link to a post on the public web client.
pub fn status_url(username: &str, id: &str) -> String {
    format!("https://x.com/{username}/status/{id}")
}

/// Parameters for a user timeline read.
#[derive(Debug, Clone)]
pub struct TimelineQuery<'a> {
    /// Only return posts newer than this id.
    pub since_id: Option<&'a str>,
    /// `meta.next_token` from the previous page.
    pub pagination_token: Option<&'a str>,
    pub max_results: u32,
    pub exclude_replies: bool,
    pub exclude_retweets: bool,
}

impl Default for TimelineQuery<'_> {
    fn default() -> Self {
        Self {
            since_id: None,
            pagination_token: None,
            max_results: 10,
            exclude_replies: true,
            exclude_retweets: true,
        }
    }
}

impl TimelineQuery<'_> {
    fn exclude_param(&self) -> Option<&'static str> {
        match (self.exclude_retweets, self.exclude_replies) {
            (true, true) => Some("retweets,replies"),
            (true, false) => Some("retweets"),
            (false, true) => Some("replies"),
            (false, false) => None,
        }
    }
}

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    bearer: String,
    user_token: Option<String>,
}

impl TwitterApi {
    /// Client for the API host at `base_url`.
    pub fn with_base_url(
        base_url: &str,
        bearer_token: String,
        user_token: Option<String>,
    ) -> Result<Self> {
        let http = HttpClient::new(base_url).context("twitter base url")?;
        Ok(Self {
            http,
            bearer: bearer_token,
            user_token,
        })
    }

    pub fn can_publish(&self) -> bool {
        self.user_token.is_some()
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        let path = format!("2/users/by/username/{}", username.trim_start_matches('@'));
        let resp: UserResponse = self
            .http
            .get_json(
                &path,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("user lookup for @{username}"))?;

        match resp {
            UserResponse {
                data: Some(user), ..
            } => Ok(user),
            UserResponse { errors, .. } => {
                let reason = errors
                    .as_deref()
                    .and_then(|e| e.first())
                    .map(|p| p.describe())
                    .unwrap_or_else(|| "empty response".to_string());
                Err(anyhow!("user @{username} not found: {reason}"))
            }
        }
    }

    pub async fn user_tweets(
        &self,
        user_id: &str,
        query: &TimelineQuery<'_>,
    ) -> Result<TimelineResponse> {
        let max_results = query.max_results.clamp(5, 100);

        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("max_results", max_results.to_string().into()),
            ("tweet.fields", "created_at,lang,author_id,referenced_tweets".into()),
        ];
        if let Some(since) = query.since_id {
            params.push(("since_id", since.into()));
        }
        if let Some(token) = query.pagination_token {
            params.push(("pagination_token", token.into()));
        }
        if let Some(exclude) = query.exclude_param() {
            params.push(("exclude", exclude.into()));
        }

        let resp: TimelineResponse = self
            .http
            .get_json(
                &format!("2/users/{user_id}/tweets"),
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("timeline read for user {user_id}"))?;

        tracing::debug!(
            user_id,
            count = resp.data.as_ref().map_or(0, Vec::len),
            newest_id = ?resp.meta.as_ref().and_then(|m| m.newest_id.as_deref()),
            "twitter.timeline"
        );
        Ok(resp)
    }

    pub async fn create_tweet(&self, text: &str) -> Result<CreatedTweet> {
        let Some(token) = self.user_token.as_deref() else {
            bail!("publishing requires a user-context token");
        };

        let resp: CreateTweetResponse = self
            .http
            .post_json(
                "2/tweets",
                &CreateTweetRequest { text },
                RequestOpts {
                    auth: Some(Auth::Bearer(token)),
                    ..Default::default()
                },
            )
            .await
            .context("create post")?;

        tracing::debug!(id = %resp.data.id, "twitter.created");
        Ok(resp.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_param_matches_flags() {
        let mut q = TimelineQuery::default();
        assert_eq!(q.exclude_param(), Some("retweets,replies"));
        q.exclude_replies = false;
        assert_eq!(q.exclude_param(), Some("retweets"));
        q.exclude_retweets = false;
        assert_eq!(q.exclude_param(), None);
    }

    #[test]
    fn status_url_uses_username_and_id() {
        assert_eq!(
            status_url("David_Ornstein", "1790000000000000000"),
            "https://x.com/David_Ornstein/status/1790000000000000000"
        );
    }
}
