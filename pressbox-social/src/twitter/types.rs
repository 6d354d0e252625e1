use serde::{Deserialize, Serialize};

/// Problem object the v2 API embeds in otherwise successful responses,
/// e.g. when a looked-up user does not exist.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ApiProblem {
    pub fn describe(&self) -> String {
        self.detail
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("unknown problem")
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub data: Option<User>,
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimelineMeta {
    #[serde(default)]
    pub result_count: Option<u32>,
    #[serde(default)]
    pub newest_id: Option<String>,
    #[serde(default)]
    pub oldest_id: Option<String>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// `GET 2/users/:id/tweets` body. `data` is newest first and absent when
/// there is nothing new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub data: Option<Vec<Tweet>>,
    #[serde(default)]
    pub meta: Option<TimelineMeta>,
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,

    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
}

impl Tweet {
    /// True for retweets, which carry someone else's text.
    pub fn is_retweet(&self) -> bool {
        self.referenced_tweets
            .as_deref()
            .is_some_and(|refs| refs.iter().any(|r| r.kind == "retweeted"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetResponse {
    pub data: CreatedTweet,
}
