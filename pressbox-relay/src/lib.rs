//! Poll, filter, format and republish.
//!
//! A [`Relay`] walks the configured accounts one at a time, asks a
//! [`SocialClient`] for posts newer than the account's checkpoint, keeps the
//! ones the [`RelevanceFilter`] accepts, rewrites them with the [`Formatter`]
//! and publishes them. The [`CheckpointStore`] remembers the last processed id
//! per account between runs.
pub mod checkpoint;
pub mod filter;
pub mod format;
pub mod publisher;
pub mod twitter;

pub use checkpoint::CheckpointStore;
pub use filter::RelevanceFilter;
pub use format::Formatter;
pub use publisher::{Relay, RelaySettings, RunReport, SocialClient};
pub use twitter::TwitterSource;

/// A monitored account and how its posts are presented when republished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Platform username, also the checkpoint key.
    pub username: String,
    pub emoji: String,
    /// Space separated hashtags appended to every repost.
    pub hashtags: String,
    /// Handle credited in the repost, without `@`.
    pub attribution: String,
}

/// A post fetched from a monitored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,
    pub text: String,
    /// Username of the account it came from.
    pub account: String,
}
