//! Social network clients used by Pressbox.
//!
//! Only the Twitter/X v2 API is implemented: resolving a username, reading a
//! user's recent posts, and publishing a new post.
pub mod twitter;
