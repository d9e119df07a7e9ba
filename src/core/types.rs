use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub nickname: String,
    pub fullname: String,
    pub about: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Forum {
    pub title: String,
    pub user: String,
    pub slug: String,
    pub posts: i64,
    pub threads: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Thread {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub forum: String,
    pub message: String,
    pub votes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub parent: i64,
    pub author: String,
    pub message: String,
    #[serde(rename = "isEdited")]
    pub is_edited: bool,
    pub forum: String,
    pub thread: i32,
    pub created: DateTime<Utc>,
}

/// A post together with the related entities asked for via `?related=`.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceStatus {
    pub user: i64,
    pub forum: i64,
    pub thread: i64,
    pub post: i64,
}

/// Threads are addressed either by numeric id or by slug.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ThreadRef {
    Id(i32),
    Slug(String),
}

impl From<String> for ThreadRef {
    fn from(raw: String) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse() {
                return ThreadRef::Id(id);
            }
        }
        ThreadRef::Slug(raw)
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadRef::Id(id) => write!(f, "{}", id),
            ThreadRef::Slug(slug) => f.write_str(slug),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSort {
    #[default]
    Flat,
    Tree,
    ParentTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Related {
    User,
    Forum,
    Thread,
}

impl Related {
    /// Parses a comma list such as `user,thread`, skipping unknown entries.
    pub fn parse_list(raw: &str) -> Vec<Related> {
        let mut related = Vec::new();
        for part in raw.split(',').map(str::trim) {
            let item = match part {
                "user" => Related::User,
                "forum" => Related::Forum,
                "thread" => Related::Thread,
                _ => continue,
            };
            if !related.contains(&item) {
                related.push(item);
            }
        }
        related
    }
}

// -- Request bodies --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub fullname: String,
    #[serde(default)]
    pub about: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub fullname: Option<String>,
    pub about: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateForumRequest {
    pub title: String,
    pub user: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    pub title: String,
    pub author: String,
    pub message: String,
    pub slug: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateThreadRequest {
    pub title: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub parent: i64,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub nickname: String,
    pub voice: i32,
}

// -- Query strings --

pub const DEFAULT_LIMIT: i64 = 100;

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// An empty query value (`?since=`) counts as absent.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => raw.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub since: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumThreadsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadPostsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub since: Option<i64>,
    #[serde(default)]
    pub sort: PostSort,
    #[serde(default)]
    pub desc: bool,
}

impl ThreadPostsQuery {
    /// The cursor to page from. A descending parent-tree page with a
    /// non-positive cursor starts from the newest root.
    pub fn cursor(&self) -> Option<i64> {
        match (self.sort, self.desc, self.since) {
            (PostSort::ParentTree, true, Some(since)) if since <= 0 => None,
            (_, _, since) => since,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostDetailsQuery {
    pub related: Option<String>,
}

/// Treats an empty string the same as an absent field.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
