//! Forum post model matching the forum namespace payloads.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// Kind of forum post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    General,
    Complaint,
    Application,
    Announcement,
    #[serde(untagged)]
    Other(String),
}

impl PostType {
    pub fn as_str(&self) -> &str {
        match self {
            PostType::General => "general",
            PostType::Complaint => "complaint",
            PostType::Application => "application",
            PostType::Announcement => "announcement",
            PostType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "general" => PostType::General,
            "complaint" => PostType::Complaint,
            "application" => PostType::Application,
            "announcement" => PostType::Announcement,
            other => PostType::Other(other.to_string()),
        }
    }

    /// Display label; unknown kinds show their raw name.
    pub fn label(&self) -> &str {
        match self {
            PostType::General => "Discussion",
            PostType::Complaint => "Complaint",
            PostType::Application => "Application",
            PostType::Announcement => "Announcement",
            PostType::Other(s) => s,
        }
    }
}

/// Which posts to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PostFilter {
    #[default]
    All,
    Only(PostType),
}

impl PostFilter {
    /// Value of the `type` query parameter.
    pub fn as_query(&self) -> &str {
        match self {
            PostFilter::All => "all",
            PostFilter::Only(kind) => kind.as_str(),
        }
    }
}

/// A forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    #[serde(default)]
    pub faction_name: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub post_type: PostType,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Post {
    /// Calendar date of creation, if the server timestamp is readable.
    pub fn created_date(&self) -> Option<NaiveDate> {
        let raw = self.created_at.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .ok()
    }
}

/// A post the user is composing.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    pub faction_id: Option<i64>,
}

impl PostDraft {
    /// Reject drafts the server would refuse anyway.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(ClientError::Validation(
                "Title and content are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the request body for the given author.
    pub fn into_request(self, author_id: i64) -> NewPost {
        NewPost {
            author_id,
            title: self.title,
            content: self.content,
            post_type: self.post_type,
            faction_id: self.faction_id,
        }
    }
}

/// Request body for `action=create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<i64>,
}
