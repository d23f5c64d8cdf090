use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::comment::Comment;
use super::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) creator_id: i64,
    pub(crate) images: Vec<PostImage>,
    /// Filled only by the recent-posts listing; empty elsewhere.
    pub(crate) comments: Vec<Comment>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) stats: PostStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PostStats {
    pub(crate) views: i32,
    pub(crate) likes: i32,
    pub(crate) stars: i32,
    pub(crate) comment_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PostImage {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) url: String,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreatePostRequest {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image_urls: Vec<String>,
}

impl CreatePostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            content: normalize_content(&self.content)?,
            image_urls: normalize_image_urls(self.image_urls),
        })
    }
}

impl Post {
    pub(crate) fn new(
        id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
        creator_id: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_positive_i64("id", id)?;
        validate_positive_i64("creator_id", creator_id)?;
        let title = normalize_title(&title.into())?;
        let content = normalize_content(&content.into())?;

        if updated_at < created_at {
            return Err(DomainError::Validation {
                field: "updated_at",
                message: "must be >= created_at",
            });
        }

        Ok(Self {
            id,
            title,
            content,
            creator_id,
            images: Vec::new(),
            comments: Vec::new(),
            created_at,
            updated_at,
            stats: PostStats::default(),
        })
    }

    pub(crate) fn with_stats(mut self, stats: PostStats) -> Self {
        self.stats = stats;
        self
    }

    pub(crate) fn with_images(mut self, images: Vec<PostImage>) -> Self {
        self.images = images;
        self
    }

    pub(crate) fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    /// First line of the content, capped at 200 characters.
    pub(crate) fn excerpt(&self) -> String {
        let first_line = self.content.trim().lines().next().unwrap_or_default();
        first_line.chars().take(EXCERPT_MAX_CHARS).collect()
    }
}

const EXCERPT_MAX_CHARS: usize = 200;

fn validate_positive_i64(field: &'static str, value: i64) -> Result<(), DomainError> {
    if value <= 0 {
        return Err(DomainError::Validation {
            field,
            message: "must be > 0",
        });
    }
    Ok(())
}

fn normalize_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(DomainError::Validation {
            field: "title",
            message: "must be 1..255 chars",
        });
    }
    Ok(title.to_string())
}

fn normalize_content(content: &str) -> Result<String, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::Validation {
            field: "content",
            message: "must not be empty",
        });
    }
    Ok(content.to_string())
}

fn normalize_image_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}
