use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::feed::{FeedFilters, FeedSort};
use crate::domain::post::Post;

#[derive(Debug, Clone)]
pub(crate) struct NewPost {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) creator_id: i64,
    pub(crate) image_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub(crate) limit: i64,
    pub(crate) offset: i64,
}

/// Post storage. Every returned post carries its images.
#[async_trait]
pub(crate) trait PostRepository: Send + Sync {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError>;
    /// Newest first, ignoring filters. Each post also carries its comments and their images.
    async fn list_recent(&self, window: PageWindow) -> Result<Vec<Post>, DomainError>;
    /// Rows matching `filters`, with no limit or offset applied.
    async fn count_posts(&self, filters: &FeedFilters) -> Result<i64, DomainError>;
    /// Ordered by `sort`, ties broken by ascending id.
    async fn fetch_page(
        &self,
        filters: &FeedFilters,
        sort: FeedSort,
        window: PageWindow,
    ) -> Result<Vec<Post>, DomainError>;
}
