use std::collections::HashMap;

use tracing::debug;

use crate::application::author_resolution::resolve_authors;
use crate::data::post_repository::{NewPost, PageWindow, PostRepository};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::feed::{FeedFilters, FeedQuery, FeedSort, total_pages};
use crate::domain::post::{CreatePostRequest, Post};
use crate::domain::user::AuthorSummary;

/// One page of the feed together with everything needed to render it.
#[derive(Debug, Clone)]
pub(crate) struct FeedPage {
    pub(crate) posts: Vec<Post>,
    /// Posts matching the filters, independent of the page window.
    pub(crate) total: i64,
    pub(crate) authors: HashMap<i64, AuthorSummary>,
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) sort: FeedSort,
    pub(crate) filters: FeedFilters,
}

impl FeedPage {
    pub(crate) fn total_pages(&self) -> i64 {
        total_pages(self.total, self.page_size)
    }

    /// Empty when the creator could not be resolved.
    pub(crate) fn author_name(&self, creator_id: i64) -> &str {
        self.authors
            .get(&creator_id)
            .map(|author| author.username.as_str())
            .unwrap_or_default()
    }
}

pub(crate) struct PostService<P: PostRepository, U: UserRepository> {
    posts: P,
    users: U,
}

impl<P: PostRepository, U: UserRepository> PostService<P, U> {
    pub(crate) fn new(posts: P, users: U) -> Self {
        Self { posts, users }
    }

    pub(crate) async fn create_post(
        &self,
        creator_id: i64,
        req: CreatePostRequest,
    ) -> Result<Post, DomainError> {
        let req = req.validate()?;

        let new_post = NewPost {
            title: req.title,
            content: req.content,
            creator_id,
            image_urls: req.image_urls,
        };
        self.posts.create_post(new_post).await
    }

    pub(crate) async fn list_recent(&self, limit: u32, offset: u32) -> Result<Vec<Post>, DomainError> {
        let window = PageWindow {
            limit: i64::from(limit),
            offset: i64::from(offset),
        };
        self.posts.list_recent(window).await
    }

    /// Count and page are two independent reads; a concurrent insert can make `total`
    /// disagree with the page by a row. That is accepted, not reported.
    pub(crate) async fn get_feed_page(&self, query: FeedQuery) -> Result<FeedPage, DomainError> {
        let request = query.normalize()?;
        let window = PageWindow {
            limit: request.page.limit(),
            offset: request.page.offset(),
        };

        let (total, posts) = tokio::try_join!(
            self.posts.count_posts(&request.filters),
            self.posts
                .fetch_page(&request.filters, request.sort, window),
        )?;
        let authors = resolve_authors(&self.users, &posts).await?;

        debug!(
            page = request.page.page,
            page_size = request.page.page_size,
            total,
            returned = posts.len(),
            "feed page assembled"
        );

        Ok(FeedPage {
            posts,
            total,
            authors,
            page: request.page.page,
            page_size: request.page.page_size,
            sort: request.sort,
            filters: request.filters,
        })
    }
}
