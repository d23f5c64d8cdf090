use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::data::post_repository::{NewPost, PageWindow, PostRepository};
use crate::domain::comment::{Comment, CommentImage, group_by_post};
use crate::domain::error::DomainError;
use crate::domain::feed::{FeedFilters, FeedSort};
use crate::domain::post::{Post, PostImage, PostStats};

#[derive(Debug, Clone)]
pub(crate) struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the images of every post in one query and joins them back by post id.
    async fn attach_images(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let image_rows = sqlx::query_as::<_, PostImageRow>(
            r#"
            SELECT id, post_id, url, created_at
            FROM post_images
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&post_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(map_post_db_error)?;

        let mut images_by_post: HashMap<i64, Vec<PostImage>> = HashMap::new();
        for image in image_rows {
            images_by_post
                .entry(image.post_id)
                .or_default()
                .push(image.into());
        }

        rows.into_iter()
            .map(|row| {
                let images = images_by_post.remove(&row.id).unwrap_or_default();
                map_row_to_post(row).map(|post| post.with_images(images))
            })
            .collect()
    }

    /// Two more round trips for the whole page: comments, then their images.
    async fn attach_comments(&self, posts: Vec<Post>) -> Result<Vec<Post>, DomainError> {
        if posts.is_empty() {
            return Ok(posts);
        }

        let post_ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        let comments: Vec<Comment> = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, creator_id, parent_comment_id, content, created_at, updated_at
            FROM comments
            WHERE post_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&post_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(map_post_db_error)?
        .into_iter()
        .map(Comment::from)
        .collect();

        let images: Vec<CommentImage> = if comments.is_empty() {
            Vec::new()
        } else {
            let comment_ids: Vec<i64> = comments.iter().map(|comment| comment.id).collect();
            sqlx::query_as::<_, CommentImageRow>(
                r#"
                SELECT id, comment_id, url, created_at
                FROM comment_images
                WHERE comment_id = ANY($1)
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(&comment_ids[..])
            .fetch_all(&self.pool)
            .await
            .map_err(map_post_db_error)?
            .into_iter()
            .map(CommentImage::from)
            .collect()
        };

        let mut by_post = group_by_post(comments, images);
        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = by_post.remove(&post.id).unwrap_or_default();
                post.with_comments(comments)
            })
            .collect())
    }
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    creator_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    views: i32,
    likes: i32,
    stars: i32,
    comment_number: i32,
}

#[derive(FromRow)]
struct PostImageRow {
    id: i64,
    post_id: i64,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<PostImageRow> for PostImage {
    fn from(row: PostImageRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    creator_id: i64,
    parent_comment_id: Option<i64>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            creator_id: row.creator_id,
            parent_comment_id: row.parent_comment_id,
            content: row.content,
            images: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CommentImageRow {
    id: i64,
    comment_id: i64,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<CommentImageRow> for CommentImage {
    fn from(row: CommentImageRow) -> Self {
        Self {
            id: row.id,
            comment_id: row.comment_id,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

const SELECT_POSTS: &str = r#"
    SELECT
        id,
        title,
        content,
        creator_id,
        created_at,
        updated_at,
        views,
        likes,
        stars,
        comment_number
    FROM posts
    WHERE 1=1
"#;

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_post_db_error)?;

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (title, content, creator_id)
            VALUES ($1, $2, $3)
            RETURNING
                id, title, content, creator_id, created_at, updated_at,
                views, likes, stars, comment_number
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.creator_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_post_db_error)?;

        let mut images: Vec<PostImage> = if input.image_urls.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, PostImageRow>(
                r#"
                INSERT INTO post_images (post_id, url)
                SELECT $1, url
                FROM UNNEST($2::text[]) WITH ORDINALITY AS t(url, ord)
                ORDER BY ord
                RETURNING id, post_id, url, created_at
                "#,
            )
            .bind(row.id)
            .bind(&input.image_urls[..])
            .fetch_all(&mut *tx)
            .await
            .map_err(map_post_db_error)?
            .into_iter()
            .map(PostImage::from)
            .collect()
        };
        images.sort_by_key(|image| image.id);

        tx.commit().await.map_err(map_post_db_error)?;

        map_row_to_post(row).map(|post| post.with_images(images))
    }

    async fn list_recent(&self, window: PageWindow) -> Result<Vec<Post>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_POSTS);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(window.limit);
        builder.push(" OFFSET ");
        builder.push_bind(window.offset);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_post_db_error)?;

        let posts = self.attach_images(rows).await?;
        self.attach_comments(posts).await
    }

    async fn count_posts(&self, filters: &FeedFilters) -> Result<i64, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts WHERE 1=1");
        push_filters(&mut builder, filters);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_post_db_error)
    }

    async fn fetch_page(
        &self,
        filters: &FeedFilters,
        sort: FeedSort,
        window: PageWindow,
    ) -> Result<Vec<Post>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_POSTS);
        push_filters(&mut builder, filters);

        // column and keyword come from closed enums, never from client text
        builder
            .push(" ORDER BY ")
            .push(sort.field.column())
            .push(" ")
            .push(sort.direction.keyword())
            .push(", id ASC LIMIT ");
        builder.push_bind(window.limit);
        builder.push(" OFFSET ");
        builder.push_bind(window.offset);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_post_db_error)?;

        self.attach_images(rows).await
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &FeedFilters) {
    if let Some(time_from) = filters.time_from {
        builder.push(" AND created_at >= ");
        builder.push_bind(time_from);
    }
    if let Some(time_to) = filters.time_to {
        builder.push(" AND created_at <= ");
        builder.push_bind(time_to);
    }
}

fn map_row_to_post(row: PostRow) -> Result<Post, DomainError> {
    let stats = PostStats {
        views: row.views,
        likes: row.likes,
        stars: row.stars,
        comment_number: row.comment_number,
    };
    Post::new(
        row.id,
        row.title,
        row.content,
        row.creator_id,
        row.created_at,
        row.updated_at,
    )
    .map(|post| post.with_stats(stats))
    .map_err(|err| DomainError::Unexpected(err.to_string()))
}

fn map_post_db_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23503")
    {
        return DomainError::NotFound("creator".to_string());
    }
    DomainError::CollaboratorUnavailable(err.to_string())
}
