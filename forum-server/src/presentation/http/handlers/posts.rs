use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::post_service::FeedPage;
use crate::domain::comment::{Comment, CommentImage};
use crate::domain::feed::{FeedQuery, FeedSort};
use crate::domain::post::{CreatePostRequest, Post, PostImage, PostStats};
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppResult;
use crate::presentation::http::middleware::auth::AuthenticatedUser;

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct CreatePostDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) title: String,
    #[validate(length(min = 1))]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct PaginationQuery {
    #[validate(range(min = 1, max = 100))]
    pub(crate) limit: Option<u32>,
    pub(crate) offset: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostImageDto {
    pub(crate) id: i64,
    pub(crate) url: String,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostStatsDto {
    pub(crate) views: i32,
    pub(crate) likes: i32,
    pub(crate) stars: i32,
    pub(crate) replies: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CommentImageDto {
    pub(crate) id: i64,
    pub(crate) url: String,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CommentDto {
    pub(crate) id: i64,
    pub(crate) creator_id: i64,
    pub(crate) parent_comment_id: Option<i64>,
    pub(crate) content: String,
    pub(crate) images: Vec<CommentImageDto>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDto {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) creator_id: i64,
    pub(crate) images: Vec<PostImageDto>,
    pub(crate) comments: Vec<CommentDto>,
    pub(crate) stats: PostStatsDto,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<PostImage> for PostImageDto {
    fn from(image: PostImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
            created_at: image.created_at,
        }
    }
}

impl From<CommentImage> for CommentImageDto {
    fn from(image: CommentImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
            created_at: image.created_at,
        }
    }
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            creator_id: comment.creator_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content,
            images: comment.images.into_iter().map(CommentImageDto::from).collect(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<PostStats> for PostStatsDto {
    fn from(stats: PostStats) -> Self {
        Self {
            views: stats.views,
            likes: stats.likes,
            stars: stats.stars,
            replies: stats.comment_number,
        }
    }
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            creator_id: post.creator_id,
            images: post.images.into_iter().map(PostImageDto::from).collect(),
            comments: post.comments.into_iter().map(CommentDto::from).collect(),
            stats: post.stats.into(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub(crate) struct FeedFiltersDto {
    #[serde(alias = "timeFrom")]
    pub(crate) time_from: Option<String>,
    #[serde(alias = "timeTo")]
    pub(crate) time_to: Option<String>,
}

/// `sort` maps a field name to a direction, e.g. `{"views": "asc"}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedRequestDto {
    pub(crate) page: Option<i64>,
    pub(crate) page_size: Option<i64>,
    pub(crate) sort: Option<BTreeMap<String, String>>,
    pub(crate) filters: Option<FeedFiltersDto>,
}

impl From<FeedRequestDto> for FeedQuery {
    fn from(dto: FeedRequestDto) -> Self {
        let (sort_field, sort_direction) = dto
            .sort
            .and_then(|sort| sort.into_iter().next())
            .map_or((None, None), |(field, direction)| {
                (Some(field), Some(direction))
            });
        let filters = dto.filters.unwrap_or_default();

        FeedQuery {
            page: dto.page,
            page_size: dto.page_size,
            time_from: filters.time_from,
            time_to: filters.time_to,
            sort_field,
            sort_direction,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct FeedAuthorDto {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct FeedFlagDto {
    pub(crate) liked: bool,
    pub(crate) stared: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedItemDto {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) excerpt: String,
    pub(crate) author: FeedAuthorDto,
    pub(crate) image: Vec<String>,
    pub(crate) stats: PostStatsDto,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_updated_at: DateTime<Utc>,
    pub(crate) flag: FeedFlagDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct FeedFiltersEchoDto {
    pub(crate) time_from: Option<String>,
    pub(crate) time_to: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedMetaDto {
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) total_pages: i64,
    pub(crate) total: i64,
    pub(crate) sort: BTreeMap<String, String>,
    pub(crate) filters: FeedFiltersEchoDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct FeedResponseDto {
    pub(crate) meta: FeedMetaDto,
    pub(crate) data: Vec<FeedItemDto>,
}

fn sort_echo(sort: FeedSort) -> BTreeMap<String, String> {
    BTreeMap::from([(
        sort.field.column().to_string(),
        sort.direction.keyword().to_lowercase(),
    )])
}

fn rfc3339(instant: Option<DateTime<Utc>>) -> Option<String> {
    instant.map(|value| value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl From<FeedPage> for FeedResponseDto {
    fn from(page: FeedPage) -> Self {
        let data = page
            .posts
            .iter()
            .map(|post| FeedItemDto {
                id: post.id,
                title: post.title.clone(),
                excerpt: post.excerpt(),
                author: FeedAuthorDto {
                    id: post.creator_id,
                    name: page.author_name(post.creator_id).to_string(),
                },
                image: post.images.iter().map(|image| image.url.clone()).collect(),
                stats: post.stats.into(),
                created_at: post.created_at,
                last_updated_at: post.updated_at,
                flag: FeedFlagDto {
                    liked: false,
                    stared: false,
                },
            })
            .collect();

        let meta = FeedMetaDto {
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(),
            total: page.total,
            sort: sort_echo(page.sort),
            filters: FeedFiltersEchoDto {
                time_from: rfc3339(page.filters.time_from),
                time_to: rfc3339(page.filters.time_to),
            },
        };

        Self { meta, data }
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(
        ("limit" = Option<u32>, Query, description = "Items per page (1..=100)"),
        ("offset" = Option<u32>, Query, description = "Offset from the beginning (>= 0)")
    ),
    responses(
        (status = 200, description = "Newest posts with their comments", body = [PostDto]),
        (status = 400, description = "Validation error"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<Json<Vec<PostDto>>> {
    query.validate()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let posts = state.post_service.list_recent(limit, offset).await?;

    Ok(Json(posts.into_iter().map(PostDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreatePostDto,
    responses(
        (status = 201, description = "Post created", body = PostDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(dto): Json<CreatePostDto>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    dto.validate()?;
    let req = CreatePostRequest {
        title: dto.title,
        content: dto.content,
        image_urls: dto.images,
    };

    let post = state.post_service.create_post(auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(PostDto::from(post))))
}

#[utoipa::path(
    post,
    path = "/api/posts/list",
    tag = "posts",
    request_body = FeedRequestDto,
    responses(
        (status = 200, description = "Feed page", body = FeedResponseDto),
        (status = 400, description = "Invalid filter"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn list_feed(
    State(state): State<AppState>,
    Json(dto): Json<FeedRequestDto>,
) -> AppResult<Json<FeedResponseDto>> {
    let page = state.post_service.get_feed_page(dto.into()).await?;
    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use chrono::{TimeZone, Utc};

    use super::{FeedFiltersDto, FeedRequestDto, FeedResponseDto, PostDto};
    use crate::application::post_service::FeedPage;
    use crate::domain::comment::{Comment, CommentImage};
    use crate::domain::feed::{FeedFilters, FeedQuery, FeedSort, SortDirection, SortField};
    use crate::domain::post::{Post, PostStats};
    use crate::domain::user::AuthorSummary;

    #[test]
    fn first_sort_entry_in_key_order_wins() {
        let dto = FeedRequestDto {
            page: Some(2),
            page_size: Some(5),
            sort: Some(BTreeMap::from([
                ("views".to_string(), "asc".to_string()),
                ("likes".to_string(), "desc".to_string()),
            ])),
            filters: Some(FeedFiltersDto {
                time_from: Some("2024-01-01T00:00:00Z".to_string()),
                time_to: None,
            }),
        };

        let query = FeedQuery::from(dto);

        assert_eq!(query.page, Some(2));
        assert_eq!(query.page_size, Some(5));
        assert_eq!(query.sort_field.as_deref(), Some("likes"));
        assert_eq!(query.sort_direction.as_deref(), Some("desc"));
        assert_eq!(query.time_from.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert!(query.time_to.is_none());
    }

    #[test]
    fn empty_body_maps_to_an_empty_query() {
        let query = FeedQuery::from(FeedRequestDto::default());
        assert!(query.page.is_none());
        assert!(query.sort_field.is_none());
        assert!(query.time_from.is_none());
    }

    #[test]
    fn camel_case_body_deserializes() {
        let dto: FeedRequestDto = serde_json::from_str(
            r#"{"page":1,"pageSize":10,"sort":{"stars":"asc"},"filters":{"timeTo":"2024-02-01T00:00:00Z"}}"#,
        )
        .expect("body must deserialize");

        assert_eq!(dto.page_size, Some(10));
        let filters = dto.filters.expect("filters must be present");
        assert_eq!(filters.time_to.as_deref(), Some("2024-02-01T00:00:00Z"));
    }

    #[test]
    fn feed_response_renders_missing_author_with_empty_name() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let known = Post::new(1, "Hello", "first line\nsecond line", 7, created, created)
            .expect("sample post must be valid")
            .with_stats(PostStats {
                views: 3,
                likes: 2,
                stars: 1,
                comment_number: 4,
            });
        let orphan = Post::new(2, "Orphan", "body", 9, created, created)
            .expect("sample post must be valid");

        let page = FeedPage {
            posts: vec![known, orphan],
            total: 3,
            authors: HashMap::from([(
                7,
                AuthorSummary {
                    id: 7,
                    username: "alice".to_string(),
                },
            )]),
            page: 1,
            page_size: 2,
            sort: FeedSort {
                field: SortField::Views,
                direction: SortDirection::Asc,
            },
            filters: FeedFilters {
                time_from: Some(created),
                time_to: None,
            },
        };

        let response = FeedResponseDto::from(page);
        let json = serde_json::to_value(&response).expect("response must serialize");

        assert_eq!(json["meta"]["totalPages"], 2);
        assert_eq!(json["meta"]["pageSize"], 2);
        assert_eq!(json["meta"]["sort"]["views"], "asc");
        assert_eq!(json["meta"]["filters"]["time_from"], "2024-03-01T12:00:00Z");
        assert!(json["meta"]["filters"]["time_to"].is_null());
        assert_eq!(json["data"][0]["author"]["name"], "alice");
        assert_eq!(json["data"][0]["excerpt"], "first line");
        assert_eq!(json["data"][0]["stats"]["replies"], 4);
        assert_eq!(json["data"][1]["author"]["name"], "");
        assert_eq!(json["data"][1]["flag"]["liked"], false);
    }

    #[test]
    fn post_dto_carries_threaded_comments_with_images() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let reply = Comment {
            id: 2,
            post_id: 1,
            creator_id: 8,
            parent_comment_id: Some(1),
            content: "agreed".to_string(),
            images: vec![CommentImage {
                id: 50,
                comment_id: 2,
                url: "https://img.example/reply.png".to_string(),
                created_at: created,
            }],
            created_at: created,
            updated_at: created,
        };
        let root = Comment {
            id: 1,
            parent_comment_id: None,
            content: "first".to_string(),
            images: Vec::new(),
            ..reply.clone()
        };
        let post = Post::new(1, "Hello", "body", 7, created, created)
            .expect("sample post must be valid")
            .with_comments(vec![root, reply]);

        let json = serde_json::to_value(PostDto::from(post)).expect("post must serialize");

        assert_eq!(json["comments"].as_array().map(Vec::len), Some(2));
        assert!(json["comments"][0]["parent_comment_id"].is_null());
        assert_eq!(json["comments"][1]["parent_comment_id"], 1);
        assert_eq!(
            json["comments"][1]["images"][0]["url"],
            "https://img.example/reply.png"
        );
    }
}
