use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::presentation::http::handlers::auth::{
    LoginDto, RegisterDto, SendCodeDto, SessionDto, SessionUserDto, StatusDto, UserDto,
    VerifyCodeDto,
};
use crate::presentation::http::handlers::health::HealthDto;
use crate::presentation::http::handlers::posts::{
    CommentDto, CommentImageDto, CreatePostDto, FeedAuthorDto, FeedFiltersDto, FeedFiltersEchoDto,
    FeedFlagDto, FeedItemDto, FeedMetaDto, FeedRequestDto, FeedResponseDto, PaginationQuery,
    PostDto, PostImageDto, PostStatsDto,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::http::handlers::health::health,
        crate::presentation::http::handlers::health::database_health,
        crate::presentation::http::handlers::auth::register,
        crate::presentation::http::handlers::auth::login,
        crate::presentation::http::handlers::auth::logout,
        crate::presentation::http::handlers::auth::me,
        crate::presentation::http::handlers::auth::send_code,
        crate::presentation::http::handlers::auth::verify_code,
        crate::presentation::http::handlers::posts::list_posts,
        crate::presentation::http::handlers::posts::create_post,
        crate::presentation::http::handlers::posts::list_feed
    ),
    components(
        schemas(
            HealthDto,
            RegisterDto,
            LoginDto,
            SendCodeDto,
            VerifyCodeDto,
            UserDto,
            SessionDto,
            SessionUserDto,
            StatusDto,
            CreatePostDto,
            PaginationQuery,
            PostDto,
            PostImageDto,
            CommentDto,
            CommentImageDto,
            PostStatsDto,
            FeedRequestDto,
            FeedFiltersDto,
            FeedResponseDto,
            FeedMetaDto,
            FeedFiltersEchoDto,
            FeedItemDto,
            FeedAuthorDto,
            FeedFlagDto
        )
    ),
    tags(
        (name = "health", description = "Liveness and database checks"),
        (name = "auth", description = "Accounts, sessions and email verification"),
        (name = "posts", description = "Posts and the paginated feed")
    ),
    modifiers(&SecurityAddon)
)]
pub(crate) struct ApiDoc;

pub(crate) struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.take().unwrap_or_default();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("opaque session token")
                    .build(),
            ),
        );
        openapi.components = Some(components);
    }
}
