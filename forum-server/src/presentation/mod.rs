use std::sync::Arc;

use sqlx::PgPool;

use crate::application::auth_service::AuthService;
use crate::application::post_service::PostService;
use crate::data::repositories::postgres::post_repository::PostgresPostRepository;
use crate::data::repositories::postgres::user_repository::PostgresUserRepository;

pub(crate) mod http;

pub(crate) type ForumPostService = PostService<PostgresPostRepository, PostgresUserRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pool: PgPool,
    pub(crate) auth_service: Arc<AuthService<PostgresUserRepository>>,
    pub(crate) post_service: Arc<ForumPostService>,
}

impl AppState {
    pub(crate) fn new(
        pool: PgPool,
        auth_service: Arc<AuthService<PostgresUserRepository>>,
        post_service: Arc<ForumPostService>,
    ) -> Self {
        Self {
            pool,
            auth_service,
            post_service,
        }
    }
}
