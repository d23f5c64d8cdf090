use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::presentation::AppState;
use crate::presentation::http::handlers::auth::{
    login, logout, me, register, send_code, verify_code,
};
use crate::presentation::http::middleware::auth::session_auth_middleware;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/send-code", post(send_code))
        .route("/verify-code", post(verify_code));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .layer(middleware::from_fn_with_state(
            state,
            session_auth_middleware,
        ));

    public.merge(protected)
}
