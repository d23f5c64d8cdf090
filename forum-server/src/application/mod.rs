pub(crate) mod auth_service;
pub(crate) mod author_resolution;
pub(crate) mod post_service;
pub(crate) mod session_manager;
pub(crate) mod verification_manager;
