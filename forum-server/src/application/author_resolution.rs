use std::collections::{HashMap, HashSet};

use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::user::AuthorSummary;

/// Distinct creator ids in first-seen order, skipping unset ids.
pub(crate) fn distinct_creator_ids(posts: &[Post]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts
        .iter()
        .map(|post| post.creator_id)
        .filter(|id| *id > 0 && seen.insert(*id))
        .collect()
}

/// Resolves the authors of `posts` with a single batched lookup.
///
/// Ids the repository does not know are left out of the map; callers render them
/// with an empty name.
pub(crate) async fn resolve_authors<U: UserRepository + ?Sized>(
    users: &U,
    posts: &[Post],
) -> Result<HashMap<i64, AuthorSummary>, DomainError> {
    let ids = distinct_creator_ids(posts);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found = users.find_by_ids(&ids).await?;
    Ok(found
        .into_iter()
        .map(|(id, user)| (id, user.author_summary()))
        .collect())
}
