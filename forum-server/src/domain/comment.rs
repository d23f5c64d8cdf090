use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply on a post. `parent_comment_id` is set when it answers another comment of the
/// same post; threads are returned flat and rebuilt by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Comment {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) creator_id: i64,
    pub(crate) parent_comment_id: Option<i64>,
    pub(crate) content: String,
    pub(crate) images: Vec<CommentImage>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CommentImage {
    pub(crate) id: i64,
    pub(crate) comment_id: i64,
    pub(crate) url: String,
    pub(crate) created_at: DateTime<Utc>,
}

/// Hangs each image on its comment and buckets comments by post id.
///
/// Input order is kept inside every bucket, so callers pass rows already sorted.
/// Images whose comment is not in `comments` are dropped.
pub(crate) fn group_by_post(
    comments: Vec<Comment>,
    images: Vec<CommentImage>,
) -> HashMap<i64, Vec<Comment>> {
    let mut images_by_comment: HashMap<i64, Vec<CommentImage>> = HashMap::new();
    for image in images {
        images_by_comment
            .entry(image.comment_id)
            .or_default()
            .push(image);
    }

    let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
    for mut comment in comments {
        comment.images = images_by_comment.remove(&comment.id).unwrap_or_default();
        by_post.entry(comment.post_id).or_default().push(comment);
    }
    by_post
}
