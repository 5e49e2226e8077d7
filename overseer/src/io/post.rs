//! Idempotent status comment posting.
//!
//! The markdown report starts with a sentinel line, so re-posting replaces the
//! previous report instead of stacking new comments on the parent issue.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::format::markdown::status_sentinel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// Comment storage on the issue tracker.
pub trait CommentStore {
    fn list_comments(&self, issue: u64) -> Result<Vec<Comment>>;
    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()>;
    fn create_comment(&self, issue: u64, body: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Updated { comment_id: u64 },
    Created,
}

/// Replace the existing status comment on `parent`, or create one.
pub fn upsert_status_comment(
    store: &dyn CommentStore,
    parent: u64,
    body: &str,
) -> Result<PostAction> {
    let sentinel = status_sentinel(parent);
    let comments = store
        .list_comments(parent)
        .with_context(|| format!("list comments on #{parent}"))?;

    if let Some(existing) = comments
        .iter()
        .find(|comment| comment.body.contains(&sentinel))
    {
        store
            .update_comment(existing.id, body)
            .with_context(|| format!("update status comment {}", existing.id))?;
        info!(parent, comment_id = existing.id, "updated status comment");
        return Ok(PostAction::Updated {
            comment_id: existing.id,
        });
    }

    store
        .create_comment(parent, body)
        .with_context(|| format!("create status comment on #{parent}"))?;
    info!(parent, "created status comment");
    Ok(PostAction::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CommentCall, ScriptedComments};

    #[test]
    fn updates_the_comment_carrying_the_sentinel() {
        let store = ScriptedComments::new(vec![
            Comment {
                id: 1,
                body: "looks good".to_string(),
            },
            Comment {
                id: 2,
                body: format!("{}\nold report", status_sentinel(100)),
            },
        ]);
        let action = upsert_status_comment(&store, 100, "new report").expect("post");
        assert_eq!(action, PostAction::Updated { comment_id: 2 });
        assert_eq!(
            store.calls(),
            vec![
                CommentCall::List(100),
                CommentCall::Update(2, "new report".to_string())
            ]
        );
    }

    #[test]
    fn creates_when_only_other_parents_are_reported() {
        let store = ScriptedComments::new(vec![Comment {
            id: 9,
            body: status_sentinel(10),
        }]);
        let action = upsert_status_comment(&store, 100, "report").expect("post");
        assert_eq!(action, PostAction::Created);
        assert_eq!(
            store.calls().last(),
            Some(&CommentCall::Create(100, "report".to_string()))
        );
    }

    #[test]
    fn list_failure_is_an_error() {
        let store = ScriptedComments::failing();
        let err = upsert_status_comment(&store, 5, "report").expect_err("should fail");
        assert!(format!("{err:#}").contains("list comments on #5"));
    }
}
