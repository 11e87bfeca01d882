//! Comment service.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use huddle_common::{AppResult, IdGenerator};
use huddle_db::entities::{comment, user};
use huddle_db::repositories::{CommentRepository, EventRepository, UserRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::session::Session;

/// Input for posting a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub event_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

/// Comment with the commenter's email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub event_id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    fn from_model(model: comment::Model, email: Option<String>) -> Self {
        Self {
            id: model.id,
            content: model.content,
            event_id: model.event_id,
            user_id: model.user_id,
            email,
            created_at: model.created_at.into(),
        }
    }
}

/// Comment service.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            event_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments on an event, newest first.
    pub async fn list(&self, event_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_by_event(event_id).await?;

        let mut user_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let emails: HashMap<String, String> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u: user::Model| (u.id, u.email))
            .collect();

        Ok(comments
            .into_iter()
            .map(|c| {
                let email = emails.get(&c.user_id).cloned();
                CommentView::from_model(c, email)
            })
            .collect())
    }

    /// Post a comment on an event.
    pub async fn create(
        &self,
        session: &Session,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;

        let commenter = self.user_repo.get_by_id(&session.user_id).await?;
        self.event_repo.get_by_id(&input.event_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            content: Set(input.content),
            user_id: Set(commenter.id),
            event_id: Set(input.event_id),
            created_at: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        Ok(CommentView::from_model(comment, Some(commenter.email)))
    }
}
