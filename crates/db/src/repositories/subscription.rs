//! Subscription (RSVP) repository.

use std::sync::Arc;

use super::{PAGE_SIZE, page_offset};
use crate::entities::{Subscription, subscription};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::OnConflict,
};

/// Subscription repository for database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a subscription by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<subscription::Model>> {
        Subscription::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a subscription by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<subscription::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription {id} not found")))
    }

    /// Insert a subscription. An existing `(user, event)` row yields `Conflict`.
    pub async fn create(&self, model: subscription::Model) -> AppResult<subscription::Model> {
        let inserted = Subscription::insert(subscription::ActiveModel::from(model.clone()))
            .on_conflict(
                OnConflict::columns([
                    subscription::Column::UserId,
                    subscription::Column::EventId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted == 0 {
            return Err(AppError::Conflict("Already joined this event".to_string()));
        }

        Ok(model)
    }

    /// Update a subscription.
    pub async fn update(
        &self,
        model: subscription::ActiveModel,
    ) -> AppResult<subscription::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's subscriptions, most recent first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by_desc(subscription::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of an event's subscriptions, oldest first.
    pub async fn find_by_event_page(
        &self,
        event_id: &str,
        page: u64,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::EventId.eq(event_id))
            .order_by_asc(subscription::Column::CreatedAt)
            .order_by_asc(subscription::Column::Id)
            .offset(page_offset(page)?)
            .limit(PAGE_SIZE)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of subscriptions of an event, in any status.
    pub async fn count_by_event(&self, event_id: &str) -> AppResult<u64> {
        Subscription::find()
            .filter(subscription::Column::EventId.eq(event_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
