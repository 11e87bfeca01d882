//! Event repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Comment, Event, Subscription, comment, event, subscription};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

#[derive(Debug, FromQueryResult)]
struct AttendeeCount {
    event_id: String,
    count: i64,
}

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an event by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))
    }

    /// List events, latest start first, optionally filtered by title.
    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<event::Model>> {
        let mut select = Event::find();
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            select = select.filter(event::Column::Title.contains(query.trim()));
        }

        select
            .order_by_desc(event::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Events belonging to a group, soonest first.
    pub async fn find_by_group(&self, group_id: &str) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(event::Column::GroupId.eq(group_id))
            .order_by_asc(event::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Events the user holds a subscription for, in any status.
    pub async fn find_by_subscriber(&self, user_id: &str) -> AppResult<Vec<event::Model>> {
        let event_ids: Vec<String> = Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|s| s.event_id)
            .collect();

        if event_ids.is_empty() {
            return Ok(vec![]);
        }

        Event::find()
            .filter(event::Column::Id.is_in(event_ids))
            .order_by_desc(event::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new event.
    pub async fn create(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a group event and its creator's `join` subscription in one transaction.
    pub async fn create_with_subscription(
        &self,
        event: event::Model,
        creator: subscription::Model,
    ) -> AppResult<event::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Event::insert(event::ActiveModel::from(event.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Subscription::insert(subscription::ActiveModel::from(creator))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(event)
    }

    /// Update an event.
    pub async fn update(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an event with its comments and subscriptions.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Comment::delete_many()
            .filter(comment::Column::EventId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Subscription::delete_many()
            .filter(subscription::Column::EventId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Event::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of subscriptions with status `join`.
    pub async fn attendee_count(&self, event_id: &str) -> AppResult<u64> {
        Subscription::find()
            .filter(subscription::Column::EventId.eq(event_id))
            .filter(subscription::Column::Status.eq(subscription::SubscriptionStatus::Join))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Attendee counts for several events. Events nobody joined are absent.
    pub async fn attendee_counts(&self, event_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Subscription::find()
            .select_only()
            .column(subscription::Column::EventId)
            .column_as(subscription::Column::Id.count(), "count")
            .filter(subscription::Column::EventId.is_in(event_ids.iter().cloned()))
            .filter(subscription::Column::Status.eq(subscription::SubscriptionStatus::Join))
            .group_by(subscription::Column::EventId)
            .into_model::<AttendeeCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.event_id, u64::try_from(row.count).unwrap_or(0)))
            .collect())
    }
}
