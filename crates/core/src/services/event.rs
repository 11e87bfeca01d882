//! Event service.

use chrono::{DateTime, Utc};
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::{event, user};
use huddle_db::repositories::EventRepository;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::authz;
use super::session::Session;

/// Input for creating an event.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 8192))]
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Organizer display name. Defaults to the creator's name.
    #[validate(length(min = 1, max = 256))]
    pub organizer: Option<String>,
    #[validate(length(max = 1024))]
    pub image: Option<String>,
}

/// Input for updating an event. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventInput {
    pub event_id: String,
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 8192))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 256))]
    pub organizer: Option<String>,
    /// `null` clears the image.
    #[serde(default, deserialize_with = "huddle_common::serde_util::double_option")]
    pub image: Option<Option<String>>,
}

/// Event with its attendee count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub organizer: String,
    pub organizer_email: String,
    pub organizer_id: String,
    pub image: Option<String>,
    pub group_id: Option<String>,
    pub attendee_count: u64,
    pub created_at: DateTime<Utc>,
}

impl EventView {
    #[must_use]
    pub fn from_model(model: event::Model, attendee_count: u64) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            start_date: model.start_date.into(),
            end_date: model.end_date.into(),
            organizer: model.organizer,
            organizer_email: model.organizer_email,
            organizer_id: model.organizer_id,
            image: model.image,
            group_id: model.group_id,
            attendee_count,
            created_at: model.created_at.into(),
        }
    }
}

/// Attach attendee counts to a list of events.
pub(crate) async fn event_views(
    event_repo: &EventRepository,
    events: Vec<event::Model>,
) -> AppResult<Vec<EventView>> {
    let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
    let counts = event_repo.attendee_counts(&ids).await?;

    Ok(events
        .into_iter()
        .map(|e| {
            let count = counts.get(&e.id).copied().unwrap_or(0);
            EventView::from_model(e, count)
        })
        .collect())
}

/// Reject an event that ends before it starts.
pub(crate) fn check_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if end < start {
        return Err(AppError::Validation(
            "endDate must not be before startDate".to_string(),
        ));
    }
    Ok(())
}

/// Build a new event row owned by the session user.
pub(crate) fn new_event(
    id: String,
    session: &Session,
    input: CreateEventInput,
    group_id: Option<String>,
) -> event::Model {
    let organizer = input
        .organizer
        .unwrap_or_else(|| session.display_name().to_string());

    event::Model {
        id,
        title: input.title,
        description: input.description,
        start_date: input.start_date.into(),
        end_date: input.end_date.into(),
        organizer,
        organizer_email: user::normalize_email(&session.email),
        organizer_id: session.user_id.clone(),
        image: input.image,
        group_id,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Service for standalone events.
#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    id_gen: IdGenerator,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub const fn new(event_repo: EventRepository) -> Self {
        Self {
            event_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// All events, latest start first, optionally filtered by title.
    pub async fn list(&self, query: Option<&str>) -> AppResult<Vec<EventView>> {
        let events = self.event_repo.search(query).await?;
        event_views(&self.event_repo, events).await
    }

    /// One event with its attendee count.
    pub async fn show(&self, event_id: &str) -> AppResult<EventView> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let count = self.event_repo.attendee_count(event_id).await?;
        Ok(EventView::from_model(event, count))
    }

    /// Events the user has an RSVP for.
    pub async fn by_user(&self, user_id: &str) -> AppResult<Vec<EventView>> {
        let events = self.event_repo.find_by_subscriber(user_id).await?;
        event_views(&self.event_repo, events).await
    }

    /// Create a standalone event. The creator is not subscribed automatically.
    pub async fn create(&self, session: &Session, input: CreateEventInput) -> AppResult<EventView> {
        input.validate()?;
        check_schedule(input.start_date, input.end_date)?;

        let model = new_event(self.id_gen.generate(), session, input, None);
        let event = self.event_repo.create(model.into()).await?;

        tracing::info!(event_id = %event.id, user_id = %session.user_id, "Event created");
        Ok(EventView::from_model(event, 0))
    }

    /// Update an event. Organizer only.
    pub async fn update(&self, session: &Session, input: UpdateEventInput) -> AppResult<EventView> {
        input.validate()?;

        let event = self.event_repo.get_by_id(&input.event_id).await?;
        authz::can_update_event(session, &event)?;

        let start = input
            .start_date
            .unwrap_or_else(|| event.start_date.into());
        let end = input.end_date.unwrap_or_else(|| event.end_date.into());
        check_schedule(start, end)?;

        let mut active: event::ActiveModel = event.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if input.start_date.is_some() {
            active.start_date = Set(start.into());
        }
        if input.end_date.is_some() {
            active.end_date = Set(end.into());
        }
        if let Some(organizer) = input.organizer {
            active.organizer = Set(organizer);
        }
        if let Some(image) = input.image {
            active.image = Set(image);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let event = self.event_repo.update(active).await?;
        let count = self.event_repo.attendee_count(&event.id).await?;
        Ok(EventView::from_model(event, count))
    }

    /// Delete an event with its subscriptions and comments. Organizer only.
    pub async fn delete(&self, session: &Session, event_id: &str) -> AppResult<()> {
        let event = self.event_repo.get_by_id(event_id).await?;
        authz::can_delete_event(session, &event)?;

        self.event_repo.delete_cascade(event_id).await?;

        tracing::info!(event_id = %event_id, user_id = %session.user_id, "Event deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn session(user_id: &str, email: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: Some("Alice".to_string()),
        }
    }

    fn stored_event(id: &str, organizer_id: &str) -> event::Model {
        let start = Utc::now() + Duration::days(2);
        event::Model {
            id: id.to_string(),
            title: "Board Games".to_string(),
            description: "Bring your favourites".to_string(),
            start_date: start.into(),
            end_date: (start + Duration::hours(3)).into(),
            organizer: "Alice".to_string(),
            organizer_email: "alice@example.com".to_string(),
            organizer_id: organizer_id.to_string(),
            image: None,
            group_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> EventService {
        EventService::new(EventRepository::new(Arc::new(db.into_connection())))
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_schedule() {
        let start = Utc::now();
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(
                &session("a", "alice@example.com"),
                CreateEventInput {
                    title: "Backwards".to_string(),
                    description: String::new(),
                    start_date: start,
                    end_date: start - Duration::hours(1),
                    organizer: None,
                    image: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_sets_organizer_from_session() {
        let stored = stored_event("e1", "a");
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored.clone()]]);

        let view = service(db)
            .create(
                &session("a", "Alice@Example.com"),
                CreateEventInput {
                    title: stored.title.clone(),
                    description: stored.description.clone(),
                    start_date: stored.start_date.into(),
                    end_date: stored.end_date.into(),
                    organizer: None,
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(view.organizer_id, "a");
        assert_eq!(view.attendee_count, 0);
    }

    #[test]
    fn test_new_event_defaults_organizer_name() {
        let start = Utc::now();
        let input = CreateEventInput {
            title: "Picnic".to_string(),
            description: String::new(),
            start_date: start,
            end_date: start,
            organizer: None,
            image: None,
        };

        let mut caller = session("a", "Alice@Example.com");
        caller.name = None;
        let model = new_event("e1".to_string(), &caller, input, Some("g1".to_string()));

        assert_eq!(model.organizer, "Alice@Example.com");
        assert_eq!(model.organizer_email, "alice@example.com");
        assert_eq!(model.organizer_id, "a");
        assert_eq!(model.group_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn test_show_includes_attendee_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1", "a")]])
            .append_query_results([[count_row(5)]]);

        let view = service(db).show("e1").await.unwrap();
        assert_eq!(view.attendee_count, 5);
    }

    #[tokio::test]
    async fn test_update_by_non_organizer_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1", "a")]]);

        let result = service(db)
            .update(
                &session("b", "alice@example.com"),
                UpdateEventInput {
                    event_id: "e1".to_string(),
                    title: Some("Hijacked".to_string()),
                    description: None,
                    start_date: None,
                    end_date: None,
                    organizer: None,
                    image: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_by_organizer() {
        let existing = stored_event("e1", "a");
        let mut updated = existing.clone();
        updated.title = "Board Games Night".to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .append_query_results([[updated]])
            .append_query_results([[count_row(2)]]);

        let view = service(db)
            .update(
                &session("a", "alice@example.com"),
                UpdateEventInput {
                    event_id: "e1".to_string(),
                    title: Some("Board Games Night".to_string()),
                    description: None,
                    start_date: None,
                    end_date: None,
                    organizer: None,
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(view.title, "Board Games Night");
        assert_eq!(view.attendee_count, 2);
    }

    #[test]
    fn test_update_input_image_null_clears() {
        let input: UpdateEventInput =
            serde_json::from_str(r#"{"eventId":"e1","image":null}"#).unwrap();
        assert_eq!(input.image, Some(None));

        let input: UpdateEventInput = serde_json::from_str(r#"{"eventId":"e1"}"#).unwrap();
        assert_eq!(input.image, None);
    }

    #[tokio::test]
    async fn test_update_rejects_end_before_existing_start() {
        let existing = stored_event("e1", "a");
        let before_start: DateTime<Utc> = DateTime::<Utc>::from(existing.start_date) - Duration::hours(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]);

        let result = service(db)
            .update(
                &session("a", "alice@example.com"),
                UpdateEventInput {
                    event_id: "e1".to_string(),
                    title: None,
                    description: None,
                    start_date: None,
                    end_date: Some(before_start),
                    organizer: None,
                    image: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_by_organizer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1", "a")]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);

        assert!(service(db)
            .delete(&session("a", "alice@example.com"), "e1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1", "a")]]);

        let result = service(db)
            .delete(&session("b", "bob@example.com"), "e1")
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_show_missing_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<event::Model>::new()]);

        assert!(matches!(
            service(db).show("nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
