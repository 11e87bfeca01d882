//! Subscription (RSVP) service.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use huddle_common::{AppResult, IdGenerator};
use huddle_db::entities::subscription::SubscriptionStatus;
use huddle_db::entities::{subscription, user};
use huddle_db::repositories::{EventRepository, SubscriptionRepository, UserRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::authz;
use super::pagination::Page;
use super::session::Session;

/// Input for changing attendance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
}

/// An event attendee as shown on the roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    pub subscription_id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
}

/// Service for event RSVPs.
#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub const fn new(
        subscription_repo: SubscriptionRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            subscription_repo,
            event_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// RSVP to an event as attending. A second join is a `Conflict`.
    pub async fn join(&self, session: &Session, event_id: &str) -> AppResult<subscription::Model> {
        self.event_repo.get_by_id(event_id).await?;

        let subscription = subscription::Model {
            id: self.id_gen.generate(),
            user_id: session.user_id.clone(),
            event_id: event_id.to_string(),
            status: SubscriptionStatus::Join,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let subscription = self.subscription_repo.create(subscription).await?;
        tracing::debug!(event_id = %event_id, user_id = %session.user_id, "Joined event");
        Ok(subscription)
    }

    /// Change attendance. Only the attendee may do this.
    pub async fn update_status(
        &self,
        session: &Session,
        input: UpdateStatusInput,
    ) -> AppResult<subscription::Model> {
        let subscription = self
            .subscription_repo
            .get_by_id(&input.subscription_id)
            .await?;
        let attendee = self.user_repo.get_by_id(&subscription.user_id).await?;
        authz::can_update_attendee(session, &attendee.email)?;

        let mut active: subscription::ActiveModel = subscription.into();
        active.status = Set(input.status);
        active.updated_at = Set(Some(Utc::now().into()));

        self.subscription_repo.update(active).await
    }

    /// One page of an event's attendees, in any status.
    pub async fn members(&self, event_id: &str, page: u64) -> AppResult<Page<AttendeeView>> {
        self.event_repo.get_by_id(event_id).await?;

        let subscriptions = self
            .subscription_repo
            .find_by_event_page(event_id, page)
            .await?;
        let total = self.subscription_repo.count_by_event(event_id).await?;

        let user_ids: Vec<String> = subscriptions.iter().map(|s| s.user_id.clone()).collect();
        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let members = subscriptions
            .into_iter()
            .map(|s| {
                let user = users.get(&s.user_id);
                AttendeeView {
                    subscription_id: s.id,
                    name: user.and_then(|u| u.name.clone()),
                    email: user.map(|u| u.email.clone()),
                    image: user.and_then(|u| u.image.clone()),
                    user_id: s.user_id,
                    status: s.status,
                    created_at: s.created_at.into(),
                }
            })
            .collect();

        Ok(Page::new(members, total))
    }

    /// A user's subscriptions.
    pub async fn by_user(&self, user_id: &str) -> AppResult<Vec<subscription::Model>> {
        self.subscription_repo.find_by_user(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use huddle_common::AppError;
    use huddle_db::entities::event;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn session(user_id: &str, email: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: None,
        }
    }

    fn stored_user(id: &str, email: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: email.to_string(),
            name: None,
            image: None,
            password_hash: None,
            provider: user::AuthProvider::Credentials,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn stored_event(id: &str) -> event::Model {
        let start = Utc::now() + Duration::days(1);
        event::Model {
            id: id.to_string(),
            title: "Trailhead Meetup".to_string(),
            description: String::new(),
            start_date: start.into(),
            end_date: (start + Duration::hours(2)).into(),
            organizer: "A".to_string(),
            organizer_email: "a@example.com".to_string(),
            organizer_id: "a".to_string(),
            image: None,
            group_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn stored_subscription(id: &str, user_id: &str, status: SubscriptionStatus) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            event_id: "e1".to_string(),
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> SubscriptionService {
        let conn = Arc::new(db.into_connection());
        SubscriptionService::new(
            SubscriptionRepository::new(conn.clone()),
            EventRepository::new(conn.clone()),
            UserRepository::new(conn),
        )
    }

    #[tokio::test]
    async fn test_join_creates_join_status() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        let subscription = service(db)
            .join(&session("b", "b@example.com"), "e1")
            .await
            .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Join);
        assert_eq!(subscription.user_id, "b");
    }

    #[tokio::test]
    async fn test_join_twice_conflicts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }]);

        let result = service(db).join(&session("b", "b@example.com"), "e1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_join_missing_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<event::Model>::new()]);

        let result = service(db).join(&session("b", "b@example.com"), "e404").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status_as_attendee() {
        let existing = stored_subscription("s1", "b", SubscriptionStatus::Join);
        let mut updated = existing.clone();
        updated.status = SubscriptionStatus::Cancel;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .append_query_results([[stored_user("b", "Bob@Example.com")]])
            .append_query_results([[updated]]);

        let result = service(db)
            .update_status(
                &session("b", "bob@example.com"),
                UpdateStatusInput {
                    subscription_id: "s1".to_string(),
                    status: SubscriptionStatus::Cancel,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.status, SubscriptionStatus::Cancel);
    }

    #[tokio::test]
    async fn test_update_status_as_someone_else() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_subscription("s1", "b", SubscriptionStatus::Join)]])
            .append_query_results([[stored_user("b", "bob@example.com")]]);

        let result = service(db)
            .update_status(
                &session("c", "carol@example.com"),
                UpdateStatusInput {
                    subscription_id: "s1".to_string(),
                    status: SubscriptionStatus::Maybe,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_status_missing_subscription() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<subscription::Model>::new()]);

        let result = service(db)
            .update_status(
                &session("b", "bob@example.com"),
                UpdateStatusInput {
                    subscription_id: "nope".to_string(),
                    status: SubscriptionStatus::Maybe,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_members_page() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1")]])
            .append_query_results([[
                stored_subscription("s1", "a", SubscriptionStatus::Join),
                stored_subscription("s2", "b", SubscriptionStatus::Maybe),
            ]])
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(2)),
            }]])
            .append_query_results([[
                stored_user("a", "a@example.com"),
                stored_user("b", "b@example.com"),
            ]]);

        let page = service(db).members("e1", 0).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.members[1].status, SubscriptionStatus::Maybe);
        assert_eq!(page.members[1].email.as_deref(), Some("b@example.com"));
    }

    #[tokio::test]
    async fn test_members_page_out_of_range() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_event("e1")]]);

        let result = service(db).members("e1", u64::MAX).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
