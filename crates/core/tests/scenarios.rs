//! End-to-end service scenarios against `PostgreSQL`.
//!
//! Run with: `cargo test -p huddle-core --test scenarios -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use huddle_common::AppError;
use huddle_core::{
    AuthService, CreateEventInput, CreateGroupEventInput, CreateGroupInput, EventService,
    GroupService, Session, SignupInput, SubscriptionService, UpdateStatusInput,
};
use huddle_db::entities::group_member::GroupRole;
use huddle_db::entities::subscription::SubscriptionStatus;
use huddle_db::repositories::{
    EventRepository, GroupRepository, SubscriptionRepository, UserRepository,
};
use huddle_db::test_utils::TestDatabase;

struct Services {
    auth: AuthService,
    groups: GroupService,
    events: EventService,
    subscriptions: SubscriptionService,
}

fn services(db: &TestDatabase) -> Services {
    let conn = Arc::new(db.connection().clone());
    let users = UserRepository::new(conn.clone());
    let groups = GroupRepository::new(conn.clone());
    let events = EventRepository::new(conn.clone());
    let subscriptions = SubscriptionRepository::new(conn);

    Services {
        auth: AuthService::new(users.clone()),
        groups: GroupService::new(groups, events.clone(), users.clone()),
        events: EventService::new(events.clone()),
        subscriptions: SubscriptionService::new(subscriptions, events, users),
    }
}

async fn signup(auth: &AuthService, email: &str, name: &str) -> Session {
    let user = auth
        .signup(SignupInput {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            name: Some(name.to_string()),
        })
        .await
        .unwrap();
    Session::from_user(&user)
}

fn meetup_input() -> CreateEventInput {
    let start = Utc::now() + Duration::days(5);
    CreateEventInput {
        title: "Trailhead Meetup".to_string(),
        description: "North parking lot".to_string(),
        start_date: start,
        end_date: start + Duration::hours(3),
        organizer: None,
        image: None,
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_hiking_club() {
    let db = TestDatabase::create_unique().await.expect("test database");
    let svc = services(&db);

    let a = signup(&svc.auth, "a@example.com", "Alice").await;
    let b = signup(&svc.auth, "b@example.com", "Bob").await;

    let group = svc
        .groups
        .create(
            &a,
            CreateGroupInput {
                name: "Hiking Club".to_string(),
                about: "weekly hikes".to_string(),
                image: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(group.member_count, 1);

    let roster = svc.groups.members(&group.id, 0).await.unwrap();
    assert_eq!(roster.members.len(), 1);
    assert_eq!(roster.members[0].user_id, a.user_id);
    assert_eq!(roster.members[0].role, GroupRole::Admin);

    let membership = svc.groups.join(&b, &group.id).await.unwrap();
    assert_eq!(membership.role, GroupRole::Member);
    assert_eq!(svc.groups.show(&group.id).await.unwrap().member_count, 2);

    let denied = svc
        .groups
        .create_event(
            &b,
            CreateGroupEventInput {
                group_id: group.id.clone(),
                event: meetup_input(),
            },
        )
        .await;
    assert!(matches!(denied, Err(AppError::Unauthorized(_))));

    let event = svc
        .groups
        .create_event(
            &a,
            CreateGroupEventInput {
                group_id: group.id.clone(),
                event: meetup_input(),
            },
        )
        .await
        .unwrap();
    assert_eq!(event.group_id.as_deref(), Some(group.id.as_str()));
    assert_eq!(svc.events.show(&event.id).await.unwrap().attendee_count, 1);

    let subs = svc.subscriptions.by_user(&a.user_id).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].status, SubscriptionStatus::Join);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_attendee_count_tracks_status_changes() {
    let db = TestDatabase::create_unique().await.expect("test database");
    let svc = services(&db);

    let a = signup(&svc.auth, "a@example.com", "Alice").await;
    let b = signup(&svc.auth, "b@example.com", "Bob").await;

    let event = svc.events.create(&a, meetup_input()).await.unwrap();
    assert_eq!(event.attendee_count, 0);

    let sub = svc.subscriptions.join(&b, &event.id).await.unwrap();
    assert!(matches!(
        svc.subscriptions.join(&b, &event.id).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(svc.events.show(&event.id).await.unwrap().attendee_count, 1);

    let denied = svc
        .subscriptions
        .update_status(
            &a,
            UpdateStatusInput {
                subscription_id: sub.id.clone(),
                status: SubscriptionStatus::Cancel,
            },
        )
        .await;
    assert!(matches!(denied, Err(AppError::Unauthorized(_))));

    for (status, expected) in [
        (SubscriptionStatus::Maybe, 0),
        (SubscriptionStatus::Cancel, 0),
        (SubscriptionStatus::Join, 1),
    ] {
        let updated = svc
            .subscriptions
            .update_status(
                &b,
                UpdateStatusInput {
                    subscription_id: sub.id.clone(),
                    status,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
        assert_eq!(
            svc.events.show(&event.id).await.unwrap().attendee_count,
            expected
        );
    }

    svc.events.delete(&a, &event.id).await.unwrap();
    assert!(svc.subscriptions.by_user(&b.user_id).await.unwrap().is_empty());

    db.drop_database().await.unwrap();
}
