//! Group service.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::group_member::GroupRole;
use huddle_db::entities::subscription::SubscriptionStatus;
use huddle_db::entities::{group, group_member, subscription, user};
use huddle_db::repositories::{EventRepository, GroupRepository, UserRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::authz;
use super::event::{CreateEventInput, EventView, check_schedule, event_views, new_event};
use super::pagination::Page;
use super::session::Session;

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 4096))]
    #[serde(default)]
    pub about: String,
    #[validate(length(max = 1024))]
    pub image: Option<String>,
}

/// Input for updating a group. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    pub group_id: String,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 4096))]
    pub about: Option<String>,
    /// `null` clears the image.
    #[serde(default, deserialize_with = "huddle_common::serde_util::double_option")]
    pub image: Option<Option<String>>,
}

/// Input for creating an event inside a group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupEventInput {
    pub group_id: String,
    #[serde(flatten)]
    pub event: CreateEventInput,
}

/// Group with organizer details and member count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub about: String,
    pub image: Option<String>,
    pub organizer_id: String,
    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
}

impl GroupView {
    #[must_use]
    pub fn from_model(model: group::Model, organizer: Option<&user::Model>, member_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            about: model.about,
            image: model.image,
            organizer_id: model.organizer_id,
            organizer_name: organizer.and_then(|u| u.name.clone()),
            organizer_email: organizer.map(|u| u.email.clone()),
            member_count,
            created_at: model.created_at.into(),
        }
    }
}

/// A group member as shown on the roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Service for managing groups and their memberships.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(
        group_repo: GroupRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            group_repo,
            event_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn views(&self, groups: Vec<group::Model>) -> AppResult<Vec<GroupView>> {
        let ids: Vec<String> = groups.iter().map(|g| g.id.clone()).collect();
        let mut organizer_ids: Vec<String> = groups.iter().map(|g| g.organizer_id.clone()).collect();
        organizer_ids.sort_unstable();
        organizer_ids.dedup();

        let organizers: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&organizer_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let counts = self.group_repo.member_counts(&ids).await?;

        Ok(groups
            .into_iter()
            .map(|g| {
                let count = counts.get(&g.id).copied().unwrap_or(0);
                let organizer = organizers.get(&g.organizer_id);
                GroupView::from_model(g, organizer, count)
            })
            .collect())
    }

    async fn view(&self, group: group::Model) -> AppResult<GroupView> {
        self.views(vec![group])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Group view missing".to_string()))
    }

    /// All groups, newest first, optionally filtered by name.
    pub async fn list(&self, query: Option<&str>) -> AppResult<Vec<GroupView>> {
        let groups = self.group_repo.search(query).await?;
        self.views(groups).await
    }

    /// One group.
    pub async fn show(&self, group_id: &str) -> AppResult<GroupView> {
        let group = self.group_repo.get_by_id(group_id).await?;
        self.view(group).await
    }

    /// Groups the user belongs to.
    pub async fn by_user(&self, user_id: &str) -> AppResult<Vec<GroupView>> {
        let groups = self.group_repo.find_by_member(user_id).await?;
        self.views(groups).await
    }

    /// Create a group. The creator becomes its organizer and sole admin.
    pub async fn create(&self, session: &Session, input: CreateGroupInput) -> AppResult<GroupView> {
        input.validate()?;

        let organizer = self.user_repo.get_by_id(&session.user_id).await?;
        let now = Utc::now();
        let group_id = self.id_gen.generate();

        let group = group::Model {
            id: group_id.clone(),
            organizer_id: organizer.id.clone(),
            name: input.name,
            about: input.about,
            image: input.image,
            created_at: now.into(),
            updated_at: None,
        };
        let admin = group_member::Model {
            id: self.id_gen.generate(),
            user_id: organizer.id.clone(),
            group_id,
            role: GroupRole::Admin,
            joined_at: now.into(),
        };

        let group = self.group_repo.create_with_admin(group, admin).await?;

        tracing::info!(group_id = %group.id, user_id = %organizer.id, "Group created");
        Ok(GroupView::from_model(group, Some(&organizer), 1))
    }

    /// Update a group. Organizer only.
    pub async fn update(&self, session: &Session, input: UpdateGroupInput) -> AppResult<GroupView> {
        input.validate()?;

        let group = self.group_repo.get_by_id(&input.group_id).await?;
        authz::can_update_group(session, &group)?;

        let mut active: group::ActiveModel = group.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(about) = input.about {
            active.about = Set(about);
        }
        if let Some(image) = input.image {
            active.image = Set(image);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let group = self.group_repo.update(active).await?;
        self.view(group).await
    }

    /// Delete a group and its memberships. Its events are kept, detached.
    pub async fn delete(&self, session: &Session, group_id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;
        authz::can_delete_group(session, &group)?;

        self.group_repo.delete_cascade(group_id).await?;

        tracing::info!(group_id = %group_id, user_id = %session.user_id, "Group deleted");
        Ok(())
    }

    // ==================== Members ====================

    /// Join a group as a regular member.
    pub async fn join(&self, session: &Session, group_id: &str) -> AppResult<group_member::Model> {
        self.group_repo.get_by_id(group_id).await?;

        let membership = group_member::Model {
            id: self.id_gen.generate(),
            user_id: session.user_id.clone(),
            group_id: group_id.to_string(),
            role: GroupRole::Member,
            joined_at: Utc::now().into(),
        };

        self.group_repo.add_member(membership).await
    }

    /// Leave a group. The organizer cannot leave their own group.
    pub async fn leave(&self, session: &Session, group_id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;
        if group.organizer_id == session.user_id {
            return Err(AppError::BadRequest(
                "The organizer cannot leave their own group".to_string(),
            ));
        }

        if !self.group_repo.remove_member(group_id, &session.user_id).await? {
            return Err(AppError::NotFound(
                "Not a member of this group".to_string(),
            ));
        }
        Ok(())
    }

    /// One page of the group's roster.
    pub async fn members(&self, group_id: &str, page: u64) -> AppResult<Page<MemberView>> {
        self.group_repo.get_by_id(group_id).await?;

        let memberships = self.group_repo.find_members_page(group_id, page).await?;
        let total = self.group_repo.count_members(group_id).await?;

        let user_ids: Vec<String> = memberships.iter().map(|m| m.user_id.clone()).collect();
        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let members = memberships
            .into_iter()
            .map(|m| {
                let user = users.get(&m.user_id);
                MemberView {
                    name: user.and_then(|u| u.name.clone()),
                    image: user.and_then(|u| u.image.clone()),
                    user_id: m.user_id,
                    role: m.role,
                    joined_at: m.joined_at.into(),
                }
            })
            .collect();

        Ok(Page::new(members, total))
    }

    // ==================== Events ====================

    /// Events of a group.
    pub async fn events(&self, group_id: &str) -> AppResult<Vec<EventView>> {
        self.group_repo.get_by_id(group_id).await?;
        let events = self.event_repo.find_by_group(group_id).await?;
        event_views(&self.event_repo, events).await
    }

    /// Create an event in a group. Admins only; the creator is subscribed as attending.
    pub async fn create_event(
        &self,
        session: &Session,
        input: CreateGroupEventInput,
    ) -> AppResult<EventView> {
        input.event.validate()?;

        let group = self.group_repo.get_by_id(&input.group_id).await?;
        let membership = self
            .group_repo
            .find_membership(&group.id, &session.user_id)
            .await?;
        authz::can_create_group_event(session, membership.as_ref())?;
        check_schedule(input.event.start_date, input.event.end_date)?;

        let event = new_event(self.id_gen.generate(), session, input.event, Some(group.id));
        let creator = subscription::Model {
            id: self.id_gen.generate(),
            user_id: session.user_id.clone(),
            event_id: event.id.clone(),
            status: SubscriptionStatus::Join,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let event = self
            .event_repo
            .create_with_subscription(event, creator)
            .await?;

        tracing::info!(event_id = %event.id, group_id = ?event.group_id, "Group event created");
        Ok(EventView::from_model(event, 1))
    }
}
