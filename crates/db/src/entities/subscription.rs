//! Subscription (event RSVP) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance state of a subscription.
///
/// Any state may move to any other; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Attending. Only this state counts towards the attendee count.
    #[sea_orm(string_value = "join")]
    Join,
    /// Undecided.
    #[sea_orm(string_value = "maybe")]
    Maybe,
    /// Not attending.
    #[sea_orm(string_value = "cancel")]
    Cancel,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Join
    }
}

/// A user's RSVP for an event. `(user_id, event_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    pub status: SubscriptionStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id",
        on_delete = "Cascade"
    )]
    Event,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
