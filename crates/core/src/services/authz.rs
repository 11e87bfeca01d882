//! Authorization predicates.
//!
//! Each predicate answers whether the session may act on a resource.
//! Denial is [`AppError::Unauthorized`]; missing sessions are rejected
//! earlier, at the API boundary, as [`AppError::Unauthenticated`].

use huddle_common::{AppError, AppResult};
use huddle_db::entities::{event, group, group_member, user};

use super::session::Session;

/// Only the organizer may delete a group.
pub fn can_delete_group(session: &Session, group: &group::Model) -> AppResult<()> {
    if session.user_id == group.organizer_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Only the group organizer can delete this group".to_string(),
        ))
    }
}

/// Only the organizer may update a group.
pub fn can_update_group(session: &Session, group: &group::Model) -> AppResult<()> {
    if session.user_id == group.organizer_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Only the group organizer can update this group".to_string(),
        ))
    }
}

/// Group events may be created by admins of the group.
///
/// `membership` is the caller's membership row for the group, if any.
pub fn can_create_group_event(
    session: &Session,
    membership: Option<&group_member::Model>,
) -> AppResult<()> {
    match membership {
        Some(m) if m.user_id == session.user_id && m.role.can_create_events() => Ok(()),
        _ => Err(AppError::Unauthorized(
            "Only group admins can create group events".to_string(),
        )),
    }
}

/// Attendance may only be changed by the attendee themself.
pub fn can_update_attendee(session: &Session, attendee_email: &str) -> AppResult<()> {
    if user::emails_match(&session.email, attendee_email) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "You can only update your own attendance".to_string(),
        ))
    }
}

/// Only the organizer may update an event.
pub fn can_update_event(session: &Session, event: &event::Model) -> AppResult<()> {
    if session.user_id == event.organizer_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Only the event organizer can update this event".to_string(),
        ))
    }
}

/// Only the organizer may delete an event.
pub fn can_delete_event(session: &Session, event: &event::Model) -> AppResult<()> {
    if session.user_id == event.organizer_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Only the event organizer can delete this event".to_string(),
        ))
    }
}
