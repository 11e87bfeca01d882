//! Database repositories.

mod comment;
mod event;
mod group;
mod subscription;
mod user;

pub use comment::CommentRepository;
pub use event::EventRepository;
pub use group::GroupRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;

use huddle_common::{AppError, AppResult};

/// Rows per page for paginated roster queries.
pub const PAGE_SIZE: u64 = 10;

/// Row offset of a zero-based page.
///
/// Offsets are bound as signed 64-bit integers, so pages past that range are rejected.
pub fn page_offset(page: u64) -> AppResult<u64> {
    page.checked_mul(PAGE_SIZE)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::BadRequest(format!("Page {page} is out of range")))
}
