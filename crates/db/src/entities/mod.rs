//! Database entities.

pub mod comment;
pub mod event;
pub mod group;
pub mod group_member;
pub mod subscription;
pub mod user;

pub use comment::Entity as Comment;
pub use event::Entity as Event;
pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
pub use subscription::Entity as Subscription;
pub use user::Entity as User;
