//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod authz;
pub mod comment;
pub mod event;
pub mod group;
pub mod identity;
pub mod pagination;
pub mod session;
pub mod subscription;

pub use auth::{AuthService, SignInInput, SignupInput};
pub use comment::{CommentService, CommentView, CreateCommentInput};
pub use event::{CreateEventInput, EventService, EventView, UpdateEventInput};
pub use group::{
    CreateGroupEventInput, CreateGroupInput, GroupService, GroupView, MemberView,
    UpdateGroupInput,
};
pub use identity::{ExternalIdentity, GoogleIdentityProvider, IdentityProvider};
pub use pagination::Page;
pub use session::{Session, SessionManager};
pub use subscription::{AttendeeView, SubscriptionService, UpdateStatusInput};
